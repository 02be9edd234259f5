//
// cli.rs
// Oct-Tools-rs
//
// Defines the CLI surface with Clap and dispatches user-selected commands to the corresponding modules.
//
// Thales Matheus Mendonça Santos - October 2026

use std::path::PathBuf;

use anyhow::bail;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::dicom_frames::GrayDepth;
use crate::{bmp_series, dicom_series, dicomdir, export, inspect, json, paths, topcon, tree};

/// Command-line interface glue code: defines the available verbs and dispatches to modules.
#[derive(Parser)]
#[command(name = "oct-tools")]
#[command(about = "Convert ophthalmic imaging exports to TIFF, AVI, PNG and JSON", long_about = None)]
pub struct Cli {
    /// Root folder for derived results
    #[arg(long, global = true, env = "OCT_RESULT_ROOT", default_value = "Result")]
    pub result_root: PathBuf,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert a BMP frame sequence to AVI and multi-page TIFF
    BmpSeries {
        #[arg(short, long)]
        input_dir: PathBuf,
        #[arg(long)]
        output_avi: Option<PathBuf>,
        #[arg(long)]
        output_tiff: Option<PathBuf>,
        #[arg(long, default_value_t = bmp_series::DEFAULT_FPS)]
        fps: u32,
    },
    /// Export the DICOM series of a folder to multi-page TIFF and AVI
    DcmSeries {
        #[arg(short, long)]
        input_dir: PathBuf,
        #[arg(long)]
        output_tiff: Option<PathBuf>,
        #[arg(long)]
        output_avi: Option<PathBuf>,
        #[arg(long, default_value_t = dicom_series::DEFAULT_AVI_FPS)]
        fps: u32,
        /// Stretch grayscale frames to 8 bits instead of 16
        #[arg(long)]
        eight_bit: bool,
        #[arg(long, conflicts_with = "skip_avi")]
        skip_tiff: bool,
        #[arg(long)]
        skip_avi: bool,
    },
    /// Export volumes, photographs and metadata of one vendor DICOM file
    Export { file: PathBuf },
    /// Export every .dcm file in a folder
    BatchExport {
        #[arg(short, long)]
        directory: PathBuf,
    },
    /// Print a header summary, optionally dump elements or render a frame
    Inspect {
        file: PathBuf,
        #[arg(long)]
        dump: bool,
        #[arg(long, default_value_t = 4)]
        max_depth: usize,
        #[arg(long, default_value_t = 64)]
        max_value_len: usize,
        #[arg(long)]
        render: Option<PathBuf>,
        #[arg(long, default_value_t = 0)]
        frame: u32,
    },
    /// List the directory records of a DICOMDIR
    Dicomdir { file: PathBuf },
    /// Parse a Topcon study XML
    TopconXml {
        file: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Extract readable strings and FOCTARC records from a Topcon FILELIST
    Filelist {
        file: PathBuf,
        #[arg(long, default_value_t = topcon::DEFAULT_MIN_STRING_LEN)]
        min_len: usize,
        /// Also print every extracted string
        #[arg(long)]
        strings: bool,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print a directory tree
    Tree { dir: PathBuf },
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    // A subscriber may already be installed when embedded; keep the existing one.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

pub fn run() -> anyhow::Result<()> {
    // Parse the raw CLI arguments once and dispatch to a subcommand handler.
    let cli = Cli::parse();
    init_logging(&cli.log_level);
    let root = cli.result_root;

    match cli.command {
        Commands::BmpSeries {
            input_dir,
            output_avi,
            output_tiff,
            fps,
        } => {
            let options = bmp_series::BmpSeriesOptions {
                output_avi: output_avi
                    .unwrap_or_else(|| paths::series_output_path(&root, &input_dir, "avi")),
                output_tiff: output_tiff
                    .unwrap_or_else(|| paths::series_output_path(&root, &input_dir, "tiff")),
                fps,
            };
            let report = bmp_series::convert(&input_dir, &options)?;
            info!("Conversion completed successfully");
            info!("  AVI : {:?}", options.output_avi);
            info!("  TIFF: {:?}", options.output_tiff);
            if !report.skipped.is_empty() {
                warn!("{} unreadable file(s) skipped", report.skipped.len());
            }
        }
        Commands::DcmSeries {
            input_dir,
            output_tiff,
            output_avi,
            fps,
            eight_bit,
            skip_tiff,
            skip_avi,
        } => {
            if !skip_tiff {
                let output = output_tiff
                    .unwrap_or_else(|| paths::series_output_path(&root, &input_dir, "tiff"));
                let depth = GrayDepth::from_keep_16bit(!eight_bit);
                let pages = dicom_series::export_tiff(&input_dir, &output, depth)?;
                info!("TIFF complete: {} page(s)", pages);
            }
            if !skip_avi {
                let output = output_avi
                    .unwrap_or_else(|| paths::series_output_path(&root, &input_dir, "avi"));
                let frames = dicom_series::export_avi(&input_dir, &output, fps)?;
                info!("AVI complete: {} frame(s)", frames);
            }
        }
        Commands::Export { file } => {
            let report = export::export_dicom_file(&file, &root)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::BatchExport { directory } => {
            let summary = export::export_directory(&directory, &root)?;
            info!(
                "Exported {} file(s), {} failure(s)",
                summary.exported,
                summary.failed.len()
            );
            if !summary.failed.is_empty() {
                bail!("{} file(s) failed to export", summary.failed.len());
            }
        }
        Commands::Inspect {
            file,
            dump,
            max_depth,
            max_value_len,
            render,
            frame,
        } => {
            let options = inspect::InspectOptions {
                dump,
                max_depth,
                max_value_len,
                render,
                frame,
            };
            inspect::inspect(&file, &options)?
        }
        Commands::Dicomdir { file } => dicomdir::print_records(&file)?,
        Commands::TopconXml { file, output } => {
            let records = topcon::read_oct_xml(&file)?;
            for record in &records {
                println!(
                    "{} {:?} {} {} Quality: {}",
                    record.oct_no.as_deref().unwrap_or("-"),
                    record.patient,
                    record.scan_mode.as_deref().unwrap_or("-"),
                    record.eye(),
                    record.retinal_iq
                );
            }
            if let Some(output) = output {
                json::write_pretty(&output, &records)?;
            }
        }
        Commands::Filelist {
            file,
            min_len,
            strings,
            output,
        } => {
            if min_len == 0 {
                bail!("--min-len must be greater than zero");
            }
            let (texts, records) = topcon::read_filelist(&file, min_len)?;
            if strings {
                for text in &texts {
                    println!("{text}");
                }
            }
            for record in &records {
                println!("{record:?}");
            }
            info!("{} string(s), {} FOCTARC record(s)", texts.len(), records.len());
            if let Some(output) = output {
                json::write_pretty(&output, &records)?;
            }
        }
        Commands::Tree { dir } => {
            println!("\nDirectory tree for: {}\n", dir.display());
            print!("{}", tree::render_tree(&dir)?);
        }
    }

    Ok(())
}
