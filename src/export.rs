//
// export.rs
// Oct-Tools-rs
//
// Per-file export pipeline (volumes to TIFF, photographs to PNG, metadata to JSON) and its
// directory-wide parallel variant.
//
// Thales Matheus Mendonça Santos - October 2026

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Result;
use rayon::prelude::*;
use tracing::{error, info};
use walkdir::WalkDir;

use crate::dicom_source::DicomSource;
use crate::json::write_pretty;
use crate::models::{BatchSummary, ExportReport};
use crate::paths::{derive_output_dir, remove_and_create_dir};
use crate::source::ImageSource;

pub const METADATA_FILE: &str = "metadata.json";

/// Export everything `source` offers into a freshly cleaned `output_dir`.
pub fn export_source<S: ImageSource>(source: &S, output_dir: &Path) -> Result<ExportReport> {
    remove_and_create_dir(output_dir)?;
    info!("Output directory: {:?}", output_dir);

    let mut report = ExportReport {
        output_dir: output_dir.to_path_buf(),
        ..ExportReport::default()
    };

    let volumes = source.read_oct_volumes()?;
    info!("OCT volumes: {}", volumes.len());
    for volume in &volumes {
        let path = output_dir.join(volume.file_name("tiff"));
        report.volumes.extend(volume.save(&path)?);
    }

    let images = source.read_fundus_images()?;
    info!("Fundus images: {}", images.len());
    for image in &images {
        let path = output_dir.join(image.file_name("png"));
        image.save(&path)?;
        info!("PNG saved: {:?}", path);
        report.fundus_images.push(path);
    }

    let metadata = source.read_all_metadata()?;
    let meta_path = output_dir.join(METADATA_FILE);
    write_pretty(&meta_path, &metadata)?;
    report.metadata = Some(meta_path);

    Ok(report)
}

/// Export one DICOM file into `<result_root>/<parent>/<stem>`.
pub fn export_dicom_file(path: &Path, result_root: &Path) -> Result<ExportReport> {
    let source = DicomSource::open(path)?;
    let mut report = export_source(&source, &derive_output_dir(result_root, path))?;
    report.source = source.path().to_path_buf();
    Ok(report)
}

fn is_dicom_candidate(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("dcm"))
}

/// `.dcm` files directly inside `dir`, sorted by name.
pub fn dicom_candidates(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry?;
        if entry.file_type().is_file() && is_dicom_candidate(entry.path()) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Export every `.dcm` file in `dir` in parallel; failures are logged and counted.
pub fn export_directory(dir: &Path, result_root: &Path) -> Result<BatchSummary> {
    let files = dicom_candidates(dir)?;
    info!("Processing directory: {:?} | {} file(s)", dir, files.len());

    let failed = Mutex::new(Vec::new());
    let exported: usize = files
        .par_iter()
        .map(|path| match export_dicom_file(path, result_root) {
            Ok(report) => {
                info!("Exported {:?} -> {:?}", path, report.output_dir);
                1
            }
            Err(e) => {
                error!("Failed on {:?}: {:#}", path, e);
                if let Ok(mut failed) = failed.lock() {
                    failed.push(path.clone());
                }
                0
            }
        })
        .sum();

    let mut failed = failed.into_inner().unwrap_or_default();
    failed.sort();
    Ok(BatchSummary { exported, failed })
}
