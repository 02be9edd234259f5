//
// bmp_series.rs
// Oct-Tools-rs
//
// Assembles a fundus camera BMP sequence into an MJPEG AVI and a multi-page RGB TIFF.
//
// Thales Matheus Mendonça Santos - October 2026

use std::path::{Path, PathBuf};

use anyhow::Result;
use image::RgbImage;
use serde::Serialize;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::avi::AviWriter;
use crate::error::ConvertError;
use crate::frame::{fit_to, Frame};
use crate::frame_order::sort_frame_names;
use crate::tiff_stack::write_tiff_stack;

pub const DEFAULT_FPS: u32 = 2;

#[derive(Debug, Clone)]
pub struct BmpSeriesOptions {
    pub output_avi: PathBuf,
    pub output_tiff: PathBuf,
    pub fps: u32,
}

/// Outcome of a sequence conversion.
#[derive(Debug, Clone, Serialize)]
pub struct SeriesReport {
    pub frames_written: usize,
    pub skipped: Vec<PathBuf>,
    pub width: u32,
    pub height: u32,
}

/// `.bmp` files directly inside `dir`, in acquisition order.
pub fn list_bmp_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut names = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.to_ascii_lowercase().ends_with(".bmp") {
            names.push(name);
        }
    }

    sort_frame_names(&mut names);
    Ok(names.into_iter().map(|n| dir.join(n)).collect())
}

fn read_rgb(path: &Path) -> Result<RgbImage, image::ImageError> {
    Ok(image::open(path)?.to_rgb8())
}

pub fn convert(input_dir: &Path, options: &BmpSeriesOptions) -> Result<SeriesReport> {
    let files = list_bmp_files(input_dir)?;
    if files.is_empty() {
        return Err(ConvertError::NoFrames {
            kind: "BMP",
            dir: input_dir.to_path_buf(),
        }
        .into());
    }

    info!("BMP sequence order:");
    for file in &files {
        info!("  {}", file.file_name().unwrap_or_default().to_string_lossy());
    }

    let first = read_rgb(&files[0]).map_err(|e| ConvertError::UnreadableFirstFrame {
        path: files[0].clone(),
        reason: e.to_string(),
    })?;
    let (width, height) = first.dimensions();
    info!("Frame size: {}x{} (RGB)", width, height);

    let mut video = AviWriter::create(&options.output_avi, width, height, options.fps)?;
    let mut pages = Vec::with_capacity(files.len());
    let mut skipped = Vec::new();

    let mut pending = Some(first);
    for (i, path) in files.iter().enumerate() {
        let frame = match pending.take() {
            Some(frame) => frame,
            None => match read_rgb(path) {
                Ok(frame) => frame,
                Err(e) => {
                    warn!("Skipping unreadable file {:?}: {}", path, e);
                    skipped.push(path.clone());
                    continue;
                }
            },
        };

        debug!("{}/{}: {:?}", i + 1, files.len(), path);
        video.write_frame(&fit_to(frame.clone(), width, height))?;
        pages.push(Frame::Rgb8(frame));
    }

    video.finish()?;
    info!("AVI saved: {:?}", options.output_avi);
    write_tiff_stack(&options.output_tiff, &pages)?;

    Ok(SeriesReport {
        frames_written: pages.len(),
        skipped,
        width,
        height,
    })
}
