//
// source.rs
// Oct-Tools-rs
//
// Reader-neutral view of a vendor export: OCT volumes, fundus photographs and a metadata document,
// with extension-driven saving for each.
//
// Thales Matheus Mendonça Santos - October 2026

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::{DynamicImage, ImageFormat};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::avi::AviWriter;
use crate::error::ConvertError;
use crate::frame::{fit_to, Frame};
use crate::paths::ensure_parent;
use crate::tiff_stack::write_tiff_stack;

pub const VOLUME_VIDEO_FPS: u32 = 10;

/// Which eye an acquisition belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Laterality {
    #[serde(rename = "OD")]
    Right,
    #[serde(rename = "OS")]
    Left,
    #[serde(rename = "unknown")]
    Unknown,
}

impl Laterality {
    /// Accepts DICOM codes (`R`/`L`) as well as clinical ones (`OD`/`OS`).
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_ascii_uppercase().as_str() {
            "R" | "OD" => Laterality::Right,
            "L" | "OS" => Laterality::Left,
            _ => Laterality::Unknown,
        }
    }
}

impl fmt::Display for Laterality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Laterality::Right => "OD",
            Laterality::Left => "OS",
            Laterality::Unknown => "unknown",
        })
    }
}

/// A stack of B-scans from one acquisition.
#[derive(Debug, Clone)]
pub struct OctVolume {
    pub volume_id: String,
    pub laterality: Laterality,
    pub slices: Vec<Frame>,
}

/// A 2-D retina photograph (colour fundus, FA, IR, ...).
#[derive(Debug, Clone)]
pub struct FundusImage {
    pub image_id: String,
    pub laterality: Laterality,
    pub image: Frame,
}

/// Anything that can hand out volumes, photographs and metadata for export.
pub trait ImageSource {
    fn read_oct_volumes(&self) -> Result<Vec<OctVolume>>;
    fn read_fundus_images(&self) -> Result<Vec<FundusImage>>;
    fn read_all_metadata(&self) -> Result<Value>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputKind {
    Tiff,
    Avi,
    Still(ImageFormat),
}

fn output_kind(path: &Path) -> Result<OutputKind> {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "tif" | "tiff" => Ok(OutputKind::Tiff),
        "avi" => Ok(OutputKind::Avi),
        "png" | "jpg" | "jpeg" | "bmp" => ImageFormat::from_extension(&ext)
            .map(OutputKind::Still)
            .ok_or_else(|| ConvertError::UnsupportedFormat(ext.clone()).into()),
        _ => Err(ConvertError::UnsupportedFormat(ext.clone()).into()),
    }
}

/// Save one frame as a still; formats without 16-bit support get an 8-bit copy.
pub fn save_still(frame: &Frame, path: &Path, format: ImageFormat) -> Result<()> {
    ensure_parent(path)?;
    let image = match (frame, format) {
        (Frame::Gray16(img), f) if f != ImageFormat::Png => {
            DynamicImage::ImageLuma8(DynamicImage::ImageLuma16(img.clone()).to_luma8())
        }
        _ => frame.clone().into_dynamic(),
    };
    image
        .save_with_format(path, format)
        .with_context(|| format!("Failed to save image to {:?}", path))
}

impl OctVolume {
    pub fn file_name(&self, extension: &str) -> String {
        format!("{}_{}.{}", self.volume_id, self.laterality, extension)
    }

    /// Save the volume; the extension picks the layout. Returns every file written.
    ///
    /// * `.tif`/`.tiff`: one multi-page TIFF
    /// * `.avi`: MJPEG video at [`VOLUME_VIDEO_FPS`]
    /// * `.png`/`.jpg`/`.bmp`: one still per slice, `<stem>_<index>.<ext>`
    pub fn save(&self, path: &Path) -> Result<Vec<PathBuf>> {
        if self.slices.is_empty() {
            return Err(ConvertError::NoFrames {
                kind: "OCT",
                dir: path.to_path_buf(),
            }
            .into());
        }

        match output_kind(path)? {
            OutputKind::Tiff => {
                write_tiff_stack(path, &self.slices)?;
                Ok(vec![path.to_path_buf()])
            }
            OutputKind::Avi => {
                let (width, height) = self.slices[0].dimensions();
                let mut video = AviWriter::create(path, width, height, VOLUME_VIDEO_FPS)?;
                for slice in &self.slices {
                    let rgb = fit_to(slice.to_rgb8(), width, height);
                    video.write_frame(&rgb)?;
                }
                video.finish()?;
                info!("AVI saved: {:?}", path);
                Ok(vec![path.to_path_buf()])
            }
            OutputKind::Still(format) => {
                let stem = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| self.volume_id.clone());
                let ext = path
                    .extension()
                    .map(|e| e.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let mut written = Vec::with_capacity(self.slices.len());
                for (i, slice) in self.slices.iter().enumerate() {
                    let slice_path = path.with_file_name(format!("{stem}_{i}.{ext}"));
                    save_still(slice, &slice_path, format)?;
                    written.push(slice_path);
                }
                info!("Saved {} slice(s) next to {:?}", written.len(), path);
                Ok(written)
            }
        }
    }
}

impl FundusImage {
    pub fn file_name(&self, extension: &str) -> String {
        format!("{}_{}.{}", self.image_id, self.laterality, extension)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        match output_kind(path)? {
            OutputKind::Still(format) => save_still(&self.image, path, format),
            OutputKind::Tiff => write_tiff_stack(path, std::slice::from_ref(&self.image)),
            OutputKind::Avi => Err(ConvertError::UnsupportedFormat("avi".into()).into()),
        }
    }
}
