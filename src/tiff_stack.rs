//
// tiff_stack.rs
// Oct-Tools-rs
//
// Writes a sequence of frames as one multi-page TIFF, one IFD per frame.
//
// Thales Matheus Mendonça Santos - October 2026

use std::fs::File;
use std::io::{BufWriter, Seek, Write};
use std::path::Path;

use anyhow::{Context, Result};
use tiff::encoder::{colortype, TiffEncoder};
use tracing::info;

use crate::error::ConvertError;
use crate::frame::Frame;
use crate::paths::ensure_parent;

/// Write `frames` to `path`. Pages keep their own size and colour type
/// (RGB pages are tagged RGB, grey pages MinIsBlack).
pub fn write_tiff_stack(path: &Path, frames: &[Frame]) -> Result<()> {
    if frames.is_empty() {
        return Err(ConvertError::NoFrames {
            kind: "TIFF",
            dir: path.to_path_buf(),
        }
        .into());
    }

    ensure_parent(path)?;
    let file = File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
    let mut writer = BufWriter::new(file);
    write_tiff_stack_to(&mut writer, frames)
        .with_context(|| format!("Failed to write TIFF {:?}", path))?;
    writer.flush()?;

    info!("TIFF saved: {:?} ({} page(s))", path, frames.len());
    Ok(())
}

pub fn write_tiff_stack_to<W: Write + Seek>(writer: W, frames: &[Frame]) -> Result<()> {
    let mut encoder = TiffEncoder::new(writer)?;
    for frame in frames {
        let (width, height) = frame.dimensions();
        match frame {
            Frame::Rgb8(img) => {
                encoder.write_image::<colortype::RGB8>(width, height, img.as_raw())?
            }
            Frame::Gray8(img) => {
                encoder.write_image::<colortype::Gray8>(width, height, img.as_raw())?
            }
            Frame::Gray16(img) => {
                encoder.write_image::<colortype::Gray16>(width, height, img.as_raw())?
            }
        }
    }
    Ok(())
}
