//
// dicom_frames.rs
// Oct-Tools-rs
//
// Turns decoded DICOM pixel data into writable frames: colour data is re-interleaved and converted
// from YBR to RGB, grayscale data is min-max stretched to 8 or 16 bits.
//
// Thales Matheus Mendonça Santos - October 2026

use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use dicom_core::value::Value;
use dicom_dictionary_std::tags;
use dicom_object::{open_file, DefaultDicomObject};
use dicom_pixeldata::{ConvertOptions, DecodedPixelData, ModalityLutOption, PixelDecoder, VoiLutOption};
use image::{GrayImage, RgbImage};
use ndarray::s;

use crate::dicom_access::ElementAccess;
use crate::frame::{min_max_stretch, ybr_full_to_rgb, Frame, Gray16Image};

/// Output depth for grayscale frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrayDepth {
    Eight,
    Sixteen,
}

impl GrayDepth {
    pub fn from_keep_16bit(keep_16bit: bool) -> Self {
        if keep_16bit {
            GrayDepth::Sixteen
        } else {
            GrayDepth::Eight
        }
    }
}

/// Layout facts that come from the dataset rather than the decoded buffer.
#[derive(Debug, Clone, Copy, Default)]
pub struct SampleLayout {
    /// Colour planes stored one after another (Planar Configuration 1).
    pub planar: bool,
}

impl SampleLayout {
    pub fn of(obj: &DefaultDicomObject) -> Self {
        // Codecs hand back interleaved samples, so only native data can be planar.
        let encapsulated = obj
            .element(tags::PIXEL_DATA)
            .map(|e| matches!(e.value(), Value::PixelSequence(_)))
            .unwrap_or(false);
        SampleLayout {
            planar: !encapsulated && obj.element_int(tags::PLANAR_CONFIGURATION) == Some(1),
        }
    }
}

pub fn read_frames(path: &Path, depth: GrayDepth) -> Result<Vec<Frame>> {
    let obj = open_file(path).with_context(|| format!("Failed to open DICOM file {:?}", path))?;
    object_frames(&obj, depth).with_context(|| format!("Failed to decode pixel data of {:?}", path))
}

/// Frames of `path` as 8-bit RGB, the layout video encoders expect.
pub fn read_video_frames(path: &Path) -> Result<Vec<RgbImage>> {
    Ok(read_frames(path, GrayDepth::Eight)?
        .iter()
        .map(Frame::to_rgb8)
        .collect())
}

pub fn object_frames(obj: &DefaultDicomObject, depth: GrayDepth) -> Result<Vec<Frame>> {
    let decoded = obj.decode_pixel_data()?;
    decoded_frames(&decoded, SampleLayout::of(obj), depth)
}

pub fn decoded_frames(
    decoded: &DecodedPixelData<'_>,
    layout: SampleLayout,
    depth: GrayDepth,
) -> Result<Vec<Frame>> {
    match decoded.samples_per_pixel() {
        1 => gray_frames(decoded, depth),
        3 => color_frames(decoded, layout),
        n => bail!("Unsupported samples per pixel: {}", n),
    }
}

fn gray_frames(decoded: &DecodedPixelData<'_>, depth: GrayDepth) -> Result<Vec<Frame>> {
    let (rows, columns) = (decoded.rows(), decoded.columns());
    // Raw stored values; the stretch below replaces any LUT.
    let options = ConvertOptions::new()
        .with_modality_lut(ModalityLutOption::None)
        .with_voi_lut(VoiLutOption::Identity);
    let volume = decoded
        .to_ndarray_with_options::<f32>(&options)
        .context("Failed to convert pixel data")?;

    let mut frames = Vec::with_capacity(volume.shape()[0]);
    for f in 0..volume.shape()[0] {
        let values: Vec<f32> = volume.slice(s![f, .., .., 0]).iter().copied().collect();
        let frame = match depth {
            GrayDepth::Sixteen => {
                let data = min_max_stretch(&values, 65535.0)
                    .into_iter()
                    .map(|v| v as u16)
                    .collect();
                Frame::Gray16(
                    Gray16Image::from_raw(columns, rows, data)
                        .ok_or_else(|| anyhow!("Frame {} does not match {}x{}", f, columns, rows))?,
                )
            }
            GrayDepth::Eight => {
                let data = min_max_stretch(&values, 255.0)
                    .into_iter()
                    .map(|v| v as u8)
                    .collect();
                Frame::Gray8(
                    GrayImage::from_raw(columns, rows, data)
                        .ok_or_else(|| anyhow!("Frame {} does not match {}x{}", f, columns, rows))?,
                )
            }
        };
        frames.push(frame);
    }
    Ok(frames)
}

fn color_frames(decoded: &DecodedPixelData<'_>, layout: SampleLayout) -> Result<Vec<Frame>> {
    if decoded.bits_allocated() != 8 {
        bail!(
            "Unsupported colour depth: {} bits allocated",
            decoded.bits_allocated()
        );
    }

    let (rows, columns) = (decoded.rows(), decoded.columns());
    let pixels = rows as usize * columns as usize;
    let frame_count = decoded.number_of_frames() as usize;
    let photometric = decoded.photometric_interpretation().as_str().to_string();
    let data = decoded.data();

    // Native YBR_FULL_422 keeps two lumas per chroma pair.
    let subsampled = photometric == "YBR_FULL_422" && data.len() == frame_count * pixels * 2;
    let frame_len = if subsampled { pixels * 2 } else { pixels * 3 };
    if frame_count == 0 || data.len() < frame_count * frame_len {
        bail!(
            "Pixel data holds {} bytes, expected {} frame(s) of {}",
            data.len(),
            frame_count,
            frame_len
        );
    }

    data.chunks_exact(frame_len)
        .take(frame_count)
        .enumerate()
        .map(|(f, chunk)| {
            let mut rgb = if subsampled {
                expand_ybr_422(chunk)
            } else if layout.planar {
                interleave_planes(chunk, pixels)
            } else {
                chunk.to_vec()
            };
            if photometric.starts_with("YBR") {
                for px in rgb.chunks_exact_mut(3) {
                    px.copy_from_slice(&ybr_full_to_rgb(px[0], px[1], px[2]));
                }
            }
            RgbImage::from_raw(columns, rows, rgb)
                .map(Frame::Rgb8)
                .ok_or_else(|| anyhow!("Frame {} does not match {}x{}", f, columns, rows))
        })
        .collect()
}

/// `RRR..GGG..BBB..` to `RGBRGB..`.
pub fn interleave_planes(chunk: &[u8], pixels: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(pixels * 3);
    for i in 0..pixels {
        out.extend_from_slice(&[chunk[i], chunk[pixels + i], chunk[2 * pixels + i]]);
    }
    out
}

/// `Y1 Y2 Cb Cr` groups to two full `Y Cb Cr` pixels.
pub fn expand_ybr_422(chunk: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(chunk.len() / 2 * 3);
    for group in chunk.chunks_exact(4) {
        let (cb, cr) = (group[2], group[3]);
        out.extend_from_slice(&[group[0], cb, cr, group[1], cb, cr]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn planes_are_interleaved() {
        let planar = [1, 2, 10, 20, 100, 200];
        assert_eq!(interleave_planes(&planar, 2), vec![1, 10, 100, 2, 20, 200]);
    }

    #[test]
    fn subsampled_chroma_is_shared_by_pixel_pair() {
        let packed = [50, 60, 128, 140];
        assert_eq!(expand_ybr_422(&packed), vec![50, 128, 140, 60, 128, 140]);
    }

    #[test]
    fn depth_follows_flag() {
        assert_eq!(GrayDepth::from_keep_16bit(true), GrayDepth::Sixteen);
        assert_eq!(GrayDepth::from_keep_16bit(false), GrayDepth::Eight);
    }
}
