//
// frame.rs
// Oct-Tools-rs
//
// In-memory frame representation shared by readers and writers, plus the colour and intensity conversions they need.
//
// Thales Matheus Mendonça Santos - October 2026

use image::{imageops, DynamicImage, GrayImage, ImageBuffer, Luma, RgbImage};

pub type Gray16Image = ImageBuffer<Luma<u16>, Vec<u16>>;

/// A single decoded 2-D image ready to be written.
#[derive(Debug, Clone)]
pub enum Frame {
    Rgb8(RgbImage),
    Gray8(GrayImage),
    Gray16(Gray16Image),
}

impl Frame {
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Frame::Rgb8(img) => img.dimensions(),
            Frame::Gray8(img) => img.dimensions(),
            Frame::Gray16(img) => img.dimensions(),
        }
    }

    /// 8-bit RGB view used by video encoders; 16-bit grey is rescaled to 0..=255.
    pub fn to_rgb8(&self) -> RgbImage {
        match self {
            Frame::Rgb8(img) => img.clone(),
            Frame::Gray8(img) => DynamicImage::ImageLuma8(img.clone()).to_rgb8(),
            Frame::Gray16(img) => DynamicImage::ImageLuma16(img.clone()).to_rgb8(),
        }
    }

    pub fn into_dynamic(self) -> DynamicImage {
        match self {
            Frame::Rgb8(img) => DynamicImage::ImageRgb8(img),
            Frame::Gray8(img) => DynamicImage::ImageLuma8(img),
            Frame::Gray16(img) => DynamicImage::ImageLuma16(img),
        }
    }
}

impl From<DynamicImage> for Frame {
    fn from(image: DynamicImage) -> Self {
        match image {
            DynamicImage::ImageLuma8(img) => Frame::Gray8(img),
            DynamicImage::ImageLuma16(img) => Frame::Gray16(img),
            other => Frame::Rgb8(other.to_rgb8()),
        }
    }
}

/// Resize to `width`x`height` when the frame does not already match.
pub fn fit_to(image: RgbImage, width: u32, height: u32) -> RgbImage {
    if image.dimensions() == (width, height) {
        image
    } else {
        imageops::resize(&image, width, height, imageops::FilterType::Triangle)
    }
}

/// Full-range YCbCr (ITU-R BT.601) to RGB, as used by YBR_FULL and YBR_FULL_422.
pub fn ybr_full_to_rgb(y: u8, cb: u8, cr: u8) -> [u8; 3] {
    let y = f32::from(y);
    let cb = f32::from(cb) - 128.0;
    let cr = f32::from(cr) - 128.0;

    let r = y + 1.402 * cr;
    let g = y - 0.344_136 * cb - 0.714_136 * cr;
    let b = y + 1.772 * cb;

    [clamp_u8(r), clamp_u8(g), clamp_u8(b)]
}

fn clamp_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

/// Linear min-max stretch of `values` onto `0..=upper`, truncated to whole numbers.
/// A flat input maps to zeros.
pub fn min_max_stretch(values: &[f32], upper: f32) -> Vec<f32> {
    let (min, max) = values
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let range = max - min;
    if values.is_empty() || range <= f32::EPSILON {
        return vec![0.0; values.len()];
    }
    values
        .iter()
        .map(|&v| ((v - min) * upper / range).floor().clamp(0.0, upper))
        .collect()
}
