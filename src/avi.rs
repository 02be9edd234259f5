//
// avi.rs
// Oct-Tools-rs
//
// Minimal Motion-JPEG AVI writer: RIFF/AVI headers, a `movi` list of JPEG chunks and an `idx1` index.
//
// Thales Matheus Mendonça Santos - October 2026

use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

use anyhow::{Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;

use crate::error::ConvertError;
use crate::paths::ensure_parent;

pub const DEFAULT_JPEG_QUALITY: u8 = 90;

// Byte length of everything before the first `movi` chunk.
const HEADER_LEN: u64 = 224;
const AVIF_HASINDEX: u32 = 0x10;
const AVIIF_KEYFRAME: u32 = 0x10;

struct IndexEntry {
    offset: u32,
    size: u32,
}

/// Streams RGB frames into an MJPEG AVI. Call [`AviWriter::finish`] to patch
/// the headers and append the index; dropping the writer leaves a truncated file.
pub struct AviWriter<W: Write + Seek> {
    inner: W,
    width: u32,
    height: u32,
    fps: u32,
    index: Vec<IndexEntry>,
    movi_len: u32,
    max_chunk: u32,
}

impl AviWriter<BufWriter<File>> {
    pub fn create(path: &Path, width: u32, height: u32, fps: u32) -> Result<Self> {
        ensure_parent(path)?;
        let file = File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
        Self::new(BufWriter::new(file), width, height, fps)
    }
}

impl<W: Write + Seek> AviWriter<W> {
    pub fn new(inner: W, width: u32, height: u32, fps: u32) -> Result<Self> {
        if fps == 0 {
            return Err(ConvertError::InvalidArgument("fps must be greater than zero".into()).into());
        }
        if width == 0 || height == 0 {
            return Err(ConvertError::InvalidArgument(format!(
                "video size {width}x{height} is empty"
            ))
            .into());
        }

        let mut writer = Self {
            inner,
            width,
            height,
            fps,
            index: Vec::new(),
            movi_len: 0,
            max_chunk: 0,
        };
        writer.write_headers(0)?;
        Ok(writer)
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn frame_count(&self) -> usize {
        self.index.len()
    }

    pub fn write_frame(&mut self, frame: &RgbImage) -> Result<()> {
        let (actual_width, actual_height) = frame.dimensions();
        if (actual_width, actual_height) != (self.width, self.height) {
            return Err(ConvertError::FrameSize {
                width: self.width,
                height: self.height,
                actual_width,
                actual_height,
            }
            .into());
        }

        let mut jpeg = Vec::new();
        JpegEncoder::new_with_quality(&mut jpeg, DEFAULT_JPEG_QUALITY)
            .encode_image(frame)
            .context("Failed to encode video frame")?;

        let size = jpeg.len() as u32;
        // Offsets in idx1 are relative to the `movi` fourcc.
        let offset = 4 + self.movi_len;
        self.inner.write_all(b"00dc")?;
        write_u32(&mut self.inner, size)?;
        self.inner.write_all(&jpeg)?;
        if size % 2 == 1 {
            self.inner.write_all(&[0])?;
        }

        self.movi_len += 8 + size + (size % 2);
        self.max_chunk = self.max_chunk.max(size);
        self.index.push(IndexEntry { offset, size });
        Ok(())
    }

    /// Append the index, rewrite the headers with final counts and hand back the sink.
    pub fn finish(mut self) -> Result<W> {
        self.inner.write_all(b"idx1")?;
        write_u32(&mut self.inner, (self.index.len() * 16) as u32)?;
        for entry in &self.index {
            self.inner.write_all(b"00dc")?;
            write_u32(&mut self.inner, AVIIF_KEYFRAME)?;
            write_u32(&mut self.inner, entry.offset)?;
            write_u32(&mut self.inner, entry.size)?;
        }

        let end = self.inner.stream_position()?;
        let riff_len = (end - 8) as u32;
        self.inner.seek(SeekFrom::Start(0))?;
        self.write_headers(riff_len)?;
        self.inner.seek(SeekFrom::Start(end))?;
        self.inner.flush()?;
        Ok(self.inner)
    }

    fn write_headers(&mut self, riff_len: u32) -> Result<()> {
        let frames = self.index.len() as u32;
        let micros_per_frame = 1_000_000 / self.fps;
        let buffer_size = self.max_chunk.max(self.width * self.height * 3);
        let w = &mut self.inner;

        w.write_all(b"RIFF")?;
        write_u32(w, riff_len)?;
        w.write_all(b"AVI ")?;

        w.write_all(b"LIST")?;
        write_u32(w, 192)?;
        w.write_all(b"hdrl")?;

        w.write_all(b"avih")?;
        write_u32(w, 56)?;
        write_u32(w, micros_per_frame)?;
        write_u32(w, self.max_chunk.saturating_mul(self.fps))?;
        write_u32(w, 0)?; // padding granularity
        write_u32(w, AVIF_HASINDEX)?;
        write_u32(w, frames)?;
        write_u32(w, 0)?; // initial frames
        write_u32(w, 1)?; // streams
        write_u32(w, buffer_size)?;
        write_u32(w, self.width)?;
        write_u32(w, self.height)?;
        w.write_all(&[0; 16])?;

        w.write_all(b"LIST")?;
        write_u32(w, 116)?;
        w.write_all(b"strl")?;

        w.write_all(b"strh")?;
        write_u32(w, 56)?;
        w.write_all(b"vids")?;
        w.write_all(b"MJPG")?;
        write_u32(w, 0)?; // flags
        w.write_all(&[0; 4])?; // priority, language
        write_u32(w, 0)?; // initial frames
        write_u32(w, 1)?; // scale
        write_u32(w, self.fps)?; // rate
        write_u32(w, 0)?; // start
        write_u32(w, frames)?;
        write_u32(w, buffer_size)?;
        write_u32(w, u32::MAX)?; // default quality
        write_u32(w, 0)?; // sample size
        w.write_all(&0u16.to_le_bytes())?;
        w.write_all(&0u16.to_le_bytes())?;
        w.write_all(&(self.width as u16).to_le_bytes())?;
        w.write_all(&(self.height as u16).to_le_bytes())?;

        w.write_all(b"strf")?;
        write_u32(w, 40)?;
        write_u32(w, 40)?;
        write_u32(w, self.width)?;
        write_u32(w, self.height)?;
        w.write_all(&1u16.to_le_bytes())?; // planes
        w.write_all(&24u16.to_le_bytes())?; // bit count
        w.write_all(b"MJPG")?;
        write_u32(w, self.width * self.height * 3)?;
        w.write_all(&[0; 16])?;

        w.write_all(b"LIST")?;
        write_u32(w, 4 + self.movi_len)?;
        w.write_all(b"movi")?;

        debug_assert_eq!(w.stream_position()?, HEADER_LEN);
        Ok(())
    }
}

fn write_u32<W: Write>(w: &mut W, value: u32) -> std::io::Result<()> {
    w.write_all(&value.to_le_bytes())
}
