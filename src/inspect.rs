//
// inspect.rs
// Oct-Tools-rs
//
// Single-file inspection: a header summary, an optional element dump with sequence recursion,
// and an optional colour-corrected render of one frame.
//
// Thales Matheus Mendonça Santos - October 2026

use std::fmt::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use dicom_core::dictionary::DataDictionary;
use dicom_core::value::Value;
use dicom_core::{PrimitiveValue, Tag};
use dicom_dictionary_std::StandardDataDictionary;
use dicom_object::{open_file, InMemDicomObject};
use image::ImageFormat;
use tracing::info;

use crate::dicom_frames::{read_frames, GrayDepth};
use crate::metadata::extract_basic_metadata;
use crate::source::save_still;

#[derive(Debug, Clone)]
pub struct InspectOptions {
    pub dump: bool,
    pub max_depth: usize,
    pub max_value_len: usize,
    pub render: Option<PathBuf>,
    pub frame: u32,
}

impl Default for InspectOptions {
    fn default() -> Self {
        Self {
            dump: false,
            max_depth: 4,
            max_value_len: 64,
            render: None,
            frame: 0,
        }
    }
}

pub fn inspect(path: &Path, options: &InspectOptions) -> Result<()> {
    println!("{}", summary_to_string(path)?);

    if options.dump {
        println!("{}", dump_to_string(path, options.max_depth, options.max_value_len)?);
    }

    if let Some(output) = &options.render {
        render_frame(path, options.frame, output)?;
    }
    Ok(())
}

pub fn summary_to_string(path: &Path) -> Result<String> {
    let obj = open_file(path).context("Failed to open DICOM file")?;
    let basic = extract_basic_metadata(&obj);
    let na = |v: &Option<String>| v.clone().unwrap_or_else(|| "N/A".to_string());

    let mut out = String::new();
    let _ = writeln!(out, "{}", "=".repeat(80));
    let _ = writeln!(out, "DICOM File: {}", path.display());
    let _ = writeln!(out, "{}", "=".repeat(80));
    let _ = writeln!(out, "Patient Name:      {}", na(&basic.patient_name));
    let _ = writeln!(out, "Patient ID:        {}", na(&basic.patient_id));
    let _ = writeln!(out, "Study Date:        {}", na(&basic.study_date));
    let _ = writeln!(out, "Modality:          {}", na(&basic.modality));
    let _ = writeln!(out, "SOP Class:         {}", na(&basic.sop_class_uid));
    let _ = writeln!(out, "Transfer Syntax:   {}", na(&basic.transfer_syntax));
    let _ = writeln!(
        out,
        "Samples per Pixel: {}",
        basic
            .samples_per_pixel
            .map_or_else(|| "N/A".to_string(), |v| v.to_string())
    );
    let _ = writeln!(out, "Photometric:       {}", na(&basic.photometric_interpretation));
    match (basic.columns, basic.rows) {
        (Some(c), Some(r)) => {
            let _ = writeln!(out, "Size:              {}x{}", c, r);
        }
        _ => {
            let _ = writeln!(out, "Size:              N/A");
        }
    }
    let _ = write!(
        out,
        "Frames:            {}",
        basic.number_of_frames.unwrap_or(0)
    );
    Ok(out)
}

/// Render frame `frame` of `path` with colour conversion applied.
pub fn render_frame(path: &Path, frame: u32, output: &Path) -> Result<()> {
    let mut frames = read_frames(path, GrayDepth::Sixteen)?;
    let count = frames.len();
    if frame as usize >= count {
        bail!("Requested frame {} but file has {} frame(s)", frame, count);
    }
    let format = ImageFormat::from_path(output).unwrap_or(ImageFormat::Png);
    save_still(&frames.swap_remove(frame as usize), output, format)?;
    info!("Frame {} rendered to {:?}", frame, output);
    Ok(())
}

pub fn dump_to_string(path: &Path, max_depth: usize, max_value_len: usize) -> Result<String> {
    let obj = open_file(path).context("Failed to open DICOM file")?;
    let mut out = String::new();
    dump_object(&obj, 0, max_depth, max_value_len, &mut out);
    Ok(out)
}

fn dump_object(
    obj: &InMemDicomObject<StandardDataDictionary>,
    depth: usize,
    max_depth: usize,
    max_value_len: usize,
    out: &mut String,
) {
    let indent = "  ".repeat(depth);
    for elem in obj.iter() {
        let header = elem.header();
        let line_start = format!("{indent}{} {} {}", tag_label(header.tag), keyword(header.tag), header.vr);

        match elem.value() {
            Value::Primitive(value) => {
                let _ = writeln!(out, "{} {}", line_start, preview(value, max_value_len));
            }
            Value::Sequence(seq) => {
                let _ = writeln!(out, "{} <{} item(s)>", line_start, seq.items().len());
                if depth >= max_depth {
                    continue;
                }
                for (i, item) in seq.items().iter().enumerate() {
                    let _ = writeln!(out, "{indent}  > item {}", i + 1);
                    dump_object(item, depth + 2, max_depth, max_value_len, out);
                }
            }
            Value::PixelSequence(pixels) => {
                let _ = writeln!(
                    out,
                    "{} <encapsulated, {} fragment(s)>",
                    line_start,
                    pixels.fragments().len()
                );
            }
        }
    }
}

fn preview(value: &PrimitiveValue, max_len: usize) -> String {
    if matches!(value, PrimitiveValue::U8(_) | PrimitiveValue::U16(_)) && value.multiplicity() > 16 {
        return format!("<{} bytes>", value.calculate_byte_len());
    }
    let text = value.to_str();
    if text.is_empty() {
        return format!("<{} bytes>", value.calculate_byte_len());
    }
    match text.char_indices().nth(max_len) {
        Some((cut, _)) => format!("{}…", &text[..cut]),
        None => text.into_owned(),
    }
}

fn tag_label(tag: Tag) -> String {
    format!("({:04X},{:04X})", tag.group(), tag.element())
}

fn keyword(tag: Tag) -> &'static str {
    StandardDataDictionary
        .by_tag(tag)
        .map(|entry| entry.alias)
        .unwrap_or("Unknown")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_truncates_on_char_boundary() {
        let value = PrimitiveValue::from("蔡司OCT^Patient");
        assert_eq!(preview(&value, 3), "蔡司O…");
        assert_eq!(preview(&value, 64), "蔡司OCT^Patient");
    }

    #[test]
    fn bulk_binary_is_summarized() {
        let value = PrimitiveValue::from(vec![0u8; 64]);
        assert_eq!(preview(&value, 10), "<64 bytes>");
    }

    #[test]
    fn labels_use_dictionary_keywords() {
        assert_eq!(tag_label(Tag(0x0010, 0x0010)), "(0010,0010)");
        assert_eq!(keyword(Tag(0x0010, 0x0010)), "PatientName");
    }
}
