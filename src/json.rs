//
// json.rs
// Oct-Tools-rs
//
// DICOM JSON rendering of dataset headers and pretty UTF-8 JSON output for metadata dumps.
//
// Thales Matheus Mendonça Santos - October 2026

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use dicom_dictionary_std::tags;
use dicom_json::DicomJson;
use dicom_object::{InMemDicomObject, StandardDataDictionary};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::paths::ensure_parent;

/// DICOM JSON model of `obj` with the pixel data left out.
pub fn header_json(obj: &InMemDicomObject<StandardDataDictionary>) -> Result<Value> {
    let mut header = obj.clone();
    header.remove_element(tags::PIXEL_DATA);
    serde_json::to_value(DicomJson::from(&header)).context("Failed to serialize dataset to JSON")
}

/// Write `value` as indented JSON; non-ASCII text is kept as-is.
pub fn write_pretty<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    ensure_parent(path)?;
    let text = serde_json::to_string_pretty(value).context("Failed to serialize to JSON")?;
    fs::write(path, text).with_context(|| format!("Failed to write JSON to {:?}", path))?;
    info!("Metadata saved: {:?}", path);
    Ok(())
}
