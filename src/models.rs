//
// models.rs
// Oct-Tools-rs
//
// Serializable summaries for header metadata and export results.
//
// Thales Matheus Mendonça Santos - October 2026

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Lightweight fields shown in CLI summaries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasicMetadata {
    pub patient_name: Option<String>,
    pub patient_id: Option<String>,
    pub study_date: Option<String>,
    pub modality: Option<String>,
    pub sop_class_uid: Option<String>,
    pub has_pixel_data: bool,
    pub transfer_syntax: Option<String>,
    pub rows: Option<u32>,
    pub columns: Option<u32>,
    pub number_of_frames: Option<u32>,
    pub samples_per_pixel: Option<u16>,
    pub photometric_interpretation: Option<String>,
}

/// Expanded, categorized metadata written next to exported images.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetailedMetadata {
    pub patient: BTreeMap<String, String>,
    pub study: BTreeMap<String, String>,
    pub series: BTreeMap<String, String>,
    pub image: BTreeMap<String, String>,
    pub misc: BTreeMap<String, String>,
}

/// What one vendor-file export produced.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportReport {
    pub source: PathBuf,
    pub output_dir: PathBuf,
    pub volumes: Vec<PathBuf>,
    pub fundus_images: Vec<PathBuf>,
    pub metadata: Option<PathBuf>,
}

/// Totals for a directory-wide export.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchSummary {
    pub exported: usize,
    pub failed: Vec<PathBuf>,
}
