//
// error.rs
// Oct-Tools-rs
//
// Domain errors raised by the converters when inputs are empty, inconsistent, or unsupported.
//
// Thales Matheus Mendonça Santos - October 2026

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("No {kind} frames found in {}", dir.display())]
    NoFrames { kind: &'static str, dir: PathBuf },

    #[error("No DICOM series found in {}", .0.display())]
    NoSeries(PathBuf),

    #[error("Failed to read first frame {}: {reason}", path.display())]
    UnreadableFirstFrame { path: PathBuf, reason: String },

    #[error("Frame is {actual_width}x{actual_height}, writer expects {width}x{height}")]
    FrameSize {
        width: u32,
        height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    #[error("Unsupported output format: {0:?}")]
    UnsupportedFormat(String),

    #[error("Missing element {0}")]
    MissingElement(&'static str),

    #[error("Malformed study XML: {0}")]
    Xml(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}
