//
// lib.rs
// Oct-Tools-rs
//
// Exposes the crate's modules and re-exports the CLI entry point for both binary and library consumers.
//
// Thales Matheus Mendonça Santos - October 2026

// Public surface of the library: each module mirrors a CLI verb or shared utility.
pub mod avi;
pub mod bmp_series;
pub mod cli;
pub mod dicom_access;
pub mod dicom_frames;
pub mod dicom_series;
pub mod dicom_source;
pub mod dicomdir;
pub mod error;
pub mod export;
pub mod frame;
pub mod frame_order;
pub mod inspect;
pub mod json;
pub mod metadata;
pub mod models;
pub mod paths;
pub mod source;
pub mod tiff_stack;
pub mod topcon;
pub mod tree;

pub use cli::{run as run_cli, Cli, Commands};
pub use error::ConvertError;
