//
// dicom_series.rs
// Oct-Tools-rs
//
// Discovers the DICOM series in a folder, orders series and instances by their header fields,
// and exports the concatenated frames as a multi-page TIFF or an MJPEG AVI.
//
// Thales Matheus Mendonça Santos - October 2026

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use dicom_dictionary_std::tags;
use dicom_object::OpenFileOptions;
use serde::Serialize;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::avi::AviWriter;
use crate::dicom_access::ElementAccess;
use crate::dicom_frames::{read_frames, read_video_frames, GrayDepth};
use crate::error::ConvertError;
use crate::frame::fit_to;
use crate::tiff_stack::write_tiff_stack;

pub const DEFAULT_AVI_FPS: u32 = 3;
const DEFAULT_TIME: &str = "000000";
const MEDIA_STORAGE_DIRECTORY: &str = "1.2.840.10008.1.3.10";

/// Ordering fields of one instance, read without its pixel data.
#[derive(Debug, Clone, Serialize)]
pub struct InstanceHeader {
    pub path: PathBuf,
    pub series_uid: String,
    pub series_number: i32,
    pub series_time: String,
    pub instance_number: i32,
    pub acquisition_time: String,
    /// Number of Frames, 1 when absent.
    pub number_of_frames: u32,
}

impl InstanceHeader {
    pub fn read(path: &Path) -> Result<Self> {
        let obj = OpenFileOptions::new()
            .read_until(tags::PIXEL_DATA)
            .open_file(path)?;
        if obj.meta().media_storage_sop_class_uid.trim_end_matches('\0') == MEDIA_STORAGE_DIRECTORY {
            bail!("{:?} is a DICOMDIR", path);
        }

        Ok(InstanceHeader {
            path: path.to_path_buf(),
            series_uid: obj.element_str(tags::SERIES_INSTANCE_UID).unwrap_or_default(),
            series_number: obj.element_int(tags::SERIES_NUMBER).unwrap_or(0),
            series_time: obj
                .element_str(tags::SERIES_TIME)
                .unwrap_or_else(|| DEFAULT_TIME.to_string()),
            instance_number: obj.element_int(tags::INSTANCE_NUMBER).unwrap_or(0),
            acquisition_time: obj
                .element_str(tags::ACQUISITION_TIME)
                .unwrap_or_else(|| DEFAULT_TIME.to_string()),
            number_of_frames: obj
                .element_int(tags::NUMBER_OF_FRAMES)
                .and_then(|n| u32::try_from(n).ok())
                .filter(|&n| n > 0)
                .unwrap_or(1),
        })
    }

    fn series_key(&self) -> (i32, String) {
        (self.series_number, self.series_time.clone())
    }

    fn instance_key(&self) -> (i32, String) {
        (self.instance_number, self.acquisition_time.clone())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DicomSeries {
    pub uid: String,
    pub instances: Vec<InstanceHeader>,
}

/// Headers of every DICOM file directly inside `dir`, in path order. Other files are ignored.
pub fn scan_directory(dir: &Path) -> Result<Vec<InstanceHeader>> {
    let mut headers = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        match InstanceHeader::read(entry.path()) {
            Ok(header) => headers.push(header),
            Err(e) => debug!("Not a DICOM instance {:?}: {}", entry.path(), e),
        }
    }
    Ok(headers)
}

/// Group by Series Instance UID; series ordered by (number, time), instances by (number, acquisition time).
pub fn group_series(headers: Vec<InstanceHeader>) -> Vec<DicomSeries> {
    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut series: Vec<DicomSeries> = Vec::new();
    for header in headers {
        let slot = *slots.entry(header.series_uid.clone()).or_insert_with(|| {
            series.push(DicomSeries {
                uid: header.series_uid.clone(),
                instances: Vec::new(),
            });
            series.len() - 1
        });
        series[slot].instances.push(header);
    }

    for s in &mut series {
        s.instances.sort_by_key(InstanceHeader::instance_key);
    }
    // Instances are sorted by now; the first one in acquisition order carries the series key.
    series.sort_by_key(|s| s.instances.first().map(InstanceHeader::series_key));
    series
}

pub fn discover_series(dir: &Path) -> Result<Vec<DicomSeries>> {
    let series = group_series(scan_directory(dir)?);
    if series.is_empty() {
        return Err(ConvertError::NoSeries(dir.to_path_buf()).into());
    }

    info!("Found {} series in {:?}", series.len(), dir);
    for s in &series {
        info!("  Series {}: {} frame(s)", s.uid, s.instances.len());
    }
    Ok(series)
}

/// Every instance of every series, in acquisition order.
pub fn ordered_instances(dir: &Path) -> Result<Vec<InstanceHeader>> {
    let instances: Vec<InstanceHeader> = discover_series(dir)?
        .into_iter()
        .flat_map(|s| s.instances)
        .collect();
    info!(
        "Total: {} file(s), {} frame(s)",
        instances.len(),
        total_frames(&instances)
    );
    Ok(instances)
}

pub fn ordered_files(dir: &Path) -> Result<Vec<PathBuf>> {
    Ok(ordered_instances(dir)?.into_iter().map(|i| i.path).collect())
}

/// Frames across `instances`, as announced by their headers.
pub fn total_frames(instances: &[InstanceHeader]) -> usize {
    instances.iter().map(|i| i.number_of_frames as usize).sum()
}

/// Write the ordered series of `input_dir` as one multi-page TIFF. Returns the page count.
pub fn export_tiff(input_dir: &Path, output: &Path, depth: GrayDepth) -> Result<usize> {
    let files = ordered_files(input_dir)?;
    let mut pages = Vec::with_capacity(files.len());
    for (i, file) in files.iter().enumerate() {
        let frames = read_frames(file, depth)?;
        debug!("Frame {}/{}: {:?} ({} page(s))", i + 1, files.len(), file, frames.len());
        pages.extend(frames);
    }

    info!("Writing TIFF: {:?}", output);
    write_tiff_stack(output, &pages)?;
    Ok(pages.len())
}

/// Write the ordered series of `input_dir` as an MJPEG AVI sized after the first frame.
pub fn export_avi(input_dir: &Path, output: &Path, fps: u32) -> Result<usize> {
    let instances = ordered_instances(input_dir)?;
    let total = total_frames(&instances);
    let mut video: Option<AviWriter<_>> = None;
    let mut written = 0usize;

    for instance in &instances {
        for frame in read_video_frames(&instance.path)? {
            if video.is_none() {
                let (width, height) = frame.dimensions();
                info!("Writing video: {:?}", output);
                info!("Resolution: {}x{} | FPS: {}", width, height, fps);
                video = Some(AviWriter::create(output, width, height, fps)?);
            }
            let Some(writer) = video.as_mut() else {
                continue;
            };
            let (width, height) = writer.dimensions();
            writer.write_frame(&fit_to(frame, width, height))?;
            written += 1;
            if written % 10 == 0 {
                info!("  Written {}/{} frames", written, total);
            }
        }
    }

    match video {
        Some(writer) => {
            writer.finish()?;
            info!("AVI saved: {:?}", output);
            Ok(written)
        }
        None => Err(ConvertError::NoFrames {
            kind: "DICOM",
            dir: input_dir.to_path_buf(),
        }
        .into()),
    }
}
