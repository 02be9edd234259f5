//
// dicom_source.rs
// Oct-Tools-rs
//
// Vendor DICOM exports (Zeiss OCT/FA/CFP) as an image source: multi-frame grayscale objects are
// OCT volumes, everything else is a fundus photograph.
//
// Thales Matheus Mendonça Santos - October 2026

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use dicom_dictionary_std::tags;
use dicom_object::{open_file, DefaultDicomObject};
use serde_json::{json, Value};

use crate::dicom_access::ElementAccess;
use crate::dicom_frames::{object_frames, GrayDepth};
use crate::frame::Frame;
use crate::json::header_json;
use crate::metadata::{extract_basic_metadata, extract_detailed_metadata};
use crate::source::{FundusImage, ImageSource, Laterality, OctVolume};

pub struct DicomSource {
    path: PathBuf,
    object: DefaultDicomObject,
}

impl DicomSource {
    pub fn open(path: &Path) -> Result<Self> {
        let object =
            open_file(path).with_context(|| format!("Failed to open DICOM file {:?}", path))?;
        Ok(Self {
            path: path.to_path_buf(),
            object,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn laterality(&self) -> Laterality {
        self.object
            .element_str(tags::IMAGE_LATERALITY)
            .or_else(|| self.object.element_str(tags::LATERALITY))
            .map(|code| Laterality::from_code(&code))
            .unwrap_or(Laterality::Unknown)
    }

    /// Grayscale objects with more than one frame hold B-scans.
    pub fn is_volume(&self) -> bool {
        let frames = self.object.element_int(tags::NUMBER_OF_FRAMES).unwrap_or(1);
        let samples = self.object.element_int(tags::SAMPLES_PER_PIXEL).unwrap_or(1);
        frames > 1 && samples == 1
    }

    fn pixel_spacing(&self) -> Option<[f64; 2]> {
        let spacing = self
            .object
            .element(tags::PIXEL_SPACING)
            .ok()?
            .to_multi_float64()
            .ok()?;
        match spacing.as_slice() {
            [row, column, ..] => Some([*row, *column]),
            _ => None,
        }
    }

    fn frames(&self) -> Result<Vec<Frame>> {
        if !self.object.has_element(tags::PIXEL_DATA) {
            return Ok(Vec::new());
        }
        object_frames(&self.object, GrayDepth::Sixteen)
            .with_context(|| format!("Failed to decode pixel data of {:?}", self.path))
    }
}

impl ImageSource for DicomSource {
    fn read_oct_volumes(&self) -> Result<Vec<OctVolume>> {
        if !self.is_volume() {
            return Ok(Vec::new());
        }
        Ok(vec![OctVolume {
            volume_id: "volume_0".to_string(),
            laterality: self.laterality(),
            slices: self.frames()?,
        }])
    }

    fn read_fundus_images(&self) -> Result<Vec<FundusImage>> {
        if self.is_volume() {
            return Ok(Vec::new());
        }
        let laterality = self.laterality();
        Ok(self
            .frames()?
            .into_iter()
            .enumerate()
            .map(|(i, image)| FundusImage {
                image_id: format!("image_{i}"),
                laterality,
                image,
            })
            .collect())
    }

    fn read_all_metadata(&self) -> Result<Value> {
        Ok(json!({
            "source": self.path,
            "summary": extract_basic_metadata(&self.object),
            "details": extract_detailed_metadata(&self.object),
            "laterality": self.laterality(),
            "pixel_spacing": self.pixel_spacing(),
            "dataset": header_json(&self.object)?,
        }))
    }
}
