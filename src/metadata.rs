use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use dicom_core::Tag;
use dicom_dictionary_std::tags;
use dicom_object::{open_file, DefaultDicomObject};

use crate::dicom_access::ElementAccess;
use crate::models::{BasicMetadata, DetailedMetadata};

fn insert_if<T: ElementAccess>(map: &mut BTreeMap<String, String>, label: &str, obj: &T, tag: Tag) {
    if let Some(value) = obj.element_str(tag) {
        map.insert(label.to_string(), value);
    }
}

fn positive<T: TryFrom<i32>>(value: Option<i32>) -> Option<T> {
    value.and_then(|v| T::try_from(v).ok())
}

pub fn extract_basic_metadata<T: ElementAccess>(obj: &T) -> BasicMetadata {
    BasicMetadata {
        patient_name: obj.element_str(tags::PATIENT_NAME),
        patient_id: obj.element_str(tags::PATIENT_ID),
        study_date: obj.element_str(tags::STUDY_DATE),
        modality: obj.element_str(tags::MODALITY),
        sop_class_uid: obj.element_str(tags::SOP_CLASS_UID),
        has_pixel_data: obj.has_element(tags::PIXEL_DATA),
        transfer_syntax: obj.transfer_syntax(),
        rows: positive(obj.element_int(tags::ROWS)),
        columns: positive(obj.element_int(tags::COLUMNS)),
        // Single-frame objects usually omit Number of Frames.
        number_of_frames: positive(obj.element_int(tags::NUMBER_OF_FRAMES)).or_else(|| {
            obj.has_element(tags::PIXEL_DATA).then_some(1)
        }),
        samples_per_pixel: positive(obj.element_int(tags::SAMPLES_PER_PIXEL)),
        photometric_interpretation: obj.element_str(tags::PHOTOMETRIC_INTERPRETATION),
    }
}

pub fn extract_detailed_metadata<T: ElementAccess>(obj: &T) -> DetailedMetadata {
    let mut meta = DetailedMetadata::default();

    let patient = &mut meta.patient;
    insert_if(patient, "Name", obj, tags::PATIENT_NAME);
    insert_if(patient, "ID", obj, tags::PATIENT_ID);
    insert_if(patient, "Birth Date", obj, tags::PATIENT_BIRTH_DATE);
    insert_if(patient, "Sex", obj, tags::PATIENT_SEX);

    let study = &mut meta.study;
    insert_if(study, "Date", obj, tags::STUDY_DATE);
    insert_if(study, "Time", obj, tags::STUDY_TIME);
    insert_if(study, "Description", obj, tags::STUDY_DESCRIPTION);
    insert_if(study, "Accession Number", obj, tags::ACCESSION_NUMBER);
    insert_if(study, "Study Instance UID", obj, tags::STUDY_INSTANCE_UID);

    let series = &mut meta.series;
    insert_if(series, "Series Instance UID", obj, tags::SERIES_INSTANCE_UID);
    insert_if(series, "Series Number", obj, tags::SERIES_NUMBER);
    insert_if(series, "Series Time", obj, tags::SERIES_TIME);
    insert_if(series, "Series Description", obj, tags::SERIES_DESCRIPTION);
    insert_if(series, "Laterality", obj, tags::LATERALITY);
    insert_if(series, "Image Laterality", obj, tags::IMAGE_LATERALITY);

    let image = &mut meta.image;
    insert_if(image, "Modality", obj, tags::MODALITY);
    insert_if(image, "Rows", obj, tags::ROWS);
    insert_if(image, "Columns", obj, tags::COLUMNS);
    insert_if(image, "Number of Frames", obj, tags::NUMBER_OF_FRAMES);
    insert_if(image, "Samples per Pixel", obj, tags::SAMPLES_PER_PIXEL);
    insert_if(image, "Photometric Interpretation", obj, tags::PHOTOMETRIC_INTERPRETATION);
    insert_if(image, "Bits Allocated", obj, tags::BITS_ALLOCATED);
    insert_if(image, "Pixel Spacing", obj, tags::PIXEL_SPACING);
    insert_if(image, "Instance Number", obj, tags::INSTANCE_NUMBER);
    insert_if(image, "Acquisition Time", obj, tags::ACQUISITION_TIME);

    let misc = &mut meta.misc;
    insert_if(misc, "Manufacturer", obj, tags::MANUFACTURER);
    insert_if(misc, "Model Name", obj, tags::MANUFACTURER_MODEL_NAME);
    insert_if(misc, "Software Versions", obj, tags::SOFTWARE_VERSIONS);
    insert_if(misc, "SOP Class UID", obj, tags::SOP_CLASS_UID);
    insert_if(misc, "SOP Instance UID", obj, tags::SOP_INSTANCE_UID);
    if let Some(ts) = obj.transfer_syntax() {
        misc.insert("Transfer Syntax".to_string(), ts);
    }

    meta
}

pub fn read_basic_metadata(path: &Path) -> Result<BasicMetadata> {
    let obj: DefaultDicomObject = open_file(path).context("Failed to open DICOM file")?;
    Ok(extract_basic_metadata(&obj))
}
