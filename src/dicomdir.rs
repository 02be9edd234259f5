use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use dicom_dictionary_std::tags;
use dicom_object::{open_file, InMemDicomObject, StandardDataDictionary};
use serde::Serialize;

use crate::dicom_access::ElementAccess;
use crate::error::ConvertError;

/// One entry of a DICOMDIR Directory Record Sequence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirectoryRecord {
    pub record_type: String,
    /// Relative to the folder holding the DICOMDIR.
    pub referenced_file: Option<PathBuf>,
}

impl DirectoryRecord {
    pub fn is_image(&self) -> bool {
        self.record_type == "IMAGE"
    }
}

pub fn directory_records(
    obj: &InMemDicomObject<StandardDataDictionary>,
) -> Result<Vec<DirectoryRecord>, ConvertError> {
    let items = obj
        .element(tags::DIRECTORY_RECORD_SEQUENCE)
        .ok()
        .and_then(|e| e.items())
        .ok_or(ConvertError::MissingElement("DirectoryRecordSequence (0004,1220)"))?;

    Ok(items
        .iter()
        .map(|item| DirectoryRecord {
            record_type: item
                .element_str(tags::DIRECTORY_RECORD_TYPE)
                .unwrap_or_default(),
            referenced_file: item
                .element(tags::REFERENCED_FILE_ID)
                .ok()
                .and_then(|e| e.to_multi_str().ok())
                .map(|parts| parts.iter().map(|p| p.trim()).collect::<PathBuf>())
                .filter(|p| !p.as_os_str().is_empty()),
        })
        .collect())
}

pub fn read_dicomdir(path: &Path) -> Result<Vec<DirectoryRecord>> {
    let obj = open_file(path).with_context(|| format!("Failed to open DICOMDIR {:?}", path))?;
    Ok(directory_records(&obj)?)
}

pub fn print_records(path: &Path) -> Result<()> {
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    for record in read_dicomdir(path)? {
        println!("Type: {}", record.record_type);
        if let (true, Some(file)) = (record.is_image(), &record.referenced_file) {
            println!("File: {}", base.join(file).display());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dicom_core::value::DataSetSequence;
    use dicom_core::{dicom_value, DataElement, PrimitiveValue, VR};

    fn record(kind: &str, file: Option<&[&str]>) -> InMemDicomObject {
        let mut item = InMemDicomObject::new_empty();
        item.put(DataElement::new(
            tags::DIRECTORY_RECORD_TYPE,
            VR::CS,
            PrimitiveValue::from(kind),
        ));
        if let Some(parts) = file {
            let value = PrimitiveValue::Strs(parts.iter().map(|s| s.to_string()).collect());
            item.put(DataElement::new(tags::REFERENCED_FILE_ID, VR::CS, value));
        }
        item
    }

    #[test]
    fn records_carry_type_and_file_components() {
        let mut dir = InMemDicomObject::new_empty();
        dir.put(DataElement::new(
            tags::DIRECTORY_RECORD_SEQUENCE,
            VR::SQ,
            DataSetSequence::from(vec![
                record("PATIENT", None),
                record("IMAGE", Some(&["DATAFILES", "E195", "IM0001"])),
            ]),
        ));

        let records = directory_records(&dir).unwrap();
        assert_eq!(records.len(), 2);
        assert!(!records[0].is_image());
        assert_eq!(records[0].referenced_file, None);
        assert!(records[1].is_image());
        assert_eq!(
            records[1].referenced_file,
            Some(PathBuf::from("DATAFILES").join("E195").join("IM0001"))
        );
    }

    #[test]
    fn plain_dataset_is_not_a_dicomdir() {
        let mut obj = InMemDicomObject::new_empty();
        obj.put(DataElement::new(tags::MODALITY, VR::CS, dicom_value!(Str, "OPT")));
        assert!(matches!(
            directory_records(&obj),
            Err(ConvertError::MissingElement(_))
        ));
    }
}
