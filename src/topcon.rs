//
// topcon.rs
// Oct-Tools-rs
//
// Topcon study side files: the per-study XML index and the binary FILELIST whose readable
// strings carry FOCTARC exam records.
//
// Thales Matheus Mendonça Santos - October 2026

use std::fs;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8};
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Serialize;
use tracing::warn;

use crate::error::ConvertError;
use crate::source::Laterality;

pub const FOCTARC_MARKER: &str = "FOCTARC";
pub const DEFAULT_MIN_STRING_LEN: usize = 4;
const FOCTARC_FIELDS: usize = 15;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PatientInfo {
    pub id: Option<String>,
    pub last_name: Option<String>,
    pub first_name: Option<String>,
    pub sex: Option<String>,
    pub birth_date: Option<String>,
}

/// One `<Oct>` entry of a study XML.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OctStudyRecord {
    pub oct_no: Option<String>,
    pub patient: PatientInfo,
    pub dataset_id: Option<String>,
    pub session_id: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub scan_mode: Option<String>,
    /// `1` = left eye, `2` = right eye.
    pub lr_eye: Option<String>,
    pub scan_width: i64,
    pub scan_height: i64,
    pub scan_count: i64,
    pub real_scan_x: f64,
    pub real_scan_y: f64,
    pub retinal_iq: i64,
    pub choroidal_iq: i64,
    pub product: Option<String>,
}

impl OctStudyRecord {
    pub fn eye(&self) -> Laterality {
        match self.lr_eye.as_deref().map(str::trim) {
            Some("1") => Laterality::Left,
            Some("2") => Laterality::Right,
            _ => Laterality::Unknown,
        }
    }
}

#[derive(Debug, Default)]
struct XmlNode {
    name: String,
    attributes: Vec<(String, String)>,
    text: String,
    children: Vec<XmlNode>,
}

impl XmlNode {
    fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn find(&self, name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.name == name)
    }

    fn find_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlNode> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    fn text_of(&self, name: &str) -> Option<String> {
        self.find(name).map(|c| c.text.trim().to_string())
    }

    fn number_of<T: FromStr>(&self, name: &str) -> Result<T, ConvertError> {
        let text = self
            .text_of(name)
            .ok_or_else(|| ConvertError::Xml(format!("<{name}> is missing")))?;
        text.parse()
            .map_err(|_| ConvertError::Xml(format!("<{name}> is not a number: {text:?}")))
    }
}

fn xml_error(e: impl std::fmt::Display) -> ConvertError {
    ConvertError::Xml(e.to_string())
}

fn parse_tree(xml: &str) -> Result<XmlNode, ConvertError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<XmlNode> = Vec::new();
    let mut root: Option<XmlNode> = None;

    loop {
        let event = reader.read_event().map_err(xml_error)?;
        let (node, closes) = match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let mut node = XmlNode {
                    name: String::from_utf8_lossy(e.name().as_ref()).into_owned(),
                    ..XmlNode::default()
                };
                for attr in e.attributes() {
                    let attr = attr.map_err(xml_error)?;
                    node.attributes.push((
                        String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
                        attr.unescape_value().map_err(xml_error)?.into_owned(),
                    ));
                }
                (Some(node), matches!(event, Event::Empty(_)))
            }
            Event::Text(t) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&t.unescape().map_err(xml_error)?);
                }
                (None, false)
            }
            Event::CData(c) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
                (None, false)
            }
            Event::End(_) => (None, true),
            Event::Eof => break,
            _ => (None, false),
        };

        if let Some(node) = node {
            stack.push(node);
        }
        if closes {
            let finished = stack
                .pop()
                .ok_or_else(|| ConvertError::Xml("unbalanced closing tag".into()))?;
            match stack.last_mut() {
                Some(parent) => parent.children.push(finished),
                None => root = Some(finished),
            }
        }
    }

    if !stack.is_empty() {
        return Err(ConvertError::Xml(format!("<{}> is never closed", stack[stack.len() - 1].name)));
    }
    root.ok_or_else(|| ConvertError::Xml("document has no root element".into()))
}

/// Every `<Oct>` child of the document root.
pub fn parse_oct_xml(xml: &str) -> Result<Vec<OctStudyRecord>, ConvertError> {
    let root = parse_tree(xml)?;
    root.find_all("Oct")
        .map(|oct| {
            let patient = oct
                .find("Patient")
                .map(|p| PatientInfo {
                    id: p.text_of("ID"),
                    last_name: p.text_of("LastName"),
                    first_name: p.text_of("FirstName"),
                    sex: p.text_of("Sex"),
                    birth_date: p.text_of("BirthDate"),
                })
                .unwrap_or_default();

            Ok(OctStudyRecord {
                oct_no: oct.attribute("No").map(str::to_string),
                patient,
                dataset_id: oct.text_of("DatasetID"),
                session_id: oct.text_of("SessionID"),
                date: oct.text_of("Date"),
                time: oct.text_of("Time"),
                scan_mode: oct.text_of("ScanMode"),
                lr_eye: oct.text_of("LREye"),
                scan_width: oct.number_of("ScanWidth")?,
                scan_height: oct.number_of("ScanHeight")?,
                scan_count: oct.number_of("ScanCount")?,
                real_scan_x: oct.number_of("RealScanX")?,
                real_scan_y: oct.number_of("RealScanY")?,
                retinal_iq: oct.number_of("RetinalImageQuality")?,
                choroidal_iq: oct.number_of("ChoroidalImageQuality")?,
                product: oct.text_of("ProductName"),
            })
        })
        .collect()
}

/// Encoding named by `encoding="..."` in the XML declaration, if any.
fn declared_encoding(bytes: &[u8]) -> Option<&'static Encoding> {
    if !bytes.starts_with(b"<?xml") {
        return None;
    }
    let end = bytes.windows(2).position(|w| w == b"?>")?;
    let decl = String::from_utf8_lossy(&bytes[..end]);
    let start = decl.find("encoding")?;
    let rest = decl[start + "encoding".len()..].trim_start().strip_prefix('=')?.trim_start();
    let quote = rest.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let label = rest[1..].split(quote).next()?;
    Encoding::for_label(label.trim().as_bytes())
}

/// Decode study XML bytes: BOM first, then BOM-less UTF-16, then the declared encoding, else UTF-8.
pub fn decode_xml(bytes: &[u8]) -> Result<String, ConvertError> {
    let (encoding, skip) = if let Some(found) = Encoding::for_bom(bytes) {
        found
    } else if bytes.starts_with(&[b'<', 0, b'?', 0]) {
        (UTF_16LE, 0)
    } else if bytes.starts_with(&[0, b'<', 0, b'?']) {
        (UTF_16BE, 0)
    } else {
        // Only ASCII-compatible labels make sense once UTF-16 is ruled out.
        let declared = declared_encoding(bytes).filter(|e| e.is_ascii_compatible());
        (declared.unwrap_or(UTF_8), 0)
    };

    let (text, had_errors) = encoding.decode_without_bom_handling(&bytes[skip..]);
    if had_errors {
        return Err(ConvertError::Xml(format!("invalid {} text", encoding.name())));
    }
    Ok(text.into_owned())
}

pub fn read_oct_xml(path: &Path) -> Result<Vec<OctStudyRecord>> {
    let bytes = fs::read(path).with_context(|| format!("Failed to read {:?}", path))?;
    let xml = decode_xml(&bytes).with_context(|| format!("Failed to decode {:?}", path))?;
    parse_oct_xml(&xml).with_context(|| format!("Failed to parse {:?}", path))
}

/// Runs of printable ASCII (space to `~`) at least `min_len` bytes long.
pub fn extract_ascii_strings(data: &[u8], min_len: usize) -> Vec<String> {
    data.split(|b| !(32..=126).contains(b))
        .filter(|run| !run.is_empty() && run.len() >= min_len)
        .map(|run| String::from_utf8_lossy(run).into_owned())
        .collect()
}

/// Exam entry of a FILELIST, the 15 strings following a `FOCTARC` marker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FoctarcRecord {
    pub patient_id: String,
    pub birth_date: String,
    pub exam_patient_id: String,
    pub exam_date: String,
    pub start_time: String,
    pub end_time: String,
    pub exam_datetime: String,
    pub exam_id: String,
    pub scan_type: String,
    pub modality: String,
    pub acq_datetime: String,
    pub software_version: String,
    pub device_ip: String,
    pub dicom_version: String,
    pub device_model: String,
}

impl FoctarcRecord {
    fn from_fields(f: &[String]) -> Self {
        FoctarcRecord {
            patient_id: f[0].clone(),
            birth_date: f[1].clone(),
            exam_patient_id: f[2].clone(),
            exam_date: f[3].clone(),
            start_time: f[4].clone(),
            end_time: f[5].clone(),
            exam_datetime: f[6].clone(),
            exam_id: f[7].clone(),
            scan_type: f[8].clone(),
            modality: f[9].clone(),
            acq_datetime: f[10].clone(),
            software_version: f[11].clone(),
            device_ip: f[12].clone(),
            dicom_version: f[13].clone(),
            device_model: f[14].clone(),
        }
    }
}

pub fn parse_foctarc_strings(strings: &[String]) -> Vec<FoctarcRecord> {
    let mut records = Vec::new();
    let mut i = 0;
    while i < strings.len() {
        if strings[i] != FOCTARC_MARKER {
            i += 1;
            continue;
        }
        let fields = &strings[i + 1..];
        if fields.len() < FOCTARC_FIELDS {
            warn!(
                "Dropping truncated {} record: {} of {} fields",
                FOCTARC_MARKER,
                fields.len(),
                FOCTARC_FIELDS
            );
            break;
        }
        records.push(FoctarcRecord::from_fields(&fields[..FOCTARC_FIELDS]));
        i += 1 + FOCTARC_FIELDS;
    }
    records
}

/// Strings and FOCTARC records of a FILELIST binary.
pub fn read_filelist(path: &Path, min_len: usize) -> Result<(Vec<String>, Vec<FoctarcRecord>)> {
    let data = fs::read(path).with_context(|| format!("Failed to read {:?}", path))?;
    let strings = extract_ascii_strings(&data, min_len);
    let records = parse_foctarc_strings(&strings);
    Ok((strings, records))
}
