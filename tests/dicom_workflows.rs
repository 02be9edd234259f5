//
// dicom_workflows.rs
// Oct-Tools-rs
//
// Integration-style tests covering metadata extraction, series ordering, TIFF/AVI export, per-file export, BMP sequences and inspection.
//
// Thales Matheus Mendonça Santos - October 2026

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use dicom::core::{DataElement, PrimitiveValue, Tag, VR};
use dicom::dictionary_std::StandardDataDictionary;
use dicom::object::{FileDicomObject, FileMetaTableBuilder, InMemDicomObject};
use dicom::transfer_syntax::entries::EXPLICIT_VR_LITTLE_ENDIAN;
use image::{Rgb, RgbImage};
use oct_tools::dicom_frames::{self, GrayDepth};
use oct_tools::frame::Frame;
use oct_tools::{bmp_series, dicom_series, export, inspect, metadata};
use tiff::decoder::{Decoder, DecodingResult};
use tempfile::{tempdir, TempDir};

const SECONDARY_CAPTURE: &str = "1.2.840.10008.5.1.4.1.1.7";

struct Instance<'a> {
    sop_uid: &'a str,
    series_uid: &'a str,
    series_number: &'a str,
    instance_number: &'a str,
    rows: u16,
    columns: u16,
    frames: u32,
    samples: u16,
    planar: u16,
    photometric: &'a str,
    laterality: &'a str,
    pixels: Vec<u8>,
}

impl<'a> Instance<'a> {
    fn gray(sop_uid: &'a str, instance_number: &'a str, frames: u32) -> Self {
        Instance {
            sop_uid,
            series_uid: "1.2.826.0.1.3680043.2.1125.10",
            series_number: "1",
            instance_number,
            rows: 2,
            columns: 3,
            frames,
            samples: 1,
            planar: 0,
            photometric: "MONOCHROME2",
            laterality: "R",
            pixels: (0..6 * frames).map(|v| (v * 10) as u8).collect(),
        }
    }

    fn rgb(sop_uid: &'a str) -> Self {
        let mut pixels = Vec::new();
        for _ in 0..6 {
            pixels.extend_from_slice(&[200, 40, 10]);
        }
        Instance {
            sop_uid,
            series_uid: "1.2.826.0.1.3680043.2.1125.20",
            series_number: "2",
            instance_number: "1",
            rows: 2,
            columns: 3,
            frames: 1,
            samples: 3,
            planar: 0,
            photometric: "RGB",
            laterality: "L",
            pixels,
        }
    }

    /// Pixel `i` is `[10 * i, 100 + i, 250 - i]`, stored plane by plane.
    fn rgb_planar(sop_uid: &'a str) -> Self {
        let mut pixels: Vec<u8> = (0..6).map(|i| i * 10).collect();
        pixels.extend((0..6).map(|i| 100 + i));
        pixels.extend((0..6).map(|i| 250 - i));
        Instance {
            planar: 1,
            pixels,
            ..Instance::rgb(sop_uid)
        }
    }

    /// 2x2 native YBR_FULL_422: a grey pair on top, a red pair below.
    fn ybr_full_422(sop_uid: &'a str) -> Self {
        Instance {
            columns: 2,
            photometric: "YBR_FULL_422",
            pixels: vec![10, 200, 128, 128, 76, 76, 85, 255],
            ..Instance::rgb(sop_uid)
        }
    }
}

fn put(obj: &mut InMemDicomObject, tag: Tag, vr: VR, value: PrimitiveValue) {
    obj.put(DataElement::new(tag, vr, value));
}

fn write_instance(path: &Path, instance: &Instance) {
    // Construct a tiny Secondary Capture instance with predictable pixel values.
    let mut obj = InMemDicomObject::new_empty_with_dict(StandardDataDictionary);
    put(&mut obj, Tag(0x0010, 0x0010), VR::PN, PrimitiveValue::from("Test^Patient"));
    put(&mut obj, Tag(0x0010, 0x0020), VR::LO, PrimitiveValue::from("PAT123"));
    put(&mut obj, Tag(0x0008, 0x0060), VR::CS, PrimitiveValue::from("OPT"));
    put(&mut obj, Tag(0x0008, 0x0020), VR::DA, PrimitiveValue::from("20240101"));
    put(&mut obj, Tag(0x0008, 0x0016), VR::UI, PrimitiveValue::from(SECONDARY_CAPTURE));
    put(&mut obj, Tag(0x0008, 0x0018), VR::UI, PrimitiveValue::from(instance.sop_uid));
    put(&mut obj, Tag(0x0020, 0x000E), VR::UI, PrimitiveValue::from(instance.series_uid));
    put(&mut obj, Tag(0x0020, 0x0011), VR::IS, PrimitiveValue::from(instance.series_number));
    put(&mut obj, Tag(0x0020, 0x0013), VR::IS, PrimitiveValue::from(instance.instance_number));
    put(&mut obj, Tag(0x0020, 0x0062), VR::CS, PrimitiveValue::from(instance.laterality));

    put(&mut obj, Tag(0x0028, 0x0010), VR::US, PrimitiveValue::from(instance.rows)); // Rows
    put(&mut obj, Tag(0x0028, 0x0011), VR::US, PrimitiveValue::from(instance.columns)); // Columns
    put(&mut obj, Tag(0x0028, 0x0002), VR::US, PrimitiveValue::from(instance.samples));
    if instance.samples == 3 {
        put(&mut obj, Tag(0x0028, 0x0006), VR::US, PrimitiveValue::from(instance.planar)); // Planar Configuration
    }
    put(&mut obj, Tag(0x0028, 0x0100), VR::US, PrimitiveValue::from(8_u16)); // Bits Allocated
    put(&mut obj, Tag(0x0028, 0x0101), VR::US, PrimitiveValue::from(8_u16)); // Bits Stored
    put(&mut obj, Tag(0x0028, 0x0102), VR::US, PrimitiveValue::from(7_u16)); // High Bit
    put(&mut obj, Tag(0x0028, 0x0103), VR::US, PrimitiveValue::from(0_u16)); // Pixel Representation
    put(&mut obj, Tag(0x0028, 0x0004), VR::CS, PrimitiveValue::from(instance.photometric));
    put(
        &mut obj,
        Tag(0x0028, 0x0008),
        VR::IS,
        PrimitiveValue::from(instance.frames.to_string()),
    ); // Number of Frames
    put(&mut obj, Tag(0x0028, 0x0030), VR::DS, PrimitiveValue::from("0.0117\\0.0039"));
    put(&mut obj, Tag(0x7fe0, 0x0010), VR::OB, PrimitiveValue::from(instance.pixels.clone()));

    let meta = FileMetaTableBuilder::new()
        .transfer_syntax(EXPLICIT_VR_LITTLE_ENDIAN.uid())
        .media_storage_sop_class_uid(SECONDARY_CAPTURE)
        .media_storage_sop_instance_uid(instance.sop_uid)
        .build()
        .expect("meta");

    let mut file_obj = FileDicomObject::new_empty_with_dict_and_meta(StandardDataDictionary, meta);
    for elem in obj {
        file_obj.put(elem);
    }
    file_obj.write_to_file(path).expect("write test dicom");
}

fn build_volume() -> (TempDir, PathBuf) {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("macula.dcm");
    write_instance(&path, &Instance::gray("1.2.826.0.1.3680043.2.1125.1", "1", 4));
    (dir, path)
}

/// Bits per sample and samples of every page.
fn tiff_pages(path: &Path) -> Vec<(u8, Vec<u32>)> {
    let file = File::open(path).expect("open tiff");
    let mut decoder = Decoder::new(BufReader::new(file)).expect("tiff decoder");
    let mut pages = Vec::new();
    loop {
        let page = match decoder.read_image().expect("read page") {
            DecodingResult::U8(v) => (8, v.into_iter().map(u32::from).collect()),
            DecodingResult::U16(v) => (16, v.into_iter().map(u32::from).collect()),
            _ => panic!("unexpected TIFF sample format"),
        };
        pages.push(page);
        if !decoder.more_images() {
            break;
        }
        decoder.next_image().expect("next page");
    }
    pages
}

fn tiff_page_count(path: &Path) -> usize {
    tiff_pages(path).len()
}

fn rgb_frame(path: &Path) -> RgbImage {
    let mut frames = dicom_frames::read_frames(path, GrayDepth::Eight).expect("decode");
    assert_eq!(frames.len(), 1);
    match frames.remove(0) {
        Frame::Rgb8(img) => img,
        other => panic!("expected an RGB frame, got {:?}", other.dimensions()),
    }
}

fn avi_frame_count(path: &Path) -> u32 {
    // dwTotalFrames of the main AVI header.
    let bytes = std::fs::read(path).expect("read avi");
    assert_eq!(&bytes[0..4], b"RIFF");
    assert_eq!(&bytes[8..12], b"AVI ");
    u32::from_le_bytes([bytes[48], bytes[49], bytes[50], bytes[51]])
}

#[test]
fn basic_metadata_exposes_dimensions_and_frames() {
    let (_dir, path) = build_volume();

    let basic = metadata::read_basic_metadata(&path).expect("basic metadata");
    assert_eq!(basic.patient_name.as_deref(), Some("Test^Patient"));
    assert_eq!(basic.modality.as_deref(), Some("OPT"));
    assert!(basic.has_pixel_data);
    assert_eq!(basic.rows, Some(2));
    assert_eq!(basic.columns, Some(3));
    assert_eq!(basic.number_of_frames, Some(4));
    assert_eq!(basic.samples_per_pixel, Some(1));
    assert!(basic.transfer_syntax.is_some());
}

#[test]
fn series_are_ordered_by_instance_number() {
    let dir = tempdir().expect("tempdir");
    // File names sort opposite to the acquisition order.
    write_instance(
        &dir.path().join("a.dcm"),
        &Instance::gray("1.2.826.0.1.3680043.2.1125.3", "3", 1),
    );
    write_instance(
        &dir.path().join("b.dcm"),
        &Instance::gray("1.2.826.0.1.3680043.2.1125.2", "2", 1),
    );
    write_instance(
        &dir.path().join("c.dcm"),
        &Instance::gray("1.2.826.0.1.3680043.2.1125.1", "1", 1),
    );
    std::fs::write(dir.path().join("notes.txt"), b"not dicom").expect("write notes");

    let files = dicom_series::ordered_files(dir.path()).expect("ordered files");
    let names: Vec<_> = files
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, ["c.dcm", "b.dcm", "a.dcm"]);
}

#[test]
fn dicom_series_exports_tiff_and_avi() {
    let input = tempdir().expect("tempdir");
    write_instance(
        &input.path().join("1.dcm"),
        &Instance::gray("1.2.826.0.1.3680043.2.1125.1", "1", 1),
    );
    write_instance(
        &input.path().join("2.dcm"),
        &Instance::gray("1.2.826.0.1.3680043.2.1125.2", "2", 2),
    );
    let out = tempdir().expect("tempdir");
    let tiff_path = out.path().join("series.tiff");
    let avi_path = out.path().join("series.avi");

    let instances = dicom_series::ordered_instances(input.path()).expect("instances");
    assert_eq!(instances.len(), 2);
    assert_eq!(dicom_series::total_frames(&instances), 3);

    let pages = dicom_series::export_tiff(input.path(), &tiff_path, GrayDepth::Sixteen)
        .expect("tiff export");
    assert_eq!(pages, 3);
    assert_eq!(tiff_page_count(&tiff_path), 3);

    let frames = dicom_series::export_avi(input.path(), &avi_path, dicom_series::DEFAULT_AVI_FPS)
        .expect("avi export");
    assert_eq!(frames, 3);
    assert_eq!(avi_frame_count(&avi_path), 3);
}

#[test]
fn grayscale_pages_are_stretched_per_frame() {
    let input = tempdir().expect("tempdir");
    write_instance(
        &input.path().join("1.dcm"),
        &Instance::gray("1.2.826.0.1.3680043.2.1125.1", "1", 1),
    );
    let mut flat = Instance::gray("1.2.826.0.1.3680043.2.1125.2", "2", 1);
    flat.pixels = vec![77; 6];
    write_instance(&input.path().join("2.dcm"), &flat);
    let out = tempdir().expect("tempdir");

    let wide = out.path().join("wide.tiff");
    dicom_series::export_tiff(input.path(), &wide, GrayDepth::Sixteen).expect("16-bit export");
    let pages = tiff_pages(&wide);
    assert_eq!(pages.len(), 2);
    assert_eq!(pages[0], (16, vec![0, 13107, 26214, 39321, 52428, 65535]));
    assert_eq!(pages[1], (16, vec![0; 6]));

    let narrow = out.path().join("narrow.tiff");
    dicom_series::export_tiff(input.path(), &narrow, GrayDepth::Eight).expect("8-bit export");
    let pages = tiff_pages(&narrow);
    assert_eq!(pages[0], (8, vec![0, 51, 102, 153, 204, 255]));
    assert_eq!(pages[1], (8, vec![0; 6]));
}

#[test]
fn planar_rgb_is_interleaved() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("planar.dcm");
    write_instance(&path, &Instance::rgb_planar("1.2.826.0.1.3680043.2.1125.6"));

    let img = rgb_frame(&path);
    assert_eq!(img.dimensions(), (3, 2));
    for (i, pixel) in img.pixels().enumerate() {
        let i = i as u8;
        assert_eq!(pixel, &Rgb([i * 10, 100 + i, 250 - i]), "pixel {i}");
    }
}

#[test]
fn native_ybr_full_422_is_expanded_and_converted() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("ybr.dcm");
    write_instance(&path, &Instance::ybr_full_422("1.2.826.0.1.3680043.2.1125.7"));

    let img = rgb_frame(&path);
    assert_eq!(img.dimensions(), (2, 2));
    assert_eq!(img.get_pixel(0, 0), &Rgb([10, 10, 10]));
    assert_eq!(img.get_pixel(1, 0), &Rgb([200, 200, 200]));
    assert_eq!(img.get_pixel(0, 1), &Rgb([254, 0, 0]));
    assert_eq!(img.get_pixel(1, 1), &Rgb([254, 0, 0]));
}

#[test]
fn folder_without_dicom_reports_no_series() {
    let input = tempdir().expect("tempdir");
    std::fs::write(input.path().join("readme.txt"), b"empty").expect("write");
    let err = dicom_series::ordered_files(input.path()).unwrap_err();
    assert!(err.to_string().contains("No DICOM series"), "{err}");
}

#[test]
fn volume_export_writes_tiff_stack_and_metadata() {
    let (_dir, path) = build_volume();
    let root = tempdir().expect("tempdir");

    let report = export::export_dicom_file(&path, root.path()).expect("export");
    assert!(report.output_dir.starts_with(root.path()));
    assert!(report.output_dir.ends_with("macula"));
    assert!(report.fundus_images.is_empty());

    let tiff_path = report.output_dir.join("volume_0_OD.tiff");
    assert_eq!(report.volumes, vec![tiff_path.clone()]);
    assert_eq!(tiff_page_count(&tiff_path), 4);

    let meta_path = report.output_dir.join(export::METADATA_FILE);
    let meta: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&meta_path).expect("read metadata")).expect("json");
    assert_eq!(meta["laterality"], "OD");
    assert!(meta["pixel_spacing"].is_array());
    assert_eq!(meta["pixel_spacing"][0], serde_json::json!(0.0117));
}

#[test]
fn colour_photograph_exports_png() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("fundus.dcm");
    write_instance(&path, &Instance::rgb("1.2.826.0.1.3680043.2.1125.5"));
    let root = tempdir().expect("tempdir");

    let report = export::export_dicom_file(&path, root.path()).expect("export");
    assert!(report.volumes.is_empty());
    let png_path = report.output_dir.join("image_0_OS.png");
    assert_eq!(report.fundus_images, vec![png_path.clone()]);

    let png = image::open(&png_path).expect("open png").to_rgb8();
    assert_eq!(png.dimensions(), (3, 2));
    assert_eq!(png.get_pixel(1, 1), &Rgb([200, 40, 10]));
}

#[test]
fn batch_export_counts_failures() {
    let input = tempdir().expect("tempdir");
    write_instance(
        &input.path().join("good.dcm"),
        &Instance::gray("1.2.826.0.1.3680043.2.1125.1", "1", 2),
    );
    std::fs::write(input.path().join("broken.dcm"), b"not a dicom file").expect("write");
    let root = tempdir().expect("tempdir");

    let summary = export::export_directory(input.path(), root.path()).expect("batch");
    assert_eq!(summary.exported, 1);
    assert_eq!(summary.failed, vec![input.path().join("broken.dcm")]);
}

#[test]
fn bmp_sequence_follows_frame_numbers() {
    let input = tempdir().expect("tempdir");
    for (name, shade) in [("scan-F10.bmp", 30u8), ("scan-F2.bmp", 20), ("scan-F1.bmp", 10)] {
        RgbImage::from_pixel(8, 6, Rgb([shade, shade, shade]))
            .save(input.path().join(name))
            .expect("write bmp");
    }
    // Reference frame with a different size is fitted into the video.
    RgbImage::from_pixel(4, 4, Rgb([99, 0, 0]))
        .save(input.path().join("scan-RF.bmp"))
        .expect("write bmp");

    let out = tempdir().expect("tempdir");
    let options = bmp_series::BmpSeriesOptions {
        output_avi: out.path().join("seq/video.avi"),
        output_tiff: out.path().join("seq/stack.tiff"),
        fps: bmp_series::DEFAULT_FPS,
    };
    let report = bmp_series::convert(input.path(), &options).expect("convert");

    assert_eq!(report.frames_written, 4);
    assert!(report.skipped.is_empty());
    assert_eq!((report.width, report.height), (8, 6));
    assert_eq!(tiff_page_count(&options.output_tiff), 4);
    assert_eq!(avi_frame_count(&options.output_avi), 4);

    let files = bmp_series::list_bmp_files(input.path()).expect("list");
    let names: Vec<_> = files
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, ["scan-F1.bmp", "scan-F2.bmp", "scan-F10.bmp", "scan-RF.bmp"]);
}

#[test]
fn inspection_summarises_and_dumps_headers() {
    let (_dir, path) = build_volume();

    let summary = inspect::summary_to_string(&path).expect("summary");
    assert!(summary.contains("Test^Patient"));
    assert!(summary.contains("Size:              3x2"));
    assert!(summary.contains("Frames:            4"));

    let dump = inspect::dump_to_string(&path, 4, 64).expect("dump");
    assert!(dump.contains("(0010,0010) PatientName PN Test^Patient"));
    assert!(dump.contains("(7FE0,0010) PixelData OB <24 bytes>"));

    let out = tempdir().expect("tempdir");
    let render = out.path().join("frame.png");
    inspect::render_frame(&path, 3, &render).expect("render");
    assert_eq!(image::open(&render).expect("png").width(), 3);
    assert!(inspect::render_frame(&path, 4, &render).is_err());
}
