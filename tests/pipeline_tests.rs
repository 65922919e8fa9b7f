use std::fs;
use std::path::Path;

use boxpile::export::{self, ExportOptions};
use boxpile::store;
use boxpile::{
    image_source, AnnotationRecord, BoundingBox, Error, ImageSize, LabeledObject, Workspace,
};

/// Fake encoded image bytes with a JPEG magic header; the store and
/// exporter treat image bytes as opaque.
const FAKE_JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46];

fn write_jpeg(path: &Path, width: u32, height: u32) {
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x * 37 % 251) as u8, (y * 91 % 251) as u8, 128])
    });
    img.save(path).unwrap();
}

fn test_record(image_id: &str, objects: Vec<LabeledObject>) -> AnnotationRecord {
    AnnotationRecord::new(
        image_id,
        ImageSize {
            height: 400,
            width: 200,
            depth: 3,
        },
        objects,
    )
}

fn cup_object() -> LabeledObject {
    LabeledObject {
        bndbox: BoundingBox {
            xmin: 10.0,
            xmax: 110.0,
            ymin: 20.0,
            ymax: 220.0,
        },
        name: "cup".to_string(),
        id: 1,
    }
}

#[test]
fn test_image_stream_filters_and_ids() {
    let dir = tempfile::tempdir().unwrap();
    write_jpeg(&dir.path().join("a.jpg"), 4, 4);
    write_jpeg(&dir.path().join("b.JPG"), 16, 16);
    write_jpeg(&dir.path().join("c.jpeg"), 32, 8);
    write_jpeg(&dir.path().join("skipped.png"), 4, 4);
    fs::write(dir.path().join("notes.txt"), "not an image").unwrap();

    let images: Vec<_> = image_source::stream(dir.path())
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(images.len(), 3);
    for image in &images {
        assert_eq!(image.id.len(), 8);
        assert!(image.id.chars().all(|c| c.is_ascii_digit()));
        assert_eq!(image.channel_depth, 3);
        assert_eq!(
            image.pixel_data.len(),
            (image.width * image.height * 3) as usize
        );
    }

    let mut ids: Vec<_> = images.iter().map(|i| i.id.clone()).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 3, "identifiers should be distinct");

    let mut dims: Vec<_> = images.iter().map(|i| (i.width, i.height)).collect();
    dims.sort();
    assert_eq!(dims, vec![(4, 4), (16, 16), (32, 8)]);
}

#[test]
fn test_image_stream_decode_failure_ends_stream() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("corrupt.jpg"), b"definitely not a jpeg").unwrap();

    let mut stream = image_source::stream(dir.path()).unwrap();
    match stream.next() {
        Some(Err(Error::ImageDecode { path, .. })) => {
            assert!(path.ends_with("corrupt.jpg"));
        }
        other => panic!("expected decode error, got {other:?}"),
    }
    // The stream is fused after the first error.
    assert!(stream.next().is_none());
}

#[test]
fn test_persist_stream_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let record = test_record("00000042", vec![cup_object()]);

    store::persist(dir.path(), &record, FAKE_JPEG).unwrap();

    assert!(dir.path().join("images/00000042.jpg").exists());
    assert!(dir.path().join("annotations/00000042.json").exists());

    let items: Vec<_> = store::stream(dir.path())
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].record, record);
    assert_eq!(items[0].image_bytes, FAKE_JPEG);
}

#[test]
fn test_stream_missing_paired_image() {
    let dir = tempfile::tempdir().unwrap();
    let record = test_record("00000007", vec![cup_object()]);
    store::persist(dir.path(), &record, FAKE_JPEG).unwrap();
    fs::remove_file(dir.path().join("images/00000007.jpg")).unwrap();

    let mut stream = store::stream(dir.path()).unwrap();
    match stream.next() {
        Some(Err(Error::MissingPairedImage { image_id, .. })) => {
            assert_eq!(image_id, "00000007");
        }
        other => panic!("expected missing paired image error, got {other:?}"),
    }
}

#[test]
fn test_store_handles_glob_metacharacters_in_path() {
    // --data_dir is user input; `[` and `*` in the path must not be
    // interpreted as pattern syntax.
    let base = tempfile::tempdir().unwrap();
    let dir = base.path().join("run [01] *final*");
    fs::create_dir_all(&dir).unwrap();

    let record = test_record("00000011", vec![cup_object()]);
    store::persist(&dir, &record, FAKE_JPEG).unwrap();

    let items: Vec<_> = store::stream(&dir).unwrap().collect::<Result<_, _>>().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].record, record);

    let summary = export::export(&dir, &ExportOptions { eval_fraction: None }).unwrap();
    assert_eq!(summary.total, 1);
}

#[test]
fn test_export_single_output() {
    let dir = tempfile::tempdir().unwrap();
    for i in 0..2 {
        let record = test_record(&format!("{:08}", i), vec![cup_object()]);
        store::persist(dir.path(), &record, FAKE_JPEG).unwrap();
    }

    let summary = export::export(dir.path(), &ExportOptions { eval_fraction: None }).unwrap();

    assert_eq!(summary.total, 2);
    assert_eq!(summary.train, 2);
    assert_eq!(summary.eval, 0);
    assert_eq!(summary.skipped, 0);

    let record_path = dir.path().join("data.record");
    assert!(record_path.exists());
    assert!(fs::metadata(record_path).unwrap().len() > 0);
}

#[test]
fn test_export_split_counts() {
    let dir = tempfile::tempdir().unwrap();
    let n = 200;
    for i in 0..n {
        let record = test_record(&format!("{:08}", i), vec![cup_object()]);
        store::persist(dir.path(), &record, FAKE_JPEG).unwrap();
    }

    let summary = export::export(
        dir.path(),
        &ExportOptions {
            eval_fraction: Some(0.5),
        },
    )
    .unwrap();

    assert_eq!(summary.total, n);
    assert_eq!(summary.train + summary.eval, summary.total);
    // Independent Bernoulli draws at 0.5; these bounds hold with
    // overwhelming probability for n = 200.
    assert!(summary.eval >= 40 && summary.eval <= 160, "eval = {}", summary.eval);

    assert!(dir.path().join("train.record").exists());
    assert!(dir.path().join("eval.record").exists());
}

#[test]
fn test_export_skips_missing_paired_image() {
    let dir = tempfile::tempdir().unwrap();
    store::persist(dir.path(), &test_record("00000001", vec![cup_object()]), FAKE_JPEG).unwrap();
    store::persist(dir.path(), &test_record("00000002", vec![cup_object()]), FAKE_JPEG).unwrap();
    fs::remove_file(dir.path().join("images/00000002.jpg")).unwrap();

    let summary = export::export(dir.path(), &ExportOptions { eval_fraction: None }).unwrap();

    assert_eq!(summary.total, 1);
    assert_eq!(summary.skipped, 1);
}

#[test]
fn test_export_aborts_on_malformed_annotation() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("annotations")).unwrap();
    fs::create_dir_all(dir.path().join("images")).unwrap();
    fs::write(dir.path().join("annotations/bad.json"), "{ not json").unwrap();

    let err = export::export(dir.path(), &ExportOptions { eval_fraction: None }).unwrap_err();
    match err {
        Error::PartialExport { written, source } => {
            assert_eq!(written, 0);
            assert!(matches!(*source, Error::MalformedAnnotation { .. }));
        }
        other => panic!("expected partial export error, got {other:?}"),
    }
    // The output opened before iteration exists and is validly closed.
    assert!(dir.path().join("data.record").exists());
}

#[test]
fn test_workspace_label_to_export_flow() {
    let image_dir = tempfile::tempdir().unwrap();
    let data_dir = tempfile::tempdir().unwrap();
    write_jpeg(&image_dir.path().join("shot.jpg"), 8, 8);

    let mut workspace = Workspace::new(image_dir.path(), data_dir.path());
    workspace
        .load_label_map("item { id: 1 name: 'cup' }")
        .unwrap();

    let image = workspace
        .scan_images()
        .unwrap()
        .next()
        .unwrap()
        .unwrap();
    let image_bytes = fs::read(&image.source_path).unwrap();

    let mut session = workspace.begin_session(&image).unwrap();
    session.place_corner(boxpile::Point::new(1.0, 1.0)).unwrap();
    session.place_corner(boxpile::Point::new(5.0, 6.0)).unwrap();
    let record = session.commit().unwrap();

    workspace.persist(&record, &image_bytes).unwrap();
    let summary = workspace
        .export(&ExportOptions { eval_fraction: None })
        .unwrap();

    assert_eq!(summary.total, 1);
    assert!(data_dir.path().join("data.record").exists());
}

#[test]
fn test_workspace_label_map_swapped_wholesale() {
    let mut workspace = Workspace::new("in", "out");
    workspace
        .load_label_map("item { id: 1 name: 'cup' } item { id: 2 name: 'bottle' }")
        .unwrap();
    assert_eq!(workspace.label_map().len(), 2);

    workspace
        .load_label_map("item { id: 5 name: 'plate' }")
        .unwrap();
    assert_eq!(workspace.label_map().len(), 1);
    assert_eq!(workspace.label_map().lookup(1), None);
    assert_eq!(workspace.label_map().lookup(5), Some("plate"));

    // A failed reload leaves the previous map intact.
    assert!(workspace.load_label_map("garbage").is_err());
    assert_eq!(workspace.label_map().lookup(5), Some("plate"));
}
