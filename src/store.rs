use glob::glob;
use std::fs;
use std::path::{Path, PathBuf};

use crate::annotation::AnnotationRecord;
use crate::error::{Error, Result};

pub const IMAGES_SUBDIR: &str = "images";
pub const ANNOTATIONS_SUBDIR: &str = "annotations";

/// One fully materialized labeled image: the parsed annotation plus the raw
/// encoded bytes of its paired image file.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledImage {
    pub record: AnnotationRecord,
    pub image_bytes: Vec<u8>,
}

/// Persist one labeled image: the encoded image under `images/` and the
/// annotation document under `annotations/`, both keyed by the image id.
///
/// The image is written first, so a partial failure is detectable and
/// resumable: an image without an annotation is an orphan to re-label,
/// while an annotation is only durable once its image is.
pub fn persist(directory: &Path, record: &AnnotationRecord, image_bytes: &[u8]) -> Result<()> {
    let images_dir = directory.join(IMAGES_SUBDIR);
    let annotations_dir = directory.join(ANNOTATIONS_SUBDIR);
    fs::create_dir_all(&images_dir)?;
    fs::create_dir_all(&annotations_dir)?;

    let image_id = record.image_id();
    fs::write(images_dir.join(&record.file_name), image_bytes).map_err(|source| {
        Error::PartialPersist {
            image_id: image_id.to_string(),
            source,
        }
    })?;

    let document = serde_json::to_vec_pretty(record)?;
    fs::write(annotations_dir.join(format!("{image_id}.json")), document).map_err(|source| {
        Error::PartialPersist {
            image_id: image_id.to_string(),
            source,
        }
    })?;

    Ok(())
}

fn annotation_glob(directory: &Path) -> Result<glob::Paths> {
    // The directory comes from user input and may contain glob
    // metacharacters such as `[`; escape it so only `*.json` is a pattern.
    let annotations_dir = directory.join(ANNOTATIONS_SUBDIR);
    let pattern = format!(
        "{}/*.json",
        glob::Pattern::escape(&annotations_dir.to_string_lossy())
    );
    Ok(glob(&pattern)?)
}

/// Number of annotation documents currently in the store. Used to size
/// progress reporting before the lazy stream is consumed.
pub fn count(directory: &Path) -> Result<usize> {
    Ok(annotation_glob(directory)?
        .filter_map(|entry| entry.ok())
        .count())
}

fn load_labeled_image(images_dir: &Path, annotation_path: &Path) -> Result<LabeledImage> {
    let text = fs::read_to_string(annotation_path)?;
    let record: AnnotationRecord =
        serde_json::from_str(&text).map_err(|source| Error::MalformedAnnotation {
            path: annotation_path.to_path_buf(),
            source,
        })?;

    let image_path = images_dir.join(&record.file_name);
    if !image_path.exists() {
        return Err(Error::MissingPairedImage {
            image_id: record.image_id().to_string(),
            path: image_path,
        });
    }
    let image_bytes = fs::read(&image_path)?;

    Ok(LabeledImage {
        record,
        image_bytes,
    })
}

/// Lazy stream over every persisted annotation, paired with its image bytes.
///
/// Errors are yielded per item: a malformed document or missing paired image
/// surfaces as an `Err` carrying the offending identifier, and the consumer
/// decides whether to abort or continue.
pub fn stream(directory: &Path) -> Result<impl Iterator<Item = Result<LabeledImage>>> {
    let images_dir: PathBuf = directory.join(IMAGES_SUBDIR);
    Ok(annotation_glob(directory)?.map(move |entry| match entry {
        Ok(annotation_path) => load_labeled_image(&images_dir, &annotation_path),
        Err(e) => Err(Error::Io(e.into_error())),
    }))
}
