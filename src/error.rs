use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors surfaced by the labeling and export pipeline.
#[derive(Debug, Error)]
pub enum Error {
    /// The label map text contained no parseable `item { id: ... name: '...' }` entries.
    #[error("no label entries found in label map text")]
    MalformedLabelMap,

    /// A file matched the image extension filter but could not be decoded.
    #[error("failed to decode image {path}: {source}")]
    ImageDecode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// An annotation document exists without its paired image file.
    #[error("annotation {image_id} has no paired image at {path}")]
    MissingPairedImage { image_id: String, path: PathBuf },

    /// An annotation document could not be parsed.
    #[error("malformed annotation document {path}: {source}")]
    MalformedAnnotation {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A class id was used that the active label map does not contain.
    #[error("class id {0} is not present in the active label map")]
    UnknownClassId(u32),

    /// A labeling session cannot begin without a loaded label map.
    #[error("no label map loaded")]
    NoLabelMap,

    /// The session was already committed; it accepts no further input.
    #[error("session for image {0} is already committed")]
    SessionFinished(String),

    /// Persisting one image was interrupted; the image and its annotation
    /// may be out of step on disk.
    #[error("persist of image {image_id} interrupted: {source}")]
    PartialPersist {
        image_id: String,
        #[source]
        source: std::io::Error,
    },

    /// Export stopped midway. Everything written before the failure is
    /// durable; `written` is the exact number of examples flushed.
    #[error("export interrupted after {written} examples were written: {source}")]
    PartialExport {
        written: usize,
        #[source]
        source: Box<Error>,
    },

    /// The store directory could not be turned into an annotation listing.
    #[error("invalid annotation listing pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("record write failed: {0}")]
    Record(#[from] tfrecord::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
