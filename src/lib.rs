//! Bounding-box annotation dataset pipeline
//!
//! This library turns a directory of images into labeled training data:
//! a lazy image source with deterministic identifiers, a per-image labeling
//! state machine, a persisted annotation store, and a TFRecord exporter
//! with a random train/eval split.

pub mod annotation;
pub mod config;
pub mod error;
pub mod export;
pub mod image_source;
pub mod label_map;
pub mod session;
pub mod store;
pub mod utils;
pub mod workspace;

// Re-export commonly used types and functions
pub use annotation::{AnnotationRecord, BoundingBox, ImageSize, LabeledObject, Point};
pub use config::Args;
pub use error::{Error, Result};
pub use export::{build_example, ExportOptions, ExportSummary};
pub use image_source::RawImage;
pub use label_map::LabelMap;
pub use session::{DrawIntent, LabelSession, SessionState};
pub use store::LabeledImage;
pub use workspace::Workspace;
