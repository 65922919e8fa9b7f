use std::path::{Path, PathBuf};

use crate::annotation::AnnotationRecord;
use crate::error::Result;
use crate::export::{self, ExportOptions, ExportSummary};
use crate::image_source::{self, ImageStream, RawImage};
use crate::label_map::LabelMap;
use crate::session::LabelSession;
use crate::store;

/// The explicitly owned labeling context: the active label map and the
/// active directories, passed around instead of living in globals.
///
/// `image_dir` is where unlabeled source images are picked up;
/// `data_dir` holds the persisted store (`images/`, `annotations/`) and
/// receives the exported record files.
#[derive(Debug, Clone, Default)]
pub struct Workspace {
    label_map: LabelMap,
    image_dir: PathBuf,
    data_dir: PathBuf,
}

impl Workspace {
    pub fn new(image_dir: impl Into<PathBuf>, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            label_map: LabelMap::default(),
            image_dir: image_dir.into(),
            data_dir: data_dir.into(),
        }
    }

    /// Replace the active label map wholesale. Readers never observe a
    /// partial update; previous contents are discarded in one swap.
    pub fn load_label_map(&mut self, text: &str) -> Result<usize> {
        let map = LabelMap::load(text)?;
        let count = map.len();
        self.label_map = map;
        Ok(count)
    }

    pub fn load_label_map_file(&mut self, path: &Path) -> Result<usize> {
        let map = LabelMap::load_file(path)?;
        let count = map.len();
        self.label_map = map;
        Ok(count)
    }

    pub fn label_map(&self) -> &LabelMap {
        &self.label_map
    }

    pub fn image_dir(&self) -> &Path {
        &self.image_dir
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Lazy stream of decoded source images awaiting labeling.
    pub fn scan_images(&self) -> Result<ImageStream> {
        image_source::stream(&self.image_dir)
    }

    /// Begin the labeling session for one image. The session snapshots the
    /// current label map; only one session should be in flight at a time.
    pub fn begin_session(&self, image: &RawImage) -> Result<LabelSession> {
        LabelSession::new(image, self.label_map.clone())
    }

    /// Persist a committed annotation and its image bytes into the store.
    pub fn persist(&self, record: &AnnotationRecord, image_bytes: &[u8]) -> Result<()> {
        store::persist(&self.data_dir, record, image_bytes)
    }

    /// Export every persisted annotation into TFRecord files.
    pub fn export(&self, options: &ExportOptions) -> Result<ExportSummary> {
        export::export(&self.data_dir, options)
    }
}
