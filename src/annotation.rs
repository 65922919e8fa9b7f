use serde::{Deserialize, Serialize};

/// A point in source image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle in image pixel coordinates.
///
/// Always built from the min/max of two corner points, so `xmin <= xmax`
/// and `ymin <= ymax` hold regardless of the order the corners were placed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub xmin: f64,
    pub xmax: f64,
    pub ymin: f64,
    pub ymax: f64,
}

impl BoundingBox {
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            xmin: a.x.min(b.x),
            xmax: a.x.max(b.x),
            ymin: a.y.min(b.y),
            ymax: a.y.max(b.y),
        }
    }

    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }
}

/// Pixel dimensions of an image as recorded in its annotation document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSize {
    pub height: u32,
    pub width: u32,
    pub depth: u8,
}

/// One labeled object: a bounding box plus the class it was labeled with.
///
/// The class name is denormalized (copied from the label map at label time)
/// so persisted annotations stay valid if the label map later changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledObject {
    pub bndbox: BoundingBox,
    pub name: String,
    pub id: u32,
}

/// The frozen annotation of one image, persisted as `annotations/<id>.json`
/// next to its paired image `images/<id>.jpg`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationRecord {
    /// Paired image file name, `<imageId>.jpg`.
    pub file_name: String,
    pub size: ImageSize,
    pub objects: Vec<LabeledObject>,
}

impl AnnotationRecord {
    pub fn new(image_id: &str, size: ImageSize, objects: Vec<LabeledObject>) -> Self {
        Self {
            file_name: format!("{image_id}.jpg"),
            size,
            objects,
        }
    }

    /// The shared identifier linking this record to its image file.
    pub fn image_id(&self) -> &str {
        self.file_name
            .rsplit_once('.')
            .map(|(stem, _)| stem)
            .unwrap_or(&self.file_name)
    }
}
