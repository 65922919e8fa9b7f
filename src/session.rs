use crate::annotation::{AnnotationRecord, BoundingBox, ImageSize, LabeledObject, Point};
use crate::error::{Error, Result};
use crate::image_source::RawImage;
use crate::label_map::LabelMap;

/// Shapes the GUI layer should render for the current session state. The
/// platform adapter translates pointer/key events into session calls and
/// these intents into pixels; no drawing happens in the core.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawIntent {
    /// Crosshair guides following the pointer.
    Guides { cursor: Point },
    /// The in-progress rectangle between the anchored corner and the pointer.
    RubberBand { anchor: Point, cursor: Point },
    /// A committed object box.
    Object { bndbox: BoundingBox, class_id: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    /// One corner anchored, waiting for the second.
    Placing,
    /// Committed; the session accepts no further input.
    Finished,
}

/// The labeling state machine for one image.
///
/// Exactly one mutable object list per session, and sessions are strictly
/// sequential: one image in flight, no reentrancy. The session holds a
/// snapshot of the label map taken when it began, so a reload during
/// labeling cannot change the meaning of already-placed boxes.
#[derive(Debug, Clone)]
pub struct LabelSession {
    image_id: String,
    size: ImageSize,
    label_map: LabelMap,
    objects: Vec<LabeledObject>,
    anchor: Option<Point>,
    active_class: u32,
    finished: bool,
}

impl LabelSession {
    /// Start labeling one image. The active class defaults to the first
    /// label map entry, matching the initial selector state in a UI.
    pub fn new(image: &RawImage, label_map: LabelMap) -> Result<Self> {
        let (first_id, _) = label_map.iter().next().ok_or(Error::NoLabelMap)?;
        Ok(Self {
            image_id: image.id.clone(),
            size: ImageSize {
                height: image.height,
                width: image.width,
                depth: image.channel_depth,
            },
            label_map,
            objects: Vec::new(),
            anchor: None,
            active_class: first_id,
            finished: false,
        })
    }

    pub fn image_id(&self) -> &str {
        &self.image_id
    }

    pub fn state(&self) -> SessionState {
        if self.finished {
            SessionState::Finished
        } else if self.anchor.is_some() {
            SessionState::Placing
        } else {
            SessionState::Idle
        }
    }

    pub fn active_class(&self) -> u32 {
        self.active_class
    }

    pub fn objects(&self) -> &[LabeledObject] {
        &self.objects
    }

    fn ensure_open(&self) -> Result<()> {
        if self.finished {
            return Err(Error::SessionFinished(self.image_id.clone()));
        }
        Ok(())
    }

    /// Select the class new boxes will be labeled with. An id absent from
    /// the label map is rejected and the selection stays unchanged.
    /// Already-committed objects are never affected: their class was
    /// captured by value at box commit.
    pub fn set_active_class(&mut self, id: u32) -> Result<()> {
        if !self.label_map.contains(id) {
            return Err(Error::UnknownClassId(id));
        }
        self.active_class = id;
        Ok(())
    }

    /// Place one corner of a box. The first call anchors a corner; the
    /// second commits a box spanning the two points, normalized so the
    /// corner order never matters. Returns the committed object, if any.
    pub fn place_corner(&mut self, point: Point) -> Result<Option<&LabeledObject>> {
        self.ensure_open()?;
        match self.anchor.take() {
            None => {
                self.anchor = Some(point);
                Ok(None)
            }
            Some(anchor) => {
                let name = self
                    .label_map
                    .lookup(self.active_class)
                    .ok_or(Error::UnknownClassId(self.active_class))?
                    .to_string();
                self.objects.push(LabeledObject {
                    bndbox: BoundingBox::from_corners(anchor, point),
                    name,
                    id: self.active_class,
                });
                Ok(self.objects.last())
            }
        }
    }

    /// Drop the anchored corner without committing a box. No-op when no
    /// placement is in progress.
    pub fn cancel_placement(&mut self) {
        self.anchor = None;
    }

    /// Empty the object list, from any state.
    pub fn clear_all(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.anchor = None;
        self.objects.clear();
        Ok(())
    }

    /// Delete one committed object by its list index. Returns whether an
    /// object was removed.
    pub fn remove_object(&mut self, index: usize) -> Result<bool> {
        self.ensure_open()?;
        if index < self.objects.len() {
            self.objects.remove(index);
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Freeze the object list into an immutable [`AnnotationRecord`] and end
    /// the session. Every object's class id is re-checked against the label
    /// map before the record is created, so no record ever references an
    /// unknown class. A session has exactly one terminal commit: any later
    /// call fails with [`Error::SessionFinished`].
    pub fn commit(&mut self) -> Result<AnnotationRecord> {
        self.ensure_open()?;
        for object in &self.objects {
            if !self.label_map.contains(object.id) {
                return Err(Error::UnknownClassId(object.id));
            }
        }
        self.finished = true;
        self.anchor = None;
        Ok(AnnotationRecord::new(
            &self.image_id,
            self.size,
            self.objects.clone(),
        ))
    }

    /// What to draw right now: committed boxes, the rubber band while a
    /// placement is in progress, and crosshair guides at the cursor.
    pub fn draw_intents(&self, cursor: Option<Point>) -> Vec<DrawIntent> {
        let mut intents: Vec<DrawIntent> = self
            .objects
            .iter()
            .map(|object| DrawIntent::Object {
                bndbox: object.bndbox,
                class_id: object.id,
            })
            .collect();

        if self.finished {
            return intents;
        }
        if let Some(cursor) = cursor {
            if let Some(anchor) = self.anchor {
                intents.push(DrawIntent::RubberBand { anchor, cursor });
            }
            intents.push(DrawIntent::Guides { cursor });
        }
        intents
    }
}
