use log::{info, warn};
use rand::rngs::ThreadRng;
use rand::Rng;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tfrecord::{Example, ExampleWriter, Feature};

use crate::annotation::AnnotationRecord;
use crate::error::{Error, Result};
use crate::store::{self, LabeledImage};
use crate::utils::{create_progress_bar, infer_image_format};

pub const TRAIN_RECORD: &str = "train.record";
pub const EVAL_RECORD: &str = "eval.record";
pub const DATA_RECORD: &str = "data.record";

/// How exported examples are routed to record files.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExportOptions {
    /// Probability that an example lands in `eval.record`. `None` writes
    /// everything to a single `data.record`. Each example is routed by an
    /// independent random draw, so repeated runs over the same input
    /// produce different partitions; that is the documented behavior.
    pub eval_fraction: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportSummary {
    /// Examples written across all outputs; always `train + eval`.
    pub total: usize,
    /// Examples in `train.record` (or in `data.record` when not splitting).
    pub train: usize,
    pub eval: usize,
    /// Annotations skipped because their paired image was missing.
    pub skipped: usize,
}

impl ExportSummary {
    pub fn print_summary(&self) {
        info!("{} images processed", self.total);
        info!("{} training images", self.train);
        info!("{} eval images", self.eval);
        if self.skipped > 0 {
            warn!(
                "{} annotations skipped (missing paired image)",
                self.skipped
            );
        }
    }
}

/// Flatten one labeled image into a training example: normalized box
/// coordinates, encoded image bytes, and parallel class arrays. Index i of
/// every object array refers to the same object.
pub fn build_example(record: &AnnotationRecord, image_bytes: &[u8]) -> Example {
    // Normalize by the image's own dimensions, never a global or padded size.
    let width = record.size.width as f64;
    let height = record.size.height as f64;
    let xmins: Vec<f32> = record
        .objects
        .iter()
        .map(|o| (o.bndbox.xmin / width) as f32)
        .collect();
    let xmaxs: Vec<f32> = record
        .objects
        .iter()
        .map(|o| (o.bndbox.xmax / width) as f32)
        .collect();
    let ymins: Vec<f32> = record
        .objects
        .iter()
        .map(|o| (o.bndbox.ymin / height) as f32)
        .collect();
    let ymaxs: Vec<f32> = record
        .objects
        .iter()
        .map(|o| (o.bndbox.ymax / height) as f32)
        .collect();
    let names: Vec<Vec<u8>> = record
        .objects
        .iter()
        .map(|o| o.name.clone().into_bytes())
        .collect();
    let ids: Vec<i64> = record.objects.iter().map(|o| o.id as i64).collect();
    let file_name = record.file_name.clone().into_bytes();

    vec![
        (
            "image/height".into(),
            Feature::from_i64_iter([record.size.height as i64]),
        ),
        (
            "image/width".into(),
            Feature::from_i64_iter([record.size.width as i64]),
        ),
        (
            "image/filename".into(),
            Feature::from_bytes_iter([file_name.clone()]),
        ),
        (
            "image/source_id".into(),
            Feature::from_bytes_iter([file_name]),
        ),
        (
            "image/encoded".into(),
            Feature::from_bytes_iter([image_bytes.to_vec()]),
        ),
        (
            "image/format".into(),
            Feature::from_bytes_iter([b"jpeg".to_vec()]),
        ),
        ("image/object/bbox/xmin".into(), Feature::from_f32_iter(xmins)),
        ("image/object/bbox/xmax".into(), Feature::from_f32_iter(xmaxs)),
        ("image/object/bbox/ymin".into(), Feature::from_f32_iter(ymins)),
        ("image/object/bbox/ymax".into(), Feature::from_f32_iter(ymaxs)),
        (
            "image/object/class/text".into(),
            Feature::from_bytes_iter(names),
        ),
        (
            "image/object/class/label".into(),
            Feature::from_i64_iter(ids),
        ),
    ]
    .into_iter()
    .collect()
}

enum Outputs {
    Single(ExampleWriter<BufWriter<File>>),
    Split {
        train: ExampleWriter<BufWriter<File>>,
        eval: ExampleWriter<BufWriter<File>>,
        eval_fraction: f64,
    },
}

impl Outputs {
    fn open(directory: &Path, options: &ExportOptions) -> Result<Self> {
        match options.eval_fraction {
            None => {
                let writer = ExampleWriter::create(directory.join(DATA_RECORD))?;
                Ok(Self::Single(writer))
            }
            Some(eval_fraction) => {
                let train = ExampleWriter::create(directory.join(TRAIN_RECORD))?;
                let eval = ExampleWriter::create(directory.join(EVAL_RECORD))?;
                // gen_bool panics outside [0, 1].
                Ok(Self::Split {
                    train,
                    eval,
                    eval_fraction: eval_fraction.clamp(0.0, 1.0),
                })
            }
        }
    }

    /// Flush both buffered writers so a failed final flush surfaces as an
    /// error instead of leaving a silently truncated record file.
    fn finish(self) -> Result<()> {
        match self {
            Self::Single(mut writer) => writer.flush()?,
            Self::Split {
                mut train,
                mut eval,
                ..
            } => {
                train.flush()?;
                eval.flush()?;
            }
        }
        Ok(())
    }

    fn write(
        &mut self,
        example: Example,
        rng: &mut ThreadRng,
        summary: &mut ExportSummary,
    ) -> Result<()> {
        match self {
            Self::Single(writer) => {
                writer.send(example)?;
                summary.train += 1;
            }
            Self::Split {
                train,
                eval,
                eval_fraction,
            } => {
                // Independent Bernoulli draw per example, not a shuffle.
                if rng.gen_bool(*eval_fraction) {
                    eval.send(example)?;
                    summary.eval += 1;
                } else {
                    train.send(example)?;
                    summary.train += 1;
                }
            }
        }
        summary.total += 1;
        Ok(())
    }
}

/// Export every persisted annotation of `directory` into TFRecord files.
///
/// Outputs are opened before iteration begins and closed on every exit
/// path, so an aborted export never leaves a half-open writer; examples
/// flushed before a failure stay durable and are counted in the error.
///
/// Missing-pair policy: an annotation whose image file is gone is logged
/// with its id, counted under `skipped`, and the export continues. Any
/// other stream or write failure aborts with [`Error::PartialExport`].
pub fn export(directory: &Path, options: &ExportOptions) -> Result<ExportSummary> {
    let pb = create_progress_bar(store::count(directory)? as u64, "Export");
    let stream = store::stream(directory)?;
    let mut outputs = Outputs::open(directory, options)?;
    let mut summary = ExportSummary::default();
    let mut rng = rand::thread_rng();

    for item in stream {
        let LabeledImage {
            record,
            image_bytes,
        } = match item {
            Ok(labeled) => labeled,
            Err(Error::MissingPairedImage { image_id, path }) => {
                warn!(
                    "skipping annotation {}: paired image missing at {}",
                    image_id,
                    path.display()
                );
                summary.skipped += 1;
                pb.inc(1);
                continue;
            }
            Err(source) => {
                pb.abandon();
                return Err(Error::PartialExport {
                    written: summary.total,
                    source: Box::new(source),
                });
            }
        };

        if infer_image_format(&image_bytes) != Some("jpg") {
            warn!(
                "image {} does not look like a jpeg; exporting it as-is",
                record.image_id()
            );
        }

        let example = build_example(&record, &image_bytes);
        if let Err(source) = outputs.write(example, &mut rng, &mut summary) {
            pb.abandon();
            return Err(Error::PartialExport {
                written: summary.total,
                source: Box::new(source),
            });
        }
        pb.inc(1);
    }

    // Writers flush and close here, before the summary is reported.
    if let Err(source) = outputs.finish() {
        pb.abandon();
        return Err(Error::PartialExport {
            written: summary.total,
            source: Box::new(source),
        });
    }
    pb.finish_with_message("Export complete");
    summary.print_summary();
    Ok(summary)
}
