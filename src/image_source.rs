use image::GenericImageView;
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use crate::error::{Error, Result};

/// A decoded image pulled from the source directory, ready for labeling.
#[derive(Debug, Clone, PartialEq)]
pub struct RawImage {
    /// 8-digit zero-padded identifier derived from file metadata.
    pub id: String,
    pub source_path: PathBuf,
    /// Decoded RGB8 pixel buffer, row-major.
    pub pixel_data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub channel_depth: u8,
}

/// Derive the 8-digit image identifier from file metadata: the product of
/// access time in milliseconds and file size, modulo 1e8, zero-padded.
///
/// Deterministic for a given (atime, size) pair and independent of the
/// directory listing, but not collision-free; a collision is a known edge
/// case, not something to repair silently.
pub fn derive_file_id(atime_millis: u128, size_bytes: u64) -> String {
    format!("{:08}", (atime_millis * size_bytes as u128) % 100_000_000)
}

fn file_id(meta: &fs::Metadata) -> Result<String> {
    // Several filesystems do not update atime reliably; fall back to mtime
    // so the identifier stays stable rather than failing outright.
    let atime = meta.accessed().or_else(|_| meta.modified())?;
    let millis = atime
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    Ok(derive_file_id(millis, meta.len()))
}

fn has_jpeg_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            ext == "jpg" || ext == "jpeg"
        })
        .unwrap_or(false)
}

fn load_raw_image(path: &Path) -> Result<RawImage> {
    let bytes = fs::read(path)?;
    let meta = fs::metadata(path)?;
    let decoded = image::load_from_memory(&bytes).map_err(|source| Error::ImageDecode {
        path: path.to_path_buf(),
        source,
    })?;
    let (width, height) = decoded.dimensions();

    Ok(RawImage {
        id: file_id(&meta)?,
        source_path: path.to_path_buf(),
        pixel_data: decoded.to_rgb8().into_raw(),
        width,
        height,
        channel_depth: 3,
    })
}

/// Lazy, single-pass stream over the `.jpg`/`.jpeg` files of a directory.
///
/// Non-image entries are skipped silently; order follows the directory
/// listing and is not guaranteed sorted. A decode failure on a matched file
/// ends the stream after yielding the error: a file that looks labeled-ready
/// but cannot be read is surfaced, never silently dropped.
pub fn stream(directory: &Path) -> Result<ImageStream> {
    let entries = fs::read_dir(directory)?;
    debug!("scanning {} for jpeg images", directory.display());
    Ok(ImageStream {
        entries,
        done: false,
    })
}

pub struct ImageStream {
    entries: fs::ReadDir,
    done: bool,
}

impl Iterator for ImageStream {
    type Item = Result<RawImage>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            let entry = match self.entries.next()? {
                Ok(entry) => entry,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e.into()));
                }
            };
            let path = entry.path();
            if path.is_dir() || !has_jpeg_extension(&path) {
                continue;
            }
            return match load_raw_image(&path) {
                Ok(image) => Some(Ok(image)),
                Err(e) => {
                    self.done = true;
                    Some(Err(e))
                }
            };
        }
    }
}
