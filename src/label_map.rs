use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use crate::error::{Error, Result};

static LABEL_RE: OnceLock<Regex> = OnceLock::new();

fn label_re() -> &'static Regex {
    LABEL_RE.get_or_init(|| {
        Regex::new(r"\bitem\s*\{\s*id:\s*(\d+)\s*name:\s*'(\w+)'\s*\}")
            .expect("Failed to compile regex")
    })
}

/// Ordered mapping from integer class id to class name, parsed from a
/// `.pbtxt`-style class definition file.
///
/// Rebuilt wholesale on every load; callers swap the whole value so readers
/// never observe a partial update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelMap {
    entries: Vec<(u32, String)>,
    by_id: HashMap<u32, usize>,
}

impl LabelMap {
    /// Parse repeated `item { id: <int> name: '<name>' }` blocks, left to
    /// right. Unmatched fragments between entries are skipped; the parser
    /// only fails when no entry matches at all. The first occurrence of a
    /// duplicate id wins.
    pub fn load(text: &str) -> Result<Self> {
        let mut entries = Vec::new();
        let mut by_id = HashMap::new();

        for caps in label_re().captures_iter(text) {
            let Ok(id) = caps[1].parse::<u32>() else {
                continue;
            };
            if by_id.contains_key(&id) {
                continue;
            }
            by_id.insert(id, entries.len());
            entries.push((id, caps[2].to_string()));
        }

        if entries.is_empty() {
            return Err(Error::MalformedLabelMap);
        }

        Ok(Self { entries, by_id })
    }

    /// Read and parse a class definition file from disk.
    pub fn load_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::load(&text)
    }

    /// Look up the name for a class id. Absence means labeling with this id
    /// is not allowed; it is not a fatal error.
    pub fn lookup(&self, id: u32) -> Option<&str> {
        self.by_id.get(&id).map(|&i| self.entries[i].1.as_str())
    }

    pub fn contains(&self, id: u32) -> bool {
        self.by_id.contains_key(&id)
    }

    /// Entries in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        self.entries.iter().map(|(id, name)| (*id, name.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
