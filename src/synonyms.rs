//! Author-name canonicalization via a synonym table.
//!
//! Libraries accumulate the same author under several spellings —
//! transliterations, pen names, initials vs. full first names. The synonym
//! table maps each known raw spelling to one canonical spelling so every
//! book lands under a single directory.
//!
//! The lookup key is the *raw* joined `"Last, First"` (or bare `"Last"`)
//! form exactly as extracted from the book, before any filesystem
//! normalization. Resolution must happen before the name is used anywhere:
//! both the path segment and the rewritten in-document author fields are
//! derived from the resolved name.

use std::collections::HashMap;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use crate::error::ShelfError;

/// One `old=new` mapping per line; `(?m)` so `^`/`$` match per line.
static RE_SYNONYM_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^(.*?)=(.*)$").unwrap());

/// Read-only raw-name → canonical-name lookup, built once per run.
#[derive(Debug, Default, Clone)]
pub struct SynonymTable {
    map: HashMap<String, String>,
}

impl SynonymTable {
    /// An empty table: every name resolves to itself.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse table contents from text, one `old=new` mapping per line.
    ///
    /// Lines without a `=` do not match the pattern and are skipped; a
    /// `debug!` records each skip so a malformed file can be diagnosed
    /// without failing the run.
    pub fn parse(content: &str) -> Self {
        let mut map = HashMap::new();
        for line in content.lines() {
            match RE_SYNONYM_LINE.captures(line) {
                Some(caps) => {
                    let old = caps[1].trim().to_string();
                    let new = caps[2].trim().to_string();
                    map.insert(old, new);
                }
                None => {
                    if !line.trim().is_empty() {
                        debug!("skipping unrecognized synonym line: {line:?}");
                    }
                }
            }
        }
        debug!("loaded {} author synonyms", map.len());
        Self { map }
    }

    /// Load the table from a UTF-8 flat file.
    ///
    /// A missing file is not an error — runs without a synonym file are
    /// normal and get an empty table.
    pub fn load(path: &Path) -> Result<Self, ShelfError> {
        if !path.exists() {
            warn!("synonym file not found, resolving all authors verbatim: {}", path.display());
            return Ok(Self::empty());
        }
        let content = std::fs::read_to_string(path).map_err(|source| ShelfError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::parse(&content))
    }

    /// Resolve a raw full name to its canonical form.
    ///
    /// Verbatim lookup; an unknown name is returned unchanged.
    pub fn resolve<'a>(&'a self, full_name: &'a str) -> &'a str {
        self.map.get(full_name).map_or(full_name, String::as_str)
    }

    /// Number of mappings in the table.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// True when the table holds no mappings.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
