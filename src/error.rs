//! Error types for the fb2shelf library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ShelfError`] — **Fatal**: the run cannot or should not continue
//!   (I/O failure, malformed container, XML that does not parse at all).
//!   Returned as `Err(ShelfError)` from the top-level processing functions
//!   and expected to abort the whole batch.
//!
//! * [`BookError`] — **Non-fatal**: one book failed a well-understood
//!   domain check (missing required metadata element, incomplete author
//!   information). Caught at the single-file dispatch boundary, converted
//!   into a log line plus `success = false`, and never propagated past it,
//!   so one bad book inside an archive never aborts its siblings.
//!
//! Only the [`BookError`] kinds are recoverable per file; anything else
//! indicates a run-level problem worth stopping for.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the fb2shelf library.
///
/// Per-book domain failures use [`BookError`] and are intercepted by the
/// dispatcher rather than surfaced here — except through the transparent
/// [`ShelfError::Book`] variant that carries them up to that boundary.
#[derive(Debug, Error)]
pub enum ShelfError {
    // ── I/O errors ────────────────────────────────────────────────────────
    /// Input file or directory was not found at the given path.
    #[error("path not found: '{path}'", path = .path.display())]
    PathNotFound { path: PathBuf },

    /// Generic filesystem failure (read, create-dir, rename).
    #[error("I/O error on '{path}': {source}", path = .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not create or write an output container.
    #[error("failed to write output container '{path}': {source}", path = .path.display())]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Format errors ─────────────────────────────────────────────────────
    /// A container could not be opened or read as a zip archive.
    #[error("malformed zip archive '{name}': {source}")]
    MalformedArchive {
        name: String,
        #[source]
        source: zip::result::ZipError,
    },

    /// The document is not well-formed XML and could not be parsed at all.
    #[error("malformed XML: {0}")]
    MalformedXml(#[from] quick_xml::Error),

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("internal error: {0}")]
    Internal(String),

    // ── Domain boundary ───────────────────────────────────────────────────
    /// A recoverable per-book failure travelling up to the dispatch
    /// boundary, where it is matched and converted to a log line.
    #[error(transparent)]
    Book(#[from] BookError),
}

impl From<quick_xml::events::attributes::AttrError> for ShelfError {
    fn from(e: quick_xml::events::attributes::AttrError) -> Self {
        ShelfError::MalformedXml(quick_xml::Error::InvalidAttr(e))
    }
}

/// A non-fatal, per-book domain failure.
///
/// The dispatcher logs one line per kind and reports `success = false`
/// for the file; processing of sibling archive entries continues.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BookError {
    /// A required metadata element was not found. Carries the selector
    /// identity so the log line tells the operator what was missing.
    #[error("required element \"{selector}\" not found")]
    MissingField { selector: &'static str },

    /// The author block exists but its last name is absent or empty.
    #[error("incomplete author information")]
    IncompleteAuthor,

    /// Catch-all for any other domain-level processing failure.
    #[error("processing failed: {0}")]
    Processing(String),
}
