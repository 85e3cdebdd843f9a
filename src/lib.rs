//! # fb2shelf
//!
//! Sort a directory tree of FB2 e-book files and archives into a
//! normalized library layout keyed by author, series, and title.
//!
//! ## Why this crate?
//!
//! Incoming e-book dumps arrive as loose `.fb2` files and zip archives —
//! often archives nested inside archives — with filenames that say
//! nothing about what is inside. The classification that matters is
//! embedded in each book's own metadata. fb2shelf reads it there,
//! resolves author spelling variants through a synonym table, and
//! repackages every book as a single-entry compressed container at a
//! deterministic path, so the same book always lands in the same place.
//!
//! ## Pipeline Overview
//!
//! ```text
//! input file
//!  │
//!  ├─ 1. Walk      classify by suffix; archives recurse entry by entry
//!  ├─ 2. Extract   author / title / series from the FB2 metadata
//!  ├─ 3. Resolve   canonical author spelling via the synonym table
//!  ├─ 4. Path      books/<author>/<series>/<title>.fb2  (normalized)
//!  └─ 5. Repackage serialized book → single-entry deflate container
//! ```
//!
//! A run is batch-shaped: synchronous, single-threaded, depth-first.
//! Per-book domain failures (missing metadata, incomplete author) are
//! logged and leave the input in place for retry; anything else aborts
//! the run.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fb2shelf::{run, RunConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RunConfig::builder()
//!         .income_dir("income")
//!         .library_dir("books")
//!         .build()?;
//!     let summary = run(&config)?;
//!     println!("{} processed, {} failed", summary.files_processed, summary.files_failed);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `fb2shelf` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! fb2shelf = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod log;
pub mod normalize;
pub mod pipeline;
pub mod runner;
pub mod synonyms;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{RunConfig, RunConfigBuilder};
pub use error::{BookError, ShelfError};
pub use log::RunLog;
pub use normalize::normalize_segment;
pub use pipeline::extract::{extract_meta, BookMeta, NO_SERIES_LABEL};
pub use pipeline::path::build_target_path;
pub use pipeline::repackage::repackage;
pub use pipeline::walk::Processor;
pub use runner::{run, run_with_log, RunSummary};
pub use synonyms::SynonymTable;
