//! The batch driver: one pass over the income directory.
//!
//! Walks the income tree grouped by directory (one log line per
//! directory, its files nested one level deeper), feeds every file
//! through the [`Processor`], and relocates successfully handled inputs
//! into a mirrored path under the processed root. Failed inputs stay
//! where they are so the next run retries them; the library output they
//! may have partially produced is governed by the pipeline, not by the
//! driver.
//!
//! The driver never deletes an input: the only mutation on the income
//! tree is the success-path rename into the processed tree.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;

use crate::config::RunConfig;
use crate::error::ShelfError;
use crate::log::RunLog;
use crate::pipeline::walk::Processor;
use crate::synonyms::SynonymTable;

/// Counters for one batch run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Inputs processed successfully and moved to the processed tree
    /// (includes skipped unknown-format files — a skip is a success).
    pub files_processed: usize,
    /// Inputs with at least one domain failure, left in place for retry.
    pub files_failed: usize,
}

/// Run one batch pass with the standard log (file + stdout).
pub fn run(config: &RunConfig) -> Result<RunSummary, ShelfError> {
    let synonyms = SynonymTable::load(&config.authors_file)?;
    let mut log = RunLog::to_file_and_stdout(&config.log_file)?;
    run_with_log(config, &synonyms, &mut log)
}

/// Run one batch pass against explicit collaborators.
///
/// Split out from [`run`] so tests can capture the log and supply a
/// synonym table directly.
pub fn run_with_log(
    config: &RunConfig,
    synonyms: &SynonymTable,
    log: &mut RunLog,
) -> Result<RunSummary, ShelfError> {
    if !config.income_dir.exists() {
        return Err(ShelfError::PathNotFound {
            path: config.income_dir.clone(),
        });
    }

    info!(
        "starting run: income={} library={} processed={}",
        config.income_dir.display(),
        config.library_dir.display(),
        config.processed_dir.display()
    );

    let mut summary = RunSummary::default();

    // directory-grouped traversal: every directory gets its own header
    // line, with all of its direct files processed under it
    let dirs = WalkDir::new(&config.income_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_dir())
        .map(|e| e.into_path())
        .collect::<Vec<_>>();

    for dir in dirs {
        log.line(0, &format!("Processing directory \"{}\"", dir.display()));

        for path in files_of(&dir)? {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let data = fs::read(&path).map_err(|source| ShelfError::Io {
                path: path.clone(),
                source,
            })?;

            let mut processor = Processor::new(&config.library_dir, synonyms, log);
            if processor.process_file(&data, &name, 1)? {
                move_to_processed(config, &path)?;
                summary.files_processed += 1;
            } else {
                summary.files_failed += 1;
            }
        }
    }

    log.flush();
    info!(
        "run finished: {} processed, {} failed",
        summary.files_processed, summary.files_failed
    );
    Ok(summary)
}

/// Direct (non-recursive) files of one directory, sorted by name.
fn files_of(dir: &Path) -> Result<Vec<PathBuf>, ShelfError> {
    let entries = fs::read_dir(dir).map_err(|source| ShelfError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| ShelfError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        if entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

/// Relocate a successfully processed input into the processed tree,
/// mirroring its path relative to the income root. An earlier copy at
/// the destination is replaced.
fn move_to_processed(config: &RunConfig, input: &Path) -> Result<(), ShelfError> {
    let rel = input
        .strip_prefix(&config.income_dir)
        .map_err(|_| ShelfError::Internal(format!(
            "processed file {} is outside the income tree",
            input.display()
        )))?;
    let dest = config.processed_dir.join(rel);

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|source| ShelfError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    if dest.exists() {
        fs::remove_file(&dest).map_err(|source| ShelfError::Io {
            path: dest.clone(),
            source,
        })?;
    }
    fs::rename(input, &dest).map_err(|source| ShelfError::Io {
        path: input.to_path_buf(),
        source,
    })?;

    debug!("moved {} -> {}", input.display(), dest.display());
    Ok(())
}
