//! Run configuration.
//!
//! All batch behaviour is controlled through [`RunConfig`], built via its
//! [`RunConfigBuilder`]. Keeping every knob in one struct makes a run
//! reproducible from a single value and trivial to construct in tests.
//!
//! The three directory roots are distinct filesystem locations by
//! contract: inputs are read from `income_dir`, repackaged books are
//! written under `library_dir`, and successfully processed inputs are
//! relocated under `processed_dir` (failures stay in `income_dir` for
//! retry). `build()` rejects configurations that alias the roots.

use std::path::{Path, PathBuf};

use crate::error::ShelfError;

/// Configuration for one batch run.
///
/// Built via [`RunConfig::builder()`] or [`RunConfig::default()`], whose
/// paths mirror the traditional layout: `income/`, `books/`, `processed/`,
/// `authors.txt`, `log.txt` in the working directory.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Directory tree scanned for incoming files. Default: `income`.
    pub income_dir: PathBuf,

    /// Root of the normalized library layout. Each book is repackaged to
    /// `library_dir/<author>/<series>/<title>.fb2.zip`. Default: `books`.
    pub library_dir: PathBuf,

    /// Successfully processed inputs are moved here, mirroring their
    /// relative path under `income_dir`. Default: `processed`.
    pub processed_dir: PathBuf,

    /// Author synonym table, one `old=new` mapping per line. A missing
    /// file simply yields an empty table. Default: `authors.txt`.
    pub authors_file: PathBuf,

    /// Per-run processing log, truncated at run start and tee'd to
    /// stdout. Default: `log.txt`.
    pub log_file: PathBuf,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            income_dir: PathBuf::from("income"),
            library_dir: PathBuf::from("books"),
            processed_dir: PathBuf::from("processed"),
            authors_file: PathBuf::from("authors.txt"),
            log_file: PathBuf::from("log.txt"),
        }
    }
}

impl RunConfig {
    /// Create a new builder for `RunConfig`.
    pub fn builder() -> RunConfigBuilder {
        RunConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`RunConfig`].
#[derive(Debug)]
pub struct RunConfigBuilder {
    config: RunConfig,
}

impl RunConfigBuilder {
    pub fn income_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.income_dir = dir.into();
        self
    }

    pub fn library_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.library_dir = dir.into();
        self
    }

    pub fn processed_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.processed_dir = dir.into();
        self
    }

    pub fn authors_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.authors_file = path.into();
        self
    }

    pub fn log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.log_file = path.into();
        self
    }

    /// Build the configuration, validating the directory contract.
    pub fn build(self) -> Result<RunConfig, ShelfError> {
        let c = &self.config;
        let roots: [(&str, &Path); 3] = [
            ("income", &c.income_dir),
            ("library", &c.library_dir),
            ("processed", &c.processed_dir),
        ];
        for (i, (name_a, a)) in roots.iter().enumerate() {
            for (name_b, b) in roots.iter().skip(i + 1) {
                if a == b {
                    return Err(ShelfError::InvalidConfig(format!(
                        "{name_a} and {name_b} directories must be distinct, both are '{}'",
                        a.display()
                    )));
                }
            }
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_layout_matches_traditional_names() {
        let c = RunConfig::default();
        assert_eq!(c.income_dir, PathBuf::from("income"));
        assert_eq!(c.library_dir, PathBuf::from("books"));
        assert_eq!(c.processed_dir, PathBuf::from("processed"));
        assert_eq!(c.authors_file, PathBuf::from("authors.txt"));
        assert_eq!(c.log_file, PathBuf::from("log.txt"));
    }

    #[test]
    fn builder_overrides_paths() {
        let c = RunConfig::builder()
            .income_dir("/data/in")
            .library_dir("/data/lib")
            .processed_dir("/data/done")
            .build()
            .unwrap();
        assert_eq!(c.income_dir, PathBuf::from("/data/in"));
        assert_eq!(c.library_dir, PathBuf::from("/data/lib"));
    }

    #[test]
    fn aliased_roots_are_rejected() {
        let err = RunConfig::builder()
            .income_dir("same")
            .library_dir("same")
            .build()
            .unwrap_err();
        assert!(matches!(err, ShelfError::InvalidConfig(_)));
    }
}
