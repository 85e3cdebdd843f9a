//! Per-file dispatch and recursive archive walking.
//!
//! [`Processor::process_file`] is the single entry point for one named
//! input: a `.zip` suffix recurses into the archive (whose entries come
//! straight back here, arbitrarily nested), a `.fb2` suffix runs the book
//! pipeline, anything else is skipped as an unrecognized format — and a
//! skip is a success, not a failure.
//!
//! This is also the only place where domain failures are caught. The
//! three [`BookError`] kinds become one log line plus `success = false`
//! and travel no further, so a bad book never aborts its archive
//! siblings: every entry is attempted, and the archive's aggregate result
//! is the AND of its entries. Anything that is not a [`BookError`] —
//! I/O, malformed containers, unparseable XML — propagates and ends the
//! run.

use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

use tracing::debug;
use zip::ZipArchive;

use crate::error::{BookError, ShelfError};
use crate::log::RunLog;
use crate::pipeline::extract::extract_meta;
use crate::pipeline::path::{build_target_path, BOOK_EXT};
use crate::pipeline::repackage::{repackage, CONTAINER_EXT};
use crate::synonyms::SynonymTable;

/// Dispatches named inputs through the processing pipeline.
///
/// Holds the run-wide collaborators: the library root every book lands
/// under, the read-only synonym table, and the run log. One `Processor`
/// serves the whole run; recursion threads the nesting depth explicitly.
pub struct Processor<'a> {
    library_dir: &'a Path,
    synonyms: &'a SynonymTable,
    log: &'a mut RunLog,
}

impl<'a> Processor<'a> {
    pub fn new(library_dir: &'a Path, synonyms: &'a SynonymTable, log: &'a mut RunLog) -> Self {
        Self {
            library_dir,
            synonyms,
            log,
        }
    }

    /// Process one named input held in memory.
    ///
    /// Returns `Ok(true)` when the input (and, for archives, every entry
    /// in it) was handled, `Ok(false)` when a domain failure was logged,
    /// and `Err` only for fatal run-level errors.
    pub fn process_file(
        &mut self,
        data: &[u8],
        name: &str,
        depth: usize,
    ) -> Result<bool, ShelfError> {
        self.log.line(depth, &format!("Processing {name}"));
        let inner = depth + 1;

        if name.ends_with(CONTAINER_EXT) {
            self.process_archive(data, name, inner)
        } else if name.ends_with(BOOK_EXT) {
            match self.process_book(data) {
                Ok(target) => {
                    debug!("repackaged {name} -> {}", target.display());
                    Ok(true)
                }
                Err(ShelfError::Book(err)) => {
                    self.log.line(inner, &failure_line(&err));
                    Ok(false)
                }
                Err(fatal) => Err(fatal),
            }
        } else {
            self.log.line(inner, "Unknown format - skipped");
            Ok(true)
        }
    }

    /// Walk every entry of a zip container, dispatching each back through
    /// [`Self::process_file`] under its base filename.
    ///
    /// No short-circuit: a failed entry flips the aggregate result but
    /// the remaining entries are still attempted and logged.
    fn process_archive(&mut self, data: &[u8], name: &str, depth: usize) -> Result<bool, ShelfError> {
        let mut archive =
            ZipArchive::new(Cursor::new(data)).map_err(|source| ShelfError::MalformedArchive {
                name: name.to_string(),
                source,
            })?;

        let mut success = true;
        for i in 0..archive.len() {
            let mut entry = archive
                .by_index(i)
                .map_err(|source| ShelfError::MalformedArchive {
                    name: name.to_string(),
                    source,
                })?;
            let entry_name = entry.name().to_string();
            let base = base_name(&entry_name);

            let mut content = Vec::with_capacity(entry.size() as usize);
            entry
                .read_to_end(&mut content)
                .map_err(|source| ShelfError::Io {
                    path: PathBuf::from(&entry_name),
                    source,
                })?;
            drop(entry);

            if !self.process_file(&content, &base, depth)? {
                success = false;
            }
        }
        Ok(success)
    }

    /// The book pipeline: extract → build path → repackage.
    fn process_book(&mut self, data: &[u8]) -> Result<PathBuf, ShelfError> {
        let meta = extract_meta(data, self.synonyms)?;
        let target = build_target_path(self.library_dir, &meta);
        repackage(data, &meta, &target)
    }
}

/// One log line per domain failure kind.
fn failure_line(err: &BookError) -> String {
    match err {
        BookError::MissingField { selector } => {
            format!("Error - node \"{selector}\" not found")
        }
        BookError::IncompleteAuthor => "Error - incomplete author information".to_string(),
        BookError::Processing(_) => "Error - processing failed".to_string(),
    }
}

/// Base filename of an archive entry path, used for suffix classification.
fn base_name(entry_path: &str) -> String {
    Path::new(entry_path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::io::Write;
    use std::rc::Rc;
    use zip::write::SimpleFileOptions;

    #[derive(Clone)]
    struct SharedBuf(Rc<RefCell<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn captured_log() -> (RunLog, Rc<RefCell<Vec<u8>>>) {
        let buf = Rc::new(RefCell::new(Vec::new()));
        (RunLog::to_sink(Box::new(SharedBuf(buf.clone()))), buf)
    }

    fn log_text(buf: &Rc<RefCell<Vec<u8>>>) -> String {
        String::from_utf8(buf.borrow().clone()).unwrap()
    }

    fn fb2(last_name: &str, title: &str) -> Vec<u8> {
        format!(
            r#"<?xml version="1.0" encoding="utf-8"?>
<FictionBook xmlns="http://www.gribuser.ru/xml/fictionbook/2.0">
  <description><title-info>
    <author>{last_name}</author>
    <book-title>{title}</book-title>
  </title-info></description>
  <body><section><p>text</p></section></body>
</FictionBook>"#
        )
        .into_bytes()
    }

    fn good_book(last_name: &str, title: &str) -> Vec<u8> {
        fb2(&format!("<last-name>{last_name}</last-name>"), title)
    }

    fn authorless_book(title: &str) -> Vec<u8> {
        fb2("<first-name>Только Имя</first-name>", title)
    }

    fn archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, data) in entries {
            writer
                .start_file(name.to_string(), SimpleFileOptions::default())
                .unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn single_book_lands_in_the_library() {
        let dir = tempfile::tempdir().unwrap();
        let (mut log, buf) = captured_log();
        let synonyms = SynonymTable::empty();
        let mut p = Processor::new(dir.path(), &synonyms, &mut log);

        let ok = p
            .process_file(&good_book("Лермонтов", "Герой нашего времени"), "in.fb2", 0)
            .unwrap();
        assert!(ok);
        assert!(dir
            .path()
            .join("Лермонтов/Без серии/Герой нашего времени.fb2.zip")
            .exists());
        assert_eq!(log_text(&buf), "Processing in.fb2\n");
    }

    #[test]
    fn unknown_format_is_skipped_as_success() {
        let dir = tempfile::tempdir().unwrap();
        let (mut log, buf) = captured_log();
        let synonyms = SynonymTable::empty();
        let mut p = Processor::new(dir.path(), &synonyms, &mut log);

        let ok = p.process_file(b"not a book", "readme.txt", 0).unwrap();
        assert!(ok);
        assert_eq!(
            log_text(&buf),
            "Processing readme.txt\n  Unknown format - skipped\n"
        );
    }

    #[test]
    fn failing_entry_flips_aggregate_but_siblings_still_process() {
        let dir = tempfile::tempdir().unwrap();
        let (mut log, buf) = captured_log();
        let synonyms = SynonymTable::empty();
        let mut p = Processor::new(dir.path(), &synonyms, &mut log);

        let zip_data = archive(&[
            ("one.fb2", &good_book("Первый", "Книга один")[..]),
            ("two.fb2", &authorless_book("Книга два")[..]),
            ("three.fb2", &good_book("Третий", "Книга три")[..]),
        ]);

        let ok = p.process_file(&zip_data, "batch.zip", 0).unwrap();
        assert!(!ok, "one failed entry must fail the archive");

        // siblings of the failure were still processed
        assert!(dir.path().join("Первый/Без серии/Книга один.fb2.zip").exists());
        assert!(dir.path().join("Третий/Без серии/Книга три.fb2.zip").exists());

        let text = log_text(&buf);
        assert_eq!(
            text.matches("Error - incomplete author information").count(),
            1
        );
        assert_eq!(text.matches("Processing ").count(), 4); // archive + 3 entries
    }

    #[test]
    fn nested_archives_recurse_with_deeper_indentation() {
        let dir = tempfile::tempdir().unwrap();
        let (mut log, buf) = captured_log();
        let synonyms = SynonymTable::empty();
        let mut p = Processor::new(dir.path(), &synonyms, &mut log);

        let inner = archive(&[("deep.fb2", &good_book("Гоголь", "Нос")[..])]);
        let outer = archive(&[("inner.zip", &inner[..])]);

        let ok = p.process_file(&outer, "outer.zip", 0).unwrap();
        assert!(ok);
        assert!(dir.path().join("Гоголь/Без серии/Нос.fb2.zip").exists());

        assert_eq!(
            log_text(&buf),
            "Processing outer.zip\n  Processing inner.zip\n    Processing deep.fb2\n"
        );
    }

    #[test]
    fn entry_names_are_classified_by_base_filename() {
        let dir = tempfile::tempdir().unwrap();
        let (mut log, _buf) = captured_log();
        let synonyms = SynonymTable::empty();
        let mut p = Processor::new(dir.path(), &synonyms, &mut log);

        let zip_data = archive(&[(
            "some/dir/tree/book.fb2",
            &good_book("Пушкин", "Выстрел")[..],
        )]);
        let ok = p.process_file(&zip_data, "tree.zip", 0).unwrap();
        assert!(ok);
        assert!(dir.path().join("Пушкин/Без серии/Выстрел.fb2.zip").exists());
    }

    #[test]
    fn missing_title_logs_selector_identity() {
        let dir = tempfile::tempdir().unwrap();
        let (mut log, buf) = captured_log();
        let synonyms = SynonymTable::empty();
        let mut p = Processor::new(dir.path(), &synonyms, &mut log);

        let book = r#"<FictionBook xmlns="http://www.gribuser.ru/xml/fictionbook/2.0">
  <description><title-info><author><last-name>Кто-то</last-name></author></title-info></description>
  <body/>
</FictionBook>"#;
        let ok = p.process_file(book.as_bytes(), "no-title.fb2", 0).unwrap();
        assert!(!ok);
        assert!(log_text(&buf).contains("Error - node \"book-title\" not found"));
    }

    #[test]
    fn malformed_archive_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let (mut log, _buf) = captured_log();
        let synonyms = SynonymTable::empty();
        let mut p = Processor::new(dir.path(), &synonyms, &mut log);

        let err = p.process_file(b"PK\x03\x04 garbage", "broken.zip", 0).unwrap_err();
        assert!(matches!(err, ShelfError::MalformedArchive { .. }));
    }

    #[test]
    fn domain_failures_never_touch_the_filesystem() {
        let dir = tempfile::tempdir().unwrap();
        let (mut log, _buf) = captured_log();
        let synonyms = SynonymTable::empty();
        let mut p = Processor::new(dir.path(), &synonyms, &mut log);

        let ok = p
            .process_file(&authorless_book("Сирота"), "orphan.fb2", 0)
            .unwrap();
        assert!(!ok);
        assert_eq!(
            std::fs::read_dir(dir.path()).unwrap().count(),
            0,
            "no partial library output for a failed book"
        );
    }
}
