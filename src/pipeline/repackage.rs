//! Repackaging: serialize the resolved document into its library container.
//!
//! The document is streamed back out through a `quick-xml` writer with a
//! fresh `<?xml version="1.0" encoding="utf-8"?>` declaration, applying
//! the recorded [`AuthorRewrite`] to the first author's name fields on the
//! way — the single point where the document is mutated, and the reason a
//! repackaged book re-extracts to its *canonical* author. The result is
//! written as the sole entry of a deflate-compressed container at
//! `<target>.zip`, entry name cp866-encoded (see [`super::container`]).
//!
//! A pre-existing container at the same path is silently overwritten;
//! identical (author, series, title) triples are last-write-wins by
//! design. Filesystem failures here are fatal to the run.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use quick_xml::events::{BytesDecl, BytesEnd, BytesText, Event};
use quick_xml::reader::NsReader;
use quick_xml::writer::Writer;
use tracing::{debug, warn};

use crate::error::ShelfError;
use crate::pipeline::container::write_single_entry_zip;
use crate::pipeline::extract::{is_fb2, AuthorRewrite, BookMeta};

/// Extension appended to the target document path for the container.
pub const CONTAINER_EXT: &str = ".zip";

/// Serialize the document and write its single-entry container.
///
/// Side effects: creates all missing ancestor directories of `target`,
/// then writes `<target>.zip` whose sole entry is named after the
/// target's `.fb2` base filename. Returns the container path.
pub fn repackage(xml: &[u8], meta: &BookMeta, target: &Path) -> Result<PathBuf, ShelfError> {
    let book = serialize_book(xml, &meta.rewrite)?;

    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|source| ShelfError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let entry_name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let (encoded_name, _, had_errors) = encoding_rs::IBM866.encode(&entry_name);
    if had_errors {
        // encoding_rs substitutes numeric character references for the
        // unmappable characters; the run continues on that name
        warn!("entry name {entry_name:?} is not fully representable in cp866");
    }

    let mut container_path = target.as_os_str().to_os_string();
    container_path.push(CONTAINER_EXT);
    let container_path = PathBuf::from(container_path);

    let file = File::create(&container_path).map_err(|source| ShelfError::OutputWriteFailed {
        path: container_path.clone(),
        source,
    })?;
    write_single_entry_zip(BufWriter::new(file), &encoded_name, &book).map_err(|source| {
        ShelfError::OutputWriteFailed {
            path: container_path.clone(),
            source,
        }
    })?;

    debug!("created {}", container_path.display());
    Ok(container_path)
}

/// Stream the document back to XML, rewriting the first author's name
/// fields to the resolved spelling.
///
/// The input declaration (if any) is dropped in favour of a standard
/// UTF-8 one, matching the serialized byte encoding regardless of what
/// the source declared.
pub fn serialize_book(xml: &[u8], rewrite: &AuthorRewrite) -> Result<Vec<u8>, ShelfError> {
    let mut reader = NsReader::from_reader(xml);
    let mut writer = Writer::new(Vec::new());
    let mut buf = Vec::new();

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
    writer.write_event(Event::Text(BytesText::from_escaped("\n")))?;

    let mut depth = 0usize;
    let mut title_info_depth = 0usize;
    let mut in_author = false;
    let mut author_done = false;
    let mut author_depth = 0usize;
    let mut first_written = false;
    let mut last_written = false;

    loop {
        let (res, event) = reader.read_resolved_event_into(&mut buf)?;
        match event {
            // replaced by the declaration written above
            Event::Decl(_) => {}
            Event::Start(ref e) => {
                depth += 1;
                let fb2 = is_fb2(&res);
                let local = e.local_name();
                let local = local.as_ref();

                if fb2 && local == b"title-info" {
                    title_info_depth += 1;
                } else if fb2
                    && local == b"author"
                    && title_info_depth > 0
                    && !author_done
                    && !in_author
                {
                    in_author = true;
                    author_depth = depth;
                }

                let replacement = if in_author && fb2 {
                    name_replacement(local, rewrite, &mut first_written, &mut last_written)
                } else {
                    None
                };

                match replacement {
                    Some(text) => {
                        let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                        writer.write_event(Event::Start(e.clone()))?;
                        writer.write_event(Event::Text(BytesText::new(text)))?;
                        skip_element_content(&mut reader)?;
                        writer.write_event(Event::End(BytesEnd::new(name)))?;
                        depth -= 1;
                    }
                    None => writer.write_event(Event::Start(e.clone()))?,
                }
            }
            Event::Empty(ref e) => {
                // a self-closing name element, e.g. `<first-name/>`, is
                // expanded so the resolved text has somewhere to live
                let replacement = if in_author && is_fb2(&res) {
                    let local = e.local_name();
                    name_replacement(local.as_ref(), rewrite, &mut first_written, &mut last_written)
                } else {
                    None
                };

                match replacement {
                    Some(text) => {
                        let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                        writer.write_event(Event::Start(e.clone()))?;
                        writer.write_event(Event::Text(BytesText::new(text)))?;
                        writer.write_event(Event::End(BytesEnd::new(name)))?;
                    }
                    None => writer.write_event(Event::Empty(e.clone()))?,
                }
            }
            Event::End(ref e) => {
                writer.write_event(Event::End(e.clone()))?;
                if in_author && depth == author_depth {
                    in_author = false;
                    author_done = true;
                    if let AuthorRewrite::LastFirst { first, .. } = rewrite {
                        if !first_written {
                            warn!(
                                "document has no first-name element, dropping resolved \
                                 first name {first:?}"
                            );
                        }
                    }
                }
                if is_fb2(&res) && e.local_name().as_ref() == b"title-info" {
                    title_info_depth = title_info_depth.saturating_sub(1);
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            ev => writer.write_event(ev)?,
        }
        buf.clear();
    }

    Ok(writer.into_inner())
}

/// The resolved text for a name element inside the first author, if this
/// element is one that gets rewritten. Marks the field written so later
/// duplicates pass through untouched.
fn name_replacement<'r>(
    local: &[u8],
    rewrite: &'r AuthorRewrite,
    first_written: &mut bool,
    last_written: &mut bool,
) -> Option<&'r str> {
    match (local, rewrite) {
        (b"last-name", AuthorRewrite::LastOnly { last })
        | (b"last-name", AuthorRewrite::LastFirst { last, .. })
            if !*last_written =>
        {
            *last_written = true;
            Some(last.as_str())
        }
        (b"first-name", AuthorRewrite::LastFirst { first, .. }) if !*first_written => {
            *first_written = true;
            Some(first.as_str())
        }
        _ => None,
    }
}

/// Consume events up to and including the end tag of the element whose
/// start tag was just read, discarding its original content.
fn skip_element_content(reader: &mut NsReader<&[u8]>) -> Result<(), ShelfError> {
    let mut buf = Vec::new();
    let mut nested = 0usize;
    loop {
        match reader.read_resolved_event_into(&mut buf)?.1 {
            Event::Start(_) => nested += 1,
            Event::End(_) => {
                if nested == 0 {
                    return Ok(());
                }
                nested -= 1;
            }
            Event::Eof => {
                return Err(ShelfError::Internal(
                    "document ended inside an author name element".into(),
                ))
            }
            _ => {}
        }
        buf.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::extract::extract_meta;
    use crate::synonyms::SynonymTable;
    use std::io::{Cursor, Read};

    const BOOK: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<FictionBook xmlns="http://www.gribuser.ru/xml/fictionbook/2.0">
  <description>
    <title-info>
      <author><first-name>Lev</first-name><last-name>Tolstoj</last-name></author>
      <book-title>Война и мир</book-title>
      <sequence name="Собрание" number="1"/>
    </title-info>
  </description>
  <body><section><p>Все счастливые семьи&#160;похожи друг на друга.</p></section></body>
</FictionBook>"#;

    fn read_container_entry(path: &Path) -> (Vec<u8>, Vec<u8>) {
        let bytes = std::fs::read(path).unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 1);
        let mut entry = archive.by_index(0).unwrap();
        let name = entry.name_raw().to_vec();
        let mut content = Vec::new();
        entry.read_to_end(&mut content).unwrap();
        (name, content)
    }

    #[test]
    fn serialization_rewrites_both_author_fields() {
        let rewrite = AuthorRewrite::LastFirst {
            last: "Толстой".into(),
            first: "Лев".into(),
        };
        let out = serialize_book(BOOK.as_bytes(), &rewrite).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>"));
        assert!(text.contains("<last-name>Толстой</last-name>"));
        assert!(text.contains("<first-name>Лев</first-name>"));
        assert!(!text.contains("Tolstoj"));
        // body content untouched
        assert!(text.contains("похожи друг на друга"));
    }

    #[test]
    fn last_only_rewrite_leaves_first_name_untouched() {
        let rewrite = AuthorRewrite::LastOnly {
            last: "Псевдоним".into(),
        };
        let out = serialize_book(BOOK.as_bytes(), &rewrite).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("<last-name>Псевдоним</last-name>"));
        assert!(text.contains("<first-name>Lev</first-name>"));
    }

    #[test]
    fn repackaged_book_round_trips_through_its_container() {
        let dir = tempfile::tempdir().unwrap();
        let synonyms = SynonymTable::parse("Tolstoj, Lev=Толстой, Лев\n");

        let meta = extract_meta(BOOK.as_bytes(), &synonyms).unwrap();
        let target = crate::pipeline::path::build_target_path(dir.path(), &meta);
        let container = repackage(BOOK.as_bytes(), &meta, &target).unwrap();

        assert_eq!(
            container,
            dir.path()
                .join("Толстой, Лев")
                .join("Собрание")
                .join("01 - Война и мир.fb2.zip")
        );

        let (name, content) = read_container_entry(&container);
        let (decoded, _) = encoding_rs::IBM866.decode_without_bom_handling(&name);
        assert_eq!(decoded, "01 - Война и мир.fb2");

        // the repackaged document re-extracts to the same classification,
        // now already canonical without consulting the synonym table
        let meta2 = extract_meta(&content, &SynonymTable::empty()).unwrap();
        assert_eq!(meta2.author, meta.author);
        assert_eq!(meta2.series, meta.series);
        assert_eq!(meta2.title, meta.title);
    }

    #[test]
    fn entry_name_outside_cp866_is_substituted_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let book = r#"<?xml version="1.0" encoding="utf-8"?>
<FictionBook xmlns="http://www.gribuser.ru/xml/fictionbook/2.0">
  <description>
    <title-info>
      <author><last-name>Танидзаки</last-name></author>
      <book-title>日本の本</book-title>
    </title-info>
  </description>
  <body><section><p>text</p></section></body>
</FictionBook>"#;

        let meta = extract_meta(book.as_bytes(), &SynonymTable::empty()).unwrap();
        let target = crate::pipeline::path::build_target_path(dir.path(), &meta);
        let container = repackage(book.as_bytes(), &meta, &target).unwrap();
        assert!(container.exists());

        // cp866 cannot carry the CJK title; the encoder falls back to
        // numeric character references and the book still shelves
        let (name, content) = read_container_entry(&container);
        assert!(name.windows(2).any(|w| w == b"&#"));
        assert!(name.ends_with(b".fb2"));
        assert!(!content.is_empty());
    }

    #[test]
    fn resolved_first_name_is_dropped_when_document_has_no_field_for_it() {
        let book = r#"<?xml version="1.0" encoding="utf-8"?>
<FictionBook xmlns="http://www.gribuser.ru/xml/fictionbook/2.0">
  <description>
    <title-info>
      <author><last-name>Одинокий</last-name></author>
      <book-title>Полёт</book-title>
    </title-info>
  </description>
  <body><section><p>text</p></section></body>
</FictionBook>"#;
        let synonyms = SynonymTable::parse("Одинокий=Птица, Гордая\n");

        let meta = extract_meta(book.as_bytes(), &synonyms).unwrap();
        // the shelving path still uses the full canonical name
        assert_eq!(meta.author, "Птица, Гордая");
        assert!(matches!(
            meta.rewrite,
            AuthorRewrite::LastFirst { ref last, ref first }
                if last == "Птица" && first == "Гордая"
        ));

        let out = serialize_book(book.as_bytes(), &meta.rewrite).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("<last-name>Птица</last-name>"));
        // no first-name element to carry the resolved first name
        assert!(!text.contains("first-name"));
        assert!(!text.contains("Гордая"));
    }

    #[test]
    fn existing_container_is_silently_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let meta = extract_meta(BOOK.as_bytes(), &SynonymTable::empty()).unwrap();
        let target = crate::pipeline::path::build_target_path(dir.path(), &meta);

        let first = repackage(BOOK.as_bytes(), &meta, &target).unwrap();
        let second = repackage(BOOK.as_bytes(), &meta, &target).unwrap();
        assert_eq!(first, second);

        let (_, content) = read_container_entry(&second);
        assert!(!content.is_empty());
    }
}
