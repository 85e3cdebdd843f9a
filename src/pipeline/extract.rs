//! Metadata extraction from one FB2 document.
//!
//! FB2 is an XML format; the fields that drive the library layout live
//! under `<description><title-info>`: the first `<author>` block (optional
//! `<first-name>`, required `<last-name>`), `<book-title>`, and an optional
//! `<sequence name="…" number="…"/>`. Element matching is namespace-aware
//! against the FictionBook 2.0 namespace; the selector strings carried in
//! [`BookError::MissingField`] are internal constants, not a public
//! contract.
//!
//! Extraction also *resolves* the author: the joined raw `"Last, First"`
//! form is looked up in the run's [`SynonymTable`], and the resolved name
//! is recorded as an [`AuthorRewrite`] so serialization writes the
//! canonical spelling back into the document.

use quick_xml::events::Event;
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::reader::NsReader;
use tracing::debug;

use crate::error::{BookError, ShelfError};
use crate::synonyms::SynonymTable;

/// The FictionBook 2.0 XML namespace; every structural lookup matches
/// elements against it.
pub const FB2_NS: &str = "http://www.gribuser.ru/xml/fictionbook/2.0";

/// Series label used when the document declares no series.
pub const NO_SERIES_LABEL: &str = "Без серии";

/// Selector identities reported by [`BookError::MissingField`].
pub(crate) mod selector {
    pub const AUTHOR: &str = "title-info/author";
    pub const BOOK_TITLE: &str = "book-title";
}

/// Classification metadata extracted from one book, ready for path
/// construction and repackaging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookMeta {
    /// Resolved author in joined `"Last, First"` (or bare `"Last"`) form.
    pub author: String,
    /// Book title, with the two-digit series ordinal already prefixed
    /// when the document carries a parseable series number.
    pub title: String,
    /// Series name, or [`NO_SERIES_LABEL`] when none is declared.
    pub series: String,
    /// How the in-document author fields are rewritten at serialization.
    pub rewrite: AuthorRewrite,
}

/// The author-name rewrite applied to the document before repackaging.
///
/// Derived from the *resolved* full name: a comma splits it back into
/// last/first parts; without one the whole name goes into the last-name
/// field and any existing first name is left untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorRewrite {
    LastOnly { last: String },
    LastFirst { last: String, first: String },
}

/// Raw fields collected by the document scan, before any policy applies.
#[derive(Debug, Default)]
struct RawFields {
    author_seen: bool,
    first_name: Option<String>,
    last_name: Option<String>,
    book_title: Option<String>,
    sequence_seen: bool,
    sequence_name: Option<String>,
    sequence_number: Option<String>,
}

/// Which element's character data is currently being captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Capture {
    FirstName,
    LastName,
    BookTitle,
}

/// Extract and resolve classification metadata from one FB2 document.
///
/// # Errors
///
/// * [`BookError::MissingField`] (via [`ShelfError::Book`]) when the
///   author block or the book title is absent entirely
/// * [`BookError::IncompleteAuthor`] when the last name is absent or
///   empty — first name alone never classifies a book
/// * [`ShelfError::MalformedXml`] when the document does not parse;
///   fatal, not caught at the dispatch boundary
pub fn extract_meta(xml: &[u8], synonyms: &SynonymTable) -> Result<BookMeta, ShelfError> {
    let raw = scan_document(xml)?;

    if !raw.author_seen {
        return Err(BookError::MissingField {
            selector: selector::AUTHOR,
        }
        .into());
    }

    let last = match raw.last_name.as_deref().map(str::trim) {
        Some(l) if !l.is_empty() => l,
        _ => return Err(BookError::IncompleteAuthor.into()),
    };

    let mut full_name = last.to_string();
    if let Some(first) = raw.first_name.as_deref().map(str::trim) {
        if !first.is_empty() {
            full_name.push_str(", ");
            full_name.push_str(first);
        }
    }

    let resolved = synonyms.resolve(&full_name).to_string();
    let rewrite = match resolved.split_once(',') {
        Some((l, f)) => AuthorRewrite::LastFirst {
            last: l.trim().to_string(),
            first: f.trim().to_string(),
        },
        None => AuthorRewrite::LastOnly {
            last: resolved.clone(),
        },
    };

    let mut title = raw.book_title.ok_or(BookError::MissingField {
        selector: selector::BOOK_TITLE,
    })?;

    let mut series = NO_SERIES_LABEL.to_string();
    if raw.sequence_seen {
        if let Some(name) = raw.sequence_name.as_deref().map(str::trim) {
            if !name.is_empty() {
                series = name.to_string();
            }
        }
        if let Some(number) = raw.sequence_number.as_deref() {
            match number.trim().parse::<i64>() {
                Ok(n) => title = format!("{n:02} - {title}"),
                // an unparseable ordinal is not an error, the title just
                // stays unprefixed
                Err(_) => debug!("ignoring unparseable series number {number:?}"),
            }
        }
    }

    Ok(BookMeta {
        author: resolved,
        title,
        series,
        rewrite,
    })
}

/// Single streaming pass over the document collecting the raw fields.
///
/// Scope rules mirror the structural selectors: author and sequence are
/// taken from the first occurrence inside a `<title-info>` block, the
/// book title from the first `<book-title>` in document order. Only the
/// first `<author>` is consulted; co-authors do not classify the book.
fn scan_document(xml: &[u8]) -> Result<RawFields, ShelfError> {
    let mut reader = NsReader::from_reader(xml);
    let mut buf = Vec::new();

    let mut raw = RawFields::default();
    let mut title_info_depth = 0usize;
    let mut in_first_author = false;
    let mut author_done = false;
    let mut author_depth = 0usize;
    let mut depth = 0usize;
    let mut capture: Option<(Capture, String, usize)> = None;

    loop {
        let (res, event) = reader.read_resolved_event_into(&mut buf)?;
        match event {
            Event::Start(ref e) => {
                depth += 1;
                let fb2 = is_fb2(&res);
                let local = e.local_name();
                let local = local.as_ref();

                if fb2 && local == b"title-info" {
                    title_info_depth += 1;
                } else if fb2 && local == b"author" && title_info_depth > 0 {
                    if !author_done && !in_first_author {
                        in_first_author = true;
                        author_depth = depth;
                        raw.author_seen = true;
                    }
                } else if fb2 && local == b"sequence" && title_info_depth > 0 {
                    record_sequence(&mut raw, e)?;
                }

                if capture.is_none() {
                    if let Some(kind) = capture_kind(fb2, local, in_first_author, &raw) {
                        capture = Some((kind, String::new(), depth));
                    }
                }
            }
            Event::Empty(ref e) => {
                let fb2 = is_fb2(&res);
                let local = e.local_name();
                let local = local.as_ref();

                if fb2 && local == b"sequence" && title_info_depth > 0 {
                    record_sequence(&mut raw, e)?;
                } else if let Some(kind) = capture_kind(fb2, local, in_first_author, &raw) {
                    // present but empty element, e.g. `<last-name/>`
                    store_capture(&mut raw, kind, String::new());
                }
            }
            Event::Text(ref t) => {
                if let Some((_, text, _)) = capture.as_mut() {
                    text.push_str(&t.unescape()?);
                }
            }
            Event::CData(ref t) => {
                if let Some((_, text, _)) = capture.as_mut() {
                    text.push_str(&String::from_utf8_lossy(t));
                }
            }
            Event::End(ref e) => {
                if let Some((kind, text, d)) = capture.take() {
                    if d == depth {
                        store_capture(&mut raw, kind, text);
                    } else {
                        capture = Some((kind, text, d));
                    }
                }
                if in_first_author && depth == author_depth {
                    in_first_author = false;
                    author_done = true;
                }
                let local = e.local_name();
                if is_fb2(&res) && local.as_ref() == b"title-info" {
                    title_info_depth = title_info_depth.saturating_sub(1);
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(raw)
}

/// Does this element start one of the captured text fields?
fn capture_kind(
    fb2: bool,
    local: &[u8],
    in_first_author: bool,
    raw: &RawFields,
) -> Option<Capture> {
    if !fb2 {
        return None;
    }
    match local {
        b"first-name" if in_first_author && raw.first_name.is_none() => Some(Capture::FirstName),
        b"last-name" if in_first_author && raw.last_name.is_none() => Some(Capture::LastName),
        b"book-title" if raw.book_title.is_none() => Some(Capture::BookTitle),
        _ => None,
    }
}

fn store_capture(raw: &mut RawFields, kind: Capture, text: String) {
    match kind {
        Capture::FirstName => raw.first_name.get_or_insert(text),
        Capture::LastName => raw.last_name.get_or_insert(text),
        Capture::BookTitle => raw.book_title.get_or_insert(text),
    };
}

/// Record `name`/`number` off the first `<sequence>` element.
fn record_sequence(
    raw: &mut RawFields,
    e: &quick_xml::events::BytesStart<'_>,
) -> Result<(), ShelfError> {
    if raw.sequence_seen {
        return Ok(());
    }
    raw.sequence_seen = true;
    for attr in e.attributes() {
        let attr = attr?;
        match attr.key.local_name().as_ref() {
            b"name" => raw.sequence_name = Some(attr.unescape_value()?.into_owned()),
            b"number" => raw.sequence_number = Some(attr.unescape_value()?.into_owned()),
            _ => {}
        }
    }
    Ok(())
}

pub(crate) fn is_fb2(res: &ResolveResult) -> bool {
    matches!(res, ResolveResult::Bound(Namespace(ns)) if *ns == FB2_NS.as_bytes())
}
