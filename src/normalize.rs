//! Filesystem-safe normalization of raw metadata strings.
//!
//! Author names, series labels, and titles arrive from book metadata with
//! typographic quotes, colons, dashes, and stray whitespace that are either
//! illegal or awkward in filesystem paths. [`normalize_segment`] turns one
//! raw field into one safe path segment. Each segment is normalized in
//! isolation — never the joined path, which would eat the separators.
//!
//! The rules run in a fixed order; re-ordering them changes the output
//! (the dot-collapse pass runs before `?` → `.`, so dots produced from
//! question marks are never collapsed away).

use once_cell::sync::Lazy;
use regex::Regex;

// ── Rule 2: collapse runs of literal periods ─────────────────────────────────

// Replacement is `$1` (the last captured dot), not an empty string: a run of
// dots keeps exactly one occurrence at that position. Long-standing behaviour
// that existing library trees were built with; do not "fix" the collapse.
static RE_DOT_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\.)+").unwrap());

// ── Rule 6: collapse runs of whitespace ──────────────────────────────────────

static RE_WS_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s{2,}").unwrap());

/// Normalize one raw metadata field into a filesystem-safe path segment.
///
/// Deterministic, total, no side effects. Rules, applied in order:
///
/// 1. `«`, `»`, and `"` → `'`
/// 2. Runs of literal periods collapse to a single period
/// 3. `?` → `.`
/// 4. `:` → ` -`
/// 5. Em-dash (`—`) and en-dash (`–`) → `-`
/// 6. Runs of two-or-more whitespace characters → a single space
/// 7. Trim leading/trailing whitespace
pub fn normalize_segment(raw: &str) -> String {
    let s = raw.replace(['«', '»', '"'], "'");
    let s = RE_DOT_RUN.replace_all(&s, "$1");
    let s = s.replace('?', ".");
    let s = s.replace(':', " -");
    let s = s.replace(['—', '–'], "-");
    let s = RE_WS_RUN.replace_all(&s, " ");
    s.trim().to_string()
}
