//! Target-path construction for the normalized library layout.
//!
//! Pure function of the extracted metadata: no I/O here, directory
//! creation is the repackager's side effect. Layout contract:
//!
//! ```text
//! <library root>/<author>/<series>/<title>.fb2
//! ```
//!
//! Each of the three variable segments is normalized in isolation via
//! [`normalize_segment`]; the `.fb2` extension is appended literally
//! afterwards and never normalized, so a title ending in a dot keeps the
//! dot-collapse behaviour out of the suffix. Two books with identical
//! (author, series, title) triples map to the same path — last write
//! wins at repackaging time.

use std::path::{Path, PathBuf};

use crate::normalize::normalize_segment;
use crate::pipeline::extract::BookMeta;

/// Document extension inside the library (and inside the container).
pub const BOOK_EXT: &str = ".fb2";

/// Build the target document path for one book under the library root.
pub fn build_target_path(library_root: &Path, meta: &BookMeta) -> PathBuf {
    let mut file_name = normalize_segment(&meta.title);
    file_name.push_str(BOOK_EXT);

    library_root
        .join(normalize_segment(&meta.author))
        .join(normalize_segment(&meta.series))
        .join(file_name)
}
