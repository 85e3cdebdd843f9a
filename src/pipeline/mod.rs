//! Pipeline stages for sorting books into the library.
//!
//! Each submodule implements exactly one transformation step, keeping the
//! stages independently testable.
//!
//! ## Data Flow
//!
//! ```text
//! walk ──▶ extract ──▶ path ──▶ repackage ──▶ container
//! (dispatch) (FB2 meta) (target)  (XML out)    (one-entry zip)
//! ```
//!
//! 1. [`walk`]      — classify each named input by suffix and dispatch:
//!    nested archives recurse back into the walker, books run the rest of
//!    the pipeline, anything else is skipped
//! 2. [`extract`]   — namespace-aware metadata extraction from one FB2
//!    document, author-synonym resolution, series/ordinal handling
//! 3. [`path`]      — pure construction of the normalized target path
//! 4. [`repackage`] — serialize the (author-rewritten) document and write
//!    it as the sole entry of a compressed container at the target path
//! 5. [`container`] — the single-entry zip writer with legacy cp866 entry
//!    names

pub mod container;
pub mod extract;
pub mod path;
pub mod repackage;
pub mod walk;
