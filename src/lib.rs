//! apply-edits: applies batches of byte-offset edits produced by a
//! source analysis tool.
//!
//! # Architecture
//!
//! The input is a newline-delimited edit stream
//! (`edit_type:::path:::offset:::length:::replacement`). [`parse`] turns
//! it into per-file edit sets with paths resolved against a build
//! directory; [`driver`] walks the files; [`apply`] sorts one file's
//! edits into descending offset order and applies them, detecting
//! conflicting and overlapping replacements; deletions that remove a
//! list element are widened over dangling separators, and
//! `include-user-header` edits are spliced past top-of-file boilerplate
//! (guards, comments, system and primary-header includes).
//!
//! All structural decisions are lightweight lexical heuristics over raw
//! bytes; nothing here parses the target language.
//!
//! # Example
//!
//! ```no_run
//! use apply_edits::{apply_batch, parse_edit_stream, BatchOptions};
//! use std::io::BufReader;
//! use std::path::Path;
//!
//! let stream = BufReader::new(std::io::stdin());
//! let parsed = parse_edit_stream(stream, Path::new("out/gn"))?;
//! let outcome = apply_batch(parsed.edits, BatchOptions::default())?;
//! println!("applied {} edits", outcome.edits_applied);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod apply;
mod delete;
pub mod driver;
pub mod edit;
pub mod include;
pub mod parse;

// Re-exports
pub use apply::{apply_edits_to_contents, FileOutcome};
pub use driver::{apply_batch, filter_edits, BatchOptions, BatchOutcome};
pub use edit::{ApplyError, Edit, EditKind};
pub use include::insert_user_header;
pub use parse::{parse_edit_stream, ParsedEdits, PathResolver};
