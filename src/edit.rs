use std::cmp::Ordering;
use std::path::PathBuf;
use thiserror::Error;

/// One offset-addressed mutation instruction, as produced by the upstream
/// analysis tool.
///
/// Offsets and lengths are byte positions into the *original* file
/// contents. Edits are never mutated after construction; the orchestrator
/// sorts a file's edits in descending order before applying them so that
/// applying one edit never shifts the offsets of edits still to come.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub kind: EditKind,
    /// Starting byte offset (inclusive).
    pub offset: usize,
    /// Length of the replaced span; zero for pure insertions/deletions.
    pub length: usize,
    /// For [`EditKind::Replace`] the literal bytes to splice in. For
    /// [`EditKind::IncludeUserHeader`] a header path, not replacement text.
    pub replacement: Vec<u8>,
}

impl Edit {
    pub fn new(kind: EditKind, offset: usize, length: usize, replacement: Vec<u8>) -> Self {
        Self {
            kind,
            offset,
            length,
            replacement,
        }
    }
}

// The order replicates the upstream tuple order (edit_type, offset,
// length, replacement), with kinds compared by their wire directive. A
// descending sort therefore puts all "r" edits ahead of all
// "include-user-header" edits, and duplicates end up adjacent.
impl Ord for Edit {
    fn cmp(&self, other: &Self) -> Ordering {
        self.kind
            .cmp(&other.kind)
            .then(self.offset.cmp(&other.offset))
            .then(self.length.cmp(&other.length))
            .then(self.replacement.cmp(&other.replacement))
    }
}

impl PartialOrd for Edit {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// The kinds of edit the upstream tool emits today.
///
/// `Other` carries any unrecognized directive through parsing so that it
/// fails at application time, where the target file is known, rather than
/// at parse time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditKind {
    /// Raw byte-range replacement (`"r"` on the wire).
    Replace,
    /// Insert a `#include "..."` directive (`"include-user-header"`).
    IncludeUserHeader,
    /// Unrecognized directive, rejected when applied.
    Other(String),
}

impl EditKind {
    pub fn parse(directive: &str) -> Self {
        match directive {
            "r" => EditKind::Replace,
            "include-user-header" => EditKind::IncludeUserHeader,
            other => EditKind::Other(other.to_string()),
        }
    }

    /// The wire directive this kind was parsed from.
    pub fn directive(&self) -> &str {
        match self {
            EditKind::Replace => "r",
            EditKind::IncludeUserHeader => "include-user-header",
            EditKind::Other(s) => s,
        }
    }
}

impl Ord for EditKind {
    fn cmp(&self, other: &Self) -> Ordering {
        self.directive().cmp(other.directive())
    }
}

impl PartialOrd for EditKind {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Error, Debug)]
pub enum ApplyError {
    #[error(
        "Conflicting replacement text: {file} at offset {offset}, length {length}: \
         {current:?} != {previous:?}"
    )]
    ConflictingReplacement {
        file: PathBuf,
        offset: usize,
        length: usize,
        current: String,
        previous: String,
    },

    #[error(
        "Overlapping replacements: {file} at offset {offset}, length {length}: {current:?} \
         and offset {previous_offset}, length {previous_length}: {previous:?}"
    )]
    OverlappingReplacement {
        file: PathBuf,
        offset: usize,
        length: usize,
        current: String,
        previous_offset: usize,
        previous_length: usize,
        previous: String,
    },

    #[error("Edit range [{offset}, {offset}+{length}) exceeds file length {file_len}: {file}")]
    RangeOutOfBounds {
        file: PathBuf,
        offset: usize,
        length: usize,
        file_len: usize,
    },

    #[error("Unrecognized edit directive {directive:?}: {file}")]
    UnrecognizedEditType { directive: String, file: PathBuf },

    #[error("No valid insertion point for {header:?} in {file}")]
    MissingInsertionPoint { header: String, file: PathBuf },

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApplyError {
    /// Errors that abort the whole batch instead of being counted and
    /// skipped. A missing insertion point is a contract violation (every
    /// file has at least a top-of-file position); I/O failures mean the
    /// file state is no longer trustworthy.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ApplyError::MissingInsertionPoint { .. } | ApplyError::Io(_)
        )
    }
}
