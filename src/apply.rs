//! Applies one file's edit set to its contents and writes the result
//! back.
//!
//! Edits are de-duplicated, sorted in strictly descending offset order
//! (replacements before header insertions) and applied one by one, so an
//! applied edit never invalidates the offsets of the edits still to come.
//! Conflicting and overlapping replacements are counted and reported, not
//! fatal; an unrecognized directive stops the rest of that file's edits;
//! a missing include insertion point aborts the whole run.

use std::io::{self, Write};
use std::path::Path;

use colored::Colorize;

use crate::delete::extend_deletion_if_element_in_list;
use crate::edit::{ApplyError, Edit, EditKind};
use crate::include::insert_user_header;

/// Result of applying one file's edits in memory.
#[derive(Debug)]
pub struct FileOutcome {
    pub contents: Vec<u8>,
    pub edits_applied: usize,
    pub errors: usize,
}

/// Apply a single `Replace` edit, checking it against the previously
/// applied edit for the same file.
fn apply_replacement(
    file: &Path,
    contents: &[u8],
    edit: &Edit,
    last_edit: Option<&Edit>,
) -> Result<Vec<u8>, ApplyError> {
    debug_assert_eq!(edit.kind, EditKind::Replace);

    // The stream is untrusted; offset + length may not even be
    // representable, let alone within the file.
    let end = match edit.offset.checked_add(edit.length) {
        Some(end) if end <= contents.len() => end,
        _ => {
            return Err(ApplyError::RangeOutOfBounds {
                file: file.to_path_buf(),
                offset: edit.offset,
                length: edit.length,
                file_len: contents.len(),
            })
        }
    };

    if let Some(last) = last_edit {
        if edit.offset == last.offset && edit.length == last.length {
            // Exact duplicates were already skipped, so the texts differ.
            return Err(ApplyError::ConflictingReplacement {
                file: file.to_path_buf(),
                offset: edit.offset,
                length: edit.length,
                current: lossy(&edit.replacement),
                previous: lossy(&last.replacement),
            });
        }
        // Descending application order: the current edit must end at or
        // before the start of the previously applied one.
        if end > last.offset {
            return Err(ApplyError::OverlappingReplacement {
                file: file.to_path_buf(),
                offset: edit.offset,
                length: edit.length,
                current: lossy(&edit.replacement),
                previous_offset: last.offset,
                previous_length: last.length,
                previous: lossy(&last.replacement),
            });
        }
    }

    let mut out = Vec::with_capacity(contents.len() - edit.length + edit.replacement.len());
    out.extend_from_slice(&contents[..edit.offset]);
    out.extend_from_slice(&edit.replacement);
    out.extend_from_slice(&contents[end..]);

    if edit.replacement.is_empty() {
        out = extend_deletion_if_element_in_list(contents, out, edit.offset, edit.length);
    }
    Ok(out)
}

/// Dispatch one edit to the applier for its kind.
fn apply_single_edit(
    file: &Path,
    contents: &[u8],
    edit: &Edit,
    last_edit: Option<&Edit>,
) -> Result<Vec<u8>, ApplyError> {
    match &edit.kind {
        EditKind::Replace => apply_replacement(file, contents, edit, last_edit),
        EditKind::IncludeUserHeader => {
            let header = String::from_utf8_lossy(&edit.replacement);
            insert_user_header(file, &header, contents)
        }
        EditKind::Other(directive) => Err(ApplyError::UnrecognizedEditType {
            directive: directive.clone(),
            file: file.to_path_buf(),
        }),
    }
}

/// Apply a file's edit list to `contents`.
///
/// Sorts descending, skips exact repeats of the last applied edit, and
/// accumulates applied/error counts. Recoverable errors are reported to
/// stderr; fatal ones propagate.
pub fn apply_edits_to_contents(
    file: &Path,
    mut contents: Vec<u8>,
    edits: &mut Vec<Edit>,
) -> Result<FileOutcome, ApplyError> {
    edits.sort_unstable_by(|a, b| b.cmp(a));

    let mut edits_applied = 0;
    let mut errors = 0;
    let mut last_edit: Option<Edit> = None;

    for edit in edits.iter() {
        if last_edit.as_ref() == Some(edit) {
            continue;
        }
        match apply_single_edit(file, &contents, edit, last_edit.as_ref()) {
            Ok(new_contents) => {
                contents = new_contents;
                last_edit = Some(edit.clone());
                edits_applied += 1;
            }
            Err(err) if err.is_fatal() => return Err(err),
            Err(err @ ApplyError::UnrecognizedEditType { .. }) => {
                eprintln!("{}", err.to_string().red());
                errors += 1;
                // An unknown directive means the rest of this file's
                // stream cannot be trusted.
                break;
            }
            Err(err) => {
                eprintln!("{}", err.to_string().red());
                errors += 1;
            }
        }
    }

    Ok(FileOutcome {
        contents,
        edits_applied,
        errors,
    })
}

/// Replace the whole file: tempfile in the same directory, fsync, rename,
/// then an mtime bump so incremental builds notice the change.
pub(crate) fn write_file_atomic(path: &Path, contents: &[u8]) -> Result<(), ApplyError> {
    let parent = path.parent().ok_or_else(|| {
        ApplyError::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            "path has no parent directory",
        ))
    })?;

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(contents)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| ApplyError::Io(e.error))?;

    filetime::set_file_mtime(path, filetime::FileTime::now())?;
    Ok(())
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}
