//! Drives a whole batch: one orchestrator call per file, aggregate
//! counts, and an incremental progress line.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use crate::apply::{apply_edits_to_contents, write_file_atomic};
use crate::edit::{ApplyError, Edit};

#[derive(Debug, Clone, Copy, Default)]
pub struct BatchOptions {
    /// Apply in memory only; leave every file untouched on disk.
    pub dry_run: bool,
    /// Collect final contents of changed files into
    /// [`BatchOutcome::changed`] (for diff display).
    pub collect_changes: bool,
}

#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub edits_applied: usize,
    pub errors: usize,
    pub files_done: usize,
    /// `(path, new contents)` for files whose bytes changed; only
    /// populated when [`BatchOptions::collect_changes`] is set.
    pub changed: Vec<(PathBuf, Vec<u8>)>,
}

/// Drop edits for files outside the externally supplied allowed set
/// (e.g. the git-tracked files under the requested path prefixes).
pub fn filter_edits(
    edits: BTreeMap<PathBuf, Vec<Edit>>,
    allowed: &HashSet<PathBuf>,
) -> BTreeMap<PathBuf, Vec<Edit>> {
    edits
        .into_iter()
        .filter(|(path, _)| allowed.contains(path))
        .collect()
}

/// Apply every file's edit set, reporting progress as files complete.
///
/// Recoverable per-edit errors are counted into the outcome; a fatal
/// error (missing include insertion point, I/O failure) aborts the batch.
pub fn apply_batch(
    edits: BTreeMap<PathBuf, Vec<Edit>>,
    options: BatchOptions,
) -> Result<BatchOutcome, ApplyError> {
    let total_files = edits.len();
    let mut outcome = BatchOutcome::default();

    for (path, mut file_edits) in edits {
        let original = fs::read(&path)?;
        let file_outcome = apply_edits_to_contents(&path, original.clone(), &mut file_edits)?;

        if !options.dry_run {
            write_file_atomic(&path, &file_outcome.contents)?;
        }
        if options.collect_changes && file_outcome.contents != original {
            outcome.changed.push((path, file_outcome.contents));
        }

        outcome.edits_applied += file_outcome.edits_applied;
        outcome.errors += file_outcome.errors;
        outcome.files_done += 1;

        let percentage = (outcome.files_done as f64 / total_files as f64) * 100.0;
        print!(
            "Applied {} edits ({} errors) to {} files [{percentage:.2}%]\r",
            outcome.edits_applied, outcome.errors, outcome.files_done
        );
        let _ = io::stdout().flush();
    }
    println!();

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edit::EditKind;

    fn canonical(path: &std::path::Path) -> PathBuf {
        path.canonicalize().unwrap()
    }

    #[test]
    fn test_file_with_no_edits_roundtrips_byte_for_byte() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.cc");
        fs::write(&path, b"int x;\r\n\xff raw bytes\n").unwrap();
        let path = canonical(&path);

        let mut edits = BTreeMap::new();
        edits.insert(path.clone(), Vec::new());
        let outcome = apply_batch(edits, BatchOptions::default()).unwrap();

        assert_eq!(outcome.edits_applied, 0);
        assert_eq!(outcome.errors, 0);
        assert_eq!(fs::read(&path).unwrap(), b"int x;\r\n\xff raw bytes\n");
    }

    #[test]
    fn test_dry_run_leaves_files_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.cc");
        fs::write(&path, b"hello world").unwrap();
        let path = canonical(&path);

        let mut edits = BTreeMap::new();
        edits.insert(
            path.clone(),
            vec![Edit::new(EditKind::Replace, 0, 5, b"howdy".to_vec())],
        );
        let outcome = apply_batch(
            edits,
            BatchOptions {
                dry_run: true,
                collect_changes: true,
            },
        )
        .unwrap();

        assert_eq!(outcome.edits_applied, 1);
        assert_eq!(fs::read(&path).unwrap(), b"hello world");
        assert_eq!(outcome.changed.len(), 1);
        assert_eq!(outcome.changed[0].1, b"howdy world");
    }

    #[test]
    fn test_filter_drops_files_outside_allowed_set() {
        let dir = tempfile::tempdir().unwrap();
        let tracked = dir.path().join("tracked.cc");
        let untracked = dir.path().join("untracked.cc");
        fs::write(&tracked, b"aa").unwrap();
        fs::write(&untracked, b"bb").unwrap();
        let (tracked, untracked) = (canonical(&tracked), canonical(&untracked));

        let mut edits = BTreeMap::new();
        for path in [&tracked, &untracked] {
            edits.insert(
                path.clone(),
                vec![Edit::new(EditKind::Replace, 0, 2, b"xx".to_vec())],
            );
        }

        let allowed: HashSet<PathBuf> = [tracked.clone()].into_iter().collect();
        let filtered = filter_edits(edits, &allowed);
        assert_eq!(filtered.len(), 1);

        let outcome = apply_batch(filtered, BatchOptions::default()).unwrap();
        assert_eq!(outcome.edits_applied, 1);
        assert_eq!(fs::read(&tracked).unwrap(), b"xx");
        assert_eq!(fs::read(&untracked).unwrap(), b"bb");
    }
}
