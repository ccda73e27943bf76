//! Parses the newline-delimited edit stream emitted by the analysis tool.
//!
//! Each line is `edit_type:::path:::offset:::length:::replacement`. The
//! replacement field may contain further `:::` sequences (only the first
//! four separators split) and uses NUL bytes to stand in for embedded
//! newlines. One malformed line never aborts the stream; it is diagnosed
//! and skipped.

use std::collections::{BTreeMap, HashMap};
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};

use colored::Colorize;

use crate::edit::{Edit, EditKind};

/// Memoized raw-path -> canonical-path resolution, scoped to one parser
/// pass so repeated runs and tests stay independent.
pub struct PathResolver {
    build_dir: PathBuf,
    cache: HashMap<String, Option<PathBuf>>,
}

impl PathResolver {
    pub fn new(build_dir: impl Into<PathBuf>) -> Self {
        Self {
            build_dir: build_dir.into(),
            cache: HashMap::new(),
        }
    }

    /// Resolve a raw edit path to the canonical path of an existing file.
    ///
    /// The literal path wins if it names a file; otherwise the path is
    /// taken relative to the build directory. Unresolvable paths are
    /// diagnosed once and cached as `None`.
    pub fn resolve(&mut self, raw: &str) -> Option<PathBuf> {
        if let Some(cached) = self.cache.get(raw) {
            return cached.clone();
        }

        let candidate = if Path::new(raw).is_file() {
            Path::new(raw).to_path_buf()
        } else {
            self.build_dir.join(raw)
        };

        let resolved = match candidate.canonicalize() {
            Ok(path) if path.is_file() => Some(path),
            _ => {
                eprintln!(
                    "{}",
                    format!("Edit applies to a non-existent file: {raw}").yellow()
                );
                None
            }
        };

        self.cache.insert(raw.to_string(), resolved.clone());
        resolved
    }
}

/// Parser output: per-file edit sets plus counts of recoverable failures.
#[derive(Debug, Default)]
pub struct ParsedEdits {
    /// Resolved path -> edits, duplicates preserved for downstream
    /// de-duplication. BTreeMap keeps file iteration deterministic.
    pub edits: BTreeMap<PathBuf, Vec<Edit>>,
    /// Lines that did not split into five fields or had non-numeric
    /// offset/length.
    pub parse_errors: usize,
    /// Well-formed edits dropped because their path resolved to no
    /// existing file.
    pub unresolved_edits: usize,
}

impl ParsedEdits {
    pub fn recoverable_errors(&self) -> usize {
        self.parse_errors + self.unresolved_edits
    }
}

/// Parse the full edit stream, resolving paths against `build_dir`.
pub fn parse_edit_stream(input: impl BufRead, build_dir: &Path) -> io::Result<ParsedEdits> {
    let mut resolver = PathResolver::new(build_dir);
    let mut parsed = ParsedEdits::default();

    for line in input.lines() {
        let line = line?;
        let line = line.trim_end_matches(['\n', '\r']);
        if line.is_empty() {
            continue;
        }

        let Some((kind, raw_path, offset, length, replacement)) = split_edit_line(line) else {
            eprintln!("{}", format!("Unable to parse edit: {line}").yellow());
            parsed.parse_errors += 1;
            continue;
        };

        let Some(path) = resolver.resolve(raw_path) else {
            parsed.unresolved_edits += 1;
            continue;
        };

        parsed
            .edits
            .entry(path)
            .or_default()
            .push(Edit::new(kind, offset, length, replacement));
    }

    Ok(parsed)
}

/// Split one line into its five fields, decoding the NUL-for-newline
/// sentinel in the replacement. Returns `None` on any malformation.
fn split_edit_line(line: &str) -> Option<(EditKind, &str, usize, usize, Vec<u8>)> {
    let fields: Vec<&str> = line.splitn(5, ":::").collect();
    let [kind, path, offset, length, replacement] = fields.as_slice() else {
        return None;
    };

    let offset: usize = offset.parse().ok()?;
    let length: usize = length.parse().ok()?;
    let replacement = replacement.replace('\0', "\n").into_bytes();

    Some((EditKind::parse(kind), *path, offset, length, replacement))
}
