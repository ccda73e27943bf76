//! Splices a `#include "..."` directive into the right spot of a C/C++
//! source file.
//!
//! The insertion point is the first line that is not part of the
//! top-of-file boilerplate: comments, a BOM, include guards, system
//! includes, and the file's own primary header. A follow-up formatting
//! pass is expected to order headers within the group, so this module
//! only has to land the directive in the right section.
//!
//! Instead of one monolithic pattern, each skip rule is its own small
//! predicate over a line slice, driven by a stateful forward scan; the
//! only state is one line of lookahead for matching-name guard pairs.

use std::path::Path;

use crate::edit::ApplyError;

/// Platform suffixes stripped when deriving a primary-header stem.
const PLATFORM_SUFFIXES: &[&str] = &[
    "_android", "_aura", "_chromeos", "_ios", "_linux", "_mac", "_ozone", "_posix", "_win", "_x11",
];

/// Test suffixes stripped when deriving a primary-header stem. Longest
/// first so `_unittest` is not mistaken for `_test`.
const TEST_SUFFIXES: &[&str] = &[
    "_interactive_uitest",
    "_browsertest",
    "_unittest",
    "_uitest",
    "_test",
];

/// Insert `#include "<header>"` into `contents` at the computed point.
///
/// Idempotent: if the directive already occurs anywhere in the file this
/// is a no-op. A file with no valid insertion point at all violates the
/// contract with the upstream tool and fails fatally.
pub fn insert_user_header(
    file: &Path,
    header: &str,
    contents: &[u8],
) -> Result<Vec<u8>, ApplyError> {
    let directive = format!("#include \"{header}\"");
    if find_subslice(contents, directive.as_bytes()).is_some() {
        return Ok(contents.to_vec());
    }

    let stem = primary_header_stem(file);
    let raw_point = find_insertion_point(contents, stem.as_deref()).ok_or_else(|| {
        ApplyError::MissingInsertionPoint {
            header: header.to_string(),
            file: file.to_path_buf(),
        }
    })?;
    // Land after trailing documentation, not inside it.
    let point = skip_over_previous_comment(contents, raw_point);

    let mut text = directive.into_bytes();
    text.push(b'\n');
    // Separate the directive from a non-include section below it.
    if !contents[point..].starts_with(b"#include") {
        text.push(b'\n');
    }

    let mut out = Vec::with_capacity(contents.len() + text.len());
    out.extend_from_slice(&contents[..point]);
    out.extend_from_slice(&text);
    out.extend_from_slice(&contents[point..]);
    Ok(out)
}

/// Derive the primary-header stem for a source file:
/// `bar/foo.cc` -> `foo`, `bar/foo_posix.cc` -> `foo`,
/// `bar/foo_unittest.cc` -> `foo`, `bar/foo.h` -> `None`
/// (header files have no primary header).
pub(crate) fn primary_header_stem(file: &Path) -> Option<String> {
    let filename = file.file_name()?.to_str()?;
    let basename = match filename.rsplit_once('.') {
        Some((_, "h")) => return None,
        Some((basename, _)) => basename,
        None => filename,
    };

    let basename = strip_one_suffix(basename, TEST_SUFFIXES);
    let basename = strip_one_suffix(basename, PLATFORM_SUFFIXES);
    if basename.is_empty() {
        return None;
    }
    Some(basename.to_string())
}

fn strip_one_suffix<'a>(basename: &'a str, suffixes: &[&str]) -> &'a str {
    for suffix in suffixes {
        if let Some(stripped) = basename.strip_suffix(suffix) {
            return stripped;
        }
    }
    basename
}

/// Byte offset of the first line that fails every skip predicate.
///
/// The position just past a trailing newline counts as a (virtual, empty)
/// line, so a file consisting solely of boilerplate gets an end-of-file
/// insertion point. Returns `None` only when every line is skippable and
/// the file does not end in a newline.
fn find_insertion_point(contents: &[u8], stem: Option<&str>) -> Option<usize> {
    let mut start = 0;
    let mut guard_define_at = None;

    while start < contents.len() {
        let (line, next) = split_line(contents, start);
        let skip = guard_define_at == Some(start)
            || is_skippable_line(contents, start, line, next, stem, &mut guard_define_at);
        if !skip {
            return Some(start);
        }
        start = next;
    }

    if contents.is_empty() || contents.ends_with(b"\n") {
        Some(contents.len())
    } else {
        None
    }
}

/// Split the line starting at `start`: the line body without its
/// terminator, and the offset of the next line start.
fn split_line(contents: &[u8], start: usize) -> (&[u8], usize) {
    match contents[start..].iter().position(|&b| b == b'\n') {
        Some(i) => {
            let end = start + i;
            let body = contents[start..end].strip_suffix(b"\r").unwrap_or(&contents[start..end]);
            (body, end + 1)
        }
        None => (&contents[start..], contents.len()),
    }
}

fn is_skippable_line(
    contents: &[u8],
    start: usize,
    line: &[u8],
    next: usize,
    stem: Option<&str>,
    guard_define_at: &mut Option<usize>,
) -> bool {
    // 1. Blank or indented line (covers C-comment continuations that are
    //    indented, and blank lines whose only byte is the terminator).
    if is_ascii_space(contents[start]) {
        return true;
    }

    // 2. Line comment, block comment opener, block comment continuation.
    if line.starts_with(b"//") || line.starts_with(b"/*") || line.starts_with(b"*") {
        return true;
    }

    // 3. Byte-order mark.
    if line.starts_with(&[0xEF, 0xBB, 0xBF]) {
        return true;
    }

    // 4. Chromium-convention include guard: #ifndef/#define of an
    //    uppercase token ending in _H, _H_ or _H__.
    if is_chromium_guard_line(line) {
        return true;
    }

    // 4b. General guard: #ifndef GUARD immediately followed (modulo bare
    //     newlines) by a simple #define of the same name. Both lines are
    //     skippable; the define's position is remembered for when the
    //     scan reaches it.
    if let Some(guard) = parse_ifndef(line) {
        let mut j = next;
        while j < contents.len() && matches!(contents[j], b'\n' | b'\r') {
            j += 1;
        }
        if j < contents.len() {
            let (define_line, _) = split_line(contents, j);
            if is_matching_define(define_line, guard) {
                *guard_define_at = Some(j);
                return true;
            }
        }
    }

    // 5. System include.
    if is_system_include(line) {
        return true;
    }

    // 6. Primary-header include.
    if let Some(stem) = stem {
        if is_primary_include(line, stem) {
            return true;
        }
    }

    false
}

fn is_ascii_space(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c)
}

fn is_word_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_'
}

/// Strip leading intra-line whitespace.
fn skip_ws(bytes: &[u8]) -> &[u8] {
    let n = bytes
        .iter()
        .take_while(|&&b| matches!(b, b' ' | b'\t' | 0x0b | 0x0c))
        .count();
    &bytes[n..]
}

/// `#ifndef FOO_H_` / `#define FOO_H_` (also `_H`, `_H__`), nothing else
/// on the line.
fn is_chromium_guard_line(line: &[u8]) -> bool {
    let rest = match line
        .strip_prefix(b"#ifndef")
        .or_else(|| line.strip_prefix(b"#define"))
    {
        Some(rest) => rest,
        None => return false,
    };
    let token = match take_ws_then_word(rest) {
        Some((token, tail)) if skip_ws(tail).is_empty() => token,
        _ => return false,
    };
    if !token.iter().all(|&b| b.is_ascii_uppercase() || b.is_ascii_digit() || b == b'_') {
        return false;
    }
    for suffix in [b"_H__".as_slice(), b"_H_", b"_H"] {
        if let Some(prefix) = token.strip_suffix(suffix) {
            return !prefix.is_empty();
        }
    }
    false
}

/// `#ifndef GUARD` with nothing else on the line; returns the guard name.
fn parse_ifndef(line: &[u8]) -> Option<&[u8]> {
    let rest = line.strip_prefix(b"#ifndef")?;
    let (token, tail) = take_ws_then_word(rest)?;
    if skip_ws(tail).is_empty() {
        Some(token)
    } else {
        None
    }
}

/// `#define GUARD` or `#define GUARD 1`, nothing else on the line.
fn is_matching_define(line: &[u8], guard: &[u8]) -> bool {
    let rest = match line.strip_prefix(b"#define") {
        Some(rest) => rest,
        None => return false,
    };
    let (token, tail) = match take_ws_then_word(rest) {
        Some(split) => split,
        None => return false,
    };
    if token != guard {
        return false;
    }
    let tail = skip_ws(tail);
    tail.is_empty() || tail.strip_prefix(b"1").is_some_and(|t| skip_ws(t).is_empty())
}

/// Require at least one whitespace byte, then take the maximal word-byte
/// run (possibly empty).
fn take_ws_then_word(bytes: &[u8]) -> Option<(&[u8], &[u8])> {
    let rest = skip_ws(bytes);
    if rest.len() == bytes.len() {
        return None;
    }
    let n = rest.iter().take_while(|&&b| is_word_byte(b)).count();
    Some((&rest[..n], &rest[n..]))
}

/// `#include <...>` on one line.
fn is_system_include(line: &[u8]) -> bool {
    let rest = match line.strip_prefix(b"#include") {
        Some(rest) => rest,
        None => return false,
    };
    let rest = skip_ws(rest);
    rest.first() == Some(&b'<') && rest[1..].contains(&b'>')
}

/// `#include "any/dir/<stem>*.h"` where the quoted path's tail from the
/// stem onward contains no further directory separator, i.e. the include
/// names `<stem>.h` or a platform variant like `<stem>_posix.h` in any
/// directory.
fn is_primary_include(line: &[u8], stem: &str) -> bool {
    let rest = match line.strip_prefix(b"#include") {
        Some(rest) => rest,
        None => return false,
    };
    let rest = skip_ws(rest);
    let rest = match rest.strip_prefix(b"\"") {
        Some(rest) => rest,
        None => return false,
    };
    let close = match rest.iter().position(|&b| b == b'"') {
        Some(i) => i,
        None => return false,
    };
    quoted_path_matches_stem(&rest[..close], stem.as_bytes())
}

fn quoted_path_matches_stem(path: &[u8], stem: &[u8]) -> bool {
    if stem.is_empty() || path.len() < stem.len() {
        return false;
    }
    for i in 0..=path.len() - stem.len() {
        if &path[i..i + stem.len()] != stem {
            continue;
        }
        // Word boundary between the directory prefix and the stem.
        let prev_is_word = i > 0 && is_word_byte(path[i - 1]);
        if prev_is_word == is_word_byte(stem[0]) {
            continue;
        }
        let tail = &path[i + stem.len()..];
        if let Some(middle) = tail.strip_suffix(b".h") {
            if !middle.contains(&b'/') {
                return true;
            }
        }
    }
    false
}

/// Pull `index` backward over contiguous comment lines so an insertion
/// lands before documentation attached to the line below it. Requires
/// `index` to sit at a line start.
fn skip_over_previous_comment(contents: &[u8], mut index: usize) -> usize {
    while index > 0 && is_newline(contents[index - 1]) {
        let prev = find_start_of_previous_line(contents, index);
        let line = skip_ws(&contents[prev..index]);
        if line.starts_with(b"//") || line.starts_with(b"*") {
            index = prev;
        } else {
            break;
        }
    }
    index
}

fn is_newline(byte: u8) -> bool {
    byte == b'\n' || byte == b'\r'
}

/// `index` must point at a line start; returns the start of the line
/// before it, stepping over a single `\r\n`, `\n` or `\r` terminator.
fn find_start_of_previous_line(contents: &[u8], index: usize) -> usize {
    debug_assert!(index > 0 && is_newline(contents[index - 1]));
    let mut index = index - 1;
    if index > 0 && is_newline(contents[index - 1]) && contents[index - 1] != contents[index] {
        index -= 1;
    }
    while index > 0 && !is_newline(contents[index - 1]) {
        index -= 1;
    }
    index
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}
