//! End-to-end tests: edit stream in, rewritten files out.

use std::collections::HashSet;
use std::fs;
use std::io::Cursor;
use std::path::PathBuf;

use apply_edits::{
    apply_batch, apply_edits_to_contents, filter_edits, parse_edit_stream, BatchOptions, Edit,
    EditKind,
};
use proptest::prelude::*;
use tempfile::TempDir;

fn setup_tree() -> (TempDir, PathBuf, PathBuf) {
    let dir = TempDir::new().unwrap();
    let a = dir.path().join("a.cc");
    let b = dir.path().join("b.cc");
    fs::write(&a, "int foo(int a, int b);\nvoid bar() {}\n").unwrap();
    fs::write(&b, "f(a, b)\n").unwrap();
    (dir, a, b)
}

#[test]
fn test_stream_to_rewritten_files() {
    let (dir, a, b) = setup_tree();

    let stream = "\
r:::a.cc:::4:::3:::foofoo
include-user-header:::a.cc:::0:::0:::base/bar.h
bogus line
r:::b.cc:::5:::1:::
r:::missing.cc:::0:::0:::x
";
    let parsed = parse_edit_stream(Cursor::new(stream), dir.path()).unwrap();
    assert_eq!(parsed.parse_errors, 1);
    assert_eq!(parsed.unresolved_edits, 1);
    assert_eq!(parsed.edits.len(), 2);

    let outcome = apply_batch(parsed.edits, BatchOptions::default()).unwrap();
    assert_eq!(outcome.edits_applied, 3);
    assert_eq!(outcome.errors, 0);
    assert_eq!(outcome.files_done, 2);

    assert_eq!(
        fs::read_to_string(&a).unwrap(),
        "#include \"base/bar.h\"\n\nint foofoo(int a, int b);\nvoid bar() {}\n"
    );
    // The list-deletion extender consumed ", " before the deleted "b".
    assert_eq!(fs::read_to_string(&b).unwrap(), "f(a)\n");
}

#[test]
fn test_off_filter_files_are_never_opened_for_writing() {
    let (dir, a, b) = setup_tree();

    let stream = "r:::a.cc:::4:::3:::foofoo\nr:::b.cc:::0:::1:::g\n";
    let parsed = parse_edit_stream(Cursor::new(stream), dir.path()).unwrap();

    let allowed: HashSet<PathBuf> = [a.canonicalize().unwrap()].into_iter().collect();
    let filtered = filter_edits(parsed.edits, &allowed);
    assert_eq!(filtered.len(), 1);

    let outcome = apply_batch(filtered, BatchOptions::default()).unwrap();
    assert_eq!(outcome.edits_applied, 1);
    assert_eq!(fs::read_to_string(&b).unwrap(), "f(a, b)\n");
}

#[test]
fn test_header_insertion_is_idempotent_across_runs() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("widget.cc");
    fs::write(&file, "#include <vector>\n\nvoid w();\n").unwrap();

    let stream = "include-user-header:::widget.cc:::0:::0:::ui/widget_util.h\n";
    for _ in 0..2 {
        let parsed = parse_edit_stream(Cursor::new(stream), dir.path()).unwrap();
        apply_batch(parsed.edits, BatchOptions::default()).unwrap();
    }

    let contents = fs::read_to_string(&file).unwrap();
    assert_eq!(
        contents.matches("#include \"ui/widget_util.h\"").count(),
        1
    );
}

#[test]
fn test_duplicate_header_edits_in_one_stream_apply_once() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("widget.cc");
    fs::write(&file, "void w();\n").unwrap();

    let stream = "include-user-header:::widget.cc:::0:::0:::ui/w.h\n\
                  include-user-header:::widget.cc:::0:::0:::ui/w.h\n";
    let parsed = parse_edit_stream(Cursor::new(stream), dir.path()).unwrap();
    let outcome = apply_batch(parsed.edits, BatchOptions::default()).unwrap();

    assert_eq!(outcome.edits_applied, 1);
    assert_eq!(
        fs::read_to_string(&file).unwrap(),
        "#include \"ui/w.h\"\n\nvoid w();\n"
    );
}

#[test]
fn test_conflicting_edits_leave_one_error_in_exit_accounting() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("a.cc");
    fs::write(&file, "hello world\n").unwrap();

    let stream = "r:::a.cc:::0:::5:::AAAAA\nr:::a.cc:::0:::5:::BBBBB\n";
    let parsed = parse_edit_stream(Cursor::new(stream), dir.path()).unwrap();
    let outcome = apply_batch(parsed.edits, BatchOptions::default()).unwrap();

    assert_eq!(outcome.edits_applied, 1);
    assert_eq!(outcome.errors, 1);
    assert_eq!(fs::read_to_string(&file).unwrap(), "BBBBB world\n");
}

#[test]
fn test_newline_sentinel_decodes_in_written_file() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("a.cc");
    fs::write(&file, "STUB\n").unwrap();

    let stream = "r:::a.cc:::0:::4:::line1\0line2\n";
    let parsed = parse_edit_stream(Cursor::new(stream), dir.path()).unwrap();
    apply_batch(parsed.edits, BatchOptions::default()).unwrap();

    assert_eq!(fs::read_to_string(&file).unwrap(), "line1\nline2\n");
}

// Disjoint replacements over a fixed buffer: input order must not matter,
// because the descending sort is a pure normalization step.
proptest! {
    #[test]
    fn prop_disjoint_edits_are_order_independent(
        indices in proptest::sample::subsequence(vec![0usize, 1, 2, 3, 4], 0..=5).prop_shuffle()
    ) {
        let base = b"abcdefghijklmnopqrstuvwxyz".to_vec();
        let pool: [(usize, usize, &str); 5] = [
            (0, 2, "AA"),
            (5, 1, "bee"),
            (10, 3, "Z"),
            (15, 0, "ins"),
            (20, 4, "qq"),
        ];

        let build = |order: &[usize]| -> Vec<Edit> {
            order
                .iter()
                .map(|&i| {
                    let (offset, length, replacement) = pool[i];
                    Edit::new(EditKind::Replace, offset, length, replacement.as_bytes().to_vec())
                })
                .collect()
        };

        let mut shuffled = build(&indices);
        let mut sorted_input = {
            let mut sorted = indices.clone();
            sorted.sort_unstable();
            build(&sorted)
        };

        let file = PathBuf::from("test.cc");
        let a = apply_edits_to_contents(&file, base.clone(), &mut shuffled).unwrap();
        let b = apply_edits_to_contents(&file, base, &mut sorted_input).unwrap();

        prop_assert_eq!(a.contents, b.contents);
        prop_assert_eq!(a.edits_applied, indices.len());
        prop_assert_eq!(a.errors, 0);
    }
}
