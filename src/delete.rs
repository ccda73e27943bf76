//! Widens a pure deletion so that removing a list element does not leave
//! a dangling separator behind.
//!
//! Refactoring tools can emit a deletion covering just the element text;
//! this pass looks one non-whitespace byte either side of the hole and
//! consumes an adjacent `,` (or the separator before the hole) as needed.
//! Replacing the element with a single space instead of empty text
//! suppresses the extension entirely.

fn is_whitespace(byte: u8) -> bool {
    matches!(byte, b'\t' | b'\n' | b'\r' | b' ')
}

/// Extend a zero-length replacement at `offset` (with original span
/// `length`) over an adjacent list separator.
///
/// `original` is the buffer before the deletion, `contents` the buffer
/// with the deletion already applied. Only a fixed set of separator and
/// opening-bracket bytes (`,` `:` `(` `{`) participates; semicolons and
/// multi-byte separators are deliberately outside this heuristic.
pub(crate) fn extend_deletion_if_element_in_list(
    original: &[u8],
    mut contents: Vec<u8>,
    offset: usize,
    length: usize,
) -> Vec<u8> {
    let mut char_before = None;
    let mut left_trim = 0;
    for &byte in contents[..offset].iter().rev() {
        left_trim += 1;
        if is_whitespace(byte) {
            continue;
        }
        if matches!(byte, b',' | b':' | b'(' | b'{') {
            char_before = Some(byte);
        }
        break;
    }

    let mut char_after = None;
    let mut right_trim = 0;
    for &byte in &contents[offset..] {
        right_trim += 1;
        if is_whitespace(byte) {
            continue;
        }
        if byte == b',' {
            char_after = Some(byte);
        }
        break;
    }

    if char_before.is_some() {
        if char_after.is_some() {
            // Trailing separator: merge the hole with the gap up to and
            // including the following comma.
            notify(original, offset, length, 0, right_trim);
            contents.drain(offset..offset + right_trim);
        } else if matches!(char_before, Some(b',') | Some(b':')) {
            // Last element: consume the leading separator and the
            // whitespace between it and the hole.
            notify(original, offset, length, left_trim, 0);
            contents.drain(offset - left_trim..offset);
        }
    }
    contents
}

/// Audit trail for every extension: the literal deleted text, the
/// extended text, and five bytes of context either side.
fn notify(original: &[u8], offset: usize, length: usize, left: usize, right: usize) {
    let (start, end) = (offset, offset + length);
    let deleted = String::from_utf8_lossy(&original[start..end]).into_owned();
    let (start, end) = (start - left, end + right);
    let extended = String::from_utf8_lossy(&original[start..end]).into_owned();
    let (start, end) = (start.saturating_sub(5), (end + 5).min(original.len()));
    let context = String::from_utf8_lossy(&original[start..end]);
    println!("Extended deletion of \"{deleted}\" to \"{extended}\" in \"...{context}...\"");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delete(source: &str, offset: usize, length: usize) -> String {
        let mut mutated = source.as_bytes().to_vec();
        mutated.drain(offset..offset + length);
        let out = extend_deletion_if_element_in_list(source.as_bytes(), mutated, offset, length);
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_middle_element_with_separator_needs_no_extension() {
        // The deletion already covers ", b"; nothing dangling remains.
        assert_eq!(delete("f(a, b, c)", 3, 3), "f(a, c)");
    }

    #[test]
    fn test_last_element_consumes_leading_separator() {
        assert_eq!(delete("f(a, b)", 5, 1), "f(a)");
    }

    #[test]
    fn test_first_element_consumes_trailing_separator() {
        assert_eq!(delete("f(a, b, c)", 2, 1), "f( b, c)");
    }

    #[test]
    fn test_colon_separator_before_hole() {
        assert_eq!(delete("foo: bar", 4, 4), "foo");
    }

    #[test]
    fn test_brace_before_hole_without_comma_after() {
        // `{` before and no comma after: nothing to extend.
        assert_eq!(delete("{x}", 1, 1), "{}");
    }

    #[test]
    fn test_no_extension_outside_list_context() {
        assert_eq!(delete("a b c", 2, 1), "a  c");
    }

    #[test]
    fn test_whitespace_between_hole_and_comma_is_merged() {
        // Deleting "b" leaves "f(a,  , c)"; the gap and the comma go too.
        assert_eq!(delete("f(a,  b , c)", 6, 1), "f(a,   c)");
    }
}
