//! Line addressing over raw byte buffers.
//!
//! Lines are delimited solely by `\n` and numbered from 1. Line 1 starts at
//! byte 0. Nothing here assumes the buffer ends with a newline or holds valid
//! UTF-8, and every lookup clamps to the end of the buffer instead of
//! panicking.

use std::ops::Range;

/// Count the lines in `buffer`.
///
/// A trailing line without a terminating `\n` still counts as a line; an
/// empty buffer has zero lines.
pub fn count_lines(buffer: &[u8]) -> usize {
    let newlines = buffer.iter().filter(|&&b| b == b'\n').count();
    match buffer.last() {
        Some(b'\n') | None => newlines,
        Some(_) => newlines + 1,
    }
}

/// Count the lines touched by `range`.
///
/// An empty range touches no lines. The range is clamped to the buffer.
pub fn count_lines_in(buffer: &[u8], range: Range<usize>) -> usize {
    let end = range.end.min(buffer.len());
    let start = range.start.min(end);
    count_lines(&buffer[start..end])
}

/// Byte offset at which 1-based `line` starts.
///
/// Line numbers past the last line resolve to `buffer.len()`, so that
/// "one past the last line" addresses the end of the buffer. Line 0 is
/// treated like line 1.
pub fn byte_offset_of_line(buffer: &[u8], line: usize) -> usize {
    if line <= 1 {
        return 0;
    }
    let mut remaining = line - 1;
    for (idx, &byte) in buffer.iter().enumerate() {
        if byte == b'\n' {
            remaining -= 1;
            if remaining == 0 {
                return idx + 1;
            }
        }
    }
    buffer.len()
}

/// Byte range covering lines `start..=end`, including the newline of `end`.
///
/// When `start > end` the range is empty and sits immediately before
/// `start`, which is how insertion points are expressed.
pub fn line_range(buffer: &[u8], start: usize, end: usize) -> Range<usize> {
    let byte_start = byte_offset_of_line(buffer, start);
    if start > end {
        return byte_start..byte_start;
    }
    let byte_end = byte_offset_of_line(buffer, end + 1).max(byte_start);
    byte_start..byte_end
}

/// The literal bytes of lines `start..=end`.
///
/// Returns an empty slice when `start > end`.
pub fn extract_lines(buffer: &[u8], start: usize, end: usize) -> &[u8] {
    &buffer[line_range(buffer, start, end)]
}

/// Split `buffer` into lines, each keeping its trailing `\n`.
pub fn split_lines(buffer: &[u8]) -> Vec<&[u8]> {
    if buffer.is_empty() {
        return Vec::new();
    }
    buffer.split_inclusive(|&b| b == b'\n').collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_lines() {
        assert_eq!(count_lines(b""), 0);
        assert_eq!(count_lines(b"a"), 1);
        assert_eq!(count_lines(b"a\n"), 1);
        assert_eq!(count_lines(b"a\nb"), 2);
        assert_eq!(count_lines(b"a\nb\n"), 2);
        assert_eq!(count_lines(b"\n\n"), 2);
    }

    #[test]
    fn test_count_lines_in_range() {
        let text = b"one\ntwo\nthree\n";
        assert_eq!(count_lines_in(text, 0..4), 1);
        assert_eq!(count_lines_in(text, 0..5), 2);
        assert_eq!(count_lines_in(text, 4..4), 0);
        assert_eq!(count_lines_in(text, 8..100), 1);
    }

    #[test]
    fn test_byte_offset_of_line() {
        let text = b"a\nbb\nccc\n";
        assert_eq!(byte_offset_of_line(text, 1), 0);
        assert_eq!(byte_offset_of_line(text, 2), 2);
        assert_eq!(byte_offset_of_line(text, 3), 5);
        // One past the last line is the end of the buffer.
        assert_eq!(byte_offset_of_line(text, 4), text.len());
        assert_eq!(byte_offset_of_line(text, 40), text.len());
    }

    #[test]
    fn test_byte_offset_without_trailing_newline() {
        let text = b"a\nb";
        assert_eq!(byte_offset_of_line(text, 2), 2);
        assert_eq!(byte_offset_of_line(text, 3), 3);
    }

    #[test]
    fn test_extract_lines() {
        let text = b"a\nb\nc\n";
        assert_eq!(extract_lines(text, 2, 2), b"b\n");
        assert_eq!(extract_lines(text, 1, 3), b"a\nb\nc\n");
        assert_eq!(extract_lines(text, 3, 4), b"c\n");
        assert_eq!(extract_lines(text, 2, 1), b"");
    }

    #[test]
    fn test_extract_last_line_without_newline() {
        let text = b"a\nb";
        assert_eq!(extract_lines(text, 2, 2), b"b");
    }

    #[test]
    fn test_insertion_point_range() {
        let text = b"a\nb\n";
        assert_eq!(line_range(text, 2, 1), 2..2);
        assert_eq!(line_range(text, 3, 2), 4..4);
        assert_eq!(line_range(text, 1, 0), 0..0);
    }

    #[test]
    fn test_split_lines() {
        assert!(split_lines(b"").is_empty());
        assert_eq!(split_lines(b"a\nb"), vec![&b"a\n"[..], &b"b"[..]]);
        assert_eq!(split_lines(b"\n\n"), vec![&b"\n"[..], &b"\n"[..]]);
    }
}
