//! Byte ranges the scanner must not report call-sites from.
//!
//! Covers `//` and `/* */` comments plus explicit marker regions:
//!
//! - `lexsync-disable` ... `lexsync-enable` masks everything in between
//! - `lexsync-disable-next-line` masks the following line
//!
//! Strings are tracked only far enough to avoid treating `//` inside a
//! quoted literal as a comment; this is a character matcher, not a parser.

use std::ops::Range;

const DISABLE_NEXT_LINE: &str = "lexsync-disable-next-line";
const DISABLE: &str = "lexsync-disable";
const ENABLE: &str = "lexsync-enable";

/// Sorted, merged byte ranges that are off-limits for call-site detection.
pub fn masked_ranges(text: &str) -> Vec<Range<usize>> {
    let comments = collect_comments(text);
    let mut ranges: Vec<Range<usize>> = Vec::new();
    let mut region_start: Option<usize> = None;

    for comment in &comments {
        ranges.push(comment.range.clone());

        let content = comment.content.trim();
        if content.starts_with(DISABLE_NEXT_LINE) {
            ranges.push(next_line_range(text, comment.range.end));
        } else if content.starts_with(ENABLE) {
            if let Some(start) = region_start.take() {
                ranges.push(start..comment.range.start);
            }
        } else if content.starts_with(DISABLE) {
            // Innermost disable wins; nested disables collapse into one region.
            if region_start.is_none() {
                region_start = Some(comment.range.end);
            }
        }
    }

    if let Some(start) = region_start {
        ranges.push(start..text.len());
    }

    merge(ranges)
}

/// Whether a byte position falls inside any masked range.
pub fn is_masked(ranges: &[Range<usize>], pos: usize) -> bool {
    // Ranges are sorted and disjoint after merge().
    match ranges.binary_search_by(|r| {
        if pos < r.start {
            std::cmp::Ordering::Greater
        } else if pos >= r.end {
            std::cmp::Ordering::Less
        } else {
            std::cmp::Ordering::Equal
        }
    }) {
        Ok(_) => true,
        Err(_) => false,
    }
}

struct Comment {
    range: Range<usize>,
    content: String,
}

fn collect_comments(text: &str) -> Vec<Comment> {
    enum State {
        Code,
        Line { start: usize },
        Block { start: usize },
        Str { quote: char },
    }

    let mut comments = Vec::new();
    let mut state = State::Code;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        match state {
            State::Code => match c {
                '/' => match chars.peek() {
                    Some((_, '/')) => {
                        chars.next();
                        state = State::Line { start: i };
                    }
                    Some((_, '*')) => {
                        chars.next();
                        state = State::Block { start: i };
                    }
                    _ => {}
                },
                '"' | '\'' | '`' => state = State::Str { quote: c },
                _ => {}
            },
            State::Line { start } => {
                if c == '\n' {
                    comments.push(Comment {
                        range: start..i,
                        content: text[start + 2..i].to_string(),
                    });
                    state = State::Code;
                }
            }
            State::Block { start } => {
                if c == '*' && matches!(chars.peek(), Some((_, '/'))) {
                    let (slash_idx, _) = chars.next().unwrap_or((i + 1, '/'));
                    comments.push(Comment {
                        range: start..slash_idx + 1,
                        content: text[start + 2..i].to_string(),
                    });
                    state = State::Code;
                }
            }
            State::Str { quote } => {
                if c == '\\' {
                    chars.next();
                } else if c == quote {
                    state = State::Code;
                }
            }
        }
    }

    // Unterminated trailing line comment or block comment masks to EOF.
    match state {
        State::Line { start } => comments.push(Comment {
            range: start..text.len(),
            content: text[start + 2..].to_string(),
        }),
        State::Block { start } => comments.push(Comment {
            range: start..text.len(),
            content: text.get(start + 2..).unwrap_or("").to_string(),
        }),
        _ => {}
    }

    comments
}

/// Full span of the line after the one containing `from`. Code on the
/// marker's own line, after a same-line block comment, stays scannable.
fn next_line_range(text: &str, from: usize) -> Range<usize> {
    let Some(nl) = text[from..].find('\n') else {
        return text.len()..text.len();
    };
    let start = from + nl + 1;
    let end = text[start..].find('\n').map_or(text.len(), |i| start + i);
    start..end
}

fn merge(mut ranges: Vec<Range<usize>>) -> Vec<Range<usize>> {
    ranges.sort_by_key(|r| (r.start, r.end));
    let mut merged: Vec<Range<usize>> = Vec::with_capacity(ranges.len());
    for range in ranges {
        match merged.last_mut() {
            Some(last) if range.start <= last.end => {
                last.end = last.end.max(range.end);
            }
            _ => merged.push(range),
        }
    }
    merged
}
