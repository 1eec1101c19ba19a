//! Tolerant reader for JS/TS-module-shaped language files.
//!
//! Language files are either strict JSON or a JS object literal wrapped in
//! module syntax. This normalizer rewrites the object-literal body into
//! strict JSON so `serde_json` can parse it: single-quoted strings become
//! double-quoted, bare identifier keys get quoted, comments and trailing
//! commas are dropped. While lexing it records the quote styles actually
//! used so the writer can reproduce them.

/// Quote style observed for keys or values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Quote {
    #[default]
    Double,
    Single,
}

impl Quote {
    pub fn char(self) -> char {
        match self {
            Quote::Double => '"',
            Quote::Single => '\'',
        }
    }
}

#[derive(Debug, Default)]
pub struct Normalized {
    pub json: String,
    pub key_quote: Quote,
    pub value_quote: Quote,
}

/// Rewrite an object-literal body into strict JSON.
pub fn normalize(body: &str) -> Normalized {
    let chars: Vec<char> = body.chars().collect();
    let mut out = String::with_capacity(body.len());
    let mut key_quote: Option<Quote> = None;
    let mut value_quote: Option<Quote> = None;

    // Container stack: true = object (keys expected), false = array.
    let mut stack: Vec<bool> = Vec::new();
    let mut expect_key = false;

    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            '{' => {
                stack.push(true);
                expect_key = true;
                out.push(c);
                i += 1;
            }
            '[' => {
                stack.push(false);
                expect_key = false;
                out.push(c);
                i += 1;
            }
            '}' | ']' => {
                stack.pop();
                expect_key = false;
                out.push(c);
                i += 1;
            }
            ':' => {
                expect_key = false;
                out.push(c);
                i += 1;
            }
            ',' => {
                // Drop trailing commas before a closing bracket.
                let mut j = i + 1;
                while j < chars.len() {
                    match chars[j] {
                        c2 if c2.is_whitespace() => j += 1,
                        '/' => {
                            let skipped = skip_comment(&chars, j);
                            if skipped == j {
                                break;
                            }
                            j = skipped;
                        }
                        _ => break,
                    }
                }
                if !matches!(chars.get(j), Some('}' | ']')) {
                    out.push(',');
                }
                expect_key = stack.last().copied().unwrap_or(false);
                i += 1;
            }
            '/' => {
                let j = skip_comment(&chars, i);
                if j == i {
                    out.push(c);
                    i += 1;
                } else {
                    i = j;
                }
            }
            '"' | '\'' => {
                let quote = if c == '"' { Quote::Double } else { Quote::Single };
                if expect_key {
                    key_quote.get_or_insert(quote);
                } else {
                    value_quote.get_or_insert(quote);
                }
                i = emit_string(&chars, i, &mut out);
            }
            c if c.is_whitespace() => {
                out.push(c);
                i += 1;
            }
            c if expect_key && is_ident_char(c) => {
                // Bare identifier key: quote it.
                let start = i;
                while i < chars.len() && is_ident_char(chars[i]) {
                    i += 1;
                }
                out.push('"');
                out.extend(&chars[start..i]);
                out.push('"');
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    Normalized {
        json: out,
        key_quote: key_quote.unwrap_or_default(),
        value_quote: value_quote.unwrap_or_default(),
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Copy a string literal to `out` double-quoted; returns the index after
/// its closing quote.
fn emit_string(chars: &[char], start: usize, out: &mut String) -> usize {
    let quote = chars[start];
    out.push('"');
    let mut i = start + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' => {
                match chars.get(i + 1) {
                    // \' is only meaningful inside single quotes; JSON wants
                    // the bare apostrophe.
                    Some('\'') => out.push('\''),
                    Some(next) => {
                        out.push('\\');
                        out.push(*next);
                    }
                    None => out.push('\\'),
                }
                i += 2;
            }
            c if c == quote => {
                out.push('"');
                return i + 1;
            }
            '"' => {
                // Inside a single-quoted string; must be escaped for JSON.
                out.push_str("\\\"");
                i += 1;
            }
            c => {
                out.push(c);
                i += 1;
            }
        }
    }
    out.push('"'); // unterminated, close defensively for the parser
    i
}

/// Returns the index after a `//` or `/* */` comment starting at `i`,
/// or `i` unchanged when this is not a comment.
fn skip_comment(chars: &[char], i: usize) -> usize {
    match chars.get(i + 1) {
        Some('/') => {
            let mut j = i + 2;
            while j < chars.len() && chars[j] != '\n' {
                j += 1;
            }
            j
        }
        Some('*') => {
            let mut j = i + 2;
            while j + 1 < chars.len() {
                if chars[j] == '*' && chars[j + 1] == '/' {
                    return j + 2;
                }
                j += 1;
            }
            chars.len()
        }
        _ => i,
    }
}
