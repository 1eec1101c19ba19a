//! Call-site scanner locating translation-call expressions.
//!
//! This is a character-level state machine, not a grammar parser: it walks
//! the raw text looking for a configured function name at a token boundary
//! followed by `(`, then consumes arguments one at a time by kind. The
//! looseness is deliberate so embedded script blocks and non-standard
//! dialects still scan.
//!
//! A call-site is only reported when at least one argument carries literal
//! text. Malformed call-sites (unterminated quote or bracket) are skipped
//! silently; scanning never fails.

pub mod mask;


use std::ops::Range;

/// Argument kinds the scanner distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    Text,
    TemplateText,
    Var,
    Obj,
    Arr,
}

/// Parse result of one call-site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameInfo {
    /// Literal/template content with `{N}` interpolation placeholders.
    pub text: String,
    /// Substituted expressions, in left-to-right order.
    pub vars: Vec<String>,
    /// Anchored match pattern over dictionary values; placeholders are `.*`.
    pub regex: String,
    /// Explicit key id bound via a `%ident%` prefix in the text.
    pub bound_name: Option<String>,
    /// Namespace/class prefix bound via a `#ident#` prefix in the text.
    pub bound_class: Option<String>,
}

impl NameInfo {
    /// Whether the call-site interpolates variables into its text.
    pub fn has_vars(&self) -> bool {
        !self.vars.is_empty()
    }
}

/// One located call-site with byte provenance.
///
/// Slicing the scanned text by `range` always reproduces `raw` exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedEntry {
    pub info: NameInfo,
    pub range: Range<usize>,
    pub raw: String,
    /// Byte spans of the text/template arguments within `raw`, in order.
    /// Patching may only touch these spans; other arguments stay verbatim.
    pub text_spans: Vec<Range<usize>>,
}

/// Scan `text` for call-sites of any of `function_names`.
pub fn scan(text: &str, function_names: &[String]) -> Vec<ScannedEntry> {
    let masked = mask::masked_ranges(text);
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut entries = Vec::new();

    let mut i = 0;
    while i < chars.len() {
        let (byte, c) = chars[i];
        if mask::is_masked(&masked, byte) || !at_boundary(&chars, i) || !is_ident_start(c) {
            i += 1;
            continue;
        }

        let Some(name) = match_function_name(text, byte, function_names) else {
            i += 1;
            continue;
        };

        // Cursor starts on the char right after the opening paren.
        let args_start = i + name.chars().count() + 1;
        let mut cursor = Cursor {
            text,
            chars: &chars,
            i: args_start,
        };
        match parse_call(&mut cursor) {
            Some(parsed) => {
                let range = byte..parsed.end_byte;
                if let Some(info) = assemble(parsed.args) {
                    let text_spans = parsed
                        .text_spans
                        .iter()
                        .map(|s| s.start - byte..s.end - byte)
                        .collect();
                    entries.push(ScannedEntry {
                        info,
                        raw: text[range.clone()].to_string(),
                        range,
                        text_spans,
                    });
                }
                i = parsed.end_char;
            }
            // Unterminated argument: drop this call-site only.
            None => i += 1,
        }
    }

    entries
}

fn at_boundary(chars: &[(usize, char)], i: usize) -> bool {
    if i == 0 {
        return true;
    }
    let prev = chars[i - 1].1;
    prev.is_whitespace()
        || matches!(
            prev,
            '$' | '.'
                | '['
                | '('
                | '{'
                | ':'
                | '='
                | ','
                | ';'
                | '!'
                | '?'
                | '&'
                | '|'
                | '+'
                | '-'
                | '*'
                | '/'
                | '%'
                | '<'
                | '>'
        )
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

/// Longest configured name starting at `byte` and immediately followed by `(`.
fn match_function_name<'a>(
    text: &str,
    byte: usize,
    function_names: &'a [String],
) -> Option<&'a str> {
    let mut best: Option<&str> = None;
    for name in function_names {
        if name.is_empty() || !text[byte..].starts_with(name.as_str()) {
            continue;
        }
        let after = byte + name.len();
        if !text[after..].starts_with('(') {
            continue;
        }
        if best.is_none_or(|b| name.len() > b.len()) {
            best = Some(name);
        }
    }
    best
}

// ============================================================
// Argument state machine
// ============================================================

enum Arg {
    Text(String),
    Template(Vec<TemplatePart>),
    Var,
    Obj,
    Arr,
}

enum TemplatePart {
    Lit(String),
    Expr(String),
}

struct Parsed {
    args: Vec<Arg>,
    /// Absolute byte spans of the text/template arguments.
    text_spans: Vec<Range<usize>>,
    /// Byte offset one past the call's closing paren.
    end_byte: usize,
    /// Char index one past the call's closing paren.
    end_char: usize,
}

struct Cursor<'a> {
    text: &'a str,
    chars: &'a [(usize, char)],
    i: usize,
}

impl Cursor<'_> {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.i).map(|&(_, c)| c)
    }

    fn byte_pos(&self) -> usize {
        self.chars
            .get(self.i)
            .map_or(self.text.len(), |&(b, _)| b)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.i += 1;
        }
        c
    }
}

/// Consume arguments up to the call's matching close paren.
///
/// Returns `None` on any unterminated argument, which invalidates the
/// whole call-site.
fn parse_call(cursor: &mut Cursor) -> Option<Parsed> {
    let mut args = Vec::new();
    let mut text_spans = Vec::new();

    loop {
        while cursor.peek().is_some_and(char::is_whitespace) {
            cursor.bump();
        }
        let kind = match cursor.peek()? {
            ')' => {
                let end_byte = cursor.byte_pos() + 1;
                cursor.bump();
                return Some(Parsed {
                    args,
                    text_spans,
                    end_byte,
                    end_char: cursor.i,
                });
            }
            ',' => {
                cursor.bump();
                continue;
            }
            '"' | '\'' => ArgKind::Text,
            '`' => ArgKind::TemplateText,
            '{' => ArgKind::Obj,
            '[' => ArgKind::Arr,
            _ => ArgKind::Var,
        };
        let arg = match kind {
            ArgKind::Text => {
                let start = cursor.byte_pos();
                let arg = Arg::Text(parse_quoted(cursor)?);
                text_spans.push(start..cursor.byte_pos());
                arg
            }
            ArgKind::TemplateText => {
                let start = cursor.byte_pos();
                let arg = Arg::Template(parse_template(cursor)?);
                text_spans.push(start..cursor.byte_pos());
                arg
            }
            ArgKind::Obj => {
                consume_balanced(cursor, '{', '}')?;
                Arg::Obj
            }
            ArgKind::Arr => {
                consume_balanced(cursor, '[', ']')?;
                Arg::Arr
            }
            ArgKind::Var => {
                parse_var(cursor)?;
                Arg::Var
            }
        };
        args.push(arg);
    }
}

fn unescape(next: char) -> char {
    match next {
        'n' => '\n',
        't' => '\t',
        'r' => '\r',
        other => other,
    }
}

fn parse_quoted(cursor: &mut Cursor) -> Option<String> {
    let quote = cursor.bump()?;
    let mut out = String::new();
    loop {
        match cursor.bump()? {
            '\\' => out.push(unescape(cursor.bump()?)),
            c if c == quote => return Some(out),
            c => out.push(c),
        }
    }
}

fn parse_template(cursor: &mut Cursor) -> Option<Vec<TemplatePart>> {
    cursor.bump()?; // opening backtick
    let mut parts = Vec::new();
    let mut lit = String::new();
    loop {
        match cursor.bump()? {
            '\\' => lit.push(unescape(cursor.bump()?)),
            '`' => {
                if !lit.is_empty() {
                    parts.push(TemplatePart::Lit(lit));
                }
                return Some(parts);
            }
            '$' if cursor.peek() == Some('{') => {
                cursor.bump(); // '{'
                if !lit.is_empty() {
                    parts.push(TemplatePart::Lit(std::mem::take(&mut lit)));
                }
                let expr = consume_interpolation(cursor)?;
                parts.push(TemplatePart::Expr(expr));
            }
            c => lit.push(c),
        }
    }
}

/// Consume a `${...}` span body up to its matching `}` (already past `${`).
///
/// Brace depth is counted explicitly so object literals nested inside the
/// interpolation are handled; quoted strings inside the span are skipped
/// so braces in them do not confuse the count.
fn consume_interpolation(cursor: &mut Cursor) -> Option<String> {
    let start = cursor.byte_pos();
    let mut depth = 1usize;
    loop {
        let byte = cursor.byte_pos();
        match cursor.bump()? {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(cursor.text[start..byte].trim().to_string());
                }
            }
            q @ ('"' | '\'' | '`') => skip_string(cursor, q)?,
            _ => {}
        }
    }
}

/// Skip a quoted string whose opening quote was just consumed.
fn skip_string(cursor: &mut Cursor, quote: char) -> Option<()> {
    loop {
        match cursor.bump()? {
            '\\' => {
                cursor.bump()?;
            }
            c if c == quote => return Some(()),
            _ => {}
        }
    }
}

/// Depth-counted consumption of an object/array argument.
fn consume_balanced(cursor: &mut Cursor, open: char, close: char) -> Option<()> {
    cursor.bump()?; // opening bracket
    let mut depth = 1usize;
    loop {
        match cursor.bump()? {
            c if c == open => depth += 1,
            c if c == close => {
                depth -= 1;
                if depth == 0 {
                    return Some(());
                }
            }
            q @ ('"' | '\'' | '`') => skip_string(cursor, q)?,
            _ => {}
        }
    }
}

/// Bare variable reference, consumed to the next top-level delimiter.
fn parse_var(cursor: &mut Cursor) -> Option<()> {
    let mut depth = 0usize;
    loop {
        match cursor.peek()? {
            ',' | ')' if depth == 0 => return Some(()),
            '(' | '[' | '{' => {
                depth += 1;
                cursor.bump();
            }
            ')' | ']' | '}' => {
                depth = depth.checked_sub(1)?;
                cursor.bump();
            }
            q @ ('"' | '\'' | '`') => {
                cursor.bump();
                skip_string(cursor, q)?;
            }
            _ => {
                cursor.bump();
            }
        }
    }
}

// ============================================================
// NameInfo assembly
// ============================================================

/// Build a `NameInfo` from parsed arguments; `None` when no argument
/// carried literal text.
fn assemble(args: Vec<Arg>) -> Option<NameInfo> {
    let mut text = String::new();
    let mut vars = Vec::new();
    let mut has_text = false;

    for arg in args {
        match arg {
            Arg::Text(s) => {
                has_text = true;
                text.push_str(&s);
            }
            Arg::Template(parts) => {
                has_text = true;
                for part in parts {
                    match part {
                        TemplatePart::Lit(s) => text.push_str(&s),
                        TemplatePart::Expr(e) => {
                            text.push_str(&format!("{{{}}}", vars.len()));
                            vars.push(e);
                        }
                    }
                }
            }
            // Object-form interpolation is disabled: var/obj/arr arguments
            // contribute neither text nor placeholders.
            Arg::Var | Arg::Obj | Arg::Arr => {}
        }
    }

    if !has_text {
        return None;
    }

    let (text, bound_name, bound_class) = strip_sigils(text);
    let regex = build_regex(&text);
    Some(NameInfo {
        text,
        vars,
        regex,
        bound_name,
        bound_class,
    })
}

/// Strip optional `%name%` / `#class#` prefixes, in either order.
fn strip_sigils(text: String) -> (String, Option<String>, Option<String>) {
    let mut text = text;
    let mut bound_name = None;
    let mut bound_class = None;
    loop {
        if bound_name.is_none() {
            if let Some((ident, rest)) = strip_sigil(&text, '%') {
                bound_name = Some(ident);
                text = rest;
                continue;
            }
        }
        if bound_class.is_none() {
            if let Some((ident, rest)) = strip_sigil(&text, '#') {
                bound_class = Some(ident);
                text = rest;
                continue;
            }
        }
        break;
    }
    (text, bound_name, bound_class)
}

fn strip_sigil(text: &str, delim: char) -> Option<(String, String)> {
    let rest = text.strip_prefix(delim)?;
    let end = rest.find(delim)?;
    let ident = &rest[..end];
    let valid = !ident.is_empty()
        && ident
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '.' | '-'));
    if !valid {
        return None;
    }
    Some((ident.to_string(), rest[end + delim.len_utf8()..].to_string()))
}

/// Anchored match pattern: literal text escaped, each `{N}` placeholder
/// genericized to `.*`.
fn build_regex(text: &str) -> String {
    let mut out = String::from("^");
    let mut rest = text;
    while let Some((start, end)) = find_placeholder(rest) {
        out.push_str(&regex::escape(&rest[..start]));
        out.push_str(".*");
        rest = &rest[end..];
    }
    out.push_str(&regex::escape(rest));
    out.push('$');
    out
}

/// Locate the next `{N}` placeholder; returns its byte span.
fn find_placeholder(text: &str) -> Option<(usize, usize)> {
    let bytes = text.as_bytes();
    let mut i = 0;
    while let Some(offset) = text[i..].find('{') {
        let start = i + offset;
        let mut j = start + 1;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if j > start + 1 && bytes.get(j) == Some(&b'}') {
            return Some((start, j + 1));
        }
        i = start + 1;
    }
    None
}
