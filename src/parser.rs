//! GDB Machine Interface (MI) record parser.
//!
//! Turns one line of GDB/MI output into an [`MiRecord`] tree. The grammar,
//! informally:
//!
//! ```text
//! record  := "(gdb)" | digit* type-char payload
//! payload := c-string                        for ~ @ &
//!          | class ( "," name "=" value )*   for ^ * + =
//! value   := c-string | "{" entries "}" | "[" entries "]"
//! ```
//!
//! Parsing never fails: malformed input degrades to a partial record or to
//! an empty `Prompt` record the caller can ignore.

use crate::types::{MiRecord, MiResult, MiValue, RecordKind};
use regex::Regex;
use tracing::{debug, warn};

/// Tuple/list nesting accepted before a value parse is cut off.
pub const DEFAULT_MAX_DEPTH: usize = 100;

/// GDB/MI line parser.
///
/// Stateless between lines; one instance can parse any number of lines in
/// the order the caller supplies them.
pub struct MiParser {
    // The prompt is the one line shape that is a fixed literal.
    prompt_pattern: Regex,
    max_depth: usize,
}

impl MiParser {
    pub fn new() -> Self {
        Self::with_max_depth(DEFAULT_MAX_DEPTH)
    }

    /// Parser with a custom nesting cap, for callers digesting MI output
    /// from untrusted or corrupted targets.
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            prompt_pattern: Regex::new(r"^\(gdb\)\s*$").unwrap(),
            max_depth,
        }
    }

    /// Parses one line of MI output (line terminator already stripped).
    ///
    /// Never fails: a line that does not parse as a record comes back as an
    /// empty `Prompt` record, and a record whose result list goes bad
    /// mid-way keeps the results parsed up to that point.
    pub fn parse_line(&self, line: &str) -> MiRecord {
        // The prompt takes priority; it does not fit the record shape.
        if self.prompt_pattern.is_match(line) {
            return MiRecord::prompt(None);
        }

        let digits = line
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(line.len());
        let (token, rest) = line.split_at(digits);
        let token = (!token.is_empty()).then(|| token.to_owned());
        let rest = rest.trim_start();

        let mut chars = rest.chars();
        let Some(prefix) = chars.next() else {
            return MiRecord::prompt(token);
        };
        let rest = chars.as_str().trim_start();

        let Some(kind) = RecordKind::from_prefix(prefix) else {
            debug!("unrecognized record prefix {:?}", prefix);
            return MiRecord::prompt(token);
        };

        if kind.is_stream() {
            // Anything after the closing quote is ignored.
            let (class, _) = parse_cstring(rest);
            return MiRecord {
                kind,
                token,
                class,
                results: Vec::new(),
            };
        }

        let (class, mut rest) = parse_symbol(rest);
        let mut results = Vec::new();
        loop {
            rest = rest.trim_start();
            let Some(after_comma) = rest.strip_prefix(',') else {
                break;
            };
            match self.parse_result(after_comma.trim_start(), 0) {
                Some((result, remaining)) => {
                    results.push(result);
                    rest = remaining;
                }
                None => {
                    warn!("failed to parse result, dropping the rest of the line");
                    break;
                }
            }
        }
        MiRecord {
            kind,
            token,
            class: class.to_owned(),
            results,
        }
    }

    /// Parses `name=value`. Returns `None`, consuming nothing, unless both
    /// the name and the value parse.
    fn parse_result<'a>(&self, input: &'a str, depth: usize) -> Option<(MiResult, &'a str)> {
        let (name, rest) = parse_symbol(input);
        if name.is_empty() {
            return None;
        }
        let rest = rest.trim_start().strip_prefix('=')?;
        let (value, rest) = self.parse_value(rest.trim_start(), depth)?;
        Some((
            MiResult {
                var: Some(name.to_owned()),
                value,
            },
            rest,
        ))
    }

    /// Parses one value: a quoted string, a brace/bracket sequence, or a
    /// bare identifier-like run. Returns `None` when the input does not
    /// start a value, which the entry loops use as their stop signal.
    fn parse_value<'a>(&self, input: &'a str, depth: usize) -> Option<(MiValue, &'a str)> {
        match input.chars().next()? {
            '"' => {
                let (text, rest) = parse_cstring(input);
                Some((MiValue::String(text), rest))
            }
            open @ ('{' | '[') => {
                if depth >= self.max_depth {
                    warn!("value nesting deeper than {}, truncating", self.max_depth);
                    return None;
                }
                let close = if open == '{' { '}' } else { ']' };
                let (entries, rest) = self.parse_entries(&input[1..], close, depth);
                Some((MiValue::List(entries), rest))
            }
            _ => {
                let (word, rest) = parse_bare(input);
                if word.is_empty() {
                    None
                } else {
                    Some((MiValue::String(word.to_owned()), rest))
                }
            }
        }
    }

    /// Entry loop shared by tuples and lists. An entry is tried as
    /// `name=value` first and as an anonymous value second; the order
    /// matters, since an entry name would also parse as a bare value.
    fn parse_entries<'a>(
        &self,
        mut input: &'a str,
        close: char,
        depth: usize,
    ) -> (Vec<MiResult>, &'a str) {
        let mut entries = Vec::new();
        loop {
            input = input.trim_start();
            if input.is_empty() || input.starts_with(close) {
                break;
            }
            if let Some((entry, rest)) = self.parse_result(input, depth + 1) {
                entries.push(entry);
                input = rest;
            } else if let Some((value, rest)) = self.parse_value(input, depth + 1) {
                entries.push(MiResult { var: None, value });
                input = rest;
            } else {
                // nothing consumable; keep what we have
                break;
            }
            input = input.trim_start();
            match input.strip_prefix(',') {
                Some(rest) => input = rest,
                None => break,
            }
        }
        // A missing closing bracket on truncated input is tolerated.
        (entries, input.strip_prefix(close).unwrap_or(input))
    }
}

impl Default for MiParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Decodes a quoted, backslash-escaped string starting at `input`.
///
/// Consumes up to and including the closing quote; a missing closing quote
/// consumes the rest of the input. Called on something that is not a quoted
/// string at all, it decodes nothing and consumes nothing. A malformed
/// escape keeps the backslash and the following characters as literal text
/// rather than dropping input.
fn parse_cstring(input: &str) -> (String, &str) {
    let Some(rest) = input.strip_prefix('"') else {
        return (String::new(), input);
    };
    let bytes = rest.as_bytes();
    let mut out = String::new();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'"' => return (out, &rest[i + 1..]),
            b'\\' => {
                i += 1;
                if i == bytes.len() {
                    out.push('\\');
                    break;
                }
                i = decode_escape(bytes, i, &mut out);
            }
            _ => {
                // the cursor only ever stops on char boundaries
                let c = rest[i..].chars().next().unwrap();
                out.push(c);
                i += c.len_utf8();
            }
        }
    }
    (out, "")
}

/// Decodes one escape with the cursor on the byte after the backslash;
/// returns the new cursor position. On a malformed escape the backslash is
/// emitted literally and the cursor stays on the offending byte, so the
/// characters after it pass through as plain text.
fn decode_escape(bytes: &[u8], i: usize, out: &mut String) -> usize {
    match bytes[i] {
        b'\\' => {
            out.push('\\');
            i + 1
        }
        b'"' => {
            out.push('"');
            i + 1
        }
        b'a' => {
            out.push('\x07');
            i + 1
        }
        b'b' => {
            out.push('\x08');
            i + 1
        }
        b'f' => {
            out.push('\x0c');
            i + 1
        }
        b'n' => {
            out.push('\n');
            i + 1
        }
        b'r' => {
            out.push('\r');
            i + 1
        }
        b't' => {
            out.push('\t');
            i + 1
        }
        b'v' => {
            out.push('\x0b');
            i + 1
        }
        // one or two hex digits
        b'x' | b'X' if i + 1 < bytes.len() && bytes[i + 1].is_ascii_hexdigit() => {
            let mut value = 0u32;
            let mut j = i + 1;
            while j < bytes.len() && j - i <= 2 && bytes[j].is_ascii_hexdigit() {
                value = value * 16 + (bytes[j] as char).to_digit(16).unwrap();
                j += 1;
            }
            out.push(char::from(value as u8));
            j
        }
        // one to three octal digits
        b'0'..=b'7' => {
            let mut value = 0u32;
            let mut j = i;
            while j < bytes.len() && j - i < 3 && (b'0'..=b'7').contains(&bytes[j]) {
                value = value * 8 + u32::from(bytes[j] - b'0');
                j += 1;
            }
            if value > 0xff {
                warn!("octal escape out of range, keeping it literal");
                out.push('\\');
                i
            } else {
                out.push(char::from(value as u8));
                j
            }
        }
        other => {
            warn!("unknown escape \\{}", other as char);
            out.push('\\');
            i
        }
    }
}

fn is_symbol_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || matches!(b, b'_' | b'.' | b'-')
}

fn is_symbol_byte(b: u8) -> bool {
    is_symbol_start(b) || b.is_ascii_digit()
}

/// Consumes a maximal identifier-like run (class and variable names).
/// Returns an empty prefix when the input does not start one.
fn parse_symbol(input: &str) -> (&str, &str) {
    let bytes = input.as_bytes();
    let mut end = 0;
    if bytes.first().is_some_and(|&b| is_symbol_start(b)) {
        end = 1;
        while end < bytes.len() && is_symbol_byte(bytes[end]) {
            end += 1;
        }
    }
    input.split_at(end)
}

/// Consumes a maximal run of identifier characters, digits included, for
/// anonymous list entries like `[2,3]`.
fn parse_bare(input: &str) -> (&str, &str) {
    let bytes = input.as_bytes();
    let mut end = 0;
    while end < bytes.len() && is_symbol_byte(bytes[end]) {
        end += 1;
    }
    input.split_at(end)
}
