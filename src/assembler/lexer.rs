//! Lexical primitives: whitespace handling, token extraction, and the
//! predicate tests (`is_register`, `is_symbol`, `is_number`, `is_string`)
//! used throughout both passes.
//!
//! Grounded on the teacher's hand-rolled scanning in `src/assembler.rs`
//! (it tokenises with a `Regex` rather than `str::split`, because its
//! string-literal operands need to survive a naive split-on-whitespace);
//! this module keeps that "don't just `.split()`" instinct for the same
//! reason — a label's trailing colon and a directive's comma-separated
//! list both need a scanner that understands more than plain whitespace.

use regex::Regex;

use crate::assembler::directive::Directive;
use crate::assembler::error::NameError;
use crate::assembler::opcode::Opcode;

pub const MAX_SYMBOL_LEN: usize = 30;

/// Trim leading and trailing ASCII whitespace
pub fn trim(s: &str) -> &str {
    s.trim_matches(|c: char| c == ' ' || c == '\t' || c == '\r' || c == '\n')
}

/// Return a slice beginning at the first non-whitespace byte
pub fn skip_ws(s: &str) -> &str {
    s.trim_start_matches(|c: char| c == ' ' || c == '\t')
}

/// True iff the slice contains only whitespace
pub fn is_empty(s: &str) -> bool {
    skip_ws(s).is_empty()
}

/// True iff the line should be skipped entirely: empty, or a comment
pub fn should_ignore(line: &str) -> bool {
    let s = skip_ws(line);
    s.is_empty() || s.starts_with(';')
}

/// Extract the leading label candidate from a line, using separators
/// `":\t "`. If the terminating character is `:`, it is included in the
/// token and consumed from the remainder (this is the one place colon
/// handling applies — a label is the only token that can end with one).
/// Otherwise the terminator is a whitespace run, fully consumed.
pub fn split_label(line: &str) -> (String, &str) {
    let s = skip_ws(line);
    for (i, c) in s.char_indices() {
        if c == ':' {
            return (s[..=i].to_string(), skip_ws(&s[i + 1..]));
        }
        if c == '\t' || c == ' ' {
            return (s[..i].to_string(), skip_ws(&s[i..]));
        }
    }
    (s.to_string(), "")
}

/// Look at the next token without consuming its terminating separator:
/// skip leading whitespace, then scan until a comma or whitespace (or end
/// of string). The returned remainder starts exactly at that separator
/// (or is empty), so the caller can still see whether a comma is sitting
/// right there — this is what makes `ILLEGAL_COMMA`/`CONSECUTIVE_COMMAS`
/// detectable before any token gets consumed.
pub fn peek_token(s: &str) -> (String, &str) {
    let s = skip_ws(s);
    match s.find(|c: char| c == ',' || c == '\t' || c == ' ') {
        Some(i) => (s[..i].to_string(), &s[i..]),
        None => (s.to_string(), ""),
    }
}

/// Extract a token using whitespace only as a separator, consuming it.
/// Used once the grammar around commas has already been validated (macro
/// names, `.entry`/`.extern` symbols, and operand tokens after the comma
/// itself has been located and stepped over).
pub fn take_word(s: &str) -> (String, &str) {
    let s = skip_ws(s);
    match s.find(|c: char| c == '\t' || c == ' ') {
        Some(i) => (s[..i].to_string(), skip_ws(&s[i..])),
        None => (s.to_string(), ""),
    }
}

/// `true` iff the first non-whitespace byte of `s` is a comma
pub fn starts_with_comma(s: &str) -> bool {
    skip_ws(s).starts_with(',')
}

/// `true` iff `s` contains two commas separated only by whitespace
pub fn has_consecutive_commas(s: &str) -> bool {
    Regex::new(r",[ \t]*,").unwrap().is_match(s)
}

/// Count commas in a slice
pub fn count_commas(s: &str) -> usize {
    s.chars().filter(|&c| c == ',').count()
}

/// Exact shape `@r[0-7]`
pub fn is_register(token: &str) -> bool {
    let bytes = token.as_bytes();
    bytes.len() == 3 && bytes[0] == b'@' && bytes[1] == b'r' && (b'0'..=b'7').contains(&bytes[2])
}

/// Register number (0..7) of a token already known to satisfy [is_register]
pub fn register_number(token: &str) -> u16 {
    (token.as_bytes()[2] - b'0') as u16
}

/// Validate a label/symbol/macro-name token against the common shape rules,
/// checked in the order the spec describes. Returns the bare name (colon
/// stripped, if one was required and present) on success.
pub fn validate_name(token: &str, colon_required: bool) -> Result<String, NameError> {
    let has_colon = token.ends_with(':');
    if colon_required && !has_colon {
        return Err(NameError::MissingColon);
    }
    if !colon_required && has_colon {
        return Err(NameError::UnexpectedColon);
    }

    let bare = if has_colon { &token[..token.len() - 1] } else { token };

    if bare.len() > MAX_SYMBOL_LEN {
        return Err(NameError::TooLong);
    }
    if is_register(bare) {
        return Err(NameError::IsRegister);
    }
    if Opcode::from_mnemonic(bare).is_some() {
        return Err(NameError::IsOpcode);
    }
    if Directive::from_name(bare).is_some() {
        return Err(NameError::IsDirective);
    }

    let mut chars = bare.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return Err(NameError::InvalidStart),
    }
    if !chars.all(|c| c.is_ascii_alphanumeric()) {
        return Err(NameError::InvalidChars);
    }

    Ok(bare.to_string())
}

/// Optional `+`/`-`, one required digit, then digits only
pub fn is_number(token: &str) -> bool {
    let mut chars = token.chars().peekable();
    if matches!(chars.peek(), Some('+') | Some('-')) {
        chars.next();
    }
    let rest: Vec<char> = chars.collect();
    !rest.is_empty() && rest.iter().all(|c| c.is_ascii_digit())
}

/// Parse a token already known to satisfy [is_number]
pub fn parse_number(token: &str) -> i64 {
    token.parse::<i64>().unwrap_or(0)
}

/// `#n` immediate-operand syntax: a `#` sigil followed by a numeric body
pub fn is_immediate(token: &str) -> bool {
    token.strip_prefix('#').is_some_and(is_number)
}

/// Parse the integer value of a token already known to satisfy [is_immediate]
pub fn parse_immediate(token: &str) -> i64 {
    parse_number(&token[1..])
}

/// Begins and ends with `"`, length >= 2, no interior `"`
pub fn is_string(token: &str) -> bool {
    if token.len() < 2 || !token.starts_with('"') || !token.ends_with('"') {
        return false;
    }
    let interior = &token[1..token.len() - 1];
    !interior.contains('"')
}

/// The characters between the opening and closing quotes of a token
/// already known to satisfy [is_string]
pub fn string_contents(token: &str) -> &str {
    &token[1..token.len() - 1]
}
