//! Macro preprocessor: `.as` -> `.am`, inlining `mcro`/`endmcro` bodies.
//!
//! Grounded on the teacher's `preprocess` function in `src/assembler.rs`,
//! generalized from "strip comments" to the fuller `mcro`/`endmcro` dialect
//! this spec calls for; the line-at-a-time, `lines().map(...)` shape is kept.

use std::collections::HashMap;

use crate::assembler::error::{Diagnostic, ErrorKind};
use crate::assembler::lexer::{self, trim};

/// Expand `source` into its `.am` form. Returns the first error encountered;
/// per SPEC_FULL §4.2, preprocessing has no partial-success story — a
/// failure here means the caller must not write any `.am` content at all.
pub fn preprocess(source: &str) -> Result<String, Diagnostic> {
    let mut macros: HashMap<String, Vec<String>> = HashMap::new();
    let mut current: Option<(String, Vec<String>)> = None;
    let mut output: Vec<String> = Vec::new();

    for (i, line) in source.lines().enumerate() {
        let line_num = i + 1;
        let trimmed = trim(line);

        if let Some(name) = starts_with_keyword(trimmed, "mcro") {
            let (name_tok, rest) = lexer::take_word(name);
            if name_tok.is_empty() {
                return Err(Diagnostic::new(ErrorKind::McroMissingName, line_num));
            }
            if !rest.is_empty() {
                return Err(Diagnostic::new(ErrorKind::McroExtraneousText, line_num));
            }
            let valid_name = lexer::validate_name(&name_tok, false).map_err(|why| {
                Diagnostic::new(ErrorKind::McroName { name: name_tok.clone(), why }, line_num)
            })?;
            current = Some((valid_name, Vec::new()));
            continue;
        }

        if current.is_some() {
            if let Some(rest) = starts_with_keyword(trimmed, "endmcro") {
                if !rest.is_empty() {
                    return Err(Diagnostic::new(ErrorKind::EndMcroExtraneousText, line_num));
                }
                let (name, body) = current.take().unwrap();
                macros.insert(name, body);
                continue;
            }

            let (_, body) = current.as_mut().unwrap();
            body.push(line.to_string());
            continue;
        }

        if let Some(body) = macros.get(trimmed) {
            output.extend(body.iter().cloned());
            continue;
        }

        output.push(line.to_string());
    }

    if output.is_empty() {
        Ok(String::new())
    } else {
        Ok(output.join("\n") + "\n")
    }
}

/// If `trimmed` starts with `keyword` followed by a word boundary (end of
/// string or whitespace), return the remainder after the keyword (with its
/// own leading whitespace skipped). Otherwise `None`.
fn starts_with_keyword<'a>(trimmed: &'a str, keyword: &str) -> Option<&'a str> {
    let rest = trimmed.strip_prefix(keyword)?;
    if rest.is_empty() || rest.starts_with(' ') || rest.starts_with('\t') {
        Some(lexer::skip_ws(rest))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_macro_invocation() {
        let source = "mcro GREET\nLD V0, 1\nLD V1, 2\nendmcro\nGREET\nCLS\n";
        let am = preprocess(source).unwrap();
        assert_eq!(am, "LD V0, 1\nLD V1, 2\nCLS\n");
    }

    #[test]
    fn passes_unrelated_lines_through_verbatim() {
        let source = "  LD V0, 1  \nCLS\n";
        let am = preprocess(source).unwrap();
        assert_eq!(am, "  LD V0, 1  \nCLS\n");
    }

    #[test]
    fn rejects_missing_macro_name() {
        let err = preprocess("mcro\nendmcro\n").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::McroMissingName));
    }

    #[test]
    fn rejects_extraneous_text_after_macro_name() {
        let err = preprocess("mcro FOO BAR\nendmcro\n").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::McroExtraneousText));
    }

    #[test]
    fn rejects_extraneous_text_after_endmcro() {
        let err = preprocess("mcro FOO\nendmcro BAR\n").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::EndMcroExtraneousText));
    }

    #[test]
    fn idempotent_on_its_own_output() {
        let source = "mcro GREET\nLD V0, 1\nendmcro\nGREET\nCLS\n";
        let am = preprocess(source).unwrap();
        let am_again = preprocess(&am).unwrap();
        assert_eq!(am, am_again);
    }
}
