//! Second pass: re-walks the `.am` text, fills every operand word the
//! first pass only reserved, records external-reference sites, and
//! resolves `.entry` declarations.
//!
//! Grounded on the teacher's pattern of re-tokenising a line from scratch
//! in each pass rather than threading a parsed AST between them (SPEC_FULL
//! §9, design note "operand re-parsing in pass 2") — simpler state, at the
//! cost of re-running the lexer, which is exactly the trade the teacher's
//! own two-stage CHIP-8 pipeline makes between `preprocess` and `assemble`.

use crate::assembler::context::{AssemblerContext, MEM_START};
use crate::assembler::directive::Directive;
use crate::assembler::error::{Diagnostic, ErrorKind};
use crate::assembler::first_pass;
use crate::assembler::lexer;
use crate::assembler::opcode::Opcode;
use crate::assembler::word::{self, AddressingMode, Are};

/// Run the second pass. Mutates `ctx.code` in place, filling operand words
/// the first pass left as zero placeholders. Returns every diagnostic
/// raised; an empty vector means the pass succeeded.
pub fn run(ctx: &mut AssemblerContext, am_source: &str) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    let mut ic = 0usize;

    for (i, line) in am_source.lines().enumerate() {
        let line_num = i + 1;
        if lexer::should_ignore(line) {
            continue;
        }

        let (name_tok, rest) = line_head(line);

        if let Some(opcode) = Opcode::from_mnemonic(&name_tok) {
            ic += fill_operands(ctx, opcode, rest, ic, line_num, &mut diagnostics);
        } else if let Some(dir) = Directive::from_name(&name_tok) {
            if dir == Directive::Entry {
                resolve_entry(ctx, rest, line_num, &mut diagnostics);
            }
        }
    }

    diagnostics
}

/// Strip any leading label (already validated by the first pass) and
/// return the operation/directive name token plus its operand text.
fn line_head(line: &str) -> (String, &str) {
    let (tok1, rest1) = lexer::split_label(line);
    let op_input = if tok1.ends_with(':') { rest1 } else { line };
    let (name_tok, raw_rest) = lexer::peek_token(op_input);
    (name_tok, lexer::skip_ws(raw_rest))
}

fn resolve_entry(ctx: &mut AssemblerContext, rest: &str, line_num: usize, diagnostics: &mut Vec<Diagnostic>) {
    let (name, _) = lexer::take_word(rest);
    match ctx.symbol_table.get_mut(&name) {
        None => diagnostics.push(Diagnostic::new(ErrorKind::EntrySymbolNotFound { name }, line_num)),
        Some(sym) if sym.is_external => {
            diagnostics.push(Diagnostic::new(ErrorKind::EntryCannotBeExtern { name }, line_num))
        }
        Some(sym) => {
            sym.is_entry = true;
            ctx.is_entry_exists = true;
        }
    }
}

/// Fill in the operand word(s) for the instruction whose first word sits
/// at `ctx.code[ic]`. Returns the total word count (instruction word plus
/// operand words) so the caller can advance its own cursor identically to
/// how the first pass sized this instruction.
fn fill_operands(
    ctx: &mut AssemblerContext,
    opcode: Opcode,
    rest: &str,
    ic: usize,
    line_num: usize,
    diagnostics: &mut Vec<Diagnostic>,
) -> usize {
    let instr_word = ctx.code[ic];
    let src_mode = AddressingMode::from_bits(word::extract_bits(instr_word, 11, 9));
    let dst_mode = AddressingMode::from_bits(word::extract_bits(instr_word, 4, 2));

    let operands = first_pass::split_operands(opcode, rest, line_num).unwrap_or_default();

    if src_mode == Some(AddressingMode::RegisterDirect) && dst_mode == Some(AddressingMode::RegisterDirect) {
        if let (Some(src_tok), Some(dst_tok)) = (operands.first(), operands.get(1)) {
            let src_reg = lexer::register_number(src_tok);
            let dst_reg = lexer::register_number(dst_tok);
            ctx.code[ic + 1] = word::pack_register_pair(src_reg, dst_reg, Are::Absolute);
        }
        return 2;
    }

    let mut cursor = ic + 1;

    if let Some(mode) = src_mode {
        if let Some(token) = operands.first() {
            emit_operand(ctx, cursor, token, mode, false, line_num, diagnostics);
        }
        cursor += 1;
    }

    if let Some(mode) = dst_mode {
        let token = if src_mode.is_some() { operands.get(1) } else { operands.first() };
        if let Some(token) = token {
            emit_operand(ctx, cursor, token, mode, true, line_num, diagnostics);
        }
        cursor += 1;
    }

    cursor - ic
}

/// Encode a single operand's word at `ctx.code[cursor]`. `is_dest` selects
/// which register field a lone register operand occupies.
fn emit_operand(
    ctx: &mut AssemblerContext,
    cursor: usize,
    token: &str,
    mode: AddressingMode,
    is_dest: bool,
    line_num: usize,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let resolved = match mode {
        AddressingMode::Immediate => Some(word::pack_immediate(lexer::parse_immediate(token), Are::Absolute)),
        AddressingMode::RegisterDirect => {
            Some(word::pack_register_operand(lexer::register_number(token), is_dest, Are::Absolute))
        }
        AddressingMode::Direct => {
            let found = ctx.symbol_table.get(token).map(|s| (s.is_external, s.name.clone(), s.address));
            match found {
                None => {
                    diagnostics.push(Diagnostic::new(ErrorKind::SymbolNotFound { name: token.to_string() }, line_num));
                    None
                }
                Some((true, name, _)) => {
                    ctx.ext_log.push(name, cursor as u16 + MEM_START);
                    Some(word::pack_operand_word(0, Are::External))
                }
                Some((false, _, address)) => Some(word::pack_direct(address, Are::Relocatable)),
            }
        }
    };

    if let Some(value) = resolved {
        ctx.code[cursor] = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::assemble;

    #[test]
    fn external_jump_records_reference_and_leaves_payload_zero() {
        let result = assemble(".extern X\njmp X\n").unwrap();
        assert_eq!(result.ext.len(), 1);
        assert_eq!(result.ext[0].0, "X");
        let operand_word = result.code[1];
        assert_eq!(operand_word & 0b11, Are::External.bits());
        assert_eq!(operand_word >> 2, 0);
    }

    #[test]
    fn entry_on_extern_symbol_is_rejected() {
        let diags = assemble(".extern X\n.entry X\njmp X\n").unwrap_err();
        assert!(diags.iter().any(|d| matches!(d.kind, ErrorKind::EntryCannotBeExtern { .. })));
    }

    #[test]
    fn undefined_symbol_reference_is_reported() {
        let diags = assemble("jmp NOPE\n").unwrap_err();
        assert!(diags.iter().any(|d| matches!(d.kind, ErrorKind::SymbolNotFound { .. })));
    }
}
