//! First pass: builds the symbol table, sizes every instruction and
//! directive, and reserves (but does not fill) every operand word.
//!
//! Grounded on the teacher's `first_pass` in `src/assembler.rs` — the
//! tentative-insert-then-retract-on-failure shape for labels, and the
//! "abandon the line, keep going" error policy, both come from there.
//! The operand-count/mode validation tables are new (this machine's own
//! instruction set), built the same way the teacher validates CHIP-8
//! opcode operands: one match arm per mnemonic group.

use crate::assembler::context::{AssemblerContext, MEM_START};
use crate::assembler::directive::Directive;
use crate::assembler::error::{Diagnostic, ErrorKind};
use crate::assembler::lexer;
use crate::assembler::opcode::Opcode;
use crate::assembler::symbol::{StatementKind, Symbol};
use crate::assembler::word::{self, AddressingMode, Are};

/// Run the first pass over already-preprocessed (`.am`) source. Returns
/// every diagnostic raised; an empty vector means the pass succeeded.
pub fn run(ctx: &mut AssemblerContext, am_source: &str) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    for (i, line) in am_source.lines().enumerate() {
        let line_num = i + 1;
        if lexer::should_ignore(line) {
            continue;
        }
        if let Err(diag) = parse_line(ctx, line, line_num) {
            diagnostics.push(diag);
        }
    }

    ctx.symbol_table.relocate(StatementKind::Instruction, MEM_START);
    let data_offset = MEM_START + ctx.ic() as u16;
    ctx.symbol_table.relocate(StatementKind::Directive, data_offset);

    diagnostics
}

fn retract_if_present(ctx: &mut AssemblerContext, label: &Option<String>) {
    if let Some(name) = label {
        ctx.symbol_table.retract(name);
    }
}

fn parse_line(ctx: &mut AssemblerContext, line: &str, line_num: usize) -> Result<(), Diagnostic> {
    let (tok1, rest1) = lexer::split_label(line);

    let mut label: Option<String> = None;
    let op_input: &str;

    if tok1.ends_with(':') {
        match lexer::validate_name(&tok1, true) {
            Ok(name) => {
                if ctx.symbol_table.contains(&name) {
                    return Err(Diagnostic::new(ErrorKind::SymbolAlreadyExists { name }, line_num));
                }
                if lexer::is_empty(rest1) {
                    return Err(Diagnostic::new(ErrorKind::SymbolOnly { label: name }, line_num));
                }
                ctx.symbol_table.insert(Symbol::new(name.clone(), 0, StatementKind::Instruction));
                label = Some(name);
                op_input = rest1;
            }
            Err(why) => {
                return Err(Diagnostic::new(ErrorKind::Symbol { token: tok1, why }, line_num));
            }
        }
    } else {
        op_input = line;
    }

    let (name_tok, raw_rest) = lexer::peek_token(op_input);

    if lexer::starts_with_comma(raw_rest) {
        retract_if_present(ctx, &label);
        return Err(Diagnostic::new(ErrorKind::IllegalComma, line_num));
    }
    let rest = lexer::skip_ws(raw_rest);
    if lexer::has_consecutive_commas(rest) {
        retract_if_present(ctx, &label);
        return Err(Diagnostic::new(ErrorKind::ConsecutiveCommas, line_num));
    }

    if let Some(opcode) = Opcode::from_mnemonic(&name_tok) {
        let ic = ctx.ic() as u16;
        if let Some(name) = &label {
            if let Some(sym) = ctx.symbol_table.get_mut(name) {
                sym.kind = StatementKind::Instruction;
                sym.address = ic;
            }
        }
        return process_operation(ctx, opcode, rest, line_num).map_err(|e| {
            retract_if_present(ctx, &label);
            e
        });
    }

    if let Some(dir) = Directive::from_name(&name_tok) {
        match dir {
            Directive::Entry | Directive::Extern => {
                retract_if_present(ctx, &label);
            }
            Directive::Data | Directive::String => {
                let dc = ctx.dc() as u16;
                if let Some(name) = &label {
                    if let Some(sym) = ctx.symbol_table.get_mut(name) {
                        sym.kind = StatementKind::Directive;
                        sym.address = dc;
                    }
                }
            }
        }
        return process_directive(ctx, dir, rest, line_num).map_err(|e| {
            retract_if_present(ctx, &label);
            e
        });
    }

    retract_if_present(ctx, &label);
    Err(Diagnostic::new(ErrorKind::UndefinedOpDir { token: name_tok }, line_num))
}

fn detect_mode(token: &str) -> Option<AddressingMode> {
    if lexer::is_immediate(token) {
        Some(AddressingMode::Immediate)
    } else if lexer::is_register(token) {
        Some(AddressingMode::RegisterDirect)
    } else if lexer::validate_name(token, false).is_ok() {
        Some(AddressingMode::Direct)
    } else {
        None
    }
}

fn push_code(ctx: &mut AssemblerContext, word: u16, line_num: usize) -> Result<(), Diagnostic> {
    ctx.push_code(word).map_err(|kind| Diagnostic::new(kind, line_num))
}

fn push_data(ctx: &mut AssemblerContext, word: u16, line_num: usize) -> Result<(), Diagnostic> {
    ctx.push_data(word).map_err(|kind| Diagnostic::new(kind, line_num))
}

/// Split and validate the operand text of an instruction line into 0, 1,
/// or 2 operand tokens, per SPEC_FULL §4.3. Shared with the second pass,
/// which re-tokenises the same operand text rather than caching it.
pub(crate) fn split_operands(opcode: Opcode, rest: &str, line_num: usize) -> Result<Vec<String>, Diagnostic> {
    let name = opcode.mnemonic().to_string();
    let commas = lexer::count_commas(rest);

    if commas > 1 {
        return Err(Diagnostic::new(ErrorKind::OpExtraneousComma { opcode: name }, line_num));
    }

    if commas == 1 {
        let idx = rest.find(',').unwrap();
        let left = lexer::trim(&rest[..idx]);
        if left.is_empty() {
            return Err(Diagnostic::new(ErrorKind::OpMissingOperand { opcode: name }, line_num));
        }
        let (right, after) = lexer::take_word(&rest[idx + 1..]);
        if right.is_empty() {
            return Err(Diagnostic::new(ErrorKind::OpMissingOperand { opcode: name }, line_num));
        }
        if !lexer::is_empty(after) {
            return Err(Diagnostic::new(ErrorKind::OpExtraneousText { opcode: name }, line_num));
        }
        return Ok(vec![left.to_string(), right]);
    }

    let trimmed = lexer::trim(rest);
    if trimmed.is_empty() {
        if opcode != Opcode::Rts && opcode != Opcode::Stop {
            return Err(Diagnostic::new(ErrorKind::OpMissingOperand { opcode: name }, line_num));
        }
        return Ok(Vec::new());
    }

    let (tok, after) = lexer::take_word(rest);
    if !lexer::is_empty(after) {
        return Err(Diagnostic::new(ErrorKind::OpExtraneousText { opcode: name }, line_num));
    }
    Ok(vec![tok])
}

fn process_operation(
    ctx: &mut AssemblerContext,
    opcode: Opcode,
    rest: &str,
    line_num: usize,
) -> Result<(), Diagnostic> {
    let operands = split_operands(opcode, rest, line_num)?;
    let name = opcode.mnemonic().to_string();

    let mut modes = Vec::with_capacity(operands.len());
    for operand in &operands {
        match detect_mode(operand) {
            Some(mode) => modes.push(mode),
            None => {
                return Err(Diagnostic::new(
                    ErrorKind::OpInvalidAddrMode { operand: operand.clone() },
                    line_num,
                ));
            }
        }
    }

    if modes.len() != opcode.operand_count() {
        return Err(Diagnostic::new(
            ErrorKind::OpInvalidOperandsNum { opcode: name, found: modes.len(), expected: opcode.operand_count() },
            line_num,
        ));
    }

    let (src_mode, dst_mode) = match modes.len() {
        0 => (None, None),
        1 => {
            if !opcode.allows_dst_mode(modes[0]) {
                return Err(Diagnostic::new(ErrorKind::OpInvalidOperandsMode { opcode: name }, line_num));
            }
            (None, Some(modes[0]))
        }
        2 => {
            if !opcode.allows_src_mode(modes[0]) || !opcode.allows_dst_mode(modes[1]) {
                return Err(Diagnostic::new(ErrorKind::OpInvalidOperandsMode { opcode: name }, line_num));
            }
            (Some(modes[0]), Some(modes[1]))
        }
        _ => unreachable!("operand_count() never exceeds 2"),
    };

    let instruction_word = word::pack_instruction_word(src_mode, opcode, dst_mode, Are::Absolute);
    push_code(ctx, instruction_word, line_num)?;

    let extra_words = match modes.len() {
        0 => 0,
        1 => 1,
        2 if modes[0] == AddressingMode::RegisterDirect && modes[1] == AddressingMode::RegisterDirect => 1,
        2 => 2,
        _ => unreachable!("operand_count() never exceeds 2"),
    };
    for _ in 0..extra_words {
        push_code(ctx, 0, line_num)?;
    }

    Ok(())
}

fn process_directive(
    ctx: &mut AssemblerContext,
    dir: Directive,
    rest: &str,
    line_num: usize,
) -> Result<(), Diagnostic> {
    // `.entry`/`.extern` raise their own `ENTRY_MISSING_SYMBOL` on an empty
    // operand below; only `.data`/`.string` fall back to the generic
    // `DIR_MISSING_PARAMS`.
    if lexer::is_empty(rest) && matches!(dir, Directive::Data | Directive::String) {
        return Err(Diagnostic::new(
            ErrorKind::DirMissingParams { directive: dir.name().to_string() },
            line_num,
        ));
    }

    match dir {
        Directive::Data => {
            let mut remaining = rest;
            loop {
                let (tok, after) = lexer::peek_token(remaining);
                if !lexer::is_number(&tok) {
                    return Err(Diagnostic::new(ErrorKind::DataNotNum { token: tok }, line_num));
                }
                push_data(ctx, word::pack_signed(lexer::parse_number(&tok)), line_num)?;

                let after_ws = lexer::skip_ws(after);
                if after_ws.is_empty() {
                    break;
                }
                if !after_ws.starts_with(',') {
                    return Err(Diagnostic::new(ErrorKind::DataMissingComma, line_num));
                }
                remaining = lexer::skip_ws(&after_ws[1..]);
                if remaining.is_empty() {
                    return Err(Diagnostic::new(ErrorKind::DataExtraneousText, line_num));
                }
            }
            Ok(())
        }

        Directive::String => {
            let trimmed = lexer::trim(rest);
            if !lexer::is_string(trimmed) {
                return Err(Diagnostic::new(ErrorKind::StringNotStr { token: trimmed.to_string() }, line_num));
            }
            for c in lexer::string_contents(trimmed).chars() {
                push_data(ctx, c as u16, line_num)?;
            }
            push_data(ctx, 0, line_num)?;
            Ok(())
        }

        Directive::Entry | Directive::Extern => {
            let (sym_tok, after) = lexer::take_word(rest);
            if sym_tok.is_empty() {
                return Err(Diagnostic::new(ErrorKind::EntryMissingSymbol, line_num));
            }
            let name = lexer::validate_name(&sym_tok, false)
                .map_err(|why| Diagnostic::new(ErrorKind::Symbol { token: sym_tok.clone(), why }, line_num))?;
            if !lexer::is_empty(after) {
                return Err(Diagnostic::new(ErrorKind::EntryExtraneousText, line_num));
            }

            if dir == Directive::Extern {
                if ctx.symbol_table.contains(&name) {
                    return Err(Diagnostic::new(ErrorKind::SymbolAlreadyExists { name }, line_num));
                }
                ctx.symbol_table.insert(Symbol::extern_symbol(name));
                ctx.is_extern_exists = true;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_ok(source: &str) -> AssemblerContext {
        let mut ctx = AssemblerContext::new();
        let diags = run(&mut ctx, source);
        assert!(diags.is_empty(), "unexpected diagnostics: {diags:?}");
        ctx
    }

    #[test]
    fn string_directive_emits_chars_and_trailing_zero() {
        let ctx = run_ok("HELLO: .string \"hi\"\n");
        assert_eq!(ctx.data, vec!['h' as u16, 'i' as u16, 0]);
        let sym = ctx.symbol_table.get("HELLO").unwrap();
        assert_eq!(sym.kind, StatementKind::Directive);
        assert_eq!(sym.address, MEM_START + ctx.ic() as u16);
    }

    #[test]
    fn two_register_operands_pack_into_one_extra_word() {
        let ctx = run_ok("mov @r3, @r5\n");
        assert_eq!(ctx.code.len(), 2);
    }

    #[test]
    fn immediate_and_register_reserve_two_extra_words() {
        let ctx = run_ok("add #-1, @r2\n");
        assert_eq!(ctx.code.len(), 3);
    }

    #[test]
    fn duplicate_label_is_rejected() {
        let mut ctx = AssemblerContext::new();
        let diags = run(&mut ctx, "FOO: .data 1\nFOO: .data 2\n");
        assert_eq!(diags.len(), 1);
        assert!(matches!(diags[0].kind, ErrorKind::SymbolAlreadyExists { .. }));
    }

    #[test]
    fn consecutive_commas_in_data_list_are_rejected() {
        let mut ctx = AssemblerContext::new();
        let diags = run(&mut ctx, ".data 1, , 2\n");
        assert_eq!(diags.len(), 1);
        assert!(matches!(diags[0].kind, ErrorKind::ConsecutiveCommas));
    }

    #[test]
    fn extern_declares_external_symbol() {
        let ctx = run_ok(".extern X\njmp X\n");
        let sym = ctx.symbol_table.get("X").unwrap();
        assert!(sym.is_external);
        assert!(ctx.is_extern_exists);
    }

    #[test]
    fn label_before_entry_is_silently_discarded() {
        let ctx = run_ok("FOO: .entry BAR\nBAR: .data 1\n");
        assert!(!ctx.symbol_table.contains("FOO"));
        assert!(ctx.symbol_table.contains("BAR"));
    }

    #[test]
    fn entry_with_no_symbol_raises_its_own_error_not_dir_missing_params() {
        let mut ctx = AssemblerContext::new();
        let diags = run(&mut ctx, ".entry\n");
        assert_eq!(diags.len(), 1);
        assert!(matches!(diags[0].kind, ErrorKind::EntryMissingSymbol));
    }

    #[test]
    fn extern_with_no_symbol_raises_its_own_error_not_dir_missing_params() {
        let mut ctx = AssemblerContext::new();
        let diags = run(&mut ctx, ".extern\n");
        assert_eq!(diags.len(), 1);
        assert!(matches!(diags[0].kind, ErrorKind::EntryMissingSymbol));
    }

    #[test]
    fn data_with_no_params_still_raises_dir_missing_params() {
        let mut ctx = AssemblerContext::new();
        let diags = run(&mut ctx, ".data\n");
        assert_eq!(diags.len(), 1);
        assert!(matches!(diags[0].kind, ErrorKind::DirMissingParams { .. }));
    }

    #[test]
    fn missing_operand_on_two_operand_opcode() {
        let mut ctx = AssemblerContext::new();
        let diags = run(&mut ctx, "mov @r1\n");
        assert_eq!(diags.len(), 1);
        assert!(matches!(diags[0].kind, ErrorKind::OpInvalidOperandsNum { .. }));
    }

    #[test]
    fn lea_rejects_immediate_source_mode() {
        let mut ctx = AssemblerContext::new();
        let diags = run(&mut ctx, "lea #1, @r1\n");
        assert_eq!(diags.len(), 1);
        assert!(matches!(diags[0].kind, ErrorKind::OpInvalidOperandsMode { .. }));
    }
}
