//! Assembles source for a fictitious 12-bit word-addressed machine.
//!
//! The pipeline is two-pass, with a macro-expansion step ahead of it:
//!
//! 1. [macros::preprocess] turns `.as` source into `.am` source — macro
//!    bodies inlined at their call sites, `mcro`/`endmcro` stripped.
//! 2. [first_pass::run] builds the symbol table and sizes every instruction
//!    and directive, without resolving any operand.
//! 3. [second_pass::run] re-walks the same `.am` text, filling in every
//!    operand word the first pass reserved and recording external
//!    references and `.entry` declarations.
//!
//! This module (and everything it calls) never touches `std::fs` — it
//! takes source text in and hands generated file bodies back out. The
//! actual reads and writes live in `src/main.rs`, the thin driver this
//! spec calls for.

pub mod context;
pub mod directive;
pub mod error;
pub mod externals;
pub mod first_pass;
pub mod lexer;
pub mod macros;
pub mod opcode;
pub mod second_pass;
pub mod symbol;
pub mod word;
pub mod writer;

use context::AssemblerContext;
use error::Diagnostic;

/// Everything a successful assembly produces, in a form the output writer
/// (and any other consumer) can use without reaching back into
/// [AssemblerContext].
pub struct AssembledOutput {
    pub ic: usize,
    pub dc: usize,
    pub code: Vec<u16>,
    pub data: Vec<u16>,
    /// `.entry` labels and their final addresses, in symbol-table insertion
    /// order.
    pub entries: Vec<(String, u16)>,
    /// Every external reference site, in the order the second pass found
    /// them.
    pub ext: Vec<(String, u16)>,
    /// Whether any `.entry` was declared — gates `.ent` file creation
    /// independently of whether `entries` happens to be non-empty.
    pub has_entries: bool,
    /// Whether any `.extern` was declared — gates `.ext` file creation
    /// independently of whether `ext` happens to be non-empty.
    pub has_externals: bool,
    /// The expanded `.am` source this assembly ran against, handed back so
    /// the driver can write it out without preprocessing twice.
    pub am_source: String,
}

/// Assemble a complete `.as` source file: preprocess, then run both passes.
/// On any failure — preprocessing, first pass, or second pass — returns
/// every diagnostic raised at that stage; per SPEC_FULL §7, the second pass
/// only runs once the first pass is clean, since it walks code words the
/// first pass is responsible for having correctly sized.
pub fn assemble(source: &str) -> Result<AssembledOutput, Vec<Diagnostic>> {
    let am_source = macros::preprocess(source).map_err(|diag| vec![diag])?;
    assemble_preprocessed(&am_source)
}

/// Run both passes over already-expanded `.am` source. Exposed separately
/// from [assemble] so a driver that has already written the `.am` file
/// (and wants to avoid preprocessing twice) can reuse that text directly.
pub fn assemble_preprocessed(am_source: &str) -> Result<AssembledOutput, Vec<Diagnostic>> {
    let mut ctx = AssemblerContext::new();

    let pass1 = first_pass::run(&mut ctx, am_source);
    if !pass1.is_empty() {
        return Err(pass1);
    }

    let pass2 = second_pass::run(&mut ctx, am_source);
    if !pass2.is_empty() {
        return Err(pass2);
    }

    let entries = ctx
        .symbol_table
        .entries_iter()
        .map(|s| (s.name.clone(), s.address))
        .collect();
    let ext = ctx.ext_log.iter().map(|r| (r.name.clone(), r.reference_address)).collect();

    Ok(AssembledOutput {
        ic: ctx.ic(),
        dc: ctx.dc(),
        has_entries: ctx.is_entry_exists,
        has_externals: ctx.is_extern_exists,
        code: ctx.code,
        data: ctx.data,
        entries,
        ext,
        am_source: am_source.to_string(),
    })
}
