//! The per-file [AssemblerContext]: every mutable buffer the two passes
//! touch, gathered into one value instead of the teacher's module-level
//! globals (`ic`, `dc`, `code`, `data`, `symbol_table`, ... in the original
//! C). Created fresh per source file and dropped once its outputs are
//! written, per SPEC_FULL §9.

use crate::assembler::error::ErrorKind;
use crate::assembler::externals::ExternalLog;
use crate::assembler::symbol::SymbolTable;

/// Canonical load address of the first code word
pub const MEM_START: u16 = 100;

/// Total words of memory (code + data) this machine addresses
pub const MEM_SIZE: usize = 1024;

#[derive(Default)]
pub struct AssemblerContext {
    pub code: Vec<u16>,
    pub data: Vec<u16>,
    pub symbol_table: SymbolTable,
    pub ext_log: ExternalLog,
    pub is_entry_exists: bool,
    pub is_extern_exists: bool,
}

impl AssemblerContext {
    pub fn new() -> AssemblerContext {
        AssemblerContext::default()
    }

    pub fn ic(&self) -> usize {
        self.code.len()
    }

    pub fn dc(&self) -> usize {
        self.data.len()
    }

    /// Total words committed so far; used to enforce [MEM_SIZE].
    pub fn words_used(&self) -> usize {
        self.code.len() + self.data.len()
    }

    /// Append a code word, enforcing [MEM_SIZE].
    pub fn push_code(&mut self, word: u16) -> Result<(), ErrorKind> {
        if self.words_used() >= MEM_SIZE {
            return Err(ErrorKind::MemoryOverflow { used: self.words_used(), limit: MEM_SIZE });
        }
        self.code.push(word);
        Ok(())
    }

    /// Append a data word, enforcing [MEM_SIZE].
    pub fn push_data(&mut self, word: u16) -> Result<(), ErrorKind> {
        if self.words_used() >= MEM_SIZE {
            return Err(ErrorKind::MemoryOverflow { used: self.words_used(), limit: MEM_SIZE });
        }
        self.data.push(word);
        Ok(())
    }
}
