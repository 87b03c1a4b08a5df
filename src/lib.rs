//! An assembler for a fictitious 12-bit word-addressed machine, featuring:
//! - a macro preprocessor (`.as` -> `.am`)
//! - a two-pass translator producing object, entries, and externals files

pub mod assembler;
pub mod logging;
