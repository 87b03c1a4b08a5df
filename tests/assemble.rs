//! End-to-end assembly scenarios, exercising the full `.as` -> [AssembledOutput]
//! pipeline the way a driver would, without touching the filesystem.

use asm12::assembler::word::Are;
use asm12::assembler::{self, writer};

#[test]
fn string_label_gets_relocated_data_address() {
    let output = assembler::assemble("HELLO: .string \"hi\"\n").unwrap();
    assert_eq!(output.data, vec!['h' as u16, 'i' as u16, 0]);
}

#[test]
fn extern_reference_emits_external_operand_and_ext_entry() {
    let output = assembler::assemble(".extern X\njmp X\n").unwrap();
    assert_eq!(output.code.len(), 2);
    assert_eq!(output.code[1] & 0b11, Are::External.bits());
    assert_eq!(output.code[1] >> 2, 0);
    assert_eq!(output.ext, vec![("X".to_string(), asm12::assembler::context::MEM_START + 1)]);
}

#[test]
fn two_register_operands_pack_into_one_extra_word() {
    let output = assembler::assemble("mov @r3, @r5\n").unwrap();
    assert_eq!(output.code.len(), 2);
    assert_eq!(output.code[1], (3 << 7) | (5 << 2));
}

#[test]
fn immediate_and_register_preserve_negative_low_bits() {
    let output = assembler::assemble("add #-1, @r2\n").unwrap();
    assert_eq!(output.code.len(), 3);
    assert_eq!(output.code[1], 0xFFC);
    assert_eq!(output.code[2], 2 << 2);
}

#[test]
fn duplicate_label_suppresses_output() {
    let err = assembler::assemble("FOO: .data 1\nFOO: .data 2\n").unwrap_err();
    assert_eq!(err.len(), 1);
}

#[test]
fn consecutive_commas_in_data_list_is_rejected() {
    let err = assembler::assemble(".data 1, , 2\n").unwrap_err();
    assert_eq!(err.len(), 1);
}

#[test]
fn object_file_line_count_matches_ic_plus_dc() {
    let output = assembler::assemble("X: .data 1, 2, 3\nmov X, @r1\n").unwrap();
    let body = writer::write_object(&output);
    let lines: Vec<&str> = body.lines().collect();
    assert_eq!(lines.len() - 1, output.ic + output.dc);
}

#[test]
fn macro_invocation_is_inlined_before_passes_see_it() {
    let source = "mcro LOAD\nmov #1, @r0\nendmcro\nLOAD\nrts\n";
    let output = assembler::assemble(source).unwrap();
    assert_eq!(output.code.len(), 3); // instr+operand for mov, then rts
}
