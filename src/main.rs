use std::{env, fs, process};

use asm12::assembler::{
    self,
    error::{Diagnostic, ErrorKind},
};

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        println!("{}", Diagnostic::without_line(ErrorKind::NotEnoughParams));
        process::exit(1);
    }

    for basename in &args[1..] {
        process_file(basename);
    }
}

/// Assemble one source file end to end: read `.as`, preprocess into `.am`,
/// run both passes, and write `.ob`/`.ent`/`.ext` on success. Every failure
/// is reported and this file's outputs are skipped; later basenames on the
/// command line are unaffected (SPEC_FULL §6 — per-file isolation, overall
/// exit code stays 0). Every diagnostic, line-attributed or not, prints on
/// stdout through the `ERROR: ...` `Display` impl (SPEC_FULL §6/§7).
fn process_file(basename: &str) {
    let as_path = format!("{basename}.as");
    let source = match fs::read_to_string(&as_path) {
        Ok(source) => source,
        Err(e) => {
            report(ErrorKind::InputOpenError { path: as_path, reason: e.to_string() });
            return;
        }
    };

    println!("assembling {as_path}");

    let am_source = match assembler::macros::preprocess(&source) {
        Ok(am_source) => am_source,
        Err(diagnostic) => {
            println!("{diagnostic}");
            return;
        }
    };

    let am_path = format!("{basename}.am");
    if let Err(e) = fs::write(&am_path, &am_source) {
        report(ErrorKind::OutputWriteError { path: am_path, reason: e.to_string() });
        return;
    }

    match assembler::assemble_preprocessed(&am_source) {
        Ok(output) => write_outputs(basename, &output),
        Err(diagnostics) => {
            for diagnostic in diagnostics {
                println!("{diagnostic}");
            }
        }
    }
}

fn write_outputs(basename: &str, output: &assembler::AssembledOutput) {
    write_body(&format!("{basename}.ob"), assembler::writer::write_object(output));

    if let Some(body) = assembler::writer::write_entries(output) {
        write_body(&format!("{basename}.ent"), body);
    }
    if let Some(body) = assembler::writer::write_externals(output) {
        write_body(&format!("{basename}.ext"), body);
    }
}

fn write_body(path: &str, body: String) {
    if let Err(e) = fs::write(path, body) {
        report(ErrorKind::OutputWriteError { path: path.to_string(), reason: e.to_string() });
    }
}

fn report(kind: ErrorKind) {
    println!("{}", Diagnostic::without_line(kind));
}
