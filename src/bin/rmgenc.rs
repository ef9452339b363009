//! the code-generation driver. takes a JSON-encoded compilation unit
//! (basic blocks, symbol table, liveness, dominators) and prints the
//! resulting assembly, or the same program re-encoded after its analyses
//! are attached, for inspection.
//!
//! run with `--help` for more info.

use std::io::Read;

use clap::{Parser, ValueEnum};
use rmgen::analysis::{DominatorMap, LivenessMap};
use rmgen::ir::Program;
use rmgen::symtab::SymbolTable;
use serde::Deserialize;

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// the input file, a JSON-encoded `Unit`; `-` reads stdin
    file: String,
    /// the output format
    #[arg(value_enum, short, long, default_value_t = Output::Asm)]
    out: Output,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum)]
enum Output {
    /// the input program, echoed back as JSON (sanity check for a unit file)
    Program,
    /// the resulting assembly code
    Asm,
}

/// The on-disk shape `rmgenc` expects: the IR this crate's core consumes,
/// plus the read-only analysis results it's driven by.
#[derive(Debug, Deserialize)]
struct Unit {
    program: Program,
    symtab: SymbolTable,
    liveness: LivenessMap,
    #[serde(default)]
    dominators: DominatorMap,
}

fn read_input(path: &str) -> String {
    if path == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .expect("stdin should be readable utf8");
        buf
    } else {
        String::from_utf8(std::fs::read(path).expect("file should be readable"))
            .expect("input should be utf8")
    }
}

fn main() {
    env_logger::init();
    use Output::*;
    let args = Args::parse();

    let input = read_input(&args.file);
    let unit: Unit = serde_json::from_str(&input).expect("input should be a well-formed unit");

    match args.out {
        Program => {
            println!(
                "{}",
                serde_json::to_string_pretty(&unit.program).expect("program should serialize")
            );
        }
        Asm => {
            match rmgen::back::emit_program(
                &unit.program,
                &unit.symtab,
                &unit.liveness,
                &unit.dominators,
            ) {
                Ok(sink) => print!("{}", sink.asm_code()),
                Err(err) => {
                    eprintln!("codegen failed: {err}");
                    std::process::exit(1);
                }
            }
        }
    }
}
