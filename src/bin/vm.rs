//! the reference simulator binary. compiles a JSON-encoded compilation unit
//! (the same shape `rmgenc` reads) and runs the resulting instruction
//! stream, feeding `--input` values to successive `GET`s and printing
//! whatever successive `PUT`s write.
//!
//! run with `--help` for more info.

use std::io::Read;

use clap::Parser;
use rmgen::analysis::{DominatorMap, LivenessMap};
use rmgen::ir::Program;
use rmgen::sim::Simulator;
use rmgen::symtab::SymbolTable;
use serde::Deserialize;

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// the input file, a JSON-encoded compilation unit; `-` reads stdin
    file: String,
    /// values fed to successive GETs, in order
    #[arg(short, long)]
    input: Vec<u64>,
    /// abort if the program runs this many instructions without halting
    #[arg(long, default_value_t = 1_000_000)]
    step_limit: u64,
}

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
    let args = Args::parse();

    let input = read_input(&args.file);
    let unit: Unit = serde_json::from_str(&input).expect("input should be a well-formed unit");

    let sink = rmgen::back::emit_program(
        &unit.program,
        &unit.symtab,
        &unit.liveness,
        &unit.dominators,
    )
    .expect("codegen should succeed on a well-formed unit");

    let mut vm = Simulator::new(&sink);
    match vm.run(&args.input, args.step_limit) {
        Ok(outputs) => {
            for v in outputs {
                println!("{v}");
            }
        }
        Err(err) => {
            eprintln!("simulation failed: {err}");
            std::process::exit(1);
        }
    }
}
