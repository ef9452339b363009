//! The assembly sink (C1): an append-only log of instructions, labels, and
//! comments. No semantic validation happens here — it is a write-only
//! buffer that `asm_code` renders to text.

use crate::common::{Id, Map};
use crate::ir::BlockId;
use crate::target::Register;
use derive_more::Display;

/// One instruction in the target machine's alphabet (spec §6).
#[derive(Clone, Debug, PartialEq, Eq, Display)]
pub enum Instr {
    #[display("GET {_0}")]
    Get(Register),
    #[display("PUT {_0}")]
    Put(Register),
    #[display("LOAD {_0}")]
    Load(Register),
    #[display("STORE {_0}")]
    Store(Register),
    #[display("COPY {_0}, {_1}")]
    Copy(Register, Register),
    #[display("ADD {_0}, {_1}")]
    Add(Register, Register),
    #[display("SUB {_0}, {_1}")]
    Sub(Register, Register),
    #[display("INC {_0}")]
    Inc(Register),
    #[display("DEC {_0}")]
    Dec(Register),
    #[display("HALF {_0}")]
    Half(Register),
    #[display("JUMP {_0}")]
    Jump(BlockId),
    #[display("JZERO {_0}, {_1}")]
    Jzero(Register, BlockId),
    #[display("JODD {_0}, {_1}")]
    Jodd(Register, BlockId),
    #[display("HALT")]
    Halt,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Line {
    Instr(Instr),
    Label(BlockId),
    Comment(String),
}

/// Append-only log of `Line`s, plus the per-prefix counters `fresh_label`
/// draws from.
#[derive(Debug, Default)]
pub struct Sink {
    lines: Vec<Line>,
    label_counters: Map<String, u64>,
}

impl Sink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, instr: Instr) {
        self.lines.push(Line::Instr(instr));
    }

    pub fn place_label(&mut self, name: BlockId) {
        self.lines.push(Line::Label(name));
    }

    pub fn comment(&mut self, text: impl Into<String>) {
        self.lines.push(Line::Comment(text.into()));
    }

    /// A fresh, globally-unique label formed by appending a
    /// per-prefix monotonically-increasing counter, so repeated emission
    /// of the same blocks yields byte-identical labels (spec §5).
    pub fn fresh_label(&mut self, prefix: &str) -> BlockId {
        let counter = self.label_counters.entry(prefix.to_string()).or_insert(0);
        let name = format!("{prefix}{counter}");
        *counter += 1;
        Id::new(name)
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn asm_code(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            match line {
                Line::Instr(instr) => out.push_str(&format!("    {instr}\n")),
                Line::Label(name) => out.push_str(&format!("{name}:\n")),
                Line::Comment(text) => out.push_str(&format!("    # {text}\n")),
            }
        }
        out
    }
}
