//! The code-generation back-end: C1 (assembly sink), C4 (descriptor
//! engine), C5/C6 (macros and constant materialization), and C7 (the block
//! emitter that ties them together).

pub mod constant;
pub mod descriptor;
pub mod emitter;
pub mod macros;
pub mod sink;

pub use emitter::emit_program;
pub use macros::Codegen;
pub use sink::{Instr, Line, Sink};

#[cfg(test)]
mod tests;
