//! A code-generation back-end for a register-machine target: lowers basic
//! blocks of three-address IR into a flat instruction stream. See
//! `src/bin` for the driver and the reference simulator.

// Dominator info is threaded through the whole pipeline even though the
// current logic only consults live-out; keep the unused-but-carried field
// quiet rather than plumbing an `_` through every call site.
#![allow(dead_code)]

pub mod analysis;
pub mod back;
pub mod common;
pub mod error;
pub mod ir;
pub mod sim;
pub mod symtab;
pub mod target;
