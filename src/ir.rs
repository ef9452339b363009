//! The IR this back-end consumes: basic blocks of three-address
//! instructions, each ending in an explicit terminator. See spec §6.
//!
//! Constructing this `Program` — lexing, parsing, symbol-table population,
//! liveness/dominator analysis — is all out of scope; the core only reads
//! it.

use crate::common::{BigInt, Id};
use derive_more::Display;
use serde::{Deserialize, Serialize};

/// A basic block's name; also used as a jump label.
pub type BlockId = Id;

/// Where an IR value to be *read* comes from.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Operand {
    /// An arbitrary-precision integer literal. Signed so that a
    /// compile-time-constant array offset can be negative (see
    /// SPEC_FULL.md's resolved open question); ordinary values are always
    /// non-negative in well-formed IR.
    Const(BigInt),
    /// A reference to a declared scalar variable.
    Scalar(Id),
    /// A reference to a declared array, valid only as the base of an
    /// indexed load/store, never as a value on its own.
    ArrayRef(Id),
    /// A compiler-generated intermediate.
    Temp(u64),
}

/// Where an IR value to be *written* goes. Restricted to the two cases the
/// descriptor engine actually tracks, so malformed destinations (an array,
/// a constant) are rejected by construction rather than at dispatch time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Display, Serialize, Deserialize)]
pub enum Descriptor {
    #[display("{_0}")]
    Var(Id),
    #[display("t{_0}")]
    Temp(u64),
}

impl Descriptor {
    pub fn from_operand(op: &Operand) -> Option<Descriptor> {
        match op {
            Operand::Scalar(id) => Some(Descriptor::Var(*id)),
            Operand::Temp(id) => Some(Descriptor::Temp(*id)),
            Operand::Const(_) | Operand::ArrayRef(_) => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, Serialize, Deserialize)]
pub enum BinOp {
    #[display("+")]
    Add,
    #[display("-")]
    Sub,
    #[display("*")]
    Mul,
    #[display("/")]
    Div,
    #[display("%")]
    Rem,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, Serialize, Deserialize)]
pub enum Cond {
    #[display("==")]
    Eq,
    #[display("!=")]
    Ne,
    #[display("<=")]
    Le,
    #[display(">=")]
    Ge,
    #[display("<")]
    Lt,
    #[display(">")]
    Gt,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Instruction {
    Get(Descriptor),
    Put(Operand),
    Move { src: Operand, dst: Descriptor },
    IndexedLoad {
        base: Id,
        offset: Operand,
        dst: Descriptor,
    },
    IndexedStore {
        src: Operand,
        base: Id,
        offset: Operand,
    },
    Binary {
        op: BinOp,
        left: Operand,
        right: Operand,
        dst: Descriptor,
    },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Terminator {
    Halt,
    Jump(BlockId),
    JumpIf {
        cond: Cond,
        left: Operand,
        right: Operand,
        if_true: BlockId,
        if_false: BlockId,
    },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BasicBlock {
    pub id: BlockId,
    pub insns: Vec<Instruction>,
    pub term: Terminator,
}

/// An ordered sequence of basic blocks. Order is emission order, not a
/// `Map`, because determinism (spec §5) requires iterating blocks in a
/// stable, caller-chosen order rather than a lexical one.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Program {
    pub blocks: Vec<BasicBlock>,
}
