//! Fatal error kinds the core can report. See spec §7.
//!
//! All three are fatal and not retryable: the back-end treats its IR as
//! already validated, so any of these indicates either malformed input or a
//! macro-design bug, not a recoverable condition.

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum CodegenError {
    /// An operand pattern the dispatcher cannot match: an array used as a
    /// value, an undeclared symbol, a negative constant in value position.
    #[error("malformed IR: {0}")]
    MalformedIr(String),

    /// `select` could not find a victim because the selection set has
    /// already reserved the whole working pool for the in-progress macro.
    #[error("register pool exhausted while emitting a single IR instruction")]
    RegisterPoolExhausted,

    /// `lea` produced a negative effective address.
    #[error("address overflow: effective address {0} is negative")]
    AddressOverflow(i64),
}
