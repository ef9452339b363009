//! Common definitions shared between the core's modules.

// Use sorted maps and sets so iteration order (and thus emitted code) is
// deterministic.
pub use std::collections::{BTreeMap as Map, BTreeSet as Set};

/// Identifiers: scalar names, array names, and block/label names.
pub type Id = internment::Intern<String>;

/// Arbitrary-precision signed integer, used for `Operand::Const`.
pub type BigInt = num_bigint::BigInt;

/// Arbitrary-precision non-negative integer, used wherever a value is known
/// to be a magnitude (constant materialization, address deltas).
pub type BigUint = num_bigint::BigUint;
