//! Constant materialization (C6): place a non-negative integer into a
//! register with the shortest of two sequences (spec §4.5).

use crate::back::sink::{Instr, Sink};
use crate::common::BigUint;
use crate::target::Register;
use num_traits::{One, ToPrimitive, Zero};

/// Unary costs `v` instructions; binary costs `bits - 1` doublings plus
/// `popcount` increments. `materialize` and `cost` both pick a form by
/// comparing `v` against `bits - 1 + popcount` directly, so the chosen
/// form is always the actually-shorter one (spec §8 property 3's
/// `min(v, b-1+p)+1`), not an approximate threshold that can pick the
/// longer sequence.
fn binary_cost(bits: u64, popcount: u64) -> u64 {
    bits - 1 + popcount
}

/// Materialize `v` into `r`: `SUB r, r` followed by either `v` consecutive
/// `INC`s, or one `ADD r, r` (doubling) per bit below the most-significant
/// one plus one `INC` per set bit, from MSB to LSB.
pub fn materialize(sink: &mut Sink, r: Register, v: &BigUint) {
    sink.emit(Instr::Sub(r, r));
    if v.is_zero() {
        return;
    }

    let bits = v.bits();
    let digits = v.to_radix_be(2);
    let popcount = digits.iter().filter(|&&d| d == 1).count() as u64;
    let threshold = BigUint::from(binary_cost(bits, popcount));

    if v <= &threshold {
        let mut remaining = v.clone();
        let one = BigUint::one();
        while !remaining.is_zero() {
            sink.emit(Instr::Inc(r));
            remaining -= &one;
        }
    } else {
        let mut digits = digits.into_iter();
        // The MSB is always 1 for v > 0; doubling a register that is still
        // zero is pointless, so the first bit only contributes its INC.
        let _msb = digits.next();
        sink.emit(Instr::Inc(r));
        for d in digits {
            sink.emit(Instr::Add(r, r));
            if d == 1 {
                sink.emit(Instr::Inc(r));
            }
        }
    }
}

/// The instruction count `materialize` would emit for `v`, including the
/// leading `SUB r, r` (spec §8 property 3).
pub fn cost(v: &BigUint) -> u64 {
    if v.is_zero() {
        return 1;
    }
    let bits = v.bits();
    let popcount = v.to_radix_be(2).iter().filter(|&&d| d == 1).count() as u64;
    let binary_cost = binary_cost(bits, popcount);
    let threshold = BigUint::from(binary_cost);
    if v <= &threshold {
        // `v` may exceed u64 in general, but the unary branch is only ever
        // taken when v <= bits - 1 + popcount, which is always small enough
        // to convert.
        let unary: u64 = v
            .to_u64()
            .expect("unary branch implies a small value");
        unary + 1
    } else {
        binary_cost + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::Simulator;
    use crate::target::WORKING_POOL;
    use proptest::prelude::*;

    /// Materialize `v`, `PUT` the result, and read it back from the
    /// simulator's output.
    fn value_of(v: &BigUint) -> (BigUint, u64) {
        let mut sink = Sink::new();
        let r = WORKING_POOL[0];
        materialize(&mut sink, r, v);
        let count = sink
            .lines()
            .iter()
            .filter(|l| matches!(l, crate::back::sink::Line::Instr(_)))
            .count() as u64;
        sink.emit(Instr::Put(r));
        let mut vm = Simulator::new(&sink);
        let out = vm.run(&[], 10_000_000).unwrap();
        (out[0].clone(), count)
    }

    #[test]
    fn known_constants_match_formula_and_value() {
        for raw in [0u64, 1, 5, 7, 1024, 1_000_000_000, u64::MAX] {
            let v = BigUint::from(raw);
            let (produced, emitted) = value_of(&v);
            assert_eq!(produced, v, "materialize({v}) should leave v in the register");
            assert_eq!(emitted, cost(&v), "emitted count should match the cost formula");
        }
    }

    proptest! {
        #[test]
        fn materialization_matches_cost_formula(raw in 0u64..1_000_000) {
            let v = BigUint::from(raw);
            let (produced, emitted) = value_of(&v);
            prop_assert_eq!(produced, v.clone());
            prop_assert_eq!(emitted, cost(&v));
        }
    }
}
