//! Arithmetic and comparison macros (C5), and the `Codegen` struct (design
//! note: a single owning struct over `Sink` + `DescriptorEngine` with
//! explicit method calls, rather than the source's mixin stacking). Every
//! macro is a method here so the descriptor engine's mutable state is
//! always passed explicitly — no global state (design notes, §9).

use crate::back::constant;
use crate::back::descriptor::DescriptorEngine;
use crate::back::sink::{Instr, Sink};
use crate::common::{BigUint, Id};
use crate::error::CodegenError;
use crate::ir::{Descriptor, Operand};
use crate::symtab::SymbolTable;
use crate::target::{Register, ADDRESS_REGISTER};
use num_traits::{Signed, ToPrimitive};

pub struct Codegen<'a> {
    pub sink: Sink,
    pub engine: DescriptorEngine<'a>,
}

impl<'a> Codegen<'a> {
    pub fn new(symtab: &'a SymbolTable, temp_area_base: i64) -> Self {
        Codegen {
            sink: Sink::new(),
            engine: DescriptorEngine::new(symtab, temp_area_base),
        }
    }

    // -- load/store ---------------------------------------------------

    pub fn get(&mut self) -> Result<Register, CodegenError> {
        let r = self.engine.select(&mut self.sink)?;
        self.sink.emit(Instr::Get(r));
        Ok(r)
    }

    pub fn put(&mut self, op: &Operand) -> Result<(), CodegenError> {
        let r = self.engine.load(&mut self.sink, op)?;
        self.sink.emit(Instr::Put(r));
        Ok(())
    }

    pub fn copy(&mut self, op: &Operand) -> Result<Register, CodegenError> {
        let s = self.engine.load(&mut self.sink, op)?;
        let r = self.engine.select(&mut self.sink)?;
        self.sink.emit(Instr::Copy(r, s));
        Ok(r)
    }

    /// Bind a freshly-computed result register to its destination
    /// descriptor (the block emitter's "seize the result").
    pub fn bind(&mut self, r: Register, dst: Descriptor) -> Result<(), CodegenError> {
        self.engine.seize(&mut self.sink, r, dst)
    }

    // -- arithmetic -----------------------------------------------------

    pub fn add(&mut self, l: &Operand, r: &Operand) -> Result<Register, CodegenError> {
        let lr = self.engine.load(&mut self.sink, l)?;
        let rr = self.engine.load(&mut self.sink, r)?;
        let d = self.engine.select(&mut self.sink)?;
        self.sink.emit(Instr::Copy(d, lr));
        self.sink.emit(Instr::Add(d, rr));
        Ok(d)
    }

    /// Saturating at zero — the target `SUB` already saturates, which is
    /// exactly what the comparison macros below rely on.
    pub fn sub(&mut self, l: &Operand, r: &Operand) -> Result<Register, CodegenError> {
        let lr = self.engine.load(&mut self.sink, l)?;
        let rr = self.engine.load(&mut self.sink, r)?;
        let d = self.engine.select(&mut self.sink)?;
        self.sink.emit(Instr::Copy(d, lr));
        self.sink.emit(Instr::Sub(d, rr));
        Ok(d)
    }

    /// Shift-and-add multiplication. Loop invariant: `result + a*b = x*y`.
    pub fn long_mul(&mut self, x: &Operand, y: &Operand) -> Result<Register, CodegenError> {
        let x_reg = self.engine.load(&mut self.sink, x)?;
        let a = self.engine.select(&mut self.sink)?;
        self.sink.emit(Instr::Copy(a, x_reg));
        self.engine.evict(&mut self.sink, x_reg)?;

        let y_reg = self.engine.load(&mut self.sink, y)?;
        let b = self.engine.select(&mut self.sink)?;
        self.sink.emit(Instr::Copy(b, y_reg));
        self.engine.evict(&mut self.sink, y_reg)?;

        let result = self.engine.select(&mut self.sink)?;
        self.sink.emit(Instr::Sub(result, result));

        let loop_head = self.sink.fresh_label("mul_loop");
        let odd = self.sink.fresh_label("mul_odd");
        let rest = self.sink.fresh_label("mul_rest");
        let exit = self.sink.fresh_label("mul_exit");

        self.sink.place_label(loop_head);
        self.sink.emit(Instr::Jzero(b, exit));
        self.sink.emit(Instr::Jodd(b, odd));
        self.sink.emit(Instr::Jump(rest));
        self.sink.place_label(odd);
        self.sink.emit(Instr::Add(result, a));
        self.sink.place_label(rest);
        self.sink.emit(Instr::Add(a, a));
        self.sink.emit(Instr::Half(b));
        self.sink.emit(Instr::Jump(loop_head));
        self.sink.place_label(exit);

        Ok(result)
    }

    /// Long division by repeated doubling: a range-finding phase followed
    /// by a restoring-division phase. `y = 0` yields `0` for both quotient
    /// and remainder, per the machine's definition of division by zero.
    pub fn long_div(
        &mut self,
        x: &Operand,
        y: &Operand,
        want_rem: bool,
    ) -> Result<Register, CodegenError> {
        let y_reg = self.engine.load(&mut self.sink, y)?;
        let divisor = self.engine.select(&mut self.sink)?;
        self.sink.emit(Instr::Copy(divisor, y_reg));
        self.engine.evict(&mut self.sink, y_reg)?;

        let x_reg = self.engine.load(&mut self.sink, x)?;
        let dividend = self.engine.select(&mut self.sink)?;
        self.sink.emit(Instr::Copy(dividend, x_reg));
        self.engine.evict(&mut self.sink, x_reg)?;

        let quotient = self.engine.select(&mut self.sink)?;
        self.sink.emit(Instr::Sub(quotient, quotient));

        let zero_case = self.sink.fresh_label("div_zero");
        let done = self.sink.fresh_label("div_done");
        self.sink.emit(Instr::Jzero(divisor, zero_case));

        let k = self.engine.select(&mut self.sink)?;
        self.sink.emit(Instr::Sub(k, k));

        // Range phase: while divisor <= dividend, double divisor, count k.
        let range_head = self.sink.fresh_label("div_range");
        let range_exit = self.sink.fresh_label("div_range_exit");
        self.sink.place_label(range_head);
        // y_reg is free again (evicted above): reuse it as comparison scratch.
        self.emit_gt(y_reg, divisor, dividend, range_exit);
        self.sink.emit(Instr::Add(divisor, divisor));
        self.sink.emit(Instr::Inc(k));
        self.sink.emit(Instr::Jump(range_head));
        self.sink.place_label(range_exit);

        // Division phase: k times, halve divisor, double quotient, and
        // subtract/increment when divisor still fits.
        let div_head = self.sink.fresh_label("div_bit");
        let div_exit = self.sink.fresh_label("div_bit_exit");
        let skip = self.sink.fresh_label("div_skip");
        self.sink.place_label(div_head);
        self.sink.emit(Instr::Jzero(k, div_exit));
        self.sink.emit(Instr::Dec(k));
        self.sink.emit(Instr::Half(divisor));
        self.sink.emit(Instr::Add(quotient, quotient));
        self.emit_gt(x_reg, divisor, dividend, skip);
        self.sink.emit(Instr::Sub(dividend, divisor));
        self.sink.emit(Instr::Inc(quotient));
        self.sink.place_label(skip);
        self.sink.emit(Instr::Jump(div_head));
        self.sink.place_label(div_exit);
        self.sink.emit(Instr::Jump(done));

        self.sink.place_label(zero_case);
        self.sink.emit(Instr::Sub(dividend, dividend));

        self.sink.place_label(done);

        Ok(if want_rem { dividend } else { quotient })
    }

    // -- arrays -----------------------------------------------------------

    /// Leave the effective address of `base[offset]` in the address
    /// register. When `offset` is a compile-time constant, the whole
    /// address is constant-folded so a negative offset never needs to be
    /// materialized as a register value.
    fn lea(&mut self, base: Id, offset: &Operand) -> Result<(), CodegenError> {
        let array = self.engine.array_address(base)?;

        match offset {
            Operand::Const(v) => {
                let addr = array.base + (to_i64(v) - array.start_index);
                if addr < 0 {
                    return Err(CodegenError::AddressOverflow(addr));
                }
                constant::materialize(&mut self.sink, ADDRESS_REGISTER, &BigUint::from(addr as u64));
                Ok(())
            }
            _ => {
                let offset_reg = self.engine.load(&mut self.sink, offset)?;
                self.sink.emit(Instr::Copy(ADDRESS_REGISTER, offset_reg));
                let delta = array.base - array.start_index;
                if delta != 0 {
                    let k = self.engine.select(&mut self.sink)?;
                    constant::materialize(&mut self.sink, k, &BigUint::from(delta.unsigned_abs()));
                    if delta > 0 {
                        self.sink.emit(Instr::Add(ADDRESS_REGISTER, k));
                    } else {
                        self.sink.emit(Instr::Sub(ADDRESS_REGISTER, k));
                    }
                }
                Ok(())
            }
        }
    }

    pub fn load_array(&mut self, base: Id, offset: &Operand) -> Result<Register, CodegenError> {
        self.lea(base, offset)?;
        let r = self.engine.select(&mut self.sink)?;
        self.sink.emit(Instr::Load(r));
        Ok(r)
    }

    pub fn store_array(
        &mut self,
        base: Id,
        offset: &Operand,
        value: &Operand,
    ) -> Result<(), CodegenError> {
        let v = self.engine.load(&mut self.sink, value)?;
        self.lea(base, offset)?;
        self.sink.emit(Instr::Store(v));
        Ok(())
    }

    // -- comparisons --------------------------------------------------

    /// `dst = (a [+1]) - b`, the shared saturating-subtract primitive every
    /// ordered comparison is built from (spec §4.4).
    fn emit_cmp(&mut self, dst: Register, a: Register, b: Register, plus_one_on_a: bool) {
        self.sink.emit(Instr::Copy(dst, a));
        if plus_one_on_a {
            self.sink.emit(Instr::Inc(dst));
        }
        self.sink.emit(Instr::Sub(dst, b));
    }

    fn emit_le(&mut self, dst: Register, l: Register, r: Register, label: Id) {
        self.emit_cmp(dst, l, r, false);
        self.sink.emit(Instr::Jzero(dst, label));
    }

    fn emit_ge(&mut self, dst: Register, l: Register, r: Register, label: Id) {
        self.emit_cmp(dst, r, l, false);
        self.sink.emit(Instr::Jzero(dst, label));
    }

    fn emit_gt(&mut self, dst: Register, l: Register, r: Register, label: Id) {
        self.emit_cmp(dst, r, l, true);
        self.sink.emit(Instr::Jzero(dst, label));
    }

    fn emit_lt(&mut self, dst: Register, l: Register, r: Register, label: Id) {
        self.emit_cmp(dst, l, r, true);
        self.sink.emit(Instr::Jzero(dst, label));
    }

    pub fn jump_le(&mut self, l: &Operand, r: &Operand, label: Id) -> Result<(), CodegenError> {
        let lr = self.engine.load(&mut self.sink, l)?;
        let rr = self.engine.load(&mut self.sink, r)?;
        let dst = self.engine.select(&mut self.sink)?;
        self.emit_le(dst, lr, rr, label);
        Ok(())
    }

    pub fn jump_ge(&mut self, l: &Operand, r: &Operand, label: Id) -> Result<(), CodegenError> {
        let lr = self.engine.load(&mut self.sink, l)?;
        let rr = self.engine.load(&mut self.sink, r)?;
        let dst = self.engine.select(&mut self.sink)?;
        self.emit_ge(dst, lr, rr, label);
        Ok(())
    }

    pub fn jump_gt(&mut self, l: &Operand, r: &Operand, label: Id) -> Result<(), CodegenError> {
        let lr = self.engine.load(&mut self.sink, l)?;
        let rr = self.engine.load(&mut self.sink, r)?;
        let dst = self.engine.select(&mut self.sink)?;
        self.emit_gt(dst, lr, rr, label);
        Ok(())
    }

    pub fn jump_lt(&mut self, l: &Operand, r: &Operand, label: Id) -> Result<(), CodegenError> {
        let lr = self.engine.load(&mut self.sink, l)?;
        let rr = self.engine.load(&mut self.sink, r)?;
        let dst = self.engine.select(&mut self.sink)?;
        self.emit_lt(dst, lr, rr, label);
        Ok(())
    }

    /// `l != r`: two saturating tests against the same target, per §4.4's
    /// table (taken directly, not via a negation).
    pub fn jump_ne(&mut self, l: &Operand, r: &Operand, label: Id) -> Result<(), CodegenError> {
        self.jump_gt(l, r, label)?;
        self.jump_lt(l, r, label)?;
        Ok(())
    }
}

fn to_i64(v: &crate::common::BigInt) -> i64 {
    v.to_i64()
        .unwrap_or(if v.is_negative() { i64::MIN } else { i64::MAX })
}
