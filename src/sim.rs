//! A reference simulator for the instruction stream this crate emits.
//!
//! Not part of the core (spec §1 scopes out the top-level driver and, by
//! extension, any execution harness), but used by the test suite to check
//! the behavioral scenarios in spec §8 end-to-end, and by the `vm` binary
//! for manual inspection.

use crate::back::sink::{Instr, Line, Sink};
use crate::common::{BigUint, Map};
use crate::ir::BlockId;
use crate::target::Register;
use num_traits::{One, Zero};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SimError {
    #[error("undefined label {0}")]
    UndefinedLabel(BlockId),
    #[error("ran out of input")]
    OutOfInput,
    #[error("exceeded step limit ({0}); program likely loops forever")]
    StepLimitExceeded(u64),
}

pub struct Simulator {
    instrs: Vec<Instr>,
    labels: Map<BlockId, usize>,
    registers: Map<Register, BigUint>,
    memory: Map<i64, BigUint>,
}

impl Simulator {
    pub fn new(sink: &Sink) -> Self {
        let mut instrs = Vec::new();
        let mut labels = Map::new();
        for line in sink.lines() {
            match line {
                Line::Instr(i) => instrs.push(i.clone()),
                Line::Label(name) => {
                    labels.insert(*name, instrs.len());
                }
                Line::Comment(_) => {}
            }
        }
        Simulator {
            instrs,
            labels,
            registers: Map::new(),
            memory: Map::new(),
        }
    }

    fn reg(&self, r: Register) -> BigUint {
        self.registers.get(&r).cloned().unwrap_or_default()
    }

    fn set_reg(&mut self, r: Register, v: BigUint) {
        self.registers.insert(r, v);
    }

    fn load_mem(&self, addr: &BigUint) -> BigUint {
        let addr = addr_to_i64(addr);
        self.memory.get(&addr).cloned().unwrap_or_default()
    }

    fn store_mem(&mut self, addr: &BigUint, v: BigUint) {
        let addr = addr_to_i64(addr);
        self.memory.insert(addr, v);
    }

    fn target(&self, label: BlockId) -> Result<usize, SimError> {
        self.labels
            .get(&label)
            .copied()
            .ok_or(SimError::UndefinedLabel(label))
    }

    /// Run with `input` feeding successive `GET`s, returning the values
    /// written by successive `PUT`s. Stops at `HALT` or after `step_limit`
    /// instructions (a runaway program is a test bug, not something to
    /// hang the suite over).
    pub fn run(&mut self, input: &[u64], step_limit: u64) -> Result<Vec<BigUint>, SimError> {
        let mut input = input.iter().map(|v| BigUint::from(*v));
        let mut output = Vec::new();
        let mut pc = 0usize;
        let mut steps = 0u64;

        while pc < self.instrs.len() {
            steps += 1;
            if steps > step_limit {
                return Err(SimError::StepLimitExceeded(step_limit));
            }
            let instr = self.instrs[pc].clone();
            let mut next = pc + 1;
            match instr {
                Instr::Get(r) => {
                    let v = input.next().ok_or(SimError::OutOfInput)?;
                    self.set_reg(r, v);
                }
                Instr::Put(r) => output.push(self.reg(r)),
                Instr::Load(r) => {
                    let addr = self.reg(Register::A);
                    let v = self.load_mem(&addr);
                    self.set_reg(r, v);
                }
                Instr::Store(r) => {
                    let addr = self.reg(Register::A);
                    let v = self.reg(r);
                    self.store_mem(&addr, v);
                }
                Instr::Copy(d, s) => self.set_reg(d, self.reg(s)),
                Instr::Add(d, s) => {
                    let v = &self.reg(d) + &self.reg(s);
                    self.set_reg(d, v);
                }
                Instr::Sub(d, s) => {
                    let (a, b) = (self.reg(d), self.reg(s));
                    let v = if a >= b { a - b } else { BigUint::zero() };
                    self.set_reg(d, v);
                }
                Instr::Inc(r) => {
                    let v = &self.reg(r) + BigUint::one();
                    self.set_reg(r, v);
                }
                Instr::Dec(r) => {
                    let cur = self.reg(r);
                    let v = if cur.is_zero() {
                        BigUint::zero()
                    } else {
                        cur - BigUint::one()
                    };
                    self.set_reg(r, v);
                }
                Instr::Half(r) => self.set_reg(r, &self.reg(r) >> 1u32),
                Instr::Jump(label) => next = self.target(label)?,
                Instr::Jzero(r, label) => {
                    if self.reg(r).is_zero() {
                        next = self.target(label)?;
                    }
                }
                Instr::Jodd(r, label) => {
                    if self.reg(r).bit(0) {
                        next = self.target(label)?;
                    }
                }
                Instr::Halt => break,
            }
            pc = next;
        }

        Ok(output)
    }
}

fn addr_to_i64(addr: &BigUint) -> i64 {
    use num_traits::ToPrimitive;
    addr.to_i64().unwrap_or(i64::MAX)
}
