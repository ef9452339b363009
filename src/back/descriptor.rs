//! The descriptor engine (C4): the bi-directional map between IR operands
//! and their current location, register selection, spilling, and the
//! block-boundary flush/reset protocol. See spec §3 and §4.3.

use crate::back::constant;
use crate::back::sink::{Instr, Sink};
use crate::common::{BigUint, Map, Set};
use crate::error::CodegenError;
use crate::ir::{Descriptor, Operand};
use crate::symtab::SymbolTable;
use crate::target::{Register, ADDRESS_REGISTER, WORKING_POOL};
use log::trace;

/// Where a descriptor's value currently lives. A descriptor may hold both
/// at once (invariant: the set is never empty once the descriptor exists).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum EntryLocation {
    Memory(i64),
    Register(Register),
}

#[derive(Clone, Debug, Default)]
struct DescState {
    locations: Set<EntryLocation>,
}

impl DescState {
    fn register(&self) -> Option<Register> {
        self.locations.iter().find_map(|l| match l {
            EntryLocation::Register(r) => Some(*r),
            EntryLocation::Memory(_) => None,
        })
    }

    fn memory(&self) -> Option<i64> {
        self.locations.iter().find_map(|l| match l {
            EntryLocation::Memory(a) => Some(*a),
            EntryLocation::Register(_) => None,
        })
    }

    fn add_register(&mut self, r: Register) {
        self.locations.insert(EntryLocation::Register(r));
    }

    fn add_memory(&mut self, a: i64) {
        self.locations.insert(EntryLocation::Memory(a));
    }

    fn drop_register(&mut self) {
        self.locations.retain(|l| !matches!(l, EntryLocation::Register(_)));
    }
}

pub struct DescriptorEngine<'a> {
    symtab: &'a SymbolTable,
    entries: Map<Descriptor, DescState>,
    reg_owner: Map<Register, Descriptor>,
    /// Registers reserved for the in-progress IR instruction; `select`
    /// never picks one of these as a spill victim, and never hands one out
    /// twice within the same instruction.
    selection: Set<Register>,
    /// Homes allocated for temporaries on first spill. Persists across
    /// block boundaries (unlike `entries`/`reg_owner`, which are cleared by
    /// `reset_registers_state`): once a temporary has a home, it keeps it.
    temp_homes: Map<u64, i64>,
    next_temp_addr: i64,
}

impl<'a> DescriptorEngine<'a> {
    pub fn new(symtab: &'a SymbolTable, temp_area_base: i64) -> Self {
        DescriptorEngine {
            symtab,
            entries: Map::new(),
            reg_owner: Map::new(),
            selection: Set::new(),
            temp_homes: Map::new(),
            next_temp_addr: temp_area_base,
        }
    }

    /// Cleared at the start of every IR instruction (spec §4.6).
    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    fn home_address(&mut self, d: Descriptor) -> Result<i64, CodegenError> {
        match d {
            Descriptor::Var(name) => self
                .symtab
                .scalar(name)
                .map(|e| e.address)
                .ok_or_else(|| CodegenError::MalformedIr(format!("undeclared scalar {name}"))),
            Descriptor::Temp(id) => {
                if let Some(addr) = self.temp_homes.get(&id) {
                    Ok(*addr)
                } else {
                    let addr = self.next_temp_addr;
                    self.next_temp_addr += 1;
                    self.temp_homes.insert(id, addr);
                    Ok(addr)
                }
            }
        }
    }

    fn materialize_address(&mut self, sink: &mut Sink, addr: i64) -> Result<(), CodegenError> {
        if addr < 0 {
            return Err(CodegenError::AddressOverflow(addr));
        }
        constant::materialize(sink, ADDRESS_REGISTER, &BigUint::from(addr as u64));
        Ok(())
    }

    /// Ensure `r`'s current occupant (if any) is memory-backed, then drop
    /// its register copy. Used both as `select`'s spill step and whenever a
    /// macro needs to reuse an already-loaded register as scratch. Always
    /// spills rather than consulting liveness: mid-instruction, a
    /// descriptor with no memory copy may still be read later in the same
    /// block, and the liveness given to the core is only block-granular.
    fn demote(&mut self, sink: &mut Sink, r: Register) -> Result<(), CodegenError> {
        if let Some(d) = self.reg_owner.remove(&r) {
            let needs_spill = self.entries.get(&d).and_then(DescState::memory).is_none();
            if needs_spill {
                let addr = self.home_address(d)?;
                trace!("spilling {d} from {r} to [{addr}]");
                self.materialize_address(sink, addr)?;
                sink.emit(Instr::Store(r));
                self.entries.get_mut(&d).unwrap().add_memory(addr);
            }
            self.entries.get_mut(&d).unwrap().drop_register();
        }
        Ok(())
    }

    /// Explicitly free a register a macro obtained via `load`/`select` so
    /// it may be safely overwritten as scratch for the rest of the current
    /// instruction, without losing whatever descriptor it held.
    pub fn evict(&mut self, sink: &mut Sink, r: Register) -> Result<(), CodegenError> {
        self.demote(sink, r)
    }

    /// Pick a register from the working pool (spec §4.3). Deterministic:
    /// the first free register in `WORKING_POOL` order, else the first
    /// already-memory-backed victim not in the selection set, else the
    /// first victim at all not in the selection set, else
    /// `RegisterPoolExhausted`.
    pub fn select(&mut self, sink: &mut Sink) -> Result<Register, CodegenError> {
        for r in WORKING_POOL {
            if !self.reg_owner.contains_key(&r) && !self.selection.contains(&r) {
                self.selection.insert(r);
                return Ok(r);
            }
        }
        for r in WORKING_POOL {
            if self.selection.contains(&r) {
                continue;
            }
            if let Some(d) = self.reg_owner.get(&r).copied() {
                if self.entries[&d].memory().is_some() {
                    self.demote(sink, r)?;
                    self.selection.insert(r);
                    return Ok(r);
                }
            }
        }
        for r in WORKING_POOL {
            if self.selection.contains(&r) {
                continue;
            }
            if self.reg_owner.contains_key(&r) {
                self.demote(sink, r)?;
                self.selection.insert(r);
                return Ok(r);
            }
        }
        Err(CodegenError::RegisterPoolExhausted)
    }

    /// Return a register currently holding `op` (spec §4.3). For a
    /// constant, a fresh scratch register is materialized and handed back
    /// unbound — the engine never caches constants.
    pub fn load(&mut self, sink: &mut Sink, op: &Operand) -> Result<Register, CodegenError> {
        match op {
            Operand::Const(v) => {
                use num_traits::Signed;
                if v.is_negative() {
                    return Err(CodegenError::MalformedIr(format!(
                        "negative constant {v} used as a value"
                    )));
                }
                let r = self.select(sink)?;
                constant::materialize(sink, r, &v.magnitude().clone());
                Ok(r)
            }
            Operand::ArrayRef(name) => Err(CodegenError::MalformedIr(format!(
                "array {name} used as a value"
            ))),
            Operand::Scalar(_) | Operand::Temp(_) => {
                let d = Descriptor::from_operand(op).unwrap();
                if let Some(r) = self.entries.get(&d).and_then(DescState::register) {
                    return Ok(r);
                }
                let addr = self.home_address(d)?;
                let r = self.select(sink)?;
                self.materialize_address(sink, addr)?;
                sink.emit(Instr::Load(r));
                self.reg_owner.insert(r, d);
                self.entries.entry(d).or_default().add_register(r);
                Ok(r)
            }
        }
    }

    /// Bind `register` to `descriptor`, evicting any previous binding on
    /// both sides (spec §4.3).
    pub fn seize(
        &mut self,
        sink: &mut Sink,
        register: Register,
        descriptor: Descriptor,
    ) -> Result<(), CodegenError> {
        if let Some(old_r) = self.entries.get(&descriptor).and_then(DescState::register) {
            if old_r != register {
                self.reg_owner.remove(&old_r);
                self.entries.get_mut(&descriptor).unwrap().drop_register();
            }
        }
        if self.reg_owner.get(&register).copied() != Some(descriptor) {
            self.demote(sink, register)?;
        }
        self.reg_owner.insert(register, descriptor);
        self.entries.entry(descriptor).or_default().add_register(register);
        trace!("seize {register} -> {descriptor}");
        Ok(())
    }

    /// Return the symbol-table entry (base address, start index, length)
    /// of a declared array (spec §4.3's `getAddress`). `lea` reads the
    /// array's home through this engine method rather than consulting the
    /// symbol table directly, matching §2's data flow: C5 macros ask C4
    /// for addresses, and C4 is the one that reads C3.
    pub fn array_address(
        &self,
        name: crate::common::Id,
    ) -> Result<crate::symtab::ArrayEntry, CodegenError> {
        self.symtab
            .array(name)
            .ok_or_else(|| CodegenError::MalformedIr(format!("undeclared array {name}")))
    }

    /// Flush every descriptor live-out of the current block to memory
    /// (spec §4.3). Descriptors not live-out are left as-is: they will be
    /// discarded wholesale by `reset_registers_state`, which is always
    /// called immediately after the branch this precedes.
    pub fn save_variables(
        &mut self,
        sink: &mut Sink,
        live_out: &Set<Descriptor>,
    ) -> Result<(), CodegenError> {
        let descriptors: Vec<Descriptor> = self.entries.keys().copied().collect();
        for d in descriptors {
            if !live_out.contains(&d) {
                continue;
            }
            let state = self.entries.get(&d).unwrap();
            if let (Some(r), None) = (state.register(), state.memory()) {
                let addr = self.home_address(d)?;
                trace!("saving live-out {d} from {r} to [{addr}]");
                self.materialize_address(sink, addr)?;
                sink.emit(Instr::Store(r));
                self.entries.get_mut(&d).unwrap().add_memory(addr);
            }
        }
        Ok(())
    }

    /// Clear all register bindings after a branch (spec §4.3). Temporaries'
    /// homes persist; only the transient register/descriptor bookkeeping is
    /// reset.
    pub fn reset_registers_state(&mut self) {
        self.entries.clear();
        self.reg_owner.clear();
        self.selection.clear();
    }
}
