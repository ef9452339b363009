//! The block emitter (C7): dispatches each IR instruction to the
//! appropriate macro, and at branch boundaries flushes live state and
//! resets register bookkeeping (spec §4.6).

use crate::analysis::{DominatorMap, LivenessMap};
use crate::back::macros::Codegen;
use crate::back::sink::{Instr, Sink};
use crate::error::CodegenError;
use crate::ir::{BinOp, Cond, Instruction, Program, Terminator};
use crate::symtab::SymbolTable;

/// Lower `program` into a flat instruction stream. `liveness` and
/// `dominators` are threaded through as owned, read-only inputs (design
/// notes, §9) rather than assigned late; only `liveness` is consulted by
/// the current logic, `dominators` is carried for future refinement.
pub fn emit_program(
    program: &Program,
    symtab: &SymbolTable,
    liveness: &LivenessMap,
    dominators: &DominatorMap,
) -> Result<Sink, CodegenError> {
    let _ = dominators;
    let temp_area_base = symtab.next_free_address();
    let mut codegen = Codegen::new(symtab, temp_area_base);

    for block in &program.blocks {
        codegen.sink.place_label(block.id);
        for insn in &block.insns {
            codegen.engine.clear_selection();
            dispatch_instruction(&mut codegen, insn)?;
        }
        codegen.engine.clear_selection();
        dispatch_terminator(&mut codegen, &block.term, block.id, liveness)?;
    }

    Ok(codegen.sink)
}

fn dispatch_instruction(codegen: &mut Codegen, insn: &Instruction) -> Result<(), CodegenError> {
    match insn {
        Instruction::Get(dst) => {
            let r = codegen.get()?;
            codegen.bind(r, *dst)?;
        }
        Instruction::Put(src) => {
            codegen.put(src)?;
        }
        Instruction::Move { src, dst } => {
            let r = codegen.copy(src)?;
            codegen.bind(r, *dst)?;
        }
        Instruction::IndexedLoad { base, offset, dst } => {
            let r = codegen.load_array(*base, offset)?;
            codegen.bind(r, *dst)?;
        }
        Instruction::IndexedStore { src, base, offset } => {
            codegen.store_array(*base, offset, src)?;
        }
        Instruction::Binary {
            op,
            left,
            right,
            dst,
        } => {
            let r = match op {
                BinOp::Add => codegen.add(left, right)?,
                BinOp::Sub => codegen.sub(left, right)?,
                BinOp::Mul => codegen.long_mul(left, right)?,
                BinOp::Div => codegen.long_div(left, right, false)?,
                BinOp::Rem => codegen.long_div(left, right, true)?,
            };
            codegen.bind(r, *dst)?;
        }
    }
    Ok(())
}

fn dispatch_terminator(
    codegen: &mut Codegen,
    term: &Terminator,
    block: crate::ir::BlockId,
    liveness: &LivenessMap,
) -> Result<(), CodegenError> {
    match term {
        Terminator::Halt => {
            codegen.sink.emit(Instr::Halt);
            return Ok(());
        }
        Terminator::Jump(target) => {
            let live_out = liveness.live_out(block);
            codegen.engine.save_variables(&mut codegen.sink, &live_out)?;
            codegen.sink.emit(Instr::Jump(*target));
        }
        Terminator::JumpIf {
            cond,
            left,
            right,
            if_true,
            if_false,
        } => {
            let live_out = liveness.live_out(block);
            codegen.engine.save_variables(&mut codegen.sink, &live_out)?;
            // Negation of `cond` jumps to the false branch, then an
            // unconditional jump to the true branch — except `!=`, which
            // lowers directly (spec §4.6).
            match cond {
                Cond::Ne => {
                    codegen.jump_ne(left, right, *if_true)?;
                    codegen.sink.emit(Instr::Jump(*if_false));
                }
                Cond::Eq => {
                    codegen.jump_ne(left, right, *if_false)?;
                    codegen.sink.emit(Instr::Jump(*if_true));
                }
                Cond::Le => {
                    codegen.jump_gt(left, right, *if_false)?;
                    codegen.sink.emit(Instr::Jump(*if_true));
                }
                Cond::Ge => {
                    codegen.jump_lt(left, right, *if_false)?;
                    codegen.sink.emit(Instr::Jump(*if_true));
                }
                Cond::Lt => {
                    codegen.jump_ge(left, right, *if_false)?;
                    codegen.sink.emit(Instr::Jump(*if_true));
                }
                Cond::Gt => {
                    codegen.jump_le(left, right, *if_false)?;
                    codegen.sink.emit(Instr::Jump(*if_true));
                }
            }
        }
    }
    codegen.engine.reset_registers_state();
    Ok(())
}
