//! End-to-end scenarios from the behavioral test table, run against the
//! reference simulator, plus a handful of unit-level checks on the pieces
//! `emit_program` composes.

use crate::analysis::{DominatorMap, LivenessMap};
use crate::common::{BigInt, Id, Set};
use crate::ir::{BasicBlock, BinOp, Cond, Descriptor, Instruction, Operand, Program, Terminator};
use crate::sim::Simulator;
use crate::symtab::SymbolTable;

use super::emit_program;

fn id(s: &str) -> Id {
    Id::new(s.to_string())
}

fn var(name: &str) -> Descriptor {
    Descriptor::Var(id(name))
}

fn run(program: &Program, symtab: &SymbolTable, liveness: &LivenessMap, input: &[u64]) -> Vec<u64> {
    let dominators = DominatorMap::new();
    let sink = emit_program(program, symtab, liveness, &dominators).expect("codegen should succeed");
    let mut vm = Simulator::new(&sink);
    let out = vm.run(input, 1_000_000).expect("simulation should terminate");
    out.into_iter()
        .map(|v| {
            use num_traits::ToPrimitive;
            v.to_u64().expect("test outputs fit in u64")
        })
        .collect()
}

fn single_block_symtab(names: &[&str]) -> SymbolTable {
    let mut symtab = SymbolTable::new();
    for (i, name) in names.iter().enumerate() {
        symtab.declare_scalar(id(name), i as i64);
    }
    symtab
}

/// Scenario 1: `a + b`.
#[test]
fn scenario_add() {
    let symtab = single_block_symtab(&["a", "b"]);
    let program = Program {
        blocks: vec![BasicBlock {
            id: id("entry"),
            insns: vec![
                Instruction::Get(var("a")),
                Instruction::Get(var("b")),
                Instruction::Binary {
                    op: BinOp::Add,
                    left: Operand::Scalar(id("a")),
                    right: Operand::Scalar(id("b")),
                    dst: Descriptor::Temp(0),
                },
                Instruction::Put(Operand::Temp(0)),
            ],
            term: Terminator::Halt,
        }],
    };
    let liveness = LivenessMap::new();
    assert_eq!(run(&program, &symtab, &liveness, &[6, 7]), vec![13]);
}

/// Scenario 2: `a * b`.
#[test]
fn scenario_mul() {
    let symtab = single_block_symtab(&["a", "b"]);
    let program = Program {
        blocks: vec![BasicBlock {
            id: id("entry"),
            insns: vec![
                Instruction::Get(var("a")),
                Instruction::Get(var("b")),
                Instruction::Binary {
                    op: BinOp::Mul,
                    left: Operand::Scalar(id("a")),
                    right: Operand::Scalar(id("b")),
                    dst: Descriptor::Temp(0),
                },
                Instruction::Put(Operand::Temp(0)),
            ],
            term: Terminator::Halt,
        }],
    };
    let liveness = LivenessMap::new();
    assert_eq!(run(&program, &symtab, &liveness, &[12, 17]), vec![204]);
}

/// Scenario 3: `a / b` and `a % b` from the same operands.
#[test]
fn scenario_div_rem() {
    let symtab = single_block_symtab(&["a", "b"]);
    let program = Program {
        blocks: vec![BasicBlock {
            id: id("entry"),
            insns: vec![
                Instruction::Get(var("a")),
                Instruction::Get(var("b")),
                Instruction::Binary {
                    op: BinOp::Div,
                    left: Operand::Scalar(id("a")),
                    right: Operand::Scalar(id("b")),
                    dst: Descriptor::Temp(0),
                },
                Instruction::Binary {
                    op: BinOp::Rem,
                    left: Operand::Scalar(id("a")),
                    right: Operand::Scalar(id("b")),
                    dst: Descriptor::Temp(1),
                },
                Instruction::Put(Operand::Temp(0)),
                Instruction::Put(Operand::Temp(1)),
            ],
            term: Terminator::Halt,
        }],
    };
    let liveness = LivenessMap::new();
    assert_eq!(run(&program, &symtab, &liveness, &[100, 7]), vec![14, 2]);
}

/// Scenario 4: division by the constant zero yields zero.
#[test]
fn scenario_div_by_zero() {
    let symtab = single_block_symtab(&["a"]);
    let program = Program {
        blocks: vec![BasicBlock {
            id: id("entry"),
            insns: vec![
                Instruction::Get(var("a")),
                Instruction::Binary {
                    op: BinOp::Div,
                    left: Operand::Scalar(id("a")),
                    right: Operand::Const(BigInt::from(0)),
                    dst: Descriptor::Temp(0),
                },
                Instruction::Put(Operand::Temp(0)),
            ],
            term: Terminator::Halt,
        }],
    };
    let liveness = LivenessMap::new();
    assert_eq!(run(&program, &symtab, &liveness, &[42]), vec![0]);
}

/// Scenario 5: an array declared with a negative start index, stored and
/// loaded back at its lowest (negative) index.
#[test]
fn scenario_negative_array_index() {
    let mut symtab = SymbolTable::new();
    symtab.declare_array(id("t"), 0, -3, 7);
    let program = Program {
        blocks: vec![BasicBlock {
            id: id("entry"),
            insns: vec![
                Instruction::IndexedStore {
                    src: Operand::Const(BigInt::from(9)),
                    base: id("t"),
                    offset: Operand::Const(BigInt::from(-3)),
                },
                Instruction::IndexedLoad {
                    base: id("t"),
                    offset: Operand::Const(BigInt::from(-3)),
                    dst: Descriptor::Var(id("v")),
                },
                Instruction::Put(Operand::Scalar(id("v"))),
            ],
            term: Terminator::Halt,
        }],
    };
    let liveness = LivenessMap::new();
    assert_eq!(run(&program, &symtab, &liveness, &[]), vec![9]);
}

/// `lea`'s non-constant-offset path (a runtime index, not a compile-time
/// constant), with a positive `base - start_index` delta so the emitted
/// address arithmetic takes the `ADD` branch.
#[test]
fn array_access_with_register_offset_positive_delta() {
    let mut symtab = SymbolTable::new();
    symtab.declare_array(id("arr"), 50, 10, 1);
    symtab.declare_scalar(id("i"), 0);
    let program = Program {
        blocks: vec![BasicBlock {
            id: id("entry"),
            insns: vec![
                Instruction::Get(var("i")),
                Instruction::IndexedStore {
                    src: Operand::Const(BigInt::from(77)),
                    base: id("arr"),
                    offset: Operand::Scalar(id("i")),
                },
                Instruction::IndexedLoad {
                    base: id("arr"),
                    offset: Operand::Scalar(id("i")),
                    dst: Descriptor::Var(id("v")),
                },
                Instruction::Put(Operand::Scalar(id("v"))),
            ],
            term: Terminator::Halt,
        }],
    };
    let liveness = LivenessMap::new();
    assert_eq!(run(&program, &symtab, &liveness, &[10]), vec![77]);
}

/// Same as above, but with a negative `base - start_index` delta so the
/// emitted address arithmetic takes the `SUB` branch.
#[test]
fn array_access_with_register_offset_negative_delta() {
    let mut symtab = SymbolTable::new();
    symtab.declare_array(id("arr"), 5, 10, 1);
    symtab.declare_scalar(id("i"), 0);
    let program = Program {
        blocks: vec![BasicBlock {
            id: id("entry"),
            insns: vec![
                Instruction::Get(var("i")),
                Instruction::IndexedStore {
                    src: Operand::Const(BigInt::from(42)),
                    base: id("arr"),
                    offset: Operand::Scalar(id("i")),
                },
                Instruction::IndexedLoad {
                    base: id("arr"),
                    offset: Operand::Scalar(id("i")),
                    dst: Descriptor::Var(id("v")),
                },
                Instruction::Put(Operand::Scalar(id("v"))),
            ],
            term: Terminator::Halt,
        }],
    };
    let liveness = LivenessMap::new();
    assert_eq!(run(&program, &symtab, &liveness, &[10]), vec![42]);
}

/// A multi-cell array's storage must survive register-pressure-induced
/// temporary spills: `next_free_address` has to place the temp-homes region
/// past the *whole* array, not just its first cell, or a spilled
/// temporary's home aliases a live array cell and silently corrupts it.
#[test]
fn array_storage_survives_temporary_spills_past_its_length() {
    let mut symtab = SymbolTable::new();
    let names: Vec<String> = (0..10).map(|i| format!("v{i}")).collect();
    for (i, name) in names.iter().enumerate() {
        symtab.declare_scalar(id(name), i as i64);
    }
    // Five cells at addresses 100..104. A temp-homes region starting right
    // after the array's first cell (the old, length-blind behavior) would
    // land at 101 and overwrite arr[1..4] the moment any temp spills.
    symtab.declare_array(id("arr"), 100, 0, 5);

    let mut insns = Vec::new();
    for i in 0..5i64 {
        insns.push(Instruction::IndexedStore {
            src: Operand::Const(BigInt::from(1000 + i)),
            base: id("arr"),
            offset: Operand::Const(BigInt::from(i)),
        });
    }
    for name in &names {
        insns.push(Instruction::Get(var(name)));
    }
    // Sum all ten scalars, exhausting the seven-register working pool
    // several times over and forcing `select` to spill temporaries.
    insns.push(Instruction::Binary {
        op: BinOp::Add,
        left: Operand::Scalar(id(&names[0])),
        right: Operand::Scalar(id(&names[1])),
        dst: Descriptor::Temp(0),
    });
    for (i, name) in names.iter().enumerate().skip(2) {
        insns.push(Instruction::Binary {
            op: BinOp::Add,
            left: Operand::Temp((i - 2) as u64),
            right: Operand::Scalar(id(name)),
            dst: Descriptor::Temp((i - 1) as u64),
        });
    }
    let result_temp = (names.len() - 2) as u64;
    insns.push(Instruction::Put(Operand::Temp(result_temp)));
    for i in 0..5i64 {
        insns.push(Instruction::IndexedLoad {
            base: id("arr"),
            offset: Operand::Const(BigInt::from(i)),
            dst: Descriptor::Temp(100 + i as u64),
        });
        insns.push(Instruction::Put(Operand::Temp(100 + i as u64)));
    }

    let program = Program {
        blocks: vec![BasicBlock {
            id: id("entry"),
            insns,
            term: Terminator::Halt,
        }],
    };
    let liveness = LivenessMap::new();
    let input: Vec<u64> = (1..=10).collect();
    let mut expected = vec![input.iter().sum()];
    expected.extend((1000u64..1005).collect::<Vec<_>>());
    assert_eq!(run(&program, &symtab, &liveness, &input), expected);
}

/// Scenario 6: a conditional branch on `<`, run with both orderings of its
/// operands.
#[test]
fn scenario_jump_if_lt() {
    let symtab = single_block_symtab(&["a", "b"]);
    let program = Program {
        blocks: vec![
            BasicBlock {
                id: id("entry"),
                insns: vec![Instruction::Get(var("a")), Instruction::Get(var("b"))],
                term: Terminator::JumpIf {
                    cond: Cond::Lt,
                    left: Operand::Scalar(id("a")),
                    right: Operand::Scalar(id("b")),
                    if_true: id("l1"),
                    if_false: id("l2"),
                },
            },
            BasicBlock {
                id: id("l1"),
                insns: vec![Instruction::Put(Operand::Const(BigInt::from(1)))],
                term: Terminator::Halt,
            },
            BasicBlock {
                id: id("l2"),
                insns: vec![Instruction::Put(Operand::Const(BigInt::from(2)))],
                term: Terminator::Halt,
            },
        ],
    };
    let mut liveness = LivenessMap::new();
    liveness.insert(id("entry"), Set::from([var("a"), var("b")]));
    assert_eq!(run(&program, &symtab, &liveness, &[3, 5]), vec![1]);
    assert_eq!(run(&program, &symtab, &liveness, &[5, 3]), vec![2]);
}

/// Determinism (property 6): the same blocks and analyses must yield a
/// byte-identical stream on every emission.
#[test]
fn emission_is_deterministic() {
    let symtab = single_block_symtab(&["a", "b"]);
    let program = Program {
        blocks: vec![BasicBlock {
            id: id("entry"),
            insns: vec![
                Instruction::Get(var("a")),
                Instruction::Get(var("b")),
                Instruction::Binary {
                    op: BinOp::Mul,
                    left: Operand::Scalar(id("a")),
                    right: Operand::Scalar(id("b")),
                    dst: Descriptor::Temp(0),
                },
                Instruction::Put(Operand::Temp(0)),
            ],
            term: Terminator::Halt,
        }],
    };
    let liveness = LivenessMap::new();
    let dominators = DominatorMap::new();

    let first = emit_program(&program, &symtab, &liveness, &dominators).unwrap();
    let second = emit_program(&program, &symtab, &liveness, &dominators).unwrap();
    assert_eq!(first.asm_code(), second.asm_code());
}

/// A register-pressure stress case: more live temporaries than the working
/// pool has registers, forcing `select` to spill.
#[test]
fn scenario_register_pressure_forces_spills() {
    let names: Vec<String> = (0..10).map(|i| format!("v{i}")).collect();
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    let symtab = single_block_symtab(&refs);

    let mut insns = Vec::new();
    for name in &refs {
        insns.push(Instruction::Get(var(name)));
    }
    // Sum all ten in sequence, each add reading two already-live values,
    // exhausting the seven-register working pool several times over.
    insns.push(Instruction::Binary {
        op: BinOp::Add,
        left: Operand::Scalar(id(refs[0])),
        right: Operand::Scalar(id(refs[1])),
        dst: Descriptor::Temp(0),
    });
    for (i, name) in refs.iter().enumerate().skip(2) {
        insns.push(Instruction::Binary {
            op: BinOp::Add,
            left: Operand::Temp((i - 2) as u64),
            right: Operand::Scalar(id(name)),
            dst: Descriptor::Temp((i - 1) as u64),
        });
    }
    let result_temp = (refs.len() - 2) as u64;
    insns.push(Instruction::Put(Operand::Temp(result_temp)));

    let program = Program {
        blocks: vec![BasicBlock {
            id: id("entry"),
            insns,
            term: Terminator::Halt,
        }],
    };
    let liveness = LivenessMap::new();
    let input: Vec<u64> = (1..=10).collect();
    let expected: u64 = input.iter().sum();
    assert_eq!(run(&program, &symtab, &liveness, &input), vec![expected]);
}

fn cond_holds(cond: Cond, l: u64, r: u64) -> bool {
    match cond {
        Cond::Eq => l == r,
        Cond::Ne => l != r,
        Cond::Le => l <= r,
        Cond::Ge => l >= r,
        Cond::Lt => l < r,
        Cond::Gt => l > r,
    }
}

fn jump_if_program(cond: Cond) -> (Program, SymbolTable) {
    let symtab = single_block_symtab(&["a", "b"]);
    let program = Program {
        blocks: vec![
            BasicBlock {
                id: id("entry"),
                insns: vec![Instruction::Get(var("a")), Instruction::Get(var("b"))],
                term: Terminator::JumpIf {
                    cond,
                    left: Operand::Scalar(id("a")),
                    right: Operand::Scalar(id("b")),
                    if_true: id("l1"),
                    if_false: id("l2"),
                },
            },
            BasicBlock {
                id: id("l1"),
                insns: vec![Instruction::Put(Operand::Const(BigInt::from(1)))],
                term: Terminator::Halt,
            },
            BasicBlock {
                id: id("l2"),
                insns: vec![Instruction::Put(Operand::Const(BigInt::from(0)))],
                term: Terminator::Halt,
            },
        ],
    };
    (program, symtab)
}

/// Property 4: every ordered comparison's emitted jump transfers control to
/// the true branch iff the comparison actually holds.
#[test]
fn comparison_correctness() {
    use proptest::test_runner::{Config, TestRunner};

    let conds = [Cond::Eq, Cond::Ne, Cond::Le, Cond::Ge, Cond::Lt, Cond::Gt];
    let liveness = LivenessMap::new();

    for cond in conds {
        let (program, symtab) = jump_if_program(cond);
        let mut runner = TestRunner::new(Config::with_cases(64));
        runner
            .run(&(0u64..1000, 0u64..1000), |(l, r)| {
                let out = run(&program, &symtab, &liveness, &[l, r]);
                let expected = if cond_holds(cond, l, r) { 1 } else { 0 };
                if out != vec![expected] {
                    return Err(proptest::test_runner::TestCaseError::fail(format!(
                        "{cond:?}({l}, {r}): expected {expected}, got {out:?}"
                    )));
                }
                Ok(())
            })
            .unwrap();
    }
}
