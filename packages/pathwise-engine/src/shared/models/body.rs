//! Method bodies
//!
//! An instruction sequence plus the derived control-flow successor relation
//! and a may-liveness table. Liveness is used only to prune dead locals from
//! dataflow facts, so over-approximation is safe and cheap.

use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;

use super::instruction::{InstrId, InstrKind, Instruction};
use super::method::{Local, MethodRef, ParamSlot};
use super::types::ValueType;
use crate::errors::{EngineError, Result};

/// One method's instructions with derived flow information
#[derive(Debug, Clone)]
pub struct MethodBody {
    method: Arc<MethodRef>,
    instructions: Vec<Instruction>,
    local_types: FxHashMap<Local, ValueType>,
    successors: Vec<Vec<InstrId>>,
    /// Locals live immediately after each instruction
    live_after: Vec<FxHashSet<Local>>,
}

impl MethodBody {
    /// Build a body, validating branch targets and deriving flow tables
    pub fn new(
        method: Arc<MethodRef>,
        instructions: Vec<Instruction>,
        local_types: FxHashMap<Local, ValueType>,
    ) -> Result<Self> {
        let successors = compute_successors(&method, &instructions)?;
        let live_after = compute_liveness(&instructions, &successors);
        Ok(Self {
            method,
            instructions,
            local_types,
            successors,
            live_after,
        })
    }

    pub fn method(&self) -> &Arc<MethodRef> {
        &self.method
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn instruction(&self, id: InstrId) -> Option<&Instruction> {
        self.instructions.get(id)
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Declared type of a local, when the provider supplied one
    pub fn local_type(&self, local: &Local) -> Option<&ValueType> {
        self.local_types.get(local)
    }

    /// Control-flow successors of an instruction
    pub fn successors(&self, id: InstrId) -> &[InstrId] {
        &self.successors[id]
    }

    /// Locals live immediately after an instruction
    pub fn live_after(&self, id: InstrId) -> &FxHashSet<Local> {
        &self.live_after[id]
    }

    /// Ids of all return instructions, value-carrying or not
    pub fn return_sites(&self) -> Vec<InstrId> {
        self.instructions
            .iter()
            .filter(|i| matches!(i.kind, InstrKind::Return(_) | InstrKind::ReturnVoid))
            .map(|i| i.id)
            .collect()
    }

    /// The local a parameter slot is bound to, when the body declares it
    pub fn param_local(&self, slot: &ParamSlot) -> Option<&Local> {
        self.instructions.iter().find_map(|i| match &i.kind {
            InstrKind::Identity { local, slot: s, .. } if s == slot => Some(local),
            _ => None,
        })
    }
}

fn compute_successors(
    method: &MethodRef,
    instructions: &[Instruction],
) -> Result<Vec<Vec<InstrId>>> {
    let len = instructions.len();
    let check = |target: InstrId| -> Result<InstrId> {
        if target < len {
            Ok(target)
        } else {
            Err(EngineError::internal(format!(
                "branch target {} out of range in {}",
                target,
                method.signature()
            )))
        }
    };

    let mut successors = Vec::with_capacity(len);
    for (idx, instr) in instructions.iter().enumerate() {
        let mut succ = Vec::new();
        match &instr.kind {
            InstrKind::Goto { target } => succ.push(check(*target)?),
            InstrKind::If { target, .. } => {
                if idx + 1 < len {
                    succ.push(idx + 1);
                }
                succ.push(check(*target)?);
            }
            InstrKind::LookupSwitch { cases, default, .. } => {
                for (_, target) in cases {
                    succ.push(check(*target)?);
                }
                succ.push(check(*default)?);
            }
            InstrKind::TableSwitch {
                targets, default, ..
            } => {
                for target in targets {
                    succ.push(check(*target)?);
                }
                succ.push(check(*default)?);
            }
            InstrKind::Return(_) | InstrKind::ReturnVoid | InstrKind::Throw(_) => {}
            _ => {
                if idx + 1 < len {
                    succ.push(idx + 1);
                }
            }
        }
        successors.push(succ);
    }
    Ok(successors)
}

/// Iterative backward may-liveness over the successor relation
fn compute_liveness(
    instructions: &[Instruction],
    successors: &[Vec<InstrId>],
) -> Vec<FxHashSet<Local>> {
    let len = instructions.len();
    let mut live_in: Vec<FxHashSet<Local>> = vec![FxHashSet::default(); len];
    let mut live_out: Vec<FxHashSet<Local>> = vec![FxHashSet::default(); len];

    let mut changed = true;
    while changed {
        changed = false;
        for idx in (0..len).rev() {
            let mut out: FxHashSet<Local> = FxHashSet::default();
            for &succ in &successors[idx] {
                out.extend(live_in[succ].iter().cloned());
            }

            let mut inn = out.clone();
            if let Some(def) = instructions[idx].def() {
                inn.remove(def);
            }
            for used in instructions[idx].uses() {
                inn.insert(used.clone());
            }

            if out != live_out[idx] {
                live_out[idx] = out;
                changed = true;
            }
            if inn != live_in[idx] {
                live_in[idx] = inn;
                changed = true;
            }
        }
    }
    live_out
}
