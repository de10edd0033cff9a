//! Chain assembly
//!
//! The per-path step of the analysis: derive the path's feasibility
//! predicate, discard it if no execution can take the path, otherwise
//! promote it to an Event, discharge its dependencies, and wrap target and
//! supports into one EventChain.

use tracing::debug;

use crate::errors::Result;
use crate::features::constraint::infrastructure::WalkLimits;
use crate::features::constraint::PathAnalysis;
use crate::features::dependency::DependencyAnalysis;
use crate::features::events::domain::{CallPath, EntryKind, Event, EventChain};
use crate::shared::cancel::CancelToken;
use crate::shared::ports::{AliasProvider, ProgramModel};

/// Builds event chains for target paths, one call per path
pub struct ChainAssembler<'a, 'p> {
    program: &'p dyn ProgramModel,
    aliases: &'p dyn AliasProvider,
    dependencies: DependencyAnalysis<'a, 'p>,
    limits: WalkLimits,
}

impl<'a, 'p> ChainAssembler<'a, 'p> {
    pub fn new(
        program: &'p dyn ProgramModel,
        aliases: &'p dyn AliasProvider,
        dependencies: DependencyAnalysis<'a, 'p>,
        limits: WalkLimits,
    ) -> Self {
        ChainAssembler {
            program,
            aliases,
            dependencies,
            limits,
        }
    }

    /// Analyzes one path end to end; `None` means the path is infeasible
    pub fn assemble(&self, path: &CallPath, token: &CancelToken) -> Result<Option<EventChain>> {
        let feasibility = PathAnalysis::new(
            self.program,
            self.aliases,
            path,
            self.limits,
            token.clone(),
        )
        .run()?;
        if feasibility.is_infeasible() {
            debug!(path = %path, "path predicate unsatisfiable, discarded");
            return Ok(None);
        }

        let kind = EntryKind::classify(path.entry_method(), self.program);
        let mut event = Event::new(path.clone(), kind, feasibility.constraint);
        event.add_dependencies(feasibility.dependencies);

        let supports = self
            .dependencies
            .resolve_event_dependencies(&mut event, token)?;

        let mut chain = EventChain::new(event);
        for support in supports {
            chain.push_supporting(support);
        }
        debug!(
            chain = chain.id(),
            events = chain.len(),
            "event chain assembled"
        );
        Ok(Some(chain))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::features::constraint::domain::{Expression, Operator, Predicate, Variable};
    use crate::features::dependency::HeapWriteCache;
    use crate::features::solver::StructuralOracle;
    use crate::shared::models::{
        AliasSig, BinOp, Call, CondExpr, FieldAccess, FieldRef, InstrKind, Instruction, LValue,
        Local, MethodBody, MethodRef, Operand, ParamSlot, RValue, ValueType,
    };
    use crate::shared::ports::EmptyResources;
    use rustc_hash::FxHashMap;

    struct FixtureProgram {
        bodies: FxHashMap<MethodRef, Arc<MethodBody>>,
    }

    impl FixtureProgram {
        fn new() -> Self {
            FixtureProgram {
                bodies: FxHashMap::default(),
            }
        }

        fn with_body(mut self, body: MethodBody) -> Self {
            let method = body.method().as_ref().clone();
            self.bodies.insert(method, Arc::new(body));
            self
        }
    }

    impl ProgramModel for FixtureProgram {
        fn body(&self, method: &MethodRef) -> Option<Arc<MethodBody>> {
            self.bodies.get(method).cloned()
        }

        fn is_app_method(&self, method: &MethodRef) -> bool {
            method.class.starts_with("com.app")
        }
    }

    struct SharedSlot;

    impl AliasProvider for SharedSlot {
        fn alias_sig(&self, _access: &FieldAccess, _in_method: &MethodRef) -> AliasSig {
            AliasSig::new([7])
        }
    }

    fn body(method: MethodRef, kinds: Vec<InstrKind>) -> MethodBody {
        let instructions = kinds
            .into_iter()
            .enumerate()
            .map(|(id, kind)| Instruction::new(id, kind))
            .collect();
        MethodBody::new(Arc::new(method), instructions, FxHashMap::default()).unwrap()
    }

    fn sink_ref() -> MethodRef {
        MethodRef::new_static(
            "android.telephony.SmsManager",
            "sendTextMessage",
            vec![],
            ValueType::Void,
        )
    }

    fn entry_ref() -> MethodRef {
        MethodRef::new_static("com.app.Main", "entry", vec![ValueType::Int], ValueType::Void)
    }

    /// entry(k): calls the sink at 3 only when k equals `guard` compared
    /// with `op`
    fn entry_body(op: BinOp, guard: i64) -> MethodBody {
        body(
            entry_ref(),
            vec![
                InstrKind::Identity {
                    local: Local::new("k"),
                    slot: ParamSlot::Arg(0),
                    ty: ValueType::Int,
                },
                InstrKind::If {
                    cond: CondExpr::new(op, Operand::local("k"), Operand::int(guard)),
                    target: 3,
                },
                InstrKind::ReturnVoid,
                InstrKind::Invoke(Call::statik(sink_ref(), vec![])),
                InstrKind::ReturnVoid,
            ],
        )
    }

    fn assembler<'a, 'p>(
        program: &'p FixtureProgram,
        cache: &'a HeapWriteCache<'p>,
    ) -> ChainAssembler<'a, 'p> {
        ChainAssembler::new(
            program,
            &SharedSlot,
            DependencyAnalysis::new(cache, &EmptyResources, 1),
            WalkLimits::default(),
        )
    }

    #[test]
    fn feasible_paths_become_single_event_chains() {
        let program = FixtureProgram::new().with_body(entry_body(BinOp::Eq, 5));
        let oracle = StructuralOracle::default();
        let cache = HeapWriteCache::new(&program, &SharedSlot, &oracle, WalkLimits::default());

        let path = CallPath::single(entry_ref(), 3);
        let chain = assembler(&program, &cache)
            .assemble(&path, &CancelToken::unbounded())
            .unwrap()
            .expect("path is feasible");

        assert_eq!(chain.len(), 1);
        let expected = Predicate::expr(
            Expression::combine(
                Operator::Eq,
                Some(Expression::leaf(Variable::input(
                    1,
                    path.discriminator(),
                    ValueType::Int,
                ))),
                Some(Expression::leaf(Variable::int(5))),
            )
            .unwrap(),
        );
        assert_eq!(chain.target().constraint(), Some(&expected));
    }

    #[test]
    fn infeasible_paths_are_discarded() {
        // The sink is guarded by k == 3 and then k != 3: no execution
        // reaches it
        let program = FixtureProgram::new().with_body(body(
            entry_ref(),
            vec![
                InstrKind::Identity {
                    local: Local::new("k"),
                    slot: ParamSlot::Arg(0),
                    ty: ValueType::Int,
                },
                InstrKind::If {
                    cond: CondExpr::new(BinOp::Eq, Operand::local("k"), Operand::int(3)),
                    target: 3,
                },
                InstrKind::ReturnVoid,
                InstrKind::If {
                    cond: CondExpr::new(BinOp::Ne, Operand::local("k"), Operand::int(3)),
                    target: 5,
                },
                InstrKind::ReturnVoid,
                InstrKind::Invoke(Call::statik(sink_ref(), vec![])),
                InstrKind::ReturnVoid,
            ],
        ));
        let oracle = StructuralOracle::default();
        let cache = HeapWriteCache::new(&program, &SharedSlot, &oracle, WalkLimits::default());

        let path = CallPath::single(entry_ref(), 5);
        let chain = assembler(&program, &cache)
            .assemble(&path, &CancelToken::unbounded())
            .unwrap();

        assert!(chain.is_none());
    }

    #[test]
    fn heap_dependent_paths_pull_in_their_writers() {
        let mode = FieldRef::new("com.app.Store", "mode", ValueType::Int);
        let trigger = MethodRef::new_static("com.app.Main", "trigger", vec![], ValueType::Void);
        let writer = MethodRef::new_static("com.app.Main", "writer", vec![], ValueType::Void);

        // trigger fires the sink only when the stored mode is 9
        let trigger_body = body(
            trigger.clone(),
            vec![
                InstrKind::Assign {
                    lhs: LValue::Local(Local::new("x")),
                    rhs: RValue::FieldLoad(FieldAccess::statik(mode.clone())),
                },
                InstrKind::If {
                    cond: CondExpr::new(BinOp::Eq, Operand::local("x"), Operand::int(9)),
                    target: 3,
                },
                InstrKind::ReturnVoid,
                InstrKind::Invoke(Call::statik(sink_ref(), vec![])),
                InstrKind::ReturnVoid,
            ],
        );
        let writer_body = body(
            writer.clone(),
            vec![
                InstrKind::Assign {
                    lhs: LValue::Field(FieldAccess::statik(mode)),
                    rhs: RValue::Use(Operand::int(9)),
                },
                InstrKind::ReturnVoid,
            ],
        );
        let program = FixtureProgram::new()
            .with_body(trigger_body)
            .with_body(writer_body);
        let oracle = StructuralOracle::default();
        let cache = HeapWriteCache::new(&program, &SharedSlot, &oracle, WalkLimits::default());
        cache.record_write(CallPath::single(writer.clone(), 0));

        let path = CallPath::single(trigger.clone(), 3);
        let chain = assembler(&program, &cache)
            .assemble(&path, &CancelToken::unbounded())
            .unwrap()
            .expect("path is feasible once the writer runs");

        assert_eq!(chain.len(), 2);
        let order: Vec<&MethodRef> = chain
            .events()
            .map(|entry| entry.event().path().target_method())
            .collect();
        assert_eq!(order, vec![&writer, &trigger]);
        assert_eq!(chain.start_method(), &writer);
    }
}
