//! Path-level constraint derivation
//!
//! Walks one CallPath edge by edge: the intraprocedural engine analyzes each
//! source method up to its call site, the control constraint reaching that
//! site is conjoined into the running path predicate, and the callee's
//! parameter map is seeded from the call's actual arguments and receiver.
//! After the last edge the target method is walked up to the target
//! instruction and the accumulated predicate is minimized. A predicate that
//! minimizes to `False` proves the path infeasible.

use std::sync::Arc;

use rustc_hash::FxHashSet;
use tracing::debug;

use crate::errors::{EngineError, Result};
use crate::features::constraint::domain::{
    minimize, DataMap, Expression, ExpressionSet, Operator, Pred, Predicate, Variable,
};
use crate::features::constraint::infrastructure::{IntraproceduralAnalysis, WalkLimits};
use crate::features::events::domain::call_path::{CallEdge, CallPath};
use crate::shared::cancel::CancelToken;
use crate::shared::models::{MethodBody, MethodRef, ParamSlot, ValueType};
use crate::shared::ports::{AliasProvider, ProgramModel};

/// Minimized outcome of one path walk
#[derive(Debug, Clone)]
pub struct PathConstraint {
    /// Feasibility predicate; `None` when the path imposes no condition
    pub constraint: Option<Pred>,
    /// Heap and store locations the predicate still depends on
    pub dependencies: Vec<Variable>,
}

impl PathConstraint {
    /// True when the predicate collapsed to `False`: no execution can take
    /// this path
    pub fn is_infeasible(&self) -> bool {
        self.constraint.as_ref().is_some_and(|pred| pred.is_false())
    }
}

/// Producer-side outcome: the write path's own feasibility plus the
/// predicate tying a dependence to the values the write may store
#[derive(Debug, Clone)]
pub struct ProducerConstraint {
    pub feasibility: PathConstraint,
    pub dependence_constraint: Option<Pred>,
}

/// Derives the feasibility predicate of a whole CallPath
pub struct PathAnalysis<'p> {
    program: &'p dyn ProgramModel,
    aliases: &'p dyn AliasProvider,
    path: &'p CallPath,
    limits: WalkLimits,
    token: CancelToken,
    /// Path methods, kept out of auxiliary expansion to block recursion
    exclude: Arc<FxHashSet<MethodRef>>,
    constraint: Option<Pred>,
    dependencies: Vec<Variable>,
}

impl<'p> PathAnalysis<'p> {
    pub fn new(
        program: &'p dyn ProgramModel,
        aliases: &'p dyn AliasProvider,
        path: &'p CallPath,
        limits: WalkLimits,
        token: CancelToken,
    ) -> Self {
        let exclude: FxHashSet<MethodRef> = path.methods().cloned().collect();
        PathAnalysis {
            program,
            aliases,
            path,
            limits,
            token,
            exclude: Arc::new(exclude),
            constraint: None,
            dependencies: Vec::new(),
        }
    }

    /// Runs the walk and minimizes the accumulated predicate
    pub fn run(mut self) -> Result<PathConstraint> {
        self.walk()?;
        let outcome = self.finish();
        debug!(
            path = %self.path,
            infeasible = outcome.is_infeasible(),
            dependencies = outcome.dependencies.len(),
            "path constraint derived"
        );
        Ok(outcome)
    }

    /// Producer variant for a path whose target instruction writes the
    /// location `dependence` reads from: additionally derives the predicate
    /// over the stored values, and drops the dependence from its own report
    pub fn run_for_store(mut self, dependence: &Variable) -> Result<ProducerConstraint> {
        let post_target = self.walk()?;
        let stored = self.store_constraint(dependence, &post_target);
        let mut feasibility = self.finish();
        feasibility.dependencies.retain(|dep| dep != dependence);
        debug!(
            path = %self.path,
            resolved = stored.is_some(),
            "store constraint derived"
        );
        Ok(ProducerConstraint {
            feasibility,
            dependence_constraint: stored,
        })
    }

    // ═══════════════════════════════════════════════════════════════════
    // Edge walk
    // ═══════════════════════════════════════════════════════════════════

    /// Threads parameter maps down the path; returns the fact just after
    /// the target instruction
    fn walk(&mut self) -> Result<DataMap> {
        let mut parameter_map = self.entry_parameter_map()?;
        for edge in self.path.edges() {
            parameter_map = self.walk_edge(edge, parameter_map)?;
        }
        self.walk_target(parameter_map)
    }

    /// Fresh Input Variables for the entry method's receiver and parameters.
    /// The receiver is input 0, formals follow from 1.
    fn entry_parameter_map(&self) -> Result<DataMap> {
        let entry = self.path.entry_method();
        let body = self.body_of(entry)?;
        let disc = self.path.discriminator();
        let mut map = DataMap::new();

        if !entry.is_static {
            if let Some(local) = body.param_local(&ParamSlot::This) {
                let receiver = Variable::input(0, disc, ValueType::reference(entry.class.clone()));
                map.set_local(
                    local.clone(),
                    ExpressionSet::from_expr(Expression::leaf(receiver)),
                );
            }
        }
        for (index, ty) in entry.param_types.iter().enumerate() {
            if let Some(local) = body.param_local(&ParamSlot::Arg(index)) {
                let input = Variable::input(index + 1, disc, ty.clone());
                map.set_local(
                    local.clone(),
                    ExpressionSet::from_expr(Expression::leaf(input)),
                );
            }
        }
        Ok(map)
    }

    fn walk_edge(&mut self, edge: CallEdge<'_>, parameter_map: DataMap) -> Result<DataMap> {
        let body = self.body_of(edge.caller)?;
        let mut intra = self.walker(Arc::clone(&body), parameter_map);
        intra.run()?;

        let site_state = intra.flow_before(edge.site).cloned().ok_or_else(|| {
            EngineError::internal(format!(
                "call site {} unreachable in {}",
                edge.site,
                edge.caller.signature()
            ))
        })?;
        self.absorb(&site_state, &mut intra);

        let mut next_map = DataMap::new();
        next_map.heap = site_state.heap.clone();

        // A class-initializer edge has no call instruction and passes nothing
        let Some(call) = body.instruction(edge.site).and_then(|instr| instr.call()) else {
            return Ok(next_map);
        };
        let callee_body = self.body_of(edge.callee)?;

        // Instance invokes patched onto a static callee shift every formal
        // by one, the receiver landing in parameter slot 0
        let arg_offset = usize::from(call.receiver.is_some() && edge.callee.is_static);

        if let Some(receiver) = &call.receiver {
            if !edge.callee.is_static || edge.callee.param_count() > 0 {
                let slot = if arg_offset == 0 {
                    ParamSlot::This
                } else {
                    ParamSlot::Arg(0)
                };
                if let Some(local) = callee_body.param_local(&slot) {
                    if let Some(values) = intra.resolve_operand(receiver, &site_state) {
                        next_map.set_local(local.clone(), values);
                    }
                }
            }
        }

        for (index, arg) in call.args.iter().enumerate() {
            if index + arg_offset >= edge.callee.param_count() {
                break;
            }
            let Some(local) = callee_body.param_local(&ParamSlot::Arg(index + arg_offset)) else {
                continue;
            };
            if let Some(values) = intra.resolve_operand(arg, &site_state) {
                next_map.set_local(local.clone(), values);
            }
        }
        Ok(next_map)
    }

    fn walk_target(&mut self, parameter_map: DataMap) -> Result<DataMap> {
        let target = self.path.target_method();
        let body = self.body_of(target)?;
        let mut intra = self.walker(Arc::clone(&body), parameter_map);
        intra.run()?;

        let site = self.path.target_site();
        let target_state = intra.flow_before(site).cloned().ok_or_else(|| {
            EngineError::internal(format!(
                "target instruction {} unreachable in {}",
                site,
                target.signature()
            ))
        })?;
        self.absorb(&target_state, &mut intra);

        let falls_through = body
            .instruction(site)
            .is_some_and(|instr| instr.falls_through());
        if falls_through {
            if let Some(after) = intra.fall_flow_after(site) {
                return Ok(after.clone());
            }
        }
        Ok(target_state)
    }

    /// Conjoins the state's control constraint and collects the walk's
    /// unresolved heap reads
    fn absorb(&mut self, state: &DataMap, intra: &mut IntraproceduralAnalysis<'_>) {
        self.constraint = Predicate::and(self.constraint.take(), state.constraint.clone());
        for dep in intra.take_heap_dependencies() {
            if !self.dependencies.contains(&dep) {
                self.dependencies.push(dep);
            }
        }
    }

    /// Minimizes the predicate and keeps only the dependencies it still
    /// mentions
    fn finish(&mut self) -> PathConstraint {
        let constraint = minimize(self.constraint.take());
        let dependencies = self
            .dependencies
            .drain(..)
            .filter(|dep| {
                constraint
                    .as_ref()
                    .is_some_and(|pred| pred.contains_expression(&Expression::leaf(dep.clone())))
            })
            .collect();
        PathConstraint {
            constraint,
            dependencies,
        }
    }

    /// Disjunction of equalities between the dependence and every value the
    /// post-target heap may hold for an aliasing location
    fn store_constraint(&self, dependence: &Variable, post_target: &DataMap) -> Option<Pred> {
        let dep_set = ExpressionSet::from_expr(Expression::leaf(dependence.clone()));
        let op = if dependence.ty().is_string() {
            Operator::StrEq
        } else {
            Operator::Eq
        };

        let mut stored: Option<Pred> = None;
        for (heap_var, values) in &post_target.heap {
            if !heap_var.aliases(dependence) {
                continue;
            }
            let equates = ExpressionSet::combine(op, Some(&dep_set), Some(values))
                .and_then(|set| set.to_predicate());
            stored = Predicate::or(stored, equates);
        }
        stored
    }

    fn body_of(&self, method: &MethodRef) -> Result<Arc<MethodBody>> {
        self.program.body(method).ok_or_else(|| {
            EngineError::internal(format!("no body for path method {}", method.signature()))
        })
    }

    fn walker(&self, body: Arc<MethodBody>, parameter_map: DataMap) -> IntraproceduralAnalysis<'p> {
        IntraproceduralAnalysis::new(
            self.program,
            self.aliases,
            body,
            parameter_map,
            Arc::clone(&self.exclude),
            self.limits,
            self.token.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::{
        AliasSig, BinOp, Call, CondExpr, FieldAccess, FieldRef, InstrKind, Instruction, LValue,
        Local, Operand, RValue,
    };
    use rustc_hash::FxHashMap;

    struct FixtureProgram {
        bodies: FxHashMap<MethodRef, Arc<MethodBody>>,
        app_classes: FxHashSet<String>,
    }

    impl FixtureProgram {
        fn new() -> Self {
            Self {
                bodies: FxHashMap::default(),
                app_classes: FxHashSet::default(),
            }
        }

        fn with_body(mut self, body: MethodBody) -> Self {
            let method = body.method().as_ref().clone();
            self.app_classes.insert(method.class.clone());
            self.bodies.insert(method, Arc::new(body));
            self
        }
    }

    impl ProgramModel for FixtureProgram {
        fn body(&self, method: &MethodRef) -> Option<Arc<MethodBody>> {
            self.bodies.get(method).cloned()
        }

        fn is_app_method(&self, method: &MethodRef) -> bool {
            self.app_classes.contains(&method.class)
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

    fn entry_ref() -> MethodRef {
        MethodRef::new_static("com.app.Main", "entry", vec![ValueType::Int], ValueType::Void)
    }

    fn sink_ref() -> MethodRef {
        MethodRef::new_static("com.app.Main", "sink", vec![ValueType::Int], ValueType::Void)
    }

    /// entry(k): if k == `guard` it calls sink(k) at instruction 3
    fn entry_body(guard: i64) -> MethodBody {
        body(
            entry_ref(),
            vec![
                InstrKind::Identity {
                    local: Local::new("k"),
                    slot: ParamSlot::Arg(0),
                    ty: ValueType::Int,
                },
                InstrKind::If {
                    cond: CondExpr::new(BinOp::Eq, Operand::local("k"), Operand::int(guard)),
                    target: 3,
                },
                InstrKind::ReturnVoid,
                InstrKind::Invoke(Call::statik(sink_ref(), vec![Operand::local("k")])),
                InstrKind::ReturnVoid,
            ],
        )
    }

    fn eq_input(disc: u64, number: usize, value: i64) -> Pred {
        Predicate::expr(
            Expression::combine(
                Operator::Eq,
                Some(Expression::leaf(Variable::input(
                    number,
                    disc,
                    ValueType::Int,
                ))),
                Some(Expression::leaf(Variable::int(value))),
            )
            .unwrap(),
        )
    }

    fn analyze<'p>(
        program: &'p FixtureProgram,
        aliases: &'p SharedSlot,
        path: &'p CallPath,
    ) -> PathAnalysis<'p> {
        PathAnalysis::new(
            program,
            aliases,
            path,
            WalkLimits::default(),
            CancelToken::unbounded(),
        )
    }

    #[test]
    fn branch_conditions_accumulate_along_the_path() {
        // sink: 0: p := @parameter0, 1: return
        let sink = body(
            sink_ref(),
            vec![
                InstrKind::Identity {
                    local: Local::new("p"),
                    slot: ParamSlot::Arg(0),
                    ty: ValueType::Int,
                },
                InstrKind::ReturnVoid,
            ],
        );
        let program = FixtureProgram::new()
            .with_body(entry_body(5))
            .with_body(sink);
        let path = CallPath::new(vec![entry_ref(), sink_ref()], vec![3], 1).unwrap();

        let out = analyze(&program, &SharedSlot, &path).run().unwrap();

        assert_eq!(out.constraint, Some(eq_input(path.discriminator(), 1, 5)));
        assert!(out.dependencies.is_empty());
        assert!(!out.is_infeasible());
    }

    #[test]
    fn repeated_conditions_collapse_across_methods() {
        // sink re-checks the forwarded argument before reaching the target
        let sink = body(
            sink_ref(),
            vec![
                InstrKind::Identity {
                    local: Local::new("p"),
                    slot: ParamSlot::Arg(0),
                    ty: ValueType::Int,
                },
                InstrKind::If {
                    cond: CondExpr::new(BinOp::Eq, Operand::local("p"), Operand::int(5)),
                    target: 3,
                },
                InstrKind::ReturnVoid,
                InstrKind::Nop,
            ],
        );
        let program = FixtureProgram::new()
            .with_body(entry_body(5))
            .with_body(sink);
        let path = CallPath::new(vec![entry_ref(), sink_ref()], vec![3], 3).unwrap();

        let out = analyze(&program, &SharedSlot, &path).run().unwrap();

        assert_eq!(out.constraint, Some(eq_input(path.discriminator(), 1, 5)));
    }

    #[test]
    fn contradictory_branches_mark_the_path_infeasible() {
        let sink = body(
            sink_ref(),
            vec![
                InstrKind::Identity {
                    local: Local::new("p"),
                    slot: ParamSlot::Arg(0),
                    ty: ValueType::Int,
                },
                InstrKind::If {
                    cond: CondExpr::new(BinOp::Ne, Operand::local("p"), Operand::int(3)),
                    target: 3,
                },
                InstrKind::ReturnVoid,
                InstrKind::Nop,
            ],
        );
        let program = FixtureProgram::new()
            .with_body(entry_body(3))
            .with_body(sink);
        let path = CallPath::new(vec![entry_ref(), sink_ref()], vec![3], 3).unwrap();

        let out = analyze(&program, &SharedSlot, &path).run().unwrap();

        assert!(out.is_infeasible());
    }

    #[test]
    fn constant_arguments_bind_in_the_callee() {
        // entry: 0: sink(7), 1: return
        let entry = body(
            entry_ref(),
            vec![
                InstrKind::Invoke(Call::statik(sink_ref(), vec![Operand::int(7)])),
                InstrKind::ReturnVoid,
            ],
        );
        let sink = body(
            sink_ref(),
            vec![
                InstrKind::Identity {
                    local: Local::new("p"),
                    slot: ParamSlot::Arg(0),
                    ty: ValueType::Int,
                },
                InstrKind::If {
                    cond: CondExpr::new(BinOp::Eq, Operand::local("p"), Operand::int(7)),
                    target: 3,
                },
                InstrKind::ReturnVoid,
                InstrKind::Nop,
            ],
        );
        let program = FixtureProgram::new().with_body(entry).with_body(sink);
        let path = CallPath::new(vec![entry_ref(), sink_ref()], vec![0], 3).unwrap();

        let out = analyze(&program, &SharedSlot, &path).run().unwrap();

        // (7 == 7) folds away entirely
        assert_eq!(out.constraint, Some(Predicate::truth()));
        assert!(!out.is_infeasible());
    }

    #[test]
    fn reads_feeding_the_constraint_become_dependencies() {
        let field = FieldRef::new("com.app.Store", "mode", ValueType::Int);
        let reader = MethodRef::new_static("com.app.Main", "reader", vec![], ValueType::Void);
        let reader_body = body(
            reader.clone(),
            vec![
                InstrKind::Assign {
                    lhs: LValue::Local(Local::new("x")),
                    rhs: RValue::FieldLoad(FieldAccess::statik(field.clone())),
                },
                InstrKind::If {
                    cond: CondExpr::new(BinOp::Eq, Operand::local("x"), Operand::int(9)),
                    target: 3,
                },
                InstrKind::ReturnVoid,
                InstrKind::Nop,
            ],
        );
        let program = FixtureProgram::new().with_body(reader_body);
        let path = CallPath::single(reader, 3);

        let out = analyze(&program, &SharedSlot, &path).run().unwrap();

        let location = Variable::heap(field, AliasSig::new([7]));
        let expected = Predicate::expr(
            Expression::combine(
                Operator::Eq,
                Some(Expression::leaf(location.clone())),
                Some(Expression::leaf(Variable::int(9))),
            )
            .unwrap(),
        );
        assert_eq!(out.constraint, Some(expected));
        assert_eq!(out.dependencies, vec![location]);
    }

    #[test]
    fn reads_the_constraint_never_mentions_are_dropped() {
        let field = FieldRef::new("com.app.Store", "mode", ValueType::Int);
        let reader = MethodRef::new_static("com.app.Main", "reader", vec![], ValueType::Void);
        let reader_body = body(
            reader.clone(),
            vec![
                InstrKind::Assign {
                    lhs: LValue::Local(Local::new("x")),
                    rhs: RValue::FieldLoad(FieldAccess::statik(field)),
                },
                InstrKind::ReturnVoid,
            ],
        );
        let program = FixtureProgram::new().with_body(reader_body);
        let path = CallPath::single(reader, 1);

        let out = analyze(&program, &SharedSlot, &path).run().unwrap();

        assert_eq!(out.constraint, None);
        assert!(out.dependencies.is_empty());
    }

    #[test]
    fn store_paths_expose_the_written_value() {
        let field = FieldRef::new("com.app.Store", "mode", ValueType::Int);
        let writer = MethodRef::new_static("com.app.Main", "writer", vec![], ValueType::Void);
        let writer_body = body(
            writer.clone(),
            vec![
                InstrKind::Assign {
                    lhs: LValue::Field(FieldAccess::statik(field.clone())),
                    rhs: RValue::Use(Operand::int(42)),
                },
                InstrKind::ReturnVoid,
            ],
        );
        let program = FixtureProgram::new().with_body(writer_body);
        let path = CallPath::single(writer, 0);
        let dependence = Variable::heap(field, AliasSig::new([7]));

        let out = analyze(&program, &SharedSlot, &path)
            .run_for_store(&dependence)
            .unwrap();

        let expected = Predicate::expr(
            Expression::combine(
                Operator::Eq,
                Some(Expression::leaf(dependence.clone())),
                Some(Expression::leaf(Variable::int(42))),
            )
            .unwrap(),
        );
        assert_eq!(out.dependence_constraint, Some(expected));
        assert_eq!(out.feasibility.constraint, None);
        assert!(out.feasibility.dependencies.is_empty());
    }
}
