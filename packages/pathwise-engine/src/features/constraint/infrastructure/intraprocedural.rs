//! Bounded symbolic walk over one method body
//!
//! Forward dataflow over the instruction graph, carrying a [`DataMap`] per
//! control-flow edge. Each instruction is interpreted symbolically: values
//! resolve to expression sets, branches conjoin their conditions onto the
//! accumulated constraint, and heap reads materialize symbolic locations
//! that later dependence resolution can bind to writes on other paths.
//!
//! The walk revisits an instruction at most a fixed number of times, so
//! loops contribute their first few iterations and nothing more. Auxiliary
//! application callees are expanded inline one level deep, with their
//! return values tied to a per-site placeholder.

use std::collections::VecDeque;
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, warn};

use crate::errors::Result;
use crate::features::constraint::domain::{
    DataMap, Expr, Expression, ExpressionSet, Operator, Pred, Predicate, StoreKind, Variable,
};
use crate::shared::cancel::CancelToken;
use crate::shared::models::{
    BinOp, Call, CondExpr, FieldAccess, InstrId, InstrKind, Instruction, LValue, MethodBody,
    MethodRef, Operand, ParamSlot, RValue, ValueType,
};
use crate::shared::ports::{AliasProvider, ProgramModel};

use super::library_models::{classify, KnownCall};

/// Tuning knobs for the walk
#[derive(Debug, Clone, Copy)]
pub struct WalkLimits {
    /// Times one instruction may be reprocessed before its state freezes
    pub max_instruction_visits: u32,
    /// Auxiliary-call nesting depth still expanded inline
    pub max_aux_depth: usize,
}

impl Default for WalkLimits {
    fn default() -> Self {
        Self {
            max_instruction_visits: 3,
            max_aux_depth: 1,
        }
    }
}

/// Symbolic constraint analysis of a single method
pub struct IntraproceduralAnalysis<'p> {
    program: &'p dyn ProgramModel,
    aliases: &'p dyn AliasProvider,
    body: Arc<MethodBody>,
    /// Entry bindings: locals for parameter identities, heap carried in
    /// from the caller
    parameter_map: DataMap,
    /// Methods never expanded as auxiliary callees (the current call path,
    /// to keep recursion out)
    exclude: Arc<FxHashSet<MethodRef>>,
    aux_depth: usize,
    limits: WalkLimits,
    token: CancelToken,

    before: Vec<Option<DataMap>>,
    edge_out: FxHashMap<(InstrId, InstrId), DataMap>,
    visit_counts: Vec<u32>,
    /// Heap locations read before any write on this path, in first-read order
    heap_dependencies: Vec<Variable>,
    /// Reads already materialized, so repeated loads share one symbol
    read_heap: Vec<(Variable, Expr)>,
}

impl<'p> IntraproceduralAnalysis<'p> {
    pub fn new(
        program: &'p dyn ProgramModel,
        aliases: &'p dyn AliasProvider,
        body: Arc<MethodBody>,
        parameter_map: DataMap,
        exclude: Arc<FxHashSet<MethodRef>>,
        limits: WalkLimits,
        token: CancelToken,
    ) -> Self {
        Self::with_depth(program, aliases, body, parameter_map, exclude, limits, token, 0)
    }

    #[allow(clippy::too_many_arguments)]
    fn with_depth(
        program: &'p dyn ProgramModel,
        aliases: &'p dyn AliasProvider,
        body: Arc<MethodBody>,
        parameter_map: DataMap,
        exclude: Arc<FxHashSet<MethodRef>>,
        limits: WalkLimits,
        token: CancelToken,
        aux_depth: usize,
    ) -> Self {
        let len = body.len();
        Self {
            program,
            aliases,
            body,
            parameter_map,
            exclude,
            aux_depth,
            limits,
            token,
            before: vec![None; len],
            edge_out: FxHashMap::default(),
            visit_counts: vec![0; len],
            heap_dependencies: Vec::new(),
            read_heap: Vec::new(),
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Fixpoint loop
    // ═══════════════════════════════════════════════════════════════════

    /// Runs the walk to its bounded fixpoint
    pub fn run(&mut self) -> Result<()> {
        if self.body.is_empty() {
            return Ok(());
        }
        let body = Arc::clone(&self.body);
        let preds = predecessors(&body);

        let mut queue: VecDeque<InstrId> = VecDeque::new();
        let mut queued = vec![false; body.len()];
        self.before[0] = Some(self.entry_state());
        queue.push_back(0);
        queued[0] = true;

        let mut steps = 0u64;
        while let Some(id) = queue.pop_front() {
            queued[id] = false;
            self.token.check("constraint walk")?;
            if self.visit_counts[id] >= self.limits.max_instruction_visits {
                continue;
            }
            self.visit_counts[id] += 1;
            steps += 1;

            let Some(in_state) = self.before[id].clone() else {
                continue;
            };
            let instr = &body.instructions()[id];
            let outs = self.transfer(&body, instr, &in_state)?;

            for (succ, mut out) in outs {
                prune_dead_locals(&body, instr, &mut out);
                let changed = self
                    .edge_out
                    .get(&(id, succ))
                    .map_or(true, |prev| *prev != out);
                self.edge_out.insert((id, succ), out);
                self.before[succ] = Some(self.merge_incoming(succ, &preds[succ]));
                if changed && !queued[succ] {
                    queue.push_back(succ);
                    queued[succ] = true;
                }
            }
        }

        debug!(
            method = %body.method().signature(),
            steps,
            heap_reads = self.heap_dependencies.len(),
            "constraint walk converged"
        );
        Ok(())
    }

    /// State on entry: no locals yet, the caller's view of the heap, and no
    /// accumulated condition
    fn entry_state(&self) -> DataMap {
        let mut entry = DataMap::new();
        entry.heap = self.parameter_map.heap.clone();
        entry
    }

    fn merge_incoming(&self, id: InstrId, preds: &[InstrId]) -> DataMap {
        let mut acc: Option<DataMap> = if id == 0 { Some(self.entry_state()) } else { None };
        for &pred in preds {
            if let Some(flow) = self.edge_out.get(&(pred, id)) {
                acc = Some(match acc {
                    Some(merged) => DataMap::merged(&merged, flow),
                    None => flow.clone(),
                });
            }
        }
        acc.unwrap_or_default()
    }

    /// Symbolic state reaching an instruction, `None` if the walk never got
    /// there
    pub fn flow_before(&self, id: InstrId) -> Option<&DataMap> {
        self.before.get(id).and_then(|state| state.as_ref())
    }

    /// State on the fall-through edge out of an instruction, carrying any
    /// effect the instruction itself had
    pub fn fall_flow_after(&self, id: InstrId) -> Option<&DataMap> {
        self.edge_out.get(&(id, id + 1))
    }

    /// Heap locations this walk read without a preceding write
    pub fn heap_dependencies(&self) -> &[Variable] {
        &self.heap_dependencies
    }

    pub fn take_heap_dependencies(&mut self) -> Vec<Variable> {
        std::mem::take(&mut self.heap_dependencies)
    }

    // ═══════════════════════════════════════════════════════════════════
    // Transfer function
    // ═══════════════════════════════════════════════════════════════════

    fn transfer(
        &mut self,
        body: &MethodBody,
        instr: &Instruction,
        in_state: &DataMap,
    ) -> Result<Vec<(InstrId, DataMap)>> {
        let id = instr.id;
        let mut outs: Vec<(InstrId, DataMap)> = Vec::new();

        match &instr.kind {
            InstrKind::Assign { lhs, rhs } => {
                let mut out = in_state.clone();
                if let Some(values) = self.resolve_rvalue(id, rhs, in_state) {
                    match lhs {
                        LValue::Local(local) => out.set_local(local.clone(), values),
                        LValue::ArrayElem {
                            base: Operand::Local(base),
                            ..
                        } => out.set_local(base.clone(), values),
                        LValue::ArrayElem { .. } => {}
                        LValue::Field(access) => self.store_heap(access, values, &mut out),
                    }
                }
                out.assume(self.rvalue_constraint(id, rhs, in_state)?);
                push_fall(&mut outs, body, id, out);
            }

            InstrKind::Invoke(call) => {
                let mut out = in_state.clone();
                out.assume(self.call_constraint(id, call, in_state)?);
                push_fall(&mut outs, body, id, out);
            }

            InstrKind::Identity { local, .. } => {
                let mut out = in_state.clone();
                if let Some(values) = self.parameter_map.local(local) {
                    out.set_local(local.clone(), values.clone());
                }
                push_fall(&mut outs, body, id, out);
            }

            InstrKind::If { cond, target } => {
                let condition = self.condition_constraint(cond, in_state);
                if id + 1 < body.len() {
                    let mut fall = in_state.clone();
                    fall.assume(Predicate::not(condition.clone()));
                    push_out(&mut outs, id + 1, fall);
                }
                let mut branch = in_state.clone();
                branch.assume(condition);
                push_out(&mut outs, *target, branch);
            }

            InstrKind::Goto { target } => {
                push_out(&mut outs, *target, in_state.clone());
            }

            InstrKind::LookupSwitch {
                key,
                cases,
                default,
            } => {
                let key_set = self.resolve_operand(key, in_state);
                let mut default_out = in_state.clone();
                for (value, target) in cases {
                    let mut out = in_state.clone();
                    if let Some(keys) = &key_set {
                        if let Some(case_set) =
                            ExpressionSet::combine(Operator::Eq, Some(keys), Some(&int_set(*value)))
                        {
                            out.assume(case_set.to_predicate());
                            default_out.assume(case_set.to_not_predicate());
                        }
                    }
                    push_out(&mut outs, *target, out);
                }
                push_out(&mut outs, *default, default_out);
            }

            InstrKind::TableSwitch {
                key,
                low,
                high,
                targets,
                default,
            } => {
                let key_set = self.resolve_operand(key, in_state);
                for (offset, target) in targets.iter().enumerate() {
                    let mut out = in_state.clone();
                    if let Some(keys) = &key_set {
                        let value = int_set(low + offset as i64);
                        if let Some(case_set) =
                            ExpressionSet::combine(Operator::Eq, Some(keys), Some(&value))
                        {
                            out.assume(case_set.to_predicate());
                        }
                    }
                    push_out(&mut outs, *target, out);
                }
                let mut out = in_state.clone();
                if let Some(keys) = &key_set {
                    let below = ExpressionSet::combine(Operator::Lt, Some(keys), Some(&int_set(*low)))
                        .and_then(|s| s.to_predicate());
                    let above = ExpressionSet::combine(Operator::Gt, Some(keys), Some(&int_set(*high)))
                        .and_then(|s| s.to_predicate());
                    out.assume(Predicate::or(below, above));
                }
                push_out(&mut outs, *default, out);
            }

            InstrKind::Return(_) | InstrKind::ReturnVoid | InstrKind::Throw(_) => {}

            InstrKind::MonitorEnter(_) | InstrKind::MonitorExit(_) | InstrKind::Nop => {
                push_fall(&mut outs, body, id, in_state.clone());
            }
        }

        Ok(outs)
    }

    // ═══════════════════════════════════════════════════════════════════
    // Value resolution
    // ═══════════════════════════════════════════════════════════════════

    pub(crate) fn resolve_operand(
        &mut self,
        operand: &Operand,
        state: &DataMap,
    ) -> Option<ExpressionSet> {
        let values = match operand {
            Operand::Local(local) => state.local(local).cloned(),
            Operand::Const(value) => Some(ExpressionSet::from_expr(Expression::leaf(
                Variable::constant(value.clone()),
            ))),
        };
        values.filter(|set| !set.is_empty())
    }

    pub(crate) fn resolve_rvalue(
        &mut self,
        site: InstrId,
        rvalue: &RValue,
        state: &DataMap,
    ) -> Option<ExpressionSet> {
        let values = match rvalue {
            RValue::Use(op) => self.resolve_operand(op, state),

            RValue::Neg(op) => {
                let operand = self.resolve_operand(op, state);
                ExpressionSet::combine(Operator::Mul, operand.as_ref(), Some(&int_set(-1)))
            }

            RValue::Binary { op, left, right } => {
                let lhs = self.resolve_operand(left, state);
                let rhs = self.resolve_operand(right, state);
                ExpressionSet::combine(binop_operator(*op), lhs.as_ref(), rhs.as_ref())
            }

            RValue::FieldLoad(access) => self.resolve_field_load(access, state),

            RValue::ArrayLoad { base, .. } => self.resolve_operand(base, state),

            RValue::Invoke(call) => self.resolve_invoke(site, call, state),

            RValue::New { ty } if ty.is_string() => {
                Some(ExpressionSet::from_expr(Expression::empty_string()))
            }
            RValue::New {
                ty: ValueType::Array(_),
            } => None,
            RValue::New { ty } => Some(ExpressionSet::from_expr(Expression::leaf(
                Variable::placeholder(format!("New<{}>({})", ty, site), ty.clone()),
            ))),

            RValue::Cast { ty, value } => self.resolve_operand(value, state).map(|set| {
                set.map(|e| match e.variable() {
                    Some(var) => Expression::cast_leaf(var.clone(), ty.clone()),
                    None => e.clone(),
                })
            }),

            RValue::InstanceOf { value, .. } => self.resolve_operand(value, state).map(|set| {
                set.map(|e| match e.variable() {
                    Some(var) => Expression::leaf(Variable::class_type(var.clone())),
                    None => e.clone(),
                })
            }),

            RValue::Length(op) => match self.resolve_operand(op, state) {
                Some(set) => Some(set.map(|e| match e.variable() {
                    Some(var) => Expression::leaf(Variable::placeholder(
                        format!("Array.length({})", var),
                        ValueType::Int,
                    )),
                    None => Expression::leaf(Variable::placeholder(
                        format!("Array.length{{{}}}", site),
                        ValueType::Int,
                    )),
                })),
                None => Some(ExpressionSet::from_expr(Expression::leaf(
                    Variable::placeholder(format!("Array.length{{{}}}", site), ValueType::Int),
                ))),
            },

            RValue::Phi(ops) => {
                let resolved: Vec<ExpressionSet> = ops
                    .iter()
                    .filter_map(|op| self.resolve_operand(op, state))
                    .collect();
                if resolved.is_empty() {
                    None
                } else {
                    Some(ExpressionSet::merge(&resolved))
                }
            }
        };
        values.filter(|set| !set.is_empty())
    }

    /// Reads resolve against writes already on this path, then against
    /// earlier reads, and finally materialize a fresh symbolic location that
    /// dependence resolution will try to bind to a write elsewhere
    fn resolve_field_load(
        &mut self,
        access: &FieldAccess,
        state: &DataMap,
    ) -> Option<ExpressionSet> {
        let location = self.heap_variable(access);

        let mut written: Option<ExpressionSet> = None;
        for (variable, values) in &state.heap {
            if variable.aliases(&location) {
                match &mut written {
                    Some(acc) => acc.extend_with(values),
                    None => written = Some(values.clone()),
                }
            }
        }
        if written.is_some() {
            return written;
        }

        if let Some((_, expr)) = self
            .read_heap
            .iter()
            .find(|(variable, _)| variable.aliases(&location))
        {
            return Some(ExpressionSet::from_expr(expr.clone()));
        }

        let expr = Expression::leaf(location.clone());
        self.push_heap_dependence(location.clone());
        self.read_heap.push((location, expr.clone()));
        Some(ExpressionSet::from_expr(expr))
    }

    fn resolve_invoke(
        &mut self,
        site: InstrId,
        call: &Call,
        state: &DataMap,
    ) -> Option<ExpressionSet> {
        match classify(call) {
            Some(KnownCall::PduDecode { payload }) => {
                if let Some(set) = self.resolve_operand(payload, state) {
                    let callee = &call.callee;
                    return Some(set.map(|e| {
                        Expression::leaf(Variable::method_result(
                            e.variable().cloned(),
                            callee.clone(),
                            site as u64,
                        ))
                    }));
                }
            }

            Some(KnownCall::StoreRead {
                store,
                base,
                key,
                ty,
            }) => {
                let base_set = self.resolve_operand(base, state);
                let key_set = self.resolve_operand(key, state);
                if let (Some(base_set), Some(key_set)) = (base_set, key_set) {
                    let mut parts: Vec<ExpressionSet> = Vec::new();
                    for base_expr in base_set.iter() {
                        match base_expr.variable() {
                            None => parts.push(ExpressionSet::from_expr(Expression::leaf(
                                Variable::key_value(store, None, None, ty.clone()),
                            ))),
                            Some(base_var) => parts.push(key_set.map(|e| {
                                Expression::leaf(Variable::key_value(
                                    store,
                                    Some(base_var.clone()),
                                    e.variable().cloned(),
                                    ty.clone(),
                                ))
                            })),
                        }
                    }
                    return Some(ExpressionSet::merge(&parts));
                }
            }

            Some(KnownCall::ResourceLookup { key }) => {
                if let Some(key_set) = self.resolve_operand(key, state) {
                    let context = Variable::placeholder(
                        "Context",
                        ValueType::reference("android.content.Context"),
                    );
                    return Some(key_set.map(|e| {
                        Expression::leaf(Variable::key_value(
                            StoreKind::StringTable,
                            Some(context.clone()),
                            e.variable().cloned(),
                            ValueType::string(),
                        ))
                    }));
                }
            }

            Some(KnownCall::Append { base, arg }) => {
                let lhs = self.resolve_operand(base, state);
                let rhs = self.resolve_operand(arg, state);
                if let (Some(lhs), Some(rhs)) = (lhs, rhs) {
                    return ExpressionSet::combine(Operator::Append, Some(&lhs), Some(&rhs));
                }
            }

            Some(KnownCall::Passthrough { base }) => {
                return self.resolve_operand(base, state);
            }

            Some(KnownCall::StringTest { .. }) | Some(KnownCall::ObjectEquals { .. }) => {
                return Some(ExpressionSet::from_expr(Expression::leaf(
                    Variable::placeholder(
                        short_return_symbol(&call.callee, site),
                        ValueType::Boolean,
                    ),
                )));
            }

            None => {}
        }

        if self.expands_inline(&call.callee) {
            let symbol = self.aux_return_symbol(call, site, state);
            return Some(ExpressionSet::from_expr(Expression::leaf(
                Variable::placeholder(symbol, call.callee.return_type.clone()),
            )));
        }

        // Opaque instance calls stay tied to their receiver so input taint
        // survives; opaque static calls resolve to nothing.
        if let Some(receiver) = &call.receiver {
            if let Some(base) = self.resolve_operand(receiver, state) {
                let callee = &call.callee;
                return Some(base.map(|e| {
                    Expression::leaf(Variable::method_result(
                        e.variable().cloned(),
                        callee.clone(),
                        site as u64,
                    ))
                }));
            }
        }
        None
    }

    // ═══════════════════════════════════════════════════════════════════
    // Constraint resolution
    // ═══════════════════════════════════════════════════════════════════

    fn rvalue_constraint(
        &mut self,
        site: InstrId,
        rvalue: &RValue,
        state: &DataMap,
    ) -> Result<Option<Pred>> {
        match rvalue {
            RValue::Invoke(call) => self.call_constraint(site, call, state),
            RValue::Cast { ty, value } => Ok(self.cast_constraint(ty, value, state)),
            _ => Ok(None),
        }
    }

    fn condition_constraint(&mut self, cond: &CondExpr, state: &DataMap) -> Option<Pred> {
        let lhs = self.resolve_operand(&cond.left, state)?;
        let rhs = self.resolve_operand(&cond.right, state)?;
        ExpressionSet::combine(binop_operator(cond.op), Some(&lhs), Some(&rhs))?.to_predicate()
    }

    /// A cast constrains the operand's runtime class to the cast target
    fn cast_constraint(
        &mut self,
        ty: &ValueType,
        value: &Operand,
        state: &DataMap,
    ) -> Option<Pred> {
        let set = self.resolve_operand(value, state)?;
        let class_of = set.map(|e| match e.variable() {
            Some(var) => Expression::leaf(Variable::class_type(var.clone())),
            None => e.clone(),
        });
        let class_name = ExpressionSet::from_expr(Expression::leaf(Variable::string(ty.to_string())));
        ExpressionSet::combine(Operator::StrEq, Some(&class_of), Some(&class_name))?.to_predicate()
    }

    fn call_constraint(
        &mut self,
        site: InstrId,
        call: &Call,
        state: &DataMap,
    ) -> Result<Option<Pred>> {
        match classify(call) {
            Some(KnownCall::StringTest { op, base, arg }) => {
                Ok(self.comparison_constraint(site, op, base, arg, call, state))
            }
            Some(KnownCall::ObjectEquals { base, arg }) => {
                Ok(self.comparison_constraint(site, Operator::Eq, base, arg, call, state))
            }
            _ => {
                if self.expands_inline(&call.callee) {
                    let symbol = self.aux_return_symbol(call, site, state);
                    let identifier = Expression::leaf(Variable::placeholder(
                        symbol,
                        call.callee.return_type.clone(),
                    ));
                    self.handle_auxiliary(call, state, identifier)
                } else {
                    Ok(None)
                }
            }
        }
    }

    /// Two-sided model of a boolean comparison call: either the comparison
    /// holds and the result is true, or its negation holds and the result is
    /// false. The result placeholder is the same one the value resolver
    /// produced for this site.
    fn comparison_constraint(
        &mut self,
        site: InstrId,
        op: Operator,
        base: &Operand,
        arg: &Operand,
        call: &Call,
        state: &DataMap,
    ) -> Option<Pred> {
        let lhs = self.resolve_operand(base, state)?;
        let rhs = self.resolve_operand(arg, state)?;
        let outcome = Expression::leaf(Variable::placeholder(
            short_return_symbol(&call.callee, site),
            ValueType::Boolean,
        ));

        let compared = ExpressionSet::combine(op, Some(&lhs), Some(&rhs))?;
        let is_true = Expression::combine(
            Operator::Eq,
            Some(outcome.clone()),
            Some(Expression::bool_true()),
        )
        .map(Predicate::expr);
        let is_false = Expression::combine(
            Operator::Eq,
            Some(outcome),
            Some(Expression::bool_false()),
        )
        .map(Predicate::expr);

        let holds = Predicate::and(compared.to_predicate(), is_true);
        let fails = Predicate::and(compared.to_not_predicate(), is_false);
        Predicate::or(holds, fails)
    }

    // ═══════════════════════════════════════════════════════════════════
    // Auxiliary callees
    // ═══════════════════════════════════════════════════════════════════

    fn expands_inline(&self, callee: &MethodRef) -> bool {
        self.aux_depth < self.limits.max_aux_depth
            && self.program.is_app_method(callee)
            && !self.exclude.contains(callee)
    }

    /// Per-site symbol for an expanded callee's return value, refined with
    /// the receiver's tracked value when there is one
    fn aux_return_symbol(&mut self, call: &Call, site: InstrId, state: &DataMap) -> String {
        let mut label = format!("{}.{}", call.callee.short_class_name(), call.callee.name);
        if let Some(receiver) = &call.receiver {
            if let Some(base) = self.resolve_operand(receiver, state) {
                if let Some(var) = base.iter().find_map(|e| e.variable()) {
                    label = format!("{}.{}", var, call.callee.name);
                }
            }
        }
        format!("Return<{}(){{{}}}>", label, site)
    }

    /// Walks an application callee one level deep and returns the predicate
    /// binding its return placeholder to the values its return sites carry,
    /// disjoined over the tails
    fn handle_auxiliary(
        &mut self,
        call: &Call,
        state: &DataMap,
        return_identifier: Expr,
    ) -> Result<Option<Pred>> {
        let Some(callee_body) = self.program.body(&call.callee) else {
            return Ok(None);
        };

        let mut parameter_map = DataMap::new();
        parameter_map.heap = state.heap.clone();

        // A receiver on a static target is a dispatch bridge; it occupies
        // the first formal slot and shifts the rest.
        let arg_offset = usize::from(call.receiver.is_some() && call.callee.is_static);

        for (index, arg) in call
            .args
            .iter()
            .enumerate()
            .take(call.callee.param_count())
        {
            if let Some(values) = self.resolve_operand(arg, state) {
                if let Some(local) = callee_body.param_local(&ParamSlot::Arg(index + arg_offset)) {
                    parameter_map.set_local(local.clone(), values);
                }
            }
        }

        if let Some(receiver) = &call.receiver {
            if !call.callee.is_static || call.callee.param_count() > 0 {
                if let Some(values) = self.resolve_operand(receiver, state) {
                    let slot = if arg_offset == 0 {
                        ParamSlot::This
                    } else {
                        ParamSlot::Arg(0)
                    };
                    if let Some(local) = callee_body.param_local(&slot) {
                        parameter_map.set_local(local.clone(), values);
                    }
                }
            }
        }

        let mut aux = IntraproceduralAnalysis::with_depth(
            self.program,
            self.aliases,
            Arc::clone(&callee_body),
            parameter_map,
            Arc::clone(&self.exclude),
            self.limits,
            self.token.clone(),
            self.aux_depth + 1,
        );
        aux.run()?;

        let mut return_pred: Option<Pred> = None;
        if call.callee.return_type != ValueType::Void {
            let op = if return_identifier.ty().is_string() {
                Operator::StrEq
            } else {
                Operator::Eq
            };
            let identifier_set = ExpressionSet::from_expr(return_identifier);

            for tail in callee_body.return_sites() {
                let Some(InstrKind::Return(ret_op)) =
                    callee_body.instruction(tail).map(|i| &i.kind)
                else {
                    warn!(
                        method = %call.callee.signature(),
                        "value-returning callee has a void return tail"
                    );
                    continue;
                };
                let Some(tail_state) = aux.flow_before(tail).cloned() else {
                    continue;
                };
                let Some(returned) = aux.resolve_operand(ret_op, &tail_state) else {
                    continue;
                };
                let bound =
                    ExpressionSet::combine(op, Some(&identifier_set), Some(&returned))
                        .and_then(|set| set.to_predicate());
                let arm = Predicate::and(tail_state.constraint.clone(), bound);
                return_pred = Predicate::or(return_pred, arm);
            }
        }

        // Drained after tail resolution so reads made while resolving the
        // returns are included.
        for dependence in aux.take_heap_dependencies() {
            self.push_heap_dependence(dependence);
        }
        Ok(return_pred)
    }

    // ═══════════════════════════════════════════════════════════════════
    // Heap bookkeeping
    // ═══════════════════════════════════════════════════════════════════

    fn heap_variable(&self, access: &FieldAccess) -> Variable {
        let signature = self.aliases.alias_sig(access, self.body.method().as_ref());
        Variable::heap(access.field.clone(), signature)
    }

    /// Strong update: an aliasing location already tracked keeps its key and
    /// takes the new values, otherwise the write opens a fresh location
    fn store_heap(&mut self, access: &FieldAccess, values: ExpressionSet, out: &mut DataMap) {
        let location = self.heap_variable(access);
        let existing = out.heap.keys().find(|k| k.aliases(&location)).cloned();
        match existing {
            Some(key) => {
                out.heap.insert(key, values);
            }
            None => {
                out.heap.insert(location, values);
            }
        }
    }

    fn push_heap_dependence(&mut self, variable: Variable) {
        if !self.heap_dependencies.contains(&variable) {
            self.heap_dependencies.push(variable);
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Helpers
// ═══════════════════════════════════════════════════════════════════════

fn predecessors(body: &MethodBody) -> Vec<Vec<InstrId>> {
    let mut preds: Vec<Vec<InstrId>> = vec![Vec::new(); body.len()];
    for id in 0..body.len() {
        for &succ in body.successors(id) {
            if !preds[succ].contains(&id) {
                preds[succ].push(id);
            }
        }
    }
    preds
}

/// Keeps a local when it is live after the instruction or read by it; the
/// current instruction's own uses survive so the state at a target call
/// still binds its arguments
fn prune_dead_locals(body: &MethodBody, instr: &Instruction, out: &mut DataMap) {
    let uses = instr.uses();
    let live = body.live_after(instr.id);
    out.locals
        .retain(|local, _| live.contains(local) || uses.iter().any(|used| *used == local));
}

fn push_out(outs: &mut Vec<(InstrId, DataMap)>, succ: InstrId, out: DataMap) {
    if let Some((_, existing)) = outs.iter_mut().find(|(s, _)| *s == succ) {
        *existing = DataMap::merged(existing, &out);
    } else {
        outs.push((succ, out));
    }
}

fn push_fall(outs: &mut Vec<(InstrId, DataMap)>, body: &MethodBody, id: InstrId, out: DataMap) {
    if id + 1 < body.len() {
        push_out(outs, id + 1, out);
    }
}

fn int_set(value: i64) -> ExpressionSet {
    ExpressionSet::from_expr(Expression::leaf(Variable::int(value)))
}

fn binop_operator(op: BinOp) -> Operator {
    match op {
        BinOp::Add => Operator::Add,
        BinOp::Sub => Operator::Sub,
        BinOp::Mul => Operator::Mul,
        BinOp::Div => Operator::Div,
        BinOp::Rem => Operator::Rem,
        BinOp::And => Operator::BitAnd,
        BinOp::Or => Operator::BitOr,
        BinOp::Xor => Operator::BitXor,
        BinOp::Shl => Operator::Shl,
        BinOp::Shr => Operator::Shr,
        BinOp::Cmp => Operator::Cmp,
        BinOp::Eq => Operator::Eq,
        BinOp::Ne => Operator::Ne,
        BinOp::Lt => Operator::Lt,
        BinOp::Le => Operator::Le,
        BinOp::Gt => Operator::Gt,
        BinOp::Ge => Operator::Ge,
    }
}

fn short_return_symbol(callee: &MethodRef, site: InstrId) -> String {
    format!(
        "Return<{}.{}(){{{}}}>",
        callee.short_class_name(),
        callee.name,
        site
    )
}
