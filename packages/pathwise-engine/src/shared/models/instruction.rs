//! Instruction model
//!
//! A closed classification of the statement kinds the engine interprets,
//! with operands exposed as small expression trees. Anything the analyzed
//! program does beyond these kinds must be surfaced by the provider as the
//! closest matching kind (or `Nop` when it has no dataflow effect).

use std::fmt;

use super::method::{FieldRef, Local, MethodRef, ParamSlot};
use super::types::{ConstValue, ValueType};

/// Index of an instruction within its method body
pub type InstrId = usize;

/// A value operand: a local read or an inline constant
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operand {
    Local(Local),
    Const(ConstValue),
}

impl Operand {
    pub fn local(name: impl Into<String>) -> Self {
        Operand::Local(Local::new(name))
    }

    pub fn int(n: i64) -> Self {
        Operand::Const(ConstValue::Int(n))
    }

    pub fn string(s: impl Into<String>) -> Self {
        Operand::Const(ConstValue::Str(s.into()))
    }

    pub fn null() -> Self {
        Operand::Const(ConstValue::Null)
    }

    pub fn as_local(&self) -> Option<&Local> {
        match self {
            Operand::Local(l) => Some(l),
            Operand::Const(_) => None,
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Local(l) => write!(f, "{}", l),
            Operand::Const(c) => write!(f, "{}", c),
        }
    }
}

/// Field access site; `base` is absent for static fields
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldAccess {
    pub base: Option<Local>,
    pub field: FieldRef,
}

impl FieldAccess {
    pub fn instance(base: impl Into<String>, field: FieldRef) -> Self {
        Self {
            base: Some(Local::new(base)),
            field,
        }
    }

    pub fn statik(field: FieldRef) -> Self {
        Self { base: None, field }
    }
}

impl fmt::Display for FieldAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.base {
            Some(base) => write!(f, "{}.{}", base, self.field.signature()),
            None => write!(f, "{}", self.field.signature()),
        }
    }
}

/// Binary operators, arithmetic and relational
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    /// Three-way comparison (cmp/cmpl/cmpg), later unwrapped when the result
    /// feeds a relational branch
    Cmp,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinOp {
    pub fn is_relational(&self) -> bool {
        matches!(
            self,
            BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge
        )
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Rem => "%",
            BinOp::And => "&",
            BinOp::Or => "|",
            BinOp::Xor => "^",
            BinOp::Shl => "<<",
            BinOp::Shr => ">>",
            BinOp::Cmp => "cmp",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
        };
        write!(f, "{}", s)
    }
}

/// Branch condition of an `If` instruction; the operator is relational
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CondExpr {
    pub op: BinOp,
    pub left: Operand,
    pub right: Operand,
}

impl CondExpr {
    pub fn new(op: BinOp, left: Operand, right: Operand) -> Self {
        debug_assert!(op.is_relational());
        Self { op, left, right }
    }
}

impl fmt::Display for CondExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.left, self.op, self.right)
    }
}

/// Dispatch form of a call site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvokeKind {
    /// Static dispatch, no receiver
    Static,
    /// Any receiver-carrying dispatch (virtual, interface, direct)
    Instance,
}

/// A resolved call site
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Call {
    pub callee: MethodRef,
    pub kind: InvokeKind,
    pub receiver: Option<Operand>,
    pub args: Vec<Operand>,
}

impl Call {
    pub fn statik(callee: MethodRef, args: Vec<Operand>) -> Self {
        Self {
            callee,
            kind: InvokeKind::Static,
            receiver: None,
            args,
        }
    }

    pub fn instance(callee: MethodRef, receiver: Operand, args: Vec<Operand>) -> Self {
        Self {
            callee,
            kind: InvokeKind::Instance,
            receiver: Some(receiver),
            args,
        }
    }
}

impl fmt::Display for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args: Vec<String> = self.args.iter().map(|a| a.to_string()).collect();
        match &self.receiver {
            Some(recv) => write!(
                f,
                "{}.{}({})",
                recv,
                self.callee.signature(),
                args.join(", ")
            ),
            None => write!(f, "{}({})", self.callee.signature(), args.join(", ")),
        }
    }
}

/// Right-hand side of an assignment
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RValue {
    /// Plain copy of an operand
    Use(Operand),
    /// Arithmetic negation
    Neg(Operand),
    Binary {
        op: BinOp,
        left: Operand,
        right: Operand,
    },
    FieldLoad(FieldAccess),
    ArrayLoad {
        base: Operand,
        index: Operand,
    },
    Invoke(Call),
    /// Allocation; string-typed allocations resolve to the empty string
    New {
        ty: ValueType,
    },
    Cast {
        ty: ValueType,
        value: Operand,
    },
    InstanceOf {
        class: String,
        value: Operand,
    },
    /// Array or string length
    Length(Operand),
    /// SSA-style merge of reaching definitions
    Phi(Vec<Operand>),
}

impl fmt::Display for RValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RValue::Use(op) => write!(f, "{}", op),
            RValue::Neg(op) => write!(f, "-{}", op),
            RValue::Binary { op, left, right } => write!(f, "{} {} {}", left, op, right),
            RValue::FieldLoad(fa) => write!(f, "{}", fa),
            RValue::ArrayLoad { base, index } => write!(f, "{}[{}]", base, index),
            RValue::Invoke(call) => write!(f, "{}", call),
            RValue::New { ty } => write!(f, "new {}", ty),
            RValue::Cast { ty, value } => write!(f, "({}) {}", ty, value),
            RValue::InstanceOf { class, value } => write!(f, "{} instanceof {}", value, class),
            RValue::Length(op) => write!(f, "lengthof {}", op),
            RValue::Phi(ops) => {
                let parts: Vec<String> = ops.iter().map(|o| o.to_string()).collect();
                write!(f, "phi({})", parts.join(", "))
            }
        }
    }
}

/// Left-hand side of an assignment
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LValue {
    Local(Local),
    Field(FieldAccess),
    ArrayElem { base: Operand, index: Operand },
}

impl fmt::Display for LValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LValue::Local(l) => write!(f, "{}", l),
            LValue::Field(fa) => write!(f, "{}", fa),
            LValue::ArrayElem { base, index } => write!(f, "{}[{}]", base, index),
        }
    }
}

/// Statement kinds the engine interprets
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InstrKind {
    Assign {
        lhs: LValue,
        rhs: RValue,
    },
    /// Call for effect only
    Invoke(Call),
    /// Entry binding of a receiver, parameter or caught exception
    Identity {
        local: Local,
        slot: ParamSlot,
        ty: ValueType,
    },
    If {
        cond: CondExpr,
        target: InstrId,
    },
    Goto {
        target: InstrId,
    },
    LookupSwitch {
        key: Operand,
        cases: Vec<(i64, InstrId)>,
        default: InstrId,
    },
    TableSwitch {
        key: Operand,
        low: i64,
        high: i64,
        targets: Vec<InstrId>,
        default: InstrId,
    },
    Return(Operand),
    ReturnVoid,
    Throw(Operand),
    MonitorEnter(Operand),
    MonitorExit(Operand),
    Nop,
}

/// One instruction at a fixed position in a method body
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Instruction {
    pub id: InstrId,
    pub kind: InstrKind,
}

impl Instruction {
    pub fn new(id: InstrId, kind: InstrKind) -> Self {
        Self { id, kind }
    }

    /// The local defined here, if any (at most one per instruction)
    pub fn def(&self) -> Option<&Local> {
        match &self.kind {
            InstrKind::Assign {
                lhs: LValue::Local(l),
                ..
            } => Some(l),
            InstrKind::Identity { local, .. } => Some(local),
            _ => None,
        }
    }

    /// All locals read by this instruction
    pub fn uses(&self) -> Vec<&Local> {
        fn push<'a>(out: &mut Vec<&'a Local>, op: &'a Operand) {
            if let Operand::Local(l) = op {
                out.push(l);
            }
        }
        fn push_call<'a>(out: &mut Vec<&'a Local>, call: &'a Call) {
            if let Some(recv) = &call.receiver {
                push(out, recv);
            }
            for arg in &call.args {
                push(out, arg);
            }
        }

        let mut out = Vec::new();
        match &self.kind {
            InstrKind::Assign { lhs, rhs } => {
                match lhs {
                    LValue::Local(_) => {}
                    LValue::Field(fa) => {
                        if let Some(base) = &fa.base {
                            out.push(base);
                        }
                    }
                    LValue::ArrayElem { base, index } => {
                        push(&mut out, base);
                        push(&mut out, index);
                    }
                }
                match rhs {
                    RValue::Use(op) | RValue::Neg(op) | RValue::Length(op) => push(&mut out, op),
                    RValue::Binary { left, right, .. } => {
                        push(&mut out, left);
                        push(&mut out, right);
                    }
                    RValue::FieldLoad(fa) => {
                        if let Some(base) = &fa.base {
                            out.push(base);
                        }
                    }
                    RValue::ArrayLoad { base, index } => {
                        push(&mut out, base);
                        push(&mut out, index);
                    }
                    RValue::Invoke(call) => push_call(&mut out, call),
                    RValue::Cast { value, .. } | RValue::InstanceOf { value, .. } => {
                        push(&mut out, value)
                    }
                    RValue::New { .. } => {}
                    RValue::Phi(ops) => {
                        for op in ops {
                            push(&mut out, op);
                        }
                    }
                }
            }
            InstrKind::Invoke(call) => push_call(&mut out, call),
            InstrKind::If { cond, .. } => {
                push(&mut out, &cond.left);
                push(&mut out, &cond.right);
            }
            InstrKind::LookupSwitch { key, .. } | InstrKind::TableSwitch { key, .. } => {
                push(&mut out, key)
            }
            InstrKind::Return(op)
            | InstrKind::Throw(op)
            | InstrKind::MonitorEnter(op)
            | InstrKind::MonitorExit(op) => push(&mut out, op),
            InstrKind::Identity { .. }
            | InstrKind::Goto { .. }
            | InstrKind::ReturnVoid
            | InstrKind::Nop => {}
        }
        out
    }

    /// The call site, for both assignment-result and effect-only calls
    pub fn call(&self) -> Option<&Call> {
        match &self.kind {
            InstrKind::Invoke(call)
            | InstrKind::Assign {
                rhs: RValue::Invoke(call),
                ..
            } => Some(call),
            _ => None,
        }
    }

    /// True if control can fall through to the next instruction
    pub fn falls_through(&self) -> bool {
        !matches!(
            self.kind,
            InstrKind::Goto { .. }
                | InstrKind::Return(_)
                | InstrKind::ReturnVoid
                | InstrKind::Throw(_)
                | InstrKind::LookupSwitch { .. }
                | InstrKind::TableSwitch { .. }
        )
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            InstrKind::Assign { lhs, rhs } => write!(f, "{} = {}", lhs, rhs),
            InstrKind::Invoke(call) => write!(f, "{}", call),
            InstrKind::Identity { local, slot, .. } => match slot {
                ParamSlot::This => write!(f, "{} := @this", local),
                ParamSlot::Arg(n) => write!(f, "{} := @parameter{}", local, n),
                ParamSlot::CaughtException => write!(f, "{} := @caughtexception", local),
            },
            InstrKind::If { cond, target } => write!(f, "if {} goto {}", cond, target),
            InstrKind::Goto { target } => write!(f, "goto {}", target),
            InstrKind::LookupSwitch { key, .. } => write!(f, "lookupswitch({})", key),
            InstrKind::TableSwitch { key, .. } => write!(f, "tableswitch({})", key),
            InstrKind::Return(op) => write!(f, "return {}", op),
            InstrKind::ReturnVoid => write!(f, "return"),
            InstrKind::Throw(op) => write!(f, "throw {}", op),
            InstrKind::MonitorEnter(op) => write!(f, "entermonitor {}", op),
            InstrKind::MonitorExit(op) => write!(f, "exitmonitor {}", op),
            InstrKind::Nop => write!(f, "nop"),
        }
    }
}
