//! Shared models
//!
//! The program representation the engine analyzes. Providers construct these
//! values; the engine only reads them.

mod alias;
mod body;
mod instruction;
mod method;
mod types;

pub use alias::AliasSig;
pub use body::MethodBody;
pub use instruction::{
    BinOp, Call, CondExpr, FieldAccess, InstrId, InstrKind, Instruction, InvokeKind, LValue,
    Operand, RValue,
};
pub use method::{FieldRef, Local, MethodRef, ParamSlot};
pub use types::{ConstValue, ValueType};
