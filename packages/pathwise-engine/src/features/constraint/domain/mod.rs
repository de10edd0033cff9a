//! Constraint algebra: variables, expressions, predicates, and the
//! per-location state they accumulate into

pub mod data_map;
pub mod expression;
pub mod expression_set;
pub mod minimize;
pub mod predicate;
pub mod variable;

pub use data_map::DataMap;
pub use expression::{Expr, Expression, Operator};
pub use expression_set::ExpressionSet;
pub use minimize::minimize;
pub use predicate::{Connective, Pred, Predicate};
pub use variable::{StoreKind, Variable};
