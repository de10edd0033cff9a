//! Expression trees over symbolic variables
//!
//! ## Architecture
//!
//! ```text
//! Expression ──┬── Leaf(Variable)
//!              ├── Arithmetic { op, left, right }   numeric and relational
//!              └── Str { op, left, right }          string-theory terms
//! ```
//!
//! Expressions are immutable and shared through `Arc`, so branch duplication
//! during path analysis copies pointers, never trees. All construction funnels
//! through [`Expression::combine`], which applies the translation fixups the
//! source form requires: three-way compares collapse into the enclosing
//! relation, comparisons that mix string and convertible operands move into
//! the string theory as null-emptiness checks, and integer constants standing
//! in boolean positions become proper booleans.
//!
//! The equivalence, implication, and opposition relations are deliberately
//! shallow. They recognize exactly the shapes the redundancy passes need
//! (simple `var op var` comparisons) and answer `false` elsewhere, which
//! keeps them sound for pruning: a missed relation costs precision, never
//! correctness.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;

use super::variable::Variable;
use crate::shared::models::{ConstValue, ValueType};

/// Shared handle to an immutable expression node
pub type Expr = Arc<Expression>;

// ═══════════════════════════════════════════════════════════════════════
// Operators
// ═══════════════════════════════════════════════════════════════════════

/// Binary operator of an expression node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Gt,
    Ge,
    Lt,
    Le,
    Eq,
    Ne,
    BitAnd,
    BitOr,
    BitXor,
    /// Three-way compare, folded away by [`Expression::combine`] when the
    /// surrounding relation is known
    Cmp,
    Shl,
    Shr,
    StrEq,
    StrNe,
    Append,
    Contains,
    Length,
    IndexOf,
    PrefixOf,
    SuffixOf,
}

impl Operator {
    /// Relations satisfied by equal operands
    pub fn admits_equality(self) -> bool {
        matches!(self, Operator::Eq | Operator::Ge | Operator::Le)
    }

    /// Relations satisfied only by distinct operands
    pub fn requires_inequality(self) -> bool {
        matches!(self, Operator::Ne | Operator::Gt | Operator::Lt)
    }

    pub fn is_bitwise(self) -> bool {
        matches!(
            self,
            Operator::BitAnd
                | Operator::BitOr
                | Operator::BitXor
                | Operator::Cmp
                | Operator::Shl
                | Operator::Shr
        )
    }

    pub fn is_string(self) -> bool {
        matches!(
            self,
            Operator::StrEq
                | Operator::StrNe
                | Operator::Append
                | Operator::Contains
                | Operator::Length
                | Operator::IndexOf
                | Operator::PrefixOf
                | Operator::SuffixOf
        )
    }

    /// The relation true exactly when `self` is false, where one exists
    pub fn opposite(self) -> Option<Operator> {
        match self {
            Operator::Eq => Some(Operator::Ne),
            Operator::Ne => Some(Operator::Eq),
            Operator::Gt => Some(Operator::Le),
            Operator::Ge => Some(Operator::Lt),
            Operator::Lt => Some(Operator::Ge),
            Operator::Le => Some(Operator::Gt),
            _ => None,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Operator::Add => "+",
            Operator::Sub => "-",
            Operator::Mul => "*",
            Operator::Div => "/",
            Operator::Rem => "%",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Eq => "==",
            Operator::Ne => "!=",
            Operator::BitAnd => "&",
            Operator::BitOr => "|",
            Operator::BitXor => "^",
            Operator::Cmp => "cmp",
            Operator::Shl => "<<",
            Operator::Shr => ">>",
            Operator::Append => "str.++",
            Operator::StrEq => "=",
            Operator::StrNe => "!=",
            Operator::Contains => "contains",
            Operator::Length => "len",
            Operator::IndexOf => "indexof",
            Operator::PrefixOf => "prefixof",
            Operator::SuffixOf => "suffixof",
        };
        write!(f, "{}", text)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Expression nodes
// ═══════════════════════════════════════════════════════════════════════

/// Immutable expression over [`Variable`] leaves
///
/// A leaf may carry a cast-imposed type override. The override steers type
/// driven normalization and solver sorts but is not part of the leaf's
/// identity: a cast does not create a second variable.
#[derive(Debug, Clone)]
pub enum Expression {
    /// A single variable or constant
    Leaf {
        var: Variable,
        cast: Option<ValueType>,
    },
    /// Numeric, bitwise, or relational combination
    Arithmetic {
        op: Operator,
        left: Expr,
        right: Expr,
    },
    /// String-theory combination (always string-typed)
    Str {
        op: Operator,
        left: Expr,
        right: Expr,
    },
}

static TRUE: Lazy<Expr> = Lazy::new(|| Expression::leaf(Variable::boolean(true)));
static FALSE: Lazy<Expr> = Lazy::new(|| Expression::leaf(Variable::boolean(false)));
static EMPTY_STRING: Lazy<Expr> = Lazy::new(|| Expression::leaf(Variable::string("")));
static NULL: Lazy<Expr> = Lazy::new(|| Expression::leaf(Variable::null()));

impl Expression {
    pub fn leaf(variable: Variable) -> Expr {
        Arc::new(Expression::Leaf {
            var: variable,
            cast: None,
        })
    }

    /// Leaf viewed at a cast-imposed type, same identity as the uncast leaf
    pub fn cast_leaf(variable: Variable, ty: ValueType) -> Expr {
        Arc::new(Expression::Leaf {
            var: variable,
            cast: Some(ty),
        })
    }

    pub fn bool_true() -> Expr {
        TRUE.clone()
    }

    pub fn bool_false() -> Expr {
        FALSE.clone()
    }

    pub fn empty_string() -> Expr {
        EMPTY_STRING.clone()
    }

    pub fn null() -> Expr {
        NULL.clone()
    }

    /// Combines two optional operands under `op`, absorbing missing sides
    /// and normalizing the result
    ///
    /// Normalizations, in order:
    /// - a three-way compare on the left replaces both operands, so the
    ///   enclosing relation applies directly to the compared values
    /// - a comparison between a string and a convertible non-string becomes
    ///   a string-theory emptiness check (`==` to equality with `""`,
    ///   anything else to inequality)
    /// - an integer constant compared against a boolean becomes the boolean
    ///   constant it encodes
    pub fn combine(mut op: Operator, mut left: Option<Expr>, mut right: Option<Expr>) -> Option<Expr> {
        if let Some(l) = left.as_deref() {
            if let Expression::Arithmetic {
                op: Operator::Cmp,
                left: cmp_left,
                right: cmp_right,
            } = l
            {
                let (cl, cr) = (cmp_left.clone(), cmp_right.clone());
                left = Some(cl);
                right = Some(cr);
            }
        }

        let (mut left, mut right) = match (left, right) {
            (None, None) => return None,
            (None, Some(r)) => return Some(r),
            (Some(l), None) => return Some(l),
            (Some(l), Some(r)) => (l, r),
        };

        let left_ty = left.ty();
        let right_ty = right.ty();
        if left_ty.is_string() && !right_ty.is_string() && right_ty.converts_to_string() {
            op = if op == Operator::Eq {
                Operator::StrEq
            } else {
                Operator::StrNe
            };
            right = Expression::empty_string();
        } else if !left_ty.is_string() && right_ty.is_string() && left_ty.converts_to_string() {
            op = if op == Operator::Eq {
                Operator::StrEq
            } else {
                Operator::StrNe
            };
            left = Expression::empty_string();
        }

        if op.is_string() {
            return Some(Arc::new(Expression::Str { op, left, right }));
        }

        // Source-level booleans reach comparisons as int constants
        if left.ty().is_boolean() {
            if let Some(n) = right.as_int_constant() {
                right = if n == 1 {
                    Expression::bool_true()
                } else {
                    Expression::bool_false()
                };
            }
        }
        if right.ty().is_boolean() {
            if let Some(n) = left.as_int_constant() {
                left = if n == 1 {
                    Expression::bool_true()
                } else {
                    Expression::bool_false()
                };
            }
        }

        Some(Arc::new(Expression::Arithmetic { op, left, right }))
    }

    // ═══════════════════════════════════════════════════════════════════
    // Shape queries
    // ═══════════════════════════════════════════════════════════════════

    pub fn is_leaf(&self) -> bool {
        matches!(self, Expression::Leaf { .. })
    }

    pub fn variable(&self) -> Option<&Variable> {
        match self {
            Expression::Leaf { var, .. } => Some(var),
            _ => None,
        }
    }

    pub fn as_int_constant(&self) -> Option<i64> {
        self.variable()
            .and_then(Variable::as_constant)
            .and_then(ConstValue::as_int)
    }

    pub fn operator(&self) -> Option<Operator> {
        match self {
            Expression::Leaf { .. } => None,
            Expression::Arithmetic { op, .. } | Expression::Str { op, .. } => Some(*op),
        }
    }

    pub fn operands(&self) -> Option<(&Expr, &Expr)> {
        match self {
            Expression::Leaf { .. } => None,
            Expression::Arithmetic { left, right, .. } | Expression::Str { left, right, .. } => {
                Some((left, right))
            }
        }
    }

    /// An arithmetic comparison of two plain variables
    pub fn is_simple(&self) -> bool {
        match self {
            Expression::Arithmetic { left, right, .. } => left.is_leaf() && right.is_leaf(),
            _ => false,
        }
    }

    /// Semantic type of the value; combinations take the left operand's type
    pub fn ty(&self) -> ValueType {
        match self {
            Expression::Leaf { var, cast } => match cast {
                Some(ty) => ty.clone(),
                None => var.ty(),
            },
            Expression::Arithmetic { left, .. } => left.ty(),
            Expression::Str { .. } => ValueType::string(),
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Structure search
    // ═══════════════════════════════════════════════════════════════════

    /// True when `other` occurs as a subexpression of `self`
    pub fn contains(&self, other: &Expression) -> bool {
        if self == other {
            return true;
        }
        match self.operands() {
            Some((left, right)) => left.contains(other) || right.contains(other),
            None => false,
        }
    }

    pub fn depends_on_input(&self) -> bool {
        match self {
            Expression::Leaf { var, .. } => var.depends_on_input(),
            Expression::Arithmetic { left, right, .. } | Expression::Str { left, right, .. } => {
                left.depends_on_input() || right.depends_on_input()
            }
        }
    }

    pub fn depends_on_nth_input(&self, n: usize) -> bool {
        match self {
            Expression::Leaf { var, .. } => var.depends_on_nth_input(n),
            Expression::Arithmetic { left, right, .. } | Expression::Str { left, right, .. } => {
                left.depends_on_nth_input(n) || right.depends_on_nth_input(n)
            }
        }
    }

    /// Appends symbolic variables in first-encounter order, without
    /// duplicates
    pub fn collect_variables(&self, out: &mut Vec<Variable>) {
        match self {
            Expression::Leaf { var, .. } => var.collect_variables(out),
            Expression::Arithmetic { left, right, .. } | Expression::Str { left, right, .. } => {
                left.collect_variables(out);
                right.collect_variables(out);
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Semantic relations
    // ═══════════════════════════════════════════════════════════════════

    /// True when both expressions constrain the same values the same way.
    /// Beyond structural equality this recognizes only simple comparisons:
    /// `==` against `<=`/`>=` over equivalent operands, `!=` against
    /// `<`/`>`, and comparisons of one value against differing constants
    /// whose operators already disagree about equality.
    pub fn is_equivalent_to(&self, other: &Expression) -> bool {
        if self == other {
            return true;
        }
        if !self.is_simple() || !other.is_simple() {
            return false;
        }
        let (Expression::Arithmetic { op, left, right }, Expression::Arithmetic {
            op: other_op,
            left: other_left,
            right: other_right,
        }) = (self, other)
        else {
            return false;
        };

        if left.is_equivalent_to(other_left) && right.is_equivalent_to(other_right) {
            if *op == Operator::Eq && matches!(other_op, Operator::Le | Operator::Ge) {
                return true;
            }
            if *other_op == Operator::Eq && matches!(op, Operator::Le | Operator::Ge) {
                return true;
            }
            if *op == Operator::Ne && matches!(other_op, Operator::Lt | Operator::Gt) {
                return true;
            }
            if *other_op == Operator::Ne && matches!(op, Operator::Lt | Operator::Gt) {
                return true;
            }
        } else if left.is_equivalent_to(other_left)
            && is_constant_leaf(right)
            && is_constant_leaf(other_right)
        {
            if *op == Operator::Eq && other_op.requires_inequality() {
                return true;
            }
            if *op == Operator::Ne && other_op.admits_equality() {
                return true;
            }
        } else if right.is_equivalent_to(other_right)
            && is_constant_leaf(left)
            && is_constant_leaf(other_left)
        {
            if *op == Operator::Eq && other_op.requires_inequality() {
                return true;
            }
            if *op == Operator::Ne && other_op.admits_equality() {
                return true;
            }
        }
        false
    }

    /// True when satisfying `self` necessarily satisfies `other`; only
    /// recognized between equivalent simple comparisons
    pub fn implies(&self, other: &Expression) -> bool {
        if !self.is_equivalent_to(other) {
            return false;
        }
        let (Some(op), Some(other_op)) = (self.operator(), other.operator()) else {
            return false;
        };
        match op {
            Operator::Eq => matches!(other_op, Operator::Le | Operator::Ge | Operator::Eq),
            Operator::Ne => matches!(other_op, Operator::Lt | Operator::Gt | Operator::Ne),
            _ => false,
        }
    }

    /// True when the two expressions cannot hold together: the same simple
    /// comparison under `==` versus an inequality operator, or equality of
    /// one value against two distinct constants
    pub fn is_opposite_of(&self, other: &Expression) -> bool {
        if !self.is_simple() || !other.is_simple() {
            return false;
        }
        let (Expression::Arithmetic { op, left, right }, Expression::Arithmetic {
            op: other_op,
            left: other_left,
            right: other_right,
        }) = (self, other)
        else {
            return false;
        };

        if left == other_left && right == other_right {
            if *op == Operator::Eq && other_op.requires_inequality() {
                return true;
            }
            if *other_op == Operator::Eq && op.requires_inequality() {
                return true;
            }
        } else if left == other_left && is_constant_leaf(right) && is_constant_leaf(other_right) {
            // Distinct constants, both required equal: unsatisfiable pair
            if *op == Operator::Eq && *other_op == Operator::Eq {
                return true;
            }
        }
        false
    }
}

fn is_constant_leaf(expr: &Expression) -> bool {
    expr.variable().is_some_and(Variable::is_constant)
}

impl PartialEq for Expression {
    /// Structural equality, with cast overrides excluded at leaves
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Expression::Leaf { var: a, .. }, Expression::Leaf { var: b, .. }) => a == b,
            (
                Expression::Arithmetic {
                    op: oa,
                    left: la,
                    right: ra,
                },
                Expression::Arithmetic {
                    op: ob,
                    left: lb,
                    right: rb,
                },
            )
            | (
                Expression::Str {
                    op: oa,
                    left: la,
                    right: ra,
                },
                Expression::Str {
                    op: ob,
                    left: lb,
                    right: rb,
                },
            ) => oa == ob && la == lb && ra == rb,
            _ => false,
        }
    }
}

impl Eq for Expression {}

impl std::hash::Hash for Expression {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Expression::Leaf { var, .. } => var.hash(state),
            Expression::Arithmetic { op, left, right } | Expression::Str { op, left, right } => {
                op.hash(state);
                left.hash(state);
                right.hash(state);
            }
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Leaf { var, .. } => write!(f, "{}", var),
            Expression::Arithmetic { op, left, right } | Expression::Str { op, left, right } => {
                write!(f, "({} {} {})", left, op, right)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::ValueType;

    fn int_var(n: usize) -> Expr {
        Expression::leaf(Variable::input(n, 1, ValueType::Int))
    }

    fn int_const(n: i64) -> Expr {
        Expression::leaf(Variable::int(n))
    }

    fn simple(op: Operator, left: Expr, right: Expr) -> Expr {
        Expression::combine(op, Some(left), Some(right)).unwrap()
    }

    #[test]
    fn combine_absorbs_missing_sides() {
        assert!(Expression::combine(Operator::Eq, None, None).is_none());
        let v = int_var(0);
        let kept = Expression::combine(Operator::Eq, Some(v.clone()), None).unwrap();
        assert_eq!(kept, v);
    }

    #[test]
    fn three_way_compare_folds_into_relation() {
        let cmp = simple(Operator::Cmp, int_var(0), int_var(1));
        let folded = Expression::combine(Operator::Ge, Some(cmp), Some(int_const(0))).unwrap();
        assert_eq!(folded.to_string(), "(<Input0>1 >= <Input1>1)");
    }

    #[test]
    fn string_null_check_moves_to_string_theory() {
        let s = Expression::leaf(Variable::input(0, 1, ValueType::string()));
        let eq = Expression::combine(Operator::Eq, Some(s.clone()), Some(int_const(0))).unwrap();
        assert_eq!(eq.to_string(), "(<Input0>1 = \"\")");
        let ne = Expression::combine(Operator::Ne, Some(s), Some(int_const(0))).unwrap();
        assert_eq!(ne.to_string(), "(<Input0>1 != \"\")");
        assert_eq!(ne.ty(), ValueType::string());
    }

    #[test]
    fn int_constant_against_boolean_becomes_boolean() {
        let flag = Expression::leaf(Variable::input(0, 1, ValueType::Boolean));
        let e = Expression::combine(Operator::Eq, Some(flag), Some(int_const(1))).unwrap();
        let (_, right) = e.operands().unwrap();
        assert_eq!(right.variable(), Some(&Variable::boolean(true)));
    }

    #[test]
    fn equality_is_equivalent_to_bounded_orders() {
        let eq = simple(Operator::Eq, int_var(0), int_const(5));
        let le = simple(Operator::Le, int_var(0), int_const(5));
        let lt = simple(Operator::Lt, int_var(0), int_const(5));
        assert!(eq.is_equivalent_to(&le));
        assert!(le.is_equivalent_to(&eq));
        assert!(!eq.is_equivalent_to(&lt));
        assert!(eq.implies(&le));
        assert!(!le.implies(&eq));
    }

    #[test]
    fn differing_constants_under_disagreeing_operators_are_equivalent() {
        let eq_zero = simple(Operator::Eq, int_var(0), int_const(0));
        let ne_one = simple(Operator::Ne, int_var(0), int_const(1));
        assert!(eq_zero.is_equivalent_to(&ne_one));
    }

    #[test]
    fn opposition_on_shared_operands() {
        let eq = simple(Operator::Eq, int_var(0), int_const(5));
        let ne = simple(Operator::Ne, int_var(0), int_const(5));
        let lt = simple(Operator::Lt, int_var(0), int_const(5));
        assert!(eq.is_opposite_of(&ne));
        assert!(ne.is_opposite_of(&eq));
        assert!(eq.is_opposite_of(&lt));
        assert!(!eq.is_opposite_of(&eq));
    }

    #[test]
    fn equality_to_two_constants_is_contradictory() {
        let a = simple(Operator::Eq, int_var(0), int_const(1));
        let b = simple(Operator::Eq, int_var(0), int_const(2));
        assert!(a.is_opposite_of(&b));
        assert!(!a.is_opposite_of(&a));
    }

    #[test]
    fn cast_changes_type_but_not_identity() {
        let raw = Variable::input(0, 1, ValueType::reference("java.lang.Object"));
        let plain = Expression::leaf(raw.clone());
        let as_string = Expression::cast_leaf(raw, ValueType::string());
        assert_eq!(plain, as_string);
        assert_eq!(as_string.ty(), ValueType::string());
        assert_ne!(plain.ty(), as_string.ty());

        // The cast view participates in string normalization
        let check =
            Expression::combine(Operator::Eq, Some(as_string), Some(int_const(0))).unwrap();
        assert_eq!(check.operator(), Some(Operator::StrEq));
    }

    #[test]
    fn deep_expressions_refuse_semantic_relations() {
        let sum = simple(Operator::Add, int_var(0), int_const(1));
        let cmp_a = simple(Operator::Eq, sum.clone(), int_const(3));
        let cmp_b = simple(Operator::Ne, sum, int_const(3));
        assert!(!cmp_a.is_equivalent_to(&cmp_b));
        assert!(!cmp_a.is_opposite_of(&cmp_b));
        assert!(cmp_a.contains(&int_var(0)));
    }
}
