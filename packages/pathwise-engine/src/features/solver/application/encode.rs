//! Predicate-to-script encoding
//!
//! Deterministic walk of a minimized predicate that rewrites it as a
//! solver script. Each distinct symbolic variable gets one fresh
//! identifier on first encounter and reuses it afterwards; constants are
//! inlined as literals. Long formulas show up on exactly the paths that
//! already run close to their time budget, so the walk re-checks
//! cancellation at every recursive step like the dataflow engine does.

use rustc_hash::FxHashMap;
use tracing::error;

use crate::errors::Result;
use crate::features::constraint::domain::{
    Connective, Expression, Operator, Pred, Predicate, Variable,
};
use crate::features::solver::domain::SolverScript;
use crate::shared::cancel::CancelToken;
use crate::shared::models::{ConstValue, ValueType};

/// Encodes one predicate into a [`SolverScript`]
///
/// Single-use: symbol numbering starts at zero per encoder, so distinct
/// events get independently numbered scripts.
pub struct ScriptEncoder {
    token: CancelToken,
    index: FxHashMap<Variable, usize>,
    symbols: Vec<(Variable, ValueType, String)>,
}

impl ScriptEncoder {
    pub fn new(token: CancelToken) -> Self {
        ScriptEncoder {
            token,
            index: FxHashMap::default(),
            symbols: Vec::new(),
        }
    }

    pub fn encode(mut self, constraint: &Pred) -> Result<SolverScript> {
        let mut formula = String::new();
        self.emit_predicate(constraint, &mut formula)?;
        let declarations = self.declarations();
        let symbols = self
            .symbols
            .into_iter()
            .map(|(var, _, name)| (var, name))
            .collect();
        Ok(SolverScript::new(declarations, formula, symbols))
    }

    fn emit_predicate(&mut self, pred: &Predicate, out: &mut String) -> Result<()> {
        self.token.check("solver encoding")?;
        match pred {
            Predicate::Expr(expr) => self.emit_expression(expr, out)?,
            Predicate::Not(child) => {
                out.push_str("Not(");
                self.emit_predicate(child, out)?;
                out.push(')');
            }
            Predicate::Binary { op, left, right } => {
                out.push_str(match op {
                    Connective::And => "And(",
                    Connective::Or => "Or(",
                });
                self.emit_predicate(left, out)?;
                out.push_str(", ");
                self.emit_predicate(right, out)?;
                out.push(')');
            }
        }
        Ok(())
    }

    fn emit_expression(&mut self, expr: &Expression, out: &mut String) -> Result<()> {
        self.token.check("solver encoding")?;
        match expr {
            Expression::Leaf { var, cast } => match var.as_constant() {
                Some(value) => push_literal(value, out),
                None => {
                    let declared = cast.clone().unwrap_or_else(|| var.ty());
                    let name = self.symbol_for(var, declared);
                    out.push_str(&name);
                }
            },
            Expression::Arithmetic { op, left, right } => {
                out.push('(');
                self.emit_expression(left, out)?;
                out.push(' ');
                match infix_symbol(*op) {
                    Some(sym) => out.push_str(sym),
                    None => {
                        error!(op = %op, "operator has no solver rendering");
                        out.push_str(&op.to_string());
                    }
                }
                out.push(' ');
                self.emit_expression(right, out)?;
                out.push(')');
            }
            Expression::Str { op, left, right } => match op {
                Operator::StrNe => {
                    out.push_str("Not(Contains(");
                    self.emit_expression(left, out)?;
                    out.push_str(", ");
                    self.emit_expression(right, out)?;
                    out.push_str("))");
                }
                Operator::Length => {
                    out.push_str("Length(");
                    self.emit_expression(left, out)?;
                    out.push(')');
                }
                _ => {
                    let name = match op {
                        Operator::StrEq | Operator::Contains => "Contains",
                        Operator::IndexOf => "IndexOf",
                        Operator::PrefixOf => "PrefixOf",
                        Operator::SuffixOf => "SuffixOf",
                        Operator::Append => "Concat",
                        other => {
                            error!(op = %other, "operator has no solver rendering");
                            "Contains"
                        }
                    };
                    out.push_str(name);
                    out.push('(');
                    self.emit_expression(left, out)?;
                    out.push_str(", ");
                    self.emit_expression(right, out)?;
                    out.push(')');
                }
            },
        }
        Ok(())
    }

    fn symbol_for(&mut self, var: &Variable, declared: ValueType) -> String {
        if let Some(&i) = self.index.get(var) {
            return self.symbols[i].2.clone();
        }
        let name = format!("pv{}", self.symbols.len());
        self.index.insert(var.clone(), self.symbols.len());
        self.symbols.push((var.clone(), declared, name.clone()));
        name
    }

    fn declarations(&self) -> String {
        let mut out = String::new();
        for (var, ty, name) in &self.symbols {
            out.push_str(name);
            out.push_str(" = ");
            out.push_str(&sort_constructor(name, ty));
            out.push_str("    # ");
            out.push_str(&var.to_string());
            out.push('\n');
        }
        out
    }
}

/// Declaration expression for one symbol, sorted by its semantic type
fn sort_constructor(name: &str, ty: &ValueType) -> String {
    match ty {
        ValueType::Boolean => format!("BitVec('{}', 1)", name),
        ValueType::Byte => format!("BitVec('{}', 8)", name),
        ValueType::Char | ValueType::Short => format!("BitVec('{}', 16)", name),
        ValueType::Int => format!("BitVec('{}', 32)", name),
        ValueType::Long => format!("BitVec('{}', 64)", name),
        ValueType::Float | ValueType::Double => format!("Real('{}')", name),
        ValueType::Reference(_) if ty.is_string() => format!("String('{}')", name),
        // Object identities have no solver theory; a fixed-width stand-in
        // still lets equality and null checks participate
        ValueType::Reference(_) | ValueType::Array(_) | ValueType::Null | ValueType::Void => {
            format!("BitVec('{}', 32)", name)
        }
    }
}

fn push_literal(value: &ConstValue, out: &mut String) {
    match value {
        ConstValue::Bool(b) => out.push(if *b { '1' } else { '0' }),
        // Null references share the zero placeholder of the object encoding
        ConstValue::Null => out.push('0'),
        other => out.push_str(&other.to_string()),
    }
}

fn infix_symbol(op: Operator) -> Option<&'static str> {
    match op {
        Operator::Add => Some("+"),
        Operator::Sub => Some("-"),
        Operator::Mul => Some("*"),
        Operator::Div => Some("/"),
        Operator::Rem => Some("%"),
        Operator::Gt => Some(">"),
        Operator::Ge => Some(">="),
        Operator::Lt => Some("<"),
        Operator::Le => Some("<="),
        Operator::Eq => Some("=="),
        Operator::Ne => Some("!="),
        Operator::BitAnd => Some("&"),
        Operator::BitOr => Some("|"),
        Operator::BitXor => Some("^"),
        Operator::Shl => Some("<<"),
        Operator::Shr => Some(">>"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::features::constraint::domain::Pred;
    use crate::shared::models::{AliasSig, FieldRef};

    fn encoder() -> ScriptEncoder {
        ScriptEncoder::new(CancelToken::unbounded())
    }

    fn cmp(op: Operator, left: Variable, right: Variable) -> Pred {
        Predicate::expr(
            Expression::combine(
                op,
                Some(Expression::leaf(left)),
                Some(Expression::leaf(right)),
            )
            .unwrap(),
        )
    }

    #[test]
    fn repeated_variables_share_one_symbol() {
        let x = Variable::input(1, 0xd, ValueType::Int);
        let pred = Predicate::and(
            Some(cmp(Operator::Eq, x.clone(), Variable::int(5))),
            Some(cmp(Operator::Ne, x, Variable::int(9))),
        )
        .unwrap();

        let script = encoder().encode(&pred).unwrap();
        assert_eq!(script.formula(), "And((pv0 == 5), (pv0 != 9))");
        assert_eq!(script.symbols().len(), 1);
        assert_eq!(
            script.declarations(),
            "pv0 = BitVec('pv0', 32)    # <Input1>d\n"
        );
    }

    #[test]
    fn boolean_constants_inline_as_bits() {
        let flag = Variable::input(2, 1, ValueType::Boolean);
        let pred = cmp(Operator::Eq, flag, Variable::boolean(true));

        let script = encoder().encode(&pred).unwrap();
        assert_eq!(script.formula(), "(pv0 == 1)");
        assert!(script.declarations().contains("BitVec('pv0', 1)"));
    }

    #[test]
    fn string_disequality_encodes_as_negated_containment() {
        let cmd = Variable::input(1, 3, ValueType::string());
        let pred = cmp(Operator::StrNe, cmd, Variable::string("secret"));

        let script = encoder().encode(&pred).unwrap();
        assert_eq!(script.formula(), "Not(Contains(pv0, \"secret\"))");
        assert!(script.declarations().contains("String('pv0')"));
    }

    #[test]
    fn negation_and_disjunction_render_in_prefix_form() {
        let x = Variable::input(1, 4, ValueType::Int);
        let pred = Predicate::or(
            Predicate::not(Some(cmp(Operator::Eq, x.clone(), Variable::int(1)))),
            Some(cmp(Operator::Gt, x, Variable::int(7))),
        )
        .unwrap();

        let script = encoder().encode(&pred).unwrap();
        assert_eq!(script.formula(), "Or(Not((pv0 == 1)), (pv0 > 7))");
    }

    #[test]
    fn declaration_sorts_follow_variable_types() {
        let pred = Predicate::and(
            Some(cmp(
                Operator::Eq,
                Variable::input(1, 5, ValueType::Long),
                Variable::int(0),
            )),
            Predicate::and(
                Some(cmp(
                    Operator::Gt,
                    Variable::input(2, 5, ValueType::Double),
                    Variable::int(0),
                )),
                Some(cmp(
                    Operator::Ne,
                    Variable::input(3, 5, ValueType::reference("android.content.Intent")),
                    Variable::null(),
                )),
            ),
        )
        .unwrap();

        let script = encoder().encode(&pred).unwrap();
        assert!(script.declarations().contains("BitVec('pv0', 64)"));
        assert!(script.declarations().contains("Real('pv1')"));
        assert!(script.declarations().contains("BitVec('pv2', 32)"));
        assert_eq!(script.formula(), "And((pv0 == 0), And((pv1 > 0), (pv2 != 0)))");
    }

    #[test]
    fn heap_symbols_stay_out_of_the_surfaced_table() {
        let field = FieldRef::new("com.app.Store", "flag", ValueType::Int);
        let heap = Variable::heap(field, AliasSig::new([3]));
        let input = Variable::input(1, 6, ValueType::Int);
        let pred = Predicate::and(
            Some(cmp(Operator::Eq, heap, Variable::int(1))),
            Some(cmp(Operator::Eq, input, Variable::int(2))),
        )
        .unwrap();

        let script = encoder().encode(&pred).unwrap();
        assert_eq!(script.symbols().len(), 2);
        let surfaced: Vec<&str> = script.surfaced_symbols().map(|(_, name)| name).collect();
        assert_eq!(surfaced, vec!["pv1"]);
    }

    #[test]
    fn full_script_wraps_the_formula_in_an_assertion() {
        let x = Variable::input(1, 7, ValueType::Int);
        let script = encoder()
            .encode(&cmp(Operator::Eq, x, Variable::int(4)))
            .unwrap();

        let code = script.code();
        assert!(code.starts_with("pv0 = BitVec('pv0', 32)"));
        assert!(code.ends_with("s.add((pv0 == 4))\n\n"));
    }

    #[test]
    fn expired_deadline_interrupts_encoding() {
        let token = CancelToken::with_timeout(Duration::from_secs(0));
        let x = Variable::input(1, 8, ValueType::Int);
        let err = ScriptEncoder::new(token)
            .encode(&cmp(Operator::Eq, x, Variable::int(4)))
            .unwrap_err();
        assert!(err.is_timeout());
    }
}
