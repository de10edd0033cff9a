//! Encoded solver scripts
//!
//! The encoder's output: declaration lines for every symbol the formula
//! mentions, the formula itself, and the symbol table that maps solver
//! identifiers back to the variables they stand for. Reports surface the
//! non-heap part of that table so a downstream harness can tell which
//! identifiers it is allowed to drive.

use crate::features::constraint::domain::Variable;

/// A self-contained constraint script plus its symbol table
#[derive(Debug, Clone)]
pub struct SolverScript {
    declarations: String,
    formula: String,
    symbols: Vec<(Variable, String)>,
}

impl SolverScript {
    pub(crate) fn new(
        declarations: String,
        formula: String,
        symbols: Vec<(Variable, String)>,
    ) -> Self {
        SolverScript {
            declarations,
            formula,
            symbols,
        }
    }

    /// Declaration lines, one per symbol, in first-encounter order
    pub fn declarations(&self) -> &str {
        &self.declarations
    }

    /// The assertion body without declarations
    pub fn formula(&self) -> &str {
        &self.formula
    }

    /// Full script text: declarations followed by the assertion, ready to
    /// append to a harness that provides the solver object `s`
    pub fn code(&self) -> String {
        let mut code = String::with_capacity(self.declarations.len() + self.formula.len() + 16);
        code.push_str(&self.declarations);
        code.push('\n');
        code.push_str("s.add(");
        code.push_str(&self.formula);
        code.push_str(")\n\n");
        code
    }

    /// Every encoded symbol with its solver identifier
    pub fn symbols(&self) -> &[(Variable, String)] {
        &self.symbols
    }

    /// Symbols a harness can control: everything except heap locations,
    /// whose values come from supporting events rather than direct input
    pub fn surfaced_symbols(&self) -> impl Iterator<Item = (&Variable, &str)> {
        self.symbols
            .iter()
            .filter(|(var, _)| !var.is_heap())
            .map(|(var, name)| (var, name.as_str()))
    }
}
