use core::fmt;

use crate::expr::Value;
use crate::loc::Loc;

/// Assignment operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    /// `=` defers expansion of the right-hand side to every read.
    Eq,
    /// `:=` expands the right-hand side once, at assignment.
    ColonEq,
    /// `+=` appends, with flavor taken from the existing binding.
    PlusEq,
    /// `?=` assigns only when the variable is undefined or empty.
    QuestionEq,
}

impl fmt::Display for AssignOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AssignOp::Eq => "=",
            AssignOp::ColonEq => ":=",
            AssignOp::PlusEq => "+=",
            AssignOp::QuestionEq => "?=",
        };
        write!(f, "{}", s)
    }
}

/// Modifiers that may prefix an assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AssignDirective {
    pub is_override: bool,
    pub export: bool,
}

/// Conditional directive kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CondOp {
    Ifeq,
    Ifneq,
    Ifdef,
    Ifndef,
}

/// What separated the left-hand side of a rule line from the rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleSep {
    /// Plain `targets: prereqs`.
    Null,
    /// `targets: prereqs ; first-command`.
    Semicolon,
    /// Target-specific variable: `target: VAR = value`.
    Eq,
    /// Target-specific final variable: `target: VAR $= value`.
    FinalEq,
}

/// One parsed makefile statement. Evaluation order is the statement order;
/// conditionals carry both branches unevaluated.
#[derive(Debug, Clone)]
pub enum Stmt {
    Rule {
        loc: Loc,
        lhs: Value,
        sep: RuleSep,
        rhs: Option<Value>,
    },
    Assign {
        loc: Loc,
        lhs: Value,
        rhs: Value,
        orig_rhs: String,
        op: AssignOp,
        directive: AssignDirective,
        is_final: bool,
    },
    Command {
        loc: Loc,
        expr: Value,
    },
    If {
        loc: Loc,
        op: CondOp,
        lhs: Value,
        rhs: Option<Value>,
        true_stmts: Vec<Stmt>,
        false_stmts: Vec<Stmt>,
    },
    Include {
        loc: Loc,
        expr: Value,
        must_exist: bool,
    },
    Export {
        loc: Loc,
        expr: Value,
        is_export: bool,
    },
    /// A line the parser could not understand. Parsing continues past it;
    /// the stored message is raised if the statement is ever evaluated.
    ParseError { loc: Loc, msg: String },
}

impl Stmt {
    pub fn loc(&self) -> &Loc {
        match self {
            Stmt::Rule { loc, .. }
            | Stmt::Assign { loc, .. }
            | Stmt::Command { loc, .. }
            | Stmt::If { loc, .. }
            | Stmt::Include { loc, .. }
            | Stmt::Export { loc, .. }
            | Stmt::ParseError { loc, .. } => loc,
        }
    }
}
