//! Rule records and the parsing of expanded rule lines.
//!
//! By the time a rule line reaches this module every `$(...)` in the
//! target/prerequisite part has been expanded; what is left is plain word
//! splitting around `:`, `::`, and `|`, plus classification of
//! target-specific variable lines.

use crate::ast::{AssignOp, RuleSep};
use crate::error::{EvalError, EvalResult};
use crate::expr::Value;
use crate::loc::Loc;
use crate::strutil::{WordScanner, trim_space};

#[derive(Debug, Clone)]
pub struct Rule {
    pub outputs: Vec<String>,
    pub output_patterns: Vec<String>,
    pub inputs: Vec<String>,
    pub order_only_inputs: Vec<String>,
    pub cmds: Vec<Value>,
    pub is_double_colon: bool,
    pub is_suffix_rule: bool,
    pub loc: Loc,
    pub cmd_lineno: u32,
}

impl Rule {
    fn new(loc: Loc) -> Rule {
        Rule {
            outputs: Vec::new(),
            output_patterns: Vec::new(),
            inputs: Vec::new(),
            order_only_inputs: Vec::new(),
            cmds: Vec::new(),
            is_double_colon: false,
            is_suffix_rule: false,
            loc,
            cmd_lineno: 0,
        }
    }
}

/// What an expanded rule line turned out to be.
#[derive(Debug)]
pub enum RuleLine {
    Rule(Rule),
    /// `target: NAME op value` - a target-specific variable binding.
    TargetVar {
        targets: Vec<String>,
        name: String,
        op: AssignOp,
    },
}

/// Splits an expanded rule line. Returns `None` for a line that expanded
/// to nothing.
pub fn parse_rule_line(loc: &Loc, line: &str, sep: RuleSep) -> EvalResult<Option<RuleLine>> {
    let line = trim_space(line);
    if line.is_empty() {
        return Ok(None);
    }
    let Some(colon) = line.find(':') else {
        return Err(EvalError::fatal(loc, "*** missing separator."));
    };

    let targets: Vec<String> = WordScanner::new(&line[..colon])
        .map(|w| w.to_string())
        .collect();

    if matches!(sep, RuleSep::Eq | RuleSep::FinalEq) {
        let spec = trim_space(&line[colon + 1..]);
        let (op, name) = match spec.as_bytes().last() {
            Some(b':') => (AssignOp::ColonEq, &spec[..spec.len() - 1]),
            Some(b'+') => (AssignOp::PlusEq, &spec[..spec.len() - 1]),
            Some(b'?') => (AssignOp::QuestionEq, &spec[..spec.len() - 1]),
            _ => (AssignOp::Eq, spec),
        };
        let name = trim_space(name);
        if name.is_empty() {
            return Err(EvalError::fatal(loc, "*** empty variable name."));
        }
        return Ok(Some(RuleLine::TargetVar {
            targets,
            name: name.to_string(),
            op,
        }));
    }

    let mut rule = Rule::new(loc.clone());
    let mut rest = &line[colon + 1..];
    if let Some(stripped) = rest.strip_prefix(':') {
        rule.is_double_colon = true;
        rest = stripped;
    }

    for t in targets {
        if t.contains('%') {
            rule.output_patterns.push(t);
        } else {
            rule.outputs.push(t);
        }
    }
    if !rule.outputs.is_empty() && !rule.output_patterns.is_empty() {
        return Err(EvalError::fatal(
            loc,
            "*** mixed implicit and normal rules: deprecated syntax.",
        ));
    }

    let (inputs, order_only) = match rest.find('|') {
        Some(p) => (&rest[..p], &rest[p + 1..]),
        None => (rest, ""),
    };
    rule.inputs = WordScanner::new(inputs).map(|w| w.to_string()).collect();
    rule.order_only_inputs = WordScanner::new(order_only)
        .map(|w| w.to_string())
        .collect();
    Ok(Some(RuleLine::Rule(rule)))
}
