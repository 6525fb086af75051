//! Line-oriented makefile parsing.
//!
//! The parser walks logical lines (physical lines joined by backslash
//! continuations), classifies each as a directive, a recipe command, a
//! rule, or an assignment, and appends [`Stmt`]s. Syntax problems become
//! [`Stmt::ParseError`] entries so that parsing always reaches the end of
//! the input; the stored message fires if the bad statement is evaluated.

pub mod expr;

use tracing::warn;

use crate::ast::{AssignDirective, AssignOp, CondOp, RuleSep, Stmt};
use crate::expr::Value;
use crate::loc::Loc;
use crate::strutil::{
    collapse_continuations, find_end_of_line, find_outside_paren, trim_left_space, trim_space,
};

pub use expr::{ParseExprOpt, parse_expr, parse_expr_impl};

/// Parses a whole buffer, producing the statement list for one makefile.
pub fn parse_buf(buf: &str, filename: &str) -> Vec<Stmt> {
    Parser::new(buf, filename).parse()
}

/// Parses text produced at evaluation time (`$(eval ...)`); statements
/// inherit the location of the construct that generated them.
pub fn parse_eval_buf(buf: &str, loc: &Loc) -> Vec<Stmt> {
    let mut p = Parser::new(buf, &loc.filename);
    p.loc = loc.clone();
    p.fixed_line = true;
    p.parse()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParserState {
    NotAfterRule,
    AfterRule,
    MaybeAfterRule,
}

struct IfContext {
    loc: Loc,
    op: CondOp,
    lhs: Value,
    rhs: Option<Value>,
    true_stmts: Vec<Stmt>,
    false_stmts: Vec<Stmt>,
    in_else: bool,
    /// Opened by `else ifeq ...`; one `endif` closes the whole chain.
    chained: bool,
}

struct DefineContext {
    name: String,
    directive: AssignDirective,
    nest: u32,
    body: String,
    first: bool,
    loc: Loc,
}

struct Parser<'a> {
    buf: &'a str,
    loc: Loc,
    /// When parsing `$(eval)` output there is no physical file; keep the
    /// location of the generating construct for every statement.
    fixed_line: bool,
    state: ParserState,
    stmts: Vec<Stmt>,
    if_stack: Vec<IfContext>,
    define: Option<DefineContext>,
}

const DIRECTIVES: &[&str] = &[
    "include", "-include", "sinclude", "define", "ifdef", "ifndef", "ifeq", "ifneq", "else",
    "endif", "override", "export", "unexport",
];

/// Longest match over the directive set; the name must be followed by
/// whitespace or the end of the line.
fn match_directive<'b>(line: &'b str) -> Option<(&'static str, &'b str)> {
    for name in DIRECTIVES {
        if let Some(rest) = line.strip_prefix(name) {
            if rest.is_empty() || rest.starts_with(' ') || rest.starts_with('\t') {
                return Some((name, trim_left_space(rest)));
            }
        }
    }
    None
}

/// Truncates a non-recipe line at the first `#` that sits outside parens
/// and quotes and is not escaped.
fn strip_line_comment(line: &str) -> &str {
    let bytes = line.as_bytes();
    let mut depth = 0i32;
    let mut quote: Option<u8> = None;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if i + 1 < bytes.len() => {
                i += 2;
                continue;
            }
            q @ (b'\'' | b'"') => match quote {
                Some(open) if open == q => quote = None,
                Some(_) => {}
                None => quote = Some(q),
            },
            b'(' | b'{' if quote.is_none() => depth += 1,
            b')' | b'}' if quote.is_none() && depth > 0 => depth -= 1,
            b'#' if quote.is_none() && depth == 0 => return &line[..i],
            _ => {}
        }
        i += 1;
    }
    line
}

impl<'a> Parser<'a> {
    fn new(buf: &'a str, filename: &str) -> Self {
        Self {
            buf,
            loc: Loc::new(filename, 0),
            fixed_line: false,
            state: ParserState::NotAfterRule,
            stmts: Vec::new(),
            if_stack: Vec::new(),
            define: None,
        }
    }

    fn parse(mut self) -> Vec<Stmt> {
        let mut rest = self.buf;
        let mut line_no: u32 = 1;
        while !rest.is_empty() {
            let (end, next, lf_cnt) = find_end_of_line(rest);
            let raw = &rest[..end];
            if !self.fixed_line {
                self.loc.line = line_no;
            }
            line_no += 1 + lf_cnt;
            rest = &rest[next..];
            self.parse_line(raw);
        }
        self.finish();
        self.stmts
    }

    fn finish(&mut self) {
        if let Some(def) = self.define.take() {
            let msg = "*** missing `endef', unterminated define.".to_string();
            self.stmts.push(Stmt::ParseError { loc: def.loc, msg });
        }
        if !self.if_stack.is_empty() {
            let loc = self.if_stack.last().unwrap().loc.clone();
            self.stmts.push(Stmt::ParseError {
                loc,
                msg: "*** missing `endif', unterminated conditional.".to_string(),
            });
            while !self.if_stack.is_empty() {
                self.pop_if_chain();
            }
        }
    }

    fn out(&mut self) -> &mut Vec<Stmt> {
        match self.if_stack.last_mut() {
            Some(top) if top.in_else => &mut top.false_stmts,
            Some(top) => &mut top.true_stmts,
            None => &mut self.stmts,
        }
    }

    fn error_stmt(&mut self, msg: impl Into<String>) {
        let loc = self.loc.clone();
        let msg = msg.into();
        self.out().push(Stmt::ParseError { loc, msg });
    }

    fn parse_line(&mut self, raw: &str) {
        let raw = raw.strip_suffix('\r').unwrap_or(raw);
        if self.define.is_some() {
            self.parse_inside_define(raw);
            return;
        }
        if raw.starts_with('\t') && self.state != ParserState::NotAfterRule {
            let loc = self.loc.clone();
            match parse_expr(&raw[1..], ParseExprOpt::Command) {
                Ok(expr) => self.out().push(Stmt::Command { loc, expr }),
                Err(msg) => self.out().push(Stmt::ParseError { loc, msg }),
            }
            return;
        }
        let line = collapse_continuations(raw);
        let line = strip_line_comment(&line);
        let trimmed = trim_space(line);
        if trimmed.is_empty() {
            if self.state == ParserState::AfterRule {
                self.state = ParserState::MaybeAfterRule;
            }
            return;
        }
        match match_directive(trimmed) {
            Some((name, rest)) => self.parse_directive(name, rest),
            None => self.parse_rule_or_assign(trimmed, AssignDirective::default()),
        }
    }

    fn parse_directive(&mut self, name: &'static str, rest: &str) {
        match name {
            "include" | "-include" | "sinclude" => {
                let loc = self.loc.clone();
                match parse_expr(rest, ParseExprOpt::Normal) {
                    Ok(expr) => {
                        let must_exist = name == "include";
                        self.out().push(Stmt::Include {
                            loc,
                            expr,
                            must_exist,
                        });
                        self.state = ParserState::MaybeAfterRule;
                    }
                    Err(msg) => self.out().push(Stmt::ParseError { loc, msg }),
                }
            }
            "define" => self.start_define(rest, AssignDirective::default()),
            "ifdef" => self.parse_if(CondOp::Ifdef, rest, false),
            "ifndef" => self.parse_if(CondOp::Ifndef, rest, false),
            "ifeq" => self.parse_if(CondOp::Ifeq, rest, false),
            "ifneq" => self.parse_if(CondOp::Ifneq, rest, false),
            "else" => self.parse_else(rest),
            "endif" => self.parse_endif(rest),
            "override" => self.parse_assign_like(
                rest,
                AssignDirective {
                    is_override: true,
                    export: false,
                },
            ),
            "export" => self.parse_export(
                rest,
                AssignDirective {
                    is_override: false,
                    export: true,
                },
            ),
            "unexport" => {
                let loc = self.loc.clone();
                match parse_expr(rest, ParseExprOpt::Normal) {
                    Ok(expr) => self.out().push(Stmt::Export {
                        loc,
                        expr,
                        is_export: false,
                    }),
                    Err(msg) => self.out().push(Stmt::ParseError { loc, msg }),
                }
            }
            _ => unreachable!(),
        }
    }

    /// The remainder of an `override` line: another directive from the
    /// assignment subset, or an assignment proper.
    fn parse_assign_like(&mut self, line: &str, directive: AssignDirective) {
        if let Some((name, rest)) = match_directive(line) {
            match name {
                "define" => return self.start_define(rest, directive),
                "export" => {
                    return self.parse_export(
                        rest,
                        AssignDirective {
                            export: true,
                            ..directive
                        },
                    );
                }
                _ => {}
            }
        }
        match find_outside_paren(line, b":=") {
            Some(i) if line.as_bytes()[i] == b'=' => {
                self.parse_assign(line, i, directive);
            }
            Some(i) if line.len() > i + 1 && line.as_bytes()[i + 1] == b'=' => {
                self.parse_assign_colon_eq(line, i, directive);
            }
            _ => self.error_stmt("*** invalid `override' directive."),
        }
    }

    fn parse_export(&mut self, line: &str, directive: AssignDirective) {
        if let Some((name, rest)) = match_directive(line) {
            if name == "define" {
                return self.start_define(rest, directive);
            }
        }
        match find_outside_paren(line, b":=") {
            Some(i) if line.as_bytes()[i] == b'=' => {
                return self.parse_assign(line, i, directive);
            }
            Some(i) if line.len() > i + 1 && line.as_bytes()[i + 1] == b'=' => {
                return self.parse_assign_colon_eq(line, i, directive);
            }
            _ => {}
        }
        let loc = self.loc.clone();
        match parse_expr(line, ParseExprOpt::Normal) {
            Ok(expr) => self.out().push(Stmt::Export {
                loc,
                expr,
                is_export: true,
            }),
            Err(msg) => self.out().push(Stmt::ParseError { loc, msg }),
        }
    }

    fn start_define(&mut self, rest: &str, directive: AssignDirective) {
        self.define = Some(DefineContext {
            name: trim_space(rest).to_string(),
            directive,
            nest: 0,
            body: String::new(),
            first: true,
            loc: self.loc.clone(),
        });
    }

    fn parse_inside_define(&mut self, raw: &str) {
        let trimmed = trim_space(raw);
        match match_directive(trimmed) {
            Some(("define", _)) => self.define.as_mut().unwrap().nest += 1,
            Some(("endef", rest)) => {
                if self.define.as_ref().unwrap().nest > 0 {
                    self.define.as_mut().unwrap().nest -= 1;
                } else {
                    let def = self.define.take().unwrap();
                    if !trim_space(strip_line_comment(rest)).is_empty() {
                        warn!("{}: extraneous text after `endef'", self.loc);
                    }
                    self.finish_define(def);
                    return;
                }
            }
            _ => {}
        }
        let def = self.define.as_mut().unwrap();
        if def.first {
            def.first = false;
        } else {
            def.body.push('\n');
        }
        def.body.push_str(raw);
    }

    fn finish_define(&mut self, def: DefineContext) {
        let loc = def.loc.clone();
        let lhs = match parse_expr(&def.name, ParseExprOpt::Normal) {
            Ok(v) => v,
            Err(msg) => return self.out().push(Stmt::ParseError { loc, msg }),
        };
        let rhs = match parse_expr(&def.body, ParseExprOpt::Define) {
            Ok(v) => v,
            Err(msg) => return self.out().push(Stmt::ParseError { loc, msg }),
        };
        self.out().push(Stmt::Assign {
            loc,
            lhs,
            rhs,
            orig_rhs: def.body,
            op: AssignOp::Eq,
            directive: def.directive,
            is_final: false,
        });
        self.state = ParserState::NotAfterRule;
    }

    fn parse_if(&mut self, op: CondOp, rest: &str, chained: bool) {
        let cond = match op {
            CondOp::Ifdef | CondOp::Ifndef => {
                parse_expr(trim_space(rest), ParseExprOpt::Normal).map(|lhs| (lhs, None))
            }
            CondOp::Ifeq | CondOp::Ifneq => self.parse_ifeq_cond(rest),
        };
        let (lhs, rhs) = match cond {
            Ok(c) => c,
            Err(msg) => {
                self.error_stmt(msg);
                (Value::empty(), None)
            }
        };
        self.if_stack.push(IfContext {
            loc: self.loc.clone(),
            op,
            lhs,
            rhs,
            true_stmts: Vec::new(),
            false_stmts: Vec::new(),
            in_else: false,
            chained,
        });
    }

    fn parse_ifeq_cond(&mut self, s: &str) -> Result<(Value, Option<Value>), String> {
        let s = trim_space(s);
        if let Some(body) = s.strip_prefix('(') {
            let body = trim_left_space(body);
            let (lhs, n) = parse_expr_impl(body, b",", ParseExprOpt::Normal, false)?;
            if n >= body.len() {
                return Err("*** invalid syntax in conditional.".to_string());
            }
            let rest = trim_left_space(&body[n + 1..]);
            let (rhs, m) = parse_expr_impl(rest, b")", ParseExprOpt::Normal, false)?;
            if m >= rest.len() {
                return Err("*** invalid syntax in conditional.".to_string());
            }
            if !trim_space(&rest[m + 1..]).is_empty() {
                return Err("*** invalid syntax in conditional.".to_string());
            }
            Ok((lhs, Some(rhs)))
        } else if s.starts_with('"') || s.starts_with('\'') {
            let (lhs, rest) = read_quoted(s)?;
            let rest = trim_left_space(rest);
            let (rhs, rest) = read_quoted(rest)?;
            if !trim_space(rest).is_empty() {
                return Err("*** invalid syntax in conditional.".to_string());
            }
            Ok((lhs, Some(rhs)))
        } else {
            Err("*** invalid syntax in conditional.".to_string())
        }
    }

    fn parse_else(&mut self, rest: &str) {
        let already_in_else = match self.if_stack.last() {
            None => {
                self.error_stmt("*** extraneous `else'.");
                return;
            }
            Some(top) => top.in_else,
        };
        if already_in_else {
            self.error_stmt("*** only one `else' per conditional.");
            return;
        }
        self.if_stack.last_mut().unwrap().in_else = true;
        if rest.is_empty() {
            return;
        }
        match match_directive(rest) {
            Some(("ifdef", r)) => self.parse_if(CondOp::Ifdef, r, true),
            Some(("ifndef", r)) => self.parse_if(CondOp::Ifndef, r, true),
            Some(("ifeq", r)) => self.parse_if(CondOp::Ifeq, r, true),
            Some(("ifneq", r)) => self.parse_if(CondOp::Ifneq, r, true),
            _ => self.error_stmt("*** extraneous text after `else' directive."),
        }
    }

    fn parse_endif(&mut self, rest: &str) {
        if !rest.is_empty() {
            self.error_stmt("*** extraneous text after `endif' directive.");
            return;
        }
        if self.if_stack.is_empty() {
            self.error_stmt("*** extraneous `endif'.");
            return;
        }
        self.pop_if_chain();
    }

    /// Closes the innermost conditional, plus every `else if` link chained
    /// onto it.
    fn pop_if_chain(&mut self) {
        loop {
            let ctx = self.if_stack.pop().unwrap();
            let chained = ctx.chained;
            let stmt = Stmt::If {
                loc: ctx.loc,
                op: ctx.op,
                lhs: ctx.lhs,
                rhs: ctx.rhs,
                true_stmts: ctx.true_stmts,
                false_stmts: ctx.false_stmts,
            };
            self.out().push(stmt);
            if !chained {
                break;
            }
        }
    }

    fn parse_rule_or_assign(&mut self, line: &str, directive: AssignDirective) {
        match find_outside_paren(line, b":=;") {
            // No separator: often a line that is nothing but `$(...)` side
            // effects. It becomes a rule statement; if it still has text
            // after expansion the evaluator reports the missing separator.
            None => self.parse_plain_rule(line),
            Some(i) => match line.as_bytes()[i] {
                b'=' => self.parse_assign(line, i, directive),
                b';' => self.parse_rule(line, None, i),
                b':' => {
                    if line.as_bytes().get(i + 1) == Some(&b'=') {
                        self.parse_assign_colon_eq(line, i, directive);
                    } else {
                        match find_outside_paren(&line[i + 1..], b"=;") {
                            Some(j) if line.as_bytes()[i + 1 + j] == b';' => {
                                self.parse_rule(line, Some(i), i + 1 + j);
                            }
                            Some(j) => self.parse_rule_var(line, i, i + 1 + j),
                            None => self.parse_plain_rule(line),
                        }
                    }
                }
                _ => unreachable!(),
            },
        }
    }

    /// `lhs = rhs`, with `+=`/`?=` read from the byte before the equals.
    fn parse_assign(&mut self, line: &str, eq: usize, directive: AssignDirective) {
        let (op, lhs_end) = match eq.checked_sub(1).map(|p| line.as_bytes()[p]) {
            Some(b'+') => (AssignOp::PlusEq, eq - 1),
            Some(b'?') => (AssignOp::QuestionEq, eq - 1),
            _ => (AssignOp::Eq, eq),
        };
        self.push_assign(&line[..lhs_end], &line[eq + 1..], op, directive);
    }

    fn parse_assign_colon_eq(&mut self, line: &str, colon: usize, directive: AssignDirective) {
        self.push_assign(
            &line[..colon],
            &line[colon + 2..],
            AssignOp::ColonEq,
            directive,
        );
    }

    fn push_assign(
        &mut self,
        lhs_src: &str,
        rhs_src: &str,
        op: AssignOp,
        directive: AssignDirective,
    ) {
        let (is_final, rhs_src) = match rhs_src.strip_prefix("$=") {
            Some(stripped) => (true, stripped),
            None => (false, rhs_src),
        };
        let lhs_src = trim_space(lhs_src);
        let rhs_src = trim_left_space(rhs_src);
        let loc = self.loc.clone();
        let lhs = match parse_expr(lhs_src, ParseExprOpt::Normal) {
            Ok(v) => v,
            Err(msg) => return self.out().push(Stmt::ParseError { loc, msg }),
        };
        let rhs = match parse_expr(rhs_src, ParseExprOpt::Normal) {
            Ok(v) => v,
            Err(msg) => return self.out().push(Stmt::ParseError { loc, msg }),
        };
        self.out().push(Stmt::Assign {
            loc,
            lhs,
            rhs,
            orig_rhs: rhs_src.to_string(),
            op,
            directive,
            is_final,
        });
        self.state = ParserState::NotAfterRule;
    }

    /// A rule line with an inline recipe after `;`. The left side keeps its
    /// colon and prerequisites; the recipe is parsed in command mode.
    fn parse_rule(&mut self, line: &str, _colon: Option<usize>, semi: usize) {
        let loc = self.loc.clone();
        let lhs = match parse_expr(trim_space(&line[..semi]), ParseExprOpt::Normal) {
            Ok(v) => v,
            Err(msg) => return self.out().push(Stmt::ParseError { loc, msg }),
        };
        let rhs = match parse_expr(&line[semi + 1..], ParseExprOpt::Command) {
            Ok(v) => v,
            Err(msg) => return self.out().push(Stmt::ParseError { loc, msg }),
        };
        self.out().push(Stmt::Rule {
            loc,
            lhs,
            sep: RuleSep::Semicolon,
            rhs: Some(rhs),
        });
        self.state = ParserState::AfterRule;
    }

    fn parse_plain_rule(&mut self, line: &str) {
        let loc = self.loc.clone();
        match parse_expr(line, ParseExprOpt::Normal) {
            Ok(lhs) => {
                self.out().push(Stmt::Rule {
                    loc,
                    lhs,
                    sep: RuleSep::Null,
                    rhs: None,
                });
                self.state = ParserState::AfterRule;
            }
            Err(msg) => self.out().push(Stmt::ParseError { loc, msg }),
        }
    }

    /// `target: NAME = value`, a target-specific variable. Any `+`/`?`/`:`
    /// operator prefix stays inside the left side and is picked apart at
    /// evaluation time, once targets can be expanded.
    fn parse_rule_var(&mut self, line: &str, _colon: usize, eq: usize) {
        let loc = self.loc.clone();
        let after = &line[eq + 1..];
        let (sep, after) = match after.strip_prefix("$=") {
            Some(stripped) => (RuleSep::FinalEq, stripped),
            None => (RuleSep::Eq, after),
        };
        let lhs = match parse_expr(trim_space(&line[..eq]), ParseExprOpt::Normal) {
            Ok(v) => v,
            Err(msg) => return self.out().push(Stmt::ParseError { loc, msg }),
        };
        let rhs = match parse_expr(trim_left_space(after), ParseExprOpt::Normal) {
            Ok(v) => v,
            Err(msg) => return self.out().push(Stmt::ParseError { loc, msg }),
        };
        self.out().push(Stmt::Rule {
            loc,
            lhs,
            sep,
            rhs: Some(rhs),
        });
        self.state = ParserState::AfterRule;
    }
}

fn read_quoted(s: &str) -> Result<(Value, &str), String> {
    let q = s
        .chars()
        .next()
        .filter(|c| *c == '"' || *c == '\'')
        .ok_or_else(|| "*** invalid syntax in conditional.".to_string())?;
    let rest = &s[1..];
    let end = rest
        .find(q)
        .ok_or_else(|| "*** invalid syntax in conditional.".to_string())?;
    let v = parse_expr(&rest[..end], ParseExprOpt::Normal)?;
    Ok((v, &rest[end + 1..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_assignments() {
        let stmts = parse_buf("A := x\nB = y\nC += z\nD ?= w\n", "test.mk");
        assert_eq!(stmts.len(), 4);
        let ops: Vec<AssignOp> = stmts
            .iter()
            .map(|s| match s {
                Stmt::Assign { op, .. } => *op,
                other => panic!("unexpected: {:?}", other),
            })
            .collect();
        assert_eq!(
            ops,
            vec![
                AssignOp::ColonEq,
                AssignOp::Eq,
                AssignOp::PlusEq,
                AssignOp::QuestionEq
            ]
        );
    }

    #[test]
    fn rule_and_commands() {
        let stmts = parse_buf("all: dep\n\techo hi\n\techo again\n", "test.mk");
        assert_eq!(stmts.len(), 3);
        assert!(matches!(stmts[0], Stmt::Rule { sep: RuleSep::Null, .. }));
        assert!(matches!(stmts[1], Stmt::Command { .. }));
        assert!(matches!(stmts[2], Stmt::Command { .. }));
    }

    #[test]
    fn inline_recipe() {
        let stmts = parse_buf("all: ; echo hi\n", "test.mk");
        assert!(matches!(
            stmts[0],
            Stmt::Rule {
                sep: RuleSep::Semicolon,
                rhs: Some(_),
                ..
            }
        ));
    }

    #[test]
    fn target_specific_variable() {
        let stmts = parse_buf("foo: CFLAGS += -g\n", "test.mk");
        assert!(matches!(stmts[0], Stmt::Rule { sep: RuleSep::Eq, .. }));
    }

    #[test]
    fn continuation_joins_lines() {
        let stmts = parse_buf("A = a \\\n    b\n", "test.mk");
        match &stmts[0] {
            Stmt::Assign { orig_rhs, .. } => assert_eq!(orig_rhs, "a b"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn comment_only_continuation_keeps_line() {
        let stmts = parse_buf("A = a \\\n# just a comment\nB = b\n", "test.mk");
        assert_eq!(stmts.len(), 2);
        match &stmts[1] {
            Stmt::Assign { loc, .. } => assert_eq!(loc.line, 3),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn conditional_branches() {
        let stmts = parse_buf("ifeq (1,1)\nX := yes\nelse\nX := no\nendif\n", "test.mk");
        assert_eq!(stmts.len(), 1);
        match &stmts[0] {
            Stmt::If {
                op,
                true_stmts,
                false_stmts,
                ..
            } => {
                assert_eq!(*op, CondOp::Ifeq);
                assert_eq!(true_stmts.len(), 1);
                assert_eq!(false_stmts.len(), 1);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn else_if_chain_closes_on_one_endif() {
        let src = "ifeq (a,b)\nX := 1\nelse ifeq (c,c)\nX := 2\nelse\nX := 3\nendif\n";
        let stmts = parse_buf(src, "test.mk");
        assert_eq!(stmts.len(), 1);
        match &stmts[0] {
            Stmt::If { false_stmts, .. } => {
                assert_eq!(false_stmts.len(), 1);
                assert!(matches!(false_stmts[0], Stmt::If { .. }));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn quoted_conditional_form() {
        let stmts = parse_buf("ifeq \"a\" \"a\"\nX := y\nendif\n", "test.mk");
        assert!(matches!(stmts[0], Stmt::If { rhs: Some(_), .. }));
    }

    #[test]
    fn define_captures_verbatim() {
        let src = "define greet\n@echo hello $(1)\nendef\n";
        let stmts = parse_buf(src, "test.mk");
        match &stmts[0] {
            Stmt::Assign {
                op, orig_rhs, ..
            } => {
                assert_eq!(*op, AssignOp::Eq);
                assert_eq!(orig_rhs, "@echo hello $(1)");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn nested_define_needs_matching_endef() {
        let src = "define outer\ndefine inner\nx\nendef\ny\nendef\n";
        let stmts = parse_buf(src, "test.mk");
        assert_eq!(stmts.len(), 1);
        match &stmts[0] {
            Stmt::Assign { orig_rhs, .. } => {
                assert_eq!(orig_rhs, "define inner\nx\nendef\ny");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn include_variants() {
        let stmts = parse_buf("include a.mk\n-include b.mk\nsinclude c.mk\n", "test.mk");
        let flags: Vec<bool> = stmts
            .iter()
            .map(|s| match s {
                Stmt::Include { must_exist, .. } => *must_exist,
                other => panic!("unexpected: {:?}", other),
            })
            .collect();
        assert_eq!(flags, vec![true, false, false]);
    }

    #[test]
    fn export_forms() {
        let stmts = parse_buf("export A\nexport B := 1\nunexport C\n", "test.mk");
        assert!(matches!(stmts[0], Stmt::Export { is_export: true, .. }));
        match &stmts[1] {
            Stmt::Assign { directive, .. } => assert!(directive.export),
            other => panic!("unexpected: {:?}", other),
        }
        assert!(matches!(stmts[2], Stmt::Export { is_export: false, .. }));
    }

    #[test]
    fn override_assignment() {
        let stmts = parse_buf("override A = 1\n", "test.mk");
        match &stmts[0] {
            Stmt::Assign { directive, .. } => assert!(directive.is_override),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn separatorless_line_defers_to_evaluation() {
        let stmts = parse_buf("$(info side effect)\nA := ok\n", "test.mk");
        assert!(matches!(stmts[0], Stmt::Rule { sep: RuleSep::Null, .. }));
        assert!(matches!(stmts[1], Stmt::Assign { .. }));
    }

    #[test]
    fn extraneous_endif_reported() {
        let stmts = parse_buf("endif\n", "test.mk");
        assert!(matches!(stmts[0], Stmt::ParseError { .. }));
    }

    #[test]
    fn final_assignment_marker() {
        let stmts = parse_buf("A :=$= locked\n", "test.mk");
        match &stmts[0] {
            Stmt::Assign { is_final, op, .. } => {
                assert!(*is_final);
                assert_eq!(*op, AssignOp::ColonEq);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn tab_in_rule_context_is_command_even_with_colon() {
        let stmts = parse_buf("all:\n\techo a:b\n", "test.mk");
        assert!(matches!(stmts[1], Stmt::Command { .. }));
    }

    #[test]
    fn double_colon_stays_in_rule_lhs() {
        let stmts = parse_buf("t:: dep\n", "test.mk");
        match &stmts[0] {
            Stmt::Rule { lhs, sep, .. } => {
                assert_eq!(*sep, RuleSep::Null);
                assert_eq!(lhs.as_literal(), Some("t:: dep"));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }
}
