//! Statement evaluation.
//!
//! The [`Evaluator`] executes parsed statements against the variable
//! environment, accumulating the rule table as it goes. Expansion of
//! [`Value`]s happens through the methods here so that variable lookups,
//! scoping, diagnostics, and the automatic variables all share one state.

pub mod scope;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::process::Command;

use tracing::{debug, warn};

use crate::ast::{AssignDirective, AssignOp, CondOp, RuleSep, Stmt};
use crate::error::{EvalError, EvalResult};
use crate::expr::Value;
use crate::file::MakefileCache;
use crate::fileutil;
use crate::flags::Flags;
use crate::loc::Loc;
use crate::parser;
use crate::rule::{Rule, RuleLine, parse_rule_line};
use crate::strutil::{
    WordScanner, basename_part, dirname, has_path_prefix, join_words, trim_space,
};
use crate::var::{AutoKind, AutoSuffix, Var, VarOrigin, VarPayload, Vars};

pub use scope::Env;

/// A deferred target-specific assignment, applied when the target's scope
/// is materialised during dependency building.
#[derive(Debug, Clone)]
pub struct TargetVarAssign {
    pub name: String,
    pub op: AssignOp,
    pub rhs: Value,
    pub orig_rhs: String,
    pub is_final: bool,
    pub loc: Loc,
}

/// Per-target state the automatic variables read. Installed by the
/// command evaluator around recipe expansion.
#[derive(Debug, Clone, Default)]
pub struct AutoContext {
    pub output: String,
    pub inputs: Vec<String>,
    pub order_onlys: Vec<String>,
    pub stem: String,
    pub output_pattern: Option<String>,
}

pub struct Evaluator {
    pub flags: Flags,
    env: Env,
    rules: Vec<Rule>,
    rule_vars: HashMap<String, Vec<TargetVarAssign>>,
    /// Index into `rules` of the most recently declared rule; recipe lines
    /// attach to it.
    last_rule: Option<usize>,
    first_target: Option<String>,
    exports: BTreeMap<String, bool>,
    export_all: Option<bool>,
    export_deprecated: Option<String>,
    export_obsolete: Option<String>,
    loc: Loc,
    eval_depth: u32,
    avoid_io: bool,
    /// Commands queued by `$(file)`/`$(info)` while in I/O avoidance mode.
    pub delayed_output_commands: Vec<String>,
    /// Names currently being expanded, for self-reference detection.
    expanding: Vec<String>,
    include_stack: Vec<String>,
    cache: MakefileCache,
    current_auto: Option<AutoContext>,
    /// True while a recipe is being expanded; the avoid-I/O rules for
    /// `$(shell)`, `$(eval)`, and `$(file)` only apply there.
    in_command_eval: bool,
    stubs_warned: HashSet<&'static str>,
}

impl Evaluator {
    pub fn new(flags: Flags) -> Evaluator {
        let avoid_io = flags.avoid_io;
        let mut ev = Evaluator {
            flags,
            env: Env::new(),
            rules: Vec::new(),
            rule_vars: HashMap::new(),
            last_rule: None,
            first_target: None,
            exports: BTreeMap::new(),
            export_all: None,
            export_deprecated: None,
            export_obsolete: None,
            loc: Loc::default(),
            eval_depth: 0,
            avoid_io,
            delayed_output_commands: Vec::new(),
            expanding: Vec::new(),
            include_stack: Vec::new(),
            cache: MakefileCache::new(),
            current_auto: None,
            in_command_eval: false,
            stubs_warned: HashSet::new(),
        };
        ev.seed_builtin_vars();
        ev
    }

    fn seed_builtin_vars(&mut self) {
        let shell = std::env::var("SHELL").unwrap_or_else(|_| "/bin/sh".to_string());
        self.env
            .assign_global("SHELL", Var::simple(VarOrigin::Default, shell));
        if let Ok(cwd) = std::env::current_dir() {
            self.env.assign_global(
                "CURDIR",
                Var::simple(VarOrigin::File, cwd.to_string_lossy().into_owned()),
            );
        }
        self.register_automatic_vars();
    }

    fn register_automatic_vars(&mut self) {
        let kinds = [
            ("@", AutoKind::Output),
            ("<", AutoKind::FirstInput),
            ("^", AutoKind::Inputs),
            ("+", AutoKind::InputsDup),
            ("*", AutoKind::Stem),
            ("?", AutoKind::NewInputs),
        ];
        for (name, kind) in kinds {
            self.env
                .assign_global(name, Var::automatic(kind, AutoSuffix::None));
            self.env.assign_global(
                &format!("{}D", name),
                Var::automatic(kind, AutoSuffix::Dir),
            );
            self.env.assign_global(
                &format!("{}F", name),
                Var::automatic(kind, AutoSuffix::File),
            );
        }
    }

    /// Imports the process environment, excluding `SHELL` which Make
    /// always controls itself.
    pub fn seed_environment(&mut self) {
        for (k, v) in std::env::vars() {
            if k == "SHELL" {
                continue;
            }
            self.env
                .assign_global(&k, Var::simple(VarOrigin::Environment, v));
        }
    }

    /// Applies one `NAME=VALUE` command-line binding.
    pub fn eval_command_line_binding(&mut self, binding: &str) -> EvalResult<()> {
        let stmts = parser::parse_buf(binding, "*command line*");
        for stmt in &stmts {
            match stmt {
                Stmt::Assign {
                    lhs,
                    rhs,
                    orig_rhs,
                    op,
                    directive,
                    is_final,
                    ..
                } => {
                    let name = lhs.eval(self)?;
                    let name = trim_space(&name).to_string();
                    self.do_assign(
                        &name,
                        rhs,
                        orig_rhs,
                        *op,
                        *directive,
                        *is_final,
                        VarOrigin::CommandLine,
                    )?;
                }
                _ => {
                    return Err(EvalError::fatal(
                        &self.loc,
                        format!("*** invalid command line variable: {}", binding),
                    ));
                }
            }
        }
        Ok(())
    }

    pub fn set_var(&mut self, name: &str, value: &str, origin: VarOrigin) {
        self.env.assign_global(name, Var::simple(origin, value));
    }

    /// Reads and evaluates the top-level makefile.
    pub fn load(&mut self, path: &str) -> EvalResult<()> {
        let mk = self.cache.read_makefile(path).map_err(|e| EvalError::Io {
            loc: self.loc.clone(),
            source: e,
        })?;
        self.append_makefile_list(path);
        self.include_stack.push(path.to_string());
        let r = self.eval_stmts(&mk.stmts);
        self.include_stack.pop();
        r
    }

    fn append_makefile_list(&mut self, path: &str) {
        let mut list = self
            .env
            .peek_global("MAKEFILE_LIST")
            .map(|v| v.value_text().to_string())
            .unwrap_or_default();
        list.push(' ');
        list.push_str(path);
        self.env
            .assign_global("MAKEFILE_LIST", Var::simple(VarOrigin::File, list));
    }

    pub fn eval_stmts(&mut self, stmts: &[Stmt]) -> EvalResult<()> {
        for stmt in stmts {
            self.eval_stmt(stmt)?;
        }
        Ok(())
    }

    fn eval_stmt(&mut self, stmt: &Stmt) -> EvalResult<()> {
        self.loc = stmt.loc().clone();
        match stmt {
            Stmt::Assign {
                lhs,
                rhs,
                orig_rhs,
                op,
                directive,
                is_final,
                ..
            } => {
                self.last_rule = None;
                let name = lhs.eval(self)?;
                let name = trim_space(&name).to_string();
                if name.is_empty() {
                    return Err(EvalError::fatal(&self.loc, "*** empty variable name."));
                }
                let origin = if directive.is_override {
                    VarOrigin::Override
                } else {
                    VarOrigin::File
                };
                self.do_assign(&name, rhs, orig_rhs, *op, *directive, *is_final, origin)
            }
            Stmt::Rule { lhs, sep, rhs, .. } => self.eval_rule(lhs, *sep, rhs.as_ref()),
            Stmt::Command { expr, .. } => self.eval_command(expr),
            Stmt::If {
                op,
                lhs,
                rhs,
                true_stmts,
                false_stmts,
                ..
            } => self.eval_if(*op, lhs, rhs.as_ref(), true_stmts, false_stmts),
            Stmt::Include {
                expr, must_exist, ..
            } => self.eval_include(expr, *must_exist),
            Stmt::Export {
                expr, is_export, ..
            } => self.eval_export(expr, *is_export),
            Stmt::ParseError { loc, msg } => Err(EvalError::Fatal {
                loc: loc.clone(),
                message: msg.clone(),
            }),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn do_assign(
        &mut self,
        name: &str,
        rhs: &Value,
        orig_rhs: &str,
        op: AssignOp,
        directive: AssignDirective,
        is_final: bool,
        origin: VarOrigin,
    ) -> EvalResult<()> {
        let existing = self.env.peek_global(name).cloned();
        if let Some(ref old) = existing {
            if old.readonly {
                debug!("{}: ignored assignment to readonly `{}'", self.loc, name);
                return Ok(());
            }
            // A command-line binding (or an earlier `override`) beats plain
            // file assignments.
            if origin == VarOrigin::File
                && matches!(
                    old.origin,
                    VarOrigin::CommandLine | VarOrigin::Override | VarOrigin::EnvironmentOverride
                )
            {
                debug!(
                    "{}: `{}' is {} - file assignment ignored",
                    self.loc, name, old.origin
                );
                return Ok(());
            }
        }

        let mut var = match op {
            AssignOp::Eq => Var::recursive(origin, rhs.clone(), orig_rhs),
            AssignOp::ColonEq => {
                let s = rhs.eval(self)?;
                Var::simple(origin, s)
            }
            AssignOp::PlusEq => match existing.as_ref().map(|v| &v.payload) {
                Some(VarPayload::Recursive { value, orig }) => {
                    let appended = Value::List(vec![
                        value.clone(),
                        Value::literal(" "),
                        rhs.clone(),
                    ]);
                    let orig = format!("{} {}", orig, orig_rhs);
                    Var::recursive(origin, appended, orig)
                }
                Some(VarPayload::Simple(s)) => {
                    let mut s = s.clone();
                    s.push(' ');
                    s.push_str(&rhs.eval(self)?);
                    Var::simple(origin, s)
                }
                _ => {
                    let s = rhs.eval(self)?;
                    Var::simple(origin, s)
                }
            },
            AssignOp::QuestionEq => {
                let undefined_or_empty = existing
                    .as_ref()
                    .map(|v| v.value_text().is_empty())
                    .unwrap_or(true);
                if !undefined_or_empty {
                    return Ok(());
                }
                Var::recursive(origin, rhs.clone(), orig_rhs)
            }
        };

        var.loc = Some(self.loc.clone());
        var.readonly = is_final;
        if let Some(old) = existing {
            // Diagnostics and visibility stick to the name across
            // reassignment.
            var.deprecated = old.deprecated;
            var.obsolete = old.obsolete;
            var.visibility = old.visibility;
        }
        if directive.export {
            self.mark_export(name, true)?;
        }
        if self.env.assign_global(name, var) {
            debug!("{}: ignored assignment to readonly `{}'", self.loc, name);
        }
        Ok(())
    }

    fn eval_rule(&mut self, lhs: &Value, sep: RuleSep, rhs: Option<&Value>) -> EvalResult<()> {
        self.last_rule = None;
        let expanded = lhs.eval(self)?;
        let loc = self.loc.clone();
        let Some(line) = parse_rule_line(&loc, &expanded, sep)? else {
            return Ok(());
        };
        match line {
            RuleLine::TargetVar { targets, name, op } => {
                let rhs = rhs.expect("target var rule without rhs").clone();
                let orig_rhs = rhs.to_string();
                for target in targets {
                    self.rule_vars
                        .entry(target)
                        .or_default()
                        .push(TargetVarAssign {
                            name: name.clone(),
                            op,
                            rhs: rhs.clone(),
                            orig_rhs: orig_rhs.clone(),
                            is_final: sep == RuleSep::FinalEq,
                            loc: loc.clone(),
                        });
                }
                self.last_rule = None;
            }
            RuleLine::Rule(mut rule) => {
                if sep == RuleSep::Semicolon {
                    rule.cmds.push(rhs.expect("inline recipe without rhs").clone());
                    rule.cmd_lineno = loc.line;
                }
                if self.first_target.is_none() {
                    if let Some(out) = rule.outputs.iter().find(|o| !o.starts_with('.')) {
                        self.first_target = Some(out.clone());
                    }
                }
                debug!(
                    "{}: rule: {:?} <- {:?}",
                    loc, rule.outputs, rule.inputs
                );
                self.rules.push(rule);
                self.last_rule = Some(self.rules.len() - 1);
            }
        }
        Ok(())
    }

    fn eval_command(&mut self, expr: &Value) -> EvalResult<()> {
        let Some(idx) = self.last_rule else {
            return Err(EvalError::fatal(
                &self.loc,
                "*** commands commence before first target.",
            ));
        };
        let rule = &mut self.rules[idx];
        if rule.cmd_lineno == 0 {
            rule.cmd_lineno = self.loc.line;
        }
        rule.cmds.push(expr.clone());
        Ok(())
    }

    fn eval_if(
        &mut self,
        op: CondOp,
        lhs: &Value,
        rhs: Option<&Value>,
        true_stmts: &[Stmt],
        false_stmts: &[Stmt],
    ) -> EvalResult<()> {
        let taken = match op {
            CondOp::Ifdef | CondOp::Ifndef => {
                let name = lhs.eval(self)?;
                let name = trim_space(&name);
                let defined = self
                    .env
                    .lookup(name)
                    .map(|v| !v.value_text().is_empty())
                    .unwrap_or(false);
                if op == CondOp::Ifdef { defined } else { !defined }
            }
            CondOp::Ifeq | CondOp::Ifneq => {
                let l = lhs.eval(self)?;
                let r = match rhs {
                    Some(r) => r.eval(self)?,
                    None => String::new(),
                };
                if op == CondOp::Ifeq { l == r } else { l != r }
            }
        };
        let saved_loc = self.loc.clone();
        let r = if taken {
            self.eval_stmts(true_stmts)
        } else {
            self.eval_stmts(false_stmts)
        };
        self.loc = saved_loc;
        r
    }

    fn eval_include(&mut self, expr: &Value, must_exist: bool) -> EvalResult<()> {
        let spec = expr.eval(self)?;
        let words: Vec<String> = WordScanner::new(&spec).map(|w| w.to_string()).collect();
        for word in words {
            let paths = if fileutil::has_wildcard_meta(&word) {
                let mut found = fileutil::glob_files(&word);
                found.sort();
                found
            } else {
                vec![word.clone()]
            };
            if paths.is_empty() && must_exist {
                return Err(EvalError::Io {
                    loc: self.loc.clone(),
                    source: std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        format!("{}: no makefile matched", word),
                    ),
                });
            }
            for path in paths {
                self.include_one(&path, must_exist)?;
            }
        }
        self.last_rule = None;
        Ok(())
    }

    fn include_one(&mut self, path: &str, must_exist: bool) -> EvalResult<()> {
        // Relative includes resolve against the including file's
        // directory when they are not found from the working directory.
        let resolved = if fileutil::exists(path) {
            path.to_string()
        } else {
            let dir = dirname(&self.loc.filename);
            format!("{}/{}", dir, path)
        };
        if !fileutil::exists(&resolved) {
            if must_exist {
                return Err(EvalError::Io {
                    loc: self.loc.clone(),
                    source: std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        format!("{}: No such file or directory", path),
                    ),
                });
            }
            debug!("{}: skipping missing include {}", self.loc, path);
            return Ok(());
        }
        if self.include_stack.iter().any(|p| p == &resolved) {
            return Err(EvalError::fatal(
                &self.loc,
                format!("*** include cycle detected: {}.", resolved),
            ));
        }
        let mk = self
            .cache
            .read_makefile(&resolved)
            .map_err(|e| EvalError::Io {
                loc: self.loc.clone(),
                source: e,
            })?;
        self.append_makefile_list(&resolved);
        self.include_stack.push(resolved);
        let saved_loc = self.loc.clone();
        let r = self.eval_stmts(&mk.stmts);
        self.loc = saved_loc;
        self.include_stack.pop();
        r
    }

    fn eval_export(&mut self, expr: &Value, is_export: bool) -> EvalResult<()> {
        let list = expr.eval(self)?;
        let names: Vec<String> = WordScanner::new(&list).map(|w| w.to_string()).collect();
        if names.is_empty() {
            self.export_all = Some(is_export);
            return Ok(());
        }
        for name in names {
            self.mark_export(&name, is_export)?;
        }
        Ok(())
    }

    fn mark_export(&mut self, name: &str, is_export: bool) -> EvalResult<()> {
        if is_export {
            if let Some(msg) = self.export_obsolete.clone() {
                return Err(EvalError::fatal(
                    &self.loc,
                    format!("*** `export' is obsolete: {}.", msg),
                ));
            }
            if let Some(msg) = &self.export_deprecated {
                warn!("{}: export of `{}' is deprecated: {}", self.loc, name, msg);
            }
        }
        self.exports.insert(name.to_string(), is_export);
        Ok(())
    }

    // ---- expansion --------------------------------------------------

    /// Expands a variable by name, firing its diagnostics. Undefined
    /// names expand to the empty string.
    pub fn expand_var(&mut self, name: &str) -> EvalResult<String> {
        let Some(var) = self.env.lookup(name) else {
            return Ok(String::new());
        };
        if let Some(msg) = &var.obsolete {
            let note = if msg.is_empty() { None } else { Some(msg.clone()) };
            return Err(EvalError::ObsoleteVar {
                loc: self.loc.clone(),
                name: name.to_string(),
                note,
            });
        }
        if let Some(msg) = &var.deprecated {
            let suffix = if msg.is_empty() {
                String::new()
            } else {
                format!(": {}", msg)
            };
            warn!("{}: `{}' has been deprecated{}", self.loc, name, suffix);
        }
        if !var.visibility.is_empty() {
            let file = self.loc.filename.to_string();
            if !var.visibility.iter().any(|p| has_path_prefix(&file, p)) {
                return Err(EvalError::Visibility {
                    loc: self.loc.clone(),
                    name: name.to_string(),
                    path: file,
                });
            }
        }
        match var.payload.clone() {
            VarPayload::Undefined => Ok(String::new()),
            VarPayload::Simple(s) => Ok(s),
            VarPayload::Recursive { value, .. } => {
                if self.expanding.iter().any(|n| n == name) {
                    return Err(EvalError::SelfReference {
                        loc: self.loc.clone(),
                        name: name.to_string(),
                    });
                }
                self.expanding.push(name.to_string());
                let r = value.eval(self);
                self.expanding.pop();
                r
            }
            VarPayload::Automatic { kind, suffix } => Ok(self.eval_auto(kind, suffix)),
        }
    }

    /// Parses and expands a string in the current context.
    pub fn expand_str(&mut self, s: &str) -> EvalResult<String> {
        let v = parser::parse_expr(s, parser::ParseExprOpt::Normal)
            .map_err(|msg| EvalError::fatal(&self.loc, msg))?;
        v.eval(self)
    }

    fn eval_auto(&mut self, kind: AutoKind, suffix: AutoSuffix) -> String {
        let Some(ctx) = self.current_auto.clone() else {
            return String::new();
        };
        let words: Vec<String> = match kind {
            AutoKind::Output => vec![ctx.output.clone()],
            AutoKind::FirstInput => ctx.inputs.first().cloned().into_iter().collect(),
            AutoKind::Inputs => {
                let mut seen = HashSet::new();
                ctx.inputs
                    .iter()
                    .filter(|i| seen.insert(i.as_str()))
                    .cloned()
                    .collect()
            }
            AutoKind::InputsDup => ctx.inputs.clone(),
            AutoKind::Stem => vec![ctx.stem.clone()],
            AutoKind::NewInputs => {
                let out_ts = fileutil::get_timestamp(&ctx.output);
                ctx.inputs
                    .iter()
                    .filter(|i| match (fileutil::get_timestamp(i), out_ts) {
                        (_, None) => true,
                        (None, _) => true,
                        (Some(its), Some(ots)) => its > ots,
                    })
                    .cloned()
                    .collect()
            }
        };
        let mapped: Vec<String> = match suffix {
            AutoSuffix::None => words,
            AutoSuffix::Dir => words.iter().map(|w| dirname(w).to_string()).collect(),
            AutoSuffix::File => words.iter().map(|w| basename_part(w).to_string()).collect(),
        };
        join_words(mapped)
    }

    // ---- scoping ----------------------------------------------------

    /// Runs `f` with an extra scope frame; the frame is popped on every
    /// exit path.
    pub fn with_scope<F, R>(&mut self, vars: Vars, f: F) -> R
    where
        F: FnOnce(&mut Evaluator) -> R,
    {
        self.env.push_frame(vars);
        let r = f(self);
        self.env.pop_frame();
        r
    }

    /// Builds the scope frame for a target from its accumulated
    /// target-specific assignments.
    pub fn materialize_target_scope(&mut self, target: &str) -> EvalResult<Vars> {
        let Some(assigns) = self.rule_vars.get(target).cloned() else {
            return Ok(Vars::new());
        };
        let mut vars = Vars::new();
        for a in assigns {
            let existing: Option<Var> = vars
                .lookup(&a.name)
                .cloned()
                .or_else(|| self.env.lookup(&a.name).cloned());
            let var = match a.op {
                AssignOp::Eq => Var::recursive(VarOrigin::File, a.rhs.clone(), a.orig_rhs.clone()),
                AssignOp::ColonEq => Var::simple(VarOrigin::File, a.rhs.eval(self)?),
                AssignOp::PlusEq => match existing.as_ref().map(|v| &v.payload) {
                    Some(VarPayload::Recursive { value, orig }) => {
                        let appended = Value::List(vec![
                            value.clone(),
                            Value::literal(" "),
                            a.rhs.clone(),
                        ]);
                        Var::recursive(VarOrigin::File, appended, format!("{} {}", orig, a.orig_rhs))
                    }
                    Some(VarPayload::Simple(s)) => {
                        Var::simple(VarOrigin::File, format!("{} {}", s, a.rhs.eval(self)?))
                    }
                    _ => Var::simple(VarOrigin::File, a.rhs.eval(self)?),
                },
                AssignOp::QuestionEq => {
                    let undefined_or_empty = existing
                        .as_ref()
                        .map(|v| v.value_text().is_empty())
                        .unwrap_or(true);
                    if !undefined_or_empty {
                        continue;
                    }
                    Var::recursive(VarOrigin::File, a.rhs.clone(), a.orig_rhs.clone())
                }
            };
            let mut var = var;
            var.loc = Some(a.loc.clone());
            var.readonly = a.is_final;
            vars.assign(&a.name, var);
        }
        Ok(vars)
    }

    pub fn rule_var_targets(&self) -> Vec<String> {
        self.rule_vars.keys().cloned().collect()
    }

    /// Raw frame push/pop for callers whose recursion cannot be expressed
    /// through [`Evaluator::with_scope`]'s closure. Every push must be
    /// paired with a pop on all exit paths.
    pub fn push_scope(&mut self, vars: Vars) {
        self.env.push_frame(vars);
    }

    pub fn pop_scope(&mut self) {
        self.env.pop_frame();
    }

    // ---- accessors used across the pipeline -------------------------

    pub fn loc(&self) -> &Loc {
        &self.loc
    }

    pub fn set_loc(&mut self, loc: Loc) {
        self.loc = loc;
    }

    pub fn peek_var(&self, name: &str) -> Option<&Var> {
        self.env.lookup(name)
    }

    pub fn define_placeholder(&mut self, name: &str) -> &mut Var {
        if self.env.peek_global(name).is_none() {
            let mut v = Var::simple(VarOrigin::Undefined, "");
            v.payload = VarPayload::Undefined;
            self.env.assign_global(name, v);
        }
        self.env.global_mut(name).unwrap()
    }

    pub fn take_rules(&mut self) -> Vec<Rule> {
        std::mem::take(&mut self.rules)
    }

    pub fn first_target(&self) -> Option<&str> {
        self.first_target.as_deref()
    }

    pub fn eval_depth(&self) -> u32 {
        self.eval_depth
    }

    pub fn enter_expansion(&mut self) {
        self.eval_depth += 1;
    }

    pub fn leave_expansion(&mut self) {
        self.eval_depth -= 1;
    }

    pub fn avoid_io(&self) -> bool {
        self.avoid_io
    }

    pub fn set_current_auto(&mut self, ctx: Option<AutoContext>) {
        self.current_auto = ctx;
    }

    pub fn in_command_eval(&self) -> bool {
        self.in_command_eval
    }

    pub fn set_in_command_eval(&mut self, on: bool) {
        self.in_command_eval = on;
    }

    pub fn set_export_deprecated(&mut self, msg: String) {
        self.export_deprecated = Some(msg);
    }

    pub fn set_export_obsolete(&mut self, msg: String) {
        self.export_obsolete = Some(msg);
    }

    /// One-shot warning for intentionally stubbed extension functions.
    pub fn warn_stub(&mut self, name: &'static str) {
        if self.stubs_warned.insert(name) {
            warn!("{}: {} is not fully implemented; returning the default", self.loc, name);
        }
    }

    /// Executes parsed text produced by `$(eval ...)` in the current
    /// scope.
    pub fn eval_text(&mut self, text: &str) -> EvalResult<()> {
        let loc = self.loc.clone();
        let stmts = parser::parse_eval_buf(text, &loc);
        let r = self.eval_stmts(&stmts);
        self.loc = loc;
        r
    }

    // ---- shell ------------------------------------------------------

    pub fn get_shell(&mut self) -> String {
        match self.expand_var("SHELL") {
            Ok(s) if !trim_space(&s).is_empty() => trim_space(&s).to_string(),
            _ => "/bin/sh".to_string(),
        }
    }

    /// The environment additions for spawned shells: every exported
    /// variable, expanded now.
    pub fn collect_exports(&mut self) -> EvalResult<Vec<(String, Option<String>)>> {
        let mut names: Vec<(String, bool)> = Vec::new();
        if self.export_all == Some(true) {
            let globals: Vec<String> = self
                .env
                .globals()
                .iter()
                .filter(|(_, v)| v.origin != VarOrigin::Automatic)
                .map(|(n, _)| n.clone())
                .filter(|n| is_exportable_name(n))
                .collect();
            for n in globals {
                let explicit = self.exports.get(&n).copied();
                names.push((n, explicit.unwrap_or(true)));
            }
        } else {
            for (n, on) in self.exports.clone() {
                names.push((n, on));
            }
        }
        let mut out = Vec::new();
        for (name, on) in names {
            if on {
                let value = self.expand_var(&name)?;
                out.push((name, Some(value)));
            } else {
                out.push((name, None));
            }
        }
        Ok(out)
    }

    /// Runs a command through the configured shell and captures stdout,
    /// with trailing newlines stripped and inner newlines flattened to
    /// spaces, the way `$(shell)` reports output.
    pub fn run_shell(&mut self, cmd: &str) -> EvalResult<String> {
        let shell = self.get_shell();
        let exports = self.collect_exports()?;
        let mut command = Command::new(&shell);
        command
            .arg("-c")
            .arg(cmd)
            .stderr(std::process::Stdio::inherit());
        for (k, v) in exports {
            match v {
                Some(v) => {
                    command.env(k, v);
                }
                None => {
                    command.env_remove(k);
                }
            }
        }
        let output = command.output().map_err(|e| EvalError::Io {
            loc: self.loc.clone(),
            source: e,
        })?;
        debug!("$(shell {}): exited with {:?}", cmd, output.status.code());
        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        while text.ends_with('\n') || text.ends_with('\r') {
            text.pop();
        }
        Ok(text.replace('\n', " "))
    }
}

fn is_exportable_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_')
}
