//! Dependency-graph construction.
//!
//! Rules accumulated by the evaluator are merged per target, suffix rules
//! are desugared into pattern rules, and pattern rules are indexed in a
//! prefix trie. Nodes are then built lazily for the requested targets,
//! memoised per output symbol, with rule-graph cycles reported and the
//! back edge dropped.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use tracing::{debug, warn};

use crate::error::{DepError, DepResult, MakuError, Result};
use crate::eval::Evaluator;
use crate::expr::Value;
use crate::fileutil;
use crate::loc::Loc;
use crate::rule::Rule;
use crate::strutil::{Pattern, WordScanner};
use crate::var::Vars;

/// One node of the dependency DAG, keyed by its output symbol.
#[derive(Debug)]
pub struct DepNode {
    pub output: String,
    pub has_rule: bool,
    pub is_phony: bool,
    pub is_restat: bool,
    pub is_default_target: bool,
    pub rule_vars: Vars,
    pub cmds: Vec<Value>,
    pub actual_inputs: Vec<String>,
    pub actual_order_only_inputs: Vec<String>,
    pub actual_validations: Vec<String>,
    pub implicit_outputs: Vec<String>,
    pub deps: Vec<(String, Rc<DepNode>)>,
    pub order_onlys: Vec<(String, Rc<DepNode>)>,
    pub validations: Vec<(String, Rc<DepNode>)>,
    pub output_pattern: Option<String>,
    pub depfile: Option<String>,
    pub ninja_pool: Option<String>,
    pub tags: Vec<String>,
    pub loc: Loc,
    pub cmd_lineno: u32,
}

impl DepNode {
    fn new(output: &str) -> DepNode {
        DepNode {
            output: output.to_string(),
            has_rule: false,
            is_phony: false,
            is_restat: false,
            is_default_target: false,
            rule_vars: Vars::new(),
            cmds: Vec::new(),
            actual_inputs: Vec::new(),
            actual_order_only_inputs: Vec::new(),
            actual_validations: Vec::new(),
            implicit_outputs: Vec::new(),
            deps: Vec::new(),
            order_onlys: Vec::new(),
            validations: Vec::new(),
            output_pattern: None,
            depfile: None,
            ninja_pool: None,
            tags: Vec::new(),
            loc: Loc::default(),
            cmd_lineno: 0,
        }
    }
}

#[derive(Debug, Default)]
struct RuleMerger {
    /// Indices into the rule table, in declaration order.
    rules: Vec<usize>,
    primary_rule: Option<usize>,
    is_double_colon: bool,
}

impl RuleMerger {
    fn add_rule(
        &mut self,
        target: &str,
        idx: usize,
        rule: &Rule,
        warn_overriding: bool,
    ) -> DepResult<()> {
        if !self.rules.is_empty() && self.is_double_colon != rule.is_double_colon {
            return Err(DepError::MixedRules {
                loc: rule.loc.clone(),
                target: target.to_string(),
            });
        }
        self.is_double_colon = rule.is_double_colon;
        if !rule.is_double_colon && !rule.cmds.is_empty() {
            if let Some(_old) = self.primary_rule {
                if warn_overriding {
                    warn!(
                        "{}: warning: overriding commands for target `{}'",
                        rule.loc, target
                    );
                }
            }
            self.primary_rule = Some(idx);
        }
        self.rules.push(idx);
        Ok(())
    }
}

/// Pattern rules indexed by the literal prefix before `%`. Each trie node
/// stores the entries whose prefix ends there, together with the text
/// after the `%`.
#[derive(Debug, Default)]
struct RuleTrieNode {
    children: HashMap<u8, RuleTrieNode>,
    /// `(suffix after %, rule index)` in insertion order.
    entries: Vec<(String, usize)>,
}

#[derive(Debug, Default)]
struct RuleTrie {
    root: RuleTrieNode,
}

impl RuleTrie {
    fn add(&mut self, pattern: &str, idx: usize) {
        let Some(p) = pattern.find('%') else {
            return;
        };
        let mut node = &mut self.root;
        for &b in pattern[..p].as_bytes() {
            node = node.children.entry(b).or_default();
        }
        node.entries.push((pattern[p + 1..].to_string(), idx));
    }

    /// Candidates for a target, in trie-encounter order (shallower
    /// prefixes first, insertion order within a node).
    fn lookup(&self, target: &str) -> Vec<usize> {
        let mut found = Vec::new();
        let mut node = &self.root;
        let bytes = target.as_bytes();
        let mut depth = 0;
        loop {
            for (suffix, idx) in &node.entries {
                let rest = &target[depth..];
                if rest.len() >= suffix.len() && rest.ends_with(suffix.as_str()) {
                    found.push(*idx);
                }
            }
            if depth >= bytes.len() {
                break;
            }
            match node.children.get(&bytes[depth]) {
                Some(child) => node = child,
                None => break,
            }
            depth += 1;
        }
        found
    }
}

enum NodeState {
    Processing,
    Done(Rc<DepNode>),
}

/// Suffixes GNU make recognises by default for old-fashioned suffix
/// rules.
const DEFAULT_SUFFIXES: &[&str] = &[
    ".out", ".a", ".ln", ".o", ".c", ".cc", ".C", ".cpp", ".p", ".f", ".F", ".m", ".r", ".y",
    ".l", ".ym", ".lm", ".s", ".S", ".mod", ".sym", ".def", ".h", ".info", ".dvi", ".tex",
    ".texinfo", ".texi", ".txinfo", ".w", ".ch", ".web", ".sh", ".elc", ".el",
];

const SPECIAL_TARGETS: &[&str] = &[
    ".PHONY",
    ".KATI_RESTAT",
    ".SUFFIXES",
    ".KATI_DEPFILE",
    ".KATI_IMPLICIT_OUTPUTS",
    ".KATI_NINJA_POOL",
    ".KATI_VALIDATIONS",
    ".KATI_TAGS",
];

pub struct DepBuilder<'a> {
    ev: &'a mut Evaluator,
    rules: Vec<Rule>,
    rule_mergers: HashMap<String, RuleMerger>,
    implicit_rules: RuleTrie,
    suffixes: HashSet<String>,
    phony: HashSet<String>,
    restat: HashSet<String>,
    /// Implicit output symbol -> the target whose commands produce it.
    implicit_parent: HashMap<String, String>,
    done: HashMap<String, NodeState>,
    first_target: Option<String>,
}

impl<'a> DepBuilder<'a> {
    pub fn new(ev: &'a mut Evaluator) -> Result<DepBuilder<'a>> {
        let rules = ev.take_rules();
        let first_target = ev.first_target().map(str::to_string);
        let mut builder = DepBuilder {
            ev,
            rules,
            rule_mergers: HashMap::new(),
            implicit_rules: RuleTrie::default(),
            suffixes: HashSet::new(),
            phony: HashSet::new(),
            restat: HashSet::new(),
            implicit_parent: HashMap::new(),
            done: HashMap::new(),
            first_target,
        };
        if !builder.ev.flags.no_builtin_rules {
            for s in DEFAULT_SUFFIXES {
                builder.suffixes.insert(s.to_string());
            }
        }
        builder.populate_rules()?;
        builder.register_implicit_outputs()?;
        Ok(builder)
    }

    fn populate_rules(&mut self) -> Result<()> {
        let warn_overriding = self.ev.flags.warn_overriding_commands;
        for idx in 0..self.rules.len() {
            let rule = self.rules[idx].clone();
            if rule.outputs.iter().any(|o| SPECIAL_TARGETS.contains(&o.as_str())) {
                self.populate_special_target(&rule);
                continue;
            }
            if !rule.output_patterns.is_empty() {
                for pat in &rule.output_patterns {
                    self.implicit_rules.add(pat, idx);
                }
                continue;
            }
            if let Some((input_pat, output_pat)) = self.desugar_suffix_rule(&rule) {
                let r = &mut self.rules[idx];
                r.outputs.clear();
                r.output_patterns = vec![output_pat.clone()];
                r.inputs = vec![input_pat];
                r.is_suffix_rule = true;
                self.implicit_rules.add(&output_pat, idx);
                continue;
            }
            for output in &rule.outputs {
                self.rule_mergers
                    .entry(output.clone())
                    .or_default()
                    .add_rule(output, idx, &rule, warn_overriding)
                    .map_err(MakuError::Dep)?;
            }
        }
        Ok(())
    }

    fn populate_special_target(&mut self, rule: &Rule) {
        for output in &rule.outputs {
            match output.as_str() {
                ".PHONY" => self.phony.extend(rule.inputs.iter().cloned()),
                ".KATI_RESTAT" => self.restat.extend(rule.inputs.iter().cloned()),
                ".SUFFIXES" => {
                    if rule.inputs.is_empty() {
                        self.suffixes.clear();
                    } else {
                        self.suffixes.extend(rule.inputs.iter().cloned());
                    }
                }
                _ => debug!("{}: ignoring special target {}", rule.loc, output),
            }
        }
    }

    /// `.X.Y:` with both suffixes recognised becomes `%.Y: %.X`.
    fn desugar_suffix_rule(&self, rule: &Rule) -> Option<(String, String)> {
        if rule.outputs.len() != 1 || !rule.inputs.is_empty() || rule.is_double_colon {
            return None;
        }
        let output = &rule.outputs[0];
        if !output.starts_with('.') || output.contains('/') {
            return None;
        }
        let second_dot = output[1..].find('.').map(|i| i + 1)?;
        let from = &output[..second_dot];
        let to = &output[second_dot..];
        if to[1..].contains('.') {
            return None;
        }
        if !self.suffixes.contains(from) || !self.suffixes.contains(to) {
            return None;
        }
        Some((format!("%{}", from), format!("%{}", to)))
    }

    /// Reads every target's `.KATI_IMPLICIT_OUTPUTS` up front so that an
    /// implicit output can be requested before its producer.
    fn register_implicit_outputs(&mut self) -> Result<()> {
        for target in self.ev.rule_var_targets() {
            let scope = self.ev.materialize_target_scope(&target)?;
            self.ev.push_scope(scope);
            let outputs = self.ev.expand_var(".KATI_IMPLICIT_OUTPUTS");
            self.ev.pop_scope();
            let outputs = outputs?;
            for output in WordScanner::new(&outputs) {
                if self.phony.contains(&target) {
                    return Err(MakuError::Dep(DepError::ImplicitOutputOnPhony {
                        loc: Loc::default(),
                        output: output.to_string(),
                        target: target.clone(),
                    }));
                }
                if let Some(m) = self.rule_mergers.get(output) {
                    if m.primary_rule.is_some() {
                        return Err(MakuError::Dep(DepError::ImplicitOutputHasCommands {
                            loc: Loc::default(),
                            output: output.to_string(),
                            target: target.clone(),
                        }));
                    }
                }
                self.implicit_parent
                    .insert(output.to_string(), target.clone());
            }
        }
        Ok(())
    }

    /// Builds nodes for the requested targets; with none requested, the
    /// first explicit target declared is used.
    pub fn build(&mut self, targets: &[String]) -> Result<Vec<Rc<DepNode>>> {
        let mut requested: Vec<String> = targets.to_vec();
        if requested.is_empty() {
            if self.ev.flags.gen_all_targets {
                let mut all: Vec<String> = self.rule_mergers.keys().cloned().collect();
                all.sort();
                requested = all;
            } else {
                match &self.first_target {
                    Some(t) => requested.push(t.clone()),
                    None => {
                        return Err(MakuError::Eval(crate::error::EvalError::fatal(
                            &Loc::default(),
                            "*** No targets.",
                        )));
                    }
                }
            }
        }
        let mut roots = Vec::new();
        for target in &requested {
            if let Some(node) = self.build_plan(target, "")? {
                roots.push(node);
            }
        }
        Ok(roots)
    }

    fn build_plan(&mut self, target: &str, needed_by: &str) -> Result<Option<Rc<DepNode>>> {
        match self.done.get(target) {
            Some(NodeState::Processing) => {
                eprintln!(
                    "Circular {} <- {} dependency dropped.",
                    needed_by, target
                );
                return Ok(None);
            }
            Some(NodeState::Done(n)) => return Ok(Some(n.clone())),
            None => {}
        }
        self.done
            .insert(target.to_string(), NodeState::Processing);

        if let Some(parent) = self.implicit_parent.get(target).cloned() {
            if parent != target {
                let node = self.build_plan(&parent, needed_by)?;
                match node {
                    Some(n) => {
                        self.done
                            .insert(target.to_string(), NodeState::Done(n.clone()));
                        return Ok(Some(n));
                    }
                    None => {
                        self.done.remove(target);
                        return Ok(None);
                    }
                }
            }
        }

        let mut node = DepNode::new(target);
        node.is_phony = self.phony.contains(target);
        node.is_restat = self.restat.contains(target);
        node.is_default_target = self.first_target.as_deref() == Some(target);

        self.apply_rules(target, &mut node)?;

        let scope = self.ev.materialize_target_scope(target)?;
        node.rule_vars = scope.clone();
        self.ev.push_scope(scope);
        let result = self.build_children(&mut node);
        self.ev.pop_scope();
        result?;

        debug!(
            "node {}: {} deps, {} cmds{}",
            node.output,
            node.deps.len(),
            node.cmds.len(),
            if node.is_phony { " (phony)" } else { "" }
        );
        let node = Rc::new(node);
        self.done
            .insert(target.to_string(), NodeState::Done(node.clone()));
        Ok(Some(node))
    }

    fn apply_rules(&mut self, target: &str, node: &mut DepNode) -> Result<()> {
        let mut has_explicit_cmds = false;
        if let Some(merger) = self.rule_mergers.get(target) {
            node.has_rule = true;
            if merger.is_double_colon {
                for &idx in &merger.rules {
                    let rule = &self.rules[idx];
                    node.cmds.extend(rule.cmds.iter().cloned());
                    node.actual_inputs.extend(rule.inputs.iter().cloned());
                    node.actual_order_only_inputs
                        .extend(rule.order_only_inputs.iter().cloned());
                    if node.cmd_lineno == 0 {
                        node.cmd_lineno = rule.cmd_lineno;
                    }
                }
                if let Some(&idx) = merger.rules.first() {
                    node.loc = self.rules[idx].loc.clone();
                }
                has_explicit_cmds = !node.cmds.is_empty();
            } else {
                for &idx in &merger.rules {
                    let rule = &self.rules[idx];
                    node.actual_inputs.extend(rule.inputs.iter().cloned());
                    node.actual_order_only_inputs
                        .extend(rule.order_only_inputs.iter().cloned());
                    if node.loc.line == 0 {
                        node.loc = rule.loc.clone();
                    }
                }
                if let Some(idx) = merger.primary_rule {
                    let rule = &self.rules[idx];
                    node.cmds = rule.cmds.clone();
                    node.loc = rule.loc.clone();
                    node.cmd_lineno = rule.cmd_lineno;
                    has_explicit_cmds = true;
                }
            }
        }
        if !has_explicit_cmds {
            self.apply_implicit_rule(target, node)?;
        }
        Ok(())
    }

    /// Walks pattern-rule candidates newest-first and applies the first
    /// whose inputs are all present or producible.
    fn apply_implicit_rule(&mut self, target: &str, node: &mut DepNode) -> Result<()> {
        let candidates = self.implicit_rules.lookup(target);
        for &idx in candidates.iter().rev() {
            let rule = &self.rules[idx];
            if rule.output_patterns.len() != 1 {
                return Err(MakuError::Dep(DepError::MultipleOutputPatterns {
                    target: target.to_string(),
                }));
            }
            let pattern = Pattern::new(&rule.output_patterns[0]);
            let Some(stem) = pattern.matches(target) else {
                continue;
            };
            let inputs: Vec<String> = rule
                .inputs
                .iter()
                .map(|i| match i.find('%') {
                    Some(p) => format!("{}{}{}", &i[..p], stem, &i[p + 1..]),
                    None => i.clone(),
                })
                .collect();
            if !inputs.iter().all(|i| self.is_producible(i)) {
                continue;
            }
            node.has_rule = true;
            node.output_pattern = Some(rule.output_patterns[0].clone());
            node.cmds = rule.cmds.clone();
            if node.loc.line == 0 {
                node.loc = rule.loc.clone();
            }
            node.cmd_lineno = rule.cmd_lineno;
            // Pattern inputs come first so `$<` names the pattern's own
            // prerequisite.
            let mut all_inputs = inputs;
            all_inputs.extend(std::mem::take(&mut node.actual_inputs));
            node.actual_inputs = all_inputs;
            let order_only: Vec<String> = rule
                .order_only_inputs
                .iter()
                .map(|i| match i.find('%') {
                    Some(p) => format!("{}{}{}", &i[..p], stem, &i[p + 1..]),
                    None => i.clone(),
                })
                .collect();
            node.actual_order_only_inputs.extend(order_only);
            return Ok(());
        }
        Ok(())
    }

    fn is_producible(&self, input: &str) -> bool {
        self.rule_mergers.contains_key(input)
            || self.phony.contains(input)
            || self.implicit_parent.contains_key(input)
            || fileutil::exists(input)
    }

    fn build_children(&mut self, node: &mut DepNode) -> Result<()> {
        node.depfile = self.expand_optional_var(".KATI_DEPFILE")?;
        node.ninja_pool = self.expand_optional_var(".KATI_NINJA_POOL")?;
        if let Some(tags) = self.expand_optional_var(".KATI_TAGS")? {
            node.tags = WordScanner::new(&tags).map(str::to_string).collect();
        }
        if let Some(outs) = self.expand_optional_var(".KATI_IMPLICIT_OUTPUTS")? {
            node.implicit_outputs = WordScanner::new(&outs).map(str::to_string).collect();
        }
        if let Some(validations) = self.expand_optional_var(".KATI_VALIDATIONS")? {
            node.actual_validations = WordScanner::new(&validations)
                .map(str::to_string)
                .collect();
        }

        let inputs = node.actual_inputs.clone();
        for input in inputs {
            if let Some(child) = self.build_plan(&input, &node.output)? {
                node.deps.push((input, child));
            }
        }
        let order_onlys = node.actual_order_only_inputs.clone();
        for input in order_onlys {
            if let Some(child) = self.build_plan(&input, &node.output)? {
                node.order_onlys.push((input, child));
            }
        }
        let validations = node.actual_validations.clone();
        for v in validations {
            if let Some(child) = self.build_plan(&v, &node.output)? {
                node.validations.push((v, child));
            }
        }
        Ok(())
    }

    fn expand_optional_var(&mut self, name: &str) -> Result<Option<String>> {
        let text = self.ev.expand_var(name)?;
        let text = crate::strutil::trim_space(&text);
        if text.is_empty() {
            Ok(None)
        } else {
            Ok(Some(text.to_string()))
        }
    }
}
