//! Dependency-graph construction tests: rule merging, pattern and suffix
//! rules, special targets, and cycle handling.

use maku_core::dep::DepBuilder;
use maku_core::parser::parse_buf;
use maku_core::{Evaluator, Flags};

fn evaluate(src: &str) -> Evaluator {
    let mut ev = Evaluator::new(Flags::default());
    let stmts = parse_buf(src, "test.mk");
    ev.eval_stmts(&stmts).expect("evaluation failed");
    ev
}

fn build(src: &str, targets: &[&str]) -> Vec<std::rc::Rc<maku_core::dep::DepNode>> {
    let mut ev = evaluate(src);
    let mut builder = DepBuilder::new(&mut ev).expect("dep init failed");
    let targets: Vec<String> = targets.iter().map(|t| t.to_string()).collect();
    builder.build(&targets).expect("dep build failed")
}

#[test]
fn explicit_rule_graph() {
    let roots = build("all: a b\na:\n\techo a\nb:\n\techo b\n", &["all"]);
    assert_eq!(roots.len(), 1);
    let all = &roots[0];
    assert_eq!(all.output, "all");
    assert!(all.has_rule);
    assert_eq!(all.deps.len(), 2);
    assert_eq!(all.deps[0].0, "a");
    assert_eq!(all.deps[1].0, "b");
    assert_eq!(all.deps[0].1.cmds.len(), 1);
}

#[test]
fn default_target_is_first_non_special() {
    let roots = build(".PHONY: later\nfirst:\n\techo hi\nlater:\n", &[]);
    assert_eq!(roots[0].output, "first");
    assert!(roots[0].is_default_target);
}

#[test]
fn rules_without_commands_contribute_inputs() {
    let roots = build("all: a\nall: b\nall:\n\techo run\n", &["all"]);
    let all = &roots[0];
    assert_eq!(all.actual_inputs, vec!["a", "b"]);
    assert_eq!(all.cmds.len(), 1);
    // a and b have no rules and no files; the nodes exist but are bare.
    assert!(!all.deps[0].1.has_rule);
}

#[test]
fn double_colon_rules_keep_both_recipes() {
    let roots = build("t:: ; echo one\nt:: ; echo two\n", &["t"]);
    assert_eq!(roots[0].cmds.len(), 2);
}

#[test]
fn mixing_colon_kinds_is_fatal() {
    let mut ev = evaluate("t: ; echo one\nt:: ; echo two\n");
    let err = DepBuilder::new(&mut ev).err().expect("expected merge failure");
    assert!(err.to_string().contains("both : and ::"), "got {}", err);
}

#[test]
fn pattern_rule_fills_commands_and_stem() {
    let src = "foo.c:\nfoo.o: extra\n%.o: %.c\n\tcc -c $<\n";
    let roots = build(src, &["foo.o"]);
    let node = &roots[0];
    assert!(node.has_rule);
    assert_eq!(node.output_pattern.as_deref(), Some("%.o"));
    // Pattern inputs come first so $< is foo.c.
    assert_eq!(node.actual_inputs, vec!["foo.c", "extra"]);
}

#[test]
fn newest_matching_pattern_wins() {
    let src = "foo.c:\n%.o: %.c\n\techo old\n%.o: %.c\n\techo new\nfoo.o:\n";
    let roots = build(src, &["foo.o"]);
    let node = &roots[0];
    assert_eq!(node.cmds.len(), 1);
    let cmd = format!("{}", node.cmds[0]);
    assert!(cmd.contains("new"), "got {}", cmd);
}

#[test]
fn pattern_rule_skipped_when_inputs_missing() {
    let src = "%.o: %.nope\n\techo never\nfoo.o:\n";
    let roots = build(src, &["foo.o"]);
    assert!(roots[0].cmds.is_empty());
    assert!(roots[0].output_pattern.is_none());
}

#[test]
fn suffix_rule_desugars_to_pattern() {
    let src = "foo.c:\n.c.o:\n\tcc -c $<\nfoo.o:\n";
    let roots = build(src, &["foo.o"]);
    let node = &roots[0];
    assert_eq!(node.output_pattern.as_deref(), Some("%.o"));
    assert_eq!(node.actual_inputs, vec!["foo.c"]);
}

#[test]
fn cleared_suffixes_disable_suffix_rules() {
    let src = ".SUFFIXES:\nfoo.c:\n.c.o:\n\tcc -c $<\nfoo.o:\n";
    let roots = build(src, &["foo.o"]);
    assert!(roots[0].cmds.is_empty());
}

#[test]
fn phony_and_restat_flags() {
    let src = ".PHONY: all\n.KATI_RESTAT: gen\nall: ; echo a\ngen: ; echo g\n";
    let roots = build(src, &["all", "gen"]);
    assert!(roots[0].is_phony);
    assert!(!roots[0].is_restat);
    assert!(roots[1].is_restat);
}

#[test]
fn order_only_edges_are_separate() {
    let src = "out: in | dir\nin:\ndir:\n";
    let roots = build(src, &["out"]);
    let node = &roots[0];
    assert_eq!(node.deps.len(), 1);
    assert_eq!(node.order_onlys.len(), 1);
    assert_eq!(node.order_onlys[0].0, "dir");
}

#[test]
fn cycle_is_dropped_with_warning() {
    let src = "a: b ; echo a\nb: a ; echo b\n";
    let roots = build(src, &["a"]);
    let a = &roots[0];
    assert_eq!(a.deps.len(), 1);
    let b = &a.deps[0].1;
    // The back edge b -> a was dropped.
    assert!(b.deps.is_empty());
}

#[test]
fn node_is_memoised_per_symbol() {
    let src = "all: x y\nx: shared\ny: shared\nshared:\n";
    let roots = build(src, &["all"]);
    let x_child = &roots[0].deps[0].1.deps[0].1;
    let y_child = &roots[0].deps[1].1.deps[0].1;
    assert!(std::rc::Rc::ptr_eq(x_child, y_child));
}

#[test]
fn target_specific_vars_reach_the_node_scope() {
    let src = "out: CFLAGS := -g\nout: ; echo build\n";
    let roots = build(src, &["out"]);
    let vars = &roots[0].rule_vars;
    assert_eq!(vars.lookup("CFLAGS").unwrap().value_text(), "-g");
}

#[test]
fn validations_become_edges() {
    let src = "out: .KATI_VALIDATIONS := check\nout: ; echo o\ncheck: ; echo c\n";
    let roots = build(src, &["out"]);
    let node = &roots[0];
    assert_eq!(node.actual_validations, vec!["check"]);
    assert_eq!(node.validations.len(), 1);
}

#[test]
fn implicit_outputs_share_the_producer_node() {
    let src = "gen: .KATI_IMPLICIT_OUTPUTS := gen.h\ngen: ; touch gen gen.h\n";
    let roots = build(src, &["gen.h"]);
    assert_eq!(roots[0].output, "gen");
    assert_eq!(roots[0].implicit_outputs, vec!["gen.h"]);
}

#[test]
fn implicit_output_with_own_commands_is_fatal() {
    let src = "gen: .KATI_IMPLICIT_OUTPUTS := other\ngen: ; touch gen other\nother: ; echo own\n";
    let mut ev = evaluate(src);
    let err = DepBuilder::new(&mut ev).err().expect("expected failure");
    assert!(err.to_string().contains("already has commands"), "got {}", err);
}

#[test]
fn ninja_pool_and_tags_come_from_target_vars() {
    let src = "out: .KATI_NINJA_POOL := pool_a\nout: .KATI_TAGS := t1 t2\nout: ; echo o\n";
    let roots = build(src, &["out"]);
    assert_eq!(roots[0].ninja_pool.as_deref(), Some("pool_a"));
    assert_eq!(roots[0].tags, vec!["t1", "t2"]);
}
