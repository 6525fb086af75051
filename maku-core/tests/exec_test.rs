//! Executor tests: staleness decisions, command dispatch, ignore-error
//! and dry-run semantics, observed through filesystem side effects.

use std::fs;
use std::rc::Rc;

use maku_core::dep::{DepBuilder, DepNode};
use maku_core::exec::Executor;
use maku_core::parser::parse_buf;
use maku_core::{Evaluator, Flags};

struct Fixture {
    dir: tempfile::TempDir,
}

impl Fixture {
    fn new() -> Fixture {
        Fixture {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    fn path(&self, name: &str) -> String {
        self.dir.path().join(name).to_string_lossy().into_owned()
    }

    fn write(&self, name: &str, content: &str) {
        fs::write(self.path(name), content).unwrap();
    }

    fn read(&self, name: &str) -> String {
        fs::read_to_string(self.path(name)).unwrap_or_default()
    }

    fn run(&self, makefile_src: &str, targets: &[&str], flags: Flags) -> maku_core::Result<()> {
        let mut ev = Evaluator::new(flags);
        let stmts = parse_buf(makefile_src, "test.mk");
        ev.eval_stmts(&stmts)?;
        let mut builder = DepBuilder::new(&mut ev)?;
        let targets: Vec<String> = targets.iter().map(|t| t.to_string()).collect();
        let roots: Vec<Rc<DepNode>> = builder.build(&targets)?;
        drop(builder);
        let mut executor = Executor::new(&ev);
        executor.exec(&mut ev, &roots)
    }
}

#[test]
fn commands_run_in_dependency_order() {
    let f = Fixture::new();
    let log = f.path("log");
    let src = format!(
        "all: {a} {b}\n\t@echo all >> {log}\n{a}:\n\t@echo a >> {log}\n{b}:\n\t@echo b >> {log}\n",
        a = f.path("a"),
        b = f.path("b"),
        log = log
    );
    f.run(&src, &[], Flags::default()).unwrap();
    assert_eq!(f.read("log"), "a\nb\nall\n");
}

#[test]
fn up_to_date_target_is_skipped() {
    let f = Fixture::new();
    let out = f.path("out");
    let dep = f.path("dep");
    f.write("dep", "x");
    let src = format!("{out}: {dep}\n\t@echo ran >> {log}\n", log = f.path("log"));
    f.run(&src, &[], Flags::default()).unwrap();
    assert_eq!(f.read("log"), "ran\n");
    // The recipe did not create its output, so a second run fires again.
    f.run(&src, &[], Flags::default()).unwrap();
    assert_eq!(f.read("log"), "ran\nran\n");

    // Now create the output newer than the dep; nothing should run.
    f.write("out", "built");
    f.run(&src, &[], Flags::default()).unwrap();
    assert_eq!(f.read("log"), "ran\nran\n");
}

#[test]
fn phony_targets_always_run() {
    let f = Fixture::new();
    let t = f.path("always");
    f.write("always", "exists");
    let src = format!(".PHONY: {t}\n{t}:\n\t@echo ran >> {log}\n", log = f.path("log"));
    f.run(&src, &[], Flags::default()).unwrap();
    assert_eq!(f.read("log"), "ran\n");
}

#[test]
fn ignore_error_continues() {
    let f = Fixture::new();
    let src = format!(
        "all:\n\t-@false\n\t@echo after >> {log}\n",
        log = f.path("log")
    );
    f.run(&src, &[], Flags::default()).unwrap();
    assert_eq!(f.read("log"), "after\n");
}

#[test]
fn failing_command_aborts() {
    let f = Fixture::new();
    let src = format!(
        "all:\n\t@false\n\t@echo after >> {log}\n",
        log = f.path("log")
    );
    let err = f.run(&src, &[], Flags::default()).unwrap_err();
    assert!(err.to_string().contains("Error 1"), "got {}", err);
    assert_eq!(f.read("log"), "");
}

#[test]
fn dry_run_executes_nothing() {
    let f = Fixture::new();
    let src = format!("all:\n\t@echo ran >> {log}\n", log = f.path("log"));
    let flags = Flags {
        is_dry_run: true,
        ..Flags::default()
    };
    f.run(&src, &[], flags).unwrap();
    assert_eq!(f.read("log"), "");
}

#[test]
fn order_only_dep_skipped_when_present() {
    let f = Fixture::new();
    let dir_marker = f.path("marker");
    f.write("marker", "exists");
    let src = format!(
        "all: | {m}\n\t@echo main >> {log}\n{m}:\n\t@echo marker >> {log}\n",
        m = dir_marker,
        log = f.path("log")
    );
    f.run(&src, &[], Flags::default()).unwrap();
    assert_eq!(f.read("log"), "main\n");
}

#[test]
fn missing_target_without_rule_fails() {
    let f = Fixture::new();
    let src = format!("all: {missing}\n\t@echo hi\n", missing = f.path("missing"));
    let err = f.run(&src, &[], Flags::default()).unwrap_err();
    assert!(err.to_string().contains("No rule to make target"), "got {}", err);
}

#[test]
fn existing_file_without_rule_is_fine() {
    let f = Fixture::new();
    f.write("present", "x");
    let src = format!(
        "all: {p}\n\t@echo ok >> {log}\n",
        p = f.path("present"),
        log = f.path("log")
    );
    f.run(&src, &[], Flags::default()).unwrap();
    assert_eq!(f.read("log"), "ok\n");
}

#[test]
fn automatic_variables_in_recipes() {
    let f = Fixture::new();
    let out = f.path("out");
    let in1 = f.path("in1");
    let in2 = f.path("in2");
    f.write("in1", "1");
    f.write("in2", "2");
    let src = format!(
        "{out}: {in1} {in2} {in1}\n\t@echo '$@|$<|$^|$+' > {out}\n",
        out = out,
        in1 = in1,
        in2 = in2
    );
    f.run(&src, &[], Flags::default()).unwrap();
    let got = f.read("out");
    let expected = format!("{out}|{in1}|{in1} {in2}|{in1} {in2} {in1}\n");
    assert_eq!(got, expected);
}

#[test]
fn stem_variable_for_pattern_rules() {
    let f = Fixture::new();
    // Work with cwd-relative paths inside the temp dir via a cd in the
    // recipe; the stem is what matters here.
    f.write("thing.c", "src");
    let dir = f.dir.path().to_string_lossy().into_owned();
    let src = format!(
        "%.o: %.c\n\t@cd {dir} && echo '$*' > stem.txt\n{t}:\n",
        dir = dir,
        t = f.path("thing.c")
    );
    // Request the .o through an absolute path so the pattern matches the
    // temp file.
    let target = f.path("thing.o");
    let src = src.replace("%.o: %.c", &format!("{}/%.o: {}/%.c", dir, dir));
    f.run(&src, &[&target], Flags::default()).unwrap();
    assert_eq!(f.read("stem.txt"), "thing\n");
}

#[test]
fn double_colon_runs_every_recipe() {
    let f = Fixture::new();
    let src = format!(
        "all::\n\t@echo one >> {log}\nall::\n\t@echo two >> {log}\n",
        log = f.path("log")
    );
    f.run(&src, &[], Flags::default()).unwrap();
    assert_eq!(f.read("log"), "one\ntwo\n");
}

#[test]
fn target_specific_variable_in_recipe() {
    let f = Fixture::new();
    let src = format!(
        "GLOBAL := base\nall: GLOBAL += extra\nall:\n\t@echo \"$(GLOBAL)\" > {log}\n",
        log = f.path("log")
    );
    f.run(&src, &[], Flags::default()).unwrap();
    assert_eq!(f.read("log"), "base extra\n");
}

#[test]
fn multiline_define_recipe_splits_into_commands() {
    let f = Fixture::new();
    let src = format!(
        "define two\n@echo first >> {log}\n@echo second >> {log}\nendef\nall:\n\t$(two)\n",
        log = f.path("log")
    );
    f.run(&src, &[], Flags::default()).unwrap();
    assert_eq!(f.read("log"), "first\nsecond\n");
}
