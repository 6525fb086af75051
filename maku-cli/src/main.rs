use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use maku_core::ast::Stmt;
use maku_core::dep::DepBuilder;
use maku_core::exec::Executor;
use maku_core::file::MakefileCache;
use maku_core::var::VarOrigin;
use maku_core::{Evaluator, Flags};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "maku", version, about = "A Make-compatible build engine")]
struct Cli {
    /// Makefile to read
    #[arg(short = 'f', long = "file", default_value = "Makefile")]
    file: String,

    /// Change to this directory before reading the makefile
    #[arg(short = 'C', value_name = "DIR")]
    directory: Option<String>,

    /// Number of jobs (recorded; dispatch is serial)
    #[arg(short = 'j', value_name = "N", default_value_t = 1)]
    jobs: usize,

    /// Print commands without executing them
    #[arg(short = 'n')]
    dry_run: bool,

    /// Do not echo commands
    #[arg(short = 's')]
    silent: bool,

    /// Emit a ninja build description instead of executing
    #[arg(long)]
    ninja: bool,

    /// Regenerate only when the inputs changed
    #[arg(long)]
    regen: bool,

    /// Build every explicit target instead of the default one
    #[arg(long = "gen_all_targets")]
    gen_all_targets: bool,

    /// Parse the makefile and report syntax problems, then exit
    #[arg(long = "syntax_check_only")]
    syntax_check_only: bool,

    /// Parse the makefile and exit
    #[arg(long = "parse_only")]
    parse_only: bool,

    /// Do not seed the built-in suffix list
    #[arg(long = "no_builtin_rules")]
    no_builtin_rules: bool,

    /// Verbose engine logging
    #[arg(long = "enable_debug")]
    enable_debug: bool,

    /// Print canonical paths and exit
    #[arg(long, value_name = "PATH", num_args = 1..)]
    realpath: Option<Vec<String>>,

    /// Targets to build, plus NAME=VALUE command line bindings
    targets: Vec<String>,
}

fn init_logging(enable_debug: bool) {
    let filter = if enable_debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.enable_debug);

    if let Some(paths) = &cli.realpath {
        for path in paths {
            match std::fs::canonicalize(path) {
                Ok(p) => println!("{}", p.display()),
                Err(e) => eprintln!("{}: {}", path, e),
            }
        }
        return ExitCode::SUCCESS;
    }

    if cli.ninja || cli.regen {
        eprintln!("maku: ninja generation is not supported by this build");
        return ExitCode::FAILURE;
    }

    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> maku_core::Result<ExitCode> {
    if let Some(dir) = &cli.directory {
        std::env::set_current_dir(Path::new(dir))?;
        debug!("changed directory to {}", dir);
    }

    let (bindings, targets): (Vec<String>, Vec<String>) =
        cli.targets.iter().cloned().partition(|t| t.contains('='));

    let flags = Flags {
        makefile: cli.file.clone(),
        working_dir: cli.directory.clone(),
        num_jobs: cli.jobs,
        is_dry_run: cli.dry_run,
        is_silent_mode: cli.silent,
        generate_ninja: cli.ninja,
        regen: cli.regen,
        gen_all_targets: cli.gen_all_targets,
        is_syntax_check_only: cli.syntax_check_only,
        is_parse_only: cli.parse_only,
        no_builtin_rules: cli.no_builtin_rules,
        enable_debug: cli.enable_debug,
        targets: targets.clone(),
        cl_vars: bindings.clone(),
        ..Flags::default()
    };

    if cli.syntax_check_only || cli.parse_only {
        return syntax_check(&flags.makefile, cli.syntax_check_only);
    }

    let mut ev = Evaluator::new(flags);
    ev.seed_environment();
    for binding in &bindings {
        ev.eval_command_line_binding(binding)?;
    }
    ev.set_var("MAKECMDGOALS", &targets.join(" "), VarOrigin::Automatic);
    ev.load(&cli.file)?;

    let mut builder = DepBuilder::new(&mut ev)?;
    let roots = builder.build(&targets)?;
    drop(builder);
    debug!("dep build done: {} roots", roots.len());

    let mut executor = Executor::new(&ev);
    executor.exec(&mut ev, &roots)?;
    Ok(ExitCode::SUCCESS)
}

/// Parses without evaluating. In syntax-check mode every preserved parse
/// error is reported and the run fails if there were any.
fn syntax_check(makefile: &str, report: bool) -> maku_core::Result<ExitCode> {
    let mut cache = MakefileCache::new();
    let mk = cache.read_makefile(makefile)?;
    if !report {
        return Ok(ExitCode::SUCCESS);
    }
    let mut found = 0;
    let mut stack: Vec<&Stmt> = mk.stmts.iter().collect();
    stack.reverse();
    while let Some(stmt) = stack.pop() {
        match stmt {
            Stmt::ParseError { loc, msg } => {
                eprintln!("{}: {}", loc, msg);
                found += 1;
            }
            Stmt::If {
                true_stmts,
                false_stmts,
                ..
            } => {
                for s in false_stmts.iter().rev() {
                    stack.push(s);
                }
                for s in true_stmts.iter().rev() {
                    stack.push(s);
                }
            }
            _ => {}
        }
    }
    if found > 0 {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}
