//! # maku: a Make-compatible build specification engine
//!
//! maku reads Make-style input files, evaluates them against a mutable
//! variable environment, assembles a rule table, materialises a
//! dependency graph for the requested targets, and runs recipes through a
//! shell.
//!
//! ## Processing Pipeline
//!
//! ```text
//! Source Text → Parser → Statements → Evaluator → Dep Builder → Executor
//! ```
//!
//! ### Stage 1: Parsing
//!
//! The [`parser`] module walks logical lines and produces [`ast`]
//! statements containing lazy [`expr`] values. Nothing is expanded at
//! parse time; `$(...)` constructs become a value tree.
//!
//! ### Stage 2: Evaluation
//!
//! The [`eval`] module executes statements in order: assignments mutate
//! the [`var`] environment, rule lines append to the rule table, and
//! conditionals, includes, and exports run with full access to both. The
//! closed built-in function set lives in [`func`].
//!
//! ### Stage 3: Dependency Building
//!
//! The [`dep`] module merges rules per target, desugars suffix rules,
//! indexes pattern rules in a prefix trie, and lazily builds a memoised
//! DAG of [`dep::DepNode`]s for the requested targets.
//!
//! ### Stage 4: Execution
//!
//! The [`exec`] module walks the DAG bottom-up, decides staleness from
//! file timestamps, expands each node's recipe via [`command`] with the
//! automatic variables in place, and dispatches commands to the shell.
//!
//! ## Errors
//!
//! Syntax problems are preserved as `ParseError` statements so that
//! parsing always reaches the end of the input; they fire only if
//! evaluated. All other failures are typed per stage in [`error`] and
//! carry the originating source location.

pub mod ast;
pub mod command;
pub mod dep;
pub mod error;
pub mod eval;
pub mod exec;
pub mod expr;
pub mod file;
pub mod fileutil;
pub mod flags;
pub mod func;
pub mod loc;
pub mod parser;
pub mod rule;
pub mod strutil;
pub mod var;

// Re-exports
pub use error::{MakuError, Result};
pub use eval::Evaluator;
pub use flags::Flags;
pub use loc::Loc;

#[cfg(test)]
mod tests {
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    #[ctor::ctor]
    fn init_tests() {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(EnvFilter::from_default_env())
            .finish();
        tracing::subscriber::set_global_default(subscriber)
            .expect("Failed to set tracing subscriber");
    }
}
