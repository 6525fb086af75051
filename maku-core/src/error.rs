use thiserror::Error;

use crate::loc::Loc;

/// Expansion and statement-evaluation failures. Every variant carries the
/// location of the statement being evaluated when the failure surfaced.
#[derive(Error, Debug)]
pub enum EvalError {
    /// A make-level fatal diagnostic; the message carries its own `***`
    /// prefix so `$(error)` text and parse errors print verbatim.
    #[error("{loc}: {message}")]
    Fatal { loc: Loc, message: String },

    #[error("{loc}: *** insufficient number of arguments ({found}) to function `{name}'.")]
    Arity {
        loc: Loc,
        name: &'static str,
        found: usize,
    },

    #[error("{loc}: *** non-numeric first argument to `{name}' function: '{arg}'.")]
    NonNumeric {
        loc: Loc,
        name: &'static str,
        arg: String,
    },

    #[error("{loc}: *** Recursive variable \"{name}\" references itself (eventually).")]
    SelfReference { loc: Loc, name: String },

    #[error("{loc}: *** cannot read obsolete variable `{name}'{}", fmt_note(.note))]
    ObsoleteVar {
        loc: Loc,
        name: String,
        note: Option<String>,
    },

    #[error("{loc}: *** variable `{name}' is not visible from {path}")]
    Visibility { loc: Loc, name: String, path: String },

    #[error("{loc}: {source}")]
    Io {
        loc: Loc,
        #[source]
        source: std::io::Error,
    },
}

fn fmt_note(note: &Option<String>) -> String {
    match note {
        Some(n) => format!(": {}", n),
        None => String::new(),
    }
}

impl EvalError {
    pub fn fatal(loc: &Loc, message: impl Into<String>) -> Self {
        EvalError::Fatal {
            loc: loc.clone(),
            message: message.into(),
        }
    }

    pub fn loc(&self) -> &Loc {
        match self {
            EvalError::Fatal { loc, .. }
            | EvalError::Arity { loc, .. }
            | EvalError::NonNumeric { loc, .. }
            | EvalError::SelfReference { loc, .. }
            | EvalError::ObsoleteVar { loc, .. }
            | EvalError::Visibility { loc, .. }
            | EvalError::Io { loc, .. } => loc,
        }
    }
}

pub type EvalResult<T> = std::result::Result<T, EvalError>;

/// Rule-table and dependency-graph construction failures.
#[derive(Error, Debug)]
pub enum DepError {
    #[error("{loc}: *** target file `{target}' has both : and :: entries.")]
    MixedRules { loc: Loc, target: String },

    #[error("{loc}: *** implicit output `{output}' on phony target `{target}'.")]
    ImplicitOutputOnPhony {
        loc: Loc,
        output: String,
        target: String,
    },

    #[error("{loc}: *** implicit output `{output}' of `{target}' already has commands.")]
    ImplicitOutputHasCommands {
        loc: Loc,
        output: String,
        target: String,
    },

    #[error("*** multiple target patterns for `{target}'.")]
    MultipleOutputPatterns { target: String },
}

pub type DepResult<T> = std::result::Result<T, DepError>;

/// Command execution failures.
#[derive(Error, Debug)]
pub enum ExecError {
    #[error("*** [{target}] Error {status}")]
    CommandFailed { target: String, status: i32 },

    #[error("*** No rule to make target `{target}'{}", fmt_needed_by(.needed_by))]
    NoRule {
        target: String,
        needed_by: Option<String>,
    },

    #[error("command for `{target}' failed to spawn: {source}")]
    Spawn {
        target: String,
        #[source]
        source: std::io::Error,
    },
}

fn fmt_needed_by(needed_by: &Option<String>) -> String {
    match needed_by {
        Some(p) => format!(", needed by `{}'.", p),
        None => ".".to_string(),
    }
}

/// Top-level error for the engine pipeline.
#[derive(Error, Debug)]
pub enum MakuError {
    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error(transparent)]
    Dep(#[from] DepError),

    #[error(transparent)]
    Exec(#[from] ExecError),

    #[error("{0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MakuError>;
