use std::fmt;
use std::sync::Arc;

/// Source position carried by every statement and diagnostic.
///
/// Make diagnostics are line granular, so a `Loc` is a file name plus a
/// 1-based line number. The file name is shared; cloning a `Loc` while the
/// parser advances through a makefile is free.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Loc {
    pub filename: Arc<str>,
    pub line: u32,
}

impl Loc {
    pub fn new(filename: &str, line: u32) -> Self {
        Self {
            filename: Arc::from(filename),
            line,
        }
    }
}

impl Default for Loc {
    fn default() -> Self {
        Self::new("<unknown>", 0)
    }
}

impl fmt::Display for Loc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.filename, self.line)
    }
}
