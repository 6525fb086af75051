use core::fmt;
use std::collections::HashMap;

use crate::expr::Value;
use crate::loc::Loc;

/// Where a binding came from, in `$(origin)` vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarOrigin {
    Undefined,
    Default,
    Environment,
    EnvironmentOverride,
    File,
    CommandLine,
    Override,
    Automatic,
}

impl fmt::Display for VarOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VarOrigin::Undefined => "undefined",
            VarOrigin::Default => "default",
            VarOrigin::Environment => "environment",
            VarOrigin::EnvironmentOverride => "environment override",
            VarOrigin::File => "file",
            VarOrigin::CommandLine => "command line",
            VarOrigin::Override => "override",
            VarOrigin::Automatic => "automatic",
        };
        write!(f, "{}", s)
    }
}

/// The automatic variables, plus the `D`/`F` word-wise modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoKind {
    /// `$@` - the output being built.
    Output,
    /// `$<` - the first actual input.
    FirstInput,
    /// `$^` - all inputs, deduplicated, order preserved.
    Inputs,
    /// `$+` - all inputs, duplicates kept.
    InputsDup,
    /// `$*` - the stem matched by `%`.
    Stem,
    /// `$?` - inputs newer than the output.
    NewInputs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoSuffix {
    None,
    /// `$(@D)` style: dirname of each word.
    Dir,
    /// `$(@F)` style: basename of each word.
    File,
}

#[derive(Debug, Clone)]
pub enum VarPayload {
    /// Placeholder for a name that only carries metadata (a deprecation
    /// mark, a visibility prefix) and has never been assigned.
    Undefined,
    Simple(String),
    Recursive { value: Value, orig: String },
    Automatic { kind: AutoKind, suffix: AutoSuffix },
}

/// `$(flavor)` vocabulary. Automatic variables report as simple: their
/// value is a plain string computed from the node being built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flavor {
    Undefined,
    Simple,
    Recursive,
}

impl fmt::Display for Flavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Flavor::Undefined => "undefined",
            Flavor::Simple => "simple",
            Flavor::Recursive => "recursive",
        };
        write!(f, "{}", s)
    }
}

/// One variable binding.
#[derive(Debug, Clone)]
pub struct Var {
    pub payload: VarPayload,
    pub origin: VarOrigin,
    pub loc: Option<Loc>,
    pub readonly: bool,
    pub deprecated: Option<String>,
    pub obsolete: Option<String>,
    /// Allowed makefile path prefixes; empty means visible everywhere.
    pub visibility: Vec<String>,
}

impl Var {
    pub fn simple(origin: VarOrigin, value: impl Into<String>) -> Var {
        Var {
            payload: VarPayload::Simple(value.into()),
            origin,
            loc: None,
            readonly: false,
            deprecated: None,
            obsolete: None,
            visibility: Vec::new(),
        }
    }

    pub fn recursive(origin: VarOrigin, value: Value, orig: impl Into<String>) -> Var {
        Var {
            payload: VarPayload::Recursive {
                value,
                orig: orig.into(),
            },
            origin,
            loc: None,
            readonly: false,
            deprecated: None,
            obsolete: None,
            visibility: Vec::new(),
        }
    }

    pub fn automatic(kind: AutoKind, suffix: AutoSuffix) -> Var {
        Var {
            payload: VarPayload::Automatic { kind, suffix },
            origin: VarOrigin::Automatic,
            loc: None,
            readonly: true,
            deprecated: None,
            obsolete: None,
            visibility: Vec::new(),
        }
    }

    pub fn flavor(&self) -> Flavor {
        match &self.payload {
            VarPayload::Undefined => Flavor::Undefined,
            VarPayload::Simple(_) | VarPayload::Automatic { .. } => Flavor::Simple,
            VarPayload::Recursive { .. } => Flavor::Recursive,
        }
    }

    /// The text `$(value NAME)` reports: the stored string for a simple
    /// var, the unexpanded right-hand side for a recursive one.
    pub fn value_text(&self) -> &str {
        match &self.payload {
            VarPayload::Undefined => "",
            VarPayload::Simple(s) => s,
            VarPayload::Recursive { orig, .. } => orig,
            VarPayload::Automatic { .. } => "",
        }
    }
}

/// A flat symbol-to-binding map. The global environment is one of these;
/// `$(call)` and `$(foreach)` frames are more of them stacked on top.
#[derive(Debug, Default, Clone)]
pub struct Vars {
    map: HashMap<String, Var>,
}

impl Vars {
    pub fn new() -> Vars {
        Vars::default()
    }

    pub fn lookup(&self, name: &str) -> Option<&Var> {
        self.map.get(name)
    }

    pub fn lookup_mut(&mut self, name: &str) -> Option<&mut Var> {
        self.map.get_mut(name)
    }

    /// Installs a binding. Readonly existing bindings win; the caller is
    /// told the assignment was rejected and nothing else happens.
    pub fn assign(&mut self, name: &str, var: Var) -> bool {
        if let Some(existing) = self.map.get(name) {
            if existing.readonly {
                return true;
            }
        }
        self.map.insert(name.to_string(), var);
        false
    }

    pub fn remove(&mut self, name: &str) -> Option<Var> {
        self.map.remove(name)
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Var)> {
        self.map.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readonly_rejects_assignment() {
        let mut vars = Vars::new();
        let mut v = Var::simple(VarOrigin::File, "one");
        v.readonly = true;
        assert!(!vars.assign("X", v));
        assert!(vars.assign("X", Var::simple(VarOrigin::File, "two")));
        assert_eq!(vars.lookup("X").unwrap().value_text(), "one");
    }

    #[test]
    fn flavor_strings() {
        assert_eq!(Var::simple(VarOrigin::File, "x").flavor().to_string(), "simple");
        assert_eq!(
            Var::recursive(VarOrigin::File, Value::literal("x"), "x")
                .flavor()
                .to_string(),
            "recursive"
        );
    }
}
