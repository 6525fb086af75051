use core::fmt;

use crate::error::{EvalError, EvalResult};
use crate::eval::Evaluator;
use crate::func::FuncInfo;
use crate::strutil::{Pattern, WordScanner};

/// A deferred expression. Parsing a makefile produces these; nothing is
/// expanded until a statement or a recipe needs the string.
#[derive(Debug, Clone)]
pub enum Value {
    Literal(String),
    /// Concatenation. Children are flattened into the output string only at
    /// evaluation time.
    List(Vec<Value>),
    /// A direct reference to a symbol whose name was literal in the source.
    SymRef(String),
    /// A reference whose name itself needs expansion first.
    VarRef(Box<Value>),
    /// `$(VAR:pat=subst)`.
    VarSubst {
        name: Box<Value>,
        pat: Box<Value>,
        subst: Box<Value>,
    },
    /// A call into the built-in function registry.
    Func {
        info: &'static FuncInfo,
        args: Vec<Value>,
    },
}

impl Value {
    pub fn literal(s: impl Into<String>) -> Value {
        Value::Literal(s.into())
    }

    pub fn empty() -> Value {
        Value::Literal(String::new())
    }

    /// Collapses a parsed run into the smallest equivalent value.
    pub fn from_values(mut vals: Vec<Value>) -> Value {
        match vals.len() {
            0 => Value::empty(),
            1 => vals.pop().unwrap(),
            _ => Value::List(vals),
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Value::Literal(_))
    }

    pub fn as_literal(&self) -> Option<&str> {
        match self {
            Value::Literal(s) => Some(s),
            _ => None,
        }
    }

    pub fn eval(&self, ev: &mut Evaluator) -> EvalResult<String> {
        let mut out = String::new();
        self.eval_into(ev, &mut out)?;
        Ok(out)
    }

    pub fn eval_into(&self, ev: &mut Evaluator, out: &mut String) -> EvalResult<()> {
        match self {
            Value::Literal(s) => {
                out.push_str(s);
                Ok(())
            }
            Value::List(children) => {
                for c in children {
                    c.eval_into(ev, out)?;
                }
                Ok(())
            }
            Value::SymRef(name) => {
                out.push_str(&ev.expand_var(name)?);
                Ok(())
            }
            Value::VarRef(name) => {
                let name = name.eval(ev)?;
                out.push_str(&ev.expand_var(&name)?);
                Ok(())
            }
            Value::VarSubst { name, pat, subst } => {
                let name = name.eval(ev)?;
                let pat = pat.eval(ev)?;
                let subst = subst.eval(ev)?;
                let text = ev.expand_var(&name)?;
                let pattern = Pattern::new(&pat);
                let mut first = true;
                for word in WordScanner::new(&text) {
                    if !first {
                        out.push(' ');
                    }
                    first = false;
                    pattern.append_subst_ref(word, &subst, out);
                }
                Ok(())
            }
            Value::Func { info, args } => {
                if args.len() < info.min_arity {
                    return Err(EvalError::Arity {
                        loc: ev.loc().clone(),
                        name: info.name,
                        found: args.len(),
                    });
                }
                ev.enter_expansion();
                let r = (info.func)(args, ev, out);
                ev.leave_expansion();
                r
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Literal(s) => write!(f, "{}", s),
            Value::List(children) => {
                for c in children {
                    write!(f, "{}", c)?;
                }
                Ok(())
            }
            Value::SymRef(name) => write!(f, "$({})", name),
            Value::VarRef(name) => write!(f, "$({})", name),
            Value::VarSubst { name, pat, subst } => {
                write!(f, "$({}:{}={})", name, pat, subst)
            }
            Value::Func { info, args } => {
                write!(f, "$({}", info.name)?;
                for (i, a) in args.iter().enumerate() {
                    write!(f, "{}{}", if i == 0 { " " } else { "," }, a)?;
                }
                write!(f, ")")
            }
        }
    }
}
