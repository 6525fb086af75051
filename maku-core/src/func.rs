//! The built-in function registry.
//!
//! The set is closed: the expression parser consults [`lookup_func`] to
//! decide whether `$(name ...)` is a call at all, and the declared arity
//! bounds how commas split the argument list. Arguments arrive as lazy
//! [`Value`]s; each function expands what it needs.

use std::fs;
use std::io::Write;

use tracing::debug;

use crate::error::{EvalError, EvalResult};
use crate::eval::Evaluator;
use crate::expr::Value;
use crate::fileutil;
use crate::strutil::{
    Pattern, WordScanner, abs_path, basename_part, dir_part, find_ext_dot, join_words,
    parse_word_index, split_space, trim_space,
};
use crate::var::{Var, VarOrigin};

pub type FuncImpl = fn(&[Value], &mut Evaluator, &mut String) -> EvalResult<()>;

#[derive(Debug)]
pub struct FuncInfo {
    pub name: &'static str,
    pub func: FuncImpl,
    /// Maximum argument count; 0 means variadic. Once the parser has seen
    /// this many arguments, commas stop separating.
    pub arity: usize,
    pub min_arity: usize,
    /// Trim ASCII whitespace around every argument at parse time.
    pub trim_space: bool,
    /// Trim trailing whitespace of the first argument only.
    pub trim_right_space_1st: bool,
}

macro_rules! entry {
    ($name:expr, $func:expr, $arity:expr, $min:expr) => {
        entry!($name, $func, $arity, $min, false, false)
    };
    ($name:expr, $func:expr, $arity:expr, $min:expr, $trim:expr, $trim1:expr) => {
        FuncInfo {
            name: $name,
            func: $func,
            arity: $arity,
            min_arity: $min,
            trim_space: $trim,
            trim_right_space_1st: $trim1,
        }
    };
}

pub static FUNC_INFOS: &[FuncInfo] = &[
    entry!("patsubst", func_patsubst, 3, 3),
    entry!("strip", func_strip, 1, 1),
    entry!("subst", func_subst, 3, 3),
    entry!("findstring", func_findstring, 2, 2),
    entry!("filter", func_filter, 2, 2),
    entry!("filter-out", func_filter_out, 2, 2),
    entry!("sort", func_sort, 1, 1),
    entry!("word", func_word, 2, 2),
    entry!("wordlist", func_wordlist, 3, 3),
    entry!("words", func_words, 1, 1),
    entry!("firstword", func_firstword, 1, 1),
    entry!("lastword", func_lastword, 1, 1),
    entry!("join", func_join, 2, 2),
    entry!("wildcard", func_wildcard, 1, 1),
    entry!("dir", func_dir, 1, 1),
    entry!("notdir", func_notdir, 1, 1),
    entry!("suffix", func_suffix, 1, 1),
    entry!("basename", func_basename, 1, 1),
    entry!("addsuffix", func_addsuffix, 2, 2),
    entry!("addprefix", func_addprefix, 2, 2),
    entry!("realpath", func_realpath, 1, 1),
    entry!("abspath", func_abspath, 1, 1),
    entry!("if", func_if, 3, 2, false, true),
    entry!("and", func_and, 0, 0, true, false),
    entry!("or", func_or, 0, 0, true, false),
    entry!("value", func_value, 1, 1),
    entry!("eval", func_eval, 1, 1),
    entry!("shell", func_shell, 1, 1),
    entry!("call", func_call, 0, 1),
    entry!("foreach", func_foreach, 3, 3),
    entry!("origin", func_origin, 1, 1),
    entry!("flavor", func_flavor, 1, 1),
    entry!("info", func_info, 1, 1),
    entry!("warning", func_warning, 1, 1),
    entry!("error", func_error, 1, 1),
    entry!("file", func_file, 2, 1),
    entry!("KATI_deprecated_var", func_deprecated_var, 2, 1),
    entry!("KATI_obsolete_var", func_obsolete_var, 2, 1),
    entry!("KATI_deprecate_export", func_deprecate_export, 1, 1),
    entry!("KATI_obsolete_export", func_obsolete_export, 1, 1),
    entry!("KATI_profile_makefile", func_profile_makefile, 0, 0),
    entry!("KATI_variable_location", func_variable_location, 1, 1),
    entry!("KATI_extra_file_deps", func_extra_file_deps, 0, 0),
    entry!("KATI_shell_no_rerun", func_shell, 1, 1),
    entry!("KATI_foreach_sep", func_foreach_sep, 4, 4),
    entry!("KATI_file_no_rerun", func_file, 2, 1),
    entry!("KATI_visibility_prefix", func_visibility_prefix, 2, 2),
];

pub fn lookup_func(name: &str) -> Option<&'static FuncInfo> {
    FUNC_INFOS.iter().find(|f| f.name == name)
}

// ---- string functions -----------------------------------------------

fn func_patsubst(args: &[Value], ev: &mut Evaluator, out: &mut String) -> EvalResult<()> {
    let pat = args[0].eval(ev)?;
    let repl = args[1].eval(ev)?;
    let text = args[2].eval(ev)?;
    let pattern = Pattern::new(&pat);
    let mut first = true;
    for word in WordScanner::new(&text) {
        if !first {
            out.push(' ');
        }
        first = false;
        pattern.append_subst(word, &repl, out);
    }
    Ok(())
}

fn func_strip(args: &[Value], ev: &mut Evaluator, out: &mut String) -> EvalResult<()> {
    let text = args[0].eval(ev)?;
    out.push_str(&join_words(split_space(&text)));
    Ok(())
}

fn func_subst(args: &[Value], ev: &mut Evaluator, out: &mut String) -> EvalResult<()> {
    let from = args[0].eval(ev)?;
    let to = args[1].eval(ev)?;
    let text = args[2].eval(ev)?;
    if from.is_empty() {
        out.push_str(&text);
        out.push_str(&to);
        return Ok(());
    }
    out.push_str(&text.replace(&from, &to));
    Ok(())
}

fn func_findstring(args: &[Value], ev: &mut Evaluator, out: &mut String) -> EvalResult<()> {
    let find = args[0].eval(ev)?;
    let text = args[1].eval(ev)?;
    if text.contains(&find) {
        out.push_str(&find);
    }
    Ok(())
}

fn filter_words(
    args: &[Value],
    ev: &mut Evaluator,
    out: &mut String,
    keep_matching: bool,
) -> EvalResult<()> {
    let pats = args[0].eval(ev)?;
    let text = args[1].eval(ev)?;
    let patterns: Vec<Pattern> = split_space(&pats).into_iter().map(Pattern::new).collect();
    let mut first = true;
    for word in WordScanner::new(&text) {
        let matched = patterns.iter().any(|p| p.matches(word).is_some());
        if matched == keep_matching {
            if !first {
                out.push(' ');
            }
            first = false;
            out.push_str(word);
        }
    }
    Ok(())
}

fn func_filter(args: &[Value], ev: &mut Evaluator, out: &mut String) -> EvalResult<()> {
    filter_words(args, ev, out, true)
}

fn func_filter_out(args: &[Value], ev: &mut Evaluator, out: &mut String) -> EvalResult<()> {
    filter_words(args, ev, out, false)
}

fn func_sort(args: &[Value], ev: &mut Evaluator, out: &mut String) -> EvalResult<()> {
    let text = args[0].eval(ev)?;
    let mut words = split_space(&text);
    words.sort_unstable();
    words.dedup();
    out.push_str(&join_words(words));
    Ok(())
}

// ---- word functions -------------------------------------------------

fn numeric_arg(
    args: &[Value],
    idx: usize,
    ev: &mut Evaluator,
    name: &'static str,
) -> EvalResult<usize> {
    let s = args[idx].eval(ev)?;
    parse_word_index(&s).map_err(|_| EvalError::NonNumeric {
        loc: ev.loc().clone(),
        name,
        arg: trim_space(&s).to_string(),
    })
}

fn func_word(args: &[Value], ev: &mut Evaluator, out: &mut String) -> EvalResult<()> {
    let n = numeric_arg(args, 0, ev, "word")?;
    if n == 0 {
        return Err(EvalError::fatal(
            ev.loc(),
            "*** first argument to `word' function must be greater than 0.",
        ));
    }
    let text = args[1].eval(ev)?;
    if let Some(w) = WordScanner::new(&text).nth(n - 1) {
        out.push_str(w);
    }
    Ok(())
}

fn func_wordlist(args: &[Value], ev: &mut Evaluator, out: &mut String) -> EvalResult<()> {
    let s = numeric_arg(args, 0, ev, "wordlist")?;
    let e = numeric_arg(args, 1, ev, "wordlist")?;
    if s == 0 || e < s {
        return Err(EvalError::fatal(
            ev.loc(),
            format!(
                "*** invalid first argument to `wordlist' function: `{},{}'",
                s, e
            ),
        ));
    }
    let text = args[2].eval(ev)?;
    let words: Vec<&str> = WordScanner::new(&text).skip(s - 1).take(e - s + 1).collect();
    out.push_str(&join_words(words));
    Ok(())
}

fn func_words(args: &[Value], ev: &mut Evaluator, out: &mut String) -> EvalResult<()> {
    let text = args[0].eval(ev)?;
    out.push_str(&WordScanner::new(&text).count().to_string());
    Ok(())
}

fn func_firstword(args: &[Value], ev: &mut Evaluator, out: &mut String) -> EvalResult<()> {
    let text = args[0].eval(ev)?;
    if let Some(w) = WordScanner::new(&text).next() {
        out.push_str(w);
    }
    Ok(())
}

fn func_lastword(args: &[Value], ev: &mut Evaluator, out: &mut String) -> EvalResult<()> {
    let text = args[0].eval(ev)?;
    if let Some(w) = WordScanner::new(&text).last() {
        out.push_str(w);
    }
    Ok(())
}

fn func_join(args: &[Value], ev: &mut Evaluator, out: &mut String) -> EvalResult<()> {
    let a = args[0].eval(ev)?;
    let b = args[1].eval(ev)?;
    let left = split_space(&a);
    let right = split_space(&b);
    let mut joined = Vec::with_capacity(left.len().max(right.len()));
    for i in 0..left.len().max(right.len()) {
        let mut w = String::new();
        if let Some(l) = left.get(i) {
            w.push_str(l);
        }
        if let Some(r) = right.get(i) {
            w.push_str(r);
        }
        joined.push(w);
    }
    out.push_str(&join_words(joined));
    Ok(())
}

// ---- path functions -------------------------------------------------

fn func_wildcard(args: &[Value], ev: &mut Evaluator, out: &mut String) -> EvalResult<()> {
    let pats = args[0].eval(ev)?;
    let mut files = Vec::new();
    for pat in WordScanner::new(&pats) {
        files.extend(fileutil::glob_files(pat));
    }
    out.push_str(&join_words(files));
    Ok(())
}

fn map_words<F>(args: &[Value], ev: &mut Evaluator, out: &mut String, f: F) -> EvalResult<()>
where
    F: Fn(&str, &mut String),
{
    let text = args[0].eval(ev)?;
    let mut first = true;
    for word in WordScanner::new(&text) {
        let mut mapped = String::new();
        f(word, &mut mapped);
        if mapped.is_empty() {
            continue;
        }
        if !first {
            out.push(' ');
        }
        first = false;
        out.push_str(&mapped);
    }
    Ok(())
}

fn func_dir(args: &[Value], ev: &mut Evaluator, out: &mut String) -> EvalResult<()> {
    map_words(args, ev, out, |w, o| o.push_str(&dir_part(w)))
}

fn func_notdir(args: &[Value], ev: &mut Evaluator, out: &mut String) -> EvalResult<()> {
    // A word that is all directory ("a/") maps to an empty entry, which
    // GNU make drops from the output.
    map_words(args, ev, out, |w, o| o.push_str(basename_part(w)))
}

fn func_suffix(args: &[Value], ev: &mut Evaluator, out: &mut String) -> EvalResult<()> {
    map_words(args, ev, out, |w, o| {
        if let Some(i) = find_ext_dot(w) {
            o.push_str(&w[i..]);
        }
    })
}

fn func_basename(args: &[Value], ev: &mut Evaluator, out: &mut String) -> EvalResult<()> {
    map_words(args, ev, out, |w, o| match find_ext_dot(w) {
        Some(i) => o.push_str(&w[..i]),
        None => o.push_str(w),
    })
}

fn func_addsuffix(args: &[Value], ev: &mut Evaluator, out: &mut String) -> EvalResult<()> {
    let suf = args[0].eval(ev)?;
    let text = args[1].eval(ev)?;
    let mut first = true;
    for word in WordScanner::new(&text) {
        if !first {
            out.push(' ');
        }
        first = false;
        out.push_str(word);
        out.push_str(&suf);
    }
    Ok(())
}

fn func_addprefix(args: &[Value], ev: &mut Evaluator, out: &mut String) -> EvalResult<()> {
    let pre = args[0].eval(ev)?;
    let text = args[1].eval(ev)?;
    let mut first = true;
    for word in WordScanner::new(&text) {
        if !first {
            out.push(' ');
        }
        first = false;
        out.push_str(&pre);
        out.push_str(word);
    }
    Ok(())
}

fn func_realpath(args: &[Value], ev: &mut Evaluator, out: &mut String) -> EvalResult<()> {
    let text = args[0].eval(ev)?;
    let mut first = true;
    for word in WordScanner::new(&text) {
        if let Ok(p) = fs::canonicalize(word) {
            if !first {
                out.push(' ');
            }
            first = false;
            out.push_str(&p.to_string_lossy());
        }
    }
    Ok(())
}

fn func_abspath(args: &[Value], ev: &mut Evaluator, out: &mut String) -> EvalResult<()> {
    let text = args[0].eval(ev)?;
    let cwd = std::env::current_dir()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "/".to_string());
    let mut first = true;
    for word in WordScanner::new(&text) {
        if !first {
            out.push(' ');
        }
        first = false;
        out.push_str(&abs_path(&cwd, word));
    }
    Ok(())
}

// ---- logic ----------------------------------------------------------

fn func_if(args: &[Value], ev: &mut Evaluator, out: &mut String) -> EvalResult<()> {
    let cond = args[0].eval(ev)?;
    if !cond.is_empty() {
        out.push_str(&args[1].eval(ev)?);
    } else if let Some(else_arm) = args.get(2) {
        out.push_str(&else_arm.eval(ev)?);
    }
    Ok(())
}

fn func_and(args: &[Value], ev: &mut Evaluator, out: &mut String) -> EvalResult<()> {
    let mut last = String::new();
    for arg in args {
        last = arg.eval(ev)?;
        if last.is_empty() {
            return Ok(());
        }
    }
    out.push_str(&last);
    Ok(())
}

fn func_or(args: &[Value], ev: &mut Evaluator, out: &mut String) -> EvalResult<()> {
    for arg in args {
        let v = arg.eval(ev)?;
        if !v.is_empty() {
            out.push_str(&v);
            return Ok(());
        }
    }
    Ok(())
}

// ---- meta and environment -------------------------------------------

fn func_value(args: &[Value], ev: &mut Evaluator, out: &mut String) -> EvalResult<()> {
    let name = args[0].eval(ev)?;
    if let Some(var) = ev.peek_var(trim_space(&name)) {
        out.push_str(var.value_text());
    }
    Ok(())
}

fn func_origin(args: &[Value], ev: &mut Evaluator, out: &mut String) -> EvalResult<()> {
    let name = args[0].eval(ev)?;
    let origin = ev
        .peek_var(trim_space(&name))
        .map(|v| v.origin)
        .unwrap_or(VarOrigin::Undefined);
    out.push_str(&origin.to_string());
    Ok(())
}

fn func_flavor(args: &[Value], ev: &mut Evaluator, out: &mut String) -> EvalResult<()> {
    let name = args[0].eval(ev)?;
    let flavor = ev
        .peek_var(trim_space(&name))
        .map(|v| v.flavor().to_string())
        .unwrap_or_else(|| "undefined".to_string());
    out.push_str(&flavor);
    Ok(())
}

fn func_eval(args: &[Value], ev: &mut Evaluator, _out: &mut String) -> EvalResult<()> {
    if ev.avoid_io() && ev.in_command_eval() {
        return Err(EvalError::fatal(
            ev.loc(),
            "*** $(eval) in a recipe is not supported.",
        ));
    }
    let text = args[0].eval(ev)?;
    ev.eval_text(&text)
}

fn func_shell(args: &[Value], ev: &mut Evaluator, out: &mut String) -> EvalResult<()> {
    let cmd = args[0].eval(ev)?;
    if ev.avoid_io() && ev.in_command_eval() {
        // Defer to the shell at execution time. Nesting inside another
        // expansion cannot be deferred soundly.
        if ev.eval_depth() > 1 {
            return Err(EvalError::fatal(
                ev.loc(),
                format!("*** $(shell {}) in a recipe is not supported.", cmd),
            ));
        }
        out.push_str(&format!("$({})", cmd));
        return Ok(());
    }
    out.push_str(&ev.run_shell(&cmd)?);
    Ok(())
}

fn func_call(args: &[Value], ev: &mut Evaluator, out: &mut String) -> EvalResult<()> {
    let name = args[0].eval(ev)?;
    let name = trim_space(&name).to_string();
    let mut frame = crate::var::Vars::new();
    frame.assign("0", Var::simple(VarOrigin::Automatic, name.clone()));
    for (i, arg) in args[1..].iter().enumerate() {
        let v = arg.eval(ev)?;
        frame.assign(&(i + 1).to_string(), Var::simple(VarOrigin::Automatic, v));
    }
    let payload = ev.peek_var(&name).map(|v| v.payload.clone());
    match payload {
        Some(crate::var::VarPayload::Recursive { value, .. }) => {
            let expanded = ev.with_scope(frame, |ev| value.eval(ev))?;
            out.push_str(&expanded);
        }
        Some(crate::var::VarPayload::Simple(s)) => out.push_str(&s),
        _ => {}
    }
    Ok(())
}

fn foreach_impl(
    var: &Value,
    list: &Value,
    body: &Value,
    sep: &str,
    ev: &mut Evaluator,
    out: &mut String,
) -> EvalResult<()> {
    let var_name = var.eval(ev)?;
    let var_name = trim_space(&var_name).to_string();
    let list = list.eval(ev)?;
    let words: Vec<String> = WordScanner::new(&list).map(|w| w.to_string()).collect();
    let mut first = true;
    for word in words {
        if !first {
            out.push_str(sep);
        }
        first = false;
        let mut frame = crate::var::Vars::new();
        frame.assign(&var_name, Var::simple(VarOrigin::Automatic, word));
        let piece = ev.with_scope(frame, |ev| body.eval(ev))?;
        out.push_str(&piece);
    }
    Ok(())
}

fn func_foreach(args: &[Value], ev: &mut Evaluator, out: &mut String) -> EvalResult<()> {
    foreach_impl(&args[0], &args[1], &args[2], " ", ev, out)
}

fn func_foreach_sep(args: &[Value], ev: &mut Evaluator, out: &mut String) -> EvalResult<()> {
    let sep = args[1].eval(ev)?;
    foreach_impl(&args[0], &args[2], &args[3], &sep, ev, out)
}

// ---- I/O and diagnostics --------------------------------------------

fn func_info(args: &[Value], ev: &mut Evaluator, _out: &mut String) -> EvalResult<()> {
    let msg = args[0].eval(ev)?;
    if ev.avoid_io() && ev.in_command_eval() {
        ev.delayed_output_commands
            .push(format!("echo {}", shell_quote(&msg)));
        return Ok(());
    }
    println!("{}", msg);
    let _ = std::io::stdout().flush();
    Ok(())
}

fn func_warning(args: &[Value], ev: &mut Evaluator, _out: &mut String) -> EvalResult<()> {
    let msg = args[0].eval(ev)?;
    eprintln!("{}: {}", ev.loc(), msg);
    Ok(())
}

fn func_error(args: &[Value], ev: &mut Evaluator, _out: &mut String) -> EvalResult<()> {
    let msg = args[0].eval(ev)?;
    Err(EvalError::fatal(ev.loc(), format!("*** {}.", msg)))
}

fn func_file(args: &[Value], ev: &mut Evaluator, out: &mut String) -> EvalResult<()> {
    let spec = args[0].eval(ev)?;
    let spec = trim_space(&spec);
    if let Some(path) = spec.strip_prefix('<') {
        let path = trim_space(path);
        match fs::read_to_string(path) {
            Ok(mut text) => {
                while text.ends_with('\n') {
                    text.pop();
                }
                out.push_str(&text);
            }
            Err(e) => debug!("$(file <{}): {}", path, e),
        }
        return Ok(());
    }
    let (append, path) = match spec.strip_prefix(">>") {
        Some(p) => (true, trim_space(p)),
        None => match spec.strip_prefix('>') {
            Some(p) => (false, trim_space(p)),
            None => {
                return Err(EvalError::fatal(
                    ev.loc(),
                    format!("*** Invalid file operation: {}.", spec),
                ));
            }
        },
    };
    let mut text = match args.get(1) {
        Some(v) => v.eval(ev)?,
        None => String::new(),
    };
    if !text.is_empty() && !text.ends_with('\n') {
        text.push('\n');
    }
    if ev.avoid_io() && ev.in_command_eval() {
        let redirect = if append { ">>" } else { ">" };
        ev.delayed_output_commands.push(format!(
            "printf '%s' {} {} {}",
            shell_quote(&text),
            redirect,
            shell_quote(path)
        ));
        return Ok(());
    }
    let result = if append {
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .and_then(|mut f| f.write_all(text.as_bytes()))
    } else {
        fs::write(path, text.as_bytes())
    };
    result.map_err(|e| EvalError::Io {
        loc: ev.loc().clone(),
        source: e,
    })
}

// ---- kati extensions ------------------------------------------------

fn mark_var_names<F>(args: &[Value], ev: &mut Evaluator, f: F) -> EvalResult<()>
where
    F: Fn(&mut Var, &str),
{
    let names = args[0].eval(ev)?;
    let msg = match args.get(1) {
        Some(v) => v.eval(ev)?,
        None => String::new(),
    };
    for name in split_space(&names).into_iter().map(str::to_string) {
        let var = ev.define_placeholder(&name);
        f(var, &msg);
    }
    Ok(())
}

fn func_deprecated_var(args: &[Value], ev: &mut Evaluator, _out: &mut String) -> EvalResult<()> {
    mark_var_names(args, ev, |var, msg| var.deprecated = Some(msg.to_string()))
}

fn func_obsolete_var(args: &[Value], ev: &mut Evaluator, _out: &mut String) -> EvalResult<()> {
    mark_var_names(args, ev, |var, msg| var.obsolete = Some(msg.to_string()))
}

fn func_deprecate_export(args: &[Value], ev: &mut Evaluator, _out: &mut String) -> EvalResult<()> {
    let msg = args[0].eval(ev)?;
    ev.set_export_deprecated(msg);
    Ok(())
}

fn func_obsolete_export(args: &[Value], ev: &mut Evaluator, _out: &mut String) -> EvalResult<()> {
    let msg = args[0].eval(ev)?;
    ev.set_export_obsolete(msg);
    Ok(())
}

fn func_profile_makefile(args: &[Value], ev: &mut Evaluator, _out: &mut String) -> EvalResult<()> {
    for arg in args {
        arg.eval(ev)?;
    }
    ev.warn_stub("KATI_profile_makefile");
    Ok(())
}

fn func_variable_location(args: &[Value], ev: &mut Evaluator, out: &mut String) -> EvalResult<()> {
    let names = args[0].eval(ev)?;
    let locations: Vec<String> = split_space(&names)
        .into_iter()
        .map(|name| {
            ev.peek_var(name)
                .and_then(|v| v.loc.clone())
                .map(|l| l.to_string())
                .unwrap_or_else(|| "<unknown>:0".to_string())
        })
        .collect();
    out.push_str(&join_words(locations));
    Ok(())
}

fn func_extra_file_deps(args: &[Value], ev: &mut Evaluator, _out: &mut String) -> EvalResult<()> {
    for arg in args {
        arg.eval(ev)?;
    }
    ev.warn_stub("KATI_extra_file_deps");
    Ok(())
}

fn func_visibility_prefix(args: &[Value], ev: &mut Evaluator, _out: &mut String) -> EvalResult<()> {
    let name = args[0].eval(ev)?;
    let name = trim_space(&name).to_string();
    let prefixes_text = args[1].eval(ev)?;
    let prefixes: Vec<String> = split_space(&prefixes_text)
        .into_iter()
        .map(str::to_string)
        .collect();
    let loc = ev.loc().clone();
    let var = ev.define_placeholder(&name);
    if !var.visibility.is_empty() && var.visibility != prefixes {
        return Err(EvalError::fatal(
            &loc,
            format!("*** conflicting visibility prefixes for `{}'.", name),
        ));
    }
    var.visibility = prefixes;
    Ok(())
}

fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "'\\''"))
}
