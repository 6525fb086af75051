//! Turns a dep node's lazy recipe into concrete shell commands.
//!
//! Expansion happens here, per target, with the automatic variables and
//! the target-specific scope installed. Evaluated text is then split on
//! unescaped newlines and each line has its `@`/`-`/`+` prefixes parsed.

use crate::dep::DepNode;
use crate::error::EvalResult;
use crate::eval::{AutoContext, Evaluator};
use crate::strutil::Pattern;

#[derive(Debug, Clone)]
pub struct Command {
    pub output: String,
    pub cmd: String,
    pub echo: bool,
    pub ignore_error: bool,
}

/// Expands every command of `node` in its target context.
pub fn eval_commands(ev: &mut Evaluator, node: &DepNode) -> EvalResult<Vec<Command>> {
    let stem = match &node.output_pattern {
        Some(p) => Pattern::new(p)
            .matches(&node.output)
            .unwrap_or("")
            .to_string(),
        None => String::new(),
    };
    let ctx = AutoContext {
        output: node.output.clone(),
        inputs: node.actual_inputs.clone(),
        order_onlys: node.actual_order_only_inputs.clone(),
        stem,
        output_pattern: node.output_pattern.clone(),
    };
    ev.set_current_auto(Some(ctx));
    ev.push_scope(node.rule_vars.clone());
    ev.set_in_command_eval(true);
    let saved_loc = ev.loc().clone();
    let mut loc = node.loc.clone();
    if node.cmd_lineno > 0 {
        loc.line = node.cmd_lineno;
    }
    ev.set_loc(loc);

    let result = eval_commands_inner(ev, node);

    ev.set_loc(saved_loc);
    ev.set_in_command_eval(false);
    ev.pop_scope();
    ev.set_current_auto(None);
    result
}

fn eval_commands_inner(ev: &mut Evaluator, node: &DepNode) -> EvalResult<Vec<Command>> {
    let mut commands = Vec::new();
    for cmd_val in &node.cmds {
        let text = cmd_val.eval(ev)?;
        for line in split_unescaped_newlines(&text) {
            let (cmd, echo, ignore_error) = parse_command_prefixes(&line);
            if cmd.is_empty() {
                continue;
            }
            commands.push(Command {
                output: node.output.clone(),
                cmd: cmd.to_string(),
                echo,
                ignore_error,
            });
        }
    }
    Ok(commands)
}

/// Splits on newlines that are not escaped by a backslash; an escaped
/// newline stays inside the command for the shell, with the recipe tab
/// that followed it removed.
fn split_unescaped_newlines(text: &str) -> Vec<String> {
    let bytes = text.as_bytes();
    let mut pieces = Vec::new();
    let mut cur: Vec<u8> = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 1 < bytes.len() && bytes[i + 1] == b'\n' {
            cur.push(b'\\');
            cur.push(b'\n');
            i += 2;
            if i < bytes.len() && bytes[i] == b'\t' {
                i += 1;
            }
            continue;
        }
        if bytes[i] == b'\n' {
            let piece = String::from_utf8(std::mem::take(&mut cur)).expect("valid UTF-8 input");
            pieces.push(piece);
            i += 1;
            continue;
        }
        cur.push(bytes[i]);
        i += 1;
    }
    if !cur.is_empty() {
        pieces.push(String::from_utf8(cur).expect("valid UTF-8 input"));
    }
    pieces
}

/// Strips recipe prefixes: `@` disables echo, `-` ignores the exit
/// status, `+` (a recursion marker) is accepted and discarded.
fn parse_command_prefixes(line: &str) -> (&str, bool, bool) {
    let mut echo = true;
    let mut ignore_error = false;
    let mut rest = line;
    loop {
        rest = crate::strutil::trim_left_space(rest);
        match rest.as_bytes().first() {
            Some(b'@') => {
                echo = false;
                rest = &rest[1..];
            }
            Some(b'-') => {
                ignore_error = true;
                rest = &rest[1..];
            }
            Some(b'+') => {
                rest = &rest[1..];
            }
            _ => break,
        }
    }
    (rest, echo, ignore_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixes() {
        assert_eq!(parse_command_prefixes("echo hi"), ("echo hi", true, false));
        assert_eq!(parse_command_prefixes("@echo hi"), ("echo hi", false, false));
        assert_eq!(parse_command_prefixes("-false"), ("false", true, true));
        assert_eq!(parse_command_prefixes("@-+cmd"), ("cmd", false, true));
        assert_eq!(parse_command_prefixes("  @ echo"), ("echo", false, false));
    }

    #[test]
    fn newline_splitting_respects_escapes() {
        assert_eq!(split_unescaped_newlines("a\nb"), vec!["a", "b"]);
        assert_eq!(split_unescaped_newlines("a\\\nb"), vec!["a\\\nb"]);
        assert_eq!(split_unescaped_newlines("a\\\n\tb"), vec!["a\\\nb"]);
        assert!(split_unescaped_newlines("").is_empty());
    }
}
