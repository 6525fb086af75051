//! Expression parsing: turns the text of one logical line (or a slice of
//! one) into a lazy [`Value`] tree.
//!
//! Parsing is terminator driven: callers hand in the byte set that ends
//! their slice (a closing paren, a comma between function arguments), and
//! the scan stops at the first terminator found outside balanced parens.

use crate::expr::Value;
use crate::func;
use crate::strutil::is_space_byte;

/// How the surrounding context wants special characters treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseExprOpt {
    /// Ordinary makefile text: `#` starts a comment, `\#` escapes one.
    Normal,
    /// `define` body: captured verbatim, `#` has no meaning.
    Define,
    /// Recipe text: verbatim, `#` and leading whitespace belong to the
    /// shell.
    Command,
}

pub type ExprResult<T> = Result<T, String>;

/// Parses an entire slice as one expression.
pub fn parse_expr(s: &str, opt: ParseExprOpt) -> ExprResult<Value> {
    let (v, _) = parse_expr_impl(s, &[], opt, false)?;
    Ok(v)
}

/// Core scan. Returns the parsed value and the index the scan stopped at:
/// either `s.len()` or the position of an unconsumed terminator byte.
pub fn parse_expr_impl(
    s: &str,
    terms: &[u8],
    opt: ParseExprOpt,
    trim_right: bool,
) -> ExprResult<(Value, usize)> {
    let bytes = s.as_bytes();
    let mut vals: Vec<Value> = Vec::new();
    let mut buf: Vec<u8> = Vec::new();
    let mut paren_depth = 0i32;
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i];
        if paren_depth == 0 && terms.contains(&c) {
            break;
        }
        match c {
            b'(' | b'{' => {
                paren_depth += 1;
                buf.push(c);
                i += 1;
            }
            b')' | b'}' => {
                if paren_depth > 0 {
                    paren_depth -= 1;
                }
                buf.push(c);
                i += 1;
            }
            b'$' => {
                if i + 1 >= bytes.len() {
                    // A trailing dollar is kept literally.
                    buf.push(b'$');
                    i += 1;
                    continue;
                }
                let n = bytes[i + 1];
                if n == b'$' {
                    buf.push(b'$');
                    i += 2;
                    continue;
                }
                if paren_depth == 0 && terms.contains(&n) {
                    buf.push(b'$');
                    i += 1;
                    break;
                }
                flush(&mut vals, &mut buf);
                let (v, used) = parse_dollar(&s[i..], opt)?;
                vals.push(v);
                i += used;
            }
            b'#' if opt == ParseExprOpt::Normal && terms.is_empty() => {
                // Comment to end of input; the caller already owns a single
                // logical line, so everything after is discarded.
                i = bytes.len();
                break;
            }
            b'\\' if opt == ParseExprOpt::Normal
                && i + 1 < bytes.len()
                && bytes[i + 1] == b'#' =>
            {
                buf.push(b'#');
                i += 2;
            }
            _ => {
                buf.push(c);
                i += 1;
            }
        }
    }
    if trim_right {
        while buf.last().is_some_and(|b| is_space_byte(*b)) {
            buf.pop();
        }
    }
    flush(&mut vals, &mut buf);
    Ok((Value::from_values(vals), i))
}

fn flush(vals: &mut Vec<Value>, buf: &mut Vec<u8>) {
    if !buf.is_empty() {
        // The scan copies whole bytes and only splices at ASCII
        // boundaries.
        let text = String::from_utf8(std::mem::take(buf)).expect("valid UTF-8 input");
        vals.push(Value::Literal(text));
    }
}

fn close_paren(open: u8) -> Option<u8> {
    match open {
        b'(' => Some(b')'),
        b'{' => Some(b'}'),
        _ => None,
    }
}

/// Parses one `$...` construct. `s` starts at the dollar; the return value
/// includes how many bytes the construct consumed.
fn parse_dollar(s: &str, _opt: ParseExprOpt) -> ExprResult<(Value, usize)> {
    let bytes = s.as_bytes();
    debug_assert_eq!(bytes[0], b'$');
    let Some(cp) = close_paren(bytes[1]) else {
        // Single-character reference such as $@ or $x.
        let ch = s[1..].chars().next().unwrap();
        return Ok((Value::SymRef(ch.to_string()), 1 + ch.len_utf8()));
    };

    let body = &s[2..];
    let name_terms = [cp, b':', b' ', b'\t'];
    let (name, n) = parse_expr_impl(body, &name_terms, ParseExprOpt::Normal, false)?;
    let mut i = n;
    if i >= body.len() {
        return Err("*** unterminated variable reference.".to_string());
    }
    match body.as_bytes()[i] {
        b if b == cp => {
            let v = match name.as_literal() {
                Some(lit) => Value::SymRef(lit.to_string()),
                None => Value::VarRef(Box::new(name)),
            };
            Ok((v, 2 + i + 1))
        }
        b' ' | b'\t' => {
            if let Some(info) = name.as_literal().and_then(func::lookup_func) {
                let (args, used) = parse_func_args(&body[i + 1..], cp, info)?;
                return Ok((Value::Func { info, args }, 2 + i + 1 + used));
            }
            // Not a known function: the whole body, spaces included, names
            // a variable.
            let (rest, m) = parse_expr_impl(&body[i..], &[cp], ParseExprOpt::Normal, false)?;
            i += m;
            if i >= body.len() {
                return Err("*** unterminated variable reference.".to_string());
            }
            let full = Value::from_values(vec![name, rest]);
            Ok((Value::VarRef(Box::new(full)), 2 + i + 1))
        }
        b':' => {
            let (pat, m) = parse_expr_impl(&body[i + 1..], &[cp, b'='], ParseExprOpt::Normal, false)?;
            let j = i + 1 + m;
            if j >= body.len() {
                return Err("*** unterminated variable reference.".to_string());
            }
            if body.as_bytes()[j] == cp {
                // No `=`: this was a variable name with a colon in it.
                let full = Value::from_values(vec![name, Value::literal(":"), pat]);
                let v = collapse_name_ref(full);
                return Ok((v, 2 + j + 1));
            }
            let (subst, k) = parse_expr_impl(&body[j + 1..], &[cp], ParseExprOpt::Normal, false)?;
            let end = j + 1 + k;
            if end >= body.len() {
                return Err("*** unterminated variable reference.".to_string());
            }
            Ok((
                Value::VarSubst {
                    name: Box::new(name),
                    pat: Box::new(pat),
                    subst: Box::new(subst),
                },
                2 + end + 1,
            ))
        }
        _ => unreachable!("scan stopped on a non-terminator"),
    }
}

/// A composed name collapses back to a direct reference when every piece
/// was literal.
fn collapse_name_ref(name: Value) -> Value {
    fn literal_text(v: &Value, out: &mut String) -> bool {
        match v {
            Value::Literal(s) => {
                out.push_str(s);
                true
            }
            Value::List(children) => children.iter().all(|c| literal_text(c, out)),
            _ => false,
        }
    }
    let mut text = String::new();
    if literal_text(&name, &mut text) {
        Value::SymRef(text)
    } else {
        Value::VarRef(Box::new(name))
    }
}

/// Parses a comma-separated argument list. Once the declared arity is
/// reached, commas stop separating and the rest of the body is one
/// argument.
fn parse_func_args(s: &str, cp: u8, info: &'static func::FuncInfo) -> ExprResult<(Vec<Value>, usize)> {
    let bytes = s.as_bytes();
    let mut args = Vec::new();
    let mut i = 0;
    loop {
        if info.trim_space {
            while i < bytes.len() && (bytes[i] == b' ' || bytes[i] == b'\t') {
                i += 1;
            }
        }
        let last = info.arity > 0 && args.len() + 1 >= info.arity;
        let terms: &[u8] = if last { &[cp] } else { &[b',', cp] };
        let trim_right = info.trim_space || (args.is_empty() && info.trim_right_space_1st);
        let (arg, n) = parse_expr_impl(&s[i..], terms, ParseExprOpt::Normal, trim_right)?;
        args.push(arg);
        i += n;
        if i >= bytes.len() {
            return Err(format!(
                "*** unterminated call to function `{}': missing `{}'.",
                info.name, cp as char
            ));
        }
        if bytes[i] == cp {
            return Ok((args, i + 1));
        }
        i += 1; // skip the comma
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> Value {
        parse_expr(s, ParseExprOpt::Normal).unwrap()
    }

    #[test]
    fn literal_only() {
        match parse("hello world") {
            Value::Literal(s) => assert_eq!(s, "hello world"),
            v => panic!("unexpected: {:?}", v),
        }
    }

    #[test]
    fn dollar_dollar_is_literal() {
        match parse("a$$b") {
            Value::Literal(s) => assert_eq!(s, "a$b"),
            v => panic!("unexpected: {:?}", v),
        }
    }

    #[test]
    fn single_char_ref() {
        match parse("$@") {
            Value::SymRef(s) => assert_eq!(s, "@"),
            v => panic!("unexpected: {:?}", v),
        }
    }

    #[test]
    fn paren_ref_and_concat() {
        match parse("x$(FOO)y") {
            Value::List(children) => {
                assert_eq!(children.len(), 3);
                assert!(matches!(&children[1], Value::SymRef(n) if n == "FOO"));
            }
            v => panic!("unexpected: {:?}", v),
        }
    }

    #[test]
    fn curly_ref() {
        assert!(matches!(parse("${FOO}"), Value::SymRef(n) if n == "FOO"));
    }

    #[test]
    fn nested_name_becomes_varref() {
        assert!(matches!(parse("$($(X))"), Value::VarRef(_)));
    }

    #[test]
    fn subst_reference() {
        match parse("$(SRCS:.c=.o)") {
            Value::VarSubst { name, pat, subst } => {
                assert_eq!(name.as_literal(), Some("SRCS"));
                assert_eq!(pat.as_literal(), Some(".c"));
                assert_eq!(subst.as_literal(), Some(".o"));
            }
            v => panic!("unexpected: {:?}", v),
        }
    }

    #[test]
    fn colon_without_eq_degrades_to_ref() {
        assert!(matches!(parse("$(a:b)"), Value::SymRef(n) if n == "a:b"));
    }

    #[test]
    fn known_function_with_arity() {
        match parse("$(patsubst %.c,%.o,a.c b.c)") {
            Value::Func { info, args } => {
                assert_eq!(info.name, "patsubst");
                assert_eq!(args.len(), 3);
            }
            v => panic!("unexpected: {:?}", v),
        }
    }

    #[test]
    fn excess_commas_fold_into_last_arg() {
        match parse("$(subst a,b,c,d)") {
            Value::Func { info, args } => {
                assert_eq!(info.name, "subst");
                assert_eq!(args.len(), 3);
                assert_eq!(args[2].as_literal(), Some("c,d"));
            }
            v => panic!("unexpected: {:?}", v),
        }
    }

    #[test]
    fn unknown_function_falls_back_to_var_ref() {
        assert!(matches!(parse("$(not-a-func x)"), Value::VarRef(_)));
    }

    #[test]
    fn comment_terminates_normal_text() {
        match parse("abc # def") {
            Value::Literal(s) => assert_eq!(s, "abc "),
            v => panic!("unexpected: {:?}", v),
        }
        match parse("abc \\# def") {
            Value::Literal(s) => assert_eq!(s, "abc # def"),
            v => panic!("unexpected: {:?}", v),
        }
    }

    #[test]
    fn command_mode_keeps_hash() {
        match parse_expr("echo # not a comment", ParseExprOpt::Command).unwrap() {
            Value::Literal(s) => assert_eq!(s, "echo # not a comment"),
            v => panic!("unexpected: {:?}", v),
        }
    }

    #[test]
    fn unterminated_reference_is_an_error() {
        assert!(parse_expr("$(FOO", ParseExprOpt::Normal).is_err());
    }

    #[test]
    fn nested_parens_in_args() {
        match parse("$(if $(X),(y),z)") {
            Value::Func { info, args } => {
                assert_eq!(info.name, "if");
                assert_eq!(args.len(), 3);
                assert_eq!(args[1].as_literal(), Some("(y)"));
            }
            v => panic!("unexpected: {:?}", v),
        }
    }
}
