//! String and pattern helpers shared by the parser, the function library,
//! and the dependency builder.
//!
//! Word splitting uses the ASCII whitespace set Make uses everywhere:
//! space, tab, newline, vertical tab, form feed, and carriage return.

use std::borrow::Cow;

pub fn is_space_byte(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | 0x0b | 0x0c | b'\r')
}

pub fn trim_left_space(s: &str) -> &str {
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() && is_space_byte(bytes[i]) {
        i += 1;
    }
    &s[i..]
}

pub fn trim_right_space(s: &str) -> &str {
    let bytes = s.as_bytes();
    let mut i = bytes.len();
    while i > 0 && is_space_byte(bytes[i - 1]) {
        i -= 1;
    }
    &s[..i]
}

pub fn trim_space(s: &str) -> &str {
    trim_right_space(trim_left_space(s))
}

/// Iterator over the whitespace separated words of a string.
pub struct WordScanner<'a> {
    s: &'a str,
    pos: usize,
}

impl<'a> WordScanner<'a> {
    pub fn new(s: &'a str) -> Self {
        Self { s, pos: 0 }
    }
}

impl<'a> Iterator for WordScanner<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let bytes = self.s.as_bytes();
        while self.pos < bytes.len() && is_space_byte(bytes[self.pos]) {
            self.pos += 1;
        }
        if self.pos >= bytes.len() {
            return None;
        }
        let start = self.pos;
        while self.pos < bytes.len() && !is_space_byte(bytes[self.pos]) {
            self.pos += 1;
        }
        Some(&self.s[start..self.pos])
    }
}

pub fn split_space(s: &str) -> Vec<&str> {
    WordScanner::new(s).collect()
}

/// Joins words with single spaces, the normal form for function results.
pub fn join_words<I, S>(words: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = String::new();
    for w in words {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(w.as_ref());
    }
    out
}

/// A `%` pattern as used by pattern rules and `patsubst`.
///
/// A pattern without `%` only matches the whole word exactly; with `%` the
/// word must carry the literal prefix and suffix around the stem.
#[derive(Debug, Clone)]
pub struct Pattern<'a> {
    pat: &'a str,
    percent: Option<usize>,
}

impl<'a> Pattern<'a> {
    pub fn new(pat: &'a str) -> Self {
        Self {
            pat,
            percent: pat.find('%'),
        }
    }

    pub fn matches(&self, word: &'a str) -> Option<&'a str> {
        match self.percent {
            None => (word == self.pat).then_some(""),
            Some(p) => {
                let prefix = &self.pat[..p];
                let suffix = &self.pat[p + 1..];
                if word.len() >= prefix.len() + suffix.len()
                    && word.starts_with(prefix)
                    && word.ends_with(suffix)
                {
                    Some(&word[prefix.len()..word.len() - suffix.len()])
                } else {
                    None
                }
            }
        }
    }

    /// `patsubst` semantics: on match, append `subst` with its first `%`
    /// replaced by the stem; otherwise append the word unchanged.
    pub fn append_subst(&self, word: &str, subst: &str, out: &mut String) {
        match self.matches(word) {
            Some(stem) => match subst.find('%') {
                Some(p) if self.percent.is_some() => {
                    out.push_str(&subst[..p]);
                    out.push_str(stem);
                    out.push_str(&subst[p + 1..]);
                }
                _ => out.push_str(subst),
            },
            None => out.push_str(word),
        }
    }

    /// Substitution-reference semantics (`$(VAR:pat=subst)`): when neither
    /// side contains `%`, the pattern replaces a word suffix instead.
    pub fn append_subst_ref(&self, word: &str, subst: &str, out: &mut String) {
        if self.percent.is_some() || subst.contains('%') {
            self.append_subst(word, subst, out);
        } else if let Some(rest) = word.strip_suffix(self.pat) {
            out.push_str(rest);
            out.push_str(subst);
        } else {
            out.push_str(word);
        }
    }
}

/// Finds the first occurrence of any byte in `targets` that is not inside
/// balanced `()` or `{}` pairs.
pub fn find_outside_paren(s: &str, targets: &[u8]) -> Option<usize> {
    let mut depth = 0i32;
    for (i, &b) in s.as_bytes().iter().enumerate() {
        if depth == 0 && targets.contains(&b) {
            return Some(i);
        }
        match b {
            b'(' | b'{' => depth += 1,
            b')' | b'}' => {
                if depth > 0 {
                    depth -= 1;
                }
            }
            _ => {}
        }
    }
    None
}

/// Scans a raw buffer for the end of the current logical line.
///
/// Returns `(end, next, lf_cnt)`: `end` is the index of the terminating
/// unescaped newline (or the buffer length), `next` the index the following
/// line starts at, and `lf_cnt` the number of physical newlines consumed by
/// backslash continuations inside the logical line.
pub fn find_end_of_line(buf: &str) -> (usize, usize, u32) {
    let bytes = buf.as_bytes();
    let mut i = 0;
    let mut lf_cnt = 0;
    while i < bytes.len() {
        if bytes[i] == b'\n' {
            // Count the backslashes immediately before the newline; an odd
            // run escapes it. A \r directly before the newline belongs to
            // the line ending, not to the escape count.
            let mut j = i;
            if j > 0 && bytes[j - 1] == b'\r' {
                j -= 1;
            }
            let mut backslashes = 0;
            while j > backslashes && bytes[j - 1 - backslashes] == b'\\' {
                backslashes += 1;
            }
            if backslashes % 2 == 0 {
                return (i, i + 1, lf_cnt);
            }
            lf_cnt += 1;
        }
        i += 1;
    }
    (bytes.len(), bytes.len(), lf_cnt)
}

/// Collapses backslash-newline continuations (and the whitespace around
/// them) into single spaces. Used for every logical line except recipes,
/// which keep their continuations verbatim for the shell.
pub fn collapse_continuations(line: &str) -> Cow<'_, str> {
    if !line.contains('\\') {
        return Cow::Borrowed(line);
    }
    let bytes = line.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(line.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' {
            let mut j = i + 1;
            if j < bytes.len() && bytes[j] == b'\r' {
                j += 1;
            }
            if j < bytes.len() && bytes[j] == b'\n' {
                while matches!(out.last(), Some(b' ') | Some(b'\t')) {
                    out.pop();
                }
                out.push(b' ');
                i = j + 1;
                while i < bytes.len() && (bytes[i] == b' ' || bytes[i] == b'\t') {
                    i += 1;
                }
                continue;
            }
            // An escaped backslash stays; so does a backslash before
            // anything other than a newline.
            if j < bytes.len() && bytes[j] == b'\\' {
                out.push(b'\\');
                out.push(b'\\');
                i = j + 1;
                continue;
            }
        }
        if bytes[i] == b'\r' && i + 1 < bytes.len() && bytes[i + 1] == b'\n' {
            i += 1;
            continue;
        }
        out.push(bytes[i]);
        i += 1;
    }
    // Only ASCII bytes were added or removed at ASCII boundaries.
    Cow::Owned(String::from_utf8(out).expect("valid UTF-8 input"))
}

/// The directory part of a path for `$(dir)`: up to and including the last
/// slash, or `./` when there is none.
pub fn dir_part(path: &str) -> String {
    match path.rfind('/') {
        Some(i) => path[..=i].to_string(),
        None => "./".to_string(),
    }
}

/// Dirname as the `D` automatic-variable modifier wants it: no trailing
/// slash, `.` when the path has no directory component.
pub fn dirname(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) => "/",
        Some(i) => &path[..i],
        None => ".",
    }
}

/// The file part of a path: everything after the last slash.
pub fn basename_part(path: &str) -> &str {
    match path.rfind('/') {
        Some(i) => &path[i + 1..],
        None => path,
    }
}

/// Index of the extension dot for `$(suffix)`/`$(basename)`: the last `.`
/// that comes after the last `/`.
pub fn find_ext_dot(path: &str) -> Option<usize> {
    let base_start = path.rfind('/').map(|i| i + 1).unwrap_or(0);
    path[base_start..].rfind('.').map(|i| base_start + i)
}

/// Lexically normalises a path against a base directory: collapses `.`,
/// `..`, and repeated slashes without consulting the filesystem.
pub fn abs_path(cwd: &str, path: &str) -> String {
    let joined = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("{}/{}", cwd, path)
    };
    let mut parts: Vec<&str> = Vec::new();
    for seg in joined.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            _ => parts.push(seg),
        }
    }
    let mut out = String::from("/");
    out.push_str(&parts.join("/"));
    out
}

pub fn has_path_prefix(path: &str, prefix: &str) -> bool {
    path == prefix || (path.starts_with(prefix) && path.as_bytes().get(prefix.len()) == Some(&b'/'))
}

/// Parses the 1-based word index arguments of `word` and `wordlist`:
/// leading whitespace stripped, non-negative decimal only, no sign, no
/// non-digit tail.
pub fn parse_word_index(s: &str) -> Result<usize, ()> {
    let s = trim_space(s);
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(());
    }
    s.parse::<usize>().map_err(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_scanner_splits_on_all_ascii_space() {
        let words = split_space(" a\tb\nc\x0b d\x0c\re ");
        assert_eq!(words, vec!["a", "b", "c", "d", "e"]);
        assert!(split_space("   ").is_empty());
    }

    #[test]
    fn pattern_match_and_subst() {
        let p = Pattern::new("%.c");
        assert_eq!(p.matches("foo.c"), Some("foo"));
        assert_eq!(p.matches("foo.o"), None);

        let mut out = String::new();
        p.append_subst("foo.c", "%.o", &mut out);
        assert_eq!(out, "foo.o");

        out.clear();
        p.append_subst("foo.o", "%.o", &mut out);
        assert_eq!(out, "foo.o");

        let exact = Pattern::new("foo");
        assert_eq!(exact.matches("foo"), Some(""));
        assert_eq!(exact.matches("foobar"), None);
    }

    #[test]
    fn subst_ref_without_percent_replaces_suffix() {
        let p = Pattern::new(".c");
        let mut out = String::new();
        p.append_subst_ref("main.c", ".o", &mut out);
        assert_eq!(out, "main.o");

        out.clear();
        p.append_subst_ref("main.h", ".o", &mut out);
        assert_eq!(out, "main.h");
    }

    #[test]
    fn find_outside_paren_skips_nested() {
        assert_eq!(find_outside_paren("$(a:b)=c", b"=:"), Some(6));
        assert_eq!(find_outside_paren("${a=b}", b"="), None);
        assert_eq!(find_outside_paren("a:b", b":"), Some(1));
    }

    #[test]
    fn end_of_line_honours_escapes() {
        let (end, next, lf) = find_end_of_line("abc\ndef");
        assert_eq!((end, next, lf), (3, 4, 0));

        let (end, _, lf) = find_end_of_line("ab\\\ncd\nef");
        assert_eq!((end, lf), (6, 1));

        // Doubled backslash does not escape the newline.
        let (end, _, lf) = find_end_of_line("ab\\\\\ncd");
        assert_eq!((end, lf), (4, 0));
    }

    #[test]
    fn continuation_collapses_to_single_space() {
        assert_eq!(collapse_continuations("a \\\n   b"), "a b");
        assert_eq!(collapse_continuations("a\\\r\nb"), "a b");
        assert_eq!(collapse_continuations("plain"), "plain");
        assert_eq!(collapse_continuations("a\\\\b"), "a\\\\b");
    }

    #[test]
    fn path_helpers() {
        assert_eq!(dir_part("a/b/c.o"), "a/b/");
        assert_eq!(dir_part("c.o"), "./");
        assert_eq!(dirname("a/b/c.o"), "a/b");
        assert_eq!(dirname("c.o"), ".");
        assert_eq!(basename_part("a/b/c.o"), "c.o");
        assert_eq!(find_ext_dot("a.b/c"), None);
        assert_eq!(find_ext_dot("a.b/c.o"), Some(5));
        assert_eq!(abs_path("/x", "../y/./z"), "/y/z");
        assert!(has_path_prefix("vendor/lib/a.mk", "vendor/lib"));
        assert!(!has_path_prefix("vendor/libx/a.mk", "vendor/lib"));
    }

    #[test]
    fn word_index_parsing_is_strict() {
        assert_eq!(parse_word_index(" 12 "), Ok(12));
        assert!(parse_word_index("+3").is_err());
        assert!(parse_word_index("3x").is_err());
        assert!(parse_word_index("").is_err());
    }
}
