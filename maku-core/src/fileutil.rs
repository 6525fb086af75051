use std::fs;
use std::time::SystemTime;

use tracing::debug;

pub fn exists(path: &str) -> bool {
    fs::symlink_metadata(path).is_ok()
}

/// The mtime of a file, or `None` when it does not exist. Other stat
/// failures are treated as missing; the executor will surface a real
/// error when it tries to build the file.
pub fn get_timestamp(path: &str) -> Option<SystemTime> {
    match fs::metadata(path) {
        Ok(md) => md.modified().ok(),
        Err(_) => None,
    }
}

pub fn has_wildcard_meta(pat: &str) -> bool {
    pat.bytes().any(|b| matches!(b, b'*' | b'?' | b'['))
}

/// Filesystem glob for `$(wildcard)` and wildcard `include` lines.
/// Errors are suppressed: a bad pattern or unreadable directory yields
/// nothing.
pub fn glob_files(pat: &str) -> Vec<String> {
    let mut out = Vec::new();
    match glob::glob(pat) {
        Ok(paths) => {
            for entry in paths {
                match entry {
                    Ok(p) => out.push(p.to_string_lossy().into_owned()),
                    Err(e) => debug!("glob {}: {}", pat, e),
                }
            }
        }
        Err(e) => debug!("glob {}: {}", pat, e),
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_meta_detection() {
        assert!(has_wildcard_meta("*.c"));
        assert!(has_wildcard_meta("a?c"));
        assert!(has_wildcard_meta("[ab]"));
        assert!(!has_wildcard_meta("plain/file.txt"));
    }

    #[test]
    fn missing_file_has_no_timestamp() {
        assert!(get_timestamp("/nonexistent/definitely/not/here").is_none());
        assert!(!exists("/nonexistent/definitely/not/here"));
    }
}
