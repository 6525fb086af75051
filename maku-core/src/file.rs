use std::collections::HashMap;
use std::io;
use std::sync::Arc;

use tracing::debug;

use crate::ast::Stmt;
use crate::parser::parse_buf;

/// A parsed makefile. Statements are parsed once and shared; repeated
/// `include` of the same file reuses the cached parse.
#[derive(Debug)]
pub struct Makefile {
    pub filename: String,
    pub stmts: Vec<Stmt>,
}

#[derive(Debug, Default)]
pub struct MakefileCache {
    cache: HashMap<String, Arc<Makefile>>,
}

impl MakefileCache {
    pub fn new() -> MakefileCache {
        MakefileCache::default()
    }

    pub fn read_makefile(&mut self, path: &str) -> io::Result<Arc<Makefile>> {
        if let Some(mk) = self.cache.get(path) {
            debug!("makefile cache hit: {}", path);
            return Ok(mk.clone());
        }
        let content = std::fs::read_to_string(path)?;
        let stmts = parse_buf(&content, path);
        debug!("parsed {}: {} statements", path, stmts.len());
        let mk = Arc::new(Makefile {
            filename: path.to_string(),
            stmts,
        });
        self.cache.insert(path.to_string(), mk.clone());
        Ok(mk)
    }
}
