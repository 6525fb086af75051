use crate::var::{Var, Vars};

/// The variable environment: one global map plus a stack of transient
/// frames pushed by `$(call)`, `$(foreach)`, and per-target scopes.
/// Lookups walk the frames top-down before falling through to the globals.
#[derive(Debug, Default)]
pub struct Env {
    globals: Vars,
    frames: Vec<Vars>,
}

impl Env {
    pub fn new() -> Env {
        Env::default()
    }

    pub fn lookup(&self, name: &str) -> Option<&Var> {
        for frame in self.frames.iter().rev() {
            if let Some(v) = frame.lookup(name) {
                return Some(v);
            }
        }
        self.globals.lookup(name)
    }

    /// Global-only lookup, used by assignment which never writes frames.
    pub fn peek_global(&self, name: &str) -> Option<&Var> {
        self.globals.lookup(name)
    }

    pub fn assign_global(&mut self, name: &str, var: Var) -> bool {
        self.globals.assign(name, var)
    }

    pub fn global_mut(&mut self, name: &str) -> Option<&mut Var> {
        self.globals.lookup_mut(name)
    }

    pub fn globals(&self) -> &Vars {
        &self.globals
    }

    pub fn push_frame(&mut self, vars: Vars) {
        self.frames.push(vars);
    }

    pub fn pop_frame(&mut self) -> Option<Vars> {
        self.frames.pop()
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::var::VarOrigin;

    #[test]
    fn frames_shadow_globals() {
        let mut env = Env::new();
        env.assign_global("X", Var::simple(VarOrigin::File, "global"));
        assert_eq!(env.lookup("X").unwrap().value_text(), "global");

        let mut frame = Vars::new();
        frame.assign("X", Var::simple(VarOrigin::Automatic, "local"));
        env.push_frame(frame);
        assert_eq!(env.lookup("X").unwrap().value_text(), "local");

        env.pop_frame();
        assert_eq!(env.lookup("X").unwrap().value_text(), "global");
    }
}
