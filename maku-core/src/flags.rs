use serde::{Deserialize, Serialize};

/// Engine configuration, normally filled in from the command line.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Flags {
    /// The makefile to read (`-f`).
    pub makefile: String,
    /// Directory to change into before doing anything (`-C`).
    pub working_dir: Option<String>,
    /// Job count (`-j`). Recorded for collaborators; command dispatch in
    /// this build is serial.
    pub num_jobs: usize,
    /// Print commands without running them (`-n`).
    pub is_dry_run: bool,
    /// Suppress command echo (`-s`).
    pub is_silent_mode: bool,
    pub generate_ninja: bool,
    pub regen: bool,
    pub gen_all_targets: bool,
    pub is_syntax_check_only: bool,
    pub is_parse_only: bool,
    pub no_builtin_rules: bool,
    pub enable_debug: bool,
    /// Defer `$(shell)`/`$(file)` side effects out of recipe expansion.
    /// Off for direct execution; build-description collaborators turn it
    /// on.
    pub avoid_io: bool,
    /// Warn instead of staying quiet when a rule's commands are
    /// overridden by a later rule.
    pub warn_overriding_commands: bool,
    /// Requested targets, in command-line order.
    pub targets: Vec<String>,
    /// `NAME=VALUE` bindings from the command line.
    pub cl_vars: Vec<String>,
}

impl Default for Flags {
    fn default() -> Self {
        Self {
            makefile: "Makefile".to_string(),
            working_dir: None,
            num_jobs: 1,
            is_dry_run: false,
            is_silent_mode: false,
            generate_ninja: false,
            regen: false,
            gen_all_targets: false,
            is_syntax_check_only: false,
            is_parse_only: false,
            no_builtin_rules: false,
            enable_debug: false,
            avoid_io: false,
            warn_overriding_commands: true,
            targets: Vec::new(),
            cl_vars: Vec::new(),
        }
    }
}
