//! Command execution.
//!
//! A bottom-up walk of the dep graph: children first, then a staleness
//! check on mtimes, then the node's commands through the configured
//! shell. Processing is memoised per output symbol and strictly serial;
//! the job count from the command line is recorded but does not fan out
//! dispatch.

use std::collections::HashMap;
use std::io::Write;
use std::process::Command as ShellCommand;
use std::rc::Rc;
use std::time::SystemTime;

use tracing::debug;

use crate::command::{self, Command};
use crate::dep::DepNode;
use crate::error::{ExecError, MakuError, Result};
use crate::eval::Evaluator;
use crate::fileutil;

enum ExecState {
    Processing,
    Done(Option<SystemTime>),
}

pub struct Executor {
    done: HashMap<String, ExecState>,
    num_commands: u64,
    is_dry_run: bool,
    is_silent: bool,
}

impl Executor {
    pub fn new(ev: &Evaluator) -> Executor {
        Executor {
            done: HashMap::new(),
            num_commands: 0,
            is_dry_run: ev.flags.is_dry_run,
            is_silent: ev.flags.is_silent_mode,
        }
    }

    /// Builds every root, reporting targets that needed no work.
    pub fn exec(&mut self, ev: &mut Evaluator, roots: &[Rc<DepNode>]) -> Result<()> {
        for root in roots {
            let before = self.num_commands;
            self.exec_node(ev, root, None)?;
            if self.num_commands == before {
                println!("maku: Nothing to be done for `{}'.", root.output);
            }
        }
        Ok(())
    }

    fn exec_node(
        &mut self,
        ev: &mut Evaluator,
        node: &Rc<DepNode>,
        needed_by: Option<&str>,
    ) -> Result<Option<SystemTime>> {
        match self.done.get(&node.output) {
            Some(ExecState::Processing) => {
                eprintln!(
                    "Circular {} <- {} dependency dropped.",
                    needed_by.unwrap_or(""),
                    node.output
                );
                return Ok(fileutil::get_timestamp(&node.output));
            }
            Some(ExecState::Done(ts)) => return Ok(*ts),
            None => {}
        }
        self.done
            .insert(node.output.clone(), ExecState::Processing);

        // Order-only prerequisites only matter while their output is
        // absent.
        for (name, child) in &node.order_onlys {
            if !fileutil::exists(name) {
                self.exec_node(ev, child, Some(&node.output))?;
            }
        }
        for (_, child) in &node.validations {
            self.exec_node(ev, child, Some(&node.output))?;
        }

        let mut latest: Option<SystemTime> = None;
        for (_, child) in &node.deps {
            let ts = self.exec_node(ev, child, Some(&node.output))?;
            if ts > latest {
                latest = ts;
            }
        }

        let output_ts = fileutil::get_timestamp(&node.output);
        if !node.has_rule {
            if output_ts.is_none() && !node.is_phony {
                return Err(MakuError::Exec(ExecError::NoRule {
                    target: node.output.clone(),
                    needed_by: needed_by.map(str::to_string),
                }));
            }
            self.done
                .insert(node.output.clone(), ExecState::Done(output_ts));
            return Ok(output_ts);
        }

        let up_to_date = !node.is_phony
            && match (output_ts, latest) {
                (Some(out), Some(dep)) => out >= dep,
                (Some(_), None) => true,
                (None, _) => false,
            };
        let mut ran = false;
        if !up_to_date {
            let commands = command::eval_commands(ev, node)?;
            for c in &commands {
                self.run_command(ev, c)?;
            }
            ran = !commands.is_empty();
        } else {
            debug!("{} is up to date", node.output);
        }

        let final_ts = if node.is_phony {
            if ran { Some(SystemTime::now()) } else { latest }
        } else {
            fileutil::get_timestamp(&node.output)
        };
        self.done
            .insert(node.output.clone(), ExecState::Done(final_ts));
        Ok(final_ts)
    }

    fn run_command(&mut self, ev: &mut Evaluator, c: &Command) -> Result<()> {
        if c.echo && !self.is_silent {
            println!("{}", c.cmd);
            // The child writes straight to the fd; an unflushed echo
            // would arrive after its output.
            let _ = std::io::stdout().flush();
        }
        self.num_commands += 1;
        if self.is_dry_run {
            return Ok(());
        }
        let shell = ev.get_shell();
        let exports = ev.collect_exports()?;
        let mut command = ShellCommand::new(&shell);
        command.arg("-c").arg(&c.cmd);
        for (k, v) in exports {
            match v {
                Some(v) => {
                    command.env(k, v);
                }
                None => {
                    command.env_remove(k);
                }
            }
        }
        let status = command.status().map_err(|e| {
            MakuError::Exec(ExecError::Spawn {
                target: c.output.clone(),
                source: e,
            })
        })?;
        if !status.success() {
            let code = status.code().unwrap_or(1);
            if c.ignore_error {
                eprintln!("maku: [{}] Error {} (ignored)", c.output, code);
            } else {
                return Err(MakuError::Exec(ExecError::CommandFailed {
                    target: c.output.clone(),
                    status: code,
                }));
            }
        }
        Ok(())
    }
}
