// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Running POSIX shell snippets locally or on an ssh host.

use std::process::{Command, Output};

use tiersnap_core::StoreError;
use tracing::trace;

/// Where shell snippets run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shell {
    /// `sh -c` on this machine.
    Local,
    /// `ssh <host> -- <script>`; user, key and port come from `~/.ssh/config`.
    Ssh {
        /// Host as given on the command line (may be an ssh_config alias).
        host: String,
    },
}

impl Shell {
    fn command(&self, script: &str) -> Command {
        match self {
            Shell::Local => {
                let mut cmd = Command::new("sh");
                cmd.arg("-c").arg(script);
                cmd
            }
            Shell::Ssh { host } => {
                let mut cmd = Command::new("ssh");
                cmd.args(["-o", "BatchMode=yes"]).arg(host).arg("--").arg(script);
                cmd
            }
        }
    }

    /// Run `script` and return its raw output, whatever the exit status.
    pub fn output(&self, script: &str) -> Result<Output, StoreError> {
        trace!(shell = ?self, script, "running");
        self.command(script)
            .output()
            .map_err(|err| StoreError::Transport {
                command: self.describe(script),
                detail: err.to_string(),
            })
    }

    /// Run `script`, failing unless it exits successfully. Returns stdout.
    pub fn run(&self, script: &str) -> Result<String, StoreError> {
        let output = self.output(script)?;
        if !output.status.success() {
            return Err(StoreError::Transport {
                command: self.describe(script),
                detail: format!(
                    "{}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Human-readable form of a command for error messages.
    pub fn describe(&self, script: &str) -> String {
        match self {
            Shell::Local => format!("sh -c {}", quote(script)),
            Shell::Ssh { host } => format!("ssh {host} -- {script}"),
        }
    }
}

/// Quote `word` for a POSIX shell. Words made only of unambiguous characters
/// pass through unchanged.
pub fn quote(word: &str) -> String {
    let safe = |c: char| c.is_ascii_alphanumeric() || "_-./:=+@%,".contains(c);
    if !word.is_empty() && word.chars().all(safe) {
        return word.to_owned();
    }
    format!("'{}'", word.replace('\'', r"'\''"))
}
