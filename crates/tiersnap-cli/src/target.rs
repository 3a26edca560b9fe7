// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Backup target addresses: `host:path` or a local directory.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Where snapshots live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Directory on an ssh host.
    Remote {
        /// Host or ssh_config alias, optionally `user@host`.
        host: String,
        /// Snapshot root on the host.
        path: String,
    },
    /// Directory on this machine.
    Local(PathBuf),
}

impl Target {
    /// Destination prefix rsync understands (`host:path` or a local path).
    pub fn rsync_root(&self) -> String {
        match self {
            Target::Remote { host, path } => format!("{host}:{path}"),
            Target::Local(path) => path.display().to_string(),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.rsync_root())
    }
}

impl FromStr for Target {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err("target must not be empty".into());
        }
        // A colon before any slash means `host:path`, the same rule rsync uses.
        let remote = s
            .find(':')
            .filter(|&colon| s.find('/').is_none_or(|slash| colon < slash));
        match remote {
            Some(colon) => {
                let (host, path) = (&s[..colon], &s[colon + 1..]);
                if host.is_empty() {
                    return Err(format!("`{s}`: missing host before `:`"));
                }
                if path.is_empty() {
                    return Err(format!("`{s}`: missing snapshot directory after `:`"));
                }
                Ok(Target::Remote {
                    host: host.to_owned(),
                    path: remote_path(path),
                })
            }
            None => Ok(Target::Local(PathBuf::from(s))),
        }
    }
}

/// Normalise a remote snapshot root.
///
/// A leading `~/` is dropped: ssh commands start in the login directory and
/// rsync resolves relative remote paths against it, so both sides land on the
/// same tree. Shell quoting would otherwise keep the `~` literal.
fn remote_path(path: &str) -> String {
    let path = match path {
        "~" | "~/" => ".",
        _ => path.strip_prefix("~/").unwrap_or(path),
    };
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_owned()
    } else {
        trimmed.to_owned()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn host_colon_path_is_remote() {
        let target: Target = "backup@nas:/srv/snapshots/".parse().unwrap();
        assert_eq!(
            target,
            Target::Remote {
                host: "backup@nas".into(),
                path: "/srv/snapshots".into()
            }
        );
        assert_eq!(target.rsync_root(), "backup@nas:/srv/snapshots");
    }

    #[test]
    fn home_relative_remotes_drop_the_tilde() {
        let target: Target = "nas:~/snaps/".parse().unwrap();
        assert_eq!(
            target,
            Target::Remote {
                host: "nas".into(),
                path: "snaps".into()
            }
        );
        assert_eq!(target.rsync_root(), "nas:snaps");
        let home: Target = "nas:~".parse().unwrap();
        assert_eq!(home.rsync_root(), "nas:.");
        let root: Target = "nas:/".parse().unwrap();
        assert_eq!(root.rsync_root(), "nas:/");
    }

    #[test]
    fn paths_are_local() {
        assert_eq!(
            "/mnt/usb/snaps".parse::<Target>().unwrap(),
            Target::Local("/mnt/usb/snaps".into())
        );
        assert_eq!(
            "./odd:name".parse::<Target>().unwrap(),
            Target::Local("./odd:name".into())
        );
    }

    #[test]
    fn incomplete_remotes_are_rejected() {
        assert!("nas:".parse::<Target>().is_err());
        assert!(":/srv".parse::<Target>().is_err());
        assert!("".parse::<Target>().is_err());
    }
}
