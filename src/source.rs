//! # Sources
//!
//! A `Source` is a git hosting location (GitHub, a company GitLab, a local
//! mirror directory) together with the protocol used to reach it. Projects
//! name a source; the source turns a project name into a clone URL.
//!
//! | protocol | URL for project `org/repo` on host `h` |
//! |----------|----------------------------------------|
//! | `ssh`    | `git@h:org/repo.git`                   |
//! | `https`  | `https://h/org/repo.git`               |
//! | `file`   | `file://h/org/repo.git` (`h` is a directory) |
//!
//! The built-in sources `github`, `gitlab` and `bitbucket` are always
//! available; a manifest may override them by declaring a source with the
//! same name.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// How a source is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Ssh,
    Https,
    File,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Protocol::Ssh => "ssh",
            Protocol::Https => "https",
            Protocol::File => "file",
        };
        write!(f, "{}", name)
    }
}

/// A resolved git hosting location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Source {
    pub name: String,
    pub host: String,
    pub protocol: Protocol,
}

impl Source {
    pub fn new(name: impl Into<String>, host: impl Into<String>, protocol: Protocol) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            protocol,
        }
    }

    /// Computes the clone URL for a project hosted on this source.
    ///
    /// The rendered URL is checked with the `url` crate for the protocols
    /// that produce standard URLs, so a bad host fails at load time instead
    /// of on the first fetch.
    pub fn clone_url(&self, project_name: &str) -> Result<String> {
        let name = project_name.trim_matches('/');
        let name = name.strip_suffix(".git").unwrap_or(name);
        let host = self.host.trim_end_matches('/');

        let rendered = match self.protocol {
            Protocol::Ssh => format!("git@{}:{}.git", host, name),
            Protocol::Https => format!("https://{}/{}.git", host, name),
            Protocol::File => {
                if host.starts_with('/') {
                    format!("file://{}/{}.git", host, name)
                } else {
                    format!("file:///{}/{}.git", host, name)
                }
            }
        };

        if self.protocol != Protocol::Ssh {
            url::Url::parse(&rendered).map_err(|e| Error::Validation {
                message: format!(
                    "source '{}' produces an invalid URL '{}' for project '{}': {}",
                    self.name, rendered, project_name, e
                ),
            })?;
        }

        Ok(rendered)
    }
}

/// The sources every manifest can use without declaring them.
pub fn builtin_sources(protocol: Protocol) -> Vec<Source> {
    vec![
        Source::new("github", "github.com", protocol),
        Source::new("gitlab", "gitlab.com", protocol),
        Source::new("bitbucket", "bitbucket.org", protocol),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ssh_url() {
        let source = Source::new("github", "github.com", Protocol::Ssh);
        assert_eq!(
            source.clone_url("jrgoodle/cats").unwrap(),
            "git@github.com:jrgoodle/cats.git"
        );
    }

    #[test]
    fn test_https_url() {
        let source = Source::new("github", "github.com", Protocol::Https);
        assert_eq!(
            source.clone_url("jrgoodle/cats").unwrap(),
            "https://github.com/jrgoodle/cats.git"
        );
    }

    #[test]
    fn test_file_url() {
        let source = Source::new("mirror", "/srv/git/", Protocol::File);
        assert_eq!(
            source.clone_url("cats").unwrap(),
            "file:///srv/git/cats.git"
        );
    }

    #[test]
    fn test_name_with_git_suffix_not_doubled() {
        let source = Source::new("github", "github.com", Protocol::Https);
        assert_eq!(
            source.clone_url("org/repo.git").unwrap(),
            "https://github.com/org/repo.git"
        );
    }

    #[test]
    fn test_invalid_https_host_rejected() {
        let source = Source::new("broken", "exa mple.com", Protocol::Https);
        let err = source.clone_url("org/repo").unwrap_err();
        assert!(err.to_string().contains("invalid URL"));
    }

    #[test]
    fn test_builtin_sources_use_given_protocol() {
        let sources = builtin_sources(Protocol::Https);
        assert_eq!(sources.len(), 3);
        assert!(sources.iter().all(|s| s.protocol == Protocol::Https));
        assert!(sources.iter().any(|s| s.name == "gitlab"));
    }

    #[test]
    fn test_protocol_display() {
        assert_eq!(Protocol::Ssh.to_string(), "ssh");
        assert_eq!(Protocol::File.to_string(), "file");
    }
}
