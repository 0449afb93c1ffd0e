//! Platform CLI abstraction.
//!
//! All mutations of an installation go through [`PlatformCli`], a trait over
//! "run this CLI invocation and give me its output". The real implementation
//! shells out to `wp`; tests substitute a scripted one and never touch a
//! real installation.

mod wp;

pub use wp::WpCli;

use crate::error::Result;

/// Captured output of one CLI invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliOutput {
    /// Standard output, trimmed.
    pub stdout: String,
    /// Standard error, trimmed.
    pub stderr: String,
    /// Whether the process exited successfully.
    pub success: bool,
}

impl CliOutput {
    /// A successful invocation with the given stdout.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            success: true,
        }
    }

    /// A failed invocation with the given stderr.
    pub fn err(stderr: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            success: false,
        }
    }
}

/// One CLI invocation, built up before launch.
///
/// Positional arguments and `--flag[=value]` options are kept apart so tests
/// can assert on either without string-splitting a command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    command: Vec<String>,
    flags: Vec<(String, Option<String>)>,
}

impl Invocation {
    /// Start an invocation from command words (`["plugin", "install", slug]`).
    pub fn new<I, S>(command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            command: command.into_iter().map(Into::into).collect(),
            flags: Vec::new(),
        }
    }

    /// Append a `--name=value` option.
    #[must_use]
    pub fn flag(mut self, name: &str, value: impl Into<String>) -> Self {
        self.flags.push((name.to_string(), Some(value.into())));
        self
    }

    /// Append a bare `--name` switch.
    #[must_use]
    pub fn switch(mut self, name: &str) -> Self {
        self.flags.push((name.to_string(), None));
        self
    }

    /// Append a bare `--name` switch only when `enabled` is true.
    #[must_use]
    pub fn switch_if(self, name: &str, enabled: bool) -> Self {
        if enabled { self.switch(name) } else { self }
    }

    /// The command words.
    #[must_use]
    pub fn command(&self) -> &[String] {
        &self.command
    }

    /// Render to the argument vector passed to the executable.
    #[must_use]
    pub fn to_argv(&self) -> Vec<String> {
        let mut argv = self.command.clone();
        for (name, value) in &self.flags {
            match value {
                Some(value) => argv.push(format!("--{}={}", name, value)),
                None => argv.push(format!("--{}", name)),
            }
        }
        argv
    }
}

impl std::fmt::Display for Invocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "wp {}", self.to_argv().join(" "))
    }
}

/// Capability of running platform CLI commands against an installation.
pub trait PlatformCli: Send + Sync {
    /// Run one invocation to completion and capture its output.
    ///
    /// `Err` means the process could not be launched at all; a nonzero exit
    /// comes back as `Ok` with `success: false` so callers can read stderr.
    fn run(&self, invocation: &Invocation) -> Result<CliOutput>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invocation_argv() {
        let invocation = Invocation::new(["plugin", "install", "acme-widget"])
            .flag("version", "2.1.0")
            .switch("force");
        assert_eq!(
            invocation.to_argv(),
            vec![
                "plugin",
                "install",
                "acme-widget",
                "--version=2.1.0",
                "--force"
            ]
        );
    }

    #[test]
    fn test_switch_if() {
        let with = Invocation::new(["theme", "activate", "x"]).switch_if("network", true);
        assert!(with.to_argv().contains(&"--network".to_string()));
        let without = Invocation::new(["theme", "activate", "x"]).switch_if("network", false);
        assert!(!without.to_argv().contains(&"--network".to_string()));
    }

    #[test]
    fn test_display_is_a_command_line() {
        let invocation = Invocation::new(["core", "version"]);
        assert_eq!(invocation.to_string(), "wp core version");
    }
}
