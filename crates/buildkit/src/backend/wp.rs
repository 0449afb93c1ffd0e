//! Real platform CLI backend, shelling out to the `wp` executable.

use super::{CliOutput, Invocation, PlatformCli};
use crate::error::{Error, Result};
use crate::types::InstallationRoot;
use std::path::PathBuf;
use std::process::Command;

/// Well-known install locations checked when `wp` is not on PATH.
const FALLBACK_PATHS: &[&str] = &["/usr/local/bin/wp", "/opt/homebrew/bin/wp"];

/// Backend that launches the `wp` executable against one installation root.
pub struct WpCli {
    wp_path: PathBuf,
    root: InstallationRoot,
}

impl WpCli {
    /// Locate the `wp` executable and bind it to an installation root.
    pub fn new(root: InstallationRoot) -> Result<Self> {
        Ok(Self {
            wp_path: find_wp()?,
            root,
        })
    }

    /// Use an explicit executable path instead of searching.
    pub fn with_executable(wp_path: impl Into<PathBuf>, root: InstallationRoot) -> Self {
        Self {
            wp_path: wp_path.into(),
            root,
        }
    }

    /// Path of the executable this backend launches.
    #[must_use]
    pub fn executable(&self) -> &std::path::Path {
        &self.wp_path
    }
}

impl PlatformCli for WpCli {
    fn run(&self, invocation: &Invocation) -> Result<CliOutput> {
        log::debug!("running {}", invocation);
        let output = Command::new(&self.wp_path)
            .args(invocation.to_argv())
            .arg(format!("--path={}", self.root.path().display()))
            .output()
            .map_err(|e| Error::CommandFailed {
                message: format!("failed to launch {}", invocation),
                stderr: e.to_string(),
            })?;

        Ok(CliOutput {
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            success: output.status.success(),
        })
    }
}

/// Find the `wp` executable on PATH, then in well-known locations.
fn find_wp() -> Result<PathBuf> {
    if let Ok(path) = which::which("wp") {
        return Ok(path);
    }
    FALLBACK_PATHS
        .iter()
        .map(PathBuf::from)
        .find(|p| p.is_file())
        .ok_or(Error::CliNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_executable_skips_lookup() {
        let root = InstallationRoot::new("/srv/site");
        let cli = WpCli::with_executable("/opt/tools/wp", root);
        assert_eq!(cli.executable(), std::path::Path::new("/opt/tools/wp"));
    }

    #[test]
    fn test_launch_failure_is_command_failed() {
        let root = InstallationRoot::new("/srv/site");
        let cli = WpCli::with_executable("/nonexistent/wp-binary", root);
        let err = cli
            .run(&Invocation::new(["core", "version"]))
            .unwrap_err();
        assert!(matches!(err, Error::CommandFailed { .. }));
    }
}
