//! Action execution.
//!
//! Turns computed transitions into platform CLI invocations and archive
//! unpacks. Every action reports an [`ActionOutcome`] rather than an error:
//! a failed action is an ordinary per-item result, and only a process that
//! cannot be launched at all propagates as `Err`.

use crate::backend::{CliOutput, Invocation, PlatformCli};
use crate::error::{Error, Result};
use crate::registry::{Registry, RegistryItemInfo};
use crate::types::{ActionOutcome, InstallationRoot, ItemKind};
use crate::version::DEV_SENTINEL;
use std::io::Cursor;

/// Stderr fragments that do not indicate a real failure.
const IGNORABLE_STDERR: &[&str] = &["already active", "already installed"];

/// Executes item actions against one installation.
pub struct Executor<'a> {
    cli: &'a dyn PlatformCli,
    registry: &'a dyn Registry,
    root: &'a InstallationRoot,
}

impl<'a> Executor<'a> {
    /// Bind an executor to its collaborators.
    pub fn new(
        cli: &'a dyn PlatformCli,
        registry: &'a dyn Registry,
        root: &'a InstallationRoot,
    ) -> Self {
        Self {
            cli,
            registry,
            root,
        }
    }

    /// Run one invocation and classify its output.
    pub fn run(&self, invocation: &Invocation) -> Result<ActionOutcome> {
        let output = self.cli.run(invocation)?;
        Ok(classify_output(&output))
    }

    /// Install an item at its resolved version. Activation is never part of
    /// the install invocation; it runs as its own step so a failed
    /// activation leaves a diagnosable installed-but-inactive state.
    pub fn install_item(
        &self,
        kind: ItemKind,
        slug: &str,
        info: &RegistryItemInfo,
        force: bool,
    ) -> Result<ActionOutcome> {
        // The dev archive has no version the CLI can ask for; install it
        // straight from its URL.
        let invocation = if info.resolved_version == DEV_SENTINEL {
            Invocation::new([
                kind.command(),
                "install",
                info.resolved_download_link.as_str(),
            ])
        } else {
            Invocation::new([kind.command(), "install", slug])
                .flag("version", info.resolved_version.as_str())
        };
        self.run(&invocation.switch_if("force", force))
    }

    /// Activate an installed item.
    pub fn activate_item(
        &self,
        kind: ItemKind,
        slug: &str,
        network: bool,
    ) -> Result<ActionOutcome> {
        self.run(&Invocation::new([kind.command(), "activate", slug]).switch_if("network", network))
    }

    /// Move an active item to the resolved version. The CLI handles both
    /// directions; a downgrade is just an update to a lower version.
    pub fn update_item(
        &self,
        kind: ItemKind,
        slug: &str,
        info: &RegistryItemInfo,
    ) -> Result<ActionOutcome> {
        let invocation = if info.resolved_version == DEV_SENTINEL {
            Invocation::new([
                kind.command(),
                "install",
                info.resolved_download_link.as_str(),
            ])
            .switch("force")
        } else {
            Invocation::new([kind.command(), "update", slug])
                .flag("version", info.resolved_version.as_str())
        };
        self.run(&invocation)
    }

    /// Fetch an item archive and unpack it into the category directory,
    /// without involving the platform CLI. This is the only way to place
    /// items before core is installed.
    pub fn download_item(&self, kind: ItemKind, info: &RegistryItemInfo) -> Result<ActionOutcome> {
        // Fetch, unpack and filesystem failures are all ordinary per-item
        // outcomes; nothing here may abort the sibling items.
        let outcome = self
            .registry
            .download(&info.resolved_download_link)
            .and_then(|bytes| self.unpack_item(kind, bytes));
        Ok(match outcome {
            Ok(()) => ActionOutcome::ok(),
            Err(e) => ActionOutcome::failed(e.to_string()),
        })
    }

    fn unpack_item(&self, kind: ItemKind, bytes: Vec<u8>) -> Result<()> {
        let dest = kind.content_dir(self.root);
        std::fs::create_dir_all(&dest).map_err(|e| Error::io(&dest, e))?;

        let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| Error::Archive(e.to_string()))?;
        // Archives are rooted at `{slug}/`, so extracting into the category
        // directory lands the item in place.
        archive
            .extract(&dest)
            .map_err(|e| Error::Archive(e.to_string()))?;
        Ok(())
    }

    /// Remove an item's directory, for clean mode. A directory that is
    /// already gone counts as removed.
    pub fn remove_item_dir(&self, kind: ItemKind, slug: &str) -> Result<()> {
        let dir = self.root.item_dir(kind, slug);
        match std::fs::remove_dir_all(&dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::io(dir, e)),
        }
    }
}

/// Classify CLI output into an action outcome.
///
/// The CLI writes real failures to stderr even when it exits zero, so any
/// non-ignorable stderr marks the action failed.
#[must_use]
pub fn classify_output(output: &CliOutput) -> ActionOutcome {
    if !output.success {
        let message = if output.stderr.is_empty() {
            &output.stdout
        } else {
            &output.stderr
        };
        return ActionOutcome::failed(strip_severity(message));
    }
    if !output.stderr.is_empty() && !is_ignorable_stderr(&output.stderr) {
        return ActionOutcome::failed(strip_severity(&output.stderr));
    }
    ActionOutcome::ok()
}

fn is_ignorable_stderr(stderr: &str) -> bool {
    let lowered = stderr.to_lowercase();
    IGNORABLE_STDERR.iter().any(|frag| lowered.contains(frag))
}

/// Drop the CLI's severity prefix from a message.
#[must_use]
pub fn strip_severity(message: &str) -> String {
    let message = message.trim();
    for prefix in ["Error:", "Warning:", "Success:"] {
        if let Some(rest) = message.strip_prefix(prefix) {
            return rest.trim().to_string();
        }
    }
    message.to_string()
}
