//! Installed-state probing.
//!
//! Read-only queries against the installation, done once per run before any
//! action executes. A failed status query means "not present": the platform
//! CLI exits nonzero both for missing items and for a broken install, and in
//! either case the safe reading is absent.

use crate::backend::{Invocation, PlatformCli};
use crate::types::{CoreState, InstallationRoot, ItemKind, ItemState};

/// Read-only prober over one installation.
pub struct Prober<'a> {
    cli: &'a dyn PlatformCli,
    root: &'a InstallationRoot,
}

impl<'a> Prober<'a> {
    /// Bind a prober to a CLI backend and an installation root.
    pub fn new(cli: &'a dyn PlatformCli, root: &'a InstallationRoot) -> Self {
        Self { cli, root }
    }

    /// Probe the three facts about core: configured, installed, version.
    ///
    /// `configured` comes from the filesystem, not the CLI: the CLI cannot
    /// answer anything before a configuration file exists.
    #[must_use]
    pub fn core_state(&self) -> CoreState {
        let configured = self.root.config_file().is_file();

        let version = self
            .cli
            .run(&Invocation::new(["core", "version"]))
            .ok()
            .filter(|out| out.success && !out.stdout.is_empty())
            .map(|out| out.stdout);

        let installed = version.is_some()
            && self
                .cli
                .run(&Invocation::new(["core", "is-installed"]))
                .is_ok_and(|out| out.success);

        CoreState {
            configured,
            installed,
            version,
        }
    }

    /// Whether the platform is installed enough to manage items through the
    /// CLI. Before that, items can only be placed as raw files.
    #[must_use]
    pub fn platform_ready(&self) -> bool {
        self.core_state().installed
    }

    /// Probe one item's install state.
    #[must_use]
    pub fn item_state(&self, kind: ItemKind, slug: &str) -> ItemState {
        let status = match self.field(kind, slug, "status") {
            Some(status) => status,
            None => return ItemState::Absent,
        };
        let version = self.field(kind, slug, "version").unwrap_or_default();

        match status.as_str() {
            "active" | "active-network" => ItemState::Active { version },
            _ => ItemState::Inactive { version },
        }
    }

    fn field(&self, kind: ItemKind, slug: &str, field: &str) -> Option<String> {
        self.cli
            .run(&Invocation::new([kind.command(), "get", slug]).flag("field", field))
            .ok()
            .filter(|out| out.success && !out.stdout.is_empty())
            .map(|out| out.stdout)
    }
}
