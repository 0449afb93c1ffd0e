//! Core types shared across the build engine.

use std::fmt;
use std::path::{Path, PathBuf};

/// The two registry-managed item categories.
///
/// A closed enum instead of stringly-typed dispatch: every component that
/// needs per-category behavior (CLI command name, content directory,
/// registry endpoint) matches on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    /// A plugin, installed under `wp-content/plugins`.
    Plugin,
    /// A theme, installed under `wp-content/themes`.
    Theme,
}

impl ItemKind {
    /// CLI command name for this kind (`wp plugin ...` / `wp theme ...`).
    #[must_use]
    pub fn command(&self) -> &'static str {
        match self {
            Self::Plugin => "plugin",
            Self::Theme => "theme",
        }
    }

    /// Manifest section name (`plugins` / `themes`).
    #[must_use]
    pub fn section(&self) -> &'static str {
        match self {
            Self::Plugin => "plugins",
            Self::Theme => "themes",
        }
    }

    /// Directory holding items of this kind, relative to the content dir.
    #[must_use]
    pub fn content_dir(&self, root: &InstallationRoot) -> PathBuf {
        root.content_path().join(self.section())
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.command())
    }
}

/// Root directory of the installation being converged.
///
/// Constructed once at process entry and threaded through every component
/// that touches the filesystem; there is no process-wide implicit path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallationRoot(PathBuf);

impl InstallationRoot {
    /// Wrap a root path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    /// The root path itself.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.0
    }

    /// Path of the platform configuration file.
    #[must_use]
    pub fn config_file(&self) -> PathBuf {
        self.0.join("wp-config.php")
    }

    /// Path of the content directory.
    #[must_use]
    pub fn content_path(&self) -> PathBuf {
        self.0.join("wp-content")
    }

    /// Directory of a single item.
    #[must_use]
    pub fn item_dir(&self, kind: ItemKind, slug: &str) -> PathBuf {
        kind.content_dir(self).join(slug)
    }
}

/// Probed state of a single plugin or theme.
///
/// A failed status query is deliberately conflated with "not present": the
/// platform CLI has no distinct unknown state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemState {
    /// Item is not installed.
    Absent,
    /// Item is installed but not active.
    Inactive {
        /// Currently installed version.
        version: String,
    },
    /// Item is installed and active.
    Active {
        /// Currently installed version.
        version: String,
    },
}

impl ItemState {
    /// Installed version, if the item is present at all.
    #[must_use]
    pub fn version(&self) -> Option<&str> {
        match self {
            Self::Absent => None,
            Self::Inactive { version } | Self::Active { version } => Some(version),
        }
    }
}

/// Probed state of the platform core.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoreState {
    /// Whether the configuration file is present.
    pub configured: bool,
    /// Whether the setup wizard has completed.
    pub installed: bool,
    /// Core version reported by the CLI, if core files are present.
    pub version: Option<String>,
}

/// The computed action for one item.
///
/// Pure function of state observed at the start of the run; the engine never
/// re-probes mid-transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Place raw files only (platform not yet installed, or clean mode).
    Download,
    /// Install the item, then activate it as a separate step.
    InstallAndActivate,
    /// Item present but inactive; activate it.
    Activate,
    /// Item active at a different version than desired.
    Update {
        /// Currently installed version.
        from: String,
        /// Resolved desired version.
        to: String,
    },
    /// Nothing to do for this item.
    Noop,
}

impl Transition {
    /// Whether executing this transition counts as "something happened".
    #[must_use]
    pub fn is_action(&self) -> bool {
        !matches!(self, Self::Noop)
    }
}

/// Result of executing one action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionOutcome {
    /// Whether the action succeeded.
    pub success: bool,
    /// Failure (or informational) message, stripped of CLI severity prefixes.
    pub message: Option<String>,
}

impl ActionOutcome {
    /// A successful outcome with no message.
    #[must_use]
    pub fn ok() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    /// A failed outcome with a message.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

/// Terminal status of one manifest item after a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemStatus {
    /// An action was executed and succeeded.
    Done {
        /// The transition that ran.
        transition: Transition,
    },
    /// An action was executed and failed; siblings are unaffected.
    Failed {
        /// The transition that ran.
        transition: Transition,
        /// Failure message.
        message: String,
    },
    /// Item already matches desired state.
    Unchanged,
    /// Slug unknown to the registry; item is custom and never managed.
    Excluded,
    /// Registry could not be reached this run; item skipped, no retry.
    Unresolved {
        /// What went wrong.
        message: String,
    },
}

/// Per-item report line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemReport {
    /// Manifest slug.
    pub slug: String,
    /// Terminal status for this run.
    pub status: ItemStatus,
}

/// Aggregated result for one category (core, plugins or themes).
#[derive(Debug, Clone, Default)]
pub struct CategoryReport {
    /// Whether anything was attempted (drives "Finished." vs "Nothing to do.").
    pub changed: bool,
    /// One entry per manifest item, in manifest order.
    pub items: Vec<ItemReport>,
}

impl CategoryReport {
    /// Whether every attempted action succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        !self
            .items
            .iter()
            .any(|i| matches!(i.status, ItemStatus::Failed { .. }))
    }
}

/// Options for a reconciliation run.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Delete each item's directory and re-download from zero.
    pub clean: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_kind_paths() {
        let root = InstallationRoot::new("/srv/site");
        assert_eq!(
            ItemKind::Plugin.content_dir(&root),
            PathBuf::from("/srv/site/wp-content/plugins")
        );
        assert_eq!(
            root.item_dir(ItemKind::Theme, "twentytwenty"),
            PathBuf::from("/srv/site/wp-content/themes/twentytwenty")
        );
    }

    #[test]
    fn test_config_file_path() {
        let root = InstallationRoot::new("/srv/site");
        assert_eq!(root.config_file(), PathBuf::from("/srv/site/wp-config.php"));
    }

    #[test]
    fn test_item_state_version() {
        assert_eq!(ItemState::Absent.version(), None);
        let active = ItemState::Active {
            version: "1.2.3".to_string(),
        };
        assert_eq!(active.version(), Some("1.2.3"));
    }

    #[test]
    fn test_transition_is_action() {
        assert!(Transition::Download.is_action());
        assert!(
            Transition::Update {
                from: "1.0.0".to_string(),
                to: "1.1.0".to_string(),
            }
            .is_action()
        );
        assert!(!Transition::Noop.is_action());
    }

    #[test]
    fn test_report_success() {
        let mut report = CategoryReport::default();
        report.items.push(ItemReport {
            slug: "a".to_string(),
            status: ItemStatus::Done {
                transition: Transition::Activate,
            },
        });
        assert!(report.is_success());

        report.items.push(ItemReport {
            slug: "b".to_string(),
            status: ItemStatus::Failed {
                transition: Transition::Activate,
                message: "no such plugin".to_string(),
            },
        });
        assert!(!report.is_success());
    }
}
