//! Item reconciliation: compare desired state against installed state and
//! execute the difference.
//!
//! Items are processed strictly in manifest order, one registry lookup and
//! at most one action each. A failed item never stops its siblings; the only
//! aborts are manifest errors, which happen before a reconciler exists.

use crate::backend::PlatformCli;
use crate::error::Result;
use crate::executor::Executor;
use crate::manifest::{EffectiveSpec, Manifest};
use crate::probe::Prober;
use crate::registry::{Registry, RegistryItemInfo};
use crate::report::Reporter;
use crate::types::{
    ActionOutcome, CategoryReport, InstallationRoot, ItemKind, ItemReport, ItemState, ItemStatus,
    RunOptions, Transition,
};
use crate::version::{self, DEV_SENTINEL};
use std::cmp::Ordering;

/// Drives one category of items to its desired state.
pub struct Reconciler<'a> {
    manifest: &'a Manifest,
    registry: &'a dyn Registry,
    cli: &'a dyn PlatformCli,
    root: &'a InstallationRoot,
    reporter: &'a dyn Reporter,
    options: RunOptions,
}

impl<'a> Reconciler<'a> {
    /// Bind a reconciler to its collaborators.
    pub fn new(
        manifest: &'a Manifest,
        registry: &'a dyn Registry,
        cli: &'a dyn PlatformCli,
        root: &'a InstallationRoot,
        reporter: &'a dyn Reporter,
        options: RunOptions,
    ) -> Self {
        Self {
            manifest,
            registry,
            cli,
            root,
            reporter,
            options,
        }
    }

    /// Reconcile every manifest item of one category, in manifest order.
    pub fn run_items(&self, kind: ItemKind) -> Result<CategoryReport> {
        let prober = Prober::new(self.cli, self.root);
        let executor = Executor::new(self.cli, self.registry, self.root);
        let platform_ready = prober.platform_ready();

        let mut report = CategoryReport::default();
        for (slug, raw) in self.manifest.items(kind) {
            let spec = raw.merged_with(self.manifest.defaults(kind));
            let status = self.run_one(kind, slug, &spec, platform_ready, &prober, &executor)?;
            if matches!(status, ItemStatus::Done { .. } | ItemStatus::Failed { .. }) {
                report.changed = true;
            }
            report.items.push(ItemReport {
                slug: slug.clone(),
                status,
            });
        }
        Ok(report)
    }

    fn run_one(
        &self,
        kind: ItemKind,
        slug: &str,
        spec: &EffectiveSpec,
        platform_ready: bool,
        prober: &Prober<'_>,
        executor: &Executor<'_>,
    ) -> Result<ItemStatus> {
        // One registry lookup per item per run. An unknown slug permanently
        // excludes the item; a transport failure only skips it this run.
        let info = match self.registry.item_info(kind, slug, &spec.version) {
            Ok(Some(info)) => info,
            Ok(None) => {
                self.reporter.item_excluded(kind, slug);
                return Ok(ItemStatus::Excluded);
            }
            Err(e) => {
                let message = e.to_string();
                self.reporter.item_unresolved(kind, slug, &message);
                return Ok(ItemStatus::Unresolved { message });
            }
        };

        if self.options.clean {
            if let Err(e) = executor.remove_item_dir(kind, slug) {
                self.reporter
                    .note(&format!("could not remove {} {}: {}", kind, slug, e));
            }
        }

        let item_dir_exists = self.root.item_dir(kind, slug).is_dir();
        let state = if platform_ready {
            prober.item_state(kind, slug)
        } else {
            ItemState::Absent
        };

        let transition = classify(
            platform_ready,
            item_dir_exists,
            self.options.clean,
            spec.force,
            &state,
            &info.resolved_version,
        );
        if !transition.is_action() {
            return Ok(ItemStatus::Unchanged);
        }

        self.reporter.action_started(kind, slug, &transition);
        let outcome = self.execute(kind, slug, spec, &info, &transition, executor)?;
        self.reporter.action_finished(
            kind,
            slug,
            &transition,
            outcome.message.as_deref().filter(|_| !outcome.success),
        );

        Ok(if outcome.success {
            ItemStatus::Done { transition }
        } else {
            ItemStatus::Failed {
                transition,
                message: outcome.message.unwrap_or_else(|| "unknown error".to_string()),
            }
        })
    }

    fn execute(
        &self,
        kind: ItemKind,
        slug: &str,
        spec: &EffectiveSpec,
        info: &RegistryItemInfo,
        transition: &Transition,
        executor: &Executor<'_>,
    ) -> Result<ActionOutcome> {
        match transition {
            Transition::Download => executor.download_item(kind, info),
            Transition::InstallAndActivate => {
                let outcome = executor.install_item(kind, slug, info, spec.force)?;
                if !outcome.success {
                    return Ok(outcome);
                }
                // A fresh install is always brought up active; the manifest
                // flag only chooses network-wide activation. An "already
                // active" complaint from the CLI is ignorable.
                executor.activate_item(kind, slug, spec.activate_network)
            }
            Transition::Activate => executor.activate_item(kind, slug, spec.activate_network),
            Transition::Update { .. } => executor.update_item(kind, slug, info),
            Transition::Noop => Ok(ActionOutcome::ok()),
        }
    }
}

/// Compute the transition for one item from state observed at run start.
///
/// Pure so every branch is testable without a registry or a CLI. Before the
/// platform is installed the CLI cannot manage items, so the only possible
/// actions are raw file placement or nothing.
#[must_use]
pub fn classify(
    platform_ready: bool,
    item_dir_exists: bool,
    clean: bool,
    force: bool,
    state: &ItemState,
    desired: &str,
) -> Transition {
    // Clean mode already removed the item's files; the only valid move is
    // a fresh download, no matter what the platform reports about the item.
    if clean {
        return Transition::Download;
    }

    if !platform_ready {
        return if item_dir_exists && !force {
            Transition::Noop
        } else {
            Transition::Download
        };
    }

    match state {
        ItemState::Absent => Transition::InstallAndActivate,
        _ if force => Transition::InstallAndActivate,
        ItemState::Inactive { .. } => Transition::Activate,
        ItemState::Active { version } => {
            // Tracking dev always reinstalls; there is no version to compare.
            if desired == DEV_SENTINEL {
                return Transition::Update {
                    from: version.clone(),
                    to: desired.to_string(),
                };
            }
            match version::compare(version, desired) {
                Ordering::Equal => Transition::Noop,
                _ => Transition::Update {
                    from: version.clone(),
                    to: desired.to_string(),
                },
            }
        }
    }
}

/// Human label for a version move, for status lines.
#[must_use]
pub fn update_label(from: &str, to: &str) -> &'static str {
    match version::compare(from, to) {
        Ordering::Greater => "Downgrading",
        _ => "Updating",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{CliOutput, Invocation};
    use crate::manifest::ManifestFormat;
    use crate::report::NullReporter;
    use crate::version::VersionSpec;
    use std::sync::Mutex;

    struct ScriptedCli {
        handler: Box<dyn Fn(&Invocation) -> Result<CliOutput> + Send + Sync>,
        seen: Mutex<Vec<Vec<String>>>,
    }

    impl ScriptedCli {
        fn new(
            handler: impl Fn(&Invocation) -> Result<CliOutput> + Send + Sync + 'static,
        ) -> Self {
            Self {
                handler: Box::new(handler),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl PlatformCli for ScriptedCli {
        fn run(&self, invocation: &Invocation) -> Result<CliOutput> {
            self.seen.lock().unwrap().push(invocation.to_argv());
            (self.handler)(invocation)
        }
    }

    struct FakeRegistry {
        known: Vec<(&'static str, &'static str)>,
        fail: Vec<&'static str>,
        corrupt: Vec<&'static str>,
    }

    impl Registry for FakeRegistry {
        fn item_info(
            &self,
            _kind: ItemKind,
            slug: &str,
            requested: &VersionSpec,
        ) -> Result<Option<RegistryItemInfo>> {
            if self.fail.contains(&slug) {
                return Err(crate::error::Error::Network {
                    message: "timeout".to_string(),
                });
            }
            let Some((_, latest)) = self.known.iter().find(|(s, _)| *s == slug) else {
                return Ok(None);
            };
            let resolved = version::resolve(requested, latest, &[(*latest).to_string()]);
            Ok(Some(RegistryItemInfo {
                slug: slug.to_string(),
                latest_version: (*latest).to_string(),
                available: vec![(*latest).to_string()],
                download_link: format!(
                    "https://downloads.wordpress.org/plugin/{}.{}.zip",
                    slug, latest
                ),
                resolved_download_link: format!(
                    "https://downloads.wordpress.org/plugin/{}.{}.zip",
                    slug, resolved
                ),
                resolved_version: resolved,
            }))
        }

        fn core_latest(&self) -> Result<Option<String>> {
            Ok(None)
        }

        fn download(&self, url: &str) -> Result<Vec<u8>> {
            if self.corrupt.iter().any(|slug| url.contains(slug)) {
                return Ok(b"not an archive".to_vec());
            }
            // Smallest possible valid archive: empty central directory.
            let buf = std::io::Cursor::new(Vec::new());
            let writer = zip::ZipWriter::new(buf);
            Ok(writer.finish().unwrap().into_inner())
        }
    }

    fn manifest(yaml: &str) -> Manifest {
        Manifest::from_str(yaml, ManifestFormat::Yaml).unwrap()
    }

    fn installed_site_cli(active: &'static [(&'static str, &'static str)]) -> ScriptedCli {
        ScriptedCli::new(move |inv| {
            let argv = inv.to_argv();
            Ok(match inv.command() {
                [a, b] if a == "core" && b == "version" => CliOutput::ok("6.2"),
                [a, b] if a == "core" && b == "is-installed" => CliOutput::ok(""),
                [_, b, slug] if b == "get" => {
                    let Some((_, version)) = active.iter().find(|(s, _)| s == slug) else {
                        return Ok(CliOutput::err("Error: not found"));
                    };
                    if argv.contains(&"--field=status".to_string()) {
                        CliOutput::ok("active")
                    } else {
                        CliOutput::ok(*version)
                    }
                }
                _ => CliOutput::ok("Success."),
            })
        })
    }

    #[test]
    fn test_classify_before_platform_ready() {
        let absent = ItemState::Absent;
        assert_eq!(
            classify(false, false, false, false, &absent, "2.1.0"),
            Transition::Download
        );
        assert_eq!(
            classify(false, true, false, false, &absent, "2.1.0"),
            Transition::Noop
        );
        // Clean mode re-downloads even when the directory was there.
        assert_eq!(
            classify(false, true, true, false, &absent, "2.1.0"),
            Transition::Download
        );
    }

    #[test]
    fn test_classify_on_installed_platform() {
        assert_eq!(
            classify(true, false, false, false, &ItemState::Absent, "2.1.0"),
            Transition::InstallAndActivate
        );
        assert_eq!(
            classify(
                true,
                true,
                false,
                false,
                &ItemState::Inactive {
                    version: "2.1.0".to_string()
                },
                "2.1.0"
            ),
            Transition::Activate
        );
        assert_eq!(
            classify(
                true,
                true,
                false,
                false,
                &ItemState::Active {
                    version: "2.1.0".to_string()
                },
                "2.1.0"
            ),
            Transition::Noop
        );
        assert_eq!(
            classify(
                true,
                true,
                false,
                false,
                &ItemState::Active {
                    version: "2.0.0".to_string()
                },
                "2.1.0"
            ),
            Transition::Update {
                from: "2.0.0".to_string(),
                to: "2.1.0".to_string()
            }
        );
    }

    #[test]
    fn test_classify_force_reinstalls_active_item() {
        assert_eq!(
            classify(
                true,
                true,
                false,
                true,
                &ItemState::Active {
                    version: "2.1.0".to_string()
                },
                "2.1.0"
            ),
            Transition::InstallAndActivate
        );
    }

    #[test]
    fn test_update_label() {
        assert_eq!(update_label("1.0.0", "2.0.0"), "Updating");
        assert_eq!(update_label("2.0.0", "1.0.0"), "Downgrading");
    }

    #[test]
    fn test_absent_item_is_installed_on_ready_platform() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("wp-config.php"), "<?php").unwrap();
        let root = InstallationRoot::new(dir.path());

        let manifest = manifest("plugins:\n  acme-widget:\n    version: \"*\"\n");
        let registry = FakeRegistry {
            known: vec![("acme-widget", "2.1.0")],
            fail: vec![],
            corrupt: vec![],
        };
        let cli = installed_site_cli(&[]);

        let reconciler = Reconciler::new(
            &manifest,
            &registry,
            &cli,
            &root,
            &NullReporter,
            RunOptions::default(),
        );
        let report = reconciler.run_items(ItemKind::Plugin).unwrap();

        assert!(report.changed);
        assert!(report.is_success());
        assert_eq!(report.items.len(), 1);
        assert!(matches!(
            report.items[0].status,
            ItemStatus::Done {
                transition: Transition::InstallAndActivate
            }
        ));
        let seen = cli.seen.lock().unwrap();
        assert!(
            seen.contains(&vec![
                "plugin".to_string(),
                "install".to_string(),
                "acme-widget".to_string(),
                "--version=2.1.0".to_string()
            ])
        );
    }

    #[test]
    fn test_matching_item_is_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("wp-config.php"), "<?php").unwrap();
        let root = InstallationRoot::new(dir.path());

        let manifest = manifest("plugins:\n  acme-widget:\n    version: \"2.1.0\"\n");
        let registry = FakeRegistry {
            known: vec![("acme-widget", "2.1.0")],
            fail: vec![],
            corrupt: vec![],
        };
        let cli = installed_site_cli(&[("acme-widget", "2.1.0")]);

        let reconciler = Reconciler::new(
            &manifest,
            &registry,
            &cli,
            &root,
            &NullReporter,
            RunOptions::default(),
        );
        let report = reconciler.run_items(ItemKind::Plugin).unwrap();

        assert!(!report.changed);
        assert!(matches!(report.items[0].status, ItemStatus::Unchanged));
    }

    #[test]
    fn test_unknown_slug_is_excluded_not_failed() {
        let dir = tempfile::tempdir().unwrap();
        let root = InstallationRoot::new(dir.path());

        let manifest = manifest("plugins:\n  custom-internal:\n");
        let registry = FakeRegistry {
            known: vec![],
            fail: vec![],
            corrupt: vec![],
        };
        let cli = installed_site_cli(&[]);

        let reconciler = Reconciler::new(
            &manifest,
            &registry,
            &cli,
            &root,
            &NullReporter,
            RunOptions::default(),
        );
        let report = reconciler.run_items(ItemKind::Plugin).unwrap();

        assert!(!report.changed);
        assert!(report.is_success());
        assert!(matches!(report.items[0].status, ItemStatus::Excluded));
    }

    #[test]
    fn test_failed_lookup_does_not_stop_siblings() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("wp-config.php"), "<?php").unwrap();
        let root = InstallationRoot::new(dir.path());

        let manifest = manifest("plugins:\n  flaky:\n  acme-widget:\n");
        let registry = FakeRegistry {
            known: vec![("acme-widget", "2.1.0")],
            fail: vec!["flaky"],
            corrupt: vec![],
        };
        let cli = installed_site_cli(&[]);

        let reconciler = Reconciler::new(
            &manifest,
            &registry,
            &cli,
            &root,
            &NullReporter,
            RunOptions::default(),
        );
        let report = reconciler.run_items(ItemKind::Plugin).unwrap();

        assert_eq!(report.items.len(), 2);
        assert!(matches!(
            report.items[0].status,
            ItemStatus::Unresolved { .. }
        ));
        assert!(matches!(report.items[1].status, ItemStatus::Done { .. }));
    }

    #[test]
    fn test_failed_action_isolated_to_its_item() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("wp-config.php"), "<?php").unwrap();
        let root = InstallationRoot::new(dir.path());

        let manifest = manifest("plugins:\n  broken:\n  acme-widget:\n");
        let registry = FakeRegistry {
            known: vec![("broken", "1.0.0"), ("acme-widget", "2.1.0")],
            fail: vec![],
            corrupt: vec![],
        };
        let cli = ScriptedCli::new(|inv| {
            let argv = inv.to_argv();
            Ok(match inv.command() {
                [a, b] if a == "core" && b == "version" => CliOutput::ok("6.2"),
                [a, b] if a == "core" && b == "is-installed" => CliOutput::ok(""),
                [_, b, _] if b == "get" => CliOutput::err("Error: not found"),
                _ if argv.iter().any(|a| a == "broken") => {
                    CliOutput::err("Error: package corrupt")
                }
                _ => CliOutput::ok("Success."),
            })
        });

        let reconciler = Reconciler::new(
            &manifest,
            &registry,
            &cli,
            &root,
            &NullReporter,
            RunOptions::default(),
        );
        let report = reconciler.run_items(ItemKind::Plugin).unwrap();

        assert!(report.changed);
        assert!(!report.is_success());
        assert!(matches!(
            report.items[0].status,
            ItemStatus::Failed { ref message, .. } if message == "package corrupt"
        ));
        assert!(matches!(report.items[1].status, ItemStatus::Done { .. }));
    }

    #[test]
    fn test_report_preserves_manifest_order() {
        let dir = tempfile::tempdir().unwrap();
        let root = InstallationRoot::new(dir.path());

        let manifest = manifest("plugins:\n  zzz:\n  aaa:\n  mmm:\n");
        let registry = FakeRegistry {
            known: vec![("zzz", "1.0"), ("aaa", "1.0"), ("mmm", "1.0")],
            fail: vec![],
            corrupt: vec![],
        };
        // Platform not installed, no dirs exist, so everything downloads.
        let cli = ScriptedCli::new(|_| Ok(CliOutput::err("not a WordPress install")));

        let reconciler = Reconciler::new(
            &manifest,
            &registry,
            &cli,
            &root,
            &NullReporter,
            RunOptions::default(),
        );
        let report = reconciler.run_items(ItemKind::Plugin).unwrap();
        let slugs: Vec<&str> = report.items.iter().map(|i| i.slug.as_str()).collect();
        assert_eq!(slugs, vec!["zzz", "aaa", "mmm"]);
    }

    #[test]
    fn test_clean_mode_redownloads_existing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let root = InstallationRoot::new(dir.path());
        let plugin_dir = root.item_dir(ItemKind::Plugin, "acme-widget");
        std::fs::create_dir_all(&plugin_dir).unwrap();
        std::fs::write(plugin_dir.join("stale.php"), "<?php").unwrap();

        let manifest = manifest("plugins:\n  acme-widget:\n");
        let registry = FakeRegistry {
            known: vec![("acme-widget", "2.1.0")],
            fail: vec![],
            corrupt: vec![],
        };
        let cli = ScriptedCli::new(|_| Ok(CliOutput::err("not a WordPress install")));

        let reconciler = Reconciler::new(
            &manifest,
            &registry,
            &cli,
            &root,
            &NullReporter,
            RunOptions { clean: true },
        );
        let report = reconciler.run_items(ItemKind::Plugin).unwrap();

        assert!(report.changed);
        assert!(matches!(
            report.items[0].status,
            ItemStatus::Done {
                transition: Transition::Download
            }
        ));
        assert!(!plugin_dir.join("stale.php").exists());
    }

    #[test]
    fn test_install_always_activates_as_a_follow_up() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("wp-config.php"), "<?php").unwrap();
        let root = InstallationRoot::new(dir.path());

        // No activate flag anywhere in the manifest.
        let manifest = manifest("plugins:\n  acme-widget:\n    version: \"*\"\n");
        let registry = FakeRegistry {
            known: vec![("acme-widget", "2.1.0")],
            fail: vec![],
            corrupt: vec![],
        };
        let cli = installed_site_cli(&[]);

        let reconciler = Reconciler::new(
            &manifest,
            &registry,
            &cli,
            &root,
            &NullReporter,
            RunOptions::default(),
        );
        reconciler.run_items(ItemKind::Plugin).unwrap();

        let seen = cli.seen.lock().unwrap();
        let install_pos = seen
            .iter()
            .position(|argv| argv.get(1).is_some_and(|a| a == "install"))
            .unwrap();
        let activate_pos = seen
            .iter()
            .position(|argv| argv.get(1).is_some_and(|a| a == "activate"))
            .unwrap();
        assert!(install_pos < activate_pos);
        assert!(!seen[install_pos].iter().any(|a| a.contains("activate")));
        assert!(!seen[activate_pos].contains(&"--network".to_string()));
    }

    #[test]
    fn test_network_activation_switch() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("wp-config.php"), "<?php").unwrap();
        let root = InstallationRoot::new(dir.path());

        let manifest = manifest("plugins:\n  acme-widget:\n    activate-network: true\n");
        let registry = FakeRegistry {
            known: vec![("acme-widget", "2.1.0")],
            fail: vec![],
            corrupt: vec![],
        };
        let cli = installed_site_cli(&[]);

        let reconciler = Reconciler::new(
            &manifest,
            &registry,
            &cli,
            &root,
            &NullReporter,
            RunOptions::default(),
        );
        reconciler.run_items(ItemKind::Plugin).unwrap();

        let seen = cli.seen.lock().unwrap();
        let activate = seen
            .iter()
            .find(|argv| argv.get(1).is_some_and(|a| a == "activate"))
            .unwrap();
        assert!(activate.contains(&"--network".to_string()));
    }

    #[test]
    fn test_classify_clean_wins_over_probed_state() {
        let active = ItemState::Active {
            version: "2.1.0".to_string(),
        };
        // Even a fully converged item re-downloads under clean.
        assert_eq!(
            classify(true, true, true, false, &active, "2.1.0"),
            Transition::Download
        );
        assert_eq!(
            classify(
                true,
                true,
                true,
                false,
                &ItemState::Inactive {
                    version: "2.1.0".to_string()
                },
                "2.1.0"
            ),
            Transition::Download
        );
    }

    #[test]
    fn test_clean_mode_redownloads_on_installed_platform() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("wp-config.php"), "<?php").unwrap();
        let root = InstallationRoot::new(dir.path());
        let plugin_dir = root.item_dir(ItemKind::Plugin, "acme-widget");
        std::fs::create_dir_all(&plugin_dir).unwrap();
        std::fs::write(plugin_dir.join("stale.php"), "<?php").unwrap();

        let manifest = manifest("plugins:\n  acme-widget:\n    version: \"2.1.0\"\n");
        let registry = FakeRegistry {
            known: vec![("acme-widget", "2.1.0")],
            fail: vec![],
            corrupt: vec![],
        };
        // The item is active at exactly the desired version.
        let cli = installed_site_cli(&[("acme-widget", "2.1.0")]);

        let reconciler = Reconciler::new(
            &manifest,
            &registry,
            &cli,
            &root,
            &NullReporter,
            RunOptions { clean: true },
        );
        let report = reconciler.run_items(ItemKind::Plugin).unwrap();

        // The deleted files must be re-fetched, never reported Unchanged.
        assert!(report.changed);
        assert!(matches!(
            report.items[0].status,
            ItemStatus::Done {
                transition: Transition::Download
            }
        ));
        assert!(!plugin_dir.join("stale.php").exists());
    }

    #[test]
    fn test_failed_unpack_isolated_to_its_item() {
        let dir = tempfile::tempdir().unwrap();
        let root = InstallationRoot::new(dir.path());

        let manifest = manifest("plugins:\n  broken:\n  acme-widget:\n");
        let registry = FakeRegistry {
            known: vec![("broken", "1.0.0"), ("acme-widget", "2.1.0")],
            fail: vec![],
            corrupt: vec!["broken"],
        };
        // Platform not installed, so both items take the download path.
        let cli = ScriptedCli::new(|_| Ok(CliOutput::err("not a WordPress install")));

        let reconciler = Reconciler::new(
            &manifest,
            &registry,
            &cli,
            &root,
            &NullReporter,
            RunOptions::default(),
        );
        let report = reconciler.run_items(ItemKind::Plugin).unwrap();

        assert_eq!(report.items.len(), 2);
        assert!(!report.is_success());
        assert!(matches!(
            report.items[0].status,
            ItemStatus::Failed {
                transition: Transition::Download,
                ..
            }
        ));
        assert!(matches!(report.items[1].status, ItemStatus::Done { .. }));
    }

    #[derive(Default)]
    struct SiteState {
        // slug -> (status, version)
        items: std::collections::HashMap<String, (String, String)>,
    }

    /// CLI whose answers reflect its own earlier mutations, so a second run
    /// observes what the first run did.
    struct StatefulCli {
        state: Mutex<SiteState>,
        seen: Mutex<Vec<Vec<String>>>,
    }

    impl StatefulCli {
        fn new() -> Self {
            Self {
                state: Mutex::new(SiteState::default()),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl PlatformCli for StatefulCli {
        fn run(&self, invocation: &Invocation) -> Result<CliOutput> {
            let argv = invocation.to_argv();
            self.seen.lock().unwrap().push(argv.clone());
            let mut state = self.state.lock().unwrap();
            let flag_version = argv
                .iter()
                .find_map(|a| a.strip_prefix("--version="))
                .unwrap_or_default()
                .to_string();

            Ok(match invocation.command() {
                [a, b] if a == "core" && b == "version" => CliOutput::ok("6.2"),
                [a, b] if a == "core" && b == "is-installed" => CliOutput::ok(""),
                [_, b, slug] if b == "get" => match state.items.get(slug.as_str()) {
                    None => CliOutput::err("Error: not found"),
                    Some((status, version)) => {
                        if argv.contains(&"--field=status".to_string()) {
                            CliOutput::ok(status.clone())
                        } else {
                            CliOutput::ok(version.clone())
                        }
                    }
                },
                [_, b, slug] if b == "install" => {
                    state
                        .items
                        .insert(slug.clone(), ("inactive".to_string(), flag_version));
                    CliOutput::ok("Installed.")
                }
                [_, b, slug] if b == "activate" => {
                    if let Some(entry) = state.items.get_mut(slug.as_str()) {
                        entry.0 = "active".to_string();
                    }
                    CliOutput::ok("Activated.")
                }
                [_, b, slug] if b == "update" => {
                    if let Some(entry) = state.items.get_mut(slug.as_str()) {
                        entry.1 = flag_version;
                    }
                    CliOutput::ok("Updated.")
                }
                _ => CliOutput::ok("Success."),
            })
        }
    }

    #[test]
    fn test_second_run_is_all_noops() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("wp-config.php"), "<?php").unwrap();
        let root = InstallationRoot::new(dir.path());

        let manifest =
            manifest("plugins:\n  acme-widget:\n    version: \"*\"\n  classic-editor:\n");
        let registry = FakeRegistry {
            known: vec![("acme-widget", "2.1.0"), ("classic-editor", "1.6.2")],
            fail: vec![],
            corrupt: vec![],
        };
        let cli = StatefulCli::new();

        let reconciler = Reconciler::new(
            &manifest,
            &registry,
            &cli,
            &root,
            &NullReporter,
            RunOptions::default(),
        );

        let first = reconciler.run_items(ItemKind::Plugin).unwrap();
        assert!(first.changed);
        assert!(first.is_success());
        assert!(
            first
                .items
                .iter()
                .all(|i| matches!(i.status, ItemStatus::Done { .. }))
        );

        // Converged installation: the second run must not touch anything.
        let second = reconciler.run_items(ItemKind::Plugin).unwrap();
        assert!(!second.changed);
        assert!(
            second
                .items
                .iter()
                .all(|i| matches!(i.status, ItemStatus::Unchanged))
        );
        // All mutations happened in the first run.
        let seen = cli.seen.lock().unwrap();
        let mutations = seen
            .iter()
            .filter(|argv| {
                argv.get(1)
                    .is_some_and(|a| a == "install" || a == "activate" || a == "update")
            })
            .count();
        assert_eq!(mutations, 4);
    }
}
