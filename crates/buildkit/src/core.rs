//! Core convergence: download, configure, install, update.
//!
//! Phases run in a fixed order and each one re-checks its own precondition
//! immediately before acting, because the previous phase changes the world
//! (download creates the files configure needs, configure writes the file
//! install needs). A failed phase stops the core sequence but never the
//! item categories.

use crate::backend::{Invocation, PlatformCli};
use crate::error::Result;
use crate::executor::Executor;
use crate::manifest::{CoreConfig, CoreDownload, CoreInstall, Manifest};
use crate::probe::Prober;
use crate::prompt::{self, CredentialSource};
use crate::registry::Registry;
use crate::report::Reporter;
use crate::types::{ActionOutcome, InstallationRoot, RunOptions};
use crate::version::{self, VersionSpec};
use std::cmp::Ordering;

/// The phases of the core sequence, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorePhase {
    /// Fetch core files.
    Download,
    /// Write the configuration file.
    Configure,
    /// Run the site installer.
    Install,
    /// Move existing core files to a higher version.
    Update,
}

impl CorePhase {
    /// Phase name for status lines.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Download => "download",
            Self::Configure => "configure",
            Self::Install => "install",
            Self::Update => "update",
        }
    }
}

/// Result of one core run.
#[derive(Debug, Clone, Default)]
pub struct CoreReport {
    /// Whether any phase was attempted.
    pub changed: bool,
    /// Outcome of every phase that ran, in order.
    pub phases: Vec<(CorePhase, ActionOutcome)>,
}

impl CoreReport {
    /// Whether every attempted phase succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.phases.iter().all(|(_, outcome)| outcome.success)
    }

    fn record(&mut self, phase: CorePhase, outcome: ActionOutcome) -> bool {
        self.changed = true;
        let success = outcome.success;
        self.phases.push((phase, outcome));
        success
    }
}

/// Command-line values that win over their manifest counterparts.
///
/// Only fields a flag was actually passed for are `Some`; everything else
/// falls through to the manifest, then to a prompt.
#[derive(Debug, Clone, Default)]
pub struct CoreOverrides {
    /// Database connection overrides.
    pub config: CoreConfig,
    /// Site bootstrap overrides.
    pub install: CoreInstall,
}

/// Drives core to its desired state.
pub struct CoreRunner<'a> {
    manifest: &'a Manifest,
    registry: &'a dyn Registry,
    cli: &'a dyn PlatformCli,
    root: &'a InstallationRoot,
    reporter: &'a dyn Reporter,
    credentials: &'a dyn CredentialSource,
    options: RunOptions,
}

impl<'a> CoreRunner<'a> {
    /// Bind a core runner to its collaborators.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        manifest: &'a Manifest,
        registry: &'a dyn Registry,
        cli: &'a dyn PlatformCli,
        root: &'a InstallationRoot,
        reporter: &'a dyn Reporter,
        credentials: &'a dyn CredentialSource,
        options: RunOptions,
    ) -> Self {
        Self {
            manifest,
            registry,
            cli,
            root,
            reporter,
            credentials,
            options,
        }
    }

    /// Run the core sequence. Without a `core` manifest section this is a
    /// no-op; a manifest that only lists plugins manages only plugins.
    pub fn run(&self, overrides: &CoreOverrides) -> Result<CoreReport> {
        let mut report = CoreReport::default();
        let Some(section) = self.manifest.core() else {
            return Ok(report);
        };

        let download = section.download.clone().unwrap_or_default();
        let prober = Prober::new(self.cli, self.root);
        let state = prober.core_state();

        let desired = match self.resolve_desired_version(&download) {
            Ok(desired) => desired,
            Err(e) => {
                // Can't know what "latest" means this run; surface it as a
                // failed download phase instead of guessing.
                self.reporter
                    .core_phase_finished(CorePhase::Download.name(), Some(&e.to_string()));
                report.record(CorePhase::Download, ActionOutcome::failed(e.to_string()));
                return Ok(report);
            }
        };
        let force = download.force.unwrap_or(false) || self.options.clean;

        match &state.version {
            None => {
                if !self.download_phase(&download, desired.as_deref(), force, &mut report)? {
                    return Ok(report);
                }
            }
            Some(current) => {
                // Existing installs only ever move up. A manifest asking for
                // a lower version than what is on disk is left alone.
                if let Some(desired) = desired.as_deref() {
                    if version::compare(current, desired) == Ordering::Less
                        && !self.update_phase(current, desired, force, &mut report)?
                    {
                        return Ok(report);
                    }
                }
            }
        }

        // Re-check on the filesystem rather than trusting the probe from
        // before the download phase ran.
        if !self.root.config_file().is_file()
            && !self.configure_phase(
                section.config.clone().unwrap_or_default(),
                overrides,
                &mut report,
            )?
        {
            return Ok(report);
        }

        if !state.installed {
            self.install_phase(
                section.install.clone().unwrap_or_default(),
                overrides,
                &mut report,
            )?;
        }

        Ok(report)
    }

    /// Resolve the manifest's core version expression to a concrete version.
    ///
    /// `None` means "no pin": download uses the CLI's default (latest) and
    /// update has nothing to move to.
    fn resolve_desired_version(&self, download: &CoreDownload) -> Result<Option<String>> {
        let spec = match download.version.as_deref() {
            Some(raw) => VersionSpec::parse(raw),
            None => return Ok(None),
        };
        if let VersionSpec::Exact(v) = &spec {
            return Ok(Some(v.clone()));
        }

        match self.registry.core_latest()? {
            Some(latest) => Ok(Some(version::resolve(&spec, &latest, &[]))),
            None => Ok(None),
        }
    }

    fn download_phase(
        &self,
        download: &CoreDownload,
        desired: Option<&str>,
        force: bool,
        report: &mut CoreReport,
    ) -> Result<bool> {
        let mut invocation = Invocation::new(["core", "download"]);
        if let Some(version) = desired {
            invocation = invocation.flag("version", version);
        }
        if let Some(locale) = &download.locale {
            invocation = invocation.flag("locale", locale.as_str());
        }
        invocation = invocation
            .switch_if("skip-content", download.skip_content.unwrap_or(true))
            .switch_if("force", force);

        self.run_phase(CorePhase::Download, &invocation, desired.unwrap_or("latest"), report)
    }

    fn update_phase(
        &self,
        current: &str,
        desired: &str,
        force: bool,
        report: &mut CoreReport,
    ) -> Result<bool> {
        let invocation = Invocation::new(["core", "update"])
            .flag("version", desired)
            .switch_if("force", force);
        let detail = format!("{} -> {}", current, desired);
        self.run_phase(CorePhase::Update, &invocation, &detail, report)
    }

    fn configure_phase(
        &self,
        config: CoreConfig,
        overrides: &CoreOverrides,
        report: &mut CoreReport,
    ) -> Result<bool> {
        let o = &overrides.config;
        let dbname = self.required(o.dbname.as_deref().or(config.dbname.as_deref()), "dbname", "Database name")?;
        let dbuser = self.required(o.dbuser.as_deref().or(config.dbuser.as_deref()), "dbuser", "Database user")?;
        let dbpass = self.required(o.dbpass.as_deref().or(config.dbpass.as_deref()), "dbpass", "Database password")?;

        let mut invocation = Invocation::new(["core", "config"])
            .flag("dbname", dbname)
            .flag("dbuser", dbuser)
            .flag("dbpass", dbpass);
        for (name, value) in [
            ("dbhost", o.dbhost.as_deref().or(config.dbhost.as_deref())),
            ("dbprefix", o.dbprefix.as_deref().or(config.dbprefix.as_deref())),
            ("dbcharset", o.dbcharset.as_deref().or(config.dbcharset.as_deref())),
            ("dbcollate", o.dbcollate.as_deref().or(config.dbcollate.as_deref())),
            ("locale", o.locale.as_deref().or(config.locale.as_deref())),
        ] {
            if let Some(value) = value {
                invocation = invocation.flag(name, value);
            }
        }

        self.run_phase(CorePhase::Configure, &invocation, "wp-config.php", report)
    }

    fn install_phase(
        &self,
        install: CoreInstall,
        overrides: &CoreOverrides,
        report: &mut CoreReport,
    ) -> Result<bool> {
        let o = &overrides.install;
        let url = self.required(o.url.as_deref().or(install.url.as_deref()), "url", "Site URL")?;
        let title = self.required(o.title.as_deref().or(install.title.as_deref()), "title", "Site title")?;
        let admin_user = self.required(
            o.admin_user.as_deref().or(install.admin_user.as_deref()),
            "admin-user",
            "Admin username",
        )?;
        let admin_email = self.required(
            o.admin_email.as_deref().or(install.admin_email.as_deref()),
            "admin-email",
            "Admin email",
        )?;
        let admin_pass = self.required(
            o.admin_pass.as_deref().or(install.admin_pass.as_deref()),
            "admin-pass",
            "Admin password",
        )?;

        let invocation = Invocation::new(["core", "install"])
            .flag("url", url.as_str())
            .flag("title", title.as_str())
            .flag("admin_user", admin_user.as_str())
            .flag("admin_email", admin_email.as_str())
            .flag("admin_password", admin_pass.as_str())
            .switch_if(
                "skip-email",
                o.skip_email.or(install.skip_email).unwrap_or(true),
            );

        self.run_phase(CorePhase::Install, &invocation, &url, report)
    }

    fn run_phase(
        &self,
        phase: CorePhase,
        invocation: &Invocation,
        detail: &str,
        report: &mut CoreReport,
    ) -> Result<bool> {
        self.reporter.core_phase_started(phase.name(), detail);
        let outcome = Executor::new(self.cli, self.registry, self.root).run(invocation)?;
        self.reporter.core_phase_finished(
            phase.name(),
            outcome.message.as_deref().filter(|_| !outcome.success),
        );
        Ok(report.record(phase, outcome))
    }

    /// Manifest value, then prompt until non-empty.
    fn required(&self, declared: Option<&str>, field: &str, prompt_text: &str) -> Result<String> {
        match declared {
            Some(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
            _ => prompt::acquire(self.credentials, field, prompt_text),
        }
    }

}
