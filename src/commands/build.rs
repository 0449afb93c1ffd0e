use crate::Context;
use crate::cli::BuildArgs;
use crate::ui::{self, ConsoleReporter, NoPrompt, PromptCredentials};
use anyhow::{Context as _, Result};
use buildkit::manifest::{CoreConfig, CoreInstall};
use buildkit::{
    CoreOverrides, CoreRunner, CredentialSource, HttpRegistry, InstallationRoot, ItemKind,
    Manifest, Reconciler, RunOptions, WpCli,
};

/// Which manifest sections a subcommand converges.
#[derive(Debug, Clone, Copy)]
pub struct Scope {
    pub core: bool,
    pub plugins: bool,
    pub themes: bool,
}

impl Scope {
    pub fn all() -> Self {
        Self {
            core: true,
            plugins: true,
            themes: true,
        }
    }

    pub fn only_core() -> Self {
        Self {
            core: true,
            plugins: false,
            themes: false,
        }
    }

    pub fn only(kind: ItemKind) -> Self {
        Self {
            core: false,
            plugins: kind == ItemKind::Plugin,
            themes: kind == ItemKind::Theme,
        }
    }
}

/// Run one convergence pass over the selected manifest sections.
///
/// Per-item failures are printed as they happen and summarized, but only
/// fatal errors (missing or unparseable manifest, no platform CLI) exit
/// non-zero: a run that converged some items did useful work.
pub fn run(ctx: &Context, args: &BuildArgs, scope: Scope) -> Result<()> {
    let manifest = Manifest::load(&args.file, args.format.map(Into::into))
        .with_context(|| format!("cannot load {}", args.file.display()))?;

    let root = match &args.path {
        Some(path) => InstallationRoot::new(path.clone()),
        None => InstallationRoot::new(std::env::current_dir()?),
    };
    if ctx.verbose > 0 {
        ui::info(&format!("converging {}", root.path().display()));
    }
    let cli = WpCli::new(root.clone()).context("platform CLI is required")?;
    let registry = HttpRegistry::new();
    let reporter = ConsoleReporter::new(ctx.quiet);
    let prompt = PromptCredentials;
    let no_prompt = NoPrompt;
    let credentials: &dyn CredentialSource = if args.yes { &no_prompt } else { &prompt };
    let options = RunOptions { clean: args.clean };

    let mut changed = false;
    let mut failed = false;

    if scope.core && !args.ignore_core {
        if !ctx.quiet {
            ui::section("Core");
        }
        let runner = CoreRunner::new(
            &manifest, &registry, &cli, &root, &reporter, credentials, options,
        );
        let report = runner.run(&overrides_from(args))?;
        changed |= report.changed;
        failed |= !report.is_success();
    }

    for (enabled, ignored, kind) in [
        (scope.plugins, args.ignore_plugins, ItemKind::Plugin),
        (scope.themes, args.ignore_themes, ItemKind::Theme),
    ] {
        if !enabled || ignored || manifest.items(kind).is_empty() {
            continue;
        }
        if !ctx.quiet {
            ui::section(match kind {
                ItemKind::Plugin => "Plugins",
                ItemKind::Theme => "Themes",
            });
        }
        let reconciler = Reconciler::new(&manifest, &registry, &cli, &root, &reporter, options);
        let report = reconciler.run_items(kind)?;
        changed |= report.changed;
        failed |= !report.is_success();
    }

    println!();
    if failed {
        ui::warn("Finished with errors.");
    } else if changed {
        ui::success("Finished.");
    } else {
        ui::info("Nothing to do.");
    }
    Ok(())
}

/// Command-line flags override their manifest counterparts field by field.
fn overrides_from(args: &BuildArgs) -> CoreOverrides {
    CoreOverrides {
        config: CoreConfig {
            dbname: args.config.dbname.clone(),
            dbuser: args.config.dbuser.clone(),
            dbpass: args.config.dbpass.clone(),
            dbhost: args.config.dbhost.clone(),
            dbprefix: args.config.dbprefix.clone(),
            dbcharset: None,
            dbcollate: None,
            locale: args.config.locale.clone(),
        },
        install: CoreInstall {
            url: args.install.url.clone(),
            title: args.install.title.clone(),
            admin_user: args.install.admin_user.clone(),
            admin_email: args.install.admin_email.clone(),
            admin_pass: args.install.admin_pass.clone(),
            skip_email: args.install.skip_email.then_some(true),
        },
    }
}
