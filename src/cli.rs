use buildkit::ManifestFormat;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sitebuild")]
#[command(version)]
#[command(about = "Converge a WordPress install to a build manifest", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Converge core, plugins and themes
    All(BuildArgs),

    /// Converge core only
    Core(BuildArgs),

    /// Converge plugins only
    Plugins(BuildArgs),

    /// Converge themes only
    Themes(BuildArgs),
}

impl Command {
    pub fn args(&self) -> &BuildArgs {
        match self {
            Self::All(args) | Self::Core(args) | Self::Plugins(args) | Self::Themes(args) => args,
        }
    }
}

#[derive(Parser)]
pub struct BuildArgs {
    /// Build manifest file
    #[arg(short, long, default_value = "build.yml")]
    pub file: PathBuf,

    /// Manifest format (default: by file extension)
    #[arg(long, value_enum)]
    pub format: Option<FormatArg>,

    /// Installation root directory (default: current directory)
    #[arg(short, long)]
    pub path: Option<PathBuf>,

    /// Delete each item's directory and reinstall from zero
    #[arg(long)]
    pub clean: bool,

    /// Never prompt; fail when a required value is missing
    #[arg(short, long)]
    pub yes: bool,

    /// Skip the core section
    #[arg(long)]
    pub ignore_core: bool,

    /// Skip the plugins section
    #[arg(long)]
    pub ignore_plugins: bool,

    /// Skip the themes section
    #[arg(long)]
    pub ignore_themes: bool,

    #[command(flatten)]
    pub config: ConfigArgs,

    #[command(flatten)]
    pub install: InstallArgs,
}

/// Database parameters for `core config`, overriding the manifest.
#[derive(Parser)]
pub struct ConfigArgs {
    /// Database name
    #[arg(long)]
    pub dbname: Option<String>,

    /// Database user
    #[arg(long)]
    pub dbuser: Option<String>,

    /// Database password
    #[arg(long)]
    pub dbpass: Option<String>,

    /// Database host
    #[arg(long)]
    pub dbhost: Option<String>,

    /// Table prefix
    #[arg(long)]
    pub dbprefix: Option<String>,

    /// Locale for download and config
    #[arg(long)]
    pub locale: Option<String>,
}

/// Site bootstrap parameters for `core install`, overriding the manifest.
#[derive(Parser)]
pub struct InstallArgs {
    /// Site URL
    #[arg(long)]
    pub url: Option<String>,

    /// Site title
    #[arg(long)]
    pub title: Option<String>,

    /// Admin account name
    #[arg(long)]
    pub admin_user: Option<String>,

    /// Admin email address
    #[arg(long)]
    pub admin_email: Option<String>,

    /// Admin password
    #[arg(long)]
    pub admin_pass: Option<String>,

    /// Skip the new-site notification email
    #[arg(long)]
    pub skip_email: bool,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum FormatArg {
    Yml,
    Json,
}

impl From<FormatArg> for ManifestFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Yml => Self::Yaml,
            FormatArg::Json => Self::Json,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_is_well_formed() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_default_manifest_file() {
        let cli = Cli::parse_from(["sitebuild", "all"]);
        assert_eq!(cli.command.args().file, PathBuf::from("build.yml"));
        assert!(!cli.command.args().clean);
    }

    #[test]
    fn test_overrides_parse() {
        let cli = Cli::parse_from([
            "sitebuild",
            "core",
            "--file",
            "production.yml",
            "--dbname",
            "site",
            "--clean",
        ]);
        let args = cli.command.args();
        assert_eq!(args.file, PathBuf::from("production.yml"));
        assert_eq!(args.config.dbname.as_deref(), Some("site"));
        assert!(args.clean);
    }
}
