//! Build manifest loading and typed access.
//!
//! The manifest is parsed once per run and read-only afterwards. A missing
//! or malformed file is a fatal construction error; missing sections or keys
//! inside a valid document are a normal steady state (nothing to do) and
//! come back empty, never as errors.

use crate::error::{Error, Result};
use crate::types::ItemKind;
use crate::version::VersionSpec;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Manifest document format, normally selected by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFormat {
    /// YAML (`.yml` / `.yaml`).
    Yaml,
    /// JSON (everything else).
    Json,
}

impl ManifestFormat {
    /// Pick a format from a file extension, defaulting to JSON.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("yml" | "yaml") => Self::Yaml,
            _ => Self::Json,
        }
    }
}

/// One raw manifest entry for a plugin or theme. All fields optional; gaps
/// are filled from the category defaults and the code baseline.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ItemSpec {
    /// Desired version expression.
    pub version: Option<String>,
    /// Force installation even if already present.
    pub force: Option<bool>,
    /// Activate after install.
    pub activate: Option<bool>,
    /// Activate network-wide after install.
    #[serde(rename = "activate-network")]
    pub activate_network: Option<bool>,
}

impl ItemSpec {
    /// Merge this entry over the category defaults and the implicit
    /// baseline (`version=latest, force=false, activate=false,
    /// activate-network=false`). Entry fields win over defaults, defaults
    /// win over the baseline.
    #[must_use]
    pub fn merged_with(&self, defaults: &ItemSpec) -> EffectiveSpec {
        let version = self
            .version
            .as_deref()
            .or(defaults.version.as_deref())
            .unwrap_or("latest");
        EffectiveSpec {
            version: VersionSpec::parse(version),
            force: self.force.or(defaults.force).unwrap_or(false),
            activate: self.activate.or(defaults.activate).unwrap_or(false),
            activate_network: self
                .activate_network
                .or(defaults.activate_network)
                .unwrap_or(false),
        }
    }
}

/// Fully-merged item spec the reconciler works with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveSpec {
    /// Parsed desired version expression.
    pub version: VersionSpec,
    /// Force installation.
    pub force: bool,
    /// Activate after install.
    pub activate: bool,
    /// Activate network-wide.
    pub activate_network: bool,
}

/// `core.download` sub-section.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CoreDownload {
    /// Desired core version expression.
    pub version: Option<String>,
    /// Locale to download.
    pub locale: Option<String>,
    /// Re-download even if core files are present.
    pub force: Option<bool>,
    /// Skip bundled default themes and plugins (defaults to true).
    #[serde(rename = "skip-content")]
    pub skip_content: Option<bool>,
}

/// `core.config` sub-section (database connection parameters).
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CoreConfig {
    /// Database name.
    pub dbname: Option<String>,
    /// Database user.
    pub dbuser: Option<String>,
    /// Database password.
    pub dbpass: Option<String>,
    /// Database host.
    pub dbhost: Option<String>,
    /// Table prefix.
    pub dbprefix: Option<String>,
    /// Database charset.
    pub dbcharset: Option<String>,
    /// Database collation.
    pub dbcollate: Option<String>,
    /// Locale written into the config.
    pub locale: Option<String>,
}

/// `core.install` sub-section (site bootstrap parameters).
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CoreInstall {
    /// Site URL.
    pub url: Option<String>,
    /// Site title.
    pub title: Option<String>,
    /// Admin account name.
    #[serde(rename = "admin-user")]
    pub admin_user: Option<String>,
    /// Admin email address.
    #[serde(rename = "admin-email")]
    pub admin_email: Option<String>,
    /// Admin password.
    #[serde(rename = "admin-pass")]
    pub admin_pass: Option<String>,
    /// Skip the notification email.
    #[serde(rename = "skip-email")]
    pub skip_email: Option<bool>,
}

/// `core` top-level section.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CoreSection {
    /// Download phase parameters.
    pub download: Option<CoreDownload>,
    /// Configure phase parameters.
    pub config: Option<CoreConfig>,
    /// Site-install phase parameters.
    pub install: Option<CoreInstall>,
}

/// A parsed, immutable build manifest.
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    core: Option<CoreSection>,
    plugins: Vec<(String, ItemSpec)>,
    themes: Vec<(String, ItemSpec)>,
    defaults_plugins: ItemSpec,
    defaults_themes: ItemSpec,
}

impl Manifest {
    /// Load and parse a manifest file.
    ///
    /// Fatal if the file is missing or unparseable.
    pub fn load(path: &Path, format: Option<ManifestFormat>) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::ManifestNotFound(path.to_path_buf())
            } else {
                Error::io(path, e)
            }
        })?;
        let format = format.unwrap_or_else(|| ManifestFormat::from_path(path));
        Self::from_str(&content, format).map_err(|e| match e {
            Error::ManifestParse { message, .. } => Error::ManifestParse {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })
    }

    /// Parse a manifest from an in-memory document.
    pub fn from_str(content: &str, format: ManifestFormat) -> Result<Self> {
        let doc: serde_json::Value = match format {
            ManifestFormat::Yaml => {
                serde_yaml::from_str(content).map_err(|e| Error::ManifestParse {
                    path: PathBuf::new(),
                    message: e.to_string(),
                })?
            }
            ManifestFormat::Json => {
                serde_json::from_str(content).map_err(|e| Error::ManifestParse {
                    path: PathBuf::new(),
                    message: e.to_string(),
                })?
            }
        };
        Self::from_value(doc)
    }

    fn from_value(doc: serde_json::Value) -> Result<Self> {
        // An empty document is a valid manifest with nothing to do.
        if doc.is_null() {
            return Ok(Self::default());
        }
        let serde_json::Value::Object(map) = doc else {
            return Err(Error::ManifestParse {
                path: PathBuf::new(),
                message: "top level must be a mapping".to_string(),
            });
        };

        let core = match map.get("core") {
            Some(value) if !value.is_null() => Some(section(value.clone(), "core")?),
            _ => None,
        };
        let plugins = item_entries(map.get("plugins"), "plugins")?;
        let themes = item_entries(map.get("themes"), "themes")?;

        let (defaults_plugins, defaults_themes) = match map.get("defaults") {
            Some(serde_json::Value::Object(defaults)) => (
                defaults
                    .get("plugins")
                    .map(|v| section(v.clone(), "defaults.plugins"))
                    .transpose()?
                    .unwrap_or_default(),
                defaults
                    .get("themes")
                    .map(|v| section(v.clone(), "defaults.themes"))
                    .transpose()?
                    .unwrap_or_default(),
            ),
            _ => (ItemSpec::default(), ItemSpec::default()),
        };

        Ok(Self {
            core,
            plugins,
            themes,
            defaults_plugins,
            defaults_themes,
        })
    }

    /// The `core` section, if declared.
    #[must_use]
    pub fn core(&self) -> Option<&CoreSection> {
        self.core.as_ref()
    }

    /// Items of a category, in document order.
    #[must_use]
    pub fn items(&self, kind: ItemKind) -> &[(String, ItemSpec)] {
        match kind {
            ItemKind::Plugin => &self.plugins,
            ItemKind::Theme => &self.themes,
        }
    }

    /// Category defaults merged under every entry of that category.
    #[must_use]
    pub fn defaults(&self, kind: ItemKind) -> &ItemSpec {
        match kind {
            ItemKind::Plugin => &self.defaults_plugins,
            ItemKind::Theme => &self.defaults_themes,
        }
    }

    /// Desired core version expression, if declared.
    #[must_use]
    pub fn get_core_version(&self) -> Option<&str> {
        self.core
            .as_ref()
            .and_then(|c| c.download.as_ref())
            .and_then(|d| d.version.as_deref())
    }

    /// Desired version expression of one item, if declared.
    #[must_use]
    pub fn get_item_version(&self, kind: ItemKind, slug: &str) -> Option<&str> {
        self.items(kind)
            .iter()
            .find(|(s, _)| s.eq_ignore_ascii_case(slug))
            .and_then(|(_, spec)| spec.version.as_deref())
    }
}

fn section<T: serde::de::DeserializeOwned>(value: serde_json::Value, name: &str) -> Result<T> {
    serde_json::from_value(value).map_err(|e| Error::ManifestParse {
        path: PathBuf::new(),
        message: format!("invalid '{}' section: {}", name, e),
    })
}

fn item_entries(
    value: Option<&serde_json::Value>,
    name: &str,
) -> Result<Vec<(String, ItemSpec)>> {
    let Some(value) = value else {
        return Ok(Vec::new());
    };
    match value {
        serde_json::Value::Null => Ok(Vec::new()),
        serde_json::Value::Object(entries) => {
            let mut items = Vec::with_capacity(entries.len());
            for (slug, raw) in entries {
                // A bare `slug:` entry with no body means "latest, defaults".
                let spec = if raw.is_null() {
                    ItemSpec::default()
                } else {
                    section(raw.clone(), &format!("{}.{}", name, slug))?
                };
                items.push((slug.clone(), spec));
            }
            Ok(items)
        }
        _ => Err(Error::ManifestParse {
            path: PathBuf::new(),
            message: format!("'{}' must be a mapping of slug to spec", name),
        }),
    }
}
