//! Registry client for item metadata and archives.
//!
//! One network call per item per run, no caching and no in-run retries. An
//! unknown slug is the one and only signal that an item is custom (not
//! registry-managed); transport failures are reported separately so the
//! exclusion list never contains items that merely hit a flaky network.

use crate::error::{Error, Result};
use crate::types::ItemKind;
use crate::version::{self, DEV_SENTINEL, VersionSpec};
use serde::Deserialize;
use std::time::Duration;

/// Bounded timeout for every registry request; fetches must never hang a run.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum archive download size (plugins and themes are small).
const MAX_BODY_SIZE: u64 = 50 * 1024 * 1024;

/// Registry metadata for one item, with the requested version resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryItemInfo {
    /// Item slug.
    pub slug: String,
    /// Version the registry currently calls latest.
    pub latest_version: String,
    /// All published versions, in registry order.
    pub available: Vec<String>,
    /// Download link as returned by the registry (https-rewritten).
    pub download_link: String,
    /// Concrete version picked for the requested expression.
    pub resolved_version: String,
    /// Download link for the resolved version.
    pub resolved_download_link: String,
}

/// Registry capability consumed by the reconciler.
///
/// Abstracted as a trait so tests can run against a scripted registry, the
/// same way the platform CLI is mocked.
pub trait Registry: Send + Sync {
    /// Fetch metadata for a slug and resolve `requested` against it.
    ///
    /// `Ok(None)` means the registry has no listing for the slug: the item
    /// is custom and must be excluded from management. `Err` means the
    /// registry could not be consulted this run.
    fn item_info(
        &self,
        kind: ItemKind,
        slug: &str,
        requested: &VersionSpec,
    ) -> Result<Option<RegistryItemInfo>>;

    /// Version the registry currently offers as core's latest.
    fn core_latest(&self) -> Result<Option<String>>;

    /// Fetch an item archive.
    fn download(&self, url: &str) -> Result<Vec<u8>>;
}

/// Registry client backed by the wordpress.org API.
pub struct HttpRegistry {
    agent: ureq::Agent,
    api_base: String,
}

impl HttpRegistry {
    /// Create a client against the public registry.
    #[must_use]
    pub fn new() -> Self {
        Self::with_api_base("https://api.wordpress.org")
    }

    /// Create a client with a custom API base (for testing).
    #[must_use]
    pub fn with_api_base(api_base: impl Into<String>) -> Self {
        let agent: ureq::Agent = ureq::config::Config::builder()
            .timeout_global(Some(REQUEST_TIMEOUT))
            .build()
            .into();
        Self {
            agent,
            api_base: api_base.into(),
        }
    }

    /// The configured API base URL.
    #[must_use]
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn info_url(&self, kind: ItemKind, slug: &str) -> String {
        match kind {
            ItemKind::Plugin => {
                format!("{}/plugins/info/1.0/{}.json", self.api_base, slug)
            }
            ItemKind::Theme => format!(
                "{}/themes/info/1.1/?action=theme_information&request[slug]={}&request[fields][versions]=1",
                self.api_base, slug
            ),
        }
    }

    fn version_check_url(&self) -> String {
        format!("{}/core/version-check/1.7/", self.api_base)
    }
}

impl Default for HttpRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry for HttpRegistry {
    fn item_info(
        &self,
        kind: ItemKind,
        slug: &str,
        requested: &VersionSpec,
    ) -> Result<Option<RegistryItemInfo>> {
        let url = self.info_url(kind, slug);
        let body: serde_json::Value = match self.agent.get(&url).call() {
            Ok(mut response) => response
                .body_mut()
                .read_json()
                .map_err(|e| Error::InvalidResponse(e.to_string()))?,
            // The registry answers item-not-found with a 404 on the plugin
            // endpoint; treat it as "custom item", not as an error.
            Err(ureq::Error::StatusCode(404)) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(parse_item_response(kind, slug, &body)
            .map(|raw| finalize(slug, raw, requested)))
    }

    fn core_latest(&self) -> Result<Option<String>> {
        let response: VersionCheckResponse = self
            .agent
            .get(&self.version_check_url())
            .call()?
            .body_mut()
            .read_json()
            .map_err(|e| Error::InvalidResponse(e.to_string()))?;
        Ok(response.offers.into_iter().next().map(|o| o.current))
    }

    fn download(&self, url: &str) -> Result<Vec<u8>> {
        let mut response = self.agent.get(url).call()?;
        response
            .body_mut()
            .with_config()
            .limit(MAX_BODY_SIZE)
            .read_to_vec()
            .map_err(|e| Error::Network {
                message: e.to_string(),
            })
    }
}

#[derive(Debug, Deserialize)]
struct VersionCheckResponse {
    #[serde(default)]
    offers: Vec<VersionCheckOffer>,
}

#[derive(Debug, Deserialize)]
struct VersionCheckOffer {
    current: String,
}

/// Registry fields before version resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
struct RawItemInfo {
    latest_version: String,
    available: Vec<String>,
    download_link: String,
}

/// Extract item fields from a registry response body.
///
/// The registry reports unknown slugs inconsistently (`null`, `false`, or
/// an error object); anything without a usable `version` field counts as
/// not found.
fn parse_item_response(
    kind: ItemKind,
    slug: &str,
    body: &serde_json::Value,
) -> Option<RawItemInfo> {
    let object = body.as_object()?;
    let latest_version = object.get("version")?.as_str()?.to_string();

    let available = object
        .get("versions")
        .and_then(|v| v.as_object())
        .map(|versions| versions.keys().cloned().collect())
        .unwrap_or_default();

    let download_link = object
        .get("download_link")
        .and_then(|v| v.as_str())
        .map_or_else(|| default_download_link(kind, slug), ToString::to_string);

    Some(RawItemInfo {
        latest_version,
        available,
        download_link,
    })
}

fn default_download_link(kind: ItemKind, slug: &str) -> String {
    format!("https://downloads.wordpress.org/{}/{}.zip", kind, slug)
}

/// Resolve the requested version and rebuild the download link for it.
fn finalize(slug: &str, raw: RawItemInfo, requested: &VersionSpec) -> RegistryItemInfo {
    // The registry is known to hand out http links even though it serves
    // https; rewrite unconditionally.
    let download_link = if let Some(rest) = raw.download_link.strip_prefix("http://") {
        log::debug!("rewriting insecure download link for {}", slug);
        format!("https://{}", rest)
    } else {
        raw.download_link
    };

    let resolved_version = version::resolve(requested, &raw.latest_version, &raw.available);

    // Substitute the resolved version into the link's filename pattern;
    // the dev sentinel maps to the unversioned archive.
    let prefix = download_link
        .split_once(slug)
        .map_or_else(String::new, |(head, _)| head.to_string());
    let resolved_download_link = if resolved_version == DEV_SENTINEL {
        format!("{}{}.zip", prefix, slug)
    } else {
        format!("{}{}.{}.zip", prefix, slug, resolved_version)
    };

    RegistryItemInfo {
        slug: slug.to_string(),
        latest_version: raw.latest_version,
        available: raw.available,
        download_link,
        resolved_version,
        resolved_download_link,
    }
}
