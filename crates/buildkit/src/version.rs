//! Version expression parsing and resolution against a registry version list.
//!
//! Registry version strings are not strict semver (`"6.2"` is a perfectly
//! normal core version), so every parse goes through [`parse_loose`], which
//! pads missing components before handing the string to the `semver` crate.
//! Resolution never fails: a malformed constraint falls back to the
//! registry's latest version rather than blocking an install.

use std::cmp::Ordering;

/// Sentinel returned for `dev` requests; callers build an unversioned link.
pub const DEV_SENTINEL: &str = "dev";

/// A parsed version expression from the manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionSpec {
    /// `"latest"` or `"*"`: whatever the registry currently calls current.
    Latest,
    /// `"dev"`: the registry's unversioned development archive.
    Dev,
    /// A concrete version, passed through unchanged even if unknown.
    Exact(String),
    /// `^base`: highest available with the same major, at least `base`.
    Caret(String),
    /// `~base`: highest available with the same major.minor, at least `base`.
    Tilde(String),
}

impl VersionSpec {
    /// Parse a manifest version expression.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        match raw {
            "" | "*" | "latest" => Self::Latest,
            DEV_SENTINEL => Self::Dev,
            _ => {
                if let Some(base) = raw.strip_prefix('^') {
                    Self::Caret(base.to_string())
                } else if let Some(base) = raw.strip_prefix('~') {
                    Self::Tilde(base.to_string())
                } else {
                    Self::Exact(raw.to_string())
                }
            }
        }
    }

    /// Whether this expression means "track the registry's latest".
    #[must_use]
    pub fn is_latest(&self) -> bool {
        matches!(self, Self::Latest)
    }

    /// Render back to the manifest syntax (for status lines).
    #[must_use]
    pub fn raw(&self) -> String {
        match self {
            Self::Latest => "latest".to_string(),
            Self::Dev => DEV_SENTINEL.to_string(),
            Self::Exact(v) => v.clone(),
            Self::Caret(base) => format!("^{}", base),
            Self::Tilde(base) => format!("~{}", base),
        }
    }
}

/// Resolve a version expression against the registry's latest version and
/// its list of available versions.
///
/// Deterministic for fixed inputs. Operator expressions fall back to
/// `latest` when the constraint is malformed, no available version matches,
/// or the available set is empty.
#[must_use]
pub fn resolve(requested: &VersionSpec, latest: &str, available: &[String]) -> String {
    match requested {
        VersionSpec::Latest => latest.to_string(),
        VersionSpec::Dev => DEV_SENTINEL.to_string(),
        VersionSpec::Exact(v) => v.clone(),
        VersionSpec::Caret(base) => resolve_range('^', base, latest, available),
        VersionSpec::Tilde(base) => resolve_range('~', base, latest, available),
    }
}

fn resolve_range(op: char, base: &str, latest: &str, available: &[String]) -> String {
    let Some(normalized) = normalize(base) else {
        return latest.to_string();
    };
    let Ok(req) = semver::VersionReq::parse(&format!("{}{}", op, normalized)) else {
        return latest.to_string();
    };

    let mut best: Option<(semver::Version, &str)> = None;
    for candidate in available {
        // Versions the registry lists that don't parse (e.g. "trunk") can
        // never satisfy a range constraint.
        let Some(parsed) = parse_loose(candidate) else {
            continue;
        };
        if !req.matches(&parsed) {
            continue;
        }
        match &best {
            Some((current, _)) if *current >= parsed => {}
            _ => best = Some((parsed, candidate)),
        }
    }

    best.map_or_else(|| latest.to_string(), |(_, raw)| raw.to_string())
}

/// Compare two version strings with loose semver semantics.
///
/// Falls back to plain string comparison when either side is not a version
/// at all, so ordering is still total for status-line labels.
#[must_use]
pub fn compare(a: &str, b: &str) -> Ordering {
    match (parse_loose(a), parse_loose(b)) {
        (Some(va), Some(vb)) => va.cmp(&vb),
        _ => a.cmp(b),
    }
}

/// Parse a possibly-incomplete version string (`"6.2"`, `"1.0-beta1"`).
#[must_use]
pub fn parse_loose(raw: &str) -> Option<semver::Version> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(version) = semver::Version::parse(raw) {
        return Some(version);
    }
    normalize(raw).and_then(|n| semver::Version::parse(&n).ok())
}

/// Pad a version string out to `major.minor.patch`, keeping any
/// pre-release/build suffix attached to the last numeric component.
fn normalize(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let (numeric, suffix) = match raw.find(['-', '+']) {
        Some(idx) => (&raw[..idx], &raw[idx..]),
        None => (raw, ""),
    };

    let mut parts: Vec<&str> = numeric.split('.').collect();
    if parts.is_empty() || parts.len() > 3 {
        return None;
    }
    if parts.iter().any(|p| p.is_empty() || !p.chars().all(|c| c.is_ascii_digit())) {
        return None;
    }
    while parts.len() < 3 {
        parts.push("0");
    }

    Some(format!("{}{}", parts.join("."), suffix))
}
