//! API version parsing and major-version range matching.
//!
//! Providers advertise `apiVersion` as a semantic version string. The session
//! accepts any provider whose major version matches the configured range.
//!
//! | Range | Accepts |
//! |-------|---------|
//! | `1.x` / `1.*` / `1` / `^1` | `1.0.0`, `1.4.2-beta`, `v1.2` |
//! | `2.x` | `2.0.0` |

use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::core::paths::defaults;

fn version_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^v?(\d+)(?:\.(\d+))?(?:\.(\d+))?(?:[-+][0-9A-Za-z.+-]*)?$").expect("static regex")
    })
}

fn range_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\^?v?(\d+)(?:\.(?:x|X|\*))?(?:\.(?:x|X|\*))?$").expect("static regex"))
}

/// Parsed `major.minor.patch`. Missing components default to zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ApiVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl ApiVersion {
    pub fn parse(raw: &str) -> Option<Self> {
        let caps = version_re().captures(raw.trim())?;
        let part = |i: usize| caps.get(i).map_or(Some(0), |m| m.as_str().parse().ok());
        Some(Self { major: part(1)?, minor: part(2)?, patch: part(3)? })
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Major-version constraint, e.g. `1.x`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRange {
    major: u64,
    raw: String,
}

impl VersionRange {
    pub fn major(major: u64) -> Self {
        Self { major, raw: format!("{major}.x") }
    }

    pub fn satisfies(&self, version: &ApiVersion) -> bool {
        version.major == self.major
    }

    /// Parse and check a raw version string. Unparsable versions never match.
    pub fn accepts(&self, raw: &str) -> bool {
        ApiVersion::parse(raw).is_some_and(|v| self.satisfies(&v))
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl Default for VersionRange {
    fn default() -> Self {
        defaults::API_RANGE.parse().unwrap_or_else(|_| Self::major(1))
    }
}

impl FromStr for VersionRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let caps = range_re().captures(trimmed).ok_or_else(|| format!("invalid version range: {s}"))?;
        let major = caps[1].parse().map_err(|_| format!("invalid major version: {s}"))?;
        Ok(Self { major, raw: trimmed.to_string() })
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_partial_and_prefixed_versions() {
        assert_eq!(ApiVersion::parse("1.2.3"), Some(ApiVersion { major: 1, minor: 2, patch: 3 }));
        assert_eq!(ApiVersion::parse("v1.2"), Some(ApiVersion { major: 1, minor: 2, patch: 0 }));
        assert_eq!(ApiVersion::parse("3"), Some(ApiVersion { major: 3, minor: 0, patch: 0 }));
        assert_eq!(ApiVersion::parse("1.0.0-beta.1+build"), Some(ApiVersion { major: 1, minor: 0, patch: 0 }));
        assert!(ApiVersion::parse("").is_none());
        assert!(ApiVersion::parse("one.two").is_none());
    }

    #[test]
    fn major_range_matching() {
        let range: VersionRange = "1.x".parse().unwrap();
        assert!(range.accepts("1.0.0"));
        assert!(range.accepts("1.9.12-rc"));
        assert!(!range.accepts("2.0.0"));
        assert!(!range.accepts("0.9.0"));
        assert!(!range.accepts("garbage"));
    }

    #[test]
    fn range_syntaxes() {
        for raw in ["1.x", "1.*", "1", "^1", "1.x.x"] {
            let range: VersionRange = raw.parse().unwrap();
            assert!(range.accepts("1.1.0"), "{raw}");
            assert_eq!(range.as_str(), raw);
        }
        assert!("1.2".parse::<VersionRange>().is_err());
        assert!(">=1".parse::<VersionRange>().is_err());
    }

    #[test]
    fn default_range_comes_from_defaults() {
        let range = VersionRange::default();
        assert_eq!(range.as_str(), defaults::API_RANGE);
        assert_eq!(range, defaults::API_RANGE.parse().unwrap());
        assert_eq!(range.to_string(), "1.x");
    }
}
