//! Compiler version identifiers.
//!
//! Both solc and Vyper publish version strings of the shape
//! `v<semver>+commit.<sha>`, though Vyper historically omits the leading
//! `v` and, for pre-releases, uses a non-semver suffix (`0.4.0rc6`) that
//! [`normalize_vyper_prerelease`] rewrites to `0.4.0-rc6` so ordering
//! comparisons against other versions work.

use semver::Version;
use std::{fmt, str::FromStr};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DetailedVersion {
    version: Version,
    /// The exact string the compiler list published; preserved verbatim for
    /// artifact storage even though `version` may have been normalized.
    original: String,
    commit: String,
}

impl DetailedVersion {
    pub fn version(&self) -> &Version {
        &self.version
    }

    pub fn commit(&self) -> &str {
        &self.commit
    }

    /// The original, possibly non-semver string this was parsed from.
    pub fn original(&self) -> &str {
        &self.original
    }
}

impl fmt::Display for DetailedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.original)
    }
}

/// Rewrites Vyper's non-semver pre-release suffixes (`rc6`, `b1`, `a3`) into
/// a semver-compatible pre-release segment (`-rc6`, `-beta.1`, `-alpha.3`).
/// Versions that already parse as semver are returned unchanged.
pub fn normalize_vyper_prerelease(version: &str) -> String {
    if Version::parse(version).is_ok() {
        return version.to_string();
    }

    if let Ok((major, minor, patch, suffix)) =
        sscanf::sscanf!(version, "{u64}.{u64}.{u64}{String}")
    {
        let split_at = suffix.find(|c: char| c.is_ascii_digit()).unwrap_or(suffix.len());
        let (tag, rest) = suffix.split_at(split_at);
        let label = match tag {
            "rc" => "rc",
            "b" => "beta.",
            "a" => "alpha.",
            _ => return version.to_string(),
        };
        return format!("{major}.{minor}.{patch}-{label}{rest}");
    }

    version.to_string()
}

impl FromStr for DetailedVersion {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let without_prefix = s.strip_prefix('v').unwrap_or(s);
        let (version_part, commit) = without_prefix
            .split_once("+commit.")
            .ok_or_else(|| anyhow::anyhow!("version string {s:?} has no +commit. suffix"))?;

        let normalized = normalize_vyper_prerelease(version_part);
        let version = Version::parse(&normalized)
            .map_err(|e| anyhow::anyhow!("parsing version {version_part:?}: {e}"))?;

        Ok(Self {
            version,
            original: s.to_string(),
            commit: commit.to_string(),
        })
    }
}

impl serde::Serialize for DetailedVersion {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.original)
    }
}

impl<'de> serde::Deserialize<'de> for DetailedVersion {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        DetailedVersion::from_str(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_solidity_version() {
        let version = DetailedVersion::from_str("v0.8.10+commit.fc410830").unwrap();
        assert_eq!(version.version(), &Version::new(0, 8, 10));
        assert_eq!(version.commit(), "fc410830");
        assert_eq!(version.original(), "v0.8.10+commit.fc410830");
    }

    #[test]
    fn parses_vyper_version_without_v_prefix() {
        let version = DetailedVersion::from_str("0.3.6+commit.4a2124d0").unwrap();
        assert_eq!(version.version(), &Version::new(0, 3, 6));
    }

    #[test]
    fn normalizes_vyper_release_candidate() {
        assert_eq!(normalize_vyper_prerelease("0.4.0rc6"), "0.4.0-rc6");
        assert_eq!(normalize_vyper_prerelease("0.3.1"), "0.3.1");
    }

    #[test]
    fn ordering_respects_normalized_semver() {
        let older = DetailedVersion::from_str("v0.8.9+commit.e5eed63a").unwrap();
        let newer = DetailedVersion::from_str("v0.8.10+commit.fc410830").unwrap();
        assert!(older < newer);
    }
}
