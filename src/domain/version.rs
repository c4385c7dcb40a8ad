use crate::error::{ReleaseError, Result};
use std::fmt;
use std::str::FromStr;

/// Semantic version representation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl Version {
    /// Create a new version
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Version {
            major,
            minor,
            patch,
        }
    }

    /// Parse a bare `X.Y.Z` string, ignoring surrounding whitespace.
    ///
    /// Pre-release and build metadata are rejected: a stored version is
    /// always a plain triple.
    pub fn parse(text: &str) -> Result<Self> {
        let trimmed = text.trim();
        let parsed = semver::Version::parse(trimmed)
            .map_err(|_| ReleaseError::InvalidVersionFormat(trimmed.to_string()))?;

        if !parsed.pre.is_empty() || !parsed.build.is_empty() {
            return Err(ReleaseError::InvalidVersionFormat(trimmed.to_string()));
        }

        Ok(Version::new(parsed.major, parsed.minor, parsed.patch))
    }

    /// Bump version according to bump type.
    ///
    /// `VersionBump::None` returns the version unchanged; callers treat it as
    /// a report-only request. A part already at `u64::MAX` cannot grow, so
    /// bumping it fails with `VersionOverflow`.
    pub fn bump(&self, bump_type: VersionBump) -> Result<Self> {
        let overflow = || ReleaseError::VersionOverflow {
            version: self.to_string(),
            bump: bump_type.to_string(),
        };

        let next = match bump_type {
            VersionBump::Major => Version {
                major: self.major.checked_add(1).ok_or_else(overflow)?,
                minor: 0,
                patch: 0,
            },
            VersionBump::Minor => Version {
                major: self.major,
                minor: self.minor.checked_add(1).ok_or_else(overflow)?,
                patch: 0,
            },
            VersionBump::Patch => Version {
                major: self.major,
                minor: self.minor,
                patch: self.patch.checked_add(1).ok_or_else(overflow)?,
            },
            VersionBump::None => *self,
        };
        Ok(next)
    }
}

impl FromStr for Version {
    type Err = ReleaseError;

    fn from_str(s: &str) -> Result<Self> {
        Version::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Which part of a version a merged pull request asks to increment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VersionBump {
    Major,
    Minor,
    Patch,
    /// Report the current version without changing anything
    None,
}

impl VersionBump {
    /// The kinds that can appear on a bump label, in palette order
    pub const LABELLED: [VersionBump; 3] = [VersionBump::Major, VersionBump::Minor, VersionBump::Patch];

    pub fn as_str(&self) -> &'static str {
        match self {
            VersionBump::Major => "major",
            VersionBump::Minor => "minor",
            VersionBump::Patch => "patch",
            VersionBump::None => "none",
        }
    }
}

impl FromStr for VersionBump {
    type Err = ReleaseError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "major" => Ok(VersionBump::Major),
            "minor" => Ok(VersionBump::Minor),
            "patch" => Ok(VersionBump::Patch),
            "none" => Ok(VersionBump::None),
            other => Err(ReleaseError::InvalidBumpKind(other.to_string())),
        }
    }
}

impl fmt::Display for VersionBump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_parse() {
        let v = Version::parse("1.2.3").unwrap();
        assert_eq!(v.major, 1);
        assert_eq!(v.minor, 2);
        assert_eq!(v.patch, 3);
    }

    #[test]
    fn test_version_parse_trims_newline() {
        assert_eq!(Version::parse("0.4.1\n").unwrap(), Version::new(0, 4, 1));
    }

    #[test]
    fn test_version_parse_invalid() {
        assert!(matches!(
            Version::parse("1.2"),
            Err(ReleaseError::InvalidVersionFormat(_))
        ));
        assert!(Version::parse("1.2.3.4").is_err());
        assert!(Version::parse("v1.2.3").is_err());
        assert!(Version::parse("").is_err());
    }

    #[test]
    fn test_version_parse_rejects_prerelease() {
        assert!(Version::parse("1.2.3-rc.1").is_err());
        assert!(Version::parse("1.2.3+build.5").is_err());
    }

    #[test]
    fn test_version_bump_major() {
        let v = Version::new(1, 2, 3);
        assert_eq!(v.bump(VersionBump::Major).unwrap(), Version::new(2, 0, 0));
    }

    #[test]
    fn test_version_bump_minor() {
        let v = Version::new(1, 2, 3);
        assert_eq!(v.bump(VersionBump::Minor).unwrap(), Version::new(1, 3, 0));
    }

    #[test]
    fn test_version_bump_patch() {
        let v = Version::new(1, 2, 3);
        assert_eq!(v.bump(VersionBump::Patch).unwrap(), Version::new(1, 2, 4));
    }

    #[test]
    fn test_version_bump_none_is_identity() {
        let v = Version::new(7, 0, 12);
        assert_eq!(v.bump(VersionBump::None).unwrap(), v);
    }

    #[test]
    fn test_bumps_strictly_increase() {
        let samples = [
            Version::new(0, 0, 0),
            Version::new(0, 9, 9),
            Version::new(3, 0, 41),
            Version::new(10, 20, 30),
        ];

        for v in samples {
            for kind in VersionBump::LABELLED {
                let next = v.bump(kind).unwrap();
                assert!(next > v, "{} bumped by {} should increase", v, kind);
            }
            assert_eq!(v.bump(VersionBump::Major).unwrap().minor, 0);
            assert_eq!(v.bump(VersionBump::Major).unwrap().patch, 0);
            assert_eq!(v.bump(VersionBump::Minor).unwrap().patch, 0);
        }
    }

    #[test]
    fn test_bump_at_the_top_of_the_range_fails() {
        let v = Version::new(1, 0, u64::MAX);
        assert!(matches!(
            v.bump(VersionBump::Patch),
            Err(ReleaseError::VersionOverflow { .. })
        ));
        // Other parts still have room
        assert_eq!(v.bump(VersionBump::Minor).unwrap(), Version::new(1, 1, 0));

        let v = Version::new(u64::MAX, 3, 4);
        assert!(v.bump(VersionBump::Major).is_err());
        assert_eq!(v.bump(VersionBump::None).unwrap(), v);
    }

    #[test]
    fn test_display_reparses_to_same_triple() {
        let v = Version::new(12, 0, 7);
        assert_eq!(v.to_string(), "12.0.7");
        assert_eq!(v.to_string().parse::<Version>().unwrap(), v);
    }

    #[test]
    fn test_version_bump_from_str() {
        assert_eq!("major".parse::<VersionBump>().unwrap(), VersionBump::Major);
        assert_eq!("none".parse::<VersionBump>().unwrap(), VersionBump::None);
        assert!(matches!(
            "huge".parse::<VersionBump>(),
            Err(ReleaseError::InvalidBumpKind(kind)) if kind == "huge"
        ));
    }
}
