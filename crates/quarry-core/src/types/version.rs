//! Semantic version types for collection releases.
//!
//! Provides Version and VersionSpec types following semantic versioning.
//! A VersionSpec is a comma separated list of comparators (`>=1.0.0,<2.0.0`)
//! that must all hold.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::QuarryError;

/// Semantic version (major.minor.patch-prerelease+build)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub prerelease: Option<String>,
    pub build: Option<String>,
}

/// Version specification (`>=1.0.0,<2.0.0`, `^1.2`, `==2.*`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionSpec {
    pub comparators: Vec<Comparator>,
    source: String,
}

/// Individual version comparator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparator {
    pub op: Op,
    pub version: PartialVersion,
}

/// Comparison operator for version specifications
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Exact,      // ==1.0.0
    NotEqual,   // !=1.0.0
    Greater,    // >1.0.0
    GreaterEq,  // >=1.0.0
    Less,       // <1.0.0
    LessEq,     // <=1.0.0
    Tilde,      // ~1.0.0
    Compatible, // ~=1.0.0
    Caret,      // ^1.0.0
    Wildcard,   // *
}

/// Partial version for comparisons (may have missing components)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialVersion {
    pub major: u64,
    pub minor: Option<u64>,
    pub patch: Option<u64>,
    pub prerelease: Option<String>,
}

fn invalid_version(input: &str, reason: impl Into<String>) -> QuarryError {
    QuarryError::InvalidVersion {
        input: input.to_string(),
        reason: reason.into(),
    }
}

fn invalid_spec(input: &str, reason: impl Into<String>) -> QuarryError {
    QuarryError::InvalidSpec {
        input: input.to_string(),
        reason: reason.into(),
    }
}

fn valid_identifiers(part: &str) -> bool {
    !part.is_empty()
        && part.split('.').all(|ident| {
            !ident.is_empty() && ident.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
}

impl Version {
    /// Create a new version
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            prerelease: None,
            build: None,
        }
    }

    /// Check if this is a prerelease version
    pub fn is_prerelease(&self) -> bool {
        self.prerelease.is_some()
    }

    fn triple(&self) -> (u64, u64, u64) {
        (self.major, self.minor, self.patch)
    }

    /// Get the precedence for comparison (ignores build metadata)
    fn precedence_cmp(&self, other: &Self) -> Ordering {
        match self.triple().cmp(&other.triple()) {
            Ordering::Equal => match (&self.prerelease, &other.prerelease) {
                (None, None) => Ordering::Equal,
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (Some(a), Some(b)) => compare_prerelease(a, b),
            },
            other => other,
        }
    }
}

/// Compare dot separated prerelease identifiers: numeric identifiers compare
/// numerically and sort before alphanumeric ones.
fn compare_prerelease(a: &str, b: &str) -> Ordering {
    let mut left = a.split('.');
    let mut right = b.split('.');
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ordering = match (x.parse::<u64>(), y.parse::<u64>()) {
                    (Ok(x), Ok(y)) => x.cmp(&y),
                    (Ok(_), Err(_)) => Ordering::Less,
                    (Err(_), Ok(_)) => Ordering::Greater,
                    (Err(_), Err(_)) => x.cmp(y),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            },
        }
    }
}

impl FromStr for Version {
    type Err = QuarryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();

        let (version_part, build) = match input.split_once('+') {
            Some((v, b)) => {
                if !valid_identifiers(b) {
                    return Err(invalid_version(input, "invalid build metadata"));
                }
                (v, Some(b.to_string()))
            },
            None => (input, None),
        };

        let (core_part, prerelease) = match version_part.split_once('-') {
            Some((c, p)) => {
                if !valid_identifiers(p) {
                    return Err(invalid_version(input, "invalid prerelease identifier"));
                }
                (c, Some(p.to_string()))
            },
            None => (version_part, None),
        };

        let parts: Vec<&str> = core_part.split('.').collect();
        if parts.len() != 3 {
            return Err(invalid_version(input, "expected major.minor.patch"));
        }

        let number = |component: &str| {
            component
                .parse::<u64>()
                .map_err(|_| invalid_version(input, format!("invalid number '{}'", component)))
        };

        Ok(Version {
            major: number(parts[0])?,
            minor: number(parts[1])?,
            patch: number(parts[2])?,
            prerelease,
            build,
        })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;

        if let Some(ref pre) = self.prerelease {
            write!(f, "-{}", pre)?;
        }

        if let Some(ref build) = self.build {
            write!(f, "+{}", build)?;
        }

        Ok(())
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        // Build metadata does not take part in precedence but keeps the
        // ordering total and consistent with Eq.
        self.precedence_cmp(other)
            .then_with(|| self.build.cmp(&other.build))
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

impl VersionSpec {
    /// Parse a version specification string
    pub fn parse(input: &str) -> Result<Self, QuarryError> {
        let source = input.trim();
        if source.is_empty() {
            return Err(invalid_spec(input, "empty specification"));
        }

        let comparators = source
            .split(',')
            .map(|clause| Comparator::parse(clause.trim()).map_err(|reason| invalid_spec(input, reason)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(VersionSpec {
            comparators,
            source: source.to_string(),
        })
    }

    /// Check if a version matches every comparator of this specification
    pub fn matches(&self, version: &Version) -> bool {
        self.comparators.iter().all(|comp| comp.matches(version))
    }
}

impl FromStr for VersionSpec {
    type Err = QuarryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for VersionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl Comparator {
    fn parse(clause: &str) -> Result<Self, String> {
        if clause.is_empty() {
            return Err("empty clause".to_string());
        }

        if clause == "*" {
            return Ok(Comparator {
                op: Op::Wildcard,
                version: PartialVersion::zero(),
            });
        }

        // Longer operators first so `>=` is not read as `>`
        let (op, version_str) = if let Some(stripped) = clause.strip_prefix("~=") {
            (Op::Compatible, stripped)
        } else if let Some(stripped) = clause.strip_prefix("==") {
            (Op::Exact, stripped)
        } else if let Some(stripped) = clause.strip_prefix("!=") {
            (Op::NotEqual, stripped)
        } else if let Some(stripped) = clause.strip_prefix(">=") {
            (Op::GreaterEq, stripped)
        } else if let Some(stripped) = clause.strip_prefix("<=") {
            (Op::LessEq, stripped)
        } else if let Some(stripped) = clause.strip_prefix('^') {
            (Op::Caret, stripped)
        } else if let Some(stripped) = clause.strip_prefix('~') {
            (Op::Tilde, stripped)
        } else if let Some(stripped) = clause.strip_prefix('>') {
            (Op::Greater, stripped)
        } else if let Some(stripped) = clause.strip_prefix('<') {
            (Op::Less, stripped)
        } else if let Some(stripped) = clause.strip_prefix('=') {
            (Op::Exact, stripped)
        } else {
            (Op::Exact, clause)
        };

        let version = PartialVersion::parse(version_str.trim())?;

        if op == Op::Compatible && version.minor.is_none() {
            return Err(format!("'~=' needs at least major.minor in '{}'", clause));
        }

        Ok(Comparator { op, version })
    }

    /// Check if a version matches this comparator
    pub fn matches(&self, version: &Version) -> bool {
        let partial = &self.version;
        match self.op {
            Op::Wildcard => true,
            Op::Exact => partial.matches_exact(version),
            Op::NotEqual => !partial.matches_exact(version),
            Op::Greater => {
                if partial.is_complete() {
                    version > &partial.to_version()
                } else {
                    partial.next_after().map_or(false, |next| version >= &next)
                }
            },
            Op::GreaterEq => version >= &partial.to_version(),
            Op::Less => is_below(version, &partial.to_version()),
            Op::LessEq => {
                if partial.is_complete() {
                    version <= &partial.to_version()
                } else {
                    below_upper(version, partial.next_after())
                }
            },
            Op::Tilde => partial.matches_tilde(version),
            Op::Compatible => partial.matches_compatible(version),
            Op::Caret => partial.matches_caret(version),
        }
    }
}

/// `version < bound`, except that prereleases of a release bound are not
/// considered below it (`<2.0.0` does not admit `2.0.0-a1`).
fn is_below(version: &Version, bound: &Version) -> bool {
    if version >= bound {
        return false;
    }
    !(bound.prerelease.is_none() && version.is_prerelease() && version.triple() == bound.triple())
}

/// `is_below` for an optional bound; `None` means no upper limit
fn below_upper(version: &Version, upper: Option<Version>) -> bool {
    upper.map_or(true, |bound| is_below(version, &bound))
}

/// Smallest release above every version sharing the given components.
///
/// Overflowing components carry into the next one up; `None` when even the
/// major version cannot grow.
fn next_release(major: u64, minor: Option<u64>, patch: Option<u64>) -> Option<Version> {
    let next_major = || major.checked_add(1).map(|m| Version::new(m, 0, 0));
    let next_minor = |minor: u64| minor.checked_add(1).map(|n| Version::new(major, n, 0));
    match (minor, patch) {
        (None, _) => next_major(),
        (Some(minor), None) => next_minor(minor).or_else(next_major),
        (Some(minor), Some(patch)) => patch
            .checked_add(1)
            .map(|n| Version::new(major, minor, n))
            .or_else(|| next_minor(minor))
            .or_else(next_major),
    }
}

impl PartialVersion {
    fn zero() -> Self {
        Self {
            major: 0,
            minor: None,
            patch: None,
            prerelease: None,
        }
    }

    fn parse(input: &str) -> Result<Self, String> {
        let (core, prerelease) = match input.split_once('-') {
            Some((c, p)) => {
                if !valid_identifiers(p) {
                    return Err(format!("invalid prerelease identifier in '{}'", input));
                }
                (c, Some(p.to_string()))
            },
            None => (input, None),
        };

        let mut parts = core.split('.');
        let major = match parts.next() {
            Some(m) if !m.is_empty() => m.parse::<u64>().map_err(|_| format!("invalid number '{}'", m))?,
            _ => return Err(format!("missing major version in '{}'", input)),
        };

        let component = |part: Option<&str>| -> Result<Option<u64>, String> {
            match part {
                None | Some("*") | Some("x") | Some("X") => Ok(None),
                Some(p) => p.parse::<u64>().map(Some).map_err(|_| format!("invalid number '{}'", p)),
            }
        };
        let minor = component(parts.next())?;
        let patch = component(parts.next())?;

        if parts.next().is_some() {
            return Err(format!("too many components in '{}'", input));
        }
        if minor.is_none() && patch.is_some() {
            return Err(format!("patch given without minor in '{}'", input));
        }
        if prerelease.is_some() && patch.is_none() {
            return Err(format!("prerelease needs a full version in '{}'", input));
        }

        Ok(Self {
            major,
            minor,
            patch,
            prerelease,
        })
    }

    fn is_complete(&self) -> bool {
        self.minor.is_some() && self.patch.is_some()
    }

    /// Convert to a full version (filling missing parts with 0)
    pub fn to_version(&self) -> Version {
        Version {
            major: self.major,
            minor: self.minor.unwrap_or(0),
            patch: self.patch.unwrap_or(0),
            prerelease: self.prerelease.clone(),
            build: None,
        }
    }

    /// First release past every version this partial version covers
    fn next_after(&self) -> Option<Version> {
        next_release(self.major, self.minor, self.patch)
    }

    /// Check exact match; partial versions match as a prefix
    fn matches_exact(&self, version: &Version) -> bool {
        version.major == self.major
            && self.minor.map_or(true, |m| version.minor == m)
            && match self.patch {
                Some(p) => version.patch == p && version.prerelease == self.prerelease,
                None => true,
            }
    }

    /// Check tilde match (~1.2.3 allows >=1.2.3 <1.3.0, ~1 allows <2.0.0)
    fn matches_tilde(&self, version: &Version) -> bool {
        let upper = next_release(self.major, self.minor, None);
        version >= &self.to_version() && below_upper(version, upper)
    }

    /// Check compatible-release match (~=1.2.3 allows <1.3.0, ~=1.2 allows <2.0.0)
    fn matches_compatible(&self, version: &Version) -> bool {
        let upper = match (self.minor, self.patch) {
            (Some(minor), Some(_)) => next_release(self.major, Some(minor), None),
            _ => next_release(self.major, None, None),
        };
        version >= &self.to_version() && below_upper(version, upper)
    }

    /// Check caret match (^1.2.3 allows <2.0.0, ^0.2.3 allows <0.3.0)
    fn matches_caret(&self, version: &Version) -> bool {
        let upper = match (self.major, self.minor, self.patch) {
            (0, Some(0), Some(patch)) => next_release(0, Some(0), Some(patch)),
            (0, Some(0), None) => Some(Version::new(0, 1, 0)),
            (0, Some(minor), _) => next_release(0, Some(minor), None),
            (major, _, _) => next_release(major, None, None),
        };
        version >= &self.to_version() && below_upper(version, upper)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        s.parse().unwrap()
    }

    #[test]
    fn test_version_parsing() {
        let v = Version::from_str("1.2.3").unwrap();
        assert_eq!(v.major, 1);
        assert_eq!(v.minor, 2);
        assert_eq!(v.patch, 3);
        assert_eq!(v.prerelease, None);
        assert_eq!(v.build, None);
    }

    #[test]
    fn test_version_with_prerelease() {
        let v = Version::from_str("0.3.0-experimental.meta.redirects-3").unwrap();
        assert_eq!(v.prerelease, Some("experimental.meta.redirects-3".to_string()));
        assert!(v.is_prerelease());
    }

    #[test]
    fn test_version_rejects_partial() {
        assert!(Version::from_str("1.2").is_err());
        assert!(Version::from_str("1.2.x").is_err());
        assert!(Version::from_str("1.2.3-").is_err());
    }

    #[test]
    fn test_version_display() {
        let v = Version {
            major: 1,
            minor: 2,
            patch: 3,
            prerelease: Some("alpha".to_string()),
            build: Some("build".to_string()),
        };
        assert_eq!(v.to_string(), "1.2.3-alpha+build");
    }

    #[test]
    fn test_prerelease_precedence() {
        assert!(v("1.0.0-alpha") < v("1.0.0-alpha.1"));
        assert!(v("1.0.0-alpha.1") < v("1.0.0-alpha.beta"));
        assert!(v("1.0.0-beta.2") < v("1.0.0-beta.11"));
        assert!(v("1.0.0-rc.1") < v("1.0.0"));
        assert!(v("6.0.0-a1") < v("6.0.0"));
        assert!(v("6.0.0-a1") > v("5.8.6"));
    }

    #[test]
    fn test_spec_range() {
        let spec = VersionSpec::parse(">=2.0.0,<3.0.0").unwrap();
        assert!(spec.matches(&v("2.0.0")));
        assert!(spec.matches(&v("2.9.9")));
        assert!(!spec.matches(&v("3.0.0")));
        assert!(!spec.matches(&v("1.9.9")));
    }

    #[test]
    fn test_spec_upper_bound_excludes_its_prereleases() {
        let spec = VersionSpec::parse("<3.0.0").unwrap();
        assert!(!spec.matches(&v("3.0.0-a1")));
        assert!(spec.matches(&v("2.1.0-b2")));
    }

    #[test]
    fn test_spec_lower_bound_admits_later_prereleases() {
        let spec = VersionSpec::parse(">=2.0.0").unwrap();
        assert!(spec.matches(&v("2.1.0-b2")));
        assert!(!spec.matches(&v("2.0.0-a1")));
    }

    #[test]
    fn test_spec_partial_exact() {
        let spec = VersionSpec::parse("==1.2").unwrap();
        assert!(spec.matches(&v("1.2.0")));
        assert!(spec.matches(&v("1.2.7")));
        assert!(!spec.matches(&v("1.3.0")));

        let spec = VersionSpec::parse("1.2.*").unwrap();
        assert!(spec.matches(&v("1.2.9")));
    }

    #[test]
    fn test_spec_partial_greater_and_less_equal() {
        let greater = VersionSpec::parse(">1.2").unwrap();
        assert!(!greater.matches(&v("1.2.9")));
        assert!(greater.matches(&v("1.3.0")));

        let less_eq = VersionSpec::parse("<=1.2").unwrap();
        assert!(less_eq.matches(&v("1.2.9")));
        assert!(!less_eq.matches(&v("1.3.0")));
    }

    #[test]
    fn test_spec_caret_and_tilde() {
        let caret = VersionSpec::parse("^1.2.3").unwrap();
        assert!(caret.matches(&v("1.9.0")));
        assert!(!caret.matches(&v("2.0.0")));
        assert!(!caret.matches(&v("2.0.0-a1")));

        let caret_zero = VersionSpec::parse("^0.2.3").unwrap();
        assert!(caret_zero.matches(&v("0.2.9")));
        assert!(!caret_zero.matches(&v("0.3.0")));

        let tilde = VersionSpec::parse("~1.2.3").unwrap();
        assert!(tilde.matches(&v("1.2.5")));
        assert!(!tilde.matches(&v("1.3.0")));

        let compatible = VersionSpec::parse("~=1.2").unwrap();
        assert!(compatible.matches(&v("1.9.0")));
        assert!(!compatible.matches(&v("2.0.0")));
    }

    #[test]
    fn test_spec_bounds_at_component_limit() {
        let max = u64::MAX;

        let greater = VersionSpec::parse(&format!(">{}", max)).unwrap();
        assert!(!greater.matches(&v("1.0.0")));
        assert!(!greater.matches(&Version::new(max, 3, 0)));

        let less_eq = VersionSpec::parse(&format!("<={}", max)).unwrap();
        assert!(less_eq.matches(&Version::new(max, max, max)));

        let caret = VersionSpec::parse(&format!("^{}", max)).unwrap();
        assert!(caret.matches(&Version::new(max, 7, 1)));
        assert!(!caret.matches(&v("1.0.0")));

        let tilde = VersionSpec::parse(&format!("~1.{}", max)).unwrap();
        assert!(tilde.matches(&Version::new(1, max, 4)));
        assert!(!tilde.matches(&v("2.0.0")));

        let patch = VersionSpec::parse(&format!("^0.0.{}", max)).unwrap();
        assert!(patch.matches(&Version::new(0, 0, max)));
        assert!(!patch.matches(&v("0.1.0")));
    }

    #[test]
    fn test_spec_not_equal_and_wildcard() {
        let spec = VersionSpec::parse(">=1.0.0,!=1.1.0").unwrap();
        assert!(spec.matches(&v("1.0.5")));
        assert!(!spec.matches(&v("1.1.0")));

        let any = VersionSpec::parse("*").unwrap();
        assert!(any.matches(&v("999.0.0")));
    }

    #[test]
    fn test_spec_errors() {
        assert!(VersionSpec::parse("").is_err());
        assert!(VersionSpec::parse(">=1.0.0,").is_err());
        assert!(VersionSpec::parse(">=abc").is_err());
        assert!(VersionSpec::parse("~=1").is_err());
    }

    #[test]
    fn test_spec_display_keeps_source() {
        let spec = VersionSpec::parse(" >=2.0.0,<3.0.0 ").unwrap();
        assert_eq!(spec.to_string(), ">=2.0.0,<3.0.0");
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn version_display_parses_back(
            major in 0u64..1000,
            minor in 0u64..1000,
            patch in 0u64..1000,
            prerelease in prop::option::of("[a-zA-Z0-9]{1,8}(\\.[a-zA-Z0-9]{1,8}){0,2}"),
        ) {
            let original = Version { major, minor, patch, prerelease, build: None };
            let parsed = Version::from_str(&original.to_string()).unwrap();
            prop_assert_eq!(parsed, original);
        }

        #[test]
        fn release_sorts_after_its_prereleases(
            major in 0u64..100,
            minor in 0u64..100,
            patch in 0u64..100,
            pre in "[a-z]{1,5}[0-9]{0,2}",
        ) {
            let release = Version::new(major, minor, patch);
            let prerelease = Version { prerelease: Some(pre), ..release.clone() };
            prop_assert!(prerelease < release);
        }
    }
}
