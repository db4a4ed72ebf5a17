use crate::InputError;
use serde::Serialize;
use std::{fmt, str::FromStr};

/// The shape of composition output a given router release expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum RouterCompatibilityVersion {
    #[serde(rename = "1")]
    V1,
}

impl RouterCompatibilityVersion {
    /// Every supported version, oldest first.
    pub const SUPPORTED: &'static [RouterCompatibilityVersion] = &[RouterCompatibilityVersion::V1];

    pub const LATEST: RouterCompatibilityVersion = RouterCompatibilityVersion::V1;

    pub fn as_str(self) -> &'static str {
        match self {
            RouterCompatibilityVersion::V1 => "1",
        }
    }

    /// Parse an optional version string. `None` selects [`Self::LATEST`].
    pub fn resolve(version: Option<&str>) -> Result<Self, InputError> {
        version.map(str::parse).unwrap_or(Ok(Self::LATEST))
    }
}

impl Default for RouterCompatibilityVersion {
    fn default() -> Self {
        Self::LATEST
    }
}

impl FromStr for RouterCompatibilityVersion {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::SUPPORTED
            .iter()
            .copied()
            .find(|version| version.as_str() == s)
            .ok_or_else(|| InputError::InvalidRouterCompatibilityVersion(s.to_owned()))
    }
}

impl fmt::Display for RouterCompatibilityVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn latest_is_supported() {
        assert!(RouterCompatibilityVersion::SUPPORTED.contains(&RouterCompatibilityVersion::LATEST));
        assert_eq!(
            RouterCompatibilityVersion::SUPPORTED.last(),
            Some(&RouterCompatibilityVersion::LATEST)
        );
    }

    #[test]
    fn missing_version_defaults_to_latest() {
        assert_eq!(
            RouterCompatibilityVersion::resolve(None),
            Ok(RouterCompatibilityVersion::LATEST)
        );
    }

    #[rstest]
    #[case("2")]
    #[case("0")]
    #[case("")]
    #[case(" 1")]
    #[case("v1")]
    #[case("1.0")]
    fn unsupported_versions_are_rejected(#[case] version: &str) {
        let error = RouterCompatibilityVersion::resolve(Some(version)).unwrap_err();
        assert_eq!(
            error.to_string(),
            format!("Invalid router compatibility version \"{version}\".")
        );
    }

    #[test]
    fn round_trips_through_display() {
        for version in RouterCompatibilityVersion::SUPPORTED {
            assert_eq!(version.to_string().parse::<RouterCompatibilityVersion>().as_ref(), Ok(version));
        }
    }
}
