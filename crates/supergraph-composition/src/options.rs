use serde::Deserialize;

/// Knobs for a [`compose()`](crate::compose()) invocation.
///
/// Deserializable so callers can keep it next to the rest of their configuration:
///
/// ```toml
/// disableResolvabilityValidation = true
/// routerCompatibilityVersion = "1"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct CompositionOptions {
    /// Skip the check that every field can be reached from a root field.
    pub disable_resolvability_validation: bool,
    /// The router compatibility version to emit configuration for. Defaults to the latest.
    pub router_compatibility_version: Option<String>,
}

impl CompositionOptions {
    pub fn with_resolvability_validation_disabled(mut self) -> Self {
        self.disable_resolvability_validation = true;
        self
    }

    pub fn with_router_compatibility_version(mut self, version: impl Into<String>) -> Self {
        self.router_compatibility_version = Some(version.into());
        self
    }
}
