//! Engine configuration
//!
//! Provides [`EngineConfig`] and [`ExecutionPolicy`]. Configuration can be
//! built in code or loaded from TOML:
//!
//! ```toml
//! policy = "unattended-skip-offending"
//! check-unused-parameters = true
//! catch-parameter-name = "e"
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How conflicts are resolved before applying
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutionPolicy {
    /// Ask the [`PolicyHook`](crate::PolicyHook) to confirm or abort
    Interactive,
    /// Skip usages that raised a conflict, abort on declaration conflicts
    #[default]
    UnattendedSkipOffending,
    /// Apply everything regardless of non-blocking conflicts
    UnattendedConfirmAll,
    /// Abort on any conflict
    UnattendedAbortOnConflict,
}

impl ExecutionPolicy {
    /// Whether no user is available to answer questions
    #[inline]
    #[must_use]
    pub fn is_unattended(self) -> bool {
        !matches!(self, Self::Interactive)
    }
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct EngineConfig {
    /// Conflict resolution policy
    pub policy: ExecutionPolicy,

    /// Report removed parameters that are still read in the body
    pub check_unused_parameters: bool,

    /// Synthesize a zero literal for new parameters nobody supplied a value for
    pub synthesize_missing_defaults: bool,

    /// Base name for generated catch parameters
    pub catch_parameter_name: String,

    /// Replace a try statement left without catch or finally by its body
    pub unwrap_empty_try: bool,

    /// Abort when more usages are found (0 = unbounded)
    pub max_usages: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            policy: ExecutionPolicy::default(),
            check_unused_parameters: true,
            synthesize_missing_defaults: true,
            catch_parameter_name: "e".to_string(),
            unwrap_empty_try: true,
            max_usages: 0,
        }
    }
}

impl EngineConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With execution policy
    #[inline]
    #[must_use]
    pub fn with_policy(mut self, policy: ExecutionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// With unused-parameter checking toggled
    #[inline]
    #[must_use]
    pub fn with_unused_parameter_check(mut self, enabled: bool) -> Self {
        self.check_unused_parameters = enabled;
        self
    }

    /// With zero-literal synthesis toggled
    #[inline]
    #[must_use]
    pub fn with_synthesized_defaults(mut self, enabled: bool) -> Self {
        self.synthesize_missing_defaults = enabled;
        self
    }

    /// With catch parameter base name
    #[inline]
    #[must_use]
    pub fn with_catch_parameter_name(mut self, name: impl Into<String>) -> Self {
        self.catch_parameter_name = name.into();
        self
    }

    /// With usage limit
    #[inline]
    #[must_use]
    pub fn with_max_usages(mut self, max: usize) -> Self {
        self.max_usages = max;
        self
    }

    /// Parse and validate TOML text
    ///
    /// # Errors
    /// Returns error if the text is not valid TOML or a value is rejected.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    /// Check values
    ///
    /// # Errors
    /// Returns error if the catch parameter name is not an identifier.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let name = &self.catch_parameter_name;
        let valid = name
            .chars()
            .next()
            .is_some_and(|c| c.is_alphabetic() || c == '_')
            && name.chars().all(|c| c.is_alphanumeric() || c == '_');
        if !valid {
            return Err(ConfigError::Invalid {
                field: "catch-parameter-name",
                reason: format!("'{name}' is not an identifier"),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.policy, ExecutionPolicy::UnattendedSkipOffending);
        assert!(config.check_unused_parameters);
        assert_eq!(config.catch_parameter_name, "e");
        assert_eq!(config.max_usages, 0);
    }

    #[test]
    fn test_builder() {
        let config = EngineConfig::new()
            .with_policy(ExecutionPolicy::Interactive)
            .with_unused_parameter_check(false)
            .with_max_usages(10);
        assert!(!config.policy.is_unattended());
        assert!(!config.check_unused_parameters);
        assert_eq!(config.max_usages, 10);
    }

    #[test]
    fn test_from_toml_partial() {
        let config = EngineConfig::from_toml_str(
            "policy = \"unattended-abort-on-conflict\"\ncatch-parameter-name = \"ex\"\n",
        )
        .unwrap();
        assert_eq!(config.policy, ExecutionPolicy::UnattendedAbortOnConflict);
        assert_eq!(config.catch_parameter_name, "ex");
        assert!(config.unwrap_empty_try);
    }

    #[test]
    fn test_from_toml_rejects_bad_name() {
        let err = EngineConfig::from_toml_str("catch-parameter-name = \"1e\"").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_from_toml_rejects_unknown_field() {
        let err = EngineConfig::from_toml_str("bogus = 1").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
