//! Codec configuration

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::array::BoundsPolicy;
use crate::error::{CodecError, CodecResult};

/// Settings that shape generated literals.
///
/// Loaded from TOML:
///
/// ```toml
/// type_cast = true
/// array_bounds = "always"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CodecConfig {
    /// Prefix literals with their type name
    pub type_cast: bool,

    /// When arrays carry a `[lo:hi]=` decoration
    pub array_bounds: BoundsPolicy,
}

impl CodecConfig {
    /// Create a new configuration builder
    pub fn builder() -> CodecConfigBuilder {
        CodecConfigBuilder::default()
    }

    pub fn from_toml_str(content: &str) -> CodecResult<Self> {
        toml::from_str(content).map_err(|e| CodecError::Config(e.to_string()))
    }

    /// Read a config file.
    pub fn load(path: impl AsRef<Path>) -> CodecResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| CodecError::Config(format!("{}: {}", path.display(), e)))?;
        tracing::debug!(path = %path.display(), ?config, "loaded config");
        Ok(config)
    }

    /// `<config dir>/pgtext/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("pgtext").join("config.toml"))
    }

    /// Load `path`, or the default location when `None`.
    ///
    /// A missing default file yields the defaults; an explicit path must exist.
    pub fn load_or_default(path: Option<&Path>) -> CodecResult<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }
}

/// Builder for CodecConfig
#[derive(Debug, Default)]
pub struct CodecConfigBuilder {
    config: CodecConfig,
}

impl CodecConfigBuilder {
    /// Prefix literals with their type name
    pub fn type_cast(mut self, enabled: bool) -> Self {
        self.config.type_cast = enabled;
        self
    }

    /// Set the array bound decoration policy
    pub fn array_bounds(mut self, policy: BoundsPolicy) -> Self {
        self.config.array_bounds = policy;
        self
    }

    /// Build the configuration
    pub fn build(self) -> CodecConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = CodecConfig::from_toml_str("").unwrap();
        assert_eq!(config, CodecConfig::default());
        assert!(!config.type_cast);
        assert_eq!(config.array_bounds, BoundsPolicy::NonDefault);
    }

    #[test]
    fn test_parse() {
        let config = CodecConfig::from_toml_str(
            r#"
            type_cast = true
            array_bounds = "always"
            "#,
        )
        .unwrap();
        assert_eq!(
            config,
            CodecConfig::builder()
                .type_cast(true)
                .array_bounds(BoundsPolicy::Always)
                .build()
        );
    }

    #[test]
    fn test_invalid() {
        assert!(matches!(
            CodecConfig::from_toml_str("array_bounds = \"sometimes\""),
            Err(CodecError::Config(_))
        ));
        assert!(matches!(
            CodecConfig::from_toml_str("max_array_dims = 3"),
            Err(CodecError::Config(_))
        ));
    }

    #[test]
    fn test_load_file() {
        let path = std::env::temp_dir().join(format!("pgtext-config-{}.toml", std::process::id()));
        fs::write(&path, "array_bounds = \"never\"\n").unwrap();
        let config = CodecConfig::load_or_default(Some(path.as_path())).unwrap();
        fs::remove_file(&path).unwrap();
        assert_eq!(config.array_bounds, BoundsPolicy::Never);

        assert!(matches!(
            CodecConfig::load(&path),
            Err(CodecError::Io(_))
        ));
    }
}
