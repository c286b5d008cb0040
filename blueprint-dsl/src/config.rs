//! Parser configuration

use crate::error::{DslError, DslResult};
use serde::{Deserialize, Serialize};

/// Default limit on nested function calls.
pub const DEFAULT_MAX_NESTING_DEPTH: usize = 64;

/// Environment variable the tracing CLI reads a TOML config path from.
pub const CONFIG_ENV_VAR: &str = "BLUEPRINT_DSL_CONFIG";

/// Settings for [`DslParser`](crate::parser::DslParser).
///
/// ```toml
/// max_nesting_depth = 32
/// strict_constants = true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DslConfig {
    /// Maximum depth of function calls nested as parameters.
    pub max_nesting_depth: usize,
    /// Reject unrecognised constant syntax instead of keeping the raw
    /// remainder of the input as a string literal.
    pub strict_constants: bool,
}

impl Default for DslConfig {
    fn default() -> Self {
        Self {
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
            strict_constants: false,
        }
    }
}

impl DslConfig {
    /// Load a configuration from TOML. Missing keys take their defaults.
    pub fn from_toml_str(source: &str) -> DslResult<Self> {
        let config: DslConfig =
            toml::from_str(source).map_err(|e| DslError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> DslResult<()> {
        if self.max_nesting_depth == 0 {
            return Err(DslError::Config(
                "max_nesting_depth must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn with_max_nesting_depth(mut self, depth: usize) -> Self {
        self.max_nesting_depth = depth;
        self
    }

    pub fn with_strict_constants(mut self, strict: bool) -> Self {
        self.strict_constants = strict;
        self
    }
}
