//! Cache configuration.
//!
//! An explicit value object passed to every cache-capable operation.
//! Created once at process start, read-only thereafter; there is no global
//! mutable cache state.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

use layers_common::{LayersError, LayersResult};

use crate::naming::CacheClass;
use crate::uri::StorageUri;

/// Environment tag separating published artifacts from pre-release ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Environment {
    Prod,
    Dev,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Prod => "prod",
            Environment::Dev => "dev",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Environment {
    type Err = LayersError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "prod" => Ok(Environment::Prod),
            "dev" => Ok(Environment::Dev),
            other => Err(LayersError::InvalidParameter {
                param: "environment".to_string(),
                message: format!("unknown environment '{}'", other),
            }),
        }
    }
}

/// Whether and where artifacts are cached.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheMode {
    /// Products are always produced fresh, nothing persists.
    Disabled,
    /// Standard products go to the published tree, custom ones to the
    /// derivative tree.
    Enabled {
        published: StorageUri,
        derivative: StorageUri,
        environment: Environment,
    },
}

/// Process-wide cache settings.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    mode: CacheMode,
}

impl CacheConfig {
    /// An explicit no-cache configuration.
    pub fn disabled() -> Self {
        Self {
            mode: CacheMode::Disabled,
        }
    }

    /// Enable caching with separate published and derivative roots.
    ///
    /// The two roots must differ so bespoke one-off products never land in
    /// the canonical published tree.
    pub fn new(
        published_uri: &str,
        derivative_uri: &str,
        environment: Environment,
    ) -> LayersResult<Self> {
        let published = StorageUri::parse(published_uri)?;
        let derivative = StorageUri::parse(derivative_uri)?;

        if published == derivative {
            return Err(LayersError::InvalidParameter {
                param: "derivative_uri".to_string(),
                message: "derivative cache root must differ from the published root".to_string(),
            });
        }

        Ok(Self {
            mode: CacheMode::Enabled {
                published,
                derivative,
                environment,
            },
        })
    }

    /// Build from `LAYERS_CACHE_URI`, `LAYERS_DERIVATIVE_CACHE_URI` and
    /// `LAYERS_CACHE_ENV`.
    ///
    /// With no `LAYERS_CACHE_URI` set, caching is disabled and a warning is
    /// logged; a partially set environment is a configuration error.
    pub fn from_env() -> LayersResult<Self> {
        let published = match std::env::var("LAYERS_CACHE_URI") {
            Ok(uri) => uri,
            Err(_) => {
                warn!("LAYERS_CACHE_URI unset; caching disabled, products always produced fresh");
                return Ok(Self::disabled());
            }
        };

        let derivative = std::env::var("LAYERS_DERIVATIVE_CACHE_URI")
            .map_err(|_| LayersError::MissingParameter("LAYERS_DERIVATIVE_CACHE_URI".to_string()))?;

        let environment = std::env::var("LAYERS_CACHE_ENV")
            .map_err(|_| LayersError::MissingParameter("LAYERS_CACHE_ENV".to_string()))?
            .parse()?;

        Self::new(&published, &derivative, environment)
    }

    pub fn mode(&self) -> &CacheMode {
        &self.mode
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self.mode, CacheMode::Enabled { .. })
    }

    pub fn environment(&self) -> Option<Environment> {
        match &self.mode {
            CacheMode::Enabled { environment, .. } => Some(*environment),
            CacheMode::Disabled => None,
        }
    }

    /// The cache root for a product classification, if caching is enabled.
    pub fn root_for(&self, class: CacheClass) -> Option<&StorageUri> {
        match &self.mode {
            CacheMode::Disabled => None,
            CacheMode::Enabled {
                published,
                derivative,
                ..
            } => Some(match class {
                CacheClass::Standard => published,
                CacheClass::Custom => derivative,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_has_no_roots() {
        let config = CacheConfig::disabled();
        assert!(!config.is_enabled());
        assert!(config.root_for(CacheClass::Standard).is_none());
        assert!(config.root_for(CacheClass::Custom).is_none());
        assert!(config.environment().is_none());
    }

    #[test]
    fn test_class_selects_root() {
        let config = CacheConfig::new(
            "s3://layer-cache/published",
            "s3://layer-cache/derivative",
            Environment::Prod,
        )
        .unwrap();

        assert_eq!(
            config.root_for(CacheClass::Standard).unwrap().to_string(),
            "s3://layer-cache/published"
        );
        assert_eq!(
            config.root_for(CacheClass::Custom).unwrap().to_string(),
            "s3://layer-cache/derivative"
        );
        assert_eq!(config.environment(), Some(Environment::Prod));
    }

    #[test]
    fn test_identical_roots_rejected() {
        let config = CacheConfig::new(
            "s3://layer-cache/x",
            "s3://layer-cache/x",
            Environment::Dev,
        );
        assert!(config.is_err());
    }

    #[test]
    fn test_environment_parse() {
        assert_eq!("prod".parse::<Environment>().unwrap(), Environment::Prod);
        assert_eq!("dev".parse::<Environment>().unwrap(), Environment::Dev);
        assert!("staging".parse::<Environment>().is_err());
    }
}
