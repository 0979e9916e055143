//! Locator configuration.
//!
//! Values come from code, from the environment, or (with the `config`
//! feature) from JSON:
//!
//! | variable | field | default |
//! | --- | --- | --- |
//! | `FERROUS_SERVICES_MAX_DEPTH` | `max_depth` | `1024` |
//! | `FERROUS_SERVICES_LOG` | `log_events` | `false` |

use std::env;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

use crate::error::{ServiceError, ServiceResult};

/// Environment variable overriding [`LocatorConfig::max_depth`].
pub const ENV_MAX_DEPTH: &str = "FERROUS_SERVICES_MAX_DEPTH";
/// Environment variable overriding [`LocatorConfig::log_events`].
pub const ENV_LOG: &str = "FERROUS_SERVICES_LOG";

const DEFAULT_MAX_DEPTH: usize = 1024;

/// Settings shared by a [`RegistryCache`](crate::RegistryCache) and its registries.
///
/// # Examples
///
/// ```
/// use ferrous_services::{LocatorConfig, RegistryCache};
///
/// let config = LocatorConfig::default().with_max_depth(32).with_log_events(true);
/// let cache = RegistryCache::with_config(config);
/// assert_eq!(cache.config().max_depth, 32);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct LocatorConfig {
    /// Maximum nesting of constructors resolving other services on one thread
    pub max_depth: usize,
    /// Install a [`LoggingObserver`](crate::LoggingObserver) on the cache
    pub log_events: bool,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            log_events: false,
        }
    }
}

impl LocatorConfig {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_log_events(mut self, log_events: bool) -> Self {
        self.log_events = log_events;
        self
    }

    /// Reads overrides from the environment on top of the defaults.
    pub fn from_env() -> ServiceResult<Self> {
        Self::default().merge_env()
    }

    /// Applies environment overrides to `self`.
    pub fn merge_env(mut self) -> ServiceResult<Self> {
        if let Ok(raw) = env::var(ENV_MAX_DEPTH) {
            self.max_depth = parse_depth(&raw)?;
        }
        if let Ok(raw) = env::var(ENV_LOG) {
            self.log_events = parse_bool(ENV_LOG, &raw)?;
        }
        Ok(self)
    }

    /// Parses a JSON document; missing fields keep their defaults.
    #[cfg(feature = "config")]
    pub fn from_json(json: &str) -> ServiceResult<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ServiceError::Config(e.to_string()))?;
        config.validate()
    }

    fn validate(self) -> ServiceResult<Self> {
        if self.max_depth == 0 {
            return Err(ServiceError::Config("max_depth must be at least 1".to_string()));
        }
        Ok(self)
    }
}

fn parse_depth(raw: &str) -> ServiceResult<usize> {
    let depth = raw
        .trim()
        .parse::<usize>()
        .map_err(|e| ServiceError::Config(format!("{}={:?}: {}", ENV_MAX_DEPTH, raw, e)))?;
    LocatorConfig::default().with_max_depth(depth).validate()?;
    Ok(depth)
}

fn parse_bool(var: &str, raw: &str) -> ServiceResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ServiceError::Config(format!("{}={:?}: expected a boolean", var, raw))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        env::remove_var(ENV_MAX_DEPTH);
        env::remove_var(ENV_LOG);
    }

    #[test]
    #[serial(locator_env)]
    fn env_overrides_defaults() {
        clear_env();
        env::set_var(ENV_MAX_DEPTH, "64");
        env::set_var(ENV_LOG, "yes");

        let config = LocatorConfig::from_env().unwrap();
        clear_env();

        assert_eq!(config.max_depth, 64);
        assert!(config.log_events);
    }

    #[test]
    #[serial(locator_env)]
    fn missing_env_keeps_defaults() {
        clear_env();
        assert_eq!(LocatorConfig::from_env().unwrap(), LocatorConfig::default());
    }

    #[test]
    #[serial(locator_env)]
    fn invalid_env_values_are_rejected() {
        clear_env();
        env::set_var(ENV_MAX_DEPTH, "deep");
        assert!(matches!(LocatorConfig::from_env(), Err(ServiceError::Config(_))));

        env::set_var(ENV_MAX_DEPTH, "0");
        assert!(matches!(LocatorConfig::from_env(), Err(ServiceError::Config(_))));

        clear_env();
        env::set_var(ENV_LOG, "sometimes");
        assert!(matches!(LocatorConfig::from_env(), Err(ServiceError::Config(_))));
        clear_env();
    }

    #[cfg(feature = "config")]
    #[test]
    fn json_fills_missing_fields() {
        let config = LocatorConfig::from_json(r#"{ "log_events": true }"#).unwrap();
        assert_eq!(config.max_depth, DEFAULT_MAX_DEPTH);
        assert!(config.log_events);

        assert!(LocatorConfig::from_json(r#"{ "max_depth": 0 }"#).is_err());
    }
}
