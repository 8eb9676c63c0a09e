//! Runtime configuration read from the environment (optionally seeded by a
//! `.env` file). See [`AppConfig::from_env`].

use crate::infrastructure::security::{ARGON2_M_COST, ARGON2_P_COST, ARGON2_T_COST};
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} has an invalid value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// How login and registration treat credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CredentialPolicy {
    /// Registration never rejects, login always succeeds without a lookup.
    #[default]
    Permissive,
    /// Registration validates and rejects duplicate emails, login verifies
    /// the password against the stored hash.
    Strict,
}

impl FromStr for CredentialPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "permissive" => Ok(CredentialPolicy::Permissive),
            "strict" => Ok(CredentialPolicy::Strict),
            other => Err(format!("expected `permissive` or `strict`, got `{}`", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            workers: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashingConfig {
    pub m_cost: u32,
    pub t_cost: u32,
    pub p_cost: u32,
}

impl Default for HashingConfig {
    fn default() -> Self {
        Self {
            m_cost: ARGON2_M_COST,
            t_cost: ARGON2_T_COST,
            p_cost: ARGON2_P_COST,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub policy: CredentialPolicy,
    pub hashing: HashingConfig,
    /// `None` disables CORS handling, `Some("*")` allows any origin.
    pub cors_allowed_origin: Option<String>,
}

impl AppConfig {
    /// Loads `.env` if present, then reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = AppConfig::default();
        let read = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let host = read("APP_HOST").unwrap_or(defaults.server.host);
        let port = parse_or(&lookup, "APP_PORT", defaults.server.port)?;
        if port == 0 {
            return Err(invalid("APP_PORT", "0", "must be in 1..=65535"));
        }

        let workers = match read("APP_WORKERS") {
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(0) => return Err(invalid("APP_WORKERS", &raw, "must be greater than 0")),
                Ok(n) => Some(n),
                Err(e) => return Err(invalid("APP_WORKERS", &raw, &e.to_string())),
            },
            None => None,
        };

        let policy = match read("CREDENTIAL_POLICY") {
            Some(raw) => raw
                .parse::<CredentialPolicy>()
                .map_err(|reason| invalid("CREDENTIAL_POLICY", &raw, &reason))?,
            None => defaults.policy,
        };

        let hashing = HashingConfig {
            m_cost: parse_or(&lookup, "ARGON2_M_COST", defaults.hashing.m_cost)?,
            t_cost: parse_or(&lookup, "ARGON2_T_COST", defaults.hashing.t_cost)?,
            p_cost: parse_or(&lookup, "ARGON2_P_COST", defaults.hashing.p_cost)?,
        };

        Ok(Self {
            server: ServerConfig {
                host,
                port,
                workers,
            },
            policy,
            hashing,
            cors_allowed_origin: read("CORS_ALLOWED_ORIGIN").map(|v| v.trim().to_string()),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key).filter(|v| !v.trim().is_empty()) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| invalid(key, &raw, &e.to_string())),
        None => Ok(default),
    }
}

fn invalid(key: &'static str, value: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_when_environment_is_empty() {
        let config = config_from(&[]).unwrap();

        assert_eq!(config, AppConfig::default());
        assert_eq!(config.bind_address(), "127.0.0.1:8080");
        assert_eq!(config.policy, CredentialPolicy::Permissive);
        assert!(config.cors_allowed_origin.is_none());
    }

    #[test]
    fn test_reads_all_variables() {
        let config = config_from(&[
            ("APP_HOST", "0.0.0.0"),
            ("APP_PORT", "9000"),
            ("APP_WORKERS", "2"),
            ("CREDENTIAL_POLICY", "Strict"),
            ("ARGON2_M_COST", "4096"),
            ("ARGON2_T_COST", "3"),
            ("ARGON2_P_COST", "2"),
            ("CORS_ALLOWED_ORIGIN", "http://localhost:3000"),
        ])
        .unwrap();

        assert_eq!(config.bind_address(), "0.0.0.0:9000");
        assert_eq!(config.server.workers, Some(2));
        assert_eq!(config.policy, CredentialPolicy::Strict);
        assert_eq!(
            config.hashing,
            HashingConfig {
                m_cost: 4096,
                t_cost: 3,
                p_cost: 2
            }
        );
        assert_eq!(
            config.cors_allowed_origin.as_deref(),
            Some("http://localhost:3000")
        );
    }

    #[test]
    fn test_blank_values_fall_back_to_defaults() {
        let config = config_from(&[("APP_HOST", "  "), ("APP_PORT", "")]).unwrap();
        assert_eq!(config.server, ServerConfig::default());
    }

    #[test]
    fn test_rejects_bad_port() {
        assert!(matches!(
            config_from(&[("APP_PORT", "0")]),
            Err(ConfigError::Invalid { key: "APP_PORT", .. })
        ));
        assert!(matches!(
            config_from(&[("APP_PORT", "70000")]),
            Err(ConfigError::Invalid { key: "APP_PORT", .. })
        ));
    }

    #[test]
    fn test_rejects_zero_workers() {
        assert!(matches!(
            config_from(&[("APP_WORKERS", "0")]),
            Err(ConfigError::Invalid { key: "APP_WORKERS", .. })
        ));
    }

    #[test]
    fn test_rejects_unknown_policy() {
        let err = config_from(&[("CREDENTIAL_POLICY", "lenient")]).unwrap_err();
        assert!(err.to_string().contains("CREDENTIAL_POLICY"));
    }
}
