//! Process configuration, read from the environment.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

const DEV_SECRET: &str = "dev-secret";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: '{value}' ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    pub jwt_ttl: Duration,
    pub jwt_issuer: String,
    /// Deadline for identity resolution inside the auth middleware.
    pub auth_timeout: Duration,
    /// Deadline for a whole request.
    pub request_timeout: Duration,
    /// Optional JSON seed for the in-memory identity loader.
    pub users_file: Option<PathBuf>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            jwt_secret: DEV_SECRET.to_string(),
            jwt_ttl: Duration::from_secs(86_400),
            jwt_issuer: "haocai".to_string(),
            auth_timeout: Duration::from_millis(2_000),
            request_timeout: Duration::from_millis(30_000),
            users_file: None,
        }
    }
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(v) = lookup("HAOCAI_BIND") {
            cfg.bind_addr = v.parse().map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                key: "HAOCAI_BIND",
                value: v.clone(),
                reason: e.to_string(),
            })?;
        }

        match lookup("JWT_SECRET").filter(|s| !s.is_empty()) {
            Some(secret) => cfg.jwt_secret = secret,
            None => tracing::warn!("JWT_SECRET not set; using insecure dev default"),
        }

        if let Some(v) = lookup("JWT_TTL_SECS") {
            cfg.jwt_ttl = Duration::from_secs(parse_u64("JWT_TTL_SECS", &v)?);
        }
        if let Some(v) = lookup("JWT_ISSUER") {
            cfg.jwt_issuer = v;
        }
        if let Some(v) = lookup("AUTH_TIMEOUT_MS") {
            cfg.auth_timeout = Duration::from_millis(parse_u64("AUTH_TIMEOUT_MS", &v)?);
        }
        if let Some(v) = lookup("REQUEST_TIMEOUT_MS") {
            cfg.request_timeout = Duration::from_millis(parse_u64("REQUEST_TIMEOUT_MS", &v)?);
        }
        cfg.users_file = lookup("HAOCAI_USERS_FILE")
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);

        Ok(cfg)
    }

    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_SECRET
    }
}

fn parse_u64(key: &'static str, value: &str) -> Result<u64, ConfigError> {
    let n: u64 = value.trim().parse().map_err(|e: std::num::ParseIntError| ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason: e.to_string(),
    })?;
    if n == 0 {
        return Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(n)
}

impl core::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("bind_addr", &self.bind_addr)
            .field("jwt_secret", &"<redacted>")
            .field("jwt_ttl", &self.jwt_ttl)
            .field("jwt_issuer", &self.jwt_issuer)
            .field("auth_timeout", &self.auth_timeout)
            .field("request_timeout", &self.request_timeout)
            .field("users_file", &self.users_file)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let cfg = ApiConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg, ApiConfig::default());
        assert!(cfg.uses_dev_secret());
    }

    #[test]
    fn reads_overrides() {
        let cfg = ApiConfig::from_lookup(lookup(&[
            ("HAOCAI_BIND", "127.0.0.1:9000"),
            ("JWT_SECRET", "prod"),
            ("JWT_TTL_SECS", "3600"),
            ("AUTH_TIMEOUT_MS", "250"),
            ("HAOCAI_USERS_FILE", "/etc/haocai/users.json"),
        ]))
        .unwrap();

        assert_eq!(cfg.bind_addr.port(), 9000);
        assert!(!cfg.uses_dev_secret());
        assert_eq!(cfg.jwt_ttl, Duration::from_secs(3600));
        assert_eq!(cfg.auth_timeout, Duration::from_millis(250));
        assert_eq!(cfg.users_file, Some(PathBuf::from("/etc/haocai/users.json")));
    }

    #[test]
    fn rejects_malformed_numbers() {
        let err = ApiConfig::from_lookup(lookup(&[("REQUEST_TIMEOUT_MS", "soon")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "REQUEST_TIMEOUT_MS", .. }));

        assert!(ApiConfig::from_lookup(lookup(&[("AUTH_TIMEOUT_MS", "0")])).is_err());
    }

    #[test]
    fn debug_redacts_secret() {
        let cfg = ApiConfig::from_lookup(lookup(&[("JWT_SECRET", "topsecret")])).unwrap();
        assert!(!format!("{cfg:?}").contains("topsecret"));
    }
}
