//! Service configuration sourced from environment variables, with an optional
//! YAML override file (`DOCKET_AUTH_CONFIG`).
//!
//! The token signing secret is mandatory: configuration loading fails when it
//! is absent or shorter than the minimum length, and the process refuses to
//! start. There is no fallback value.
use crate::auth::token::MIN_SECRET_LEN;
use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    Postgres,
}

#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_ms: u64,
}

/// Optional first-admin account created at startup when no account with the
/// configured email exists. Role changes are admin-only, so a fresh
/// deployment needs one account that did not come through signup.
#[derive(Debug, Clone)]
pub struct BootstrapAdmin {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct AuthServiceConfig {
    pub bind_addr: SocketAddr,
    pub metrics_bind: SocketAddr,
    pub token_secret: String,
    pub session_ttl: Duration,
    pub reset_ttl: Duration,
    /// Gates the forgot-password token echo. Never enable in production.
    pub dev_mode: bool,
    pub storage: StorageBackend,
    pub postgres: Option<PostgresConfig>,
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

#[derive(Debug, Deserialize)]
struct AuthServiceConfigOverride {
    bind_addr: Option<String>,
    metrics_bind: Option<String>,
    session_ttl_secs: Option<u64>,
    reset_ttl_secs: Option<u64>,
    dev_mode: Option<bool>,
}

impl AuthServiceConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_env_or_yaml() -> Result<Self> {
        let mut config = Self::from_env()?;
        if let Ok(path) = std::env::var("DOCKET_AUTH_CONFIG") {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("read DOCKET_AUTH_CONFIG: {path}"))?;
            let override_cfg: AuthServiceConfigOverride =
                serde_yaml::from_str(&contents).with_context(|| "parse auth config yaml")?;
            if let Some(value) = override_cfg.bind_addr {
                config.bind_addr = value.parse().with_context(|| "parse bind_addr")?;
            }
            if let Some(value) = override_cfg.metrics_bind {
                config.metrics_bind = value.parse().with_context(|| "parse metrics_bind")?;
            }
            if let Some(value) = override_cfg.session_ttl_secs {
                config.session_ttl = Duration::from_secs(value);
            }
            if let Some(value) = override_cfg.reset_ttl_secs {
                config.reset_ttl = Duration::from_secs(value);
            }
            if let Some(value) = override_cfg.dev_mode {
                config.dev_mode = value;
            }
        }
        Ok(config)
    }

    /// Build configuration from a key lookup. Split out from [`from_env`] so
    /// tests can exercise parsing without touching process-global state.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let bind_addr = lookup("DOCKET_AUTH_BIND")
            .unwrap_or_else(|| "0.0.0.0:8080".to_string())
            .parse()
            .with_context(|| "parse DOCKET_AUTH_BIND")?;
        let metrics_bind = lookup("DOCKET_AUTH_METRICS_BIND")
            .unwrap_or_else(|| "0.0.0.0:9090".to_string())
            .parse()
            .with_context(|| "parse DOCKET_AUTH_METRICS_BIND")?;

        let token_secret = lookup("DOCKET_AUTH_TOKEN_SECRET").with_context(|| {
            "DOCKET_AUTH_TOKEN_SECRET must be set; the service refuses to start without a signing secret"
        })?;
        if token_secret.len() < MIN_SECRET_LEN {
            bail!("DOCKET_AUTH_TOKEN_SECRET must be at least {MIN_SECRET_LEN} bytes");
        }

        let session_ttl = parse_secs(&lookup, "DOCKET_AUTH_SESSION_TTL_SECS", 86_400)?;
        let reset_ttl = parse_secs(&lookup, "DOCKET_AUTH_RESET_TTL_SECS", 3_600)?;

        let dev_mode = lookup("DOCKET_AUTH_DEV_MODE")
            .map(|value| matches!(value.as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let storage = match lookup("DOCKET_AUTH_STORAGE").as_deref() {
            None | Some("memory") => StorageBackend::Memory,
            Some("postgres") => StorageBackend::Postgres,
            Some(other) => bail!("unknown DOCKET_AUTH_STORAGE backend: {other}"),
        };

        let postgres = lookup("DOCKET_AUTH_PG_URL").map(|url| -> Result<PostgresConfig> {
            let max_connections = lookup("DOCKET_AUTH_PG_MAX_CONNECTIONS")
                .map(|value| value.parse())
                .transpose()
                .with_context(|| "parse DOCKET_AUTH_PG_MAX_CONNECTIONS")?
                .unwrap_or(10);
            let acquire_timeout_ms = lookup("DOCKET_AUTH_PG_ACQUIRE_TIMEOUT_MS")
                .map(|value| value.parse())
                .transpose()
                .with_context(|| "parse DOCKET_AUTH_PG_ACQUIRE_TIMEOUT_MS")?
                .unwrap_or(5_000);
            Ok(PostgresConfig {
                url,
                max_connections,
                acquire_timeout_ms,
            })
        });
        let postgres = postgres.transpose()?;

        let bootstrap_admin = match (
            lookup("DOCKET_AUTH_BOOTSTRAP_ADMIN_EMAIL"),
            lookup("DOCKET_AUTH_BOOTSTRAP_ADMIN_PASSWORD"),
        ) {
            (Some(email), Some(password)) => Some(BootstrapAdmin { email, password }),
            (None, None) => None,
            _ => bail!(
                "DOCKET_AUTH_BOOTSTRAP_ADMIN_EMAIL and DOCKET_AUTH_BOOTSTRAP_ADMIN_PASSWORD must be set together"
            ),
        };

        Ok(Self {
            bind_addr,
            metrics_bind,
            token_secret,
            session_ttl,
            reset_ttl,
            dev_mode,
            storage,
            postgres,
            bootstrap_admin,
        })
    }
}

fn parse_secs(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: u64,
) -> Result<Duration> {
    let secs = lookup(key)
        .map(|value| value.parse())
        .transpose()
        .with_context(|| format!("parse {key}"))?
        .unwrap_or(default);
    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SECRET: &str = "config-test-secret-0123456789abcdef012345";

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn load(pairs: &[(&str, &str)]) -> Result<AuthServiceConfig> {
        let map = vars(pairs);
        AuthServiceConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn missing_secret_refuses_to_configure() {
        let err = load(&[]).err().expect("must fail");
        assert!(err.to_string().contains("DOCKET_AUTH_TOKEN_SECRET"));
    }

    #[test]
    fn short_secret_refuses_to_configure() {
        let err = load(&[("DOCKET_AUTH_TOKEN_SECRET", "short")])
            .err()
            .expect("must fail");
        assert!(err.to_string().contains("at least"));
    }

    #[test]
    fn defaults_apply_when_only_the_secret_is_set() {
        let config = load(&[("DOCKET_AUTH_TOKEN_SECRET", SECRET)]).expect("config");
        assert_eq!(config.session_ttl, Duration::from_secs(86_400));
        assert_eq!(config.reset_ttl, Duration::from_secs(3_600));
        assert!(!config.dev_mode);
        assert_eq!(config.storage, StorageBackend::Memory);
        assert!(config.postgres.is_none());
        assert!(config.bootstrap_admin.is_none());
    }

    #[test]
    fn postgres_backend_parses_connection_settings() {
        let config = load(&[
            ("DOCKET_AUTH_TOKEN_SECRET", SECRET),
            ("DOCKET_AUTH_STORAGE", "postgres"),
            ("DOCKET_AUTH_PG_URL", "postgres://localhost/docket"),
            ("DOCKET_AUTH_PG_MAX_CONNECTIONS", "4"),
        ])
        .expect("config");
        assert_eq!(config.storage, StorageBackend::Postgres);
        let pg = config.postgres.expect("pg");
        assert_eq!(pg.max_connections, 4);
        assert_eq!(pg.acquire_timeout_ms, 5_000);
    }

    #[test]
    fn unknown_backend_is_rejected() {
        let err = load(&[
            ("DOCKET_AUTH_TOKEN_SECRET", SECRET),
            ("DOCKET_AUTH_STORAGE", "sqlite"),
        ])
        .err()
        .expect("must fail");
        assert!(err.to_string().contains("sqlite"));
    }

    #[test]
    fn bootstrap_admin_must_be_complete() {
        let err = load(&[
            ("DOCKET_AUTH_TOKEN_SECRET", SECRET),
            ("DOCKET_AUTH_BOOTSTRAP_ADMIN_EMAIL", "root@x.com"),
        ])
        .err()
        .expect("must fail");
        assert!(err.to_string().contains("together"));

        let config = load(&[
            ("DOCKET_AUTH_TOKEN_SECRET", SECRET),
            ("DOCKET_AUTH_BOOTSTRAP_ADMIN_EMAIL", "root@x.com"),
            ("DOCKET_AUTH_BOOTSTRAP_ADMIN_PASSWORD", "RootPass1!"),
        ])
        .expect("config");
        assert_eq!(config.bootstrap_admin.expect("admin").email, "root@x.com");
    }

    #[test]
    fn dev_mode_accepts_common_truthy_values() {
        for value in ["1", "true", "yes"] {
            let config = load(&[
                ("DOCKET_AUTH_TOKEN_SECRET", SECRET),
                ("DOCKET_AUTH_DEV_MODE", value),
            ])
            .expect("config");
            assert!(config.dev_mode, "{value} should enable dev mode");
        }
        let config = load(&[
            ("DOCKET_AUTH_TOKEN_SECRET", SECRET),
            ("DOCKET_AUTH_DEV_MODE", "0"),
        ])
        .expect("config");
        assert!(!config.dev_mode);
    }
}
