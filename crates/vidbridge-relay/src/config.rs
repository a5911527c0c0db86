//! Process configuration, loaded once at startup from the environment.

use std::env;

/// Process configuration. Constructed once at startup and threaded
/// through every other component as explicit state.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// TCP port to bind the HTTP/WebSocket listener on
    pub port: u16,
    /// Allowed CORS origin
    pub cors_origin: String,
    /// Document database connection string
    pub database_uri: String,
    /// HMAC secret used to sign and verify bearer tokens
    pub auth_secret: String,
    /// `tracing` log level filter
    pub log_level: String,
}

/// Raised when a required setting is absent. The caller treats this as
/// fatal and exits before binding any listener.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct ConfigError(String);

impl RelayConfig {
    const DEFAULT_PORT: u16 = 3001;

    /// Load configuration from the environment, optionally sourcing a
    /// local `.env` file first. `AUTH_SECRET` and `DATABASE_URI` are
    /// required; their absence is fatal. A malformed `PORT` falls back
    /// to the default with a warning rather than refusing to start.
    pub fn from_env() -> Result<Self, ConfigError> {
        // A missing .env file is not an error -- env vars may already be
        // set directly (container deployments, CI).
        let _ = dotenvy::dotenv();

        let auth_secret = env::var("AUTH_SECRET").unwrap_or_default();
        if auth_secret.is_empty() {
            return Err(ConfigError("AUTH_SECRET is required".to_string()));
        }

        let database_uri = env::var("DATABASE_URI").unwrap_or_default();
        if database_uri.is_empty() {
            return Err(ConfigError("DATABASE_URI is required".to_string()));
        }

        let port = match env::var("PORT") {
            Ok(raw) => raw.parse().unwrap_or_else(|_| {
                tracing::warn!(raw = %raw, "invalid PORT, falling back to default");
                Self::DEFAULT_PORT
            }),
            Err(_) => Self::DEFAULT_PORT,
        };

        let cors_origin = env::var("CORS_ORIGIN").unwrap_or_else(|_| "*".to_string());
        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            port,
            cors_origin,
            database_uri,
            auth_secret,
            log_level,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Environment variable mutation races across parallel test threads, so
    // every test in this module takes the same lock first.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_env() {
        for key in ["AUTH_SECRET", "DATABASE_URI", "PORT", "CORS_ORIGIN", "LOG_LEVEL"] {
            env::remove_var(key);
        }
    }

    #[test]
    fn refuses_missing_auth_secret() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        env::set_var("DATABASE_URI", "mongodb://localhost/test");
        assert!(RelayConfig::from_env().is_err());
        clear_env();
    }

    #[test]
    fn refuses_missing_database_uri() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        env::set_var("AUTH_SECRET", "test-secret");
        assert!(RelayConfig::from_env().is_err());
        clear_env();
    }

    #[test]
    fn falls_back_to_default_port_on_garbage() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        env::set_var("AUTH_SECRET", "test-secret");
        env::set_var("DATABASE_URI", "mongodb://localhost/test");
        env::set_var("PORT", "not-a-number");
        let config = RelayConfig::from_env().unwrap();
        assert_eq!(config.port, RelayConfig::DEFAULT_PORT);
        clear_env();
    }

    #[test]
    fn cors_origin_defaults_to_wildcard() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        env::set_var("AUTH_SECRET", "test-secret");
        env::set_var("DATABASE_URI", "mongodb://localhost/test");
        let config = RelayConfig::from_env().unwrap();
        assert_eq!(config.cors_origin, "*");
        clear_env();
    }
}
