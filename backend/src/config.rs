use std::env;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be a number, got {value:?}")]
    InvalidNumber { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub jwt_secret: String,
    pub cors_origins: Vec<String>,
    /// Length of one pomodoro, used to turn estimates into minutes
    pub focus_duration_minutes: i64,
    pub default_timezone: String,
    pub llm_base_url: String,
    pub llm_api_key: Option<String>,
    pub llm_model: String,
    pub llm_timeout_seconds: u64,
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: &str) -> Result<T, ConfigError> {
    let value = env::var(name).unwrap_or_else(|_| default.to_string());
    value
        .parse()
        .map_err(|_| ConfigError::InvalidNumber { name, value })
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: parse_var("PORT", "8080")?,
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:focusboard.db?mode=rwc".to_string()),
            jwt_secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| "development-secret-key-change-in-production".to_string()),
            cors_origins: env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:3000".to_string())
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            focus_duration_minutes: parse_var("FOCUS_DURATION_MINUTES", "25")?,
            default_timezone: env::var("DEFAULT_TIMEZONE").unwrap_or_else(|_| "UTC".to_string()),
            llm_base_url: env::var("LLM_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            llm_api_key: env::var("LLM_API_KEY").ok(),
            llm_model: env::var("LLM_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            llm_timeout_seconds: parse_var("LLM_TIMEOUT_SECONDS", "60")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Mutex to ensure config tests run serially (env vars are global)
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    fn clear_env() {
        for name in [
            "HOST",
            "PORT",
            "DATABASE_URL",
            "JWT_SECRET",
            "CORS_ORIGINS",
            "FOCUS_DURATION_MINUTES",
            "DEFAULT_TIMEZONE",
            "LLM_BASE_URL",
            "LLM_API_KEY",
            "LLM_MODEL",
            "LLM_TIMEOUT_SECONDS",
        ] {
            env::remove_var(name);
        }
    }

    #[test]
    fn test_config_defaults() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();

        let config = Config::from_env().unwrap();

        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.database_url, "sqlite:focusboard.db?mode=rwc");
        assert_eq!(config.cors_origins, vec!["http://localhost:3000".to_string()]);
        assert_eq!(config.focus_duration_minutes, 25);
        assert_eq!(config.default_timezone, "UTC");
        assert!(config.llm_api_key.is_none());
        assert_eq!(config.llm_timeout_seconds, 60);
    }

    #[test]
    fn test_config_from_env() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();

        env::set_var("HOST", "0.0.0.0");
        env::set_var("PORT", "3000");
        env::set_var("DATABASE_URL", "sqlite:test.db");
        env::set_var("JWT_SECRET", "test-secret");
        env::set_var("CORS_ORIGINS", "http://a.test, http://b.test,");
        env::set_var("FOCUS_DURATION_MINUTES", "50");
        env::set_var("DEFAULT_TIMEZONE", "Europe/Berlin");
        env::set_var("LLM_API_KEY", "sk-test");

        let config = Config::from_env().unwrap();

        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.database_url, "sqlite:test.db");
        assert_eq!(config.jwt_secret, "test-secret");
        assert_eq!(
            config.cors_origins,
            vec!["http://a.test".to_string(), "http://b.test".to_string()]
        );
        assert_eq!(config.focus_duration_minutes, 50);
        assert_eq!(config.default_timezone, "Europe/Berlin");
        assert_eq!(config.llm_api_key, Some("sk-test".to_string()));

        // Clean up
        clear_env();
    }

    #[test]
    fn test_config_rejects_invalid_number() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();

        env::set_var("PORT", "eighty");

        let err = Config::from_env().unwrap_err();
        assert_eq!(err.to_string(), "PORT must be a number, got \"eighty\"");

        clear_env();
    }
}
