use std::time::Duration;

use datastory_core::job::{DEFAULT_MAX_ATTEMPTS, MAX_ALLOWED_ATTEMPTS};
use datastory_core::retry::RetryPolicy;
use datastory_pipeline::{OrchestratorConfig, DEFAULT_MAX_CHARTS};

use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// All fields except the JWT secret have defaults suitable for local
/// development. In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long shutdown waits for running attempts (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// PostgreSQL URL. When unset the in-memory store is used.
    pub database_url: Option<String>,
    /// JWT token configuration.
    pub jwt: JwtConfig,
    /// Base URL of the analysis service.
    pub analysis_service_url: String,
    /// Per-call analysis timeout in seconds (default: `300`).
    pub analysis_timeout_secs: u64,
    /// `maxAttempts` for jobs created without one (default: `3`).
    pub job_max_attempts: u32,
    /// Minimum seconds between a failure and a user retry (default: `10`).
    pub retry_cooldown_secs: u64,
    /// Charts kept per story (default: `6`).
    pub max_charts: usize,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                    |
    /// |-------------------------|----------------------------|
    /// | `HOST`                  | `0.0.0.0`                  |
    /// | `PORT`                  | `3000`                     |
    /// | `CORS_ORIGINS`          | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS`  | `30`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS` | `30`                       |
    /// | `DATABASE_URL`          | unset (in-memory store)    |
    /// | `ANALYSIS_SERVICE_URL`  | `http://localhost:8000`    |
    /// | `ANALYSIS_TIMEOUT_SECS` | `300`                      |
    /// | `JOB_MAX_ATTEMPTS`      | `3`                        |
    /// | `RETRY_COOLDOWN_SECS`   | `10`                       |
    /// | `MAX_CHARTS`            | `6`                        |
    ///
    /// # Panics
    ///
    /// Panics on unparseable values, on a `JOB_MAX_ATTEMPTS` outside
    /// `1..=10`, and when `JWT_SECRET` is missing.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = env_or("PORT", "3000")
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = env_or("CORS_ORIGINS", "http://localhost:5173")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = env_or("REQUEST_TIMEOUT_SECS", "30")
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = env_or("SHUTDOWN_TIMEOUT_SECS", "30")
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());

        let analysis_service_url = env_or("ANALYSIS_SERVICE_URL", "http://localhost:8000");

        let analysis_timeout_secs: u64 = env_or("ANALYSIS_TIMEOUT_SECS", "300")
            .parse()
            .expect("ANALYSIS_TIMEOUT_SECS must be a valid u64");

        let job_max_attempts =
            parse_job_max_attempts(&env_or("JOB_MAX_ATTEMPTS", &DEFAULT_MAX_ATTEMPTS.to_string()));

        let retry_cooldown_secs: u64 = env_or("RETRY_COOLDOWN_SECS", "10")
            .parse()
            .expect("RETRY_COOLDOWN_SECS must be a valid u64");

        let max_charts: usize = env_or("MAX_CHARTS", &DEFAULT_MAX_CHARTS.to_string())
            .parse()
            .expect("MAX_CHARTS must be a valid usize");

        let jwt = JwtConfig::from_env();

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            database_url,
            jwt,
            analysis_service_url,
            analysis_timeout_secs,
            job_max_attempts,
            retry_cooldown_secs,
            max_charts,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(Duration::from_secs(self.retry_cooldown_secs))
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            max_charts: self.max_charts,
        }
    }

    pub fn analysis_timeout(&self) -> Duration {
        Duration::from_secs(self.analysis_timeout_secs)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Jobs created without `maxAttempts` get this value, so it must pass the
/// same range check a client-supplied value does.
fn parse_job_max_attempts(raw: &str) -> u32 {
    let value: u32 = raw
        .trim()
        .parse()
        .expect("JOB_MAX_ATTEMPTS must be a valid u32");
    assert!(
        (1..=MAX_ALLOWED_ATTEMPTS).contains(&value),
        "JOB_MAX_ATTEMPTS must be between 1 and {MAX_ALLOWED_ATTEMPTS}, got {value}"
    );
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_max_attempts_accepts_the_allowed_range() {
        assert_eq!(parse_job_max_attempts("1"), 1);
        assert_eq!(parse_job_max_attempts("3"), 3);
        assert_eq!(
            parse_job_max_attempts(&MAX_ALLOWED_ATTEMPTS.to_string()),
            MAX_ALLOWED_ATTEMPTS
        );
    }

    #[test]
    #[should_panic(expected = "JOB_MAX_ATTEMPTS must be between 1 and 10")]
    fn job_max_attempts_rejects_zero() {
        parse_job_max_attempts("0");
    }

    #[test]
    #[should_panic(expected = "JOB_MAX_ATTEMPTS must be between 1 and 10")]
    fn job_max_attempts_rejects_values_above_the_cap() {
        parse_job_max_attempts("11");
    }
}
