use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use crate::fla::ProbabilityPolicy;
use crate::migration::{DEFAULT_STAY_PROBABILITY, ROW_SUM_TOLERANCE};

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub engine: EngineConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let engine = EngineConfig::from_env()?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            engine,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Knobs for the evaluation core that operators tune per deployment.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub matrix_tolerance: f64,
    pub probability_policy: ProbabilityPolicy,
    pub default_stay_probability: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            matrix_tolerance: ROW_SUM_TOLERANCE,
            probability_policy: ProbabilityPolicy::default(),
            default_stay_probability: DEFAULT_STAY_PROBABILITY,
        }
    }
}

impl EngineConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let matrix_tolerance = match env::var("RISK_MATRIX_TOLERANCE") {
            Ok(raw) => raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|value| value.is_finite() && *value >= 0.0 && *value < 1.0)
                .ok_or(ConfigError::InvalidTolerance(raw))?,
            Err(_) => defaults.matrix_tolerance,
        };

        let probability_policy = match env::var("RISK_PROBABILITY_POLICY") {
            Ok(raw) => ProbabilityPolicy::parse(&raw)
                .ok_or(ConfigError::InvalidProbabilityPolicy(raw))?,
            Err(_) => defaults.probability_policy,
        };

        let default_stay_probability = match env::var("RISK_DEFAULT_STAY") {
            Ok(raw) => raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|value| (0.0..=1.0).contains(value))
                .ok_or(ConfigError::InvalidStayProbability(raw))?,
            Err(_) => defaults.default_stay_probability,
        };

        Ok(Self {
            matrix_tolerance,
            probability_policy,
            default_stay_probability,
        })
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidTolerance(String),
    InvalidProbabilityPolicy(String),
    InvalidStayProbability(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidTolerance(raw) => write!(
                f,
                "RISK_MATRIX_TOLERANCE must be a number in [0, 1), got '{raw}'"
            ),
            ConfigError::InvalidProbabilityPolicy(raw) => write!(
                f,
                "RISK_PROBABILITY_POLICY must be one of clamp, propagate, reject, got '{raw}'"
            ),
            ConfigError::InvalidStayProbability(raw) => write!(
                f,
                "RISK_DEFAULT_STAY must be a probability in [0, 1], got '{raw}'"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        env::remove_var("APP_ENV");
        env::remove_var("APP_HOST");
        env::remove_var("APP_PORT");
        env::remove_var("APP_LOG_LEVEL");
        env::remove_var("RISK_MATRIX_TOLERANCE");
        env::remove_var("RISK_PROBABILITY_POLICY");
        env::remove_var("RISK_DEFAULT_STAY");
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.engine, EngineConfig::default());
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        reset_env();
    }

    #[test]
    fn engine_settings_read_from_env() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("RISK_MATRIX_TOLERANCE", "0.005");
        env::set_var("RISK_PROBABILITY_POLICY", "Reject");
        env::set_var("RISK_DEFAULT_STAY", "0.9");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.engine.matrix_tolerance, 0.005);
        assert_eq!(config.engine.probability_policy, ProbabilityPolicy::Reject);
        assert_eq!(config.engine.default_stay_probability, 0.9);
        reset_env();
    }

    #[test]
    fn rejects_unknown_probability_policy() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("RISK_PROBABILITY_POLICY", "ignore");
        match AppConfig::load() {
            Err(ConfigError::InvalidProbabilityPolicy(raw)) => assert_eq!(raw, "ignore"),
            other => panic!("expected policy error, got {other:?}"),
        }
        reset_env();
    }

    #[test]
    fn rejects_stay_probability_above_one() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("RISK_DEFAULT_STAY", "1.4");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidStayProbability(_))
        ));
        reset_env();
    }
}
