use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use crate::cie::{AttendanceThresholds, CieRuleConfiguration, ConfigurationError, DepartmentId};

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
    /// Template used when a department has no CIE configuration yet.
    pub cie_defaults: CieRuleConfiguration,
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
        let log_format = match env::var("APP_LOG_FORMAT") {
            Ok(value) => LogFormat::parse(&value).ok_or(ConfigError::InvalidLogFormat(value))?,
            Err(_) => LogFormat::Compact,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig {
                log_level,
                log_format,
            },
            cie_defaults: load_cie_defaults()?,
        })
    }
}

fn load_cie_defaults() -> Result<CieRuleConfiguration, ConfigError> {
    let mut defaults = CieRuleConfiguration::default_for(DepartmentId::new("template"));

    if let Some(value) = number_var::<f64>("CIE_MAX_MARKS")? {
        defaults.max_cie_marks = value;
    }
    if let Some(value) = number_var::<u32>("CIE_SLIP_TESTS_COUNT")? {
        defaults.slip_tests_count = value;
    }
    if let Some(value) = number_var::<u32>("CIE_SLIP_TESTS_CONSIDER")? {
        defaults.slip_tests_consider = value;
    }
    if let Some(value) = number_var::<f64>("CIE_ATTENDANCE_MAX_MARKS")? {
        defaults.attendance_max_marks = value;
    }
    if let Ok(raw) = env::var("CIE_ATTENDANCE_THRESHOLDS") {
        defaults.attendance_thresholds =
            parse_thresholds(&raw).ok_or_else(|| ConfigError::InvalidNumber {
                name: "CIE_ATTENDANCE_THRESHOLDS",
                value: raw.clone(),
            })?;
    }

    defaults.validated().map_err(ConfigError::CieDefaults)
}

fn number_var<T: std::str::FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidNumber { name, value }),
        Err(_) => Ok(None),
    }
}

/// Parse `marks5,marks4,marks3`, e.g. `85,75,65`.
pub fn parse_thresholds(raw: &str) -> Option<AttendanceThresholds> {
    let values = raw
        .split(',')
        .map(|part| part.trim().parse::<f64>().ok())
        .collect::<Option<Vec<_>>>()?;

    match values.as_slice() {
        [marks5, marks4, marks3] => Some(AttendanceThresholds {
            marks5: *marks5,
            marks4: *marks4,
            marks3: *marks3,
        }),
        _ => None,
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

/// Log output layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Full,
    Pretty,
}

impl LogFormat {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Some(Self::Compact),
            "full" => Some(Self::Full),
            "pretty" => Some(Self::Pretty),
            _ => None,
        }
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub log_format: LogFormat,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidLogFormat(String),
    InvalidNumber { name: &'static str, value: String },
    CieDefaults(ConfigurationError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidLogFormat(value) => write!(
                f,
                "APP_LOG_FORMAT must be one of compact, full, pretty (got '{value}')"
            ),
            ConfigError::InvalidNumber { name, value } => {
                write!(f, "{name} has an unparseable value '{value}'")
            }
            ConfigError::CieDefaults(err) => write!(f, "invalid CIE defaults: {err}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::CieDefaults(err) => Some(err),
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
        for name in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "APP_LOG_FORMAT",
            "CIE_MAX_MARKS",
            "CIE_SLIP_TESTS_COUNT",
            "CIE_SLIP_TESTS_CONSIDER",
            "CIE_ATTENDANCE_MAX_MARKS",
            "CIE_ATTENDANCE_THRESHOLDS",
        ] {
            env::remove_var(name);
        }
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
        assert_eq!(config.telemetry.log_format, LogFormat::Compact);
        assert_eq!(config.cie_defaults.max_cie_marks, 50.0);
        assert_eq!(config.cie_defaults.slip_tests_consider, 2);
        assert_eq!(
            config.cie_defaults.attendance_thresholds,
            AttendanceThresholds::default()
        );
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
    fn cie_defaults_follow_environment() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("CIE_SLIP_TESTS_COUNT", "4");
        env::set_var("CIE_SLIP_TESTS_CONSIDER", "3");
        env::set_var("CIE_ATTENDANCE_THRESHOLDS", "90, 80, 70");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.cie_defaults.slip_tests_count, 4);
        assert_eq!(config.cie_defaults.slip_tests_consider, 3);
        assert_eq!(config.cie_defaults.attendance_thresholds.marks5, 90.0);
        assert_eq!(config.cie_defaults.attendance_thresholds.marks3, 70.0);
        reset_env();
    }

    #[test]
    fn rejects_invalid_cie_defaults() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("CIE_SLIP_TESTS_CONSIDER", "5");
        match AppConfig::load() {
            Err(ConfigError::CieDefaults(ConfigurationError::SlipConsiderExceedsCount {
                consider: 5,
                count: 3,
            })) => {}
            other => panic!("expected invalid defaults, got {other:?}"),
        }

        reset_env();
        env::set_var("CIE_ATTENDANCE_THRESHOLDS", "85,75");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidNumber {
                name: "CIE_ATTENDANCE_THRESHOLDS",
                ..
            })
        ));
        reset_env();
    }
}
