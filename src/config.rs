use std::{env, net::SocketAddr, str::FromStr, time::Duration};

use ipnet::IpNet;

use thiserror::Error;

use crate::domain::logs::{AggregationLimits, DEFAULT_MAX_LINES, DEFAULT_TIMEOUT};
use crate::logging::LogFormat;

pub const MAX_LOG_LINES: usize = 1_000;
pub const MAX_LOG_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Systemd,
    Disabled,
}

impl FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "systemd" => Ok(Self::Systemd),
            "none" | "disabled" => Ok(Self::Disabled),
            _ => Err(ConfigError::InvalidProvider),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_token: String,
    pub bind_addr: String,
    pub bind_port: u16,
    pub allowed_cidr: Option<IpNet>,
    pub provider: ProviderKind,
    pub log_limits: AggregationLimits,
    pub log_format: LogFormat,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("MCP_API_TOKEN is required and must not be empty")]
    MissingApiToken,
    #[error("BIND_PORT must be a valid u16")]
    InvalidPort,
    #[error("MCP_ALLOWED_CIDR must be a valid CIDR range")]
    InvalidAllowedCidr,
    #[error("invalid bind address or port")]
    InvalidSocket,
    #[error("RESOURCE_PROVIDER must be one of: systemd, none")]
    InvalidProvider,
    #[error("LOG_MAX_LINES must be between 1 and 1000")]
    InvalidMaxLines,
    #[error("LOG_TIMEOUT_SECS must be between 1 and 60")]
    InvalidLogTimeout,
    #[error("LOG_FORMAT must be one of: compact, json")]
    InvalidLogFormat,
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_token = non_empty_var("MCP_API_TOKEN").ok_or(ConfigError::MissingApiToken)?;

        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string());
        let bind_port = env::var("BIND_PORT")
            .ok()
            .map(|value| value.parse::<u16>().map_err(|_| ConfigError::InvalidPort))
            .transpose()?
            .unwrap_or(8080);
        let allowed_cidr = non_empty_var("MCP_ALLOWED_CIDR")
            .map(|value| {
                value
                    .parse::<IpNet>()
                    .map_err(|_| ConfigError::InvalidAllowedCidr)
            })
            .transpose()?;

        let provider = non_empty_var("RESOURCE_PROVIDER")
            .map(|value| value.parse::<ProviderKind>())
            .transpose()?
            .unwrap_or(ProviderKind::Systemd);

        let max_lines = non_empty_var("LOG_MAX_LINES")
            .map(|value| {
                value
                    .parse::<usize>()
                    .ok()
                    .filter(|lines| (1..=MAX_LOG_LINES).contains(lines))
                    .ok_or(ConfigError::InvalidMaxLines)
            })
            .transpose()?
            .unwrap_or(DEFAULT_MAX_LINES);
        let timeout = non_empty_var("LOG_TIMEOUT_SECS")
            .map(|value| {
                value
                    .parse::<u64>()
                    .ok()
                    .filter(|seconds| (1..=MAX_LOG_TIMEOUT_SECS).contains(seconds))
                    .map(Duration::from_secs)
                    .ok_or(ConfigError::InvalidLogTimeout)
            })
            .transpose()?
            .unwrap_or(DEFAULT_TIMEOUT);

        let log_format = non_empty_var("LOG_FORMAT")
            .map(|value| {
                value
                    .parse::<LogFormat>()
                    .map_err(|_| ConfigError::InvalidLogFormat)
            })
            .transpose()?
            .unwrap_or_default();

        let config = Self {
            api_token,
            bind_addr,
            bind_port,
            allowed_cidr,
            provider,
            log_limits: AggregationLimits { max_lines, timeout },
            log_format,
        };

        let _ = config.bind_socket()?;
        Ok(config)
    }

    pub fn bind_socket(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.bind_addr, self.bind_port)
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::InvalidSocket)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    // Tests mutate process-wide environment variables.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const VARS: [&str; 8] = [
        "MCP_API_TOKEN",
        "BIND_ADDR",
        "BIND_PORT",
        "MCP_ALLOWED_CIDR",
        "RESOURCE_PROVIDER",
        "LOG_MAX_LINES",
        "LOG_TIMEOUT_SECS",
        "LOG_FORMAT",
    ];

    fn with_env<T>(vars: &[(&str, &str)], test: impl FnOnce() -> T) -> T {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        for name in VARS {
            env::remove_var(name);
        }
        for (name, value) in vars {
            env::set_var(name, value);
        }
        test()
    }

    #[test]
    fn parse_defaults() {
        let config = with_env(&[("MCP_API_TOKEN", "abc")], Config::from_env)
            .expect("config should parse");

        assert_eq!(config.bind_addr, "127.0.0.1");
        assert_eq!(config.bind_port, 8080);
        assert_eq!(config.allowed_cidr, None);
        assert_eq!(config.provider, ProviderKind::Systemd);
        assert_eq!(config.log_limits, AggregationLimits::default());
        assert_eq!(config.log_format, LogFormat::Compact);
    }

    #[test]
    fn missing_token_fails() {
        let err = with_env(&[], Config::from_env).expect_err("expected missing token error");
        assert!(matches!(err, ConfigError::MissingApiToken));
    }

    #[test]
    fn allowed_cidr_parses_when_valid() {
        let config = with_env(
            &[("MCP_API_TOKEN", "abc"), ("MCP_ALLOWED_CIDR", "10.0.0.0/8")],
            Config::from_env,
        )
        .expect("config should parse");

        assert_eq!(
            config.allowed_cidr,
            Some("10.0.0.0/8".parse().expect("valid cidr"))
        );
    }

    #[test]
    fn invalid_allowed_cidr_fails() {
        let err = with_env(
            &[("MCP_API_TOKEN", "abc"), ("MCP_ALLOWED_CIDR", "not-a-cidr")],
            Config::from_env,
        )
        .expect_err("expected invalid cidr error");
        assert!(matches!(err, ConfigError::InvalidAllowedCidr));
    }

    #[test]
    fn provider_can_be_disabled() {
        let config = with_env(
            &[("MCP_API_TOKEN", "abc"), ("RESOURCE_PROVIDER", " None ")],
            Config::from_env,
        )
        .expect("config should parse");
        assert_eq!(config.provider, ProviderKind::Disabled);
    }

    #[test]
    fn unknown_provider_fails() {
        let err = with_env(
            &[("MCP_API_TOKEN", "abc"), ("RESOURCE_PROVIDER", "docker")],
            Config::from_env,
        )
        .expect_err("expected invalid provider");
        assert!(matches!(err, ConfigError::InvalidProvider));
    }

    #[test]
    fn log_limits_are_configurable() {
        let config = with_env(
            &[
                ("MCP_API_TOKEN", "abc"),
                ("LOG_MAX_LINES", "250"),
                ("LOG_TIMEOUT_SECS", "10"),
            ],
            Config::from_env,
        )
        .expect("config should parse");

        assert_eq!(config.log_limits.max_lines, 250);
        assert_eq!(config.log_limits.timeout, Duration::from_secs(10));
    }

    #[test]
    fn out_of_range_log_limits_fail() {
        let err = with_env(
            &[("MCP_API_TOKEN", "abc"), ("LOG_MAX_LINES", "0")],
            Config::from_env,
        )
        .expect_err("expected invalid max lines");
        assert!(matches!(err, ConfigError::InvalidMaxLines));

        let err = with_env(
            &[("MCP_API_TOKEN", "abc"), ("LOG_TIMEOUT_SECS", "600")],
            Config::from_env,
        )
        .expect_err("expected invalid timeout");
        assert!(matches!(err, ConfigError::InvalidLogTimeout));
    }

    #[test]
    fn json_log_format_parses() {
        let config = with_env(
            &[("MCP_API_TOKEN", "abc"), ("LOG_FORMAT", "JSON")],
            Config::from_env,
        )
        .expect("config should parse");
        assert_eq!(config.log_format, LogFormat::Json);
    }
}
