use std::env;
use std::str::FromStr;

use crate::error::AppError;

/// What happens to `status` when a technician is assigned without an
/// explicit status in the same update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AssignmentPolicy {
    #[default]
    KeepStatus,
    StartOnAssign,
}

impl FromStr for AssignmentPolicy {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "keep_status" => Ok(Self::KeepStatus),
            "start_on_assign" => Ok(Self::StartOnAssign),
            other => Err(format!(
                "unknown assignment policy {other:?}, expected keep_status or start_on_assign"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format {other:?}, expected compact or json")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub assignment_policy: AssignmentPolicy,
    pub verify_writes: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Compact,
            assignment_policy: AssignmentPolicy::KeepStatus,
            verify_writes: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();
        let defaults = Self::default();

        Ok(Self {
            host: env::var("HOST").unwrap_or(defaults.host),
            port: parse_or_default("PORT", defaults.port)?,
            log_level: env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
            log_format: parse_or_default("LOG_FORMAT", defaults.log_format)?,
            assignment_policy: parse_or_default("ASSIGNMENT_POLICY", defaults.assignment_policy)?,
            verify_writes: parse_or_default("VERIFY_WRITES", defaults.verify_writes)?,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assignment_policy_parses_known_names() {
        assert_eq!(
            "start_on_assign".parse::<AssignmentPolicy>(),
            Ok(AssignmentPolicy::StartOnAssign)
        );
        assert_eq!(
            " KEEP_STATUS ".parse::<AssignmentPolicy>(),
            Ok(AssignmentPolicy::KeepStatus)
        );
        assert!("auto".parse::<AssignmentPolicy>().is_err());
    }

    #[test]
    fn log_format_parses_json() {
        assert_eq!("json".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert!("pretty".parse::<LogFormat>().is_err());
    }

    #[test]
    fn defaults_bind_all_interfaces_on_3000() {
        assert_eq!(Config::default().bind_addr(), "0.0.0.0:3000");
    }
}
