use std::path::PathBuf;

pub const DEFAULT_ADMIN_EMAIL: &str = "admin@hcs.edu";
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

impl LogFormat {
    fn parse(s: &str) -> LogFormat {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Compact,
        }
    }
}

/// Process settings. Every field has a default so the sidecar starts with no environment.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub workspace: Option<PathBuf>,
    pub seed_on_open: bool,
    pub admin_email: String,
    pub admin_password: String,
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workspace: None,
            seed_on_open: true,
            admin_email: DEFAULT_ADMIN_EMAIL.to_string(),
            admin_password: DEFAULT_ADMIN_PASSWORD.to_string(),
            log_format: LogFormat::Compact,
        }
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Blank values fall back to the default.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Config::default();

        Self {
            workspace: get("FEESD_WORKSPACE").map(PathBuf::from),
            seed_on_open: get("FEESD_SEED_ON_OPEN")
                .and_then(|v| parse_bool(&v))
                .unwrap_or(defaults.seed_on_open),
            admin_email: get("FEESD_ADMIN_EMAIL")
                .map(|v| v.trim().to_string())
                .unwrap_or(defaults.admin_email),
            admin_password: get("FEESD_ADMIN_PASSWORD").unwrap_or(defaults.admin_password),
            log_format: get("FEESD_LOG_FORMAT")
                .map(|v| LogFormat::parse(&v))
                .unwrap_or(defaults.log_format),
        }
    }
}
