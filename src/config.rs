use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "CliniCare";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_API_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.5-pro";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

/// Default tracing filter when RUST_LOG is unset
pub fn default_log_filter() -> &'static str {
    "clinicare=info"
}

/// Get the application data directory
/// ~/CliniCare/ on all platforms (user-visible)
pub fn app_data_dir() -> PathBuf {
    let home = dirs::home_dir().expect("Cannot determine home directory");
    home.join(APP_NAME)
}

/// Runtime configuration, constructed once and passed around explicitly.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Ward database file.
    pub db_path: PathBuf,
    /// Generation API endpoint.
    pub api_base_url: String,
    /// API key; chat and plan drafting refuse to run without it.
    pub api_key: Option<String>,
    pub model: String,
    pub request_timeout_secs: u64,
}

impl AppConfig {
    /// Build a config from the environment (after `dotenv` has loaded).
    pub fn from_env() -> Self {
        let db_path = std::env::var("CLINICARE_DB")
            .map(PathBuf::from)
            .unwrap_or_else(|_| app_data_dir().join("ward.db"));

        Self {
            db_path,
            api_base_url: std::env::var("GEMINI_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string()),
            api_key: std::env::var("GEMINI_API_KEY").ok().filter(|k| !k.is_empty()),
            model: std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            db_path: PathBuf::from(":memory:"),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            api_key: Some("test-key".to_string()),
            model: DEFAULT_MODEL.to_string(),
            request_timeout_secs: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_data_dir_under_home() {
        let dir = app_data_dir();
        let home = dirs::home_dir().unwrap();
        assert!(dir.starts_with(home));
        assert!(dir.ends_with(APP_NAME));
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, "0.1.0");
    }

    #[test]
    fn test_config_has_key_and_defaults() {
        let config = AppConfig::for_tests();
        assert!(config.api_key.is_some());
        assert_eq!(config.model, DEFAULT_MODEL);
        assert!(config.api_base_url.starts_with("https://"));
    }
}
