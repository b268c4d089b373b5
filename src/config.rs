//! Runtime configuration loaded from `EC_PARSER_*` environment variables.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{ParserError, Result};

pub const DEFAULT_COMPANY_MARKER: &str = "Ｊ　Ｕｎｉｔ";

/// Settings shared by the CLI commands. Command-line flags override these per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub log_level: String,
    pub poll_interval: Duration,
    pub poll_max_attempts: u32,
    pub download_delay: Duration,
    pub batch_concurrency: usize,
    pub request_timeout: Duration,
    pub user_agent: String,
    pub output_dir: PathBuf,
    pub company_marker: String,
    /// Host clipboard command, tried before the platform defaults.
    pub clipboard_command: Option<Vec<String>>,
    /// Last-resort clipboard target when no command works.
    pub clipboard_fallback_file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            poll_interval: Duration::from_millis(500),
            poll_max_attempts: 20,
            download_delay: Duration::from_millis(100),
            batch_concurrency: 4,
            request_timeout: Duration::from_secs(30),
            user_agent: "ec-parser/0.1".to_string(),
            output_dir: PathBuf::from("."),
            company_marker: DEFAULT_COMPANY_MARKER.to_string(),
            clipboard_command: None,
            clipboard_fallback_file: None,
        }
    }
}

/// Load configuration from the process environment, reading `.env` first.
pub fn load_config() -> Result<AppConfig> {
    dotenvy::dotenv().ok();
    build_config(|key| std::env::var(key))
}

/// Build configuration from an arbitrary variable lookup.
fn build_config<F>(lookup: F) -> Result<AppConfig>
where
    F: Fn(&str) -> std::result::Result<String, std::env::VarError>,
{
    let defaults = AppConfig::default();

    let parse_u64 = |var: &str, default: u64| -> Result<u64> {
        match lookup(var) {
            Ok(raw) => raw.trim().parse::<u64>().map_err(|e| ParserError::Config {
                var: var.to_string(),
                reason: e.to_string(),
            }),
            Err(_) => Ok(default),
        }
    };

    let poll_interval_ms = parse_u64("EC_PARSER_POLL_INTERVAL_MS", 500)?;
    let poll_max_attempts = parse_u64("EC_PARSER_POLL_MAX_ATTEMPTS", 20)?;
    let download_delay_ms = parse_u64("EC_PARSER_DOWNLOAD_DELAY_MS", 100)?;
    let batch_concurrency = parse_u64("EC_PARSER_BATCH_CONCURRENCY", 4)?;
    let request_timeout_secs = parse_u64("EC_PARSER_REQUEST_TIMEOUT_SECS", 30)?;

    let poll_max_attempts = u32::try_from(poll_max_attempts).map_err(|e| ParserError::Config {
        var: "EC_PARSER_POLL_MAX_ATTEMPTS".to_string(),
        reason: e.to_string(),
    })?;
    if poll_max_attempts == 0 {
        return Err(ParserError::Config {
            var: "EC_PARSER_POLL_MAX_ATTEMPTS".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    if batch_concurrency == 0 {
        return Err(ParserError::Config {
            var: "EC_PARSER_BATCH_CONCURRENCY".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }

    let clipboard_command = lookup("EC_PARSER_CLIPBOARD_CMD")
        .ok()
        .map(|raw| raw.split_whitespace().map(String::from).collect::<Vec<_>>())
        .filter(|parts| !parts.is_empty());

    Ok(AppConfig {
        log_level: lookup("EC_PARSER_LOG_LEVEL").unwrap_or(defaults.log_level),
        poll_interval: Duration::from_millis(poll_interval_ms),
        poll_max_attempts,
        download_delay: Duration::from_millis(download_delay_ms),
        batch_concurrency: usize::try_from(batch_concurrency).unwrap_or(defaults.batch_concurrency),
        request_timeout: Duration::from_secs(request_timeout_secs),
        user_agent: lookup("EC_PARSER_USER_AGENT").unwrap_or(defaults.user_agent),
        output_dir: lookup("EC_PARSER_OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.output_dir),
        company_marker: lookup("EC_PARSER_COMPANY_MARKER").unwrap_or(defaults.company_marker),
        clipboard_command,
        clipboard_fallback_file: lookup("EC_PARSER_CLIPBOARD_FALLBACK_FILE")
            .ok()
            .map(PathBuf::from),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::env::VarError;

    use super::*;

    fn lookup_from_map<'a>(
        map: &'a HashMap<&'a str, &'a str>,
    ) -> impl Fn(&str) -> std::result::Result<String, VarError> + 'a {
        move |key| {
            map.get(key)
                .map(|v| (*v).to_string())
                .ok_or(VarError::NotPresent)
        }
    }

    #[test]
    fn test_defaults_when_nothing_set() {
        let map = HashMap::new();
        let config = build_config(lookup_from_map(&map)).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.company_marker, "Ｊ　Ｕｎｉｔ");
    }

    #[test]
    fn test_overrides_are_applied() {
        let map = HashMap::from([
            ("EC_PARSER_POLL_INTERVAL_MS", "250"),
            ("EC_PARSER_POLL_MAX_ATTEMPTS", "3"),
            ("EC_PARSER_DOWNLOAD_DELAY_MS", "0"),
            ("EC_PARSER_OUTPUT_DIR", "/tmp/out"),
            ("EC_PARSER_CLIPBOARD_CMD", "xclip -selection clipboard"),
        ]);
        let config = build_config(lookup_from_map(&map)).unwrap();
        assert_eq!(config.poll_interval, Duration::from_millis(250));
        assert_eq!(config.poll_max_attempts, 3);
        assert_eq!(config.download_delay, Duration::ZERO);
        assert_eq!(config.output_dir, PathBuf::from("/tmp/out"));
        assert_eq!(
            config.clipboard_command,
            Some(vec![
                "xclip".to_string(),
                "-selection".to_string(),
                "clipboard".to_string()
            ])
        );
    }

    #[test]
    fn test_invalid_number_is_config_error() {
        let map = HashMap::from([("EC_PARSER_POLL_INTERVAL_MS", "soon")]);
        let err = build_config(lookup_from_map(&map)).unwrap_err();
        match err {
            ParserError::Config { var, .. } => assert_eq!(var, "EC_PARSER_POLL_INTERVAL_MS"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let map = HashMap::from([("EC_PARSER_POLL_MAX_ATTEMPTS", "0")]);
        assert!(build_config(lookup_from_map(&map)).is_err());
    }

    #[test]
    fn test_blank_clipboard_command_is_ignored() {
        let map = HashMap::from([("EC_PARSER_CLIPBOARD_CMD", "   ")]);
        let config = build_config(lookup_from_map(&map)).unwrap();
        assert!(config.clipboard_command.is_none());
    }
}
