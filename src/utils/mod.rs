use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use url::Url;

use crate::config::Config;

/// Parse a `--since`/`--until` bound: RFC 3339 or a plain `YYYY-MM-DD` date
/// (midnight UTC, or the last second of the day when `end_of_day` is set)
pub fn parse_date_bound(value: &str, end_of_day: bool) -> Result<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(value) {
        return Ok(timestamp.with_timezone(&Utc));
    }

    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| anyhow::anyhow!("Invalid date '{}': expected YYYY-MM-DD or RFC 3339", value))?;
    let time = if end_of_day {
        date.and_hms_opt(23, 59, 59)
    } else {
        date.and_hms_opt(0, 0, 0)
    };

    time.map(|t| t.and_utc())
        .ok_or_else(|| anyhow::anyhow!("Invalid date '{}'", value))
}

/// Extract domain from URL for display purposes
pub fn extract_domain(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()?
        .host_str()
        .map(|host| host.strip_prefix("www.").unwrap_or(host).to_string())
}

/// Check if the current environment has required tools
pub async fn check_dependencies(config: &Config) -> Vec<String> {
    let mut missing = Vec::new();

    if !check_command_available(&config.downloader.yt_dlp_path).await {
        missing.push(format!(
            "{} - required for downloading media",
            config.downloader.yt_dlp_path
        ));
    }

    missing
}

/// Check if a command is available in PATH
pub async fn check_command_available(command: &str) -> bool {
    use tokio::process::Command;

    Command::new(command)
        .arg("--version")
        .output()
        .await
        .map(|output| output.status.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_bound() {
        let start = parse_date_bound("2024-03-01", false).unwrap();
        assert_eq!(start.to_rfc3339(), "2024-03-01T00:00:00+00:00");

        let end = parse_date_bound("2024-03-01", true).unwrap();
        assert_eq!(end.to_rfc3339(), "2024-03-01T23:59:59+00:00");

        let exact = parse_date_bound("2024-03-01T12:30:00+02:00", false).unwrap();
        assert_eq!(exact.to_rfc3339(), "2024-03-01T10:30:00+00:00");

        assert!(parse_date_bound("yesterday", false).is_err());
        assert!(parse_date_bound("2024-13-01", false).is_err());
    }

    #[test]
    fn test_extract_domain() {
        assert_eq!(extract_domain("https://www.youtube.com/watch?v=123"), Some("youtube.com".to_string()));
        assert_eq!(extract_domain("https://vm.tiktok.com/ZM123/"), Some("vm.tiktok.com".to_string()));
        assert_eq!(extract_domain("invalid-url"), None);
    }

    #[tokio::test]
    async fn test_missing_tool_is_reported() {
        let mut config = Config::default();
        config.downloader.yt_dlp_path = "vidbrief-no-such-tool".into();
        let missing = check_dependencies(&config).await;
        assert_eq!(missing.len(), 1);
        assert!(missing[0].starts_with("vidbrief-no-such-tool"));
    }
}
