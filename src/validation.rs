use crate::constants::{MAX_APP_PATTERN_LEN, MAX_HOSTNAME_LEN, TIME_FORMAT};
use crate::error::AppError;
use chrono::NaiveTime;

/// Split a comma-joined list, trimming entries and dropping empty ones.
pub fn split_list(csv: &str) -> Vec<String> {
    csv.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Validate time format (HH:MM, 24-hour format).
pub fn validate_time_format(time: &str) -> Result<NaiveTime, AppError> {
    let err = |reason: &str| AppError::InvalidInput {
        field: "time",
        reason: reason.into(),
    };

    if time.len() != 5 {
        return Err(err("must be in HH:MM format"));
    }

    NaiveTime::parse_from_str(time, TIME_FORMAT).map_err(|_| err("must be a valid HH:MM time"))
}

/// Validate a focus window. Windows crossing midnight are rejected.
pub fn validate_time_window(start: &str, end: &str) -> Result<(NaiveTime, NaiveTime), AppError> {
    let start_time = validate_time_format(start)?;
    let end_time = validate_time_format(end)?;

    if end_time < start_time {
        return Err(AppError::InvalidInput {
            field: "end_time",
            reason: format!("{end} is before start time {start}"),
        });
    }

    Ok((start_time, end_time))
}

/// Validate a hostname to block. Returns it lowercased.
pub fn validate_hostname(hostname: &str) -> Result<String, AppError> {
    let err = |reason: String| AppError::InvalidInput {
        field: "blocked_websites",
        reason,
    };

    let hostname = hostname.trim().to_ascii_lowercase();
    if hostname.is_empty() {
        return Err(err("hostname cannot be empty".into()));
    }
    if hostname.len() > MAX_HOSTNAME_LEN {
        return Err(err(format!("cannot exceed {MAX_HOSTNAME_LEN} characters")));
    }
    if hostname.contains(|c: char| c.is_whitespace() || c == '/' || c == '#') {
        return Err(err(format!("'{hostname}' is not a bare hostname")));
    }

    match url::Host::parse(&hostname) {
        Ok(url::Host::Domain(_)) => Ok(hostname),
        Ok(url::Host::Ipv4(_) | url::Host::Ipv6(_)) => {
            Err(err(format!("'{hostname}' is an IP address, not a hostname")))
        }
        Err(e) => Err(err(format!("'{hostname}': {e}"))),
    }
}

/// Validate a blocked-app token.
pub fn validate_app_pattern(pattern: &str) -> Result<&str, AppError> {
    let pattern = pattern.trim();
    if pattern.is_empty() {
        return Err(AppError::InvalidInput {
            field: "blocked_apps",
            reason: "cannot be empty".into(),
        });
    }
    if pattern.len() > MAX_APP_PATTERN_LEN {
        return Err(AppError::InvalidInput {
            field: "blocked_apps",
            reason: format!("cannot exceed {MAX_APP_PATTERN_LEN} characters"),
        });
    }
    Ok(pattern)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_list_drops_empty_tokens() {
        assert_eq!(split_list("a, b ,,c"), vec!["a", "b", "c"]);
        assert!(split_list("").is_empty());
        assert!(split_list(" , ").is_empty());
    }

    #[test]
    fn test_validate_time_format_valid() {
        assert!(validate_time_format("09:00").is_ok());
        assert!(validate_time_format("23:59").is_ok());
        assert!(validate_time_format("00:00").is_ok());
    }

    #[test]
    fn test_validate_time_format_invalid() {
        assert!(validate_time_format("9:00").is_err());
        assert!(validate_time_format("25:00").is_err());
        assert!(validate_time_format("12:60").is_err());
        assert!(validate_time_format("ab:cd").is_err());
    }

    #[test]
    fn test_validate_time_window() {
        assert!(validate_time_window("09:00", "17:00").is_ok());
        assert!(validate_time_window("09:00", "09:00").is_ok());
        assert!(validate_time_window("17:00", "09:00").is_err());
    }

    #[test]
    fn test_validate_hostname() {
        assert_eq!(validate_hostname(" X.com ").unwrap(), "x.com");
        assert!(validate_hostname("www.youtube.com").is_ok());
        assert!(validate_hostname("").is_err());
        assert!(validate_hostname("127.0.0.1").is_err());
        assert!(validate_hostname("https://x.com/").is_err());
        assert!(validate_hostname("a b.com").is_err());
    }

    #[test]
    fn test_validate_app_pattern() {
        assert_eq!(validate_app_pattern(" chrome.exe ").unwrap(), "chrome.exe");
        assert!(validate_app_pattern("   ").is_err());
        assert!(validate_app_pattern(&"x".repeat(MAX_APP_PATTERN_LEN + 1)).is_err());
    }
}
