//! Utility functions.

/// Extract and normalize a username from raw input.
///
/// Strips a leading `@`, trims whitespace and lowercases. Returns `None`
/// unless the result is 1 to 32 characters from `[A-Za-z0-9_]`.
pub fn extract_username(text: &str) -> Option<String> {
    let text = text.trim().trim_start_matches('@');

    if text.is_empty() || text.len() > 32 {
        return None;
    }

    if !text.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }

    Some(text.to_lowercase())
}

/// Render a ban duration for replies. 0 hours is the permanent sentinel.
pub fn format_ban_hours(hours: u32) -> String {
    if hours == 0 {
        "permanent".to_string()
    } else if hours == 1 {
        "1 hour".to_string()
    } else {
        format!("{} hours", hours)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_username_normalizes() {
        assert_eq!(extract_username("@Alice"), Some("alice".to_string()));
        assert_eq!(extract_username("  bob_77 "), Some("bob_77".to_string()));
        assert_eq!(extract_username("@X"), Some("x".to_string()));
    }

    #[test]
    fn test_extract_username_rejects_invalid() {
        assert_eq!(extract_username(""), None);
        assert_eq!(extract_username("@"), None);
        assert_eq!(extract_username("has space"), None);
        assert_eq!(extract_username("semi;colon"), None);
        assert_eq!(extract_username(&"a".repeat(33)), None);
    }

    #[test]
    fn test_format_ban_hours() {
        assert_eq!(format_ban_hours(0), "permanent");
        assert_eq!(format_ban_hours(1), "1 hour");
        assert_eq!(format_ban_hours(48), "48 hours");
    }
}
