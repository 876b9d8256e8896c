//! Helper utility functions for CLI commands

/// Truncate to at most `max_chars` characters, counting chars rather than bytes.
pub fn truncate_str(s: &str, max_chars: usize) -> String {
    let char_count = s.chars().count();
    if char_count > max_chars {
        let truncated: String = s.chars().take(max_chars).collect();
        format!("{truncated}...")
    } else {
        s.to_string()
    }
}

/// Split comma- or whitespace-separated app ids, dropping empties
pub fn split_app_ids(inputs: &[String]) -> Vec<String> {
    inputs
        .iter()
        .flat_map(|input| input.split(|c: char| c == ',' || c.is_whitespace()))
        .filter(|id| !id.is_empty())
        .map(ToString::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_str_short() {
        assert_eq!(truncate_str("hello", 10), "hello");
    }

    #[test]
    fn test_truncate_str_exact() {
        assert_eq!(truncate_str("hello", 5), "hello");
    }

    #[test]
    fn test_truncate_str_long() {
        assert_eq!(truncate_str("com.instagram.android", 9), "com.insta...");
    }

    #[test]
    fn test_truncate_str_unicode() {
        assert_eq!(truncate_str("\u{e9}t\u{e9} app", 3), "\u{e9}t\u{e9}...");
    }

    #[test]
    fn test_split_app_ids() {
        let inputs = vec![
            "firefox,slack".to_string(),
            " com.reddit.frontpage ".to_string(),
            ",,".to_string(),
        ];
        assert_eq!(
            split_app_ids(&inputs),
            vec!["firefox", "slack", "com.reddit.frontpage"]
        );
    }
}
