//! Shared utilities

/// Truncate a string to `max` characters, appending "..." if truncated.
/// Operates on Unicode char boundaries, not bytes.
pub fn truncate_chars(s: &str, max: usize) -> String {
    let mut chars = s.chars();
    let truncated: String = chars.by_ref().take(max).collect();
    if chars.next().is_some() {
        format!("{}...", truncated)
    } else {
        truncated
    }
}

/// One line for the user describing a failed turn
pub fn describe_error(error: &coinsult_agent::Error) -> String {
    if error.is_timeout() {
        format!("The request timed out ({error}). Please try again.")
    } else if error.is_config_error() {
        format!(
            "Configuration error: {error}. Set the provider credentials \
             (e.g. GIGACHAT_CREDENTIALS) or run `coinsult --init-config`."
        )
    } else if error.is_retryable() {
        format!("Error: {error}. This looks temporary, please try again.")
    } else {
        format!("Error: {error}")
    }
}
