// src/sanitize.rs
//
// Keeps secrets out of logs and control characters out of the console

use serde_json::Value;

/// Masks a secret for display, keeping only a short prefix
///
/// Secrets of eight characters or fewer are fully masked.
///
/// # Arguments
/// * `secret` - Token, API key or password to mask
///
/// # Returns
/// * `String` - Display-safe version of the secret
pub fn mask_secret(secret: &str) -> String {
    let visible: String = secret.chars().take(4).collect();
    if secret.chars().count() <= 8 {
        "****".to_string()
    } else {
        format!("{}****", visible)
    }
}

/// Sanitizes text received from the server before it is printed
///
/// Strips control characters (terminal escapes included) and surrounding whitespace.
pub fn sanitize_server_text(text: &str) -> String {
    text.trim().chars().filter(|c| !c.is_control()).collect()
}

/// Renders a server-provided `error` field as a single console line
///
/// String errors are shown as-is, anything else as compact JSON.
pub fn describe_server_error(error: Option<&Value>) -> String {
    match error {
        Some(Value::String(message)) => sanitize_server_text(message),
        Some(Value::Null) | None => "unknown error".to_string(),
        Some(other) => sanitize_server_text(&other.to_string()),
    }
}
