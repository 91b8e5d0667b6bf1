pub use masterror::{AppError, AppResult};

/// Maximum number of characters of a backend message carried into errors
pub const BACKEND_MESSAGE_LIMIT: usize = 300;

/// Create file read error
pub fn file_read_error(path: &str, source: std::io::Error) -> AppError {
    AppError::internal(format!("Failed to read file '{}': {}", path, source))
}

/// Create config error
pub fn config_error(message: impl Into<String>) -> AppError {
    AppError::bad_request(message.into())
}

/// Create allowlist file parse error
pub fn allowlist_parse_error(path: &str, message: impl Into<String>) -> AppError {
    AppError::bad_request(format!(
        "Invalid allowlist file '{}':\n  {}",
        path,
        message.into()
    ))
}

/// Create schema introspection error
pub fn schema_load_error(message: impl Into<String>) -> AppError {
    AppError::service(format!("Schema introspection failed: {}", message.into()))
}

/// Create HTTP error
pub fn http_error(err: reqwest::Error) -> AppError {
    AppError::service(describe_transport_error(&err))
}

/// Describe a transport failure without the request body
pub fn describe_transport_error(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        format!("Request timeout: {}", err)
    } else if err.is_connect() {
        format!("Connection failed: {}", err)
    } else if err.is_status() {
        format!("HTTP error {}: {}", err.status().unwrap_or_default(), err)
    } else {
        err.to_string()
    }
}

/// Trim and cut a backend message to [`BACKEND_MESSAGE_LIMIT`] characters
pub fn truncate_message(message: &str) -> String {
    let trimmed = message.trim();
    match trimmed.char_indices().nth(BACKEND_MESSAGE_LIMIT) {
        Some((idx, _)) => trimmed[..idx].to_string(),
        None => trimmed.to_string()
    }
}
