//! Logging initialization.
//!
//! # Environment variables
//! - `LOG_FORMAT`: `json` (default) or `pretty`.
//! - `RUST_LOG`: log level filter, default `info`.

use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber. Call once, from `main`.
pub fn init_logging() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match log_format.as_str() {
        "pretty" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .pretty()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .json()
                .init();
        }
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_log_format_default_is_json() {
        let format = match std::env::var("LOG_FORMAT") {
            Ok(val) if val == "pretty" => "pretty",
            _ => "json",
        };
        assert!(format == "json" || format == "pretty");
    }

    #[test]
    fn test_env_filter_fallback() {
        use tracing_subscriber::EnvFilter;
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        assert!(!format!("{:?}", filter).is_empty());
    }
}
