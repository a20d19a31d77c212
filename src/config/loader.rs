//! Reads `config.json` from disk, falling back to built-in defaults when the
//! file is missing or malformed (spec §6.3 CLI entry point).

use std::path::Path;

use tracing::warn;

use super::types::AppConfig;

/// Load config from `path`. A missing file is not an error — it is logged
/// and `AppConfig::default()` is returned. A present-but-invalid file (bad
/// JSON, or failing cross-field validation) IS an error, since that
/// indicates the operator made a mistake rather than simply not providing
/// a config.
pub fn load_config(path: &Path) -> anyhow::Result<AppConfig> {
    if !path.exists() {
        warn!(path = %path.display(), "config file not found, using built-in defaults");
        return Ok(AppConfig::default());
    }
    let raw = std::fs::read_to_string(path)?;
    load_config_from_str(&raw)
}

pub fn load_config_from_str(raw: &str) -> anyhow::Result<AppConfig> {
    let config: AppConfig = serde_json::from_str(raw)?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid config: {e}"))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = load_config(Path::new("/nonexistent/config.json")).unwrap();
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        let err = load_config_from_str("not json").unwrap_err();
        assert!(err.to_string().len() > 0);
    }

    #[test]
    fn test_invalid_config_fails_validation() {
        let err = load_config_from_str(r#"{"exchange": {"symbols": []}}"#).unwrap_err();
        assert!(err.to_string().contains("invalid config"));
    }

    #[test]
    fn test_loads_real_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"server": {"port": 9100}}"#).unwrap();
        let config = load_config(&path).unwrap();
        assert_eq!(config.server.port, 9100);
    }
}
