//! Shape of `config.json` and its built-in defaults (spec §6.3).
//!
//! Every field is `#[serde(default)]` so a config file only needs to spell
//! out what it wants to override; `loader` falls back to `AppConfig::default()`
//! wholesale when the file is missing.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::money::Symbol;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub exchange: ExchangeConfig,
    pub failures: FailureConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            exchange: ExchangeConfig::default(),
            failures: FailureConfig::default(),
        }
    }
}

impl AppConfig {
    /// Sanity-checks cross-field invariants a plain `#[serde(default)]`
    /// can't express, e.g. a pricing model's volatility can't be negative.
    pub fn validate(&self) -> Result<(), String> {
        if self.exchange.symbols.is_empty() {
            return Err("exchange.symbols must not be empty".into());
        }
        if self.exchange.tick_interval_ms == 0 {
            return Err("exchange.tick_interval_ms must be > 0".into());
        }
        if self.exchange.pricing_model.volatility < 0.0 {
            return Err("exchange.pricing_model.volatility must be >= 0".into());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingModelConfig {
    pub model_type: String,
    pub drift: f64,
    pub volatility: f64,
}

impl Default for PricingModelConfig {
    fn default() -> Self {
        Self {
            model_type: "gbm".to_string(),
            drift: 0.0,
            volatility: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeConfig {
    pub symbols: Vec<Symbol>,
    pub tick_interval_ms: u64,
    pub initial_prices: HashMap<String, Decimal>,
    pub pricing_model: PricingModelConfig,
    pub default_balance: HashMap<String, Decimal>,
    /// Spread applied around the mid price, in basis points (spec §4.3).
    pub spread_bps: u32,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        let mut initial_prices = HashMap::new();
        initial_prices.insert("BTC/USD".to_string(), Decimal::new(50_000, 0));
        let mut default_balance = HashMap::new();
        default_balance.insert("USD".to_string(), Decimal::new(100_000, 0));
        default_balance.insert("BTC".to_string(), Decimal::new(10, 0));
        Self {
            symbols: vec![Symbol::new("BTC", "USD")],
            tick_interval_ms: 1000,
            initial_prices,
            pricing_model: PricingModelConfig::default(),
            default_balance,
            spread_bps: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LatencyPreset {
    Stable,
    Typical,
}

impl Default for LatencyPreset {
    fn default() -> Self {
        LatencyPreset::Stable
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModeToggle {
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DropConfig {
    pub enabled: bool,
    pub probability: f64,
}

impl Default for DropConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            probability: 0.05,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DelayConfig {
    pub enabled: bool,
    pub min_ms: u64,
    pub max_ms: u64,
}

impl Default for DelayConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            min_ms: 50,
            max_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LatencyConfig {
    pub enabled: bool,
    pub mode: LatencyPreset,
}

impl Default for LatencyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            mode: LatencyPreset::Stable,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DuplicateConfig {
    pub enabled: bool,
    pub probability: f64,
}

impl Default for DuplicateConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            probability: 0.05,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReorderConfig {
    pub enabled: bool,
    pub buffer_size: usize,
    pub flush_after_ms: u64,
}

impl Default for ReorderConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            buffer_size: 5,
            flush_after_ms: 200,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorruptConfig {
    pub enabled: bool,
    pub probability: f64,
}

impl Default for CorruptConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            probability: 0.02,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThrottleConfig {
    pub enabled: bool,
    pub tokens_per_second: f64,
    pub burst: u32,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            tokens_per_second: 20.0,
            burst: 40,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub requests_per_second: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            requests_per_second: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SilentConnectionConfig {
    pub enabled: bool,
    pub after_messages: u64,
    /// Whether a fresh reconnect (new session id) resets the counter.
    /// See SPEC_FULL.md §9 for the Open Question this resolves.
    pub reset_on_reconnect: bool,
}

impl Default for SilentConnectionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            after_messages: 100,
            reset_on_reconnect: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FailureModes {
    pub drop_messages: DropConfig,
    pub delay_messages: DelayConfig,
    pub latency: LatencyConfig,
    pub duplicate: DuplicateConfig,
    pub reorder: ReorderConfig,
    pub corrupt: CorruptConfig,
    pub throttle: ThrottleConfig,
    pub rate_limit: RateLimitConfig,
    pub silent_connection: SilentConnectionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FailureConfig {
    pub enabled: bool,
    pub modes: FailureModes,
}

impl Default for FailureConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            modes: FailureModes::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let cfg = AppConfig::default();
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_default_has_one_btc_usd_symbol_and_failures_disabled() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.exchange.symbols, vec![Symbol::new("BTC", "USD")]);
        assert!(!cfg.failures.enabled);
    }

    #[test]
    fn test_validate_rejects_empty_symbols() {
        let mut cfg = AppConfig::default();
        cfg.exchange.symbols.clear();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_partial_json_fills_in_defaults() {
        let json = r#"{"server": {"port": 9000}}"#;
        let cfg: AppConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.server.port, 9000);
        assert_eq!(cfg.server.host, "0.0.0.0");
        assert!(!cfg.exchange.symbols.is_empty());
    }
}
