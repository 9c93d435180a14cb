// src/config.rs

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use config::{Config, ConfigError, File};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::connectors::{DEFAULT_ORDER_ATTEMPTS, MINIMUM_ORDER_AMOUNT, ORDER_ADJUSTMENT};

#[derive(Debug, Deserialize, Clone)]
pub struct TradingConfig {
    pub fiat: String,
    #[serde(default = "default_bridge_coin")]
    pub bridge_coin: String,
    /// Seconds between trading steps.
    pub interval_secs: u64,
    pub strategy: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExchangeConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub secret_key: String,
    pub base_url: String,
    #[serde(default = "default_minimum_order_amount")]
    pub minimum_order_amount: Decimal,
    #[serde(default = "default_order_adjustment")]
    pub order_adjustment: Decimal,
    #[serde(default = "default_order_attempts")]
    pub order_attempts: u32,
    #[serde(default)]
    pub price_tick: Decimal,
    #[serde(default)]
    pub quantity_step: Decimal,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BacktestConfig {
    /// JSON chart store the backtest replays.
    pub chart_file: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub initial_balances: HashMap<String, Decimal>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub trading: TradingConfig,
    pub exchange: ExchangeConfig,
    pub backtest: BacktestConfig,
}

impl AppConfig {
    pub fn new() -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(File::with_name("Settings"))
            .add_source(config::Environment::with_prefix("APP").separator("__"));

        let config = builder.build()?;
        config.try_deserialize()
    }
}

fn default_bridge_coin() -> String {
    "BTC".to_string()
}

fn default_minimum_order_amount() -> Decimal {
    MINIMUM_ORDER_AMOUNT
}

fn default_order_adjustment() -> Decimal {
    ORDER_ADJUSTMENT
}

fn default_order_attempts() -> u32 {
    DEFAULT_ORDER_ATTEMPTS
}
