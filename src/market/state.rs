// src/market/state.rs
use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::warn;

use crate::errors::NoMarketAvailableError;
use crate::market::{format_currency_pair, split_currency_pair};
use crate::types::{Balances, ChartData};

/// Symbol of the dollar leg of the valuation bridge (`USD_{bridge}` market).
pub const USD: &str = "USD";

/// One snapshot of the market plus our holdings at a point in time.
///
/// Constructed fresh each step and never mutated afterwards; anything that
/// needs updated balances builds a new one.
#[derive(Debug, Clone)]
pub struct MarketState {
    chart_data: ChartData,
    balances: Balances,
    time: DateTime<Utc>,
    fiat: String,
}

impl MarketState {
    pub fn new(
        chart_data: ChartData,
        balances: Balances,
        time: DateTime<Utc>,
        fiat: impl Into<String>,
    ) -> Self {
        Self {
            chart_data,
            balances,
            time,
            fiat: fiat.into(),
        }
    }

    pub fn chart_data(&self) -> &ChartData {
        &self.chart_data
    }

    pub fn balances(&self) -> &Balances {
        &self.balances
    }

    pub fn time(&self) -> DateTime<Utc> {
        self.time
    }

    pub fn fiat(&self) -> &str {
        &self.fiat
    }

    /// Quantity of a coin held; missing entries count as zero.
    pub fn balance(&self, coin: &str) -> Decimal {
        self.balances.get(coin).copied().unwrap_or(Decimal::ZERO)
    }

    fn held_coins(&self) -> BTreeSet<&str> {
        self.balances
            .iter()
            .filter(|(_, balance)| **balance > Decimal::ZERO)
            .map(|(coin, _)| coin.as_str())
            .collect()
    }

    /// True if the only thing we are holding is `coin`.
    pub fn only_holding(&self, coin: &str) -> bool {
        let held = self.held_coins();
        held.len() == 1 && held.contains(coin)
    }

    /// Weighted-average price of a market, in base currency per unit of
    /// quote currency. An absent market means the asset was delisted or
    /// never charted, and that is an error here.
    pub fn price(&self, market: &str) -> Result<Decimal, NoMarketAvailableError> {
        self.chart_data
            .get(market)
            .map(|entry| entry.weighted_average)
            .ok_or_else(|| NoMarketAvailableError(market.to_string()))
    }

    /// All charted markets in which our fiat is the base currency.
    pub fn available_markets(&self) -> BTreeSet<&str> {
        self.chart_data
            .keys()
            .map(String::as_str)
            .filter(|market| {
                matches!(split_currency_pair(market), Ok((base, _)) if base == self.fiat)
            })
            .collect()
    }

    /// Every coin reachable through an available market, plus the fiat.
    pub fn available_coins(&self) -> BTreeSet<&str> {
        let mut coins: BTreeSet<&str> = self
            .available_markets()
            .into_iter()
            .filter_map(|market| split_currency_pair(market).ok())
            .map(|(_, quote)| quote)
            .collect();
        coins.insert(&self.fiat);
        coins
    }

    pub fn available_coins_not_held(&self) -> BTreeSet<&str> {
        let held = self.held_coins();
        self.available_coins()
            .into_iter()
            .filter(|coin| !held.contains(coin))
            .collect()
    }

    pub fn held_coins_with_chart_data(&self) -> BTreeSet<&str> {
        let available = self.available_coins();
        self.held_coins()
            .into_iter()
            .filter(|coin| available.contains(coin))
            .collect()
    }

    /// Estimate the value of `amount` of `coin` in terms of `reference_coin`,
    /// using the direct market if one exists and the inverted market
    /// otherwise. `None` when neither market is charted; valuation across
    /// multiple hops is not supported.
    pub fn estimate_value(
        &self,
        coin: &str,
        amount: Decimal,
        reference_coin: &str,
    ) -> Option<Decimal> {
        if coin == reference_coin {
            return Some(amount);
        }

        let market = format_currency_pair(reference_coin, coin);
        if let Some(entry) = self.chart_data.get(&market) {
            return Some(amount * entry.weighted_average);
        }

        let market = format_currency_pair(coin, reference_coin);
        if let Some(entry) = self.chart_data.get(&market) {
            if entry.weighted_average > Decimal::ZERO {
                return Some(amount / entry.weighted_average);
            }
        }

        warn!("couldn't find a market for {reference_coin}:{coin}; has it been delisted?");
        None
    }

    /// Per-coin values in terms of the reference coin. Coins with no
    /// resolvable value are omitted from the result; balances themselves
    /// are never dropped.
    pub fn estimate_values(&self, balances: &Balances, reference_coin: &str) -> Balances {
        balances
            .iter()
            .filter_map(|(coin, amount)| {
                self.estimate_value(coin, *amount, reference_coin)
                    .map(|value| (coin.clone(), value))
            })
            .collect()
    }

    pub fn estimate_total_value(&self, balances: &Balances, reference_coin: &str) -> Decimal {
        self.estimate_values(balances, reference_coin)
            .values()
            .sum()
    }

    /// Total value of the holdings in USD, bridged through `bridge_coin`
    /// (the `USD_{bridge}` market) and rounded to cents.
    pub fn estimate_total_value_usd(
        &self,
        balances: &Balances,
        bridge_coin: &str,
    ) -> Result<Decimal, NoMarketAvailableError> {
        let bridge_value = self.estimate_total_value(balances, bridge_coin);
        let usd_per_bridge = self.price(&format_currency_pair(USD, bridge_coin))?;
        Ok((bridge_value * usd_per_bridge).round_dp(2))
    }
}
