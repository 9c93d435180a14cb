// src/strategies/peak_rider.rs
use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;
use ta::indicators::PercentagePriceOscillator;
use ta::Next;
use tracing::{debug, warn};

use crate::market::state::USD;
use crate::market::{MarketHistory, MarketState};
use crate::strategies::{BuffedCoinStrategy, Strategy};
use crate::trade::AbstractTrade;
use crate::types::Balances;

const PPO_FAST: usize = 12;
const PPO_SLOW: usize = 26;
const PPO_SIGNAL: usize = 9;
const HISTORY_DAYS: i64 = 30;

/// Exponent softening the buff threshold as the median grows.
const POWER_OF: Decimal = dec!(1.2);

/// A stricter cousin of [`BuffedCoinStrategy`]: a winner is only skimmed
/// while its price is still riding above trend (positive PPO histogram),
/// so we don't sell into a dip.
pub struct PeakRiderStrategy {
    fiat: String,
    trade_interval: u64,
}

impl PeakRiderStrategy {
    pub fn new(fiat: impl Into<String>, trade_interval: u64) -> Self {
        Self {
            fiat: fiat.into(),
            trade_interval,
        }
    }

    fn is_buffed(&self, coin: &str, coin_values: &Balances) -> bool {
        let median = BuffedCoinStrategy::median(coin_values);
        let threshold = if median > Decimal::ONE {
            median.powd(POWER_OF)
        } else {
            median.powd(Decimal::ONE / POWER_OF)
        };
        let value = coin_values.get(coin).copied().unwrap_or(Decimal::ZERO);
        value > threshold
    }

    pub(crate) fn latest_ppo_histogram(prices: &[f64]) -> Option<f64> {
        if prices.is_empty() {
            return None;
        }
        let mut ppo = PercentagePriceOscillator::new(PPO_FAST, PPO_SLOW, PPO_SIGNAL).ok()?;
        let mut last = None;
        for price in prices {
            last = Some(ppo.next(*price));
        }
        last.map(|output| output.histogram)
    }

    fn is_riding_high(
        &self,
        coin: &str,
        market_state: &MarketState,
        market_history: &dyn MarketHistory,
    ) -> bool {
        let series = if coin == self.fiat {
            market_history.asset_history(market_state.time(), USD, &self.fiat, HISTORY_DAYS)
        } else {
            market_history.asset_history(market_state.time(), &self.fiat, coin, HISTORY_DAYS)
        };

        match series {
            Ok(prices) => {
                Self::latest_ppo_histogram(&prices).is_some_and(|histogram| histogram > 0.0)
            }
            Err(e) => {
                warn!("no price history for {coin}: {e}");
                false
            }
        }
    }
}

impl Strategy for PeakRiderStrategy {
    fn fiat(&self) -> &str {
        &self.fiat
    }

    fn trade_interval(&self) -> u64 {
        self.trade_interval
    }

    fn propose_trades(
        &mut self,
        market_state: &MarketState,
        market_history: &dyn MarketHistory,
    ) -> Vec<AbstractTrade> {
        if market_state.only_holding(&self.fiat) {
            return self.propose_trades_for_total_rebalancing(market_state);
        }

        let est_values = market_state.estimate_values(market_state.balances(), &self.fiat);
        let buffed_and_riding: Vec<&str> = market_state
            .held_coins_with_chart_data()
            .into_iter()
            .filter(|coin| self.is_buffed(coin, &est_values))
            .filter(|coin| self.is_riding_high(coin, market_state, market_history))
            .collect();

        if !buffed_and_riding.is_empty() {
            debug!("skimming peaked coins: {buffed_and_riding:?}");
            return self.propose_trades_for_partial_rebalancing(market_state, &buffed_and_riding);
        }

        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::market::FileMarketHistory;
    use crate::types::{ChartData, ChartEntry};

    #[test]
    fn ppo_histogram_is_positive_while_price_accelerates() {
        let rising: Vec<f64> = (0..40).map(|i| 100.0 * 1.05f64.powi(i)).collect();
        let histogram = PeakRiderStrategy::latest_ppo_histogram(&rising).unwrap();
        assert!(histogram > 0.0, "histogram was {histogram}");
    }

    #[test]
    fn ppo_histogram_is_negative_while_price_decays() {
        let falling: Vec<f64> = (0..40).map(|i| 100.0 * 0.95f64.powi(i)).collect();
        let histogram = PeakRiderStrategy::latest_ppo_histogram(&falling).unwrap();
        assert!(histogram < 0.0, "histogram was {histogram}");
    }

    #[test]
    fn ppo_histogram_of_empty_series_is_none() {
        assert_eq!(PeakRiderStrategy::latest_ppo_histogram(&[]), None);
    }

    #[test]
    fn flat_history_means_no_skimming() {
        // ETH is buffed, but its price shows no momentum, so we hold.
        let chart_data = ChartData::from([
            ("BTC_ETH".to_string(), ChartEntry::new(dec!(0.1))),
            ("BTC_XRP".to_string(), ChartEntry::new(dec!(0.0002))),
        ]);
        let balances = Balances::from([
            ("BTC".to_string(), dec!(0.1)),
            ("ETH".to_string(), dec!(50)),
            ("XRP".to_string(), dec!(500)),
        ]);
        let state = MarketState::new(chart_data, balances, Utc::now(), "BTC");

        let mut strategy = PeakRiderStrategy::new("BTC", 86400);
        let trades = strategy.propose_trades(&state, &FileMarketHistory::default());
        assert!(trades.is_empty());
    }

    #[test]
    fn bootstraps_from_fiat_only() {
        let chart_data = ChartData::from([
            ("BTC_ETH".to_string(), ChartEntry::new(dec!(0.1))),
            ("BTC_XRP".to_string(), ChartEntry::new(dec!(0.0002))),
        ]);
        let balances = Balances::from([("BTC".to_string(), dec!(1))]);
        let state = MarketState::new(chart_data, balances, Utc::now(), "BTC");

        let mut strategy = PeakRiderStrategy::new("BTC", 86400);
        let trades = strategy.propose_trades(&state, &FileMarketHistory::default());
        assert_eq!(trades.len(), 2);
    }
}
