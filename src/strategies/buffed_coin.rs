// src/strategies/buffed_coin.rs
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::debug;

use crate::market::{MarketHistory, MarketState};
use crate::strategies::Strategy;
use crate::trade::AbstractTrade;
use crate::types::Balances;

/// How far above the median a holding's value may drift before it counts as
/// buffed and gets skimmed back to fiat.
const BUFF_FACTOR: Decimal = dec!(1.5);

/// Skim winners: while our holdings are incomplete, rebalance everything;
/// afterwards, sell down any coin whose value has run ahead of the pack.
pub struct BuffedCoinStrategy {
    fiat: String,
    trade_interval: u64,
}

impl BuffedCoinStrategy {
    pub fn new(fiat: impl Into<String>, trade_interval: u64) -> Self {
        Self {
            fiat: fiat.into(),
            trade_interval,
        }
    }

    pub(crate) fn median(values: &Balances) -> Decimal {
        let mut sorted: Vec<Decimal> = values.values().copied().collect();
        if sorted.is_empty() {
            return Decimal::ZERO;
        }
        sorted.sort_unstable();
        let mid = sorted.len() / 2;
        if sorted.len() % 2 == 1 {
            sorted[mid]
        } else {
            (sorted[mid - 1] + sorted[mid]) / dec!(2)
        }
    }

    fn is_buffed(&self, coin: &str, coin_values: &Balances) -> bool {
        let median = Self::median(coin_values);
        let value = coin_values.get(coin).copied().unwrap_or(Decimal::ZERO);
        value > median * BUFF_FACTOR
    }

    pub(crate) fn find_buffed_coins<'a>(&self, market_state: &'a MarketState) -> Vec<&'a str> {
        let est_values = market_state.estimate_values(market_state.balances(), &self.fiat);
        market_state
            .held_coins_with_chart_data()
            .into_iter()
            .filter(|coin| self.is_buffed(coin, &est_values))
            .collect()
    }
}

impl Strategy for BuffedCoinStrategy {
    fn fiat(&self) -> &str {
        &self.fiat
    }

    fn trade_interval(&self) -> u64 {
        self.trade_interval
    }

    fn propose_trades(
        &mut self,
        market_state: &MarketState,
        _market_history: &dyn MarketHistory,
    ) -> Vec<AbstractTrade> {
        // Coins we don't own yet mean the fund is mid-bootstrap.
        if !market_state.available_coins_not_held().is_empty() {
            return self.propose_trades_for_total_rebalancing(market_state);
        }

        let buffed_coins = self.find_buffed_coins(market_state);
        if !buffed_coins.is_empty() {
            debug!("buffed coins: {buffed_coins:?}");
            return self.propose_trades_for_partial_rebalancing(market_state, &buffed_coins);
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

    fn state(balances: Balances) -> MarketState {
        let chart_data = ChartData::from([
            ("BTC_ETH".to_string(), ChartEntry::new(dec!(0.1))),
            ("BTC_XRP".to_string(), ChartEntry::new(dec!(0.0002))),
        ]);
        MarketState::new(chart_data, balances, Utc::now(), "BTC")
    }

    #[test]
    fn median_of_odd_and_even_sets() {
        let odd = Balances::from([
            ("A".to_string(), dec!(1)),
            ("B".to_string(), dec!(5)),
            ("C".to_string(), dec!(2)),
        ]);
        assert_eq!(BuffedCoinStrategy::median(&odd), dec!(2));

        let even = Balances::from([
            ("A".to_string(), dec!(1)),
            ("B".to_string(), dec!(5)),
            ("C".to_string(), dec!(2)),
            ("D".to_string(), dec!(4)),
        ]);
        assert_eq!(BuffedCoinStrategy::median(&even), dec!(3));
    }

    #[test]
    fn finds_coins_well_above_the_median() {
        // Values: BTC 0.4, ETH 1.0, XRP 0.4; median 0.4, threshold 0.6.
        let state = state(Balances::from([
            ("BTC".to_string(), dec!(0.4)),
            ("ETH".to_string(), dec!(10)),
            ("XRP".to_string(), dec!(2000)),
        ]));
        let strategy = BuffedCoinStrategy::new("BTC", 86400);
        assert_eq!(strategy.find_buffed_coins(&state), vec!["ETH"]);
    }

    #[test]
    fn rebalances_totally_while_coins_are_unheld() {
        let mut strategy = BuffedCoinStrategy::new("BTC", 86400);
        let state = state(Balances::from([("BTC".to_string(), dec!(1))]));
        let trades = strategy.propose_trades(&state, &FileMarketHistory::default());
        // Both investable coins get bought in.
        assert_eq!(trades.len(), 2);
        assert!(trades.iter().all(|t| t.sell_coin() == "BTC"));
    }

    #[test]
    fn skims_a_buffed_coin_once_fully_invested() {
        let state = state(Balances::from([
            ("BTC".to_string(), dec!(0.4)),
            ("ETH".to_string(), dec!(10)),
            ("XRP".to_string(), dec!(2000)),
        ]));
        let mut strategy = BuffedCoinStrategy::new("BTC", 86400);
        let trades = strategy.propose_trades(&state, &FileMarketHistory::default());

        assert!(!trades.is_empty());
        assert_eq!(trades[0].sell_coin(), "ETH");
        assert_eq!(trades[0].buy_coin(), "BTC");
    }

    #[test]
    fn holds_when_nothing_is_buffed() {
        let state = state(Balances::from([
            ("BTC".to_string(), dec!(0.4)),
            ("ETH".to_string(), dec!(4)),
            ("XRP".to_string(), dec!(2000)),
        ]));
        let mut strategy = BuffedCoinStrategy::new("BTC", 86400);
        let trades = strategy.propose_trades(&state, &FileMarketHistory::default());
        assert!(trades.is_empty());
    }
}
