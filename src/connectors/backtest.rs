// src/connectors/backtest.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::connectors::{validate_order, MarketAdapter, MINIMUM_ORDER_AMOUNT};
use crate::market::{MarketHistory, MarketState, Order};
use crate::types::{Balances, ChartData};
use crate::utils::simulate_order;

/// Adapter that fills every order exactly at its stated price against a
/// simulated ledger.
///
/// This idealizes live execution: no fees, no slippage, no partial fills,
/// and therefore no retry path. Given the same chart store and starting
/// balances, a backtest replays to identical results.
pub struct BacktestAdapter<H: MarketHistory> {
    fiat: String,
    history: H,
    balances: Balances,
    state: MarketState,
    next_order_id: u64,
}

impl<H: MarketHistory> BacktestAdapter<H> {
    pub fn new(fiat: impl Into<String>, history: H, initial_balances: Balances) -> Self {
        let fiat = fiat.into();
        let state = MarketState::new(
            ChartData::new(),
            initial_balances.clone(),
            DateTime::<Utc>::UNIX_EPOCH,
            fiat.clone(),
        );
        Self {
            fiat,
            history,
            balances: initial_balances,
            state,
            next_order_id: 1,
        }
    }
}

#[async_trait]
impl<H: MarketHistory> MarketAdapter for BacktestAdapter<H> {
    fn fiat(&self) -> &str {
        &self.fiat
    }

    fn history(&self) -> &dyn MarketHistory {
        &self.history
    }

    fn market_state(&self) -> &MarketState {
        &self.state
    }

    async fn update_market_state(&mut self, time: DateTime<Utc>) -> anyhow::Result<()> {
        let charts = self.history.latest(time)?;
        self.state = MarketState::new(charts, self.balances.clone(), time, self.fiat.clone());
        Ok(())
    }

    async fn get_balances(&self) -> anyhow::Result<Balances> {
        Ok(self.balances.clone())
    }

    async fn execute_order(&mut self, order: &Order, _attempts: u32) -> Option<u64> {
        if let Err(e) = validate_order(order, &self.balances, MINIMUM_ORDER_AMOUNT) {
            warn!("order failed validation: {e}");
            return None;
        }

        debug!("simulating [{order}]");
        self.balances = simulate_order(order, &self.balances);

        let order_id = self.next_order_id;
        self.next_order_id += 1;
        Some(order_id)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::market::FileMarketHistory;
    use crate::types::{OrderKind, Side};

    fn adapter() -> BacktestAdapter<FileMarketHistory> {
        BacktestAdapter::new(
            "BTC",
            FileMarketHistory::default(),
            Balances::from([("BTC".to_string(), dec!(1.0))]),
        )
    }

    #[tokio::test]
    async fn filled_orders_move_the_ledger() {
        let mut adapter = adapter();
        let buy = Order::new(
            "BTC_ETH",
            dec!(0.07423378),
            dec!(2),
            Side::Buy,
            OrderKind::FillOrKill,
        )
        .unwrap();

        let order_id = adapter.execute_order(&buy, 8).await;
        assert_eq!(order_id, Some(1));

        let balances = adapter.get_balances().await.unwrap();
        assert_eq!(balances["BTC"], dec!(0.85153244));
        assert_eq!(balances["ETH"], dec!(2));
    }

    #[tokio::test]
    async fn order_ids_are_sequential() {
        let mut adapter = adapter();
        let buy = Order::new(
            "BTC_ETH",
            dec!(0.1),
            dec!(1),
            Side::Buy,
            OrderKind::FillOrKill,
        )
        .unwrap();

        assert_eq!(adapter.execute_order(&buy, 8).await, Some(1));
        assert_eq!(adapter.execute_order(&buy, 8).await, Some(2));
    }

    #[tokio::test]
    async fn invalid_orders_leave_the_ledger_untouched() {
        let mut adapter = adapter();
        // Requires 2 BTC; we hold 1.
        let buy = Order::new(
            "BTC_ETH",
            dec!(1),
            dec!(2),
            Side::Buy,
            OrderKind::FillOrKill,
        )
        .unwrap();

        assert_eq!(adapter.execute_order(&buy, 8).await, None);
        let balances = adapter.get_balances().await.unwrap();
        assert_eq!(balances, Balances::from([("BTC".to_string(), dec!(1.0))]));
    }
}
