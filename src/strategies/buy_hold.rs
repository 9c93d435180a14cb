// src/strategies/buy_hold.rs
use crate::market::{MarketHistory, MarketState};
use crate::strategies::Strategy;
use crate::trade::AbstractTrade;

/// Spread the initial fiat across everything once, then sit on it.
pub struct BuyHoldStrategy {
    fiat: String,
    trade_interval: u64,
}

impl BuyHoldStrategy {
    pub fn new(fiat: impl Into<String>, trade_interval: u64) -> Self {
        Self {
            fiat: fiat.into(),
            trade_interval,
        }
    }
}

impl Strategy for BuyHoldStrategy {
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
        if market_state.only_holding(&self.fiat) {
            return self.propose_trades_for_total_rebalancing(market_state);
        }
        Vec::new()
    }
}
