// src/strategies/traits.rs
use std::collections::BTreeSet;

use rust_decimal::Decimal;

use crate::market::{MarketHistory, MarketState};
use crate::trade::AbstractTrade;
use crate::utils::simulate_trades;

/// A Fund uses a Strategy to propose trades, which its adapter then reifies
/// and executes. Strategies only ever see a cloned snapshot of the market
/// state; the only way they can affect the world is through the intents
/// they return.
pub trait Strategy: Send {
    fn fiat(&self) -> &str;

    /// Seconds between trading steps.
    fn trade_interval(&self) -> u64;

    /// Decide what to do at this step.
    fn propose_trades(
        &mut self,
        market_state: &MarketState,
        market_history: &dyn MarketHistory,
    ) -> Vec<AbstractTrade>;

    /// All coins the strategy might invest in, not including the fiat.
    fn possible_investments<'a>(&self, market_state: &'a MarketState) -> BTreeSet<&'a str> {
        let fiat = self.fiat();
        market_state
            .available_coins()
            .into_iter()
            .filter(|coin| *coin != fiat)
            .collect()
    }

    /// Propose trades that move every investable coin toward an equal fiat
    /// value, with the fiat itself counted as one more slot in the divisor.
    ///
    /// Fan-in first: all sells to fiat precede all buys from fiat, so that
    /// the buys are funded by the time they execute. Coins are visited in
    /// lexicographic order; the ordering is part of the contract, since
    /// backtest results must be reproducible.
    fn propose_trades_for_total_rebalancing(
        &self,
        market_state: &MarketState,
    ) -> Vec<AbstractTrade> {
        let fiat = self.fiat();
        let target_coins = self.possible_investments(market_state);
        if target_coins.is_empty() {
            return Vec::new();
        }

        let total_value = market_state.estimate_total_value(market_state.balances(), fiat);
        let ideal_value_per_coin = total_value / Decimal::from(target_coins.len() + 1);
        let est_values = market_state.estimate_values(market_state.balances(), fiat);

        let mut to_fiat = Vec::new();
        let mut from_fiat = Vec::new();
        for coin in target_coins {
            // A coin we cannot price counts as worthless here.
            let value = est_values.get(coin).copied().unwrap_or(Decimal::ZERO);
            let delta = value - ideal_value_per_coin;
            if delta > Decimal::ZERO {
                to_fiat.push(AbstractTrade::new(coin, fiat, fiat, delta));
            } else if delta < Decimal::ZERO {
                from_fiat.push(AbstractTrade::new(fiat, coin, fiat, -delta));
            }
        }

        to_fiat.extend(from_fiat);
        to_fiat
    }

    /// Rebalance only `coins_to_rebalance`: sell each one's excess over the
    /// ideal value to fiat, then spread whatever fiat that frees up (beyond
    /// fiat's own ideal slot) across the coins still under ideal — each buy
    /// capped by the coin's actual shortfall so no allocation overshoots.
    fn propose_trades_for_partial_rebalancing(
        &self,
        market_state: &MarketState,
        coins_to_rebalance: &[&str],
    ) -> Vec<AbstractTrade> {
        let fiat = self.fiat();
        if coins_to_rebalance.is_empty() {
            return Vec::new();
        }

        let possible_investments = self.possible_investments(market_state);
        if possible_investments.is_empty() {
            return Vec::new();
        }

        let total_value = market_state.estimate_total_value(market_state.balances(), fiat);
        let ideal_value_per_coin = total_value / Decimal::from(possible_investments.len() + 1);
        let est_values = market_state.estimate_values(market_state.balances(), fiat);

        let subset: BTreeSet<&str> = coins_to_rebalance
            .iter()
            .copied()
            .filter(|coin| *coin != fiat)
            .collect();

        let mut to_fiat = Vec::new();
        for coin in &subset {
            let value = est_values.get(*coin).copied().unwrap_or(Decimal::ZERO);
            let excess = value - ideal_value_per_coin;
            if excess > Decimal::ZERO {
                to_fiat.push(AbstractTrade::new(*coin, fiat, fiat, excess));
            }
        }

        // Plan the fan-out against the balances we would hold after the
        // fan-in, not the ones we hold now.
        let simulated = simulate_trades(&to_fiat, market_state);
        let simulated_fiat = simulated.get(fiat).copied().unwrap_or(Decimal::ZERO);
        let to_redistribute = simulated_fiat - ideal_value_per_coin;
        if to_redistribute <= Decimal::ZERO {
            return to_fiat;
        }

        let simulated_values = market_state.estimate_values(&simulated, fiat);
        let under_ideal: Vec<(&str, Decimal)> = possible_investments
            .into_iter()
            .filter_map(|coin| {
                let value = simulated_values.get(coin).copied().unwrap_or(Decimal::ZERO);
                let shortfall = ideal_value_per_coin - value;
                (shortfall > Decimal::ZERO).then_some((coin, shortfall))
            })
            .collect();
        if under_ideal.is_empty() {
            return to_fiat;
        }

        let share = to_redistribute / Decimal::from(under_ideal.len());
        let mut trades = to_fiat;
        for (coin, shortfall) in under_ideal {
            let amount = share.min(shortfall);
            if amount > Decimal::ZERO {
                trades.push(AbstractTrade::new(fiat, coin, fiat, amount));
            }
        }
        trades
    }
}
