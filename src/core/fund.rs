// src/core/fund.rs
use anyhow::{ensure, Result};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use tokio::time::Instant;
use tracing::{debug, error, info};

use crate::connectors::MarketAdapter;
use crate::errors::ExchangeError;
use crate::strategies::Strategy;

fn is_transient(error: &anyhow::Error) -> bool {
    error
        .downcast_ref::<ExchangeError>()
        .is_some_and(ExchangeError::is_transient)
}

/// The highest-level abstraction: a strategy proposing trades and an
/// adapter executing them, stepped over live or replayed time.
pub struct Fund<S, A> {
    strategy: S,
    adapter: A,
    bridge_coin: String,
}

impl<S: Strategy, A: MarketAdapter> Fund<S, A> {
    pub fn new(strategy: S, adapter: A) -> Self {
        Self {
            strategy,
            adapter,
            bridge_coin: "BTC".to_string(),
        }
    }

    /// Coin the USD valuation is bridged through (the `USD_{coin}` market).
    pub fn with_bridge_coin(mut self, bridge_coin: impl Into<String>) -> Self {
        self.bridge_coin = bridge_coin.into();
        self
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    /// Run one full trading cycle at `time` and report the fund's USD value
    /// afterwards.
    ///
    /// The strategy receives its own clone of the market state, so the
    /// adapter's view of balances stays private to the adapter; the only
    /// channel from strategy to adapter is the returned trade intents.
    pub async fn step(&mut self, time: DateTime<Utc>, force_rebalance: bool) -> Result<Decimal> {
        self.adapter.update_market_state(time).await?;
        let snapshot = self.adapter.market_state().clone();

        let trades = if force_rebalance {
            self.strategy.propose_trades_for_total_rebalancing(&snapshot)
        } else {
            self.strategy
                .propose_trades(&snapshot, self.adapter.history())
        };

        if !trades.is_empty() {
            let filled = self.adapter.filter_and_execute(&trades).await;
            debug!("{} orders filled for {} proposed trades", filled.len(), trades.len());
        }

        self.adapter.update_market_state(time).await?;
        let state = self.adapter.market_state();
        let usd_value = state.estimate_total_value_usd(state.balances(), &self.bridge_coin)?;
        Ok(usd_value)
    }

    /// Reset the fund to a value-balanced state: equal fiat value in every
    /// coin available to us, whatever the strategy would have done.
    pub async fn rebalance(&mut self) -> Result<Decimal> {
        info!("resetting fund to a value-balanced state");
        self.step(Utc::now(), true).await
    }

    /// Replay the fund over `[start, end]`, one step per trade interval.
    /// Returns the USD value after each step.
    pub async fn run_backtest(
        &mut self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Decimal>> {
        let interval = self.strategy.trade_interval();
        ensure!(interval > 0, "trade interval must be positive");
        let period = Duration::seconds(interval as i64);

        let mut values = Vec::new();
        let mut time = start;
        while time <= end {
            values.push(self.step(time, false).await?);
            time += period;
        }
        Ok(values)
    }

    /// Trade on a fixed cadence until the process is stopped. A failed step
    /// (e.g. the exchange is down) is logged and the fund simply waits for
    /// the next cycle.
    pub async fn run_live(&mut self) -> Result<()> {
        let period = self.strategy.trade_interval();
        ensure!(period > 0, "trade interval must be positive");
        info!("live trading with {period} seconds between steps");

        loop {
            let step_start = Instant::now();
            let now = Utc::now();

            info!("stepping fund at {now}");
            match self.step(now, false).await {
                Ok(usd_value) => info!("est. USD value: {usd_value}"),
                Err(e) if is_transient(&e) => {
                    error!("exchange unavailable, waiting for next cycle: {e:#}");
                }
                Err(e) => return Err(e),
            }

            // Sleep out the rest of the period; a step that overran its
            // period shifts the schedule rather than piling up.
            let step_secs = step_start.elapsed().as_secs_f64();
            let sleep_secs = (period as f64 - step_secs).rem_euclid(period as f64);
            debug!("step took {step_secs:.2}s; sleeping {sleep_secs:.2}s");
            tokio::time::sleep(std::time::Duration::from_secs_f64(sleep_secs)).await;
        }
    }
}
