// src/connectors/live.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{debug, error, warn};

use crate::connectors::{
    validate_order, ExchangeApi, MarketAdapter, DEFAULT_ORDER_ATTEMPTS, MINIMUM_ORDER_AMOUNT,
    ORDER_ADJUSTMENT,
};
use crate::errors::ExchangeError;
use crate::market::{MarketHistory, MarketState, Order};
use crate::types::{Balances, ChartData, Side};
use crate::utils::precision::{normalize_price, normalize_quantity};

/// Adapter that places real orders through an [`ExchangeApi`].
///
/// Orders go out fill-or-kill. A killed order is retried at a slightly
/// better price for the counterparty (higher for buys, lower for sells)
/// until it fills or the attempt budget runs out.
pub struct LiveAdapter<H: MarketHistory, C: ExchangeApi> {
    fiat: String,
    history: H,
    client: C,
    state: MarketState,
    minimum_order_amount: Decimal,
    order_adjustment: Decimal,
    order_attempts: u32,
    price_tick: Decimal,
    quantity_step: Decimal,
}

impl<H: MarketHistory, C: ExchangeApi> LiveAdapter<H, C> {
    pub fn new(fiat: impl Into<String>, history: H, client: C) -> Self {
        let fiat = fiat.into();
        let state = MarketState::new(
            ChartData::new(),
            Balances::new(),
            DateTime::<Utc>::UNIX_EPOCH,
            fiat.clone(),
        );
        Self {
            fiat,
            history,
            client,
            state,
            minimum_order_amount: MINIMUM_ORDER_AMOUNT,
            order_adjustment: ORDER_ADJUSTMENT,
            order_attempts: DEFAULT_ORDER_ATTEMPTS,
            price_tick: Decimal::ZERO,
            quantity_step: Decimal::ZERO,
        }
    }

    /// Override the exchange's order constraints. Zero tick/step sizes
    /// leave prices and quantities untouched.
    pub fn with_order_rules(
        mut self,
        minimum_order_amount: Decimal,
        order_adjustment: Decimal,
        order_attempts: u32,
        price_tick: Decimal,
        quantity_step: Decimal,
    ) -> Self {
        self.minimum_order_amount = minimum_order_amount;
        self.order_adjustment = order_adjustment;
        self.order_attempts = order_attempts;
        self.price_tick = price_tick;
        self.quantity_step = quantity_step;
        self
    }
}

#[async_trait]
impl<H: MarketHistory, C: ExchangeApi> MarketAdapter for LiveAdapter<H, C> {
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
        let balances = self.get_balances().await?;
        self.state = MarketState::new(charts, balances, time, self.fiat.clone());
        Ok(())
    }

    async fn get_balances(&self) -> anyhow::Result<Balances> {
        let balances = self.client.balances().await?;
        Ok(balances
            .into_iter()
            .filter(|(_, amount)| *amount > Decimal::ZERO)
            .collect())
    }

    fn order_attempts(&self) -> u32 {
        self.order_attempts
    }

    async fn execute_order(&mut self, order: &Order, attempts: u32) -> Option<u64> {
        let amount = normalize_quantity(order.amount(), self.quantity_step);
        let mut price = normalize_price(order.price(), self.price_tick);
        let mut attempts_left = attempts;

        loop {
            if attempts_left == 0 {
                warn!("attempts exhausted; not executing order [{order}]");
                return None;
            }

            let attempt = match Order::new(
                order.market(),
                price,
                amount,
                order.side(),
                order.kind(),
            ) {
                Ok(attempt) => attempt,
                Err(e) => {
                    error!("malformed order [{order}]: {e}");
                    return None;
                }
            };

            // Re-check against fresh balances every attempt; an invalid
            // order will not become valid at a nudged price.
            let balances = match self.get_balances().await {
                Ok(balances) => balances,
                Err(e) => {
                    error!("could not fetch balances: {e:#}");
                    return None;
                }
            };
            if let Err(e) = validate_order(&attempt, &balances, self.minimum_order_amount) {
                warn!("order failed validation: {e}");
                return None;
            }

            match self
                .client
                .submit(
                    attempt.side(),
                    attempt.market(),
                    attempt.price(),
                    attempt.amount(),
                    attempt.kind(),
                )
                .await
            {
                Ok(receipt) => {
                    for fill in &receipt.fills {
                        debug!(
                            "fill for order {}: {} @ {}",
                            receipt.order_id, fill.amount, fill.price
                        );
                    }
                    return Some(receipt.order_id);
                }
                Err(ExchangeError::CouldNotFill) => {
                    price = match attempt.side() {
                        // We tried to buy low; pay up a little.
                        Side::Buy => price + self.order_adjustment,
                        // We tried to sell high; give a little.
                        Side::Sell => price - self.order_adjustment,
                    };
                    attempts_left -= 1;
                    debug!("[{attempt}] killed; retrying at {price}");
                }
                Err(e) => {
                    error!("order [{attempt}] failed: {e}");
                    return None;
                }
            }
        }
    }
}
