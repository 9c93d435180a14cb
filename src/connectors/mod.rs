// src/connectors/mod.rs
pub mod backtest;
pub mod exchange;
pub mod live;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::{NoMarketAvailableError, OrderValidationError};
use crate::market::{format_currency_pair, MarketHistory, MarketState, Order};
use crate::trade::AbstractTrade;
use crate::types::{Balances, OrderKind, Side};

pub use backtest::BacktestAdapter;
pub use exchange::{ExchangeApi, RestExchange};
pub use live::LiveAdapter;

/// Smallest order amount the exchange accepts, in quote currency.
pub const MINIMUM_ORDER_AMOUNT: Decimal = dec!(0.0001);

/// How far an unfillable order's price is nudged per retry.
pub const ORDER_ADJUSTMENT: Decimal = dec!(0.001);

/// Submission attempts per order before giving up on it.
pub const DEFAULT_ORDER_ATTEMPTS: u32 = 8;

/// Turn one trade intent into the concrete orders that accomplish it,
/// bound to a market, a price, and a direction.
///
/// The market is looked for under `{sell}_{buy}` and then `{buy}_{sell}`
/// among the fiat-reachable markets; the intent's reference value is
/// converted into the market's quote currency to size the order.
pub fn reify_trade(
    trade: &AbstractTrade,
    market_state: &MarketState,
) -> Result<Vec<Order>, NoMarketAvailableError> {
    let markets = market_state.available_markets();

    let direct = format_currency_pair(trade.sell_coin(), trade.buy_coin());
    let inverted = format_currency_pair(trade.buy_coin(), trade.sell_coin());
    let market = if markets.contains(direct.as_str()) {
        direct
    } else if markets.contains(inverted.as_str()) {
        inverted
    } else {
        return Err(NoMarketAvailableError(format!(
            "{} to {} (indirect trades are not supported)",
            trade.sell_coin(),
            trade.buy_coin()
        )));
    };

    // Price is base per quote; order amounts are in quote currency.
    let price = market_state.price(&market)?;
    let (base, quote) = crate::market::split_currency_pair(&market)
        .map_err(|e| NoMarketAvailableError(e.to_string()))?;

    let quote_amount = market_state
        .estimate_value(trade.reference_coin(), trade.reference_value(), quote)
        .ok_or_else(|| {
            NoMarketAvailableError(format!("{} to {}", trade.reference_coin(), quote))
        })?;

    let side = if trade.sell_coin() == base {
        // Selling the base currency buys the quote currency.
        Side::Buy
    } else if trade.sell_coin() == quote {
        Side::Sell
    } else {
        unreachable!("trade [{trade}] matches neither side of market {market}");
    };

    let order = Order::new(market, price, quote_amount, side, OrderKind::FillOrKill)
        .map_err(|e| NoMarketAvailableError(e.to_string()))?;
    Ok(vec![order])
}

/// Reify a batch of intents, skipping the ones no market can satisfy so a
/// single delisted coin never blocks the rest of the step.
pub fn reify_trades(trades: &[AbstractTrade], market_state: &MarketState) -> Vec<Order> {
    let mut orders = Vec::new();
    for trade in trades {
        match reify_trade(trade, market_state) {
            Ok(mut reified) => orders.append(&mut reified),
            Err(e) => warn!("cannot reify trade [{trade}]: {e}"),
        }
    }
    orders
}

/// Check an order against the exchange's minimum size and our balances.
/// Missing balance entries count as zero.
pub fn validate_order(
    order: &Order,
    balances: &Balances,
    minimum_amount: Decimal,
) -> Result<(), OrderValidationError> {
    if order.amount() < minimum_amount {
        return Err(OrderValidationError::TooSmall {
            order: order.to_string(),
            minimum: minimum_amount,
        });
    }

    let (currency, required) = match order.side() {
        // Buying the quote currency spends the base currency.
        Side::Buy => (order.base_currency(), order.base_amount()),
        Side::Sell => (order.quote_currency(), order.quote_amount()),
    };
    let held = balances.get(currency).copied().unwrap_or(Decimal::ZERO);
    if required > held {
        return Err(OrderValidationError::InsufficientBalance {
            order: order.to_string(),
            required,
            currency: currency.to_string(),
            held,
        });
    }

    Ok(())
}

/// The execution seam between a fund and whatever fills its orders: a real
/// exchange or a simulated ledger. The adapter owns the balances; nothing
/// else ever mutates them.
#[async_trait]
pub trait MarketAdapter: Send {
    fn fiat(&self) -> &str;

    fn history(&self) -> &dyn MarketHistory;

    /// The snapshot built by the last `update_market_state`.
    fn market_state(&self) -> &MarketState;

    /// Rebuild the snapshot from the latest charts at `time` and current
    /// balances.
    async fn update_market_state(&mut self, time: DateTime<Utc>) -> anyhow::Result<()>;

    async fn get_balances(&self) -> anyhow::Result<Balances>;

    /// Execute one order, spending at most `attempts` submissions. `None`
    /// means the order was abandoned; that is reported, not fatal.
    async fn execute_order(&mut self, order: &Order, attempts: u32) -> Option<u64>;

    fn order_attempts(&self) -> u32 {
        DEFAULT_ORDER_ATTEMPTS
    }

    /// Reify a batch of intents and execute the resulting orders strictly
    /// in sequence, so each order sees the balance effects of the ones
    /// before it. Returns the ids of the orders that filled.
    async fn filter_and_execute(&mut self, trades: &[AbstractTrade]) -> Vec<u64> {
        let batch = Uuid::new_v4();
        let attempts = self.order_attempts();
        let orders = reify_trades(trades, self.market_state());
        debug!(%batch, "executing {} orders for {} trades", orders.len(), trades.len());

        let mut order_ids = Vec::new();
        for order in orders {
            match self.execute_order(&order, attempts).await {
                Some(order_id) => {
                    info!(%batch, "✅ [{order}] filled as order {order_id}");
                    order_ids.push(order_id);
                }
                None => warn!(%batch, "[{order}] was not executed"),
            }
        }
        order_ids
    }
}
