// src/utils/sim.rs
use rust_decimal::Decimal;
use tracing::warn;

use crate::market::{MarketState, Order};
use crate::trade::AbstractTrade;
use crate::types::{Balances, Side};

/// Apply an order's economic effect to a balance map, as an exact fill at
/// the order's price: a buy debits the base currency by `base_amount` and
/// credits the quote currency by `quote_amount`; a sell is the mirror.
///
/// This is an idealization of live execution. Real fills pay fees and
/// slippage, and may not happen at all; simulated fills are always exact.
pub fn simulate_order(order: &Order, balances: &Balances) -> Balances {
    let (base_delta, quote_delta) = match order.side() {
        Side::Buy => (-order.base_amount(), order.quote_amount()),
        Side::Sell => (order.base_amount(), -order.quote_amount()),
    };

    let mut new = balances.clone();
    *new.entry(order.base_currency().to_string())
        .or_insert(Decimal::ZERO) += base_delta;
    *new.entry(order.quote_currency().to_string())
        .or_insert(Decimal::ZERO) += quote_delta;
    new
}

/// Run a sequence of trade intents through the snapshot's prices, returning
/// the balances we would hold afterwards. Purely hypothetical: nothing is
/// executed and the snapshot is untouched. Intents the snapshot cannot
/// price are skipped with a warning.
pub fn simulate_trades(trades: &[AbstractTrade], market_state: &MarketState) -> Balances {
    let mut new = market_state.balances().clone();

    for trade in trades {
        let sell_amount = market_state.estimate_value(
            trade.reference_coin(),
            trade.reference_value(),
            trade.sell_coin(),
        );
        let buy_amount = sell_amount.and_then(|sell_amount| {
            market_state.estimate_value(trade.sell_coin(), sell_amount, trade.buy_coin())
        });

        let (Some(sell_amount), Some(buy_amount)) = (sell_amount, buy_amount) else {
            warn!("cannot price trade [{trade}]; skipping in simulation");
            continue;
        };

        *new.entry(trade.sell_coin().to_string())
            .or_insert(Decimal::ZERO) -= sell_amount;
        *new.entry(trade.buy_coin().to_string())
            .or_insert(Decimal::ZERO) += buy_amount;
    }

    new
}
