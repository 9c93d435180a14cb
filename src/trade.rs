// src/trade.rs
use std::fmt;

use rust_decimal::Decimal;

/// A trade intent, prior to being bound to a market and price: trade enough
/// `sell_coin` for `buy_coin` that `reference_value` units of
/// `reference_coin` change hands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbstractTrade {
    sell_coin: String,
    buy_coin: String,
    reference_coin: String,
    reference_value: Decimal,
}

impl AbstractTrade {
    pub fn new(
        sell_coin: impl Into<String>,
        buy_coin: impl Into<String>,
        reference_coin: impl Into<String>,
        reference_value: Decimal,
    ) -> Self {
        Self {
            sell_coin: sell_coin.into(),
            buy_coin: buy_coin.into(),
            reference_coin: reference_coin.into(),
            reference_value: reference_value.max(Decimal::ZERO),
        }
    }

    pub fn sell_coin(&self) -> &str {
        &self.sell_coin
    }

    pub fn buy_coin(&self) -> &str {
        &self.buy_coin
    }

    pub fn reference_coin(&self) -> &str {
        &self.reference_coin
    }

    pub fn reference_value(&self) -> Decimal {
        self.reference_value
    }
}

impl fmt::Display for AbstractTrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {} ({} {})",
            self.sell_coin, self.buy_coin, self.reference_value, self.reference_coin
        )
    }
}
