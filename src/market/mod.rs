// src/market/mod.rs
pub mod history;
pub mod state;

use std::fmt;

use rust_decimal::Decimal;

use crate::errors::BadMarketSymbol;
use crate::types::{OrderKind, Side};

pub use history::{FileMarketHistory, MarketHistory};
pub use state::MarketState;

pub fn format_currency_pair(base: &str, quote: &str) -> String {
    format!("{base}_{quote}")
}

/// Split "BASE_QUOTE" into its two coin symbols. Base is listed first,
/// quote second; price is always base-per-quote.
pub fn split_currency_pair(market: &str) -> Result<(&str, &str), BadMarketSymbol> {
    let mut parts = market.split('_');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(base), Some(quote), None) if !base.is_empty() && !quote.is_empty() => {
            Ok((base, quote))
        }
        _ => Err(BadMarketSymbol(market.to_string())),
    }
}

/// A concrete, market-bound order. Built by reification, consumed exactly
/// once by an adapter, then discarded.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    market: String,
    price: Decimal,
    amount: Decimal,
    side: Side,
    kind: OrderKind,
    base_currency: String,
    quote_currency: String,
}

impl Order {
    pub fn new(
        market: impl Into<String>,
        price: Decimal,
        amount: Decimal,
        side: Side,
        kind: OrderKind,
    ) -> Result<Self, BadMarketSymbol> {
        let market = market.into();
        let (base, quote) = split_currency_pair(&market)?;
        let (base_currency, quote_currency) = (base.to_string(), quote.to_string());
        Ok(Self {
            market,
            price,
            amount,
            side,
            kind,
            base_currency,
            quote_currency,
        })
    }

    pub fn market(&self) -> &str {
        &self.market
    }

    /// Price of the quote currency, in base currency per unit.
    pub fn price(&self) -> Decimal {
        self.price
    }

    /// Quantity of the quote currency being bought or sold.
    pub fn amount(&self) -> Decimal {
        self.amount
    }

    /// Buy = acquire quote currency with base currency; Sell = the mirror.
    pub fn side(&self) -> Side {
        self.side
    }

    pub fn kind(&self) -> OrderKind {
        self.kind
    }

    pub fn base_currency(&self) -> &str {
        &self.base_currency
    }

    pub fn quote_currency(&self) -> &str {
        &self.quote_currency
    }

    pub fn base_amount(&self) -> Decimal {
        self.price * self.amount
    }

    pub fn quote_amount(&self) -> Decimal {
        self.amount
    }

    /// Same order at a different price. Used by the retry machine.
    pub fn with_price(&self, price: Decimal) -> Self {
        let mut order = self.clone();
        order.price = price;
        order
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}@{}",
            self.side, self.kind, self.market, self.amount, self.price
        )
    }
}
