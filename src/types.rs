// src/types.rs
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Coin symbol -> quantity held. Owned by the executing adapter; strategies
/// only ever see a cloned snapshot.
pub type Balances = HashMap<String, Decimal>;

/// Market symbol ("BASE_QUOTE") -> latest chart fields.
pub type ChartData = HashMap<String, ChartEntry>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// Execution constraint attached to an order when it is submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderKind {
    FillOrKill,
    ImmediateOrCancel,
    PostOnly,
}

impl fmt::Display for OrderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderKind::FillOrKill => write!(f, "fillOrKill"),
            OrderKind::ImmediateOrCancel => write!(f, "immediateOrCancel"),
            OrderKind::PostOnly => write!(f, "postOnly"),
        }
    }
}

/// One price snapshot for a market. Feeds that omit volume get zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChartEntry {
    #[serde(alias = "weightedAverage")]
    pub weighted_average: Decimal,
    #[serde(default)]
    pub volume: Decimal,
}

impl ChartEntry {
    pub fn new(weighted_average: Decimal) -> Self {
        Self {
            weighted_average,
            volume: Decimal::ZERO,
        }
    }
}

/// What the exchange hands back for a filled order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderReceipt {
    pub order_id: u64,
    pub fills: Vec<Fill>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fill {
    pub price: Decimal,
    pub amount: Decimal,
}
