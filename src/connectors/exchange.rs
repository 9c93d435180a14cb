// src/connectors/exchange.rs
use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use sha2::Sha512;
use tracing::info;

use crate::errors::ExchangeError;
use crate::types::{Balances, Fill, OrderKind, OrderReceipt, Side};

type HmacSha512 = Hmac<Sha512>;

/// The exchange answers a kill with this string when our price is off.
const COULD_NOT_FILL: &str = "Unable to fill order completely.";

/// The one call surface the live adapter needs from an exchange: holdings
/// and order placement. Everything else (authentication, transport, rate
/// limits) stays behind the implementation.
#[async_trait]
pub trait ExchangeApi: Send + Sync {
    async fn balances(&self) -> Result<Balances, ExchangeError>;

    async fn submit(
        &self,
        side: Side,
        market: &str,
        price: Decimal,
        amount: Decimal,
        kind: OrderKind,
    ) -> Result<OrderReceipt, ExchangeError>;
}

/// Signed REST client for the exchange's private trading API.
pub struct RestExchange {
    api_key: String,
    secret_key: String,
    http_client: Client,
    base_url: String,
}

impl RestExchange {
    pub fn new(api_key: String, secret_key: String, base_url: String) -> Self {
        Self {
            api_key,
            secret_key,
            http_client: Client::new(),
            base_url,
        }
    }

    fn sign(&self, body: &str) -> Result<String, ExchangeError> {
        let mut mac = HmacSha512::new_from_slice(self.secret_key.as_bytes())
            .map_err(|_| ExchangeError::Api("invalid secret key length".to_string()))?;
        mac.update(body.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    async fn send_signed_request<T: DeserializeOwned>(
        &self,
        params: Vec<(&str, String)>,
    ) -> Result<T, ExchangeError> {
        let mut params = params;
        let nonce = Utc::now().timestamp_millis().to_string();
        params.push(("nonce", nonce));

        let body = serde_urlencoded::to_string(&params)
            .map_err(|e| ExchangeError::Api(e.to_string()))?;
        let signature = self.sign(&body)?;

        let response = self
            .http_client
            .post(format!("{}/tradingApi", self.base_url))
            .header("Key", &self.api_key)
            .header("Sign", signature)
            .header(reqwest::header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await?;

        if response.status().is_server_error() {
            return Err(ExchangeError::Server(response.status().to_string()));
        }

        let value = response.json::<serde_json::Value>().await?;
        if let Some(error) = value.get("error").and_then(|e| e.as_str()) {
            if error == COULD_NOT_FILL {
                return Err(ExchangeError::CouldNotFill);
            }
            return Err(ExchangeError::Api(error.to_string()));
        }

        serde_json::from_value(value).map_err(|e| ExchangeError::Api(e.to_string()))
    }
}

#[async_trait]
impl ExchangeApi for RestExchange {
    async fn balances(&self) -> Result<Balances, ExchangeError> {
        #[derive(Deserialize)]
        struct RawBalance {
            available: Decimal,
        }

        let raw: std::collections::HashMap<String, RawBalance> = self
            .send_signed_request(vec![("command", "returnCompleteBalances".to_string())])
            .await?;

        Ok(raw
            .into_iter()
            .map(|(coin, balance)| (coin, balance.available))
            .collect())
    }

    async fn submit(
        &self,
        side: Side,
        market: &str,
        price: Decimal,
        amount: Decimal,
        kind: OrderKind,
    ) -> Result<OrderReceipt, ExchangeError> {
        let command = match side {
            Side::Buy => "buy",
            Side::Sell => "sell",
        };
        let params = vec![
            ("command", command.to_string()),
            ("currencyPair", market.to_string()),
            ("rate", price.to_string()),
            ("amount", amount.to_string()),
            (
                match kind {
                    OrderKind::FillOrKill => "fillOrKill",
                    OrderKind::ImmediateOrCancel => "immediateOrCancel",
                    OrderKind::PostOnly => "postOnly",
                },
                "1".to_string(),
            ),
        ];

        #[derive(Deserialize)]
        struct RawTrade {
            rate: Decimal,
            amount: Decimal,
        }

        #[derive(Deserialize)]
        struct RawReceipt {
            #[serde(rename = "orderNumber")]
            order_number: String,
            #[serde(rename = "resultingTrades", default)]
            resulting_trades: Vec<RawTrade>,
        }

        info!("🚀 sending order: {command} {amount} {market} @ {price}");

        let raw: RawReceipt = self.send_signed_request(params).await?;
        let order_id = raw
            .order_number
            .parse()
            .map_err(|_| ExchangeError::Api(format!("bad order number {}", raw.order_number)))?;

        Ok(OrderReceipt {
            order_id,
            fills: raw
                .resulting_trades
                .into_iter()
                .map(|trade| Fill {
                    price: trade.rate,
                    amount: trade.amount,
                })
                .collect(),
        })
    }
}
