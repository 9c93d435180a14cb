// src/market/history.rs
use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::prelude::ToPrimitive;
use serde::Deserialize;

use crate::errors::HistoryError;
use crate::types::ChartData;

/// Source of historical chart snapshots.
///
/// `latest` must be deterministic for backtests: the same `time` against the
/// same store always yields the same charts. Live feeds may be lossy or
/// delayed behind this interface.
pub trait MarketHistory: Send + Sync {
    /// The most recent chart snapshot at or before `time`.
    fn latest(&self, time: DateTime<Utc>) -> Result<ChartData, HistoryError>;

    /// Chronological weighted-average prices of the `{base}_{quote}` market
    /// over the `days_back` days up to `time`. Snapshots that do not chart
    /// the market are skipped.
    fn asset_history(
        &self,
        time: DateTime<Utc>,
        base: &str,
        quote: &str,
        days_back: i64,
    ) -> Result<Vec<f64>, HistoryError>;
}

/// Chart store backed by a JSON file mapping RFC 3339 timestamps to chart
/// snapshots. The deterministic feed backtests run against.
#[derive(Debug, Clone, Default)]
pub struct FileMarketHistory {
    charts: BTreeMap<DateTime<Utc>, ChartData>,
}

impl FileMarketHistory {
    pub fn new(charts: BTreeMap<DateTime<Utc>, ChartData>) -> Self {
        Self { charts }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, HistoryError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, HistoryError> {
        #[derive(Deserialize)]
        struct Store(BTreeMap<DateTime<Utc>, ChartData>);

        let Store(charts) = serde_json::from_str(raw)?;
        Ok(Self::new(charts))
    }
}

impl MarketHistory for FileMarketHistory {
    fn latest(&self, time: DateTime<Utc>) -> Result<ChartData, HistoryError> {
        self.charts
            .range(..=time)
            .next_back()
            .map(|(_, charts)| charts.clone())
            .ok_or(HistoryError::NoData(time))
    }

    fn asset_history(
        &self,
        time: DateTime<Utc>,
        base: &str,
        quote: &str,
        days_back: i64,
    ) -> Result<Vec<f64>, HistoryError> {
        let market = super::format_currency_pair(base, quote);
        let since = time - Duration::days(days_back);
        let prices = self
            .charts
            .range(since..=time)
            .filter_map(|(_, charts)| charts.get(&market))
            .filter_map(|entry| entry.weighted_average.to_f64())
            .collect();
        Ok(prices)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::types::ChartEntry;

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, d, 0, 0, 0).unwrap()
    }

    fn store() -> FileMarketHistory {
        let charts = BTreeMap::from([
            (
                day(1),
                ChartData::from([("BTC_ETH".to_string(), ChartEntry::new(dec!(0.05)))]),
            ),
            (
                day(2),
                ChartData::from([("BTC_ETH".to_string(), ChartEntry::new(dec!(0.06)))]),
            ),
            (
                day(4),
                ChartData::from([("BTC_ETH".to_string(), ChartEntry::new(dec!(0.07)))]),
            ),
        ]);
        FileMarketHistory::new(charts)
    }

    #[test]
    fn latest_returns_snapshot_at_or_before() {
        let charts = store().latest(day(3)).unwrap();
        assert_eq!(charts["BTC_ETH"].weighted_average, dec!(0.06));

        let charts = store().latest(day(2)).unwrap();
        assert_eq!(charts["BTC_ETH"].weighted_average, dec!(0.06));
    }

    #[test]
    fn latest_before_any_data_is_an_error() {
        assert!(matches!(
            store().latest(day(1) - Duration::hours(1)),
            Err(HistoryError::NoData(_))
        ));
    }

    #[test]
    fn asset_history_is_chronological_and_windowed() {
        let prices = store().asset_history(day(4), "BTC", "ETH", 2).unwrap();
        assert_eq!(prices, vec![0.06, 0.07]);
    }

    #[test]
    fn asset_history_skips_uncharted_snapshots() {
        let prices = store().asset_history(day(4), "BTC", "XRP", 30).unwrap();
        assert!(prices.is_empty());
    }

    #[test]
    fn from_json_parses_chart_fields() {
        let raw = r#"{
            "2024-03-01T00:00:00Z": {
                "BTC_ETH": {"weightedAverage": "0.05", "volume": "12.5"}
            }
        }"#;
        let history = FileMarketHistory::from_json(raw).unwrap();
        let charts = history.latest(day(1)).unwrap();
        assert_eq!(charts["BTC_ETH"].weighted_average, dec!(0.05));
        assert_eq!(charts["BTC_ETH"].volume, dec!(12.5));
    }
}
