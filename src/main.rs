// src/main.rs
use anyhow::Result;
use dotenvy::dotenv;
use rebalancer::config::AppConfig;
use rebalancer::connectors::{BacktestAdapter, LiveAdapter, RestExchange};
use rebalancer::core::Fund;
use rebalancer::market::FileMarketHistory;
use rebalancer::strategies::{BuffedCoinStrategy, BuyHoldStrategy, PeakRiderStrategy, Strategy};
use std::env;
use tracing::info;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let file_appender = tracing_appender::rolling::daily("logs", "rebalancer.log");
    let (file_writer, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(file_writer.and(std::io::stdout))
        .init();

    let config = AppConfig::new()?;

    // Parse LIVE_TRADING env var (default to false for safety)
    let live_trading = env::var("LIVE_TRADING")
        .unwrap_or("false".to_string())
        .parse::<bool>()
        .unwrap_or(false);

    println!("========================================");
    println!("       REBALANCER - v0.1.0");
    println!("========================================");
    println!("Fiat:     {}", config.trading.fiat);
    println!("Strategy: {}", config.trading.strategy);
    println!(
        "Mode:     {}",
        if live_trading {
            "🚨 LIVE TRADING"
        } else {
            "📝 BACKTEST"
        }
    );
    println!("========================================");

    let fiat = config.trading.fiat.clone();
    let interval = config.trading.interval_secs;
    let strategy_name = config.trading.strategy.clone();
    match strategy_name.as_str() {
        "buy-hold" => run(BuyHoldStrategy::new(fiat, interval), config, live_trading).await,
        "buffed-coin" => {
            run(BuffedCoinStrategy::new(fiat, interval), config, live_trading).await
        }
        "peak-rider" => run(PeakRiderStrategy::new(fiat, interval), config, live_trading).await,
        other => anyhow::bail!("unknown strategy {other:?}"),
    }
}

async fn run<S: Strategy>(strategy: S, config: AppConfig, live_trading: bool) -> Result<()> {
    let history = FileMarketHistory::from_path(&config.backtest.chart_file)?;

    if live_trading {
        let client = RestExchange::new(
            config.exchange.api_key.clone(),
            config.exchange.secret_key.clone(),
            config.exchange.base_url.clone(),
        );
        let adapter = LiveAdapter::new(config.trading.fiat.clone(), history, client)
            .with_order_rules(
                config.exchange.minimum_order_amount,
                config.exchange.order_adjustment,
                config.exchange.order_attempts,
                config.exchange.price_tick,
                config.exchange.quantity_step,
            );
        let mut fund = Fund::new(strategy, adapter).with_bridge_coin(&config.trading.bridge_coin);
        fund.run_live().await
    } else {
        let adapter = BacktestAdapter::new(
            config.trading.fiat.clone(),
            history,
            config.backtest.initial_balances.clone(),
        );
        let mut fund = Fund::new(strategy, adapter).with_bridge_coin(&config.trading.bridge_coin);

        let values = fund
            .run_backtest(config.backtest.start, config.backtest.end)
            .await?;
        for (step, value) in values.iter().enumerate() {
            info!("step {step}: ${value}");
        }
        if let Some(final_value) = values.last() {
            println!("Final USD value: ${final_value}");
        }
        Ok(())
    }
}
