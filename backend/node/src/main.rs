//! FundMe node — entry point.
//!
//! Hosts the in-memory FundMe ledger behind a small Axum REST API. Around
//! it run three background tasks: a price poller that keeps the ledger's
//! feed fresh, a payout writer that records value leaving the ledger, and
//! an indexer that drains committed ledger events into SQLite.

mod api;
mod config;
mod db;
mod errors;
mod events;
mod feed;
mod indexer;
mod payout;
mod rpc;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use chrono::Utc;
use fund_me::FundMe;
use reqwest::Client;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::Config;
use feed::CachedPriceFeed;
use indexer::IndexerState;
use payout::OutboxTransfer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging (RUST_LOG controls verbosity).
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Load optional .env file (ignored if missing).
    let _ = dotenvy::dotenv();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!("{e}"))?;

    // Set up the SQLite connection pool and run migrations.
    let pool = db::init_pool(&config.database_url).await?;

    let client = Client::builder()
        .timeout(Duration::from_secs(30))
        .build()?;

    let cancel = CancellationToken::new();

    // ─── Ledger and its collaborators ─────────────────────
    let price_feed = Arc::new(CachedPriceFeed::new(Duration::from_secs(
        config.price_max_age_secs,
    )));
    let (outbox, payouts_rx) = OutboxTransfer::channel(config.payout_queue_depth);

    let fund = Arc::new(match config.minimum_usd {
        Some(minimum) => FundMe::with_minimum_usd(
            config.owner,
            minimum,
            price_feed.clone(),
            Arc::new(outbox),
        ),
        None => FundMe::new(config.owner, price_feed.clone(), Arc::new(outbox)),
    });

    // ─── Background tasks ─────────────────────────────────
    let poller = tokio::spawn(feed::run(
        price_feed,
        client,
        config.price_feed_url.clone(),
        Duration::from_secs(config.price_poll_interval_secs),
        cancel.clone(),
    ));

    let payout_writer = tokio::spawn(payout::run(pool.clone(), payouts_rx, cancel.clone()));

    let indexer_state = Arc::new(IndexerState {
        pool: pool.clone(),
        fund: fund.clone(),
        session: Utc::now().timestamp_millis(),
        interval: Duration::from_secs(config.index_interval_secs),
    });
    let indexer = tokio::spawn(indexer::run(indexer_state, cancel.clone()));

    // ─── REST API ─────────────────────────────────────────
    let api_state = Arc::new(api::ApiState { pool, fund });

    let app = Router::new()
        .route("/health", get(api::health))
        .route("/config", get(api::get_config))
        .route("/funders", get(api::get_funders))
        .route("/funders/index/:index", get(api::get_funder_at))
        .route("/funders/change", post(api::change_funder))
        .route("/funders/:address", get(api::get_funder))
        .route("/funders/:address/events", get(api::get_funder_events))
        .route("/events", get(api::get_all_events))
        .route("/payouts", get(api::get_payouts))
        .route("/fund", post(api::fund))
        .route("/withdraw", post(api::withdraw))
        .route("/withdraw/all", post(api::withdraw_all))
        .route("/owner/withdraw", post(api::owner_withdraw))
        .route("/owner/minimum-usd", post(api::set_minimum_usd))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(api_state);

    let addr = format!("0.0.0.0:{}", config.api_port);
    info!("API listening on http://{addr}");

    let listener = TcpListener::bind(&addr).await?;
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
        info!("Shutdown requested");
    };
    serve_until(listener, app, ctrl_c, cancel).await?;

    let _ = tokio::join!(poller, payout_writer, indexer);
    info!("Node stopped");

    Ok(())
}

/// Serve until `signal` fires and every in-flight request has finished, then
/// cancel the background tasks.
///
/// Cancelling any earlier would let a request commit ledger events after
/// the indexer's final flush.
async fn serve_until(
    listener: TcpListener,
    app: Router,
    signal: impl Future<Output = ()> + Send + 'static,
    cancel: CancellationToken,
) -> std::io::Result<()> {
    axum::serve(listener, app)
        .with_graceful_shutdown(signal)
        .await?;
    cancel.cancel();
    Ok(())
}
