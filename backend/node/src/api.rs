//! Axum REST API handlers.
//!
//! Mutating routes take the calling identity in the body as `caller`;
//! authentication is left to whatever sits in front of this service.
//! Amounts travel as decimal strings.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use fund_me::{types::decimal, Address, FundMe, FunderStatus, GuardState};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::db;
use crate::errors::Result;
use crate::events::{EventRecord, PayoutRecord};

#[derive(Clone)]
pub struct ApiState {
    pub pool: SqlitePool,
    pub fund: Arc<FundMe>,
}

// ─────────────────────────────────────────────────────────
// Request shapes
// ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AmountRequest {
    pub caller: Address,
    #[serde(with = "decimal")]
    pub amount: u128,
}

#[derive(Debug, Deserialize)]
pub struct CallerRequest {
    pub caller: Address,
}

#[derive(Debug, Deserialize)]
pub struct ChangeFunderRequest {
    pub caller: Address,
    pub new_funder: Address,
}

#[derive(Debug, Deserialize)]
pub struct MinimumUsdRequest {
    pub caller: Address,
    #[serde(with = "decimal")]
    pub minimum_usd: u128,
}

// ─────────────────────────────────────────────────────────
// Response shapes
// ─────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ConfigResponse {
    pub owner: Address,
    #[serde(with = "decimal")]
    pub minimum_usd: u128,
    #[serde(with = "decimal")]
    pub total_funds: u128,
    pub funder_count: usize,
    pub price_feed_version: u64,
    pub withdrawal_in_progress: bool,
}

#[derive(Debug, Serialize)]
pub struct FunderEntry {
    pub index: usize,
    pub address: Address,
    #[serde(with = "decimal")]
    pub balance: u128,
}

#[derive(Debug, Serialize)]
pub struct FundersResponse {
    pub count: usize,
    pub funders: Vec<FunderEntry>,
}

#[derive(Debug, Serialize)]
pub struct FunderResponse {
    pub address: Address,
    #[serde(flatten)]
    pub status: FunderStatus,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct BalanceResponse {
    pub caller: Address,
    #[serde(with = "decimal")]
    pub balance: u128,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct MovedResponse {
    pub caller: Address,
    #[serde(with = "decimal")]
    pub amount: u128,
}

#[derive(Serialize)]
pub struct EventsResponse {
    pub actor: Address,
    pub count: usize,
    pub events: Vec<EventRecord>,
}

#[derive(Serialize)]
pub struct AllEventsResponse {
    pub count: usize,
    pub events: Vec<EventRecord>,
}

#[derive(Serialize)]
pub struct PayoutsResponse {
    pub count: usize,
    pub payouts: Vec<PayoutRecord>,
}

// ─────────────────────────────────────────────────────────
// Read handlers
// ─────────────────────────────────────────────────────────

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `GET /config`
pub async fn get_config(State(state): State<Arc<ApiState>>) -> Json<ConfigResponse> {
    let fund = &state.fund;
    Json(ConfigResponse {
        owner: fund.owner(),
        minimum_usd: fund.minimum_usd(),
        total_funds: fund.total_funds(),
        funder_count: fund.funder_count(),
        price_feed_version: fund.price_feed_version(),
        withdrawal_in_progress: fund.guard_state() == GuardState::InProgress,
    })
}

/// `GET /funders`
///
/// Lists active funders in registry order.
pub async fn get_funders(State(state): State<Arc<ApiState>>) -> Json<FundersResponse> {
    let funders: Vec<FunderEntry> = state
        .fund
        .funders()
        .into_iter()
        .enumerate()
        .map(|(index, address)| FunderEntry {
            index,
            address,
            balance: state.fund.balance_of(&address),
        })
        .collect();
    Json(FundersResponse {
        count: funders.len(),
        funders,
    })
}

/// `GET /funders/index/:index`
pub async fn get_funder_at(
    State(state): State<Arc<ApiState>>,
    Path(index): Path<usize>,
) -> Result<Json<FunderEntry>> {
    let address = state.fund.funder_at(index)?;
    Ok(Json(FunderEntry {
        index,
        address,
        balance: state.fund.balance_of(&address),
    }))
}

/// `GET /funders/:address`
pub async fn get_funder(
    State(state): State<Arc<ApiState>>,
    Path(address): Path<Address>,
) -> Json<FunderResponse> {
    Json(FunderResponse {
        address,
        status: state.fund.status_of(&address),
    })
}

/// `GET /funders/:address/events`
///
/// Returns all indexed events about the given identity.
pub async fn get_funder_events(
    State(state): State<Arc<ApiState>>,
    Path(actor): Path<Address>,
) -> Result<Json<EventsResponse>> {
    let events = db::get_events_for_actor(&state.pool, &actor.to_string()).await?;
    Ok(Json(EventsResponse {
        actor,
        count: events.len(),
        events,
    }))
}

/// `GET /events`
pub async fn get_all_events(State(state): State<Arc<ApiState>>) -> Result<Json<AllEventsResponse>> {
    let events = db::get_all_events(&state.pool).await?;
    Ok(Json(AllEventsResponse {
        count: events.len(),
        events,
    }))
}

/// `GET /payouts`
pub async fn get_payouts(State(state): State<Arc<ApiState>>) -> Result<Json<PayoutsResponse>> {
    let payouts = db::get_payouts(&state.pool).await?;
    Ok(Json(PayoutsResponse {
        count: payouts.len(),
        payouts,
    }))
}

// ─────────────────────────────────────────────────────────
// Ledger operations
// ─────────────────────────────────────────────────────────

/// `POST /fund`
pub async fn fund(
    State(state): State<Arc<ApiState>>,
    Json(req): Json<AmountRequest>,
) -> Result<Json<BalanceResponse>> {
    let balance = state.fund.deposit(req.caller, req.amount)?;
    Ok(Json(BalanceResponse {
        caller: req.caller,
        balance,
    }))
}

/// `POST /withdraw`
///
/// Responds with the balance left after the partial withdrawal.
pub async fn withdraw(
    State(state): State<Arc<ApiState>>,
    Json(req): Json<AmountRequest>,
) -> Result<Json<BalanceResponse>> {
    let balance = state.fund.withdraw_partial(req.caller, req.amount)?;
    Ok(Json(BalanceResponse {
        caller: req.caller,
        balance,
    }))
}

/// `POST /withdraw/all`
pub async fn withdraw_all(
    State(state): State<Arc<ApiState>>,
    Json(req): Json<CallerRequest>,
) -> Result<Json<MovedResponse>> {
    let amount = state.fund.withdraw_full(req.caller)?;
    Ok(Json(MovedResponse {
        caller: req.caller,
        amount,
    }))
}

/// `POST /funders/change`
///
/// Responds with the new identity's balance, which includes anything it
/// already held.
pub async fn change_funder(
    State(state): State<Arc<ApiState>>,
    Json(req): Json<ChangeFunderRequest>,
) -> Result<Json<BalanceResponse>> {
    state.fund.change_funder(req.caller, req.new_funder)?;
    Ok(Json(BalanceResponse {
        caller: req.new_funder,
        balance: state.fund.balance_of(&req.new_funder),
    }))
}

/// `POST /owner/withdraw`
pub async fn owner_withdraw(
    State(state): State<Arc<ApiState>>,
    Json(req): Json<CallerRequest>,
) -> Result<Json<MovedResponse>> {
    let amount = state.fund.owner_withdraw_all(req.caller)?;
    Ok(Json(MovedResponse {
        caller: req.caller,
        amount,
    }))
}

/// `POST /owner/minimum-usd`
pub async fn set_minimum_usd(
    State(state): State<Arc<ApiState>>,
    Json(req): Json<MinimumUsdRequest>,
) -> Result<Json<ConfigResponse>> {
    state.fund.set_minimum_usd(req.caller, req.minimum_usd)?;
    Ok(get_config(State(state)).await)
}
