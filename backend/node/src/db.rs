//! Database layer — migrations, event and payout queries.

use std::str::FromStr;

use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use tracing::info;

use crate::errors::Result;
use crate::events::{EventRecord, PayoutRecord, StoredEvent};
use crate::payout::Payout;

/// Establish a SQLite connection pool and run pending migrations.
pub async fn init_pool(database_url: &str) -> Result<SqlitePool> {
    let url = if database_url.starts_with("sqlite:") {
        database_url.to_string()
    } else {
        format!("sqlite:{database_url}")
    };

    // Every connection to `:memory:` opens its own database.
    let max_connections = if url.contains(":memory:") { 1 } else { 5 };

    let options = SqliteConnectOptions::from_str(&url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database migrations applied successfully");
    Ok(pool)
}

// ─────────────────────────────────────────────────────────
// Event writes
// ─────────────────────────────────────────────────────────

/// Persist a batch of drained events. Rows that share `(session, seq)` with
/// an existing row are silently ignored, so retrying a batch is safe.
pub async fn insert_events(pool: &SqlitePool, events: &[StoredEvent]) -> Result<usize> {
    let mut tx = pool.begin().await?;
    let mut count = 0usize;
    for ev in events {
        let rows_affected = sqlx::query(
            r#"
            INSERT OR IGNORE INTO events
                (session, seq, event_type, actor, counterparty, amount, payload, recorded_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(ev.session)
        .bind(ev.seq)
        .bind(&ev.event_type)
        .bind(&ev.actor)
        .bind(&ev.counterparty)
        .bind(&ev.amount)
        .bind(&ev.payload)
        .bind(ev.recorded_at)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        count += rows_affected as usize;
    }
    tx.commit().await?;
    Ok(count)
}

// ─────────────────────────────────────────────────────────
// Event reads
// ─────────────────────────────────────────────────────────

/// Fetch all events naming one identity on either side, oldest first.
pub async fn get_events_for_actor(pool: &SqlitePool, actor: &str) -> Result<Vec<EventRecord>> {
    let rows = sqlx::query_as::<_, EventRecord>(
        r#"
        SELECT id, session, seq, event_type, actor, counterparty, amount, payload,
               recorded_at, created_at
        FROM   events
        WHERE  actor = ?1 OR counterparty = ?1
        ORDER  BY session ASC, seq ASC
        "#,
    )
    .bind(actor)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Fetch all events, oldest first.
pub async fn get_all_events(pool: &SqlitePool) -> Result<Vec<EventRecord>> {
    let rows = sqlx::query_as::<_, EventRecord>(
        r#"
        SELECT id, session, seq, event_type, actor, counterparty, amount, payload,
               recorded_at, created_at
        FROM   events
        ORDER  BY session ASC, seq ASC
        "#,
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

// ─────────────────────────────────────────────────────────
// Payouts
// ─────────────────────────────────────────────────────────

pub async fn insert_payout(pool: &SqlitePool, payout: &Payout) -> Result<()> {
    sqlx::query("INSERT INTO payouts (recipient, amount, queued_at) VALUES (?1, ?2, ?3)")
        .bind(payout.recipient.to_string())
        .bind(payout.amount.to_string())
        .bind(payout.queued_at)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn get_payouts(pool: &SqlitePool) -> Result<Vec<PayoutRecord>> {
    let rows = sqlx::query_as::<_, PayoutRecord>(
        "SELECT id, recipient, amount, queued_at, created_at FROM payouts ORDER BY id ASC",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
