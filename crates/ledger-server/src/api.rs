//! Route handlers for `/audit`.
//!
//! Appends go through the ledger's single writer. Reads block on the store,
//! so they run on the blocking pool under the configured read timeout.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use ledger_audit::{Ledger, LedgerExport};
use ledger_contracts::{
    AuditEntry, Block, BlockQuery, ChainPolicy, LedgerError, LedgerResult, SequenceRange, SortOrder,
    VerificationReport,
};

use crate::error::ApiError;
use crate::AppState;

/// Query string accepted by `GET /audit` and `GET /audit/export`.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub actor: Option<String>,
    pub q: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub date: Option<NaiveDate>,
    pub after: Option<u64>,
    pub limit: Option<usize>,
    pub order: Option<SortOrder>,
}

impl ListParams {
    /// Filters only. `limit` and `order` are applied after sorting.
    fn filters(&self) -> BlockQuery {
        let mut query = BlockQuery::new().between(self.since, self.until);
        if let Some(actor) = &self.actor {
            query = query.actor(actor.clone());
        }
        if let Some(q) = &self.q {
            query = query.search(q.clone());
        }
        if let Some(day) = self.date {
            query = query.on(day);
        }
        if let Some(after) = self.after {
            query = query.after(after);
        }
        query
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct VerifyParams {
    pub start: Option<u64>,
    pub end: Option<u64>,
    pub policy: Option<ChainPolicy>,
}

#[derive(Debug, Serialize)]
pub struct Logged {
    pub message: &'static str,
    pub block: Block,
}

/// Run a blocking read against the ledger within the read budget.
///
/// On timeout the read is abandoned, not cancelled. It only reads, so
/// letting it finish in the background is harmless.
async fn blocking_read<T, F>(state: &AppState, operation: &'static str, read: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(Ledger) -> LedgerResult<T> + Send + 'static,
{
    let ledger = state.ledger.clone();
    let task = tokio::task::spawn_blocking(move || read(ledger));

    match tokio::time::timeout(state.read_timeout, task).await {
        Ok(Ok(result)) => result.map_err(ApiError::from),
        Ok(Err(join_err)) => Err(LedgerError::store(format!("{} task failed: {}", operation, join_err)).into()),
        Err(_) => Err(LedgerError::Timeout {
            operation: operation.to_string(),
            timeout_ms: state.read_timeout.as_millis() as u64,
        }
        .into()),
    }
}

/// Sort newest first (or oldest first) and cut to `limit`.
fn arrange(mut blocks: Vec<Block>, order: SortOrder, limit: Option<usize>) -> Vec<Block> {
    match order {
        SortOrder::Asc => blocks.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then(a.sequence_id.cmp(&b.sequence_id))
        }),
        SortOrder::Desc => blocks.sort_by(|a, b| {
            b.timestamp
                .cmp(&a.timestamp)
                .then(b.sequence_id.cmp(&a.sequence_id))
        }),
    }
    if let Some(limit) = limit {
        blocks.truncate(limit);
    }
    blocks
}

/// `GET /audit`
pub async fn list_blocks(
    State(state): State<AppState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<Block>>, ApiError> {
    let Query(params) = params?;
    let query = params.filters();
    let order = params.order.unwrap_or_default();

    let blocks = blocking_read(&state, "list audit blocks", move |ledger| {
        ledger.list_blocks(query).collect::<LedgerResult<Vec<_>>>()
    })
    .await?;

    debug!(count = blocks.len(), ?order, "listed audit blocks");
    Ok(Json(arrange(blocks, order, params.limit)))
}

/// `POST /audit/test`
pub async fn append_test_event(
    State(state): State<AppState>,
    body: Result<Json<AuditEntry>, JsonRejection>,
) -> Result<(StatusCode, Json<Logged>), ApiError> {
    let Json(entry) = body?;
    let block = state
        .ledger
        .append_test_event(entry.actor, entry.action, entry.details)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(Logged {
            message: "Action logged successfully.",
            block,
        }),
    ))
}

/// `GET /audit/verify`
///
/// A broken chain is still a `200`: the report carries the findings.
pub async fn verify(
    State(state): State<AppState>,
    params: Result<Query<VerifyParams>, QueryRejection>,
) -> Result<Json<VerificationReport>, ApiError> {
    let Query(params) = params?;
    let range = SequenceRange::new(params.start, params.end);

    let report = blocking_read(&state, "verify audit chain", move |ledger| {
        let policy = params.policy.unwrap_or(ledger.policy());
        ledger.verify_with(Some(range), policy)
    })
    .await?;

    Ok(Json(report))
}

/// `GET /audit/export`
pub async fn export(
    State(state): State<AppState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<LedgerExport>, ApiError> {
    let Query(params) = params?;
    let mut query = params.filters();
    if let Some(limit) = params.limit {
        query = query.limit(limit);
    }

    let export = blocking_read(&state, "export audit ledger", move |ledger| ledger.export(query)).await?;
    Ok(Json(export))
}

/// `GET /audit/stats`
pub async fn stats(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let count = blocking_read(&state, "count audit blocks", |ledger| ledger.count()).await?;
    Ok(Json(json!({ "system_activities": count })))
}
