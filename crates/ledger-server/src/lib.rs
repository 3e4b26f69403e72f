//! # ledger-server
//!
//! JSON HTTP API over the audit ledger.
//!
//! | Route                 | Purpose                                   |
//! |-----------------------|-------------------------------------------|
//! | `GET  /audit`         | filtered listing, newest first            |
//! | `POST /audit/test`    | append an operational test event          |
//! | `GET  /audit/verify`  | chain verification report                 |
//! | `GET  /audit/export`  | blocks plus report and terminal hash      |
//! | `GET  /audit/stats`   | `{"system_activities": n}`                |
//!
//! Every route is also served under `/api`.

pub mod api;
pub mod error;

use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tracing::{info, warn};

use ledger_audit::Ledger;
use ledger_config::ServerSettings;
use ledger_contracts::{LedgerError, LedgerResult};

pub use error::ApiError;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Ledger,
    pub read_timeout: Duration,
}

impl AppState {
    pub fn new(ledger: Ledger, read_timeout: Duration) -> Self {
        Self {
            ledger,
            read_timeout,
        }
    }
}

/// Build the router with every route mounted at `/` and under `/api`.
pub fn router(state: AppState) -> Router {
    let audit = Router::new()
        .route("/audit", get(api::list_blocks))
        .route("/audit/test", post(api::append_test_event))
        .route("/audit/verify", get(api::verify))
        .route("/audit/export", get(api::export))
        .route("/audit/stats", get(api::stats));

    Router::new()
        .merge(audit.clone())
        .nest("/api", audit)
        .with_state(state)
}

/// Bind `settings.bind` and serve until Ctrl-C.
pub async fn serve(ledger: Ledger, settings: &ServerSettings) -> LedgerResult<()> {
    let state = AppState::new(ledger, Duration::from_millis(settings.read_timeout_ms));
    let app = router(state);

    let listener = TcpListener::bind(settings.bind)
        .await
        .map_err(|e| LedgerError::ServerError {
            reason: format!("failed to bind {}: {}", settings.bind, e),
        })?;
    info!(addr = %settings.bind, "audit ledger API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| LedgerError::ServerError {
            reason: e.to_string(),
        })?;

    info!("audit ledger API stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use ledger_audit::{InMemoryLedgerStore, LedgerOptions};
    use ledger_contracts::{Block, NewBlock, GENESIS_HASH};
    use ledger_core::LedgerStore;

    use super::*;
    use crate::error::status_for;

    // ── Helpers ───────────────────────────────────────────────────────────────

    /// Serves a rewritten `details` for one block, as if the row had been
    /// edited behind the ledger's back.
    struct TamperedView {
        inner: InMemoryLedgerStore,
        sequence_id: u64,
    }

    impl TamperedView {
        fn doctor(&self, mut block: Block) -> Block {
            if block.sequence_id == self.sequence_id {
                block.details = "doctored".to_string();
            }
            block
        }
    }

    impl LedgerStore for TamperedView {
        fn latest(&self) -> LedgerResult<Option<Block>> {
            Ok(self.inner.latest()?.map(|b| self.doctor(b)))
        }

        fn get(&self, sequence_id: u64) -> LedgerResult<Option<Block>> {
            Ok(self.inner.get(sequence_id)?.map(|b| self.doctor(b)))
        }

        fn insert(&self, block: &NewBlock) -> LedgerResult<Block> {
            self.inner.insert(block)
        }

        fn read_from(&self, cursor: u64, limit: usize) -> LedgerResult<Vec<Block>> {
            Ok(self
                .inner
                .read_from(cursor, limit)?
                .into_iter()
                .map(|b| self.doctor(b))
                .collect())
        }

        fn count(&self) -> LedgerResult<u64> {
            self.inner.count()
        }
    }

    fn app_over(store: Arc<dyn LedgerStore>) -> Router {
        let (ledger, _worker) = Ledger::start(store, LedgerOptions::default()).unwrap();
        router(AppState::new(ledger, Duration::from_secs(5)))
    }

    fn app() -> Router {
        app_over(Arc::new(InMemoryLedgerStore::new()))
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        send(app, request).await
    }

    async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        send(app, request).await
    }

    async fn log(app: &Router, actor: &str, action: &str, details: &str) -> Value {
        let (status, body) = post_json(
            app,
            "/audit/test",
            json!({ "actor": actor, "action": action, "details": details }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "unexpected body: {}", body);
        body
    }

    // ── POST /audit/test ─────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_event_is_logged_and_returned() {
        let app = app();
        let body = log(&app, "admin", "TEST_ACTION", "hello").await;

        assert_eq!(body["message"], "Action logged successfully.");
        assert_eq!(body["block"]["id"], 1);
        assert_eq!(body["block"]["actor"], "admin");
        assert_eq!(body["block"]["prev_hash"], GENESIS_HASH);
        assert_eq!(body["block"]["hash"].as_str().unwrap().len(), 64);
    }

    #[tokio::test]
    async fn null_details_are_logged_as_empty() {
        let app = app();
        let (status, body) = post_json(
            &app,
            "/audit/test",
            json!({ "actor": "admin", "action": "TEST", "details": null }),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED, "unexpected body: {}", body);
        assert_eq!(body["block"]["details"], "");
    }

    #[tokio::test]
    async fn blank_actor_is_a_bad_request() {
        let app = app();
        let (status, body) = post_json(
            &app,
            "/audit/test",
            json!({ "actor": "  ", "action": "TEST_ACTION" }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("actor"));
    }

    #[tokio::test]
    async fn malformed_body_is_a_bad_request() {
        let app = app();
        let request = Request::builder()
            .method(Method::POST)
            .uri("/audit/test")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"actor\": "))
            .unwrap();
        let (status, body) = send(&app, request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    // ── GET /audit ───────────────────────────────────────────────────────────

    #[tokio::test]
    async fn listing_is_newest_first_by_default() {
        let app = app();
        log(&app, "alice", "LOGIN", "").await;
        log(&app, "bob", "ROLE_CHANGE", "made alice admin").await;
        log(&app, "carol", "LOGOUT", "").await;

        let (status, body) = get_json(&app, "/audit").await;
        assert_eq!(status, StatusCode::OK);
        let ids: Vec<u64> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|b| b["id"].as_u64().unwrap())
            .collect();
        assert_eq!(ids, vec![3, 2, 1]);

        let (_, body) = get_json(&app, "/audit?order=asc&limit=2").await;
        let ids: Vec<u64> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|b| b["id"].as_u64().unwrap())
            .collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn listing_applies_filters() {
        let app = app();
        log(&app, "Alice", "LOGIN", "").await;
        log(&app, "bob", "ROLE_CHANGE", "").await;
        log(&app, "alice", "LOGOUT", "").await;

        let (_, body) = get_json(&app, "/audit?actor=ALICE").await;
        assert_eq!(body.as_array().unwrap().len(), 2);

        let (_, body) = get_json(&app, "/audit?q=role_change").await;
        let blocks = body.as_array().unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0]["actor"], "bob");

        let (_, body) = get_json(&app, "/audit?after=2").await;
        assert_eq!(body.as_array().unwrap().len(), 1);

        let (_, body) = get_json(&app, "/audit?date=1999-01-01").await;
        assert!(body.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_query_is_a_bad_request() {
        let app = app();
        let (status, body) = get_json(&app, "/audit?date=yesterday").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn routes_are_also_served_under_api() {
        let app = app();
        let (status, _) = post_json(
            &app,
            "/api/audit/test",
            json!({ "actor": "admin", "action": "TEST_ACTION", "details": "" }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = get_json(&app, "/api/audit").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);
    }

    // ── GET /audit/verify ────────────────────────────────────────────────────

    #[tokio::test]
    async fn intact_chain_verifies() {
        let app = app();
        for i in 0..4 {
            log(&app, "admin", "TEST_ACTION", &format!("event {}", i)).await;
        }

        let (status, body) = get_json(&app, "/audit/verify").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["passed"], true);
        assert_eq!(body["checked"], 4);
        assert_eq!(body["policy"], "stored-hash");
    }

    #[tokio::test]
    async fn tampered_chain_reports_findings_with_ok_status() {
        let inner = InMemoryLedgerStore::new();
        let app = app_over(Arc::new(TamperedView {
            inner,
            sequence_id: 2,
        }));
        for i in 0..4 {
            log(&app, "admin", "TEST_ACTION", &format!("event {}", i)).await;
        }

        let (status, body) = get_json(&app, "/audit/verify").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["passed"], false);
        let findings = body["findings"].as_array().unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0]["sequence_id"], 2);

        let (_, body) = get_json(&app, "/audit/verify?policy=recomputed").await;
        assert_eq!(body["policy"], "recomputed");
        assert_eq!(body["findings"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn verify_accepts_a_range() {
        let app = app();
        for i in 0..5 {
            log(&app, "admin", "TEST_ACTION", &format!("event {}", i)).await;
        }

        let (_, body) = get_json(&app, "/audit/verify?start=2&end=4").await;
        assert_eq!(body["passed"], true);
        assert_eq!(body["checked"], 3);
    }

    #[tokio::test]
    async fn unknown_policy_is_a_bad_request() {
        let app = app();
        let (status, _) = get_json(&app, "/audit/verify?policy=lenient").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    // ── Export and stats ─────────────────────────────────────────────────────

    #[tokio::test]
    async fn export_carries_terminal_hash() {
        let app = app();
        log(&app, "admin", "TEST_ACTION", "a").await;
        let last = log(&app, "admin", "TEST_ACTION", "b").await;

        let (status, body) = get_json(&app, "/audit/export").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["block_count"], 2);
        assert_eq!(body["terminal_hash"], last["block"]["hash"]);
        assert_eq!(body["report"]["passed"], true);
    }

    #[tokio::test]
    async fn stats_counts_system_activities() {
        let app = app();
        let (_, body) = get_json(&app, "/audit/stats").await;
        assert_eq!(body, json!({ "system_activities": 0 }));

        log(&app, "admin", "TEST_ACTION", "").await;
        log(&app, "admin", "TEST_ACTION", "").await;
        let (_, body) = get_json(&app, "/audit/stats").await;
        assert_eq!(body, json!({ "system_activities": 2 }));
    }

    // ── Error mapping ────────────────────────────────────────────────────────

    #[test]
    fn ledger_errors_map_to_statuses() {
        assert_eq!(
            status_for(&LedgerError::invalid("actor", "must not be empty")),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&LedgerError::StaleTip {
                expected: "a".into(),
                found: "b".into()
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_for(&LedgerError::WriterClosed),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_for(&LedgerError::Timeout {
                operation: "verify audit chain".into(),
                timeout_ms: 10
            }),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            status_for(&LedgerError::store("disk full")),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::from(LedgerError::WriterClosed).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
