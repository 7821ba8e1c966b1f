//! REST API server for GasChain
//!
//! Exposes transaction submission, sealing, block lookup and chain validation
//! over HTTP. Everything under `/api` except `/api/health` requires a bearer
//! token.

use axum::{
    extract::{rejection::JsonRejection, Path, Request, State},
    http::{self, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::anomaly::{AnomalyOracle, NoAnomalyOracle};
use crate::blockchain::{Block, BlockSummary, ChainEngine};
use crate::config::ApiConfig;
use crate::error::ChainError;
use crate::persistence::BlockReference;
use crate::transaction::Transaction;

/// Shared state behind every handler.
#[derive(Clone)]
pub struct Node {
    pub engine: ChainEngine,
    token: Arc<str>,
    auto_seal: bool,
    require_signatures: bool,
    mining_timeout: Option<Duration>,
    oracle: Arc<dyn AnomalyOracle>,
    api_stats: Arc<RwLock<ApiStats>>,
}

/// API statistics and monitoring
#[derive(Debug, Default)]
struct ApiStats {
    total_requests: u64,
    successful_requests: u64,
    failed_requests: u64,
    transactions_submitted: u64,
    blocks_sealed: u64,
    anomalies_flagged: u64,
    start_time: Option<Instant>,
}

impl ApiStats {
    fn new() -> Self {
        ApiStats {
            start_time: Some(Instant::now()),
            ..Default::default()
        }
    }

    fn record_request(&mut self, success: bool) {
        self.total_requests += 1;
        if success {
            self.successful_requests += 1;
        } else {
            self.failed_requests += 1;
        }
    }
}

impl Node {
    pub fn new(engine: ChainEngine, config: &ApiConfig) -> Self {
        Self {
            engine,
            token: Arc::from(config.token.as_str()),
            auto_seal: config.auto_seal,
            require_signatures: config.require_signatures,
            mining_timeout: config.mining_timeout(),
            oracle: Arc::new(NoAnomalyOracle),
            api_stats: Arc::new(RwLock::new(ApiStats::new())),
        }
    }

    /// Attach an external anomaly classifier.
    pub fn with_oracle(mut self, oracle: Arc<dyn AnomalyOracle>) -> Self {
        self.oracle = oracle;
        self
    }

    /// Seal the pending pool, honoring the configured mining timeout.
    pub async fn seal(&self) -> Result<Block, ApiError> {
        let block = match self.mining_timeout {
            Some(timeout) => self.engine.seal_with_timeout(timeout).await?,
            None => self.engine.seal().await?,
        };
        self.api_stats.write().await.blocks_sealed += 1;
        Ok(block)
    }

    pub async fn get_stats(&self) -> ApiStatsResponse {
        let stats = self.api_stats.read().await;
        let uptime = stats.start_time.map(|t| t.elapsed().as_secs()).unwrap_or(0);

        ApiStatsResponse {
            total_requests: stats.total_requests,
            successful_requests: stats.successful_requests,
            failed_requests: stats.failed_requests,
            transactions_submitted: stats.transactions_submitted,
            blocks_sealed: stats.blocks_sealed,
            anomalies_flagged: stats.anomalies_flagged,
            uptime_seconds: uptime,
        }
    }

    fn token_matches(&self, header: Option<&str>) -> bool {
        header
            .and_then(|value| value.split_once(' '))
            .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("Bearer"))
            .map(|(_, token)| token.trim() == &*self.token)
            .unwrap_or(false)
    }
}

// ============================================================================
// API Error Handling
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    BlockchainError(ChainError),
    InvalidInput(String),
    NotFound(String),
    Unauthorized,
    InternalError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BlockchainError(e) => {
                let status = match e {
                    ChainError::EmptyPool => StatusCode::CONFLICT,
                    ChainError::MiningAborted => StatusCode::SERVICE_UNAVAILABLE,
                    ChainError::InvalidTransaction(_)
                    | ChainError::InvalidSignatureEncoding(_)
                    | ChainError::CryptoError(_) => StatusCode::BAD_REQUEST,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, e.to_string())
            }
            ApiError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Invalid API Token".to_string()),
            ApiError::InternalError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<ChainError> for ApiError {
    fn from(err: ChainError) -> Self {
        ApiError::BlockchainError(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidInput(rejection.body_text())
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub message: String,
    pub transaction_hash: String,
    pub anomaly: bool,
    pub block_hash: Option<String>,
    pub block_index: Option<u64>,
    pub pending: usize,
}

#[derive(Serialize)]
pub struct ApiStatsResponse {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub transactions_submitted: u64,
    pub blocks_sealed: u64,
    pub anomalies_flagged: u64,
    pub uptime_seconds: u64,
}

#[derive(Serialize)]
pub struct ValidationResponse {
    pub valid: bool,
    pub signatures_valid: bool,
    pub height: usize,
}

#[derive(Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum BlockLookupResponse {
    Chain { block: Block },
    Persistence { reference: BlockReference },
}

// ============================================================================
// Middleware
// ============================================================================

async fn auth_middleware(State(node): State<Arc<Node>>, req: Request, next: Next) -> Response {
    let header = req
        .headers()
        .get(http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    if !node.token_matches(header) {
        tracing::warn!(path = %req.uri().path(), "rejected request with invalid API token");
        return ApiError::Unauthorized.into_response();
    }
    next.run(req).await
}

/// Request statistics middleware
async fn stats_middleware(State(node): State<Arc<Node>>, req: Request, next: Next) -> Response {
    let response = next.run(req).await;

    let success = response.status().is_success();
    node.api_stats.write().await.record_request(success);

    response
}

/// Logs method, path, status and duration for every request.
async fn logging_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = next.run(req).await;

    tracing::info!(
        method = %method,
        path = %path,
        status = %response.status().as_u16(),
        duration_ms = %start.elapsed().as_millis(),
        "api.request"
    );

    response
}

// ============================================================================
// API Server
// ============================================================================

/// Build the API router with all endpoints (also used by tests)
pub fn build_api_router(node: Arc<Node>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods(vec![
            http::Method::GET,
            http::Method::POST,
            http::Method::OPTIONS,
        ])
        .allow_headers(vec![http::header::CONTENT_TYPE, http::header::AUTHORIZATION])
        .allow_credentials(true);

    let protected = Router::new()
        // Transaction endpoints
        .route("/transactions", post(submit_transaction))
        .route("/pending", get(get_pending))
        // Block endpoints
        .route("/blocks/seal", post(seal_block))
        .route("/blockchain", get(get_block_references))
        .route("/blockchain/:hash", get(get_block))
        // Chain endpoints
        .route("/chain", get(get_chain))
        .route("/chain/validate", get(validate_chain))
        // System endpoints
        .route("/stats", get(get_api_stats))
        .route_layer(middleware::from_fn_with_state(node.clone(), auth_middleware));

    let api_routes = Router::new()
        .route("/health", get(health_check))
        .merge(protected)
        .layer(middleware::from_fn(logging_middleware))
        .layer(middleware::from_fn_with_state(node.clone(), stats_middleware))
        .with_state(node);

    Router::new()
        .route("/", get(root))
        .nest("/api", api_routes)
        .layer(cors)
}

/// Serve the API until the process is stopped.
pub async fn run_api_server(node: Arc<Node>, port: u16) -> Result<(), ChainError> {
    let app = build_api_router(node);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(%addr, "API server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

// ============================================================================
// Route Handlers
// ============================================================================

async fn root() -> impl IntoResponse {
    Json(serde_json::json!({ "message": "Gas Balance Blockchain API" }))
}

async fn health_check(State(node): State<Arc<Node>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "height": node.engine.height().await,
        "difficulty": node.engine.difficulty().await,
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn submit_transaction(
    State(node): State<Arc<Node>>,
    payload: Result<Json<Transaction>, JsonRejection>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let Json(tx) = payload?;
    tx.validate_amounts()?;
    tx.validate_size()?;
    if node.require_signatures {
        tx.verify_signature()?;
    }

    let anomaly = node.oracle.is_anomalous(&tx);
    let transaction_hash = tx.hash_str();
    if anomaly {
        tracing::warn!(tx = %transaction_hash, sender = %tx.sender, "anomalous gas reading");
    }

    node.engine.submit(tx).await;
    {
        let mut stats = node.api_stats.write().await;
        stats.transactions_submitted += 1;
        if anomaly {
            stats.anomalies_flagged += 1;
        }
    }

    if !node.auto_seal {
        return Ok(Json(SubmitResponse {
            message: "Transaction accepted into the pending pool".to_string(),
            transaction_hash,
            anomaly,
            block_hash: None,
            block_index: None,
            pending: node.engine.pending_transactions().await.len(),
        }));
    }

    let block = match node.seal().await {
        Ok(block) => block,
        // A concurrent seal already picked up this transaction.
        Err(ApiError::BlockchainError(ChainError::EmptyPool)) => node
            .engine
            .find_block_containing(&transaction_hash)
            .await
            .ok_or_else(|| ApiError::InternalError("Sealed transaction not found".to_string()))?,
        Err(e) => return Err(e),
    };

    tracing::info!(tx = %transaction_hash, block = %block.hash(), "transaction recorded");

    Ok(Json(SubmitResponse {
        message: "Transaction added and recorded in blockchain successfully".to_string(),
        transaction_hash,
        anomaly,
        block_hash: Some(block.hash().to_string()),
        block_index: Some(block.index),
        pending: node.engine.pending_transactions().await.len(),
    }))
}

async fn seal_block(State(node): State<Arc<Node>>) -> Result<Json<Block>, ApiError> {
    Ok(Json(node.seal().await?))
}

async fn get_pending(State(node): State<Arc<Node>>) -> impl IntoResponse {
    let transactions = node.engine.pending_transactions().await;
    Json(serde_json::json!({
        "count": transactions.len(),
        "transactions": transactions
    }))
}

async fn get_block_references(
    State(node): State<Arc<Node>>,
) -> Result<Json<Vec<BlockReference>>, ApiError> {
    let refs = node
        .engine
        .persistence()
        .list_block_refs()
        .map_err(|e| ApiError::InternalError(e.to_string()))?;
    Ok(Json(refs))
}

async fn get_block(
    State(node): State<Arc<Node>>,
    Path(hash): Path<String>,
) -> Result<Json<BlockLookupResponse>, ApiError> {
    if let Some(block) = node.engine.lookup(&hash).await {
        return Ok(Json(BlockLookupResponse::Chain { block }));
    }

    let reference = node
        .engine
        .persistence()
        .find_block_ref(&hash)
        .map_err(|e| ApiError::InternalError(e.to_string()))?;

    reference
        .map(|reference| Json(BlockLookupResponse::Persistence { reference }))
        .ok_or_else(|| ApiError::NotFound("Block not found".to_string()))
}

async fn get_chain(State(node): State<Arc<Node>>) -> Json<Vec<BlockSummary>> {
    Json(node.engine.chain_snapshot().await)
}

async fn validate_chain(State(node): State<Arc<Node>>) -> Json<ValidationResponse> {
    Json(ValidationResponse {
        valid: node.engine.validate().await,
        signatures_valid: node.engine.verify_transaction_signatures().await,
        height: node.engine.height().await,
    })
}

async fn get_api_stats(State(node): State<Arc<Node>>) -> impl IntoResponse {
    Json(node.get_stats().await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::Blockchain;

    #[test]
    fn test_token_matching() {
        let engine = ChainEngine::new(Blockchain::new(1).unwrap());
        let node = Node::new(engine, &ApiConfig::default());
        assert!(node.token_matches(Some("Bearer securetoken")));
        assert!(node.token_matches(Some("bearer securetoken")));
        assert!(!node.token_matches(Some("Bearer wrong")));
        assert!(!node.token_matches(Some("securetoken")));
        assert!(!node.token_matches(None));
    }

    #[test]
    fn test_error_status_codes() {
        let status = |e: ApiError| e.into_response().status();
        assert_eq!(status(ChainError::EmptyPool.into()), StatusCode::CONFLICT);
        assert_eq!(status(ChainError::MiningAborted.into()), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            status(ChainError::InvalidTransaction("x".into()).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status(ApiError::Unauthorized), StatusCode::UNAUTHORIZED);
        assert_eq!(status(ApiError::NotFound("x".into())), StatusCode::NOT_FOUND);
    }
}
