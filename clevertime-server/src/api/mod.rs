//! HTTP API endpoints

use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use clevertime_core::advisor::{
    generate_suggestions, parse_create_table, Column, GlobalData, RemoteParser, Suggestion,
};
use clevertime_core::allocation::{presets, AdjustMode, AllocationSet};
use clevertime_core::dialect::{self, Dialect};
use clevertime_core::emitter::{ConfigEmitter, EmitterMapping};
use clevertime_core::mitoviz::{FileSort, PartitionFilter, ScanMetrics, ScanView};
use clevertime_core::panels::Panel;
use clevertime_core::AdvisorError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::ServerConfig;

/// Shared, read-only server context
pub struct AppContext {
    emitter: ConfigEmitter,
    parser: RemoteParser,
}

/// Application state
pub type AppState = Arc<AppContext>;

/// Build the state from the server configuration
pub fn build_state(config: &ServerConfig) -> clevertime_core::Result<AppState> {
    Ok(Arc::new(AppContext {
        emitter: ConfigEmitter::default(),
        parser: RemoteParser::new(config.parse_server.clone())?,
    }))
}

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(health))
        .route("/ping", get(ping))
        .route("/panels", get(panels))

        // Cache calculator
        .route("/api/cache/presets", get(cache_presets))
        .route("/api/cache/adjust", post(cache_adjust))
        .route("/api/cache/capacity", post(cache_capacity))
        .route("/api/cache/emit", post(cache_emit))

        // Model advisor
        .route("/api/model/parse", post(model_parse))
        .route("/api/model/suggest", post(model_suggest))

        // SQL formatter
        .route("/api/sql/convert", post(sql_convert))

        // Scan metrics
        .route("/api/mitoviz/render", post(mitoviz_render))

        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PanelInfo {
    pub key: String,
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub struct AdjustRequest {
    pub set: AllocationSet,
    pub part_id: String,
    pub value: f64,
    #[serde(default = "default_mode")]
    pub mode: AdjustMode,
}

fn default_mode() -> AdjustMode {
    AdjustMode::Percent
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AdjustResponse {
    /// False when the adjustment was declined and the set is unchanged
    pub applied: bool,
    pub set: AllocationSet,
}

#[derive(Debug, Deserialize)]
pub struct CapacityRequest {
    pub set: AllocationSet,
    pub total: f64,
}

#[derive(Debug, Deserialize)]
pub struct CategorySet {
    /// Mapping category; defaults to the set id
    #[serde(default)]
    pub category: Option<String>,
    pub set: AllocationSet,
}

#[derive(Debug, Deserialize)]
pub struct EmitRequest {
    pub sets: Vec<CategorySet>,
    #[serde(default)]
    pub mapping: Option<EmitterMapping>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EmitResponse {
    pub config: String,
}

#[derive(Debug, Deserialize)]
pub struct ParseRequest {
    pub sql: String,
    /// Parse on this database server instead of locally
    #[serde(default)]
    pub server: Option<String>,
    /// Parse on the configured database server
    #[serde(default)]
    pub remote: bool,
}

#[derive(Debug, Deserialize)]
pub struct SuggestRequest {
    pub columns: Vec<Column>,
    #[serde(default)]
    pub global: GlobalData,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SuggestResponse {
    pub suggestions: Vec<Suggestion>,
}

#[derive(Debug, Deserialize)]
pub struct ConvertRequest {
    pub sql: String,
    pub from: Dialect,
    pub to: Dialect,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConvertResponse {
    pub sql: String,
}

#[derive(Debug, Deserialize)]
pub struct RenderRequest {
    pub data: ScanMetrics,
    #[serde(default)]
    pub sort: FileSort,
    #[serde(flatten)]
    pub filter: PartitionFilter,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(e: AdvisorError) -> ApiError {
    let status = if e.is_user_error() {
        StatusCode::BAD_REQUEST
    } else if e.is_remote() {
        StatusCode::BAD_GATEWAY
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(ErrorResponse { error: e.to_string() }))
}

// ============================================================================
// Handlers
// ============================================================================

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: clevertime_core::VERSION.to_string(),
    })
}

async fn ping() -> &'static str {
    "pong"
}

async fn panels() -> Json<Vec<PanelInfo>> {
    Json(
        Panel::ALL
            .iter()
            .map(|p| PanelInfo {
                key: p.key().to_string(),
                title: p.title().to_string(),
            })
            .collect(),
    )
}

async fn cache_presets() -> Result<Json<Vec<AllocationSet>>, ApiError> {
    let sets = presets()
        .into_iter()
        .map(AllocationSet::new)
        .collect::<clevertime_core::Result<Vec<_>>>()
        .map_err(api_error)?;
    Ok(Json(sets))
}

async fn cache_adjust(Json(req): Json<AdjustRequest>) -> Result<Json<AdjustResponse>, ApiError> {
    let mut set = req.set;
    set.validate().map_err(api_error)?;

    let applied = set.adjust_part(&req.part_id, req.value, req.mode);
    Ok(Json(AdjustResponse { applied, set }))
}

async fn cache_capacity(Json(req): Json<CapacityRequest>) -> Result<Json<AllocationSet>, ApiError> {
    let mut set = req.set;
    set.validate().map_err(api_error)?;

    set.set_total_capacity(req.total);
    Ok(Json(set))
}

async fn cache_emit(
    State(state): State<AppState>,
    Json(req): Json<EmitRequest>,
) -> Result<Json<EmitResponse>, ApiError> {
    for entry in &req.sets {
        entry.set.validate().map_err(api_error)?;
    }

    let custom = match req.mapping {
        Some(mapping) => {
            mapping.validate().map_err(api_error)?;
            Some(ConfigEmitter::new(mapping))
        }
        None => None,
    };
    let emitter = custom.as_ref().unwrap_or(&state.emitter);

    let config = emitter.emit(
        req.sets
            .iter()
            .map(|e| (e.category.as_deref().unwrap_or(e.set.id.as_str()), &e.set)),
    );
    Ok(Json(EmitResponse { config }))
}

async fn model_parse(
    State(state): State<AppState>,
    Json(req): Json<ParseRequest>,
) -> Result<Json<Vec<Column>>, ApiError> {
    let columns = match req.server {
        Some(server) => state.parser.at(server).parse(&req.sql).await,
        None if req.remote => state.parser.parse(&req.sql).await,
        None => parse_create_table(&req.sql),
    }
    .map_err(api_error)?;

    info!("Parsed {} columns", columns.len());
    Ok(Json(columns))
}

async fn model_suggest(Json(req): Json<SuggestRequest>) -> Json<SuggestResponse> {
    let mut suggestions = generate_suggestions(&req.columns, &req.global);
    if suggestions.is_empty() {
        suggestions.push(Suggestion::all_good());
    }
    Json(SuggestResponse { suggestions })
}

async fn sql_convert(Json(req): Json<ConvertRequest>) -> Json<ConvertResponse> {
    Json(ConvertResponse {
        sql: dialect::convert(&req.sql, req.from, req.to),
    })
}

async fn mitoviz_render(Json(req): Json<RenderRequest>) -> Json<ScanView> {
    Json(req.data.render(req.sort, &req.filter))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app() -> Router {
        create_router(build_state(&ServerConfig::default()).unwrap())
    }

    async fn call(method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        let request = match body {
            Some(body) => request.body(Body::from(body.to_string())).unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = app().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn memory_set() -> Value {
        let (_, presets) = call("GET", "/api/cache/presets", None).await;
        presets[0].clone()
    }

    #[tokio::test]
    async fn test_health_and_panels() {
        let (status, body) = call("GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");

        let (_, body) = call("GET", "/panels", None).await;
        assert_eq!(body.as_array().unwrap().len(), 4);
        assert_eq!(body[1]["key"], "cache");
    }

    #[tokio::test]
    async fn test_cache_adjust() {
        let set = memory_set().await;

        let (status, body) = call(
            "POST",
            "/api/cache/adjust",
            Some(json!({"set": set, "part_id": "meta", "value": 25.0})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["applied"], true);
        assert_eq!(body["set"]["parts"][0]["percentage"], 25.0);

        let (_, body) = call(
            "POST",
            "/api/cache/adjust",
            Some(json!({"set": set, "part_id": "nope", "value": 10.0, "mode": "percent"})),
        )
        .await;
        assert_eq!(body["applied"], false);
        assert_eq!(body["set"], set);
    }

    #[tokio::test]
    async fn test_cache_adjust_rejects_invalid_set() {
        let mut set = memory_set().await;
        set["parts"][0]["percentage"] = json!(95.0);

        let (status, body) = call(
            "POST",
            "/api/cache/adjust",
            Some(json!({"set": set, "part_id": "meta", "value": 10.0})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("Configuration error"));
    }

    #[tokio::test]
    async fn test_cache_capacity_rejects_out_of_bounds_set() {
        let mut set = memory_set().await;
        set["total_capacity"] = json!(10000.0);

        let (status, body) = call(
            "POST",
            "/api/cache/capacity",
            Some(json!({"set": set, "total": 64})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("outside"));
    }

    #[tokio::test]
    async fn test_cache_capacity_and_emit() {
        let set = memory_set().await;
        let (_, set) = call(
            "POST",
            "/api/cache/capacity",
            Some(json!({"set": set, "total": 256})),
        )
        .await;
        assert_eq!(set["total_capacity"], 256.0);

        let (status, body) = call("POST", "/api/cache/emit", Some(json!({"sets": [{"set": set}]}))).await;
        assert_eq!(status, StatusCode::OK);
        let config = body["config"].as_str().unwrap();
        assert!(config.contains("page_cache_size = \"128GB\""));
    }

    #[tokio::test]
    async fn test_model_parse_and_suggest() {
        let sql = "CREATE TABLE t (host STRING, ts TIMESTAMP, TIME INDEX (ts), PRIMARY KEY (host))";
        let (status, columns) = call("POST", "/api/model/parse", Some(json!({"sql": sql}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(columns[0]["index"], "primary");
        assert_eq!(columns[1]["semanticType"], "timestamp");

        let (_, body) = call(
            "POST",
            "/api/model/suggest",
            Some(json!({"columns": columns, "global": {"hasDuplicates": false}})),
        )
        .await;
        assert_eq!(body["suggestions"][0]["title"], "All Good");

        let (status, _) = call("POST", "/api/model/parse", Some(json!({"sql": "DROP TABLE t"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_sql_convert() {
        let (_, body) = call(
            "POST",
            "/api/sql/convert",
            Some(json!({"sql": "SELECT \"a\" FROM t", "from": "postgresql", "to": "mysql"})),
        )
        .await;
        assert_eq!(body["sql"], "SELECT `a` FROM t");
    }

    #[tokio::test]
    async fn test_mitoviz_render() {
        let data = json!({
            "num_files": 1,
            "files": [{
                "file_id": "fb5e2e46-3ec7-49b0-9b1f-105d20c1c426",
                "time_range_start": "1000::Millisecond",
                "time_range_end": "2000::Millisecond",
                "rows": 10, "size": 2048, "index_size": 0
            }],
            "metrics_per_partition": [{"partition": 0, "metrics": {"scan_cost": "1ms"}}]
        });
        let (status, body) = call(
            "POST",
            "/api/mitoviz/render",
            Some(json!({"data": data, "sort": "size"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["files"][0]["size"], "2.0 KB");
        assert_eq!(body["summary"][0]["value"], "1.000ms");
        assert_eq!(body["bars"][0]["width_percent"], 100.0);
    }
}
