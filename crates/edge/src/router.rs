// crates/edge/src/router.rs

//! The relay's single routing table.
//!
//! Every handler forwards to the upstream port, running outbound block
//! mapping on the way in where the body carries descriptors. Upstream JSON is
//! returned verbatim; failures use the `{error, details?}` envelope.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::{get, post, put},
    Json, Router,
};
use domain::block::{BlockDescriptor, BlockKind};
use serde::Deserialize;
use serde_json::{json, Value};
use serve::{flow, flow::EditReport, transform};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info};

use crate::{state::AppState, ApiError};

type ApiResult<T = Value> = Result<Json<T>, ApiError>;

const HEALTH_MESSAGE: &str = "Notion relay is running";

// ─────────────────────────────────────────────────────────────────────────────
// Router construction
// ─────────────────────────────────────────────────────────────────────────────

/// Build the relay router. Any `OPTIONS` request is answered by the CORS layer
/// with 200 and permissive headers before routing.
#[tracing::instrument(skip_all)]
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/database", get(get_database))
        .route("/api/page", post(create_page))
        .route(
            "/api/page/{id}",
            get(get_page)
                .patch(update_page)
                .post(page_action)
                .delete(archive_page),
        )
        .route("/api/page/{id}/content", put(replace_content))
        .route(
            "/api/blocks/{id}",
            get(get_blocks).patch(update_block).delete(delete_block),
        )
        .route("/api/blocks/{id}/append", post(append_blocks))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
}

// ─────────────────────────────────────────────────────────────────────────────
// Request bodies
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct CreatePageBody {
    properties: Option<Value>,
    #[serde(default)]
    blocks: Vec<BlockDescriptor>,
}

#[derive(Debug, Deserialize)]
struct PropertiesBody {
    properties: Option<Value>,
}

/// Form used by clients that can only POST: `{action: "update"|"delete"}`.
#[derive(Debug, Deserialize)]
struct PageActionBody {
    action: Option<String>,
    properties: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct EditContentBody {
    properties: Option<Value>,
    #[serde(default)]
    blocks: Vec<BlockDescriptor>,
}

#[derive(Debug, Deserialize)]
struct AppendBody {
    #[serde(default)]
    blocks: Vec<BlockDescriptor>,
}

#[derive(Debug, Deserialize)]
struct UpdateBlockBody {
    content: BlockContent,
}

#[derive(Debug, Deserialize)]
struct BlockContent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(v)| v)
        .map_err(|rejection| ApiError::bad_request("Invalid request body").with_details(rejection.body_text()))
}

/// Upstream ids are UUIDs, with or without dashes.
fn checked_id(id: &str) -> Result<&str, ApiError> {
    let valid = !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
    if valid {
        Ok(id)
    } else {
        Err(ApiError::bad_request("Invalid ID").with_details(id.to_owned()))
    }
}

fn required_properties(properties: Option<Value>) -> Result<Value, ApiError> {
    properties.ok_or_else(|| ApiError::bad_request("Properties are required"))
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

#[tracing::instrument(skip_all)]
async fn health() -> Json<Value> {
    Json(json!({ "status": "OK", "message": HEALTH_MESSAGE }))
}

#[tracing::instrument(skip_all)]
async fn get_database(State(state): State<AppState>) -> ApiResult {
    let database_id = state.database_id()?;
    state
        .upstream()
        .query_database(database_id)
        .await
        .map(Json)
        .map_err(|e| ApiError::failed("Failed to fetch database", e))
}

#[tracing::instrument(skip_all)]
async fn get_page(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult {
    let id = checked_id(&id)?;
    state
        .upstream()
        .retrieve_page(id)
        .await
        .map(Json)
        .map_err(|e| ApiError::failed("Failed to fetch page", e))
}

#[tracing::instrument(skip_all)]
async fn create_page(
    State(state): State<AppState>,
    payload: Result<Json<CreatePageBody>, JsonRejection>,
) -> ApiResult {
    let database_id = state.database_id()?;
    let CreatePageBody { properties, blocks } = body(payload)?;
    let properties = required_properties(properties)?;

    let page = flow::create_page(state.upstream(), database_id, properties, &blocks)
        .await
        .map_err(|e| ApiError::failed("Failed to create page", e))?;
    let page_id = page.get("id").and_then(Value::as_str).unwrap_or("?");
    info!("Created page {}", page_id);
    Ok(Json(page))
}

#[tracing::instrument(skip_all)]
async fn update_page(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<PropertiesBody>, JsonRejection>,
) -> ApiResult {
    let id = checked_id(&id)?;
    let properties = required_properties(body(payload)?.properties)?;
    state
        .upstream()
        .update_page(id, properties)
        .await
        .map(Json)
        .map_err(|e| ApiError::failed("Failed to update page", e))
}

#[tracing::instrument(skip_all)]
async fn archive_page(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult {
    let id = checked_id(&id)?;
    state
        .upstream()
        .archive_page(id)
        .await
        .map(Json)
        .map_err(|e| ApiError::failed("Failed to delete page", e))
}

#[tracing::instrument(skip_all)]
async fn page_action(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<PageActionBody>, JsonRejection>,
) -> ApiResult {
    let id = checked_id(&id)?;
    let PageActionBody { action, properties } = body(payload)?;
    debug!("page action {:?} on {}", action, id);

    match action.as_deref() {
        Some("update") => state
            .upstream()
            .update_page(id, required_properties(properties)?)
            .await
            .map(Json)
            .map_err(|e| ApiError::failed("Failed to update page", e)),
        Some("delete") => state
            .upstream()
            .archive_page(id)
            .await
            .map(Json)
            .map_err(|e| ApiError::failed("Failed to delete page", e)),
        _ => Err(ApiError::bad_request("Invalid action")),
    }
}

#[tracing::instrument(skip_all)]
async fn replace_content(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<EditContentBody>, JsonRejection>,
) -> ApiResult<EditReport> {
    let id = checked_id(&id)?;
    let EditContentBody { properties, blocks } = body(payload)?;

    flow::edit_page(state.upstream(), id, properties, &blocks)
        .await
        .map(Json)
        .map_err(|e| ApiError::failed("Failed to update page content", e))
}

#[tracing::instrument(skip_all)]
async fn get_blocks(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult {
    let id = checked_id(&id)?;
    state
        .upstream()
        .list_children(id)
        .await
        .map(Json)
        .map_err(|e| ApiError::failed("Failed to fetch blocks", e))
}

#[tracing::instrument(skip_all)]
async fn append_blocks(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<AppendBody>, JsonRejection>,
) -> ApiResult {
    let id = checked_id(&id)?;
    let AppendBody { blocks } = body(payload)?;
    let children = transform::to_upstream_blocks(&blocks);
    debug!("appending {} of {} blocks to {}", children.len(), blocks.len(), id);

    state
        .upstream()
        .append_children(id, children)
        .await
        .map(Json)
        .map_err(|e| ApiError::failed("Failed to append blocks", e))
}

#[tracing::instrument(skip_all)]
async fn delete_block(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult {
    let id = checked_id(&id)?;
    state
        .upstream()
        .delete_block(id)
        .await
        .map(Json)
        .map_err(|e| ApiError::failed("Failed to delete block", e))
}

#[tracing::instrument(skip_all)]
async fn update_block(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateBlockBody>, JsonRejection>,
) -> ApiResult {
    let id = checked_id(&id)?;
    let BlockContent { kind, text } = body(payload)?.content;
    let kind: BlockKind = kind
        .parse()
        .map_err(|e| ApiError::failed("Failed to update block", e))?;
    let block = transform::build_block(kind, text.as_deref().unwrap_or_default());

    state
        .upstream()
        .update_block(id, block)
        .await
        .map(Json)
        .map_err(|e| ApiError::failed("Failed to update block", e))
}
