use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::Json;
use serde_json::{json, Value};
use ssot_binder::{BinderHandle, BinderSnapshot, CandidateOutcome, EntryProof, EntrySnapshot};

use crate::error::{ServerError, ServerResult};

/// Shared router state.
pub type AppState = Arc<BinderHandle>;

/// Liveness probe.
pub async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "alive" }))
}

/// Readiness probe for container orchestrators.
pub async fn readiness_handler() -> Json<Value> {
    Json(json!({ "ok": true, "ts": chrono::Utc::now().timestamp_millis() }))
}

/// Service and registry summary.
pub async fn info_handler(State(handle): State<AppState>) -> ServerResult<Json<Value>> {
    let binder = handle.get()?;
    Ok(Json(json!({
        "name": "ssot-server",
        "version": env!("CARGO_PKG_VERSION"),
        "capsule_id": binder.capsule_id(),
        "entries": binder.len(),
        "merkle_root": binder.merkle_root(),
    })))
}

/// Full registry snapshot with Merkle root.
pub async fn binder_handler(State(handle): State<AppState>) -> ServerResult<Json<BinderSnapshot>> {
    Ok(Json(handle.get()?.snapshot()))
}

/// One entry annotated with its leaf hash.
pub async fn entry_handler(
    State(handle): State<AppState>,
    Path(artifact_id): Path<String>,
) -> ServerResult<Json<Value>> {
    let binder = handle.get()?;
    let entry = binder
        .get_entry(&artifact_id)
        .ok_or_else(|| ServerError::ArtifactNotFound(artifact_id.clone()))?;
    let snapshot = EntrySnapshot {
        entry: entry.clone(),
        leaf_hash: entry.leaf_hash(),
    };
    serde_json::to_value(snapshot)
        .map(Json)
        .map_err(|e| ServerError::Internal(e.to_string()))
}

/// Merkle inclusion proof for one entry.
pub async fn proof_handler(
    State(handle): State<AppState>,
    Path(artifact_id): Path<String>,
) -> ServerResult<Json<EntryProof>> {
    let binder = handle.get()?;
    binder
        .prove(&artifact_id)
        .map(Json)
        .ok_or(ServerError::ArtifactNotFound(artifact_id))
}

/// Validate a candidate and preview the root it would produce.
pub async fn validate_handler(
    State(handle): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> ServerResult<Json<CandidateOutcome>> {
    let Json(candidate) = body?;
    let binder = handle.get()?;
    let outcome = binder.validate_candidate(&candidate);
    tracing::debug!(valid = outcome.is_valid(), "candidate validated");
    Ok(Json(outcome))
}
