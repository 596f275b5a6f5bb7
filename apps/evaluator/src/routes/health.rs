use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Returns service status plus the configured judge providers and store backend.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": env!("CARGO_PKG_NAME"),
        "site_id": state.config.site.site_id,
        "site_base_url": state.config.site.base_url,
        "providers": state.orchestrator.provider_names(),
        "store": state.orchestrator.store_backend(),
        "cached_prompts": state.orchestrator.cached_prompt_count().await,
    }))
}
