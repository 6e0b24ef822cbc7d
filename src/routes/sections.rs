//! Section config routes, mounted once per section.
//!
//! Every handler is generic over the card type, so the same router serves
//! solutions, markets and visual solutions. Handlers translate store
//! results into status codes; the store itself never errors.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::http::StatusCode;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use serde::{Deserialize, Serialize};

use crate::cards::{Card, SectionConfig};
use crate::store::validate::{self, ValidationError};
use crate::store::{ConfigStore, ImportOutcome};

type Store<C> = Arc<ConfigStore<C>>;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Deserialize)]
pub struct GenerateIdBody {
    pub label: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct GeneratedId {
    pub id: String,
}

pub fn section_routes<C: Card>(store: Store<C>) -> Router {
    Router::new()
        .route("/", get(get_section::<C>).put(put_section::<C>).delete(reset_section::<C>))
        .route("/public", get(public_section::<C>))
        .route("/export.json", get(export_section::<C>))
        .route("/import.json", post(import_section::<C>))
        .route("/ids", post(generate_section_id::<C>))
        .route("/pull", post(pull_section::<C>))
        .route("/publish", post(publish_section::<C>))
        .with_state(store)
}

pub(crate) fn validation_error_response(err: &ValidationError) -> (StatusCode, Json<ErrorBody>) {
    (StatusCode::UNPROCESSABLE_ENTITY, Json(ErrorBody { error: err.to_string() }))
}

/// `GET /`: current config, or the compiled-in default.
pub async fn get_section<C: Card>(State(store): State<Store<C>>) -> Json<SectionConfig<C>> {
    Json(store.safe_get_config_or_defaults())
}

/// `GET /public`: only the cards public pages should render.
pub async fn public_section<C: Card>(State(store): State<Store<C>>) -> Json<SectionConfig<C>> {
    Json(store.safe_get_config_or_defaults().published())
}

/// `PUT /`: validate and save a full config.
pub async fn put_section<C: Card>(
    State(store): State<Store<C>>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<SectionConfig<C>>, (StatusCode, Json<ErrorBody>)> {
    let config = validate::decode::<C>(&body).map_err(|e| validation_error_response(&e))?;

    if !store.save_config(&config) {
        return Err((
            StatusCode::INSUFFICIENT_STORAGE,
            Json(ErrorBody { error: "Failed to save configuration".to_owned() }),
        ));
    }
    Ok(Json(store.safe_get_config_or_defaults()))
}

/// `DELETE /`: drop the local override.
pub async fn reset_section<C: Card>(State(store): State<Store<C>>) -> StatusCode {
    store.reset_to_defaults();
    StatusCode::NO_CONTENT
}

/// `GET /export.json`: downloadable pretty-printed config.
pub async fn export_section<C: Card>(State(store): State<Store<C>>) -> Response {
    let payload = store.export_config();
    (
        [
            (CONTENT_TYPE, format!("{}; charset=utf-8", payload.mime)),
            (CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", payload.file_name)),
        ],
        Body::from(payload.body),
    )
        .into_response()
}

/// `POST /import.json`: raw exported JSON in the body.
pub async fn import_section<C: Card>(
    State(store): State<Store<C>>,
    body: String,
) -> (StatusCode, Json<ImportOutcome>) {
    let outcome = store.import_config(&body);
    let status = if outcome.success { StatusCode::OK } else { StatusCode::BAD_REQUEST };
    (status, Json(outcome))
}

/// `POST /ids`: unused id for a new card label.
pub async fn generate_section_id<C: Card>(
    State(store): State<Store<C>>,
    Json(body): Json<GenerateIdBody>,
) -> Json<GeneratedId> {
    Json(GeneratedId { id: store.generate_id(&body.label) })
}

/// `POST /pull`: refresh from the remote table.
pub async fn pull_section<C: Card>(State(store): State<Store<C>>) -> Result<Json<SectionConfig<C>>, StatusCode> {
    store.fetch_from_supabase().await.map(Json).ok_or(StatusCode::NOT_FOUND)
}

/// `POST /publish`: push the current local config to the remote table.
pub async fn publish_section<C: Card>(State(store): State<Store<C>>) -> StatusCode {
    let current = store.safe_get_config_or_defaults();
    if store.save_to_supabase(&current).await {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::BAD_GATEWAY
    }
}

#[cfg(test)]
#[path = "sections_test.rs"]
mod tests;
