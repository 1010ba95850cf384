//! Word documents.
//!
//! - `GET /words/:language/:word` with optional `fields` projection
//! - `PUT /words/:language/:word` to insert or replace

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use lexis_core::{ParamMap, ParamValue};
use serde_json::{Map, Value as JsonValue};

use crate::error::{ApiError, ApiResult};
use crate::extractors::QueryParams;
use crate::state::AppState;

/// Keep only the requested top-level fields of an object document.
///
/// Without `fields`, or for non-object documents, the document is returned
/// whole. Requested fields the document lacks are skipped.
pub fn project(document: JsonValue, params: &ParamMap) -> JsonValue {
    let Some(fields) = params.get("fields").and_then(ParamValue::as_array) else {
        return document;
    };
    match document {
        JsonValue::Object(mut object) => {
            let mut projected = Map::new();
            for field in fields {
                if let Some(value) = object.remove(field) {
                    projected.insert(field.clone(), value);
                }
            }
            JsonValue::Object(projected)
        }
        other => other,
    }
}

/// GET /words/:language/:word
pub async fn get_word(
    State(state): State<AppState>,
    QueryParams(params): QueryParams,
    Path((language, word)): Path<(String, String)>,
) -> ApiResult<Json<JsonValue>> {
    let documents = state.documents().await?;
    let document = documents
        .get_word(&language, &word)
        .await?
        .ok_or_else(|| ApiError::document_not_found("Word", format!("{}/{}", language, word)))?;
    Ok(Json(project(document, &params)))
}

/// PUT /words/:language/:word
pub async fn put_word(
    State(state): State<AppState>,
    QueryParams(params): QueryParams,
    Path((language, word)): Path<(String, String)>,
    body: Result<Json<JsonValue>, JsonRejection>,
) -> ApiResult<Json<JsonValue>> {
    let Json(body) = body.map_err(|e| ApiError::invalid_input(e.body_text()))?;
    let documents = state.documents().await?;
    let stored = documents.put_word(&language, &word, body).await?;
    tracing::debug!(%language, %word, "Word stored");
    Ok(Json(project(stored, &params)))
}
