//! GET /roots/:language/:root
//!
//! With `words=true` the root document gains a `words` array holding every
//! word document that names this root.

use axum::{
    extract::{Path, State},
    Json,
};
use lexis_core::ParamValue;
use serde_json::Value as JsonValue;

use crate::error::{ApiError, ApiResult};
use crate::extractors::QueryParams;
use crate::state::AppState;

pub async fn get_root(
    State(state): State<AppState>,
    QueryParams(params): QueryParams,
    Path((language, root)): Path<(String, String)>,
) -> ApiResult<Json<JsonValue>> {
    let documents = state.documents().await?;
    let mut document = documents
        .get_root(&language, &root)
        .await?
        .ok_or_else(|| ApiError::document_not_found("Root", format!("{}/{}", language, root)))?;

    let with_words = params
        .get("words")
        .and_then(ParamValue::as_bool)
        .unwrap_or(false);
    if with_words {
        let words = documents.words_by_root(&language, &root).await?;
        match document.as_object_mut() {
            Some(object) => {
                object.insert("words".to_string(), JsonValue::Array(words));
            }
            None => {
                return Err(ApiError::internal_error(format!(
                    "Root {}/{} is not an object",
                    language, root
                )))
            }
        }
    }

    Ok(Json(document))
}
