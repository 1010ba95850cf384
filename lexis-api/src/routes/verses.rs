//! GET /verses/:source
//!
//! Verses ordered by number, filtered by `from`/`to` (inclusive verse
//! numbers), `modified` (inclusive time range) and capped by `limit`.

use axum::{
    extract::{Path, State},
    Json,
};
use lexis_core::{ParamMap, ParamValue, Rejection};
use lexis_storage::VerseFilter;
use serde_json::Value as JsonValue;

use crate::error::{ApiError, ApiResult, ErrorCode};
use crate::extractors::QueryParams;
use crate::state::AppState;

/// Build the store filter from validated parameters.
pub fn verse_filter(params: &ParamMap) -> ApiResult<VerseFilter> {
    let limit = params.get("limit").and_then(ParamValue::as_i64);
    if limit.is_some_and(|limit| limit < 0) {
        return Err(ApiError::new(
            ErrorCode::InvalidParameter,
            "Invalid or missing query param limit",
        )
        .with_details(serde_json::json!({
            "param": "limit",
            "reason": Rejection::NotAllowed,
        })));
    }
    Ok(VerseFilter {
        from: params.get("from").and_then(ParamValue::as_i64),
        to: params.get("to").and_then(ParamValue::as_i64),
        modified: params.get("modified").and_then(ParamValue::as_time_range),
        limit,
    })
}

pub async fn list_verses(
    State(state): State<AppState>,
    QueryParams(params): QueryParams,
    Path(source): Path<String>,
) -> ApiResult<Json<Vec<JsonValue>>> {
    let filter = verse_filter(&params)?;
    let documents = state.documents().await?;
    let verses = documents.list_verses(&source, &filter).await?;
    tracing::debug!(%source, count = verses.len(), "Verses listed");
    Ok(Json(verses))
}
