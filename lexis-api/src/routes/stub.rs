//! GET /stub
//!
//! Echoes the validated query parameters. Used to check the parameter
//! pipeline without touching the database.

use axum::Json;
use lexis_core::ParamMap;

use crate::extractors::QueryParams;

pub async fn stub(QueryParams(params): QueryParams) -> Json<ParamMap> {
    Json(params)
}
