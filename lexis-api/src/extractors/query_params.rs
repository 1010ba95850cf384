//! Typed query parameter extractor.
//!
//! Resolves the parameter definitions registered for the request path and
//! runs the query string through the validator. Handlers receive a
//! [`ParamMap`] that is already checked and coerced.

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, Query},
    http::request::Parts,
};
use lexis_core::{extract, ParamMap, ParamRegistry};

use crate::error::{ApiError, ApiResult};

/// Validated, typed query parameters for the current request.
///
/// # Example
///
/// ```rust,ignore
/// async fn list_verses(QueryParams(params): QueryParams) -> ApiResult<impl IntoResponse> {
///     let limit = params.get("limit").and_then(ParamValue::as_i64);
///     // ...
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct QueryParams(pub ParamMap);

/// Split the raw query string into decoded pairs, keeping duplicates.
pub fn raw_pairs(parts: &Parts) -> ApiResult<Vec<(String, String)>> {
    match Query::<Vec<(String, String)>>::try_from_uri(&parts.uri) {
        Ok(Query(pairs)) => Ok(pairs),
        Err(e) => Err(ApiError::invalid_input(format!("Malformed query string: {}", e))),
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for QueryParams
where
    S: Send + Sync,
    Arc<ParamRegistry>: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let registry = Arc::<ParamRegistry>::from_ref(state);
        let definitions = registry.resolve_params(parts.uri.path());
        let raw = raw_pairs(parts)?;

        match extract(&raw, &definitions) {
            Ok(params) => Ok(QueryParams(params)),
            Err(err) => {
                tracing::warn!(
                    param = err.name(),
                    reason = %err.reason(),
                    "{}",
                    err
                );
                Err(err.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use lexis_core::ParamValue;

    fn parts(uri: &str) -> Parts {
        let (parts, _) = Request::builder().uri(uri).body(()).unwrap().into_parts();
        parts
    }

    #[test]
    fn test_raw_pairs_decodes_and_keeps_duplicates() {
        let pairs = raw_pairs(&parts("/stub?param1=a%20b&param1=c")).unwrap();
        assert_eq!(
            pairs,
            vec![
                ("param1".to_string(), "a b".to_string()),
                ("param1".to_string(), "c".to_string()),
            ]
        );
    }

    #[test]
    fn test_raw_pairs_without_query() {
        assert!(raw_pairs(&parts("/stub")).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_extracts_with_registry_from_state() {
        let state = Arc::new(ParamRegistry::service_default().unwrap());
        let mut parts = parts("/verses/genesis?from=3&limit=10");

        let QueryParams(params) = QueryParams::from_request_parts(&mut parts, &state)
            .await
            .unwrap();
        assert_eq!(params.get("from"), Some(&ParamValue::Number(3)));
        assert_eq!(params.get("limit"), Some(&ParamValue::Number(10)));
        assert!(!params.contains("to"));
    }

    #[tokio::test]
    async fn test_rejects_unknown_key() {
        let state = Arc::new(ParamRegistry::service_default().unwrap());
        let mut parts = parts("/verses/genesis?verse=3");

        let err = QueryParams::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        assert_eq!(err.message, "Invalid or missing query param verse");
    }
}
