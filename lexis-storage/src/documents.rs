//! Document Store
//!
//! Words, roots and verses are stored as JSONB documents keyed by
//! `(collection, key)` in a single table. Every operation is one statement
//! on the handle obtained from the connection manager.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value as JsonValue};

use crate::error::{StorageError, StorageResult};
use crate::postgres::PgHandle;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS lexis_documents (
    collection  TEXT        NOT NULL,
    doc_key     TEXT        NOT NULL,
    body        JSONB       NOT NULL,
    updated_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
    PRIMARY KEY (collection, doc_key)
);
CREATE INDEX IF NOT EXISTS lexis_documents_root_idx
    ON lexis_documents ((body->>'language'), (body->>'root'))
    WHERE collection = 'words';
";

/// Document collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Words,
    Roots,
    Verses,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Words => "words",
            Collection::Roots => "roots",
            Collection::Verses => "verses",
        }
    }
}

/// Filters for listing the verses of one source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VerseFilter {
    /// Lowest verse number, inclusive.
    pub from: Option<i64>,
    /// Highest verse number, inclusive.
    pub to: Option<i64>,
    /// Only verses last modified inside this range, inclusive.
    pub modified: Option<(DateTime<Utc>, DateTime<Utc>)>,
    pub limit: Option<i64>,
}

/// Key of a language-scoped document: `language:term`.
pub fn scoped_key(language: &str, term: &str) -> String {
    format!("{}:{}", language, term)
}

/// Stamp identifying fields onto a document body before it is stored.
///
/// Non-object bodies are wrapped as `{"value": body}`.
pub fn stamp_word(body: JsonValue, language: &str, word: &str) -> JsonValue {
    let mut object = match body {
        JsonValue::Object(map) => map,
        other => {
            let mut map = Map::new();
            map.insert("value".to_string(), other);
            map
        }
    };
    object.insert("language".to_string(), JsonValue::String(language.to_string()));
    object.insert("word".to_string(), JsonValue::String(word.to_string()));
    JsonValue::Object(object)
}

/// Document operations over one live connection.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    handle: PgHandle,
}

impl DocumentStore {
    pub fn new(handle: PgHandle) -> Self {
        Self { handle }
    }

    /// Create the documents table if it does not exist.
    pub async fn ensure_schema(&self) -> StorageResult<()> {
        self.handle.client().batch_execute(SCHEMA).await?;
        Ok(())
    }

    async fn get(&self, collection: Collection, key: &str) -> StorageResult<Option<JsonValue>> {
        let row = self
            .handle
            .client()
            .query_opt(
                "SELECT body FROM lexis_documents WHERE collection = $1 AND doc_key = $2",
                &[&collection.as_str(), &key],
            )
            .await?;
        Ok(match row {
            Some(row) => Some(row.try_get(0)?),
            None => None,
        })
    }

    pub async fn get_word(&self, language: &str, word: &str) -> StorageResult<Option<JsonValue>> {
        self.get(Collection::Words, &scoped_key(language, word)).await
    }

    pub async fn get_root(&self, language: &str, root: &str) -> StorageResult<Option<JsonValue>> {
        self.get(Collection::Roots, &scoped_key(language, root)).await
    }

    /// Insert or replace a word document and return what was stored.
    pub async fn put_word(
        &self,
        language: &str,
        word: &str,
        body: JsonValue,
    ) -> StorageResult<JsonValue> {
        let body = stamp_word(body, language, word);
        let row = self
            .handle
            .client()
            .query_one(
                "INSERT INTO lexis_documents (collection, doc_key, body)
                 VALUES ($1, $2, $3)
                 ON CONFLICT (collection, doc_key)
                 DO UPDATE SET body = EXCLUDED.body, updated_at = now()
                 RETURNING body",
                &[&Collection::Words.as_str(), &scoped_key(language, word), &body],
            )
            .await?;
        Ok(row.try_get(0)?)
    }

    /// Word documents whose `root` field names `root`, ordered by key.
    pub async fn words_by_root(&self, language: &str, root: &str) -> StorageResult<Vec<JsonValue>> {
        let rows = self
            .handle
            .client()
            .query(
                "SELECT body FROM lexis_documents
                 WHERE collection = $1 AND body->>'language' = $2 AND body->>'root' = $3
                 ORDER BY doc_key",
                &[&Collection::Words.as_str(), &language, &root],
            )
            .await?;
        rows.iter()
            .map(|row| row.try_get::<_, JsonValue>(0).map_err(StorageError::from))
            .collect()
    }

    /// Verses of `source` ordered by verse number.
    pub async fn list_verses(
        &self,
        source: &str,
        filter: &VerseFilter,
    ) -> StorageResult<Vec<JsonValue>> {
        let (modified_from, modified_to) = match filter.modified {
            Some((start, end)) => (Some(start), Some(end)),
            None => (None, None),
        };
        let rows = self
            .handle
            .client()
            .query(
                "SELECT body FROM lexis_documents
                 WHERE collection = $1
                   AND body->>'source' = $2
                   AND ($3::BIGINT IS NULL OR (body->>'number')::BIGINT >= $3)
                   AND ($4::BIGINT IS NULL OR (body->>'number')::BIGINT <= $4)
                   AND ($5::TIMESTAMPTZ IS NULL OR updated_at >= $5)
                   AND ($6::TIMESTAMPTZ IS NULL OR updated_at <= $6)
                 ORDER BY (body->>'number')::BIGINT
                 LIMIT $7",
                &[
                    &Collection::Verses.as_str(),
                    &source,
                    &filter.from,
                    &filter.to,
                    &modified_from,
                    &modified_to,
                    &filter.limit,
                ],
            )
            .await?;
        rows.iter()
            .map(|row| row.try_get::<_, JsonValue>(0).map_err(StorageError::from))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scoped_key() {
        assert_eq!(scoped_key("heb", "shalom"), "heb:shalom");
    }

    #[test]
    fn test_stamp_word_overrides_identity_fields() {
        let body = stamp_word(json!({"word": "other", "gloss": "peace"}), "heb", "shalom");
        assert_eq!(body["word"], "shalom");
        assert_eq!(body["language"], "heb");
        assert_eq!(body["gloss"], "peace");
    }

    #[test]
    fn test_stamp_word_wraps_scalars() {
        let body = stamp_word(json!("peace"), "heb", "shalom");
        assert_eq!(body["value"], "peace");
    }

    #[test]
    fn test_collection_names() {
        assert_eq!(Collection::Words.as_str(), "words");
        assert_eq!(Collection::Verses.as_str(), "verses");
    }
}
