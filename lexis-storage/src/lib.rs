//! LEXIS Storage - Connection Lifecycle and Documents
//!
//! This crate owns the service's single logical database connection. The
//! [`ConnectionManager`] establishes it with bounded fixed-interval retry,
//! keeps it alive with a periodic ping, reconnects on failure and hands the
//! live handle to request handlers through [`ConnectionManager::await_ready`].
//!
//! The manager is generic over a [`Connector`]; [`PgConnector`] is the
//! PostgreSQL implementation and [`DocumentStore`] the JSONB document
//! operations run on its handle.

pub mod config;
pub mod documents;
pub mod error;
pub mod lifecycle;
pub mod postgres;

pub use config::LifecycleConfig;
pub use documents::{Collection, DocumentStore, VerseFilter};
pub use error::{StorageError, StorageResult};
pub use lifecycle::{ConnectionManager, ConnectionState, Connector, StateTransition};
pub use postgres::{DbConfig, PgConnector, PgHandle};

/// Manager over the production PostgreSQL connector.
pub type PgConnectionManager = ConnectionManager<PgConnector>;
