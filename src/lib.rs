//! # pleme-helpdesk
//!
//! Support ticket backend for Pleme learning products.
//!
//! ## Features
//!
//! - **Ticket Lifecycle** - Status/priority state machine with assignment and first-reply rules
//! - **Message Threads** - Public messages, internal notes, per-reader unread tracking
//! - **CSAT Ratings** - Satisfaction rating (1-5) on closed tickets
//! - **Categories** - Resolution SLA hints, deletion guarded by ticket references
//! - **FAQ Catalog** - Published answers with view and helpfulness counters
//! - **Statistics** - Distributions and averages recomputed on every call
//! - **GraphQL API** - Queries and mutations for every operation
//! - **Storage** - PostgreSQL repository plus an in-memory store
//!
//! ## Usage
//!
//! ### In a Service
//!
//! ```rust,no_run
//! use pleme_helpdesk::{SupportConfig, SupportRepository, SupportService};
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = SupportConfig::load()?;
//! let pool = pleme_helpdesk::db::connect(&config).await?;
//!
//! let service = Arc::new(SupportService::new(
//!     Arc::new(SupportRepository::new(pool)),
//!     &config,
//! ));
//! pleme_helpdesk::seed::seed_on_startup(&service).await?;
//!
//! // Schema::build(QueryRoot, MutationRoot, EmptySubscription)
//! //     .data(service)
//! //     .finish()
//! # Ok(())
//! # }
//! ```
//!
//! ### Models
//!
//! ```rust
//! use pleme_helpdesk::{CreateTicketInput, TicketPriority};
//!
//! let input = CreateTicketInput {
//!     title: "Cannot access course".to_string(),
//!     description: Some("The video player stays black".to_string()),
//!     priority: Some(TicketPriority::High),
//!     user_id: 42,
//!     ..Default::default()
//! };
//! ```

pub mod catalog;
pub mod config;
pub mod db;
pub mod graphql;
pub mod lifecycle;
pub mod memory;
pub mod models;
pub mod repository;
pub mod seed;
pub mod service;
pub mod stats;
pub mod store;
pub mod thread;
pub mod validation;

// Re-export commonly used types
pub use config::SupportConfig;
pub use graphql::{SupportMutations, SupportQueries};
pub use memory::InMemoryStore;
pub use models::*;
pub use repository::SupportRepository;
pub use service::SupportService;
pub use store::SupportStore;

use thiserror::Error;

/// Support system errors
#[derive(Error, Debug)]
pub enum SupportError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification of [`SupportError`] used by request adapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidArgument,
    InvalidState,
    Validation,
    Internal,
}

impl SupportError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        SupportError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            SupportError::NotFound { .. } => ErrorKind::NotFound,
            SupportError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            SupportError::InvalidState(_) => ErrorKind::InvalidState,
            SupportError::Validation(_) => ErrorKind::Validation,
            SupportError::Database(_) | SupportError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// HTTP status an adapter should answer with.
    pub fn http_status(&self) -> u16 {
        match self.kind() {
            ErrorKind::NotFound => 404,
            ErrorKind::InvalidArgument | ErrorKind::Validation => 400,
            ErrorKind::InvalidState => 409,
            ErrorKind::Internal => 500,
        }
    }

    pub fn code(&self) -> &'static str {
        match self.kind() {
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::InvalidArgument => "INVALID_ARGUMENT",
            ErrorKind::InvalidState => "INVALID_STATE",
            ErrorKind::Validation => "VALIDATION",
            ErrorKind::Internal => "INTERNAL",
        }
    }
}

pub type Result<T> = std::result::Result<T, SupportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kinds_map_to_adapter_statuses() {
        assert_eq!(SupportError::not_found("Ticket", 7).http_status(), 404);
        assert_eq!(SupportError::InvalidArgument("x".into()).http_status(), 400);
        assert_eq!(SupportError::InvalidState("x".into()).http_status(), 409);
        assert_eq!(SupportError::Validation("x".into()).http_status(), 400);
        assert_eq!(SupportError::Internal("x".into()).http_status(), 500);
    }

    #[test]
    fn not_found_message_names_entity_and_id() {
        let err = SupportError::not_found("Category", "abc");
        assert_eq!(err.to_string(), "Category not found: abc");
        assert_eq!(err.code(), "NOT_FOUND");
    }
}
