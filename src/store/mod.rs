pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A row with the same unique key (email) already exists.
    #[error("{0} already exists")]
    Conflict(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Persistence contract shared by the identity entities.
///
/// Cancellation follows the caller: dropping the returned future abandons
/// the query.
#[async_trait]
pub trait Repository<T>: Send + Sync {
    async fn find_one_by_email(&self, email: &str) -> Result<Option<T>, StoreError>;

    /// Insert a new entity. Fails with `Conflict` if the email is taken.
    async fn add_one(&self, entity: &T) -> Result<T, StoreError>;

    /// Persist every mutable field of an existing entity, matched by id.
    async fn update_one(&self, entity: &T) -> Result<T, StoreError>;
}
