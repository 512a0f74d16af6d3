use async_trait::async_trait;

use crate::users::repo_types::{NewUserRow, Pagination, UserChanges, UserRow};

#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("user {0} not found")]
    NotFound(i64),
    #[error("user {0} changed since it was read")]
    Stale(i64),
    #[error("database unavailable")]
    Connection(#[source] sqlx::Error),
    #[error("database query failed")]
    Query(#[source] sqlx::Error),
}

impl From<sqlx::Error> for RepoError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_) => Self::Connection(e),
            other => Self::Query(other),
        }
    }
}

/// Persistence contract for user records.
///
/// Implementations own connection handling and query construction; callers
/// never see SQL. Every method is cancel-safe in the sense that dropping the
/// returned future releases whatever connection it held.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a record and return the store-assigned id.
    async fn create(&self, user: NewUserRow) -> Result<i64, RepoError>;

    /// Write `updated_at` plus whichever named fields are set.
    ///
    /// Without a guard in `changes`, an unknown id is not an error. With a
    /// guard, a write that matches no row fails with [`RepoError::Stale`].
    async fn update(&self, id: i64, changes: UserChanges) -> Result<(), RepoError>;

    /// Fetch one record; a missing row is [`RepoError::NotFound`].
    async fn get_one(&self, id: i64) -> Result<UserRow, RepoError>;

    /// Page through records in ascending id order. `None` means the
    /// default page (first 10 rows).
    async fn get_all(&self, page: Option<Pagination>) -> Result<Vec<UserRow>, RepoError>;

    /// Hard delete. Deleting an unknown id succeeds.
    async fn delete(&self, id: i64) -> Result<(), RepoError>;
}
