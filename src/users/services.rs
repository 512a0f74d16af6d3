use std::sync::Arc;

use time::{Duration, OffsetDateTime};
use tokio::task;
use tracing::{debug, info};

use crate::users::{
    dto::{CreateUserDto, UpdateUserDto, UserDto},
    password::{CredentialHasher, HashError},
    repo::{RepoError, UserRepository},
    repo_types::{NewUserRow, Pagination, UserChanges},
    validation::ValidationError,
};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("user {0} not found")]
    NotFound(i64),
    #[error("user {0} was modified concurrently, retry")]
    Conflict(i64),
    #[error(transparent)]
    Hash(#[from] HashError),
    #[error(transparent)]
    Store(RepoError),
}

impl From<RepoError> for ServiceError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::NotFound(id) => Self::NotFound(id),
            RepoError::Stale(id) => Self::Conflict(id),
            other => Self::Store(other),
        }
    }
}

/// Current UTC time at the precision Postgres `timestamptz` stores.
pub fn now_micros() -> OffsetDateTime {
    let now = OffsetDateTime::now_utc();
    now.replace_nanosecond(now.nanosecond() / 1_000 * 1_000)
        .unwrap_or(now)
}

/// A fresh `updated_at` strictly after `previous`, even if the clock stepped back.
fn next_stamp(previous: Option<OffsetDateTime>) -> OffsetDateTime {
    let now = now_micros();
    match previous {
        Some(prev) if now <= prev => prev + Duration::microseconds(1),
        _ => now,
    }
}

/// User business rules on top of a [`UserRepository`].
///
/// Stateless apart from its injected collaborators, so clones are cheap and
/// handlers share one instance through `AppState`.
#[derive(Clone)]
pub struct UserService {
    repo: Arc<dyn UserRepository>,
    hasher: Arc<dyn CredentialHasher>,
}

impl UserService {
    pub fn new(repo: Arc<dyn UserRepository>, hasher: Arc<dyn CredentialHasher>) -> Self {
        Self { repo, hasher }
    }

    pub async fn create(&self, input: CreateUserDto) -> Result<i64, ServiceError> {
        let hasher = Arc::clone(&self.hasher);
        let password = input.password;
        // Argon2 is CPU-bound; keep it off the async workers.
        let password_hash = task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| HashError(format!("hashing task failed: {e}")))??;

        let id = self
            .repo
            .create(NewUserRow {
                firstname: input.firstname,
                lastname: input.lastname,
                email: input.email,
                password_hash,
                created_at: now_micros(),
            })
            .await?;
        info!(user_id = id, "user created");
        Ok(id)
    }

    /// Partial update. The record is read first: that read is the only
    /// existence check, and its `updated_at` guards the write so a record
    /// changed in between is reported as a conflict instead of overwritten.
    pub async fn update(&self, id: i64, input: UpdateUserDto) -> Result<(), ServiceError> {
        let current = self.repo.get_one(id).await?;

        let changes = UserChanges {
            firstname: input.firstname.filter(|s| !s.is_empty()),
            lastname: input.lastname.filter(|s| !s.is_empty()),
            updated_at: next_stamp(current.updated_at),
            expected_updated_at: Some(current.updated_at),
        };
        debug!(
            user_id = id,
            firstname = changes.firstname.is_some(),
            lastname = changes.lastname.is_some(),
            "applying user update"
        );
        self.repo.update(id, changes).await?;
        info!(user_id = id, "user updated");
        Ok(())
    }

    pub async fn get_one(&self, id: i64) -> Result<UserDto, ServiceError> {
        let row = self.repo.get_one(id).await?;
        Ok(row.into())
    }

    /// `None` leaves the page size to the repository default.
    pub async fn get_all(&self, page: Option<Pagination>) -> Result<Vec<UserDto>, ServiceError> {
        let rows = self.repo.get_all(page).await?;
        Ok(rows.into_iter().map(UserDto::from).collect())
    }

    /// Unconditional; deleting an unknown id is not an error.
    pub async fn delete(&self, id: i64) -> Result<(), ServiceError> {
        self.repo.delete(id).await?;
        info!(user_id = id, "user deleted");
        Ok(())
    }
}
