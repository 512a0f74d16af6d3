use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;

use crate::users::{
    repo::{RepoError, UserRepository},
    repo_types::{NewUserRow, Pagination, UserChanges, UserRow},
};

/// In-process [`UserRepository`] for tests. Ids start at 1, iteration order
/// is ascending id, same as the Postgres adapter.
#[derive(Default)]
pub struct MemoryUserRepository {
    rows: Mutex<BTreeMap<i64, UserRow>>,
    next_id: Mutex<i64>,
    offline: AtomicBool,
}

impl MemoryUserRepository {
    /// Make every subsequent call fail as if the pool had timed out.
    pub fn go_offline(&self) {
        self.offline.store(true, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_online(&self) -> Result<(), RepoError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(RepoError::from(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn create(&self, user: NewUserRow) -> Result<i64, RepoError> {
        self.check_online()?;
        let id = {
            let mut next = self.next_id.lock().unwrap();
            *next += 1;
            *next
        };
        let row = UserRow {
            id,
            firstname: user.firstname,
            lastname: user.lastname,
            email: user.email,
            password_hash: user.password_hash,
            created_at: user.created_at,
            updated_at: None,
        };
        self.rows.lock().unwrap().insert(id, row);
        Ok(id)
    }

    async fn update(&self, id: i64, changes: UserChanges) -> Result<(), RepoError> {
        self.check_online()?;
        let mut rows = self.rows.lock().unwrap();
        let row = match rows.get_mut(&id) {
            Some(row) => row,
            None if changes.expected_updated_at.is_some() => return Err(RepoError::Stale(id)),
            None => return Ok(()),
        };
        if let Some(expected) = changes.expected_updated_at {
            if row.updated_at != expected {
                return Err(RepoError::Stale(id));
            }
        }
        if let Some(firstname) = changes.firstname {
            row.firstname = firstname;
        }
        if let Some(lastname) = changes.lastname {
            row.lastname = lastname;
        }
        row.updated_at = Some(changes.updated_at);
        Ok(())
    }

    async fn get_one(&self, id: i64) -> Result<UserRow, RepoError> {
        self.check_online()?;
        self.rows
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(RepoError::NotFound(id))
    }

    async fn get_all(&self, page: Option<Pagination>) -> Result<Vec<UserRow>, RepoError> {
        self.check_online()?;
        let page = page.unwrap_or_default();
        let skip = usize::try_from(page.offset).unwrap_or(usize::MAX);
        let take = usize::try_from(page.limit).unwrap_or(usize::MAX);
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .skip(skip)
            .take(take)
            .cloned()
            .collect())
    }

    async fn delete(&self, id: i64) -> Result<(), RepoError> {
        self.check_online()?;
        self.rows.lock().unwrap().remove(&id);
        Ok(())
    }
}

/// Simulates another writer: every read returns the row as it was, then
/// changes it behind the caller's back.
#[derive(Default)]
pub struct RacingUserRepository {
    pub inner: MemoryUserRepository,
}

#[async_trait]
impl UserRepository for RacingUserRepository {
    async fn create(&self, user: NewUserRow) -> Result<i64, RepoError> {
        self.inner.create(user).await
    }

    async fn update(&self, id: i64, changes: UserChanges) -> Result<(), RepoError> {
        self.inner.update(id, changes).await
    }

    async fn get_one(&self, id: i64) -> Result<UserRow, RepoError> {
        let snapshot = self.inner.get_one(id).await?;
        let bumped = snapshot
            .updated_at
            .unwrap_or(snapshot.created_at)
            + time::Duration::seconds(1);
        self.inner
            .update(
                id,
                UserChanges {
                    firstname: Some("Concurrent".into()),
                    lastname: None,
                    updated_at: bumped,
                    expected_updated_at: None,
                },
            )
            .await?;
        Ok(snapshot)
    }

    async fn get_all(&self, page: Option<Pagination>) -> Result<Vec<UserRow>, RepoError> {
        self.inner.get_all(page).await
    }

    async fn delete(&self, id: i64) -> Result<(), RepoError> {
        self.inner.delete(id).await
    }
}

/// Sets its flag when dropped; tells a test whether a future was torn down.
pub struct DropFlag(pub Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Reads hang for `stall`, like a store that stopped answering. `dropped`
/// flips once an in-flight read is abandoned.
pub struct StallingUserRepository {
    pub stall: Duration,
    pub dropped: Arc<AtomicBool>,
    pub finished: Arc<AtomicBool>,
}

impl StallingUserRepository {
    pub fn new(stall: Duration) -> Self {
        Self {
            stall,
            dropped: Arc::default(),
            finished: Arc::default(),
        }
    }
}

#[async_trait]
impl UserRepository for StallingUserRepository {
    async fn create(&self, _user: NewUserRow) -> Result<i64, RepoError> {
        Ok(1)
    }

    async fn update(&self, _id: i64, _changes: UserChanges) -> Result<(), RepoError> {
        Ok(())
    }

    async fn get_one(&self, id: i64) -> Result<UserRow, RepoError> {
        let _guard = DropFlag(Arc::clone(&self.dropped));
        tokio::time::sleep(self.stall).await;
        self.finished.store(true, Ordering::SeqCst);
        Err(RepoError::NotFound(id))
    }

    async fn get_all(&self, _page: Option<Pagination>) -> Result<Vec<UserRow>, RepoError> {
        Ok(Vec::new())
    }

    async fn delete(&self, _id: i64) -> Result<(), RepoError> {
        Ok(())
    }
}
