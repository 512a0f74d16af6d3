use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::users::{
    repo::{RepoError, UserRepository},
    repo_types::{NewUserRow, Pagination, UserChanges, UserRow},
};

const USER_COLUMNS: &str = "id, firstname, lastname, email, password_hash, created_at, updated_at";

/// Postgres-backed [`UserRepository`]. Each call checks a connection out of
/// the pool for one statement; the connection goes back on drop.
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn build_update(id: i64, changes: UserChanges) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("UPDATE users SET updated_at = ");
    qb.push_bind(changes.updated_at);
    if let Some(firstname) = changes.firstname {
        qb.push(", firstname = ").push_bind(firstname);
    }
    if let Some(lastname) = changes.lastname {
        qb.push(", lastname = ").push_bind(lastname);
    }
    qb.push(" WHERE id = ").push_bind(id);
    if let Some(expected) = changes.expected_updated_at {
        qb.push(" AND updated_at IS NOT DISTINCT FROM ")
            .push_bind(expected);
    }
    qb
}

fn to_sql_i64(v: u64) -> i64 {
    i64::try_from(v).unwrap_or(i64::MAX)
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, user: NewUserRow) -> Result<i64, RepoError> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO users (firstname, lastname, email, password_hash, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, NULL)
            RETURNING id
            "#,
        )
        .bind(user.firstname)
        .bind(user.lastname)
        .bind(user.email)
        .bind(user.password_hash)
        .bind(user.created_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    async fn update(&self, id: i64, changes: UserChanges) -> Result<(), RepoError> {
        let guarded = changes.expected_updated_at.is_some();
        let mut qb = build_update(id, changes);
        let result = qb.build().execute(&self.pool).await?;
        if guarded && result.rows_affected() == 0 {
            return Err(RepoError::Stale(id));
        }
        Ok(())
    }

    async fn get_one(&self, id: i64) -> Result<UserRow, RepoError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(RepoError::NotFound(id))
    }

    async fn get_all(&self, page: Option<Pagination>) -> Result<Vec<UserRow>, RepoError> {
        let page = page.unwrap_or_default();
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY id ASC LIMIT $1 OFFSET $2");
        let rows = sqlx::query_as::<_, UserRow>(&sql)
            .bind(to_sql_i64(page.limit))
            .bind(to_sql_i64(page.offset))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn delete(&self, id: i64) -> Result<(), RepoError> {
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
