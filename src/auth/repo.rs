use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;

use crate::auth::error::AuthError;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 digest, not exposed in JSON
    pub created_at: OffsetDateTime,
}

/// Persistence seam for user records.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Exact-match lookup; callers pass canonical (lower-cased) emails.
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;

    /// Inserts a new user and assigns its id. The unique constraint on
    /// `email` is authoritative: a violation surfaces as `DuplicateEmail`
    /// even when the caller raced another signup past its own lookup.
    async fn create(
        &self,
        email: &str,
        name: &str,
        password_hash: &str,
    ) -> Result<User, AuthError>;
}

pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, name, password_hash, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn create(
        &self,
        email: &str,
        name: &str,
        password_hash: &str,
    ) -> Result<User, AuthError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, name, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, email, name, password_hash, created_at
            "#,
        )
        .bind(email)
        .bind(name)
        .bind(password_hash)
        .fetch_one(&self.db)
        .await
        .map_err(|e| match &e {
            // 23505: unique_violation
            sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505") => {
                AuthError::DuplicateEmail
            }
            _ => AuthError::Internal(e.into()),
        })?;
        Ok(user)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct Inner {
        users: Vec<User>,
        next_id: i64,
    }

    /// In-memory store for service tests, mirroring the Postgres unique
    /// constraint so duplicate inserts fail the same way.
    #[derive(Default)]
    pub struct MemStore {
        inner: Mutex<Inner>,
    }

    impl MemStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn delete_by_email(&self, email: &str) {
            let mut inner = self.inner.lock().expect("store lock");
            inner.users.retain(|u| u.email != email);
        }
    }

    #[async_trait]
    impl UserStore for MemStore {
        async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
            let inner = self.inner.lock().expect("store lock");
            Ok(inner.users.iter().find(|u| u.email == email).cloned())
        }

        async fn create(
            &self,
            email: &str,
            name: &str,
            password_hash: &str,
        ) -> Result<User, AuthError> {
            let mut inner = self.inner.lock().expect("store lock");
            if inner.users.iter().any(|u| u.email == email) {
                return Err(AuthError::DuplicateEmail);
            }
            inner.next_id += 1;
            let user = User {
                id: inner.next_id,
                email: email.to_string(),
                name: name.to_string(),
                password_hash: password_hash.to_string(),
                created_at: OffsetDateTime::now_utc(),
            };
            inner.users.push(user.clone());
            Ok(user)
        }
    }
}
