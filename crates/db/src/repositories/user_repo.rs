//! Repository for the `users` table.

use sqlx::PgPool;
use verdant_core::credentials::StoredCredentials;
use verdant_core::import::rules::UserRecord;
use verdant_core::types::DbId;

use crate::models::user::User;

/// Column list for users queries.
const COLUMNS: &str = "id, username, email, password_hash, must_change_password, \
    first_name, last_name, role, created_at, updated_at";

/// Provides import operations for user accounts.
pub struct UserRepo;

impl UserRepo {
    /// Find a user by username, trimmed and case-insensitive.
    pub async fn find_by_username(
        pool: &PgPool,
        username: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM users WHERE lower(btrim(username)) = lower(btrim($1))"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(username)
            .fetch_optional(pool)
            .await
    }

    /// Check whether an account already holds `username` or `email`.
    ///
    /// Returns `Some(true)` for a username match (checked first), `Some(false)`
    /// for an email-only match, and `None` when both are free.
    pub async fn find_conflict(
        pool: &PgPool,
        username: &str,
        email: &str,
    ) -> Result<Option<bool>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT lower(btrim(username)) = lower(btrim($1)) AS username_taken
             FROM users
             WHERE lower(btrim(username)) = lower(btrim($1))
                OR lower(btrim(email)) = lower(btrim($2))
             ORDER BY username_taken DESC
             LIMIT 1",
        )
        .bind(username)
        .bind(email)
        .fetch_optional(pool)
        .await
    }

    /// Create a user account, returning the created row.
    pub async fn create(
        pool: &PgPool,
        input: &UserRecord,
        credentials: &StoredCredentials,
        role: &str,
    ) -> Result<User, sqlx::Error> {
        let query = format!(
            "INSERT INTO users
                (username, email, password_hash, must_change_password, first_name, last_name, role)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(&input.username)
            .bind(&input.email)
            .bind(&credentials.password_hash)
            .bind(credentials.must_change_password)
            .bind(&input.first_name)
            .bind(&input.last_name)
            .bind(role)
            .fetch_one(pool)
            .await
    }

    /// Update a user account. A `None` role or credentials keep the stored value.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UserRecord,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!(
            "UPDATE users SET
                username = $2,
                email = $3,
                first_name = $4,
                last_name = $5,
                role = COALESCE($6, role),
                password_hash = COALESCE($7, password_hash),
                must_change_password = COALESCE($8, must_change_password),
                updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let credentials = input.credentials.as_ref();
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(&input.username)
            .bind(&input.email)
            .bind(&input.first_name)
            .bind(&input.last_name)
            .bind(input.role)
            .bind(credentials.map(|c| c.password_hash.as_str()))
            .bind(credentials.map(|c| c.must_change_password))
            .fetch_optional(pool)
            .await
    }

    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(pool)
            .await
    }
}
