//! Repository for the `users` table.

use sqlx::PgPool;
use scripta_core::ledger::next_reset_from;
use scripta_core::types::{DbId, Timestamp};

use crate::models::user::{CreateUser, User};

/// Column list for users queries.
const COLUMNS: &str =
    "id, username, email, password_hash, role, is_active, created_at, updated_at";

/// Provides CRUD operations for users.
///
/// Signup provisions the user's token balance row in the same transaction,
/// so a user can never exist without a balance.
pub struct UserRepo;

impl UserRepo {
    /// Insert a new user together with their initial balance row.
    ///
    /// `tokens_per_month` is the signup tier's allotment (the FREE tier in
    /// production); the balance starts full with a reset one period out.
    pub async fn create(
        pool: &PgPool,
        input: &CreateUser,
        tokens_per_month: i64,
        now: Timestamp,
    ) -> Result<User, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO users (username, email, password_hash, role)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        let user = sqlx::query_as::<_, User>(&query)
            .bind(&input.username)
            .bind(&input.email)
            .bind(&input.password_hash)
            .bind(&input.role)
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO token_balances
                (user_id, tokens_remaining, tokens_per_month, next_reset_at)
             VALUES ($1, $2, $2, $3)",
        )
        .bind(user.id)
        .bind(tokens_per_month)
        .bind(next_reset_from(now))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(user)
    }

    /// Find a user by primary key.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a user by username (login path).
    pub async fn find_by_username(
        pool: &PgPool,
        username: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE username = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(username)
            .fetch_optional(pool)
            .await
    }
}
