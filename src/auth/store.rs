//! User persistence queries

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, warn};

use super::models::{NewUser, User};
use crate::common::generate_user_id;

pub async fn find_user_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
        .bind(email)
        .fetch_optional(pool)
        .await
}

/// Insert attempts before a user id collision is returned as an error
const ID_ATTEMPTS: usize = 5;

/// Inserts `new_user` unless a row with the same email exists, then returns
/// whichever row owns the email. Two concurrent first logins therefore both
/// end up with the same record. An id collision with a different email is
/// retried under a freshly generated id.
pub async fn insert_or_fetch_user(pool: &SqlitePool, new_user: &NewUser) -> Result<(User, bool), sqlx::Error> {
    let mut user_id = new_user.id.clone();
    let mut attempt = 1;

    let created = loop {
        let result = sqlx::query(
            "INSERT INTO users (id, provider, email, nickname, avatar, verified)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(email) DO NOTHING",
        )
        .bind(&user_id)
        .bind(&new_user.provider)
        .bind(&new_user.email)
        .bind(&new_user.nickname)
        .bind(new_user.avatar.as_deref())
        .bind(new_user.verified)
        .execute(pool)
        .await;

        match result {
            Ok(done) => break done.rows_affected() == 1,
            Err(e) if is_unique_violation(&e) && attempt < ID_ATTEMPTS => {
                warn!(user_id = %user_id, attempt, "User id already taken, retrying with a new id");
                user_id = generate_user_id();
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    };

    if !created {
        debug!(user_id = %user_id, "Insert skipped, email already owned by another row");
    }

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
        .bind(&new_user.email)
        .fetch_one(pool)
        .await?;

    Ok((user, created))
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .map(|db| db.is_unique_violation())
        .unwrap_or(false)
}

/// Stamps `last_logged_in` with the current time; returns the number of rows touched
pub async fn touch_last_logged_in(pool: &SqlitePool, email: &str) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE users SET last_logged_in = ? WHERE email = ?")
        .bind(Utc::now().to_rfc3339())
        .bind(email)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
