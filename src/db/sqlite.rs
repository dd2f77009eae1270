/// SQLite credential store using sqlx runtime queries
use crate::{
    db::{
        account::{Contact, NewUser, RefreshTokenRecord, User},
        store::CredentialStore,
    },
    error::{AuthError, AuthResult},
};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

/// Credential store backed by the account database
#[derive(Clone)]
pub struct SqliteCredentialStore {
    db: SqlitePool,
}

impl SqliteCredentialStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CredentialStore for SqliteCredentialStore {
    async fn lookup_user_id(&self, username: &str) -> AuthResult<Uuid> {
        let id: String = sqlx::query_scalar("SELECT user_id FROM users WHERE username = ?1")
            .bind(username)
            .fetch_optional(&self.db)
            .await?
            .ok_or(AuthError::UserNotExists)?;

        parse_uuid(&id)
    }

    async fn get_user(&self, username: &str) -> AuthResult<User> {
        let row = sqlx::query(
            "SELECT u.user_id, u.username, u.hash_password, u.fullname, u.created_at,
                    e.email, p.phone_number
             FROM users u
             LEFT JOIN emails e ON e.user_id = u.user_id
             LEFT JOIN phone_numbers p ON p.user_id = u.user_id
             WHERE u.username = ?1",
        )
        .bind(username)
        .fetch_optional(&self.db)
        .await?
        .ok_or(AuthError::UserNotExists)?;

        Ok(User {
            id: parse_uuid(&row.try_get::<String, _>("user_id")?)?,
            username: row.try_get("username")?,
            password_hash: row.try_get("hash_password")?,
            full_name: row.try_get("fullname")?,
            email: row.try_get("email")?,
            phone_number: row.try_get("phone_number")?,
            created_at: row.try_get("created_at")?,
        })
    }

    async fn get_password_hash(&self, username: &str, user_id: Uuid) -> AuthResult<String> {
        sqlx::query_scalar("SELECT hash_password FROM users WHERE username = ?1 AND user_id = ?2")
            .bind(username)
            .bind(user_id.to_string())
            .fetch_optional(&self.db)
            .await?
            .ok_or(AuthError::UserNotExists)
    }

    async fn create_user(&self, user: &NewUser) -> AuthResult<Uuid> {
        let user_id = Uuid::new_v4();

        // Dropping the transaction on any early return rolls both inserts back
        let mut tx = self.db.begin().await?;

        sqlx::query(
            "INSERT INTO users (user_id, username, hash_password, fullname, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(user_id.to_string())
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.full_name)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(map_constraint_error)?;

        let (statement, value) = match &user.contact {
            Contact::Email(email) => ("INSERT INTO emails (user_id, email) VALUES (?1, ?2)", email),
            Contact::Phone(phone) => (
                "INSERT INTO phone_numbers (user_id, phone_number) VALUES (?1, ?2)",
                phone,
            ),
        };

        sqlx::query(statement)
            .bind(user_id.to_string())
            .bind(value)
            .execute(&mut *tx)
            .await
            .map_err(map_constraint_error)?;

        tx.commit().await?;

        Ok(user_id)
    }

    async fn put_refresh_token(&self, record: &RefreshTokenRecord) -> AuthResult<()> {
        sqlx::query(
            "INSERT INTO refresh_tokens (user_id, token, expiration_time)
             VALUES (?1, ?2, ?3)
             ON CONFLICT (user_id) DO UPDATE SET
                token = excluded.token,
                expiration_time = excluded.expiration_time",
        )
        .bind(record.user_id.to_string())
        .bind(&record.token)
        .bind(record.expires_at)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    async fn replace_refresh_token(&self, current: &str, record: &RefreshTokenRecord) -> AuthResult<bool> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET token = ?1, expiration_time = ?2
             WHERE user_id = ?3 AND token = ?4",
        )
        .bind(&record.token)
        .bind(record.expires_at)
        .bind(record.user_id.to_string())
        .bind(current)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn find_refresh_token(&self, token: &str) -> AuthResult<Option<RefreshTokenRecord>> {
        let row = sqlx::query(
            "SELECT user_id, token, expiration_time FROM refresh_tokens WHERE token = ?1",
        )
        .bind(token)
        .fetch_optional(&self.db)
        .await?;

        row.map(|r| record_from_row(&r)).transpose()
    }

    async fn get_refresh_token(&self, user_id: Uuid) -> AuthResult<Option<RefreshTokenRecord>> {
        let row = sqlx::query(
            "SELECT user_id, token, expiration_time FROM refresh_tokens WHERE user_id = ?1",
        )
        .bind(user_id.to_string())
        .fetch_optional(&self.db)
        .await?;

        row.map(|r| record_from_row(&r)).transpose()
    }
}

fn record_from_row(row: &SqliteRow) -> AuthResult<RefreshTokenRecord> {
    Ok(RefreshTokenRecord {
        user_id: parse_uuid(&row.try_get::<String, _>("user_id")?)?,
        token: row.try_get("token")?,
        expires_at: row.try_get("expiration_time")?,
    })
}

fn parse_uuid(value: &str) -> AuthResult<Uuid> {
    Uuid::parse_str(value).map_err(|e| AuthError::Internal(format!("Corrupt user id {}: {}", value, e)))
}

/// Translate unique-constraint failures into the matching `AlreadyExists` error.
///
/// SQLite names the column only in the message
/// (`UNIQUE constraint failed: emails.email`).
fn map_constraint_error(err: sqlx::Error) -> AuthError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            let target = db_err
                .constraint()
                .map(str::to_owned)
                .unwrap_or_else(|| db_err.message().to_owned());

            if target.contains("username") {
                return AuthError::UsernameAlreadyExists;
            }
            if target.contains("email") {
                return AuthError::EmailAlreadyExists;
            }
            if target.contains("phone_number") {
                return AuthError::PhoneAlreadyExists;
            }
        }
    }

    AuthError::Storage(err)
}
