/// Credential store seam used by the token engine and the account flows
use crate::{
    db::account::{NewUser, RefreshTokenRecord, User},
    error::AuthResult,
};
use async_trait::async_trait;
use uuid::Uuid;

/// Persistent user identities, password hashes and refresh token records.
///
/// Implementations translate constraint violations into the typed
/// `AuthError` variants; nothing above this trait sees raw database codes.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Fails with `UserNotExists` when no user has this username
    async fn lookup_user_id(&self, username: &str) -> AuthResult<Uuid>;

    async fn get_user(&self, username: &str) -> AuthResult<User>;

    async fn get_password_hash(&self, username: &str, user_id: Uuid) -> AuthResult<String>;

    /// Insert the user row and its contact row atomically
    async fn create_user(&self, user: &NewUser) -> AuthResult<Uuid>;

    /// Create or replace the refresh token record of `record.user_id`
    async fn put_refresh_token(&self, record: &RefreshTokenRecord) -> AuthResult<()>;

    /// Swap the stored refresh token of `record.user_id` only if it still
    /// equals `current`. Returns false when another writer got there first.
    async fn replace_refresh_token(&self, current: &str, record: &RefreshTokenRecord) -> AuthResult<bool>;

    async fn find_refresh_token(&self, token: &str) -> AuthResult<Option<RefreshTokenRecord>>;

    async fn get_refresh_token(&self, user_id: Uuid) -> AuthResult<Option<RefreshTokenRecord>>;
}
