/// Authentication flow: one-time code or password, then a token pair
use crate::{
    account::{AuthWithCode, AuthWithPassword, CodeVerifier, PasswordHasher},
    db::CredentialStore,
    error::{AuthError, AuthResult},
    token::{TokenEngine, TokenPair},
};
use std::sync::Arc;

/// Logs existing users in.
///
/// The user is always looked up before any credential is checked, so an
/// unknown username (`UserNotExists`) never looks like a bad credential.
pub struct LoginService {
    store: Arc<dyn CredentialStore>,
    tokens: Arc<TokenEngine>,
    codes: Arc<dyn CodeVerifier>,
    hasher: PasswordHasher,
}

impl LoginService {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        tokens: Arc<TokenEngine>,
        codes: Arc<dyn CodeVerifier>,
    ) -> Self {
        Self {
            store,
            tokens,
            codes,
            hasher: PasswordHasher::default(),
        }
    }

    pub fn with_hasher(mut self, hasher: PasswordHasher) -> Self {
        self.hasher = hasher;
        self
    }

    pub async fn with_code(&self, request: AuthWithCode) -> AuthResult<TokenPair> {
        // registration stores trimmed usernames
        let username = request.username.trim();
        let user_id = self.store.lookup_user_id(username).await?;

        if !self.codes.verify(username, &request.code).await? {
            tracing::warn!(username, "Rejected one-time code");
            return Err(AuthError::InvalidCode);
        }

        tracing::info!(username, "Logged in with code");
        self.tokens.issue_token_pair_for(user_id, username).await
    }

    pub async fn with_password(&self, request: AuthWithPassword) -> AuthResult<TokenPair> {
        let username = request.username.trim();
        let user_id = self.store.lookup_user_id(username).await?;

        let password_hash = self.store.get_password_hash(username, user_id).await?;

        if !self
            .hasher
            .verify_blocking(request.password, password_hash)
            .await?
        {
            tracing::warn!(username, "Rejected password");
            return Err(AuthError::IncorrectPassword);
        }

        tracing::info!(username, "Logged in with password");
        self.tokens.issue_token_pair_for(user_id, username).await
    }
}
