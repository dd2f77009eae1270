/// Registration flow
use crate::{
    account::{PasswordHasher, RegistrationRequest},
    db::{CredentialStore, NewUser},
    error::{AuthError, AuthResult},
    token::{TokenEngine, TokenPair},
};
use std::sync::Arc;
use validator::Validate;

/// Creates users and hands out their first token pair
pub struct RegistrationService {
    store: Arc<dyn CredentialStore>,
    tokens: Arc<TokenEngine>,
    hasher: PasswordHasher,
}

impl RegistrationService {
    pub fn new(store: Arc<dyn CredentialStore>, tokens: Arc<TokenEngine>) -> Self {
        Self {
            store,
            tokens,
            hasher: PasswordHasher::default(),
        }
    }

    pub fn with_hasher(mut self, hasher: PasswordHasher) -> Self {
        self.hasher = hasher;
        self
    }

    /// Register a user and issue tokens.
    ///
    /// The request is fully validated before anything is written; the user
    /// row and its email/phone row are inserted in one transaction.
    pub async fn register(&self, request: RegistrationRequest) -> AuthResult<TokenPair> {
        let request = request.normalized();
        request
            .validate()
            .map_err(|e| AuthError::Validation(e.to_string()))?;
        let contact = request.contact()?;

        let password_hash = self.hasher.hash_blocking(request.password).await?;

        let user_id = self
            .store
            .create_user(&NewUser {
                username: request.username.clone(),
                password_hash,
                full_name: request.full_name,
                contact,
            })
            .await
            .map_err(|e| {
                tracing::warn!(username = %request.username, "Registration failed: {}", e);
                e
            })?;

        tracing::info!(username = %request.username, %user_id, "User registered");

        self.tokens
            .issue_token_pair_for(user_id, &request.username)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::{self, SqliteCredentialStore},
        error::ErrorKind,
    };
    use sqlx::SqlitePool;

    async fn setup() -> (RegistrationService, Arc<TokenEngine>, SqlitePool) {
        let pool = db::memory_pool().await.unwrap();
        db::run_migrations(&pool).await.unwrap();
        let store: Arc<dyn CredentialStore> = Arc::new(SqliteCredentialStore::new(pool.clone()));
        let tokens = Arc::new(TokenEngine::new(b"registration-test-secret", store.clone()).unwrap());
        let service = RegistrationService::new(store, tokens.clone())
            .with_hasher(PasswordHasher::with_params(256, 1, 1).unwrap());

        (service, tokens, pool)
    }

    fn request(username: &str, email: Option<&str>, phone: Option<&str>) -> RegistrationRequest {
        RegistrationRequest {
            username: username.to_string(),
            password: "password123".to_string(),
            email: email.map(str::to_string),
            phone_number: phone.map(str::to_string),
            full_name: None,
        }
    }

    async fn user_count(pool: &SqlitePool) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_register_issues_tokens() {
        let (service, tokens, _pool) = setup().await;

        let pair = service
            .register(request("alice", Some("a@x.com"), None))
            .await
            .unwrap();

        let claims = tokens.validate_access_token(&pair.access_token).unwrap();
        assert_eq!(claims.user, "alice");
        assert_eq!(
            tokens
                .validate_token_pair(&pair.access_token, &pair.refresh_token)
                .await
                .unwrap(),
            "alice"
        );
    }

    #[tokio::test]
    async fn test_register_with_phone() {
        let (service, _tokens, pool) = setup().await;

        service
            .register(request("bob", None, Some("+79990001122")))
            .await
            .unwrap();

        let phones: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM phone_numbers")
            .fetch_one(&pool)
            .await
            .unwrap();
        let emails: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM emails")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(phones, 1);
        assert_eq!(emails, 0);
    }

    #[tokio::test]
    async fn test_password_is_hashed() {
        let (service, _tokens, pool) = setup().await;
        service
            .register(request("alice", Some("a@x.com"), None))
            .await
            .unwrap();

        let hash: String = sqlx::query_scalar("SELECT hash_password FROM users WHERE username = 'alice'")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_ne!(hash, "password123");
        assert!(hash.starts_with("$argon2id$"));
    }

    #[tokio::test]
    async fn test_duplicate_username() {
        let (service, _tokens, _pool) = setup().await;
        service
            .register(request("alice", Some("a@x.com"), None))
            .await
            .unwrap();

        let err = service
            .register(request("alice", Some("b@x.com"), None))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::UsernameAlreadyExists));
    }

    #[tokio::test]
    async fn test_duplicate_email() {
        let (service, _tokens, pool) = setup().await;
        service
            .register(request("alice", Some("a@x.com"), None))
            .await
            .unwrap();

        let err = service
            .register(request("bob", Some("a@x.com"), None))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::EmailAlreadyExists));
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
        assert_eq!(user_count(&pool).await, 1);
    }

    #[tokio::test]
    async fn test_duplicate_phone() {
        let (service, _tokens, _pool) = setup().await;
        service
            .register(request("alice", None, Some("+100000")))
            .await
            .unwrap();

        let err = service
            .register(request("bob", None, Some("+100000")))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::PhoneAlreadyExists));
    }

    #[tokio::test]
    async fn test_missing_contact_rejected_before_write() {
        let (service, _tokens, pool) = setup().await;

        let err = service
            .register(request("alice", None, Some("")))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Validation(_)));
        assert_eq!(user_count(&pool).await, 0);
    }

    #[tokio::test]
    async fn test_both_contacts_rejected_before_write() {
        let (service, _tokens, pool) = setup().await;

        let err = service
            .register(request("alice", Some("a@x.com"), Some("+100000")))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Validation(_)));
        assert_eq!(user_count(&pool).await, 0);
    }

    #[tokio::test]
    async fn test_invalid_fields_rejected() {
        let (service, _tokens, pool) = setup().await;

        let mut weak = request("alice", Some("a@x.com"), None);
        weak.password = "123".to_string();
        assert!(matches!(
            service.register(weak).await,
            Err(AuthError::Validation(_))
        ));

        assert!(matches!(
            service.register(request("alice", Some("nope"), None)).await,
            Err(AuthError::Validation(_))
        ));
        assert_eq!(user_count(&pool).await, 0);
    }
}
