/// End-to-end registration, login and token lifecycle scenarios
use async_trait::async_trait;
use auth_service::{
    account::{
        AuthWithPassword, DisabledCodeVerifier, LoginService, PasswordHasher, RegistrationRequest,
        RegistrationService,
    },
    db::{self, CredentialStore, NewUser, RefreshTokenRecord, SqliteCredentialStore, User},
    error::{AuthError, AuthResult, ErrorKind, TokenError, TokenStage},
    token::{ManualClock, TokenEngine},
};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use tokio_test::{assert_err, assert_ok};
use uuid::Uuid;

const SECRET: &[u8] = b"integration-secret-0123456789abcdef";
const HOUR: i64 = 3600;

/// Store wrapper counting password-hash lookups
struct CountingStore {
    inner: SqliteCredentialStore,
    hash_lookups: AtomicUsize,
}

#[async_trait]
impl CredentialStore for CountingStore {
    async fn lookup_user_id(&self, username: &str) -> AuthResult<Uuid> {
        self.inner.lookup_user_id(username).await
    }

    async fn get_user(&self, username: &str) -> AuthResult<User> {
        self.inner.get_user(username).await
    }

    async fn get_password_hash(&self, username: &str, user_id: Uuid) -> AuthResult<String> {
        self.hash_lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.get_password_hash(username, user_id).await
    }

    async fn create_user(&self, user: &NewUser) -> AuthResult<Uuid> {
        self.inner.create_user(user).await
    }

    async fn put_refresh_token(&self, record: &RefreshTokenRecord) -> AuthResult<()> {
        self.inner.put_refresh_token(record).await
    }

    async fn replace_refresh_token(
        &self,
        current: &str,
        record: &RefreshTokenRecord,
    ) -> AuthResult<bool> {
        self.inner.replace_refresh_token(current, record).await
    }

    async fn find_refresh_token(&self, token: &str) -> AuthResult<Option<RefreshTokenRecord>> {
        self.inner.find_refresh_token(token).await
    }

    async fn get_refresh_token(&self, user_id: Uuid) -> AuthResult<Option<RefreshTokenRecord>> {
        self.inner.get_refresh_token(user_id).await
    }
}

struct Harness {
    store: Arc<CountingStore>,
    clock: Arc<ManualClock>,
    tokens: Arc<TokenEngine>,
    registration: RegistrationService,
    login: LoginService,
}

async fn harness() -> Harness {
    let pool = db::memory_pool().await.unwrap();
    db::run_migrations(&pool).await.unwrap();

    let store = Arc::new(CountingStore {
        inner: SqliteCredentialStore::new(pool),
        hash_lookups: AtomicUsize::new(0),
    });
    let clock = Arc::new(ManualClock::starting_now());
    let tokens = Arc::new(
        TokenEngine::new(SECRET, store.clone())
            .unwrap()
            .with_clock(clock.clone()),
    );
    let hasher = PasswordHasher::with_params(256, 1, 1).unwrap();

    let registration =
        RegistrationService::new(store.clone(), tokens.clone()).with_hasher(hasher.clone());
    let login = LoginService::new(store.clone(), tokens.clone(), Arc::new(DisabledCodeVerifier))
        .with_hasher(hasher);

    Harness {
        store,
        clock,
        tokens,
        registration,
        login,
    }
}

fn alice() -> RegistrationRequest {
    RegistrationRequest {
        username: "alice".to_string(),
        password: "password123".to_string(),
        email: Some("a@x.com".to_string()),
        phone_number: None,
        full_name: Some("Alice".to_string()),
    }
}

fn password(username: &str, password: &str) -> AuthWithPassword {
    AuthWithPassword {
        username: username.to_string(),
        password: password.to_string(),
    }
}

#[tokio::test]
async fn register_then_tokens_age_out() {
    let h = harness().await;

    let pair = assert_ok!(h.registration.register(alice()).await);
    let username = assert_ok!(
        h.tokens
            .validate_token_pair(&pair.access_token, &pair.refresh_token)
            .await
    );
    assert_eq!(username, "alice");

    h.clock.advance(HOUR + 1);

    let err = assert_err!(h.tokens.validate_access_token(&pair.access_token));
    assert_eq!(err.kind(), ErrorKind::ExpiredToken);
    assert_eq!(
        err.token_failure(),
        Some((TokenStage::Access, &TokenError::Expired))
    );

    assert_eq!(
        assert_ok!(h.tokens.validate_refresh_token(&pair.refresh_token).await),
        "alice"
    );
}

#[tokio::test]
async fn rotation_after_access_expiry() {
    let h = harness().await;
    let pair = assert_ok!(h.registration.register(alice()).await);

    h.clock.advance(2 * HOUR);

    let rotated = assert_ok!(h.tokens.rotate(&pair.access_token, &pair.refresh_token).await);
    assert_ok!(h.tokens.validate_access_token(&rotated.access_token));

    // the old refresh token was superseded by the rotation
    let err = assert_err!(h.tokens.rotate(&pair.access_token, &pair.refresh_token).await);
    assert_eq!(
        err.token_failure(),
        Some((TokenStage::Refresh, &TokenError::NotFound))
    );
}

#[tokio::test]
async fn long_expired_access_token_cannot_rotate() {
    let h = harness().await;
    let pair = assert_ok!(h.registration.register(alice()).await);

    // the refresh token is still good, the access token is far past its grace
    h.clock.advance(29 * 24 * HOUR);
    assert_ok!(h.tokens.validate_refresh_token(&pair.refresh_token).await);

    let err = assert_err!(h.tokens.rotate(&pair.access_token, &pair.refresh_token).await);
    assert_eq!(
        err.token_failure(),
        Some((TokenStage::Access, &TokenError::Expired))
    );

    // a fresh login still rotates
    let fresh = assert_ok!(h.login.with_password(password("alice", "password123")).await);
    assert_ok!(h.tokens.rotate(&fresh.access_token, &fresh.refresh_token).await);
}

#[tokio::test]
async fn refresh_token_ages_out_after_thirty_days() {
    let h = harness().await;
    let pair = assert_ok!(h.registration.register(alice()).await);

    h.clock.advance(30 * 24 * HOUR + 1);

    let err = assert_err!(h.tokens.validate_refresh_token(&pair.refresh_token).await);
    assert_eq!(err.kind(), ErrorKind::ExpiredToken);
}

#[tokio::test]
async fn login_supersedes_registration_tokens() {
    let h = harness().await;
    let first = assert_ok!(h.registration.register(alice()).await);

    let second = assert_ok!(h.login.with_password(password("alice", "password123")).await);

    let err = assert_err!(h.tokens.validate_refresh_token(&first.refresh_token).await);
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_ok!(h.tokens.validate_refresh_token(&second.refresh_token).await);
}

#[tokio::test]
async fn wrong_password_is_rejected() {
    let h = harness().await;
    assert_ok!(h.registration.register(alice()).await);

    let err = assert_err!(h.login.with_password(password("alice", "password124")).await);
    assert!(matches!(err, AuthError::IncorrectPassword));
    assert_eq!(h.store.hash_lookups.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unknown_user_never_reaches_hash_lookup() {
    let h = harness().await;
    assert_ok!(h.registration.register(alice()).await);

    let err = assert_err!(h.login.with_password(password("bob", "password123")).await);
    assert!(matches!(err, AuthError::UserNotExists));
    assert_eq!(h.store.hash_lookups.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn pair_from_two_users_is_a_mismatch() {
    let h = harness().await;
    let alice_pair = assert_ok!(h.registration.register(alice()).await);

    let mut bob = alice();
    bob.username = "bob".to_string();
    bob.email = Some("b@x.com".to_string());
    let bob_pair = assert_ok!(h.registration.register(bob).await);

    let err = assert_err!(
        h.tokens
            .validate_token_pair(&alice_pair.access_token, &bob_pair.refresh_token)
            .await
    );
    assert_eq!(err.kind(), ErrorKind::UsernameMismatch);
    assert_eq!(
        err.token_failure(),
        Some((TokenStage::Pair, &TokenError::UsernameMismatch))
    );
}

#[tokio::test]
async fn duplicate_registration_keeps_first_user() {
    let h = harness().await;
    assert_ok!(h.registration.register(alice()).await);

    let mut again = alice();
    again.email = Some("other@x.com".to_string());
    let err = assert_err!(h.registration.register(again).await);
    assert!(matches!(err, AuthError::UsernameAlreadyExists));

    // the first registration still logs in
    assert_ok!(h.login.with_password(password("alice", "password123")).await);
}
