/// Application context and dependency injection
use crate::{
    account::{
        CodeVerifier, DisabledCodeVerifier, LoginService, PasswordHasher, RegistrationService,
        StaticCodeVerifier,
    },
    config::ServerConfig,
    db::{self, CredentialStore, SqliteCredentialStore},
    error::AuthResult,
    token::{TokenEngine, TokenSettings},
};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub db: SqlitePool,
    pub store: Arc<dyn CredentialStore>,
    pub tokens: Arc<TokenEngine>,
    pub registration: Arc<RegistrationService>,
    pub login: Arc<LoginService>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> AuthResult<Self> {
        config.validate()?;

        let db = db::create_pool(
            &config.storage.database_path,
            db::DatabaseOptions {
                max_connections: config.storage.max_connections,
                ..Default::default()
            },
        )
        .await?;

        db::run_migrations(&db).await?;
        db::test_connection(&db).await?;

        tracing::info!(
            "Account database ready at {}",
            config.storage.database_path.display()
        );

        Self::from_pool(config, db)
    }

    /// Wire services on top of an already migrated pool
    pub fn from_pool(config: ServerConfig, db: SqlitePool) -> AuthResult<Self> {
        Self::from_pool_with_hasher(config, db, PasswordHasher::default())
    }

    pub fn from_pool_with_hasher(
        config: ServerConfig,
        db: SqlitePool,
        hasher: PasswordHasher,
    ) -> AuthResult<Self> {
        let store: Arc<dyn CredentialStore> = Arc::new(SqliteCredentialStore::new(db.clone()));

        let auth = &config.authentication;
        let tokens = Arc::new(
            TokenEngine::new(auth.secret_key.as_bytes(), store.clone())?
                .with_settings(TokenSettings::from(auth)),
        );

        let codes: Arc<dyn CodeVerifier> = match &auth.static_auth_code {
            Some(code) => Arc::new(StaticCodeVerifier::new(code.clone())),
            None => {
                tracing::info!("STATIC_AUTH_CODE not set, code login is disabled");
                Arc::new(DisabledCodeVerifier)
            }
        };

        let registration = Arc::new(
            RegistrationService::new(store.clone(), tokens.clone()).with_hasher(hasher.clone()),
        );
        let login = Arc::new(
            LoginService::new(store.clone(), tokens.clone(), codes).with_hasher(hasher),
        );

        Ok(Self {
            config: Arc::new(config),
            db,
            store,
            tokens,
            registration,
            login,
        })
    }
}
