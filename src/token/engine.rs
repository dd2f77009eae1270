/// Token engine: mints, validates and rotates access/refresh token pairs
use crate::{
    config::{AuthConfig, DEFAULT_ACCESS_TOKEN_TTL_SECS, DEFAULT_REFRESH_TOKEN_TTL_SECS},
    db::{CredentialStore, RefreshTokenRecord},
    error::{AuthError, AuthResult, TokenError, TokenStage},
    token::{
        claims::{Claims, TokenPair},
        clock::{Clock, SystemClock},
    },
};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use std::sync::Arc;
use uuid::Uuid;

/// Lifetimes and rotation policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenSettings {
    pub access_ttl_secs: i64,
    pub refresh_ttl_secs: i64,
    /// Accept an expired access half of a pair, within `rotation_grace_secs`
    pub rotation_accepts_expired_access: bool,
    pub rotation_grace_secs: i64,
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self {
            access_ttl_secs: DEFAULT_ACCESS_TOKEN_TTL_SECS,
            refresh_ttl_secs: DEFAULT_REFRESH_TOKEN_TTL_SECS,
            rotation_accepts_expired_access: true,
            rotation_grace_secs: DEFAULT_ACCESS_TOKEN_TTL_SECS,
        }
    }
}

impl TokenSettings {
    /// Seconds past `exp` that the access half of a pair is still accepted
    fn pair_access_grace(&self) -> i64 {
        if self.rotation_accepts_expired_access {
            self.rotation_grace_secs.max(0)
        } else {
            0
        }
    }
}

impl From<&AuthConfig> for TokenSettings {
    fn from(config: &AuthConfig) -> Self {
        Self {
            access_ttl_secs: config.access_token_ttl_secs,
            refresh_ttl_secs: config.refresh_token_ttl_secs,
            rotation_accepts_expired_access: config.rotation_accepts_expired_access,
            rotation_grace_secs: config.rotation_grace_secs,
        }
    }
}

/// Issues and checks HS256 tokens signed with one process-wide secret.
///
/// Validation runs a fixed pipeline and stops at the first failure:
/// signature and claim structure, expiry, the `authorized` flag, then for
/// refresh tokens the stored-record check, and for pairs subject equality.
pub struct TokenEngine {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    settings: TokenSettings,
    store: Arc<dyn CredentialStore>,
    clock: Arc<dyn Clock>,
}

impl TokenEngine {
    /// Create an engine signing with `secret`. An empty secret is a configuration error.
    pub fn new(secret: &[u8], store: Arc<dyn CredentialStore>) -> AuthResult<Self> {
        if secret.is_empty() {
            return Err(AuthError::Config("Token signing secret is empty".to_string()));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        // expiry is checked against the engine clock, not the system time
        validation.validate_exp = false;
        validation.leeway = 0;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            settings: TokenSettings::default(),
            store,
            clock: Arc::new(SystemClock),
        })
    }

    pub fn with_settings(mut self, settings: TokenSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn settings(&self) -> &TokenSettings {
        &self.settings
    }

    /// Look up the user id for `username`, then mint and store a new pair
    pub async fn issue_token_pair(&self, username: &str) -> AuthResult<TokenPair> {
        let user_id = self.store.lookup_user_id(username).await?;
        self.issue_token_pair_for(user_id, username).await
    }

    /// Mint a pair for a user whose id is already known.
    ///
    /// The refresh token replaces any previous one for this user, so older
    /// refresh tokens stop validating.
    pub async fn issue_token_pair_for(&self, user_id: Uuid, username: &str) -> AuthResult<TokenPair> {
        let (pair, record) = self.mint(user_id, username)?;

        self.store.put_refresh_token(&record).await?;

        tracing::info!(username, %user_id, refresh_expires_at = record.expires_at, "Issued token pair");

        Ok(pair)
    }

    /// Signature and claims check only, no storage access
    pub fn validate_access_token(&self, token: &str) -> AuthResult<Claims> {
        self.check(token, 0)
            .map_err(|e| AuthError::token(TokenStage::Access, e))
    }

    /// Full check of a refresh token, including that it is the one currently stored
    pub async fn validate_refresh_token(&self, token: &str) -> AuthResult<String> {
        let (claims, _) = self.check_refresh(token).await?;
        Ok(claims.user)
    }

    /// Validate both halves and require that they name the same user.
    ///
    /// With lenient rotation the access half may be expired by at most
    /// `rotation_grace_secs`; every other check still applies.
    pub async fn validate_token_pair(&self, access_token: &str, refresh_token: &str) -> AuthResult<String> {
        let (username, _) = self.check_pair(access_token, refresh_token).await?;
        Ok(username)
    }

    /// Exchange a valid pair for a fresh one.
    ///
    /// The stored refresh token is swapped only if it is still the one that
    /// was presented, so of two concurrent rotations with the same pair
    /// exactly one succeeds.
    pub async fn rotate(&self, access_token: &str, refresh_token: &str) -> AuthResult<TokenPair> {
        let (username, current) = self.check_pair(access_token, refresh_token).await?;
        let (pair, record) = self.mint(current.user_id, &username)?;

        if !self.store.replace_refresh_token(refresh_token, &record).await? {
            tracing::warn!(%username, "Refresh token was superseded during rotation");
            return Err(AuthError::token(TokenStage::Refresh, TokenError::NotFound));
        }

        tracing::info!(%username, user_id = %current.user_id, "Rotated token pair");

        Ok(pair)
    }

    fn mint(&self, user_id: Uuid, username: &str) -> AuthResult<(TokenPair, RefreshTokenRecord)> {
        let now = self.clock.now();
        let access_expires_at = now
            .checked_add(self.settings.access_ttl_secs)
            .ok_or_else(|| AuthError::Config("Access token lifetime is out of range".to_string()))?;
        let refresh_expires_at = now
            .checked_add(self.settings.refresh_ttl_secs)
            .ok_or_else(|| AuthError::Config("Refresh token lifetime is out of range".to_string()))?;

        let access_token = self.sign(&Claims::new(username, access_expires_at))?;
        let refresh_token = self.sign(&Claims::new(username, refresh_expires_at))?;

        let record = RefreshTokenRecord {
            user_id,
            token: refresh_token.clone(),
            expires_at: refresh_expires_at,
        };

        Ok((
            TokenPair {
                access_token,
                refresh_token,
            },
            record,
        ))
    }

    async fn check_refresh(&self, token: &str) -> AuthResult<(Claims, RefreshTokenRecord)> {
        let claims = self
            .check(token, 0)
            .map_err(|e| AuthError::token(TokenStage::Refresh, e))?;

        match self.store.find_refresh_token(token).await? {
            Some(record) => Ok((claims, record)),
            None => {
                tracing::debug!(username = %claims.user, "Refresh token is not the stored one");
                Err(AuthError::token(TokenStage::Refresh, TokenError::NotFound))
            }
        }
    }

    async fn check_pair(
        &self,
        access_token: &str,
        refresh_token: &str,
    ) -> AuthResult<(String, RefreshTokenRecord)> {
        let access = self
            .check(access_token, self.settings.pair_access_grace())
            .map_err(|e| AuthError::token(TokenStage::Access, e))?;

        let (refresh, record) = self.check_refresh(refresh_token).await?;

        if access.user != refresh.user {
            tracing::warn!(
                access_user = %access.user,
                refresh_user = %refresh.user,
                "Token pair subjects differ"
            );
            return Err(AuthError::token(TokenStage::Pair, TokenError::UsernameMismatch));
        }

        Ok((refresh.user, record))
    }

    fn sign(&self, claims: &Claims) -> AuthResult<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(format!("Failed to sign token: {}", e)))
    }

    /// Decode and check one token; it stays valid while `exp + grace_secs >= now`
    fn check(&self, token: &str, grace_secs: i64) -> Result<Claims, TokenError> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| TokenError::Invalid(e.to_string()))?
            .claims;

        if claims.exp.saturating_add(grace_secs) < self.clock.now() {
            return Err(TokenError::Expired);
        }

        if !claims.authorized {
            return Err(TokenError::Unauthorized);
        }

        Ok(claims)
    }
}
