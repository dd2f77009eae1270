/// One-time code verification
use crate::error::AuthResult;
use async_trait::async_trait;

/// Checks a one-time code previously delivered to the user (SMS, email).
#[async_trait]
pub trait CodeVerifier: Send + Sync {
    async fn verify(&self, username: &str, code: &str) -> AuthResult<bool>;
}

/// Accepts one fixed code for every user. For development setups.
pub struct StaticCodeVerifier {
    code: String,
}

impl StaticCodeVerifier {
    pub fn new(code: impl Into<String>) -> Self {
        Self { code: code.into() }
    }
}

#[async_trait]
impl CodeVerifier for StaticCodeVerifier {
    async fn verify(&self, _username: &str, code: &str) -> AuthResult<bool> {
        Ok(!code.is_empty() && code == self.code)
    }
}

/// Rejects every code
pub struct DisabledCodeVerifier;

#[async_trait]
impl CodeVerifier for DisabledCodeVerifier {
    async fn verify(&self, username: &str, _code: &str) -> AuthResult<bool> {
        tracing::debug!(username, "Code login attempted but no code verifier is configured");
        Ok(false)
    }
}
