/// Claims carried by every access and refresh token
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Fixed claim set. Tokens whose payload does not deserialize into this
/// struct are rejected at parse time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Expiry, unix seconds
    pub exp: i64,
    /// Always true for minted tokens; false fails validation
    pub authorized: bool,
    /// Subject username
    pub user: String,
    /// Unique per minted token
    pub jti: String,
}

impl Claims {
    pub fn new(username: &str, exp: i64) -> Self {
        Self {
            exp,
            authorized: true,
            user: username.to_string(),
            jti: Uuid::new_v4().to_string(),
        }
    }
}

/// Access/refresh tokens handed to a client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    #[serde(rename = "access-token")]
    pub access_token: String,
    #[serde(rename = "refresh-token")]
    pub refresh_token: String,
}
