/// Account registration and login
///
/// Both flows end by asking the token engine for a fresh token pair.

mod code;
mod login;
mod password;
mod registration;

pub use code::{CodeVerifier, DisabledCodeVerifier, StaticCodeVerifier};
pub use login::LoginService;
pub use password::PasswordHasher;
pub use registration::RegistrationService;

use crate::{
    db::Contact,
    error::{AuthError, AuthResult},
    token::TokenPair,
};
use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

/// Registration request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RegistrationRequest {
    #[validate(length(min = 3, max = 64))]
    pub username: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    #[serde(default)]
    #[validate(email)]
    pub email: Option<String>,
    #[serde(default)]
    #[validate(length(min = 5, max = 20))]
    pub phone_number: Option<String>,
    #[serde(default, rename = "fullname")]
    #[validate(length(max = 128))]
    pub full_name: Option<String>,
}

impl RegistrationRequest {
    /// Trim optional fields and treat empty ones as absent
    pub fn normalized(self) -> Self {
        fn clean(value: Option<String>) -> Option<String> {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }

        Self {
            username: self.username.trim().to_string(),
            password: self.password,
            email: clean(self.email),
            phone_number: clean(self.phone_number),
            full_name: clean(self.full_name),
        }
    }

    /// Exactly one of email and phone number must be present
    pub fn contact(&self) -> AuthResult<Contact> {
        match (&self.email, &self.phone_number) {
            (Some(email), None) => Ok(Contact::Email(email.clone())),
            (None, Some(phone)) => {
                let digits = phone.strip_prefix('+').unwrap_or(phone);
                if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
                    return Err(AuthError::Validation(
                        "phone_number must contain only digits and an optional leading +".to_string(),
                    ));
                }
                Ok(Contact::Phone(phone.clone()))
            }
            (None, None) => Err(AuthError::Validation(
                "either email or phone_number is required".to_string(),
            )),
            (Some(_), Some(_)) => Err(AuthError::Validation(
                "only one of email or phone_number may be given".to_string(),
            )),
        }
    }
}

/// Login with a one-time code
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthWithCode {
    pub username: String,
    /// Sent as a string or a bare number; kept as text so leading zeros survive
    #[serde(deserialize_with = "code_from_string_or_number")]
    pub code: String,
}

fn code_from_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawCode {
        Text(String),
        Number(u64),
    }

    Ok(match RawCode::deserialize(deserializer)? {
        RawCode::Text(code) => code,
        RawCode::Number(code) => code.to_string(),
    })
}

/// Login with a password
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthWithPassword {
    pub username: String,
    pub password: String,
}

/// Token rotation request body; the access token travels in the Authorization header
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestoreTokenRequest {
    #[serde(rename = "refresh-token")]
    pub refresh_token: String,
}

/// Response carrying a token pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    /// Human readable outcome, e.g. `user created`
    pub message: String,
    /// Serialized inline as `access-token` and `refresh-token`
    #[serde(flatten)]
    pub tokens: TokenPair,
}

impl TokenResponse {
    pub fn new(message: &str, tokens: TokenPair) -> Self {
        Self {
            message: message.to_string(),
            tokens,
        }
    }
}

/// Session info for a valid access token
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SessionInfo {
    pub username: String,
    pub fullname: Option<String>,
    /// Set when the user registered with an email address
    pub email: Option<String>,
    /// Set when the user registered with a phone number
    pub phone_number: Option<String>,
    /// Expiry of the presented access token, unix seconds
    pub expires_at: i64,
}
