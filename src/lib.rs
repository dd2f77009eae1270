//! Account service issuing, validating and rotating access/refresh token pairs
//!
//! Users register with a password and an email or phone number, log in with
//! a password or a one-time code, and exchange an access/refresh pair for a
//! new one. Each user has at most one live refresh token.

pub mod account;
pub mod api;
pub mod cli;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod server;
pub mod token;

pub use config::ServerConfig;
pub use context::AppContext;
pub use error::{AuthError, AuthResult};
