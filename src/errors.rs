use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum SocialGraphError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("duplicate: {0}")]
    Duplicate(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("referential integrity violation: {0}")]
    ReferentialIntegrity(String),
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("auth error: {0}")]
    Auth(String),
}

impl SocialGraphError {
    pub fn validation<T: Into<String>>(msg: T) -> Self {
        SocialGraphError::Validation(msg.into())
    }

    pub fn duplicate<T: Into<String>>(msg: T) -> Self {
        SocialGraphError::Duplicate(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        SocialGraphError::NotFound(msg.into())
    }

    pub fn integrity<T: Into<String>>(msg: T) -> Self {
        SocialGraphError::ReferentialIntegrity(msg.into())
    }

    pub fn persistence<T: Into<String>>(msg: T) -> Self {
        SocialGraphError::Persistence(msg.into())
    }

    pub fn auth<T: Into<String>>(msg: T) -> Self {
        SocialGraphError::Auth(msg.into())
    }

    /// Errors raised before anything was applied; callers get them back as-is.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            SocialGraphError::Validation(_)
                | SocialGraphError::Duplicate(_)
                | SocialGraphError::NotFound(_)
        )
    }
}
