//! Credential resolution. Token issuance and password handling live outside
//! this crate; the gateway only maps a presented credential to an account.

use std::fmt;

use ahash::AHashMap;
use async_trait::async_trait;
use parking_lot::RwLock;

use crate::{SocialGraphError, ids::AccountId};

#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn bearer<T: Into<String>>(token: T) -> Self {
        Self(token.into())
    }

    /// Parses an `Authorization` header value of the form `Bearer <token>`.
    pub fn from_header(value: Option<&str>) -> Result<Self, SocialGraphError> {
        let token = value
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| SocialGraphError::auth("access token required"))?;
        Ok(Self(token.to_string()))
    }

    pub fn token(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Principal {
    pub account: AccountId,
    pub active: bool,
}

#[async_trait]
pub trait AuthGateway: Send + Sync {
    async fn resolve(&self, credential: &Credential) -> Result<Principal, SocialGraphError>;
}

#[async_trait]
impl<A> AuthGateway for std::sync::Arc<A>
where
    A: AuthGateway + ?Sized,
{
    async fn resolve(&self, credential: &Credential) -> Result<Principal, SocialGraphError> {
        (**self).resolve(credential).await
    }
}

/// Resolves the credential and rejects inactive accounts.
pub async fn authorize<A>(gateway: &A, credential: &Credential) -> Result<AccountId, SocialGraphError>
where
    A: AuthGateway + ?Sized,
{
    let principal = gateway.resolve(credential).await?;
    if !principal.active {
        return Err(SocialGraphError::auth(format!(
            "account {} is inactive",
            principal.account
        )));
    }
    Ok(principal.account)
}

/// Fixed token table, suitable for tests and single-user deployments.
#[derive(Default)]
pub struct StaticAuthGateway {
    tokens: RwLock<AHashMap<String, Principal>>,
}

impl StaticAuthGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T: Into<String>>(&self, token: T, account: AccountId) {
        self.tokens.write().insert(
            token.into(),
            Principal {
                account,
                active: true,
            },
        );
    }

    pub fn set_active(&self, account: &AccountId, active: bool) {
        for principal in self.tokens.write().values_mut() {
            if &principal.account == account {
                principal.active = active;
            }
        }
    }

    pub fn revoke(&self, token: &str) {
        self.tokens.write().remove(token);
    }
}

#[async_trait]
impl AuthGateway for StaticAuthGateway {
    async fn resolve(&self, credential: &Credential) -> Result<Principal, SocialGraphError> {
        self.tokens
            .read()
            .get(credential.token())
            .cloned()
            .ok_or_else(|| SocialGraphError::auth("invalid or expired token"))
    }
}
