//! Signed session tokens (HS256 JWTs) and the checks applied to the
//! `Authorization` header of protected requests.

use anyhow::{Context, Result};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub const SESSION_TOKEN_LIFETIME_SECS: u64 = 24 * 60 * 60;

const BEARER_SCHEME: &str = "Bearer";

/// HMAC key shared by issuer and verifier.
#[derive(Clone)]
pub struct SigningSecret(Vec<u8>);

impl SigningSecret {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        SigningSecret(bytes.into())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SigningSecret(<{} bytes redacted>)", self.0.len())
    }
}

impl PartialEq for SigningSecret {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub user_id: usize,
    pub username: String,
    pub iat: u64,
    pub exp: u64,
}

/// Claims as they come off the wire, before the shape of `user_id` is checked.
#[derive(Deserialize)]
struct UncheckedClaims {
    user_id: Option<serde_json::Value>,
    username: Option<serde_json::Value>,
    iat: Option<serde_json::Value>,
    exp: u64,
}

impl UncheckedClaims {
    fn check(self) -> Option<SessionClaims> {
        let user_id = non_negative_integer(self.user_id.as_ref()?)?;
        let username = match self.username {
            Some(serde_json::Value::String(username)) => username,
            None => String::new(),
            Some(_) => return None,
        };
        let iat = match self.iat {
            Some(ref value) => non_negative_integer(value)? as u64,
            None => 0,
        };
        Some(SessionClaims {
            user_id,
            username,
            iat,
            exp: self.exp,
        })
    }
}

/// Accepts `5` and `5.0`, rejects negatives, fractions and non-numbers.
fn non_negative_integer(value: &serde_json::Value) -> Option<usize> {
    if let Some(n) = value.as_u64() {
        return usize::try_from(n).ok();
    }
    let f = value.as_f64()?;
    if f >= 0.0 && f.fract() == 0.0 && f <= u32::MAX as f64 {
        Some(f as usize)
    } else {
        None
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AuthRejection {
    #[error("authorization header required")]
    MissingCredentials,

    #[error("authorization header format must be Bearer <token>")]
    MalformedHeader,

    #[error("invalid or expired token")]
    InvalidToken,

    #[error("invalid or expired token")]
    Expired,

    #[error("invalid token claims")]
    InvalidClaims,
}

fn unix_now() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}

pub struct TokenIssuer {
    key: EncodingKey,
}

impl TokenIssuer {
    pub fn new(secret: &SigningSecret) -> Self {
        TokenIssuer {
            key: EncodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn issue(&self, user_id: usize, username: &str) -> Result<String> {
        self.issue_at(user_id, username, unix_now())
    }

    pub fn issue_at(&self, user_id: usize, username: &str, now: u64) -> Result<String> {
        let claims = SessionClaims {
            user_id,
            username: username.to_owned(),
            iat: now,
            exp: now + SESSION_TOKEN_LIFETIME_SECS,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.key)
            .with_context(|| format!("Failed to sign session token for user {}", user_id))
    }
}

pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(secret: &SigningSecret) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        TokenVerifier {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn verify(&self, token: &str) -> Result<SessionClaims, AuthRejection> {
        let data = decode::<UncheckedClaims>(token, &self.key, &self.validation).map_err(
            |err| match err.kind() {
                ErrorKind::ExpiredSignature => AuthRejection::Expired,
                _ => AuthRejection::InvalidToken,
            },
        )?;
        data.claims.check().ok_or(AuthRejection::InvalidClaims)
    }

    /// Runs the full header check: presence, `Bearer <token>` shape, then
    /// signature, expiry and claims.
    pub fn authenticate(&self, header: Option<&str>) -> Result<SessionClaims, AuthRejection> {
        let header = header
            .filter(|h| !h.trim().is_empty())
            .ok_or(AuthRejection::MissingCredentials)?;
        let token = parse_bearer(header)?;
        self.verify(token)
    }
}

fn parse_bearer(header: &str) -> Result<&str, AuthRejection> {
    let parts: Vec<&str> = header.split(' ').collect();
    match parts.as_slice() {
        [scheme, token] if *scheme == BEARER_SCHEME => Ok(*token),
        _ => Err(AuthRejection::MalformedHeader),
    }
}
