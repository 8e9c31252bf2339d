use chrono::Duration;
use chrono::Local;
use hmac::{Hmac, Mac};
use jwt::SignWithKey;
use jwt::VerifyWithKey;
use serde::Deserialize;
use serde::Serialize;
use sha2::Sha256;

use crate::database::schema::{User, Uuid};
use crate::error::ApiError;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtSessionData {
    pub user_id: Uuid,
    pub email: String,
    iat: i64,
    exp: i64,
}

impl JwtSessionData {
    pub fn new(id: Uuid, email: String, lifetime: Duration) -> Self {
        let now = Local::now();
        let iat = now.timestamp();
        let exp = (now + lifetime).timestamp();

        Self {
            user_id: id,
            email,
            iat,
            exp,
        }
    }

    pub fn is_expired(&self) -> bool {
        (self.exp - Local::now().timestamp()).is_negative()
    }
}

/// The identity a request was authenticated as.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionData {
    pub user_id: Uuid,
    pub email: String,
}

impl From<&User> for SessionData {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            email: user.email.to_owned(),
        }
    }
}

/// Signs and checks the bearer tokens handed out at login.
#[derive(Clone)]
pub struct TokenIssuer {
    key: Hmac<Sha256>,
    lifetime: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &[u8], lifetime: Duration) -> Result<Self, hmac::digest::InvalidLength> {
        Ok(Self {
            key: Hmac::new_from_slice(secret)?,
            lifetime,
        })
    }

    pub fn issue(&self, user: &User) -> Result<String, ApiError> {
        let claims = JwtSessionData::new(user.id, user.email.to_owned(), self.lifetime);

        claims
            .sign_with_key(&self.key)
            .map_err(|e| ApiError::Token(format!("{e}")))
    }

    pub fn verify(&self, token: &str) -> Result<JwtSessionData, ApiError> {
        let session: JwtSessionData = token
            .verify_with_key(&self.key)
            .map_err(|_| ApiError::InvalidToken)?;

        if session.is_expired() {
            return Err(ApiError::InvalidToken);
        }
        Ok(session)
    }
}
