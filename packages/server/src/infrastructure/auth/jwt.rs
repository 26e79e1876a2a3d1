//! JWT bearer token verification.
//!
//! Tokens are HS256-signed with claims `{sub, type, exp}` where `type` is
//! `"user"` or `"admin"`. Tokens without `type` predate the role claim and
//! are accepted on either channel.

use async_trait::async_trait;
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};

use crate::domain::{AuthError, Claims, CredentialVerifier, Role};

/// Claims carried by an ordertalk access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    pub exp: usize,
}

/// Sign `claims` with `secret`.
///
/// Token issuance belongs to the auth service; this is here for tooling and tests.
pub fn encode_token(claims: &TokenClaims, secret: &str) -> Result<String, AuthError> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AuthError::InvalidCredential(format!("JWT encoding error: {}", e)))
}

pub struct JwtCredentialVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtCredentialVerifier {
    pub fn new(secret: &str) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let data = decode::<TokenClaims>(token, &self.decoding_key, &self.validation).map_err(
            |e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::InvalidCredential(e.to_string()),
            },
        )?;

        let claims = data.claims;
        if claims.sub.is_empty() {
            return Err(AuthError::InvalidCredential("empty subject".to_string()));
        }
        let role = match claims.token_type.as_deref() {
            None => None,
            Some(value) => Some(Role::parse(value).ok_or_else(|| {
                AuthError::InvalidCredential(format!("unknown token type '{}'", value))
            })?),
        };

        Ok(Claims {
            subject: claims.sub,
            role,
        })
    }
}

#[async_trait]
impl CredentialVerifier for JwtCredentialVerifier {
    async fn verify_credential(&self, token: &str) -> Result<Claims, AuthError> {
        self.verify(token)
    }
}
