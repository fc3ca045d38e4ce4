use anyhow::Result;
use chrono::Duration;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifetime of tokens minted by `create_token`.
pub const TOKEN_TTL_HOURS: i64 = 24;

/// JWT Claims - data stored in the token
///
/// Tokens are issued by the identity provider with the shared secret; only
/// `sub`, `exp` and `iss` are required to verify.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    #[serde(alias = "userId")]
    pub sub: String, // Subject (user id as issued by the identity provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub exp: i64, // Expiration timestamp
    #[serde(default)]
    pub iat: i64, // Issued at timestamp
    pub iss: String, // Issuer
    #[serde(default)]
    pub jti: String, // JWT ID (unique token identifier)
}

/// JWT Service - creates and verifies JWT tokens
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
}

impl JwtService {
    /// Create new JWT service with secret and issuer
    pub fn new(secret: &str, issuer: String) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            issuer,
        }
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Create a token for `subject` that expires after 24 hours
    pub fn create_token(&self, subject: &str, email: Option<String>) -> Result<String> {
        self.create_token_with_ttl(subject, email, Duration::hours(TOKEN_TTL_HOURS))
    }

    pub fn create_token_with_ttl(
        &self,
        subject: &str,
        email: Option<String>,
        ttl: Duration,
    ) -> Result<String> {
        let now = chrono::Utc::now();
        let exp = now + ttl;

        let claims = Claims {
            sub: subject.to_string(),
            email,
            exp: exp.timestamp(),
            iat: now.timestamp(),
            iss: self.issuer.clone(),
            jti: Uuid::new_v4().to_string(), // Unique token ID
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(Into::into)
    }

    /// Verify and decode a JWT token
    ///
    /// Returns claims if token is valid and not expired
    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.issuer]);

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(Into::into)
    }
}
