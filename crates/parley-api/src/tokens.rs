use std::time::Duration;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use parley_types::api::{Claims, TokenPair, TokenType};

#[derive(Debug, Clone)]
pub struct TokenSettings {
    pub secret: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl TokenSettings {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            access_ttl: Duration::from_secs(5 * 60),
            refresh_ttl: Duration::from_secs(24 * 60 * 60),
        }
    }
}

/// Issues and verifies HS256 access/refresh tokens.
pub struct JwtIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl JwtIssuer {
    pub fn new(settings: &TokenSettings) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(settings.secret.as_bytes()),
            decoding: DecodingKey::from_secret(settings.secret.as_bytes()),
            validation,
            access_ttl: settings.access_ttl,
            refresh_ttl: settings.refresh_ttl,
        }
    }

    pub fn issue_pair(&self, user_id: i64, username: &str) -> anyhow::Result<TokenPair> {
        Ok(TokenPair {
            refresh: self.issue(TokenType::Refresh, user_id, username, self.refresh_ttl)?,
            access: self.issue(TokenType::Access, user_id, username, self.access_ttl)?,
        })
    }

    /// Access token alone, for operators acting on a user's behalf.
    pub fn issue_access(&self, user_id: i64, username: &str) -> anyhow::Result<String> {
        self.issue(TokenType::Access, user_id, username, self.access_ttl)
    }

    /// New access token for a valid refresh token. The refresh token itself
    /// is not rotated.
    pub fn refresh(&self, refresh_token: &str) -> Option<String> {
        let claims = self.verify(refresh_token, TokenType::Refresh)?;
        self.issue_access(claims.sub, &claims.username).ok()
    }

    /// Decodes `token` and checks signature, expiry and type.
    pub fn verify(&self, token: &str, expected: TokenType) -> Option<Claims> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).ok()?;
        (data.claims.token_type == expected).then_some(data.claims)
    }

    fn issue(
        &self,
        token_type: TokenType,
        user_id: i64,
        username: &str,
        ttl: Duration,
    ) -> anyhow::Result<String> {
        let ttl = chrono::Duration::from_std(ttl)?;
        let exp = (chrono::Utc::now() + ttl).timestamp() as usize;
        self.encode_claims(&Claims {
            token_type,
            sub: user_id,
            username: username.to_string(),
            exp,
            jti: Uuid::new_v4(),
        })
    }

    fn encode_claims(&self, claims: &Claims) -> anyhow::Result<String> {
        Ok(encode(&Header::new(Algorithm::HS256), claims, &self.encoding)?)
    }
}
