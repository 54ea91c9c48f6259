//! JWT encoding for issued tokens.

use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use restprobe_domain::{Claims, Token};
use serde::{Deserialize, Serialize};

use super::token_manager::TokenManagerError;

#[derive(Serialize)]
struct OutgoingClaims<'a> {
    sub: &'a str,
    iat: i64,
    exp: i64,
    #[serde(flatten)]
    extra: &'a Claims,
}

#[derive(Deserialize)]
struct IncomingClaims {
    sub: String,
    iat: i64,
    exp: i64,
    #[serde(flatten)]
    extra: Claims,
}

/// HS256 signer/verifier bound to one secret.
pub(super) struct TokenCodec {
    header: Header,
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenCodec {
    pub(super) fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is judged against the manager's clock, not the system clock.
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            header: Header::new(Algorithm::HS256),
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
        }
    }

    pub(super) fn encode(
        &self,
        subject: &str,
        claims: Claims,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<Token, TokenManagerError> {
        let wire = OutgoingClaims {
            sub: subject,
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            extra: &claims,
        };
        let raw = jsonwebtoken::encode(&self.header, &wire, &self.encoding)
            .map_err(|e| TokenManagerError::Signing(e.to_string()))?;

        Ok(Token::new(raw, subject.to_string(), claims, issued_at, expires_at))
    }

    /// Verify the signature and structure of `raw`. Expiry is not checked.
    pub(super) fn decode(&self, raw: &str) -> Result<Token, TokenManagerError> {
        let data = jsonwebtoken::decode::<IncomingClaims>(raw, &self.decoding, &self.validation)
            .map_err(|e| TokenManagerError::Malformed(e.to_string()))?;
        let claims = data.claims;

        let issued_at = timestamp(claims.iat, "iat")?;
        let expires_at = timestamp(claims.exp, "exp")?;
        if expires_at <= issued_at {
            return Err(TokenManagerError::Malformed(format!(
                "exp ({}) is not after iat ({})",
                claims.exp, claims.iat
            )));
        }

        Ok(Token::new(raw.to_string(), claims.sub, claims.extra, issued_at, expires_at))
    }
}

fn timestamp(secs: i64, claim: &str) -> Result<DateTime<Utc>, TokenManagerError> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .ok_or_else(|| TokenManagerError::Malformed(format!("{claim} out of range: {secs}")))
}
