//! RS256 token issuance
//!
//! Tokens are signed with a local RSA private key so the key never leaves
//! the issuing host; the remote side verifies with the public half. The
//! key is read from disk on every issuance (tokens are short-lived and
//! issued once per file, so the read is negligible), which also means a
//! key that goes missing mid-run fails the run it belongs to rather than
//! some later restart.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use porelay_core::TokenIssuer;
use porelay_domain::{RelayError, Result, Token, TokenConfig};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Claims embedded in and protected by the token's signature.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    /// Issuer identity.
    iss: String,
    /// Customer identifier.
    sub: String,
    /// Issued-at, seconds since the epoch.
    iat: i64,
    /// Expiry, `iat` plus the configured minutes.
    exp: i64,
}

/// Token issuer backed by an RSA private key PEM on disk.
pub struct RsaTokenIssuer {
    private_key_path: PathBuf,
    issuer: String,
    customer_id: String,
    expiry_minutes: u32,
}

impl RsaTokenIssuer {
    pub fn from_config(config: &TokenConfig) -> Self {
        Self {
            private_key_path: config.private_key_path.clone(),
            issuer: config.issuer.clone(),
            customer_id: config.customer_id.clone(),
            expiry_minutes: config.expiry_minutes,
        }
    }

    /// Load and validate the private key.
    ///
    /// # Errors
    /// `RelayError::KeyLoad` if the file is missing, unreadable, or not a
    /// valid RSA PEM.
    fn load_key(&self) -> Result<EncodingKey> {
        let pem = std::fs::read(&self.private_key_path).map_err(|err| {
            RelayError::KeyLoad(format!(
                "cannot read private key {}: {err}",
                self.private_key_path.display()
            ))
        })?;

        EncodingKey::from_rsa_pem(&pem).map_err(|err| {
            RelayError::KeyLoad(format!(
                "{} is not a valid RSA private key: {err}",
                self.private_key_path.display()
            ))
        })
    }
}

#[async_trait]
impl TokenIssuer for RsaTokenIssuer {
    async fn issue(&self) -> Result<Token> {
        let key = self.load_key()?;

        let now = Utc::now();
        let expires_at = now + chrono::Duration::minutes(i64::from(self.expiry_minutes));
        let claims = Claims {
            iss: self.issuer.clone(),
            sub: self.customer_id.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let value = encode(&Header::new(Algorithm::RS256), &claims, &key)
            .map_err(|err| RelayError::Signing(format!("RS256 signing failed: {err}")))?;

        info!(
            subject = %self.customer_id,
            expiry_minutes = self.expiry_minutes,
            "issued submission token"
        );
        debug!(issuer = %self.issuer, expires_at = %expires_at, "token claims");

        Ok(Token {
            value,
            issuer: self.issuer.clone(),
            subject: self.customer_id.clone(),
            expires_at,
        })
    }
}
