//! OAuth access tokens for the Sheets API.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::SheetsError;

const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Tokens this close to expiry are refreshed.
const REFRESH_MARGIN_SECS: i64 = 60;

#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// A bearer token valid for the spreadsheets scope.
    ///
    /// # Errors
    ///
    /// Returns [`SheetsError`] when a token cannot be obtained.
    async fn access_token(&self) -> Result<String, SheetsError>;
}

/// A fixed token, for tests and pre-authorized environments.
#[derive(Debug, Clone)]
pub struct StaticToken(pub String);

#[async_trait]
impl TokenProvider for StaticToken {
    async fn access_token(&self) -> Result<String, SheetsError> {
        Ok(self.0.clone())
    }
}

/// JWT claims for the service-account bearer grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct Claims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - Duration::seconds(REFRESH_MARGIN_SECS) > now
    }
}

/// Exchanges a signed RS256 assertion for an access token and caches it
/// until shortly before expiry.
pub struct ServiceAccountTokenProvider {
    client: Client,
    email: String,
    key: EncodingKey,
    token_url: String,
    cached: Mutex<Option<CachedToken>>,
}

impl ServiceAccountTokenProvider {
    /// # Errors
    ///
    /// Returns [`SheetsError::Key`] if `private_key_pem` is not an RSA PEM
    /// key, or [`SheetsError::Http`] if the HTTP client cannot be built.
    pub fn new(email: &str, private_key_pem: &str) -> Result<Self, SheetsError> {
        Self::with_token_url(email, private_key_pem, TOKEN_URL)
    }

    /// Same as [`ServiceAccountTokenProvider::new`] with a custom token
    /// endpoint (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// See [`ServiceAccountTokenProvider::new`].
    pub fn with_token_url(
        email: &str,
        private_key_pem: &str,
        token_url: &str,
    ) -> Result<Self, SheetsError> {
        let key = EncodingKey::from_rsa_pem(private_key_pem.as_bytes())?;
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            email: email.to_string(),
            key,
            token_url: token_url.to_string(),
            cached: Mutex::new(None),
        })
    }

    fn claims(&self, now: DateTime<Utc>) -> Claims {
        Claims {
            iss: self.email.clone(),
            scope: SHEETS_SCOPE.to_string(),
            aud: self.token_url.clone(),
            iat: now.timestamp(),
            exp: now.timestamp() + ASSERTION_LIFETIME_SECS,
        }
    }

    async fn fetch(&self, now: DateTime<Utc>) -> Result<CachedToken, SheetsError> {
        let assertion = encode(&Header::new(Algorithm::RS256), &self.claims(now), &self.key)?;
        let resp = self
            .client
            .post(&self.token_url)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(SheetsError::Auth {
                status: status.as_u16(),
                message,
            });
        }
        let token: TokenResponse = resp.json().await?;
        tracing::debug!(expires_in = token.expires_in, "obtained sheets access token");
        Ok(CachedToken {
            token: token.access_token,
            expires_at: now + Duration::seconds(token.expires_in),
        })
    }
}

#[async_trait]
impl TokenProvider for ServiceAccountTokenProvider {
    async fn access_token(&self) -> Result<String, SheetsError> {
        let now = Utc::now();
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(now)) {
            return Ok(token.token.clone());
        }
        let fresh = self.fetch(now).await?;
        let token = fresh.token.clone();
        *cached = Some(fresh);
        Ok(token)
    }
}
