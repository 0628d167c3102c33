use std::path::Path;

use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::DashboardError;

pub const SECRET_ENV: &str = "GCP_SERVICE_ACCOUNT";
pub const SECRET_FILE_ENV: &str = "GCP_SERVICE_ACCOUNT_FILE";

const DRIVE_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/drive.readonly";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const TOKEN_LIFETIME_SECS: i64 = 3600;

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccount {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

impl ServiceAccount {
    pub fn from_json(raw: &str) -> Result<Self, DashboardError> {
        let account: ServiceAccount = serde_json::from_str(raw)
            .map_err(|e| DashboardError::Credentials(e.to_string()))?;

        if account.client_email.trim().is_empty() {
            return Err(DashboardError::Credentials(
                "client_email is empty".to_string(),
            ));
        }
        if !account.private_key.contains("PRIVATE KEY") {
            return Err(DashboardError::Credentials(
                "private_key is not a PEM encoded key".to_string(),
            ));
        }

        Ok(account)
    }

    /// Reads the secret from `GCP_SERVICE_ACCOUNT`, falling back to the file
    /// named by `GCP_SERVICE_ACCOUNT_FILE`.
    pub fn from_env() -> Result<Self, DashboardError> {
        if let Ok(raw) = std::env::var(SECRET_ENV) {
            return Self::from_json(&raw);
        }

        let path = std::env::var(SECRET_FILE_ENV).map_err(|_| {
            DashboardError::Credentials(format!("{SECRET_ENV} or {SECRET_FILE_ENV} must be set"))
        })?;
        Self::from_file(Path::new(&path))
    }

    pub fn from_file(path: &Path) -> Result<Self, DashboardError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            DashboardError::Credentials(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json(&raw)
    }

    fn signed_assertion(&self, now: i64) -> Result<String, DashboardError> {
        let claims = Claims {
            iss: &self.client_email,
            scope: DRIVE_READONLY_SCOPE,
            aud: &self.token_uri,
            iat: now,
            exp: now + TOKEN_LIFETIME_SECS,
        };
        let key = EncodingKey::from_rsa_pem(self.private_key.as_bytes())
            .map_err(|e| DashboardError::Credentials(e.to_string()))?;

        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &key)
            .map_err(|e| DashboardError::Credentials(e.to_string()))
    }

    /// Exchanges a signed JWT for a read-only Drive access token.
    pub async fn access_token(&self, client: &Client) -> Result<String, DashboardError> {
        let assertion = self.signed_assertion(Utc::now().timestamp())?;
        let token = exchange_assertion(client, &self.token_uri, &assertion).await?;

        info!(account = %self.client_email, "service account authorized");
        Ok(token)
    }
}

/// Every failure at this stage is reported as a credential error.
async fn exchange_assertion(
    client: &Client,
    token_uri: &str,
    assertion: &str,
) -> Result<String, DashboardError> {
    debug!(token_uri, "requesting access token");

    let response = client
        .post(token_uri)
        .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion)])
        .send()
        .await
        .map_err(|e| DashboardError::Credentials(format!("token exchange failed: {e}")))?;

    if !response.status().is_success() {
        return Err(DashboardError::Credentials(format!(
            "token endpoint returned status {}",
            response.status()
        )));
    }

    let token: TokenResponse = response
        .json()
        .await
        .map_err(|e| DashboardError::Credentials(e.to_string()))?;
    Ok(token.access_token)
}
