//! Google Cloud KMS over its REST API.
//!
//! Only the two symmetric calls are used:
//!
//! ```text
//! POST {endpoint}/v1/{resource}:encrypt  {"plaintext": base64}  -> {"ciphertext": token}
//! POST {endpoint}/v1/{resource}:decrypt  {"ciphertext": token}  -> {"plaintext": base64}
//! ```
//!
//! The bearer token comes from `KMSVAULT_ACCESS_TOKEN`,
//! `GOOGLE_OAUTH_ACCESS_TOKEN`, or `gcloud auth print-access-token`, in
//! that order, and is fetched once per process.

use std::process::Command;
use std::sync::OnceLock;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;
use ureq::Agent;

use super::{KeyProvider, ProviderError, ResourceIdentity};

/// Environment variables checked for a ready-made access token.
const TOKEN_ENV_VARS: [&str; 2] = ["KMSVAULT_ACCESS_TOKEN", "GOOGLE_OAUTH_ACCESS_TOKEN"];

#[derive(Serialize)]
struct EncryptRequest {
    plaintext: String,
}

#[derive(Deserialize)]
struct EncryptResponse {
    ciphertext: String,
}

#[derive(Serialize)]
struct DecryptRequest<'a> {
    ciphertext: &'a str,
}

#[derive(Deserialize)]
struct DecryptResponse {
    // The service omits the field for an empty plaintext.
    #[serde(default)]
    plaintext: String,
}

/// Cloud KMS client.  Cheap to share: the HTTP agent pools connections
/// and every worker thread reuses the cached access token.
pub struct CloudKmsProvider {
    agent: Agent,
    endpoint: String,
    token: OnceLock<String>,
}

impl CloudKmsProvider {
    /// Build a client for `endpoint` with a per-request timeout.
    pub fn new(endpoint: &str, request_timeout: Duration) -> Self {
        let config = Agent::config_builder()
            .timeout_global(Some(request_timeout))
            .build();

        Self {
            agent: Agent::new_with_config(config),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            token: OnceLock::new(),
        }
    }

    /// Use a fixed access token instead of discovering one.
    pub fn with_access_token(self, token: impl Into<String>) -> Self {
        let _ = self.token.set(token.into());
        self
    }

    fn access_token(&self) -> Result<String, ProviderError> {
        if let Some(token) = self.token.get() {
            return Ok(token.clone());
        }
        let fetched = discover_access_token()?;
        Ok(self.token.get_or_init(|| fetched).clone())
    }

    fn call<B, R>(&self, identity: &ResourceIdentity, verb: &str, body: &B) -> Result<R, ProviderError>
    where
        B: Serialize,
        R: DeserializeOwned,
    {
        let url = format!("{}/v1/{}:{verb}", self.endpoint, identity.resource_name());
        let token = self.access_token()?;

        debug!(%url, "calling key service");

        let mut response = self
            .agent
            .post(&url)
            .header("Authorization", format!("Bearer {token}"))
            .send_json(body)
            .map_err(map_http_error)?;

        response
            .body_mut()
            .read_json::<R>()
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))
    }
}

impl KeyProvider for CloudKmsProvider {
    fn encrypt(
        &self,
        identity: &ResourceIdentity,
        plaintext: &[u8],
    ) -> Result<String, ProviderError> {
        let request = EncryptRequest {
            plaintext: BASE64.encode(plaintext),
        };
        let response: EncryptResponse = self.call(identity, "encrypt", &request)?;
        Ok(response.ciphertext)
    }

    fn decrypt(
        &self,
        identity: &ResourceIdentity,
        ciphertext: &str,
    ) -> Result<Vec<u8>, ProviderError> {
        let request = DecryptRequest {
            ciphertext: ciphertext.trim(),
        };
        let response: DecryptResponse = self.call(identity, "decrypt", &request)?;
        BASE64
            .decode(response.plaintext)
            .map_err(|e| ProviderError::InvalidResponse(format!("plaintext is not base64: {e}")))
    }
}

fn map_http_error(err: ureq::Error) -> ProviderError {
    match err {
        ureq::Error::StatusCode(code @ (401 | 403)) => {
            ProviderError::Auth(format!("key service rejected credentials (HTTP {code})"))
        }
        ureq::Error::StatusCode(code) => ProviderError::Status(code),
        ureq::Error::Timeout(_) => ProviderError::Timeout,
        other => ProviderError::Request(other.to_string()),
    }
}

/// Find an access token: environment first, then the gcloud CLI.
fn discover_access_token() -> Result<String, ProviderError> {
    for var in TOKEN_ENV_VARS {
        if let Ok(token) = std::env::var(var) {
            let token = token.trim().to_string();
            if !token.is_empty() {
                debug!(source = var, "using access token from environment");
                return Ok(token);
            }
        }
    }

    debug!("asking gcloud for an access token");
    let output = Command::new("gcloud")
        .args(["auth", "print-access-token"])
        .output()
        .map_err(|e| {
            ProviderError::Auth(format!(
                "no access token in {} and gcloud could not be run: {e}",
                TOKEN_ENV_VARS.join(" or ")
            ))
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ProviderError::Auth(format!(
            "gcloud auth print-access-token failed: {}",
            stderr.trim()
        )));
    }

    let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if token.is_empty() {
        return Err(ProviderError::Auth(
            "gcloud returned an empty access token".into(),
        ));
    }
    Ok(token)
}
