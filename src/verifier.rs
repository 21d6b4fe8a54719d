use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, error};

use crate::config::VerifierConfig;
use crate::imei::Imei;

pub const UNAVAILABLE_MESSAGE: &str = "Unable to check IMEI";

/// Outcome of a verification call.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckResult {
    /// Whatever JSON the remote service answered with, untouched
    Decoded(Value),
    /// Transport error, non-2xx status or undecodable body
    Unavailable,
}

impl CheckResult {
    pub fn to_json(&self) -> Value {
        match self {
            CheckResult::Decoded(value) => value.clone(),
            CheckResult::Unavailable => json!({ "error": UNAVAILABLE_MESSAGE }),
        }
    }
}

impl std::fmt::Display for CheckResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

#[async_trait]
pub trait ImeiChecker: Send + Sync {
    async fn check(&self, imei: &Imei) -> CheckResult;
}

#[derive(Debug, Serialize)]
struct CheckRequest<'a> {
    imei: &'a str,
    token: &'a str,
}

pub struct VerificationClient {
    client: reqwest::Client,
    config: VerifierConfig,
}

impl VerificationClient {
    pub fn new(config: VerifierConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    pub fn with_client(client: reqwest::Client, config: VerifierConfig) -> Self {
        Self { client, config }
    }

    async fn request(&self, imei: &Imei) -> Result<Value> {
        let request = CheckRequest {
            imei: imei.as_str(),
            token: &self.config.api_token,
        };

        debug!("Sending IMEI {} to {}", imei, self.config.api_url);

        let response = self
            .client
            .post(&self.config.api_url)
            .json(&request)
            .send()
            .await
            .context("Failed to send request to verification service")?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!("Verification service error ({}): {}", status, error_body);
        }

        response
            .json()
            .await
            .context("Failed to parse verification service response")
    }
}

#[async_trait]
impl ImeiChecker for VerificationClient {
    async fn check(&self, imei: &Imei) -> CheckResult {
        match self.request(imei).await {
            Ok(value) => CheckResult::Decoded(value),
            Err(e) => {
                error!("IMEI check failed: {:#}", e);
                CheckResult::Unavailable
            }
        }
    }
}
