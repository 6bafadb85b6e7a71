//! Typed boundary to the copy-trading backend.
//!
//! One operation per backend capability, no retries: callers own retry
//! policy, and during polling failures are contained per account anyway.

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::{ClientConfig, DEFAULT_TIMEOUT};
use crate::error::ClientError;
use crate::models::{
    AccountStatus, BalanceSnapshot, CopyResult, FollowerAccount, FollowerCredential,
    GlobalCopyState, LeaderConfig, NewFollowerAccount,
};

use super::types::{CreatedAccount, ErrorBody, StatusUpdate, VerifyOutcome};

/// Backend operations the rest of the client is written against.
///
/// The reconciler and coordinator only see this trait, so tests drive
/// them with an in-memory fake instead of a live server.
#[async_trait]
pub trait BackendGateway: Send + Sync {
    async fn copy_status(&self) -> Result<GlobalCopyState, ClientError>;
    async fn set_leader(&self, config: &LeaderConfig) -> Result<(), ClientError>;
    async fn start_copy(&self) -> Result<(), ClientError>;
    async fn stop_copy(&self) -> Result<(), ClientError>;
    async fn list_accounts(&self) -> Result<Vec<FollowerAccount>, ClientError>;
    async fn create_follower_account(
        &self,
        account: &NewFollowerAccount,
    ) -> Result<CreatedAccount, ClientError>;
    async fn delete_follower_account(&self, name: &str) -> Result<(), ClientError>;
    async fn verify_credentials(
        &self,
        credential: &FollowerCredential,
    ) -> Result<VerifyOutcome, ClientError>;
    async fn fetch_balance(&self, name: &str) -> Result<BalanceSnapshot, ClientError>;
    async fn fetch_copy_results(&self) -> Result<HashMap<String, CopyResult>, ClientError>;
    async fn update_account_status(
        &self,
        name: &str,
        status: AccountStatus,
    ) -> Result<(), ClientError>;
}

/// `BackendGateway` over HTTP with bearer-token auth.
pub struct HttpGateway {
    client: Client,
    base_url: Url,
}

impl HttpGateway {
    /// Build a gateway from connection settings.
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| ClientError::Validation(format!("invalid base URL: {e}")))?;

        let mut headers = HeaderMap::new();
        if !config.api_token.is_empty() {
            let value = HeaderValue::from_str(&format!("Bearer {}", config.api_token))
                .map_err(|e| ClientError::Validation(format!("invalid API token: {e}")))?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .default_headers(headers)
            .build()
            .map_err(ClientError::transport)?;

        Ok(Self { client, base_url })
    }

    /// Build a URL from path segments. Segments are pushed one at a
    /// time so account names get percent-encoded, never spliced raw.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::Validation("base URL cannot carry paths".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        let response = request.send().await.map_err(ClientError::transport)?;
        let response = Self::check(response).await?;
        response.json().await.map_err(ClientError::transport)
    }

    /// Like `send`, for endpoints whose success body is just an ack.
    async fn send_ack(&self, request: RequestBuilder) -> Result<(), ClientError> {
        let response = request.send().await.map_err(ClientError::transport)?;
        Self::check(response).await?;
        Ok(())
    }

    async fn check(response: Response) -> Result<Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|b| b.detail);
        Err(ClientError::backend(status.as_u16(), detail))
    }
}

#[async_trait]
impl BackendGateway for HttpGateway {
    async fn copy_status(&self) -> Result<GlobalCopyState, ClientError> {
        let url = self.endpoint(&["copy", "status"])?;
        debug!(url = %url, "Fetching copy status");
        self.send(self.client.get(url)).await
    }

    async fn set_leader(&self, config: &LeaderConfig) -> Result<(), ClientError> {
        let url = self.endpoint(&["leader"])?;
        debug!(url = %url, env = %config.env, "Saving leader credentials");
        self.send_ack(self.client.put(url).json(config)).await
    }

    async fn start_copy(&self) -> Result<(), ClientError> {
        let url = self.endpoint(&["copy", "start"])?;
        debug!(url = %url, "Starting copy");
        self.send_ack(self.client.post(url)).await
    }

    async fn stop_copy(&self) -> Result<(), ClientError> {
        let url = self.endpoint(&["copy", "stop"])?;
        debug!(url = %url, "Stopping copy");
        self.send_ack(self.client.post(url)).await
    }

    async fn list_accounts(&self) -> Result<Vec<FollowerAccount>, ClientError> {
        let url = self.endpoint(&["accounts"])?;
        debug!(url = %url, "Listing follower accounts");
        self.send(self.client.get(url)).await
    }

    async fn create_follower_account(
        &self,
        account: &NewFollowerAccount,
    ) -> Result<CreatedAccount, ClientError> {
        let url = self.endpoint(&["follower-accounts"])?;
        debug!(url = %url, name = %account.name, "Creating follower account");
        self.send(self.client.post(url).json(account)).await
    }

    async fn delete_follower_account(&self, name: &str) -> Result<(), ClientError> {
        let url = self.endpoint(&["follower-accounts", name])?;
        debug!(url = %url, name = %name, "Deleting follower account");
        self.send_ack(self.client.delete(url)).await
    }

    async fn verify_credentials(
        &self,
        credential: &FollowerCredential,
    ) -> Result<VerifyOutcome, ClientError> {
        let url = self.endpoint(&["follower-accounts", "verify"])?;
        debug!(url = %url, exchange = %credential.exchange(), "Verifying credentials");
        self.send(self.client.post(url).json(credential)).await
    }

    async fn fetch_balance(&self, name: &str) -> Result<BalanceSnapshot, ClientError> {
        let url = self.endpoint(&["balances", name])?;
        debug!(url = %url, name = %name, "Fetching balance");
        self.send(self.client.get(url)).await
    }

    async fn fetch_copy_results(&self) -> Result<HashMap<String, CopyResult>, ClientError> {
        let url = self.endpoint(&["copy", "results"])?;
        debug!(url = %url, "Fetching copy results");
        self.send(self.client.get(url)).await
    }

    async fn update_account_status(
        &self,
        name: &str,
        status: AccountStatus,
    ) -> Result<(), ClientError> {
        let url = self.endpoint(&["accounts", name, "status"])?;
        debug!(url = %url, name = %name, status = %status, "Updating account status");
        self.send_ack(self.client.put(url).json(&StatusUpdate { status }))
            .await
    }
}
