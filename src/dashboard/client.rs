use anyhow::Result;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, ACCEPT, AUTHORIZATION, LINK, RETRY_AFTER};
use reqwest::{Client, Method, Response, StatusCode};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Semaphore;

use super::types::*;
use super::DashboardApi;
use crate::config::Config;
use crate::models::{Device, Network, Profile, ProfileCategory, WirelessProfileIds};

const PAGE_SIZE: &str = "1000";
const MAX_BACKOFF_SECS: u64 = 30;

/// A dashboard call that failed after the client gave up
#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("dashboard API error {status} on {path}: {body}")]
    Status {
        status: StatusCode,
        path: String,
        body: String,
    },

    #[error("dashboard API retries exhausted on {path} after {attempts} attempts: {last}")]
    RetriesExhausted {
        path: String,
        attempts: u32,
        last: String,
    },
}

/// Dashboard REST API client
pub struct DashboardClient {
    base_url: String,
    api_key: String,
    client: Client,
    limiter: Arc<Semaphore>,
    max_retries: u32,
}

impl DashboardClient {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {}", e))?;

        Ok(Self::with_client(config, client))
    }

    /// Wrap an already configured HTTP client
    pub fn with_client(config: &Config, client: Client) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            client,
            limiter: Arc::new(Semaphore::new(config.max_requests)),
            max_retries: config.max_retries,
        }
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn auth_header(&self) -> String {
        format!("Bearer {}", self.api_key)
    }

    /// Send one request, retrying rate limits, server errors and transport failures
    async fn send(
        &self,
        method: Method,
        url: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<Response> {
        let mut attempt: u32 = 0;
        loop {
            let permit = self.limiter.acquire().await?;

            let mut req = self
                .client
                .request(method.clone(), url)
                .header(AUTHORIZATION, self.auth_header())
                .header(ACCEPT, "application/json")
                .query(query);
            if let Some(body) = body {
                req = req.json(body);
            }

            let (delay, last) = match req.send().await {
                Ok(resp) => {
                    let status = resp.status();
                    tracing::debug!("{} {} -> {}", method, url, status);

                    if status.is_success() {
                        return Ok(resp);
                    }
                    if !is_retryable(status) {
                        let body = resp.text().await.unwrap_or_default();
                        return Err(DashboardError::Status {
                            status,
                            path: url.to_string(),
                            body,
                        }
                        .into());
                    }
                    let delay = retry_after(resp.headers()).unwrap_or_else(|| backoff(attempt));
                    (delay, status.to_string())
                }
                Err(e) => {
                    tracing::debug!("{} {} -> {}", method, url, e);
                    (backoff(attempt), e.to_string())
                }
            };
            drop(permit);

            if attempt >= self.max_retries {
                return Err(DashboardError::RetriesExhausted {
                    path: url.to_string(),
                    attempts: attempt + 1,
                    last,
                }
                .into());
            }
            attempt += 1;
            tracing::warn!(
                "{} {} failed ({}), retry {}/{} in {:?}",
                method,
                url,
                last,
                attempt,
                self.max_retries,
                delay
            );
            tokio::time::sleep(delay).await;
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let resp = self.send(Method::GET, &self.api_url(path), &[], None).await?;
        Ok(resp.json().await?)
    }

    /// Helper to perform a paginated GET list request following `Link: rel=next`
    async fn list_paginated<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: Vec<(&str, String)>,
    ) -> Result<Vec<T>> {
        let mut query = query;
        query.push(("perPage", PAGE_SIZE.to_string()));

        let mut results = Vec::new();
        let mut next = Some(self.api_url(path));
        let mut first = true;

        while let Some(url) = next {
            // The next link already carries the query string
            let params: &[(&str, String)] = if first { &query[..] } else { &[] };
            let resp = self.send(Method::GET, &url, params, None).await?;
            next = resp
                .headers()
                .get(LINK)
                .and_then(|v| v.to_str().ok())
                .and_then(parse_next_link);
            let page: Vec<T> = resp.json().await?;
            results.extend(page);
            first = false;
        }

        Ok(results)
    }

    /// Helper to write a resource and decode the response
    async fn write_resource<T: serde::de::DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &Value,
    ) -> Result<T> {
        let resp = self.send(method, &self.api_url(path), &[], Some(body)).await?;
        Ok(resp.json().await?)
    }

    /// Test access to an organization
    pub async fn test_connection(&self, org_id: &str) -> bool {
        self.send(Method::GET, &self.api_url(&format!("/organizations/{}", org_id)), &[], None)
            .await
            .is_ok()
    }
}

fn profile_collection(network_id: &str, category: ProfileCategory) -> String {
    let resource = match category {
        ProfileCategory::Quality => "qualityRetentionProfiles",
        ProfileCategory::Wireless => "wirelessProfiles",
    };
    format!("/networks/{}/camera/{}", network_id, resource)
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Delay requested by the server, in whole seconds
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Exponential backoff from one second, capped
fn backoff(attempt: u32) -> Duration {
    let secs = 1u64.checked_shl(attempt).unwrap_or(MAX_BACKOFF_SECS);
    Duration::from_secs(secs.min(MAX_BACKOFF_SECS))
}

/// Extract the `rel=next` target from a Link header
fn parse_next_link(header: &str) -> Option<String> {
    header.split(',').find_map(|part| {
        let mut pieces = part.split(';');
        let target = pieces.next()?.trim();
        let is_next = pieces.any(|p| {
            let p = p.trim().replace('"', "");
            p == "rel=next"
        });
        if is_next && target.starts_with('<') && target.ends_with('>') {
            Some(target[1..target.len() - 1].to_string())
        } else {
            None
        }
    })
}

#[async_trait]
impl DashboardApi for DashboardClient {
    async fn list_organization_devices(
        &self,
        org_id: &str,
        tags: &[String],
        product_type: &str,
    ) -> Result<Vec<Device>> {
        let mut query: Vec<(&str, String)> = tags.iter().map(|t| ("tags[]", t.clone())).collect();
        query.push(("productTypes[]", product_type.to_string()));
        self.list_paginated(&format!("/organizations/{}/devices", org_id), query).await
    }

    async fn list_organization_networks(&self, org_id: &str, tags: &[String]) -> Result<Vec<Network>> {
        let query = tags.iter().map(|t| ("tags[]", t.clone())).collect();
        self.list_paginated(&format!("/organizations/{}/networks", org_id), query).await
    }

    async fn list_profiles(&self, network_id: &str, category: ProfileCategory) -> Result<Vec<Profile>> {
        self.get_json(&profile_collection(network_id, category)).await
    }

    async fn get_alert_settings(&self, network_id: &str) -> Result<AlertSettings> {
        self.get_json(&format!("/networks/{}/alerts/settings", network_id)).await
    }

    async fn create_profile(
        &self,
        network_id: &str,
        category: ProfileCategory,
        name: &str,
        attributes: &Map<String, Value>,
    ) -> Result<Profile> {
        let mut body = attributes.clone();
        body.insert("name".to_string(), Value::String(name.to_string()));
        self.write_resource(Method::POST, &profile_collection(network_id, category), &Value::Object(body))
            .await
    }

    async fn update_profile(
        &self,
        network_id: &str,
        category: ProfileCategory,
        profile_id: &str,
        attributes: &Map<String, Value>,
    ) -> Result<Profile> {
        let path = format!("{}/{}", profile_collection(network_id, category), profile_id);
        self.write_resource(Method::PUT, &path, &Value::Object(attributes.clone()))
            .await
    }

    async fn assign_quality_profile(&self, serial: &str, profile_id: &str) -> Result<()> {
        let body = serde_json::to_value(QualityAndRetentionUpdate {
            profile_id: profile_id.to_string(),
        })?;
        let path = format!("/devices/{}/camera/qualityAndRetention", serial);
        self.write_resource::<Value>(Method::PUT, &path, &body).await?;
        Ok(())
    }

    async fn assign_wireless_profiles(&self, serial: &str, ids: &WirelessProfileIds) -> Result<()> {
        let body = serde_json::to_value(WirelessProfilesUpdate { ids: ids.clone() })?;
        let path = format!("/devices/{}/camera/wirelessProfiles", serial);
        self.write_resource::<Value>(Method::PUT, &path, &body).await?;
        Ok(())
    }

    async fn enable_rtsp(&self, serial: &str) -> Result<()> {
        let body = serde_json::to_value(VideoSettingsUpdate {
            external_rtsp_enabled: true,
        })?;
        let path = format!("/devices/{}/camera/video/settings", serial);
        self.write_resource::<Value>(Method::PUT, &path, &body).await?;
        Ok(())
    }

    async fn list_pending_action_batches(&self, org_id: &str) -> Result<Vec<ActionBatch>> {
        let url = self.api_url(&format!("/organizations/{}/actionBatches", org_id));
        let resp = self
            .send(Method::GET, &url, &[("status", "pending".to_string())], None)
            .await?;
        Ok(resp.json().await?)
    }

    async fn create_action_batch(
        &self,
        org_id: &str,
        actions: &[BatchAction],
        confirmed: bool,
        synchronous: bool,
    ) -> Result<ActionBatch> {
        let body = serde_json::to_value(ActionBatchCreate {
            confirmed,
            synchronous,
            actions,
        })?;
        self.write_resource(Method::POST, &format!("/organizations/{}/actionBatches", org_id), &body)
            .await
    }
}
