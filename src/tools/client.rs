use reqwest::{Client, Response};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::endpoint::EndpointTable;
use crate::error::{HkubeMcpError, Result};
use crate::normalize::{normalize, render};

/// HTTP access to the HKube REST API shared by every tool unit. Cloning is
/// cheap; the connection pool and endpoint table are shared.
#[derive(Debug, Clone)]
pub struct HkubeClient {
    http: Client,
    endpoints: Arc<EndpointTable>,
}

impl HkubeClient {
    pub fn new(endpoints: Arc<EndpointTable>, timeout: Duration) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http, endpoints })
    }

    pub fn endpoints(&self) -> &EndpointTable {
        &self.endpoints
    }

    /// Resolve a logical endpoint key to its URL
    pub fn url(&self, key: &str) -> Result<String> {
        self.endpoints
            .resolve(key)
            .map_err(|e| HkubeMcpError::Config(e.to_string()))
    }

    /// GET the endpoint for `key`, returning the normalized body as text
    pub async fn get(&self, key: &str) -> Result<String> {
        let url = self.url(key)?;
        tracing::debug!(url = %url, "GET");
        let response = self.http.get(&url).send().await.map_err(map_send_error)?;
        read_normalized(response).await
    }

    /// POST a JSON body to a full URL, returning the normalized body as text
    pub async fn post_json(&self, url: &str, body: &Value) -> Result<String> {
        tracing::debug!(url = %url, "POST");
        let response = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(map_send_error)?;
        read_normalized(response).await
    }
}

fn map_send_error(e: reqwest::Error) -> HkubeMcpError {
    if e.is_timeout() {
        HkubeMcpError::Timeout
    } else {
        HkubeMcpError::Network(e)
    }
}

async fn read_normalized(response: Response) -> Result<String> {
    let status = response.status();
    let body = response.text().await.map_err(map_send_error)?;

    if !status.is_success() {
        return Err(HkubeMcpError::Api {
            status: status.as_u16(),
            message: body,
        });
    }

    Ok(render(&normalize(&body)))
}
