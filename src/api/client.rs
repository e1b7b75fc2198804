use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Response};
use std::time::Duration;

use crate::api::models::{GenerateReply, GenerateRequest};
use crate::api::response::extract_response_text;
use crate::api::streaming::process_streaming_response;
use crate::error::{HkubeMcpError, Result};

/// Client for a `/api/generate` completion endpoint
#[derive(Debug, Clone)]
pub struct GenerateClient {
    http: Client,
    endpoint: String,
    model: String,
    timeout_secs: u64,
}

impl GenerateClient {
    pub fn new(
        base_url: &str,
        model: impl Into<String>,
        timeout_secs: u64,
        verify_tls: bool,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(timeout_secs))
            .danger_accept_invalid_certs(!verify_tls)
            .build()?;

        Ok(Self {
            http,
            endpoint: format!("{}/api/generate", base_url.trim_end_matches('/')),
            model: model.into(),
            timeout_secs,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }

    async fn send(&self, prompt: &str, stream: bool) -> Result<Response> {
        let body = GenerateRequest {
            model: &self.model,
            prompt,
            stream,
        };
        let mut request = self.http.post(&self.endpoint).json(&body);
        // Streams are bounded per chunk instead
        if !stream {
            request = request.timeout(Duration::from_secs(self.timeout_secs));
        }

        tracing::debug!(endpoint = %self.endpoint, model = %self.model, stream, "generate request");
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                HkubeMcpError::Timeout
            } else {
                HkubeMcpError::Network(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(HkubeMcpError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }

    /// Non-streaming generation, keeping the raw body alongside the text
    pub async fn generate_raw(&self, prompt: &str) -> Result<GenerateReply> {
        let response = self.send(prompt, false).await?;
        let raw_body = response.text().await?;
        Ok(GenerateReply {
            response_text: extract_response_text(&raw_body),
            raw_body,
        })
    }

    pub async fn generate(&self, prompt: &str) -> Result<String> {
        Ok(self.generate_raw(prompt).await?.response_text)
    }

    /// Streaming generation; `on_chunk` sees each piece of text as it arrives
    pub async fn generate_streaming<F>(&self, prompt: &str, on_chunk: F) -> Result<String>
    where
        F: FnMut(&str),
    {
        let response = self.send(prompt, true).await?;
        process_streaming_response(response, self.timeout_secs, on_chunk).await
    }
}
