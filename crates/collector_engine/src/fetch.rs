use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Fully-described outbound request, produced by planning and consumed by
/// exactly one fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchDescriptor {
    pub url: String,
    pub method: HttpMethod,
    pub body: Option<Value>,
    pub headers: Vec<(String, String)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl FetchDescriptor {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: HttpMethod::Get,
            body: None,
            headers: Vec::new(),
        }
    }

    pub fn post_json(url: impl Into<String>, body: Value) -> Self {
        Self {
            url: url.into(),
            method: HttpMethod::Post,
            body: Some(body),
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
        }
    }
}

/// Transport failure for one fetch. This layer does not retry; retry and
/// backoff policy belong to the caller's HTTP middleware.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("http status {0}")]
    HttpStatus(u16),
    #[error("timeout: {0}")]
    Timeout(String),
    #[error("response was not valid JSON: {0}")]
    Decode(String),
    #[error("network error: {0}")]
    Network(String),
}

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    /// Upper bound on concurrently dispatched fetches for one run.
    pub max_in_flight: usize,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(60),
            max_in_flight: 8,
        }
    }
}

/// Fetch collaborator: resolves one descriptor to a decoded JSON body.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, descriptor: &FetchDescriptor) -> Result<Value, FetchError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    pub fn new(settings: &FetchSettings) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| FetchError::Network(err.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, descriptor: &FetchDescriptor) -> Result<Value, FetchError> {
        let url = reqwest::Url::parse(&descriptor.url)
            .map_err(|err| FetchError::InvalidUrl(err.to_string()))?;

        let mut request = match descriptor.method {
            HttpMethod::Get => self.client.get(url),
            HttpMethod::Post => self.client.post(url),
        };
        for (name, value) in &descriptor.headers {
            request = request.header(name, value);
        }
        if let Some(body) = &descriptor.body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        response
            .json::<Value>()
            .await
            .map_err(|err| FetchError::Decode(err.to_string()))
    }
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::Timeout(err.to_string());
    }
    FetchError::Network(err.to_string())
}
