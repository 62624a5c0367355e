//! HTTP transport abstraction.
//!
//! The client talks to E-utilities through the [`Transport`] trait so tests
//! can substitute canned responses without a network.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use crate::error::Error;

/// One GET request against an E-utilities endpoint, returning the raw body.
#[async_trait]
pub trait Transport: std::fmt::Debug + Send + Sync {
    async fn fetch(&self, endpoint: &str, params: &[(String, String)]) -> Result<String, Error>;
}

/// Production transport backed by reqwest.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, Error> {
        let client = Client::builder()
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, endpoint: &str, params: &[(String, String)]) -> Result<String, Error> {
        debug!(endpoint, "fetching");
        let response = self.client.get(endpoint).query(params).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::fetch_status(
                status.as_u16(),
                format!("{} returned {}", endpoint, status),
            ));
        }
        Ok(response.text().await?)
    }
}
