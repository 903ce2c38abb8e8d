//! Live page retrieval.
//!
//! The page pipeline only needs "give me the rendered content of this URL";
//! the session behind it is owned by the shop run and closed when it ends.

#[cfg(feature = "browser")]
mod browser;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::info;

use crate::error::ShopError;

#[cfg(feature = "browser")]
pub use browser::BrowserFetcher;

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// A fetch session reused across every page of a shop run.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Returns the page content for `url`.
    async fn fetch(&mut self, url: &str) -> Result<String, ShopError>;

    /// Releases the session. Further fetches are not expected.
    async fn close(&mut self) -> Result<(), ShopError> {
        Ok(())
    }
}

/// Plain HTTP fetcher for listings that render server-side.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(user_agent: &str, timeout_secs: u64) -> Result<Self, ShopError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&mut self, url: &str) -> Result<String, ShopError> {
        info!("Fetching {}", url);

        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(ShopError::UnexpectedStatus {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }

        Ok(response.text().await?)
    }
}
