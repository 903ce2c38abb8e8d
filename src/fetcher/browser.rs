//! Headless Chrome session for listings that need JavaScript to render.

use async_trait::async_trait;
use chromiumoxide::{Browser, BrowserConfig};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::PageFetcher;
use crate::error::ShopError;

fn browser_error(e: impl std::fmt::Display) -> ShopError {
    ShopError::Browser(e.to_string())
}

/// One Chrome instance shared by every page of a shop run.
pub struct BrowserFetcher {
    browser: Browser,
    handler: Option<JoinHandle<()>>,
}

impl BrowserFetcher {
    /// Launches Chrome with the shop's window dimensions.
    pub async fn launch(dimensions: (u32, u32), headless: bool) -> Result<Self, ShopError> {
        info!("Launching browser (headless={})", headless);

        let mut builder = BrowserConfig::builder()
            .window_size(dimensions.0, dimensions.1)
            .arg("--disable-dev-shm-usage")
            .arg("--no-first-run")
            .arg("--no-sandbox")
            .arg("--disable-gpu");

        // with_head means NOT headless
        if !headless {
            builder = builder.with_head();
        }

        let config = builder.build().map_err(browser_error)?;
        let (browser, mut handler) = Browser::launch(config).await.map_err(browser_error)?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        Ok(Self {
            browser,
            handler: Some(handler),
        })
    }
}

#[async_trait]
impl PageFetcher for BrowserFetcher {
    async fn fetch(&mut self, url: &str) -> Result<String, ShopError> {
        info!("Rendering {}", url);

        let page = self.browser.new_page(url).await.map_err(browser_error)?;
        page.wait_for_navigation().await.map_err(browser_error)?;
        let content = page.content().await.map_err(browser_error)?;

        if let Err(e) = page.close().await {
            warn!("Failed to close tab for {}: {}", url, e);
        }

        Ok(content)
    }

    async fn close(&mut self) -> Result<(), ShopError> {
        self.browser.close().await.map_err(browser_error)?;
        self.browser.wait().await?;
        if let Some(handler) = self.handler.take() {
            handler.abort();
        }
        info!("Browser session closed");
        Ok(())
    }
}
