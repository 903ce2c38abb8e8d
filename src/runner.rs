use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tracing::info;

use crate::cache::CacheStore;
use crate::config::AppConfig;
use crate::currency::FrankfurterRates;
use crate::error::ShopError;
use crate::fetcher::PageFetcher;
use crate::publish::SheetsPublisher;
use crate::scrapers;
use crate::shop::{RunContext, RunOptions, Shop};
use crate::traits::ShopConfig;

/// One requested shop run.
#[derive(Debug, Clone)]
pub struct RunRequest {
    /// Shop URL or registry name
    pub shop: String,
    pub options: RunOptions,
    pub publish: bool,
}

/// Wires the configured collaborators into shop runs.
pub struct Runner {
    config: Arc<AppConfig>,
    client: Client,
}

impl Runner {
    pub fn new(config: AppConfig) -> Result<Self, ShopError> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            config: Arc::new(config),
            client,
        })
    }

    pub async fn run(&self, request: &RunRequest) -> Result<Shop, ShopError> {
        let scraper = scrapers::resolve(&request.shop)?;
        info!(
            "Running {} (publish={}, {:?})",
            scraper.config().name,
            request.publish,
            request.options
        );

        let rates = FrankfurterRates::new(self.client.clone(), &self.config.rates_url);
        let cache = CacheStore::new(self.config.cache_dir());
        let output_dir = self.config.output_dir();
        let context = RunContext {
            rates: &rates,
            base_currency: &self.config.base_currency,
            cache: &cache,
            output_dir: &output_dir,
        };

        let mut fetcher = self
            .fetcher(scraper.config(), request.options.headless)
            .await?;
        let shop = Shop::run(scraper.as_ref(), fetcher.as_mut(), &context, &request.options).await?;

        if request.publish {
            let publisher = SheetsPublisher::new(
                self.client.clone(),
                &self.config.sheets_url,
                &self.config.drive_url,
                self.config.sheets_token.clone(),
            );
            shop.publish(&publisher, &self.config.status_sheet).await?;
        } else {
            info!("Skipping upload, workbook at {}", shop.workbook_path.display());
        }

        Ok(shop)
    }

    #[cfg(feature = "browser")]
    async fn fetcher(
        &self,
        shop: &ShopConfig,
        headless: bool,
    ) -> Result<Box<dyn PageFetcher>, ShopError> {
        let browser = crate::fetcher::BrowserFetcher::launch(shop.dimensions, headless).await?;
        Ok(Box::new(browser))
    }

    #[cfg(not(feature = "browser"))]
    async fn fetcher(
        &self,
        _shop: &ShopConfig,
        _headless: bool,
    ) -> Result<Box<dyn PageFetcher>, ShopError> {
        let http = crate::fetcher::HttpFetcher::new(
            &self.config.user_agent,
            self.config.request_timeout_secs,
        )?;
        Ok(Box::new(http))
    }
}

impl Clone for Runner {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            client: self.client.clone(),
        }
    }
}
