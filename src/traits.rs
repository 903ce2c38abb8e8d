//! Traits and interfaces for site-agnostic scraping

use std::time::Duration;

use async_trait::async_trait;
use scraper::Html;

use crate::models::Item;
use crate::page::{Document, Node, PageLoader};

/// Static description of a shop
#[derive(Debug, Clone)]
pub struct ShopConfig {
    /// Shop identifier, also the worksheet name
    pub name: String,
    /// Base URL, used for relative links and the status-sheet lookup
    pub base_url: String,
    /// Currency the shop lists prices in
    pub currency: String,
    /// Items per listing page requested from the shop
    pub page_size: u32,
    /// Pause after every live fetch
    pub delay: Duration,
    /// Browser window size (width, height)
    pub dimensions: (u32, u32),
    /// Spreadsheet the results are published to
    pub spreadsheet: Option<String>,
}

/// A logical listing, e.g. "boardgames", and its URL template with a
/// `{page}` placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlGroup {
    pub name: String,
    pub url_format: String,
}

impl UrlGroup {
    pub fn new(name: impl Into<String>, url_format: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url_format: url_format.into(),
        }
    }

    /// Substitutes the page parameter into the template
    pub fn page_url(&self, param: u32) -> String {
        self.url_format.replace("{page}", &param.to_string())
    }
}

/// Extraction rules for one kind of listing page.
///
/// Every stage works on the previous stage's output; any error makes the
/// whole page an error row.
pub trait PageRules: Send + Sync {
    /// Parses the payload. HTML unless overridden.
    fn parse_document(&self, raw: &str) -> anyhow::Result<Document> {
        Ok(Document::Html(Html::parse_document(raw)))
    }

    /// Narrows the document to the listing container
    fn locate_listing<'a>(&self, document: &'a Document) -> anyhow::Result<Node<'a>>;

    /// Grid nodes inside the listing, one per catalog entry
    fn locate_grid<'a>(&self, listing: Node<'a>) -> anyhow::Result<Vec<Node<'a>>>;

    /// Builds an item from one grid node
    fn extract_item(&self, base_url: &str, node: Node<'_>) -> Item;

    /// Number of the last page, `None` when there is no pagination control
    fn max_page(&self, document: &Document, page_size: u32) -> Option<u32>;

    /// Value substituted for `{page}` for a 1-based page number
    fn page_param(&self, page: u32) -> u32 {
        page
    }
}

/// Trait for shop-specific scrapers
#[async_trait]
pub trait ShopScraper: Send + Sync {
    /// Get the configuration for this shop
    fn config(&self) -> &ShopConfig;

    /// Rules for the shop's listing pages
    fn rules(&self) -> &dyn PageRules;

    /// Ordered URL groups known up front
    fn url_groups(&self) -> Vec<UrlGroup>;

    /// URL groups for this run. Shops whose category tree has to be read
    /// from the site override this and load pages through `loader`.
    async fn discover_url_groups(&self, _loader: &mut PageLoader<'_>) -> Vec<UrlGroup> {
        self.url_groups()
    }
}
