//! One listing page: fetch (cache or live), parse, locate the listing and
//! its grid, extract items, build the row table.
//!
//! A page never fails. Any stage error turns its table into a single error
//! row carrying the cache path, so one broken page cannot abort a shop run.

use std::path::{Path, PathBuf};

use anyhow::Context;
use scraper::{ElementRef, Html};
use serde_json::Value;
use tracing::{info, warn};

use crate::cache::CacheStore;
use crate::fetcher::PageFetcher;
use crate::models::{Item, Record, Table, empty_table};
use crate::traits::{PageRules, ShopConfig, UrlGroup};

/// A parsed payload.
pub enum Document {
    Html(Html),
    Json(Value),
}

impl Document {
    /// Parses a JSON payload; for rules that read an API instead of markup.
    pub fn parse_json(raw: &str) -> anyhow::Result<Self> {
        Ok(Document::Json(serde_json::from_str(raw)?))
    }

    pub fn root(&self) -> Node<'_> {
        match self {
            Document::Html(html) => Node::Element(html.root_element()),
            Document::Json(value) => Node::Json(value),
        }
    }
}

/// A fragment of a document: an HTML element or a JSON value.
#[derive(Clone, Copy)]
pub enum Node<'a> {
    Element(ElementRef<'a>),
    Json(&'a Value),
}

impl<'a> Node<'a> {
    pub fn element(self) -> anyhow::Result<ElementRef<'a>> {
        match self {
            Node::Element(element) => Ok(element),
            Node::Json(_) => anyhow::bail!("expected an HTML element, found JSON"),
        }
    }

    pub fn json(self) -> anyhow::Result<&'a Value> {
        match self {
            Node::Json(value) => Ok(value),
            Node::Element(_) => anyhow::bail!("expected JSON, found an HTML element"),
        }
    }

    /// Source text of the node, kept on each row for diagnostics.
    pub fn raw(&self) -> String {
        match self {
            Node::Element(element) => element.html(),
            Node::Json(value) => value.to_string(),
        }
    }
}

/// One fetched listing page for a (shop, url group, page number).
#[derive(Debug, Clone)]
pub struct Page {
    pub group: String,
    pub number: u32,
    pub url: String,
    pub cache_path: PathBuf,
    pub from_cache: bool,
    pub raw: Option<String>,
    pub items: Vec<Item>,
    pub table: Table,
    /// Last page number advertised by the pagination control, 1 if absent
    pub max_page: u32,
}

impl Page {
    /// Runs every stage after fetching. `fetched` is the payload or the
    /// reason it could not be obtained.
    pub fn build(
        rules: &dyn PageRules,
        shop: &ShopConfig,
        target: PageTarget,
        fetched: anyhow::Result<(String, bool)>,
        item_limit: usize,
    ) -> Self {
        let PageTarget {
            group,
            number,
            url,
            cache_path,
        } = target;

        let (raw, from_cache) = match fetched {
            Ok((raw, from_cache)) => (raw, from_cache),
            Err(e) => {
                warn!("Page {} of {} failed to fetch: {:#}", number, group, e);
                let table = error_table(&e, &cache_path, None);
                return Self {
                    group,
                    number,
                    url,
                    cache_path,
                    from_cache: false,
                    raw: None,
                    items: Vec::new(),
                    table,
                    max_page: 1,
                };
            }
        };

        let (max_page, extracted) =
            run_stages(rules, &raw, &shop.base_url, shop.page_size, item_limit);

        let (items, table) = match extracted {
            Ok(extracted) => extracted,
            Err(e) => {
                warn!("Page {} of {} degraded to an error row: {:#}", number, group, e);
                (Vec::new(), error_table(&e, &cache_path, Some(raw.clone())))
            }
        };

        Self {
            group,
            number,
            url,
            cache_path,
            from_cache,
            raw: Some(raw),
            items,
            table,
            max_page,
        }
    }

    pub fn is_error(&self) -> bool {
        self.items.is_empty() && self.table.iter().any(|r| r.error.is_some())
    }
}

/// Where a page comes from.
#[derive(Debug, Clone)]
pub struct PageTarget {
    pub group: String,
    pub number: u32,
    pub url: String,
    pub cache_path: PathBuf,
}

/// Loads pages for one shop run, sharing the fetch session and cache.
pub struct PageLoader<'a> {
    fetcher: &'a mut dyn PageFetcher,
    cache: &'a CacheStore,
    shop: &'a ShopConfig,
    date: &'a str,
    item_limit: usize,
}

impl<'a> PageLoader<'a> {
    /// `item_limit` of 0 means every grid node is extracted.
    pub fn new(
        fetcher: &'a mut dyn PageFetcher,
        cache: &'a CacheStore,
        shop: &'a ShopConfig,
        date: &'a str,
        item_limit: usize,
    ) -> Self {
        Self {
            fetcher,
            cache,
            shop,
            date,
            item_limit,
        }
    }

    /// Loads page `number` (1-based) of `group`.
    pub async fn load(&mut self, rules: &dyn PageRules, group: &UrlGroup, number: u32) -> Page {
        self.load_capped(rules, group, number, self.item_limit).await
    }

    /// Like [`load`](Self::load) but ignores the configured item cap.
    pub async fn load_uncapped(
        &mut self,
        rules: &dyn PageRules,
        group: &UrlGroup,
        number: u32,
    ) -> Page {
        self.load_capped(rules, group, number, 0).await
    }

    async fn load_capped(
        &mut self,
        rules: &dyn PageRules,
        group: &UrlGroup,
        number: u32,
        item_limit: usize,
    ) -> Page {
        let url = group.page_url(rules.page_param(number));
        let cache_path = self.cache.path_for(&self.shop.name, self.date, &url);
        let fetched = self.fetch_raw(&url, &cache_path).await;

        let target = PageTarget {
            group: group.name.clone(),
            number,
            url,
            cache_path,
        };
        let page = Page::build(rules, self.shop, target, fetched, item_limit);

        info!(
            "{} page {} ({}): {} rows{}",
            page.group,
            page.number,
            if page.from_cache { "cache" } else { "live" },
            page.table.len(),
            if page.is_error() { ", failed" } else { "" }
        );
        page
    }

    /// Cached payload if present, otherwise a live fetch that is then cached.
    async fn fetch_raw(&mut self, url: &str, path: &Path) -> anyhow::Result<(String, bool)> {
        if let Some(raw) = self
            .cache
            .load(path)
            .await
            .with_context(|| format!("Failed to read cache file {}", path.display()))?
        {
            return Ok((raw, true));
        }

        let raw = self.fetcher.fetch(url).await?;
        tokio::time::sleep(self.shop.delay).await;
        self.cache
            .store(path, &raw)
            .await
            .with_context(|| format!("Failed to write cache file {}", path.display()))?;
        Ok((raw, false))
    }
}

/// parse -> max page -> listing -> grid -> items -> table.
fn run_stages(
    rules: &dyn PageRules,
    raw: &str,
    base_url: &str,
    page_size: u32,
    item_limit: usize,
) -> (u32, anyhow::Result<(Vec<Item>, Table)>) {
    let document = match rules.parse_document(raw).context("Failed to parse document") {
        Ok(document) => document,
        Err(e) => return (1, Err(e)),
    };
    let max_page = rules.max_page(&document, page_size).unwrap_or(1).max(1);
    let extracted = extract_items(rules, &document, base_url, item_limit);
    (max_page, extracted)
}

fn extract_items(
    rules: &dyn PageRules,
    document: &Document,
    base_url: &str,
    item_limit: usize,
) -> anyhow::Result<(Vec<Item>, Table)> {
    let listing = rules
        .locate_listing(document)
        .context("Failed to locate listing")?;
    let grid = rules.locate_grid(listing).context("Failed to locate grid")?;

    let limit = if item_limit > 0 { item_limit } else { usize::MAX };
    let items: Vec<Item> = grid
        .into_iter()
        .take(limit)
        .map(|node| {
            let mut item = rules.extract_item(base_url, node);
            item.set_raw(node.raw());
            item
        })
        .collect();

    let table = items_table(&items);
    Ok((items, table))
}

/// Rows of every item with the discount column derived from original prices.
fn items_table(items: &[Item]) -> Table {
    if items.is_empty() {
        return empty_table();
    }
    let mut table = Table::default();
    for item in items {
        table.append(item.to_rows());
    }
    for row in &mut table.rows {
        row.compute_discount();
    }
    table
}

fn error_table(error: &anyhow::Error, cache_path: &Path, raw: Option<String>) -> Table {
    let mut row = Record::error_row(format!("{error:#}"), raw);
    row.others.insert(
        "path".to_string(),
        Value::String(cache_path.display().to_string()),
    );
    Table::single(row)
}
