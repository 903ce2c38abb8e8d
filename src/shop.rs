//! A full scrape run for one shop and one date.

use std::path::{Path, PathBuf};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use crate::cache::CacheStore;
use crate::currency::{RateSource, convert_series, round_to};
use crate::error::ShopError;
use crate::fetcher::PageFetcher;
use crate::models::{Column, Table};
use crate::page::{Page, PageLoader};
use crate::publish::Publisher;
use crate::slug::slugify;
use crate::traits::{ShopConfig, ShopScraper};
use crate::workbook;

/// Status cell value while an upload is running
pub const IN_PROGRESS: &str = "In progress...";

/// Per-run limits. A limit of 0 means unlimited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Run date, `YYYYMMDD`; part of cache and workbook names
    pub date: String,
    /// Number of URL groups to walk
    pub url_limit: usize,
    /// Pages per group; replaces the advertised last page when set
    pub page_limit: u32,
    /// Grid nodes extracted per page
    pub item_limit: usize,
    pub headless: bool,
}

impl RunOptions {
    pub fn new(date: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            url_limit: 0,
            page_limit: 0,
            item_limit: 0,
            headless: true,
        }
    }

    /// Small smoke-test run: two groups, two pages each, two items per page.
    pub fn test_mode(date: impl Into<String>) -> Self {
        Self {
            url_limit: 2,
            page_limit: 2,
            item_limit: 2,
            headless: true,
            ..Self::new(date)
        }
    }

    /// `{date}_{slug(shop)}_LIMIT_{url}_{page}_{item}.xlsx`
    pub fn workbook_name(&self, shop: &str) -> String {
        format!(
            "{}_{}_LIMIT_{}_{}_{}.xlsx",
            self.date,
            slugify(shop),
            self.url_limit,
            self.page_limit,
            self.item_limit
        )
    }
}

/// Collaborators a run needs besides the fetch session.
pub struct RunContext<'a> {
    pub rates: &'a dyn RateSource,
    pub base_currency: &'a str,
    pub cache: &'a CacheStore,
    /// Directory the workbook is written to
    pub output_dir: &'a Path,
}

/// The result of one shop run.
#[derive(Debug, Clone)]
pub struct Shop {
    pub config: ShopConfig,
    pub date: String,
    /// Base-currency units per unit of the shop's currency
    pub rate: f64,
    /// Pages per URL group, in walk order
    pub pages: Vec<(String, Vec<Page>)>,
    pub table: Table,
    pub workbook_path: PathBuf,
}

impl Shop {
    /// Walks every URL group and page, then builds and saves the final
    /// table. The fetch session is closed before returning, on success or
    /// failure.
    pub async fn run(
        scraper: &dyn ShopScraper,
        fetcher: &mut dyn PageFetcher,
        context: &RunContext<'_>,
        options: &RunOptions,
    ) -> Result<Self, ShopError> {
        let result = Self::collect(scraper, &mut *fetcher, context, options).await;
        if let Err(e) = fetcher.close().await {
            warn!("Failed to close fetch session for {}: {}", scraper.config().name, e);
        }
        let (rate, pages) = result?;

        let config = scraper.config().clone();
        let table = finalize(&pages, rate, &config.currency);
        let workbook_path = context.output_dir.join(options.workbook_name(&config.name));
        workbook::write_table(&table, &config.name, &workbook_path)?;

        info!("{}: {} rows for {}", config.name, table.len(), options.date);
        Ok(Self {
            config,
            date: options.date.clone(),
            rate,
            pages,
            table,
            workbook_path,
        })
    }

    async fn collect(
        scraper: &dyn ShopScraper,
        fetcher: &mut dyn PageFetcher,
        context: &RunContext<'_>,
        options: &RunOptions,
    ) -> Result<(f64, Vec<(String, Vec<Page>)>), ShopError> {
        let config = scraper.config();
        info!("Scraping {} for {}", config.name, options.date);

        let rate = context
            .rates
            .get_rate(&config.currency, context.base_currency)
            .await?;

        let mut loader = PageLoader::new(
            fetcher,
            context.cache,
            config,
            &options.date,
            options.item_limit,
        );

        let mut groups = scraper.discover_url_groups(&mut loader).await;
        if options.url_limit > 0 {
            groups.truncate(options.url_limit);
        }

        let rules = scraper.rules();
        let mut pages = Vec::with_capacity(groups.len());
        for group in groups {
            let first = loader.load(rules, &group, 1).await;
            let last = if options.page_limit > 0 {
                options.page_limit
            } else {
                first.max_page
            };
            info!("{}: walking pages 1..={}", group.name, last);

            let progress = page_progress(&group.name, last);
            progress.inc(1);
            let mut group_pages = vec![first];
            for number in 2..=last {
                group_pages.push(loader.load(rules, &group, number).await);
                progress.inc(1);
            }
            progress.finish_and_clear();
            pages.push((group.name, group_pages));
        }

        Ok((rate, pages))
    }

    /// Pushes the table to the shop's spreadsheet and stamps the status
    /// worksheet: `In progress...` first, the run date once uploaded.
    pub async fn publish(
        &self,
        publisher: &dyn Publisher,
        status_sheet: &str,
    ) -> Result<(), ShopError> {
        let spreadsheet =
            self.config
                .spreadsheet
                .as_deref()
                .ok_or_else(|| ShopError::MissingSpreadsheet {
                    shop: self.config.name.clone(),
                })?;

        publisher
            .set_value_by_lookup(spreadsheet, status_sheet, &self.config.base_url, 0, 1, IN_PROGRESS)
            .await?;

        let columns = Column::published();
        let header = columns.iter().map(|c| c.name().to_string()).collect();
        publisher
            .upload(spreadsheet, &self.config.name, header, self.table.to_strings(&columns))
            .await?;

        publisher
            .set_value_by_lookup(spreadsheet, status_sheet, &self.config.base_url, 0, 1, &self.date)
            .await?;

        info!("Published {} to {}", self.config.name, spreadsheet);
        Ok(())
    }
}

/// Progress over the pages of one URL group.
fn page_progress(group: &str, last: u32) -> ProgressBar {
    let progress = ProgressBar::new(u64::from(last));
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.cyan} {msg} [{bar:40.cyan/blue}] {pos}/{len} pages")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░"),
    );
    progress.set_message(group.to_string());
    progress.enable_steady_tick(Duration::from_millis(100));
    progress
}

/// Merges every page's rows, tags them with their group, converts prices to
/// the base currency and sorts by discount.
pub fn finalize(pages: &[(String, Vec<Page>)], rate: f64, currency: &str) -> Table {
    let mut table: Table = pages
        .iter()
        .flat_map(|(group, group_pages)| {
            group_pages.iter().flat_map(move |page| {
                page.table.iter().cloned().map(move |mut row| {
                    row.group = Some(group.clone());
                    row
                })
            })
        })
        .collect();

    let prices = convert_series(table.iter().map(|r| r.orig_price), rate);
    let old_prices = convert_series(table.iter().map(|r| r.orig_old_price), rate);
    for ((row, price), old_price) in table.rows.iter_mut().zip(prices).zip(old_prices) {
        row.converted_price = round_to(price, 3);
        row.converted_old_price = round_to(old_price, 3);
        row.conversion_rate = rate;
        row.currency = Some(currency.to_string());
    }

    table.sort_by_discount();
    table
}
