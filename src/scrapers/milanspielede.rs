//! milan-spiele.de scraper implementation
//!
//! The shop's category pages list sub-categories in a "Kategorien" box. URL
//! groups are read from those boxes at run time, one group per
//! sub-category, so the run follows the shop's own category tree.

use anyhow::Context;
use async_trait::async_trait;
use regex::Regex;
use scraper::ElementRef;
use tracing::{info, warn};

use crate::models::{Field, Item, SingleItem};
use crate::page::{Document, Node, PageLoader};
use crate::scrapers::html::{attr, nth_from_end, parse_price, select_all, select_first, text};
use crate::scrapers::shop_config;
use crate::traits::{PageRules, ShopConfig, ShopScraper, UrlGroup};

const CATEGORIES: &[(&str, &str)] = &[
    ("News", "neuheiten-c-102.html"),
    ("Offers", "angebote-c-103.html"),
    ("GameWorlds", "spielewelten-c-752.html"),
    ("Games", "spiele-c-82.html"),
    ("Accessories", "zubehr-c-868.html"),
    ("Used", "gebraucht-c-104.html"),
];

const STOCK_IMAGE: &str = "images/.*[.]gif";
const ITEM_COUNT: &str = "Artikel [0-9]* bis [0-9]* *[(]von ([0-9]*)[)]";

fn euro(element: ElementRef<'_>) -> anyhow::Result<f64> {
    parse_price(&text(element).replace(',', "."), &["€"])
}

/// Listing rules for milan-spiele.de product tables
pub struct MilanSpieleRules;

impl PageRules for MilanSpieleRules {
    fn locate_listing<'a>(&self, document: &'a Document) -> anyhow::Result<Node<'a>> {
        let root = document.root().element()?;
        Ok(Node::Element(select_first(root, "table.productListing")?))
    }

    fn locate_grid<'a>(&self, listing: Node<'a>) -> anyhow::Result<Vec<Node<'a>>> {
        let rows = select_all(listing.element()?, "tr.productListing-odd")?;
        Ok(rows.into_iter().map(Node::Element).collect())
    }

    fn extract_item(&self, _base_url: &str, node: Node<'_>) -> Item {
        let mut item = SingleItem::new();
        let Ok(row) = node.element() else {
            return item.into();
        };

        item.set_with(Field::Title, || Ok(text(select_first(row, "strong")?)));
        // availability is encoded in a traffic-light gif, e.g. images/gruen.gif
        item.set_with(Field::Stock, || {
            let stock_image = Regex::new(STOCK_IMAGE)?;
            let image = select_all(row, "img")?
                .into_iter()
                .find(|img| img.value().attr("src").is_some_and(|src| stock_image.is_match(src)))
                .context("no stock image")?;
            let status = attr(image, "src")?.replace("images/", "").replace(".gif", "");
            Ok(format!("{} - {}", attr(image, "alt")?.trim(), status))
        });
        item.set_with(Field::Url, || {
            Ok(attr(select_first(row, "a")?, "href")?.trim().to_string())
        });
        item.set_with(Field::ImageUrl, || {
            let src = attr(select_first(row, "img")?, "src")?;
            Ok(src.replace("/imagecache/", "/").trim().to_string())
        });

        let prices = select_all(row, "nobr").unwrap_or_default();
        item.set_with(Field::OrigPrice, || euro(nth_from_end(&prices, 1)?));
        item.set_with(Field::OrigOldPrice, || euro(nth_from_end(&prices, 2)?));

        item.into()
    }

    /// Derived from "Artikel 1 bis 250 (von 1234)".
    fn max_page(&self, document: &Document, page_size: u32) -> Option<u32> {
        let root = document.root().element().ok()?;
        let summary = text(select_first(root, ".smallText").ok()?);
        let count = Regex::new(ITEM_COUNT).ok()?;
        let total: u32 = count.captures(&summary)?.get(1)?.as_str().parse().ok()?;
        Some(total.saturating_sub(1) / page_size.max(1) + 1)
    }
}

/// Rules for the sub-category box of a category page
pub struct SubCategoryRules;

impl PageRules for SubCategoryRules {
    fn locate_listing<'a>(&self, document: &'a Document) -> anyhow::Result<Node<'a>> {
        let root = document.root().element()?;
        let heading = select_all(root, "td")?
            .into_iter()
            .find(|td| text(*td) == "Kategorien")
            .context("no Kategorien box")?;
        let body = heading
            .ancestors()
            .filter_map(ElementRef::wrap)
            .find(|el| el.value().name() == "tbody")
            .context("Kategorien box is not inside a table")?;
        let rows = select_all(body, "tr")?;
        Ok(Node::Element(*rows.get(1).context("Kategorien box has no content row")?))
    }

    fn locate_grid<'a>(&self, listing: Node<'a>) -> anyhow::Result<Vec<Node<'a>>> {
        let links = select_all(listing.element()?, "div")?
            .get(1)
            .map(|div| select_all(*div, "a"))
            .transpose()?
            .unwrap_or_default();
        Ok(links.into_iter().map(Node::Element).collect())
    }

    fn extract_item(&self, _base_url: &str, node: Node<'_>) -> Item {
        let mut item = SingleItem::new();
        item.set_with(Field::Title, || Ok(text(node.element()?)));
        item.set_with(Field::Url, || {
            Ok(attr(node.element()?, "href")?.trim().to_string())
        });
        item.into()
    }

    fn max_page(&self, _document: &Document, _page_size: u32) -> Option<u32> {
        None
    }
}

/// Scraper for milan-spiele.de
pub struct MilanSpieleScraper {
    config: ShopConfig,
    rules: MilanSpieleRules,
}

impl MilanSpieleScraper {
    pub fn new() -> Self {
        Self {
            config: shop_config("milanspielede", "https://milan-spiele.de", "EUR", 250),
            rules: MilanSpieleRules,
        }
    }

    fn listing_format(&self, url: &str) -> String {
        format!(
            "{}?page={{page}}&sort=1a&perPage={}",
            url, self.config.page_size
        )
    }

    /// Sub-category groups of one category, or the category itself when it
    /// has none.
    async fn category_groups(
        &self,
        loader: &mut PageLoader<'_>,
        title: &str,
        url: &str,
    ) -> Vec<UrlGroup> {
        let category = UrlGroup::new(title, url);
        let page = loader.load_uncapped(&SubCategoryRules, &category, 1).await;

        let groups: Vec<UrlGroup> = if page.is_error() {
            Vec::new()
        } else {
            page.table
                .iter()
                .filter_map(|row| {
                    let sub_url = row.url.as_deref()?;
                    let name = row.title.as_deref().unwrap_or_default();
                    Some(UrlGroup::new(
                        format!("{title}|{name}"),
                        self.listing_format(sub_url),
                    ))
                })
                .collect()
        };

        if groups.is_empty() {
            if page.is_error() {
                warn!("Sub-categories of {} could not be read, using the category", title);
            }
            return vec![UrlGroup::new(title, self.listing_format(url))];
        }

        info!("{} has {} sub-categories", title, groups.len());
        groups
    }
}

impl Default for MilanSpieleScraper {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ShopScraper for MilanSpieleScraper {
    fn config(&self) -> &ShopConfig {
        &self.config
    }

    fn rules(&self) -> &dyn PageRules {
        &self.rules
    }

    /// Top-level categories, used as-is when sub-categories are not read.
    fn url_groups(&self) -> Vec<UrlGroup> {
        CATEGORIES
            .iter()
            .map(|(title, path)| {
                let url = format!("{}/{}", self.config.base_url, path);
                UrlGroup::new(*title, self.listing_format(&url))
            })
            .collect()
    }

    async fn discover_url_groups(&self, loader: &mut PageLoader<'_>) -> Vec<UrlGroup> {
        let mut groups = Vec::new();
        for (title, path) in CATEGORIES {
            let url = format!("{}/{}", self.config.base_url, path);
            groups.extend(self.category_groups(loader, title, &url).await);
        }
        groups
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use scraper::Html;

    use super::*;
    use crate::cache::CacheStore;
    use crate::error::ShopError;
    use crate::fetcher::PageFetcher;

    const LISTING: &str = r#"
        <table><tr><td class="smallText">Artikel 1 bis 250 (von 612)</td></tr></table>
        <table class="productListing">
          <tr class="productListing-odd">
            <td><a href="https://milan-spiele.de/azul-p-1.html"><img src="https://milan-spiele.de/imagecache/azul.jpg"></a></td>
            <td><strong> Azul </strong></td>
            <td><img src="images/gruen.gif" alt=" sofort lieferbar "></td>
            <td><nobr>39,99€</nobr><nobr>29,99€</nobr></td>
          </tr>
        </table>
    "#;

    const CATEGORY: &str = r#"
        <table><tbody>
          <tr><td>Kategorien</td></tr>
          <tr><td>
            <div>header</div>
            <div><a href="https://milan-spiele.de/familie-c-1.html">Familie</a><a href="https://milan-spiele.de/kinder-c-2.html"> Kinder </a></div>
          </td></tr>
        </tbody></table>
    "#;

    #[test]
    fn extracts_product_rows() {
        let rules = MilanSpieleRules;
        let document = Document::Html(Html::parse_document(LISTING));
        assert_eq!(rules.max_page(&document, 250), Some(3));

        let grid = rules.locate_grid(rules.locate_listing(&document).unwrap()).unwrap();
        let item = rules.extract_item("https://milan-spiele.de", grid[0]);
        let record = item.record();
        assert_eq!(record.title.as_deref(), Some("Azul"));
        assert_eq!(record.stock.as_deref(), Some("sofort lieferbar - gruen"));
        assert_eq!(record.url.as_deref(), Some("https://milan-spiele.de/azul-p-1.html"));
        assert_eq!(record.image_url.as_deref(), Some("https://milan-spiele.de/azul.jpg"));
        assert_eq!(record.orig_price, 29.99);
        assert_eq!(record.orig_old_price, 39.99);
    }

    #[test]
    fn sub_category_links() {
        let rules = SubCategoryRules;
        let document = Document::Html(Html::parse_document(CATEGORY));
        let grid = rules.locate_grid(rules.locate_listing(&document).unwrap()).unwrap();
        assert_eq!(grid.len(), 2);
        let kinder = rules.extract_item("", grid[1]);
        assert_eq!(kinder.record().title.as_deref(), Some("Kinder"));
        assert_eq!(
            kinder.record().url.as_deref(),
            Some("https://milan-spiele.de/kinder-c-2.html")
        );
    }

    struct StaticFetcher {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl PageFetcher for StaticFetcher {
        async fn fetch(&mut self, url: &str) -> Result<String, ShopError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if url.ends_with("spiele-c-82.html") {
                Ok(CATEGORY.to_string())
            } else {
                Ok("<p>no sub-categories</p>".to_string())
            }
        }
    }

    #[tokio::test]
    async fn discovers_sub_category_groups() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheStore::new(dir.path());
        let scraper = MilanSpieleScraper::new();
        let mut config = scraper.config().clone();
        config.delay = std::time::Duration::ZERO;
        let calls = Arc::new(AtomicUsize::new(0));
        let mut fetcher = StaticFetcher {
            calls: Arc::clone(&calls),
        };

        let mut loader = PageLoader::new(&mut fetcher, &cache, &config, "20240101", 2);
        let groups = scraper.discover_url_groups(&mut loader).await;

        assert_eq!(calls.load(Ordering::SeqCst), CATEGORIES.len());
        let names: Vec<&str> = groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(
            names,
            [
                "News",
                "Offers",
                "GameWorlds",
                "Games|Familie",
                "Games|Kinder",
                "Accessories",
                "Used"
            ]
        );
        assert_eq!(
            groups[4].page_url(2),
            "https://milan-spiele.de/kinder-c-2.html?page=2&sort=1a&perPage=250"
        );
        assert_eq!(
            groups[0].page_url(1),
            "https://milan-spiele.de/neuheiten-c-102.html?page=1&sort=1a&perPage=250"
        );
    }
}
