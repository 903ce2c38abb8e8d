//! coolstuffinc.com scraper implementation

use anyhow::Context;

use crate::models::{Field, Item, SingleItem};
use crate::page::{Document, Node};
use crate::scrapers::html::{absolute, attr, nth_from_end, parse_int, parse_price, select_all, select_first, text};
use crate::scrapers::shop_config;
use crate::traits::{PageRules, ShopConfig, ShopScraper, UrlGroup};

/// Listing rules for the coolstuffinc.com sale listing
pub struct CoolStuffIncRules;

impl PageRules for CoolStuffIncRules {
    fn locate_listing<'a>(&self, document: &'a Document) -> anyhow::Result<Node<'a>> {
        let root = document.root().element()?;
        Ok(Node::Element(select_first(root, "div#mainContent")?))
    }

    fn locate_grid<'a>(&self, listing: Node<'a>) -> anyhow::Result<Vec<Node<'a>>> {
        let rows = select_all(listing.element()?, "div.product-search-row")?;
        Ok(rows.into_iter().map(Node::Element).collect())
    }

    fn extract_item(&self, base_url: &str, node: Node<'_>) -> Item {
        let mut item = SingleItem::new();
        let Ok(row) = node.element() else {
            return item.into();
        };

        item.set_with(Field::Title, || {
            let image = select_first(row, "a.productLink img")?;
            Ok(attr(image, "alt")?.trim().to_string())
        });
        item.set_with(Field::Url, || {
            let link = select_first(row, "a.productLink")?;
            Ok(absolute(base_url, attr(link, "href")?.trim()))
        });
        item.set_with(Field::ImageUrl, || {
            let image = select_first(row, "a.productLink img")?;
            Ok(attr(image, "src")?.trim().to_string())
        });
        // "3 in stock" is split between the span and the text node after it
        item.set_with(Field::Stock, || {
            let quantity = select_first(row, "span.card-qty")?;
            let tail = quantity
                .next_siblings()
                .last()
                .and_then(|sibling| sibling.value().as_text().map(|t| t.trim().to_string()))
                .context("no text after the quantity")?;
            Ok(format!("{} {}", text(quantity), tail))
        });
        item.set_with(Field::OrigOldPrice, || {
            parse_price(&text(select_first(row, "span.d strike")?), &["$"])
        });
        item.set_with(Field::OrigPrice, || {
            parse_price(&text(select_first(row, r#"b[itemprop="price"]"#)?), &[])
        });

        item.into()
    }

    fn max_page(&self, document: &Document, _page_size: u32) -> Option<u32> {
        let root = document.root().element().ok()?;
        let links = select_all(root, "a.pagelink").ok()?;
        parse_int(&text(nth_from_end(&links, 3).ok()?)).ok()
    }
}

/// Scraper for coolstuffinc.com
pub struct CoolStuffIncScraper {
    config: ShopConfig,
    rules: CoolStuffIncRules,
}

impl CoolStuffIncScraper {
    pub fn new() -> Self {
        Self {
            config: shop_config("coolstuffinccom", "https://coolstuffinc.com", "USD", 30),
            rules: CoolStuffIncRules,
        }
    }
}

impl Default for CoolStuffIncScraper {
    fn default() -> Self {
        Self::new()
    }
}

impl ShopScraper for CoolStuffIncScraper {
    fn config(&self) -> &ShopConfig {
        &self.config
    }

    fn rules(&self) -> &dyn PageRules {
        &self.rules
    }

    fn url_groups(&self) -> Vec<UrlGroup> {
        vec![UrlGroup::new(
            "Sale",
            format!("{}/main_saleItems.php?p={{page}}&s=5", self.config.base_url),
        )]
    }
}
