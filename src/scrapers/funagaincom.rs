//! funagain.com scraper implementation

use anyhow::Context;

use crate::models::{Field, Item, SingleItem};
use crate::page::{Document, Node};
use crate::scrapers::html::{attr, nth_from_end, parse_int, parse_price, select_all, select_first, text};
use crate::scrapers::shop_config;
use crate::traits::{PageRules, ShopConfig, ShopScraper, UrlGroup};

const COLLECTIONS: &[(&str, &str)] = &[
    ("BoardGames", "board-games"),
    ("CardGames", "card-games"),
    ("Accessories", "accessories"),
];

/// Listing rules for funagain.com collections. Prices are listed in cents.
pub struct FunagainRules;

impl PageRules for FunagainRules {
    fn locate_listing<'a>(&self, document: &'a Document) -> anyhow::Result<Node<'a>> {
        Ok(document.root())
    }

    fn locate_grid<'a>(&self, listing: Node<'a>) -> anyhow::Result<Vec<Node<'a>>> {
        let cards = select_all(listing.element()?, ".product-grid-item")?;
        Ok(cards.into_iter().map(Node::Element).collect())
    }

    fn extract_item(&self, base_url: &str, node: Node<'_>) -> Item {
        let mut item = SingleItem::new();
        let Ok(card) = node.element() else {
            return item.into();
        };

        item.set_with(Field::Title, || Ok(text(select_first(card, "p")?)));
        item.set_with(Field::Stock, || {
            let unavailable = select_all(card, "span")?
                .into_iter()
                .any(|span| text(span) == "Unavailable");
            Ok(if unavailable { "Unavailable" } else { "Available" })
        });

        let prices = select_all(card, ".product-item--price small").unwrap_or_default();
        item.set_with(Field::OrigPrice, || {
            let price = prices.first().context("no price")?;
            Ok(parse_price(&text(*price), &["$"])? / 100.0)
        });
        item.set_with(Field::OrigOldPrice, || {
            let old_price = prices.get(2).context("no compare-at price")?;
            Ok(parse_price(&text(*old_price), &["$"])? / 100.0)
        });

        item.set_with(Field::Url, || {
            let href = attr(card, "href")?.trim();
            let path = href.split('?').next().unwrap_or(href);
            Ok(format!("{base_url}{path}"))
        });
        // largest candidate of the srcset, without the resize query
        item.set_with(Field::ImageUrl, || {
            let srcset = attr(select_first(card, "img")?, "srcset")?;
            let largest = srcset.rsplit(',').next().unwrap_or(srcset);
            let largest = largest.split('?').next().unwrap_or(largest).trim_matches(' ');
            Ok(format!("https:{largest}"))
        });

        item.into()
    }

    fn max_page(&self, document: &Document, _page_size: u32) -> Option<u32> {
        let root = document.root().element().ok()?;
        let links = select_all(root, ".pagination-custom a").ok()?;
        parse_int(&text(nth_from_end(&links, 2).ok()?)).ok()
    }
}

/// Scraper for funagain.com
pub struct FunagainScraper {
    config: ShopConfig,
    rules: FunagainRules,
}

impl FunagainScraper {
    pub fn new() -> Self {
        Self {
            config: shop_config("funagaincom", "https://funagain.com", "USD", 24),
            rules: FunagainRules,
        }
    }
}

impl Default for FunagainScraper {
    fn default() -> Self {
        Self::new()
    }
}

impl ShopScraper for FunagainScraper {
    fn config(&self) -> &ShopConfig {
        &self.config
    }

    fn rules(&self) -> &dyn PageRules {
        &self.rules
    }

    fn url_groups(&self) -> Vec<UrlGroup> {
        COLLECTIONS
            .iter()
            .map(|(name, path)| {
                UrlGroup::new(
                    *name,
                    format!("{}/collections/{}?page={{page}}", self.config.base_url, path),
                )
            })
            .collect()
    }
}
