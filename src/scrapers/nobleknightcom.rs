//! nobleknight.com scraper implementation
//!
//! A product card lists every condition the title is sold in (new, used,
//! ...), each with its own price box. Cards are extracted as composite items
//! that expand into one row per condition.

use regex::Regex;
use scraper::ElementRef;

use crate::models::{CompositeItem, Field, Item};
use crate::page::{Document, Node};
use crate::scrapers::html::{absolute, attr, nth_from_end, parse_int, select_all, select_first, text};
use crate::scrapers::shop_config;
use crate::traits::{PageRules, ShopConfig, ShopScraper, UrlGroup};

const CATEGORIES: &[(&str, &str)] = &[
    ("boardgames", "BoardGames"),
    ("accessories", "Dice-And-Supplies"),
];

const PRICE: &str = " Price *[$]([0-9.]*)";
const OLD_PRICE: &str = "Was *[$]([0-9.]*)";
const MSRP: &str = "MSRP *[$]([0-9.]*)";

/// First dollar amount captured by `pattern` in the box text, NaN if absent.
fn price_in(price_box: ElementRef<'_>, pattern: &Regex) -> f64 {
    let content = price_box.text().collect::<String>();
    pattern
        .captures(&content)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(f64::NAN)
}

fn prices_of(boxes: &[ElementRef<'_>], pattern: &str) -> anyhow::Result<Vec<f64>> {
    let pattern = Regex::new(pattern)?;
    Ok(boxes.iter().map(|b| price_in(*b, &pattern)).collect())
}

/// Listing rules for nobleknight.com product cards
pub struct NobleKnightRules;

impl PageRules for NobleKnightRules {
    fn locate_listing<'a>(&self, document: &'a Document) -> anyhow::Result<Node<'a>> {
        let root = document.root().element()?;
        Ok(Node::Element(select_first(root, ".listing-col")?))
    }

    fn locate_grid<'a>(&self, listing: Node<'a>) -> anyhow::Result<Vec<Node<'a>>> {
        let cards = select_all(listing.element()?, ".product-card")?;
        Ok(cards.into_iter().map(Node::Element).collect())
    }

    fn extract_item(&self, base_url: &str, node: Node<'_>) -> Item {
        let mut item = CompositeItem::new();
        let Ok(card) = node.element() else {
            return item.into();
        };

        item.set_with(Field::Title, || Ok(text(select_first(card, ".name")?)));
        item.set_list_with(Field::Stock, || {
            let conditions = select_all(card, ".conditions .condition-value")?;
            Ok(conditions.into_iter().map(text).collect())
        });

        match select_all(card, ".conditions .price-wrapper") {
            Ok(boxes) => {
                item.set_list_with(Field::OrigPrice, || prices_of(&boxes, PRICE));
                item.set_list_with(Field::OrigOldPrice, || prices_of(&boxes, OLD_PRICE));
                if let Ok(msrp) = prices_of(&boxes, MSRP) {
                    item.set_extra_list("msrp", msrp);
                }
            }
            Err(_) => {
                item.set(Field::OrigPrice, f64::NAN);
                item.set(Field::OrigOldPrice, f64::NAN);
            }
        }

        item.set_with(Field::Url, || {
            let link = select_first(card, ".image-col")?;
            Ok(absolute(base_url, attr(link, "href")?))
        });
        item.set_with(Field::ImageUrl, || {
            let container = select_first(card, ".image-col .bg-img-container")?;
            Ok(attr(container, "style")?
                .replace("background-image: url('", "")
                .replace("');", ""))
        });

        item.into()
    }

    fn max_page(&self, document: &Document, _page_size: u32) -> Option<u32> {
        let root = document.root().element().ok()?;
        let links = select_all(root, ".page-link").ok()?;
        parse_int(&text(nth_from_end(&links, 2).ok()?)).ok()
    }
}

/// Scraper for nobleknight.com
pub struct NobleKnightScraper {
    config: ShopConfig,
    rules: NobleKnightRules,
}

impl NobleKnightScraper {
    pub fn new() -> Self {
        let mut config = shop_config("nobleknightcom", "https://nobleknight.com", "USD", 100);
        config.dimensions = (1600, 6000);
        Self {
            config,
            rules: NobleKnightRules,
        }
    }
}

impl Default for NobleKnightScraper {
    fn default() -> Self {
        Self::new()
    }
}

impl ShopScraper for NobleKnightScraper {
    fn config(&self) -> &ShopConfig {
        &self.config
    }

    fn rules(&self) -> &dyn PageRules {
        &self.rules
    }

    fn url_groups(&self) -> Vec<UrlGroup> {
        CATEGORIES
            .iter()
            .map(|(name, path)| {
                UrlGroup::new(
                    *name,
                    format!(
                        "{}/MC/{}?PageSize={}&PageNumber={{page}}#pf",
                        self.config.base_url, path, self.config.page_size
                    ),
                )
            })
            .collect()
    }
}
