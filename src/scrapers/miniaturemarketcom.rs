//! miniaturemarket.com scraper implementation

use crate::models::{Field, Item, SingleItem};
use crate::page::{Document, Node};
use crate::scrapers::html::{attr, nth_from_end, parse_int, parse_price, select_all, select_first, text};
use crate::scrapers::shop_config;
use crate::traits::{PageRules, ShopConfig, ShopScraper, UrlGroup};

/// The listing is addressed by item offset, in steps of this many items.
pub const PAGE_SIZE: u32 = 32;

const CATEGORIES: &[(&str, &str)] = &[
    ("Deal", "deals.html"),
    ("BoardGames", "board-games.html"),
    ("Accessories", "accessories.html"),
];

/// Listing rules for miniaturemarket.com category grids
pub struct MiniatureMarketRules;

impl PageRules for MiniatureMarketRules {
    fn locate_listing<'a>(&self, document: &'a Document) -> anyhow::Result<Node<'a>> {
        let root = document.root().element()?;
        Ok(Node::Element(select_first(root, "div.product-grid")?))
    }

    fn locate_grid<'a>(&self, listing: Node<'a>) -> anyhow::Result<Vec<Node<'a>>> {
        let cards = select_all(listing.element()?, "div.item")?;
        Ok(cards.into_iter().map(Node::Element).collect())
    }

    fn extract_item(&self, _base_url: &str, node: Node<'_>) -> Item {
        let mut item = SingleItem::new();
        let Ok(card) = node.element() else {
            return item.into();
        };

        item.set_with(Field::Title, || {
            Ok(attr(select_first(card, "a.product-image")?, "title")?.trim().to_string())
        });
        item.set_with(Field::Url, || {
            Ok(attr(select_first(card, "a.product-image")?, "href")?.trim().to_string())
        });
        item.set_with(Field::ImageUrl, || {
            let image = select_first(card, "a.product-image img")?;
            Ok(format!("http:{}", attr(image, "src")?.trim()))
        });
        item.set_with(Field::Stock, || Ok(text(select_first(card, ".availability")?)));

        // the current price is always the last one, the list price precedes it
        let prices = select_all(card, "span.price").unwrap_or_default();
        item.set_with(Field::OrigPrice, || {
            parse_price(&text(nth_from_end(&prices, 1)?), &["$"])
        });
        item.set_with(Field::OrigOldPrice, || {
            parse_price(&text(nth_from_end(&prices, 2)?), &["$"])
        });

        item.into()
    }

    fn max_page(&self, document: &Document, _page_size: u32) -> Option<u32> {
        let root = document.root().element().ok()?;
        let links = select_all(root, r##"a[href="#"]"##).ok()?;
        parse_int(&text(nth_from_end(&links, 1).ok()?)).ok()
    }

    fn page_param(&self, page: u32) -> u32 {
        page.saturating_sub(1) * PAGE_SIZE
    }
}

/// Scraper for miniaturemarket.com
pub struct MiniatureMarketScraper {
    config: ShopConfig,
    rules: MiniatureMarketRules,
}

impl MiniatureMarketScraper {
    pub fn new() -> Self {
        Self {
            config: shop_config("miniaturemarketcom", "https://miniaturemarket.com", "USD", PAGE_SIZE),
            rules: MiniatureMarketRules,
        }
    }
}

impl Default for MiniatureMarketScraper {
    fn default() -> Self {
        Self::new()
    }
}

impl ShopScraper for MiniatureMarketScraper {
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
                UrlGroup::new(*name, format!("{}/{}?start={{page}}", self.config.base_url, path))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use scraper::Html;

    use super::*;

    const FIXTURE: &str = r##"
        <div class="product-grid">
          <div class="item">
            <a class="product-image" title=" Gloomhaven " href="https://miniaturemarket.com/gloomhaven.html">
              <img src="//cdn.test/gloom.jpg">
            </a>
            <p class="availability">In Stock</p>
            <span class="price">$140.00</span><span class="price">$99.95</span>
          </div>
        </div>
        <div class="pages"><a href="#">1</a><a href="#">2</a><a href="#">14</a></div>
    "##;

    #[test]
    fn extracts_grid_items() {
        let rules = MiniatureMarketRules;
        let document = Document::Html(Html::parse_document(FIXTURE));
        let grid = rules.locate_grid(rules.locate_listing(&document).unwrap()).unwrap();
        let item = rules.extract_item("https://miniaturemarket.com", grid[0]);
        let record = item.record();

        assert_eq!(record.title.as_deref(), Some("Gloomhaven"));
        assert_eq!(record.image_url.as_deref(), Some("http://cdn.test/gloom.jpg"));
        assert_eq!(record.stock.as_deref(), Some("In Stock"));
        assert_eq!(record.orig_price, 99.95);
        assert_eq!(record.orig_old_price, 140.0);
        assert_eq!(rules.max_page(&document, PAGE_SIZE), Some(14));
    }

    #[test]
    fn pages_are_item_offsets() {
        let rules = MiniatureMarketRules;
        assert_eq!(rules.page_param(1), 0);
        assert_eq!(rules.page_param(3), 64);

        let groups = MiniatureMarketScraper::new().url_groups();
        assert_eq!(
            groups[0].page_url(rules.page_param(2)),
            "https://miniaturemarket.com/deals.html?start=32"
        );
    }
}
