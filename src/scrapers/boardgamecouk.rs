//! board-game.co.uk scraper implementation

use crate::models::{Field, Item, SingleItem};
use crate::page::{Document, Node};
use crate::scrapers::html::{attr, nth_from_end, parse_int, parse_price, select_all, select_first, text};
use crate::scrapers::shop_config;
use crate::traits::{PageRules, ShopConfig, ShopScraper, UrlGroup};

const CATEGORIES: &[(&str, &str)] = &[
    ("boardgames", "board-games"),
    ("tradingcardgames", "trading-card-games"),
    ("accessories", "accessories"),
];

/// Listing rules for board-game.co.uk category pages
pub struct BoardGameCoUkRules;

impl PageRules for BoardGameCoUkRules {
    fn locate_listing<'a>(&self, document: &'a Document) -> anyhow::Result<Node<'a>> {
        let root = document.root().element()?;
        Ok(Node::Element(select_first(root, ".zg-products-list")?))
    }

    fn locate_grid<'a>(&self, listing: Node<'a>) -> anyhow::Result<Vec<Node<'a>>> {
        let cards = select_all(listing.element()?, ".zg-product")?;
        Ok(cards.into_iter().map(Node::Element).collect())
    }

    fn extract_item(&self, _base_url: &str, node: Node<'_>) -> Item {
        let mut item = SingleItem::new();
        let Ok(card) = node.element() else {
            return item.into();
        };

        item.set_with(Field::Title, || Ok(text(select_first(card, ".zg-product-title")?)));
        item.set_with(Field::Stock, || Ok(text(select_first(card, ".zg-product-notice")?)));
        item.set_with(Field::OrigPrice, || {
            let price = select_first(card, ".zg-product-prices .zg-product-price span")?;
            parse_price(&text(price), &["£", " "])
        });
        item.set_with(Field::OrigOldPrice, || {
            let rrp = select_first(card, ".zg-product-prices .zg-product-rrp span")?;
            parse_price(&text(rrp), &["£", " "])
        });
        item.set_with(Field::Url, || {
            let link = select_first(card, ".zg-product-image-container a")?;
            Ok(attr(link, "href")?.to_string())
        });
        item.set_with(Field::ImageUrl, || {
            let image = select_first(card, ".zg-product-image-container img")?;
            Ok(attr(image, "src")?.to_string())
        });

        item.into()
    }

    fn max_page(&self, document: &Document, _page_size: u32) -> Option<u32> {
        let root = document.root().element().ok()?;
        let links = select_all(root, ".bpf-filter-paging-links a").ok()?;
        let last = nth_from_end(&links, 2).ok()?;
        parse_int(attr(last, "data-page").ok()?).ok()
    }
}

/// Scraper for board-game.co.uk
pub struct BoardGameCoUkScraper {
    config: ShopConfig,
    rules: BoardGameCoUkRules,
}

impl BoardGameCoUkScraper {
    pub fn new() -> Self {
        Self {
            config: shop_config("boardgamecouk", "https://board-game.co.uk", "GBP", 80),
            rules: BoardGameCoUkRules,
        }
    }
}

impl Default for BoardGameCoUkScraper {
    fn default() -> Self {
        Self::new()
    }
}

impl ShopScraper for BoardGameCoUkScraper {
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
                        "{}/category/{}/?count={}&page={{page}}",
                        self.config.base_url, path, self.config.page_size
                    ),
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use scraper::Html;

    use super::*;

    const FIXTURE: &str = r#"
        <div class="zg-products-list">
          <div class="zg-product">
            <div class="zg-product-image-container">
              <a href="https://board-game.co.uk/product/azul/"><img src="https://cdn.test/azul.jpg"></a>
            </div>
            <h3 class="zg-product-title"> Azul </h3>
            <p class="zg-product-notice">In stock</p>
            <div class="zg-product-prices">
              <div class="zg-product-price"><span>£ 24.99</span></div>
              <div class="zg-product-rrp"><span>£ 34.99</span></div>
            </div>
          </div>
          <div class="zg-product">
            <h3 class="zg-product-title">Mystery box</h3>
          </div>
        </div>
        <div class="bpf-filter-paging-links">
          <a data-page="1">1</a><a data-page="2">2</a><a data-page="12">12</a><a data-page="2">Next</a>
        </div>
    "#;

    #[test]
    fn extracts_cards_and_last_page() {
        let rules = BoardGameCoUkRules;
        let document = Document::Html(Html::parse_document(FIXTURE));

        assert_eq!(rules.max_page(&document, 80), Some(12));

        let listing = rules.locate_listing(&document).unwrap();
        let grid = rules.locate_grid(listing).unwrap();
        assert_eq!(grid.len(), 2);

        let azul = rules.extract_item("https://board-game.co.uk", grid[0]);
        let record = azul.record();
        assert_eq!(record.title.as_deref(), Some("Azul"));
        assert_eq!(record.stock.as_deref(), Some("In stock"));
        assert_eq!(record.orig_price, 24.99);
        assert_eq!(record.orig_old_price, 34.99);
        assert_eq!(record.url.as_deref(), Some("https://board-game.co.uk/product/azul/"));
        assert_eq!(record.image_url.as_deref(), Some("https://cdn.test/azul.jpg"));

        let mystery = rules.extract_item("https://board-game.co.uk", grid[1]);
        assert!(mystery.record().orig_price.is_nan());
        assert_eq!(mystery.record().url, None);
    }

    #[test]
    fn missing_listing_is_an_error() {
        let document = Document::Html(Html::parse_document("<p>maintenance</p>"));
        assert!(BoardGameCoUkRules.locate_listing(&document).is_err());
        assert_eq!(BoardGameCoUkRules.max_page(&document, 80), None);
    }

    #[test]
    fn url_groups_carry_page_size() {
        let groups = BoardGameCoUkScraper::new().url_groups();
        assert_eq!(groups.len(), 3);
        assert_eq!(
            groups[0].page_url(2),
            "https://board-game.co.uk/category/board-games/?count=80&page=2"
        );
    }
}
