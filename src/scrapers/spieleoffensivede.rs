//! spiele-offensive.de scraper implementation

use anyhow::Context;

use crate::models::{Field, Item, SingleItem};
use crate::page::{Document, Node};
use crate::scrapers::html::{absolute, attr, nth_from_end, parse_int, select_all, select_first, text};
use crate::scrapers::shop_config;
use crate::traits::{PageRules, ShopConfig, ShopScraper, UrlGroup};

/// Listing rules for the spiele-offensive.de catalog. Pages are numbered
/// from zero in the URL.
pub struct SpieleOffensiveRules;

impl PageRules for SpieleOffensiveRules {
    fn locate_listing<'a>(&self, document: &'a Document) -> anyhow::Result<Node<'a>> {
        let root = document.root().element()?;
        Ok(Node::Element(select_first(root, "ul.ala")?))
    }

    fn locate_grid<'a>(&self, listing: Node<'a>) -> anyhow::Result<Vec<Node<'a>>> {
        let entries = select_all(listing.element()?, "li.ala")?;
        Ok(entries.into_iter().map(Node::Element).collect())
    }

    fn extract_item(&self, base_url: &str, node: Node<'_>) -> Item {
        let mut item = SingleItem::new();
        let Ok(entry) = node.element() else {
            return item.into();
        };

        item.set_with(Field::Title, || Ok(text(select_first(entry, "a.alamain font")?)));
        item.set_with(Field::Stock, || {
            let badges = select_all(entry, "a.kbw")?;
            Ok(attr(nth_from_end(&badges, 1)?, "title")?.trim().to_string())
        });
        item.set_with(Field::Url, || {
            let link = select_first(entry, "a.alamain")?;
            Ok(absolute(base_url, attr(link, "href")?.trim()))
        });
        item.set_with(Field::ImageUrl, || {
            let image = select_first(entry, "img")?;
            Ok(absolute(base_url, attr(image, "src")?.trim()))
        });
        // euros and cents sit in separate unstyled spans
        item.set_with(Field::OrigPrice, || {
            let parts = select_all(entry, r#"div.ala span:not([class]), div.ala span[class=""]"#)?;
            let joined = parts.into_iter().map(text).collect::<Vec<_>>().join(".");
            joined
                .parse::<f64>()
                .with_context(|| format!("not a price: {joined:?}"))
        });
        // the list price is not shown, only the discount badge image "...?r=25&..."
        let price = item.record().orig_price;
        item.set_with(Field::OrigOldPrice, || {
            let src = attr(select_first(entry, "img")?, "src")?;
            let (_, query) = src.split_once("?r=").context("no discount in image url")?;
            let percent: f64 = query.split('&').next().unwrap_or(query).parse::<u32>()?.into();
            anyhow::ensure!(percent < 100.0, "discount badge of {percent}% has no list price");
            Ok(price * 100.0 / (100.0 - percent))
        });

        item.into()
    }

    fn max_page(&self, document: &Document, _page_size: u32) -> Option<u32> {
        let root = document.root().element().ok()?;
        let links = select_all(root, "div.nav a").ok()?;
        parse_int(&text(nth_from_end(&links, 2).ok()?)).ok()
    }

    fn page_param(&self, page: u32) -> u32 {
        page.saturating_sub(1)
    }
}

/// Scraper for spiele-offensive.de
pub struct SpieleOffensiveScraper {
    config: ShopConfig,
    rules: SpieleOffensiveRules,
}

impl SpieleOffensiveScraper {
    pub fn new() -> Self {
        Self {
            config: shop_config("spieleoffensivede", "https://www.spiele-offensive.de", "EUR", 50),
            rules: SpieleOffensiveRules,
        }
    }
}

impl Default for SpieleOffensiveScraper {
    fn default() -> Self {
        Self::new()
    }
}

impl ShopScraper for SpieleOffensiveScraper {
    fn config(&self) -> &ShopConfig {
        &self.config
    }

    fn rules(&self) -> &dyn PageRules {
        &self.rules
    }

    fn url_groups(&self) -> Vec<UrlGroup> {
        vec![UrlGroup::new(
            "All",
            format!("{}/Gesellschaftsspiele-{{page}}.html", self.config.base_url),
        )]
    }
}

#[cfg(test)]
mod tests {
    use scraper::Html;

    use super::*;

    const FIXTURE: &str = r#"
        <ul class="ala">
          <li class="ala">
            <img src="/bilder/rabatt.php?r=25&amp;s=1">
            <a class="alamain" href="/Spiel/Brass.html"><font> Brass: Birmingham </font></a>
            <a class="kbw" title="Lager"></a><a class="kbw" title=" sofort lieferbar "></a>
            <div class="ala"><span class="cur">€</span><span>45</span><span>00</span></div>
          </li>
          <li class="ala">
            <img src="/bilder/noimage.png">
            <a class="alamain" href="/Spiel/X.html"><font>X</font></a>
            <div class="ala"><span>9</span><span>99</span></div>
          </li>
        </ul>
        <div class="nav"><a>1</a><a>2</a><a>31</a><a>&gt;</a></div>
    "#;

    #[test]
    fn derives_old_price_from_discount_badge() {
        let rules = SpieleOffensiveRules;
        let base = "https://www.spiele-offensive.de";
        let document = Document::Html(Html::parse_document(FIXTURE));
        let grid = rules.locate_grid(rules.locate_listing(&document).unwrap()).unwrap();
        assert_eq!(grid.len(), 2);

        let brass = rules.extract_item(base, grid[0]);
        let record = brass.record();
        assert_eq!(record.title.as_deref(), Some("Brass: Birmingham"));
        assert_eq!(record.stock.as_deref(), Some("sofort lieferbar"));
        assert_eq!(record.url.as_deref(), Some("https://www.spiele-offensive.de/Spiel/Brass.html"));
        assert_eq!(record.orig_price, 45.0);
        assert!((record.orig_old_price - 60.0).abs() < 1e-9);

        let plain = rules.extract_item(base, grid[1]);
        assert_eq!(plain.record().orig_price, 9.99);
        assert!(plain.record().orig_old_price.is_nan());
        assert_eq!(plain.record().stock, None);

        assert_eq!(rules.max_page(&document, 50), Some(31));
    }

    #[test]
    fn full_discount_badge_leaves_old_price_empty() {
        let rules = SpieleOffensiveRules;
        let document = Document::Html(Html::parse_document(
            r#"<ul class="ala"><li class="ala">
                 <img src="/bilder/rabatt.php?r=100&amp;s=1">
                 <a class="alamain" href="/Spiel/Gratis.html"><font>Gratis</font></a>
                 <div class="ala"><span>5</span><span>00</span></div>
               </li></ul>"#,
        ));
        let grid = rules.locate_grid(rules.locate_listing(&document).unwrap()).unwrap();

        let item = rules.extract_item("https://www.spiele-offensive.de", grid[0]);
        let mut rows = item.to_rows();
        rows.rows[0].compute_discount();

        assert_eq!(rows.rows[0].orig_price, 5.0);
        assert!(rows.rows[0].orig_old_price.is_nan());
        assert!(rows.rows[0].discount.is_nan());
    }

    #[test]
    fn pages_start_at_zero() {
        let scraper = SpieleOffensiveScraper::new();
        let group = &scraper.url_groups()[0];
        assert_eq!(
            group.page_url(scraper.rules().page_param(1)),
            "https://www.spiele-offensive.de/Gesellschaftsspiele-0.html"
        );
    }
}
