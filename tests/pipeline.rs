//! A full shop run over HTTP: listing pages served by a mock shop, prices
//! converted with a fixed rate, the table written to a workbook and the
//! second run answered from the page cache.

use std::time::Duration;

use scraper::Selector;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use bgshops::cache::CacheStore;
use bgshops::currency::FixedRate;
use bgshops::fetcher::HttpFetcher;
use bgshops::models::{Field, Item, SingleItem};
use bgshops::page::{Document, Node};
use bgshops::shop::{RunContext, RunOptions, Shop};
use bgshops::traits::{PageRules, ShopConfig, ShopScraper, UrlGroup};

struct MockRules;

impl PageRules for MockRules {
    fn locate_listing<'a>(&self, document: &'a Document) -> anyhow::Result<Node<'a>> {
        let selector = Selector::parse("ul.games").map_err(|e| anyhow::anyhow!("{e}"))?;
        let listing = document
            .root()
            .element()?
            .select(&selector)
            .next()
            .ok_or_else(|| anyhow::anyhow!("no ul.games"))?;
        Ok(Node::Element(listing))
    }

    fn locate_grid<'a>(&self, listing: Node<'a>) -> anyhow::Result<Vec<Node<'a>>> {
        let selector = Selector::parse("li").map_err(|e| anyhow::anyhow!("{e}"))?;
        Ok(listing.element()?.select(&selector).map(Node::Element).collect())
    }

    fn extract_item(&self, base_url: &str, node: Node<'_>) -> Item {
        let mut item = SingleItem::new();
        let Ok(li) = node.element() else {
            return item.into();
        };
        let title = li.text().collect::<String>().trim().to_string();
        item.set(Field::Url, format!("{base_url}/{}", title.to_lowercase()));
        item.set(Field::Title, title);
        item.set(Field::OrigPrice, li.value().attr("data-price"));
        item.set(Field::OrigOldPrice, li.value().attr("data-old"));
        item.into()
    }

    fn max_page(&self, document: &Document, _page_size: u32) -> Option<u32> {
        let selector = Selector::parse("nav[data-last]").ok()?;
        document
            .root()
            .element()
            .ok()?
            .select(&selector)
            .next()?
            .value()
            .attr("data-last")?
            .parse()
            .ok()
    }
}

struct MockShop {
    config: ShopConfig,
}

impl ShopScraper for MockShop {
    fn config(&self) -> &ShopConfig {
        &self.config
    }

    fn rules(&self) -> &dyn PageRules {
        &MockRules
    }

    fn url_groups(&self) -> Vec<UrlGroup> {
        vec![UrlGroup::new(
            "games",
            format!("{}/games?page={{page}}", self.config.base_url),
        )]
    }
}

async fn mount_page(server: &MockServer, page: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path("/games"))
        .and(wiremock::matchers::query_param("page", page))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn run_converts_sorts_and_caches() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "1",
        r#"<ul class="games">
             <li data-price="80" data-old="100">Azul</li>
             <li data-price="50" data-old="100">Brass</li>
           </ul>
           <nav data-last="2"></nav>"#,
    )
    .await;
    mount_page(
        &server,
        "2",
        r#"<ul class="games">
             <li data-price="30" data-old="40">Catan</li>
             <li data-price="10">Dune</li>
           </ul>
           <nav data-last="2"></nav>"#,
    )
    .await;

    let scraper = MockShop {
        config: ShopConfig {
            name: "mockshop".to_string(),
            base_url: server.uri(),
            currency: "EUR".to_string(),
            page_size: 2,
            delay: Duration::ZERO,
            dimensions: (800, 600),
            spreadsheet: None,
        },
    };

    let dir = tempfile::tempdir().unwrap();
    let cache = CacheStore::new(dir.path().join("page"));
    let output_dir = dir.path().join("shop");
    let rates = FixedRate(2.0);
    let context = RunContext {
        rates: &rates,
        base_currency: "HUF",
        cache: &cache,
        output_dir: &output_dir,
    };
    let options = RunOptions::new("20240101");

    let mut fetcher = HttpFetcher::new("bgshops-test/0.1", 5).unwrap();
    let shop = Shop::run(&scraper, &mut fetcher, &context, &options)
        .await
        .unwrap();

    let titles: Vec<_> = shop
        .table
        .rows
        .iter()
        .map(|r| r.title.clone().unwrap_or_default())
        .collect();
    assert_eq!(titles, ["Brass", "Catan", "Azul", "Dune"]);

    let brass = &shop.table.rows[0];
    assert_eq!(brass.converted_price, 100.0);
    assert_eq!(brass.converted_old_price, 200.0);
    assert_eq!(brass.discount, 50.0);
    assert_eq!(brass.currency.as_deref(), Some("EUR"));
    assert_eq!(brass.group.as_deref(), Some("games"));
    assert_eq!(brass.url, Some(format!("{}/brass", server.uri())));
    assert!(shop.table.rows[3].discount.is_nan());

    assert!(shop.workbook_path.exists());
    assert!(shop.workbook_path.starts_with(&output_dir));

    // the mocks expect exactly one request per page
    let mut fetcher = HttpFetcher::new("bgshops-test/0.1", 5).unwrap();
    let again = Shop::run(&scraper, &mut fetcher, &context, &options)
        .await
        .unwrap();
    assert_eq!(again.table.len(), 4);
    assert!(again.pages[0].1.iter().all(|p| p.from_cache));
}
