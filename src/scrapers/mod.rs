//! Site-specific shop scrapers and the registry that picks one by name or URL

pub mod boardgamecouk;
pub mod coolstuffinccom;
pub mod funagaincom;
pub(crate) mod html;
pub mod milanspielede;
pub mod miniaturemarketcom;
pub mod nobleknightcom;
pub mod spieleoffensivede;

use std::time::Duration;

use crate::error::ShopError;
use crate::traits::{ShopConfig, ShopScraper};

pub use boardgamecouk::BoardGameCoUkScraper;
pub use coolstuffinccom::CoolStuffIncScraper;
pub use funagaincom::FunagainScraper;
pub use milanspielede::MilanSpieleScraper;
pub use miniaturemarketcom::MiniatureMarketScraper;
pub use nobleknightcom::NobleKnightScraper;
pub use spieleoffensivede::SpieleOffensiveScraper;

/// Spreadsheet every shop publishes to
pub const SPREADSHEET: &str = "BGShops";

const FETCH_DELAY: Duration = Duration::from_millis(100);
const DIMENSIONS: (u32, u32) = (1600, 3000);

type Constructor = fn() -> Box<dyn ShopScraper>;

fn boxed<S: ShopScraper + Default + 'static>() -> Box<dyn ShopScraper> {
    Box::new(S::default())
}

const REGISTRY: &[(&str, Constructor)] = &[
    ("boardgamecouk", boxed::<BoardGameCoUkScraper>),
    ("coolstuffinccom", boxed::<CoolStuffIncScraper>),
    ("funagaincom", boxed::<FunagainScraper>),
    ("milanspielede", boxed::<MilanSpieleScraper>),
    ("miniaturemarketcom", boxed::<MiniatureMarketScraper>),
    ("nobleknightcom", boxed::<NobleKnightScraper>),
    ("spieleoffensivede", boxed::<SpieleOffensiveScraper>),
];

/// Names of every registered shop
pub fn available() -> impl Iterator<Item = &'static str> {
    REGISTRY.iter().map(|(name, _)| *name)
}

/// Reduces a URL or shop name to a registry key:
/// `https://www.board-game.co.uk/x` becomes `boardgamecouk`.
pub fn module_name(identifier: &str) -> String {
    let identifier = identifier.trim();
    let rest = identifier
        .split_once("://")
        .map_or(identifier, |(_, rest)| rest);
    let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
    let host = host.strip_prefix("www.").unwrap_or(host);

    host.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Looks up the scraper for a URL or shop name
pub fn resolve(identifier: &str) -> Result<Box<dyn ShopScraper>, ShopError> {
    let name = module_name(identifier);
    REGISTRY
        .iter()
        .find(|(key, _)| *key == name)
        .map(|(_, constructor)| constructor())
        .ok_or_else(|| ShopError::UnknownShop {
            name,
            known: available().map(str::to_string).collect(),
        })
}

/// Configuration shared by every registered shop; callers override what differs.
pub(crate) fn shop_config(name: &str, base_url: &str, currency: &str, page_size: u32) -> ShopConfig {
    ShopConfig {
        name: name.to_string(),
        base_url: base_url.to_string(),
        currency: currency.to_string(),
        page_size,
        delay: FETCH_DELAY,
        dimensions: DIMENSIONS,
        spreadsheet: Some(SPREADSHEET.to_string()),
    }
}
