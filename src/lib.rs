//! Board game shop scraper: walks shop listings, normalizes every product
//! into one row schema, converts prices into a base currency and publishes
//! the sorted table to a spreadsheet.

pub mod cache;
pub mod config;
pub mod currency;
pub mod error;
pub mod fetcher;
pub mod models;
pub mod page;
pub mod publish;
pub mod runner;
pub mod scrapers;
pub mod shop;
pub mod slug;
pub mod traits;
pub mod workbook;

pub use error::{ConfigError, ShopError};
pub use runner::{RunRequest, Runner};
pub use shop::{RunOptions, Shop};
