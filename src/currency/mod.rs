//! Price parsing and currency conversion.
//!
//! Rates come from an exchange-rate service behind the [`RateSource`] seam
//! and are looked up once per shop run.

use std::fmt::Display;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::info;

use crate::error::ShopError;

/// Parses a price-like string: commas are decimal separators, everything but
/// digits and dots is discarded. Returns NaN when nothing numeric remains.
pub fn parse_number(value: &str) -> f64 {
    let cleaned: String = value
        .replace(',', ".")
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    cleaned.parse::<f64>().unwrap_or(f64::NAN)
}

/// Multiplies the numeric part of `value` by `rate`, NaN on non-numeric input.
pub fn convert_value(value: impl Display, rate: f64) -> f64 {
    parse_number(&value.to_string()) * rate
}

/// Element-wise [`convert_value`].
pub fn convert_series<V: Display>(values: impl IntoIterator<Item = V>, rate: f64) -> Vec<f64> {
    values.into_iter().map(|v| convert_value(v, rate)).collect()
}

pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Source of exchange rates.
#[async_trait]
pub trait RateSource: Send + Sync {
    /// Units of `to` per one unit of `from`, rounded to 3 decimals.
    async fn get_rate(&self, from: &str, to: &str) -> Result<f64, ShopError>;
}

/// A constant rate, for offline runs and tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedRate(pub f64);

#[async_trait]
impl RateSource for FixedRate {
    async fn get_rate(&self, _from: &str, _to: &str) -> Result<f64, ShopError> {
        Ok(round_to(self.0, 3))
    }
}

#[derive(Debug, Deserialize)]
struct LatestRates {
    rates: std::collections::HashMap<String, f64>,
}

/// ECB reference rates via a Frankfurter-compatible `/latest` endpoint.
#[derive(Clone)]
pub struct FrankfurterRates {
    client: Client,
    base_url: String,
}

impl FrankfurterRates {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl RateSource for FrankfurterRates {
    async fn get_rate(&self, from: &str, to: &str) -> Result<f64, ShopError> {
        if from.eq_ignore_ascii_case(to) {
            return Ok(1.0);
        }

        let url = format!("{}/latest", self.base_url.trim_end_matches('/'));
        let rate_error = |reason: String| ShopError::Rate {
            from: from.to_string(),
            to: to.to_string(),
            reason,
        };

        let response = self
            .client
            .get(&url)
            .query(&[("from", from), ("to", to)])
            .send()
            .await
            .map_err(|e| rate_error(e.to_string()))?;

        if !response.status().is_success() {
            return Err(rate_error(format!("HTTP status {}", response.status())));
        }

        let latest: LatestRates = response
            .json()
            .await
            .map_err(|e| rate_error(e.to_string()))?;
        let rate = latest
            .rates
            .get(to)
            .copied()
            .ok_or_else(|| rate_error(format!("{to} missing from response")))?;

        let rate = round_to(rate, 3);
        info!("Conversion rate {} -> {}: {}", from, to, rate);
        Ok(rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn convert_value_treats_comma_as_decimal_separator() {
        let converted = convert_value("1 234,56", 2.0);
        assert!((converted - 2469.12).abs() < 1e-9, "got {converted}");
    }

    #[test]
    fn convert_value_returns_nan_for_non_numeric_input() {
        assert!(convert_value("n/a", 2.0).is_nan());
        assert!(convert_value("", 2.0).is_nan());
        assert!(convert_value(f64::NAN, 2.0).is_nan());
    }

    #[test]
    fn convert_value_strips_currency_symbols() {
        assert!((convert_value("$19.99", 10.0) - 199.9).abs() < 1e-9);
        assert!((convert_value("€ 5", 3.0) - 15.0).abs() < 1e-9);
    }

    #[test]
    fn convert_value_accepts_numbers() {
        assert!((convert_value(80.0, 1.5) - 120.0).abs() < 1e-9);
    }

    #[test]
    fn ambiguous_thousand_separators_are_rejected() {
        assert!(convert_value("1.234,56", 1.0).is_nan());
    }

    #[test]
    fn convert_series_maps_each_value() {
        let converted = convert_series([1.0, f64::NAN, 3.0], 2.0);
        assert_eq!(converted[0], 2.0);
        assert!(converted[1].is_nan());
        assert_eq!(converted[2], 6.0);
    }

    #[test]
    fn round_to_three_places() {
        assert_eq!(round_to(412.34567, 3), 412.346);
        assert!(round_to(f64::NAN, 3).is_nan());
    }

    #[tokio::test]
    async fn fixed_rate_is_rounded() {
        let rate = FixedRate(1.23456).get_rate("EUR", "HUF").await.unwrap();
        assert_eq!(rate, 1.235);
    }
}
