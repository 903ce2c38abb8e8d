//! Small selection helpers shared by the HTML shop rules.

use anyhow::{Context, Result, anyhow};
use scraper::{ElementRef, Selector};

pub(crate) fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("Failed to parse selector {css:?}: {e:?}"))
}

/// First descendant of `scope` matching `css`.
pub(crate) fn select_first<'a>(scope: ElementRef<'a>, css: &str) -> Result<ElementRef<'a>> {
    let selector = selector(css)?;
    scope
        .select(&selector)
        .next()
        .with_context(|| format!("no element matches {css:?}"))
}

pub(crate) fn select_all<'a>(scope: ElementRef<'a>, css: &str) -> Result<Vec<ElementRef<'a>>> {
    let selector = selector(css)?;
    Ok(scope.select(&selector).collect())
}

/// `nth_from_end(items, 1)` is the last element, `2` the one before it.
pub(crate) fn nth_from_end<T: Copy>(items: &[T], n: usize) -> Result<T> {
    items
        .len()
        .checked_sub(n)
        .and_then(|i| items.get(i).copied())
        .with_context(|| format!("expected at least {n} elements, found {}", items.len()))
}

/// Trimmed text content.
pub(crate) fn text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

pub(crate) fn attr<'a>(element: ElementRef<'a>, name: &str) -> Result<&'a str> {
    element
        .value()
        .attr(name)
        .with_context(|| format!("<{}> has no {name} attribute", element.value().name()))
}

/// Removes every `strip` token, then parses what is left as a float.
pub(crate) fn parse_price(raw: &str, strip: &[&str]) -> Result<f64> {
    let mut cleaned = raw.to_string();
    for token in strip {
        cleaned = cleaned.replace(token, "");
    }
    let cleaned = cleaned.trim();
    cleaned
        .parse::<f64>()
        .with_context(|| format!("not a price: {cleaned:?}"))
}

pub(crate) fn parse_int(raw: &str) -> Result<u32> {
    let raw = raw.trim();
    raw.parse::<u32>()
        .with_context(|| format!("not a page number: {raw:?}"))
}

/// Prefixes relative links with the shop's base URL.
pub(crate) fn absolute(base_url: &str, href: &str) -> String {
    if href.starts_with("http") {
        href.to_string()
    } else {
        format!("{base_url}{href}")
    }
}
