//! HTML helpers for the page-parsing side of tasks.
//!
//! `scraper`'s parsed documents are not `Send`, so these run as plain
//! synchronous functions over an already-fetched body and never cross an
//! await point.

use scraper::{Html, Selector};
use url::Url;

use parldata_shared::{ParldataError, Result};

/// Extract the absolute href of every anchor matched by `selector`,
/// resolved against `base`, in document order. Unresolvable hrefs are
/// skipped.
pub fn extract_links(html: &str, base: &Url, selector: &str) -> Result<Vec<String>> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(selector)
        .map_err(|e| ParldataError::parse(format!("bad selector {selector:?}: {e}")))?;

    let mut links = Vec::new();
    for element in document.select(&selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        if let Ok(resolved) = base.join(href) {
            links.push(resolved.to_string());
        }
    }
    Ok(links)
}

/// The concatenated text of every element matched by `selector`, each
/// whitespace-collapsed, in document order.
pub fn extract_text(html: &str, selector: &str) -> Result<Vec<String>> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(selector)
        .map_err(|e| ParldataError::parse(format!("bad selector {selector:?}: {e}")))?;

    Ok(document
        .select(&selector)
        .map(|element| {
            element
                .text()
                .collect::<String>()
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect())
}
