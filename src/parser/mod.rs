pub mod detail;
pub mod listing;
pub mod text;

use scraper::{ElementRef, Html, Selector};

/// First element under `scope` matching `css`. A bad selector matches nothing.
fn select_first<'a>(scope: ElementRef<'a>, css: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(css).ok()?;
    scope.select(&selector).next()
}

fn select_all<'a>(scope: ElementRef<'a>, css: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(css) {
        Ok(selector) => scope.select(&selector).collect(),
        Err(_) => Vec::new(),
    }
}

/// Whitespace-collapsed text content of an element.
fn text_of(el: ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text of the first match, or `None` when the node is missing or blank.
fn probe_text(scope: ElementRef<'_>, css: Option<&str>) -> Option<String> {
    let el = select_first(scope, css?)?;
    let text = text_of(el);
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn contains_text(doc: &Html, needle: &str) -> bool {
    doc.root_element().text().any(|t| t.contains(needle))
}
