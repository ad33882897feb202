use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

use super::text::{parse_amount, parse_days, parse_raised_of_target};
use super::{contains_text, probe_text, select_all, select_first, text_of};
use crate::records::{CampaignUrl, RawCampaignRecord, UNKNOWN};
use crate::site::{ListingSelectors, SiteProfile, Source};

/// Title text plus the raw href it was read from, if any.
#[derive(Debug, Clone, PartialEq)]
struct TitleLink {
    title: String,
    href: Option<String>,
}

type TitleStrategy = fn(ElementRef<'_>, &ListingSelectors) -> Option<TitleLink>;

/// Tried in order; the first strategy yielding a non-empty title wins.
const TITLE_STRATEGIES: &[TitleStrategy] = &[structured_title, heading_link, first_text_link];

/// One parsed listing page.
#[derive(Debug, Default)]
pub struct ListingPage {
    pub cards: usize,
    pub no_results: bool,
    pub records: Vec<RawCampaignRecord>,
}

pub fn parse_listing(html: &str, profile: &SiteProfile, source: &Source) -> ListingPage {
    let doc = Html::parse_document(html);
    let no_results = profile
        .listing
        .no_results_marker
        .is_some_and(|marker| contains_text(&doc, marker));
    let cards = count_cards(&doc, &profile.listing);
    let records = if no_results {
        Vec::new()
    } else {
        extract_listing(&doc, profile, source)
    };
    ListingPage {
        cards,
        no_results,
        records,
    }
}

/// Extract one record per campaign card. Cards without a resolvable URL are dropped.
pub fn extract_listing(doc: &Html, profile: &SiteProfile, source: &Source) -> Vec<RawCampaignRecord> {
    let sel = &profile.listing;
    let Ok(card_selector) = Selector::parse(sel.card) else {
        return Vec::new();
    };
    let base = Url::parse(&source.url).ok();

    doc.select(&card_selector)
        .filter_map(|card| {
            let record = extract_card(card, sel, base.as_ref(), &source.label);
            if record.url == CampaignUrl::Absent {
                debug!("Dropping card without URL: {}", record.title);
                return None;
            }
            Some(record)
        })
        .collect()
}

fn count_cards(doc: &Html, sel: &ListingSelectors) -> usize {
    Selector::parse(sel.card)
        .map(|s| doc.select(&s).count())
        .unwrap_or(0)
}

fn extract_card(card: ElementRef<'_>, sel: &ListingSelectors, base: Option<&Url>, label: &str) -> RawCampaignRecord {
    let TitleLink { title, href } = TITLE_STRATEGIES
        .iter()
        .find_map(|strategy| strategy(card, sel))
        .or_else(|| untitled_link(card))
        .unwrap_or(TitleLink {
            title: UNKNOWN.to_string(),
            href: None,
        });

    let url = href
        .and_then(|h| resolve_url(base, &h))
        .map(CampaignUrl::Known)
        .unwrap_or(CampaignUrl::Absent);

    let days_to_go = probe_text(card, sel.days_to_go).and_then(|t| parse_days(&t));
    let mut amount_raised = probe_text(card, sel.amount_raised).and_then(|t| parse_amount(&t));
    let mut target_amount = probe_text(card, sel.target_amount).and_then(|t| parse_amount(&t));
    if amount_raised.is_none() || target_amount.is_none() {
        if let Some((raised, target)) =
            probe_text(card, sel.raised_of_target).and_then(|t| parse_raised_of_target(&t))
        {
            amount_raised = amount_raised.or(Some(raised));
            target_amount = target_amount.or(Some(target));
        }
    }

    let category_tags = sel
        .category_links
        .map(|css| {
            select_all(card, css)
                .into_iter()
                .map(text_of)
                .filter(|t| !t.is_empty())
                .collect()
        })
        .unwrap_or_default();

    RawCampaignRecord {
        title,
        url,
        days_to_go,
        amount_raised,
        target_amount,
        category_tags,
        source_label: label.to_string(),
    }
}

fn link_of(el: ElementRef<'_>) -> Option<TitleLink> {
    let title = text_of(el);
    if title.is_empty() {
        return None;
    }
    Some(TitleLink {
        title,
        href: el.value().attr("href").map(str::to_string),
    })
}

/// The site's own title node, e.g. `h3.entry-title` or a `data-shortcode` block.
fn structured_title(card: ElementRef<'_>, sel: &ListingSelectors) -> Option<TitleLink> {
    let node = select_first(card, sel.structured_title)?;
    if let Some(link) = select_first(node, "a[href]").and_then(link_of) {
        return Some(link);
    }
    let title = text_of(node);
    (!title.is_empty()).then_some(TitleLink { title, href: None })
}

fn heading_link(card: ElementRef<'_>, _: &ListingSelectors) -> Option<TitleLink> {
    select_all(card, "h1, h2, h3, h4")
        .into_iter()
        .find_map(|h| select_first(h, "a[href]").and_then(link_of))
}

fn first_text_link(card: ElementRef<'_>, _: &ListingSelectors) -> Option<TitleLink> {
    select_all(card, "a[href]").into_iter().find_map(link_of)
}

/// Last resort when no link carries text: keep the href, title becomes `Unknown`.
fn untitled_link(card: ElementRef<'_>) -> Option<TitleLink> {
    let href = select_first(card, "a[href]")?.value().attr("href")?;
    Some(TitleLink {
        title: UNKNOWN.to_string(),
        href: Some(href.to_string()),
    })
}

/// Absolute http(s) URL, resolving relative hrefs against the page.
fn resolve_url(base: Option<&Url>, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }
    let url = match Url::parse(href) {
        Ok(u) => u,
        Err(url::ParseError::RelativeUrlWithoutBase) => base?.join(href).ok()?,
        Err(_) => return None,
    };
    matches!(url.scheme(), "http" | "https").then(|| url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::site::SiteKind;

    fn fixture(name: &str) -> String {
        std::fs::read_to_string(format!("tests/fixtures/{}.html", name)).unwrap()
    }

    fn roh_source() -> Source {
        Source::new("seniors", "https://rayofhope.sg/product-tag/seniors/", true)
    }

    #[test]
    fn ray_of_hope_cards() {
        let profile = SiteProfile::for_kind(SiteKind::RayOfHope);
        let page = parse_listing(&fixture("roh_listing"), &profile, &roh_source());
        // 4 cards, one has no link anywhere
        assert_eq!(page.cards, 4);
        assert!(!page.no_results);
        assert_eq!(page.records.len(), 3);

        let first = &page.records[0];
        assert_eq!(first.title, "Meals for Isolated Seniors");
        assert_eq!(
            first.url,
            CampaignUrl::Known("https://rayofhope.sg/campaign/meals-for-isolated-seniors/".into())
        );
        assert_eq!(first.days_to_go, Some(12));
        assert_eq!(first.amount_raised, Some(1234.50));
        assert_eq!(first.target_amount, Some(5000.0));
        assert_eq!(first.category_tags, vec!["Seniors", "Families in Need"]);
        assert_eq!(first.source_label, "seniors");
        assert_eq!(first.completion_percentage(), Some(24.69));
    }

    #[test]
    fn ray_of_hope_missing_probes_stay_unset() {
        let profile = SiteProfile::for_kind(SiteKind::RayOfHope);
        let page = parse_listing(&fixture("roh_listing"), &profile, &roh_source());
        let second = &page.records[1];
        assert_eq!(second.title, "Wheelchairs for Mdm Tan");
        assert_eq!(second.days_to_go, Some(0));
        assert_eq!(second.amount_raised, Some(999.0));
        assert_eq!(second.target_amount, None);
        assert!(second.category_tags.is_empty());
    }

    #[test]
    fn relative_href_resolved_against_source() {
        let profile = SiteProfile::for_kind(SiteKind::RayOfHope);
        let page = parse_listing(&fixture("roh_listing"), &profile, &roh_source());
        assert_eq!(
            page.records[2].url.as_known(),
            Some("https://rayofhope.sg/campaign/school-fees/")
        );
    }

    #[test]
    fn no_results_marker() {
        let profile = SiteProfile::for_kind(SiteKind::RayOfHope);
        let page = parse_listing(&fixture("roh_listing_empty"), &profile, &roh_source());
        assert!(page.no_results);
        assert!(page.records.is_empty());
    }

    #[test]
    fn g2c_title_strategies() {
        let profile = SiteProfile::for_kind(SiteKind::G2c);
        let source = Source::new("campaigns", "https://www.childrensociety.org.sg/g2c/campaigns/", true);
        let page = parse_listing(&fixture("g2c_listing"), &profile, &source);
        // 5 cards: structured, heading, first-link, structured-without-link, untitled link
        assert_eq!(page.cards, 5);
        let titles: Vec<&str> = page.records.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(
            titles,
            vec!["Gift of Reading", "Safe Shelter for Teens", "Counselling Hotline", "Unknown"]
        );
        assert_eq!(page.records[0].amount_raised, Some(1200.0));
        assert_eq!(page.records[0].target_amount, Some(5000.0));
        assert_eq!(page.records[0].days_to_go, Some(5));
        assert!(page.records.iter().all(|r| r.url != CampaignUrl::Absent));
    }

    #[test]
    fn n_cards_minus_missing_urls() {
        let profile = SiteProfile::for_kind(SiteKind::G2c);
        let source = Source::new("campaigns", "https://example.org/campaigns/", true);
        let html = r#"
            <article class="type-campaigns"><h2><a href="/c/1/">One</a></h2></article>
            <article class="type-campaigns"><h2>No link</h2></article>
            <article class="type-campaigns"><a href="https://example.org/c/3/">Three</a></article>
            <article class="type-campaigns"><p>Nothing</p></article>
        "#;
        let page = parse_listing(html, &profile, &source);
        assert_eq!(page.cards, 4);
        assert_eq!(page.records.len(), 2);
    }

    #[test]
    fn resolve_rejects_non_http() {
        assert_eq!(resolve_url(None, "mailto:a@b.org"), None);
        assert_eq!(resolve_url(None, "#top"), None);
        assert_eq!(resolve_url(None, "/relative/"), None);
        assert_eq!(
            resolve_url(None, "https://a.org/x/").as_deref(),
            Some("https://a.org/x/")
        );
    }
}
