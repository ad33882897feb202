use tracing::{info, warn};

use crate::fetch::{fetch_page, Fetcher, TimeoutPolicy};
use crate::parser::listing::parse_listing;
use crate::records::RawCampaignRecord;
use crate::site::{SiteProfile, Source};

/// Why a source stopped yielding pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    NoResults,
    Empty,
    FetchFailed,
    PageCap,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceOutcome {
    pub label: String,
    pub pages: u32,
    pub records: usize,
    pub stop: StopReason,
}

enum Step {
    Continue(Vec<RawCampaignRecord>),
    Stop(StopReason),
}

/// Crawl every source in declared order, returning all sightings in traversal order.
pub async fn collect_listings<F: Fetcher>(
    fetcher: &F,
    profile: &SiteProfile,
    policy: &TimeoutPolicy,
) -> (Vec<RawCampaignRecord>, Vec<SourceOutcome>) {
    let mut acc = Vec::new();
    let mut outcomes = Vec::with_capacity(profile.sources.len());
    for source in &profile.sources {
        println!("Scraping source: {}", source.label);
        let (next, outcome) = crawl_source(fetcher, profile, source, policy, acc).await;
        info!(
            "Source {} finished after {} page(s): {} records ({:?})",
            outcome.label, outcome.pages, outcome.records, outcome.stop
        );
        acc = next;
        outcomes.push(outcome);
    }
    println!("Total campaigns (with duplicates): {}", acc.len());
    (acc, outcomes)
}

/// Walk one source's pages, threading the accumulator through and handing it back.
pub async fn crawl_source<F: Fetcher>(
    fetcher: &F,
    profile: &SiteProfile,
    source: &Source,
    policy: &TimeoutPolicy,
    mut acc: Vec<RawCampaignRecord>,
) -> (Vec<RawCampaignRecord>, SourceOutcome) {
    let cap = profile.page_cap(source);
    let before = acc.len();
    let mut page = 1;
    let stop = loop {
        if page > cap {
            break StopReason::PageCap;
        }
        if page > 1 && !profile.page_delay.is_zero() {
            tokio::time::sleep(profile.page_delay).await;
        }
        match fetch_step(fetcher, profile, source, page, policy).await {
            Step::Continue(records) => {
                acc.extend(records);
                page += 1;
            }
            Step::Stop(reason) => break reason,
        }
    };

    let outcome = SourceOutcome {
        label: source.label.clone(),
        pages: page.min(cap),
        records: acc.len() - before,
        stop,
    };
    (acc, outcome)
}

async fn fetch_step<F: Fetcher>(
    fetcher: &F,
    profile: &SiteProfile,
    source: &Source,
    page: u32,
    policy: &TimeoutPolicy,
) -> Step {
    let url = source.page_url(page);
    info!("Scraping page {}: {}", page, url);

    let html = match fetch_page(fetcher, &url, policy).await {
        Ok(html) => html,
        Err(e) => {
            warn!("{}; moving to next source", e);
            return Step::Stop(StopReason::FetchFailed);
        }
    };

    let listing = parse_listing(&html, profile, source);
    if listing.no_results {
        info!("No campaigns on page {} of {}", page, source.label);
        return Step::Stop(StopReason::NoResults);
    }
    if listing.records.is_empty() {
        info!(
            "No usable campaigns on page {} of {} ({} cards)",
            page, source.label, listing.cards
        );
        return Step::Stop(StopReason::Empty);
    }
    info!("Found {} campaigns on page {}", listing.records.len(), page);
    Step::Continue(listing.records)
}
