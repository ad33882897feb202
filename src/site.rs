use std::time::Duration;

use serde::Deserialize;

const ROH_BASE: &str = "https://rayofhope.sg";
const G2C_CAMPAIGNS_URL: &str = "https://www.childrensociety.org.sg/g2c/campaigns/";

const ROH_CATEGORIES: &[&str] = &[
    "children-12-years-and-below",
    "chronic-illness",
    "disability",
    "ex-offenders",
    "families-in-need",
    "mental-health",
    "migrant-workers",
    "other-marginalised-communities",
    "seniors",
    "youth-from-13-to-21-years",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum SiteKind {
    #[default]
    RayOfHope,
    G2c,
}

/// A listing entry point. Paginated sources walk `page/{n}/` suffixes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Source {
    pub label: String,
    pub url: String,
    #[serde(default = "default_paginated")]
    pub paginated: bool,
}

fn default_paginated() -> bool {
    true
}

impl Source {
    pub fn new(label: &str, url: &str, paginated: bool) -> Self {
        Source {
            label: label.to_string(),
            url: url.to_string(),
            paginated,
        }
    }

    /// Page 1 is the bare URL; later pages append `page/{n}/`.
    pub fn page_url(&self, page: u32) -> String {
        if page <= 1 {
            return self.url.clone();
        }
        let base = self.url.trim_end_matches('/');
        format!("{}/page/{}/", base, page)
    }
}

/// CSS selectors probed on a listing card. `None` means the site never shows it.
#[derive(Debug, Clone)]
pub struct ListingSelectors {
    pub card: &'static str,
    pub structured_title: &'static str,
    pub no_results_marker: Option<&'static str>,
    pub days_to_go: Option<&'static str>,
    pub amount_raised: Option<&'static str>,
    pub target_amount: Option<&'static str>,
    pub raised_of_target: Option<&'static str>,
    pub category_links: Option<&'static str>,
}

/// CSS selectors probed on a campaign's own page.
#[derive(Debug, Clone)]
pub struct DetailSelectors {
    pub date_range: Option<&'static str>,
    pub started_on: Option<&'static str>,
    pub donors: Option<&'static str>,
    pub percentage: Option<&'static str>,
    pub days_left: Option<&'static str>,
    pub raised_of_target: Option<&'static str>,
}

#[derive(Debug, Clone)]
pub struct SiteProfile {
    pub kind: SiteKind,
    pub name: &'static str,
    /// Prefix for output file names.
    pub file_prefix: &'static str,
    pub sources: Vec<Source>,
    pub max_pages: u32,
    pub page_delay: Duration,
    pub detail_delay: Duration,
    pub listing: ListingSelectors,
    pub detail: DetailSelectors,
}

impl SiteProfile {
    pub fn for_kind(kind: SiteKind) -> Self {
        match kind {
            SiteKind::RayOfHope => ray_of_hope(),
            SiteKind::G2c => g2c(),
        }
    }

    /// Page cap for one source; single-page sources never paginate.
    pub fn page_cap(&self, source: &Source) -> u32 {
        if source.paginated {
            self.max_pages.max(1)
        } else {
            1
        }
    }
}

fn ray_of_hope() -> SiteProfile {
    let mut sources: Vec<Source> = ROH_CATEGORIES
        .iter()
        .map(|c| Source::new(c, &format!("{}/product-tag/{}/", ROH_BASE, c), true))
        .collect();
    sources.push(Source::new(
        "4-giving-circles",
        &format!("{}/campaigns/4-giving-circles/", ROH_BASE),
        false,
    ));
    sources.push(Source::new("main_page", &format!("{}/campaigns/", ROH_BASE), false));

    SiteProfile {
        kind: SiteKind::RayOfHope,
        name: "Ray of Hope",
        file_prefix: "ray_of_hope",
        sources,
        max_pages: 6,
        page_delay: Duration::from_millis(500),
        detail_delay: Duration::from_millis(100),
        listing: ListingSelectors {
            card: "div.themeum-campaign-post",
            structured_title: ".themeum-campaign-post-content h3.entry-title",
            no_results_marker: Some("No products were found"),
            days_to_go: Some(".roh-days-to-go"),
            amount_raised: Some(".progressbar-content-wrapper .woocommerce-Price-amount"),
            target_amount: Some(".progressbar-content-wrapper .thm-funding-goal .woocommerce-Price-amount"),
            raised_of_target: None,
            category_links: Some(".themeum-campaign-post-content .entry-category a"),
        },
        detail: DetailSelectors {
            date_range: None,
            started_on: Some(".wpneo-campaign-date"),
            donors: Some(".info-text.percentage-completed"),
            percentage: None,
            days_left: None,
            raised_of_target: None,
        },
    }
}

fn g2c() -> SiteProfile {
    SiteProfile {
        kind: SiteKind::G2c,
        name: "Children's Society G2C",
        file_prefix: "g2c",
        sources: vec![Source::new("campaigns", G2C_CAMPAIGNS_URL, true)],
        max_pages: 17,
        page_delay: Duration::from_millis(500),
        detail_delay: Duration::from_millis(500),
        listing: ListingSelectors {
            card: "article.type-campaigns",
            structured_title: ".thrive-shortcode-content[data-shortcode='tcb_post_title']",
            no_results_marker: None,
            days_to_go: Some(".days-text"),
            amount_raised: None,
            target_amount: None,
            raised_of_target: Some(".raised-text"),
            category_links: Some(".tcb-post-categories a, .tcb-post-tags a"),
        },
        detail: DetailSelectors {
            date_range: Some(".tve_shortcode_rendered p"),
            started_on: None,
            donors: Some(".single-page-progressbar .percentage-backers span"),
            percentage: Some(".single-page-progressbar .percentage-text"),
            days_left: Some(".single-page-progressbar .days-text"),
            raised_of_target: Some(".single-page-progressbar .raised-text"),
        },
    }
}
