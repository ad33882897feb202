use std::time::Duration;

use chrono::NaiveDate;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use crate::fetch::{fetch_page, Fetcher, TimeoutPolicy};
use crate::parser::detail::parse_detail;
use crate::records::{CampaignDetail, UniqueCampaignRecord};
use crate::site::SiteProfile;

#[derive(Debug, Clone)]
pub struct EnrichOptions {
    pub policy: TimeoutPolicy,
    /// Pause between consecutive detail fetches.
    pub delay: Duration,
    pub today: NaiveDate,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EnrichStats {
    pub visited: usize,
    pub patched: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Visit each record's campaign page and patch in the detail fields found there.
///
/// Re-running over already enriched records is safe: fields the page yields
/// overwrite what is stored, fields it does not yield are left alone. Records
/// without a URL and records whose page cannot be fetched are not modified.
pub async fn enrich<F: Fetcher>(
    records: &mut [UniqueCampaignRecord],
    fetcher: &F,
    profile: &SiteProfile,
    opts: &EnrichOptions,
) -> EnrichStats {
    let mut stats = EnrichStats::default();
    let pb = progress_bar(records.len());
    let mut fetched_any = false;

    for record in records.iter_mut() {
        pb.inc(1);
        let Some(url) = record.url.as_known().map(str::to_string) else {
            info!("Skipping campaign with unknown URL: {}", record.title);
            stats.skipped += 1;
            continue;
        };

        if fetched_any && !opts.delay.is_zero() {
            tokio::time::sleep(opts.delay).await;
        }
        fetched_any = true;
        stats.visited += 1;

        let html = match fetch_page(fetcher, &url, &opts.policy).await {
            Ok(html) => html,
            Err(e) => {
                warn!("{}; keeping previous values for {}", e, record.title);
                stats.failed += 1;
                continue;
            }
        };

        let detail = parse_detail(&html, profile);
        if detail.is_empty() {
            debug!("No detail fields found at {}", url);
        } else {
            stats.patched += 1;
        }
        apply_detail(record, &detail, opts.today);
    }

    pb.finish_and_clear();
    stats
}

/// Last-write-wins for every field the detail page produced.
pub fn apply_detail(record: &mut UniqueCampaignRecord, detail: &CampaignDetail, today: NaiveDate) {
    overwrite(&mut record.start_date, detail.start_date);
    overwrite(&mut record.end_date, detail.end_date);
    overwrite(&mut record.number_of_donors, detail.number_of_donors);
    overwrite(&mut record.percentage_completion, detail.percentage_completion);
    overwrite(&mut record.days_left, detail.days_left);

    if detail.amount_raised.is_some() || detail.target_amount.is_some() {
        overwrite(&mut record.amount_raised, detail.amount_raised);
        overwrite(&mut record.target_amount, detail.target_amount);
        record.refresh_completion();
    }

    if let Some(start) = record.start_date {
        record.days_active = Some((today - start).num_days());
    }
}

fn overwrite<T>(slot: &mut Option<T>, fresh: Option<T>) {
    if fresh.is_some() {
        *slot = fresh;
    }
}

fn progress_bar(len: usize) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}
