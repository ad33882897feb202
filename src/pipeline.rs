use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::{error, info};

use crate::config::Settings;
use crate::enrich::{enrich, EnrichOptions};
use crate::error::PersistenceError;
use crate::fetch::{Fetcher, HttpFetcher};
use crate::pagination::collect_listings;
use crate::reconcile::reconcile;
use crate::records::UniqueCampaignRecord;
use crate::sheets::{all_table, detailed_table, records_from_table, unique_table};
use crate::site::SiteProfile;
use crate::summary::Summary;
use crate::table::{read_table, table_stem, write_table, Table};

const ALL: &str = "campaigns_all";
const UNIQUE: &str = "campaigns_unique";
const DETAILED: &str = "campaigns_detailed";
const SUMMARY_STATS: &str = "summary_stats";
const CATEGORY_STATS: &str = "category_stats";

fn http_fetcher(settings: &Settings) -> Result<HttpFetcher> {
    HttpFetcher::new(settings.max_attempts, Duration::from_millis(settings.backoff_ms))
        .context("Failed to build HTTP client")
}

/// Crawl every listing source, reconcile, and write the all/unique tables.
pub async fn scrape(settings: &Settings) -> Result<()> {
    let fetcher = http_fetcher(settings)?;
    scrape_with(settings, &fetcher).await;
    Ok(())
}

async fn scrape_with<F: Fetcher>(settings: &Settings, fetcher: &F) -> Vec<UniqueCampaignRecord> {
    let profile = settings.profile();
    println!("Starting to scrape {} campaigns ({:?})...", profile.name, profile.kind);

    let (raw, outcomes) = collect_listings(fetcher, &profile, &settings.timeout_policy()).await;
    for o in &outcomes {
        info!("{}: {} pages, {} records, stopped on {:?}", o.label, o.pages, o.records, o.stop);
    }
    save(&all_table(&raw), &settings.output_stem(&profile, ALL), settings.csv_copy, "All campaign data");

    let unique = reconcile(&raw);
    save(
        &unique_table(&unique),
        &settings.output_stem(&profile, UNIQUE),
        settings.csv_copy,
        "Unique data",
    );
    println!("Total unique campaigns: {}", unique.len());
    Summary::compute(&unique).print();
    unique
}

/// Load a unique (or detailed) table, enrich it, and write the detailed table.
pub async fn enrich_table(settings: &Settings, input: Option<&Path>, summary: bool) -> Result<()> {
    let profile = settings.profile();
    let stem = input
        .map(table_stem)
        .unwrap_or_else(|| settings.output_stem(&profile, UNIQUE));
    let records = load_records(&stem)?;
    let fetcher = http_fetcher(settings)?;
    enrich_and_save(settings, &fetcher, &profile, records, summary).await;
    Ok(())
}

/// Scrape then enrich in one pass over a single HTTP session, without reading the unique table back.
pub async fn run(settings: &Settings, summary: bool) -> Result<()> {
    let fetcher = http_fetcher(settings)?;
    run_with(settings, &fetcher, summary).await;
    Ok(())
}

async fn run_with<F: Fetcher>(settings: &Settings, fetcher: &F, summary: bool) {
    let t_scrape = Instant::now();
    let unique = scrape_with(settings, fetcher).await;
    println!("Scraped listings in {:.1}s", t_scrape.elapsed().as_secs_f64());

    let profile = settings.profile();
    enrich_and_save(settings, fetcher, &profile, unique, summary).await;
}

/// Print the summary of an existing table. Defaults to the detailed table, then the unique one.
pub fn report(settings: &Settings, input: Option<&Path>, json: bool) -> Result<()> {
    let profile = settings.profile();
    let records = match input {
        Some(path) => load_records(&table_stem(path))?,
        None => match load_records(&settings.output_stem(&profile, DETAILED)) {
            Ok(records) => records,
            Err(e) if is_not_found(&e) => load_records(&settings.output_stem(&profile, UNIQUE))?,
            Err(e) => return Err(e),
        },
    };

    let summary = Summary::compute(&records);
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        summary.print();
    }
    Ok(())
}

async fn enrich_and_save<F: Fetcher>(
    settings: &Settings,
    fetcher: &F,
    profile: &SiteProfile,
    mut records: Vec<UniqueCampaignRecord>,
    summary: bool,
) {
    let opts = EnrichOptions {
        policy: settings.timeout_policy(),
        delay: profile.detail_delay,
        today: settings.today(),
    };

    println!("Scraping additional details for {} campaigns...", records.len());
    let stats = enrich(&mut records, fetcher, profile, &opts).await;
    println!(
        "Done: {} visited ({} with details, {} failed), {} skipped without URL.",
        stats.visited, stats.patched, stats.failed, stats.skipped
    );

    save(
        &detailed_table(&records),
        &settings.output_stem(profile, DETAILED),
        settings.csv_copy,
        "Detailed data",
    );

    let stats = Summary::compute(&records);
    if summary {
        save(
            &stats.metrics_table(),
            &settings.output_stem(profile, SUMMARY_STATS),
            settings.csv_copy,
            "Summary statistics",
        );
        save(
            &stats.category_table(),
            &settings.output_stem(profile, CATEGORY_STATS),
            settings.csv_copy,
            "Category statistics",
        );
    }
    stats.print();
}

fn load_records(stem: &Path) -> Result<Vec<UniqueCampaignRecord>> {
    let (table, path) = read_table(stem)?;
    let records = records_from_table(&table, &path)?;
    println!("Loaded {} campaigns from {:?}", records.len(), path);
    Ok(records)
}

fn is_not_found(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<PersistenceError>(),
        Some(PersistenceError::NotFound { .. })
    )
}

/// Output failures are reported but never end the run.
fn save(table: &Table, stem: &Path, csv_copy: bool, what: &str) {
    match write_table(table, stem, csv_copy) {
        Ok(written) if written.csv_fallback => {
            println!("{} saved as CSV instead: {:?}", what, written.primary)
        }
        Ok(written) => println!("{} saved to {:?} ({} rows)", what, written.primary, table.len()),
        Err(e) => error!("Failed to save {}: {}", what.to_lowercase(), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pagination::tests::StubFetcher;
    use crate::records::CampaignUrl;
    use crate::site::SiteKind;

    fn settings(dir: &Path) -> Settings {
        Settings {
            output_dir: dir.to_path_buf(),
            ..Settings::default()
        }
    }

    fn record(title: &str, url: CampaignUrl) -> UniqueCampaignRecord {
        UniqueCampaignRecord {
            title: title.into(),
            url,
            days_to_go: Some(3),
            amount_raised: Some(40.0),
            target_amount: Some(80.0),
            category_tags: Vec::new(),
            source_labels: vec!["seniors".into()],
            sighting_count: 1,
            completion_percentage: Some(50.0),
            start_date: None,
            end_date: None,
            number_of_donors: None,
            percentage_completion: None,
            days_left: None,
            days_active: None,
        }
    }

    #[test]
    fn report_falls_back_to_unique_table() {
        let dir = tempfile::tempdir().unwrap();
        let s = settings(dir.path());
        let profile = s.profile();
        let records = vec![record("A", CampaignUrl::Known("https://x.org/a".into()))];
        write_table(&unique_table(&records), &s.output_stem(&profile, UNIQUE), false).unwrap();

        report(&s, None, true).unwrap();
        let loaded = load_records(&s.output_stem(&profile, UNIQUE)).unwrap();
        assert_eq!(loaded, records);
    }

    #[test]
    fn missing_input_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let s = settings(dir.path());
        let err = report(&s, None, false).unwrap_err();
        assert!(is_not_found(&err));
    }

    #[tokio::test]
    async fn run_shares_one_fetcher_across_phases() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = settings(dir.path());
        s.site = SiteKind::G2c;
        s.max_pages = Some(1);
        s.page_delay_ms = Some(0);
        s.detail_delay_ms = Some(0);
        s.csv_copy = false;

        let listing = std::fs::read_to_string("tests/fixtures/g2c_listing.html").unwrap();
        let detail = std::fs::read_to_string("tests/fixtures/g2c_detail.html").unwrap();
        let fetcher = StubFetcher::new(&[
            ("https://www.childrensociety.org.sg/g2c/campaigns/", listing.as_str()),
            (
                "https://www.childrensociety.org.sg/g2c/campaigns/gift-of-reading/",
                detail.as_str(),
            ),
        ]);

        run_with(&s, &fetcher, false).await;

        let calls = fetcher.calls();
        assert_eq!(calls[0], "https://www.childrensociety.org.sg/g2c/campaigns/");
        assert_eq!(calls.len(), 5);
        assert!(calls[1..].iter().all(|u| u.contains("/g2c/campaigns/") && u.len() > calls[0].len()));

        let profile = s.profile();
        let detailed = load_records(&s.output_stem(&profile, DETAILED)).unwrap();
        let gift = detailed.iter().find(|r| r.title == "Gift of Reading").unwrap();
        assert_eq!(gift.number_of_donors, Some(37));
    }

    #[tokio::test]
    async fn enrich_rejects_table_without_required_columns() {
        let dir = tempfile::tempdir().unwrap();
        let s = settings(dir.path());
        let stem = dir.path().join("broken");
        write_table(&Table::new(&["Title", "URL"]), &stem, false).unwrap();

        let err = enrich_table(&s, Some(&stem), false).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PersistenceError>(),
            Some(PersistenceError::MissingColumn { .. })
        ));
    }
}
