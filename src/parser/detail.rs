use chrono::NaiveDate;
use scraper::Html;

use super::text::{parse_date_range, parse_days, parse_donors, parse_percentage, parse_raised_of_target, parse_started_on};
use super::{probe_text, select_all, text_of};
use crate::records::CampaignDetail;
use crate::site::{DetailSelectors, SiteProfile};

type DateSpan = (Option<NaiveDate>, Option<NaiveDate>);
type DateStrategy = fn(&Html, &DetailSelectors) -> Option<DateSpan>;

const DATE_STRATEGIES: &[DateStrategy] = &[date_range, started_on];

/// Every field is probed on its own; a missing node only blanks that field.
pub fn extract_detail(doc: &Html, profile: &SiteProfile) -> CampaignDetail {
    let sel = &profile.detail;
    let root = doc.root_element();

    let (start_date, end_date) = DATE_STRATEGIES
        .iter()
        .find_map(|strategy| strategy(doc, sel))
        .unwrap_or((None, None));

    let number_of_donors = probe_text(root, sel.donors).and_then(|t| parse_donors(&t));
    let percentage_completion = probe_text(root, sel.percentage).and_then(|t| parse_percentage(&t));
    let days_left = probe_text(root, sel.days_left).and_then(|t| parse_days(&t));
    let amounts = probe_text(root, sel.raised_of_target).and_then(|t| parse_raised_of_target(&t));

    CampaignDetail {
        start_date,
        end_date,
        number_of_donors,
        percentage_completion,
        days_left,
        amount_raised: amounts.map(|(raised, _)| raised),
        target_amount: amounts.map(|(_, target)| target),
    }
}

pub fn parse_detail(html: &str, profile: &SiteProfile) -> CampaignDetail {
    let doc = Html::parse_document(html);
    extract_detail(&doc, profile)
}

/// First matching node whose text holds a "D Month YYYY – D Month YYYY" range.
fn date_range(doc: &Html, sel: &DetailSelectors) -> Option<DateSpan> {
    let css = sel.date_range?;
    select_all(doc.root_element(), css)
        .into_iter()
        .find_map(|el| parse_date_range(&text_of(el)))
        .filter(|(start, end)| start.is_some() || end.is_some())
}

/// "Started on DD/MM/YYYY"; no end date on these pages.
fn started_on(doc: &Html, sel: &DetailSelectors) -> Option<DateSpan> {
    let text = probe_text(doc.root_element(), sel.started_on)?;
    parse_started_on(&text).map(|start| (Some(start), None))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::site::SiteKind;

    fn fixture(name: &str) -> String {
        std::fs::read_to_string(format!("tests/fixtures/{}.html", name)).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    #[test]
    fn ray_of_hope_detail() {
        let profile = SiteProfile::for_kind(SiteKind::RayOfHope);
        let d = parse_detail(&fixture("roh_detail"), &profile);
        assert_eq!(d.start_date, date(2024, 3, 5));
        assert_eq!(d.end_date, None);
        assert_eq!(d.number_of_donors, Some(15));
        assert_eq!(d.percentage_completion, None);
        assert_eq!(d.days_left, None);
    }

    #[test]
    fn g2c_detail() {
        let profile = SiteProfile::for_kind(SiteKind::G2c);
        let d = parse_detail(&fixture("g2c_detail"), &profile);
        assert_eq!(d.start_date, date(2024, 3, 1));
        assert_eq!(d.end_date, date(2024, 4, 30));
        assert_eq!(d.percentage_completion, Some(24.0));
        assert_eq!(d.number_of_donors, Some(37));
        assert_eq!(d.amount_raised, Some(1200.0));
        assert_eq!(d.target_amount, Some(5000.0));
        assert_eq!(d.days_left, Some(5));
    }

    #[test]
    fn missing_nodes_do_not_block_other_fields() {
        let profile = SiteProfile::for_kind(SiteKind::G2c);
        let html = r#"
            <div class="single-page-progressbar">
              <span class="days-text">Campaign has ended</span>
            </div>
        "#;
        let d = parse_detail(html, &profile);
        assert_eq!(d.days_left, Some(0));
        assert_eq!(d.start_date, None);
        assert_eq!(d.number_of_donors, None);
        assert_eq!(d.percentage_completion, None);
    }

    #[test]
    fn empty_page_yields_empty_patch() {
        let profile = SiteProfile::for_kind(SiteKind::RayOfHope);
        assert!(parse_detail("<html><body></body></html>", &profile).is_empty());
    }
}
