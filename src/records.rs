use std::fmt;

use chrono::NaiveDate;

/// Text written in place of a URL that could not be resolved.
pub const UNKNOWN: &str = "Unknown";

/// Separator used for multi-valued columns (categories, source labels).
pub const LIST_SEP: &str = ", ";

/// Identity of a campaign. `Absent` records are never merged with each other.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CampaignUrl {
    Known(String),
    Absent,
}

impl CampaignUrl {
    /// Parse a persisted URL cell. Empty and sentinel values map to `Absent`.
    pub fn from_cell(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() || raw == UNKNOWN || raw.eq_ignore_ascii_case("nan") {
            CampaignUrl::Absent
        } else {
            CampaignUrl::Known(raw.to_string())
        }
    }

    pub fn as_known(&self) -> Option<&str> {
        match self {
            CampaignUrl::Known(u) => Some(u),
            CampaignUrl::Absent => None,
        }
    }
}

impl fmt::Display for CampaignUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CampaignUrl::Known(u) => f.write_str(u),
            CampaignUrl::Absent => f.write_str(UNKNOWN),
        }
    }
}

/// One sighting of a campaign on one listing page.
#[derive(Debug, Clone, PartialEq)]
pub struct RawCampaignRecord {
    pub title: String,
    pub url: CampaignUrl,
    pub days_to_go: Option<i64>,
    pub amount_raised: Option<f64>,
    pub target_amount: Option<f64>,
    pub category_tags: Vec<String>,
    pub source_label: String,
}

impl RawCampaignRecord {
    pub fn completion_percentage(&self) -> Option<f64> {
        completion_percentage(self.amount_raised, self.target_amount)
    }
}

/// Fields only available on a campaign's own page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CampaignDetail {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub number_of_donors: Option<i64>,
    pub percentage_completion: Option<f64>,
    pub days_left: Option<i64>,
    pub amount_raised: Option<f64>,
    pub target_amount: Option<f64>,
}

impl CampaignDetail {
    pub fn is_empty(&self) -> bool {
        *self == CampaignDetail::default()
    }
}

/// One campaign after reconciliation, optionally enriched with detail fields.
#[derive(Debug, Clone, PartialEq)]
pub struct UniqueCampaignRecord {
    pub title: String,
    pub url: CampaignUrl,
    pub days_to_go: Option<i64>,
    pub amount_raised: Option<f64>,
    pub target_amount: Option<f64>,
    pub category_tags: Vec<String>,
    pub source_labels: Vec<String>,
    pub sighting_count: usize,
    pub completion_percentage: Option<f64>,

    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub number_of_donors: Option<i64>,
    pub percentage_completion: Option<f64>,
    pub days_left: Option<i64>,
    pub days_active: Option<i64>,
}

impl UniqueCampaignRecord {
    /// Start a group from its first sighting.
    pub fn from_sighting(raw: &RawCampaignRecord) -> Self {
        UniqueCampaignRecord {
            title: raw.title.clone(),
            url: raw.url.clone(),
            days_to_go: raw.days_to_go,
            amount_raised: raw.amount_raised,
            target_amount: raw.target_amount,
            category_tags: raw.category_tags.clone(),
            source_labels: vec![raw.source_label.clone()],
            sighting_count: 1,
            completion_percentage: None,
            start_date: None,
            end_date: None,
            number_of_donors: None,
            percentage_completion: None,
            days_left: None,
            days_active: None,
        }
    }

    /// Fold a later sighting in. Scalars stay first-seen.
    pub fn absorb(&mut self, raw: &RawCampaignRecord) {
        self.sighting_count += 1;
        if !self.source_labels.contains(&raw.source_label) {
            self.source_labels.push(raw.source_label.clone());
        }
    }

    pub fn refresh_completion(&mut self) {
        self.completion_percentage = completion_percentage(self.amount_raised, self.target_amount);
    }

    /// Completion as reported by the campaign page when known, else derived.
    pub fn effective_completion(&self) -> Option<f64> {
        self.percentage_completion.or(self.completion_percentage)
    }
}

/// `raised / target * 100` rounded to 2 places; absent unless target > 0.
pub fn completion_percentage(raised: Option<f64>, target: Option<f64>) -> Option<f64> {
    match (raised, target) {
        (Some(r), Some(t)) if t > 0.0 && r.is_finite() && t.is_finite() => Some(round2(r / t * 100.0)),
        _ => None,
    }
}

pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
