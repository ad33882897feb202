use std::collections::BTreeMap;

use serde::Serialize;

use crate::records::{round2, UniqueCampaignRecord};
use crate::table::{Cell, Table};

/// Half-open completion ranges; the last one is unbounded.
const BUCKETS: &[(f64, f64, &str)] = &[
    (0.0, 25.0, "Less than 25%"),
    (25.0, 50.0, "25% to 50%"),
    (50.0, 75.0, "50% to 75%"),
    (75.0, 100.0, "75% to 100%"),
    (100.0, f64::INFINITY, "Over 100%"),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bucket {
    pub label: &'static str,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryStats {
    pub category: String,
    pub raised_sum: f64,
    pub raised_mean: Option<f64>,
    pub raised_count: usize,
    pub target_sum: f64,
    pub target_mean: Option<f64>,
    pub completion_mean: Option<f64>,
    pub donors_sum: f64,
    pub donors_mean: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total_campaigns: usize,
    pub total_raised: f64,
    pub total_target: f64,
    pub overall_completion: Option<f64>,
    pub avg_donors: Option<f64>,
    pub avg_days_active: Option<f64>,
    pub avg_days_to_go: Option<f64>,
    pub avg_raised: Option<f64>,
    pub avg_target: Option<f64>,
    pub avg_completion: Option<f64>,
    pub completion_histogram: Vec<Bucket>,
    pub categories: Vec<CategoryStats>,
}

impl Summary {
    pub fn compute(records: &[UniqueCampaignRecord]) -> Self {
        let total_raised = sum(records.iter().map(|r| r.amount_raised));
        let total_target = sum(records.iter().map(|r| r.target_amount));
        let overall_completion = (total_target > 0.0).then(|| round2(total_raised / total_target * 100.0));

        Summary {
            total_campaigns: records.len(),
            total_raised,
            total_target,
            overall_completion,
            avg_donors: mean(records.iter().map(|r| r.number_of_donors.map(|n| n as f64))),
            avg_days_active: mean(records.iter().map(|r| r.days_active.map(|n| n as f64))),
            avg_days_to_go: mean(records.iter().map(|r| r.days_to_go.map(|n| n as f64))),
            avg_raised: mean(records.iter().map(|r| r.amount_raised)),
            avg_target: mean(records.iter().map(|r| r.target_amount)),
            avg_completion: mean(records.iter().map(|r| r.completion_percentage)),
            completion_histogram: histogram(records),
            categories: category_stats(records),
        }
    }

    /// `Metric` / `Value` rows; absent averages are left blank.
    pub fn metrics_table(&self) -> Table {
        let rows: [(&str, Option<f64>); 10] = [
            ("Total Campaigns", Some(self.total_campaigns as f64)),
            ("Total Amount Raised", Some(self.total_raised)),
            ("Total Target Amount", Some(self.total_target)),
            ("Overall Completion Percentage", self.overall_completion),
            ("Average Donors per Campaign", self.avg_donors),
            ("Average Days Active", self.avg_days_active),
            ("Average Days to Go", self.avg_days_to_go),
            ("Average Amount Raised", self.avg_raised),
            ("Average Target Amount", self.avg_target),
            ("Average Completion Percentage", self.avg_completion),
        ];
        let mut table = Table::new(&["Metric", "Value"]);
        for (metric, value) in rows {
            table.push(vec![Cell::text(metric), Cell::opt_number(value)]);
        }
        table
    }

    pub fn category_table(&self) -> Table {
        let mut table = Table::new(&[
            "Source Category",
            "Amount Raised Sum",
            "Amount Raised Mean",
            "Amount Raised Count",
            "Target Amount Sum",
            "Target Amount Mean",
            "Completion Percentage Mean",
            "Number of Donors Sum",
            "Number of Donors Mean",
        ]);
        for c in &self.categories {
            table.push(vec![
                Cell::text(c.category.as_str()),
                Cell::Number(c.raised_sum),
                Cell::opt_number(c.raised_mean),
                Cell::Int(c.raised_count as i64),
                Cell::Number(c.target_sum),
                Cell::opt_number(c.target_mean),
                Cell::opt_number(c.completion_mean),
                Cell::Number(c.donors_sum),
                Cell::opt_number(c.donors_mean),
            ]);
        }
        table
    }

    pub fn print(&self) {
        println!("\nData Summary:");
        println!("- Number of campaigns: {}", self.total_campaigns);
        println!("- Total amount raised: ${}", format_money(self.total_raised));
        println!("- Campaigns by completion percentage:");
        for bucket in &self.completion_histogram {
            println!("  {}: {}", bucket.label, bucket.count);
        }
    }
}

/// Counts per completion range, preferring the campaign page's own percentage.
pub fn histogram(records: &[UniqueCampaignRecord]) -> Vec<Bucket> {
    BUCKETS
        .iter()
        .map(|&(lower, upper, label)| Bucket {
            label,
            count: records
                .iter()
                .filter_map(UniqueCampaignRecord::effective_completion)
                .filter(|pct| *pct >= lower && *pct < upper)
                .count(),
        })
        .collect()
}

/// One row per source label, a campaign counted under each label it carries.
pub fn category_stats(records: &[UniqueCampaignRecord]) -> Vec<CategoryStats> {
    let mut groups: BTreeMap<&str, Vec<&UniqueCampaignRecord>> = BTreeMap::new();
    for record in records {
        for label in &record.source_labels {
            groups.entry(label.as_str()).or_default().push(record);
        }
    }

    groups
        .into_iter()
        .map(|(category, members)| {
            let raised = || members.iter().map(|r| r.amount_raised);
            let target = || members.iter().map(|r| r.target_amount);
            let donors = || members.iter().map(|r| r.number_of_donors.map(|n| n as f64));
            CategoryStats {
                category: category.to_string(),
                raised_sum: sum(raised()),
                raised_mean: mean(raised()),
                raised_count: raised().flatten().count(),
                target_sum: sum(target()),
                target_mean: mean(target()),
                completion_mean: mean(members.iter().map(|r| r.completion_percentage)),
                donors_sum: sum(donors()),
                donors_mean: mean(donors()),
            }
        })
        .collect()
}

fn sum(values: impl Iterator<Item = Option<f64>>) -> f64 {
    values.flatten().sum()
}

fn mean(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
    let (total, n) = values.flatten().fold((0.0, 0usize), |(t, n), v| (t + v, n + 1));
    (n > 0).then(|| total / n as f64)
}

/// `1234567.5` -> `1,234,567.50`
pub fn format_money(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if value < 0.0 { "-" } else { "" };
    format!("{}{}.{}", sign, grouped, frac)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::CampaignUrl;

    fn record(labels: &[&str], raised: Option<f64>, target: Option<f64>, donors: Option<i64>) -> UniqueCampaignRecord {
        let mut r = UniqueCampaignRecord {
            title: "c".into(),
            url: CampaignUrl::Absent,
            days_to_go: None,
            amount_raised: raised,
            target_amount: target,
            category_tags: Vec::new(),
            source_labels: labels.iter().map(|l| l.to_string()).collect(),
            sighting_count: labels.len(),
            completion_percentage: None,
            start_date: None,
            end_date: None,
            number_of_donors: donors,
            percentage_completion: None,
            days_left: None,
            days_active: None,
        };
        r.refresh_completion();
        r
    }

    fn sample() -> Vec<UniqueCampaignRecord> {
        vec![
            record(&["seniors", "main_page"], Some(50.0), Some(200.0), Some(10)),
            record(&["seniors"], Some(150.0), Some(100.0), None),
            record(&["disability"], None, Some(300.0), Some(4)),
        ]
    }

    #[test]
    fn totals_and_averages_skip_absent() {
        let s = Summary::compute(&sample());
        assert_eq!(s.total_campaigns, 3);
        assert_eq!(s.total_raised, 200.0);
        assert_eq!(s.total_target, 600.0);
        assert_eq!(s.overall_completion, Some(33.33));
        assert_eq!(s.avg_raised, Some(100.0));
        assert_eq!(s.avg_donors, Some(7.0));
        assert_eq!(s.avg_completion, Some(87.5));
        assert_eq!(s.avg_days_active, None);
    }

    #[test]
    fn histogram_buckets() {
        let mut records = sample();
        records[2].percentage_completion = Some(75.0);
        let counts: Vec<usize> = histogram(&records).iter().map(|b| b.count).collect();
        // 25.0, 150.0, 75.0 (from the detail page)
        assert_eq!(counts, vec![0, 1, 0, 1, 1]);
    }

    #[test]
    fn categories_exploded_and_sorted() {
        let stats = category_stats(&sample());
        let names: Vec<&str> = stats.iter().map(|c| c.category.as_str()).collect();
        assert_eq!(names, vec!["disability", "main_page", "seniors"]);

        let seniors = &stats[2];
        assert_eq!(seniors.raised_sum, 200.0);
        assert_eq!(seniors.raised_count, 2);
        assert_eq!(seniors.raised_mean, Some(100.0));
        assert_eq!(seniors.donors_sum, 10.0);
        assert_eq!(seniors.donors_mean, Some(10.0));

        let disability = &stats[0];
        assert_eq!(disability.raised_count, 0);
        assert_eq!(disability.raised_mean, None);
        assert_eq!(disability.completion_mean, None);
    }

    #[test]
    fn empty_input() {
        let s = Summary::compute(&[]);
        assert_eq!(s.total_campaigns, 0);
        assert_eq!(s.overall_completion, None);
        assert!(s.categories.is_empty());
        assert_eq!(s.metrics_table().len(), 10);
    }

    #[test]
    fn metric_rows_in_order() {
        let table = Summary::compute(&sample()).metrics_table();
        assert_eq!(table.headers, vec!["Metric", "Value"]);
        assert_eq!(table.rows[0], vec![Cell::text("Total Campaigns"), Cell::Number(3.0)]);
        assert_eq!(table.rows[5][1], Cell::Empty);
    }

    #[test]
    fn money() {
        assert_eq!(format_money(1234567.5), "1,234,567.50");
        assert_eq!(format_money(999.0), "999.00");
        assert_eq!(format_money(0.0), "0.00");
    }
}
