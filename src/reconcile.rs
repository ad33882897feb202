use std::collections::HashMap;

use crate::records::{CampaignUrl, RawCampaignRecord, UniqueCampaignRecord};

/// Merge sightings by URL.
///
/// The first sighting of a URL supplies the scalar fields; later sightings only
/// add their source label and bump the count. Records without a URL each stay
/// their own group. Output is ordered by sighting count, most first, with ties
/// kept in first-seen order.
pub fn reconcile(raw: &[RawCampaignRecord]) -> Vec<UniqueCampaignRecord> {
    let mut unique: Vec<UniqueCampaignRecord> = Vec::new();
    let mut by_url: HashMap<&str, usize> = HashMap::new();

    for record in raw {
        match &record.url {
            CampaignUrl::Known(url) => match by_url.get(url.as_str()) {
                Some(&idx) => unique[idx].absorb(record),
                None => {
                    by_url.insert(url, unique.len());
                    unique.push(UniqueCampaignRecord::from_sighting(record));
                }
            },
            CampaignUrl::Absent => unique.push(UniqueCampaignRecord::from_sighting(record)),
        }
    }

    for record in &mut unique {
        record.refresh_completion();
    }
    // stable: ties keep first-seen order
    unique.sort_by(|a, b| b.sighting_count.cmp(&a.sighting_count));
    unique
}
