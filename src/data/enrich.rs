//! Enrichment join: attach conservation status and diet to detections.

use crate::constants::{diet, status};
use crate::data::{DietMap, Detection, SpeciesMeta};
use std::collections::HashMap;
use tracing::debug;

/// Attach status and diet to every detection, keyed by scientific name.
///
/// Both fields are overwritten on every call, so applying the join twice
/// with the same metadata leaves the rows unchanged. Unknown species get the
/// review and unclassified sentinels.
pub fn enrich(detections: &mut [Detection], meta: &[SpeciesMeta], diets: &DietMap) {
    let mut statuses: HashMap<&str, &str> = HashMap::with_capacity(meta.len());
    for m in meta {
        statuses
            .entry(m.scientific_name.as_str())
            .or_insert(m.status.as_str());
    }

    let mut unknown = 0usize;
    for detection in detections.iter_mut() {
        let name = detection.scientific_name.as_str();
        detection.status = match statuses.get(name) {
            Some(s) => (*s).to_string(),
            None => {
                unknown += 1;
                status::REVIEW.to_string()
            }
        };
        detection.diet = diets
            .get(name)
            .map_or_else(|| diet::UNCLASSIFIED.to_string(), Clone::clone);
    }

    debug!(
        "Enriched {} detections ({} without reference status)",
        detections.len(),
        unknown
    );
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn meta(sci: &str, status: &str) -> SpeciesMeta {
        SpeciesMeta {
            scientific_name: sci.to_string(),
            common_name: sci.to_string(),
            status: status.to_string(),
        }
    }

    fn rows() -> Vec<Detection> {
        vec![
            Detection::new("Erithacus rubecula", "Robin", 0.9, "2024-05-01", "06:00"),
            Detection::new("Turdus merula", "Blackbird", 0.8, "2024-05-01", "06:10"),
            Detection::new("Erithacus rubecula", "Robin", 0.7, "2024-05-02", "07:00"),
        ]
    }

    #[test]
    fn test_enrich_attaches_status_and_diet() {
        let mut detections = rows();
        let meta = vec![meta("Erithacus rubecula", "Resident")];
        let mut diets = DietMap::new();
        diets.insert("Turdus merula".to_string(), "Omnivore".to_string());

        enrich(&mut detections, &meta, &diets);

        assert_eq!(detections[0].status, "Resident");
        assert_eq!(detections[0].diet, diet::UNCLASSIFIED);
        assert_eq!(detections[1].status, status::REVIEW);
        assert_eq!(detections[1].diet, "Omnivore");
        assert_eq!(detections.len(), 3);
    }

    #[test]
    fn test_enrich_is_idempotent() {
        let meta = vec![
            meta("Erithacus rubecula", "Resident"),
            meta("Turdus merula", "Resident"),
        ];
        let diets = DietMap::new();

        let mut once = rows();
        enrich(&mut once, &meta, &diets);
        let mut twice = once.clone();
        enrich(&mut twice, &meta, &diets);

        assert_eq!(once, twice);
    }

    #[test]
    fn test_enrich_duplicate_metadata_first_wins() {
        let mut detections = rows();
        let meta = vec![
            meta("Erithacus rubecula", "Resident"),
            meta("Erithacus rubecula", "Other"),
        ];
        enrich(&mut detections, &meta, &DietMap::new());
        assert_eq!(detections.len(), 3);
        assert_eq!(detections[2].status, "Resident");
    }
}
