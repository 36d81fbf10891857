//! Field merging and confidence scoring.
//!
//! Folds harvested records and cable lists into [`MandateData`], then
//! derives the missing-field lists and the confidence tier.

use fiber_mandate_extract_models::{
    CableRecord, ExtractionResult, FIBER_SLOTS, FieldName, MandateData,
};

use crate::patterns::{ScalarFields, collapse_whitespace};
use crate::rules::ScoringRules;

/// Whitespace-normalizes cable names and removes duplicates, keeping the
/// first occurrence. Empty names are dropped.
#[must_use]
pub fn dedup_cables<I, S>(cables: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut unique: Vec<String> = Vec::new();
    for cable in cables {
        let cable = collapse_whitespace(cable.as_ref());
        if !cable.is_empty() && !unique.contains(&cable) {
            unique.push(cable);
        }
    }
    unique
}

/// The first non-null value per fiber slot, scanning records in order.
#[must_use]
pub fn first_fibers(records: &[CableRecord]) -> [Option<String>; FIBER_SLOTS] {
    std::array::from_fn(|i| {
        records
            .iter()
            .find_map(|record| record.fiber(i + 1))
            .map(str::to_owned)
    })
}

/// Assembles the extracted values of one page.
#[must_use]
pub fn compose(
    scalars: ScalarFields,
    cables: Vec<String>,
    records: Vec<CableRecord>,
    separator: &str,
) -> MandateData {
    let cables = dedup_cables(cables);
    let cable = if cables.is_empty() {
        None
    } else {
        Some(cables.join(separator))
    };
    let [fiber_1, fiber_2, fiber_3, fiber_4] = first_fibers(&records);

    MandateData {
        mandate_number: scalars.mandate_number,
        socket_label: scalars.socket_label,
        cable,
        cables,
        cables_by_record: records,
        fiber_1,
        fiber_2,
        fiber_3,
        fiber_4,
        phone: scalars.phone,
        email: scalars.email,
        client_name: scalars.client_name,
        mandate_number_alternative: None,
        socket_label_alternative: None,
    }
}

/// Applies a rule set's required fields and confidence tiers.
#[derive(Debug, Clone)]
pub struct Scorer {
    rules: ScoringRules,
    slot_count: usize,
}

impl Scorer {
    /// Creates a scorer tracking the first `slot_count` fiber slots.
    #[must_use]
    pub fn new(rules: ScoringRules, slot_count: usize) -> Self {
        Self {
            rules,
            slot_count: slot_count.min(FIBER_SLOTS),
        }
    }

    /// Builds a scored result from extracted data.
    #[must_use]
    pub fn score(&self, data: MandateData, file_name: Option<String>) -> ExtractionResult {
        let mut result = ExtractionResult {
            file_name,
            success: false,
            confidence: 0.0,
            needs_review: true,
            missing_fields: Vec::new(),
            missing_fibers: Vec::new(),
            enriched_fields: Vec::new(),
            data,
            error: None,
        };
        self.rescore(&mut result);
        result
    }

    /// Recomputes the missing lists, confidence, and flags of `result`
    /// from its current data.
    pub fn rescore(&self, result: &mut ExtractionResult) {
        let present = |field: FieldName| result.data.get(field).is_some_and(|v| !v.trim().is_empty());

        let missing_fields: Vec<FieldName> = self
            .rules
            .required
            .iter()
            .copied()
            .filter(|&field| !present(field))
            .collect();
        let missing_fibers: Vec<FieldName> = FieldName::FIBERS[..self.slot_count]
            .iter()
            .copied()
            .filter(|&field| !present(field))
            .collect();

        let confidence = if result.error.is_some() {
            0.0
        } else if !missing_fields.is_empty() {
            self.rules.missing_required_confidence
        } else if !missing_fibers.is_empty() {
            self.rules.missing_fiber_confidence
        } else {
            1.0
        };

        result.success = result.error.is_none() && missing_fields.is_empty();
        result.needs_review = confidence < 1.0;
        result.confidence = confidence;
        result.missing_fields = missing_fields;
        result.missing_fibers = missing_fibers;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::RuleSet;

    fn scorer() -> Scorer {
        let rules = RuleSet::strict();
        Scorer::new(rules.scoring.clone(), rules.slot_count())
    }

    fn complete_data() -> MandateData {
        MandateData {
            mandate_number: Some("24875848".to_owned()),
            socket_label: Some("B.112.603.634.X".to_owned()),
            cable: Some("CABLE-A".to_owned()),
            cables: vec!["CABLE-A".to_owned()],
            fiber_1: Some("1".to_owned()),
            fiber_2: Some("2".to_owned()),
            fiber_3: Some("3".to_owned()),
            fiber_4: Some("4".to_owned()),
            ..MandateData::default()
        }
    }

    #[test]
    fn dedup_keeps_first_occurrence_and_is_idempotent() {
        let cables = vec!["B", "A", "B ", "A\n", "C", ""];
        let once = dedup_cables(&cables);
        assert_eq!(once, vec!["B", "A", "C"]);
        assert_eq!(dedup_cables(&once), once);
        assert!(once.iter().all(|c| cables.iter().any(|orig| orig.trim() == c)));
    }

    #[test]
    fn dedup_is_case_sensitive() {
        assert_eq!(dedup_cables(["abc", "ABC"]).len(), 2);
    }

    #[test]
    fn first_fiber_per_slot_wins() {
        let records = vec![
            CableRecord {
                cable: Some("A".to_owned()),
                fiber_1: Some("1".to_owned()),
                ..CableRecord::default()
            },
            CableRecord {
                fiber_1: Some("9".to_owned()),
                fiber_3: Some("3".to_owned()),
                ..CableRecord::default()
            },
        ];
        let [f1, f2, f3, f4] = first_fibers(&records);
        assert_eq!(f1.as_deref(), Some("1"));
        assert_eq!(f2, None);
        assert_eq!(f3.as_deref(), Some("3"));
        assert_eq!(f4, None);
    }

    #[test]
    fn compose_joins_cables() {
        let data = compose(
            ScalarFields::default(),
            vec!["A".to_owned(), "B".to_owned(), "A".to_owned()],
            Vec::new(),
            " / ",
        );
        assert_eq!(data.cable.as_deref(), Some("A / B"));
        assert_eq!(data.cables, vec!["A", "B"]);

        let empty = compose(ScalarFields::default(), Vec::new(), Vec::new(), " / ");
        assert_eq!(empty.cable, None);
    }

    #[test]
    fn complete_result_has_full_confidence() {
        let result = scorer().score(complete_data(), None);
        assert!(result.success);
        assert!(!result.needs_review);
        assert!((result.confidence - 1.0).abs() < f64::EPSILON);
        assert!(result.missing_fields.is_empty());
        assert!(result.missing_fibers.is_empty());
    }

    #[test]
    fn missing_fiber_lowers_confidence_but_succeeds() {
        let mut data = complete_data();
        data.fiber_4 = None;
        let result = scorer().score(data, None);
        assert!(result.success);
        assert!(result.needs_review);
        assert!((result.confidence - 0.7).abs() < f64::EPSILON);
        assert_eq!(result.missing_fibers, vec![FieldName::Fiber4]);
    }

    #[test]
    fn missing_required_field_is_strictly_worse() {
        let full = scorer().score(complete_data(), None);
        let mut data = complete_data();
        data.socket_label = Some("  ".to_owned());
        let result = scorer().score(data, None);
        assert!(!result.success);
        assert_eq!(result.missing_fields, vec![FieldName::SocketLabel]);
        assert!((result.confidence - 0.3).abs() < f64::EPSILON);
        assert!(result.confidence < full.confidence);
    }

    #[test]
    fn missing_fields_follow_rule_order() {
        let result = scorer().score(MandateData::default(), Some("x.pdf".to_owned()));
        assert_eq!(
            result.missing_fields,
            vec![
                FieldName::MandateNumber,
                FieldName::SocketLabel,
                FieldName::Cable
            ]
        );
        assert_eq!(result.missing_fibers.len(), 4);
        assert_eq!(result.file_name.as_deref(), Some("x.pdf"));
    }

    #[test]
    fn error_forces_zero_confidence() {
        let mut result = scorer().score(complete_data(), None);
        result.error = Some("boom".to_owned());
        scorer().rescore(&mut result);
        assert!(!result.success);
        assert!(result.needs_review);
        assert!(result.confidence.abs() < f64::EPSILON);
    }

    #[test]
    fn only_configured_slots_are_tracked() {
        let rules = RuleSet::strict();
        let scorer = Scorer::new(rules.scoring, 2);
        let mut data = complete_data();
        data.fiber_3 = None;
        data.fiber_4 = None;
        let result = scorer.score(data, None);
        assert!(result.missing_fibers.is_empty());
        assert!(!result.needs_review);
    }
}
