//! Optional secondary-source enrichment.
//!
//! An [`Enricher`] is a best-effort external source (usually an LLM) that
//! proposes field values from the raw page text. Its proposals are merged
//! into the primary result by [`merge_secondary`]: they fill gaps but never
//! override a value the local extraction already found.

use std::collections::BTreeMap;
use std::time::Duration;

use fiber_mandate_extract_models::{ExtractionResult, FieldName};

use crate::patterns::{collapse_whitespace, normalize_phone};

/// Field values proposed by a secondary source.
pub type SecondaryFields = BTreeMap<FieldName, String>;

/// A best-effort secondary source of field values.
///
/// Implementations must never fail loudly: any transport error, timeout,
/// or unparseable reply is reported as `None`.
#[async_trait::async_trait]
pub trait Enricher: Send + Sync {
    /// Short identifier for logs and health reporting.
    fn name(&self) -> &str;

    /// Proposes field values for `raw_text`, giving up after `timeout`.
    async fn extract(&self, raw_text: &str, timeout: Duration) -> Option<SecondaryFields>;
}

fn normalize_secondary(field: FieldName, value: &str) -> Option<String> {
    let value = collapse_whitespace(value);
    if value.is_empty() || value.eq_ignore_ascii_case("null") || value.eq_ignore_ascii_case("none") {
        return None;
    }
    Some(match field {
        FieldName::Phone => normalize_phone(&value),
        _ => value,
    })
}

fn split_cables(joined: &str, separator: &str) -> Vec<String> {
    let separator = separator.trim();
    if separator.is_empty() {
        return vec![joined.to_owned()];
    }
    joined
        .split(separator)
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Merges secondary proposals into `result`.
///
/// Empty primary fields adopt the secondary value and are recorded in
/// `enriched_fields`. When both are present and differ, the primary value
/// stays; identifying fields keep the secondary value as an `_alternative`.
/// The caller is responsible for rescoring afterwards.
pub fn merge_secondary(result: &mut ExtractionResult, secondary: &SecondaryFields, separator: &str) {
    for &field in FieldName::MERGEABLE {
        let Some(value) = secondary
            .get(&field)
            .and_then(|v| normalize_secondary(field, v))
        else {
            continue;
        };

        let primary = result
            .data
            .get(field)
            .map(str::trim)
            .filter(|v| !v.is_empty());

        match primary {
            None => {
                if field == FieldName::Cable {
                    result.data.cables = split_cables(&value, separator);
                }
                result.data.set(field, Some(value));
                result.enriched_fields.push(field);
            }
            Some(existing) if existing != value && field.is_identifying() => {
                log::info!("Secondary source disagrees on {field}: keeping {existing:?}, alternative {value:?}");
                result.data.set_alternative(field, value);
            }
            Some(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fiber_mandate_extract_models::MandateData;

    fn primary() -> ExtractionResult {
        ExtractionResult {
            file_name: None,
            success: false,
            confidence: 0.3,
            needs_review: true,
            missing_fields: vec![FieldName::Cable],
            missing_fibers: Vec::new(),
            enriched_fields: Vec::new(),
            data: MandateData {
                mandate_number: Some("24875848".to_owned()),
                socket_label: Some("B.112.603.634.X".to_owned()),
                email: Some("a@b.ch".to_owned()),
                ..MandateData::default()
            },
            error: None,
        }
    }

    #[test]
    fn fills_gaps_and_records_provenance() {
        let mut result = primary();
        let secondary = SecondaryFields::from([
            (FieldName::Cable, "FTTH 1 FSP-A / FSC2 - B".to_owned()),
            (FieldName::Phone, "079 123 45 67".to_owned()),
            (FieldName::Fiber1, "null".to_owned()),
        ]);
        merge_secondary(&mut result, &secondary, " / ");

        assert_eq!(result.data.cable.as_deref(), Some("FTTH 1 FSP-A / FSC2 - B"));
        assert_eq!(result.data.cables, vec!["FTTH 1 FSP-A", "FSC2 - B"]);
        assert_eq!(result.data.phone.as_deref(), Some("+41791234567"));
        assert_eq!(result.data.fiber_1, None);
        assert_eq!(
            result.enriched_fields,
            vec![FieldName::Cable, FieldName::Phone]
        );
    }

    #[test]
    fn primary_wins_and_identifying_fields_keep_alternative() {
        let mut result = primary();
        let secondary = SecondaryFields::from([
            (FieldName::MandateNumber, "99999999".to_owned()),
            (FieldName::SocketLabel, "B.112.603.634.X".to_owned()),
            (FieldName::Email, "other@b.ch".to_owned()),
        ]);
        merge_secondary(&mut result, &secondary, " / ");

        assert_eq!(result.data.mandate_number.as_deref(), Some("24875848"));
        assert_eq!(result.data.mandate_number_alternative.as_deref(), Some("99999999"));
        assert_eq!(result.data.socket_label_alternative, None);
        assert_eq!(result.data.email.as_deref(), Some("a@b.ch"));
        assert!(result.enriched_fields.is_empty());
    }

    #[test]
    fn empty_secondary_changes_nothing() {
        let mut result = primary();
        merge_secondary(&mut result, &SecondaryFields::new(), " / ");
        assert_eq!(result, primary());
    }
}
