//! Declarative rule sets for mandate document variants.
//!
//! A [`RuleSet`] captures everything that differs between the mandate
//! layouts we see in the field: the header marker tokens, the cable column
//! synonyms, the sentinel words that end the data section, how strict fiber
//! cells are, and the confidence tiers. One generic extractor handles every
//! variant.
//!
//! The bundled variants are embedded at compile time from
//! `packages/extract/rules/*.toml`.

use std::path::Path;

use fiber_mandate_extract_models::{FIBER_SLOTS, FieldName};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

use crate::RuleError;

/// TOML configs embedded at compile time.
const RULE_TOMLS: &[(&str, &str)] = &[
    ("strict", include_str!("../rules/strict.toml")),
    ("loose", include_str!("../rules/loose.toml")),
];

/// How fiber slot cells are accepted.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FiberAcceptance {
    /// Digits only.
    #[default]
    Numeric,
    /// Digits, or up to four ASCII alphanumeric characters.
    Alphanumeric,
}

impl FiberAcceptance {
    /// Returns the trimmed cell value if it is an acceptable fiber value.
    #[must_use]
    pub fn accept(self, raw: &str) -> Option<String> {
        let value = raw.trim();
        if value.is_empty() {
            return None;
        }
        let all_digits = value.chars().all(|c| c.is_ascii_digit());
        let accepted = match self {
            Self::Numeric => all_digits,
            Self::Alphanumeric => {
                all_digits
                    || (value.chars().count() <= 4 && value.chars().all(|c| c.is_ascii_alphanumeric()))
            }
        };
        accepted.then(|| value.to_string())
    }
}

/// Marker tokens and acceptance rules for the cable/fiber table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRules {
    /// Header tokens for fiber slots, slot 1 first.
    pub slot_tokens: Vec<String>,
    /// Synonyms of the word "cable" identifying the cable column.
    pub cable_markers: Vec<String>,
    /// Words that disqualify a cable marker cell (cable length columns).
    #[serde(default)]
    pub cable_exclusions: Vec<String>,
    /// Cell values in the cable column that end the data section.
    #[serde(default)]
    pub stop_tokens: Vec<String>,
    /// Fiber cell strictness.
    #[serde(default)]
    pub fiber_acceptance: FiberAcceptance,
    /// Minimum cable identity length, in characters.
    #[serde(default)]
    pub min_cable_len: usize,
}

/// Label tokens for label-anchored text matching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternRules {
    /// Labels preceding the mandate number (e.g. `Disp ID`).
    pub mandate_labels: Vec<String>,
    /// Labels preceding the socket label (e.g. `Socket Label`).
    pub socket_labels: Vec<String>,
    /// Labels preceding the contact phone number.
    #[serde(default)]
    pub phone_labels: Vec<String>,
    /// Labels preceding the client name.
    #[serde(default)]
    pub client_labels: Vec<String>,
}

/// Required fields and confidence tiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringRules {
    /// Fields whose absence fails the extraction.
    pub required: Vec<FieldName>,
    /// Confidence when any required field is missing.
    pub missing_required_confidence: f64,
    /// Confidence when only fiber slots are missing.
    pub missing_fiber_confidence: f64,
}

/// A complete, config-driven extraction rule set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    /// Variant identifier (e.g. `"strict"`).
    pub name: String,
    /// Separator used to join several cables into the `cable` field.
    #[serde(default = "default_separator")]
    pub cable_separator: String,
    /// Table layout rules.
    pub table: TableRules,
    /// Text pattern labels.
    pub patterns: PatternRules,
    /// Scoring policy.
    pub scoring: ScoringRules,
}

fn default_separator() -> String {
    " / ".to_string()
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::strict()
    }
}

impl RuleSet {
    /// The strict bundled variant: numeric fibers, cables longer than two
    /// characters.
    ///
    /// # Panics
    ///
    /// Panics if the embedded TOML is malformed.
    #[must_use]
    pub fn strict() -> Self {
        Self::bundled("strict").unwrap_or_else(|| unreachable!("strict.toml is bundled"))
    }

    /// The loose bundled variant: short alphanumeric fiber codes allowed.
    ///
    /// # Panics
    ///
    /// Panics if the embedded TOML is malformed.
    #[must_use]
    pub fn loose() -> Self {
        Self::bundled("loose").unwrap_or_else(|| unreachable!("loose.toml is bundled"))
    }

    /// Returns a bundled variant by name.
    ///
    /// # Panics
    ///
    /// Panics if the embedded TOML for `name` is malformed.
    #[must_use]
    pub fn bundled(name: &str) -> Option<Self> {
        RULE_TOMLS
            .iter()
            .find(|(id, _)| *id == name)
            .map(|(id, toml)| {
                Self::from_toml(toml).unwrap_or_else(|e| panic!("Failed to parse {id}.toml: {e}"))
            })
    }

    /// Names of the bundled variants.
    #[must_use]
    pub fn bundled_names() -> Vec<&'static str> {
        RULE_TOMLS.iter().map(|(id, _)| *id).collect()
    }

    /// Parses and validates a rule set from TOML.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::Toml`] if the TOML is malformed, or
    /// [`RuleError::Invalid`] if the rule set fails validation.
    pub fn from_toml(toml_str: &str) -> Result<Self, RuleError> {
        let rules: Self = toml::de::from_str(toml_str)?;
        rules.validate()?;
        Ok(rules)
    }

    /// Reads a rule set from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::Io`] if the file cannot be read, otherwise the
    /// same errors as [`RuleSet::from_toml`].
    pub fn from_file(path: &Path) -> Result<Self, RuleError> {
        let toml_str = std::fs::read_to_string(path)?;
        log::debug!("Loaded rule set from {}", path.display());
        Self::from_toml(&toml_str)
    }

    /// Serializes the rule set back to TOML.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::TomlSer`] if serialization fails.
    pub fn to_toml(&self) -> Result<String, RuleError> {
        Ok(toml::to_string(self)?)
    }

    /// Checks the invariants the extractor relies on.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::Invalid`] describing the first violation.
    pub fn validate(&self) -> Result<(), RuleError> {
        let invalid = |message: String| Err(RuleError::Invalid { message });

        if self.table.slot_tokens.is_empty() || self.table.slot_tokens.len() > FIBER_SLOTS {
            return invalid(format!(
                "expected 1-{FIBER_SLOTS} slot tokens, got {}",
                self.table.slot_tokens.len()
            ));
        }
        if self.table.slot_tokens.iter().any(|t| t.trim().is_empty()) {
            return invalid("slot tokens must not be empty".to_string());
        }
        if self.table.cable_markers.iter().all(|t| t.trim().is_empty()) {
            return invalid("at least one cable marker is required".to_string());
        }
        if self.patterns.mandate_labels.is_empty() || self.patterns.socket_labels.is_empty() {
            return invalid("mandate and socket labels are required".to_string());
        }

        let scoring = &self.scoring;
        for (name, value) in [
            ("missing_required_confidence", scoring.missing_required_confidence),
            ("missing_fiber_confidence", scoring.missing_fiber_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return invalid(format!("{name} must be within [0, 1], got {value}"));
            }
        }
        if scoring.missing_required_confidence >= scoring.missing_fiber_confidence {
            return invalid(
                "missing_required_confidence must be lower than missing_fiber_confidence"
                    .to_string(),
            );
        }
        if scoring.missing_fiber_confidence >= 1.0 {
            return invalid("missing_fiber_confidence must be lower than 1.0".to_string());
        }

        Ok(())
    }

    /// Number of configured fiber slots.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.table.slot_tokens.len()
    }
}

/// Uppercases `s` and removes all whitespace, so `"sp 1"` and `"SP1"`
/// compare equal.
#[must_use]
pub fn compact_upper(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_variants_parse() {
        for name in RuleSet::bundled_names() {
            let rules = RuleSet::bundled(name).unwrap();
            assert_eq!(rules.name, name);
            assert_eq!(rules.slot_count(), 4);
        }
    }

    #[test]
    fn strict_defaults() {
        let rules = RuleSet::default();
        assert_eq!(rules.name, "strict");
        assert_eq!(rules.cable_separator, " / ");
        assert_eq!(rules.table.fiber_acceptance, FiberAcceptance::Numeric);
        assert_eq!(rules.table.min_cable_len, 3);
        assert_eq!(
            rules.scoring.required,
            vec![
                FieldName::MandateNumber,
                FieldName::SocketLabel,
                FieldName::Cable
            ]
        );
        assert!(rules.table.stop_tokens.contains(&"Interlocuteur".to_string()));
    }

    #[test]
    fn unknown_variant_is_none() {
        assert!(RuleSet::bundled("nope").is_none());
    }

    #[test]
    fn round_trips_through_toml() {
        let rules = RuleSet::loose();
        let toml_str = rules.to_toml().unwrap();
        assert_eq!(RuleSet::from_toml(&toml_str).unwrap(), rules);
    }

    #[test]
    fn rejects_too_many_slots() {
        let mut rules = RuleSet::strict();
        rules.table.slot_tokens.push("SP5".to_string());
        assert!(matches!(rules.validate(), Err(RuleError::Invalid { .. })));
    }

    #[test]
    fn rejects_inverted_confidence_tiers() {
        let mut rules = RuleSet::strict();
        rules.scoring.missing_required_confidence = 0.8;
        assert!(rules.validate().is_err());
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(matches!(
            RuleSet::from_toml("name = "),
            Err(RuleError::Toml(_))
        ));
    }

    #[test]
    fn numeric_fiber_acceptance() {
        let acceptance = FiberAcceptance::Numeric;
        assert_eq!(acceptance.accept(" 12 "), Some("12".to_string()));
        assert_eq!(acceptance.accept("12a"), None);
        assert_eq!(acceptance.accept(""), None);
        assert_eq!(acceptance.accept("  "), None);
    }

    #[test]
    fn alphanumeric_fiber_acceptance() {
        let acceptance = FiberAcceptance::Alphanumeric;
        assert_eq!(acceptance.accept("12a"), Some("12a".to_string()));
        assert_eq!(acceptance.accept("123456"), Some("123456".to_string()));
        assert_eq!(acceptance.accept("abcde"), None);
        assert_eq!(acceptance.accept("1-2"), None);
    }

    #[test]
    fn compacts_and_uppercases() {
        assert_eq!(compact_upper(" sp 1 "), "SP1");
        assert_eq!(compact_upper("Câble:"), "CÂBLE:");
    }
}
