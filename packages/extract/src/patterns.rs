//! Scalar field matchers applied to raw page text.
//!
//! Every matcher returns the first match or `None`; none of them can fail
//! at match time. Label-anchored variants are compiled from the rule set's
//! label tokens, so [`PatternLibrary::new`] is the only fallible step.

use std::sync::LazyLock;

use regex::Regex;

use crate::RuleError;
use crate::rules::PatternRules;

/// Socket label shape: `B.###.###.###.X` with a digit or uppercase letter
/// as the final segment.
const SOCKET_SHAPE: &str = r"B\.\d{3}\.\d{3}\.\d{3}\.[0-9A-Z]";

static SOCKET_ANYWHERE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"\b({SOCKET_SHAPE})\b")).expect("valid regex"));

static MANDATE_ANYWHERE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{8,})\b").expect("valid regex"));

static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\+41|\b0)\s*\d{2}\s*\d{3}\s*\d{2}\s*\d{2}\b").expect("valid regex")
});

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").expect("valid regex")
});

static CABLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"FTTH\s+\d+\s*FSP[A-Za-z0-9\-]+|FSC\d+\s*-\s*[A-Za-z0-9]+").expect("valid regex")
});

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Collapses every whitespace run (including newlines) to one space and
/// trims the ends.
#[must_use]
pub fn collapse_whitespace(s: &str) -> String {
    WHITESPACE_RE.replace_all(s.trim(), " ").into_owned()
}

/// Normalizes a Swiss phone number: strips whitespace, then rewrites a
/// local leading `0` or a bare `41` country code as `+41`.
#[must_use]
pub fn normalize_phone(raw: &str) -> String {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    if let Some(rest) = compact.strip_prefix('0') {
        format!("+41{rest}")
    } else if compact.starts_with("41") {
        format!("+{compact}")
    } else {
        compact
    }
}

/// Swiss number written without spaces: `0` plus nine digits, or `41`
/// plus nine digits.
fn is_phone_shaped(digits: &str) -> bool {
    (digits.len() == 10 && digits.starts_with('0'))
        || (digits.len() == 11 && digits.starts_with("41"))
}

/// Builds `(?i:label1|label2)` with internal whitespace of each label made
/// flexible.
fn label_alternation(labels: &[String]) -> String {
    let alternatives: Vec<String> = labels
        .iter()
        .map(|label| {
            label
                .split_whitespace()
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join(r"\s*")
        })
        .filter(|alt| !alt.is_empty())
        .collect();
    format!(r"(?i:\b(?:{})\b)", alternatives.join("|"))
}

/// Compiled matchers for the scalar mandate fields.
#[derive(Debug, Clone)]
pub struct PatternLibrary {
    mandate_labeled: Regex,
    socket_labeled: Regex,
    phone_labeled: Option<Regex>,
    client_labeled: Option<Regex>,
}

impl PatternLibrary {
    /// Compiles the label-anchored matchers for `rules`.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::Regex`] if a label produces an invalid pattern.
    pub fn new(rules: &PatternRules) -> Result<Self, RuleError> {
        let mandate_labeled = Regex::new(&format!(
            r"{}\s*[:.]?\s*(\d{{8,}})",
            label_alternation(&rules.mandate_labels)
        ))?;
        let socket_labeled = Regex::new(&format!(
            r"{}\s*[:.]?\s*({SOCKET_SHAPE})",
            label_alternation(&rules.socket_labels)
        ))?;
        let phone_labeled = if rules.phone_labels.is_empty() {
            None
        } else {
            Some(Regex::new(&format!(
                r"{}\s*[:.]?\s*(\+41\s*\d{{2}}\s*\d{{3}}\s*\d{{2}}\s*\d{{2}}|41\d{{9}}|0\d{{9}})\b",
                label_alternation(&rules.phone_labels)
            ))?)
        };
        let client_labeled = if rules.client_labels.is_empty() {
            None
        } else {
            Some(Regex::new(&format!(
                r"{}[ \t]*:[ \t]*([^\r\n]+)",
                label_alternation(&rules.client_labels)
            ))?)
        };

        Ok(Self {
            mandate_labeled,
            socket_labeled,
            phone_labeled,
            client_labeled,
        })
    }

    /// Work-order identifier: 8+ digits, preferably after a mandate label,
    /// otherwise the first standalone 8+ digit run that is not a phone
    /// number.
    #[must_use]
    pub fn mandate_number(&self, text: &str) -> Option<String> {
        if let Some(caps) = self.mandate_labeled.captures(text) {
            return Some(caps[1].to_string());
        }
        MANDATE_ANYWHERE_RE
            .captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .find(|m| !text[..m.start()].ends_with('+') && !is_phone_shaped(m.as_str()))
            .map(|m| m.as_str().to_string())
    }

    /// Socket label: label-anchored on the same or next line first, then
    /// the first occurrence anywhere.
    #[must_use]
    pub fn socket_label(&self, text: &str) -> Option<String> {
        self.socket_labeled
            .captures(text)
            .or_else(|| SOCKET_ANYWHERE_RE.captures(text))
            .map(|caps| caps[1].to_string())
    }

    /// Swiss phone number normalized to `+41…` without whitespace.
    #[must_use]
    pub fn phone(&self, text: &str) -> Option<String> {
        if let Some(caps) = self.phone_labeled.as_ref().and_then(|re| re.captures(text)) {
            let candidate = normalize_phone(&caps[1]);
            if candidate.len() >= 12 {
                return Some(candidate);
            }
        }
        PHONE_RE.find(text).map(|m| normalize_phone(m.as_str()))
    }

    /// First email address in the text.
    #[must_use]
    pub fn email(&self, text: &str) -> Option<String> {
        EMAIL_RE.find(text).map(|m| m.as_str().to_string())
    }

    /// Rest of the line after a client/address label.
    #[must_use]
    pub fn client_name(&self, text: &str) -> Option<String> {
        self.client_labeled
            .as_ref()
            .and_then(|re| re.captures(text))
            .map(|caps| collapse_whitespace(&caps[1]))
            .filter(|name| !name.is_empty())
    }

    /// All distinct vendor cable identities in the text, in first-seen
    /// order, whitespace-collapsed.
    #[must_use]
    pub fn cables(&self, text: &str) -> Vec<String> {
        let mut cables: Vec<String> = Vec::new();
        for m in CABLE_RE.find_iter(text) {
            let cable = collapse_whitespace(m.as_str());
            if !cables.contains(&cable) {
                cables.push(cable);
            }
        }
        cables
    }

    /// Runs every scalar matcher over `text`.
    #[must_use]
    pub fn scan(&self, text: &str) -> ScalarFields {
        ScalarFields {
            mandate_number: self.mandate_number(text),
            socket_label: self.socket_label(text),
            phone: self.phone(text),
            email: self.email(text),
            client_name: self.client_name(text),
        }
    }
}

/// Scalar fields found in the raw page text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScalarFields {
    /// Work-order identifier.
    pub mandate_number: Option<String>,
    /// PTO reference.
    pub socket_label: Option<String>,
    /// Normalized phone number.
    pub phone: Option<String>,
    /// Email address.
    pub email: Option<String>,
    /// Client name.
    pub client_name: Option<String>,
}
