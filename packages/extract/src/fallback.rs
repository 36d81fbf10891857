//! Cable recovery from free text.
//!
//! Used when no table produced a cable identity. Only cables are recovered:
//! without columns there is nothing to assign fiber slots from.

use crate::patterns::PatternLibrary;

/// Scans the whole page text for vendor cable identities, first-seen
/// order, duplicates removed.
#[must_use]
pub fn recover_cables(patterns: &PatternLibrary, text: &str) -> Vec<String> {
    let cables = patterns.cables(text);
    log::debug!("Text fallback recovered {} cable(s)", cables.len());
    cables
}
