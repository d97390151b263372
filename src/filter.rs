//! Drops fields that look like cross-references, defined-entity suffixes or
//! other bracketed text rather than values to fill in.

use std::collections::BTreeMap;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

use crate::detect::PlaceholderInstance;
use crate::patterns::PatternKind;

lazy_static! {
    static ref SUBSECTION_REF: Regex = Regex::new(r"(?i)^\d+\([a-z]\)$").unwrap();
    static ref SECTION_REF: Regex = Regex::new(r"(?i)^Section\s+\d+").unwrap();
    static ref ATTACHMENT_REF: Regex = Regex::new(r"(?i)^(Exhibit|Schedule|Annex)\s+\w+$").unwrap();
}

const CORPORATE_ACRONYMS: [&str; 10] = [
    "llc", "usa", "inc", "ltd", "co", "corp", "aka", "dba", "llp", "pllc",
];
const BOILERPLATE: [&str; 3] = ["unsubscribe", "manage preferences", "view in browser"];

/// Short keys that are legitimate even when they occur once.
const SHORT_ALLOWED: [&str; 6] = ["by", "name", "title", "email", "address", "phone"];

fn is_numeric(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

fn bracket_content(original: &str) -> &str {
    original
        .trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .trim()
}

fn is_reference_bracket(content: &str) -> bool {
    let lower = content.to_lowercase();
    is_numeric(content)
        || SUBSECTION_REF.is_match(content)
        || SECTION_REF.is_match(content)
        || ATTACHMENT_REF.is_match(content)
        || CORPORATE_ACRONYMS.contains(&lower.as_str())
        || BOILERPLATE.iter().any(|p| lower.contains(p))
        || content.chars().count() == 1
}

/// Whether a field with `key` and these `instances` should be discarded.
/// Exclusions are checked before the keep rules.
pub fn is_false_positive(key: &str, instances: &[PlaceholderInstance]) -> bool {
    let key_len = key.chars().count();
    if is_numeric(key) || key.to_lowercase().contains("section") || key_len == 1 {
        return true;
    }

    let bad_bracket = instances
        .iter()
        .filter(|i| i.pattern_kind == PatternKind::SquareBracket)
        .any(|i| is_reference_bracket(bracket_content(&i.original_text)));
    if bad_bracket {
        return true;
    }

    let count = instances.len();
    if count == 1 && !key.contains('_') && key_len <= 3 && !SHORT_ALLOWED.contains(&key) {
        return true;
    }

    // Singletons survive only on length or an underscore.
    let keep = count >= 2 || key.contains('_') || key_len > 3;
    !keep
}

/// Remove every false-positive field from `groups` in place.
pub fn retain_genuine(groups: &mut BTreeMap<String, Vec<PlaceholderInstance>>) {
    groups.retain(|key, instances| {
        let drop = key.is_empty() || is_false_positive(key, instances);
        if drop {
            debug!(key = %key, count = instances.len(), "filtered false positive");
        }
        !drop
    });
}
