//! Key resolution for matches, including blanks whose name has to be read
//! from the surrounding sentence.

use std::collections::BTreeSet;

use lazy_static::lazy_static;
use regex::Regex;

use crate::normalize::normalize;
use crate::patterns::{PatternKind, RawMatch};

lazy_static! {
    static ref LABEL_BEFORE_BLANK: Regex =
        Regex::new(r"([A-Za-z][A-Za-z0-9\s-]{1,50})\s*:\s*$").unwrap();
    static ref LABEL_AFTER_AMOUNT: Regex =
        Regex::new(r#"(?i)\(\s*the\s+['"“”]?([A-Za-z][A-Za-z0-9_\s-]{2,})['"“”]?\s*\)"#).unwrap();
    static ref LABEL_BEFORE_AMOUNT: Regex =
        Regex::new(r"([A-Za-z][A-Za-z0-9_\s-]{2,50})\s*:?\s*$").unwrap();
}

const AMOUNT_LOOKAHEAD_CHARS: usize = 100;
const STOPWORDS: [&str; 10] = ["of", "the", "a", "an", "is", "at", "on", "by", "for", "in"];

/// Resolves match keys for one pass over one document.
///
/// Holds the document-wide counters behind `field_<n>` and `amount_<n>`.
/// Each detection or fill pass owns a fresh resolver, so keys never depend
/// on other documents.
#[derive(Debug, Default)]
pub struct KeyResolver {
    unlabelled_blanks: usize,
    keys: BTreeSet<String>,
}

impl KeyResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every key handed out so far, before any false-positive filtering.
    pub fn keys(&self) -> &BTreeSet<String> {
        &self.keys
    }

    /// Key for a surviving match in `paragraph`. Must be called in reading
    /// order: blank counters advance with each call.
    pub fn resolve(&mut self, paragraph: &str, m: &RawMatch) -> String {
        let key = match m.kind {
            PatternKind::Underscore => self.blank_key(paragraph, m),
            PatternKind::DollarUnderscore => self.amount_key(paragraph, m),
            PatternKind::DoubleCurly
            | PatternKind::SingleCurly
            | PatternKind::SquareBracket
            | PatternKind::SignatureLabel => normalize(m.label.as_deref().unwrap_or_default()),
        };
        self.keys.insert(key.clone());
        key
    }

    fn blank_key(&mut self, paragraph: &str, m: &RawMatch) -> String {
        let before = paragraph[..m.start].trim();
        if let Some(label) = LABEL_BEFORE_BLANK.captures(before).and_then(|c| c.get(1)) {
            let key = normalize(label.as_str());
            if !key.is_empty() {
                return key;
            }
        }
        self.unlabelled_blanks += 1;
        format!("field_{}", self.unlabelled_blanks)
    }

    fn amount_key(&self, paragraph: &str, m: &RawMatch) -> String {
        let after: String = paragraph[m.end..].chars().take(AMOUNT_LOOKAHEAD_CHARS).collect();
        if let Some(label) = LABEL_AFTER_AMOUNT.captures(&after).and_then(|c| c.get(1)) {
            let key = normalize(label.as_str());
            if !key.is_empty() {
                return key;
            }
        }

        let before = paragraph[..m.start].trim();
        if let Some(label) = LABEL_BEFORE_AMOUNT.captures(before).and_then(|c| c.get(1)) {
            let phrase = label.as_str().trim().to_lowercase();
            let key = normalize(label.as_str());
            if !STOPWORDS.contains(&phrase.as_str()) && !key.is_empty() {
                return key;
            }
        }

        let taken = self.keys.iter().filter(|k| k.starts_with("amount_")).count();
        format!("amount_{}", taken + 1)
    }
}
