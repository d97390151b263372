//! Lexical placeholder patterns over one paragraph's flattened text.
//!
//! Every rule runs independently; overlapping hits are expected and settled
//! later by [`crate::arbitrate::arbitrate`].

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    static ref DOLLAR_UNDERSCORE: Regex = Regex::new(r"\$\s*\[\s*_{3,}\s*\]").unwrap();
    static ref SQUARE_BRACKET: Regex =
        Regex::new(r"\[\s*([A-Za-z][A-Za-z0-9_\s-]+?)\s*\]").unwrap();
    static ref DOUBLE_CURLY: Regex = Regex::new(r"\{\{\s*([A-Za-z0-9_\s-]+?)\s*\}\}").unwrap();
    static ref SINGLE_CURLY: Regex = Regex::new(r"\{\s*([A-Za-z0-9_\s-]+?)\s*\}").unwrap();
    static ref UNDERSCORE: Regex = Regex::new(r"_{3,}").unwrap();
    static ref SIGNATURE_LINE: Regex =
        Regex::new(r"(?i)^\s*(Address|E-mail|Email|Phone|Name|Title|By)\s*:\s*[ \t._\-—–]*$").unwrap();
}

/// Labels recognised on bare signature lines such as `Address:`.
pub const SIGNATURE_LABELS: [&str; 6] = ["address", "email", "phone", "by", "name", "title"];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    DoubleCurly,
    SingleCurly,
    SquareBracket,
    Underscore,
    DollarUnderscore,
    SignatureLabel,
}

impl PatternKind {
    /// Arbitration priority, higher wins.
    pub fn priority(self) -> u8 {
        match self {
            PatternKind::SignatureLabel => 6,
            PatternKind::DollarUnderscore => 5,
            PatternKind::SquareBracket => 4,
            PatternKind::DoubleCurly => 3,
            PatternKind::SingleCurly => 2,
            PatternKind::Underscore => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PatternKind::DoubleCurly => "double_curly",
            PatternKind::SingleCurly => "single_curly",
            PatternKind::SquareBracket => "square_bracket",
            PatternKind::Underscore => "underscore",
            PatternKind::DollarUnderscore => "dollar_underscore",
            PatternKind::SignatureLabel => "signature_label",
        }
    }
}

/// A candidate span in byte offsets of the paragraph text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawMatch {
    pub start: usize,
    pub end: usize,
    pub kind: PatternKind,
    /// Captured label for syntaxes that carry one; `None` for blanks.
    pub label: Option<String>,
}

impl RawMatch {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn overlaps(&self, other: &RawMatch) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn text<'t>(&self, paragraph: &'t str) -> &'t str {
        &paragraph[self.start..self.end]
    }
}

fn labelled(re: &Regex, kind: PatternKind, text: &str, out: &mut Vec<RawMatch>) {
    for cap in re.captures_iter(text) {
        let (Some(whole), Some(label)) = (cap.get(0), cap.get(1)) else {
            continue;
        };
        out.push(RawMatch {
            start: whole.start(),
            end: whole.end(),
            kind,
            label: Some(label.as_str().to_string()),
        });
    }
}

fn unlabelled(re: &Regex, kind: PatternKind, text: &str, out: &mut Vec<RawMatch>) {
    out.extend(re.find_iter(text).map(|m| RawMatch {
        start: m.start(),
        end: m.end(),
        kind,
        label: None,
    }));
}

/// All raw matches of every pattern kind, including the signature-line
/// heuristic. Not arbitrated.
pub fn find_matches(text: &str) -> Vec<RawMatch> {
    let mut out = Vec::new();
    if text.is_empty() {
        return out;
    }
    unlabelled(&DOLLAR_UNDERSCORE, PatternKind::DollarUnderscore, text, &mut out);
    labelled(&SQUARE_BRACKET, PatternKind::SquareBracket, text, &mut out);
    labelled(&DOUBLE_CURLY, PatternKind::DoubleCurly, text, &mut out);
    labelled(&SINGLE_CURLY, PatternKind::SingleCurly, text, &mut out);
    unlabelled(&UNDERSCORE, PatternKind::Underscore, text, &mut out);
    out.extend(signature_label(text));
    out
}

/// A paragraph that is nothing but `Label:` plus optional leaders
/// (dots, dashes, underscores, tabs) yields one match over the whole text.
pub fn signature_label(text: &str) -> Option<RawMatch> {
    let cap = SIGNATURE_LINE.captures(text)?;
    Some(RawMatch {
        start: 0,
        end: text.len(),
        kind: PatternKind::SignatureLabel,
        label: Some(cap.get(1)?.as_str().to_string()),
    })
}


/// Paragraph text built from placeholder syntax fragments, so generated
/// inputs hit every pattern and plenty of overlaps.
#[cfg(test)]
pub(crate) mod strategies {
    use proptest::prelude::*;

    fn fragment() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("{{".to_string()),
            Just("}}".to_string()),
            Just("{".to_string()),
            Just("}".to_string()),
            Just("[".to_string()),
            Just("]".to_string()),
            Just("___".to_string()),
            Just("$".to_string()),
            Just(": ".to_string()),
            Just(". ".to_string()),
            "[A-Za-z ]{1,8}",
        ]
    }

    pub(crate) fn paragraph() -> impl Strategy<Value = String> {
        prop::collection::vec(fragment(), 0..16).prop_map(|parts| parts.concat())
    }
}
