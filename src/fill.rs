use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::document::EditableDocument;
use crate::error::ReplacementError;
use crate::labels::KeyResolver;
use crate::locator::InstanceId;
use crate::normalize::normalize;
use crate::patterns::PatternKind;
use crate::scan::{scan_paragraph, ResolvedMatch};

const AMOUNT_SYNONYMS: [&str; 4] = ["purchase_amount", "amount", "price", "amount_1"];
const BLANK_SYNONYMS: [&str; 10] = [
    "blank_1",
    "blank",
    "field_1",
    "signatory_name",
    "by",
    "name",
    "title",
    "address",
    "email",
    "phone",
];

/// User-supplied values for one fill.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answers {
    /// Field key to value. Keys may differ from detected keys in case and
    /// spacing.
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
    /// Per-occurrence values, taking precedence over `fields`.
    #[serde(default)]
    pub overrides: BTreeMap<InstanceId, String>,
}

fn non_empty(v: &str) -> Option<&str> {
    let v = v.trim();
    (!v.is_empty()).then_some(v)
}

impl Answers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fields(fields: BTreeMap<String, String>) -> Self {
        Self {
            fields,
            overrides: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn with_override(mut self, id: InstanceId, value: impl Into<String>) -> Self {
        self.overrides.insert(id, value.into());
        self
    }

    /// Value for `key`: an exact key first, then any key that normalizes to
    /// it. Blank values count as missing.
    pub fn field(&self, key: &str) -> Option<&str> {
        if let Some(v) = self.fields.get(key).and_then(|v| non_empty(v)) {
            return Some(v);
        }
        self.fields
            .iter()
            .filter(|(k, _)| normalize(k) == key)
            .find_map(|(_, v)| non_empty(v))
    }

    pub fn override_for(&self, id: &InstanceId) -> Option<&str> {
        self.overrides.get(id).and_then(|v| non_empty(v))
    }

    fn value_for(&self, m: &ResolvedMatch) -> Option<&str> {
        if let Some(v) = self.override_for(&m.id).or_else(|| self.field(&m.key)) {
            return Some(v);
        }
        let synonyms: &[&str] = match m.kind {
            PatternKind::DollarUnderscore => &AMOUNT_SYNONYMS,
            PatternKind::Underscore => &BLANK_SYNONYMS,
            _ => &[],
        };
        synonyms.iter().find_map(|k| self.field(k))
    }
}

/// What a fill changed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FillReport {
    /// Substitutions made per field key.
    pub replacements: BTreeMap<String, usize>,
    /// Keys found in the document that got no value, in reading order.
    pub unresolved: Vec<String>,
    pub paragraphs_rewritten: usize,
}

impl FillReport {
    pub fn total_replacements(&self) -> usize {
        self.replacements.values().sum()
    }
}

/// Text that replaces the span of `m`. A signature line keeps its label and
/// colon and drops any leaders after it.
fn replacement_text(m: &ResolvedMatch, value: &str) -> String {
    if m.kind == PatternKind::SignatureLabel {
        if let Some(colon) = m.original.find(':') {
            return format!("{} {}", &m.original[..=colon], value);
        }
    }
    value.to_string()
}

/// Fill `doc` and return the completed copy. `doc` itself is never touched,
/// so a failure leaves nothing half-applied.
pub fn fill<D: EditableDocument>(doc: &D, answers: &Answers) -> Result<D, ReplacementError> {
    fill_with_report(doc, answers).map(|(filled, _)| filled)
}

pub fn fill_with_report<D: EditableDocument>(
    doc: &D,
    answers: &Answers,
) -> Result<(D, FillReport), ReplacementError> {
    let mut out = doc.clone();
    let mut report = FillReport::default();
    let mut resolver = KeyResolver::new();

    for paragraph in doc.paragraphs() {
        let matches = scan_paragraph(&paragraph.text, paragraph.path, &mut resolver);
        let mut subs: Vec<(usize, usize, String)> = Vec::new();
        for m in &matches {
            match answers.value_for(m) {
                Some(value) => {
                    debug!(locator = %m.id, key = %m.key, "substituting");
                    subs.push((m.start, m.end, replacement_text(m, value)));
                    *report.replacements.entry(m.key.clone()).or_default() += 1;
                }
                None => {
                    if !report.unresolved.contains(&m.key) {
                        report.unresolved.push(m.key.clone());
                    }
                }
            }
        }
        if subs.is_empty() {
            continue;
        }

        subs.sort_by(|a, b| b.0.cmp(&a.0));
        let mut text = paragraph.text.clone();
        for (start, end, value) in subs {
            text.replace_range(start..end, &value);
        }
        out.rewrite_paragraph(&paragraph.path, &text, &paragraph.lead_format())?;
        report.paragraphs_rewritten += 1;
    }

    for key in &report.unresolved {
        warn!(key = %key, "no answer for placeholder, left unchanged");
    }
    info!(
        replacements = report.total_replacements(),
        fields = report.replacements.len(),
        paragraphs = report.paragraphs_rewritten,
        "fill finished"
    );
    Ok((out, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::detect;
    use crate::document::{ParagraphSource, RunFormat, TextDocument, TextRun};
    use crate::locator::ParagraphPath;

    fn texts(doc: &TextDocument) -> Vec<String> {
        doc.paragraphs().into_iter().map(|p| p.text).collect()
    }

    #[test]
    fn end_to_end_keeps_lead_run_format() {
        let lead = RunFormat {
            bold: Some(true),
            font_name: Some("Times New Roman".into()),
            font_size_half_points: Some(24),
            ..RunFormat::default()
        };
        let doc = TextDocument::new().with_runs(vec![
            TextRun::new("This Agreement is between ", lead.clone()),
            TextRun::plain("{{COMPANY_NAME}} and {{CLIENT_NAME}}, dated [Effective Date]."),
        ]);
        let answers = Answers::new()
            .with_field("company_name", "Acme Corp")
            .with_field("client_name", "Jane Doe")
            .with_field("effective_date", "March 1, 2025");

        let filled = fill(&doc, &answers).unwrap();
        let p = &filled.paragraphs()[0];
        assert_eq!(
            p.text,
            "This Agreement is between Acme Corp and Jane Doe, dated March 1, 2025."
        );
        assert_eq!(p.runs.len(), 1);
        assert_eq!(p.lead_format(), lead);
    }

    #[test]
    fn signature_line_gets_its_value_appended() {
        let doc = TextDocument::new()
            .with_paragraph("Address:")
            .with_paragraph("Name: ________");
        let answers = Answers::new()
            .with_field("address", "123 Main St")
            .with_field("name", "Jane Doe");
        assert_eq!(
            texts(&fill(&doc, &answers).unwrap()),
            ["Address: 123 Main St", "Name: Jane Doe"]
        );
    }

    #[test]
    fn missing_answers_leave_placeholders_alone() {
        let doc = TextDocument::new().with_paragraph("Hi {{CLIENT_NAME}}, from {{COMPANY}}.");
        let answers = Answers::new().with_field("company", "Acme");
        let (filled, report) = fill_with_report(&doc, &answers).unwrap();
        assert_eq!(texts(&filled), ["Hi {{CLIENT_NAME}}, from Acme."]);
        assert_eq!(report.unresolved, ["client_name"]);
        assert_eq!(report.replacements.get("company"), Some(&1));

        let (untouched, report) = fill_with_report(&doc, &Answers::new()).unwrap();
        assert_eq!(untouched, doc);
        assert_eq!(report.paragraphs_rewritten, 0);
    }

    #[test]
    fn lookup_tolerates_case_and_spacing() {
        let doc = TextDocument::new().with_paragraph("{{client_name}} / [Effective Date]");
        let answers = Answers::new()
            .with_field("Client Name", "Jane")
            .with_field("EFFECTIVE_DATE", "today");
        assert_eq!(texts(&fill(&doc, &answers).unwrap()), ["Jane / today"]);
    }

    #[test]
    fn blank_answers_count_as_missing() {
        let doc = TextDocument::new().with_paragraph("{{CLIENT_NAME}}");
        let answers = Answers::new().with_field("client_name", "   ");
        assert_eq!(texts(&fill(&doc, &answers).unwrap()), ["{{CLIENT_NAME}}"]);
    }

    #[test]
    fn override_beats_field_answer_for_one_instance() {
        let doc = TextDocument::new()
            .with_paragraph("{{NAME}} signs.")
            .with_table(&[&[&["{{NAME}} witnesses."]]]);
        let detected = detect(&doc);
        let second = detected.fields["name"].instances[1];
        assert_eq!(second.to_string(), "t0-r0-c0-p0-s0-e8");

        let answers = Answers::new()
            .with_field("name", "Jane")
            .with_override(second, "John");
        assert_eq!(
            texts(&fill(&doc, &answers).unwrap()),
            ["Jane signs.", "John witnesses."]
        );
    }

    #[test]
    fn synonyms_cover_unnamed_blanks_and_amounts() {
        let doc = TextDocument::new()
            .with_paragraph("The Investor pays $[_____] to the Company.")
            .with_paragraph("Signed by ______");
        let answers = Answers::new()
            .with_field("purchase_amount", "100,000")
            .with_field("signatory_name", "Jane Doe");
        assert_eq!(
            texts(&fill(&doc, &answers).unwrap()),
            ["The Investor pays 100,000 to the Company.", "Signed by Jane Doe"]
        );
    }

    #[test]
    fn synonyms_do_not_apply_to_named_syntax() {
        let doc = TextDocument::new().with_paragraph("{{Party}}");
        let answers = Answers::new().with_field("name", "Jane");
        assert_eq!(texts(&fill(&doc, &answers).unwrap()), ["{{Party}}"]);
    }

    #[test]
    fn fill_reuses_detection_keys() {
        let doc = TextDocument::new()
            .with_paragraph("First ____ then ____.")
            .with_paragraph("Date: ____");
        let detected = detect(&doc);
        assert_eq!(detected.keys_in_document_order(), ["field_1", "field_2", "date"]);

        let answers = Answers::new()
            .with_field("field_1", "A")
            .with_field("field_2", "B")
            .with_field("date", "C");
        assert_eq!(texts(&fill(&doc, &answers).unwrap()), ["First A then B.", "Date: C"]);
    }

    #[test]
    fn input_document_is_not_modified() {
        let doc = TextDocument::new().with_paragraph("{{A_B}}");
        let before = doc.clone();
        let _ = fill(&doc, &Answers::new().with_field("a_b", "x")).unwrap();
        assert_eq!(doc, before);
    }

    #[test]
    fn answers_deserialize_from_json() {
        let answers: Answers = serde_json::from_str(
            r#"{"fields": {"client_name": "Jane"}, "overrides": {"p0-s0-e5": "x"}}"#,
        )
        .unwrap();
        let id = InstanceId::new(ParagraphPath::Body { paragraph: 0 }, 0, 5);
        assert_eq!(answers.override_for(&id), Some("x"));
        assert_eq!(answers.field("client_name"), Some("Jane"));
    }
}
