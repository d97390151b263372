use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::context::{extract_context, SentenceContext};
use crate::document::ParagraphSource;
use crate::filter::retain_genuine;
use crate::labels::KeyResolver;
use crate::locator::InstanceId;
use crate::patterns::PatternKind;
use crate::scan::scan_paragraph;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceholderInstance {
    pub id: InstanceId,
    pub normalized_key: String,
    pub original_text: String,
    pub pattern_kind: PatternKind,
    pub context: SentenceContext,
}

/// A field the user answers once, with every occurrence it covers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalField {
    pub key: String,
    pub instances: Vec<InstanceId>,
    pub count: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub fields: BTreeMap<String, CanonicalField>,
    /// Surviving instances in reading order.
    pub candidates: Vec<PlaceholderInstance>,
    /// Number of fields before false-positive filtering.
    pub raw_field_count: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FieldSummary {
    pub count: usize,
    pub patterns: Vec<PatternKind>,
    pub variants: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DetectionSummary {
    pub total_unique: usize,
    pub total_occurrences: usize,
    pub counts: BTreeMap<String, usize>,
    pub grouped: BTreeMap<String, FieldSummary>,
}

impl DetectionResult {
    /// Nothing survived filtering. A valid outcome, not an error.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Whether some patterns matched but every field was filtered out.
    pub fn only_false_positives(&self) -> bool {
        self.is_empty() && self.raw_field_count > 0
    }

    pub fn summary(&self) -> DetectionSummary {
        let mut grouped: BTreeMap<String, FieldSummary> = BTreeMap::new();
        for c in &self.candidates {
            let entry = grouped
                .entry(c.normalized_key.clone())
                .or_insert_with(|| FieldSummary {
                    count: 0,
                    patterns: Vec::new(),
                    variants: Vec::new(),
                });
            entry.count += 1;
            if !entry.patterns.contains(&c.pattern_kind) {
                entry.patterns.push(c.pattern_kind);
            }
            if !entry.variants.contains(&c.original_text) {
                entry.variants.push(c.original_text.clone());
            }
        }
        DetectionSummary {
            total_unique: self.fields.len(),
            total_occurrences: self.fields.values().map(|f| f.count).sum(),
            counts: self.fields.iter().map(|(k, f)| (k.clone(), f.count)).collect(),
            grouped,
        }
    }

    /// Whether `id` is one of the instances of field `key`. Per-instance
    /// overrides are only accepted for ids that pass this.
    pub fn owns_instance(&self, key: &str, id: &InstanceId) -> bool {
        self.fields
            .get(key)
            .is_some_and(|f| f.instances.contains(id))
    }

    /// Field keys ordered by first occurrence.
    pub fn keys_in_document_order(&self) -> Vec<&str> {
        let mut seen = BTreeSet::new();
        self.candidates
            .iter()
            .map(|c| c.normalized_key.as_str())
            .filter(|k| seen.insert(*k))
            .collect()
    }

    /// First occurrence of `key`.
    pub fn first_instance(&self, key: &str) -> Option<&PlaceholderInstance> {
        self.candidates.iter().find(|c| c.normalized_key == key)
    }
}

fn clip(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max).collect();
    out.push('…');
    out
}

pub fn detect<D: ParagraphSource + ?Sized>(doc: &D) -> DetectionResult {
    detect_with(doc, &Settings::default())
}

/// Scan every paragraph in reading order, group instances by key and drop
/// false-positive fields.
pub fn detect_with<D: ParagraphSource + ?Sized>(doc: &D, settings: &Settings) -> DetectionResult {
    let mut resolver = KeyResolver::new();
    let mut seen: HashSet<InstanceId> = HashSet::new();
    let mut ordered: Vec<PlaceholderInstance> = Vec::new();
    let mut groups: BTreeMap<String, Vec<PlaceholderInstance>> = BTreeMap::new();

    for paragraph in doc.paragraphs() {
        for m in scan_paragraph(&paragraph.text, paragraph.path, &mut resolver) {
            if !seen.insert(m.id) {
                continue;
            }
            let context = extract_context(&paragraph.text, m.start, m.end);
            debug!(
                pattern = m.kind.as_str(),
                normalized = %m.key,
                locator = %m.id,
                original = %m.original,
                sentence = %clip(&context.containing_sentence, 120),
                "kept placeholder"
            );
            let instance = PlaceholderInstance {
                id: m.id,
                normalized_key: m.key,
                original_text: m.original,
                pattern_kind: m.kind,
                context,
            };
            groups
                .entry(instance.normalized_key.clone())
                .or_default()
                .push(instance.clone());
            ordered.push(instance);
        }
    }

    let raw_field_count = groups.len();
    retain_genuine(&mut groups);

    let candidates: Vec<PlaceholderInstance> = ordered
        .into_iter()
        .filter(|i| groups.contains_key(&i.normalized_key))
        .collect();
    let fields: BTreeMap<String, CanonicalField> = groups
        .into_iter()
        .map(|(key, instances)| {
            let ids: Vec<InstanceId> = instances.iter().map(|i| i.id).collect();
            let field = CanonicalField {
                key: key.clone(),
                count: ids.len(),
                instances: ids,
            };
            (key, field)
        })
        .collect();

    let result = DetectionResult {
        fields,
        candidates,
        raw_field_count,
    };
    info!(
        unique = result.fields.len(),
        occurrences = result.candidates.len(),
        filtered = raw_field_count - result.fields.len(),
        "placeholder detection finished"
    );
    if result.fields.len() > settings.max_placeholders {
        warn!(
            unique = result.fields.len(),
            limit = settings.max_placeholders,
            "document has more placeholders than the configured limit"
        );
    }
    result
}
