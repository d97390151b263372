//! The per-paragraph scan shared by detection and fill. Both passes must see
//! identical spans and keys, so neither reimplements any of this.

use tracing::trace;

use crate::arbitrate::arbitrate;
use crate::labels::KeyResolver;
use crate::locator::{InstanceId, ParagraphPath};
use crate::patterns::{find_matches, PatternKind};

/// A surviving match with its resolved key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedMatch {
    /// Byte offsets into the paragraph text.
    pub start: usize,
    pub end: usize,
    pub kind: PatternKind,
    pub key: String,
    pub original: String,
    /// Locator with character offsets.
    pub id: InstanceId,
}

fn char_offset(text: &str, byte: usize) -> usize {
    text[..byte].chars().count()
}

/// Collect, arbitrate and resolve keys for one paragraph. Must be called for
/// paragraphs in reading order with one resolver per pass.
pub fn scan_paragraph(
    text: &str,
    path: ParagraphPath,
    resolver: &mut KeyResolver,
) -> Vec<ResolvedMatch> {
    if text.is_empty() {
        return Vec::new();
    }
    arbitrate(find_matches(text))
        .into_iter()
        .map(|m| {
            let key = resolver.resolve(text, &m);
            let id = InstanceId::new(path, char_offset(text, m.start), char_offset(text, m.end));
            trace!(locator = %id, key = %key, "resolved match");
            ResolvedMatch {
                start: m.start,
                end: m.end,
                kind: m.kind,
                original: m.text(text).to_string(),
                key,
                id,
            }
        })
        .collect()
}
