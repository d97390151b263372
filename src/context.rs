use serde::{Deserialize, Serialize};

const SENTENCE_CHARS: usize = 400;
const NEIGHBOUR_CHARS: usize = 300;

/// Sentences around one match, clipped for prompt building.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentenceContext {
    pub previous_sentence: String,
    pub containing_sentence: String,
    pub next_sentence: String,
}

/// Byte span of one raw sentence, terminator included, untrimmed.
struct Sentence {
    start: usize,
    end: usize,
}

fn split_sentences(text: &str) -> Vec<Sentence> {
    let mut out = Vec::new();
    let mut start = 0;
    for (i, ch) in text.char_indices() {
        if matches!(ch, '.' | '!' | '?' | ';' | '\n') {
            let end = i + ch.len_utf8();
            out.push(Sentence { start, end });
            start = end;
        }
    }
    if start < text.len() {
        out.push(Sentence {
            start,
            end: text.len(),
        });
    }
    out.retain(|s| !text[s.start..s.end].trim().is_empty());
    out
}

fn clip(s: &str, max_chars: usize) -> String {
    s.trim().chars().take(max_chars).collect()
}

/// Previous, containing and next sentence for the match at byte offsets
/// `start..end` of `text`.
///
/// Sentences end at `. ! ? ;` or a newline. A match past the last sentence
/// boundary (or inside blank space) falls back to the first sentence; a text
/// with no sentences at all yields itself as the containing sentence.
pub fn extract_context(text: &str, start: usize, _end: usize) -> SentenceContext {
    let sentences = split_sentences(text);
    if sentences.is_empty() {
        return SentenceContext {
            containing_sentence: clip(text, SENTENCE_CHARS),
            ..SentenceContext::default()
        };
    }

    let idx = sentences
        .iter()
        .position(|s| s.start <= start && start < s.end)
        .unwrap_or(0);
    let slice = |s: &Sentence| &text[s.start..s.end];

    SentenceContext {
        previous_sentence: idx
            .checked_sub(1)
            .and_then(|i| sentences.get(i))
            .map(|s| clip(slice(s), NEIGHBOUR_CHARS))
            .unwrap_or_default(),
        containing_sentence: clip(slice(&sentences[idx]), SENTENCE_CHARS),
        next_sentence: sentences
            .get(idx + 1)
            .map(|s| clip(slice(s), NEIGHBOUR_CHARS))
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(text: &str, needle: &str) -> SentenceContext {
        let start = text.find(needle).unwrap();
        extract_context(text, start, start + needle.len())
    }

    #[test]
    fn finds_neighbours() {
        let text = "First one. The buyer is {{BUYER}}! Last one? Trailing";
        let ctx = at(text, "{{BUYER}}");
        assert_eq!(ctx.previous_sentence, "First one.");
        assert_eq!(ctx.containing_sentence, "The buyer is {{BUYER}}!");
        assert_eq!(ctx.next_sentence, "Last one?");
    }

    #[test]
    fn missing_neighbours_are_empty() {
        let ctx = at("Only {{X}} here", "{{X}}");
        assert_eq!(ctx.previous_sentence, "");
        assert_eq!(ctx.containing_sentence, "Only {{X}} here");
        assert_eq!(ctx.next_sentence, "");
    }

    #[test]
    fn newlines_and_semicolons_split() {
        let text = "a;\n\nName: ____\nb";
        let ctx = at(text, "____");
        assert_eq!(ctx.previous_sentence, "a;");
        assert_eq!(ctx.containing_sentence, "Name: ____");
        assert_eq!(ctx.next_sentence, "b");
    }

    #[test]
    fn clips_long_sentences_by_chars() {
        let long = "é".repeat(1000);
        let text = format!("{long}. [Client Name] {long}. {long}");
        let ctx = at(&text, "[Client Name]");
        assert_eq!(ctx.previous_sentence.chars().count(), NEIGHBOUR_CHARS);
        assert_eq!(ctx.containing_sentence.chars().count(), SENTENCE_CHARS);
        assert!(ctx.containing_sentence.starts_with("[Client Name]"));
        assert_eq!(ctx.next_sentence.chars().count(), NEIGHBOUR_CHARS);
    }

    #[test]
    fn empty_text_has_empty_context() {
        assert_eq!(extract_context("", 0, 0), SentenceContext::default());
    }
}
