//! Boundary to whatever turns field keys into questions for the user.
//!
//! The engine builds prompts and cleans responses; moving a prompt to a
//! model and back is the transport handed to [`PromptQuestions`]. Without a
//! transport, [`ContextQuestions`] derives a question from the key and the
//! sentence around its first occurrence.

use std::collections::BTreeMap;

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, warn};

use crate::context::SentenceContext;
use crate::detect::DetectionResult;
use crate::normalize::title_case;

const MAX_QUESTION_CHARS: usize = 500;
const SNIPPET_CHARS: usize = 100;
const MAX_OPTION_CHARS: usize = 30;

const GENERIC_PREFIXES: [&str; 3] = ["blank_", "field_", "amount_"];

/// First keyword contained in a field name picks the question.
const KEYWORD_QUESTIONS: [(&str, &str); 12] = [
    ("name", "What is the full name?"),
    ("company", "What is the company name?"),
    ("date", "What is the date? (e.g., January 1, 2024)"),
    ("address", "What is the complete address?"),
    ("email", "What is the email address?"),
    ("phone", "What is the phone number?"),
    ("amount", "What is the amount? (e.g., $1,000.00)"),
    ("title", "What is the title or position?"),
    ("signature", "Who should sign this document?"),
    ("party", "What is the party's name?"),
    ("effective", "What is the effective date?"),
    ("term", "What is the term or duration?"),
];

lazy_static! {
    static ref SLASH_CHOICE: Regex =
        Regex::new(r"\b([A-Z][a-zA-Z]+)\s*/\s*([A-Z][a-zA-Z]+)\b").unwrap();
    static ref PAREN_CHOICES: Regex = Regex::new(r"\(([A-Za-z][A-Za-z0-9 ,/]+)\)").unwrap();
    static ref CHOICE_SEP: Regex = Regex::new(r",|/| or ").unwrap();
}

pub trait QuestionSource {
    fn source_name(&self) -> &str;

    /// Question text for `key`, or `None` when unavailable.
    fn question(&self, key: &str, context: Option<&SentenceContext>) -> Option<String>;
}

/// Always answers with [`fallback_question`].
#[derive(Clone, Copy, Debug, Default)]
pub struct FallbackQuestions;

impl QuestionSource for FallbackQuestions {
    fn source_name(&self) -> &str {
        "fallback"
    }

    fn question(&self, key: &str, _context: Option<&SentenceContext>) -> Option<String> {
        Some(fallback_question(key))
    }
}

/// Conversational questions from the key and its sentence, no model involved.
#[derive(Clone, Copy, Debug, Default)]
pub struct ContextQuestions;

impl QuestionSource for ContextQuestions {
    fn source_name(&self) -> &str {
        "context"
    }

    fn question(&self, key: &str, context: Option<&SentenceContext>) -> Option<String> {
        let sentence = context.map_or("", |c| c.containing_sentence.as_str());
        Some(context_question(key, sentence))
    }
}

pub fn fallback_question(key: &str) -> String {
    format!("Please provide: {}", title_case(key))
}

/// Generated keys (`field_3`, `amount_1`) quote their sentence; named keys
/// get a keyword question or a phrase built from the name.
pub fn context_question(key: &str, sentence: &str) -> String {
    let name = key.replace(['_', '-'], " ");
    let name = name.trim();

    if GENERIC_PREFIXES.iter().any(|p| key.starts_with(p)) {
        let len = sentence.chars().count();
        if len <= 10 {
            return "What information should go in this field?".to_string();
        }
        let mut snippet: String = sentence.chars().take(SNIPPET_CHARS).collect();
        if len > SNIPPET_CHARS {
            snippet.push_str("...");
        }
        return format!("What should be filled in here?\n\nContext: \"{snippet}\"");
    }

    let words = name.split_whitespace().count();
    let lower = name.to_lowercase();
    if let Some((_, question)) = KEYWORD_QUESTIONS.iter().find(|(kw, _)| lower.contains(*kw)) {
        return if words > 1 {
            format!("What is the {name}?")
        } else {
            question.to_string()
        };
    }
    if words == 1 {
        format!("What is the {name}?")
    } else {
        format!("Please provide the {name}:")
    }
}

/// Choices offered by the sentence itself: `Yes/No` or a parenthesised list
/// of two to six short items.
pub fn extract_options(sentence: &str) -> Option<Vec<String>> {
    let s = sentence.trim();
    if let Some(cap) = SLASH_CHOICE.captures(s) {
        return Some(vec![cap[1].to_string(), cap[2].to_string()]);
    }
    let inner = PAREN_CHOICES.captures(s)?.get(1)?.as_str();
    let parts: Vec<String> = CHOICE_SEP
        .split(inner)
        .map(str::trim)
        .filter(|p| !p.is_empty() && p.chars().count() <= MAX_OPTION_CHARS)
        .map(str::to_string)
        .collect();
    (2..=6).contains(&parts.len()).then_some(parts)
}

pub fn build_prompt(key: &str, context: Option<&SentenceContext>) -> String {
    let mut prompt = String::from(
        "Convert this placeholder name into a clear, professional question for a legal document.\n\
         The question should:\n\
         - Be concise (one sentence)\n\
         - Be professional and formal in tone\n\
         - Clearly indicate what information is needed\n\
         - Be suitable for a legal document context\n\n",
    );
    prompt.push_str(&format!("Placeholder name: {key}\n"));
    if let Some(ctx) = context {
        for (label, sentence) in [
            ("Previous sentence", &ctx.previous_sentence),
            ("Sentence", &ctx.containing_sentence),
            ("Next sentence", &ctx.next_sentence),
        ] {
            if !sentence.is_empty() {
                prompt.push_str(&format!("{label}: {sentence}\n"));
            }
        }
    }
    prompt.push_str("\nGenerate only the question, nothing else:");
    prompt
}

pub fn build_batch_prompt(keys: &[&str]) -> String {
    let list = keys
        .iter()
        .enumerate()
        .map(|(i, k)| format!("{}. {}", i + 1, k))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "Convert these placeholder names into clear, professional questions for a legal document.\n\n\
         Instructions:\n\
         - Generate one question per placeholder\n\
         - Keep questions concise (one sentence each)\n\
         - Use professional and formal tone\n\
         - Clearly indicate what information is needed\n\
         - Number each question to match the placeholder number\n\
         - Format: \"1. [question]\" for each line\n\n\
         Placeholders:\n{list}\n\n\
         Generate the questions (numbered 1-{}):",
        keys.len()
    )
}

/// Trim, strip wrapping quotes and end with punctuation. `None` when
/// nothing usable is left or the text is implausibly long.
pub fn clean_question(raw: &str) -> Option<String> {
    let q = raw.trim().trim_matches(|c| c == '"' || c == '\'').trim();
    if q.is_empty() {
        return None;
    }
    let mut q = q.to_string();
    if !q.ends_with(['?', '.', '!']) {
        q.push('?');
    }
    (q.chars().count() <= MAX_QUESTION_CHARS).then_some(q)
}

fn numbered_line(line: &str, n: usize) -> Option<&str> {
    let n = n.to_string();
    let rest = line.strip_prefix(n.as_str())?;
    [".", ")", ":", " -"]
        .iter()
        .find_map(|sep| rest.strip_prefix(sep))
}

/// Match a numbered batch response back to `keys`. Keys without a usable
/// line get the fallback question.
pub fn parse_numbered_questions(response: &str, keys: &[&str]) -> BTreeMap<String, String> {
    let lines: Vec<&str> = response.lines().map(str::trim).collect();
    keys.iter()
        .enumerate()
        .map(|(i, key)| {
            let question = lines
                .iter()
                .filter_map(|line| numbered_line(line, i + 1))
                .find_map(clean_question)
                .unwrap_or_else(|| fallback_question(key));
            (key.to_string(), question)
        })
        .collect()
}

/// Questions written by a model behind `transport`, which takes a prompt and
/// returns the raw reply, or `None` when the call failed.
pub struct PromptQuestions<F> {
    transport: F,
}

impl<F: Fn(&str) -> Option<String>> PromptQuestions<F> {
    pub fn new(transport: F) -> Self {
        Self { transport }
    }

    /// One batch prompt for every field. When the transport fails, every
    /// field falls back to [`context_question`].
    pub fn batch_questions_for(&self, result: &DetectionResult) -> Vec<FieldQuestion> {
        let keys = result.keys_in_document_order();
        let parsed = (self.transport)(&build_batch_prompt(&keys))
            .map(|reply| parse_numbered_questions(&reply, &keys));
        if parsed.is_none() {
            warn!(fields = keys.len(), "batch question request failed");
        }
        assemble(result, "prompt", |key, _| {
            parsed.as_ref().and_then(|p| p.get(key).cloned())
        })
    }
}

impl<F: Fn(&str) -> Option<String>> QuestionSource for PromptQuestions<F> {
    fn source_name(&self) -> &str {
        "prompt"
    }

    fn question(&self, key: &str, context: Option<&SentenceContext>) -> Option<String> {
        let reply = (self.transport)(&build_prompt(key, context))?;
        clean_question(&reply)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FieldQuestion {
    pub key: String,
    pub question: String,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
}

fn assemble<Q>(result: &DetectionResult, source: &str, ask: Q) -> Vec<FieldQuestion>
where
    Q: Fn(&str, Option<&SentenceContext>) -> Option<String>,
{
    result
        .keys_in_document_order()
        .into_iter()
        .map(|key| {
            let context = result.first_instance(key).map(|i| &i.context);
            let sentence = context.map_or("", |c| c.containing_sentence.as_str());
            let question = ask(key, context).unwrap_or_else(|| {
                warn!(key, source, "no usable question, using context fallback");
                context_question(key, sentence)
            });
            debug!(key, question = %question, "question ready");
            FieldQuestion {
                key: key.to_string(),
                question,
                count: result.fields.get(key).map_or(0, |f| f.count),
                options: extract_options(sentence),
            }
        })
        .collect()
}

/// One question per detected field in document order, asked with the
/// context of the field's first occurrence.
pub fn questions_for(result: &DetectionResult, source: &dyn QuestionSource) -> Vec<FieldQuestion> {
    assemble(result, source.source_name(), |key, context| source.question(key, context))
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::detect::detect;
    use crate::document::TextDocument;

    #[test]
    fn fallback_is_title_cased() {
        assert_eq!(fallback_question("client_name"), "Please provide: Client Name");
        assert_eq!(fallback_question("field_2"), "Please provide: Field 2");
    }

    #[test]
    fn fallback_source_passes_through_unchanged() {
        let result = detect(&TextDocument::new().with_paragraph("{{CLIENT_NAME}}"));
        let qs = questions_for(&result, &FallbackQuestions);
        assert_eq!(qs[0].question, "Please provide: Client Name");
    }

    #[test]
    fn context_questions_for_named_keys() {
        assert_eq!(context_question("email", ""), "What is the email address?");
        assert_eq!(context_question("client_name", ""), "What is the client name?");
        assert_eq!(context_question("jurisdiction", ""), "What is the jurisdiction?");
        assert_eq!(
            context_question("governing_law_state", ""),
            "Please provide the governing law state:"
        );
    }

    #[test]
    fn context_questions_quote_the_sentence_for_generated_keys() {
        assert_eq!(
            context_question("field_3", "Signed this ____ day of May."),
            "What should be filled in here?\n\nContext: \"Signed this ____ day of May.\""
        );
        assert_eq!(
            context_question("amount_1", "$[___]"),
            "What information should go in this field?"
        );

        let long = "x".repeat(150);
        let q = context_question("blank_1", &long);
        assert!(q.ends_with(&format!("{}...\"", "x".repeat(100))));
    }

    #[test]
    fn options_from_sentences() {
        assert_eq!(
            extract_options("Is the buyer a resident? Yes/No ____"),
            Some(vec!["Yes".to_string(), "No".to_string()])
        );
        assert_eq!(
            extract_options("Delivery by ____ (Air, Sea or Road)."),
            Some(vec!["Air".to_string(), "Sea".to_string(), "Road".to_string()])
        );
        assert_eq!(extract_options("Name (required) ____"), None);
        assert_eq!(extract_options(""), None);
    }

    #[test]
    fn cleans_model_output() {
        assert_eq!(
            clean_question("  \"What is the client's name\" "),
            Some("What is the client's name?".into())
        );
        assert_eq!(clean_question("Provide the date."), Some("Provide the date.".into()));
        assert_eq!(clean_question(" '' "), None);
        assert_eq!(clean_question(&"x".repeat(600)), None);
    }

    #[test]
    fn parses_numbered_batches() {
        let response = "1. What is the client's name?\n2) When is it signed\n\n4 - unused";
        let parsed = parse_numbered_questions(response, &["client_name", "signing_date", "amount"]);
        assert_eq!(parsed["client_name"], "What is the client's name?");
        assert_eq!(parsed["signing_date"], "When is it signed?");
        assert_eq!(parsed["amount"], "Please provide: Amount");
    }

    #[test]
    fn does_not_confuse_one_with_ten() {
        let keys: Vec<String> = (1..=10).map(|i| format!("k{i}")).collect();
        let keys: Vec<&str> = keys.iter().map(String::as_str).collect();
        let parsed = parse_numbered_questions("10. Tenth?", &keys);
        assert_eq!(parsed["k1"], "Please provide: K1");
        assert_eq!(parsed["k10"], "Tenth?");
    }

    #[test]
    fn prompts_mention_keys_and_context() {
        let ctx = SentenceContext {
            previous_sentence: String::new(),
            containing_sentence: "Signed by {{NAME}}.".into(),
            next_sentence: "Done.".into(),
        };
        let p = build_prompt("name", Some(&ctx));
        assert!(p.contains("Placeholder name: name\n"));
        assert!(p.contains("Sentence: Signed by {{NAME}}.\n"));
        assert!(!p.contains("Previous sentence"));

        let batch = build_batch_prompt(&["a_b", "c_d"]);
        assert!(batch.contains("1. a_b\n2. c_d"));
        assert!(batch.ends_with("(numbered 1-2):"));
    }

    struct Canned;

    impl QuestionSource for Canned {
        fn source_name(&self) -> &str {
            "canned"
        }

        fn question(&self, key: &str, context: Option<&SentenceContext>) -> Option<String> {
            match key {
                "client_name" => {
                    context.map(|c| format!("Who is named in: {}", c.containing_sentence))
                }
                _ => None,
            }
        }
    }

    #[test]
    fn questions_follow_document_order_and_fall_back() {
        let doc = TextDocument::new()
            .with_paragraph("Dated [Effective Date].")
            .with_paragraph("Between {{CLIENT_NAME}} and {{CLIENT_NAME}}.");
        let result = detect(&doc);

        let qs = questions_for(&result, &Canned);
        assert_eq!(qs.len(), 2);
        assert_eq!(qs[0].key, "effective_date");
        assert_eq!(qs[0].question, "What is the effective date?");
        assert_eq!(
            qs[1].question,
            "Who is named in: Between {{CLIENT_NAME}} and {{CLIENT_NAME}}."
        );
        assert_eq!(qs[1].count, 2);

        let plain = questions_for(&result, &FallbackQuestions);
        assert_eq!(plain[1].question, "Please provide: Client Name");
    }

    #[test]
    fn generated_keys_get_their_sentence_and_options() {
        let doc = TextDocument::new().with_paragraph("Ship by ____ (Air, Sea).");
        let qs = questions_for(&detect(&doc), &ContextQuestions);
        assert_eq!(qs[0].key, "field_1");
        assert_eq!(
            qs[0].question,
            "What should be filled in here?\n\nContext: \"Ship by ____ (Air, Sea).\""
        );
        assert_eq!(qs[0].options, Some(vec!["Air".to_string(), "Sea".to_string()]));
    }

    #[test]
    fn prompt_source_cleans_replies_and_sends_context() {
        let seen = RefCell::new(Vec::new());
        let source = PromptQuestions::new(|prompt: &str| {
            seen.borrow_mut().push(prompt.to_string());
            Some("\"What is the client's legal name\"".to_string())
        });
        let result = detect(&TextDocument::new().with_paragraph("Between {{CLIENT_NAME}} and us."));

        let qs = questions_for(&result, &source);
        assert_eq!(qs[0].question, "What is the client's legal name?");
        assert!(seen.borrow()[0].contains("Sentence: Between {{CLIENT_NAME}} and us.\n"));
    }

    #[test]
    fn prompt_source_falls_back_when_transport_fails() {
        let source = PromptQuestions::new(|_: &str| None);
        let result = detect(&TextDocument::new().with_paragraph("Contact: {{EMAIL}}"));
        assert_eq!(questions_for(&result, &source)[0].question, "What is the email address?");
    }

    #[test]
    fn batch_questions_use_one_numbered_reply() {
        let calls = RefCell::new(0);
        let source = PromptQuestions::new(|prompt: &str| {
            *calls.borrow_mut() += 1;
            assert!(prompt.contains("1. effective_date\n2. client_name"));
            Some("1. When does the agreement take effect?\n2) Who is the client".to_string())
        });
        let doc = TextDocument::new()
            .with_paragraph("Dated [Effective Date].")
            .with_paragraph("Between {{CLIENT_NAME}}.");

        let qs = source.batch_questions_for(&detect(&doc));
        assert_eq!(*calls.borrow(), 1);
        assert_eq!(qs[0].question, "When does the agreement take effect?");
        assert_eq!(qs[1].question, "Who is the client?");

        let failing = PromptQuestions::new(|_: &str| None);
        let qs = failing.batch_questions_for(&detect(&doc));
        assert_eq!(qs[1].question, "What is the client name?");
    }
}
