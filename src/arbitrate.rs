use tracing::debug;

use crate::patterns::RawMatch;

/// Reduce overlapping candidates from one paragraph to a non-overlapping set.
///
/// Candidates are swept by start offset; at equal starts the higher priority
/// kind goes first, then the longer span. A candidate overlapping anything
/// already kept is dropped. The order is total, so repeated runs over the
/// same text keep the same matches in the same order.
pub fn arbitrate(mut candidates: Vec<RawMatch>) -> Vec<RawMatch> {
    candidates.sort_by(|a, b| {
        a.start
            .cmp(&b.start)
            .then_with(|| b.kind.priority().cmp(&a.kind.priority()))
            .then_with(|| b.len().cmp(&a.len()))
    });

    let mut kept: Vec<RawMatch> = Vec::with_capacity(candidates.len());
    for c in candidates {
        if kept.iter().any(|k| k.overlaps(&c)) {
            debug!(
                kind = c.kind.as_str(),
                start = c.start,
                end = c.end,
                "dropped overlapping match"
            );
            continue;
        }
        kept.push(c);
    }
    kept
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::patterns::strategies::paragraph;
    use crate::patterns::{find_matches, PatternKind};

    fn spans(text: &str) -> Vec<(PatternKind, &str)> {
        arbitrate(find_matches(text))
            .into_iter()
            .map(|m| (m.kind, &text[m.start..m.end]))
            .collect()
    }

    #[test]
    fn double_curly_beats_inner_single_curly() {
        assert_eq!(spans("{{X}}"), vec![(PatternKind::DoubleCurly, "{{X}}")]);
    }

    #[test]
    fn dollar_blank_swallows_its_underscores() {
        assert_eq!(
            spans("Price $[_____] due"),
            vec![(PatternKind::DollarUnderscore, "$[_____]")]
        );
    }

    #[test]
    fn signature_line_swallows_its_leaders() {
        assert_eq!(
            spans("Name: ________"),
            vec![(PatternKind::SignatureLabel, "Name: ________")]
        );
    }

    #[test]
    fn keeps_disjoint_matches_in_order() {
        assert_eq!(
            spans("{{A}} then [Party Name] then ____"),
            vec![
                (PatternKind::DoubleCurly, "{{A}}"),
                (PatternKind::SquareBracket, "[Party Name]"),
                (PatternKind::Underscore, "____"),
            ]
        );
    }

    proptest! {
        #[test]
        fn output_never_overlaps(text in paragraph()) {
            let kept = arbitrate(find_matches(&text));
            for (i, a) in kept.iter().enumerate() {
                for b in &kept[i + 1..] {
                    prop_assert!(!a.overlaps(b), "{:?} overlaps {:?}", a, b);
                }
            }
        }

        #[test]
        fn ignores_input_order(text in paragraph()) {
            let mut reversed = find_matches(&text);
            reversed.reverse();
            prop_assert_eq!(arbitrate(find_matches(&text)), arbitrate(reversed));
        }
    }
}
