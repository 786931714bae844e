//! Keyword lexicon for escalation signals in free-text event notes.

/// Word weights.
///
/// Keys are lowercase single words. Positive values signal escalation,
/// negative values de-escalation. The final score is clamped to `[-1.0, 1.0]`.
pub(crate) const LEXICON: &[(&str, f32)] = &[
    // Escalation
    ("massacre", 0.8),
    ("executed", 0.7),
    ("executions", 0.7),
    ("siege", 0.6),
    ("airstrike", 0.6),
    ("airstrikes", 0.6),
    ("bombing", 0.6),
    ("offensive", 0.5),
    ("shelling", 0.5),
    ("ambush", 0.5),
    ("ambushed", 0.5),
    ("abducted", 0.4),
    ("abduction", 0.4),
    ("drone", 0.4),
    ("mortar", 0.4),
    ("killed", 0.4),
    ("clashes", 0.4),
    ("looting", 0.3),
    ("displaced", 0.3),
    ("mobilization", 0.3),
    ("reinforcements", 0.3),
    ("armed", 0.2),
    // De-escalation
    ("ceasefire", -0.6),
    ("truce", -0.5),
    ("peaceful", -0.4),
    ("negotiations", -0.3),
    ("talks", -0.3),
    ("withdrawal", -0.3),
    ("withdrew", -0.3),
    ("agreement", -0.3),
    ("released", -0.2),
    ("dispersed", -0.2),
];

/// Score a text string for escalation language.
///
/// Splits text into lowercase words, sums matching weights, and clamps
/// the result to `[-1.0, 1.0]`. Returns `0.0` for empty or unknown text.
#[must_use]
pub fn escalation_score(text: &str) -> f32 {
    let mut score = 0.0_f32;
    for word in text.split_whitespace() {
        let w = word
            .trim_matches(|c: char| !c.is_alphabetic())
            .to_lowercase();
        if let Some(&(_, weight)) = LEXICON.iter().find(|(lex_word, _)| *lex_word == w) {
            score += weight;
        }
    }
    score.clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string_returns_zero() {
        assert!(escalation_score("").abs() < f32::EPSILON);
        assert!(escalation_score("   ").abs() < f32::EPSILON);
    }

    #[test]
    fn unknown_text_returns_zero() {
        assert!(escalation_score("the market reopened today").abs() < f32::EPSILON);
    }

    #[test]
    fn escalation_keyword_returns_positive() {
        let score = escalation_score("Heavy shelling reported overnight");
        assert!(score > 0.0, "expected positive score, got {score}");
    }

    #[test]
    fn ceasefire_returns_negative() {
        let score = escalation_score("A ceasefire held through the weekend");
        assert!(score < 0.0, "expected negative score, got {score}");
    }

    #[test]
    fn score_clamps_to_one() {
        let text = "massacre executed siege airstrike bombing offensive shelling";
        assert!((escalation_score(text) - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn punctuation_stripped_from_words() {
        let score = escalation_score("Airstrike!");
        assert!(score > 0.0, "expected positive score for 'Airstrike!', got {score}");
    }
}
