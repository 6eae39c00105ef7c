//! Lexicon-based headline sentiment
//!
//! Scores financial news text against a small word list. A transformer model
//! can stand in through the [`SentimentScorer`] trait.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Scores below this magnitude are labelled neutral
const NEUTRAL_BAND: f64 = 0.05;

/// Weight kept when a negation flips a term
const NEGATION_DAMPING: f64 = 0.5;

/// Anything that maps text to a sentiment value in `[-1, 1]`
pub trait SentimentScorer: Send + Sync {
    fn score(&self, text: &str) -> f64;

    fn name(&self) -> &str;
}

/// Sentiment estimate for one text
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentScore {
    /// From -1.0 (negative) to 1.0 (positive)
    pub score: f64,
    /// From 0.0 to 1.0
    pub confidence: f64,
    /// Number of lexicon terms that matched
    pub matched_terms: usize,
}

impl SentimentScore {
    /// Score for text without any lexicon match
    pub fn neutral() -> Self {
        Self {
            score: 0.0,
            confidence: 0.0,
            matched_terms: 0,
        }
    }

    pub fn is_positive(&self) -> bool {
        self.score > NEUTRAL_BAND
    }

    pub fn is_negative(&self) -> bool {
        self.score < -NEUTRAL_BAND
    }

    pub fn is_neutral(&self) -> bool {
        !self.is_positive() && !self.is_negative()
    }

    pub fn label(&self) -> &'static str {
        if self.is_positive() {
            "positive"
        } else if self.is_negative() {
            "negative"
        } else {
            "neutral"
        }
    }
}

impl Default for SentimentScore {
    fn default() -> Self {
        Self::neutral()
    }
}

/// Dictionary analyzer tuned for company news headlines
pub struct LexiconAnalyzer {
    /// Term weights, positive and negative
    lexicon: HashMap<String, f64>,
    /// Multipliers applied to the next scored term
    intensifiers: HashMap<String, f64>,
    negations: Vec<String>,
}

impl Default for LexiconAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl LexiconAnalyzer {
    /// Create an analyzer with the built-in financial lexicon
    pub fn new() -> Self {
        let mut lexicon = HashMap::new();

        for (word, weight) in [
            ("beat", 0.7),
            ("beats", 0.7),
            ("surge", 0.8),
            ("surges", 0.8),
            ("soar", 0.8),
            ("soars", 0.8),
            ("rally", 0.7),
            ("rallies", 0.7),
            ("gain", 0.5),
            ("gains", 0.5),
            ("growth", 0.5),
            ("grows", 0.5),
            ("record", 0.5),
            ("profit", 0.6),
            ("profits", 0.6),
            ("upgrade", 0.7),
            ("upgrades", 0.7),
            ("strong", 0.5),
            ("robust", 0.6),
            ("optimistic", 0.6),
            ("bullish", 0.8),
            ("outperform", 0.6),
            ("exceeds", 0.6),
            ("boost", 0.5),
            ("boosts", 0.5),
            ("rise", 0.4),
            ("rises", 0.4),
            ("jump", 0.6),
            ("jumps", 0.6),
            ("breakthrough", 0.7),
            ("recovery", 0.5),
            ("solid", 0.4),
            ("dividend", 0.3),
            ("partnership", 0.3),
            ("approval", 0.5),
        ] {
            lexicon.insert(word.to_string(), weight);
        }

        for (word, weight) in [
            ("miss", -0.7),
            ("misses", -0.7),
            ("plunge", -0.8),
            ("plunges", -0.8),
            ("tumble", -0.7),
            ("tumbles", -0.7),
            ("fall", -0.5),
            ("falls", -0.5),
            ("drop", -0.5),
            ("drops", -0.5),
            ("decline", -0.5),
            ("declines", -0.5),
            ("loss", -0.6),
            ("losses", -0.6),
            ("downgrade", -0.7),
            ("downgrades", -0.7),
            ("weak", -0.5),
            ("bearish", -0.8),
            ("lawsuit", -0.6),
            ("investigation", -0.6),
            ("probe", -0.6),
            ("fraud", -0.9),
            ("recall", -0.6),
            ("layoffs", -0.6),
            ("cuts", -0.4),
            ("concern", -0.5),
            ("concerns", -0.5),
            ("risk", -0.3),
            ("risks", -0.3),
            ("slump", -0.7),
            ("crash", -0.9),
            ("underperform", -0.6),
            ("warning", -0.6),
            ("warns", -0.6),
            ("bankruptcy", -0.95),
            ("selloff", -0.7),
            ("antitrust", -0.5),
            ("weigh", -0.3),
            ("weighs", -0.3),
        ] {
            lexicon.insert(word.to_string(), weight);
        }

        let intensifiers = [
            ("very", 1.5),
            ("extremely", 2.0),
            ("sharply", 1.5),
            ("significantly", 1.4),
            ("strongly", 1.3),
            ("slightly", 0.5),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), *v))
        .collect();

        let negations = [
            "not", "no", "never", "don't", "doesn't", "didn't", "isn't", "aren't", "wasn't",
            "weren't", "won't", "can't", "cannot", "without",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        Self {
            lexicon,
            intensifiers,
            negations,
        }
    }

    /// Add or override a lexicon term
    pub fn with_term(mut self, word: &str, weight: f64) -> Self {
        self.lexicon
            .insert(word.to_lowercase(), weight.clamp(-1.0, 1.0));
        self
    }

    /// Analyze one text
    pub fn analyze(&self, text: &str) -> SentimentScore {
        let lowered = text.to_lowercase();
        let words = lowered
            .split(|c: char| !(c.is_alphanumeric() || c == '\''))
            .map(|w| w.trim_matches('\''))
            .filter(|w| !w.is_empty());

        let mut total = 0.0;
        let mut matched = 0usize;
        let mut negated = false;
        let mut intensity = 1.0;

        for word in words {
            if self.negations.iter().any(|n| n == word) {
                negated = true;
                continue;
            }
            if let Some(&factor) = self.intensifiers.get(word) {
                intensity = factor;
                continue;
            }
            if let Some(&weight) = self.lexicon.get(word) {
                let mut value = weight * intensity;
                if negated {
                    value = -value * NEGATION_DAMPING;
                }
                total += value;
                matched += 1;

                negated = false;
                intensity = 1.0;
            }
        }

        if matched == 0 {
            return SentimentScore::neutral();
        }

        let score = (total / matched as f64).clamp(-1.0, 1.0);
        SentimentScore {
            score,
            confidence: (0.5 + 0.5 * score.abs()).min(1.0),
            matched_terms: matched,
        }
    }

    pub fn analyze_batch(&self, texts: &[&str]) -> Vec<SentimentScore> {
        texts.iter().map(|text| self.analyze(text)).collect()
    }
}

impl SentimentScorer for LexiconAnalyzer {
    fn score(&self, text: &str) -> f64 {
        self.analyze(text).score
    }

    fn name(&self) -> &str {
        "lexicon"
    }
}

/// Scorer that returns the same value for every text
#[derive(Debug, Clone, Copy)]
pub struct FixedScorer(pub f64);

impl SentimentScorer for FixedScorer {
    fn score(&self, _text: &str) -> f64 {
        self.0.clamp(-1.0, 1.0)
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_positive_headline() {
        let analyzer = LexiconAnalyzer::new();
        let score = analyzer.analyze("Apple beats estimates, shares surge to record");
        assert!(score.is_positive());
        assert_eq!(score.matched_terms, 3);
        assert_relative_eq!(score.score, (0.7 + 0.8 + 0.5) / 3.0);
        assert_eq!(score.label(), "positive");
    }

    #[test]
    fn test_negative_headline() {
        let analyzer = LexiconAnalyzer::new();
        let score = analyzer.analyze("Regulators open fraud investigation; stock plunges");
        assert!(score.is_negative());
        assert!(score.score < -0.5);
    }

    #[test]
    fn test_no_match_is_zero() {
        let analyzer = LexiconAnalyzer::new();
        let score = analyzer.analyze("Company to hold annual meeting on Tuesday");
        assert_eq!(score.score, 0.0);
        assert_eq!(score.confidence, 0.0);
        assert!(score.is_neutral());
        assert_eq!(analyzer.score(""), 0.0);
    }

    #[test]
    fn test_negation_and_intensifier() {
        let analyzer = LexiconAnalyzer::new();

        assert_relative_eq!(analyzer.score("Results were strong"), 0.5);
        assert_relative_eq!(analyzer.score("Results weren't strong"), -0.25);
        assert_relative_eq!(analyzer.score("Shares fall sharply"), -0.5);
        assert_relative_eq!(analyzer.score("Shares sharply fall"), -0.75);
    }

    #[test]
    fn test_scores_stay_bounded() {
        let analyzer = LexiconAnalyzer::new().with_term("skyrockets", 5.0);
        let score = analyzer.score("Extremely bullish as stock extremely skyrockets");
        assert!(score <= 1.0);
        assert!(FixedScorer(3.0).score("anything") <= 1.0);
    }
}
