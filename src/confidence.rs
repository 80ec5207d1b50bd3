use crate::{config, engine::Token, report::ConfidenceStats};

/// Two independent cut-offs: one decides which tokens reach the text, a
/// looser one decides which tokens count as detections.
#[derive(Debug, Clone, Copy)]
pub struct ConfidencePolicy {
    pub include_above: f32,
    pub count_above: f32,
}

impl From<&config::Confidence> for ConfidencePolicy {
    fn from(cfg: &config::Confidence) -> Self {
        Self {
            include_above: cfg.include_above,
            count_above: cfg.count_above,
        }
    }
}

impl Default for ConfidencePolicy {
    fn default() -> Self {
        Self::from(&config::Confidence::default())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Aggregated {
    pub text: String,
    pub stats: ConfidenceStats,
}

pub fn aggregate(policy: ConfidencePolicy, tokens: &[Token]) -> Aggregated {
    let mut included: Vec<&str> = Vec::new();
    let mut sum = 0f64;
    let mut detections = 0usize;

    for token in tokens {
        if token.confidence > policy.count_above {
            sum += token.confidence as f64;
            detections += 1;
        }
        if token.confidence > policy.include_above {
            // Count words the way the final text will: split on any Unicode
            // whitespace and drop pieces made only of ASCII control characters.
            included.extend(
                token
                    .text
                    .split_whitespace()
                    .filter(|w| !w.chars().all(|c| c.is_ascii_control())),
            );
        }
    }

    let average_confidence = if detections == 0 {
        0.0
    } else {
        sum / detections as f64
    };

    Aggregated {
        text: included.join(" "),
        stats: ConfidenceStats {
            average_confidence,
            included_words: included.len(),
            total_detections: detections,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(raw: &[(&str, f32)]) -> Vec<Token> {
        raw.iter().map(|(t, c)| Token::new(*t, *c)).collect()
    }

    #[test]
    fn filters_and_counts_separately() {
        let agg = aggregate(
            ConfidencePolicy::default(),
            &tokens(&[("Invoice", 91.0), ("#", 12.0), ("2024", 60.0), ("", -1.0)]),
        );
        assert_eq!(agg.text, "Invoice 2024");
        assert_eq!(agg.stats.included_words, 2);
        assert_eq!(agg.stats.total_detections, 3);
        assert!((agg.stats.average_confidence - (91.0 + 12.0 + 60.0) / 3.0).abs() < 1e-9);
    }

    #[test]
    fn threshold_is_strict() {
        let agg = aggregate(ConfidencePolicy::default(), &tokens(&[("edge", 30.0), ("in", 30.5)]));
        assert_eq!(agg.text, "in");
    }

    #[test]
    fn all_zero_scores_average_to_zero() {
        let agg = aggregate(ConfidencePolicy::default(), &tokens(&[("a", 0.0), ("b", 0.0), ("c", -1.0)]));
        assert_eq!(agg.stats.average_confidence, 0.0);
        assert_eq!(agg.stats.total_detections, 0);
        assert_eq!(agg.text, "");
    }

    #[test]
    fn included_words_follow_whitespace_inside_tokens() {
        let agg = aggregate(
            ConfidencePolicy::default(),
            &tokens(&[("New\u{a0}York", 88.0), ("\u{7}", 95.0), ("  ", 90.0), ("10\u{2009}kg", 70.0)]),
        );
        assert_eq!(agg.text, "New York 10 kg");
        assert_eq!(agg.stats.included_words, 4);
        assert_eq!(agg.stats.total_detections, 4);
    }

    #[test]
    fn empty_input() {
        let agg = aggregate(ConfidencePolicy::default(), &[]);
        assert_eq!(agg.stats.average_confidence, 0.0);
        assert_eq!(agg.stats.included_words, 0);
    }
}
