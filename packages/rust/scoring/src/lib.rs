//! Relevance scoring for leads and research sources.
//!
//! One pure function shared by both consumers: deterministic (same
//! inputs, same output — tests may assert exact values), clamped to
//! `[0, 1]`, and monotonic in each positive signal. Stateless and
//! freely shared across concurrent runs.

use serde::{Deserialize, Serialize};

/// Follower count at which the follower component saturates at 1.0.
const FOLLOWER_SATURATION: f64 = 100_000.0;

/// Engagement rate multiplier; a 5% rate saturates the component.
const ENGAGEMENT_SCALE: f64 = 20.0;

/// Distinct keyword overlaps at which the overlap component saturates.
const OVERLAP_SATURATION: f64 = 5.0;

/// Raw signals for one lead or research source.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScoreInputs {
    /// Follower or member count (0 for non-profile sources).
    pub follower_count: u64,
    /// Engagement rate in `[0, 1]`.
    pub engagement_rate: f64,
    /// Distinct topic keywords found in the candidate's text.
    pub keyword_overlap: u32,
    /// Optional recency signal in `[0, 1]` (1.0 = just active).
    /// Absent means unknown, which is never a penalty.
    pub recency: Option<f64>,
}

/// Relative weight of each signal. Policy, not protocol — callers may
/// tune these; the defaults favor engagement over raw audience size.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ScoreWeights {
    #[serde(default = "default_follower_weight")]
    pub followers: f64,
    #[serde(default = "default_engagement_weight")]
    pub engagement: f64,
    #[serde(default = "default_overlap_weight")]
    pub overlap: f64,
    #[serde(default = "default_recency_weight")]
    pub recency: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            followers: default_follower_weight(),
            engagement: default_engagement_weight(),
            overlap: default_overlap_weight(),
            recency: default_recency_weight(),
        }
    }
}

fn default_follower_weight() -> f64 {
    0.25
}
fn default_engagement_weight() -> f64 {
    0.35
}
fn default_overlap_weight() -> f64 {
    0.25
}
fn default_recency_weight() -> f64 {
    0.15
}

fn clamp01(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

/// Compute a normalized relevance score in `[0, 1]`.
///
/// Each signal maps to a `min(x / saturation, 1)` component; the score
/// is the weight-normalized mean over *present* components. A missing
/// recency signal is excluded from the denominator rather than
/// substituted, so omitting it never moves the score.
pub fn relevance_score(inputs: &ScoreInputs, weights: &ScoreWeights) -> f64 {
    let follower_component = clamp01(inputs.follower_count as f64 / FOLLOWER_SATURATION);
    let engagement_component = clamp01(inputs.engagement_rate * ENGAGEMENT_SCALE);
    let overlap_component = clamp01(f64::from(inputs.keyword_overlap) / OVERLAP_SATURATION);

    let mut weighted_sum = weights.followers * follower_component
        + weights.engagement * engagement_component
        + weights.overlap * overlap_component;
    let mut weight_total = weights.followers + weights.engagement + weights.overlap;

    if let Some(recency) = inputs.recency {
        weighted_sum += weights.recency * clamp01(recency);
        weight_total += weights.recency;
    }

    if weight_total <= 0.0 {
        return 0.0;
    }

    clamp01(weighted_sum / weight_total)
}

/// Count distinct topic keywords that occur in `text`.
///
/// Tokens are lowercased alphanumeric words of two or more characters
/// (so "AI" counts); the same normalization applies to both sides, so
/// ranking leads and research sources uses identical overlap semantics.
pub fn keyword_overlap(topic: &str, text: &str) -> u32 {
    let text_tokens: std::collections::BTreeSet<String> = tokenize(text).collect();

    tokenize(topic)
        .collect::<std::collections::BTreeSet<String>>()
        .iter()
        .filter(|token| text_tokens.contains(*token))
        .count() as u32
}

fn tokenize(input: &str) -> impl Iterator<Item = String> + '_ {
    input
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| word.len() >= 2)
        .map(|word| word.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score(inputs: &ScoreInputs) -> f64 {
        relevance_score(inputs, &ScoreWeights::default())
    }

    #[test]
    fn deterministic_exact_equality() {
        let inputs = ScoreInputs {
            follower_count: 42_000,
            engagement_rate: 0.031,
            keyword_overlap: 2,
            recency: Some(0.8),
        };
        assert_eq!(score(&inputs), score(&inputs));
    }

    #[test]
    fn clamped_to_unit_interval() {
        let max = ScoreInputs {
            follower_count: u64::MAX,
            engagement_rate: 1.0,
            keyword_overlap: u32::MAX,
            recency: Some(5.0),
        };
        let value = score(&max);
        assert!(value <= 1.0, "score {value} above 1.0");
        assert_eq!(value, 1.0);

        assert_eq!(score(&ScoreInputs::default()), 0.0);
    }

    #[test]
    fn monotonic_in_followers() {
        let mut inputs = ScoreInputs {
            follower_count: 0,
            engagement_rate: 0.02,
            keyword_overlap: 1,
            recency: None,
        };
        let mut previous = score(&inputs);
        for followers in [100, 10_000, 50_000, 100_000, 1_000_000] {
            inputs.follower_count = followers;
            let current = score(&inputs);
            assert!(current >= previous, "score decreased at {followers} followers");
            previous = current;
        }
    }

    #[test]
    fn monotonic_in_engagement() {
        let mut inputs = ScoreInputs {
            follower_count: 20_000,
            engagement_rate: 0.0,
            keyword_overlap: 3,
            recency: Some(0.5),
        };
        let mut previous = score(&inputs);
        for rate in [0.005, 0.01, 0.03, 0.05, 0.2, 1.0] {
            inputs.engagement_rate = rate;
            let current = score(&inputs);
            assert!(current >= previous, "score decreased at rate {rate}");
            previous = current;
        }
    }

    #[test]
    fn monotonic_in_overlap() {
        let mut inputs = ScoreInputs::default();
        let mut previous = score(&inputs);
        for overlap in 1..=8 {
            inputs.keyword_overlap = overlap;
            let current = score(&inputs);
            assert!(current >= previous, "score decreased at overlap {overlap}");
            previous = current;
        }
    }

    #[test]
    fn missing_recency_is_not_a_penalty() {
        let with_zero_recency = ScoreInputs {
            follower_count: 50_000,
            engagement_rate: 0.04,
            keyword_overlap: 3,
            recency: Some(0.0),
        };
        let without = ScoreInputs {
            recency: None,
            ..with_zero_recency
        };
        // Excluding the signal beats scoring it as zero.
        assert!(score(&without) > score(&with_zero_recency));
    }

    #[test]
    fn known_value_from_component_formulas() {
        // follower 50k → 0.5, engagement 0.025 → 0.5, overlap 0 → 0.0
        let inputs = ScoreInputs {
            follower_count: 50_000,
            engagement_rate: 0.025,
            keyword_overlap: 0,
            recency: None,
        };
        let weights = ScoreWeights::default();
        let expected = (0.25 * 0.5 + 0.35 * 0.5) / (0.25 + 0.35 + 0.25);
        assert_eq!(relevance_score(&inputs, &weights), expected);
    }

    #[test]
    fn zero_weights_yield_zero() {
        let weights = ScoreWeights {
            followers: 0.0,
            engagement: 0.0,
            overlap: 0.0,
            recency: 0.0,
        };
        let inputs = ScoreInputs {
            follower_count: 100_000,
            engagement_rate: 1.0,
            keyword_overlap: 10,
            recency: Some(1.0),
        };
        assert_eq!(relevance_score(&inputs, &weights), 0.0);
    }

    #[test]
    fn overlap_counts_distinct_matches() {
        assert_eq!(keyword_overlap("AI productivity tools", "Top AI tools for 2025"), 2);
        assert_eq!(keyword_overlap("AI tools", "nothing related here"), 0);
        // Repeats in the text don't inflate the count.
        assert_eq!(keyword_overlap("rust", "rust rust rust"), 1);
        // Single-character tokens are ignored on both sides.
        assert_eq!(keyword_overlap("a", "a a a"), 0);
    }

    #[test]
    fn overlap_is_case_insensitive() {
        assert_eq!(
            keyword_overlap("Machine Learning", "MACHINE learning digest"),
            2
        );
    }
}
