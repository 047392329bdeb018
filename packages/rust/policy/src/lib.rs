//! Static per-platform publishing constraints.
//!
//! The policy table is immutable and freely shared read-only across
//! concurrent pipeline runs. The content stage uses it to validate its
//! own output; the orchestrator enforces the max-length invariant as a
//! hard gate, because downstream publishing would otherwise fail.

use std::ops::RangeInclusive;

use serde::Serialize;

use creatorflow_shared::{ContentDraft, Platform};

/// Publishing constraints for one platform.
#[derive(Debug, Clone, Serialize)]
pub struct PlatformPolicy {
    pub platform: Platform,
    /// Hard upper bound on body length, in characters.
    pub max_body_length: usize,
    /// Conventional hashtag count range (inclusive).
    pub hashtag_min: usize,
    pub hashtag_max: usize,
    /// Hint forwarded to generation for tone adaptation.
    pub tone_hint: &'static str,
}

impl PlatformPolicy {
    /// The conventional hashtag range as an inclusive range.
    pub fn hashtag_range(&self) -> RangeInclusive<usize> {
        self.hashtag_min..=self.hashtag_max
    }
}

static LINKEDIN: PlatformPolicy = PlatformPolicy {
    platform: Platform::LinkedIn,
    max_body_length: 3000,
    hashtag_min: 3,
    hashtag_max: 5,
    tone_hint: "professional",
};

static TWITTER: PlatformPolicy = PlatformPolicy {
    platform: Platform::Twitter,
    max_body_length: 280,
    hashtag_min: 1,
    hashtag_max: 3,
    tone_hint: "conversational",
};

static INSTAGRAM: PlatformPolicy = PlatformPolicy {
    platform: Platform::Instagram,
    max_body_length: 2200,
    hashtag_min: 5,
    hashtag_max: 10,
    tone_hint: "visual",
};

static YOUTUBE: PlatformPolicy = PlatformPolicy {
    platform: Platform::YouTube,
    max_body_length: 5000,
    hashtag_min: 3,
    hashtag_max: 7,
    tone_hint: "engaging",
};

static NEWSLETTER: PlatformPolicy = PlatformPolicy {
    platform: Platform::Newsletter,
    max_body_length: 10_000,
    hashtag_min: 0,
    hashtag_max: 0,
    tone_hint: "informative",
};

static BLOG: PlatformPolicy = PlatformPolicy {
    platform: Platform::Blog,
    max_body_length: 15_000,
    hashtag_min: 3,
    hashtag_max: 8,
    tone_hint: "comprehensive",
};

/// Look up the policy for a platform. Total over the closed enum.
pub fn policy_for(platform: Platform) -> &'static PlatformPolicy {
    match platform {
        Platform::LinkedIn => &LINKEDIN,
        Platform::Twitter => &TWITTER,
        Platform::Instagram => &INSTAGRAM,
        Platform::YouTube => &YOUTUBE,
        Platform::Newsletter => &NEWSLETTER,
        Platform::Blog => &BLOG,
    }
}

/// The full policy table in display order.
pub fn all_policies() -> impl Iterator<Item = &'static PlatformPolicy> {
    Platform::ALL.iter().map(|p| policy_for(*p))
}

/// A draft's violation of its platform policy.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PolicyViolation {
    #[error("{platform}: body length {actual} exceeds maximum {max}")]
    BodyTooLong {
        platform: Platform,
        actual: usize,
        max: usize,
    },

    #[error("{platform}: {actual} hashtags outside conventional range {min}..={max}")]
    HashtagCount {
        platform: Platform,
        actual: usize,
        min: usize,
        max: usize,
    },
}

/// Validate a draft against its platform's policy.
///
/// Body length is measured in characters, matching the platform limits.
pub fn validate_draft(draft: &ContentDraft) -> Result<(), PolicyViolation> {
    let policy = policy_for(draft.platform);

    let body_len = draft.body.chars().count();
    if body_len > policy.max_body_length {
        return Err(PolicyViolation::BodyTooLong {
            platform: draft.platform,
            actual: body_len,
            max: policy.max_body_length,
        });
    }

    if !policy.hashtag_range().contains(&draft.hashtags.len()) {
        return Err(PolicyViolation::HashtagCount {
            platform: draft.platform,
            actual: draft.hashtags.len(),
            min: policy.hashtag_min,
            max: policy.hashtag_max,
        });
    }

    Ok(())
}

/// Whether a draft violates the hard max-length invariant specifically.
/// The orchestrator's gate checks only this; hashtag conventions are the
/// content stage's own concern.
pub fn exceeds_max_length(draft: &ContentDraft) -> bool {
    draft.body.chars().count() > policy_for(draft.platform).max_body_length
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(platform: Platform, body: &str, hashtags: usize) -> ContentDraft {
        ContentDraft {
            platform,
            body: body.into(),
            hashtags: (0..hashtags).map(|i| format!("tag{i}")).collect(),
            estimated_reach: 0,
        }
    }

    #[test]
    fn table_matches_platform_conventions() {
        assert_eq!(policy_for(Platform::LinkedIn).max_body_length, 3000);
        assert_eq!(policy_for(Platform::Twitter).max_body_length, 280);
        assert_eq!(policy_for(Platform::Instagram).max_body_length, 2200);
        assert_eq!(policy_for(Platform::YouTube).max_body_length, 5000);
        assert_eq!(policy_for(Platform::Newsletter).max_body_length, 10_000);
        assert_eq!(policy_for(Platform::Blog).max_body_length, 15_000);

        assert_eq!(policy_for(Platform::Newsletter).hashtag_range(), 0..=0);
        assert_eq!(policy_for(Platform::Twitter).hashtag_range(), 1..=3);
    }

    #[test]
    fn every_platform_has_a_policy() {
        assert_eq!(all_policies().count(), Platform::ALL.len());
        for policy in all_policies() {
            assert!(policy.max_body_length > 0);
            assert!(policy.hashtag_min <= policy.hashtag_max);
        }
    }

    #[test]
    fn body_over_limit_rejected() {
        let body = "x".repeat(281);
        let result = validate_draft(&draft(Platform::Twitter, &body, 2));
        assert!(matches!(
            result,
            Err(PolicyViolation::BodyTooLong { actual: 281, max: 280, .. })
        ));
        assert!(exceeds_max_length(&draft(Platform::Twitter, &body, 2)));
    }

    #[test]
    fn body_at_limit_accepted() {
        let body = "x".repeat(280);
        validate_draft(&draft(Platform::Twitter, &body, 2)).expect("at limit is valid");
        assert!(!exceeds_max_length(&draft(Platform::Twitter, &body, 2)));
    }

    #[test]
    fn length_is_measured_in_chars_not_bytes() {
        // 280 multibyte chars are within Twitter's limit even at 840 bytes.
        let body = "é".repeat(280);
        assert!(body.len() > 280);
        validate_draft(&draft(Platform::Twitter, &body, 1)).expect("char count applies");
    }

    #[test]
    fn hashtag_convention_enforced() {
        let result = validate_draft(&draft(Platform::Instagram, "caption", 2));
        assert!(matches!(result, Err(PolicyViolation::HashtagCount { .. })));

        validate_draft(&draft(Platform::Instagram, "caption", 7)).expect("in range");
        validate_draft(&draft(Platform::Newsletter, "article", 0)).expect("zero allowed");
    }
}
