//! Content-creation stage: one platform-native draft per requested
//! platform, with hashtags fitted to each platform's conventions.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use creatorflow_policy::{PlatformPolicy, policy_for, validate_draft};
use creatorflow_shared::{ContentDraft, Platform, StageKind, StagePayload};

use crate::provider::{DraftSpec, GenerationProvider};
use crate::{Stage, StageContext, StageFailure};

/// Curated hashtag pools keyed by topic keyword, used before falling
/// back to generic creator tags.
const BASE_HASHTAGS: &[(&str, &[&str])] = &[
    ("ai", &["AI", "ArtificialIntelligence", "MachineLearning", "Tech", "Innovation"]),
    ("marketing", &["Marketing", "DigitalMarketing", "ContentMarketing", "SocialMedia", "Branding"]),
    ("business", &["Business", "Entrepreneurship", "Leadership", "Strategy", "Growth"]),
    ("technology", &["Technology", "Tech", "Innovation", "Digital", "Future"]),
    ("productivity", &["Productivity", "Efficiency", "WorkSmart", "TimeManagement", "Success"]),
];

/// Generic fillers used when a topic matches no curated pool.
const FILLER_HASHTAGS: &[&str] = &[
    "ContentCreation",
    "CreatorEconomy",
    "Trending",
    "Insights",
    "Community",
    "Growth",
    "Learning",
    "Digital",
    "Strategy",
];

/// Drafts platform-ready content for every requested platform.
pub struct ContentCreationStage {
    provider: Arc<dyn GenerationProvider>,
}

impl ContentCreationStage {
    pub fn new(provider: Arc<dyn GenerationProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl Stage for ContentCreationStage {
    fn kind(&self) -> StageKind {
        StageKind::ContentCreation
    }

    async fn execute(&self, ctx: &StageContext<'_>) -> Result<StagePayload, StageFailure> {
        let request = ctx.request;
        // Content proceeds with whatever research exists — possibly none.
        let research_summary = ctx
            .research_brief()
            .filter(|brief| !brief.is_empty())
            .map(|brief| brief.summary.clone());

        let mut drafts: BTreeMap<Platform, ContentDraft> = BTreeMap::new();

        for &platform in &request.platforms {
            let policy = policy_for(platform);
            let spec = DraftSpec {
                topic: &request.topic,
                tone: request.tone,
                platform,
                tone_hint: policy.tone_hint,
                max_body_length: policy.max_body_length,
                research_summary: research_summary.as_deref(),
                audience: request.target_audience.as_deref(),
                instructions: request.custom_instructions.as_deref(),
            };

            let body = self.provider.draft_body(&spec).await?;
            if body.trim().is_empty() {
                return Err(StageFailure::Fatal(format!(
                    "provider returned an empty draft for {platform}"
                )));
            }

            let hashtags = generate_hashtags(&request.topic, policy);
            let draft = ContentDraft {
                platform,
                estimated_reach: estimate_reach(platform, hashtags.len()),
                body,
                hashtags,
            };

            // Self-check against the policy table; violations are reported
            // as-is, never silently truncated. The orchestrator owns the
            // hard max-length gate.
            if let Err(violation) = validate_draft(&draft) {
                warn!(%platform, %violation, "draft violates platform policy");
            }

            drafts.insert(platform, draft);
        }

        debug!(drafts = drafts.len(), "content creation complete");

        Ok(StagePayload::Content { drafts })
    }
}

/// Build a hashtag list sized to the platform's conventional range.
fn generate_hashtags(topic: &str, policy: &PlatformPolicy) -> Vec<String> {
    if policy.hashtag_max == 0 {
        return Vec::new();
    }

    let topic_lower = topic.to_ascii_lowercase();
    let mut hashtags: Vec<String> = Vec::new();

    for (keyword, pool) in BASE_HASHTAGS {
        if topic_lower.contains(keyword) {
            for tag in *pool {
                if !hashtags.iter().any(|t| t == tag) {
                    hashtags.push((*tag).to_string());
                }
            }
        }
    }

    // Always include a tag derived from the topic itself.
    let topic_tag: String = topic
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect();
    if !topic_tag.is_empty() && !hashtags.iter().any(|t| *t == topic_tag) {
        hashtags.push(topic_tag);
    }

    for filler in FILLER_HASHTAGS {
        if hashtags.len() >= policy.hashtag_min {
            break;
        }
        if !hashtags.iter().any(|t| t == filler) {
            hashtags.push((*filler).to_string());
        }
    }

    hashtags.truncate(policy.hashtag_max);
    hashtags
}

/// Advisory reach estimate: platform base audience, nudged by hashtag
/// discoverability. Deterministic and never negative.
fn estimate_reach(platform: Platform, hashtag_count: usize) -> u64 {
    let base: u64 = match platform {
        Platform::LinkedIn => 7_500,
        Platform::Twitter => 5_000,
        Platform::Instagram => 8_000,
        Platform::YouTube => 10_000,
        Platform::Newsletter => 3_000,
        Platform::Blog => 4_000,
    };
    base + (hashtag_count as u64) * (base / 20)
}
