//! Research stage: topic brief plus scorer-ranked sources.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use creatorflow_scoring::{ScoreInputs, ScoreWeights, keyword_overlap, relevance_score};
use creatorflow_shared::{ResearchBrief, ResearchSource, StageKind, StagePayload};

use crate::provider::GenerationProvider;
use crate::{Stage, StageContext, StageFailure};

/// Sources kept after ranking.
const MAX_SOURCES: usize = 10;

/// Produces a [`ResearchBrief`] from provider findings.
pub struct ResearchStage {
    provider: Arc<dyn GenerationProvider>,
    weights: ScoreWeights,
}

impl ResearchStage {
    pub fn new(provider: Arc<dyn GenerationProvider>) -> Self {
        Self {
            provider,
            weights: ScoreWeights::default(),
        }
    }

    pub fn with_weights(mut self, weights: ScoreWeights) -> Self {
        self.weights = weights;
        self
    }
}

#[async_trait]
impl Stage for ResearchStage {
    fn kind(&self) -> StageKind {
        StageKind::Research
    }

    async fn execute(&self, ctx: &StageContext<'_>) -> Result<StagePayload, StageFailure> {
        let topic = ctx.request.topic.as_str();

        let findings = self
            .provider
            .research_findings(topic, ctx.request.target_audience.as_deref())
            .await?;

        // Rank sources by topical overlap; no follower/engagement signals
        // exist for sources, so those inputs stay at zero for everyone.
        let mut sources: Vec<ResearchSource> = findings
            .sources
            .into_iter()
            .map(|candidate| {
                let haystack = match &candidate.title {
                    Some(title) => format!("{title} {}", candidate.url),
                    None => candidate.url.clone(),
                };
                let inputs = ScoreInputs {
                    keyword_overlap: keyword_overlap(topic, &haystack),
                    ..ScoreInputs::default()
                };
                ResearchSource {
                    relevance: relevance_score(&inputs, &self.weights),
                    url: candidate.url,
                    title: candidate.title,
                }
            })
            .collect();

        sources.sort_by(|a, b| {
            b.relevance
                .partial_cmp(&a.relevance)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.url.cmp(&b.url))
        });
        sources.truncate(MAX_SOURCES);

        debug!(sources = sources.len(), "research brief assembled");

        Ok(StagePayload::Research {
            brief: ResearchBrief {
                summary: findings.summary,
                key_points: findings.key_points,
                sources,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::TemplateProvider;
    use creatorflow_shared::{Platform, Request, Tone};
    use tokio_util::sync::CancellationToken;

    fn request(topic: &str) -> Request {
        Request {
            topic: topic.into(),
            tone: Tone::Professional,
            platforms: vec![Platform::LinkedIn],
            research: true,
            lead_gen: false,
            outreach: false,
            research_only: false,
            target_audience: None,
            custom_instructions: None,
        }
    }

    #[tokio::test]
    async fn brief_sources_are_ranked_descending() {
        let stage = ResearchStage::new(Arc::new(TemplateProvider));
        let request = request("AI tools");
        let ctx = StageContext {
            request: &request,
            completed: &[],
            cancel: CancellationToken::new(),
        };

        let payload = stage.execute(&ctx).await.expect("research payload");
        let StagePayload::Research { brief } = payload else {
            panic!("wrong payload variant");
        };

        assert!(!brief.summary.is_empty());
        assert!(!brief.sources.is_empty());
        for pair in brief.sources.windows(2) {
            assert!(pair[0].relevance >= pair[1].relevance);
        }
        for source in &brief.sources {
            assert!((0.0..=1.0).contains(&source.relevance));
        }
    }

    #[tokio::test]
    async fn topical_sources_outrank_generic_ones() {
        let stage = ResearchStage::new(Arc::new(TemplateProvider));
        let request = request("AI tools");
        let ctx = StageContext {
            request: &request,
            completed: &[],
            cancel: CancellationToken::new(),
        };

        let payload = stage.execute(&ctx).await.expect("research payload");
        let StagePayload::Research { brief } = payload else {
            panic!("wrong payload variant");
        };

        // The generic community digest carries no topic keywords.
        let generic = brief
            .sources
            .iter()
            .find(|s| s.url.contains("community.example.com"))
            .expect("generic source present");
        let topical = brief
            .sources
            .iter()
            .find(|s| s.url.contains("ai-tools"))
            .expect("topical source present");
        assert!(topical.relevance > generic.relevance);
    }
}
