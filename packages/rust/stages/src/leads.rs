//! Lead-generation stage: scored and ranked lead discovery.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};
use url::Url;

use creatorflow_scoring::{ScoreInputs, ScoreWeights, keyword_overlap, relevance_score};
use creatorflow_shared::{Lead, StageKind, StagePayload};

use crate::provider::GenerationProvider;
use crate::{Stage, StageContext, StageFailure};

/// Default cap on leads kept after ranking.
pub const DEFAULT_MAX_LEADS: usize = 20;

/// Discovers lead candidates and ranks them by relevance.
pub struct LeadGenerationStage {
    provider: Arc<dyn GenerationProvider>,
    weights: ScoreWeights,
    max_leads: usize,
}

impl LeadGenerationStage {
    pub fn new(provider: Arc<dyn GenerationProvider>) -> Self {
        Self {
            provider,
            weights: ScoreWeights::default(),
            max_leads: DEFAULT_MAX_LEADS,
        }
    }

    pub fn with_weights(mut self, weights: ScoreWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_max_leads(mut self, max_leads: usize) -> Self {
        self.max_leads = max_leads;
        self
    }
}

#[async_trait]
impl Stage for LeadGenerationStage {
    fn kind(&self) -> StageKind {
        StageKind::LeadGeneration
    }

    async fn execute(&self, ctx: &StageContext<'_>) -> Result<StagePayload, StageFailure> {
        let topic = ctx.request.topic.as_str();

        let candidates = self
            .provider
            .discover_leads(topic, &ctx.request.platforms, self.max_leads)
            .await?;

        let mut scored: Vec<Lead> = candidates
            .into_iter()
            .filter(|candidate| {
                if Url::parse(&candidate.profile_url).is_err() {
                    warn!(name = %candidate.name, url = %candidate.profile_url,
                          "dropping lead with invalid profile URL");
                    return false;
                }
                true
            })
            .map(|candidate| {
                let haystack = format!("{} {}", candidate.name, candidate.tags.join(" "));
                let inputs = ScoreInputs {
                    follower_count: candidate.follower_count,
                    engagement_rate: candidate.engagement_rate.clamp(0.0, 1.0),
                    keyword_overlap: keyword_overlap(topic, &haystack),
                    recency: None,
                };
                Lead {
                    id: String::new(),
                    name: candidate.name,
                    platform: candidate.platform,
                    profile_url: candidate.profile_url,
                    follower_count: candidate.follower_count,
                    engagement_rate: candidate.engagement_rate.clamp(0.0, 1.0),
                    relevance_score: relevance_score(&inputs, &self.weights),
                    tags: candidate.tags,
                }
            })
            .collect();

        scored.sort_by(|a, b| {
            b.relevance_score
                .partial_cmp(&a.relevance_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.name.cmp(&b.name))
        });
        scored.truncate(self.max_leads);

        // Identifiers reflect final rank, so "lead-1" is the best match.
        for (i, lead) in scored.iter_mut().enumerate() {
            lead.id = format!("lead-{}", i + 1);
        }

        debug!(leads = scored.len(), "lead generation complete");

        Ok(StagePayload::Leads { leads: scored })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{LeadCandidate, ProviderResult, TemplateProvider};
    use creatorflow_shared::{Platform, Request, Tone};
    use tokio_util::sync::CancellationToken;

    fn request() -> Request {
        Request {
            topic: "AI tools".into(),
            tone: Tone::Professional,
            platforms: vec![Platform::LinkedIn, Platform::YouTube],
            research: true,
            lead_gen: true,
            outreach: false,
            research_only: false,
            target_audience: None,
            custom_instructions: None,
        }
    }

    async fn run_stage(stage: &LeadGenerationStage) -> Vec<Lead> {
        let request = request();
        let ctx = StageContext {
            request: &request,
            completed: &[],
            cancel: CancellationToken::new(),
        };
        match stage.execute(&ctx).await.expect("leads payload") {
            StagePayload::Leads { leads } => leads,
            other => panic!("wrong payload variant: {other:?}"),
        }
    }

    #[tokio::test]
    async fn leads_are_ranked_and_capped() {
        let stage =
            LeadGenerationStage::new(Arc::new(TemplateProvider)).with_max_leads(5);
        let leads = run_stage(&stage).await;

        assert_eq!(leads.len(), 5);
        for pair in leads.windows(2) {
            assert!(pair[0].relevance_score >= pair[1].relevance_score);
        }
        for (i, lead) in leads.iter().enumerate() {
            assert_eq!(lead.id, format!("lead-{}", i + 1));
            assert!((0.0..=1.0).contains(&lead.relevance_score));
            assert!((0.0..=1.0).contains(&lead.engagement_rate));
        }
    }

    struct BadUrlProvider;

    #[async_trait]
    impl GenerationProvider for BadUrlProvider {
        async fn research_findings(
            &self,
            _topic: &str,
            _audience: Option<&str>,
        ) -> ProviderResult<crate::provider::ResearchFindings> {
            unimplemented!("not used")
        }

        async fn discover_leads(
            &self,
            _topic: &str,
            _platforms: &[Platform],
            _limit: usize,
        ) -> ProviderResult<Vec<LeadCandidate>> {
            Ok(vec![
                LeadCandidate {
                    name: "Valid".into(),
                    platform: Platform::LinkedIn,
                    profile_url: "https://linkedin.example.com/valid".into(),
                    follower_count: 10_000,
                    engagement_rate: 0.05,
                    tags: vec![],
                },
                LeadCandidate {
                    name: "Broken".into(),
                    platform: Platform::LinkedIn,
                    profile_url: "not a url".into(),
                    follower_count: 90_000,
                    engagement_rate: 0.08,
                    tags: vec![],
                },
            ])
        }

        async fn draft_body(
            &self,
            _spec: &crate::provider::DraftSpec<'_>,
        ) -> ProviderResult<String> {
            unimplemented!("not used")
        }

        async fn outreach_body(
            &self,
            _lead: &Lead,
            _topic: &str,
            _tone: Tone,
        ) -> ProviderResult<String> {
            unimplemented!("not used")
        }
    }

    #[tokio::test]
    async fn invalid_profile_urls_are_dropped() {
        let stage = LeadGenerationStage::new(Arc::new(BadUrlProvider));
        let leads = run_stage(&stage).await;
        assert_eq!(leads.len(), 1);
        assert_eq!(leads[0].name, "Valid");
    }

    #[tokio::test]
    async fn empty_candidate_list_is_a_success() {
        struct EmptyProvider;

        #[async_trait]
        impl GenerationProvider for EmptyProvider {
            async fn research_findings(
                &self,
                _topic: &str,
                _audience: Option<&str>,
            ) -> ProviderResult<crate::provider::ResearchFindings> {
                unimplemented!("not used")
            }

            async fn discover_leads(
                &self,
                _topic: &str,
                _platforms: &[Platform],
                _limit: usize,
            ) -> ProviderResult<Vec<LeadCandidate>> {
                Ok(vec![])
            }

            async fn draft_body(
                &self,
                _spec: &crate::provider::DraftSpec<'_>,
            ) -> ProviderResult<String> {
                unimplemented!("not used")
            }

            async fn outreach_body(
                &self,
                _lead: &Lead,
                _topic: &str,
                _tone: Tone,
            ) -> ProviderResult<String> {
                unimplemented!("not used")
            }
        }

        let stage = LeadGenerationStage::new(Arc::new(EmptyProvider));
        let leads = run_stage(&stage).await;
        assert!(leads.is_empty());
    }
}
