//! Outreach stage: one personalized message per lead from this run.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use creatorflow_shared::{OutreachMessage, StageKind, StagePayload, Tone};

use crate::provider::GenerationProvider;
use crate::{Stage, StageContext, StageFailure};

/// Drafts collaboration outreach for the leads produced upstream.
pub struct OutreachStage {
    provider: Arc<dyn GenerationProvider>,
}

impl OutreachStage {
    pub fn new(provider: Arc<dyn GenerationProvider>) -> Self {
        Self { provider }
    }
}

/// Subject line matched to the requested tone.
fn subject_for(tone: Tone, topic: &str) -> String {
    match tone {
        Tone::Professional => format!("Collaboration proposal: {topic}"),
        Tone::Casual => format!("Quick idea about {topic}"),
        Tone::Educational => format!("Teaming up on {topic} content"),
        Tone::Entertaining => format!("A fun {topic} collab?"),
        Tone::Inspirational => format!("Let's inspire people with {topic}"),
    }
}

#[async_trait]
impl Stage for OutreachStage {
    fn kind(&self) -> StageKind {
        StageKind::Outreach
    }

    async fn execute(&self, ctx: &StageContext<'_>) -> Result<StagePayload, StageFailure> {
        let request = ctx.request;
        let leads = ctx.leads();

        let mut messages = Vec::with_capacity(leads.len());
        for (i, lead) in leads.iter().enumerate() {
            let body = self
                .provider
                .outreach_body(lead, &request.topic, request.tone)
                .await?;

            messages.push(OutreachMessage {
                id: format!("msg-{}", i + 1),
                lead_id: lead.id.clone(),
                lead_name: lead.name.clone(),
                platform: lead.platform,
                subject: subject_for(request.tone, &request.topic),
                body,
            });
        }

        debug!(messages = messages.len(), "outreach drafting complete");

        Ok(StagePayload::Outreach { messages })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::TemplateProvider;
    use creatorflow_shared::{
        Lead, Platform, Request, StageResult, StageStatus,
    };
    use tokio_util::sync::CancellationToken;

    fn request() -> Request {
        Request {
            topic: "AI tools".into(),
            tone: Tone::Casual,
            platforms: vec![Platform::LinkedIn],
            research: true,
            lead_gen: true,
            outreach: true,
            research_only: false,
            target_audience: None,
            custom_instructions: None,
        }
    }

    fn lead(id: &str, name: &str) -> Lead {
        Lead {
            id: id.into(),
            name: name.into(),
            platform: Platform::LinkedIn,
            profile_url: format!("https://linkedin.example.com/{id}"),
            follower_count: 25_000,
            engagement_rate: 0.04,
            relevance_score: 0.7,
            tags: vec![],
        }
    }

    #[tokio::test]
    async fn one_message_per_lead_with_back_references() {
        let stage = OutreachStage::new(Arc::new(TemplateProvider));
        let request = request();
        let now = chrono::Utc::now();
        let completed = vec![StageResult {
            kind: StageKind::LeadGeneration,
            status: StageStatus::Succeeded,
            payload: Some(StagePayload::Leads {
                leads: vec![lead("lead-1", "Ada"), lead("lead-2", "Grace")],
            }),
            started_at: now,
            ended_at: now,
            error: None,
        }];
        let ctx = StageContext {
            request: &request,
            completed: &completed,
            cancel: CancellationToken::new(),
        };

        let StagePayload::Outreach { messages } =
            stage.execute(&ctx).await.expect("outreach payload")
        else {
            panic!("wrong payload variant");
        };

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].lead_id, "lead-1");
        assert_eq!(messages[1].lead_id, "lead-2");
        for message in &messages {
            assert!(message.subject.contains("AI tools"));
            assert!(message.body.contains(&message.lead_name));
            assert!(!message.body.trim().is_empty());
        }
    }

    #[test]
    fn subjects_vary_by_tone() {
        let subjects: std::collections::BTreeSet<String> = Tone::ALL
            .iter()
            .map(|tone| subject_for(*tone, "AI tools"))
            .collect();
        assert_eq!(subjects.len(), Tone::ALL.len());
    }
}
