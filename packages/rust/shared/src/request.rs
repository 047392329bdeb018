//! Pipeline request model and fail-fast validation.
//!
//! Validation rejects malformed requests before any stage runs; no
//! partial run is ever created for an invalid request. Dependency rules
//! between stages (lead-gen needs research, outreach needs leads) are
//! deliberately *not* validation errors — the orchestrator records those
//! stages as skipped with a dependency detail instead.

use serde::{Deserialize, Serialize};

use crate::error::{CreatorFlowError, Result};
use crate::run::StageKind;
use crate::types::{Platform, Tone};

/// A content creation request: one request drives one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Topic to create content about.
    pub topic: String,
    /// Desired content tone.
    pub tone: Tone,
    /// Target platforms; at least one, no duplicates.
    pub platforms: Vec<Platform>,
    /// Run the research stage.
    #[serde(default)]
    pub research: bool,
    /// Run the lead-generation stage (needs research in the same run).
    #[serde(default)]
    pub lead_gen: bool,
    /// Run the outreach stage (needs leads from this run).
    #[serde(default)]
    pub outreach: bool,
    /// Produce only a research brief; suppresses content creation.
    #[serde(default)]
    pub research_only: bool,
    /// Optional audience description forwarded to generation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_audience: Option<String>,
    /// Optional free-form generation instructions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_instructions: Option<String>,
}

impl Request {
    /// Check the request against the fixed vocabularies and shape rules.
    pub fn validate(&self) -> Result<()> {
        if self.topic.trim().is_empty() {
            return Err(CreatorFlowError::validation("topic must not be empty"));
        }

        if self.platforms.is_empty() {
            return Err(CreatorFlowError::validation(
                "at least one target platform is required",
            ));
        }

        let mut seen = std::collections::BTreeSet::new();
        for platform in &self.platforms {
            if !seen.insert(*platform) {
                return Err(CreatorFlowError::validation(format!(
                    "duplicate platform: {platform}"
                )));
            }
        }

        if self.research_only && !self.research {
            return Err(CreatorFlowError::validation(
                "research_only requires the research stage to be enabled",
            ));
        }

        Ok(())
    }

    /// Whether the request enables a given stage.
    ///
    /// Content creation is the implied default output and only a
    /// research-only request suppresses it.
    pub fn stage_enabled(&self, kind: StageKind) -> bool {
        match kind {
            StageKind::Research => self.research,
            StageKind::LeadGeneration => self.lead_gen && !self.research_only,
            StageKind::ContentCreation => !self.research_only,
            StageKind::Outreach => self.outreach && !self.research_only,
        }
    }

    /// The stage whose failure is terminal for the whole run.
    pub fn mandatory_stage(&self) -> StageKind {
        if self.research_only {
            StageKind::Research
        } else {
            StageKind::ContentCreation
        }
    }
}
