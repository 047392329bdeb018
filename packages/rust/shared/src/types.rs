//! Core domain types for CreatorFlow pipelines.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for pipeline run identifiers (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RunId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// Platform
// ---------------------------------------------------------------------------

/// A publishing platform with known content conventions.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    LinkedIn,
    Twitter,
    Instagram,
    YouTube,
    Newsletter,
    Blog,
}

impl Platform {
    /// All supported platforms, in display order.
    pub const ALL: [Platform; 6] = [
        Platform::LinkedIn,
        Platform::Twitter,
        Platform::Instagram,
        Platform::YouTube,
        Platform::Newsletter,
        Platform::Blog,
    ];

    /// Stable lowercase identifier (matches the serde wire name).
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::LinkedIn => "linkedin",
            Platform::Twitter => "twitter",
            Platform::Instagram => "instagram",
            Platform::YouTube => "youtube",
            Platform::Newsletter => "newsletter",
            Platform::Blog => "blog",
        }
    }

    /// Human-readable display name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Platform::LinkedIn => "LinkedIn",
            Platform::Twitter => "X (Twitter)",
            Platform::Instagram => "Instagram",
            Platform::YouTube => "YouTube",
            Platform::Newsletter => "Newsletter",
            Platform::Blog => "Blog",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "linkedin" => Ok(Platform::LinkedIn),
            // "x" and the original "x (twitter)" label normalize to twitter
            "twitter" | "x" | "x (twitter)" => Ok(Platform::Twitter),
            "instagram" => Ok(Platform::Instagram),
            "youtube" => Ok(Platform::YouTube),
            "newsletter" => Ok(Platform::Newsletter),
            "blog" => Ok(Platform::Blog),
            other => Err(format!("unknown platform: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Tone
// ---------------------------------------------------------------------------

/// Content tone, from a fixed vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Professional,
    Casual,
    Educational,
    Entertaining,
    Inspirational,
}

impl Tone {
    /// All supported tones.
    pub const ALL: [Tone; 5] = [
        Tone::Professional,
        Tone::Casual,
        Tone::Educational,
        Tone::Entertaining,
        Tone::Inspirational,
    ];

    /// Stable lowercase identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Professional => "professional",
            Tone::Casual => "casual",
            Tone::Educational => "educational",
            Tone::Entertaining => "entertaining",
            Tone::Inspirational => "inspirational",
        }
    }

    /// One-line description for the tone listing.
    pub fn description(&self) -> &'static str {
        match self {
            Tone::Professional => "Formal business language, industry expertise focus",
            Tone::Casual => "Conversational, friendly, approachable",
            Tone::Educational => "Informative, teaching-focused, expert guidance",
            Tone::Entertaining => "Fun, engaging, personality-driven",
            Tone::Inspirational => "Motivating, uplifting, action-oriented",
        }
    }
}

impl std::fmt::Display for Tone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Tone {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "professional" => Ok(Tone::Professional),
            "casual" => Ok(Tone::Casual),
            "educational" => Ok(Tone::Educational),
            "entertaining" => Ok(Tone::Entertaining),
            "inspirational" => Ok(Tone::Inspirational),
            other => Err(format!("unknown tone: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Stage payloads
// ---------------------------------------------------------------------------

/// A lead surfaced by the lead-generation stage. Read-only downstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lead {
    /// Stable identifier within the run.
    pub id: String,
    /// Display name of the account or community.
    pub name: String,
    /// Platform the lead is active on.
    pub platform: Platform,
    /// Profile URL.
    pub profile_url: String,
    /// Follower or member count.
    pub follower_count: u64,
    /// Engagement rate in `[0, 1]`.
    pub engagement_rate: f64,
    /// Relevance score in `[0, 1]`, computed by the scorer.
    pub relevance_score: f64,
    /// Free-form tags (niche, lead type, ...).
    #[serde(default)]
    pub tags: Vec<String>,
}

/// A cited source in a research brief.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchSource {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Relevance score in `[0, 1]`, computed by the scorer.
    pub relevance: f64,
}

/// The research stage's output: a brief plus ranked sources.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResearchBrief {
    /// Narrative summary of the findings.
    pub summary: String,
    /// Bullet-point takeaways.
    #[serde(default)]
    pub key_points: Vec<String>,
    /// Cited sources, ranked by relevance (descending).
    #[serde(default)]
    pub sources: Vec<ResearchSource>,
}

impl ResearchBrief {
    /// Whether the brief carries any usable research at all.
    pub fn is_empty(&self) -> bool {
        self.summary.trim().is_empty() && self.key_points.is_empty() && self.sources.is_empty()
    }
}

/// A platform-ready content draft.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentDraft {
    pub platform: Platform,
    /// Body text; must satisfy the platform's max length policy.
    pub body: String,
    /// Hashtags without the leading `#`.
    #[serde(default)]
    pub hashtags: Vec<String>,
    /// Advisory reach estimate, never negative.
    pub estimated_reach: u64,
}

/// A personalized outreach message referencing one lead from the same run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutreachMessage {
    pub id: String,
    /// `Lead::id` of the recipient.
    pub lead_id: String,
    pub lead_name: String,
    pub platform: Platform,
    pub subject: String,
    pub body: String,
}
