//! Generation provider capability and its two implementations.
//!
//! [`HttpProvider`] talks to an OpenAI-compatible chat-completions API.
//! [`TemplateProvider`] generates deterministic content offline and is
//! the default when no API key is configured, mirroring the keyless
//! fallback mode of the upstream service. Both are stateless with
//! respect to the pipeline and safe to share across concurrent runs.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use creatorflow_shared::config::ProviderConfig;
use creatorflow_shared::{CreatorFlowError, Lead, Platform, Tone};

/// User-Agent string for provider requests.
const USER_AGENT: &str = concat!("CreatorFlow/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Provider errors
// ---------------------------------------------------------------------------

/// Failure modes of a generation provider call.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Connection/transport failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// Non-success HTTP status from the provider.
    #[error("provider returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// The provider responded, but the payload could not be used.
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// Whether a retry could plausibly succeed. Rate limiting and server
    /// errors are transient; client errors (bad key, bad request) are not.
    pub fn is_recoverable(&self) -> bool {
        match self {
            ProviderError::Transport(_) => true,
            ProviderError::Status { status, .. } => *status == 429 || *status >= 500,
            ProviderError::InvalidResponse(_) => true,
        }
    }
}

pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

// ---------------------------------------------------------------------------
// Provider data shapes
// ---------------------------------------------------------------------------

/// An unranked source reference returned by research generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceCandidate {
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
}

/// Raw research output before the stage ranks and shapes it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResearchFindings {
    pub summary: String,
    #[serde(default)]
    pub key_points: Vec<String>,
    #[serde(default)]
    pub sources: Vec<SourceCandidate>,
}

/// An unscored lead candidate; the lead stage computes relevance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeadCandidate {
    pub name: String,
    pub platform: Platform,
    pub profile_url: String,
    #[serde(default)]
    pub follower_count: u64,
    #[serde(default)]
    pub engagement_rate: f64,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Everything a provider needs to draft one platform's body text.
#[derive(Debug, Clone, Copy)]
pub struct DraftSpec<'a> {
    pub topic: &'a str,
    pub tone: Tone,
    pub platform: Platform,
    /// Style hint from the platform policy table.
    pub tone_hint: &'a str,
    /// Hard character budget from the platform policy table.
    pub max_body_length: usize,
    pub research_summary: Option<&'a str>,
    pub audience: Option<&'a str>,
    pub instructions: Option<&'a str>,
}

/// Capability interface used internally by the stage implementations.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Research a topic: summary, takeaways, and candidate sources.
    async fn research_findings(
        &self,
        topic: &str,
        audience: Option<&str>,
    ) -> ProviderResult<ResearchFindings>;

    /// Surface lead candidates for a topic on the given platforms.
    async fn discover_leads(
        &self,
        topic: &str,
        platforms: &[Platform],
        limit: usize,
    ) -> ProviderResult<Vec<LeadCandidate>>;

    /// Draft one platform-native body text.
    async fn draft_body(&self, spec: &DraftSpec<'_>) -> ProviderResult<String>;

    /// Draft a personalized outreach message body for one lead.
    async fn outreach_body(&self, lead: &Lead, topic: &str, tone: Tone)
    -> ProviderResult<String>;
}

// ---------------------------------------------------------------------------
// HTTP provider (OpenAI-compatible chat completions)
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// Chat-completions client for any OpenAI-compatible endpoint.
pub struct HttpProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl HttpProvider {
    /// Build a provider from config plus an explicit API key.
    pub fn new(config: &ProviderConfig, api_key: String) -> creatorflow_shared::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                CreatorFlowError::Provider(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
        })
    }

    /// Build a provider reading the API key from the configured env var.
    pub fn from_env(config: &ProviderConfig) -> creatorflow_shared::Result<Self> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            CreatorFlowError::config(format!(
                "provider API key not found. Set the {} environment variable.",
                config.api_key_env
            ))
        })?;
        Self::new(config, api_key)
    }

    /// Send one chat completion and return the first choice's text.
    async fn complete(
        &self,
        system: &str,
        prompt: &str,
        temperature: f32,
    ) -> ProviderResult<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature,
        };

        let url = format!("{}/chat/completions", self.base_url);
        debug!(%url, model = %self.model, "sending completion request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                message: body.chars().take(200).collect(),
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| ProviderError::InvalidResponse("no choices in response".into()))
    }
}

/// Strip a Markdown code fence from a model response, if present.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.trim_start_matches('\n')
        .strip_suffix("```")
        .map_or(trimmed, str::trim)
}

static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https?://[^\s)\]>,]+").expect("valid URL pattern")
});

/// Pull bare URLs out of prose when structured sources are unavailable.
fn extract_urls(text: &str) -> Vec<SourceCandidate> {
    URL_PATTERN
        .find_iter(text)
        .take(10)
        .map(|m| SourceCandidate {
            url: m.as_str().trim_end_matches('.').to_string(),
            title: None,
        })
        .collect()
}

#[async_trait]
impl GenerationProvider for HttpProvider {
    async fn research_findings(
        &self,
        topic: &str,
        audience: Option<&str>,
    ) -> ProviderResult<ResearchFindings> {
        let audience_line = audience
            .map(|a| format!(" Write for this audience: {a}."))
            .unwrap_or_default();
        let prompt = format!(
            "Research the topic \"{topic}\".{audience_line} Respond with JSON only: \
             {{\"summary\": string, \"key_points\": [string], \
             \"sources\": [{{\"url\": string, \"title\": string}}]}}"
        );

        let text = self
            .complete("You are a content research specialist.", &prompt, 0.3)
            .await?;

        // Models occasionally answer in prose; salvage the text rather
        // than failing the whole stage.
        match serde_json::from_str::<ResearchFindings>(strip_code_fence(&text)) {
            Ok(findings) => Ok(findings),
            Err(e) => {
                warn!(error = %e, "research response was not JSON, extracting from prose");
                Ok(ResearchFindings {
                    summary: text.trim().to_string(),
                    key_points: vec![],
                    sources: extract_urls(&text),
                })
            }
        }
    }

    async fn discover_leads(
        &self,
        topic: &str,
        platforms: &[Platform],
        limit: usize,
    ) -> ProviderResult<Vec<LeadCandidate>> {
        let platform_list = platforms
            .iter()
            .map(Platform::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        let prompt = format!(
            "List up to {limit} influencers, creators, or communities relevant to \
             \"{topic}\" on these platforms: {platform_list}. Respond with a JSON array \
             only, each element: {{\"name\": string, \"platform\": string, \
             \"profile_url\": string, \"follower_count\": integer, \
             \"engagement_rate\": number, \"tags\": [string]}}"
        );

        let text = self
            .complete("You are a lead generation specialist.", &prompt, 0.2)
            .await?;

        serde_json::from_str(strip_code_fence(&text))
            .map_err(|e| ProviderError::InvalidResponse(format!("lead list: {e}")))
    }

    async fn draft_body(&self, spec: &DraftSpec<'_>) -> ProviderResult<String> {
        let mut prompt = format!(
            "Write a {tone} {hint} post about \"{topic}\" for {platform}. \
             Stay under {max} characters. Do not include hashtags.",
            tone = spec.tone,
            hint = spec.tone_hint,
            topic = spec.topic,
            platform = spec.platform.display_name(),
            max = spec.max_body_length,
        );
        if let Some(summary) = spec.research_summary {
            prompt.push_str(&format!("\n\nGround the post in this research:\n{summary}"));
        }
        if let Some(audience) = spec.audience {
            prompt.push_str(&format!("\n\nTarget audience: {audience}"));
        }
        if let Some(instructions) = spec.instructions {
            prompt.push_str(&format!("\n\nAdditional instructions: {instructions}"));
        }

        let text = self
            .complete("You are a platform-native content writer.", &prompt, 0.7)
            .await?;
        Ok(text.trim().to_string())
    }

    async fn outreach_body(
        &self,
        lead: &Lead,
        topic: &str,
        tone: Tone,
    ) -> ProviderResult<String> {
        let prompt = format!(
            "Write a short, {tone} outreach message to {name} ({platform}, \
             {followers} followers) proposing a collaboration around \"{topic}\". \
             Be genuine and value-first, never pushy.",
            name = lead.name,
            platform = lead.platform.display_name(),
            followers = lead.follower_count,
        );

        let text = self
            .complete("You are an outreach specialist.", &prompt, 0.6)
            .await?;
        Ok(text.trim().to_string())
    }
}

// ---------------------------------------------------------------------------
// Template provider (deterministic, offline)
// ---------------------------------------------------------------------------

/// Deterministic offline generation: same request, same output.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateProvider;

/// Lowercase hyphenated slug for URLs and handles.
fn slug(topic: &str) -> String {
    let mut out = String::with_capacity(topic.len());
    let mut last_dash = true;
    for c in topic.chars() {
        if c.is_alphanumeric() {
            out.extend(c.to_lowercase());
            last_dash = false;
        } else if !last_dash {
            out.push('-');
            last_dash = true;
        }
    }
    out.trim_end_matches('-').to_string()
}

/// CamelCase form of a topic for handles and hashtags.
fn camel(topic: &str) -> String {
    topic
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

/// Opening phrase matched to the requested tone.
fn tone_opener(tone: Tone) -> &'static str {
    match tone {
        Tone::Professional => "Industry perspective:",
        Tone::Casual => "Okay, real talk:",
        Tone::Educational => "Here's what you should know about",
        Tone::Entertaining => "You won't believe what's happening in",
        Tone::Inspirational => "Here's why now is the moment for",
    }
}

/// Trim text to a character budget at a word boundary.
fn fit_within(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    match cut.rfind(' ') {
        Some(idx) => cut[..idx].trim_end().to_string(),
        None => cut,
    }
}

#[async_trait]
impl GenerationProvider for TemplateProvider {
    async fn research_findings(
        &self,
        topic: &str,
        audience: Option<&str>,
    ) -> ProviderResult<ResearchFindings> {
        let audience_clause = audience
            .map(|a| format!(" Findings are framed for {a}."))
            .unwrap_or_default();
        let topic_slug = slug(topic);

        Ok(ResearchFindings {
            summary: format!(
                "{topic} is seeing sustained interest across professional and creator \
                 communities. Recent discussion centers on practical adoption, tooling \
                 maturity, and measurable outcomes.{audience_clause}"
            ),
            key_points: vec![
                format!("Interest in {topic} has grown steadily over the past year"),
                format!("Practitioners prioritize hands-on {topic} case studies over theory"),
                format!("Short-form explainers outperform long announcements for {topic}"),
                format!("Communities reward consistent posting cadence on {topic}"),
            ],
            sources: vec![
                SourceCandidate {
                    url: format!("https://news.example.com/{topic_slug}-report"),
                    title: Some(format!("{topic}: state of the field")),
                },
                SourceCandidate {
                    url: format!("https://blog.example.com/{topic_slug}-trends"),
                    title: Some(format!("{topic} trends to watch")),
                },
                SourceCandidate {
                    url: format!("https://research.example.org/{topic_slug}"),
                    title: Some(format!("Survey data on {topic} adoption")),
                },
                SourceCandidate {
                    url: "https://community.example.com/creators".into(),
                    title: Some("Creator economy community digest".into()),
                },
            ],
        })
    }

    async fn discover_leads(
        &self,
        topic: &str,
        platforms: &[Platform],
        limit: usize,
    ) -> ProviderResult<Vec<LeadCandidate>> {
        let topic_camel = camel(topic);
        let topic_slug = slug(topic);
        let count = limit.min(10);

        let candidates = (0..count)
            .map(|i| {
                let platform = platforms[i % platforms.len()];
                // Spread follower counts across 5k–100k and engagement
                // across 1%–8%, descending so earlier candidates rank higher.
                let follower_count = 100_000 - (i as u64 * 9_500);
                let engagement_rate = 0.08 - (i as f64 * 0.007);
                LeadCandidate {
                    name: format!("{topic_camel}Expert{}", i + 1),
                    platform,
                    profile_url: format!(
                        "https://{}.example.com/{topic_slug}-expert-{}",
                        platform.as_str(),
                        i + 1
                    ),
                    follower_count,
                    engagement_rate,
                    tags: vec![topic_slug.clone(), platform.as_str().into(), "influencer".into()],
                }
            })
            .collect();

        Ok(candidates)
    }

    async fn draft_body(&self, spec: &DraftSpec<'_>) -> ProviderResult<String> {
        let opener = tone_opener(spec.tone);
        let topic = spec.topic;

        let body = match spec.platform {
            Platform::Twitter => {
                format!("{opener} {topic} is moving fast. The teams that win are the ones shipping small experiments every week. What has worked for you?")
            }
            Platform::LinkedIn => {
                let research = spec
                    .research_summary
                    .map(|s| format!("\n\n{s}"))
                    .unwrap_or_default();
                format!(
                    "{opener} {topic}.{research}\n\nThree things stand out:\n\
                     1. Start with one concrete workflow, not a platform migration.\n\
                     2. Measure outcomes weekly and publish what you learn.\n\
                     3. Share failures as openly as wins — that is where trust comes from.\n\n\
                     What would you add to this list?"
                )
            }
            Platform::Instagram => {
                format!(
                    "{opener} {topic}!\n\nSwipe for the three takeaways everyone is \
                     talking about this week. Save this post for your next planning \
                     session and tell us which one you are trying first."
                )
            }
            Platform::YouTube => {
                let research = spec
                    .research_summary
                    .map(|s| format!("\n\n{s}"))
                    .unwrap_or_default();
                format!(
                    "{opener} {topic}.{research}\n\nIn this video we break down where \
                     {topic} actually delivers, what to skip, and the workflow we use \
                     day to day. Chapters below — drop your questions in the comments."
                )
            }
            Platform::Newsletter => {
                let research = spec
                    .research_summary
                    .map(|s| format!("\n\n{s}"))
                    .unwrap_or_default();
                format!(
                    "{opener} {topic}.{research}\n\nThis week's issue covers the \
                     practical side of {topic}: what changed, why it matters for your \
                     work, and one experiment worth running before Friday. As always, \
                     reply with what you'd like us to dig into next."
                )
            }
            Platform::Blog => {
                let research = spec
                    .research_summary
                    .map(|s| format!("\n\n{s}"))
                    .unwrap_or_default();
                format!(
                    "{opener} {topic}.{research}\n\n## Why {topic} matters now\n\n\
                     Adoption has moved from early experiments to production workflows. \
                     This post walks through the landscape, the trade-offs we have seen \
                     in practice, and a pragmatic starting checklist.\n\n\
                     ## Where to start\n\nPick a single workflow, define a measurable \
                     outcome, and timebox the experiment to two weeks."
                )
            }
        };

        Ok(fit_within(&body, spec.max_body_length))
    }

    async fn outreach_body(
        &self,
        lead: &Lead,
        topic: &str,
        tone: Tone,
    ) -> ProviderResult<String> {
        let greeting = match tone {
            Tone::Professional => format!("Hello {},", lead.name),
            _ => format!("Hi {},", lead.name),
        };

        Ok(format!(
            "{greeting}\n\nI've been following your {platform} content on {topic} — \
             your perspective stands out in a crowded space. We're putting together a \
             series on {topic} and I think your audience and ours would both get real \
             value from a collaboration.\n\nNo pressure at all; if this sounds \
             interesting, I'd love to share a short outline. Either way, keep up the \
             great work.\n",
            platform = lead.platform.display_name(),
        ))
    }
}
