//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use creatorflow_core::{Pipeline, ProgressReporter, StageSet};
use creatorflow_policy::all_policies;
use creatorflow_shared::{
    AppConfig, PipelineConfig, PipelineRun, Platform, Request, StageKind, StageResult,
    StageStatus, Tone, init_config, load_config,
};
use creatorflow_stages::provider::{GenerationProvider, HttpProvider, TemplateProvider};
use creatorflow_storage::RunStore;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// CreatorFlow — turn one topic into platform-ready content.
#[derive(Parser)]
#[command(
    name = "creatorflow",
    version,
    about = "Research a topic, find leads, and draft platform-native content in one run.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Run the content pipeline for a topic.
    Run {
        /// Topic to create content about.
        topic: String,

        /// Content tone (professional, casual, educational, entertaining,
        /// inspirational).
        #[arg(short, long)]
        tone: Option<String>,

        /// Target platform (repeatable): linkedin, twitter, instagram,
        /// youtube, newsletter, blog.
        #[arg(short, long = "platform", required = true)]
        platforms: Vec<String>,

        /// Enable the research stage.
        #[arg(long)]
        research: bool,

        /// Enable the lead-generation stage (needs --research).
        #[arg(long)]
        leads: bool,

        /// Enable the outreach stage (needs --leads).
        #[arg(long)]
        outreach: bool,

        /// Produce only a research brief; skips content creation.
        #[arg(long)]
        research_only: bool,

        /// Audience description forwarded to generation.
        #[arg(long)]
        audience: Option<String>,

        /// Free-form generation instructions.
        #[arg(long)]
        instructions: Option<String>,

        /// Run database path (defaults to the configured path).
        #[arg(long)]
        db: Option<String>,

        /// Generate offline with deterministic templates, even when an
        /// API key is configured.
        #[arg(long)]
        offline: bool,

        /// Print the full run as JSON instead of a summary.
        #[arg(long)]
        json: bool,
    },

    /// List supported platforms and their publishing constraints.
    Platforms,

    /// List supported content tones.
    Tones,

    /// List recent pipeline runs.
    History {
        /// Run database path (defaults to the configured path).
        #[arg(long)]
        db: Option<String>,

        /// Maximum runs to list.
        #[arg(long, default_value = "20")]
        limit: u32,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "creatorflow=info",
        1 => "creatorflow=debug",
        _ => "creatorflow=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Run {
            topic,
            tone,
            platforms,
            research,
            leads,
            outreach,
            research_only,
            audience,
            instructions,
            db,
            offline,
            json,
        } => {
            cmd_run(RunArgs {
                topic,
                tone,
                platforms,
                research,
                leads,
                outreach,
                research_only,
                audience,
                instructions,
                db,
                offline,
                json,
            })
            .await
        }
        Command::Platforms => cmd_platforms(),
        Command::Tones => cmd_tones(),
        Command::History { db, limit } => cmd_history(db.as_deref(), limit).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

struct RunArgs {
    topic: String,
    tone: Option<String>,
    platforms: Vec<String>,
    research: bool,
    leads: bool,
    outreach: bool,
    research_only: bool,
    audience: Option<String>,
    instructions: Option<String>,
    db: Option<String>,
    offline: bool,
    json: bool,
}

/// Expand a leading `~` to the user's home directory.
fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(path)),
        None => PathBuf::from(path),
    }
}

/// Pick the generation provider: HTTP when a key is configured, the
/// deterministic offline templates otherwise.
fn select_provider(
    config: &AppConfig,
    offline: bool,
) -> Result<Arc<dyn GenerationProvider>> {
    if offline {
        info!("using offline template generation");
        return Ok(Arc::new(TemplateProvider));
    }

    match std::env::var(&config.provider.api_key_env) {
        Ok(key) if !key.is_empty() => {
            info!(model = %config.provider.model, "using HTTP generation provider");
            Ok(Arc::new(HttpProvider::new(&config.provider, key)?))
        }
        _ => {
            warn!(
                "{} is not set; falling back to offline template generation",
                config.provider.api_key_env
            );
            Ok(Arc::new(TemplateProvider))
        }
    }
}

/// Reports pipeline progress on an indicatif spinner.
struct SpinnerProgress {
    bar: ProgressBar,
}

impl SpinnerProgress {
    fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar }
    }
}

impl ProgressReporter for SpinnerProgress {
    fn stage_started(&self, kind: StageKind) {
        self.bar.set_message(format!("running {kind}..."));
    }

    fn stage_finished(&self, result: &StageResult) {
        let marker = match result.status {
            StageStatus::Succeeded => "✓",
            StageStatus::Partial => "◐",
            StageStatus::Failed => "✗",
            StageStatus::Skipped => "·",
        };
        self.bar
            .println(format!("{marker} {} — {}", result.kind, result.status));
    }

    fn done(&self, run: &PipelineRun) {
        self.bar
            .finish_with_message(format!("run {} — {}", run.request_id, run.status));
    }
}

async fn cmd_run(args: RunArgs) -> Result<()> {
    let config = load_config()?;

    let tone_name = args
        .tone
        .unwrap_or_else(|| config.defaults.tone.clone());
    let tone: Tone = tone_name
        .parse()
        .map_err(|e| eyre!("invalid tone: {e}"))?;

    let platforms = args
        .platforms
        .iter()
        .map(|p| p.parse::<Platform>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| eyre!("invalid platform: {e}"))?;

    let request = Request {
        topic: args.topic,
        tone,
        platforms,
        // --research-only implies the research stage.
        research: args.research || args.research_only,
        lead_gen: args.leads,
        outreach: args.outreach,
        research_only: args.research_only,
        target_audience: args.audience,
        custom_instructions: args.instructions,
    };

    let db_path = expand_home(args.db.as_deref().unwrap_or(&config.defaults.db_path));
    let store = RunStore::open(&db_path).await?;

    let provider = select_provider(&config, args.offline)?;
    let stages = StageSet::with_provider(provider, config.lead_gen.max_leads);
    let pipeline = Pipeline::new(stages, PipelineConfig::from(&config)).with_sink(Arc::new(store));

    let progress = SpinnerProgress::new();
    let run = pipeline
        .run_with(request, CancellationToken::new(), &progress)
        .await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&run)?);
    } else {
        print_summary(&run);
        println!("\nrun {} saved to {}", run.request_id, db_path.display());
    }

    Ok(())
}

/// One-sentence preview of a longer text.
fn preview(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        flat
    } else {
        let cut: String = flat.chars().take(max_chars).collect();
        format!("{}…", cut.trim_end())
    }
}

fn print_summary(run: &PipelineRun) {
    println!("status: {}   duration: {}ms", run.status, run.duration_ms);

    for stage in &run.stages {
        let detail = stage
            .error
            .as_ref()
            .map(|e| format!(" ({})", e.message))
            .unwrap_or_default();
        println!("  {:<16} {}{detail}", stage.kind.to_string(), stage.status);
    }

    if let Some(research) = &run.research {
        println!("\nresearch: {}", preview(&research.summary, 160));
        for source in research.sources.iter().take(3) {
            println!("  [{:.2}] {}", source.relevance, source.url);
        }
    }

    if !run.leads.is_empty() {
        println!("\nleads ({}):", run.leads.len());
        for lead in run.leads.iter().take(5) {
            println!(
                "  [{:.2}] {} — {} followers on {}",
                lead.relevance_score,
                lead.name,
                lead.follower_count,
                lead.platform.display_name()
            );
        }
    }

    if !run.content.is_empty() {
        println!("\ncontent:");
        for (platform, draft) in &run.content {
            println!(
                "  {} ({} chars, {} hashtags): {}",
                platform.display_name(),
                draft.body.chars().count(),
                draft.hashtags.len(),
                preview(&draft.body, 100)
            );
        }
    }

    if !run.outreach.is_empty() {
        println!("\noutreach ({} messages):", run.outreach.len());
        for message in run.outreach.iter().take(3) {
            println!("  → {} — {}", message.lead_name, message.subject);
        }
    }
}

// ---------------------------------------------------------------------------
// platforms / tones / history / config
// ---------------------------------------------------------------------------

fn cmd_platforms() -> Result<()> {
    println!("{:<12} {:>10} {:>10}  {}", "platform", "max chars", "hashtags", "tone hint");
    for policy in all_policies() {
        let hashtags = if policy.hashtag_max == 0 {
            "none".to_string()
        } else {
            format!("{}–{}", policy.hashtag_min, policy.hashtag_max)
        };
        println!(
            "{:<12} {:>10} {:>10}  {}",
            policy.platform.as_str(),
            policy.max_body_length,
            hashtags,
            policy.tone_hint
        );
    }
    Ok(())
}

fn cmd_tones() -> Result<()> {
    for tone in Tone::ALL {
        println!("{:<14} {}", tone.as_str(), tone.description());
    }
    Ok(())
}

async fn cmd_history(db: Option<&str>, limit: u32) -> Result<()> {
    let config = load_config()?;
    let db_path = expand_home(db.unwrap_or(&config.defaults.db_path));
    let store = RunStore::open(&db_path).await?;

    let runs = store.list_runs(limit).await?;
    if runs.is_empty() {
        println!("no runs recorded in {}", db_path.display());
        return Ok(());
    }

    println!("{:<38} {:<10} {:>9}  {}", "run", "status", "duration", "topic");
    for run in runs {
        println!(
            "{:<38} {:<10} {:>7}ms  {}",
            run.id, run.status, run.duration_ms, run.topic
        );
    }
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("created {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config = load_config()?;
    let rendered = toml::to_string_pretty(&config)?;
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expand_home_leaves_absolute_paths() {
        assert_eq!(expand_home("/tmp/runs.db"), PathBuf::from("/tmp/runs.db"));
    }

    #[test]
    fn expand_home_resolves_tilde() {
        let expanded = expand_home("~/runs.db");
        assert!(!expanded.to_string_lossy().starts_with('~'));
        assert!(expanded.to_string_lossy().ends_with("runs.db"));
    }

    #[test]
    fn preview_truncates_and_flattens() {
        assert_eq!(preview("short text", 50), "short text");
        assert_eq!(preview("a\nb\t c", 50), "a b c");
        let long = "word ".repeat(40);
        let cut = preview(&long, 20);
        assert!(cut.chars().count() <= 21); // 20 + ellipsis
        assert!(cut.ends_with('…'));
    }
}
