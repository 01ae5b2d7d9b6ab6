mod config;
mod db;
mod errors;
mod llm_client;
mod models;
mod notify;
mod pipeline;
mod schedule;
mod scoring;
mod scraping;
mod state;
mod storage;

#[cfg(test)]
mod testing;

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{Duration, Local, Utc};
use clap::{Args, Parser, Subcommand};
use dialoguer::{theme::ColorfulTheme, Confirm};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Config, ScorerKind};
use crate::db::create_pool;
use crate::errors::SentinelError;
use crate::llm_client::LlmClient;
use crate::notify::{EmailSender, ResendMailer};
use crate::schedule::crontab::{install, uninstall, CrontabBackend, SystemCrontab};
use crate::schedule::{build_entries, marked_lines, parse_times, DEFAULT_TIMES};
use crate::scoring::keyword::KeywordJobScorer;
use crate::scoring::llm::LlmJobScorer;
use crate::scoring::JobScorer;
use crate::scraping::apify::ApifyClient;
use crate::scraping::ApifyJobSource;
use crate::state::AppState;
use crate::storage::history::JobHistory;
use crate::storage::snapshots::SnapshotStore;

#[derive(Parser)]
#[command(name = "sentinel", version)]
#[command(about = "Scrapes job boards, scores postings and emails the new matches")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full pipeline once (default)
    Run {
        /// Print the run summary as JSON on stdout
        #[arg(long)]
        json: bool,
    },

    /// Manage the crontab entries that trigger runs
    #[command(subcommand)]
    Cron(CronCommand),

    /// Inspect and maintain stored snapshots and history
    #[command(subcommand)]
    Data(DataCommand),

    /// Validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand)]
enum CronCommand {
    /// Install (or replace) the daily run entries
    Install {
        #[command(flatten)]
        common: CronArgs,
        /// Comma-separated HH:MM run times
        #[arg(long, default_value_t = default_times())]
        times: String,
    },

    /// Remove every Sentinel entry
    Uninstall {
        #[command(flatten)]
        common: CronArgs,
    },

    /// Print the installed Sentinel entries
    Show,
}

#[derive(Args)]
struct CronArgs {
    /// Skip the confirmation prompt
    #[arg(long, short = 'y')]
    yes: bool,
    /// Where crontab backups are written
    #[arg(long, default_value = "backups")]
    backup_dir: PathBuf,
}

#[derive(Subcommand)]
enum DataCommand {
    /// Snapshot and history statistics
    Stats,

    /// Delete snapshots (and optionally history) past retention
    Cleanup {
        /// Snapshot age limit in days [default: RETENTION_DAYS]
        #[arg(long)]
        days: Option<u32>,
        /// Also forget sent jobs older than this many days
        #[arg(long)]
        history_days: Option<u32>,
    },

    /// Merge every JSON snapshot into one CSV
    Merge {
        #[arg(long, default_value = "all_jobs.csv")]
        output: String,
    },

    /// Most recently sent jobs
    History {
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Parse the environment and report what a run would use
    Check,
}

fn default_times() -> String {
    DEFAULT_TIMES
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

    // Initialize structured logging (stderr, so stdout stays clean for command output)
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), rust_log))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Command::Run { json: false });

    if let Err(e) = dispatch(command).await {
        error!("{e}");
        std::process::exit(e.exit_code());
    }
}

async fn dispatch(command: Command) -> Result<(), SentinelError> {
    match command {
        Command::Run { json } => run(json).await,
        Command::Cron(cmd) => cron(cmd),
        Command::Data(cmd) => data(cmd).await,
        Command::Config(ConfigCommand::Check) => config_check(),
    }
}

fn load_config() -> Result<Config, SentinelError> {
    Config::from_env().map_err(|e| SentinelError::Config(format!("{e:#}")))
}

fn config_error(e: anyhow::Error) -> SentinelError {
    SentinelError::Config(e.to_string())
}

async fn run(json: bool) -> Result<(), SentinelError> {
    let config = load_config()?;
    info!("Starting Job Hunter Sentinel v{}", env!("CARGO_PKG_VERSION"));

    let state = build_state(config).await?;
    let summary = pipeline::run(&state, Local::now().fixed_offset()).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!(
            "{} | scraped {} · analyzed {} · qualified {} · sent {} to {} recipient(s) in {:.1}s",
            summary.status,
            summary.scraped,
            summary.analyzed,
            summary.qualified,
            summary.sent,
            summary.recipients_notified,
            summary.duration.as_secs_f64()
        );
    }
    Ok(())
}

async fn build_state(config: Config) -> Result<AppState, SentinelError> {
    let apify = ApifyClient::new(config.require_apify_token().map_err(config_error)?.to_string());
    let resend_key = config.require_resend_api_key().map_err(config_error)?.to_string();

    // Initialize scorer (LLM by default; SCORER=keyword for offline runs)
    let scorer: Arc<dyn JobScorer> = match config.scorer {
        ScorerKind::Llm => {
            let key = config.require_anthropic_api_key().map_err(config_error)?;
            let llm = LlmClient::new(key.to_string());
            info!("LLM client initialized (model: {})", llm_client::MODEL);
            Arc::new(LlmJobScorer::new(llm, config.min_score))
        }
        ScorerKind::Keyword => {
            info!("Using keyword scorer");
            Arc::new(KeywordJobScorer)
        }
    };

    let snapshots = Arc::new(SnapshotStore::new(&config.data_dir)?);
    let history = JobHistory::new(create_pool(&config.database_url).await?);
    let email = EmailSender::new(Arc::new(ResendMailer::new(resend_key)), config.email_from.clone());

    Ok(AppState {
        source: Arc::new(ApifyJobSource::new(apify)),
        scorer,
        email,
        history,
        snapshots,
        config,
    })
}

fn confirm(prompt: &str, yes: bool) -> Result<(), SentinelError> {
    if yes {
        return Ok(());
    }
    let accepted = Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(false)
        .interact()
        .map_err(anyhow::Error::from)?;
    if accepted {
        Ok(())
    } else {
        Err(SentinelError::Aborted)
    }
}

fn cron(command: CronCommand) -> Result<(), SentinelError> {
    let backend = SystemCrontab::default();
    let now = Local::now().naive_local();

    match command {
        CronCommand::Install { common, times } => {
            let times = parse_times(&times)?;
            let workdir = std::env::current_dir()?;
            let exe = std::env::current_exe()?;
            let log_dir = workdir.join("logs");
            std::fs::create_dir_all(&log_dir)?;

            let entries = build_entries(&times, &workdir, &exe, &log_dir.join("cron.log"));
            println!("The following crontab entries will be installed:");
            for entry in &entries {
                println!("  {entry}");
            }
            confirm("Install these entries?", common.yes)?;

            let report = install(&backend, &entries, &common.backup_dir, now)?;
            println!("Backup: {}", report.backup.display());
            println!(
                "Installed {} entries (replaced {} previous)",
                report.installed, report.replaced
            );
        }
        CronCommand::Uninstall { common } => {
            confirm("Remove all Job Hunter Sentinel crontab entries?", common.yes)?;
            let report = uninstall(&backend, &common.backup_dir, now)?;
            println!("Backup: {}", report.backup.display());
            println!("Removed {} entries", report.removed);
        }
        CronCommand::Show => {
            let current = backend.read()?.unwrap_or_default();
            let lines = marked_lines(&current);
            if lines.is_empty() {
                println!("No Job Hunter Sentinel entries installed");
            }
            for line in lines {
                println!("{line}");
            }
        }
    }
    Ok(())
}

async fn data(command: DataCommand) -> Result<(), SentinelError> {
    let config = load_config()?;
    let store = SnapshotStore::new(&config.data_dir)?;

    match command {
        DataCommand::Stats => {
            let stats = store.statistics()?;
            let history = JobHistory::new(create_pool(&config.database_url).await?);
            println!("Directory:     {}", store.dir().display());
            println!(
                "Total files:   {} ({} JSON, {} CSV)",
                stats.total_files, stats.json_files, stats.csv_files
            );
            println!("Jobs stored:   {}", stats.total_jobs);
            println!("Storage size:  {:.2} MB", stats.total_size_mb());
            println!("Oldest file:   {}", stats.oldest_file.as_deref().unwrap_or("-"));
            println!("Newest file:   {}", stats.newest_file.as_deref().unwrap_or("-"));
            println!("Jobs sent:     {}", history.sent_count().await?);
        }
        DataCommand::Cleanup { days, history_days } => {
            let days = days.unwrap_or(config.retention_days);
            let deleted = store.cleanup_old_files(days, Local::now().naive_local())?;
            println!("Deleted {deleted} snapshot files older than {days} days");

            if let Some(history_days) = history_days {
                let history = JobHistory::new(create_pool(&config.database_url).await?);
                let purged = match Utc::now().checked_sub_signed(Duration::days(i64::from(history_days))) {
                    Some(cutoff) => history.purge_sent_before(cutoff).await?,
                    None => 0,
                };
                println!("Forgot {purged} sent jobs older than {history_days} days");
            }
        }
        DataCommand::Merge { output } => match store.merge_all_jobs(&output)? {
            Some(path) => println!("Merged snapshots into {}", path.display()),
            None => println!("No jobs to merge"),
        },
        DataCommand::History { limit } => {
            let history = JobHistory::new(create_pool(&config.database_url).await?);
            for row in history.recent(limit).await? {
                println!(
                    "{}  {:<24} {:>2}/10  {} @ {}  {}",
                    row.sent_at.format("%Y-%m-%d %H:%M"),
                    row.recipient,
                    row.score,
                    row.title,
                    row.company,
                    row.job_url
                );
            }
        }
    }
    Ok(())
}

fn config_check() -> Result<(), SentinelError> {
    let config = load_config()?;

    println!("Recipients:");
    for r in &config.recipients {
        println!(
            "  {} (sponsorship: {}) terms: {}",
            r.email,
            if r.needs_sponsorship { "needed" } else { "not needed" },
            r.search_terms.join(", ")
        );
    }
    println!("Search terms:  {}", config.search_terms().join(", "));
    println!("Locations:     {}", config.locations.join(", "));
    println!(
        "Sites:         {}",
        config.sites.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", ")
    );
    println!("Results/query: {}", config.results_wanted);
    println!("Max age:       {}h", config.hours_old);
    println!("Min score:     {}/10", config.min_score);
    println!("Retention:     {} days", config.retention_days);
    println!("Data dir:      {}", config.data_dir.display());
    println!("Database:      {}", config.database_url);
    println!("Scorer:        {:?}", config.scorer);

    let mut missing = Vec::new();
    if config.apify_token.is_none() {
        missing.push("APIFY_TOKEN");
    }
    if config.resend_api_key.is_none() {
        missing.push("RESEND_API_KEY");
    }
    if config.scorer == ScorerKind::Llm && config.anthropic_api_key.is_none() {
        missing.push("ANTHROPIC_API_KEY");
    }

    if missing.is_empty() {
        println!("Configuration OK");
        Ok(())
    } else {
        Err(SentinelError::Config(format!(
            "Missing required variables for `run`: {}",
            missing.join(", ")
        )))
    }
}
