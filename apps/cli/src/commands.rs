//! CLI command definitions, routing, and tracing setup.

use std::io::{BufRead, Write};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use courseadvisor_catalog::load_catalog;
use courseadvisor_core::{Advisor, AdvisorReply, SessionState};
use courseadvisor_fetch::PageFetcher;
use courseadvisor_index::{build_fragments, write_artifacts};
use courseadvisor_llm::ModelClient;
use courseadvisor_shared::{
    AppConfig, Catalog, CourseRow, init_config, load_config, validate_api_key,
};
use courseadvisor_storage::InteractionLog;

/// Embedding batch size for the offline index build.
const EMBED_BATCH: usize = 64;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// CourseAdvisor — ask questions about the course catalog.
#[derive(Parser)]
#[command(
    name = "courseadvisor",
    version,
    about = "Conversational course advisor over a catalog, a semantic index, and live course pages.",
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
    /// Start an interactive advisory session.
    Chat {
        /// User identifier recorded in the interaction log.
        #[arg(short, long, default_value = "local")]
        user: String,
    },

    /// Ask a single question and exit.
    Ask {
        /// The question to ask.
        query: String,

        /// User identifier recorded in the interaction log.
        #[arg(short, long, default_value = "local")]
        user: String,
    },

    /// Build the semantic index artifacts from the course catalog.
    BuildIndex,

    /// Show recent logged interactions.
    History {
        /// Number of interactions to show.
        #[arg(short, long, default_value = "10")]
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
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

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
        Command::Chat { user } => cmd_chat(&user).await,
        Command::Ask { query, user } => cmd_ask(&query, &user).await,
        Command::BuildIndex => cmd_build_index().await,
        Command::History { limit } => cmd_history(limit).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// Advisory session setup
// ---------------------------------------------------------------------------

/// Assemble the advisor from config. A missing or unreadable catalog is not
/// fatal here; the advisor answers with its fixed unavailable message.
fn build_advisor(config: &AppConfig) -> Result<Advisor> {
    validate_api_key(config)?;

    let catalog_path = config.paths.catalog_path();
    let catalog = match load_catalog(&catalog_path) {
        Ok(catalog) => catalog,
        Err(e) => {
            warn!(path = %catalog_path.display(), error = %e, "catalog unavailable");
            Catalog::new()
        }
    };

    let fetcher = PageFetcher::new(config.fetch.timeout_secs)?;
    let model = ModelClient::from_config(&config.openai)?;

    Ok(Advisor::new(
        catalog,
        config.retrieval.clone(),
        config.paths.index_path(),
        config.paths.metadata_path(),
        fetcher,
        model,
    ))
}

/// Open the interaction log. Logging is fire-and-forget, so failure to open
/// degrades to no logging rather than an error.
async fn open_log(config: &AppConfig) -> Option<InteractionLog> {
    let path = config.paths.log_db_path();
    match InteractionLog::open(&path).await {
        Ok(log) => Some(log),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "interaction log unavailable");
            None
        }
    }
}

async fn log_exchange(log: &Option<InteractionLog>, user: &str, query: &str, reply: &str) {
    if let Some(log) = log {
        if let Err(e) = log.record(user, query, reply).await {
            warn!(error = %e, "failed to log interaction");
        }
    }
}

/// Print one reply. The structured table is rendered only for general
/// answers; detail follow-ups show text only.
fn print_reply(reply: &AdvisorReply) {
    println!("\n{}\n", reply.text);
    if !reply.specific_detail && !reply.rows.is_empty() {
        for row in &reply.rows {
            print_row(row);
        }
    }
}

fn print_row(row: &CourseRow) {
    let value = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());
    println!("  {}", row.name);
    println!("    Code:         {}", value(&row.course_code));
    println!("    Duration:     {}", value(&row.duration));
    println!("    Fee:          {}", value(&row.price));
    println!("    Requirements: {}", value(&row.entry_requirements));
    println!("    Schedule:     {}", value(&row.course_schedule));
    println!("    URL:          {}", row.url);
    println!();
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_chat(user: &str) -> Result<()> {
    let config = load_config()?;
    let mut advisor = build_advisor(&config)?;
    let mut session = SessionState::new(config.retrieval.history_limit);
    let log = open_log(&config).await;

    println!("CourseAdvisor — ask about courses, fees, schedules, and entry requirements.");
    println!("Type 'quit' or 'exit' to leave.\n");

    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("You: ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next() else { break };
        let query = line?.trim().to_string();
        if query.is_empty() {
            continue;
        }
        if query.eq_ignore_ascii_case("quit") || query.eq_ignore_ascii_case("exit") {
            break;
        }

        let reply = advisor.answer(&mut session, &query).await;
        print_reply(&reply);
        log_exchange(&log, user, &query, &reply.text).await;
    }

    Ok(())
}

async fn cmd_ask(query: &str, user: &str) -> Result<()> {
    let config = load_config()?;
    let mut advisor = build_advisor(&config)?;
    let mut session = SessionState::new(config.retrieval.history_limit);
    let log = open_log(&config).await;

    let reply = advisor.answer(&mut session, query).await;
    print_reply(&reply);
    log_exchange(&log, user, query, &reply.text).await;

    Ok(())
}

async fn cmd_build_index() -> Result<()> {
    let config = load_config()?;
    validate_api_key(&config)?;

    let catalog_path = config.paths.catalog_path();
    let catalog = load_catalog(&catalog_path)?;
    if catalog.is_empty() {
        return Err(eyre!(
            "catalog at '{}' holds no courses; nothing to index",
            catalog_path.display()
        ));
    }

    let fragments = build_fragments(&catalog);
    if fragments.is_empty() {
        return Err(eyre!("no course descriptions to index"));
    }
    info!(
        courses = catalog.len(),
        fragments = fragments.len(),
        "embedding catalog fragments"
    );

    let model = ModelClient::from_config(&config.openai)?;
    let bar = ProgressBar::new(fragments.len() as u64);
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} [{bar:30}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar.set_message("embedding fragments");

    let mut vectors: Vec<Vec<f32>> = Vec::with_capacity(fragments.len());
    for batch in fragments.chunks(EMBED_BATCH) {
        let texts: Vec<String> = batch.iter().map(|f| f.fragment_text.clone()).collect();
        let mut batch_vectors = model.embed(&texts).await?;
        vectors.append(&mut batch_vectors);
        bar.inc(batch.len() as u64);
    }
    bar.finish_and_clear();

    let index_path = config.paths.index_path();
    let metadata_path = config.paths.metadata_path();
    write_artifacts(&index_path, &metadata_path, &vectors, &fragments)?;

    println!();
    println!("  Index built successfully!");
    println!("  Courses:   {}", catalog.len());
    println!("  Fragments: {}", fragments.len());
    println!("  Dimension: {}", vectors.first().map(Vec::len).unwrap_or(0));
    println!("  Index:     {}", index_path.display());
    println!("  Metadata:  {}", metadata_path.display());
    println!();

    Ok(())
}

async fn cmd_history(limit: u32) -> Result<()> {
    let config = load_config()?;
    let log = InteractionLog::open(&config.paths.log_db_path()).await?;

    let interactions = log.recent(limit).await?;
    if interactions.is_empty() {
        println!("No logged interactions.");
        return Ok(());
    }
    for interaction in interactions {
        println!("[{}] {}", interaction.created_at, interaction.user_id);
        println!("  Q: {}", interaction.query);
        println!("  A: {}", interaction.reply);
        println!();
    }

    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
