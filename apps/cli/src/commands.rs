//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use prospectcue_core::host::PageLocation;
use prospectcue_core::pipeline::pipeline_for;
use prospectcue_core::replay::{ReplayScript, replay};
use prospectcue_core::route::{classify, fragment_for, matching_kinds};
use prospectcue_shared::{
    AppConfig, LogFormat, PageKind, WatcherConfig, config_file_path, init_config, load_config,
};
use tracing::info;
use url::Url;

/// Origin used when `classify` is given a bare path.
const DEFAULT_ORIGIN: &str = "https://app.example.com";

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// ProspectCue — CRM page customizations driven by SPA navigation.
#[derive(Parser)]
#[command(
    name = "prospectcue",
    version,
    about = "Classify CRM routes and replay click sessions against the customization engine.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text or json. Defaults to the config file's `[logging] format`.
    #[arg(long, global = true)]
    pub log_format: Option<LogFormatArg>,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub(crate) enum LogFormatArg {
    Text,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Text => LogFormat::Text,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Show which page kinds and pipelines a URL or path maps to.
    Classify {
        /// Absolute URL, or a path such as `/contacts/detail/42`.
        url: String,
    },

    /// Replay a scripted click session and report what was dispatched.
    Replay {
        /// Session file (TOML).
        session: PathBuf,
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

/// Initialize tracing based on CLI flags, falling back to the config file.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "prospectcue=info",
        1 => "prospectcue=debug",
        _ => "prospectcue=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    let format = cli
        .log_format
        .map(LogFormat::from)
        .unwrap_or_else(|| load_config().map(|c| c.logging.format).unwrap_or_default());

    match format {
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
        Command::Classify { url } => cmd_classify(&url),
        Command::Replay { session } => cmd_replay(&session).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

fn parse_location(input: &str) -> Result<Url> {
    match Url::parse(input) {
        Ok(url) => Ok(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(DEFAULT_ORIGIN)?
            .join(input)
            .map_err(|e| eyre!("invalid path '{input}': {e}")),
        Err(e) => Err(eyre!("invalid URL '{input}': {e}")),
    }
}

fn cmd_classify(input: &str) -> Result<()> {
    let url = parse_location(input)?;
    let location = PageLocation::from_url(&url);
    let route = location.route();
    let primary = classify(&route);

    println!();
    println!("  Route:   {route}");
    if location.has_hash() {
        println!("  Hash:    {}", location.hash);
    }
    println!("  Kind:    {primary}");

    let kinds = matching_kinds(&route);
    if kinds.is_empty() {
        println!("  No customizations run on this page.");
    }
    for kind in kinds {
        let steps: Vec<_> = pipeline_for(kind).iter().map(|s| s.label()).collect();
        println!(
            "  {kind} ({}): {}",
            fragment_for(kind).unwrap_or_default(),
            steps.join(" → ")
        );
    }
    println!();

    Ok(())
}

async fn cmd_replay(path: &std::path::Path) -> Result<()> {
    let config = load_config()?;
    let script = ReplayScript::load(path)?;

    info!(
        session = %path.display(),
        clicks = script.clicks.len(),
        "replaying session"
    );

    let report = replay(&script, WatcherConfig::from(&config)).await?;

    println!();
    println!("  Session replayed: {}", path.display());
    println!("  Clicks:           {}", report.watcher.clicks);
    println!("  In-page anchors:  {}", report.watcher.in_page_anchors);
    println!("  Ignored clicks:   {}", report.watcher.ignored);
    if report.watcher.failed_checks > 0 {
        println!("  Failed checks:    {}", report.watcher.failed_checks);
    }
    println!();
    println!("  Pipeline runs:");
    for kind in [
        PageKind::ContactDetail,
        PageKind::Conversations,
        PageKind::OpportunitiesList,
        PageKind::PhoneNumberSettings,
    ] {
        let runs = report.runs.get(&kind).copied().unwrap_or(0);
        println!("    {:<24}{runs}", kind.label());
    }

    let failures: Vec<_> = report
        .initial
        .iter()
        .flat_map(|r| r.failures())
        .collect();
    if !failures.is_empty() {
        println!();
        println!("  Load-time step failures:");
        for failure in failures {
            println!("    {}", failure.step());
        }
    }
    println!();
    println!("  Steps invoked:    {}", report.steps.len());
    println!("  Tags recorded:    {}", report.state.tags_added.len());
    println!();

    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = config_file_path()?;
    if path.exists() {
        println!("Config file already exists: {}", path.display());
        return Ok(());
    }
    let path = init_config()?;
    println!("Created config file: {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let content = toml::to_string_pretty(&config)?;
    println!("{content}");
    Ok(())
}
