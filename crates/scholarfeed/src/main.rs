use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use scholarfeed::config::{validate_config, ExportFormat};
use scholarfeed::db::stats_repo;
use scholarfeed::{
    export_snapshot, load_config, BatchCoordinator, Config, ConfigError, Database, Enricher,
    ImapMailSource, PipelineConfig, SqliteStore,
};

#[derive(Parser)]
#[command(name = "scholarfeed")]
#[command(version, about = "Incremental Google Scholar alert ingestion", long_about = None)]
struct Cli {
    /// Path to a scholarfeed.json config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Csv,
    Json,
}

impl From<FormatArg> for ExportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Csv => ExportFormat::Csv,
            FormatArg::Json => ExportFormat::Json,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest new alert messages, then export the snapshot
    Run(RunArgs),
    /// Write the snapshot of stored papers without ingesting
    Export {
        /// Destination file (defaults to output.path)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Export format (defaults to the file extension)
        #[arg(long, value_enum)]
        format: Option<FormatArg>,
    },
    /// Show ledger and paper counts
    Stats,
}

#[derive(Args)]
struct RunArgs {
    /// Maximum number of newest messages to examine
    #[arg(long)]
    max_messages: Option<usize>,

    /// Messages per committed batch
    #[arg(long)]
    batch_size: Option<usize>,

    /// Store papers without calling the annotation API
    #[arg(long)]
    no_enrich: bool,

    /// Mailbox folder to read
    #[arg(long)]
    folder: Option<String>,

    /// Export destination
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Skip the export after ingesting
    #[arg(long)]
    no_export: bool,
}

fn init_logging(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber: Box<dyn tracing::Subscriber + Send + Sync> = match format {
        LogFormat::Text => Box::new(tracing_subscriber::fmt().with_env_filter(filter).finish()),
        LogFormat::Json => Box::new(
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .finish(),
        ),
    };

    if let Err(e) = tracing_log::LogTracer::init() {
        eprintln!("Failed to bridge log records: {}", e);
    }
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to install tracing subscriber: {}", e);
    }
}

fn open_database(config: &Config) -> scholarfeed::Result<Database> {
    let path = config
        .store
        .resolved_path()
        .ok_or(ConfigError::NoStoreLocation)?;
    Ok(Database::open(&path)?)
}

async fn run_ingest(mut config: Config, args: RunArgs) -> scholarfeed::Result<bool> {
    if let Some(max) = args.max_messages {
        config.ingest.max_messages = max;
    }
    if let Some(size) = args.batch_size {
        config.ingest.batch_size = size;
    }
    if let Some(folder) = args.folder {
        config.mail.folder = folder;
    }
    if let Some(output) = args.output {
        config.output.path = output;
    }
    if args.no_enrich {
        config.enrichment.enabled = false;
    }
    validate_config(&config)?;

    let db = open_database(&config)?;
    let enricher = Enricher::from_config(&config.enrichment)?;
    if !enricher.is_enabled() {
        info!("Enrichment disabled, papers are stored without annotations");
    }

    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&shutdown);
    if let Err(e) = ctrlc::set_handler(move || {
        flag.store(true, Ordering::Relaxed);
    }) {
        warn!("Could not install Ctrl-C handler: {}", e);
    }

    let mut coordinator = BatchCoordinator::new(
        PipelineConfig::from_config(&config),
        ImapMailSource::new(config.mail.clone()),
        SqliteStore::new(db.clone()),
        enricher,
    )
    .with_shutdown(shutdown);

    let summary = match coordinator.run().await {
        Ok(summary) => summary,
        Err(e) => {
            eprintln!("{}", coordinator.summary());
            return Err(e.into());
        }
    };
    println!("{}", summary);

    if !args.no_export {
        write_export(&db, &config.output.path, config.output.resolved_format())?;
    }

    Ok(!summary.interrupted)
}

fn write_export(db: &Database, path: &Path, format: ExportFormat) -> scholarfeed::Result<()> {
    let rows = export_snapshot(db, path, format)?;
    println!("Exported {} papers to {}", rows, path.display());
    Ok(())
}

fn print_stats(db: &Database) -> scholarfeed::Result<()> {
    let stats = stats_repo::snapshot(db)?;
    println!("processed messages: {}", stats.processed_messages);
    println!("papers:             {}", stats.papers);
    println!("enriched papers:    {}", stats.enriched_papers);
    println!("message links:      {}", stats.links);
    println!(
        "last processed at:  {}",
        stats.last_processed_at.as_deref().unwrap_or("never")
    );
    Ok(())
}

async fn dispatch(cli: Cli) -> scholarfeed::Result<bool> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Run(args) => run_ingest(config, args).await,
        Commands::Export { output, format } => {
            let db = open_database(&config)?;
            let path = output.unwrap_or_else(|| config.output.path.clone());
            let format = format.map(ExportFormat::from).unwrap_or_else(|| {
                let mut output = config.output.clone();
                output.path = path.clone();
                output.resolved_format()
            });
            write_export(&db, &path, format)?;
            Ok(true)
        }
        Commands::Stats => {
            let db = open_database(&config)?;
            print_stats(&db)?;
            Ok(true)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let dotenv_loaded = dotenvy::dotenv().is_ok();
    let cli = Cli::parse();
    init_logging(cli.log_format);
    if dotenv_loaded {
        info!("Loaded environment from .env");
    }

    match dispatch(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => {
            warn!("Run interrupted before all messages were processed");
            ExitCode::from(130)
        }
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
