//! walletpulse - CLI tool for the wallet analytics pipeline
//!
//! This tool provides commands for:
//! - Checking sink configuration and status
//! - Replaying recorded wallet events through the translators
//!
//! Uses XDG Base Directory specification for file locations:
//! - Config: $XDG_CONFIG_HOME/walletpulse/config.toml (~/.config/walletpulse/config.toml)
//! - Logs: $XDG_STATE_HOME/walletpulse/walletpulse.log (~/.local/state/walletpulse/)

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walletpulse_core::config::SinkConfig;
use walletpulse_core::record::{RecordBuilder, SystemClock};
use walletpulse_core::{
    Collaborators, Config, Dispatcher, DomainEvent, HttpSink, MemorySink, Tracker, Translator,
    WalletSnapshot,
};

#[derive(Parser)]
#[command(name = "walletpulse")]
#[command(about = "Translate wallet events into analytics records")]
#[command(version)]
struct Args {
    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show sink configuration and status
    Status,

    /// Replay a JSON-lines file of wallet events
    Replay {
        /// Events file, one JSON event per line
        events: PathBuf,

        /// Wallet snapshot (TOML) used to resolve providers, identity and networks
        #[arg(short, long)]
        wallet: Option<PathBuf>,

        /// Print records as JSON lines instead of sending them
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = Config::load().context("failed to load configuration")?;

    // Initialize logging if verbose; the guard must outlive the command
    let _log_guard = if args.verbose {
        Some(walletpulse_core::logging::init(&config.logging).context("failed to initialize logging")?)
    } else {
        None
    };

    match args.command {
        Command::Status => cmd_status(&config),
        Command::Replay {
            events,
            wallet,
            dry_run,
        } => cmd_replay(&config, &events, wallet.as_deref(), dry_run).await,
    }
}

fn cmd_status(config: &Config) -> Result<()> {
    println!("walletpulse Configuration");
    println!("=========================");
    println!();

    println!("App Origin:      {}", config.app.origin);
    println!("Client:          {} {}", config.app.client_name, config.app.client_version);
    println!("Platform:        {}", config.app.platform);
    println!(
        "Log File:        {}",
        walletpulse_core::logging::log_file_path().display()
    );

    print_sink("Metrics Sink", &config.metrics);
    print_sink("Product Sink", &config.product);

    println!();
    if config.metrics.is_ready() {
        println!("Status: Ready to send");
    } else {
        println!("Status: Not ready (metrics sink not configured)");
        println!();
        println!("Enable it in {}:", Config::config_path().display());
        println!();
        println!("  [metrics]");
        println!("  enabled = true");
        println!("  endpoint = \"https://metrics.example.com\"");
        println!("  api_key = \"xxxxxxxxxxxx\"");
    }

    Ok(())
}

fn print_sink(title: &str, sink: &SinkConfig) {
    println!();
    println!("{}", title);
    println!("  Enabled:       {}", sink.enabled);
    println!(
        "  Endpoint:      {}",
        sink.endpoint.as_deref().unwrap_or("<not set>")
    );
    println!(
        "  API Key:       {}",
        if sink.api_key.is_some() {
            "<set>"
        } else {
            "<not set>"
        }
    );
    println!("  Timeout:       {}s", sink.timeout_secs);
    if let Err(e) = sink.validate() {
        println!("  Invalid:       {}", e);
    }
}

/// Where replayed records go.
enum Sinks {
    DryRun {
        metrics: Arc<MemorySink>,
        product: Arc<MemorySink>,
    },
    Http {
        metrics: Arc<HttpSink>,
        product: Option<Arc<HttpSink>>,
    },
}

impl Sinks {
    fn from_config(config: &Config, dry_run: bool) -> Result<Option<(Self, Dispatcher)>> {
        if dry_run {
            let metrics = Arc::new(MemorySink::new());
            let product = Arc::new(MemorySink::new());
            let dispatcher = Dispatcher::new(metrics.clone()).with_product_sink(product.clone());
            return Ok(Some((Sinks::DryRun { metrics, product }, dispatcher)));
        }

        let client = config.app.client_info();
        let Some(metrics) = HttpSink::from_config(&config.metrics, &client)
            .context("failed to create metrics sink")?
        else {
            return Ok(None);
        };
        let metrics = Arc::new(metrics);
        let product = HttpSink::from_config(&config.product, &client)
            .context("failed to create product sink")?
            .map(Arc::new);

        let mut dispatcher = Dispatcher::new(metrics.clone());
        if let Some(product) = &product {
            dispatcher = dispatcher.with_product_sink(product.clone());
        }
        Ok(Some((Sinks::Http { metrics, product }, dispatcher)))
    }

    /// Wait for delivery and return (records, failures).
    async fn finish(&self) -> Result<(usize, usize)> {
        match self {
            Sinks::DryRun { metrics, product } => {
                let mut count = 0;
                for (sink, records) in [("metrics", metrics.take()), ("product", product.take())] {
                    for (name, record) in records {
                        let line = serde_json::json!({
                            "sink": sink,
                            "name": name,
                            "record": record.to_json(),
                        });
                        println!("{}", serde_json::to_string(&line)?);
                        count += 1;
                    }
                }
                Ok((count, 0))
            }
            Sinks::Http { metrics, product } => {
                metrics.drain().await;
                let mut stats = vec![metrics.stats()];
                if let Some(product) = product {
                    product.drain().await;
                    stats.push(product.stats());
                }
                let sent = stats.iter().map(|s| s.sent).sum();
                let failed = stats.iter().map(|s| s.failed).sum();
                Ok((sent, failed))
            }
        }
    }
}

async fn cmd_replay(
    config: &Config,
    events_path: &Path,
    wallet_path: Option<&Path>,
    dry_run: bool,
) -> Result<()> {
    let content = std::fs::read_to_string(events_path)
        .with_context(|| format!("failed to read events file {}", events_path.display()))?;

    let snapshot = match wallet_path {
        Some(path) => WalletSnapshot::load_from(path)
            .with_context(|| format!("failed to load wallet snapshot {}", path.display()))?,
        None => WalletSnapshot::new(),
    };

    let Some((sinks, dispatcher)) = Sinks::from_config(config, dry_run)? else {
        println!("Metrics sink is not configured. Run 'status' for details, or use --dry-run.");
        return Ok(());
    };

    let translator = Translator::new(
        Collaborators::from_snapshot(Arc::new(snapshot)),
        RecordBuilder::new(config.app.client_info(), Arc::new(SystemClock)),
        &config.app.origin,
    );
    tracing::info!(
        events = %events_path.display(),
        product_sink = dispatcher.has_product_sink(),
        dry_run,
        "Starting replay"
    );
    let tracker = Tracker::new(translator, dispatcher);

    let mut handled = 0usize;
    let mut skipped = 0usize;
    for (index, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match DomainEvent::from_json(line) {
            Ok(event) => {
                tracing::debug!(line = index + 1, event = %event.kind(), "Replaying event");
                tracker.handle(event).await;
                handled += 1;
            }
            Err(e) => {
                tracing::warn!(line = index + 1, error = %e, "Skipping unparseable event");
                eprintln!("Skipping line {}: {}", index + 1, e);
                skipped += 1;
            }
        }
    }

    // Preference changes are deferred until idle
    tracker.settled().await;
    let (records, failed) = sinks.finish().await?;

    eprintln!();
    eprintln!("Replay complete:");
    eprintln!("  Events:   {}", handled);
    eprintln!("  Skipped:  {}", skipped);
    eprintln!("  Records:  {}", records);
    if failed > 0 {
        eprintln!("  Failed:   {}", failed);
    }

    Ok(())
}
