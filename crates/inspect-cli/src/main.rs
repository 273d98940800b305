use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use inspect_core::{CacheConfig, Container};

mod scenario;

use scenario::{Runner, Scenario, Summary};

const DEFAULT_CONFIG: &str = "inspect-cache.json";

/// inspect-cache - Replay inspector sessions against the binding cache
#[derive(Parser, Debug)]
#[command(name = "inspect-cache")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Scenario file to replay
    #[arg(short, long, value_name = "FILE")]
    scenario: Option<PathBuf>,

    /// Path to inspect-cache.json configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Write a default inspect-cache.json in the current directory
    #[arg(long)]
    init: bool,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,

    /// Run a cleanup sweep every N ticks (0 disables it)
    #[arg(long, value_name = "TICKS")]
    cleanup_interval: Option<u32>,

    /// Fold null targets into keys instead of skipping them
    #[arg(long)]
    distinguish_nulls: bool,

    /// Never instantiate this preview provider (repeatable)
    #[arg(long, value_name = "PROVIDER")]
    disable_provider: Vec<String>,
}

fn main() -> anyhow::Result<()> {
    // Set RUST_LOG=debug for per-step logs
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if cli.init {
        init_config()?;
        return Ok(());
    }

    let config = load_config(&cli)?;

    let Some(ref scenario_path) = cli.scenario else {
        eprintln!("Error: No scenario specified. Use --help for usage information.");
        std::process::exit(1);
    };

    let source = std::fs::read_to_string(scenario_path).map_err(|e| {
        anyhow::anyhow!("Failed to read scenario {}: {}", scenario_path.display(), e)
    })?;
    let scenario = Scenario::from_json(&source)?;
    info!(
        "Replaying {} step(s) over {} object(s)",
        scenario.steps.len(),
        scenario.objects.len()
    );

    let container = Container::new(config);
    let mut runner = Runner::new(container.create_session());
    runner.run(&scenario)?;
    let summary = runner.finish();

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }

    debug!(
        "{} error(s), {} warning(s) reported",
        container.error_count(),
        container.warning_count()
    );
    Ok(())
}

fn init_config() -> anyhow::Result<()> {
    let path = Path::new(DEFAULT_CONFIG);
    if path.exists() {
        anyhow::bail!("{} already exists", DEFAULT_CONFIG);
    }

    CacheConfig::init_file(path)
        .map_err(|e| anyhow::anyhow!("Failed to write {}: {}", DEFAULT_CONFIG, e))?;
    println!("Created {}", DEFAULT_CONFIG);
    Ok(())
}

/// Explicit config, else inspect-cache.json if present, else defaults;
/// command-line flags win over the file
fn load_config(cli: &Cli) -> anyhow::Result<CacheConfig> {
    let mut config = if let Some(ref path) = cli.config {
        CacheConfig::from_file(path)
            .map_err(|e| anyhow::anyhow!("Failed to load config file: {}", e))?
    } else {
        let default_path = PathBuf::from(DEFAULT_CONFIG);
        if default_path.exists() {
            CacheConfig::from_file(&default_path)
                .map_err(|e| anyhow::anyhow!("Failed to load {}: {}", DEFAULT_CONFIG, e))?
        } else {
            CacheConfig::default()
        }
    };

    if let Some(interval) = cli.cleanup_interval {
        config.cache_options.cleanup_interval_ticks = interval;
    }
    if cli.distinguish_nulls {
        config.cache_options.distinguish_null_targets = true;
    }
    config
        .disabled_providers
        .extend(cli.disable_provider.iter().cloned());

    Ok(config)
}

fn print_summary(summary: &Summary) {
    let stats = &summary.stats;
    println!(
        "Replayed {} step(s) over {} tick(s)",
        summary.steps, summary.ticks
    );
    println!("  bindings cached:      {}", summary.bindings);
    println!("  previews cached:      {}", summary.previews);
    println!("  previews listed:      {}", summary.previews_listed);
    println!("  failed requests:      {}", summary.failed_requests);
    println!(
        "  hits / misses:        {} / {} ({} fast path)",
        stats.hits, stats.misses, stats.fast_paths
    );
    println!("  constructed:          {}", stats.constructed);
    println!("  soft releases:        {}", stats.soft_releases);
    println!("  disposed:             {}", stats.disposed);
    println!("  swept:                {}", stats.swept);
    println!("  dropped after reload: {}", stats.dropped_after_reload);
}
