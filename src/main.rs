//! cloudgdpr - personal data export and erasure
//!
//! Exports every declared record of every declared container to CSV or JSON
//! files, or deletes every zone of those containers.
//!
//! # Usage
//!
//! ```bash
//! # Export as CSV into ./export
//! cloudgdpr -c gdpr.toml export --format csv --out export
//!
//! # Erase without prompting
//! cloudgdpr -c gdpr.toml delete --yes
//! ```

use tracing::Level;
use tracing_subscriber::EnvFilter;

use cloudgdpr::cli::CliInterface;
use cloudgdpr::error::Result;

/// Application entry point
#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Main application logic
///
/// 1. Parse command-line arguments
/// 2. Load configuration
/// 3. Initialize logging
/// 4. Run the selected subcommand
///
/// # Returns
/// * `Result<()>` - Success or error
async fn run() -> Result<()> {
    let cli = CliInterface::new()?;

    initialize_logging(&cli);

    cli.execute().await
}

/// Initialize logging system based on verbosity level
///
/// `RUST_LOG` directives, when set, refine the configured level.
///
/// # Arguments
/// * `cli` - CLI interface with verbosity settings
fn initialize_logging(cli: &CliInterface) {
    let level: Level = cli.config().logging.level.to_tracing_level();
    let directives = std::env::var(EnvFilter::DEFAULT_ENV).ok();

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(log_filter(level, directives.as_deref()))
        .with_target(false)
        .with_writer(std::io::stderr);

    if cli.config().logging.timestamps {
        subscriber.init();
    } else {
        subscriber.without_time().init();
    }
}

/// Build the log filter from the configured level and optional directives
fn log_filter(level: Level, directives: Option<&str>) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(level.into())
        .parse_lossy(directives.unwrap_or_default())
}
