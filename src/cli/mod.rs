//! Command-line interface for cloudgdpr
//!
//! This module handles:
//! - Command-line argument parsing using clap
//! - Configuration loading and validation
//! - Dispatching the export, delete and utility subcommands

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;

use crate::config::{Config, ExportFormat, LogLevel};
use crate::engine::{Gdpr, ProgressTracker};
use crate::error::{ConfigError, Result};
use crate::output::{self, WrittenFile};
use crate::store::MongoStore;
use crate::store::mongo::{connect, sanitize_uri};
use crate::transform::{CsvTransformer, IdentityTransformer, JsonTransformer, NamingStrategy};

pub mod completion;
pub mod confirmation;
pub mod summary;

/// Export and erase personal data held in a record store
#[derive(Parser, Debug)]
#[command(
    name = "cloudgdpr",
    version,
    about = "Export and erase a user's personal data",
    long_about = "Fetches every declared record type from every declared container and writes
it out as CSV or JSON files, or deletes every zone of those containers."
)]
pub struct CliArgs {
    /// Configuration file path
    #[arg(short = 'c', long = "config", value_name = "FILE", global = true)]
    pub config_file: Option<PathBuf>,

    /// MongoDB connection URI
    ///
    /// Format: mongodb://[username:password@]host[:port][/?options]
    #[arg(long, value_name = "URI", global = true)]
    pub uri: Option<String>,

    /// Quiet mode (no progress, no summary)
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,

    /// Verbose mode (detailed logging)
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// Very verbose mode (trace logging)
    #[arg(long = "vv", global = true)]
    pub very_verbose: bool,

    /// Connection timeout in seconds
    #[arg(long, value_name = "SECONDS", global = true)]
    pub timeout: Option<u64>,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Subcommands for cloudgdpr
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Export every declared record to files
    Export {
        /// Output format (json, csv, raw)
        #[arg(long, value_name = "FORMAT")]
        format: Option<String>,

        /// Output directory
        #[arg(short = 'o', long = "out", value_name = "DIR")]
        out: Option<PathBuf>,

        /// Naming of containers without a display name (random, stable)
        #[arg(long, value_name = "NAMING")]
        naming: Option<String>,
    },

    /// Delete every zone of every declared container
    Delete {
        /// Skip the confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Show version information
    Version,

    /// Generate shell completion script
    Completion {
        /// Shell type (bash, zsh, fish)
        #[arg(value_name = "SHELL")]
        shell: String,
    },

    /// Show configuration
    Config {
        /// Show effective configuration
        #[arg(long)]
        show: bool,

        /// Validate configuration file
        #[arg(long)]
        validate: bool,
    },
}

/// CLI interface handler
pub struct CliInterface {
    /// Parsed command-line arguments
    args: CliArgs,

    /// Loaded configuration
    config: Config,
}

impl CliInterface {
    /// Create a new CLI interface
    ///
    /// # Returns
    /// * `Result<Self>` - New CLI interface or error
    pub fn new() -> Result<Self> {
        let args = CliArgs::parse();
        let config = Self::load_config(&args)?;

        Ok(Self { args, config })
    }

    /// Load configuration from file and merge with environment and arguments
    ///
    /// Validation is left to the commands that need a usable configuration,
    /// so that `config --validate` can still report on a broken file.
    ///
    /// # Arguments
    /// * `args` - Command-line arguments
    ///
    /// # Returns
    /// * `Result<Config>` - Loaded configuration or error
    fn load_config(args: &CliArgs) -> Result<Config> {
        let config_path = args.config_file.as_deref();
        let mut config = Config::load_from_file(config_path)?;

        config.apply_env_overrides();
        Self::apply_args_to_config(&mut config, args);

        Ok(config)
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the CLI arguments
    pub fn args(&self) -> &CliArgs {
        &self.args
    }

    /// Apply CLI arguments to configuration
    ///
    /// Overrides configuration values with CLI arguments where provided
    fn apply_args_to_config(config: &mut Config, args: &CliArgs) {
        Self::apply_logging_args(config, args);
        Self::apply_connection_args(config, args);
        Self::apply_export_args(config, args);
    }

    /// Apply logging-related CLI arguments to configuration
    fn apply_logging_args(config: &mut Config, args: &CliArgs) {
        config.logging.level = if args.very_verbose {
            LogLevel::Trace
        } else if args.verbose {
            LogLevel::Debug
        } else if args.quiet {
            LogLevel::Error
        } else {
            config.logging.level
        };
    }

    /// Apply connection-related CLI arguments to configuration
    fn apply_connection_args(config: &mut Config, args: &CliArgs) {
        if let Some(uri) = &args.uri {
            config.connection.uri = uri.clone();
        }
        if let Some(timeout) = args.timeout {
            config.connection.timeout = timeout;
        }
    }

    /// Apply export-related CLI arguments to configuration
    fn apply_export_args(config: &mut Config, args: &CliArgs) {
        if let Commands::Export {
            format,
            out,
            naming,
        } = &args.command
        {
            if let Some(format) = format {
                match format.parse::<ExportFormat>() {
                    Ok(format) => config.export.format = format,
                    Err(e) => eprintln!("Warning: {}, using {:?}", e, config.export.format),
                }
            }
            if let Some(out) = out {
                config.export.output_dir = out.clone();
            }
            if let Some(naming) = naming {
                match naming.parse::<NamingStrategy>() {
                    Ok(naming) => config.export.naming = naming,
                    Err(e) => eprintln!("Warning: {}, using {:?}", e, config.export.naming),
                }
            }
        }
    }

    /// Run the selected subcommand
    ///
    /// # Returns
    /// * `Result<()>` - Success or error
    pub async fn execute(&self) -> Result<()> {
        match &self.args.command {
            Commands::Export { .. } => self.run_export().await,
            Commands::Delete { yes } => self.run_delete(*yes).await,
            Commands::Version => {
                self.show_version();
                Ok(())
            }
            Commands::Completion { shell } => completion::generate_completion(shell),
            Commands::Config { show, validate } => self.handle_config_command(*show, *validate),
        }
    }

    /// Check the configuration declares something to work on
    fn ensure_declared(&self) -> Result<()> {
        self.config.validate()?;
        if self.config.containers.is_empty() {
            return Err(ConfigError::MissingField("containers".to_string()).into());
        }
        Ok(())
    }

    /// Validate the configuration and build the engine over MongoDB
    async fn build_engine(&self, progress: Arc<ProgressTracker>) -> Result<Gdpr> {
        self.ensure_declared()?;

        if !self.args.quiet {
            println!("Connecting to: {}", sanitize_uri(&self.config.connection.uri));
        }
        let client = connect(&self.config.connection).await?;
        let store = MongoStore::new(client, self.config.store.record_type_field.clone());

        Ok(Gdpr::new(self.config.declaration(), Arc::new(store))
            .with_name_mapping(self.config.name_mapping())
            .with_page_limit(self.config.store.page_size)
            .with_progress(progress))
    }

    /// Export every declared record and write the artifacts to disk
    async fn run_export(&self) -> Result<()> {
        let progress = Arc::new(ProgressTracker::new(!self.args.quiet));
        let gdpr = self.build_engine(Arc::clone(&progress)).await?;
        let out = self.config.export.output_dir.as_path();

        let result = self.export_to_disk(&gdpr).await;
        progress.finish();

        let written: Vec<WrittenFile> = result?;
        info!(
            "Exported {} record(s) into {} file(s)",
            progress.records(),
            written.len()
        );

        if !self.args.quiet {
            println!("{}", summary::written_files_table(&written));
            println!(
                "✅ Exported {} record(s) to {}",
                progress.records(),
                out.display()
            );
        }
        Ok(())
    }

    /// Run the export in the configured format and write its output
    async fn export_to_disk(&self, gdpr: &Gdpr) -> Result<Vec<WrittenFile>> {
        let export = &self.config.export;
        let out = export.output_dir.as_path();

        match export.format {
            ExportFormat::Json => {
                let transformer = JsonTransformer::new().with_naming(export.naming);
                let artifact = gdpr.export(&transformer).await?;
                output::write_artifact(out, &artifact).await
            }
            ExportFormat::Csv => {
                let transformer = CsvTransformer::new().with_naming(export.naming);
                let artifact = gdpr.export(&transformer).await?;
                output::write_artifact(out, &artifact).await
            }
            ExportFormat::Raw => {
                let records = gdpr.export(&IdentityTransformer).await?;
                output::write_raw(out, &records).await
            }
        }
    }

    /// Delete every zone of every declared container
    async fn run_delete(&self, yes: bool) -> Result<()> {
        self.ensure_declared()?;
        if !yes {
            let description = confirmation::erasure_description(&self.config.declaration());
            if !confirmation::prompt_confirmation(&description)? {
                println!("Operation cancelled");
                return Ok(());
            }
        }

        let progress = Arc::new(ProgressTracker::new(!self.args.quiet));
        let gdpr = self.build_engine(Arc::clone(&progress)).await?;
        let result = gdpr.delete_data().await;
        progress.finish();

        let deleted = result?;
        if !self.args.quiet {
            println!("{}", summary::deletion_table(&deleted));
            println!("✅ Deleted {} zone(s)", progress.zones());
        }
        Ok(())
    }

    /// Show version information
    fn show_version(&self) {
        println!("cloudgdpr version {}", env!("CARGO_PKG_VERSION"));
        println!("Rust version: {}", env!("CARGO_PKG_RUST_VERSION"));
    }

    /// Handle config subcommand
    ///
    /// # Arguments
    /// * `show` - Whether to show configuration
    /// * `validate` - Whether to validate configuration
    fn handle_config_command(&self, show: bool, validate: bool) -> Result<()> {
        if validate {
            self.validate_config_file();
        }

        if show {
            self.show_config();
        }

        Ok(())
    }

    /// Validate configuration file
    fn validate_config_file(&self) {
        let path = self.get_config_path();
        println!("Validating configuration file: {}", path.display());

        if !path.exists() {
            println!("❌ Configuration file does not exist");
            return;
        }

        match Config::load_from_file(Some(path.as_path())) {
            Ok(config) => match config.validate() {
                Ok(()) => println!(
                    "✅ Configuration is valid ({} container(s))",
                    config.containers.len()
                ),
                Err(e) => println!("❌ Configuration validation failed: {}", e),
            },
            Err(e) => println!("❌ Failed to load configuration: {}", e),
        }
    }

    /// Show effective configuration
    fn show_config(&self) {
        let path = self.get_config_path();
        println!("Configuration file: {}", path.display());
        println!();
        println!("=== Effective Configuration ===");
        println!();

        let mut shown = self.config.clone();
        shown.connection.uri = sanitize_uri(&shown.connection.uri);
        match shown.to_toml() {
            Ok(toml_str) => println!("{}", toml_str),
            Err(e) => {
                eprintln!("Error formatting configuration: {}", e);
                println!("{:#?}", shown);
            }
        }
    }

    /// Get configuration file path (from args or default)
    fn get_config_path(&self) -> PathBuf {
        self.args
            .config_file
            .clone()
            .unwrap_or_else(Config::default_config_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(argv: &[&str]) -> CliInterface {
        let args = CliArgs::try_parse_from(argv.iter().copied()).unwrap();
        let mut config = Config::default();
        CliInterface::apply_args_to_config(&mut config, &args);
        CliInterface { args, config }
    }

    #[test]
    fn test_subcommand_is_required() {
        assert!(CliArgs::try_parse_from(["cloudgdpr"]).is_err());
    }

    #[test]
    fn test_export_args_override_config() {
        let cli = cli(&[
            "cloudgdpr",
            "export",
            "--format",
            "csv",
            "--out",
            "/tmp/gdpr",
            "--naming",
            "stable",
        ]);
        assert_eq!(cli.config().export.format, ExportFormat::Csv);
        assert_eq!(cli.config().export.naming, NamingStrategy::Stable);
        assert_eq!(cli.config().export.output_dir, PathBuf::from("/tmp/gdpr"));
    }

    #[test]
    fn test_unknown_format_keeps_config_value() {
        let cli = cli(&["cloudgdpr", "export", "--format", "xlsx"]);
        assert_eq!(cli.config().export.format, ExportFormat::Json);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = cli(&[
            "cloudgdpr",
            "delete",
            "--yes",
            "--uri",
            "mongodb://db:27017",
            "--timeout",
            "5",
            "-v",
        ]);
        assert!(matches!(cli.args().command, Commands::Delete { yes: true }));
        assert_eq!(cli.config().connection.uri, "mongodb://db:27017");
        assert_eq!(cli.config().connection.timeout, 5);
        assert_eq!(cli.config().logging.level, LogLevel::Debug);
    }

    #[test]
    fn test_quiet_lowers_log_level() {
        let cli = cli(&["cloudgdpr", "-q", "export"]);
        assert_eq!(cli.config().logging.level, LogLevel::Error);
    }

    #[tokio::test]
    async fn test_export_without_containers_fails_before_connecting() {
        let cli = cli(&["cloudgdpr", "-q", "export"]);
        let err = cli.execute().await.unwrap_err();
        assert!(err.to_string().contains("containers"));
    }

    #[tokio::test]
    async fn test_delete_without_containers_fails_before_prompting() {
        let cli = cli(&["cloudgdpr", "-q", "delete"]);
        let err = cli.execute().await.unwrap_err();
        assert!(err.to_string().contains("containers"));
    }
}
