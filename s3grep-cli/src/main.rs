use anyhow::Context;
use clap::builder::NonEmptyStringValueParser;
use clap::{Parser, Subcommand};
use colored::Colorize;
use s3grep::{connect, search, SearchConfig, SearchSummary, StoreConfig};
use std::io::{self, BufWriter, LineWriter};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "s3grep", author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (YAML); merged over the global and local config files
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); overrides RUST_LOG
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Parser)]
struct GrepArgs {
    /// Literal text to search for
    #[arg(value_parser = NonEmptyStringValueParser::new())]
    query: String,

    /// Bucket to search
    #[arg(short, long, value_parser = NonEmptyStringValueParser::new())]
    bucket: Option<String>,

    /// Only search objects whose key starts with this prefix
    #[arg(short, long)]
    prefix: Option<String>,

    /// Match ASCII letters case-insensitively
    #[arg(short, long)]
    ignore_case: bool,

    /// Number of concurrent workers (default: CPU cores - 1)
    #[arg(short = 'j', long)]
    workers: Option<NonZeroUsize>,

    /// AWS region
    #[arg(long)]
    region: Option<String>,

    /// AWS shared config profile
    #[arg(long)]
    profile: Option<String>,

    /// Custom endpoint for S3-compatible stores
    #[arg(long)]
    endpoint_url: Option<String>,

    /// Use path-style bucket addressing
    #[arg(long)]
    path_style: bool,

    /// Read buckets from <DIR>/<bucket> instead of S3
    #[arg(long, value_name = "DIR")]
    local_dir: Option<PathBuf>,

    /// Print a summary line to stderr when done
    #[arg(short, long)]
    stats: bool,
}

impl GrepArgs {
    fn to_config(&self, log_level: Option<&str>) -> SearchConfig {
        let defaults = SearchConfig::default();
        SearchConfig {
            bucket: self.bucket.clone().unwrap_or_default(),
            prefix: self.prefix.clone().unwrap_or_default(),
            query: self.query.clone(),
            ignore_case: self.ignore_case,
            worker_count: self.workers,
            log_level: log_level.map_or(defaults.log_level, str::to_string),
            store: StoreConfig {
                region: self.region.clone(),
                profile: self.profile.clone(),
                endpoint_url: self.endpoint_url.clone(),
                force_path_style: self.path_style,
                local_dir: self.local_dir.clone(),
            },
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Search the contents of objects in a bucket for a literal string
    Grep(Box<GrepArgs>),
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Grep(args) => {
            let file_config = SearchConfig::load_from(cli.config.as_deref())
                .context("failed to load configuration")?;
            let config = file_config.merge_with_cli(args.to_config(cli.log_level.as_deref()));
            init_logging(cli.log_level.as_deref(), &config.log_level);
            config.validate()?;
            debug!("Effective configuration: {:?}", config);

            let runtime = tokio::runtime::Builder::new_multi_thread()
                .worker_threads(config.workers().get())
                .enable_all()
                .build()
                .context("failed to start the async runtime")?;

            let summary = runtime.block_on(async {
                let client = connect(&config.store).await?;
                let mut out = BufWriter::new(io::stdout().lock());
                // Workers log to stderr too, so it must not stay locked here.
                let mut diagnostics = LineWriter::new(io::stderr());
                search(client, &config, &mut out, &mut diagnostics).await
            })?;

            if args.stats {
                print_stats(&config, &summary);
            }
            Ok(())
        }
    }
}

fn init_logging(cli_level: Option<&str>, config_level: &str) {
    let filter = match cli_level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config_level)),
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn print_stats(config: &SearchConfig, summary: &SearchSummary) {
    eprintln!(
        "Searched {} objects in s3://{}/{}: {} matches, {} fetch errors",
        summary.objects_listed.to_string().bold(),
        config.bucket,
        config.prefix,
        summary.total_matches.to_string().green(),
        summary.fetch_failures.to_string().red()
    );
}
