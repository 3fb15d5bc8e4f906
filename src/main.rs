//! GlobResize CLI - bounded-concurrency batch image resizer
//!
//! Expands a glob pattern and shrinks every matched JPEG or PNG so its
//! longest side fits the configured limit.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use console::style;
use tracing::info;

use globresize::{
    check_system, discovery, init_logging, Config, ConfigOverrides, GlobResizeError,
    SchedulingStrategy,
};

/// Exit code for a batch that finished with at least one failed job
const EXIT_JOB_FAILURES: u8 = 2;

/// GlobResize - bounded-concurrency batch image resizer
#[derive(Parser)]
#[command(
    name = "globresize",
    version,
    about = "Shrink every image matched by a glob so its longest side fits a limit",
    long_about = "GlobResize expands a glob pattern, then resizes each matched JPEG or PNG so \
                  its longest side is at most the target length. Images that already fit are \
                  copied unchanged. Outputs are written next to their sources with a prefix."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Glob pattern selecting source files
    #[arg(short, long, value_name = "GLOB")]
    pattern: Option<String>,

    /// Prefix prepended to each output file name [default: resized_]
    #[arg(long, value_name = "PREFIX")]
    prefix: Option<String>,

    /// Longest side of the output, in pixels [default: 2560]
    #[arg(short, long, value_name = "PIXELS")]
    longest_side: Option<u32>,

    /// JPEG quality (1-100) [default: 100]
    #[arg(short, long, value_name = "QUALITY")]
    quality: Option<u8>,

    /// Maximum number of images processed at once [default: 4]
    #[arg(short, long, value_name = "COUNT")]
    concurrency: Option<usize>,

    /// Use Catmull-Rom instead of bilinear resampling
    #[arg(long)]
    high_quality_resize: bool,

    /// How jobs are fed to workers [default: chunked]
    #[arg(long, value_enum, value_name = "STRATEGY")]
    strategy: Option<CliStrategy>,

    /// Configuration file path (.toml, .yaml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// List planned jobs without processing
    #[arg(long)]
    dry_run: bool,

    /// Print the batch summary as JSON
    #[arg(long)]
    json: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Quiet mode (errors only)
    #[arg(short = 'Q', long, conflicts_with = "verbose")]
    quiet: bool,
}

/// Available subcommands
#[derive(Subcommand)]
enum Commands {
    /// Generate example configuration file
    ExampleConfig {
        /// Output file path; the extension picks TOML or YAML
        #[arg(short, long, default_value = "globresize.toml")]
        output: PathBuf,
    },
}

/// CLI-compatible scheduling strategy
#[derive(Clone, Copy, Debug, ValueEnum)]
enum CliStrategy {
    /// Chunks of `concurrency` jobs with a barrier between chunks
    Chunked,
    /// Fixed worker pool draining a bounded queue
    Pool,
}

impl From<CliStrategy> for SchedulingStrategy {
    fn from(strategy: CliStrategy) -> Self {
        match strategy {
            CliStrategy::Chunked => SchedulingStrategy::Chunked,
            CliStrategy::Pool => SchedulingStrategy::Pool,
        }
    }
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        let log_level = if self.quiet {
            Some("error".to_string())
        } else if self.verbose {
            Some("debug".to_string())
        } else {
            None
        };

        ConfigOverrides {
            pattern: self.pattern.clone(),
            prefix: self.prefix.clone(),
            longest_side: self.longest_side,
            quality: self.quality,
            concurrency: self.concurrency,
            high_quality: self.high_quality_resize,
            strategy: self.strategy.map(Into::into),
            log_level,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::ExampleConfig { ref output }) => {
            generate_example_config(output).map(|()| ExitCode::SUCCESS)
        }
        None => run_batch(&cli).await,
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            let message = match e.downcast_ref::<GlobResizeError>() {
                Some(err) => err.user_message(),
                None => format!("{:#}", e),
            };
            eprintln!("{}: {}", style("Error").red().bold(), message);
            ExitCode::FAILURE
        }
    }
}

/// Resolve configuration, then plan and run the batch
async fn run_batch(cli: &Cli) -> anyhow::Result<ExitCode> {
    let config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => Config::default(),
    };
    let config = config.apply_overrides(cli.overrides());
    config.validate()?;

    if !cli.json {
        println!("{}", config);
    }

    init_logging(&config.logging);
    if let Some(path) = &cli.config {
        info!("Loaded configuration from: {:?}", path);
    }
    check_system(&config);

    if cli.dry_run {
        let jobs = discovery::plan_jobs(&config)?;
        println!("{} files would be processed:", style(jobs.len()).bold());
        for job in &jobs {
            println!("  {} -> {}", job.source.display(), job.destination.display());
        }
        return Ok(ExitCode::SUCCESS);
    }

    let report = globresize::run(Arc::new(config)).await?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialize batch report")?
        );
    } else {
        report.print_summary();
    }

    if report.has_failures() {
        Ok(ExitCode::from(EXIT_JOB_FAILURES))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

/// Generate example configuration file
fn generate_example_config(output_path: &Path) -> anyhow::Result<()> {
    let config = Config {
        pattern: "photos/*.jpg".to_string(),
        ..Config::default()
    };
    config.to_file(output_path)?;

    println!(
        "{}: Generated example configuration: {}",
        style("Success").green().bold(),
        output_path.display()
    );

    Ok(())
}
