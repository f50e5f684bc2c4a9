use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::debug;

use test_accelerator::commands::{self, BenchmarkArgs, CoverageArgs, GenerateArgs};
use test_accelerator::config::Config;
use test_accelerator::logging::init_logging;

#[derive(Parser)]
#[command(
    name = "test-accelerator",
    version,
    about = "Generate PHP test scaffolding and analyze test-suite coverage and performance."
)]
struct Cli {
    #[arg(long, global = true, default_value = ".", help = "Project root")]
    root: PathBuf,

    #[arg(long, global = true, help = "Configuration file (default: <root>/test-accelerator.toml)")]
    config: Option<PathBuf>,

    #[arg(long, global = true, default_value_t = false, help = "Enable debug logging")]
    debug: bool,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Generate tests for existing code
    Generate(GenerateArgs),
    /// Analyze test coverage and identify gaps
    Coverage(CoverageArgs),
    /// Analyze test performance and identify bottlenecks
    Benchmark(BenchmarkArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::load(&cli.root, cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("❌ {e}");
            return ExitCode::FAILURE;
        }
    };

    init_logging(&config, cli.debug);

    if !cli.root.is_dir() {
        eprintln!("❌ Project root not found: {}", cli.root.display());
        return ExitCode::FAILURE;
    }

    if config.notifications.enabled {
        debug!(channels = ?config.notifications.channels, "notification channels configured");
    }

    match cli.command {
        CliCommand::Generate(args) => commands::generate(&config, &cli.root, args),
        CliCommand::Coverage(args) => commands::coverage(&config, &cli.root, args),
        CliCommand::Benchmark(args) => commands::benchmark(&config, &cli.root, args),
    }
}
