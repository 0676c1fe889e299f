//! Command-line entry point for the procvd supervisor.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use procvd::{loader, sample, ConsoleSink, DefaultExecutor, Supervisor};

#[derive(Debug, Parser)]
#[command(name = "procvd", version, about = "Process-group supervisor")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the configured process groups until interrupted
    Run {
        /// Path to the procfile
        #[arg(short = 'f', long = "file", default_value = "procfile.json")]
        file: PathBuf,
        /// Disable colorized output
        #[arg(long)]
        no_color: bool,
    },
    /// Validate a procfile and print the computed start order
    Check {
        /// Path to the procfile
        #[arg(short = 'f', long = "file", default_value = "procfile.json")]
        file: PathBuf,
    },
    /// Print a sample procfile to stdout
    Sample,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match cli.command {
        Command::Run { file, no_color } => run(&file, no_color).await,
        Command::Check { file } => check(&file),
        Command::Sample => {
            println!("{}", sample::sample_procfile());
            ExitCode::SUCCESS
        }
    }
}

async fn run(file: &std::path::Path, no_color: bool) -> ExitCode {
    let config = match loader::load_file(file) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("procvd: {e}");
            return ExitCode::FAILURE;
        }
    };

    let sink = if no_color {
        Arc::new(ConsoleSink::plain())
    } else {
        Arc::new(ConsoleSink::new())
    };
    let supervisor = match Supervisor::new(&config, Arc::new(DefaultExecutor::new()), sink) {
        Ok(supervisor) => supervisor,
        Err(e) => {
            eprintln!("procvd: {e}");
            return ExitCode::FAILURE;
        }
    };

    let stop = CancellationToken::new();
    tokio::spawn(procvd::signal::trip_on_shutdown_signal(stop.clone()));

    supervisor.run(stop).await;
    ExitCode::SUCCESS
}

fn check(file: &std::path::Path) -> ExitCode {
    let config = match loader::load_file(file) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("procvd: {e}");
            return ExitCode::FAILURE;
        }
    };
    match procvd::DependencyGraph::build(&config) {
        Ok(graph) => {
            println!("start order: {}", graph.start_order.join(" -> "));
            for (group, dependents) in &graph.dependents {
                if !dependents.is_empty() {
                    println!("{group} restarts: {}", dependents.join(", "));
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("procvd: {e}");
            ExitCode::FAILURE
        }
    }
}
