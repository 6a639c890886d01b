//! CLI entrypoint for the rtstream conformance harness.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use rtstream_harness::{ConformanceRunner, HarnessError, copy_file};

/// Conformance tooling for rtstream.
#[derive(Debug, Parser)]
#[command(name = "rtstream-harness")]
#[command(about = "Conformance testing harness for rtstream")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the stream contract properties against real files.
    Conformance {
        /// Output path for the JSON report (stdout if omitted).
        #[arg(long)]
        output: Option<PathBuf>,
        /// Base directory for scratch files (system temp dir if omitted). The
        /// run creates and removes its own subdirectory; nothing else there
        /// is touched.
        #[arg(long)]
        scratch: Option<PathBuf>,
    },
    /// Copy a file through two stream handles using block I/O.
    Copy {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
        /// Bytes per read_block / write_block call.
        #[arg(long, default_value_t = 8192)]
        block_size: usize,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli.command) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("harness: {err}");
            ExitCode::from(2)
        }
    }
}

fn run(command: Command) -> Result<bool, HarnessError> {
    match command {
        Command::Conformance { output, scratch } => {
            let mut runner = match scratch {
                Some(dir) => ConformanceRunner::new(dir),
                None => ConformanceRunner::in_temp_dir(),
            };
            eprintln!("Running conformance in {}", runner.scratch().display());
            let report = runner.run()?;
            let json = serde_json::to_string_pretty(&report)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, json).map_err(|source| HarnessError::Report {
                        path: path.clone(),
                        source,
                    })?;
                    eprintln!("Report written to {}", path.display());
                }
                None => println!("{json}"),
            }
            eprintln!(
                "Total: {} Passed: {} Failed: {}",
                report.summary.total, report.summary.passed, report.summary.failed
            );
            Ok(report.summary.all_passed())
        }
        Command::Copy {
            input,
            output,
            block_size,
        } => {
            let stats = copy_file(&input, &output, block_size)?;
            eprintln!(
                "Copied {} bytes in {} blocks from {} to {}",
                stats.bytes,
                stats.blocks,
                input.display(),
                output.display()
            );
            Ok(true)
        }
    }
}
