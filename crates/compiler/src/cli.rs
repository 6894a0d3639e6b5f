//! CLI wiring for FlagForge.

use crate::pipeline::BuildConfig;
use crate::session::{SearchSession, SessionOptions};
use crate::summary;
use anyhow::Result;
use clap::{Parser, Subcommand};
use flagforge_model::{CancelToken, FlagSet, SearchError};
use flagforge_search::{RunReport, SearchConfig};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "flagforge", about = "Search compiler flag combinations for the fastest build")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum StrategyArg {
    HillClimb,
    Tabu,
    /// Each flag on its own, one batch.
    Sweep,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Search flag combinations for the given sources and write a report.
    Run {
        /// Flag universe JSON.
        flags: PathBuf,
        /// Source files handed to the compiler.
        #[arg(required = true)]
        sources: Vec<PathBuf>,
        #[arg(long, value_enum, default_value = "tabu")]
        strategy: StrategyArg,
        /// Strategy steps; defaults to 20 for tabu, 100 for hill climbing
        /// and 1 for a sweep.
        #[arg(long)]
        iterations: Option<usize>,
        /// Bits flipped per hill-climbing step.
        #[arg(long, default_value_t = 1)]
        num_change: usize,
        /// Concurrent evaluations per tabu step or sweep.
        #[arg(long, default_value_t = 1)]
        workers: usize,
        #[arg(long, default_value_t = 10_000)]
        cache_size: usize,
        #[arg(long, default_value_t = 1_000)]
        tabu_size: usize,
        #[arg(long)]
        seed: Option<u64>,
        /// Starting state as a bit string, one bit per flag.
        #[arg(long)]
        initial: Option<FlagSet>,
        /// Per-execution time limit for the built program.
        #[arg(long)]
        timeout_secs: Option<u64>,
        #[arg(long, default_value_t = 1)]
        runs: usize,
        #[arg(long, default_value_t = 0)]
        warmup_runs: usize,
        /// Compiler to use instead of the flag file's executable.
        #[arg(long)]
        compiler: Option<PathBuf>,
        /// Argument placed before the candidate flags (repeatable).
        #[arg(long = "base-arg", allow_hyphen_values = true)]
        base_args: Vec<String>,
        /// Argument passed to the built program (repeatable).
        #[arg(long = "run-arg", allow_hyphen_values = true)]
        run_args: Vec<String>,
        #[arg(long)]
        output: Option<PathBuf>,
        #[arg(long, default_value = "data/results")]
        results_root: PathBuf,
    },
    /// Print the best entries of a saved report.
    Inspect {
        report: PathBuf,
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
}

impl StrategyArg {
    fn config(self, num_change: usize) -> SearchConfig {
        match self {
            StrategyArg::HillClimb => SearchConfig::hill_climb(num_change).with_iterations(100),
            StrategyArg::Tabu => SearchConfig::tabu().with_iterations(20),
            StrategyArg::Sweep => SearchConfig::sweep(),
        }
    }
}

/// Process exit status for a failed command.
pub fn exit_code(err: &anyhow::Error) -> u8 {
    err.downcast_ref::<SearchError>()
        .map(SearchError::exit_code)
        .unwrap_or(1)
}

pub fn run_cli(cli: Cli) -> Result<()> {
    tracing_subscriber::fmt::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .init();

    match cli.command {
        Command::Run {
            flags,
            sources,
            strategy,
            iterations,
            num_change,
            workers,
            cache_size,
            tabu_size,
            seed,
            initial,
            timeout_secs,
            runs,
            warmup_runs,
            compiler,
            base_args,
            run_args,
            output,
            results_root,
        } => {
            let mut search = strategy
                .config(num_change)
                .with_pool_width(workers)
                .with_cache_capacity(cache_size)
                .with_tabu_capacity(tabu_size);
            if let Some(iterations) = iterations {
                search = search.with_iterations(iterations);
            }
            if let Some(seed) = seed {
                search = search.with_seed(seed);
            }
            if let Some(initial) = initial {
                search = search.with_initial(initial);
            }

            let mut build = BuildConfig::new(sources)
                .with_base_args(base_args)
                .with_run_args(run_args)
                .with_runs(warmup_runs, runs);
            if let Some(compiler) = compiler {
                build = build.with_compiler(compiler);
            }
            if let Some(secs) = timeout_secs {
                build = build.with_timeout(Duration::from_secs(secs));
            }

            let options = SessionOptions {
                search,
                output,
                results_root,
                ..SessionOptions::new(flags, build)
            };

            let cancel = CancelToken::new();
            let handler_token = cancel.clone();
            if let Err(err) = ctrlc::set_handler(move || handler_token.cancel()) {
                warn!(error = %err, "failed to install Ctrl+C handler");
            }

            let session = SearchSession::new(options, cancel)?;
            let outcome = session.run()?;
            info!(path = %outcome.path.display(), "search finished");
            print!("{}", summary::render(&outcome.report, 10));
        }
        Command::Inspect { report, top } => {
            let report = RunReport::load(&report)?;
            print!("{}", summary::render(&report, top));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_defaults() {
        let cli = Cli::parse_from(["flagforge", "run", "gpp_flags.json", "main.cpp"]);
        match cli.command {
            Command::Run {
                strategy,
                iterations,
                workers,
                results_root,
                sources,
                ..
            } => {
                assert_eq!(strategy, StrategyArg::Tabu);
                assert_eq!(iterations, None);
                assert_eq!(workers, 1);
                assert_eq!(results_root, PathBuf::from("data/results"));
                assert_eq!(sources, vec![PathBuf::from("main.cpp")]);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_hill_climb_options() {
        let cli = Cli::parse_from([
            "flagforge",
            "run",
            "flags.json",
            "a.cpp",
            "b.cpp",
            "--strategy",
            "hill-climb",
            "--num-change",
            "3",
            "--initial",
            "0101",
            "--base-arg",
            "-std=c++17",
        ]);
        let Command::Run {
            strategy,
            num_change,
            initial,
            base_args,
            sources,
            ..
        } = cli.command
        else {
            panic!("expected run");
        };
        assert_eq!(strategy.config(num_change).iterations, 100);
        assert_eq!(initial.unwrap().to_string(), "0101");
        assert_eq!(base_args, vec!["-std=c++17".to_string()]);
        assert_eq!(sources.len(), 2);
    }

    #[test]
    fn test_parse_sweep() {
        let cli = Cli::parse_from([
            "flagforge",
            "run",
            "flags.json",
            "main.c",
            "--strategy",
            "sweep",
            "--workers",
            "4",
            "--runs",
            "5",
        ]);
        let Command::Run {
            strategy,
            num_change,
            workers,
            runs,
            ..
        } = cli.command
        else {
            panic!("expected run");
        };
        let config = strategy.config(num_change).with_pool_width(workers);
        assert_eq!(config.strategy.name(), "sweep");
        assert_eq!(config.iterations, 1);
        assert!(config.validate(3).is_ok());
        assert_eq!(runs, 5);
    }

    #[test]
    fn test_exit_code_follows_search_error() {
        let err = anyhow::Error::new(SearchError::Interrupted).context("search aborted");
        assert_eq!(exit_code(&err), 130);
        assert_eq!(exit_code(&anyhow::anyhow!("io trouble")), 1);
    }
}
