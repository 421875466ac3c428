//! CLI entrypoint for the conformant harness.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use conformant_harness::structured_log::{LogEmitter, LogLevel};
use conformant_harness::{Harness, HarnessConfig, Suite, TestSource, TypeKeywordSource};
use tracing_subscriber::EnvFilter;

/// Fixture-driven conformance runs for JSON validators.
#[derive(Debug, Parser)]
#[command(name = "harness")]
#[command(about = "Conformance testing harness for JSON validators")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run fixtures against the reference type-keyword validator.
    Run {
        #[command(flatten)]
        common: CommonArgs,
        /// Worker threads (1 = sequential).
        #[arg(long)]
        workers: Option<usize>,
        /// Only run fixtures changed since the last incremental run.
        #[arg(long)]
        incremental: bool,
        /// Incremental cache path.
        #[arg(long)]
        cache: Option<PathBuf>,
        /// Write the suite as JSON to this path.
        #[arg(long)]
        report: Option<PathBuf>,
        /// Write a structured JSONL run log to this path.
        #[arg(long)]
        log: Option<PathBuf>,
    },
    /// Count cases without validating anything.
    Count {
        #[command(flatten)]
        common: CommonArgs,
    },
    /// Probe the reference validator with edge-case and random inputs.
    Fuzz {
        /// Source name used in result ids.
        #[arg(long, default_value = "reference")]
        name: String,
        /// Random values after the edge-case catalog.
        #[arg(long)]
        iterations: Option<usize>,
        /// Seed for a reproducible random phase.
        #[arg(long)]
        seed: Option<u64>,
        /// Optional JSON config file.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Write the suite as JSON to this path.
        #[arg(long)]
        report: Option<PathBuf>,
    },
}

#[derive(Debug, Args)]
struct CommonArgs {
    /// Fixture root directory.
    #[arg(long)]
    dir: PathBuf,
    /// Source name used in result ids.
    #[arg(long, default_value = "reference")]
    name: String,
    /// Optional JSON config file.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Regex over "group - description".
    #[arg(long)]
    filter: Option<String>,
    /// Glob over fixture paths.
    #[arg(long)]
    path: Option<String>,
    /// Regex of cases to skip.
    #[arg(long)]
    exclude: Option<String>,
    /// Only cases carrying this tag.
    #[arg(long)]
    tag: Option<String>,
}

impl CommonArgs {
    fn config(&self) -> Result<HarnessConfig, Box<dyn std::error::Error>> {
        let mut config = load_config(self.config.as_deref())?;
        if let Some(pattern) = &self.filter {
            config.filter.name = Some(pattern.clone());
        }
        if let Some(pattern) = &self.path {
            config.filter.path = Some(pattern.clone());
        }
        if let Some(pattern) = &self.exclude {
            config.filter.exclude = Some(pattern.clone());
        }
        if let Some(tag) = &self.tag {
            config.filter.tag = Some(tag.clone());
        }
        Ok(config)
    }

    fn source(&self) -> TypeKeywordSource {
        TypeKeywordSource::new(self.name.clone(), self.dir.clone())
    }
}

fn load_config(path: Option<&Path>) -> Result<HarnessConfig, Box<dyn std::error::Error>> {
    let config = match path {
        Some(path) => HarnessConfig::from_file(path)?,
        None => HarnessConfig::default(),
    };
    Ok(config.with_env())
}

fn write_report(suite: &Suite, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(path) = path {
        eprintln!("Writing report to {}", path.display());
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, suite.to_json()?)?;
    }
    Ok(())
}

fn print_summary(suite: &Suite) {
    for failure in suite.failures() {
        let reason = failure
            .error
            .as_deref()
            .or(failure.message.as_deref())
            .unwrap_or("outcome mismatch");
        eprintln!("FAIL {} [{}]: {reason}", failure.display_name(), failure.id);
    }
    eprintln!(
        "{}: total={}, passed={}, failed={}, pass_rate={:.1}%, duration={:?}",
        suite.name,
        suite.total_tests(),
        suite.passed_tests(),
        suite.failed_tests(),
        suite.pass_rate(),
        suite.duration,
    );
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            common,
            workers,
            incremental,
            cache,
            report,
            log,
        } => {
            let mut config = common.config()?;
            if let Some(workers) = workers {
                config.workers = workers.max(1);
            }
            if incremental {
                config.incremental = true;
            }
            if let Some(cache) = cache {
                config.cache_path = cache;
            }

            let harness = Harness::new(config)?;
            let source: Arc<dyn TestSource> = Arc::new(common.source());
            eprintln!("Running fixtures in {}", common.dir.display());

            let suite = match log {
                Some(log_path) => {
                    let mut emitter = LogEmitter::to_file(&log_path, &common.name)?;
                    emitter.emit(LogLevel::Info, "run_start")?;
                    let suite = harness.run(source, Some(&mut emitter))?;
                    emitter.emit_summary(&suite)?;
                    emitter.flush()?;
                    suite
                }
                None => harness.run(source, None)?,
            };

            print_summary(&suite);
            write_report(&suite, report.as_deref())?;
            if !suite.all_passed() {
                return Err(format!("{} case(s) failed", suite.failed_tests()).into());
            }
        }
        Command::Count { common } => {
            let harness = Harness::new(common.config()?)?;
            let source = common.source();
            let files = harness.discover(&source).len();
            let cases = harness.count(&source);
            println!("{cases}");
            eprintln!("{cases} case(s) across {files} file(s) in {}", common.dir.display());
        }
        Command::Fuzz {
            name,
            iterations,
            seed,
            config,
            report,
        } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(iterations) = iterations {
                config.fuzz.iterations = iterations;
            }
            if seed.is_some() {
                config.fuzz.seed = seed;
            }

            let harness = Harness::new(config)?;
            let source = TypeKeywordSource::new(name, PathBuf::new());
            let suite = harness.fuzz(&source);
            print_summary(&suite);
            write_report(&suite, report.as_deref())?;
            if !suite.all_passed() {
                return Err(format!("{} fuzz input(s) crashed the validator", suite.failed_tests()).into());
            }
        }
    }

    Ok(())
}
