use mockprep::config::{Config, DEFAULT_CONFIG_PATH};
use mockprep::runner::{self, RunOutcome};
use mockprep::store::FileStore;
use mockprep::{results, setup};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mockprep", about = "Timed, proctored mock tests in the terminal")]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Stage a question payload for the next attempt
    Setup {
        /// JSON payload with open and multiple-choice questions
        #[arg(long, conflicts_with = "sample", required_unless_present = "sample")]
        questions: Option<PathBuf>,
        /// Use the bundled sample questions
        #[arg(long)]
        sample: bool,
    },
    /// Take the staged test
    Run,
    /// Show the last submission
    Results,
}

#[hotpath::main]
fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load_from(&cli.config);
    init_logging(&config)?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main(cli, config))
}

/// Log to a file; the terminal belongs to the test UI
fn init_logging(config: &Config) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_file)
        .with_context(|| format!("opening log file {}", config.log_file))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}

async fn async_main(cli: Cli, config: Config) -> Result<()> {
    let mut store = FileStore::open(&config.store.path)
        .with_context(|| format!("opening session store {}", config.store.path))?;

    match cli.command {
        Command::Setup { questions, sample } => {
            let count = match questions {
                Some(path) if !sample => {
                    let raw = fs::read_to_string(&path)
                        .with_context(|| format!("reading {}", path.display()))?;
                    setup::stage(&mut store, &raw)
                        .with_context(|| format!("staging {}", path.display()))?
                }
                _ => setup::stage_sample(&mut store).context("staging sample questions")?,
            };
            println!("Staged {count} questions. Start with `mockprep run`.");
        }
        Command::Run => match runner::run(store, &config).await? {
            RunOutcome::Submitted { reason, record } => {
                info!(%reason, "run finished");
                println!(
                    "Submitted ({reason}): {} of {} answered. See `mockprep results`.",
                    results::answered(&record),
                    record.questions.len()
                );
            }
            RunOutcome::Abandoned => {
                println!("Attempt abandoned. Stage a new test with `mockprep setup`.");
            }
            RunOutcome::Redirected(reason) => {
                println!("Cannot start: {reason}. Stage a new test with `mockprep setup`.");
            }
        },
        Command::Results => match results::load(&store).context("reading submission")? {
            Some(record) => print!("{}", results::summary(&record)),
            None => println!("No submission found. Take a test with `mockprep run`."),
        },
    }
    Ok(())
}
