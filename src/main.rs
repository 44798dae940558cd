use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use flowtest::config::{FlowtestConfig, LogFormat};
use flowtest::recorder::RecordingSession;
use flowtest::records::{
    Latency, RunStatus, StepStatus, Test, TestDraft, TestPatch, TestRunDraft, TestService,
    TestStatus,
};
use flowtest::settings::{Settings, SettingsStore};
use flowtest::storage::LocalStore;

#[derive(Parser)]
#[command(
    name = "flowtest",
    about = "Local-first record store for the FlowTest UI test recorder",
    version,
    long_about = None
)]
struct Cli {
    /// Config file (defaults to $FLOWTEST_CONFIG, then ./flowtest.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database path, overriding the config (`:memory:` for a throwaway store)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the JSON API server
    Serve {
        /// Bind address, overriding the config
        #[arg(long)]
        bind: Option<String>,
    },

    /// Manage test definitions
    Tests {
        #[command(subcommand)]
        action: TestsAction,
    },

    /// Inspect and record test runs
    Runs {
        #[command(subcommand)]
        action: RunsAction,
    },

    /// Show pass/fail/pending counts
    Stats {
        /// JSON output for machine parsing
        #[arg(long)]
        json: bool,
    },

    /// Save a recording as a new test and its first run
    Record {
        #[arg(long)]
        name: String,

        #[arg(long, default_value = "dev")]
        environment: String,

        /// Recorded step as `action|selector|status` (repeatable)
        #[arg(long = "step", value_parser = parse_step, required = true)]
        steps: Vec<StepArg>,
    },

    /// Show or change workspace settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },

    /// Delete every stored record and setting; the next read re-seeds
    Reset,
}

#[derive(Subcommand)]
enum TestsAction {
    /// List all tests, newest first
    List {
        #[arg(long)]
        json: bool,
    },

    /// Show one test
    Show { id: String },

    /// Create a new test
    Create {
        #[arg(long)]
        name: String,

        #[arg(long)]
        environment: String,

        #[arg(long, default_value = "0")]
        steps: u32,

        #[arg(long, default_value = "Never")]
        last_run: String,

        #[arg(long, default_value = "pending")]
        status: TestStatus,
    },

    /// Change fields of an existing test
    Update {
        id: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        environment: Option<String>,

        #[arg(long)]
        steps: Option<u32>,

        #[arg(long)]
        last_run: Option<String>,

        #[arg(long)]
        status: Option<TestStatus>,
    },

    /// Delete a test (its runs are kept)
    Delete { id: String },
}

#[derive(Subcommand)]
enum RunsAction {
    /// List runs, newest first
    List {
        /// Only runs of this test
        #[arg(long)]
        test_id: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// Record a run outcome for a test
    Create {
        #[arg(long)]
        test_id: String,

        #[arg(long)]
        status: RunStatus,

        /// Duration in milliseconds
        #[arg(long, default_value = "0")]
        duration: u64,
    },
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Print the current settings as JSON
    Show,

    /// Validate and store settings read from a JSON file
    Set {
        #[arg(long)]
        file: PathBuf,
    },
}

#[derive(Debug, Clone)]
struct StepArg {
    action: String,
    selector: String,
    status: StepStatus,
}

fn parse_step(raw: &str) -> Result<StepArg, String> {
    let mut parts = raw.splitn(3, '|');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(action), Some(selector), Some(status)) if !action.trim().is_empty() => {
            Ok(StepArg {
                action: action.trim().to_string(),
                selector: selector.trim().to_string(),
                status: status.trim().parse()?,
            })
        }
        _ => Err(format!(
            "invalid step '{}'. Expected 'action|selector|status'",
            raw
        )),
    }
}

fn print_tests(tests: &[Test]) {
    if tests.is_empty() {
        println!("No tests found.");
        return;
    }
    println!(
        "{:<15} | {:<30} | {:>5} | {:<8} | {:<12} | Last run",
        "ID", "Name", "Steps", "Status", "Environment"
    );
    println!("{:-<15}-|-{:-<30}-|-{:-<5}-|-{:-<8}-|-{:-<12}-|-{:-<12}", "", "", "", "", "", "");
    for t in tests {
        println!(
            "{:<15} | {:<30} | {:>5} | {:<8} | {:<12} | {}",
            t.id, t.name, t.steps, t.status, t.environment, t.last_run
        );
    }
}

fn init_tracing(config: &FlowtestConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match config.logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

async fn tests_command(service: &TestService, action: TestsAction) -> Result<()> {
    match action {
        TestsAction::List { json } => {
            let tests = service.list_tests().await;
            if json {
                println!("{}", serde_json::to_string_pretty(&tests)?);
            } else {
                print_tests(&tests);
            }
        }
        TestsAction::Show { id } => match service.get_test(&id).await {
            Some(test) => println!("{}", serde_json::to_string_pretty(&test)?),
            None => anyhow::bail!("Test '{}' not found", id),
        },
        TestsAction::Create {
            name,
            environment,
            steps,
            last_run,
            status,
        } => {
            let test = service
                .create_test(TestDraft {
                    name,
                    steps,
                    last_run,
                    status,
                    environment,
                })
                .await?;
            println!("Test '{}' created with id {}.", test.name, test.id);
        }
        TestsAction::Update {
            id,
            name,
            environment,
            steps,
            last_run,
            status,
        } => {
            let patch = TestPatch {
                name,
                steps,
                last_run,
                status,
                environment,
            };
            if patch.is_empty() {
                anyhow::bail!("Nothing to update. Pass at least one field flag.");
            }
            let test = service.update_test(&id, &patch).await?;
            println!("Test '{}' updated (status: {}).", test.id, test.status);
        }
        TestsAction::Delete { id } => {
            if service.delete_test(&id).await? {
                println!("Test '{}' deleted.", id);
            } else {
                println!("Test '{}' did not exist.", id);
            }
        }
    }
    Ok(())
}

async fn runs_command(service: &TestService, action: RunsAction) -> Result<()> {
    match action {
        RunsAction::List { test_id, json } => {
            let runs = service.list_test_runs(test_id.as_deref()).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&runs)?);
            } else if runs.is_empty() {
                println!("No runs found.");
            } else {
                println!(
                    "{:<20} | {:<15} | {:<8} | {:>8} | Timestamp",
                    "ID", "Test", "Status", "Duration"
                );
                println!("{:-<20}-|-{:-<15}-|-{:-<8}-|-{:-<8}-|-{:-<24}", "", "", "", "", "");
                for r in runs {
                    println!(
                        "{:<20} | {:<15} | {:<8} | {:>6}ms | {}",
                        r.id,
                        r.test_id,
                        r.status,
                        r.duration,
                        r.timestamp.to_rfc3339()
                    );
                }
            }
        }
        RunsAction::Create {
            test_id,
            status,
            duration,
        } => {
            let run = service
                .create_test_run(TestRunDraft {
                    test_id,
                    status,
                    duration,
                    steps: Vec::new(),
                })
                .await?;
            println!("Run '{}' recorded for test '{}'.", run.id, run.test_id);
        }
    }
    Ok(())
}

async fn record_command(
    service: &TestService,
    name: String,
    environment: String,
    steps: Vec<StepArg>,
) -> Result<()> {
    let mut session = RecordingSession::new();
    session.start()?;
    for step in steps {
        session.record(step.action, step.selector, step.status)?;
    }
    session.stop()?;

    let summary = session.summary();
    let (test, run) = session.save(service, name, environment).await?;
    println!(
        "Recorded '{}' as test {} (run {}): {} steps, {} passed, {} failed, {} warnings.",
        test.name, test.id, run.id, summary.total, summary.passed, summary.failed, summary.warning
    );
    Ok(())
}

fn settings_command(settings_store: &SettingsStore, action: SettingsAction) -> Result<()> {
    match action {
        SettingsAction::Show => {
            println!("{}", serde_json::to_string_pretty(&settings_store.load())?);
        }
        SettingsAction::Set { file } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let settings: Settings = serde_json::from_str(&raw)
                .with_context(|| format!("failed to parse {}", file.display()))?;
            let errors = settings.field_errors();
            if !errors.is_empty() {
                for e in &errors {
                    eprintln!(" - {}", e);
                }
                anyhow::bail!("Settings not saved: {} invalid field(s)", errors.len());
            }
            settings_store.save(&settings)?;
            println!("Settings saved.");
        }
    }
    Ok(())
}

fn open_store(config: &FlowtestConfig) -> Result<LocalStore> {
    flowtest::open_store(&config.storage).with_context(|| {
        format!(
            "failed to open record store at {}",
            config.storage.db_path.display()
        )
    })
}

fn open_service(config: &FlowtestConfig) -> Result<TestService> {
    Ok(TestService::new(
        open_store(config)?,
        Latency::from(&config.latency),
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => FlowtestConfig::load(path)?,
        None => FlowtestConfig::load_or_default(),
    };
    if let Some(db) = cli.db {
        config.storage.db_path = db;
    }

    init_tracing(&config);

    match cli.command {
        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                config.api.bind = bind;
            }
            tracing::info!(bind = %config.api.bind, "Starting FlowTest API");
            flowtest::serve(&config).await?;
        }
        Commands::Tests { action } => tests_command(&open_service(&config)?, action).await?,
        Commands::Runs { action } => runs_command(&open_service(&config)?, action).await?,
        Commands::Stats { json } => {
            let stats = open_service(&config)?.test_stats().await;
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("Total:   {}", stats.total);
                println!("Passed:  {}", stats.passed);
                println!("Failed:  {}", stats.failed);
                println!("Pending: {}", stats.pending);
            }
        }
        Commands::Record {
            name,
            environment,
            steps,
        } => record_command(&open_service(&config)?, name, environment, steps).await?,
        Commands::Settings { action } => {
            settings_command(&SettingsStore::new(open_store(&config)?), action)?
        }
        Commands::Reset => {
            let removed = open_service(&config)?.reset().await?;
            println!("Removed {} stored key(s).", removed);
        }
    }

    Ok(())
}
