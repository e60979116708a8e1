//! Lessonflow CLI
//!
//! Audits exercise placement across lessons, prints composed timelines,
//! applies restructuring plans, and serves the HTTP endpoints.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use lessonflow_engine::{
    compose, create_router, execute, load_plan, AppState, Config, FlowItem, MemoryStore,
    PlacementValidator, RecordFilter, RecordStore, Severity, ValidationResult,
};
use lessonflow_report::{json::JsonGenerator, AuditReport, MarkdownGenerator};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

/// Lessonflow - Lesson Flow Integrity Tool
///
/// Checks that interactive exercises sit after the narrative content that
/// introduces them, and rewrites lesson timelines from restructuring plans.
#[derive(Parser, Debug)]
#[command(name = "lessonflow")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to configuration file (default: lessonflow.json in current directory)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate lessons and write the audit report
    Audit {
        /// Lesson to audit (repeatable; default: every lesson)
        #[arg(short, long = "lesson", value_name = "ID")]
        lessons: Vec<String>,

        /// Output directory for reports
        #[arg(short, long, value_name = "DIR")]
        output_dir: Option<String>,

        /// Report format to write
        #[arg(short, long, value_enum, default_value_t = ReportFormat::Both)]
        format: ReportFormat,
    },

    /// Print a lesson's composed timeline
    Flow {
        /// Lesson id
        #[arg(value_name = "LESSON")]
        lesson: String,
    },

    /// Apply a restructuring plan to a lesson
    Restructure {
        /// Lesson id
        #[arg(value_name = "LESSON")]
        lesson: String,

        /// Plan file (JSON array of operations, or an object with a 'plan' array)
        #[arg(short, long, value_name = "FILE")]
        plan: PathBuf,

        /// Apply to a copy of the records and leave the snapshot untouched
        #[arg(long)]
        dry_run: bool,
    },

    /// Run the HTTP API server
    Serve {
        /// Port for the HTTP API server
        #[arg(short, long)]
        port: Option<u16>,
    },
}

/// Audit artifact formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ReportFormat {
    Json,
    Markdown,
    Both,
}

impl ReportFormat {
    const fn json(self) -> bool {
        matches!(self, Self::Json | Self::Both)
    }

    const fn markdown(self) -> bool {
        matches!(self, Self::Markdown | Self::Both)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if cli.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::debug!(config = ?cli.config, "Config file");

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Audit {
            lessons,
            output_dir,
            format,
        } => {
            if let Some(output_dir) = output_dir {
                config.output_dir = output_dir;
            }
            config.validate()?;
            run_audit(&config, &lessons, format)
        }
        Command::Flow { lesson } => run_flow(&config, &lesson),
        Command::Restructure {
            lesson,
            plan,
            dry_run,
        } => run_restructure(&config, &lesson, &plan, dry_run),
        Command::Serve { port } => {
            if let Some(port) = port {
                config.port = port;
            }
            config.validate()?;
            run_server(config).await
        }
    }
}

/// Loads configuration from the specified path or default location.
fn load_config(config_path: Option<&str>) -> anyhow::Result<Config> {
    match config_path {
        Some(path_str) => {
            let path = Path::new(path_str);
            if !path.exists() {
                anyhow::bail!(
                    "Config file not found: '{}'\n\nSuggestion: Check the path or remove the --config flag to use defaults",
                    path.display()
                );
            }
            Config::load_from_file(path).map_err(|e| anyhow::anyhow!("{e}"))
        }
        None => Config::load().map_err(|e| anyhow::anyhow!("{e}")),
    }
}

fn load_store(config: &Config) -> anyhow::Result<MemoryStore> {
    let store = MemoryStore::load(Path::new(&config.store))?;
    tracing::info!(store = %config.store, "Records loaded");
    Ok(store)
}

// ============================================================================
// audit
// ============================================================================

fn run_audit(config: &Config, lessons: &[String], format: ReportFormat) -> anyhow::Result<()> {
    let store = load_store(config)?;
    let validator = PlacementValidator::new(&config.validator);

    let results = if lessons.is_empty() {
        validator.validate_all(&store)?
    } else {
        lessons
            .iter()
            .map(|id| validator.validate_lesson(&store, id))
            .collect::<Result<Vec<_>, _>>()?
    };

    let report = AuditReport::from_results(results);

    let output_dir = PathBuf::from(&config.output_dir);
    std::fs::create_dir_all(&output_dir)?;

    println!("Writing reports...");
    if format.markdown() {
        let md_path = output_dir.join(format!("{}.md", config.report_name));
        std::fs::write(&md_path, MarkdownGenerator::new(&report).generate())?;
        println!("  Markdown report: {}", md_path.display());
    }
    if format.json() {
        let json_path = output_dir.join(format!("{}.json", config.report_name));
        JsonGenerator::new(&report).write_to_file(&json_path, true)?;
        println!("  JSON report: {}", json_path.display());
    }

    let summary = &report.summary;
    println!();
    println!(
        "Audited {} lessons across {} chapters",
        summary.total_lessons, summary.total_chapters
    );
    if summary.total_issues > 0 {
        println!(
            "Issues found: {} ({} high, {} medium, {} low)",
            summary.total_issues, summary.high, summary.medium, summary.low
        );
    } else {
        println!("No placement issues found");
    }

    Ok(())
}

// ============================================================================
// flow
// ============================================================================

fn run_flow(config: &Config, lesson_id: &str) -> anyhow::Result<()> {
    let store = load_store(config)?;
    let Some(lesson) = store.lesson(lesson_id)? else {
        anyhow::bail!(
            "Lesson not found: '{lesson_id}'\n\nSuggestion: Run 'lessonflow audit' to list the lessons in {}",
            config.store
        );
    };

    let content = store.content_for_lesson(lesson_id, RecordFilter::Active)?;
    let exercises = store.exercises_for_lesson(lesson_id, RecordFilter::Active)?;
    let items = compose(&content, &exercises);

    println!("{} ({})", lesson.title, lesson.id);
    for item in &items {
        println!("{}", format_flow_item(item));
    }
    if items.is_empty() {
        println!("  (empty)");
    }

    Ok(())
}

fn format_flow_item(item: &FlowItem) -> String {
    match item {
        FlowItem::Content {
            id,
            order_key,
            title,
        } => format!("  {order_key:>6}  content   #{id:<5} {title}"),
        FlowItem::Exercise {
            id,
            order_key,
            title,
            exercise_kind,
        } => format!("  {order_key:>6}  exercise  #{id:<5} {title} [{exercise_kind}]"),
    }
}

// ============================================================================
// restructure
// ============================================================================

fn run_restructure(
    config: &Config,
    lesson_id: &str,
    plan_path: &Path,
    dry_run: bool,
) -> anyhow::Result<()> {
    let plan = load_plan(plan_path)?;
    let mut store = load_store(config)?;

    tracing::info!(
        lesson = lesson_id,
        operations = plan.len(),
        dry_run,
        "Applying restructuring plan"
    );

    let outcome = execute(&mut store, lesson_id, &plan)?;

    let counts = &outcome.summary.operations;
    println!("Restructured {lesson_id}");
    println!(
        "  Operations: {} updated, {} created, {} hidden, {} deleted",
        counts.updated, counts.created, counts.hidden, counts.deleted
    );
    println!(
        "  Active entries: {} content, {} exercises",
        outcome.summary.total_content_entries, outcome.summary.total_exercise_entries
    );
    if !outcome.unplaced.is_empty() {
        println!("  Unplaced entries: {:?}", outcome.unplaced);
    }
    if !outcome.is_clean() {
        println!();
        println!("Errors ({}):", outcome.results.errors.len());
        for error in &outcome.results.errors {
            println!("  - {error}");
        }
    }

    if dry_run {
        println!();
        println!("Dry run: {} left unchanged", config.store);
    } else {
        store.save(Path::new(&config.store))?;
        println!();
        println!("Records saved to {}", config.store);
    }

    let result = PlacementValidator::new(&config.validator).validate_lesson(&store, lesson_id)?;
    println!();
    print_remaining_issues(&result);

    Ok(())
}

fn print_remaining_issues(result: &ValidationResult) {
    if !result.has_issues() {
        println!("Validation: no remaining issues");
        return;
    }

    println!(
        "Validation: {} remaining issues ({} high, {} medium, {} low)",
        result.issues.len(),
        result.count(Severity::High),
        result.count(Severity::Medium),
        result.count(Severity::Low)
    );
    for issue in &result.issues {
        println!("  [{}] {}: {}", issue.severity, issue.kind, issue.description);
    }
}

// ============================================================================
// serve
// ============================================================================

async fn run_server(config: Config) -> anyhow::Result<()> {
    let store = load_store(&config)?;
    let snapshot_path = PathBuf::from(&config.store);
    let addr: SocketAddr = ([127, 0, 0, 1], config.port).into();

    let router = create_router(AppState::new(config, store).with_snapshot_path(snapshot_path));

    let listener = TcpListener::bind(addr).await.map_err(|e| {
        anyhow::anyhow!(
            "Failed to bind to {addr}: {e}\n\nSuggestion: Try a different port with --port"
        )
    })?;

    println!("HTTP API server running on http://{addr}");
    println!("Press Ctrl+C to stop");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_on(tokio::signal::ctrl_c()))
        .await?;

    Ok(())
}

/// Resolves once `signal` fires. If the signal cannot be installed the
/// server keeps running until the process is killed.
async fn shutdown_on<F>(signal: F)
where
    F: std::future::Future<Output = std::io::Result<()>>,
{
    match signal.await {
        Ok(()) => tracing::info!("Received Ctrl+C, shutting down"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    }
}
