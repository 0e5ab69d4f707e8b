use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use serde_json::{Value, json};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use switchyard_classifier::{Domain, TaskClassifier, TaskContext};
use switchyard_config::Settings;
use switchyard_engine::{Executor, ExecutorError, RecoveryReport, StepRequest, WorkflowEngine};
use switchyard_planner::{COORDINATOR, Orchestrator, Planner};
use switchyard_registry::ToolRegistry;
use switchyard_store::SqliteStore;
use switchyard_workflow::ExecutionState;

/// Tools registered at startup. Categories are detected from the names.
const DEFAULT_TOOLS: &[&str] = &[
  "static_analyzer",
  "dependency_scanner",
  "code_reviewer",
  "performance_profiler",
  "test_runner",
  "deploy_tool",
  "api_client",
  "data_sync",
  "report_formatter",
  "config_parser",
];

/// Switchyard - routes tasks to specialists and runs them as workflows
#[derive(Parser)]
#[command(name = "switchyard")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the data directory (default: ~/.switchyard)
  #[arg(long, global = true)]
  data_dir: Option<PathBuf>,

  /// Path to a JSON settings file
  #[arg(long, global = true)]
  config: Option<PathBuf>,

  /// Log at debug level (RUST_LOG takes precedence)
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Classify a task description without planning it
  Classify {
    #[command(flatten)]
    task: TaskArgs,
  },

  #[command(flatten)]
  Engine(EngineCommand),
}

/// Commands that need the store and a running engine.
#[derive(Subcommand)]
enum EngineCommand {
  /// Plan a task and create its workflow
  Route {
    #[command(flatten)]
    task: TaskArgs,

    /// Start the workflow and wait for it to finish
    #[arg(long)]
    run: bool,
  },

  /// Start a created workflow, or re-dispatch a waiting one
  Start {
    workflow_id: String,

    /// Wait for the workflow to finish
    #[arg(long)]
    wait: bool,
  },

  /// Pause a running workflow at the next dispatch boundary
  Pause { workflow_id: String },

  /// Resume a paused workflow
  Resume { workflow_id: String },

  /// Cancel a workflow that has not finished
  Cancel { workflow_id: String },

  /// Show the status of a workflow
  Status { workflow_id: String },

  /// List workflows
  List {
    /// Only workflows in this state
    #[arg(long)]
    state: Option<String>,
  },

  /// Delete a workflow, cancelling it if it is running
  Delete { workflow_id: String },

  /// Reload persisted workflows and report what was resumed
  Recover,
}

#[derive(clap::Args)]
struct TaskArgs {
  /// The task description
  #[arg(required = true, num_args = 1..)]
  description: Vec<String>,

  /// Extra keywords scored with the description
  #[arg(long = "tag")]
  tags: Vec<String>,

  /// Raise the priority one level
  #[arg(long)]
  urgent: bool,
}

impl TaskArgs {
  fn description(&self) -> String {
    self.description.join(" ")
  }

  fn context(&self) -> TaskContext {
    TaskContext {
      tags: self.tags.clone(),
      urgent: self.urgent,
    }
  }
}

fn main() -> Result<()> {
  let cli = Cli::parse();
  init_tracing(cli.verbose)?;

  let Some(command) = cli.command else {
    println!("switchyard - use --help to see available commands");
    return Ok(());
  };

  let settings = match &cli.config {
    Some(path) => Settings::load(path)
      .with_context(|| format!("failed to load settings: {}", path.display()))?,
    None => Settings::default(),
  };

  let data_dir = match cli.data_dir {
    Some(dir) => dir,
    None => dirs::home_dir()
      .context("could not determine home directory")?
      .join(".switchyard"),
  };

  let rt = tokio::runtime::Runtime::new()?;
  rt.block_on(async { run(command, settings, data_dir).await })
}

fn init_tracing(verbose: bool) -> Result<()> {
  let default = if verbose { "debug" } else { "info" };
  let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default))?;

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .init();
  Ok(())
}

async fn run(command: Commands, settings: Settings, data_dir: PathBuf) -> Result<()> {
  let command = match command {
    Commands::Classify { task } => {
      let analysis = TaskClassifier::new().analyze(&task.description(), Some(&task.context()));
      return print_json(&analysis);
    }
    Commands::Engine(command) => command,
  };

  let app = App::open(&settings, &data_dir).await?;
  let outcome = app.execute(command).await;
  app.orchestrator.engine().shutdown().await;
  outcome
}

/// Services wired together for one CLI invocation.
struct App {
  orchestrator: Orchestrator,
  recovery: RecoveryReport,
}

impl App {
  async fn open(settings: &Settings, data_dir: &Path) -> Result<Self> {
    tokio::fs::create_dir_all(data_dir)
      .await
      .with_context(|| format!("failed to create data directory: {}", data_dir.display()))?;

    let database = data_dir.join(&settings.database_file);
    let store = SqliteStore::open(&database)
      .await
      .with_context(|| format!("failed to open database: {}", database.display()))?;

    let registry = Arc::new(ToolRegistry::with_settings(&settings.registry));
    for name in DEFAULT_TOOLS {
      registry.register(*name, None);
    }

    let executor = Arc::new(DryRunExecutor {
      registry: registry.clone(),
    });
    let engine = Arc::new(WorkflowEngine::new(
      Arc::new(store),
      executor,
      settings.engine.clone(),
    ));

    let recovery = engine
      .recover()
      .await
      .context("failed to recover workflows")?;
    debug!(
      loaded = recovery.loaded,
      resumed = recovery.resumed.len(),
      skipped = recovery.skipped.len(),
      "startup_recovery"
    );

    let planner = Planner::new(registry, settings.engine.clone());
    Ok(Self {
      orchestrator: Orchestrator::new(planner, engine),
      recovery,
    })
  }

  async fn execute(&self, command: EngineCommand) -> Result<()> {
    let engine = self.orchestrator.engine();

    match command {
      EngineCommand::Route { task, run } => {
        let description = task.description();
        let context = task.context();

        if !run {
          let routed = self
            .orchestrator
            .route(&description, Some(&context))
            .await
            .context("failed to route task")?;
          return print_json(&routed);
        }

        let routed = self
          .orchestrator
          .route_and_start(&description, Some(&context))
          .await
          .context("failed to route task")?;
        let status = engine
          .wait(&routed.workflow_id)
          .await
          .ok_or_else(|| anyhow!("workflow {} disappeared", routed.workflow_id))?;
        print_json(&json!({ "routed": routed, "status": status }))
      }
      EngineCommand::Start { workflow_id, wait } => {
        engine
          .start(&workflow_id)
          .await
          .with_context(|| format!("failed to start workflow {workflow_id}"))?;
        let status = if wait {
          engine.wait(&workflow_id).await
        } else {
          engine.status(&workflow_id).await
        };
        print_json(&status.ok_or_else(|| anyhow!("unknown workflow: {workflow_id}"))?)
      }
      EngineCommand::Pause { workflow_id } => {
        let accepted = engine.pause(&workflow_id).await;
        self.print_control(&workflow_id, accepted).await
      }
      EngineCommand::Resume { workflow_id } => {
        let accepted = engine.resume(&workflow_id).await;
        self.print_control(&workflow_id, accepted).await
      }
      EngineCommand::Cancel { workflow_id } => {
        let accepted = engine.cancel(&workflow_id).await;
        self.print_control(&workflow_id, accepted).await
      }
      EngineCommand::Status { workflow_id } => {
        let status = engine
          .status(&workflow_id)
          .await
          .ok_or_else(|| anyhow!("unknown workflow: {workflow_id}"))?;
        print_json(&status)
      }
      EngineCommand::List { state } => {
        let state = state
          .map(|s| s.parse::<ExecutionState>())
          .transpose()
          .context("invalid --state")?;
        print_json(&engine.list(state).await)
      }
      EngineCommand::Delete { workflow_id } => {
        let deleted = engine.delete(&workflow_id).await;
        print_json(&json!({ "workflow_id": workflow_id, "deleted": deleted }))
      }
      // Recovery runs on every startup; this only reports it
      EngineCommand::Recover => print_json(&self.recovery),
    }
  }

  /// Report whether a control call was accepted, with the resulting status.
  async fn print_control(&self, workflow_id: &str, accepted: bool) -> Result<()> {
    let status = self
      .orchestrator
      .engine()
      .status(workflow_id)
      .await
      .ok_or_else(|| anyhow!("unknown workflow: {workflow_id}"))?;
    print_json(&json!({ "accepted": accepted, "status": status }))
  }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

/// Echoes each assignment instead of doing the work, and records tool usage
/// as if every allocated tool had run.
struct DryRunExecutor {
  registry: Arc<ToolRegistry>,
}

/// Executors the planner can assign: one specialist per domain plus the
/// coordinator.
fn is_known_executor(name: &str) -> bool {
  name == COORDINATOR
    || name == Domain::General.specialist()
    || Domain::SCORED.iter().any(|d| d.specialist() == name)
}

#[async_trait]
impl Executor for DryRunExecutor {
  async fn execute(&self, request: StepRequest) -> Result<Value, ExecutorError> {
    if !is_known_executor(&request.step.executor) {
      return Err(ExecutorError::UnknownExecutor(request.step.executor));
    }

    let started = Instant::now();
    let mut upstream: Vec<&String> = request.upstream.keys().collect();
    upstream.sort();

    let output = json!({
      "status": "dry_run",
      "executor": request.step.executor,
      "step_id": request.step.step_id,
      "attempt": request.attempt,
      "tools": request.step.tools,
      "upstream": upstream,
    });

    for tool in &request.step.tools {
      self.registry.record_usage(tool, true, started.elapsed());
    }
    info!(
      workflow_id = %request.workflow_id,
      step_id = %request.step.step_id,
      executor = %request.step.executor,
      "dry_run_step"
    );
    Ok(output)
  }
}
