use anyhow::Result;
use casecore::{PipelineSpec, RunEvent, RunStatus};
use caseruntime::{PipelineRuntime, RuntimeConfig, TaskRegistry};
use casetasks::{standard_stages, InMemoryCommandChannel, StaticParameterStore, TaskDeps};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "caseflow")]
#[command(about = "Case pipeline orchestrator CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a pipeline to completion
    Run {
        /// Path to a pipeline JSON file (defaults to the built-in
        /// standard pipeline)
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Trigger event payload as a JSON string
        #[arg(short, long)]
        input: Option<String>,

        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Validate a pipeline file against the standard task registry
    Validate {
        /// Path to a pipeline JSON file
        file: PathBuf,
    },

    /// List registered task names
    Tasks,

    /// Write an example pipeline file
    Init {
        /// Output file path
        #[arg(short, long, default_value = "pipeline.json")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            file,
            input,
            verbose,
        } => {
            let level = if verbose {
                tracing::Level::DEBUG
            } else {
                tracing::Level::INFO
            };
            tracing_subscriber::fmt().with_max_level(level).init();

            run_pipeline(file, input).await?;
        }

        Commands::Validate { file } => {
            validate_pipeline(file)?;
        }

        Commands::Tasks => {
            list_tasks();
        }

        Commands::Init { output } => {
            create_example_pipeline(output)?;
        }
    }

    Ok(())
}

/// Registry populated with the standard tasks against local in-process
/// collaborators. The CLI drives runs without a worker fleet attached.
fn standard_registry() -> Result<TaskRegistry> {
    let deps = TaskDeps::new(
        Arc::new(InMemoryCommandChannel::new()),
        Arc::new(StaticParameterStore::local_defaults()),
    );
    let mut registry = TaskRegistry::new();
    casetasks::register_all(&mut registry, &deps, Duration::from_secs(3600))?;
    Ok(registry)
}

fn load_pipeline(file: &PathBuf) -> casecore::Result<PipelineSpec> {
    let json = std::fs::read_to_string(file)?;
    Ok(serde_json::from_str(&json)?)
}

async fn run_pipeline(file: Option<PathBuf>, input: Option<String>) -> Result<()> {
    let spec = match file {
        Some(path) => {
            println!("Loading pipeline from: {}", path.display());
            load_pipeline(&path)?
        }
        None => PipelineSpec {
            name: casetasks::STANDARD_PIPELINE.to_string(),
            stages: standard_stages(),
        },
    };

    println!("Pipeline: {} ({} stages)", spec.name, spec.stages.len());
    println!();

    let event = match input {
        Some(raw) => serde_json::from_str(&raw)?,
        None => serde_json::Value::Null,
    };

    let runtime = PipelineRuntime::with_registry(
        Arc::new(standard_registry()?),
        RuntimeConfig::default(),
    );
    runtime.register_pipeline(&spec.name, &spec.stages).await?;

    // Print run events live while the walk makes progress.
    let mut events = runtime.subscribe_events();
    let event_task = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                RunEvent::RunStarted { run_id, .. } => {
                    println!("▶ Run started: {}", run_id);
                }
                RunEvent::TaskStarted { task, .. } => {
                    println!("  ⚡ {}", task);
                }
                RunEvent::TaskCompleted {
                    task, duration_ms, ..
                } => {
                    println!("  ✅ {} ({}ms)", task, duration_ms);
                }
                RunEvent::TaskFailed { task, error, .. } => {
                    println!("  ❌ {}: {}", task, error);
                }
                RunEvent::TaskMessage { task, message, .. } => {
                    println!("     [{}] {:?}", task, message);
                }
                RunEvent::RunCompleted {
                    status,
                    duration_ms,
                    ..
                } => {
                    println!();
                    println!("Run finished: {:?} in {}ms", status, duration_ms);
                }
            }
        }
    });

    let run = runtime.run_workflow(&spec.name, event).await?;

    // Let the event printer drain before tearing it down.
    tokio::time::sleep(Duration::from_millis(100)).await;
    event_task.abort();

    println!();
    println!("Run id:  {}", run.run_id);
    println!("Status:  {:?}", run.status);

    if run.status == RunStatus::Failed {
        anyhow::bail!("pipeline run failed");
    }
    Ok(())
}

fn validate_pipeline(file: PathBuf) -> Result<()> {
    println!("Validating pipeline: {}", file.display());

    let spec = load_pipeline(&file)?;
    let registry = standard_registry()?;

    match caseruntime::compile(&spec.name, &spec.stages, &registry) {
        Ok(def) => {
            println!("✅ Pipeline is valid:");
            println!("   Name:  {}", def.name);
            println!("   Tasks: {}", def.task_count());
            Ok(())
        }
        Err(e) => {
            println!("❌ Pipeline is invalid: {}", e);
            anyhow::bail!("validation failed");
        }
    }
}

fn list_tasks() {
    match standard_registry() {
        Ok(registry) => {
            println!("Registered tasks:");
            for name in registry.task_names() {
                println!("  • {}", name);
            }
        }
        Err(e) => {
            eprintln!("Failed to build registry: {}", e);
        }
    }
}

fn create_example_pipeline(output: PathBuf) -> Result<()> {
    let spec = PipelineSpec {
        name: casetasks::STANDARD_PIPELINE.to_string(),
        stages: standard_stages(),
    };

    let json = serde_json::to_string_pretty(&spec)?;
    std::fs::write(&output, json)?;

    println!("Created example pipeline: {}", output.display());
    println!();
    println!("Run it with:");
    println!("  caseflow run --file {}", output.display());

    Ok(())
}
