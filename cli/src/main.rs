use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use runsafe_config::EngineConfig;
use runsafe_core::types::ExecutionRequest;
use runsafe_engine::Engine;
use runsafe_ports::fakes::{DirectSpawnRuntime, FakeArtifactStore, FakeMetadataStore, FixedWorkflowInputsProvider};
use runsafe_ports::{ProgramRepository, ProgramStatus, StreamSink, UiComponentRepository, VersionRepository, VersionStatus};

const PROGRAM_ID: &str = "local";
const VERSION_ID: &str = "v1";

#[derive(Parser)]
#[command(name = "runsafe", about = "Runs a project directory through the execution engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build (if needed) and run a project directory, streaming its output and printing the result
    Run {
        /// Directory containing the project's source files
        project_dir: PathBuf,
        /// Skip the sandbox container and run directly on this host
        #[arg(long)]
        no_sandbox: bool,
    },
    /// Validate a project directory without running it
    Validate { project_dir: PathBuf },
    /// Analyze a project directory's structure without running it
    Analyze { project_dir: PathBuf },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let cli = Cli::parse();

    match cli.command {
        Command::Run { project_dir, no_sandbox } => run(&project_dir, no_sandbox).await,
        Command::Validate { project_dir } => validate(&project_dir).await,
        Command::Analyze { project_dir } => analyze(&project_dir).await,
    }
}

fn load_project(project_dir: &Path) -> anyhow::Result<(Arc<FakeMetadataStore>, Arc<FakeArtifactStore>)> {
    if !project_dir.is_dir() {
        anyhow::bail!("{} is not a directory", project_dir.display());
    }

    let metadata = Arc::new(FakeMetadataStore::new());
    metadata.add_program(PROGRAM_ID, Some(VERSION_ID), ProgramStatus::Active);
    metadata.add_version(VERSION_ID, PROGRAM_ID, 1, VersionStatus::Approved);

    let artifacts = Arc::new(FakeArtifactStore::new());
    for entry in walkdir::WalkDir::new(project_dir).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry.path().strip_prefix(project_dir)?;
        let bytes = std::fs::read(entry.path())?;
        artifacts.put_file(PROGRAM_ID, VERSION_ID, &relative.to_string_lossy(), bytes);
    }

    Ok((metadata, artifacts))
}

fn build_engine(config: EngineConfig, metadata: Arc<FakeMetadataStore>, artifacts: Arc<FakeArtifactStore>) -> Engine {
    Engine::new(
        Arc::new(config),
        artifacts,
        metadata.clone() as Arc<dyn ProgramRepository>,
        metadata.clone() as Arc<dyn VersionRepository>,
        metadata as Arc<dyn UiComponentRepository>,
        Arc::new(FixedWorkflowInputsProvider::default()),
        Some(Arc::new(DirectSpawnRuntime::new())),
        None::<Arc<dyn StreamSink>>,
    )
}

async fn run(project_dir: &Path, no_sandbox: bool) -> anyhow::Result<()> {
    let (metadata, artifacts) = load_project(project_dir)?;

    let mut config = EngineConfig::from_env();
    config.working_directory = std::env::temp_dir().join("runsafe-cli");
    if no_sandbox {
        config.enable_sandbox = false;
    }

    let engine = build_engine(config, metadata, artifacts);

    let request = ExecutionRequest {
        program_id: PROGRAM_ID.to_string(),
        version_id: Some(VERSION_ID.to_string()),
        user_id: "cli".to_string(),
        parameters: Default::default(),
        environment: Default::default(),
        resource_limits: None,
        build_args: Default::default(),
        save_results: true,
        cleanup_on_completion: true,
        execution_tier: None,
        job_profile: None,
    };

    let result = engine.execute(request, None).await;
    println!("{}", serde_json::to_string_pretty(&result)?);

    if !result.success {
        std::process::exit(1);
    }
    Ok(())
}

async fn validate(project_dir: &Path) -> anyhow::Result<()> {
    let (metadata, artifacts) = load_project(project_dir)?;
    let config = EngineConfig::from_env();
    let engine = build_engine(config, metadata, artifacts);

    let result = engine.validate(PROGRAM_ID, VERSION_ID).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    if !result.valid {
        std::process::exit(1);
    }
    Ok(())
}

async fn analyze(project_dir: &Path) -> anyhow::Result<()> {
    let (metadata, artifacts) = load_project(project_dir)?;
    let config = EngineConfig::from_env();
    let engine = build_engine(config, metadata, artifacts);

    let analysis = engine.analyze(PROGRAM_ID, VERSION_ID).await?;
    println!("{}", serde_json::to_string_pretty(&analysis)?);
    Ok(())
}
