use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use neena_config::{CatalogDef, FlowDef, Settings};
use neena_flow::Flow;
use neena_integration::{
  InMemoryCatalog, InMemoryCredentials, IntegrationRegistry, Principal, SystemIntegration,
};
use neena_orchestrator::{Orchestrator, OrchestratorConfig, Ports};
use neena_preparation::FixedPreparer;
use neena_store::{InMemoryStore, RunStatus};

/// Neena - run task flows against registered integrations
#[derive(Parser)]
#[command(name = "neena")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the data directory (default: ~/.neena)
  #[arg(long, global = true)]
  data_dir: Option<PathBuf>,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Check a flow file and print its execution order
  Validate {
    /// Path to the flow file (JSON)
    flow_file: PathBuf,
  },

  /// Run a flow and print the resulting flow run
  Run {
    /// Path to the flow file (JSON)
    flow_file: PathBuf,

    /// Parameter bindings per task operation index (JSON)
    #[arg(long)]
    answers: PathBuf,

    /// Extra catalog entries (JSON), merged over the built-in catalog
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Settings file (default: <data-dir>/settings.json if present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Principal the flow runs as
    #[arg(long, default_value = "local@neena")]
    principal: String,
  },

  /// Print the built-in catalog (JSON)
  Catalog,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();

  let data_dir = match cli.data_dir {
    Some(dir) => dir,
    None => dirs::home_dir()
      .context("could not determine home directory")?
      .join(".neena"),
  };

  match cli.command {
    Some(Commands::Validate { flow_file }) => validate(&flow_file),
    Some(Commands::Run {
      flow_file,
      answers,
      catalog,
      config,
      principal,
    }) => {
      let config = config.unwrap_or_else(|| data_dir.join("settings.json"));
      let rt = tokio::runtime::Runtime::new()?;
      rt.block_on(async {
        run_flow_async(&flow_file, &answers, catalog.as_deref(), &config, principal).await
      })
    }
    Some(Commands::Catalog) => {
      let catalog = InMemoryCatalog::from_registry(&registry());
      println!("{}", serde_json::to_string_pretty(&catalog.to_def())?);
      Ok(())
    }
    None => {
      println!("neena - use --help to see available commands");
      Ok(())
    }
  }
}

fn registry() -> IntegrationRegistry {
  let mut registry = IntegrationRegistry::new();
  registry.register::<SystemIntegration>();
  registry
}

fn read_flow(flow_file: &Path) -> Result<FlowDef> {
  let content = std::fs::read_to_string(flow_file)
    .with_context(|| format!("failed to read flow file: {}", flow_file.display()))?;

  serde_json::from_str(&content)
    .with_context(|| format!("failed to parse flow file: {}", flow_file.display()))
}

fn validate(flow_file: &Path) -> Result<()> {
  let def = read_flow(flow_file)?;
  let flow = Flow::new(def).context("invalid flow")?;

  info!(flow = %flow.name(), operations = flow.execution_order().len(), "flow_valid");
  for operation in flow.operations() {
    println!(
      "{}\t{}\t{}",
      operation.sorted_index.unwrap_or_default(),
      operation.index,
      operation.name
    );
  }

  Ok(())
}

async fn run_flow_async(
  flow_file: &Path,
  answers_file: &Path,
  catalog_file: Option<&Path>,
  config_file: &Path,
  principal: String,
) -> Result<()> {
  let def = read_flow(flow_file)?;
  info!(flow = %def.name, operations = def.task_operations.len(), "flow_loaded");

  let settings = if config_file.exists() {
    Settings::load(config_file)?
  } else {
    Settings::default()
  };

  let answers = tokio::fs::read_to_string(answers_file)
    .await
    .with_context(|| format!("failed to read answers file: {}", answers_file.display()))?;
  let preparer = FixedPreparer::from_json(&answers)
    .with_context(|| format!("failed to parse answers file: {}", answers_file.display()))?;

  let registry = registry();
  let mut catalog = InMemoryCatalog::from_registry(&registry);
  if let Some(path) = catalog_file {
    let content = tokio::fs::read_to_string(path)
      .await
      .with_context(|| format!("failed to read catalog file: {}", path.display()))?;
    let def: CatalogDef = serde_json::from_str(&content)
      .with_context(|| format!("failed to parse catalog file: {}", path.display()))?;
    catalog.extend(def);
  }

  let credentials = InMemoryCredentials::new();
  for (short_name, secret) in &settings.credentials {
    credentials.shared(short_name, secret.clone()).await;
  }

  let ports = Ports::new(
    Arc::new(InMemoryStore::new()),
    Arc::new(preparer),
    Arc::new(registry),
    Arc::new(catalog),
    Arc::new(credentials),
  );
  let mut orchestrator = Orchestrator::new(
    ports,
    Principal::new(principal),
    OrchestratorConfig::from(&settings),
  );

  let flow_run = orchestrator
    .run_flow(def, None)
    .await
    .context("failed to record flow run")?;

  info!(
    flow_run_id = %flow_run.flow_run_id,
    status = ?flow_run.status,
    task_runs = flow_run.task_runs.len(),
    "flow_run_finished"
  );
  println!("{}", serde_json::to_string_pretty(&flow_run)?);

  if flow_run.status != RunStatus::Completed {
    bail!("flow run {} failed", flow_run.flow_run_id);
  }

  Ok(())
}
