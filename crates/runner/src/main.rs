mod config;

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use config::UnitFile;
use flowunit_http_tools::ReqwestTransport;
use flowunit_http_tools::response_shaping::ResponsePipeline;
use flowunit_units::catalog;
use flowunit_units::{
    ExecutionContext, InputRecord, ParameterKind, PerItemParameters, StaticParameters, ToolAdapter,
    ToolInput, TraceLog, run_batch,
};
use serde_json::{Map, Value, json};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "flowunit-runner", version, about = "Run a flowunit unit in batch or tool mode")]
struct Cli {
    /// Unit file (YAML, or JSON when the extension is `.json`).
    #[arg(long, short, env = "FLOWUNIT_CONFIG")]
    config: PathBuf,

    /// Default log filter; `RUST_LOG` takes precedence.
    #[arg(long, env = "FLOWUNIT_LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Process records and print the output records as JSON.
    Batch {
        /// JSON array of input records. Without it, one empty record per configured item
        /// (at least one).
        #[arg(long, short)]
        input: Option<PathBuf>,
    },
    /// Invoke the unit's tool once and print its result.
    Tool {
        /// Raw agent input: free text or a JSON object.
        #[arg(long, short)]
        input: String,
    },
    /// Print parameters, applicable fields and the tool descriptor.
    Describe,
}

fn init_tracing(default_level: &str, format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.compact().init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.log_format);

    let cfg = config::load_unit_file(&cli.config)?;
    tracing::debug!(unit = %cfg.unit, config = %cli.config.display(), "loaded unit file");

    match cli.command {
        Commands::Batch { input } => batch(cfg, input).await,
        Commands::Tool { input } => tool(cfg, &input).await,
        Commands::Describe => describe(&cfg),
    }
}

fn shaping(cfg: &UnitFile) -> anyhow::Result<ResponsePipeline> {
    ResponsePipeline::compile(&cfg.shaping)
        .map_err(anyhow::Error::msg)
        .context("invalid shaping")
}

async fn batch(cfg: UnitFile, input: Option<PathBuf>) -> anyhow::Result<()> {
    let records = match input {
        Some(path) => config::load_records(&path)?,
        None => vec![InputRecord::default(); cfg.items.len().max(1)],
    };
    let unit = catalog::batch_unit(cfg.unit)?;
    let transport = ReqwestTransport::new(&cfg.http).context("build HTTP client")?;
    let pipeline = shaping(&cfg)?;
    let params = PerItemParameters::new(cfg.parameters, cfg.items);

    let ctx = ExecutionContext::new(&params, &transport)
        .continue_on_fail(cfg.continue_on_fail)
        .shaped(&pipeline);
    let out = run_batch(unit.as_ref(), &records, &ctx)
        .await
        .with_context(|| format!("{} batch aborted", unit.name()))?;

    let failed = out.iter().filter(|r| r.is_error()).count();
    tracing::info!(unit = unit.name(), records = out.len(), failed, "batch finished");
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

async fn tool(cfg: UnitFile, input: &str) -> anyhow::Result<()> {
    let pipeline = shaping(&cfg)?;
    let provider = catalog::tool_provider(cfg.unit)?;
    let params = StaticParameters::new(cfg.parameters);
    let unit = provider
        .supply_tool(&params)
        .with_context(|| format!("configure {} tool", cfg.unit))?;
    let transport = ReqwestTransport::new(&cfg.http).context("build HTTP client")?;

    let trace = Arc::new(TraceLog::new());
    let adapter =
        ToolAdapter::new(unit, Arc::new(transport), trace.clone()).with_shaping(pipeline);
    let result = adapter.invoke(ToolInput::parse(input)).await;

    tracing::debug!(tool = %adapter.descriptor().name, trace = %trace.to_value(), "tool trace");
    println!("{result}");
    Ok(())
}

fn describe(cfg: &UnitFile) -> anyhow::Result<()> {
    let params = catalog::parameters(cfg.unit);

    let mut applicable = Map::new();
    match params.decl("operation").map(|d| d.kind()) {
        Some(ParameterKind::Options(operations)) => {
            for op in operations {
                applicable.insert(op.clone(), json!(params.select_applicable_fields(Some(op))));
            }
        }
        _ => {
            applicable.insert("*".into(), json!(params.select_applicable_fields(None)));
        }
    }

    let tool = match catalog::tool_provider(cfg.unit) {
        Ok(provider) => match provider.supply_tool(&StaticParameters::new(cfg.parameters.clone())) {
            Ok(unit) => unit.descriptor().to_value(),
            Err(err) => {
                tracing::warn!(unit = %cfg.unit, error = %err, "tool cannot be configured");
                Value::Null
            }
        },
        Err(_) => Value::Null,
    };

    let out = json!({
        "unit": cfg.unit,
        "parameters": params.describe(),
        "applicableFields": applicable,
        "tool": tool,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
