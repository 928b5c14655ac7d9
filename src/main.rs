use agent_clients::ServiceSettings;
use clap::Parser;
use fhir_agent_core::pipeline;
use fhir_agent_core::{model_settings_from_env_values, PipelineConfig};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "fhir-agent-run")]
#[command(about = "Batch clinical narrative to FHIR bundle pipeline")]
struct Args {
    /// Pipeline configuration file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,
}

/// Entry point for the batch pipeline
///
/// Loads `.env`, reads the pipeline configuration and runs the configured mode:
/// - `generate`: generate cases per disease, then process the case book
/// - `pre-defined`: process the existing case book
/// - `rag-preparation`: summarise every bundle below `fhir_directory`
///
/// # Environment Variables
/// - `LOG_LEVEL`: default log level when `RUST_LOG` is unset (default: "info")
/// - `MODEL_ID`, `GENERATION_BASE_URL`, `GENERATION_API_KEY`: text generation service
/// - `PROMPT_TEMPERATURE`, `GENERATION_TEMPERATURE`, `PROMPT_MAX_TOKENS`: sampling settings
/// - `BIOPORTAL_API_KEY`, `LOINC_USER`, `LOINC_PASSWORD`: terminology services
///
/// Per-case failures are logged and counted; only configuration-level failures end the run
/// with an error.
fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into());
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_lowercase())),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = PipelineConfig::load(&args.config)?;

    let env = |name: &str| std::env::var(name).ok();
    let settings = model_settings_from_env_values(
        env("PROMPT_TEMPERATURE"),
        env("GENERATION_TEMPERATURE"),
        env("PROMPT_MAX_TOKENS"),
    )?;
    let services = ServiceSettings::from_lookup(env);

    tracing::info!(
        "++ Starting pipeline in {} mode with model {}",
        config.mode,
        services.model_id
    );

    let generator = services.generator()?;
    let terminology = services.terminology()?;
    let report = pipeline::run(&config, &generator, &terminology, settings)?;

    tracing::info!(
        processed = report.processed,
        skipped = report.skipped,
        failed = report.failed,
        "++ Pipeline finished"
    );

    Ok(())
}
