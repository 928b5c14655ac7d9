use agent_clients::ServiceSettings;
use anyhow::Context;
use clap::{Parser, Subcommand};
use fhir::Bundle;
use fhir_agent_core::pipeline::bundle_file_name;
use fhir_agent_core::storage::write_atomically;
use fhir_agent_core::{
    extract_json_value, parse_record, reduce_bundle_reporting, render_summary, schema_text,
    Assembler, CanonicalRecord, OfflineTerminology, TerminologySearch,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "fhir-agent")]
#[command(about = "Clinical narrative to FHIR bundle codec")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Repair and validate a model completion, printing the canonical record
    Extract {
        /// File holding the raw completion text
        file: PathBuf,
    },
    /// Assemble a transaction bundle from a canonical record
    Assemble {
        /// Canonical record JSON file
        record: PathBuf,
        /// Write `<case-id>_<patient-id>.json` into this directory instead of printing
        #[arg(long)]
        out: Option<PathBuf>,
        /// Case id for the output file name (defaults to the record file stem)
        #[arg(long)]
        case_id: Option<String>,
        /// Skip terminology services; every code resolves to `unknown`
        #[arg(long)]
        offline: bool,
    },
    /// Reduce a bundle back to a canonical record
    Reduce {
        /// Bundle JSON file
        bundle: PathBuf,
    },
    /// Print the plain-text patient summary of a bundle
    Summarise {
        /// Bundle JSON file
        bundle: PathBuf,
    },
    /// Print the canonical record schema
    Schema,
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into());
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_lowercase())),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Extract { file }) => {
            let raw = read(&file)?;
            let value = extract_json_value(&raw)
                .with_context(|| format!("no record found in {}", file.display()))?;
            print_record(&parse_record(&value)?)?;
        }
        Some(Commands::Assemble {
            record,
            out,
            case_id,
            offline,
        }) => {
            let value: serde_json::Value = serde_json::from_str(&read(&record)?)
                .with_context(|| format!("{} is not JSON", record.display()))?;

            let http;
            let search: &dyn TerminologySearch = if offline {
                &OfflineTerminology
            } else {
                http = ServiceSettings::from_lookup(|name| std::env::var(name).ok())
                    .terminology()?;
                &http
            };

            let assembled = Assembler::new(search).assemble_value(&value)?;
            let rendered = assembled.bundle.render()?;

            match out {
                Some(dir) => {
                    let case_id = case_id.unwrap_or_else(|| file_stem(&record));
                    let path = dir.join(bundle_file_name(&case_id, &assembled.patient_id));
                    write_atomically(&path, &rendered)?;
                    println!("Wrote {} ({} entries)", path.display(), assembled.bundle.entry.len());
                }
                None => println!("{rendered}"),
            }
        }
        Some(Commands::Reduce { bundle }) => {
            print_record(&reduce(&bundle)?)?;
        }
        Some(Commands::Summarise { bundle }) => {
            print!("{}", render_summary(&reduce(&bundle)?));
        }
        Some(Commands::Schema) => {
            println!("{}", schema_text());
        }
        None => {
            println!("Use 'fhir-agent --help' for commands");
        }
    }

    Ok(())
}

fn read(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "case".into())
}

fn reduce(path: &Path) -> anyhow::Result<CanonicalRecord> {
    let bundle = Bundle::parse(&read(path)?)?;
    let reduction = reduce_bundle_reporting(&bundle);
    for diagnostic in &reduction.diagnostics {
        tracing::warn!(%diagnostic, "resource dropped");
    }
    Ok(reduction.record)
}

fn print_record(record: &CanonicalRecord) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(record)?);
    Ok(())
}
