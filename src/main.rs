use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use statement_normalizer::{output_file_name, Normalizer, NormalizerConfig};

#[derive(Parser, Debug)]
#[command(name = "statement-normalizer", version, about = "Normalize bank statement CSV exports")]
struct Cli {
    /// TOML file overriding known names, section labels or the sniffing window
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the detected bank format (hdfc, icici, axis, idfc, generic)
    Detect {
        /// Statement CSV
        file: PathBuf,
    },

    /// Normalize a statement into the canonical CSV layout
    Standardize {
        /// Statement CSV
        input: PathBuf,

        /// Output path (default: <Bank><CaseN|StatementNNNN>.csv next to the input)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let normalizer = Normalizer::new(load_config(cli.config.as_deref())?);

    match cli.command {
        Command::Detect { file } => {
            let format = normalizer
                .detect(&file)
                .with_context(|| format!("detecting format of {}", file.display()))?;
            println!("{}", format);
        }

        Command::Standardize {
            input,
            output,
            json,
        } => {
            if !input.exists() {
                bail!("CSV not found: {}", input.display());
            }

            let output = match output {
                Some(path) => path,
                None => default_output(&normalizer, &input)?,
            };
            if output == input {
                bail!("refusing to overwrite the input file {}", input.display());
            }

            let report = normalizer
                .standardize_report(&input, &output)
                .with_context(|| format!("standardizing {}", input.display()))?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!(
                    "✓ {} rows ({}) written to {}",
                    report.rows,
                    report.format,
                    report.output.display()
                );
            }
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<NormalizerConfig> {
    match path {
        Some(p) => NormalizerConfig::load(p).with_context(|| format!("loading {}", p.display())),
        None => Ok(NormalizerConfig::default()),
    }
}

fn default_output(normalizer: &Normalizer, input: &Path) -> Result<PathBuf> {
    let format = normalizer
        .detect(input)
        .with_context(|| format!("detecting format of {}", input.display()))?;
    let file_name = input
        .file_name()
        .and_then(|n| n.to_str())
        .context("input path has no file name")?;

    let name = output_file_name(file_name, format, chrono::Utc::now().timestamp());
    Ok(input.with_file_name(name))
}
