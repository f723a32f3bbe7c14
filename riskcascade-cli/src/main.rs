//! riskcascade CLI - hazard risk assessment with cascade aggregation

// Global invariants enforced:
// - Deterministic output ordering
// - Identical input yields byte-for-byte identical output
// - stdout carries results only; diagnostics go to stderr

use anyhow::Context;
use clap::{Parser, Subcommand};
use riskcascade_core::config;
use riskcascade_core::delta::SnapshotDelta;
use riskcascade_core::scale::Quantity;
use riskcascade_core::{
    assess_file, render_delta_text, render_json, render_text, ReportOptions, ResolvedConfig,
    ResultSnapshot,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "riskcascade")]
#[command(about = "Hazard risk assessment with scenario selection and cascade aggregation")]
#[command(version = env!("RISKCASCADE_VERSION"))]
struct Cli {
    /// Log pass-level details (same as RUST_LOG=debug)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Assess hazards and cascades from an input document
    Assess {
        /// Path to the JSON input document (hazards and cascades)
        input: PathBuf,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,

        /// Path to config file (default: auto-discover)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Write output to this file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,

        /// Show only top N hazards (overrides config file)
        #[arg(long)]
        top: Option<usize>,

        /// Minimum MRS total risk (overrides config file)
        #[arg(long)]
        min_risk: Option<f64>,
    },
    /// Compare two result snapshots
    Delta {
        /// Snapshot JSON produced by `assess --format json`
        before: PathBuf,

        /// Snapshot JSON to compare against `before`
        after: PathBuf,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },
    /// Classify an absolute magnitude on the configured scale
    Classify {
        /// Absolute value (money for impact, events/year for probability)
        value: f64,

        /// Quantity the value measures
        #[arg(long, default_value = "impact")]
        quantity: QuantityArg,

        /// Path to config file (default: auto-discover)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Validate or show a configuration file
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Validate a config file without running an assessment
    Validate {
        /// Path to config file (default: auto-discover from current directory)
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Show the resolved configuration (merged defaults + config file)
    Show {
        /// Path to config file (default: auto-discover from current directory)
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum QuantityArg {
    Impact,
    Probability,
}

impl From<QuantityArg> for Quantity {
    fn from(arg: QuantityArg) -> Self {
        match arg {
            QuantityArg::Impact => Quantity::Impact,
            QuantityArg::Probability => Quantity::Probability,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Assess {
            input,
            format,
            config,
            output,
            top,
            min_risk,
        } => {
            let mut resolved = load_config(config.as_deref())?;

            // CLI flags override config file values
            if let Some(n) = top {
                if n == 0 {
                    anyhow::bail!("--top must be at least 1");
                }
                resolved.top_n = Some(n);
            }
            if let Some(min) = min_risk {
                if !min.is_finite() || min < 0.0 {
                    anyhow::bail!("--min-risk must be non-negative (got {})", min);
                }
                resolved.min_risk = Some(min);
            }

            let snapshot = assess_file(&input, &resolved)
                .with_context(|| format!("failed to assess {}", input.display()))?;
            tracing::debug!(
                hazards = snapshot.hazards.len(),
                edges = snapshot.analysis.edge_count,
                "assessment complete"
            );

            let rendered = match format {
                OutputFormat::Text => render_text(&snapshot, &report_options(&resolved)),
                OutputFormat::Json => render_json(&snapshot.with_aggregates()),
            };
            emit(output.as_deref(), &rendered)?;
        }
        Commands::Delta {
            before,
            after,
            format,
        } => {
            let before_snapshot = load_snapshot(&before)?;
            let after_snapshot = load_snapshot(&after)?;
            let delta = SnapshotDelta::new(&before_snapshot, &after_snapshot)
                .context("failed to compute delta")?
                .with_aggregates();

            match format {
                OutputFormat::Text => {
                    let resolved = load_config(None)?;
                    print!("{}", render_delta_text(&delta, &resolved.currency));
                }
                OutputFormat::Json => {
                    let json = delta.to_json().context("failed to serialize delta to JSON")?;
                    println!("{}", json);
                }
            }
        }
        Commands::Classify {
            value,
            quantity,
            config,
        } => {
            let resolved = load_config(config.as_deref())?;
            let quantity = Quantity::from(quantity);
            let table = resolved.scales.table(quantity);
            println!("class: {}", table.classify(value));
            println!("relative: {:.3}", resolved.scales.relative(quantity, value));
        }
        Commands::Config { action } => match action {
            ConfigAction::Validate { path } => {
                let project_root = std::env::current_dir()?;
                let resolved = config::load_and_resolve(&project_root, path.as_deref());

                match resolved {
                    Ok(config) => {
                        if let Some(ref p) = config.config_path {
                            println!("Config valid: {}", p.display());
                        } else {
                            println!("No config file found. Using defaults.");
                        }
                    }
                    Err(e) => {
                        eprintln!("Config validation failed: {:#}", e);
                        std::process::exit(1);
                    }
                }
            }
            ConfigAction::Show { path } => {
                let resolved = load_config(path.as_deref())?;
                print_config(&resolved);
            }
        },
    }

    Ok(())
}

/// Install the stderr log subscriber; `RUST_LOG` overrides the default filter
fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "debug" } else { "warn" })
    });

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> anyhow::Result<ResolvedConfig> {
    let project_root = std::env::current_dir()?;
    config::load_and_resolve(&project_root, path).context("failed to load configuration")
}

fn report_options(resolved: &ResolvedConfig) -> ReportOptions {
    ReportOptions {
        top_n: resolved.top_n,
        min_risk: resolved.min_risk,
        currency: resolved.currency.clone(),
    }
}

fn load_snapshot(path: &Path) -> anyhow::Result<ResultSnapshot> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read snapshot: {}", path.display()))?;
    ResultSnapshot::from_json(&json)
        .with_context(|| format!("invalid snapshot: {}", path.display()))
}

fn print_config(resolved: &ResolvedConfig) {
    println!("Configuration:");
    if let Some(ref p) = resolved.config_path {
        println!("  Source: {}", p.display());
    } else {
        println!("  Source: defaults (no config file found)");
    }
    println!();
    println!("Scale:");
    println!("  preset: {}", resolved.scales.preset.as_str());
    println!("  impact_baseline: {}", resolved.scales.impact_baseline);
    println!("  probability_baseline: {}", resolved.scales.probability_baseline);
    for (name, table) in [
        ("impact", &resolved.scales.impact),
        ("probability", &resolved.scales.probability),
    ] {
        let labels: Vec<&str> = table.entries().iter().map(|e| e.label.as_str()).collect();
        println!("  {} classes: {}", name, labels.join(", "));
    }
    println!();
    println!("Report:");
    println!("  currency: {}", resolved.currency);
    println!(
        "  min_risk: {}",
        resolved
            .min_risk
            .map(|v| v.to_string())
            .unwrap_or_else(|| "none".to_string())
    );
    println!(
        "  top: {}",
        resolved
            .top_n
            .map(|v| v.to_string())
            .unwrap_or_else(|| "none".to_string())
    );
}

/// Write rendered output to a file (temp + rename) or to stdout
fn emit(path: Option<&Path>, rendered: &str) -> anyhow::Result<()> {
    let Some(path) = path else {
        print!("{}", rendered);
        if !rendered.ends_with('\n') {
            println!();
        }
        return Ok(());
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory: {}", parent.display()))?;
    }

    let temp_path = path.with_extension("tmp");
    std::fs::write(&temp_path, rendered)
        .with_context(|| format!("failed to write temporary file: {}", temp_path.display()))?;
    std::fs::rename(&temp_path, path)
        .with_context(|| format!("failed to rename temporary file to: {}", path.display()))?;

    Ok(())
}
