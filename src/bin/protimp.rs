//! protimp - proteomics missing-value imputation CLI
//!
//! Command-line interface for missingness profiling, filtering, MCAR testing
//! and multiple imputation of protein abundance matrices.

use clap::{Parser, Subcommand, ValueEnum};
use proteo_impute::combine::{combine_with, CombineConfig, Selection};
use proteo_impute::data::AbundanceMatrix;
use proteo_impute::error::Result;
use proteo_impute::filter::{filter_by_threshold_with_stats, DEFAULT_MISSINGNESS_THRESHOLD};
use proteo_impute::impute::{impute_with_config, ImputeConfig, ImputeMethod};
use proteo_impute::normalize::NormalizationMethod;
use proteo_impute::pipeline::{Pipeline, PipelineConfig};
use proteo_impute::profile::{compute_missingness, profile_missingness};
use proteo_impute::test::mcar_test;
use std::path::PathBuf;

/// CLI-friendly imputation method enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliMethod {
    /// Random forest with leaf-mate donors
    Rf,
    /// Single regression tree with leaf-mate donors
    Cart,
    /// Predictive mean matching
    Pmm,
    /// Bayesian linear regression
    Norm,
}

impl From<CliMethod> for ImputeMethod {
    fn from(method: CliMethod) -> Self {
        match method {
            CliMethod::Rf => ImputeMethod::Rf,
            CliMethod::Cart => ImputeMethod::Cart,
            CliMethod::Pmm => ImputeMethod::Pmm,
            CliMethod::Norm => ImputeMethod::Norm,
        }
    }
}

/// CLI-friendly normalization enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliNormalize {
    /// Align sample medians and MADs
    Mad,
    /// Scale samples to a common median absolute value
    Scale,
    /// Leave values unchanged
    None,
}

impl From<CliNormalize> for NormalizationMethod {
    fn from(method: CliNormalize) -> Self {
        match method {
            CliNormalize::Mad => NormalizationMethod::Mad,
            CliNormalize::Scale => NormalizationMethod::Scale,
            CliNormalize::None => NormalizationMethod::None,
        }
    }
}

/// How to reduce the ensemble
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliSelect {
    /// A single member chosen with --index
    Index,
    /// Cell-wise mean of all members
    Mean,
}

/// Proteomics missing-value imputation
#[derive(Parser)]
#[command(name = "protimp")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Profile missingness per protein and per sample
    Profile {
        /// Path to abundance matrix TSV
        #[arg(short, long)]
        input: PathBuf,

        /// Output format: text, json or yaml
        #[arg(long, default_value = "text")]
        format: String,

        /// Histogram bins for per-protein missingness
        #[arg(long, default_value = "10")]
        bins: usize,
    },

    /// Drop proteins above a missingness threshold
    Filter {
        /// Path to abundance matrix TSV
        #[arg(short, long)]
        input: PathBuf,

        /// Output path for the filtered matrix TSV
        #[arg(short, long)]
        output: PathBuf,

        /// Maximum fraction of missing samples per protein
        #[arg(long, default_value_t = DEFAULT_MISSINGNESS_THRESHOLD)]
        threshold: f64,
    },

    /// Run Little's MCAR test
    Mcar {
        /// Path to abundance matrix TSV
        #[arg(short, long)]
        input: PathBuf,

        /// Output format: text or json
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Filter, impute and combine in one go
    Impute {
        /// Path to abundance matrix TSV
        #[arg(short, long)]
        input: PathBuf,

        /// Output path for the completed matrix TSV
        #[arg(short, long)]
        output: PathBuf,

        /// Maximum fraction of missing samples per protein
        #[arg(long, default_value_t = DEFAULT_MISSINGNESS_THRESHOLD)]
        threshold: f64,

        /// Imputation method
        #[arg(long, value_enum, default_value = "rf")]
        method: CliMethod,

        /// Number of imputed datasets
        #[arg(short, default_value = "3")]
        m: usize,

        /// Chained-equation iterations per dataset
        #[arg(long, default_value = "5")]
        maxit: usize,

        /// Random seed
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Member selection
        #[arg(long, value_enum, default_value = "index")]
        select: CliSelect,

        /// Member index when --select index
        #[arg(long, default_value = "0")]
        index: usize,

        /// Normalization of the completed matrix
        #[arg(long, value_enum, default_value = "mad")]
        normalize: CliNormalize,

        /// Log2 transform before normalization
        #[arg(long)]
        log2: bool,

        /// Also write the full ensemble as JSON
        #[arg(long)]
        ensemble: Option<PathBuf>,
    },

    /// Run a pipeline from a YAML configuration file
    Run {
        /// Path to pipeline configuration YAML
        #[arg(short, long)]
        config: PathBuf,

        /// Path to abundance matrix TSV
        #[arg(short, long)]
        input: PathBuf,

        /// Output path for the completed matrix TSV
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Generate an example pipeline configuration
    Example {
        /// Output path for example config
        #[arg(short, long, default_value = "pipeline.yaml")]
        output: PathBuf,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Profile {
            input,
            format,
            bins,
        } => cmd_profile(&input, &format, bins),

        Commands::Filter {
            input,
            output,
            threshold,
        } => cmd_filter(&input, &output, threshold),

        Commands::Mcar { input, format } => cmd_mcar(&input, &format),

        Commands::Impute {
            input,
            output,
            threshold,
            method,
            m,
            maxit,
            seed,
            select,
            index,
            normalize,
            log2,
            ensemble,
        } => {
            let config = ImputeConfig {
                method: method.into(),
                m,
                max_iterations: maxit,
                seed,
                ..ImputeConfig::default()
            };
            let selection = match select {
                CliSelect::Index => Selection::Index(index),
                CliSelect::Mean => Selection::Mean,
            };
            let combine = CombineConfig {
                normalization: normalize.into(),
                log2,
            };
            cmd_impute(
                &input,
                &output,
                threshold,
                &config,
                selection,
                &combine,
                ensemble.as_ref(),
            )
        }

        Commands::Run {
            config,
            input,
            output,
        } => cmd_run(&config, &input, &output),

        Commands::Example { output } => cmd_example(&output),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn load(input: &PathBuf) -> Result<AbundanceMatrix> {
    eprintln!("Loading abundance matrix from {:?}...", input);
    let matrix = AbundanceMatrix::from_tsv(input)?;
    eprintln!(
        "Loaded {} proteins x {} samples ({} missing values)",
        matrix.n_proteins(),
        matrix.n_samples(),
        matrix.n_missing()
    );
    Ok(matrix)
}

/// Print a missingness profile
fn cmd_profile(input: &PathBuf, format: &str, bins: usize) -> Result<()> {
    let matrix = load(input)?;
    let profile = profile_missingness(&matrix, bins)?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&profile)?),
        "yaml" => println!("{}", serde_yaml::to_string(&profile)?),
        _ => print!("{}", profile),
    }

    Ok(())
}

/// Filter by missingness and write the result
fn cmd_filter(input: &PathBuf, output: &PathBuf, threshold: f64) -> Result<()> {
    let matrix = load(input)?;
    let missingness = compute_missingness(&matrix)?;
    let (filtered, stats) = filter_by_threshold_with_stats(&matrix, &missingness, threshold)?;

    eprint!("{}", stats);
    filtered.to_tsv(output)?;
    eprintln!("Wrote filtered matrix to {:?}", output);

    Ok(())
}

/// Run Little's MCAR test
fn cmd_mcar(input: &PathBuf, format: &str) -> Result<()> {
    let matrix = load(input)?;
    let result = mcar_test(&matrix)?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&result)?),
        _ => print!("{}", result),
    }

    Ok(())
}

/// Filter, impute and combine
fn cmd_impute(
    input: &PathBuf,
    output: &PathBuf,
    threshold: f64,
    config: &ImputeConfig,
    selection: Selection,
    combine: &CombineConfig,
    ensemble_path: Option<&PathBuf>,
) -> Result<()> {
    let matrix = load(input)?;
    let missingness = compute_missingness(&matrix)?;
    let (filtered, stats) = filter_by_threshold_with_stats(&matrix, &missingness, threshold)?;
    eprint!("{}", stats);

    eprintln!(
        "Imputing {} datasets with {} ({} iterations, seed {})...",
        config.m, config.method, config.max_iterations, config.seed
    );
    let ensemble = impute_with_config(&filtered, config)?;
    if let Some(path) = ensemble_path {
        ensemble.to_json_file(path)?;
        eprintln!("Wrote ensemble to {:?}", path);
    }

    let completed = combine_with(&ensemble, selection, combine)?;
    completed.to_tsv(output)?;
    eprintln!(
        "Done! Wrote {} proteins x {} samples to {:?}",
        completed.n_proteins(),
        completed.n_samples(),
        output
    );

    Ok(())
}

/// Run a pipeline from configuration
fn cmd_run(config_path: &PathBuf, input: &PathBuf, output: &PathBuf) -> Result<()> {
    eprintln!("Loading pipeline configuration from {:?}...", config_path);
    let config_str = std::fs::read_to_string(config_path)?;
    let config = PipelineConfig::from_yaml(&config_str)?;

    let matrix = load(input)?;
    eprintln!("Running pipeline '{}'...", config.name);
    let result = Pipeline::from_config(&config).run(&matrix)?;

    if let Some(mcar) = &result.mcar {
        eprint!("{}", mcar);
    } else if let Some(err) = &result.mcar_error {
        eprintln!("MCAR test skipped: {}", err);
    }

    match &result.completed {
        Some(completed) => {
            completed.to_tsv(output)?;
            eprintln!("Wrote completed matrix to {:?}", output);
        }
        None => {
            result.matrix.to_tsv(output)?;
            eprintln!("No combine step; wrote current matrix to {:?}", output);
        }
    }

    Ok(())
}

/// Generate example pipeline configuration
fn cmd_example(output_path: &PathBuf) -> Result<()> {
    let pipeline = Pipeline::new()
        .name("example-rf")
        .filter_missingness(DEFAULT_MISSINGNESS_THRESHOLD)
        .test_mcar()
        .impute(ImputeMethod::Rf, 3, 5, 42)
        .combine(Selection::Index(0));

    let config = pipeline.to_config(Some(
        "Filter sparse proteins, test MCAR, impute with random forests and normalize",
    ));
    let yaml = config.to_yaml()?;

    std::fs::write(output_path, &yaml)?;
    eprintln!("Wrote example pipeline to {:?}", output_path);
    eprintln!();
    eprintln!("Contents:");
    println!("{}", yaml);

    Ok(())
}
