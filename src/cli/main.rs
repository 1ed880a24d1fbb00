use anyhow::{bail, Context};
use app_success_predictor::{
    config::Config,
    dataset::{deduplicate, load_training_records, locate_dataset, SuccessDistribution},
    logging::init_tracing,
    ml::{default_cases, inspect, ModelArtifacts, Trainer, TrainingReport, DEFAULT_INSPECT_NEIGHBORS},
};
use clap::{Parser, Subcommand};
use reqwest::Client;
use serde_json::json;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "asp-cli")]
#[command(about = "App Success Predictor CLI", long_about = None)]
struct Cli {
    #[arg(short, long, env = "ASP_ENDPOINT", default_value = "http://localhost:5001")]
    endpoint: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Locate the raw Play Store export and write a deduplicated copy
    Extract {
        /// Raw CSV; probes the configured candidates when omitted
        #[arg(short, long)]
        input: Option<PathBuf>,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Train the model and write the artifact set
    Train {
        #[arg(short, long)]
        dataset: Option<PathBuf>,

        #[arg(short, long)]
        artifact_dir: Option<PathBuf>,

        /// Largest K evaluated during the sweep
        #[arg(long)]
        k_max: Option<usize>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Trace requests through encoding, scaling and neighbor search
    Inspect {
        #[arg(short, long)]
        artifact_dir: Option<PathBuf>,

        /// Custom request as JSON instead of the built-in cases
        #[arg(short, long)]
        input: Option<String>,

        /// Also print the hit/flop balance of this training CSV
        #[arg(short, long)]
        dataset: Option<PathBuf>,

        #[arg(short, long, default_value_t = DEFAULT_INSPECT_NEIGHBORS)]
        neighbors: usize,
    },

    /// Request a prediction from a running server
    Predict {
        #[arg(short, long)]
        category: String,

        #[arg(short, long)]
        size: f64,

        #[arg(short = 'T', long = "type")]
        app_type: String,

        #[arg(short, long)]
        price: f64,

        #[arg(short = 'r', long)]
        content_rating: String,
    },

    /// Show the served model's metadata
    Metadata,

    /// Check server health
    Health,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {}", e);
        eprintln!("Using default configuration");
        Config::default()
    });
    init_tracing(&config.observability);

    let client = Client::new();

    match cli.command {
        Commands::Extract { input, output } => {
            let input = match input {
                Some(path) => path,
                None => locate_dataset(&config.dataset.candidates)
                    .context("Download the dataset from https://www.kaggle.com/datasets/lava18/google-play-store-apps")?,
            };
            let output = output.unwrap_or(config.dataset.output);

            println!("Found dataset at: {}", input.display());
            let report = deduplicate(&input, &output)?;
            println!("Dataset loaded: {} rows", report.rows_in);
            println!("After removing duplicates: {} rows", report.rows_out);
            println!();
            println!("Dataset saved as: {}", output.display());
            println!("  Rows: {}", report.rows_out);
            println!("  Columns: {}", report.columns);
        }

        Commands::Train {
            dataset,
            artifact_dir,
            k_max,
            json,
        } => {
            let dataset = dataset.unwrap_or_else(|| config.training.dataset_path.clone());
            let artifact_dir = artifact_dir.unwrap_or(config.model.artifact_dir);

            let mut training = config.training;
            if let Some(k_max) = k_max {
                training.k_max = k_max;
            }

            let records = load_training_records(&dataset)
                .with_context(|| format!("Failed to load {}", dataset.display()))?;
            let outcome = Trainer::new(training).train(&records)?;
            let written = outcome.artifacts.save(&artifact_dir)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&outcome.report)?);
            } else {
                print_training_report(&outcome.report);
                println!();
                println!("Saved:");
                for path in written {
                    println!("  - {}", path.display());
                }
            }
        }

        Commands::Inspect {
            artifact_dir,
            input,
            dataset,
            neighbors,
        } => {
            let artifact_dir = artifact_dir.unwrap_or(config.model.artifact_dir);
            let artifacts = ModelArtifacts::load(&artifact_dir)?;
            println!(
                "Model K: {} ({} training vectors)",
                artifacts.classifier().k(),
                artifacts.classifier().n_samples()
            );

            let cases = match input {
                Some(raw) => vec![serde_json::from_str::<serde_json::Value>(&raw)
                    .context("--input is not valid JSON")?],
                None => default_cases(),
            };

            for (i, case) in cases.iter().enumerate() {
                println!();
                println!("{}", "=".repeat(60));
                println!("Test Case {}: {}", i + 1, case);
                println!("{}", "=".repeat(60));
                match inspect(&artifacts, case, neighbors) {
                    Ok(report) => print!("{}", report),
                    Err(e) => println!("  Rejected: {}", e),
                }
            }

            if let Some(path) = dataset {
                let records = load_training_records(&path)?;
                let distribution = SuccessDistribution::from_records(&records);
                println!();
                println!("{}", "=".repeat(60));
                println!("Training data distribution");
                println!("Total apps: {}", distribution.total);
                println!(
                    "Success=1 (Hits): {} ({:.1}%)",
                    distribution.hits,
                    distribution.hit_percent()
                );
                println!(
                    "Success=0 (Flops): {} ({:.1}%)",
                    distribution.flops,
                    distribution.flop_percent()
                );
            }
        }

        Commands::Predict {
            category,
            size,
            app_type,
            price,
            content_rating,
        } => {
            let response = client
                .post(format!("{}/api/predict", cli.endpoint))
                .json(&json!({
                    "category": category,
                    "size": size,
                    "type": app_type,
                    "price": price,
                    "contentRating": content_rating,
                }))
                .send()
                .await?;

            let status = response.status();
            let body: serde_json::Value = response.json().await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
            if !status.is_success() {
                bail!("Server returned {}", status);
            }
        }

        Commands::Metadata => {
            let response = client
                .get(format!("{}/api/metadata", cli.endpoint))
                .send()
                .await?;

            let body: serde_json::Value = response.json().await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }

        Commands::Health => {
            let response = client
                .get(format!("{}/health", cli.endpoint))
                .send()
                .await?;

            let body: serde_json::Value = response.json().await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
    }

    Ok(())
}

fn print_training_report(report: &TrainingReport) {
    println!("Records: {}", report.n_records);
    println!("  Hits (Success=1): {}", report.hits);
    println!("  Flops (Success=0): {}", report.flops);
    for (column, size) in &report.vocabulary_sizes {
        println!("  {}: {} unique values", column, size);
    }
    println!("Training set: {} samples", report.n_train);
    println!("Test set: {} samples", report.n_test);
    println!();
    println!("  K   accuracy");
    for score in &report.sweep {
        let marker = if score.k == report.best_k { " <" } else { "" };
        println!("  {:<3} {:.4}{}", score.k, score.accuracy, marker);
    }
    println!();
    println!("Optimal K: {}", report.best_k);
    println!("Model accuracy: {:.1}%", report.accuracy * 100.0);
}
