//! RBM training binary.
//!
//! Trains a single RBM — or, with `--layers`, a deep stack — on a CSV matrix
//! (rows are samples, columns the visible features, values ideally in
//! [0, 1]) and saves the learned weights in the persistence text format.
//! Optionally appends a JSONL metrics record per trained model.

use clap::Parser;
use rbm::{
    save_deep_rbm, save_rbm, ContrastiveDivergence, DeepRbm, ImmutableMatrix, LayerParameters,
    LearningParameters, Matrix, MultiThreadedDeepContrastiveDivergence, RandomRbmFactory,
};
use serde::Serialize;
use std::error::Error;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "rbm-train", about = "Train an RBM or deep RBM on a CSV matrix")]
struct Args {
    /// CSV file of training vectors (rows = samples)
    #[arg(long)]
    input: PathBuf,

    /// Where to save the trained weights
    #[arg(long, default_value = "model.rbm")]
    output: PathBuf,

    /// Hidden units (single-RBM mode)
    #[arg(long, default_value_t = 32)]
    hidden: usize,

    /// Deep mode: comma-separated num_rbms:visible:hidden layer triples,
    /// e.g. "4:196:50,1:200:30"
    #[arg(long)]
    layers: Option<String>,

    /// Training epochs
    #[arg(long, default_value_t = 15000)]
    epochs: usize,

    /// Learning rate
    #[arg(long, default_value_t = 0.1)]
    learning_rate: f64,

    /// Base seed for weight init and Gibbs sampling (random when absent)
    #[arg(long)]
    seed: Option<u64>,

    /// Worker threads for deep training
    #[arg(long, default_value_t = 8)]
    workers: usize,

    /// Append a JSONL metrics record here after training
    #[arg(long)]
    metrics_file: Option<PathBuf>,
}

#[derive(Serialize)]
struct MetricsRecord {
    model: String,
    samples: usize,
    visible: usize,
    final_error: Option<f64>,
    elapsed_ms: u128,
}

fn main() {
    env_logger::init();
    if let Err(e) = run(Args::parse()) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let data = load_csv(&args.input)?;
    println!(
        "loaded {} samples x {} features from {}",
        data.rows(),
        data.cols(),
        args.input.display()
    );

    let seed = args.seed.unwrap_or_else(rand::random);
    let params = LearningParameters::default()
        .with_epochs(args.epochs)
        .with_learning_rate(args.learning_rate);
    let mut factory = RandomRbmFactory::seeded(seed);

    let started = Instant::now();
    let (model, final_error) = match &args.layers {
        Some(spec) => {
            let layer_parameters = parse_layers(spec)?;
            let mut deep: DeepRbm<ImmutableMatrix> =
                DeepRbm::from_layer_parameters(&layer_parameters, &mut factory)?;
            let mut trainer = MultiThreadedDeepContrastiveDivergence::with_workers_and_seed(
                params,
                args.workers,
                seed,
            )?;
            trainer.learn(&mut deep, &data)?;
            if !save_deep_rbm(&deep, &args.output) {
                return Err(format!("could not save model to {}", args.output.display()).into());
            }
            ("deep".to_string(), None)
        }
        None => {
            let mut rbm = factory.build::<ImmutableMatrix>(data.cols(), args.hidden);
            let mut trainer = ContrastiveDivergence::with_seed(params, seed);
            let error = trainer.learn(&mut rbm, &data)?;
            if !save_rbm(&rbm, &args.output) {
                return Err(format!("could not save model to {}", args.output.display()).into());
            }
            ("single".to_string(), Some(error))
        }
    };
    let elapsed_ms = started.elapsed().as_millis();

    println!(
        "trained {} model in {}ms, saved to {}",
        model,
        elapsed_ms,
        args.output.display()
    );

    if let Some(metrics_file) = &args.metrics_file {
        let record = MetricsRecord {
            model,
            samples: data.rows(),
            visible: data.cols(),
            final_error,
            elapsed_ms,
        };
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(metrics_file)?;
        writeln!(file, "{}", serde_json::to_string(&record)?)?;
    }

    Ok(())
}

fn load_csv(path: &PathBuf) -> Result<ImmutableMatrix, Box<dyn Error>> {
    let contents = std::fs::read_to_string(path)?;
    let mut rows = Vec::new();
    for (i, line) in contents.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let row: Result<Vec<f64>, _> = line.split(',').map(|v| v.trim().parse::<f64>()).collect();
        rows.push(row.map_err(|e| format!("line {}: {}", i + 1, e))?);
    }
    if rows.is_empty() {
        return Err("input file has no rows".into());
    }
    Ok(ImmutableMatrix::from_rows(&rows)?)
}

fn parse_layers(spec: &str) -> Result<Vec<LayerParameters>, Box<dyn Error>> {
    spec.split(',')
        .map(|triple| {
            let parts: Vec<&str> = triple.split(':').collect();
            let [num, visible, hidden] = parts[..] else {
                return Err(format!("layer triple must be num:visible:hidden, got {:?}", triple).into());
            };
            Ok(LayerParameters::new(
                num.trim().parse()?,
                visible.trim().parse()?,
                hidden.trim().parse()?,
            ))
        })
        .collect()
}
