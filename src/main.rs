//! Command-line entry point for fine-tuning an image classifier
//!
//! Loads an image-folder dataset, splits it into train/validation/test,
//! builds a backbone with a fresh classification head, trains the head with
//! validation-driven early stopping, evaluates on the held-out test
//! partition and writes the best checkpoint plus a JSON training summary.

use std::path::PathBuf;

use anyhow::{Context, Result};
use burn::module::AutodiffModule;
use burn::optim::AdamConfig;
use clap::Parser;
use colored::Colorize;
use serde::Serialize;
use tracing::{info, warn};

use imagetune::backend::{backend_name, default_device, TrainingBackend};
use imagetune::dataset::{ImageFolderDataset, PartitionSet, SplitConfig};
use imagetune::model::{head_hidden_layers, FineTuneModel};
use imagetune::training::{
    evaluate, hook, FitSummary, Mode, TestReport, TrainingController, TrainingOptions,
};
use imagetune::utils::logging::{init_logging, LogConfig};
use imagetune::IMAGE_SIZE;

#[derive(Parser, Debug)]
#[command(name = "imagetune")]
#[command(about = "Fine-tune a pretrained image classifier on an image-folder dataset")]
#[command(version)]
struct Args {
    /// Backbone to fine-tune (resnet18, resnet34, resnet50)
    #[arg(long, default_value = "resnet50")]
    model_name: String,

    /// Hidden layer count exponent: the head gets 2^num_layers hidden layers
    #[arg(long, default_value_t = 0)]
    num_layers: u32,

    /// Hidden layer width exponent: each hidden layer gets 2^num_neurons units
    #[arg(long, default_value_t = 0)]
    num_neurons: u32,

    /// Number of target classes
    #[arg(long, default_value_t = 5)]
    num_classes: usize,

    /// Samples per batch
    #[arg(long, default_value_t = 64)]
    batch_size: usize,

    /// Upper bound on training epochs
    #[arg(long, default_value_t = 100)]
    epochs: usize,

    /// Consecutive non-improving epochs tolerated before early stopping
    #[arg(long, default_value_t = 10)]
    tol: usize,

    /// Learning rate
    #[arg(long, default_value_t = 1e-3)]
    lr: f64,

    /// Attach the tracing instrumentation hook to the training loop
    #[arg(long, default_value_t = false)]
    do_hook: bool,

    /// Root directory of the image-folder dataset
    #[arg(long = "data_path", env = "SM_CHANNEL_TRAIN")]
    data_path: PathBuf,

    /// Directory the model checkpoint is written to
    #[arg(long = "model_dir", env = "SM_MODEL_DIR")]
    model_dir: PathBuf,

    /// Directory the training summary is written to
    #[arg(long = "output_dir", env = "SM_OUTPUT_DATA_DIR")]
    output_dir: PathBuf,

    /// Seed for dataset splitting, shuffling and augmentation
    #[arg(long)]
    seed: Option<u64>,

    /// Enable debug logging
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

/// Everything worth keeping about one run, serialized to the output dir
#[derive(Debug, Serialize)]
struct RunSummary {
    model_name: String,
    num_classes: usize,
    classes: Vec<String>,
    fit: FitSummary,
    test: TestReport,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_config = if args.verbose {
        LogConfig::verbose()
    } else {
        LogConfig::default()
    };
    init_logging(&log_config).map_err(anyhow::Error::msg)?;

    println!("{}", "=== imagetune ===".bright_green().bold());
    println!("Backend: {}", backend_name().cyan());
    println!("Backbone: {}", args.model_name.cyan());
    println!();

    std::fs::create_dir_all(&args.model_dir)
        .with_context(|| format!("creating model dir {:?}", args.model_dir))?;
    std::fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("creating output dir {:?}", args.output_dir))?;

    let device = default_device();

    let dataset = ImageFolderDataset::open(&args.data_path)?;
    let stats = dataset.stats();
    stats.log();
    if stats.num_classes != args.num_classes {
        warn!(
            "Dataset has {} classes but --num-classes is {}; the head is sized to {}",
            stats.num_classes, args.num_classes, args.num_classes
        );
    }

    let split_config = SplitConfig {
        seed: args.seed,
        ..Default::default()
    };
    let partitions = PartitionSet::split(&dataset, &split_config)?;

    let hidden = head_hidden_layers(args.num_layers, args.num_neurons);
    let model = FineTuneModel::<TrainingBackend>::build(
        &args.model_name,
        args.num_classes,
        &hidden,
        &device,
    )?;

    let mut hook = hook::create(args.do_hook);
    hook.register_model(&args.model_name);
    hook.register_loss("cross_entropy");

    let mut optimizer = AdamConfig::new().init();

    let options = TrainingOptions {
        epochs: args.epochs,
        tol: args.tol,
        learning_rate: args.lr,
        batch_size: args.batch_size,
        image_size: IMAGE_SIZE,
    };
    let controller = TrainingController::new(options, args.seed);

    let (model, fit) = controller.fit(
        model,
        &mut optimizer,
        &partitions,
        hook.as_mut(),
        &device,
    )?;

    println!(
        "{} best validation accuracy {:.2}% at epoch {}{}",
        "Training finished:".bright_green(),
        fit.best_score,
        fit.best_epoch,
        if fit.early_stopped {
            " (early stopped)"
        } else {
            ""
        }
    );

    hook.set_mode(Mode::Eval);
    let eval_model = model.valid();
    let test = evaluate(
        &eval_model,
        &partitions.test,
        args.batch_size,
        IMAGE_SIZE,
        &device,
    )?;
    println!("{}", test.summary().bright_blue());

    let checkpoint = args.model_dir.join("model");
    model.save(&checkpoint)?;
    info!("Checkpoint written to {:?}", checkpoint);

    let summary = RunSummary {
        model_name: args.model_name.clone(),
        num_classes: args.num_classes,
        classes: dataset.classes.clone(),
        fit,
        test,
    };
    let summary_path = args.output_dir.join("training_summary.json");
    let json = serde_json::to_string_pretty(&summary)?;
    std::fs::write(&summary_path, json)
        .with_context(|| format!("writing summary to {:?}", summary_path))?;
    info!("Summary written to {:?}", summary_path);

    println!("{}", "Done.".bright_green().bold());
    Ok(())
}
