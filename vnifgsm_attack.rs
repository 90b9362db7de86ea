use clap::Parser;
use ndarray::Array4;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rust_adversarial_attacks::architecture::{build_model, load_architecture};
use rust_adversarial_attacks::attacks::{Attack, VniFgsm};
use rust_adversarial_attacks::config::{load_config, AttackConfig};
use rust_adversarial_attacks::evaluation::{evaluate_attack, AttackReport};
use rust_adversarial_attacks::transform::{Identity, Normalize, Transform};
use serde::Deserialize;
use std::error::Error;
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::process;
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

type DynError = Box<dyn Error>;

// A batch stored as JSON: NCHW shape, flat row-major pixels, one label per sample.
#[derive(Clone, Debug, Deserialize)]
struct DiskBatch {
    shape: [usize; 4],
    pixels: Vec<f32>,
    labels: Vec<usize>,
}

impl DiskBatch {
    fn into_parts(self) -> Result<(Array4<f32>, Vec<usize>), DynError> {
        let [n, c, h, w] = self.shape;
        let volume = self
            .shape
            .iter()
            .try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
            .ok_or_else(|| {
                io::Error::new(
                    ErrorKind::InvalidData,
                    format!("batch shape {:?} overflows the element count", self.shape),
                )
            })?;
        if volume == 0 {
            return Err(Box::new(io::Error::new(
                ErrorKind::InvalidInput,
                "batch must have non-zero dimensions",
            )));
        }
        if self.pixels.len() != volume {
            return Err(Box::new(io::Error::new(
                ErrorKind::InvalidData,
                format!(
                    "batch payload has {} values but shape {:?} needs {}",
                    self.pixels.len(),
                    self.shape,
                    volume
                ),
            )));
        }
        if self.labels.len() != n {
            return Err(Box::new(io::Error::new(
                ErrorKind::InvalidData,
                format!("batch has {} samples but {} labels", n, self.labels.len()),
            )));
        }
        let batch = Array4::from_shape_vec((n, c, h, w), self.pixels)?;
        Ok((batch, self.labels))
    }
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Run the VNI-FGSM attack on a batch of images and report its success rate"
)]
struct Cli {
    /// Architecture JSON describing the classifier
    #[arg(long)]
    architecture: PathBuf,

    /// Batch JSON: { "shape": [N, C, H, W], "pixels": [...], "labels": [...] }
    #[arg(long)]
    batch: PathBuf,

    /// Attack configuration JSON (defaults are used when omitted)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seed for the neighbor sampling noise
    #[arg(long)]
    seed: Option<u64>,

    /// Override the number of iterations
    #[arg(long)]
    steps: Option<usize>,

    /// Override the perturbation budget
    #[arg(long)]
    eps: Option<f32>,

    /// Treat labels as target classes
    #[arg(long)]
    targeted: bool,

    /// Evaluate neighbor gradients in parallel
    #[arg(long)]
    parallel: bool,

    /// Seed for initializing layers that carry no weights
    #[arg(long, default_value_t = 0)]
    model_seed: u64,

    /// Normalize RGB input with ImageNet statistics before the classifier
    #[arg(long)]
    imagenet_normalize: bool,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

// Base config from file (or defaults) with command-line overrides applied.
fn attack_config(cli: &Cli) -> Result<AttackConfig, DynError> {
    let mut config = match &cli.config {
        Some(path) => load_config(&path.to_string_lossy())?,
        None => AttackConfig::default(),
    };

    if let Some(seed) = cli.seed {
        config.seed = Some(seed);
    }
    if let Some(steps) = cli.steps {
        config.steps = steps;
    }
    if let Some(eps) = cli.eps {
        config.eps = eps;
    }
    config.targeted |= cli.targeted;
    config.parallel |= cli.parallel;

    config.validate()?;
    Ok(config)
}

fn load_batch(path: &Path) -> Result<(Array4<f32>, Vec<usize>), DynError> {
    let contents = fs::read_to_string(path)?;
    let disk: DiskBatch = serde_json::from_str(&contents)?;
    disk.into_parts()
}

fn run(cli: &Cli) -> Result<AttackReport, DynError> {
    let config = attack_config(cli)?;
    let architecture = load_architecture(&cli.architecture.to_string_lossy())?;
    let mut rng = StdRng::seed_from_u64(cli.model_seed);
    let model = build_model(&architecture, &mut rng)?;
    let (batch, labels) = load_batch(&cli.batch)?;

    let normalize = Normalize::imagenet();
    let transform: &dyn Transform = if cli.imagenet_normalize {
        &normalize
    } else {
        &Identity
    };

    info!(
        layers = model.len(),
        parameters = model.parameter_count(),
        samples = labels.len(),
        "loaded classifier and batch"
    );

    let targeted = config.targeted;
    let attack = VniFgsm::new(&model, Some(transform), config)?;
    let start = Instant::now();
    let adversarial = attack.attack(&batch, &labels)?;
    info!(
        attack = attack.name(),
        elapsed = start.elapsed().as_secs_f32(),
        "attack finished"
    );

    Ok(evaluate_attack(
        &model,
        transform,
        &batch,
        &adversarial,
        &labels,
        targeted,
    )?)
}

fn print_report(report: &AttackReport, json: bool) {
    if json {
        match serde_json::to_string_pretty(report) {
            Ok(text) => println!("{}", text),
            Err(err) => eprintln!("Could not serialize report: {}", err),
        }
        return;
    }

    println!("Samples: {}", report.total);
    println!("Clean accuracy: {:.2}%", report.clean_accuracy() * 100.0);
    println!(
        "Adversarial accuracy: {:.2}%",
        report.adversarial_accuracy() * 100.0
    );
    println!(
        "{} success rate: {:.2}%",
        if report.targeted { "Targeted" } else { "Untargeted" },
        report.success_rate() * 100.0
    );
    println!("Max perturbation: {:.6}", report.max_perturbation);
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(report) => print_report(&report, cli.json),
        Err(err) => {
            eprintln!("Error: {}", err);
            process::exit(1);
        }
    }
}
