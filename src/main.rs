use std::path::{Path, PathBuf};

use anyhow::Context;
use cifar_gan::{
    config::{self, ClassifierConfig, GanConfig, LabelConfig},
    session::{ClassifierSession, GanSession, LabelingSession},
};
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;

#[derive(Parser)]
#[command(author, version, about = "Trains a GAN on CIFAR-10 and labels what it generates")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Train the generator and discriminator
    TrainGan {
        /// JSON config, every missing field takes its default
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        dataset_dir: Option<PathBuf>,
        #[arg(long)]
        output_dir: Option<PathBuf>,
        #[arg(long)]
        epochs: Option<usize>,
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Train the image classifier
    TrainClassifier {
        /// JSON config, every missing field takes its default
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        dataset_dir: Option<PathBuf>,
        #[arg(long)]
        output_dir: Option<PathBuf>,
        #[arg(long)]
        epochs: Option<usize>,
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Generate images and label them with the classifier
    Label {
        /// JSON config, every missing field takes its default
        #[arg(long)]
        config: Option<PathBuf>,
        /// Generator checkpoint
        #[arg(long)]
        generator: Option<PathBuf>,
        /// Classifier checkpoint
        #[arg(long)]
        classifier: Option<PathBuf>,
        #[arg(long)]
        output_dir: Option<PathBuf>,
        #[arg(long)]
        n_images: Option<usize>,
        /// Side of the saved image grid
        #[arg(long)]
        grid_side: Option<usize>,
        #[arg(long)]
        seed: Option<u64>,
    },
}

fn read_config<T: DeserializeOwned + Default>(path: Option<&Path>) -> anyhow::Result<T> {
    match path {
        Some(path) => config::load(path).with_context(|| format!("reading {}", path.display())),
        None => Ok(T::default()),
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    match Cli::parse().command {
        Command::TrainGan {
            config,
            dataset_dir,
            output_dir,
            epochs,
            seed,
        } => {
            let mut config: GanConfig = read_config(config.as_deref())?;
            config.dataset_dir = dataset_dir.unwrap_or(config.dataset_dir);
            config.output_dir = output_dir.unwrap_or(config.output_dir);
            config.epochs = epochs.unwrap_or(config.epochs);
            config.seed = seed.or(config.seed);

            let (history, _) = GanSession::new(config)?.run()?;
            match history.last_checkpoint() {
                Some(path) => log::info!(path:? = path; "last generator checkpoint"),
                None => log::warn!("no generator checkpoint was written"),
            }
        }
        Command::TrainClassifier {
            config,
            dataset_dir,
            output_dir,
            epochs,
            seed,
        } => {
            let mut config: ClassifierConfig = read_config(config.as_deref())?;
            config.dataset_dir = dataset_dir.unwrap_or(config.dataset_dir);
            config.output_dir = output_dir.unwrap_or(config.output_dir);
            config.epochs = epochs.unwrap_or(config.epochs);
            config.seed = seed.or(config.seed);

            let report = ClassifierSession::new(config)?.run()?;
            println!(
                "test accuracy: {:.3}% ({})",
                report.test.accuracy * 100.,
                report.checkpoint.display()
            );
        }
        Command::Label {
            config,
            generator,
            classifier,
            output_dir,
            n_images,
            grid_side,
            seed,
        } => {
            let mut config: LabelConfig = read_config(config.as_deref())?;
            config.generator = generator.unwrap_or(config.generator);
            config.classifier = classifier.unwrap_or(config.classifier);
            config.output_dir = output_dir.unwrap_or(config.output_dir);
            config.n_images = n_images.unwrap_or(config.n_images);
            config.grid_side = grid_side.unwrap_or(config.grid_side);
            config.seed = seed.or(config.seed);

            let report = LabelingSession::new(config)?.run()?;
            for (i, image) in report.images.iter().enumerate() {
                println!("{i:>4}: {}", image.label);
            }

            for class in &report.stats {
                println!("{:<10} {:>4} images", class.label, class.count);
            }

            println!("grid: {}", report.grid.display());
        }
    }

    Ok(())
}
