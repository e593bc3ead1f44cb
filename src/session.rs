//! The three runs the binary offers, each owning everything it works with. Models are loaded
//! from the explicit paths in their configs, nothing is shared between runs.

use std::{fs, path::PathBuf};

use machine_learning::dataset::Dataset;
use rand::{SeedableRng, rngs::StdRng};

use crate::{
    GanErr, Result,
    adversarial::{AdamSettings, Gan, Generator, ImageGenerator},
    classifier::{
        ClassStats, Classifier, ClassifierReport, LabeledImage, class_statistics, label_images,
        train_classifier,
    },
    config::{ClassifierConfig, GanConfig, LabelConfig},
    data::{Split, load_split, rescale_generated, to_classifier_dataset, to_gan_dataset},
    plot::save_grid,
    sampling::latent_batch,
    training::{GanTrainer, History},
};

const LABELED_GRID: &str = "generated_grid.png";

fn rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

/// An adversarial training run.
pub struct GanSession {
    config: GanConfig,
    gan: Gan,
    dataset: Dataset,
}

impl GanSession {
    /// Loads the training split and builds fresh networks.
    pub fn new(config: GanConfig) -> Result<Self> {
        config.validate()?;
        let images = load_split(&config.dataset_dir, Split::Train)?;
        let dataset = to_gan_dataset(&images)?;
        Self::build(config, dataset)
    }

    /// Builds fresh networks to train on an already normalized dataset.
    pub fn with_dataset(config: GanConfig, dataset: Dataset) -> Result<Self> {
        config.validate()?;
        Self::build(config, dataset)
    }

    /// Expects an already validated `config`.
    fn build(config: GanConfig, dataset: Dataset) -> Result<Self> {
        let gan = Gan::build(&config)?;

        if dataset.sample_shape() != gan.image_shape() {
            return Err(GanErr::ShapeMismatch {
                what: "dataset images",
                got: dataset.sample_shape().to_vec(),
                expected: gan.image_shape().to_vec(),
            });
        }

        Ok(Self {
            config,
            gan,
            dataset,
        })
    }

    /// Trains until the configured amount of epochs.
    ///
    /// # Returns
    /// The run's history and the trained generator.
    pub fn run(mut self) -> Result<(History, Generator)> {
        let mut trainer = GanTrainer::new(&self.config, rng(self.config.seed))?;
        let history = trainer.train(&mut self.gan, &self.dataset)?;
        Ok((history, self.gan.into_generator()))
    }
}

/// A classifier training run.
pub struct ClassifierSession {
    config: ClassifierConfig,
    train: Dataset,
    test: Dataset,
}

impl ClassifierSession {
    /// Loads both splits of the dataset.
    pub fn new(config: ClassifierConfig) -> Result<Self> {
        config.validate()?;
        let train = to_classifier_dataset(&load_split(&config.dataset_dir, Split::Train)?)?;
        let test = to_classifier_dataset(&load_split(&config.dataset_dir, Split::Test)?)?;

        Ok(Self::with_datasets(config, train, test))
    }

    pub fn with_datasets(config: ClassifierConfig, train: Dataset, test: Dataset) -> Self {
        Self {
            config,
            train,
            test,
        }
    }

    pub fn run(self) -> Result<ClassifierReport> {
        let mut rng = rng(self.config.seed);
        train_classifier(&self.config, &self.train, &self.test, &mut rng)
    }
}

/// What a labeling run produced.
#[derive(Debug, Clone)]
pub struct LabelingReport {
    pub images: Vec<LabeledImage>,
    pub stats: Vec<ClassStats>,
    pub grid: PathBuf,
}

/// Labels freshly generated images with a trained classifier.
pub struct LabelingSession {
    config: LabelConfig,
    generator: Generator,
    classifier: Classifier,
    rng: StdRng,
}

impl LabelingSession {
    /// Loads both models from the paths in `config`.
    pub fn new(config: LabelConfig) -> Result<Self> {
        config.validate()?;
        let generator = Generator::load(&config.generator, AdamSettings::default())?;
        let classifier = Classifier::load(&config.classifier)?;
        Self::pair(config, generator, classifier)
    }

    /// Pairs already loaded models.
    ///
    /// # Returns
    /// A new `LabelingSession`, or `ShapeMismatch` if the classifier can't take the generated
    /// images.
    pub fn from_parts(
        config: LabelConfig,
        generator: Generator,
        classifier: Classifier,
    ) -> Result<Self> {
        config.validate()?;
        Self::pair(config, generator, classifier)
    }

    fn pair(config: LabelConfig, generator: Generator, classifier: Classifier) -> Result<Self> {
        if generator.image_shape() != classifier.input_shape() {
            return Err(GanErr::ShapeMismatch {
                what: "classifier input",
                got: generator.image_shape().to_vec(),
                expected: classifier.input_shape().to_vec(),
            });
        }

        let rng = rng(config.seed);
        Ok(Self {
            config,
            generator,
            classifier,
            rng,
        })
    }

    /// Generates `n_images`, saves a grid of them and labels every one.
    pub fn run(&mut self) -> Result<LabelingReport> {
        fs::create_dir_all(&self.config.output_dir)?;

        let latent = latent_batch(self.generator.latent_dim(), self.config.n_images, &mut self.rng);
        let images = self.generator.generate(latent)?;

        let grid = self.config.output_dir.join(LABELED_GRID);
        save_grid(&grid, images.view(), self.config.grid_side)?;

        let images = label_images(&self.classifier, rescale_generated(images.view()))?;
        for (i, image) in images.iter().enumerate() {
            log::info!(
                image = i,
                label = image.label,
                probabilities:? = image.probabilities.as_slice();
                "labeled"
            );
        }

        let stats = class_statistics(&images);
        for class in &stats {
            log::info!(
                label = class.label,
                count = class.count,
                min:? = class.min.as_slice(),
                mean:? = class.mean.as_slice(),
                max:? = class.max.as_slice();
                "class statistics"
            );
        }

        Ok(LabelingReport {
            images,
            stats,
            grid,
        })
    }
}
