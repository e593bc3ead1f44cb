//! Run configurations, read from JSON files. Every field has a default matching the reference
//! run, so an empty object is a valid config.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{GanErr, Result};

/// Reads a JSON config file.
///
/// # Arguments
/// * `path` - The config file.
///
/// # Returns
/// The parsed config, `DataLoad` if the file can't be read or `InvalidConfig` if it isn't a
/// valid config.
pub fn load<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path).map_err(|e| GanErr::data_load(path.display(), e))?;
    serde_json::from_str(&text).map_err(|e| GanErr::InvalidConfig(format!("{}: {e}", path.display())))
}

/// The shape of the generator and discriminator networks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GanTopology {
    /// Channels, height and width of the generated images.
    pub image_shape: (usize, usize, usize),
    /// Channels of every transposed convolution of the generator.
    pub generator_filters: usize,
    /// Channels of the feature map the latent vector is projected to.
    pub generator_base_channels: usize,
    /// Channels of the discriminator's convolutions, the first one keeps the resolution and
    /// every other one halves it.
    pub discriminator_filters: Vec<usize>,
    pub dropout: f32,
    pub leaky_alpha: f32,
}

impl Default for GanTopology {
    fn default() -> Self {
        Self {
            image_shape: (3, 32, 32),
            generator_filters: 128,
            generator_base_channels: 256,
            discriminator_filters: vec![64, 128, 128, 256],
            dropout: 0.4,
            leaky_alpha: 0.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GanConfig {
    pub dataset_dir: PathBuf,
    pub output_dir: PathBuf,
    pub latent_dim: usize,
    pub epochs: usize,
    pub batch_size: usize,
    /// A progress record is emitted every this many batches.
    pub report_every: usize,
    /// The discriminator is evaluated and the generator checkpointed every this many epochs.
    pub eval_every: usize,
    pub eval_samples: usize,
    pub grid_side: usize,
    pub learning_rate: f32,
    pub beta1: f32,
    pub beta2: f32,
    pub epsilon: f32,
    pub seed: Option<u64>,
    pub topology: GanTopology,
}

impl Default for GanConfig {
    fn default() -> Self {
        Self {
            dataset_dir: PathBuf::from("cifar-10-batches-bin"),
            output_dir: PathBuf::from("gan_output"),
            latent_dim: 100,
            epochs: 200,
            batch_size: 128,
            report_every: 50,
            eval_every: 10,
            eval_samples: 150,
            grid_side: 7,
            learning_rate: 2e-4,
            beta1: 0.5,
            beta2: 0.999,
            epsilon: 1e-7,
            seed: None,
            topology: GanTopology::default(),
        }
    }
}

impl GanConfig {
    /// Checks every field before any training starts.
    pub fn validate(&self) -> Result<()> {
        nonzero("latent_dim", self.latent_dim)?;
        nonzero("epochs", self.epochs)?;
        nonzero("report_every", self.report_every)?;
        nonzero("eval_every", self.eval_every)?;
        nonzero("eval_samples", self.eval_samples)?;
        nonzero("grid_side", self.grid_side)?;
        positive("learning_rate", self.learning_rate)?;
        positive("epsilon", self.epsilon)?;
        unit_interval("beta1", self.beta1)?;
        unit_interval("beta2", self.beta2)?;

        if self.batch_size < 2 {
            return Err(invalid(format!(
                "batch_size must be at least 2 to split it in halves, got {}",
                self.batch_size
            )));
        }

        if self.grid_side * self.grid_side > self.eval_samples {
            return Err(invalid(format!(
                "a {0}x{0} grid needs more than {1} eval_samples",
                self.grid_side, self.eval_samples
            )));
        }

        self.topology.validate()
    }
}

impl GanTopology {
    pub fn validate(&self) -> Result<()> {
        let (c, h, w) = self.image_shape;
        if c != 1 && c != 3 {
            return Err(invalid(format!("images must have 1 or 3 channels, got {c}")));
        }

        // The generator upsamples three times by 2.
        if h == 0 || w == 0 || h % 8 != 0 || w % 8 != 0 {
            return Err(invalid(format!(
                "image height and width must be non zero multiples of 8, got {h}x{w}"
            )));
        }

        nonzero("generator_filters", self.generator_filters)?;
        nonzero("generator_base_channels", self.generator_base_channels)?;
        if self.discriminator_filters.is_empty() || self.discriminator_filters.contains(&0) {
            return Err(invalid("discriminator_filters must be non empty and non zero".into()));
        }

        if !(0. ..1.).contains(&self.dropout) {
            return Err(invalid(format!("dropout must be in [0, 1), got {}", self.dropout)));
        }

        positive("leaky_alpha", self.leaky_alpha)
    }
}

/// The shape of the VGG style image classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierTopology {
    pub image_shape: (usize, usize, usize),
    /// Channels of each block of two convolutions, every block ends halving the resolution.
    pub block_filters: Vec<usize>,
    pub dense_units: usize,
    pub classes: usize,
}

impl Default for ClassifierTopology {
    fn default() -> Self {
        Self {
            image_shape: (3, 32, 32),
            block_filters: vec![32, 64, 128],
            dense_units: 128,
            classes: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub dataset_dir: PathBuf,
    pub output_dir: PathBuf,
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f32,
    pub momentum: f32,
    pub seed: Option<u64>,
    pub topology: ClassifierTopology,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            dataset_dir: PathBuf::from("cifar-10-batches-bin"),
            output_dir: PathBuf::from("classifier_output"),
            epochs: 50,
            batch_size: 64,
            learning_rate: 1e-3,
            momentum: 0.9,
            seed: None,
            topology: ClassifierTopology::default(),
        }
    }
}

impl ClassifierConfig {
    pub fn validate(&self) -> Result<()> {
        nonzero("epochs", self.epochs)?;
        nonzero("batch_size", self.batch_size)?;
        positive("learning_rate", self.learning_rate)?;
        if !(0. ..1.).contains(&self.momentum) {
            return Err(invalid(format!("momentum must be in [0, 1), got {}", self.momentum)));
        }

        let topology = &self.topology;
        let (c, h, w) = topology.image_shape;
        nonzero("image channels", c)?;
        nonzero("classes", topology.classes)?;
        nonzero("dense_units", topology.dense_units)?;
        if topology.block_filters.is_empty() || topology.block_filters.contains(&0) {
            return Err(invalid("block_filters must be non empty and non zero".into()));
        }

        let min_side = 1 << topology.block_filters.len();
        if h < min_side || w < min_side {
            return Err(invalid(format!(
                "{h}x{w} images are too small for {} pooling blocks",
                topology.block_filters.len()
            )));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelConfig {
    pub generator: PathBuf,
    pub classifier: PathBuf,
    pub n_images: usize,
    pub grid_side: usize,
    pub output_dir: PathBuf,
    pub seed: Option<u64>,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            generator: PathBuf::from("gan_output/generator_model_200.safetensors"),
            classifier: PathBuf::from("classifier_output/classifier_model.safetensors"),
            n_images: 100,
            grid_side: 10,
            output_dir: PathBuf::from("label_output"),
            seed: None,
        }
    }
}

impl LabelConfig {
    pub fn validate(&self) -> Result<()> {
        nonzero("n_images", self.n_images)?;
        nonzero("grid_side", self.grid_side)?;
        if self.grid_side * self.grid_side > self.n_images {
            return Err(invalid(format!(
                "a {0}x{0} grid needs more than {1} images",
                self.grid_side, self.n_images
            )));
        }

        Ok(())
    }
}

fn invalid(msg: String) -> GanErr {
    GanErr::InvalidConfig(msg)
}

fn nonzero(field: &str, value: usize) -> Result<()> {
    if value == 0 {
        return Err(invalid(format!("{field} must be greater than zero")));
    }

    Ok(())
}

fn positive(field: &str, value: f32) -> Result<()> {
    if !(value.is_finite() && value > 0.) {
        return Err(invalid(format!("{field} must be a positive number, got {value}")));
    }

    Ok(())
}

fn unit_interval(field: &str, value: f32) -> Result<()> {
    if !(0. ..1.).contains(&value) {
        return Err(invalid(format!("{field} must be in [0, 1), got {value}")));
    }

    Ok(())
}
