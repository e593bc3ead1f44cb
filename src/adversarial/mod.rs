//! The generator, the discriminator and the composite view that trains the former through
//! the latter.

mod composite;
mod discriminator;
mod gan;
mod generator;

use std::path::Path;

use machine_learning::{optimization::Adam, training::StepStats};
use ndarray::{Array2, ArrayD, ArrayView2};

pub use composite::Composite;
pub use discriminator::Discriminator;
pub use gan::Gan;
pub use generator::Generator;

use crate::{Result, config::GanConfig};

/// The optimizer hyperparameters shared by both networks, each network keeps its own state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdamSettings {
    pub learning_rate: f32,
    pub beta1: f32,
    pub beta2: f32,
    pub epsilon: f32,
}

impl AdamSettings {
    pub fn optimizer(&self, len: usize) -> Adam {
        Adam::new(len, self.learning_rate, self.beta1, self.beta2, self.epsilon)
    }
}

impl Default for AdamSettings {
    fn default() -> Self {
        Self::from(&GanConfig::default())
    }
}

impl From<&GanConfig> for AdamSettings {
    fn from(config: &GanConfig) -> Self {
        Self {
            learning_rate: config.learning_rate,
            beta1: config.beta1,
            beta2: config.beta2,
            epsilon: config.epsilon,
        }
    }
}

/// Anything that turns latent vectors into images.
pub trait ImageGenerator {
    fn latent_dim(&self) -> usize;

    /// The `(channels, height, width)` shape of a generated image.
    fn image_shape(&self) -> &[usize];

    /// Runs the generator in inference mode.
    ///
    /// # Arguments
    /// * `latent` - One latent vector per row.
    ///
    /// # Returns
    /// One image per latent vector, or `ShapeMismatch` if the vectors have the wrong length.
    fn generate(&self, latent: Array2<f32>) -> Result<ArrayD<f32>>;
}

/// The operations the training loop needs from a generator and discriminator pair.
pub trait AdversarialPair: ImageGenerator {
    /// One discriminator update on a labeled batch of images.
    fn train_discriminator(
        &mut self,
        images: ArrayD<f32>,
        labels: ArrayView2<f32>,
    ) -> Result<StepStats>;

    /// Scores the discriminator on a labeled batch of images without updating it.
    fn evaluate_discriminator(
        &self,
        images: ArrayD<f32>,
        labels: ArrayView2<f32>,
    ) -> Result<StepStats>;

    /// One generator update through the frozen discriminator.
    ///
    /// # Returns
    /// The composite loss measured before the update.
    fn train_generator(&mut self, latent: Array2<f32>, labels: ArrayView2<f32>) -> Result<f32>;

    /// Persists the generator as it is after `epoch` (0 based).
    fn save_generator(&self, path: &Path, epoch: usize) -> Result<()>;
}
