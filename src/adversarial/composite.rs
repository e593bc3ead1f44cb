use machine_learning::{arch::Sequential, training::FrozenModel};
use ndarray::{Array2, ArrayView2};

use super::{Discriminator, Generator};
use crate::Result;

/// The generator followed by the discriminator, with the discriminator's parameters frozen.
///
/// The discriminator is held through a shared borrow of its parameters and is only asked for
/// the gradient with respect to its input, so its parameters and optimizer state can't change
/// while the composite exists. Outside of it the discriminator trains normally.
pub struct Composite<'a> {
    generator: &'a mut Generator,
    discriminator: FrozenModel<'a, Sequential>,
}

impl<'a> Composite<'a> {
    pub fn new(generator: &'a mut Generator, discriminator: &'a mut Discriminator) -> Self {
        Self {
            generator,
            discriminator: discriminator.frozen(),
        }
    }

    /// One generator update.
    ///
    /// # Arguments
    /// * `latent` - One latent vector per row.
    /// * `labels` - What the discriminator should say about each generated image, all 1 when
    ///   training the generator to fool it.
    ///
    /// # Returns
    /// The loss measured at the discriminator's output before the update.
    pub fn train_step(&mut self, latent: Array2<f32>, labels: ArrayView2<f32>) -> Result<f32> {
        let stats = self
            .generator
            .train_through(&mut self.discriminator, latent, labels)?;

        Ok(stats.loss)
    }
}
