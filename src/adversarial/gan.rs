use std::path::Path;

use machine_learning::{arch::ModelBuilder, training::StepStats};
use ndarray::{Array2, ArrayD, ArrayView2};

use super::{AdamSettings, AdversarialPair, Composite, Discriminator, Generator, ImageGenerator};
use crate::{
    GanErr, Result,
    config::GanConfig,
    topology::{discriminator_spec, generator_spec},
};

/// A generator and the discriminator it's trained against.
pub struct Gan {
    generator: Generator,
    discriminator: Discriminator,
}

impl Gan {
    /// Pairs a generator and a discriminator.
    ///
    /// # Returns
    /// A new `Gan`, or `ShapeMismatch` if the discriminator can't take the generated images.
    pub fn new(generator: Generator, discriminator: Discriminator) -> Result<Self> {
        if generator.image_shape() != discriminator.input_shape() {
            return Err(GanErr::ShapeMismatch {
                what: "discriminator input",
                got: generator.image_shape().to_vec(),
                expected: discriminator.input_shape().to_vec(),
            });
        }

        Ok(Self {
            generator,
            discriminator,
        })
    }

    /// Builds freshly initialized reference networks.
    pub fn build(config: &GanConfig) -> Result<Self> {
        let builder = ModelBuilder::new(config.seed);
        let settings = AdamSettings::from(config);

        let (model, params) = builder.build(&generator_spec(config.latent_dim, &config.topology))?;
        let generator = Generator::new(model, params, settings)?;

        let (model, params) = builder.build(&discriminator_spec(&config.topology))?;
        let discriminator = Discriminator::new(model, params, settings)?;

        log::info!(
            generator_params = generator.params().len(),
            discriminator_params = discriminator.params().len();
            "built gan"
        );

        Self::new(generator, discriminator)
    }

    pub fn generator(&self) -> &Generator {
        &self.generator
    }

    pub fn discriminator(&self) -> &Discriminator {
        &self.discriminator
    }

    /// The composite view used to train the generator.
    pub fn composite(&mut self) -> Composite<'_> {
        Composite::new(&mut self.generator, &mut self.discriminator)
    }

    pub fn into_generator(self) -> Generator {
        self.generator
    }
}

impl ImageGenerator for Gan {
    fn latent_dim(&self) -> usize {
        self.generator.latent_dim()
    }

    fn image_shape(&self) -> &[usize] {
        self.generator.image_shape()
    }

    fn generate(&self, latent: Array2<f32>) -> Result<ArrayD<f32>> {
        self.generator.generate(latent)
    }
}

impl AdversarialPair for Gan {
    fn train_discriminator(
        &mut self,
        images: ArrayD<f32>,
        labels: ArrayView2<f32>,
    ) -> Result<StepStats> {
        self.discriminator.train_step(images, labels)
    }

    fn evaluate_discriminator(
        &self,
        images: ArrayD<f32>,
        labels: ArrayView2<f32>,
    ) -> Result<StepStats> {
        self.discriminator.evaluate(images, labels)
    }

    fn train_generator(&mut self, latent: Array2<f32>, labels: ArrayView2<f32>) -> Result<f32> {
        self.composite().train_step(latent, labels)
    }

    fn save_generator(&self, path: &Path, epoch: usize) -> Result<()> {
        self.generator.save(path, epoch)
    }
}
