use machine_learning::{
    arch::{Model, Sequential, loss::BinaryCrossEntropy},
    metrics::Metric,
    optimization::Adam,
    training::{FrozenModel, ModelTrainer, StepStats},
};
use ndarray::{ArrayD, ArrayView2};

use super::AdamSettings;
use crate::{GanErr, Result};

/// Tells real images (label 1) from generated ones (label 0).
pub struct Discriminator {
    trainer: ModelTrainer<Sequential, Adam, BinaryCrossEntropy>,
}

impl Discriminator {
    /// Creates a new `Discriminator`.
    ///
    /// # Arguments
    /// * `model` - A model with a single output unit.
    /// * `params` - The model's parameters.
    /// * `settings` - The optimizer hyperparameters.
    ///
    /// # Returns
    /// A new `Discriminator`, or `ShapeMismatch` if the model has more than one output.
    pub fn new(model: Sequential, params: Vec<f32>, settings: AdamSettings) -> Result<Self> {
        if model.output_shape() != [1] {
            return Err(GanErr::ShapeMismatch {
                what: "discriminator output",
                got: model.output_shape().to_vec(),
                expected: vec![1],
            });
        }

        let optimizer = settings.optimizer(model.size());
        let trainer = ModelTrainer::new(
            model,
            params,
            optimizer,
            BinaryCrossEntropy::new(),
            Metric::BinaryAccuracy,
        )?;

        Ok(Self { trainer })
    }

    pub fn input_shape(&self) -> &[usize] {
        self.trainer.model().input_shape()
    }

    pub fn params(&self) -> &[f32] {
        self.trainer.params()
    }

    /// The amount of updates applied so far.
    pub fn steps(&self) -> usize {
        self.trainer.steps()
    }

    pub fn train_step(&mut self, images: ArrayD<f32>, labels: ArrayView2<f32>) -> Result<StepStats> {
        Ok(self.trainer.train_step(images, labels)?)
    }

    pub fn evaluate(&self, images: ArrayD<f32>, labels: ArrayView2<f32>) -> Result<StepStats> {
        Ok(self.trainer.evaluate(images, labels)?)
    }

    pub(super) fn frozen(&mut self) -> FrozenModel<'_, Sequential> {
        self.trainer.frozen()
    }
}
