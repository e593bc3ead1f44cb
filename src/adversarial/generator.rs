use std::path::Path;

use machine_learning::{
    arch::{Model, Sequential, loss::BinaryCrossEntropy},
    metrics::Metric,
    optimization::Adam,
    training::{FrozenModel, ModelTrainer, StepStats},
};
use ndarray::{Array2, ArrayD, ArrayView2};

use super::{AdamSettings, ImageGenerator};
use crate::{GanErr, Result, checkpoint};

/// Maps latent vectors to images. It's only ever trained stacked under a frozen
/// discriminator, so its optimizer state is the composite model's.
pub struct Generator {
    trainer: ModelTrainer<Sequential, Adam, BinaryCrossEntropy>,
    latent_dim: usize,
}

impl Generator {
    /// Creates a new `Generator`.
    ///
    /// # Arguments
    /// * `model` - A model taking flat latent vectors.
    /// * `params` - The model's parameters.
    /// * `settings` - The composite model's optimizer hyperparameters.
    ///
    /// # Returns
    /// A new `Generator`, or `ShapeMismatch` if the model's input isn't a flat vector.
    pub fn new(model: Sequential, params: Vec<f32>, settings: AdamSettings) -> Result<Self> {
        let &[latent_dim] = model.input_shape() else {
            return Err(GanErr::ShapeMismatch {
                what: "generator input",
                got: model.input_shape().to_vec(),
                expected: vec![0],
            });
        };

        let optimizer = settings.optimizer(model.size());
        let trainer = ModelTrainer::new(
            model,
            params,
            optimizer,
            BinaryCrossEntropy::new(),
            Metric::BinaryAccuracy,
        )?;

        Ok(Self {
            trainer,
            latent_dim,
        })
    }

    /// Reads a generator checkpoint, with fresh optimizer state.
    pub fn load(path: &Path, settings: AdamSettings) -> Result<Self> {
        let (model, params) = checkpoint::load_model(path, None)?;
        Self::new(model, params, settings)
    }

    pub fn save(&self, path: &Path, epoch: usize) -> Result<()> {
        let metadata = [("role", "generator".to_string()), ("epoch", (epoch + 1).to_string())];
        checkpoint::save_model(path, self.trainer.model(), self.params(), &metadata)
    }

    pub fn params(&self) -> &[f32] {
        self.trainer.params()
    }

    /// The amount of updates applied so far.
    pub fn steps(&self) -> usize {
        self.trainer.steps()
    }

    pub(super) fn train_through(
        &mut self,
        head: &mut FrozenModel<'_, Sequential>,
        latent: Array2<f32>,
        labels: ArrayView2<f32>,
    ) -> Result<StepStats> {
        self.check_latent(&latent)?;
        Ok(self.trainer.train_step_through(head, latent.into_dyn(), labels)?)
    }

    fn check_latent(&self, latent: &Array2<f32>) -> Result<()> {
        if latent.ncols() != self.latent_dim {
            return Err(GanErr::ShapeMismatch {
                what: "latent batch",
                got: latent.shape().to_vec(),
                expected: vec![latent.nrows(), self.latent_dim],
            });
        }

        Ok(())
    }
}

impl ImageGenerator for Generator {
    fn latent_dim(&self) -> usize {
        self.latent_dim
    }

    fn image_shape(&self) -> &[usize] {
        self.trainer.model().output_shape()
    }

    fn generate(&self, latent: Array2<f32>) -> Result<ArrayD<f32>> {
        self.check_latent(&latent)?;
        Ok(self.trainer.predict(latent.into_dyn())?)
    }
}
