use std::path::Path;

use machine_learning::arch::{Model, Sequential};
use ndarray::{Array1, Array2, ArrayD, ArrayView3, Axis, Ix2};

use super::CLASS_NAMES;
use crate::{GanErr, Result, checkpoint};

/// A trained classifier, only ever used for inference.
pub struct Classifier {
    model: Sequential,
    params: Vec<f32>,
}

impl Classifier {
    /// Creates a new `Classifier`.
    ///
    /// # Returns
    /// A new `Classifier`, or an error if the model doesn't output one probability per class
    /// or `params` doesn't fit it.
    pub fn new(model: Sequential, params: Vec<f32>) -> Result<Self> {
        if model.output_shape() != [CLASS_NAMES.len()] {
            return Err(GanErr::ShapeMismatch {
                what: "classifier output",
                got: model.output_shape().to_vec(),
                expected: vec![CLASS_NAMES.len()],
            });
        }

        if model.size() != params.len() {
            return Err(machine_learning::MlErr::SizeMismatch {
                what: "classifier params",
                got: params.len(),
                expected: model.size(),
            }
            .into());
        }

        Ok(Self { model, params })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let (model, params) = checkpoint::load_model(path, None)?;
        Self::new(model, params)
    }

    /// The shape of a single image.
    pub fn input_shape(&self) -> &[usize] {
        self.model.input_shape()
    }

    /// The probability of every class for a single image in `[0, 1]`.
    pub fn classify(&self, image: ArrayView3<f32>) -> Result<Array1<f32>> {
        let batch = image.insert_axis(Axis(0)).to_owned().into_dyn();
        let probabilities = self.classify_batch(batch)?;
        Ok(probabilities.row(0).to_owned())
    }

    /// The probability of every class for a batch of images in `[0, 1]`, one row per image.
    pub fn classify_batch(&self, images: ArrayD<f32>) -> Result<Array2<f32>> {
        let probabilities = self.model.predict(&self.params, images)?;
        Ok(probabilities
            .into_dimensionality::<Ix2>()
            .map_err(machine_learning::MlErr::from)?)
    }
}
