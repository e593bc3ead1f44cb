use ndarray::ArrayD;

use crate::{Result, arch::Model};

/// A model seen through a shared borrow of its parameters.
///
/// It can run forward passes and propagate gradients back to its input, but it has no
/// gradient buffer and no optimizer, so its parameters can't change while it's borrowed.
pub struct FrozenModel<'a, M: Model> {
    model: &'a mut M,
    params: &'a [f32],
}

impl<'a, M: Model> FrozenModel<'a, M> {
    /// Creates a new `FrozenModel`.
    ///
    /// # Arguments
    /// * `model` - The model, mutable only for the sake of its forward caches.
    /// * `params` - The model's parameters.
    pub fn new(model: &'a mut M, params: &'a [f32]) -> Self {
        Self { model, params }
    }

    pub fn forward(&mut self, x: ArrayD<f32>) -> Result<ArrayD<f32>> {
        self.model.forward(self.params, x)
    }

    /// The gradient of the loss with respect to the input of the last forward pass.
    pub fn input_gradient(&mut self, d: ArrayD<f32>) -> Result<ArrayD<f32>> {
        self.model.input_gradient(self.params, d)
    }
}
