use ndarray::ArrayD;

use crate::Result;

/// A differentiable function of an input and a flat parameter buffer that the model doesn't
/// own.
pub trait Model {
    /// Returns the amount of parameters in the model.
    fn size(&self) -> usize;

    /// The shape of a single input sample.
    fn input_shape(&self) -> &[usize];

    /// The shape of a single output sample.
    fn output_shape(&self) -> &[usize];

    /// Makes a training forward pass, keeping whatever the next `backward` call needs.
    ///
    /// # Arguments
    /// * `params` - The model's parameters.
    /// * `x` - A batch of inputs, the first axis being the batch one.
    ///
    /// # Returns
    /// The model's output or an error if the input doesn't fit the model.
    fn forward(&mut self, params: &[f32], x: ArrayD<f32>) -> Result<ArrayD<f32>>;

    /// Makes an inference forward pass, stochastic layers are disabled and nothing is kept.
    fn predict(&self, params: &[f32], x: ArrayD<f32>) -> Result<ArrayD<f32>>;

    /// Backpropagates the gradient of the loss through the last forward pass.
    ///
    /// # Arguments
    /// * `params` - The model's parameters, as given to `forward`.
    /// * `grad` - Where to write the gradient with respect to the parameters, or `None` to
    ///   only propagate the gradient to the input.
    /// * `d` - The gradient of the loss with respect to the model's output.
    ///
    /// # Returns
    /// The gradient of the loss with respect to the model's input.
    fn backward(
        &mut self,
        params: &[f32],
        grad: Option<&mut [f32]>,
        d: ArrayD<f32>,
    ) -> Result<ArrayD<f32>>;

    /// Backpropagates to the model's input only, its parameter gradient is never computed.
    fn input_gradient(&mut self, params: &[f32], d: ArrayD<f32>) -> Result<ArrayD<f32>> {
        self.backward(params, None, d)
    }
}
