use ndarray::ArrayD;

use super::{Model, layers::Layer, spec::ModelSpec};
use crate::{MlErr, Result, arch::layers::expect_shape};

/// A sequential model: information flows forward when computing an output and backward when
/// computing the *deltas* of its layers.
///
/// The layers' parameters are laid out one after the other in a single flat buffer.
#[derive(Debug, Clone)]
pub struct Sequential {
    layers: Vec<Layer>,
    input_shape: Vec<usize>,
    output_shape: Vec<usize>,
}

impl Sequential {
    /// Creates a new `Sequential`, checking that every layer accepts its predecessor's output.
    ///
    /// # Arguments
    /// * `input_shape` - The shape of a single input sample.
    /// * `layers` - The layers the sequential is composed of.
    ///
    /// # Returns
    /// A new `Sequential` instance or an error if two consecutive layers don't fit, a layer
    /// is malformed or some intermediate shape is empty.
    pub fn new<I>(input_shape: Vec<usize>, layers: I) -> Result<Self>
    where
        I: IntoIterator<Item = Layer>,
    {
        let layers: Vec<Layer> = layers.into_iter().collect();
        if layers.is_empty() {
            return Err(MlErr::InvalidSpec("a model needs at least one layer".into()));
        }

        check_dims(&input_shape)?;
        let output_shape = layers.iter().try_fold(input_shape.clone(), |shape, layer| {
            layer.validate()?;
            let shape = layer.output_shape(&shape)?;
            check_dims(&shape)?;
            Ok::<_, MlErr>(shape)
        })?;

        Ok(Self {
            layers,
            input_shape,
            output_shape,
        })
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Returns the specification this model can be rebuilt from.
    pub fn spec(&self) -> ModelSpec {
        ModelSpec {
            input_shape: self.input_shape.clone(),
            layers: self.layers.iter().map(Layer::spec).collect(),
        }
    }

    fn check_params(&self, params: &[f32]) -> Result<()> {
        let size = self.size();
        if params.len() != size {
            return Err(MlErr::SizeMismatch {
                what: "model params",
                got: params.len(),
                expected: size,
            });
        }

        Ok(())
    }

    fn check_input(&self, x: &ArrayD<f32>) -> Result<()> {
        expect_shape("model input", x.shape().get(1..).unwrap_or_default(), &self.input_shape)
    }
}

impl Model for Sequential {
    fn size(&self) -> usize {
        self.layers.iter().map(Layer::size).sum()
    }

    fn input_shape(&self) -> &[usize] {
        &self.input_shape
    }

    fn output_shape(&self) -> &[usize] {
        &self.output_shape
    }

    fn forward(&mut self, params: &[f32], mut x: ArrayD<f32>) -> Result<ArrayD<f32>> {
        self.check_params(params)?;
        self.check_input(&x)?;

        let mut rest = params;
        for layer in self.layers.iter_mut() {
            let (layer_params, tail) = rest.split_at(layer.size());
            x = layer.forward(layer_params, x)?;
            rest = tail;
        }

        Ok(x)
    }

    fn predict(&self, params: &[f32], mut x: ArrayD<f32>) -> Result<ArrayD<f32>> {
        self.check_params(params)?;
        self.check_input(&x)?;

        let mut rest = params;
        for layer in self.layers.iter() {
            let (layer_params, tail) = rest.split_at(layer.size());
            x = layer.predict(layer_params, x)?;
            rest = tail;
        }

        Ok(x)
    }

    fn backward(
        &mut self,
        params: &[f32],
        mut grad: Option<&mut [f32]>,
        mut d: ArrayD<f32>,
    ) -> Result<ArrayD<f32>> {
        self.check_params(params)?;
        if let Some(grad) = grad.as_deref() {
            self.check_params(grad)?;
        }

        // Both buffers are consumed from the back, one layer at a time.
        let mut rest = params;
        for layer in self.layers.iter_mut().rev() {
            let (head, layer_params) = rest.split_at(rest.len() - layer.size());
            rest = head;

            let layer_grad = match grad.take() {
                Some(g) => {
                    let split = g.len() - layer_params.len();
                    let (head, tail) = g.split_at_mut(split);
                    grad = Some(head);
                    Some(tail)
                }
                None => None,
            };

            d = layer.backward(layer_params, layer_grad, d)?;
        }

        Ok(d)
    }
}

fn check_dims(shape: &[usize]) -> Result<()> {
    if shape.is_empty() || shape.contains(&0) {
        return Err(MlErr::InvalidSpec(format!(
            "every sample dimension must be non zero, got {shape:?}"
        )));
    }

    Ok(())
}
