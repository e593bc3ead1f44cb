use ndarray::ArrayD;

use super::{Conv2d, ConvTranspose2d, Dense, Dropout, Flatten, MaxPool2d, Reshape, Softmax};
use crate::{
    MlErr, Result,
    arch::{
        activations::ActFn,
        spec::{InitSpec, LayerSpec},
    },
};

/// A layer of a `Sequential` model.
///
/// Layers don't own their parameters, every call receives the slice of the model's flat
/// parameter buffer that belongs to the layer.
#[derive(Debug, Clone)]
pub enum Layer {
    Dense(Dense),
    Conv2d(Conv2d),
    ConvTranspose2d(ConvTranspose2d),
    MaxPool2d(MaxPool2d),
    Flatten(Flatten),
    Reshape(Reshape),
    Dropout(Dropout),
    Softmax(Softmax),
}
use Layer::*;

impl Layer {
    pub fn dense(dim: (usize, usize), act_fn: Option<ActFn>, init: InitSpec) -> Self {
        Dense(super::Dense::new(dim, act_fn, init))
    }

    pub fn flatten() -> Self {
        Flatten(super::Flatten::new())
    }

    pub fn softmax() -> Self {
        Softmax(super::Softmax::new())
    }

    /// Creates a layer from its specification.
    ///
    /// # Arguments
    /// * `spec` - The layer's specification.
    /// * `seed` - Seeds the layer's own randomness, only used by dropout.
    ///
    /// # Returns
    /// A new `Layer`.
    pub fn from_spec(spec: LayerSpec, seed: u64) -> Self {
        match spec {
            LayerSpec::Dense { dim, act_fn, init } => Self::dense(dim, act_fn, init),
            LayerSpec::Conv2d {
                in_channels,
                out_channels,
                kernel,
                stride,
                act_fn,
                init,
            } => Conv2d(super::Conv2d::new(
                in_channels,
                out_channels,
                kernel,
                stride,
                act_fn,
                init,
            )),
            LayerSpec::ConvTranspose2d {
                in_channels,
                out_channels,
                kernel,
                stride,
                act_fn,
                init,
            } => ConvTranspose2d(super::ConvTranspose2d::new(
                in_channels,
                out_channels,
                kernel,
                stride,
                act_fn,
                init,
            )),
            LayerSpec::MaxPool2d { size } => MaxPool2d(super::MaxPool2d::new(size)),
            LayerSpec::Flatten => Self::flatten(),
            LayerSpec::Reshape { shape } => Reshape(super::Reshape::new(shape)),
            LayerSpec::Dropout { rate } => Dropout(super::Dropout::new(rate, seed)),
            LayerSpec::Softmax => Self::softmax(),
        }
    }

    /// Returns the specification this layer can be rebuilt from.
    pub fn spec(&self) -> LayerSpec {
        match self {
            Dense(l) => LayerSpec::Dense {
                dim: l.dim(),
                act_fn: l.act_fn(),
                init: l.init(),
            },
            Conv2d(l) => LayerSpec::Conv2d {
                in_channels: l.channels().0,
                out_channels: l.channels().1,
                kernel: l.kernel(),
                stride: l.stride(),
                act_fn: l.act_fn(),
                init: l.init(),
            },
            ConvTranspose2d(l) => LayerSpec::ConvTranspose2d {
                in_channels: l.channels().0,
                out_channels: l.channels().1,
                kernel: l.kernel(),
                stride: l.stride(),
                act_fn: l.act_fn(),
                init: l.init(),
            },
            MaxPool2d(l) => LayerSpec::MaxPool2d { size: l.size() },
            Flatten(_) => LayerSpec::Flatten,
            Reshape(l) => LayerSpec::Reshape { shape: l.shape() },
            Dropout(l) => LayerSpec::Dropout { rate: l.rate() },
            Softmax(_) => LayerSpec::Softmax,
        }
    }

    /// Returns the amount of parameters this layer has.
    pub fn size(&self) -> usize {
        match self {
            Dense(l) => l.size(),
            Conv2d(l) => l.size(),
            ConvTranspose2d(l) => l.size(),
            _ => 0,
        }
    }

    /// The shapes of this layer's weight and bias tensors, if it has any parameters.
    pub fn param_shapes(&self) -> Option<(Vec<usize>, Vec<usize>)> {
        let (w, b) = match self {
            Dense(l) => (l.dim(), l.dim().1),
            Conv2d(l) => (l.weight_dim(), l.channels().1),
            ConvTranspose2d(l) => (l.weight_dim(), l.channels().1),
            _ => return None,
        };

        Some((vec![w.0, w.1], vec![b]))
    }

    /// The fan in and fan out used to scale this layer's weight initialization.
    pub fn fans(&self) -> Option<(usize, usize)> {
        match self {
            Dense(l) => Some(l.dim()),
            Conv2d(l) => {
                let (i, o) = l.channels();
                let area = l.kernel() * l.kernel();
                Some((i * area, o * area))
            }
            ConvTranspose2d(l) => {
                let (i, o) = l.channels();
                let area = l.kernel() * l.kernel();
                Some((o * area, i * area))
            }
            _ => None,
        }
    }

    /// The weight initialization of a parametric layer.
    pub fn init(&self) -> Option<InitSpec> {
        match self {
            Dense(l) => Some(l.init()),
            Conv2d(l) => Some(l.init()),
            ConvTranspose2d(l) => Some(l.init()),
            _ => None,
        }
    }

    /// Checks the hyperparameters that would otherwise break the layer's arithmetic.
    ///
    /// # Returns
    /// `InvalidSpec` for a zero kernel, stride or pooling size, or a dropout rate outside
    /// `[0, 1)`.
    pub fn validate(&self) -> Result<()> {
        let nonzero = |what: &str, value: usize| {
            if value == 0 {
                return Err(MlErr::InvalidSpec(format!("{what} must be greater than zero")));
            }

            Ok(())
        };

        match self {
            Conv2d(l) => {
                nonzero("conv2d kernel", l.kernel())?;
                nonzero("conv2d stride", l.stride())
            }
            ConvTranspose2d(l) => {
                nonzero("conv_transpose2d kernel", l.kernel())?;
                nonzero("conv_transpose2d stride", l.stride())
            }
            MaxPool2d(l) => nonzero("max_pool2d size", l.size()),
            Dropout(l) if !(0. ..1.).contains(&l.rate()) => Err(MlErr::InvalidSpec(format!(
                "dropout rate must be in [0, 1), got {}",
                l.rate()
            ))),
            _ => Ok(()),
        }
    }

    /// Computes the shape of a single output sample given the shape of a single input sample.
    ///
    /// # Arguments
    /// * `input` - The input shape, without the batch axis.
    ///
    /// # Returns
    /// The output shape or an error if the input doesn't fit this layer.
    pub fn output_shape(&self, input: &[usize]) -> Result<Vec<usize>> {
        match self {
            Dense(l) => {
                super::expect_shape("dense input", input, &[l.dim().0])?;
                Ok(vec![l.dim().1])
            }
            Conv2d(l) => l.output_shape(input),
            ConvTranspose2d(l) => l.output_shape(input),
            MaxPool2d(l) => l.output_shape(input),
            Flatten(l) => Ok(l.output_shape(input)),
            Reshape(l) => l.output_shape(input),
            Softmax(_) => {
                super::expect_shape("softmax input rank", &[input.len()], &[1])?;
                Ok(input.to_vec())
            }
            Dropout(_) => Ok(input.to_vec()),
        }
    }

    /// Makes a training forward pass, caching whatever the backward pass needs.
    pub fn forward(&mut self, params: &[f32], x: ArrayD<f32>) -> Result<ArrayD<f32>> {
        match self {
            Dense(l) => l.forward(params, x),
            Conv2d(l) => l.forward(params, x),
            ConvTranspose2d(l) => l.forward(params, x),
            MaxPool2d(l) => l.forward(x),
            Flatten(l) => l.forward(x),
            Reshape(l) => l.predict(x),
            Dropout(l) => Ok(l.forward(x)),
            Softmax(l) => l.forward(x),
        }
    }

    /// Makes an inference forward pass, nothing is cached and dropout is disabled.
    pub fn predict(&self, params: &[f32], x: ArrayD<f32>) -> Result<ArrayD<f32>> {
        match self {
            Dense(l) => l.predict(params, x),
            Conv2d(l) => l.predict(params, x),
            ConvTranspose2d(l) => l.predict(params, x),
            MaxPool2d(l) => l.predict(x),
            Flatten(l) => l.predict(x),
            Reshape(l) => l.predict(x),
            Dropout(_) => Ok(x),
            Softmax(l) => l.predict(x),
        }
    }

    /// Makes a backward pass through the layer.
    ///
    /// # Arguments
    /// * `params` - This layer's parameters.
    /// * `grad` - Where to write this layer's parameter gradient, `None` to only propagate.
    /// * `d` - The gradient of the loss with respect to this layer's output.
    ///
    /// # Returns
    /// The gradient of the loss with respect to this layer's input.
    pub fn backward(
        &mut self,
        params: &[f32],
        grad: Option<&mut [f32]>,
        d: ArrayD<f32>,
    ) -> Result<ArrayD<f32>> {
        match self {
            Dense(l) => l.backward(params, grad, d),
            Conv2d(l) => l.backward(params, grad, d),
            ConvTranspose2d(l) => l.backward(params, grad, d),
            MaxPool2d(l) => l.backward(d),
            Flatten(l) => l.backward(d),
            Reshape(l) => l.backward(d),
            Dropout(l) => l.backward(d),
            Softmax(l) => l.backward(d),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_roundtrips_through_layers() {
        let specs = [
            LayerSpec::Conv2d {
                in_channels: 3,
                out_channels: 8,
                kernel: 3,
                stride: 2,
                act_fn: Some(ActFn::leaky_relu(0.2)),
                init: InitSpec::HeUniform,
            },
            LayerSpec::MaxPool2d { size: 2 },
            LayerSpec::Flatten,
            LayerSpec::Dropout { rate: 0.4 },
            LayerSpec::Reshape { shape: (2, 2, 2) },
            LayerSpec::Softmax,
        ];

        for spec in specs {
            assert_eq!(Layer::from_spec(spec, 0).spec(), spec);
        }
    }

    #[test]
    fn transposed_convolution_fans_are_swapped() {
        let spec = LayerSpec::ConvTranspose2d {
            in_channels: 256,
            out_channels: 128,
            kernel: 4,
            stride: 2,
            act_fn: None,
            init: InitSpec::GlorotUniform,
        };

        let layer = Layer::from_spec(spec, 0);
        assert_eq!(layer.fans(), Some((128 * 16, 256 * 16)));
        assert_eq!(layer.size(), 256 * 128 * 16 + 128);
    }
}
