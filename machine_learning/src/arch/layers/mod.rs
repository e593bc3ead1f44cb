mod conv;
mod conv_transpose;
mod dense;
mod dropout;
mod geometry;
mod layer;
mod pool;
mod reshape;
mod softmax;

use ndarray::{Array, ArrayD, ArrayView1, ArrayView2, Axis, Dimension, RemoveAxis};

pub use conv::Conv2d;
pub use conv_transpose::ConvTranspose2d;
pub use dense::Dense;
pub use dropout::Dropout;
pub use geometry::ConvGeometry;
pub use layer::Layer;
pub use pool::MaxPool2d;
pub use reshape::{Flatten, Reshape};
pub use softmax::Softmax;

use crate::{MlErr, Result};

/// Fails with a `ShapeMismatch` unless `got` equals `expected`.
pub(crate) fn expect_shape(what: &'static str, got: &[usize], expected: &[usize]) -> Result<()> {
    if got != expected {
        return Err(MlErr::ShapeMismatch {
            what,
            got: got.to_vec(),
            expected: expected.to_vec(),
        });
    }

    Ok(())
}

/// Splits a parametric layer's slice into its weight matrix and the biases that follow it.
fn params_2d(
    params: &[f32],
    dim: (usize, usize),
) -> Result<(ArrayView2<'_, f32>, ArrayView1<'_, f32>)> {
    let w_size = dim.0 * dim.1;
    if params.len() < w_size {
        return Err(MlErr::SizeMismatch {
            what: "layer params",
            got: params.len(),
            expected: w_size,
        });
    }

    let (w, b) = params.split_at(w_size);
    Ok((ArrayView2::from_shape(dim, w)?, ArrayView1::from_shape(b.len(), b)?))
}

/// Stacks per sample results back into a batch.
fn stack_samples<D>(samples: &[Array<f32, D>]) -> Result<ArrayD<f32>>
where
    D: Dimension,
    D::Larger: RemoveAxis,
{
    let views: Vec<_> = samples.iter().map(|s| s.view()).collect();
    Ok(ndarray::stack(Axis(0), &views)?.into_dyn())
}
