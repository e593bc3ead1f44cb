use ndarray::{linalg, prelude::*};

use super::{expect_shape, params_2d};
use crate::{
    MlErr, Result,
    arch::{activations::ActFn, spec::InitSpec},
};

/// A fully connected layer, `a = act_fn(x · w + b)`.
///
/// The parameter slice holds the `(in, out)` weight matrix in row major order followed by the
/// `out` biases.
#[derive(Debug, Clone)]
pub struct Dense {
    dim: (usize, usize),
    act_fn: Option<ActFn>,
    init: InitSpec,

    // Forward metadata
    x: Option<Array2<f32>>,
    z: Array2<f32>,
}

impl Dense {
    /// Creates a new `Dense` layer.
    ///
    /// # Arguments
    /// * `dim` - The amount of input and output features.
    /// * `act_fn` - An optional activation function applied to the affine output.
    /// * `init` - How the weights should be initialized.
    ///
    /// # Returns
    /// A new `Dense` instance.
    pub fn new(dim: (usize, usize), act_fn: Option<ActFn>, init: InitSpec) -> Self {
        Self {
            dim,
            act_fn,
            init,
            x: None,
            z: Array2::zeros((0, 0)),
        }
    }

    pub fn dim(&self) -> (usize, usize) {
        self.dim
    }

    pub fn act_fn(&self) -> Option<ActFn> {
        self.act_fn
    }

    pub fn init(&self) -> InitSpec {
        self.init
    }

    /// Returns the amount of parameters this layer has.
    pub fn size(&self) -> usize {
        (self.dim.0 + 1) * self.dim.1
    }

    pub fn forward(&mut self, params: &[f32], x: ArrayD<f32>) -> Result<ArrayD<f32>> {
        let x = self.check_input(x)?;
        let z = self.affine(params, x.view())?;
        let a = self.activate(&z);

        self.x = Some(x);
        self.z = z;
        Ok(a.into_dyn())
    }

    pub fn predict(&self, params: &[f32], x: ArrayD<f32>) -> Result<ArrayD<f32>> {
        let x = self.check_input(x)?;
        let z = self.affine(params, x.view())?;
        Ok(self.activate(&z).into_dyn())
    }

    /// Propagates the delta `d` of this layer's output back to its input.
    ///
    /// # Arguments
    /// * `params` - This layer's parameters.
    /// * `grad` - Where to write the gradient of this layer's parameters, if wanted.
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
        let x = self.x.as_ref().ok_or(MlErr::MissingForward("dense"))?;
        let mut d = d.into_dimensionality::<Ix2>()?;
        expect_shape("dense delta", d.shape(), self.z.shape())?;

        if let Some(act_fn) = &self.act_fn {
            d.zip_mut_with(&self.z, |d, &z| *d *= act_fn.df(z));
        }

        if let Some(grad) = grad {
            let (mut dw, mut db) = self.view_grad(grad)?;
            linalg::general_mat_mul(1.0, &x.t(), &d, 0.0, &mut dw);
            db.assign(&d.sum_axis(Axis(0)));
        }

        let (w, _) = self.view_params(params)?;
        Ok(d.dot(&w.t()).into_dyn())
    }

    fn check_input(&self, x: ArrayD<f32>) -> Result<Array2<f32>> {
        let x = x.into_dimensionality::<Ix2>()?;
        expect_shape("dense input", &x.shape()[1..], &[self.dim.0])?;
        Ok(x)
    }

    fn affine(&self, params: &[f32], x: ArrayView2<f32>) -> Result<Array2<f32>> {
        let (w, b) = self.view_params(params)?;
        let mut z = Array2::zeros((x.nrows(), self.dim.1));

        linalg::general_mat_mul(1.0, &x, &w, 0.0, &mut z);
        z += &b;
        Ok(z)
    }

    fn activate(&self, z: &Array2<f32>) -> Array2<f32> {
        match &self.act_fn {
            Some(act_fn) => z.mapv(|z| act_fn.f(z)),
            None => z.clone(),
        }
    }

    /// Gives a view of the raw parameter slice as the weights and biases of this layer.
    ///
    /// # Arguments
    /// * `params` - A slice of parameters.
    ///
    /// # Returns
    /// A tuple containing the weights and biases.
    fn view_params<'a>(
        &self,
        params: &'a [f32],
    ) -> Result<(ArrayView2<'a, f32>, ArrayView1<'a, f32>)> {
        let (w, b) = params_2d(params, self.dim)?;
        Ok((w, b))
    }

    /// Gives a view of the raw gradient slice as the delta weights and delta biases of this layer.
    fn view_grad<'a>(
        &self,
        grad: &'a mut [f32],
    ) -> Result<(ArrayViewMut2<'a, f32>, ArrayViewMut1<'a, f32>)> {
        let w_size = self.dim.0 * self.dim.1;
        let (dw, db) = grad.split_at_mut(w_size);
        Ok((
            ArrayViewMut2::from_shape(self.dim, dw)?,
            ArrayViewMut1::from_shape(self.dim.1, db)?,
        ))
    }
}
