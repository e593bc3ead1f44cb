use ndarray::prelude::*;

use crate::{MlErr, Result};

/// Row wise softmax over a `(batch, classes)` input.
#[derive(Debug, Clone, Default)]
pub struct Softmax {
    s: Option<Array2<f32>>,
}

impl Softmax {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn forward(&mut self, x: ArrayD<f32>) -> Result<ArrayD<f32>> {
        let s = softmax(x.into_dimensionality::<Ix2>()?);
        self.s = Some(s.clone());
        Ok(s.into_dyn())
    }

    pub fn predict(&self, x: ArrayD<f32>) -> Result<ArrayD<f32>> {
        Ok(softmax(x.into_dimensionality::<Ix2>()?).into_dyn())
    }

    /// The softmax jacobian applied to `d`, `s * (d - sum(d * s))` per row.
    pub fn backward(&mut self, d: ArrayD<f32>) -> Result<ArrayD<f32>> {
        let s = self.s.as_ref().ok_or(MlErr::MissingForward("softmax"))?;
        let d = d.into_dimensionality::<Ix2>()?;
        super::expect_shape("softmax delta", d.shape(), s.shape())?;

        let dot = (&d * s).sum_axis(Axis(1)).insert_axis(Axis(1));
        Ok((s * &(d - &dot)).into_dyn())
    }
}

fn softmax(mut x: Array2<f32>) -> Array2<f32> {
    for mut row in x.rows_mut() {
        let max = row.fold(f32::NEG_INFINITY, |m, &v| m.max(v));
        row.mapv_inplace(|v| (v - max).exp());
        let sum = row.sum();
        row /= sum;
    }
    x
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_sum_to_one() {
        let s = Softmax::new()
            .predict(array![[1_f32, 2., 3.], [1000., 0., -1000.]].into_dyn())
            .unwrap();

        for row in s.rows() {
            assert!((row.sum() - 1.).abs() < 1e-6);
        }
        assert!(s.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn gradient_of_uniform_delta_is_zero() {
        let mut softmax = Softmax::new();
        softmax.forward(array![[0.3_f32, -1., 2.]].into_dyn()).unwrap();
        let dx = softmax.backward(array![[1_f32, 1., 1.]].into_dyn()).unwrap();
        assert!(dx.iter().all(|v| v.abs() < 1e-6));
    }
}
