use ndarray::prelude::*;

use super::expect_shape;
use crate::{MlErr, Result};

/// Flattens every sample of a batch into a row.
#[derive(Debug, Clone, Default)]
pub struct Flatten {
    input_shape: Option<Vec<usize>>,
}

impl Flatten {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn output_shape(&self, input: &[usize]) -> Vec<usize> {
        vec![input.iter().product()]
    }

    pub fn forward(&mut self, x: ArrayD<f32>) -> Result<ArrayD<f32>> {
        self.input_shape = Some(x.shape().to_vec());
        self.predict(x)
    }

    pub fn predict(&self, x: ArrayD<f32>) -> Result<ArrayD<f32>> {
        let n = x.shape().first().copied().unwrap_or_default();
        let features = x.shape().iter().skip(1).product();
        reshape(x, vec![n, features])
    }

    pub fn backward(&mut self, d: ArrayD<f32>) -> Result<ArrayD<f32>> {
        let shape = self
            .input_shape
            .clone()
            .ok_or(MlErr::MissingForward("flatten"))?;

        reshape(d, shape)
    }
}

/// Reshapes every row of a batch into a `(channels, height, width)` sample.
#[derive(Debug, Clone)]
pub struct Reshape {
    shape: (usize, usize, usize),
}

impl Reshape {
    pub fn new(shape: (usize, usize, usize)) -> Self {
        Self { shape }
    }

    pub fn shape(&self) -> (usize, usize, usize) {
        self.shape
    }

    pub fn output_shape(&self, input: &[usize]) -> Result<Vec<usize>> {
        let (c, h, w) = self.shape;
        expect_shape("reshape input", &[input.iter().product()], &[c * h * w])?;
        Ok(vec![c, h, w])
    }

    pub fn predict(&self, x: ArrayD<f32>) -> Result<ArrayD<f32>> {
        let (c, h, w) = self.shape;
        let n = x.shape().first().copied().unwrap_or_default();
        expect_shape("reshape input", &x.shape()[1..], &[c * h * w])?;
        reshape(x, vec![n, c, h, w])
    }

    pub fn backward(&self, d: ArrayD<f32>) -> Result<ArrayD<f32>> {
        let n = d.shape().first().copied().unwrap_or_default();
        let features = d.shape().iter().skip(1).product();
        reshape(d, vec![n, features])
    }
}

fn reshape(x: ArrayD<f32>, shape: Vec<usize>) -> Result<ArrayD<f32>> {
    Ok(x.to_shape(shape)?.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flatten_restores_shape_on_backward() {
        let mut flatten = Flatten::new();
        let x = ArrayD::from_shape_fn(vec![2, 3, 2, 2], |ix| ix[3] as f32);

        let y = flatten.forward(x.clone()).unwrap();
        assert_eq!(y.shape(), &[2, 12]);

        let dx = flatten.backward(y).unwrap();
        assert_eq!(dx, x);
    }

    #[test]
    fn reshape_checks_feature_count() {
        let reshape = Reshape::new((4, 2, 2));
        assert_eq!(reshape.output_shape(&[16]).unwrap(), vec![4, 2, 2]);
        assert!(reshape.output_shape(&[15]).is_err());

        let y = reshape.predict(ArrayD::zeros(vec![3, 16])).unwrap();
        assert_eq!(y.shape(), &[3, 4, 2, 2]);
    }
}
