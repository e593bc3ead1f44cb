use ndarray::prelude::*;
use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::{MlErr, Result};

/// Inverted dropout: while training, each activation is zeroed with probability `rate` and
/// the survivors are scaled by `1 / (1 - rate)`. Inference is the identity.
#[derive(Debug, Clone)]
pub struct Dropout {
    rate: f32,
    rng: StdRng,
    mask: Option<ArrayD<f32>>,
}

impl Dropout {
    /// Creates a new `Dropout` layer.
    ///
    /// # Arguments
    /// * `rate` - The probability of dropping an activation, in `[0, 1)`.
    /// * `seed` - The seed of the layer's own random number generator.
    ///
    /// # Returns
    /// A new `Dropout` instance.
    pub fn new(rate: f32, seed: u64) -> Self {
        Self {
            rate,
            rng: StdRng::seed_from_u64(seed),
            mask: None,
        }
    }

    pub fn rate(&self) -> f32 {
        self.rate
    }

    pub fn forward(&mut self, x: ArrayD<f32>) -> ArrayD<f32> {
        let keep = 1. - self.rate;
        let mask = x.map(|_| {
            if self.rng.random::<f32>() < keep {
                1. / keep
            } else {
                0.
            }
        });

        let y = x * &mask;
        self.mask = Some(mask);
        y
    }

    pub fn backward(&mut self, d: ArrayD<f32>) -> Result<ArrayD<f32>> {
        let mask = self.mask.as_ref().ok_or(MlErr::MissingForward("dropout"))?;
        super::expect_shape("dropout delta", d.shape(), mask.shape())?;
        Ok(d * mask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_about_rate_and_keeps_expectation() {
        let mut dropout = Dropout::new(0.4, 7);
        let y = dropout.forward(ArrayD::ones(vec![100, 100]));

        let dropped = y.iter().filter(|&&v| v == 0.).count() as f32 / y.len() as f32;
        assert!((dropped - 0.4).abs() < 0.03);
        assert!((y.mean().unwrap() - 1.).abs() < 0.05);
    }

    #[test]
    fn backward_reuses_the_forward_mask() {
        let mut dropout = Dropout::new(0.5, 1);
        let y = dropout.forward(ArrayD::ones(vec![4, 8]));
        let dx = dropout.backward(ArrayD::ones(vec![4, 8])).unwrap();
        assert_eq!(y, dx);
    }
}
