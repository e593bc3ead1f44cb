use super::{Optimizer, check_sizes};
use crate::Result;

/// The Adam optimizer, with the bias correction folded into the step size.
#[derive(Debug)]
pub struct Adam {
    learning_rate: f32,
    beta1: f32,
    beta2: f32,
    beta1_t: f32,
    beta2_t: f32,
    t: u32,
    m: Box<[f32]>,
    v: Box<[f32]>,
    epsilon: f32,
}

impl Adam {
    /// Creates a new `Adam` optimizer.
    ///
    /// # Arguments
    /// * `len` - The amount of parameters this instance should hold.
    /// * `learning_rate` - The small coefficient that modulates the amount of training per update.
    /// * `beta1`, `beta2` - The decay rates of the first and second moment estimates.
    /// * `epsilon` - Added to the denominator for numerical stability.
    ///
    /// # Returns
    /// A new `Adam` instance.
    pub fn new(len: usize, learning_rate: f32, beta1: f32, beta2: f32, epsilon: f32) -> Self {
        Self {
            learning_rate,
            beta1,
            beta2,
            beta1_t: 1.,
            beta2_t: 1.,
            t: 0,
            m: vec![0.; len].into_boxed_slice(),
            v: vec![0.; len].into_boxed_slice(),
            epsilon,
        }
    }

    /// The amount of updates applied so far.
    pub fn steps(&self) -> u32 {
        self.t
    }
}

impl Optimizer for Adam {
    fn update_params(&mut self, grad: &[f32], params: &mut [f32]) -> Result<()> {
        check_sizes(grad, params)?;
        check_sizes(&self.m, params)?;

        let Self {
            learning_rate: lr,
            beta1: b1,
            beta2: b2,
            epsilon: eps,
            ..
        } = *self;

        self.t += 1;
        self.beta1_t *= b1;
        self.beta2_t *= b2;

        let bc1 = 1. - self.beta1_t;
        let bc2 = 1. - self.beta2_t;
        let step_size = lr * (bc2.sqrt() / bc1);

        params
            .iter_mut()
            .zip(grad)
            .zip(self.m.iter_mut())
            .zip(self.v.iter_mut())
            .for_each(|(((p, g), m), v)| {
                *m = b1 * *m + (1. - b1) * g;
                *v = b2 * *v + (1. - b2) * g.powi(2);
                *p -= step_size * *m / (v.sqrt() + eps);
            });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_step_moves_by_learning_rate() {
        let mut adam = Adam::new(2, 2e-4, 0.5, 0.999, 1e-7);
        let mut params = [1., -1.];

        adam.update_params(&[3., -0.5], &mut params).unwrap();

        assert!((params[0] - (1. - 2e-4)).abs() < 1e-6);
        assert!((params[1] - (-1. + 2e-4)).abs() < 1e-6);
        assert_eq!(adam.steps(), 1);
    }

    #[test]
    fn zero_gradient_keeps_params() {
        let mut adam = Adam::new(3, 1e-3, 0.9, 0.999, 1e-7);
        let mut params = [0.5, 0.25, -2.];

        adam.update_params(&[0.; 3], &mut params).unwrap();
        assert_eq!(params, [0.5, 0.25, -2.]);
    }

    #[test]
    fn rejects_gradients_of_other_models() {
        let mut adam = Adam::new(3, 1e-3, 0.9, 0.999, 1e-7);
        assert!(adam.update_params(&[0.; 2], &mut [0.; 2]).is_err());
    }
}
