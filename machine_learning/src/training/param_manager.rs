use crate::{Result, optimization::Optimizer};

/// Owns a model's flat parameter buffer along with the gradient buffer of the same length.
#[derive(Debug, Clone)]
pub struct ParamManager {
    params: Vec<f32>,
    grad: Vec<f32>,
}

impl ParamManager {
    /// Creates a new `ParamManager` with a zeroed gradient.
    ///
    /// # Arguments
    /// * `params` - The model's parameters.
    ///
    /// # Returns
    /// A new `ParamManager` instance.
    pub fn new(params: Vec<f32>) -> Self {
        let grad = vec![0.; params.len()];
        Self { params, grad }
    }

    pub fn params(&self) -> &[f32] {
        &self.params
    }

    pub fn grad(&self) -> &[f32] {
        &self.grad
    }

    /// Borrows the parameters for a backward pass along with the gradient to write into.
    pub fn split_mut(&mut self) -> (&[f32], &mut [f32]) {
        (&self.params, &mut self.grad)
    }

    /// Resets the gradient, called before every backward pass.
    pub fn zero_grad(&mut self) {
        self.grad.fill(0.);
    }

    /// Applies the current gradient to the parameters.
    ///
    /// # Arguments
    /// * `optimizer` - The optimization algorithm, sized for these parameters.
    ///
    /// # Returns
    /// An error if the optimizer was built for another amount of parameters.
    pub fn optimize<O: Optimizer>(&mut self, optimizer: &mut O) -> Result<()> {
        optimizer.update_params(&self.grad, &mut self.params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::GradientDescentWithMomentum;

    #[test]
    fn optimize_applies_the_written_gradient() {
        let mut manager = ParamManager::new(vec![1., 1.]);

        let (_, grad) = manager.split_mut();
        grad.copy_from_slice(&[1., -1.]);
        manager
            .optimize(&mut GradientDescentWithMomentum::new(2, 0.5, 0.))
            .unwrap();
        assert_eq!(manager.params(), &[0.5, 1.5]);

        manager.zero_grad();
        assert_eq!(manager.grad(), &[0., 0.]);
    }
}
