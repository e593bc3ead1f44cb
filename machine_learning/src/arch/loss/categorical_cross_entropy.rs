use ndarray::{Array2, ArrayView2, Zip};

use super::{EPSILON, LossFn};

/// Categorical cross entropy over one hot labels and softmax probabilities.
#[derive(Debug, Default, Clone, Copy)]
pub struct CategoricalCrossEntropy;

impl CategoricalCrossEntropy {
    pub fn new() -> Self {
        Self
    }
}

impl LossFn for CategoricalCrossEntropy {
    fn loss(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> f32 {
        let total = Zip::from(&y_pred)
            .and(&y)
            .fold(0., |acc, &p, &y| acc - y * p.clamp(EPSILON, 1.).ln());

        total / y_pred.nrows().max(1) as f32
    }

    fn loss_prime(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> Array2<f32> {
        let n = y_pred.nrows().max(1) as f32;

        Zip::from(&y_pred)
            .and(&y)
            .map_collect(|&p, &y| -y / p.clamp(EPSILON, 1.) / n)
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn only_the_true_class_counts() {
        let y_pred = array![[0.25_f32, 0.5, 0.25]];
        let y = array![[0_f32, 1., 0.]];

        let loss = CategoricalCrossEntropy.loss(y_pred.view(), y.view());
        assert!((loss - std::f32::consts::LN_2).abs() < 1e-6);

        let d = CategoricalCrossEntropy.loss_prime(y_pred.view(), y.view());
        assert_eq!(d, array![[0_f32, -2., 0.]]);
    }
}
