use ndarray::{Array2, ArrayView2, Zip};

use super::{EPSILON, LossFn};

/// Binary cross entropy over probabilities, as produced by a sigmoid output.
#[derive(Debug, Default, Clone, Copy)]
pub struct BinaryCrossEntropy;

impl BinaryCrossEntropy {
    pub fn new() -> Self {
        Self
    }
}

impl LossFn for BinaryCrossEntropy {
    fn loss(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> f32 {
        let total = Zip::from(&y_pred).and(&y).fold(0., |acc, &p, &y| {
            let p = p.clamp(EPSILON, 1. - EPSILON);
            acc - (y * p.ln() + (1. - y) * (1. - p).ln())
        });

        total / y_pred.len().max(1) as f32
    }

    fn loss_prime(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> Array2<f32> {
        let n = y_pred.len().max(1) as f32;

        Zip::from(&y_pred).and(&y).map_collect(|&p, &y| {
            let p = p.clamp(EPSILON, 1. - EPSILON);
            (p - y) / (p * (1. - p)) / n
        })
    }
}
