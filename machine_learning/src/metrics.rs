use ndarray::{ArrayView1, ArrayView2, Axis, Zip};
use serde::{Deserialize, Serialize};

/// A score of a prediction against the expected output that doesn't take part in training.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Fraction of single output predictions on the right side of 0.5.
    BinaryAccuracy,
    /// Fraction of rows whose arg max matches the one hot label.
    CategoricalAccuracy,
}

impl Metric {
    /// Scores a batch of predictions.
    ///
    /// # Arguments
    /// * `y_pred` - The model's output.
    /// * `y` - The expected output.
    ///
    /// # Returns
    /// The metric's value in `[0, 1]`, or 0 for an empty batch.
    pub fn score(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> f32 {
        if y_pred.is_empty() {
            return 0.;
        }

        match self {
            Metric::BinaryAccuracy => {
                let hits = Zip::from(&y_pred)
                    .and(&y)
                    .fold(0, |acc, &p, &y| acc + ((p > 0.5) == (y > 0.5)) as usize);

                hits as f32 / y_pred.len() as f32
            }
            Metric::CategoricalAccuracy => {
                let hits = y_pred
                    .axis_iter(Axis(0))
                    .zip(y.axis_iter(Axis(0)))
                    .filter(|(p, y)| argmax(*p) == argmax(*y))
                    .count();

                hits as f32 / y_pred.nrows() as f32
            }
        }
    }
}

/// Returns the index of the greatest value, the first one on ties.
pub fn argmax(row: ArrayView1<f32>) -> usize {
    row.indexed_iter()
        .fold((0, f32::NEG_INFINITY), |best, (i, &v)| {
            if v > best.1 { (i, v) } else { best }
        })
        .0
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn binary_accuracy_thresholds_at_half() {
        let y_pred = array![[0.9_f32], [0.2], [0.6], [0.4]];
        let y = array![[1_f32], [0.], [0.], [0.]];

        assert_eq!(Metric::BinaryAccuracy.score(y_pred.view(), y.view()), 0.75);
    }

    #[test]
    fn categorical_accuracy_compares_argmax() {
        let y_pred = array![[0.1_f32, 0.7, 0.2], [0.5, 0.3, 0.2]];
        let y = array![[0_f32, 1., 0.], [0., 0., 1.]];

        assert_eq!(Metric::CategoricalAccuracy.score(y_pred.view(), y.view()), 0.5);
    }

    #[test]
    fn argmax_prefers_first_on_ties() {
        assert_eq!(argmax(array![1_f32, 3., 3.].view()), 1);
    }
}
