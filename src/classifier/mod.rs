//! The image classifier and its use as a consumer of generated images.

mod labeling;
mod model;
mod training;

use machine_learning::metrics::argmax;
use ndarray::ArrayView1;

pub use labeling::{ClassStats, LabeledImage, class_statistics, label_images};
pub use model::Classifier;
pub use training::{ClassifierReport, train_classifier};

use crate::{GanErr, Result};

pub const CLASS_NAMES: [&str; 10] = [
    "Airplane",
    "Automobile",
    "Bird",
    "Cat",
    "Deer",
    "Dog",
    "Frog",
    "Horse",
    "Ship",
    "Truck",
];

/// The name of the most probable class, the first one on ties.
///
/// # Returns
/// The class name, or `ShapeMismatch` if `probabilities` doesn't have one entry per class.
pub fn argmax_label(probabilities: ArrayView1<f32>) -> Result<&'static str> {
    if probabilities.len() != CLASS_NAMES.len() {
        return Err(GanErr::ShapeMismatch {
            what: "class probabilities",
            got: vec![probabilities.len()],
            expected: vec![CLASS_NAMES.len()],
        });
    }

    Ok(CLASS_NAMES[argmax(probabilities)])
}

#[cfg(test)]
mod tests {
    use ndarray::{Array1, array};

    use super::*;

    #[test]
    fn most_probable_class_wins() {
        let mut p = Array1::from_elem(10, 0.05);
        p[6] = 0.55;

        assert_eq!(argmax_label(p.view()).unwrap(), "Frog");
    }

    #[test]
    fn ties_go_to_the_first_class() {
        let p = Array1::from_elem(10, 0.1);
        assert_eq!(argmax_label(p.view()).unwrap(), "Airplane");
    }

    #[test]
    fn wrong_length_is_rejected() {
        let p = array![0.5, 0.5];
        assert!(matches!(argmax_label(p.view()), Err(GanErr::ShapeMismatch { .. })));
    }
}
