use ndarray::{Array1, ArrayD, Axis, Zip};

use super::{CLASS_NAMES, Classifier, argmax_label};
use crate::Result;

/// A generated image's predicted class.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledImage {
    pub label: &'static str,
    pub probabilities: Array1<f32>,
}

/// The spread of the probability vectors of every image predicted as `label`.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassStats {
    pub label: &'static str,
    pub count: usize,
    pub min: Array1<f32>,
    pub mean: Array1<f32>,
    pub max: Array1<f32>,
}

/// Classifies a batch of images.
///
/// # Arguments
/// * `classifier` - The trained classifier.
/// * `images` - Images in `[0, 1]`, already rescaled from the generator's range.
///
/// # Returns
/// One labeled image per input image, in order.
pub fn label_images(classifier: &Classifier, images: ArrayD<f32>) -> Result<Vec<LabeledImage>> {
    let probabilities = classifier.classify_batch(images)?;

    probabilities
        .axis_iter(Axis(0))
        .map(|row| {
            Ok(LabeledImage {
                label: argmax_label(row)?,
                probabilities: row.to_owned(),
            })
        })
        .collect()
}

/// Aggregates the probability vectors per predicted class, skipping classes nothing was
/// predicted as.
pub fn class_statistics(labeled: &[LabeledImage]) -> Vec<ClassStats> {
    CLASS_NAMES
        .iter()
        .filter_map(|&label| {
            let mut members = labeled.iter().filter(|l| l.label == label);
            let first = members.next()?;

            let mut stats = ClassStats {
                label,
                count: 1,
                min: first.probabilities.clone(),
                mean: first.probabilities.clone(),
                max: first.probabilities.clone(),
            };

            for member in members {
                Zip::from(&mut stats.min)
                    .and(&mut stats.max)
                    .and(&member.probabilities)
                    .for_each(|min, max, &p| {
                        *min = (*min).min(p);
                        *max = (*max).max(p);
                    });
                stats.mean += &member.probabilities;
                stats.count += 1;
            }

            stats.mean /= stats.count as f32;
            Some(stats)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    fn labeled(label: &'static str, probabilities: Array1<f32>) -> LabeledImage {
        LabeledImage {
            label,
            probabilities,
        }
    }

    #[test]
    fn statistics_group_by_predicted_class() {
        let images = [
            labeled("Cat", array![0.2, 0.8]),
            labeled("Dog", array![0.6, 0.4]),
            labeled("Cat", array![0.4, 0.6]),
        ];

        let stats = class_statistics(&images);

        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].label, "Cat");
        assert_eq!(stats[0].count, 2);
        assert_eq!(stats[0].min, array![0.2, 0.6]);
        assert_eq!(stats[0].max, array![0.4, 0.8]);
        assert!((stats[0].mean[0] - 0.3).abs() < 1e-6);
        assert_eq!(stats[1].label, "Dog");
        assert_eq!(stats[1].count, 1);
    }

    #[test]
    fn no_images_no_statistics() {
        assert!(class_statistics(&[]).is_empty());
    }
}
