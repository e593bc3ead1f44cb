use ndarray::{Array2, ArrayD, Axis};
use rand::{Rng, seq::SliceRandom};

use crate::{MlErr, Result};

/// An in memory dataset: a batch of samples along the first axis of `x` and, for labeled
/// datasets, one row of `y` per sample.
#[derive(Debug, Clone)]
pub struct Dataset {
    x: ArrayD<f32>,
    y: Array2<f32>,
}

impl Dataset {
    /// Creates a new labeled `Dataset`.
    ///
    /// # Arguments
    /// * `x` - The samples, the first axis being the sample one.
    /// * `y` - The expected output of every sample.
    ///
    /// # Returns
    /// A new `Dataset` or an error if the amount of samples and labels differ.
    pub fn new(x: ArrayD<f32>, y: Array2<f32>) -> Result<Self> {
        if x.ndim() < 2 {
            return Err(MlErr::ShapeMismatch {
                what: "dataset samples",
                got: x.shape().to_vec(),
                expected: vec![0, 0],
            });
        }

        if x.len_of(Axis(0)) != y.nrows() {
            return Err(MlErr::SizeMismatch {
                what: "dataset labels",
                got: y.nrows(),
                expected: x.len_of(Axis(0)),
            });
        }

        Ok(Self { x, y })
    }

    /// Creates a new `Dataset` without labels.
    pub fn unlabeled(x: ArrayD<f32>) -> Result<Self> {
        let n = x.shape().first().copied().unwrap_or_default();
        Self::new(x, Array2::zeros((n, 0)))
    }

    pub fn len(&self) -> usize {
        self.y.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_labeled(&self) -> bool {
        self.y.ncols() > 0
    }

    /// The shape of a single sample.
    pub fn sample_shape(&self) -> &[usize] {
        &self.x.shape()[1..]
    }

    pub fn x(&self) -> &ArrayD<f32> {
        &self.x
    }

    pub fn y(&self) -> &Array2<f32> {
        &self.y
    }

    /// Copies the given samples, in the given order, into a new batch. Indices may repeat.
    ///
    /// # Arguments
    /// * `indices` - The indices of the samples to copy.
    ///
    /// # Returns
    /// The samples and their labels, or an error if an index is out of bounds.
    pub fn gather(&self, indices: &[usize]) -> Result<(ArrayD<f32>, Array2<f32>)> {
        if let Some(&i) = indices.iter().find(|&&i| i >= self.len()) {
            return Err(MlErr::SizeMismatch {
                what: "dataset index",
                got: i,
                expected: self.len(),
            });
        }

        Ok((self.x.select(Axis(0), indices), self.y.select(Axis(0), indices)))
    }

    /// Splits a random permutation of the dataset into batches of `batch_size` indices, the
    /// last one holding the remainder.
    pub fn shuffled_batches<R: Rng>(&self, batch_size: usize, rng: &mut R) -> Vec<Vec<usize>> {
        let mut indices: Vec<usize> = (0..self.len()).collect();
        indices.shuffle(rng);

        indices
            .chunks(batch_size.max(1))
            .map(<[usize]>::to_vec)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    fn dataset() -> Dataset {
        let x = ArrayD::from_shape_fn(vec![5, 2, 2], |ix| ix[0] as f32);
        let y = Array2::from_shape_fn((5, 1), |(i, _)| i as f32);
        Dataset::new(x, y).unwrap()
    }

    #[test]
    fn gather_keeps_order_and_repeats() {
        let (x, y) = dataset().gather(&[3, 3, 0]).unwrap();

        assert_eq!(x.shape(), &[3, 2, 2]);
        assert_eq!(y.column(0).to_vec(), vec![3., 3., 0.]);
        assert!(x.index_axis(Axis(0), 1).iter().all(|&v| v == 3.));
    }

    #[test]
    fn gather_out_of_bounds_fails() {
        assert!(dataset().gather(&[5]).is_err());
    }

    #[test]
    fn batches_cover_every_index_once() {
        let mut rng = StdRng::seed_from_u64(0);
        let batches = dataset().shuffled_batches(2, &mut rng);

        assert_eq!(batches.iter().map(Vec::len).collect::<Vec<_>>(), vec![2, 2, 1]);

        let mut all: Vec<usize> = batches.into_iter().flatten().collect();
        all.sort();
        assert_eq!(all, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn label_count_must_match() {
        let err = Dataset::new(ArrayD::zeros(vec![3, 2]), Array2::zeros((2, 1)));
        assert!(err.is_err());

        let unlabeled = Dataset::unlabeled(ArrayD::zeros(vec![3, 2])).unwrap();
        assert_eq!(unlabeled.len(), 3);
        assert!(!unlabeled.is_labeled());
    }
}
