//! The batches the adversarial training loop feeds its networks with.

use machine_learning::dataset::Dataset;
use ndarray::{Array2, ArrayD};
use ndarray_rand::{RandomExt, rand_distr::StandardNormal};
use rand::Rng;

use crate::{GanErr, Result, adversarial::ImageGenerator};

/// The label of every real image.
pub fn real_labels(n: usize) -> Array2<f32> {
    Array2::ones((n, 1))
}

/// The label of every generated image.
pub fn fake_labels(n: usize) -> Array2<f32> {
    Array2::zeros((n, 1))
}

/// Draws `n` real images uniformly with replacement, so `n` may exceed the dataset's size.
///
/// # Arguments
/// * `dataset` - The real images.
/// * `n` - The amount of images to draw.
/// * `rng` - Picks the images.
///
/// # Returns
/// The images along with `n` labels set to 1, or `DataLoad` if the dataset is empty.
pub fn real_batch<R: Rng>(
    dataset: &Dataset,
    n: usize,
    rng: &mut R,
) -> Result<(ArrayD<f32>, Array2<f32>)> {
    if dataset.is_empty() {
        return Err(GanErr::data_load("real dataset", "can't sample from an empty dataset"));
    }

    let indices: Vec<usize> = (0..n).map(|_| rng.random_range(0..dataset.len())).collect();
    let (images, _) = dataset.gather(&indices)?;
    Ok((images, real_labels(n)))
}

/// Draws `n` latent vectors of independent standard normal components.
pub fn latent_batch<R: Rng>(latent_dim: usize, n: usize, rng: &mut R) -> Array2<f32> {
    Array2::random_using((n, latent_dim), StandardNormal, rng)
}

/// Generates `n` images from fresh latent vectors, in inference mode.
///
/// # Arguments
/// * `generator` - Produces the images.
/// * `latent_dim` - The length of the latent vectors to draw.
/// * `n` - The amount of images.
/// * `rng` - Draws the latent vectors.
///
/// # Returns
/// The images along with `n` labels set to 0, or `ShapeMismatch` if `latent_dim` isn't the
/// generator's.
pub fn fake_batch<G, R>(
    generator: &G,
    latent_dim: usize,
    n: usize,
    rng: &mut R,
) -> Result<(ArrayD<f32>, Array2<f32>)>
where
    G: ImageGenerator + ?Sized,
    R: Rng,
{
    let latent = latent_batch(latent_dim, n, rng);
    let images = generator.generate(latent)?;
    Ok((images, fake_labels(n)))
}
