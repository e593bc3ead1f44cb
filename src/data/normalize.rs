//! The two pixel scalings in use. GAN images live in `[-1, 1]` to match the generator's `tanh`
//! output, classifier images live in `[0, 1]`.

use ndarray::{Array2, ArrayD, ArrayView4, ArrayViewD};

use super::{CLASSES, RawImages};
use crate::{GanErr, Result};
use machine_learning::dataset::Dataset;

/// Maps `[0, 255]` to `[-1, 1]`.
pub fn gan_normalize(pixels: ArrayView4<u8>) -> ArrayD<f32> {
    pixels.mapv(|p| (p as f32 - 127.5) / 127.5).into_dyn()
}

/// Maps `[0, 255]` to `[0, 1]`.
pub fn scale_unit(pixels: ArrayView4<u8>) -> ArrayD<f32> {
    pixels.mapv(|p| p as f32 / 255.).into_dyn()
}

/// Maps generator output from `[-1, 1]` to `[0, 1]`.
pub fn rescale_generated(images: ArrayViewD<f32>) -> ArrayD<f32> {
    images.mapv(|x| ((x + 1.) / 2.).clamp(0., 1.))
}

/// Fails with `DataLoad` on a label outside `0..classes`.
pub fn one_hot(labels: &[u8], classes: usize) -> Result<Array2<f32>> {
    let mut y = Array2::zeros((labels.len(), classes));
    for (i, &label) in labels.iter().enumerate() {
        let label = label as usize;
        if label >= classes {
            return Err(GanErr::data_load(
                format!("label {i}"),
                format!("class {label} out of range for {classes} classes"),
            ));
        }

        y[[i, label]] = 1.;
    }

    Ok(y)
}

/// The unlabeled real images the discriminator learns from.
pub fn to_gan_dataset(images: &RawImages) -> Result<Dataset> {
    Ok(Dataset::unlabeled(gan_normalize(images.pixels.view()))?)
}

/// The one hot labeled images the classifier learns from.
pub fn to_classifier_dataset(images: &RawImages) -> Result<Dataset> {
    let y = one_hot(&images.labels, CLASSES)?;
    Ok(Dataset::new(scale_unit(images.pixels.view()), y)?)
}
