//! Square grids of generated images saved as PNG files.

use std::path::Path;

use image::{Rgb, RgbImage};
use ndarray::{ArrayViewD, Axis, Ix4};

use crate::{GanErr, Result, data::rescale_generated};

/// Tiles the first `side * side` images into a single picture, row major.
///
/// # Arguments
/// * `path` - The PNG file to write.
/// * `images` - Generated images in `[-1, 1]`, shaped `(n, channels, height, width)` with 1
///   or 3 channels.
/// * `side` - The amount of tiles per row and column.
///
/// # Returns
/// `ShapeMismatch` if there aren't enough images or they aren't grayscale or RGB.
pub fn save_grid(path: &Path, images: ArrayViewD<f32>, side: usize) -> Result<()> {
    let tiles = side * side;
    let shape = images.shape().to_vec();

    let valid = matches!(shape.as_slice(), &[n, c, _, _] if n >= tiles && (c == 1 || c == 3));
    if !valid || side == 0 {
        return Err(GanErr::ShapeMismatch {
            what: "image grid",
            got: shape,
            expected: vec![tiles, 3, 0, 0],
        });
    }

    let images = rescale_generated(images)
        .into_dimensionality::<Ix4>()
        .map_err(machine_learning::MlErr::from)?;
    let (_, channels, height, width) = images.dim();

    let mut grid = RgbImage::new((width * side) as u32, (height * side) as u32);
    for (i, image) in images.axis_iter(Axis(0)).take(tiles).enumerate() {
        let (x0, y0) = ((i % side) * width, (i / side) * height);

        for y in 0..height {
            for x in 0..width {
                let channel = |c: usize| {
                    let v = image[[c.min(channels - 1), y, x]];
                    (v * 255.).round() as u8
                };

                let pixel = Rgb([channel(0), channel(1), channel(2)]);
                grid.put_pixel((x0 + x) as u32, (y0 + y) as u32, pixel);
            }
        }
    }

    grid.save(path)?;
    log::debug!(path:? = path, side = side; "image grid saved");
    Ok(())
}
