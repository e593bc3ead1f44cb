use ndarray::{Array2, Array3, ArrayView2, ArrayView3};

/// The spatial bookkeeping of a square-kernel convolution with "same" padding.
///
/// `channels`, `height` and `width` describe the convolution's input, `out_height` and
/// `out_width` its output. A transposed convolution reuses the geometry of the forward
/// convolution it is the adjoint of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvGeometry {
    pub channels: usize,
    pub height: usize,
    pub width: usize,
    pub kernel: usize,
    pub stride: usize,
    pub pad_top: usize,
    pub pad_left: usize,
    pub out_height: usize,
    pub out_width: usize,
}

impl ConvGeometry {
    /// Creates the geometry of a "same" padded convolution, where the output is
    /// `ceil(input / stride)` and the padding is split evenly with the extra row and column
    /// going to the bottom and right.
    ///
    /// # Arguments
    /// * `channels` - The amount of input channels.
    /// * `height` - The input height.
    /// * `width` - The input width.
    /// * `kernel` - The side of the square kernel.
    /// * `stride` - The step between two consecutive kernel applications.
    ///
    /// # Returns
    /// A new `ConvGeometry` instance.
    pub fn same(channels: usize, height: usize, width: usize, kernel: usize, stride: usize) -> Self {
        let out_height = height.div_ceil(stride);
        let out_width = width.div_ceil(stride);
        let pad_h = ((out_height - 1) * stride + kernel).saturating_sub(height);
        let pad_w = ((out_width - 1) * stride + kernel).saturating_sub(width);

        Self {
            channels,
            height,
            width,
            kernel,
            stride,
            pad_top: pad_h / 2,
            pad_left: pad_w / 2,
            out_height,
            out_width,
        }
    }

    /// The length of a flattened receptive field.
    pub fn patch_len(&self) -> usize {
        self.channels * self.kernel * self.kernel
    }

    /// The amount of output positions.
    pub fn out_len(&self) -> usize {
        self.out_height * self.out_width
    }

    /// Unfolds the receptive fields of `x` into the columns of a matrix.
    ///
    /// # Arguments
    /// * `x` - A single sample of shape `(channels, height, width)`.
    ///
    /// # Returns
    /// A matrix of shape `(patch_len, out_len)`, padded positions are zero.
    pub fn im2col(&self, x: ArrayView3<f32>) -> Array2<f32> {
        let mut cols = Array2::zeros((self.patch_len(), self.out_len()));

        self.for_each_tap(|row, col, (c, i, j)| cols[[row, col]] = x[[c, i, j]]);
        cols
    }

    /// Folds columns back into an image, summing every contribution of overlapping fields.
    /// This is the adjoint of `im2col`.
    ///
    /// # Arguments
    /// * `cols` - A matrix of shape `(patch_len, out_len)`.
    ///
    /// # Returns
    /// A single sample of shape `(channels, height, width)`.
    pub fn col2im(&self, cols: ArrayView2<f32>) -> Array3<f32> {
        let mut x = Array3::zeros((self.channels, self.height, self.width));

        self.for_each_tap(|row, col, (c, i, j)| x[[c, i, j]] += cols[[row, col]]);
        x
    }

    /// Visits every (column row, column index, input position) triple that falls inside
    /// the unpadded input.
    fn for_each_tap<F>(&self, mut f: F)
    where
        F: FnMut(usize, usize, (usize, usize, usize)),
    {
        let k = self.kernel;

        for c in 0..self.channels {
            for ki in 0..k {
                for kj in 0..k {
                    let row = (c * k + ki) * k + kj;

                    for oh in 0..self.out_height {
                        let Some(i) = (oh * self.stride + ki).checked_sub(self.pad_top) else {
                            continue;
                        };
                        if i >= self.height {
                            continue;
                        }

                        for ow in 0..self.out_width {
                            let Some(j) = (ow * self.stride + kj).checked_sub(self.pad_left)
                            else {
                                continue;
                            };
                            if j >= self.width {
                                continue;
                            }

                            f(row, oh * self.out_width + ow, (c, i, j));
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use ndarray::Array3;

    use super::*;

    #[test]
    fn same_padding_matches_reference_shapes() {
        let g = ConvGeometry::same(3, 32, 32, 3, 1);
        assert_eq!((g.out_height, g.out_width), (32, 32));
        assert_eq!((g.pad_top, g.pad_left), (1, 1));

        let g = ConvGeometry::same(64, 32, 32, 3, 2);
        assert_eq!((g.out_height, g.out_width), (16, 16));
        assert_eq!((g.pad_top, g.pad_left), (0, 0));

        let g = ConvGeometry::same(128, 8, 8, 4, 2);
        assert_eq!((g.out_height, g.out_width), (4, 4));
        assert_eq!((g.pad_top, g.pad_left), (1, 1));
    }

    #[test]
    fn one_by_one_kernel_im2col_is_a_reshape() {
        let x = Array3::from_shape_fn((2, 2, 3), |(c, i, j)| (c * 6 + i * 3 + j) as f32);
        let g = ConvGeometry::same(2, 2, 3, 1, 1);

        let cols = g.im2col(x.view());
        assert_eq!(cols.dim(), (2, 6));
        assert_eq!(cols.row(0).to_vec(), vec![0., 1., 2., 3., 4., 5.]);
        assert_eq!(cols.row(1).to_vec(), vec![6., 7., 8., 9., 10., 11.]);

        assert_eq!(g.col2im(cols.view()), x);
    }

    #[test]
    fn im2col_pads_borders_with_zeros() {
        let x = Array3::ones((1, 2, 2));
        let g = ConvGeometry::same(1, 2, 2, 3, 1);
        let cols = g.im2col(x.view());

        // Every 3x3 window over a 2x2 image sees the whole image.
        assert_eq!(cols.dim(), (9, 4));
        for col in cols.columns() {
            assert_eq!(col.sum(), 4.);
        }
    }

    #[test]
    fn col2im_is_the_adjoint_of_im2col() {
        let g = ConvGeometry::same(2, 5, 5, 3, 2);
        let x = Array3::from_shape_fn((2, 5, 5), |(c, i, j)| ((c + 2 * i + 3 * j) % 7) as f32);
        let y = Array2::from_shape_fn((g.patch_len(), g.out_len()), |(r, c)| {
            ((r * 5 + c) % 11) as f32 - 5.
        });

        // <im2col(x), y> == <x, col2im(y)>
        let lhs = (&g.im2col(x.view()) * &y).sum();
        let rhs = (&x * &g.col2im(y.view())).sum();
        assert_eq!(lhs, rhs);
    }
}
