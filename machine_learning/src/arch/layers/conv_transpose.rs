use ndarray::prelude::*;
use rayon::prelude::*;

use super::{ConvGeometry, expect_shape, params_2d, stack_samples};
use crate::{
    MlErr, Result,
    arch::{activations::ActFn, spec::InitSpec},
};

/// A 2D transposed convolution with "same" padding, upsampling each spatial side by `stride`.
///
/// It is the adjoint of a `Conv2d` going from `out_channels` back to `in_channels`, so the
/// parameter slice holds the `(in_channels, out_channels * kernel * kernel)` filter matrix
/// followed by the `out_channels` biases.
#[derive(Debug, Clone)]
pub struct ConvTranspose2d {
    in_channels: usize,
    out_channels: usize,
    kernel: usize,
    stride: usize,
    act_fn: Option<ActFn>,
    init: InitSpec,

    cache: Option<ConvTransposeCache>,
}

#[derive(Debug, Clone)]
struct ConvTransposeCache {
    geometry: ConvGeometry,
    x: Array3<f32>,
    z: Array4<f32>,
}

impl ConvTranspose2d {
    /// Creates a new `ConvTranspose2d` layer.
    ///
    /// # Arguments
    /// * `in_channels` - The amount of channels of the input.
    /// * `out_channels` - The amount of channels of the output.
    /// * `kernel` - The side of each square filter.
    /// * `stride` - The upsampling factor.
    /// * `act_fn` - An optional activation function.
    /// * `init` - How the filters should be initialized.
    ///
    /// # Returns
    /// A new `ConvTranspose2d` instance.
    pub fn new(
        in_channels: usize,
        out_channels: usize,
        kernel: usize,
        stride: usize,
        act_fn: Option<ActFn>,
        init: InitSpec,
    ) -> Self {
        Self {
            in_channels,
            out_channels,
            kernel,
            stride,
            act_fn,
            init,
            cache: None,
        }
    }

    pub fn channels(&self) -> (usize, usize) {
        (self.in_channels, self.out_channels)
    }

    pub fn kernel(&self) -> usize {
        self.kernel
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn act_fn(&self) -> Option<ActFn> {
        self.act_fn
    }

    pub fn init(&self) -> InitSpec {
        self.init
    }

    /// The shape of the filter matrix.
    pub fn weight_dim(&self) -> (usize, usize) {
        (self.in_channels, self.out_channels * self.kernel * self.kernel)
    }

    pub fn size(&self) -> usize {
        let (rows, cols) = self.weight_dim();
        rows * cols + self.out_channels
    }

    /// The output shape of a single sample.
    pub fn output_shape(&self, input: &[usize]) -> Result<Vec<usize>> {
        let g = self.geometry(input)?;
        Ok(vec![self.out_channels, g.height, g.width])
    }

    pub fn forward(&mut self, params: &[f32], x: ArrayD<f32>) -> Result<ArrayD<f32>> {
        let (geometry, x, z) = self.upsample(params, x)?;
        let a = self.activate(&z);

        self.cache = Some(ConvTransposeCache { geometry, x, z });
        Ok(a.into_dyn())
    }

    pub fn predict(&self, params: &[f32], x: ArrayD<f32>) -> Result<ArrayD<f32>> {
        let (_, _, z) = self.upsample(params, x)?;
        Ok(self.activate(&z).into_dyn())
    }

    /// Propagates the delta `d` of this layer's output back to its input, writing the filter
    /// and bias gradients into `grad` when one is given.
    pub fn backward(
        &mut self,
        params: &[f32],
        grad: Option<&mut [f32]>,
        d: ArrayD<f32>,
    ) -> Result<ArrayD<f32>> {
        let cache = self
            .cache
            .as_ref()
            .ok_or(MlErr::MissingForward("conv_transpose2d"))?;

        let mut d = d.into_dimensionality::<Ix4>()?;
        expect_shape("conv_transpose2d delta", d.shape(), cache.z.shape())?;

        if let Some(act_fn) = &self.act_fn {
            d.zip_mut_with(&cache.z, |d, &z| *d *= act_fn.df(z));
        }

        let (filters, _) = params_2d(params, self.weight_dim())?;
        let geometry = cache.geometry;
        let want_grad = grad.is_some();

        // Each sample yields its input delta and, when asked for, its filter gradient.
        let parts: Vec<(Array2<f32>, Option<Array2<f32>>)> = d
            .axis_iter(Axis(0))
            .into_par_iter()
            .zip(cache.x.axis_iter(Axis(0)))
            .map(|(di, xi)| {
                let d_cols = geometry.im2col(di);
                let dx = filters.dot(&d_cols);
                let dw = want_grad.then(|| xi.dot(&d_cols.t()));
                (dx, dw)
            })
            .collect();

        if let Some(grad) = grad {
            let (dw_raw, db_raw) = grad.split_at_mut(self.size() - self.out_channels);
            let mut dw = ArrayViewMut2::from_shape(self.weight_dim(), dw_raw)?;
            let mut db = ArrayViewMut1::from_shape(self.out_channels, db_raw)?;

            dw.fill(0.);
            for part in parts.iter().filter_map(|(_, dw)| dw.as_ref()) {
                dw += part;
            }
            db.assign(&d.sum_axis(Axis(3)).sum_axis(Axis(2)).sum_axis(Axis(0)));
        }

        let (h, w) = (geometry.out_height, geometry.out_width);
        let dx = parts
            .into_iter()
            .map(|(dx, _)| dx.into_shape_with_order((self.in_channels, h, w)))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        stack_samples(&dx)
    }

    fn geometry(&self, input: &[usize]) -> Result<ConvGeometry> {
        let &[c, h, w] = input else {
            return Err(MlErr::ShapeMismatch {
                what: "conv_transpose2d input",
                got: input.to_vec(),
                expected: vec![self.in_channels, 0, 0],
            });
        };

        expect_shape("conv_transpose2d input channels", &[c], &[self.in_channels])?;
        let (s, k) = (self.stride, self.kernel);
        Ok(ConvGeometry::same(self.out_channels, h * s, w * s, k, s))
    }

    fn upsample(
        &self,
        params: &[f32],
        x: ArrayD<f32>,
    ) -> Result<(ConvGeometry, Array3<f32>, Array4<f32>)> {
        let x = x.into_dimensionality::<Ix4>()?;
        let g = self.geometry(&x.shape()[1..])?;
        let (n, c, h, w) = x.dim();
        let x = x.to_shape((n, c, h * w))?.into_owned();

        let (filters, b) = params_2d(params, self.weight_dim())?;
        let b = b.insert_axis(Axis(1)).insert_axis(Axis(2));

        let z: Vec<Array3<f32>> = x
            .axis_iter(Axis(0))
            .into_par_iter()
            .map(|xi| g.col2im(filters.t().dot(&xi).view()) + b)
            .collect();

        let z = stack_samples(&z)?.into_dimensionality::<Ix4>()?;
        Ok((g, x, z))
    }

    fn activate(&self, z: &Array4<f32>) -> Array4<f32> {
        match &self.act_fn {
            Some(act_fn) => z.mapv(|z| act_fn.f(z)),
            None => z.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::layers::Conv2d;

    #[test]
    fn doubles_spatial_sides() {
        let layer = ConvTranspose2d::new(4, 2, 4, 2, None, InitSpec::GlorotUniform);
        assert_eq!(layer.output_shape(&[4, 4, 4]).unwrap(), vec![2, 8, 8]);

        let params = vec![0.01; layer.size()];
        let y = layer.predict(&params, Array4::ones((3, 4, 4, 4)).into_dyn()).unwrap();
        assert_eq!(y.shape(), &[3, 2, 8, 8]);
    }

    #[test]
    fn forward_is_the_input_delta_of_the_matching_conv() {
        // Same filters, seen from both sides.
        let mut conv = Conv2d::new(2, 3, 3, 2, None, InitSpec::GlorotUniform);
        let transpose = ConvTranspose2d::new(3, 2, 3, 2, None, InitSpec::GlorotUniform);
        let filters: Vec<f32> = (0..18 * 3).map(|i| ((i * 7) % 11) as f32 * 0.1 - 0.5).collect();

        let mut conv_params = filters.clone();
        conv_params.extend([0.; 3]);
        let mut transpose_params = filters;
        transpose_params.extend([0.; 2]);

        let x = Array4::<f32>::zeros((1, 2, 6, 6)).into_dyn();
        conv.forward(&conv_params, x).unwrap();

        let d = Array4::from_shape_fn((1, 3, 3, 3), |(_, c, i, j)| (c + i * 2 + j) as f32);
        let dx = conv.backward(&conv_params, None, d.clone().into_dyn()).unwrap();
        let y = transpose.predict(&transpose_params, d.into_dyn()).unwrap();

        assert_eq!(dx, y);
    }

    #[test]
    fn bias_gradient_sums_every_output_position() {
        let mut layer = ConvTranspose2d::new(1, 2, 2, 2, None, InitSpec::GlorotUniform);
        let params = vec![0.5; layer.size()];
        let mut grad = vec![0.; layer.size()];

        layer.forward(&params, Array4::ones((2, 1, 2, 2)).into_dyn()).unwrap();
        let dx = layer
            .backward(&params, Some(&mut grad), Array4::ones((2, 2, 4, 4)).into_dyn())
            .unwrap();

        assert_eq!(dx.shape(), &[2, 1, 2, 2]);
        assert_eq!(&grad[layer.size() - 2..], &[32., 32.]);
        // Every input pixel feeds exactly one 2x2 block per output channel.
        assert!(grad[..8].iter().all(|&g| g == 8.));
    }
}
