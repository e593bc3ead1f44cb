use ndarray::{ShapeError, prelude::*};
use rayon::prelude::*;

use super::{ConvGeometry, expect_shape, params_2d, stack_samples};
use crate::{
    MlErr, Result,
    arch::{activations::ActFn, spec::InitSpec},
};

/// A 2D convolution over `(batch, channels, height, width)` inputs with "same" padding.
///
/// The parameter slice holds the `(out_channels, in_channels * kernel * kernel)` filter
/// matrix followed by the `out_channels` biases. Samples of a batch are convolved in
/// parallel.
#[derive(Debug, Clone)]
pub struct Conv2d {
    in_channels: usize,
    out_channels: usize,
    kernel: usize,
    stride: usize,
    act_fn: Option<ActFn>,
    init: InitSpec,

    cache: Option<ConvCache>,
}

#[derive(Debug, Clone)]
struct ConvCache {
    geometry: ConvGeometry,
    cols: Vec<Array2<f32>>,
    z: Array4<f32>,
}

impl Conv2d {
    /// Creates a new `Conv2d` layer.
    ///
    /// # Arguments
    /// * `in_channels` - The amount of channels of the input.
    /// * `out_channels` - The amount of filters.
    /// * `kernel` - The side of each square filter.
    /// * `stride` - The step between two filter applications.
    /// * `act_fn` - An optional activation function.
    /// * `init` - How the filters should be initialized.
    ///
    /// # Returns
    /// A new `Conv2d` instance.
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
        (self.out_channels, self.in_channels * self.kernel * self.kernel)
    }

    pub fn size(&self) -> usize {
        let (rows, cols) = self.weight_dim();
        rows * cols + self.out_channels
    }

    /// The output shape of a single sample.
    pub fn output_shape(&self, input: &[usize]) -> Result<Vec<usize>> {
        let g = self.geometry(input)?;
        Ok(vec![self.out_channels, g.out_height, g.out_width])
    }

    pub fn forward(&mut self, params: &[f32], x: ArrayD<f32>) -> Result<ArrayD<f32>> {
        let (geometry, cols, z) = self.convolve(params, x)?;
        let a = self.activate(&z);

        self.cache = Some(ConvCache { geometry, cols, z });
        Ok(a.into_dyn())
    }

    pub fn predict(&self, params: &[f32], x: ArrayD<f32>) -> Result<ArrayD<f32>> {
        let (_, _, z) = self.convolve(params, x)?;
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
        let cache = self.cache.as_ref().ok_or(MlErr::MissingForward("conv2d"))?;
        let mut d = d.into_dimensionality::<Ix4>()?;
        expect_shape("conv2d delta", d.shape(), cache.z.shape())?;

        if let Some(act_fn) = &self.act_fn {
            d.zip_mut_with(&cache.z, |d, &z| *d *= act_fn.df(z));
        }

        let (n, c, h, w) = d.dim();
        let d = d.to_shape((n, c, h * w))?;

        if let Some(grad) = grad {
            let (dw_raw, db_raw) = grad.split_at_mut(self.size() - self.out_channels);
            let mut dw = ArrayViewMut2::from_shape(self.weight_dim(), dw_raw)?;
            let mut db = ArrayViewMut1::from_shape(self.out_channels, db_raw)?;

            let sum = d
                .axis_iter(Axis(0))
                .into_par_iter()
                .zip(cache.cols.par_iter())
                .map(|(di, cols)| di.dot(&cols.t()))
                .reduce_with(|acc, dw| acc + dw);

            match sum {
                Some(sum) => dw.assign(&sum),
                None => dw.fill(0.),
            }
            db.assign(&d.sum_axis(Axis(2)).sum_axis(Axis(0)));
        }

        let (filters, _) = params_2d(params, self.weight_dim())?;
        let geometry = cache.geometry;
        let dx: Vec<Array3<f32>> = d
            .axis_iter(Axis(0))
            .into_par_iter()
            .map(|di| geometry.col2im(filters.t().dot(&di).view()))
            .collect();

        stack_samples(&dx)
    }

    fn geometry(&self, input: &[usize]) -> Result<ConvGeometry> {
        let &[c, h, w] = input else {
            return Err(MlErr::ShapeMismatch {
                what: "conv2d input",
                got: input.to_vec(),
                expected: vec![self.in_channels, 0, 0],
            });
        };

        expect_shape("conv2d input channels", &[c], &[self.in_channels])?;
        Ok(ConvGeometry::same(c, h, w, self.kernel, self.stride))
    }

    fn convolve(
        &self,
        params: &[f32],
        x: ArrayD<f32>,
    ) -> Result<(ConvGeometry, Vec<Array2<f32>>, Array4<f32>)> {
        let x = x.into_dimensionality::<Ix4>()?;
        let g = self.geometry(&x.shape()[1..])?;
        let (filters, b) = params_2d(params, self.weight_dim())?;
        let b = b.insert_axis(Axis(1));

        let cols: Vec<Array2<f32>> = x
            .axis_iter(Axis(0))
            .into_par_iter()
            .map(|xi| g.im2col(xi))
            .collect();

        let z: Vec<Array3<f32>> = cols
            .par_iter()
            .map(|cols| {
                let zi = filters.dot(cols) + b;
                zi.into_shape_with_order((self.out_channels, g.out_height, g.out_width))
            })
            .collect::<std::result::Result<_, ShapeError>>()?;

        let z = stack_samples(&z)?.into_dimensionality::<Ix4>()?;
        Ok((g, cols, z))
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

    #[test]
    fn identity_kernel_copies_input() {
        // A 3x3 filter with a single 1 in its center.
        let conv = Conv2d::new(1, 1, 3, 1, None, InitSpec::GlorotUniform);
        let mut params = vec![0.; conv.size()];
        params[4] = 1.;

        let x = Array4::from_shape_fn((2, 1, 4, 4), |(n, _, i, j)| (n * 16 + i * 4 + j) as f32);
        let y = conv.predict(&params, x.clone().into_dyn()).unwrap();
        assert_eq!(y, x.into_dyn());
    }

    #[test]
    fn strided_output_shape_is_ceil() {
        let conv = Conv2d::new(3, 8, 3, 2, None, InitSpec::GlorotUniform);
        assert_eq!(conv.output_shape(&[3, 32, 32]).unwrap(), vec![8, 16, 16]);
        assert_eq!(conv.output_shape(&[3, 5, 5]).unwrap(), vec![8, 3, 3]);
        assert!(conv.output_shape(&[4, 32, 32]).is_err());
    }

    #[test]
    fn bias_gradient_sums_deltas() {
        let mut conv = Conv2d::new(2, 3, 3, 1, None, InitSpec::GlorotUniform);
        let params = vec![0.1; conv.size()];
        let mut grad = vec![0.; conv.size()];

        conv.forward(&params, Array4::ones((2, 2, 3, 3)).into_dyn()).unwrap();
        let dx = conv
            .backward(&params, Some(&mut grad), Array4::ones((2, 3, 3, 3)).into_dyn())
            .unwrap();

        assert_eq!(dx.shape(), &[2, 2, 3, 3]);
        assert_eq!(&grad[conv.size() - 3..], &[18., 18., 18.]);
    }

    #[test]
    fn weight_gradient_matches_finite_differences() {
        let conv = Conv2d::new(1, 2, 3, 2, Some(ActFn::Tanh), InitSpec::GlorotUniform);
        let size = conv.size();
        let params: Vec<f32> = (0..size).map(|i| ((i % 5) as f32 - 2.) * 0.1).collect();
        let x = Array4::from_shape_fn((1, 1, 5, 5), |(_, _, i, j)| ((i * 5 + j) % 3) as f32 * 0.5);

        // loss = sum(output)
        let loss = |p: &[f32]| conv.predict(p, x.clone().into_dyn()).unwrap().sum();

        let mut grad = vec![0.; size];
        let mut trained = conv.clone();
        let y = trained.forward(&params, x.clone().into_dyn()).unwrap();
        trained
            .backward(&params, Some(&mut grad), ArrayD::ones(y.shape()))
            .unwrap();

        let eps = 1e-2;
        for i in 0..size {
            let mut plus = params.clone();
            plus[i] += eps;
            let mut minus = params.clone();
            minus[i] -= eps;
            let numeric = (loss(&plus) - loss(&minus)) / (2. * eps);
            assert!((numeric - grad[i]).abs() < 1e-2, "param {i}: {numeric} vs {}", grad[i]);
        }
    }
}
