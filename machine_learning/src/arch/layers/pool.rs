use ndarray::prelude::*;

use super::expect_shape;
use crate::{MlErr, Result};

/// Non overlapping max pooling over `size x size` windows. Trailing rows and columns that
/// don't fill a window are dropped.
#[derive(Debug, Clone)]
pub struct MaxPool2d {
    size: usize,

    // Flat input index of each output's maximum.
    argmax: Option<(Vec<usize>, Vec<usize>)>,
}

impl MaxPool2d {
    pub fn new(size: usize) -> Self {
        Self { size, argmax: None }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn output_shape(&self, input: &[usize]) -> Result<Vec<usize>> {
        let &[c, h, w] = input else {
            return Err(MlErr::ShapeMismatch {
                what: "max_pool2d input",
                got: input.to_vec(),
                expected: vec![0, self.size, self.size],
            });
        };

        Ok(vec![c, h / self.size, w / self.size])
    }

    pub fn forward(&mut self, x: ArrayD<f32>) -> Result<ArrayD<f32>> {
        let input_shape = x.shape().to_vec();
        let (y, argmax) = self.pool(x)?;
        self.argmax = Some((input_shape, argmax));
        Ok(y)
    }

    pub fn predict(&self, x: ArrayD<f32>) -> Result<ArrayD<f32>> {
        Ok(self.pool(x)?.0)
    }

    pub fn backward(&mut self, d: ArrayD<f32>) -> Result<ArrayD<f32>> {
        let (input_shape, argmax) = self
            .argmax
            .as_ref()
            .ok_or(MlErr::MissingForward("max_pool2d"))?;

        expect_shape("max_pool2d delta", &[d.len()], &[argmax.len()])?;

        let mut dx = vec![0.; input_shape.iter().product()];
        for (&i, &d) in argmax.iter().zip(d.iter()) {
            dx[i] += d;
        }

        Ok(ArrayD::from_shape_vec(input_shape.clone(), dx)?)
    }

    fn pool(&self, x: ArrayD<f32>) -> Result<(ArrayD<f32>, Vec<usize>)> {
        let x = x.into_dimensionality::<Ix4>()?;
        let (n, c, h, w) = x.dim();
        let p = self.size;
        let (oh, ow) = (h / p, w / p);

        let mut y = Array4::zeros((n, c, oh, ow));
        let mut argmax = Vec::with_capacity(y.len());

        for ((b, ch, i, j), out) in y.indexed_iter_mut() {
            let flat = |r: usize, s: usize| ((b * c + ch) * h + r) * w + s;
            let mut best = (x[[b, ch, i * p, j * p]], flat(i * p, j * p));

            for r in i * p..(i + 1) * p {
                for s in j * p..(j + 1) * p {
                    if x[[b, ch, r, s]] > best.0 {
                        best = (x[[b, ch, r, s]], flat(r, s));
                    }
                }
            }

            *out = best.0;
            argmax.push(best.1);
        }

        Ok((y.into_dyn(), argmax))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_window_maximum() {
        let x = Array4::from_shape_vec(
            (1, 1, 4, 4),
            vec![
                1., 2., 0., 0., //
                3., 4., 0., 9., //
                5., 0., 1., 1., //
                0., 0., 1., 2., //
            ],
        )
        .unwrap();

        let pool = MaxPool2d::new(2);
        let y = pool.predict(x.into_dyn()).unwrap();
        assert_eq!(y, array![[[[4_f32, 9.], [5., 2.]]]].into_dyn());
    }

    #[test]
    fn routes_delta_to_the_maximum() {
        let x = Array4::from_shape_vec((1, 1, 2, 3), vec![1., 7., 3., 2., 0., 8.]).unwrap();
        let mut pool = MaxPool2d::new(2);

        let y = pool.forward(x.into_dyn()).unwrap();
        assert_eq!(y.shape(), &[1, 1, 1, 1]);

        let dx = pool.backward(ArrayD::from_elem(vec![1, 1, 1, 1], 5.)).unwrap();
        assert_eq!(dx.as_slice().unwrap(), &[0., 5., 0., 0., 0., 0.]);
    }
}
