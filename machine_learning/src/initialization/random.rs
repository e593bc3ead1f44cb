use std::{cell::RefCell, rc::Rc};

use rand::Rng;
use rand_distr::{Distribution, Normal, Uniform};

use super::{ParamGen, Result};

/// A parameter generator that samples from a probability distribution.
///
/// Several generators can share the same random number generator, so a whole model is
/// reproducible from a single seed.
pub struct RandParamGen<R: Rng, D: Distribution<f32>> {
    rng: Rc<RefCell<R>>,
    distribution: D,
    remaining: usize,
}

impl<R: Rng, D: Distribution<f32>> RandParamGen<R, D> {
    /// Creates a new `RandParamGen`.
    ///
    /// # Arguments
    /// * `rng` - A shared random number generator.
    /// * `distribution` - The distribution to sample from.
    /// * `limit` - The maximum amount of values to generate.
    pub fn new(rng: Rc<RefCell<R>>, distribution: D, limit: usize) -> Self {
        Self {
            rng,
            distribution,
            remaining: limit,
        }
    }
}

impl<R: Rng> RandParamGen<R, Uniform<f32>> {
    /// Creates a new `RandParamGen` over the uniform range `[low, high)`.
    ///
    /// # Returns
    /// An error if the range is invalid (low >= high).
    pub fn uniform(rng: Rc<RefCell<R>>, limit: usize, low: f32, high: f32) -> Result<Self> {
        Ok(Self::new(rng, Uniform::new(low, high)?, limit))
    }

    /// Glorot (Xavier) uniform initialization, `U(-a, a)` with `a = sqrt(6 / (fan_in + fan_out))`.
    ///
    /// # Arguments
    /// * `rng` - A shared random number generator.
    /// * `limit` - The maximum amount of values to generate.
    /// * `fan_in` - The number of inputs of each unit.
    /// * `fan_out` - The number of outputs of each unit.
    pub fn glorot_uniform(
        rng: Rc<RefCell<R>>,
        limit: usize,
        fan_in: usize,
        fan_out: usize,
    ) -> Result<Self> {
        let a = (6. / (fan_in + fan_out) as f32).sqrt();
        Self::uniform(rng, limit, -a, a)
    }

    /// He (Kaiming) uniform initialization, `U(-a, a)` with `a = sqrt(6 / fan_in)`.
    pub fn he_uniform(rng: Rc<RefCell<R>>, limit: usize, fan_in: usize) -> Result<Self> {
        let a = (6. / fan_in as f32).sqrt();
        Self::uniform(rng, limit, -a, a)
    }
}

impl<R: Rng> RandParamGen<R, Normal<f32>> {
    /// Creates a new `RandParamGen` over a normal distribution.
    ///
    /// # Returns
    /// An error if `std_dev` is not finite.
    pub fn normal(rng: Rc<RefCell<R>>, limit: usize, mean: f32, std_dev: f32) -> Result<Self> {
        Ok(Self::new(rng, Normal::new(mean, std_dev)?, limit))
    }

    /// He (Kaiming) normal initialization, `N(0, 2 / fan_in)`.
    pub fn he_normal(rng: Rc<RefCell<R>>, limit: usize, fan_in: usize) -> Result<Self> {
        Self::normal(rng, limit, 0., (2. / fan_in as f32).sqrt())
    }

    /// LeCun normal initialization, `N(0, 1 / fan_in)`.
    pub fn lecun_normal(rng: Rc<RefCell<R>>, limit: usize, fan_in: usize) -> Result<Self> {
        Self::normal(rng, limit, 0., (1. / fan_in as f32).sqrt())
    }
}

impl<R: Rng, D: Distribution<f32>> ParamGen for RandParamGen<R, D> {
    fn sample(&mut self, n: usize) -> Option<Vec<f32>> {
        if self.remaining == 0 {
            return None;
        }

        let n = n.min(self.remaining);
        self.remaining -= n;

        let mut rng = self.rng.borrow_mut();
        Some((0..n).map(|_| self.distribution.sample(&mut *rng)).collect())
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    fn seeded_rng() -> Rc<RefCell<StdRng>> {
        Rc::new(RefCell::new(StdRng::seed_from_u64(42)))
    }

    #[test]
    fn glorot_uniform_respects_bound() {
        let mut param_gen = RandParamGen::glorot_uniform(seeded_rng(), 1000, 10, 14).unwrap();
        let sample = param_gen.sample(1000).unwrap();

        let a = 0.5;
        assert!(sample.iter().all(|v| (-a..a).contains(v)));
        assert!(param_gen.sample(1).is_none());
    }

    #[test]
    fn shared_rng_makes_generators_reproducible() {
        let draw = || {
            let rng = seeded_rng();
            let mut first = RandParamGen::he_normal(rng.clone(), 5, 8).unwrap();
            let mut second = RandParamGen::lecun_normal(rng, 5, 8).unwrap();
            (first.sample(5).unwrap(), second.sample(5).unwrap())
        };

        let (a1, b1) = draw();
        let (a2, b2) = draw();
        assert_eq!(a1, a2);
        assert_eq!(b1, b2);
        assert_ne!(a1, b1);
    }

    #[test]
    fn invalid_bounds_fail() {
        assert!(RandParamGen::uniform(seeded_rng(), 1, 1., -1.).is_err());
        assert!(RandParamGen::normal(seeded_rng(), 1, 0., f32::NAN).is_err());
    }
}
