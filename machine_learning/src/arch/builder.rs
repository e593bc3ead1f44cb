use std::{cell::RefCell, rc::Rc};

use rand::{Rng, SeedableRng, rngs::StdRng};

use super::{
    Sequential,
    layers::Layer,
    spec::{InitSpec, ModelSpec},
};
use crate::{
    MlErr, Result,
    initialization::{ChainedParamGen, ConstParamGen, ParamGen, RandParamGen},
};

/// Builds `Sequential` models and their initial parameters from a `ModelSpec`.
pub struct ModelBuilder {
    rng: Rc<RefCell<StdRng>>,
}

impl ModelBuilder {
    /// Creates a new `ModelBuilder`.
    ///
    /// # Arguments
    /// * `seed` - Seeds the parameter initialization and every stochastic layer, a random seed
    ///   is used if `None`.
    ///
    /// # Returns
    /// A new `ModelBuilder` instance.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        Self {
            rng: Rc::new(RefCell::new(rng)),
        }
    }

    /// Builds the model described by `spec` with freshly initialized parameters.
    ///
    /// # Arguments
    /// * `spec` - The model's specification.
    ///
    /// # Returns
    /// The model along with its parameters, or an error if the spec is invalid.
    pub fn build(&self, spec: &ModelSpec) -> Result<(Sequential, Vec<f32>)> {
        let model = self.build_model(spec)?;
        let size = model.layers().iter().map(Layer::size).sum();

        let mut param_gen = self.param_gen(model.layers())?;
        let params = param_gen.sample(size).unwrap_or_default();
        if params.len() != size {
            return Err(MlErr::SizeMismatch {
                what: "initial params",
                got: params.len(),
                expected: size,
            });
        }

        Ok((model, params))
    }

    /// Builds the model described by `spec` without initializing any parameter, used when the
    /// parameters come from somewhere else like a checkpoint.
    pub fn build_model(&self, spec: &ModelSpec) -> Result<Sequential> {
        let mut rng = self.rng.borrow_mut();
        let layers: Vec<Layer> = spec
            .layers
            .iter()
            .map(|&layer| Layer::from_spec(layer, rng.random()))
            .collect();

        Sequential::new(spec.input_shape.clone(), layers)
    }

    fn param_gen(&self, layers: &[Layer]) -> Result<ChainedParamGen> {
        let mut param_gens: Vec<Box<dyn ParamGen>> = Vec::new();

        for layer in layers {
            let (Some((w, b)), Some((fan_in, fan_out)), Some(init)) =
                (layer.param_shapes(), layer.fans(), layer.init())
            else {
                continue;
            };

            let limit = w.iter().product();
            param_gens.push(self.weight_gen(init, limit, fan_in, fan_out)?);
            param_gens.push(Box::new(ConstParamGen::zeros(b.iter().product())));
        }

        Ok(ChainedParamGen::new(param_gens))
    }

    fn weight_gen(
        &self,
        init: InitSpec,
        limit: usize,
        fan_in: usize,
        fan_out: usize,
    ) -> Result<Box<dyn ParamGen>> {
        let rng = self.rng.clone();

        let param_gen: Box<dyn ParamGen> = match init {
            InitSpec::Const { value } => Box::new(ConstParamGen::new(value, limit)),
            InitSpec::Uniform { low, high } => {
                Box::new(RandParamGen::uniform(rng, limit, low, high)?)
            }
            InitSpec::Normal { mean, std_dev } => {
                Box::new(RandParamGen::normal(rng, limit, mean, std_dev)?)
            }
            InitSpec::GlorotUniform => {
                Box::new(RandParamGen::glorot_uniform(rng, limit, fan_in, fan_out)?)
            }
            InitSpec::HeUniform => Box::new(RandParamGen::he_uniform(rng, limit, fan_in)?),
            InitSpec::HeNormal => Box::new(RandParamGen::he_normal(rng, limit, fan_in)?),
            InitSpec::LecunNormal => Box::new(RandParamGen::lecun_normal(rng, limit, fan_in)?),
        };

        Ok(param_gen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::{Model, activations::ActFn, spec::LayerSpec};

    fn spec() -> ModelSpec {
        ModelSpec {
            input_shape: vec![4],
            layers: vec![
                LayerSpec::Dense {
                    dim: (4, 8),
                    act_fn: Some(ActFn::Relu),
                    init: InitSpec::HeUniform,
                },
                LayerSpec::Dropout { rate: 0.5 },
                LayerSpec::Dense {
                    dim: (8, 2),
                    act_fn: None,
                    init: InitSpec::Const { value: 0.5 },
                },
            ],
        }
    }

    #[test]
    fn biases_start_at_zero() {
        let (model, params) = ModelBuilder::new(Some(3)).build(&spec()).unwrap();
        assert_eq!(params.len(), model.size());

        let bound = (6_f32 / 4.).sqrt();
        assert!(params[..32].iter().all(|v| v.abs() <= bound));
        assert!(params[32..40].iter().all(|&v| v == 0.));
        assert!(params[40..56].iter().all(|&v| v == 0.5));
        assert!(params[56..].iter().all(|&v| v == 0.));
    }

    #[test]
    fn same_seed_same_params() {
        let (_, a) = ModelBuilder::new(Some(11)).build(&spec()).unwrap();
        let (_, b) = ModelBuilder::new(Some(11)).build(&spec()).unwrap();
        let (_, c) = ModelBuilder::new(Some(12)).build(&spec()).unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn invalid_distribution_is_an_invalid_spec() {
        let mut spec = spec();
        spec.layers[0] = LayerSpec::Dense {
            dim: (4, 8),
            act_fn: None,
            init: InitSpec::Uniform { low: 1., high: 0. },
        };

        let err = ModelBuilder::new(Some(0)).build(&spec).unwrap_err();
        assert!(matches!(err, MlErr::InvalidSpec(_)));
    }
}
