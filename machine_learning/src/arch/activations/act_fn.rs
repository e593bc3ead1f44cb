use serde::{Deserialize, Serialize};

use super::{LeakyRelu, Sigmoid};

/// An element-wise activation function applied at the output of a parametric layer.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActFn {
    Sigmoid(Sigmoid),
    LeakyRelu(LeakyRelu),
    Relu,
    Tanh,
}
use ActFn::*;

impl ActFn {
    pub fn sigmoid(amp: f32) -> Self {
        Sigmoid(Sigmoid::new(amp))
    }

    pub fn leaky_relu(alpha: f32) -> Self {
        LeakyRelu(LeakyRelu::new(alpha))
    }

    pub fn f(&self, z: f32) -> f32 {
        match self {
            Sigmoid(a) => a.f(z),
            LeakyRelu(a) => a.f(z),
            Relu => z.max(0.),
            Tanh => z.tanh(),
        }
    }

    pub fn df(&self, z: f32) -> f32 {
        match self {
            Sigmoid(a) => a.df(z),
            LeakyRelu(a) => a.df(z),
            Relu => (z > 0.) as u32 as f32,
            Tanh => 1. - z.tanh().powi(2),
        }
    }
}
