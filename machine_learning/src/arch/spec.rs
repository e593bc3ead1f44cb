use serde::{Deserialize, Serialize};

use super::activations::ActFn;

/// How the weights of a parametric layer are initialized. Biases always start at zero.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitSpec {
    Const { value: f32 },
    Uniform { low: f32, high: f32 },
    Normal { mean: f32, std_dev: f32 },
    #[default]
    GlorotUniform,
    HeUniform,
    HeNormal,
    LecunNormal,
}

/// The specification for a single `Layer`.
///
/// Convolutions always use "same" padding, so their spatial output is `ceil(input / stride)`
/// for `Conv2d` and `input * stride` for `ConvTranspose2d`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerSpec {
    Dense {
        dim: (usize, usize),
        act_fn: Option<ActFn>,
        #[serde(default)]
        init: InitSpec,
    },
    Conv2d {
        in_channels: usize,
        out_channels: usize,
        kernel: usize,
        stride: usize,
        act_fn: Option<ActFn>,
        #[serde(default)]
        init: InitSpec,
    },
    ConvTranspose2d {
        in_channels: usize,
        out_channels: usize,
        kernel: usize,
        stride: usize,
        act_fn: Option<ActFn>,
        #[serde(default)]
        init: InitSpec,
    },
    MaxPool2d {
        size: usize,
    },
    Flatten,
    Reshape {
        shape: (usize, usize, usize),
    },
    Dropout {
        rate: f32,
    },
    Softmax,
}

/// The specification for a `Sequential` model.
///
/// `input_shape` is the shape of a single sample, without the batch axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ModelSpec {
    pub input_shape: Vec<usize>,
    pub layers: Vec<LayerSpec>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_spec_json_roundtrip_keeps_layers() {
        let spec = ModelSpec {
            input_shape: vec![3, 8, 8],
            layers: vec![
                LayerSpec::Conv2d {
                    in_channels: 3,
                    out_channels: 4,
                    kernel: 3,
                    stride: 2,
                    act_fn: Some(ActFn::leaky_relu(0.2)),
                    init: InitSpec::HeUniform,
                },
                LayerSpec::Flatten,
                LayerSpec::Dropout { rate: 0.4 },
                LayerSpec::Dense {
                    dim: (64, 1),
                    act_fn: Some(ActFn::sigmoid(1.)),
                    init: InitSpec::GlorotUniform,
                },
            ],
        };

        let json = serde_json::to_string(&spec).unwrap();
        let parsed: ModelSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, spec);
    }

    #[test]
    fn init_defaults_to_glorot_uniform() {
        let json = r#"{"dense":{"dim":[2,3],"act_fn":null}}"#;
        let layer: LayerSpec = serde_json::from_str(json).unwrap();

        assert_eq!(
            layer,
            LayerSpec::Dense {
                dim: (2, 3),
                act_fn: None,
                init: InitSpec::GlorotUniform
            }
        );
    }
}
