//! The reference network architectures, parameterized by their topology configs.

use machine_learning::arch::{
    activations::ActFn,
    spec::{InitSpec, LayerSpec, ModelSpec},
};

use crate::config::{ClassifierTopology, GanTopology};

/// Latent vector, dense projection to a small feature map, three transposed convolutions
/// doubling the resolution each, and a `tanh` convolution down to the image channels.
pub fn generator_spec(latent_dim: usize, topology: &GanTopology) -> ModelSpec {
    let (channels, height, width) = topology.image_shape;
    let base = (topology.generator_base_channels, height / 8, width / 8);
    let filters = topology.generator_filters;
    let leaky = Some(ActFn::leaky_relu(topology.leaky_alpha));

    let mut layers = vec![
        LayerSpec::Dense {
            dim: (latent_dim, base.0 * base.1 * base.2),
            act_fn: leaky,
            init: InitSpec::GlorotUniform,
        },
        LayerSpec::Reshape { shape: base },
    ];

    let mut in_channels = base.0;
    for _ in 0..3 {
        layers.push(LayerSpec::ConvTranspose2d {
            in_channels,
            out_channels: filters,
            kernel: 4,
            stride: 2,
            act_fn: leaky,
            init: InitSpec::GlorotUniform,
        });
        in_channels = filters;
    }

    layers.push(LayerSpec::Conv2d {
        in_channels,
        out_channels: channels,
        kernel: 3,
        stride: 1,
        act_fn: Some(ActFn::Tanh),
        init: InitSpec::GlorotUniform,
    });

    ModelSpec {
        input_shape: vec![latent_dim],
        layers,
    }
}

/// A resolution keeping convolution followed by stride 2 ones, then dropout and a single
/// sigmoid unit.
pub fn discriminator_spec(topology: &GanTopology) -> ModelSpec {
    let (channels, mut height, mut width) = topology.image_shape;
    let input_shape = vec![channels, height, width];
    let leaky = Some(ActFn::leaky_relu(topology.leaky_alpha));

    let mut layers = Vec::new();
    let mut in_channels = channels;

    for (i, &filters) in topology.discriminator_filters.iter().enumerate() {
        let stride = if i == 0 { 1 } else { 2 };
        layers.push(LayerSpec::Conv2d {
            in_channels,
            out_channels: filters,
            kernel: 3,
            stride,
            act_fn: leaky,
            init: InitSpec::GlorotUniform,
        });

        in_channels = filters;
        height = height.div_ceil(stride);
        width = width.div_ceil(stride);
    }

    layers.extend([
        LayerSpec::Flatten,
        LayerSpec::Dropout {
            rate: topology.dropout,
        },
        LayerSpec::Dense {
            dim: (in_channels * height * width, 1),
            act_fn: Some(ActFn::sigmoid(1.)),
            init: InitSpec::GlorotUniform,
        },
    ]);

    ModelSpec {
        input_shape,
        layers,
    }
}

/// VGG style blocks of two `relu` convolutions and a 2x2 max pooling, then a hidden dense
/// layer and a softmax over the classes.
pub fn classifier_spec(topology: &ClassifierTopology) -> ModelSpec {
    let (channels, mut height, mut width) = topology.image_shape;
    let input_shape = vec![channels, height, width];
    let relu = Some(ActFn::Relu);

    let mut layers = Vec::new();
    let mut in_channels = channels;

    for &filters in &topology.block_filters {
        for _ in 0..2 {
            layers.push(LayerSpec::Conv2d {
                in_channels,
                out_channels: filters,
                kernel: 3,
                stride: 1,
                act_fn: relu,
                init: InitSpec::HeUniform,
            });
            in_channels = filters;
        }

        layers.push(LayerSpec::MaxPool2d { size: 2 });
        height /= 2;
        width /= 2;
    }

    layers.extend([
        LayerSpec::Flatten,
        LayerSpec::Dense {
            dim: (in_channels * height * width, topology.dense_units),
            act_fn: relu,
            init: InitSpec::HeUniform,
        },
        LayerSpec::Dense {
            dim: (topology.dense_units, topology.classes),
            act_fn: None,
            init: InitSpec::GlorotUniform,
        },
        LayerSpec::Softmax,
    ]);

    ModelSpec {
        input_shape,
        layers,
    }
}
