//! Model checkpoints stored as safetensors files.
//!
//! Every parametric layer `i` contributes a `layers.{i}.weight` and a `layers.{i}.bias` tensor,
//! and the file's metadata holds the JSON `ModelSpec` under `model_spec` so the model can be
//! rebuilt without any other input.

use std::{collections::HashMap, fs, path::Path};

use safetensors::{
    SafeTensors,
    tensor::{Dtype, TensorView},
};

use crate::{
    MlErr, Result,
    arch::{Model, ModelBuilder, Sequential, spec::ModelSpec},
};

const SPEC_KEY: &str = "model_spec";

/// A model's architecture and parameters as read from disk.
#[derive(Debug, Clone)]
pub struct Checkpoint {
    pub spec: ModelSpec,
    pub params: Vec<f32>,
    pub metadata: HashMap<String, String>,
}

impl Checkpoint {
    /// Rebuilds the model, checking that the stored parameters fit it.
    ///
    /// # Arguments
    /// * `builder` - Seeds the model's stochastic layers.
    ///
    /// # Returns
    /// The model and its parameters.
    pub fn into_model(self, builder: &ModelBuilder) -> Result<(Sequential, Vec<f32>)> {
        let model = builder.build_model(&self.spec)?;
        if model.size() != self.params.len() {
            return Err(MlErr::SizeMismatch {
                what: "checkpoint params",
                got: self.params.len(),
                expected: model.size(),
            });
        }

        Ok((model, self.params))
    }
}

/// Writes a model and its parameters to `path`.
///
/// # Arguments
/// * `path` - Where to write the checkpoint, overwritten if it exists.
/// * `model` - The model whose architecture is stored.
/// * `params` - The model's parameters.
/// * `extra` - Additional metadata entries, like the epoch the checkpoint was taken at.
///
/// # Returns
/// An io error if the file can't be written.
pub fn save(
    path: &Path,
    model: &Sequential,
    params: &[f32],
    extra: &HashMap<String, String>,
) -> Result<()> {
    if params.len() != model.size() {
        return Err(MlErr::SizeMismatch {
            what: "checkpoint params",
            got: params.len(),
            expected: model.size(),
        });
    }

    let mut views = Vec::new();
    let mut rest = params;

    for (i, layer) in model.layers().iter().enumerate() {
        let Some((w_shape, b_shape)) = layer.param_shapes() else {
            continue;
        };

        for (name, shape) in [("weight", w_shape), ("bias", b_shape)] {
            let (values, tail) = rest.split_at(shape.iter().product());
            rest = tail;

            let view = TensorView::new(Dtype::F32, shape, bytemuck::cast_slice(values))
                .map_err(|e| MlErr::Checkpoint(e.to_string()))?;
            views.push((format!("layers.{i}.{name}"), view));
        }
    }

    let spec = serde_json::to_string(&model.spec()).map_err(|e| MlErr::Checkpoint(e.to_string()))?;
    let mut metadata = extra.clone();
    metadata.insert(SPEC_KEY.to_string(), spec);

    let bytes = safetensors::serialize(views, &Some(metadata))
        .map_err(|e| MlErr::Checkpoint(e.to_string()))?;

    fs::write(path, bytes)?;
    log::debug!(path:? = path, params = params.len(); "checkpoint saved");
    Ok(())
}

/// Reads a checkpoint written by `save`.
///
/// # Arguments
/// * `path` - The checkpoint file.
///
/// # Returns
/// The checkpoint, or an error if the file is missing, malformed, or its tensors don't match
/// the stored architecture.
pub fn load(path: &Path) -> Result<Checkpoint> {
    let bytes = fs::read(path)?;
    let checkpoint_err = |e: safetensors::SafeTensorError| MlErr::Checkpoint(e.to_string());

    let (_, header) = SafeTensors::read_metadata(&bytes).map_err(checkpoint_err)?;
    let mut metadata = header.metadata().clone().unwrap_or_default();
    let spec = metadata
        .remove(SPEC_KEY)
        .ok_or_else(|| MlErr::Checkpoint(format!("missing {SPEC_KEY} metadata")))?;
    let spec: ModelSpec =
        serde_json::from_str(&spec).map_err(|e| MlErr::Checkpoint(e.to_string()))?;

    let tensors = SafeTensors::deserialize(&bytes).map_err(checkpoint_err)?;
    let model = ModelBuilder::new(Some(0)).build_model(&spec)?;
    let mut params = Vec::with_capacity(model.size());

    for (i, layer) in model.layers().iter().enumerate() {
        let Some((w_shape, b_shape)) = layer.param_shapes() else {
            continue;
        };

        for (name, shape) in [("weight", w_shape), ("bias", b_shape)] {
            let tensor = tensors
                .tensor(&format!("layers.{i}.{name}"))
                .map_err(checkpoint_err)?;

            if tensor.dtype() != Dtype::F32 {
                return Err(MlErr::Checkpoint(format!(
                    "layers.{i}.{name} is {:?}, expected F32",
                    tensor.dtype()
                )));
            }

            crate::arch::layers::expect_shape("checkpoint tensor", tensor.shape(), &shape)?;
            params.extend(decode_f32(tensor.data()));
        }
    }

    Ok(Checkpoint {
        spec,
        params,
        metadata,
    })
}

fn decode_f32(data: &[u8]) -> Vec<f32> {
    match bytemuck::try_cast_slice::<u8, f32>(data) {
        Ok(values) => values.to_vec(),
        Err(_) => data
            .chunks_exact(4)
            .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
            .collect(),
    }
}
