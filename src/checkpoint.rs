//! Where and how the models of each pipeline are persisted. The GAN and the classifier write
//! to separate directories and never look up each other's files.

use std::{collections::HashMap, path::Path};

use machine_learning::{
    MlErr,
    arch::{ModelBuilder, Sequential},
    checkpoint,
};

use crate::{GanErr, Result};

pub const CLASSIFIER_CHECKPOINT: &str = "classifier_model.safetensors";

/// The file name of the generator checkpoint taken at the end of `epoch` (0 based).
pub fn generator_checkpoint_name(epoch: usize) -> String {
    format!("generator_model_{:03}.safetensors", epoch + 1)
}

/// The file name of the image grid plotted at the end of `epoch` (0 based).
pub fn grid_name(epoch: usize) -> String {
    format!("generated_plot_e{:03}.png", epoch + 1)
}

/// Writes a model with its metadata.
pub fn save_model(
    path: &Path,
    model: &Sequential,
    params: &[f32],
    metadata: &[(&str, String)],
) -> Result<()> {
    let extra: HashMap<String, String> = metadata
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect();

    Ok(checkpoint::save(path, model, params, &extra)?)
}

/// Reads a model back.
///
/// # Arguments
/// * `path` - The checkpoint file.
/// * `seed` - Seeds the stochastic layers of the rebuilt model.
///
/// # Returns
/// The model and its parameters, or `DataLoad` if the file is missing, malformed, or
/// describes a model its tensors don't fit.
pub fn load_model(path: &Path, seed: Option<u64>) -> Result<(Sequential, Vec<f32>)> {
    let checkpoint = checkpoint::load(path).map_err(|e| load_err(path, e))?;
    if let Some(epoch) = checkpoint.metadata.get("epoch") {
        log::debug!(path:? = path, epoch = epoch.as_str(); "loading checkpoint");
    }

    checkpoint
        .into_model(&ModelBuilder::new(seed))
        .map_err(|e| load_err(path, e))
}

fn load_err(path: &Path, e: MlErr) -> GanErr {
    GanErr::data_load(path.display(), e)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use machine_learning::arch::{
        activations::ActFn,
        spec::{InitSpec, LayerSpec, ModelSpec},
    };

    use super::*;

    fn save_spec(path: &Path, spec: &ModelSpec) {
        let (model, params) = ModelBuilder::new(Some(0)).build(spec).unwrap();
        save_model(path, &model, &params, &[("epoch", "1".to_string())]).unwrap();
    }

    /// Rewrites an equally long byte sequence of a saved file in place.
    fn patch_file(path: &Path, from: &[u8], to: &[u8]) {
        assert_eq!(from.len(), to.len());
        let mut bytes = fs::read(path).unwrap();
        let at = bytes
            .windows(from.len())
            .position(|w| w == from)
            .unwrap();

        bytes[at..at + to.len()].copy_from_slice(to);
        fs::write(path, bytes).unwrap();
    }

    #[test]
    fn names_use_one_based_padded_epochs() {
        assert_eq!(generator_checkpoint_name(9), "generator_model_010.safetensors");
        assert_eq!(grid_name(199), "generated_plot_e200.png");
    }

    #[test]
    fn missing_checkpoint_is_a_load_error() {
        let err = load_model(Path::new("/no/such/model.safetensors"), Some(0)).unwrap_err();
        assert!(matches!(err, GanErr::DataLoad { .. }));
    }

    #[test]
    fn zero_stride_checkpoint_is_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conv.safetensors");
        let spec = ModelSpec {
            input_shape: vec![1, 4, 4],
            layers: vec![
                LayerSpec::Conv2d {
                    in_channels: 1,
                    out_channels: 1,
                    kernel: 3,
                    stride: 1,
                    act_fn: Some(ActFn::Tanh),
                    init: InitSpec::GlorotUniform,
                },
                LayerSpec::Flatten,
            ],
        };

        save_spec(&path, &spec);
        patch_file(&path, b"stride\\\":1", b"stride\\\":0");

        let err = load_model(&path, Some(0)).unwrap_err();
        assert!(matches!(err, GanErr::DataLoad { .. }));
    }

    #[test]
    fn tensor_not_fitting_the_stored_spec_is_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dense.safetensors");
        let spec = ModelSpec {
            input_shape: vec![2],
            layers: vec![LayerSpec::Dense {
                dim: (2, 1),
                act_fn: None,
                init: InitSpec::GlorotUniform,
            }],
        };

        // The stored weight stays [2, 1] while the spec now asks for [3, 1].
        save_spec(&path, &spec);
        patch_file(&path, b"input_shape\\\":[2]", b"input_shape\\\":[3]");
        patch_file(&path, b"dim\\\":[2,1]", b"dim\\\":[3,1]");

        let err = load_model(&path, Some(0)).unwrap_err();
        assert!(matches!(err, GanErr::DataLoad { .. }));
    }
}
