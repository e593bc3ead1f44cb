mod binary_cross_entropy;
mod categorical_cross_entropy;
mod loss_fn;

pub use binary_cross_entropy::BinaryCrossEntropy;
pub use categorical_cross_entropy::CategoricalCrossEntropy;
pub use loss_fn::LossFn;

/// Predictions are clipped to `[EPSILON, 1 - EPSILON]` before taking logarithms.
pub const EPSILON: f32 = 1e-7;
