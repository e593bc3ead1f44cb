mod frozen;
mod model_trainer;
mod param_manager;

pub use frozen::FrozenModel;
pub use model_trainer::{ModelTrainer, StepStats};
pub use param_manager::ParamManager;
