mod gan_trainer;
mod history;
mod schedule;

pub use gan_trainer::GanTrainer;
pub use history::{EvalRecord, History, ProgressRecord};
pub use schedule::Schedule;
