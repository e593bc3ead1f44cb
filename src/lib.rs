pub mod adversarial;
pub mod checkpoint;
pub mod classifier;
pub mod config;
pub mod data;
pub mod error;
pub mod plot;
pub mod sampling;
pub mod session;
pub mod topology;
pub mod training;

pub use error::{GanErr, Result};
