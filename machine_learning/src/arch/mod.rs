pub mod activations;
pub mod layers;
pub mod loss;
pub mod spec;

mod builder;
mod model;
mod sequential;

pub use builder::ModelBuilder;
pub use model::Model;
pub use sequential::Sequential;
