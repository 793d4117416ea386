pub mod activations;
pub mod layers;
pub mod loss;
mod mlp;
mod model;
mod sequential;

pub use mlp::Mlp;
pub use model::Model;
pub use sequential::Sequential;
