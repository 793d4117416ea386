mod adamw;
mod optimizer;

pub use adamw::{AdamW, AdamWState};
pub use optimizer::Optimizer;
