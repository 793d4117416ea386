pub mod arch;
pub mod error;
pub mod initialization;
pub mod optimization;
pub mod params;

pub use error::{MlErr, Result};
pub use params::Params;
