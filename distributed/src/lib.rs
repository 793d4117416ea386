pub mod collective;
pub mod error;
pub mod group;
pub mod mesh;
mod replicated;
pub mod topology;

pub use error::{DistErr, Result};
pub use group::{LocalGroup, ProcessGroup, SingleProcess, TcpGroup};
pub use mesh::{DeviceMesh, SerialMesh, ThreadMesh};
pub use replicated::Replicated;
pub use topology::Topology;
