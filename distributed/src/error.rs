use std::{error::Error, fmt, io};

/// The distributed module's result type.
pub type Result<T> = std::result::Result<T, DistErr>;

/// Failures of the device mesh, the process group and the topology setup.
#[derive(Debug)]
pub enum DistErr {
    Io(io::Error),
    InvalidEnv {
        var: &'static str,
        value: String,
    },
    InvalidTopology(String),
    DeviceCountMismatch {
        got: usize,
        expected: usize,
    },
    LengthMismatch {
        got: usize,
        expected: usize,
    },
    UnexpectedMessage {
        expected: &'static str,
        got: &'static str,
    },
    BarrierMismatch {
        expected: String,
        got: String,
    },
    Remote(String),
    Mesh(String),
}

impl fmt::Display for DistErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DistErr::Io(e) => write!(f, "io error: {e}"),
            DistErr::InvalidEnv { var, value } => {
                write!(f, "invalid value for {var}: {value:?}")
            }
            DistErr::InvalidTopology(reason) => write!(f, "invalid topology: {reason}"),
            DistErr::DeviceCountMismatch { got, expected } => write!(
                f,
                "got {got} per-device inputs for a mesh of {expected} devices"
            ),
            DistErr::LengthMismatch { got, expected } => write!(
                f,
                "reduction length mismatch: got {got}, expected {expected}"
            ),
            DistErr::UnexpectedMessage { expected, got } => {
                write!(f, "unexpected message: expected {expected}, got {got}")
            }
            DistErr::BarrierMismatch { expected, got } => write!(
                f,
                "processes disagree on the barrier: expected {expected:?}, got {got:?}"
            ),
            DistErr::Remote(e) => write!(f, "a peer reported an error: {e}"),
            DistErr::Mesh(e) => write!(f, "failed to build the device mesh: {e}"),
        }
    }
}

impl Error for DistErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DistErr::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for DistErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}
