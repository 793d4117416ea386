use std::{error::Error, fmt, io};

use distributed::DistErr;
use machine_learning::MlErr;

use crate::data::DataErr;

/// The training run's result type.
pub type Result<T> = std::result::Result<T, TrainErr>;

/// Training run failures.
#[derive(Debug)]
pub enum TrainErr {
    InvalidConfig(String),
    Data(DataErr),
    Ml(MlErr),
    Dist(DistErr),
    Io(io::Error),
}

impl fmt::Display for TrainErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrainErr::InvalidConfig(reason) => write!(f, "invalid configuration: {reason}"),
            TrainErr::Data(e) => write!(f, "dataset error: {e}"),
            TrainErr::Ml(e) => write!(f, "model error: {e}"),
            TrainErr::Dist(e) => write!(f, "distributed error: {e}"),
            TrainErr::Io(e) => write!(f, "io error: {e}"),
        }
    }
}

impl Error for TrainErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            TrainErr::InvalidConfig(_) => None,
            TrainErr::Data(e) => Some(e),
            TrainErr::Ml(e) => Some(e),
            TrainErr::Dist(e) => Some(e),
            TrainErr::Io(e) => Some(e),
        }
    }
}

impl From<DataErr> for TrainErr {
    fn from(value: DataErr) -> Self {
        Self::Data(value)
    }
}

impl From<MlErr> for TrainErr {
    fn from(value: MlErr) -> Self {
        Self::Ml(value)
    }
}

impl From<DistErr> for TrainErr {
    fn from(value: DistErr) -> Self {
        Self::Dist(value)
    }
}

impl From<io::Error> for TrainErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

/// Boundary conversion for binaries / I/O APIs.
impl From<TrainErr> for io::Error {
    fn from(value: TrainErr) -> Self {
        match value {
            TrainErr::Io(e) => e,
            TrainErr::InvalidConfig(_) => io::Error::new(io::ErrorKind::InvalidInput, value),
            other => io::Error::other(other),
        }
    }
}
