use std::{
    error::Error,
    fmt::{self, Display},
};

/// The result type used in the entire machine learning module.
pub type Result<T> = std::result::Result<T, MlErr>;

/// The machine learning module's error type.
#[derive(Debug, Clone, PartialEq)]
pub enum MlErr {
    SizeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    LabelOutOfRange {
        label: u32,
        classes: usize,
    },
    EmptyModel,
    InvalidInit(String),
}

impl Display for MlErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MlErr::SizeMismatch {
                what,
                got,
                expected,
            } => write!(
                f,
                "There's a size mismatch in {what}, got {got} and expected {expected}"
            ),
            MlErr::LabelOutOfRange { label, classes } => write!(
                f,
                "Label {label} is out of range for a model with {classes} classes"
            ),
            MlErr::EmptyModel => write!(f, "A model needs at least one layer"),
            MlErr::InvalidInit(detail) => {
                write!(f, "Failed to initialize the parameters: {detail}")
            }
        }
    }
}

impl Error for MlErr {}
