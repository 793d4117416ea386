use std::{error::Error, fmt, io, path::PathBuf};

/// Failures reading or batching a dataset.
#[derive(Debug)]
pub enum DataErr {
    Io {
        path: PathBuf,
        source: io::Error,
    },
    BadMagic {
        path: PathBuf,
        got: u32,
        expected: u32,
    },
    Truncated {
        path: PathBuf,
        got: usize,
        expected: usize,
    },
    BadImageShape {
        rows: usize,
        cols: usize,
    },
    CountMismatch {
        images: usize,
        labels: usize,
    },
    LabelOutOfRange(u8),
    NoSuchProcess {
        index: usize,
        count: usize,
    },
    ShardTooSmall {
        shard_len: usize,
        batch_size: usize,
    },
    Indivisible {
        batch_size: usize,
        devices: usize,
    },
    Prefetch(io::Error),
    Exhausted,
}

impl fmt::Display for DataErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataErr::Io { path, source } => write!(f, "{}: {source}", path.display()),
            DataErr::BadMagic {
                path,
                got,
                expected,
            } => write!(
                f,
                "{}: bad magic number {got:#010x}, expected {expected:#010x}",
                path.display()
            ),
            DataErr::Truncated {
                path,
                got,
                expected,
            } => write!(
                f,
                "{}: truncated, got {got} bytes, expected {expected}",
                path.display()
            ),
            DataErr::BadImageShape { rows, cols } => {
                write!(f, "images are {rows}x{cols}, expected 28x28")
            }
            DataErr::CountMismatch { images, labels } => {
                write!(f, "{images} images but {labels} labels")
            }
            DataErr::LabelOutOfRange(label) => write!(f, "label {label} is not a digit"),
            DataErr::NoSuchProcess { index, count } => {
                write!(f, "process {index} is out of range for {count} processes")
            }
            DataErr::ShardTooSmall {
                shard_len,
                batch_size,
            } => write!(
                f,
                "a shard of {shard_len} examples can't fill a batch of {batch_size}"
            ),
            DataErr::Indivisible {
                batch_size,
                devices,
            } => write!(
                f,
                "a batch of {batch_size} can't be split evenly among {devices} devices"
            ),
            DataErr::Prefetch(e) => write!(f, "failed to start prefetching: {e}"),
            DataErr::Exhausted => write!(f, "the training batches ran out"),
        }
    }
}

impl Error for DataErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DataErr::Io { source, .. } => Some(source),
            DataErr::Prefetch(e) => Some(e),
            _ => None,
        }
    }
}
