//! Error type shared by every module of the crate.

use crate::datatype::DataType;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("image is not forged")]
    ImageNotForged,
    #[error("image is already forged")]
    ImageNotRaw,
    #[error("dimensionalities don't match (expected {expected}, got {actual})")]
    DimensionalityMismatch { expected: usize, actual: usize },
    #[error("sizes don't match")]
    SizesMismatch,
    #[error("number of tensor elements doesn't match (expected {expected}, got {actual})")]
    TensorElementsMismatch { expected: usize, actual: usize },
    #[error("array parameter has the wrong number of elements (expected {expected}, got {actual})")]
    ArrayParameterWrongLength { expected: usize, actual: usize },
    #[error("index {index} out of range for size {size}")]
    IndexOutOfRange { index: isize, size: usize },
    #[error("coordinates out of range")]
    CoordinateOutOfRange,
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("data type {0} not supported")]
    DataTypeNotSupported(DataType),
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),
    #[error("image size exceeds the addressable limit")]
    SizeExceedsLimit,
    #[error("failed to allocate {0} bytes")]
    AllocationFailed(usize),
}

impl Error {
    pub(crate) fn parameter(msg: impl Into<String>) -> Self {
        Error::InvalidParameter(msg.into())
    }

    pub(crate) fn geometry(msg: impl Into<String>) -> Self {
        Error::InvalidGeometry(msg.into())
    }
}

/// Fails with [`Error::ArrayParameterWrongLength`] unless `actual == expected`.
pub(crate) fn check_length(actual: usize, expected: usize) -> Result<()> {
    if actual != expected {
        return Err(Error::ArrayParameterWrongLength { expected, actual });
    }
    Ok(())
}

/// Expands a per-dimension parameter: empty means `default` everywhere, a
/// single value is repeated, otherwise the length must be `n`.
pub(crate) fn array_use_parameter<T: Clone>(array: &[T], n: usize, default: T) -> Result<Vec<T>> {
    match array.len() {
        0 => Ok(vec![default; n]),
        1 => Ok(vec![array[0].clone(); n]),
        len => {
            check_length(len, n)?;
            Ok(array.to_vec())
        }
    }
}
