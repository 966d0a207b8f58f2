use thiserror::Error;

/// Errors crossing the library boundary. Every variant carries the public
/// method that raised it; no operation that returns an error leaves its
/// receiver partially mutated.
#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum Error {
    #[error("{method}: space dimensions are incompatible ({lhs_dim} vs {rhs_dim})")]
    DimensionIncompatible {
        method: &'static str,
        lhs_dim: usize,
        rhs_dim: usize,
    },

    #[error("{method}: {reason}")]
    LengthError {
        method: &'static str,
        reason: String,
    },

    #[error("{method}: {reason}")]
    InvalidArgument {
        method: &'static str,
        reason: String,
    },

    #[error("{method}: internal consistency failure")]
    RuntimeError { method: &'static str },

    #[error("{method}: abandoned by the registered handler")]
    Abandoned { method: &'static str },
}

impl Error {
    pub fn dimension_incompatible(method: &'static str, lhs_dim: usize, rhs_dim: usize) -> Self {
        Error::DimensionIncompatible {
            method,
            lhs_dim,
            rhs_dim,
        }
    }

    pub fn length(method: &'static str, reason: impl Into<String>) -> Self {
        Error::LengthError {
            method,
            reason: reason.into(),
        }
    }

    pub fn invalid_argument(method: &'static str, reason: impl Into<String>) -> Self {
        Error::InvalidArgument {
            method,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// The largest representable space dimension. One homogeneous slot and one
/// epsilon slot must still fit in a row.
pub const fn max_space_dimension() -> usize {
    usize::MAX / 2 - 2
}

/// Guards a dimension computation against overflowing the representable
/// range.
pub fn check_space_dimension(method: &'static str, dim: usize) -> Result<usize> {
    if dim > max_space_dimension() {
        Err(Error::length(method, "exceeds the maximum space dimension"))
    } else {
        Ok(dim)
    }
}

pub fn check_same_dimension(method: &'static str, lhs: usize, rhs: usize) -> Result<()> {
    if lhs == rhs {
        Ok(())
    } else {
        Err(Error::dimension_incompatible(method, lhs, rhs))
    }
}
