//! Error type shared by both engines.

use core::fmt;

/// Errors raised when building a map or addressing one of its slots.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Error {
    /// Capacity (grid outer dimension or shard count) must be greater than 0.
    InvalidCapacity(usize),
    /// Load factor must be greater than 0.0 and less than or equal to 1.0.
    InvalidLoadFactor(f32),
    /// A slot index fell outside the dimension it addresses.
    IndexOutOfRange { index: usize, len: usize },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidCapacity(capacity) => {
                write!(f, "capacity [{}] must be greater than 0", capacity)
            }
            Error::InvalidLoadFactor(load_factor) => write!(
                f,
                "load factor [{}] must be greater than 0.0 and less than or equal to 1.0",
                load_factor
            ),
            Error::IndexOutOfRange { index, len } => write!(
                f,
                "index [{}] must be greater than or equal to 0 and less than [{}]",
                index, len
            ),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T, E = Error> = core::result::Result<T, E>;
