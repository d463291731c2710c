
use core::fmt;

use thiserror::Error;

/// Which size field of an address range table was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SizeKind {
    /// The `segment_size` field.
    Segment,
    /// The `address_size` field.
    Address,
}

impl fmt::Display for SizeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SizeKind::Segment => "segment",
            SizeKind::Address => "address",
        })
    }
}

/// The address range data is invalid.
///
/// Every error is fatal to the decode that produced it. The binary format has
/// no resynchronization marker, so nothing decoded before the error should be
/// trusted either.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The buffer ended before a field could be read in full.
    #[error("{what}")]
    Truncated {
        what: &'static str,
        /// Offset of the read that ran past the end of the buffer.
        offset: usize,
    },
    /// A size field has a value with no defined field encoding.
    #[error("unsupported {kind} size {size}")]
    UnsupportedSize { kind: SizeKind, size: u8 },
}

pub type Result<T, E = Error> = core::result::Result<T, E>;
