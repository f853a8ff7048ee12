use core::fmt;

/// The error type for packet parsing.
///
/// None of these ever reach the user of the engine. A packet failing to parse is dropped and the
/// reason is only counted and traced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Error {
    /// The packet was shorter than its headers or length fields claim.
    Truncated,

    /// A checksum did not match.
    WrongChecksum,

    /// A protocol identifier or message type that we do not know.
    Unrecognized,

    /// A recognized packet that contradicts itself.
    ///
    /// Examples: a header length shorter than the minimal header; a UDP length field smaller than
    /// 8 bytes.
    Malformed,

    /// A valid packet using a feature that this stack deliberately omits, such as fragments.
    Unsupported,
}

/// The result type for packet parsing.
pub type Result<T> = core::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Truncated     => write!(f, "truncated packet"),
            Error::WrongChecksum => write!(f, "checksum error"),
            Error::Unrecognized  => write!(f, "unrecognized packet"),
            Error::Malformed     => write!(f, "malformed packet"),
            Error::Unsupported   => write!(f, "unsupported feature"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}
