//! Error types.

use crate::{Length, Tag};
use core::{convert::Infallible, fmt};

/// Result type.
pub type Result<T> = core::result::Result<T, Error>;

/// Error type
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Error {
    /// Kind of error
    kind: ErrorKind,

    /// Position inside of message where error occurred
    position: Option<Length>,
}

impl Error {
    /// Create a new [`Error`]
    pub fn new(kind: ErrorKind, position: Length) -> Error {
        Error {
            kind,
            position: Some(position),
        }
    }

    /// Get the [`ErrorKind`] which occurred.
    pub fn kind(self) -> ErrorKind {
        self.kind
    }

    /// Get the position inside of the message where the error occurred.
    ///
    /// Positions count from the start of the buffer handed to the outermost decode.
    pub fn position(self) -> Option<Length> {
        self.position
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;

        if let Some(pos) = self.position {
            write!(f, " at BER byte {}", pos)?;
        }

        Ok(())
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Error {
        Error {
            kind,
            position: None,
        }
    }
}

impl From<Infallible> for Error {
    fn from(never: Infallible) -> Error {
        match never {}
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

#[cfg(feature = "std")]
impl std::error::Error for ErrorKind {}

/// Error type.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Operation failed due to previous error
    Failed,

    /// Identifier octets are truncated, overflow, or (DER) are not minimally encoded
    MalformedTag,

    /// Length octets are truncated, reserved, overflow, or (DER) are indefinite
    /// or not minimally encoded; or the length runs past the end of the input
    InvalidLength,

    /// A required value was expected but a different identifier was found
    TagMismatch {
        /// Tag the node expects
        expected: Tag,

        /// Actual tag encountered in the message
        actual: Tag,
    },

    /// No alternative of a CHOICE accepts the identifier found
    NoMatchingAlternative {
        /// Actual tag encountered in the message
        actual: Tag,
    },

    /// Incorrect content length for a given type
    Length {
        /// Tag of the value being decoded
        tag: Tag,
    },

    /// Content is valid BER but not canonically (DER) encoded
    Noncanonical {
        /// Tag of the value being decoded
        tag: Tag,
    },

    /// NULL with content octets
    NonEmptyNull,

    /// Character outside of the alphabet of a restricted string type
    InvalidCharacter {
        /// Tag of the string type
        tag: Tag,

        /// First offending character
        character: char,
    },

    /// Content is not valid UTF-8
    Utf8 {
        /// Tag of the string type
        tag: Tag,
    },

    /// Value violates its configured size constraint
    Size {
        /// Tag of the constrained value
        tag: Tag,

        /// Size of the offending value
        size: usize,
    },

    /// BIT STRING with a bad unused-bits count
    InvalidBitString,

    /// A required value has nothing to encode
    MissingValue {
        /// Tag of the value
        tag: Tag,
    },

    /// Undecoded trailing data at end of constructed content
    TrailingData {
        /// Length of the decoded data
        decoded: Length,

        /// Total length of the remaining data left in the buffer
        remaining: Length,
    },

    /// Unexpected end of input
    Truncated,

    /// Integer overflow occurred
    Overflow,

    /// Output buffer is too small for the encoded value
    Overlength,

    /// Encoded message is shorter than the expected length
    /// (i.e. an `Encodable` impl on a particular type has a buggy `encoded_length`)
    Underlength {
        /// Expected length
        expected: Length,

        /// Actual length
        actual: Length,
    },

    /// CHOICE encoded or read before an alternative was chosen
    ChoiceUnset,

    /// CHOICE alternative index out of range, or an alternative declared
    /// OPTIONAL or with a DEFAULT
    InvalidAlternative {
        /// Index of the alternative
        index: usize,
    },
}

impl ErrorKind {
    /// Annotate an [`ErrorKind`] with context about where it occurred,
    /// returning an error.
    pub fn at(self, position: Length) -> Error {
        Error::new(self, position)
    }

    /// Does this error say the next identifier is not one the node accepts?
    ///
    /// These are the only failures a CHOICE recovers from, by trying its next
    /// alternative.
    pub fn is_tag_mismatch(self) -> bool {
        matches!(
            self,
            ErrorKind::TagMismatch { .. } | ErrorKind::NoMatchingAlternative { .. }
        )
    }

    /// Is this a content-level ASN.1 error (a type constraint violated by
    /// otherwise well-framed TLVs)?
    pub fn is_asn1_error(self) -> bool {
        matches!(
            self,
            ErrorKind::NoMatchingAlternative { .. }
                | ErrorKind::Length { .. }
                | ErrorKind::Noncanonical { .. }
                | ErrorKind::NonEmptyNull
                | ErrorKind::InvalidCharacter { .. }
                | ErrorKind::Utf8 { .. }
                | ErrorKind::Size { .. }
                | ErrorKind::InvalidBitString
                | ErrorKind::MissingValue { .. }
                | ErrorKind::TrailingData { .. }
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Failed => write!(f, "operation failed"),
            ErrorKind::MalformedTag => write!(f, "malformed identifier octets"),
            ErrorKind::InvalidLength => write!(f, "invalid length octets"),
            ErrorKind::TagMismatch { expected, actual } => {
                write!(f, "unexpected tag: expected {}, got {}", expected, actual)
            }
            ErrorKind::NoMatchingAlternative { actual } => {
                write!(f, "no CHOICE alternative matches {}", actual)
            }
            ErrorKind::Length { tag } => write!(f, "incorrect length for {}", tag),
            ErrorKind::Noncanonical { tag } => write!(f, "{} is not canonically encoded", tag),
            ErrorKind::NonEmptyNull => write!(f, "NULL should not have content"),
            ErrorKind::InvalidCharacter { tag, character } => {
                write!(f, "{}: invalid character {:?}", tag, character)
            }
            ErrorKind::Utf8 { tag } => write!(f, "{}: invalid UTF-8", tag),
            ErrorKind::Size { tag, size } => {
                write!(f, "{}: size {} violates constraint", tag, size)
            }
            ErrorKind::InvalidBitString => write!(f, "invalid BIT STRING unused bits"),
            ErrorKind::MissingValue { tag } => write!(f, "no value to encode for {}", tag),
            ErrorKind::TrailingData { decoded, remaining } => {
                write!(
                    f,
                    "trailing data at end of constructed value: decoded {} bytes, {} bytes remaining",
                    decoded, remaining
                )
            }
            ErrorKind::Truncated => write!(f, "BER message is truncated"),
            ErrorKind::Overflow => write!(f, "integer overflow"),
            ErrorKind::Overlength => write!(f, "BER message is too long"),
            ErrorKind::Underlength { expected, actual } => write!(
                f,
                "BER message too short: expected {}, got {}",
                expected, actual
            ),
            ErrorKind::ChoiceUnset => write!(f, "no CHOICE alternative chosen"),
            ErrorKind::InvalidAlternative { index } => {
                write!(f, "invalid CHOICE alternative {}", index)
            }
        }
    }
}
