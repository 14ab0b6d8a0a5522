//! Length calculations for encoded BER values

use crate::{Decodable, Decoder, Encodable, Encoder, Error, ErrorKind, Result};
use core::{convert::TryFrom, fmt, ops::Add};

/// Length octet announcing the indefinite form (BER only).
const INDEFINITE: u8 = 0x80;

/// Reserved first length octet.
const RESERVED: u8 = 0xFF;

/// BER-encoded length.
///
/// - Lengths up to 127 are encoded in a single byte (short form).
/// - Longer lengths are encoded as `0x80 | k` followed by `k` big-endian bytes
///   (long form), with `k` at most 126.
/// - `0x80` alone announces indefinite length content terminated by
///   End-of-Contents; decoding yields `None` for it, see the
///   `Decodable` impl for `Option<Length>`.
#[derive(Copy, Clone, Debug, Default, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct Length(u32);

impl Length {
    /// Largest length supported by this crate.
    pub const MAX: Length = Length(u32::MAX);

    /// Return a length of `0`.
    pub const fn zero() -> Self {
        Length(0)
    }

    /// Create a length from a `u32`.
    pub const fn new(length: u32) -> Self {
        Length(length)
    }

    /// Convert length to `usize`
    pub fn to_usize(self) -> usize {
        self.0 as usize
    }
}

impl Add for Length {
    type Output = Result<Self>;

    fn add(self, other: Self) -> Result<Self> {
        self.0
            .checked_add(other.0)
            .map(Length)
            .ok_or_else(|| ErrorKind::Overflow.into())
    }
}

impl Add<u8> for Length {
    type Output = Result<Self>;

    fn add(self, other: u8) -> Result<Self> {
        self + Length::from(other)
    }
}

impl Add<usize> for Length {
    type Output = Result<Self>;

    fn add(self, other: usize) -> Result<Self> {
        self + Length::try_from(other)?
    }
}

impl Add<Length> for Result<Length> {
    type Output = Self;

    fn add(self, other: Length) -> Self {
        self? + other
    }
}

impl From<u8> for Length {
    fn from(len: u8) -> Length {
        Length(len as u32)
    }
}

impl From<u16> for Length {
    fn from(len: u16) -> Length {
        Length(len as u32)
    }
}

impl From<u32> for Length {
    fn from(len: u32) -> Length {
        Length(len)
    }
}

impl From<Length> for u32 {
    fn from(len: Length) -> u32 {
        len.0
    }
}

impl From<Length> for usize {
    fn from(len: Length) -> usize {
        len.to_usize()
    }
}

impl TryFrom<usize> for Length {
    type Error = Error;

    fn try_from(len: usize) -> Result<Length> {
        u32::try_from(len)
            .map(Length)
            .map_err(|_| ErrorKind::Overflow.into())
    }
}

/// Length octets, `None` being the indefinite form.
impl Decodable<'_> for Option<Length> {
    fn decode(decoder: &mut Decoder<'_>) -> Result<Option<Length>> {
        let first = decoder
            .byte()
            .or_else(|_| decoder.error(ErrorKind::InvalidLength))?;

        match first {
            0..=0x7F => Ok(Some(first.into())),
            INDEFINITE if decoder.mode().allows_indefinite() => Ok(None),
            INDEFINITE | RESERVED => decoder.error(ErrorKind::InvalidLength),
            _ => {
                let octets = decoder
                    .bytes(first & !INDEFINITE)
                    .or_else(|_| decoder.error(ErrorKind::InvalidLength))?;

                let strict = decoder.mode().is_strict();
                if strict && octets.first() == Some(&0) {
                    return decoder.error(ErrorKind::InvalidLength);
                }

                let mut length = 0u32;
                for &octet in octets {
                    if length > u32::MAX >> 8 {
                        return decoder.error(ErrorKind::InvalidLength);
                    }
                    length = (length << 8) | u32::from(octet);
                }

                // the short form would have done
                if strict && length <= 0x7F {
                    return decoder.error(ErrorKind::InvalidLength);
                }

                Ok(Some(Length(length)))
            }
        }
    }
}

/// Definite length octets only.
impl Decodable<'_> for Length {
    fn decode(decoder: &mut Decoder<'_>) -> Result<Length> {
        match Option::<Length>::decode(decoder)? {
            Some(length) => Ok(length),
            None => decoder.error(ErrorKind::InvalidLength),
        }
    }
}

impl Encodable for Length {
    fn encoded_length(&self) -> Result<Length> {
        match self.0 {
            0..=0x7F => Ok(Length(1)),
            0x80..=0xFF => Ok(Length(2)),
            0x100..=0xFFFF => Ok(Length(3)),
            0x1_0000..=0xFF_FFFF => Ok(Length(4)),
            _ => Ok(Length(5)),
        }
    }

    fn encode(&self, encoder: &mut Encoder<'_>) -> Result<()> {
        match self.0 {
            0..=0x7F => encoder.byte(self.0 as u8),
            _ => {
                let be_len = self.0.to_be_bytes();
                let octets = &be_len[(self.0.leading_zeros() / 8) as usize..];
                encoder.byte(INDEFINITE | octets.len() as u8)?;
                encoder.bytes(octets)
            }
        }
    }
}

impl fmt::Display for Length {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
