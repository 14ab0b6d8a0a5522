use crate::{Encodable, ErrorKind, Length, Result};
use core::convert::TryInto;

/// BER-TLV encoder.
#[derive(Debug)]
pub struct Encoder<'a> {
    /// Buffer into which BER-TLV-encoded message is written
    bytes: Option<&'a mut [u8]>,

    /// Total number of bytes written to buffer so far
    position: Length,
}

impl<'a> Encoder<'a> {
    /// Create a new encoder with the given byte slice as a backing buffer.
    pub fn new(bytes: &'a mut [u8]) -> Self {
        Self {
            bytes: Some(bytes),
            position: Length::zero(),
        }
    }

    /// Encode a value which impls the [`Encodable`] trait.
    pub fn encode<T: Encodable + ?Sized>(&mut self, encodable: &T) -> Result<()> {
        if self.is_failed() {
            self.error(ErrorKind::Failed)?;
        }

        encodable.encode(self).map_err(|e| {
            self.bytes.take();
            e
        })
    }

    /// Return an error with the given [`ErrorKind`], annotating it with
    /// context about where the error occurred.
    pub fn error<T>(&mut self, kind: ErrorKind) -> Result<T> {
        self.bytes.take();
        Err(kind.at(self.position))
    }

    /// Did the decoding operation fail due to an error?
    pub fn is_failed(&self) -> bool {
        self.bytes.is_none()
    }

    /// Finish encoding to the buffer, returning a slice containing the data
    /// written to the buffer.
    pub fn finish(self) -> Result<&'a [u8]> {
        let position = self.position;

        match self.bytes {
            Some(bytes) => bytes
                .get(..self.position.into())
                .ok_or_else(|| ErrorKind::Truncated.at(position)),
            None => Err(ErrorKind::Failed.at(position)),
        }
    }

    /// Reserve exactly `length` bytes and let `f` fill them through a nested encoder.
    ///
    /// Fails if `f` writes fewer bytes than announced.
    pub(crate) fn nested<F>(&mut self, length: Length, f: F) -> Result<()>
    where
        F: FnOnce(&mut Encoder<'_>) -> Result<()>,
    {
        let mut nested_encoder = Encoder::new(self.reserve(length)?);
        f(&mut nested_encoder)?;

        let actual = nested_encoder.finish()?.len();
        if actual == length.to_usize() {
            Ok(())
        } else {
            self.error(ErrorKind::Underlength {
                expected: length,
                actual: actual.try_into()?,
            })
        }
    }

    /// Encode a single byte into the backing buffer.
    pub(crate) fn byte(&mut self, byte: u8) -> Result<()> {
        match self.reserve(1u8)?.first_mut() {
            Some(b) => {
                *b = byte;
                Ok(())
            }
            None => self.error(ErrorKind::Truncated),
        }
    }

    /// Encode the provided byte slice into the backing buffer.
    pub(crate) fn bytes(&mut self, slice: &[u8]) -> Result<()> {
        self.reserve(slice.len())?.copy_from_slice(slice);
        Ok(())
    }

    /// Reserve a portion of the internal buffer, updating the internal cursor
    /// position and returning a mutable slice.
    fn reserve(&mut self, len: impl TryInto<Length>) -> Result<&mut [u8]> {
        let len = len
            .try_into()
            .or_else(|_| self.error(ErrorKind::Overflow))?;

        if len > self.remaining_len()? {
            self.error(ErrorKind::Overlength)?;
        }

        let end = (self.position + len).or_else(|e| self.error(e.kind()))?;
        let range = self.position.to_usize()..end.to_usize();
        let position = self.position;

        // the remaining length was checked above, so only a tainted buffer misses here
        match self.bytes.as_mut().and_then(|bytes| bytes.get_mut(range)) {
            Some(slice) => {
                self.position = end;
                Ok(slice)
            }
            None => Err(ErrorKind::Failed.at(position)),
        }
    }

    /// Get the size of the buffer in bytes.
    fn buffer_len(&self) -> Result<Length> {
        self.bytes
            .as_ref()
            .map(|bytes| bytes.len())
            .ok_or_else(|| ErrorKind::Failed.at(self.position))
            .and_then(TryInto::try_into)
    }

    /// Get the number of bytes still remaining in the buffer.
    fn remaining_len(&self) -> Result<Length> {
        self.buffer_len()?
            .to_usize()
            .checked_sub(self.position.into())
            .ok_or_else(|| ErrorKind::Truncated.at(self.position))
            .and_then(TryInto::try_into)
    }
}

#[cfg(test)]
mod tests {
    use super::Encoder;
    use crate::{Encodable, ErrorKind, Integer, Length};

    #[test]
    fn overlength_message() {
        let mut buffer = [0u8; 2];
        let err = Integer::new()
            .with_value(1000)
            .encode_to_slice(&mut buffer)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Overlength);
    }

    #[test]
    fn nested_underlength() {
        let mut buffer = [0u8; 4];
        let mut encoder = Encoder::new(&mut buffer);
        let err = encoder
            .nested(Length::from(3u8), |nested| nested.byte(0x2A))
            .unwrap_err();
        assert_eq!(
            err.kind(),
            ErrorKind::Underlength {
                expected: Length::from(3u8),
                actual: Length::from(1u8)
            }
        );
        assert!(encoder.is_failed());
    }
}
