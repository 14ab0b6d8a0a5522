use core::convert::TryInto;
use crate::{Decodable, ErrorKind, Header, Length, Mode, Result, Tag};

/// End-of-Contents octets terminating indefinite length content.
const END_OF_CONTENTS: [u8; 2] = [0x00, 0x00];

/// BER decoder.
///
/// A cursor over the input buffer. Content of constructed values is decoded
/// by nested decoders sharing the same buffer, so positions (and those reported
/// in errors) always count from the start of the outermost input.
#[derive(Clone, Debug)]
pub struct Decoder<'a> {
    /// Byte slice being decoded.
    ///
    /// In the event an error was previously encountered this will be set to
    /// `None` to prevent further decoding while in a bad state.
    bytes: Option<&'a [u8]>,

    /// Position within the decoded slice.
    position: Length,

    /// Position past the last byte this decoder may read.
    end: Length,

    /// Content runs up to an End-of-Contents marker rather than up to `end`.
    indefinite: bool,

    mode: Mode,
}

impl<'a> Decoder<'a> {
    /// Create a new decoder for the given byte slice.
    pub fn new(bytes: &'a [u8], mode: Mode) -> Self {
        // inputs beyond `Length::MAX` are only decoded up to that point
        let end = bytes.len().try_into().unwrap_or(Length::MAX);
        Self {
            bytes: Some(bytes),
            position: Length::zero(),
            end,
            indefinite: false,
            mode,
        }
    }

    /// The parse mode this decoder checks encodings against.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Number of bytes consumed from the start of the input.
    pub fn position(&self) -> Length {
        self.position
    }

    /// Decode a value which impls the [`Decodable`] trait.
    pub fn decode<T: Decodable<'a>>(&mut self) -> Result<T> {
        if self.is_failed() {
            self.error(ErrorKind::Failed)?;
        }

        T::decode(self).map_err(|e| {
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

    /// Return an error with the given [`ErrorKind`] at an earlier `position`,
    /// typically the start of the value found faulty.
    pub(crate) fn error_at<T>(&mut self, kind: ErrorKind, position: Length) -> Result<T> {
        self.bytes.take();
        Err(kind.at(position))
    }

    /// Did the decoding operation fail due to an error?
    pub fn is_failed(&self) -> bool {
        self.bytes.is_none()
    }

    /// Finish decoding, returning the given value if there is no
    /// remaining data, or an error otherwise
    pub fn finish<T>(self, value: T) -> Result<T> {
        if self.is_failed() {
            Err(ErrorKind::Failed.at(self.position))
        } else if !self.is_finished() {
            Err(ErrorKind::TrailingData {
                decoded: self.position,
                remaining: self.remaining_len()?,
            }
            .at(self.position))
        } else {
            Ok(value)
        }
    }

    /// Have we decoded all of the bytes in this [`Decoder`]?
    ///
    /// For indefinite length content, this is the case when the next bytes are
    /// the End-of-Contents marker, or when the input ran out before it.
    ///
    /// Returns `false` if a fatal error has occurred.
    pub fn is_finished(&self) -> bool {
        self.remaining()
            .map(|rem| rem.is_empty() || (self.indefinite && rem.starts_with(&END_OF_CONTENTS)))
            .unwrap_or(false)
    }

    /// Tag of the next TLV, without consuming anything.
    ///
    /// Returns `None` at the end of the current content.
    pub fn peek_tag(&self) -> Result<Option<Tag>> {
        if self.is_failed() {
            return Err(ErrorKind::Failed.at(self.position));
        }
        if self.is_finished() {
            return Ok(None);
        }
        let mut probe = self.clone();
        probe.decode().map(Some)
    }

    /// Decode the content of a constructed value with a nested decoder limited
    /// to that content, passing it to the provided [`FnOnce`].
    ///
    /// All of the content has to be consumed. Indefinite length content (`None`)
    /// is expected to be followed by End-of-Contents, which is consumed as well.
    pub(crate) fn nested<F, R>(&mut self, length: Option<Length>, f: F) -> Result<R>
    where
        F: FnOnce(&mut Decoder<'a>) -> Result<R>,
    {
        if self.is_failed() {
            self.error(ErrorKind::Failed)?;
        }

        let end = match length {
            Some(length) => {
                if length > self.remaining_len()? {
                    return self.error(ErrorKind::InvalidLength);
                }
                (self.position + length).or_else(|e| self.error(e.kind()))?
            }
            None => self.end,
        };

        let mut nested_decoder = Decoder {
            bytes: self.bytes,
            position: self.position,
            end,
            indefinite: length.is_none(),
            mode: self.mode,
        };

        let result = f(&mut nested_decoder).and_then(|result| {
            nested_decoder.end_of_contents()?;
            Ok(result)
        });

        match result {
            Ok(result) => {
                self.position = nested_decoder.position;
                Ok(result)
            }
            Err(e) => {
                self.bytes.take();
                Err(e)
            }
        }
    }

    /// Obtain the content of a primitive value.
    pub(crate) fn content(&mut self, length: Option<Length>) -> Result<&'a [u8]> {
        match length {
            Some(length) => self
                .bytes(length)
                .or_else(|_| self.error(ErrorKind::InvalidLength)),
            None => self.error(ErrorKind::InvalidLength),
        }
    }

    /// Obtain the raw content of a value, whichever its length form.
    ///
    /// Indefinite length content is walked TLV by TLV to find its End-of-Contents,
    /// which is not part of the returned slice.
    pub(crate) fn raw_content(&mut self, length: Option<Length>) -> Result<&'a [u8]> {
        match length {
            Some(_) => self.content(length),
            None => self.nested(None, |content| {
                let start = content.position;
                while !content.is_finished() {
                    content.skip()?;
                }
                content.consumed_since(start)
            }),
        }
    }

    /// Skip over the next TLV, including nested indefinite length content.
    pub(crate) fn skip(&mut self) -> Result<()> {
        let header: Header = self.decode()?;
        match header.length {
            Some(length) => self.content(Some(length)).map(|_| ()),
            None => self.nested(None, |content| {
                while !content.is_finished() {
                    content.skip()?;
                }
                Ok(())
            }),
        }
    }

    /// Decode a single byte, updating the internal cursor.
    pub(crate) fn byte(&mut self) -> Result<u8> {
        match self.bytes(1u8)? {
            [byte] => Ok(*byte),
            _ => self.error(ErrorKind::Truncated),
        }
    }

    /// Obtain a slice of bytes of the given length from the current cursor
    /// position, or return an error if we have insufficient data.
    pub(crate) fn bytes(&mut self, len: impl TryInto<Length>) -> Result<&'a [u8]> {
        if self.is_failed() {
            self.error(ErrorKind::Failed)?;
        }

        let len = len
            .try_into()
            .or_else(|_| self.error(ErrorKind::Overflow))?;

        let result = self
            .remaining()?
            .get(..len.to_usize())
            .ok_or(ErrorKind::Truncated)?;

        self.position = (self.position + len)?;
        Ok(result)
    }

    /// Consume the End-of-Contents marker closing indefinite length content,
    /// or check that definite length content has been fully decoded.
    fn end_of_contents(&mut self) -> Result<()> {
        if !self.indefinite {
            if !self.is_finished() {
                let remaining = self.remaining_len()?;
                return self.error(ErrorKind::TrailingData {
                    decoded: self.position,
                    remaining,
                });
            }
            return Ok(());
        }

        let remaining = self.remaining()?;
        if remaining.starts_with(&END_OF_CONTENTS) {
            trace!("end of contents at {}", self.position);
            self.position = (self.position + END_OF_CONTENTS.len())?;
            Ok(())
        } else if remaining.is_empty() {
            // input ran out before the marker
            self.error(ErrorKind::InvalidLength)
        } else {
            let remaining = self.remaining_len()?;
            self.error(ErrorKind::TrailingData {
                decoded: self.position,
                remaining,
            })
        }
    }

    /// Bytes consumed between `start` and the current position.
    fn consumed_since(&self, start: Length) -> Result<&'a [u8]> {
        self.bytes
            .and_then(|b| b.get(start.to_usize()..self.position.to_usize()))
            .ok_or_else(|| ErrorKind::Truncated.at(self.position))
    }

    /// Obtain the remaining bytes in this decoder from the current cursor
    /// position.
    fn remaining(&self) -> Result<&'a [u8]> {
        self.bytes
            .and_then(|b| b.get(self.position.to_usize()..self.end.to_usize()))
            .ok_or_else(|| ErrorKind::Truncated.at(self.position))
    }

    /// Get the number of bytes still remaining in the buffer.
    fn remaining_len(&self) -> Result<Length> {
        self.remaining()?.len().try_into()
    }
}

#[cfg(test)]
mod tests {
    use super::Decoder;
    use crate::{ErrorKind, Header, Length, Mode, Tag};
    use hex_literal::hex;

    #[test]
    fn truncated_message() {
        let mut decoder = Decoder::new(&[], Mode::Der);
        let err = decoder.byte().err().unwrap();
        assert_eq!(ErrorKind::Truncated, err.kind());
    }

    #[test]
    fn content_past_end() {
        let mut decoder = Decoder::new(&hex!("04 05 01 02"), Mode::Der);
        let header: Header = decoder.decode().unwrap();
        let err = decoder.content(header.length).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidLength);
        assert!(decoder.is_failed());
    }

    #[test]
    fn trailing_data() {
        let bytes = hex!("30 04 05 00 05 00");
        let mut decoder = Decoder::new(&bytes, Mode::Der);
        let header: Header = decoder.decode().unwrap();
        let err = decoder
            .nested(header.length, |content| content.skip())
            .unwrap_err();
        assert_eq!(
            err.kind(),
            ErrorKind::TrailingData {
                decoded: Length::from(4u8),
                remaining: Length::from(2u8)
            }
        );
        assert_eq!(err.position(), Some(Length::from(4u8)));
    }

    #[test]
    fn peek_does_not_consume() {
        let decoder = Decoder::new(&hex!("02 01 05"), Mode::Der);
        assert_eq!(decoder.peek_tag().unwrap(), Some(Tag::INTEGER));
        assert_eq!(decoder.position(), Length::zero());

        let decoder = Decoder::new(&[], Mode::Der);
        assert_eq!(decoder.peek_tag().unwrap(), None);
    }

    #[test]
    fn indefinite_content() {
        let bytes = hex!("30 80 30 80 05 00 00 00 02 01 07 00 00 ff");
        let mut decoder = Decoder::new(&bytes, Mode::Ber);
        let header: Header = decoder.decode().unwrap();
        assert_eq!(header.length, None);
        let raw = decoder.raw_content(header.length).unwrap();
        assert_eq!(raw, &hex!("30 80 05 00 00 00 02 01 07"));
        assert_eq!(decoder.position(), Length::from(13u8));
    }

    #[test]
    fn unterminated_indefinite_content() {
        let bytes = hex!("30 80 02 01 07");
        let mut decoder = Decoder::new(&bytes, Mode::Ber);
        let header: Header = decoder.decode().unwrap();
        let err = decoder.raw_content(header.length).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidLength);
    }
}
