//! BER-TLV headers.

use crate::{Decodable, Decoder, Encodable, Encoder, ErrorKind, Length, Result, Tag};

/// BER-TLV headers: tag + length component of TLV-encoded values
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) struct Header {
    /// Tag representing the type of the encoded value
    pub tag: Tag,

    /// Length of the encoded value, `None` for indefinite length content
    pub length: Option<Length>,
}

impl Header {
    /// Create a new [`Header`] with a definite length.
    pub fn definite(tag: Tag, length: Length) -> Self {
        Self { tag, length: Some(length) }
    }
}

impl<'a> Decodable<'a> for Header {
    fn decode(decoder: &mut Decoder<'a>) -> Result<Header> {
        let tag = Tag::decode(decoder)?;
        let length = Option::<Length>::decode(decoder)?;

        // only constructed content can be framed by End-of-Contents
        if length.is_none() && !tag.constructed {
            return decoder.error(ErrorKind::InvalidLength);
        }

        Ok(Self { tag, length })
    }
}

impl Encodable for Header {
    fn encoded_length(&self) -> Result<Length> {
        match self.length {
            Some(length) => self.tag.encoded_length()? + length.encoded_length()?,
            // encoding is always definite
            None => Err(ErrorKind::InvalidLength.into()),
        }
    }

    fn encode(&self, encoder: &mut Encoder<'_>) -> Result<()> {
        match self.length {
            Some(length) => {
                self.tag.encode(encoder)?;
                length.encode(encoder)
            }
            None => encoder.error(ErrorKind::InvalidLength),
        }
    }
}
