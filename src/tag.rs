use core::fmt;
use crate::{Decodable, Decoder, Encodable, Encoder, ErrorKind, Length, Result};

const CLASS_OFFSET: usize = 6;
const CONSTRUCTED_OFFSET: usize = 5;

/// Indicator bit for constructed form encoding (i.e. vs primitive form)
const CONSTRUCTED_FLAG: u8 = 1u8 << CONSTRUCTED_OFFSET;

/// Indicator bit for a tag number octet which is followed by another one
const NOT_LAST_TAG_OCTET_FLAG: u8 = 1u8 << 7;

/// Tag number bits of the first identifier octet announcing the high-tag-number form
const HIGH_TAG_NUMBER: u8 = 0x1F;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[repr(u8)]
/// Class of BER tag.
pub enum Class {
    Universal = 0b00,
    Application = 0b01,
    Context = 0b10,
    Private = 0b11,
}

impl Class {
    /// Class from the two most significant bits of an identifier octet.
    const fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0b00 => Class::Universal,
            0b01 => Class::Application,
            0b10 => Class::Context,
            _ => Class::Private,
        }
    }
}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Class::Universal => "UNIVERSAL",
            Class::Application => "APPLICATION",
            Class::Context => "CONTEXT",
            Class::Private => "PRIVATE",
        })
    }
}

/// Identifier of a BER-TLV data object.
///
/// Two tags are equal iff class, constructed bit and number all match.
#[derive(Clone, Copy, Eq, Hash, PartialEq)]
pub struct Tag {
    pub class: Class,
    pub constructed: bool,
    pub number: u32,
}

impl Tag {
    pub const END_OF_CONTENTS: Self = Self::universal(0x0);
    pub const BOOLEAN: Self = Self::universal(0x1);
    pub const INTEGER: Self = Self::universal(0x2);
    pub const BIT_STRING: Self = Self::universal(0x3);
    pub const OCTET_STRING: Self = Self::universal(0x4);
    pub const NULL: Self = Self::universal(0x5);
    pub const ENUMERATED: Self = Self::universal(0xA);
    pub const UTF8_STRING: Self = Self::universal(0xC);
    pub const SEQUENCE: Self = Self::universal(0x10).constructed();
    pub const SET: Self = Self::universal(0x11).constructed();
    pub const NUMERIC_STRING: Self = Self::universal(0x12);
    pub const PRINTABLE_STRING: Self = Self::universal(0x13);
    pub const IA5_STRING: Self = Self::universal(0x16);
    pub const VISIBLE_STRING: Self = Self::universal(0x1A);

    pub const fn new(class: Class, constructed: bool, number: u32) -> Self {
        Self { class, constructed, number }
    }

    pub const fn universal(number: u32) -> Self {
        Self { class: Class::Universal, constructed: false, number }
    }

    pub const fn application(number: u32) -> Self {
        Self { class: Class::Application, constructed: false, number }
    }

    pub const fn context(number: u32) -> Self {
        Self { class: Class::Context, constructed: false, number }
    }

    pub const fn private(number: u32) -> Self {
        Self { class: Class::Private, constructed: false, number }
    }

    pub const fn constructed(self) -> Self {
        let Self { class, constructed: _, number } = self;
        Self { class, constructed: true, number }
    }

    pub const fn primitive(self) -> Self {
        let Self { class, constructed: _, number } = self;
        Self { class, constructed: false, number }
    }

    /// Assert that this [`Tag`] matches the provided expected tag.
    ///
    /// On mismatch, returns an [`Error`](crate::Error) with [`ErrorKind::TagMismatch`].
    pub fn assert_eq(self, expected: Self) -> Result<Self> {
        if self == expected {
            Ok(self)
        } else {
            Err(ErrorKind::TagMismatch { expected, actual: self }.into())
        }
    }

    /// ASN.1 name of the universal types this crate knows about.
    pub fn universal_name(self) -> Option<&'static str> {
        if self.class != Class::Universal {
            return None;
        }
        Some(match self.number {
            0x0 => "END OF CONTENTS",
            0x1 => "BOOLEAN",
            0x2 => "INTEGER",
            0x3 => "BIT STRING",
            0x4 => "OCTET STRING",
            0x5 => "NULL",
            0xA => "ENUMERATED",
            0xC => "UTF8String",
            0x10 => "SEQUENCE",
            0x11 => "SET",
            0x12 => "NumericString",
            0x13 => "PrintableString",
            0x16 => "IA5String",
            0x1A => "VisibleString",
            _ => return None,
        })
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.universal_name() {
            Some(name) => f.write_str(name),
            None => write!(f, "[{} {}]", self.class, self.number),
        }
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Tag(class = {:?}, constructed = {}, number = {})",
            self.class, self.constructed, self.number
        )
    }
}

impl Encodable for Tag {
    fn encoded_length(&self) -> Result<Length> {
        let mut length = 1u8;
        if self.number >= HIGH_TAG_NUMBER as u32 {
            let mut number = self.number;
            loop {
                length += 1;
                number >>= 7;
                if number == 0 {
                    break;
                }
            }
        }
        Ok(length.into())
    }

    fn encode(&self, encoder: &mut Encoder<'_>) -> Result<()> {
        let first_byte =
            ((self.class as u8) << CLASS_OFFSET) | ((self.constructed as u8) << CONSTRUCTED_OFFSET);

        if self.number < HIGH_TAG_NUMBER as u32 {
            return encoder.byte(first_byte | self.number as u8);
        }

        encoder.byte(first_byte | HIGH_TAG_NUMBER)?;
        // base-128, most significant group first
        let groups = self.encoded_length()?.to_usize() - 1;
        for index in (0..groups).rev() {
            let group = ((self.number >> (7 * index)) & 0x7F) as u8;
            if index > 0 {
                encoder.byte(NOT_LAST_TAG_OCTET_FLAG | group)?;
            } else {
                encoder.byte(group)?;
            }
        }
        Ok(())
    }
}

impl Decodable<'_> for Tag {
    fn decode(decoder: &mut Decoder<'_>) -> Result<Self> {
        let first_byte = decoder
            .byte()
            .or_else(|_| decoder.error(ErrorKind::MalformedTag))?;
        let class = Class::from_bits(first_byte >> CLASS_OFFSET);
        let constructed = first_byte & CONSTRUCTED_FLAG != 0;
        let strict = decoder.mode().is_strict();

        let number = match first_byte & HIGH_TAG_NUMBER {
            HIGH_TAG_NUMBER => {
                let mut number = 0u32;
                let mut leading = true;
                loop {
                    let byte = decoder
                        .byte()
                        .or_else(|_| decoder.error(ErrorKind::MalformedTag))?;
                    // padding group, only BER tolerates it
                    if leading && byte == NOT_LAST_TAG_OCTET_FLAG && strict {
                        return decoder.error(ErrorKind::MalformedTag);
                    }
                    if number > u32::MAX >> 7 {
                        return decoder.error(ErrorKind::MalformedTag);
                    }
                    number = (number << 7) | u32::from(byte & !NOT_LAST_TAG_OCTET_FLAG);
                    leading = false;
                    if byte & NOT_LAST_TAG_OCTET_FLAG == 0 {
                        break;
                    }
                }
                if strict && number < HIGH_TAG_NUMBER as u32 {
                    return decoder.error(ErrorKind::MalformedTag);
                }
                number
            }
            number => number as u32,
        };
        Ok(Self { class, constructed, number })
    }
}


#[cfg(test)]
mod tests {
    use crate::{Class, Decodable, Encodable, ErrorKind, Mode, Tag};

    #[test]
    fn reconstruct() {
        let mut buf = [0u8; 32];

        let tag = Tag::universal(30);
        let encoded = tag.encode_to_slice(&mut buf).unwrap();
        assert_eq!(encoded, &[0x1E]);
        let tag2 = Tag::from_bytes(encoded).unwrap();
        assert_eq!(tag, tag2);

        let tag = Tag::universal(31);
        let encoded = tag.encode_to_slice(&mut buf).unwrap();
        assert_eq!(encoded, &[0x1F, 0x1F]);
        let tag2 = Tag::from_bytes(encoded).unwrap();
        assert_eq!(tag, tag2);

        let tag = Tag::universal(0xAA);
        let encoded = tag.encode_to_slice(&mut buf).unwrap();
        assert_eq!(encoded, &[0x1F, 0x81, 0x2A]);
        let tag2 = Tag::from_bytes(encoded).unwrap();
        assert_eq!(tag, tag2);

        let tag = Tag::context(16384);
        let encoded = tag.encode_to_slice(&mut buf).unwrap();
        assert_eq!(encoded, &[0x9F, 0x81, 0x80, 0x00]);
        let tag2 = Tag::from_bytes(encoded).unwrap();
        assert_eq!(tag, tag2);

        let tag = Tag::universal(0x10).constructed();
        let encoded = tag.encode_to_slice(&mut buf).unwrap();
        assert_eq!(encoded, &[super::CONSTRUCTED_FLAG + 0x10]);
        let tag2 = Tag::from_bytes(encoded).unwrap();
        assert_eq!(tag, tag2);
    }

    #[test]
    fn every_class_and_form() {
        let mut buf = [0u8; 8];
        for class in [Class::Universal, Class::Application, Class::Context, Class::Private] {
            for constructed in [false, true] {
                for number in [0, 1, 30, 31, 127, 128, 16383, 16384, u32::MAX] {
                    let tag = Tag::new(class, constructed, number);
                    let encoded = tag.encode_to_slice(&mut buf).unwrap();
                    assert_eq!(encoded.len(), tag.encoded_length().unwrap().to_usize());
                    assert_eq!(Tag::from_bytes(encoded).unwrap(), tag);
                }
            }
        }
    }

    #[test]
    fn truncated() {
        assert_eq!(Tag::from_bytes(&[]).unwrap_err().kind(), ErrorKind::MalformedTag);
        assert_eq!(Tag::from_bytes(&[0x1F]).unwrap_err().kind(), ErrorKind::MalformedTag);
        assert_eq!(Tag::from_bytes(&[0x1F, 0x81]).unwrap_err().kind(), ErrorKind::MalformedTag);
    }

    #[test]
    fn noncanonical() {
        // padded tag number
        let padded = [0x9F, 0x80, 0x2A];
        assert_eq!(Tag::from_bytes(&padded).unwrap_err().kind(), ErrorKind::MalformedTag);
        assert_eq!(Tag::from_bytes_with(&padded, Mode::Ber).unwrap(), Tag::context(0x2A));

        // high-tag-number form for a number that fits in the first octet
        let high = [0x1F, 0x05];
        assert_eq!(Tag::from_bytes(&high).unwrap_err().kind(), ErrorKind::MalformedTag);
        assert_eq!(Tag::from_bytes_with(&high, Mode::Ber).unwrap(), Tag::NULL);
    }

    #[test]
    fn overflow() {
        let bytes = [0x1F, 0x90, 0x80, 0x80, 0x80, 0x00];
        assert_eq!(Tag::from_bytes(&bytes).unwrap_err().kind(), ErrorKind::MalformedTag);
    }

    #[test]
    fn display() {
        assert_eq!(alloc::format!("{}", Tag::SEQUENCE), "SEQUENCE");
        assert_eq!(alloc::format!("{}", Tag::context(3)), "[CONTEXT 3]");
        assert_eq!(alloc::format!("{}", Tag::universal(99)), "[UNIVERSAL 99]");
    }
}
