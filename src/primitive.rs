//! Primitive types: values without sub-structure.
//!
//! A [`Primitive`] node handles framing, tagging, OPTIONAL/DEFAULT and size
//! constraints; its [`Kind`] only turns a value into content octets and back.

use alloc::{string::String, vec, vec::Vec};
use core::{convert::TryInto, fmt, marker::PhantomData};

use crate::node::{
    decode_framed, encode_framed, framed_length, impl_options_builders, summarize_options,
};
use crate::{Decoder, Encodable, Encoder, ErrorKind, Length, Mode, Options, Result, Tag, Value};

/// Content encoding of one primitive ASN.1 type.
///
/// New primitive types are added by implementing this trait; everything else
/// comes with [`Primitive`].
pub trait Kind: Copy + fmt::Debug + Eq {
    /// Logical value.
    type Value: Clone + fmt::Debug + Eq;

    /// Universal tag of the type.
    const TAG: Tag;

    /// ASN.1 name of the type.
    const NAME: &'static str;

    /// Whether a value says anything: summaries show it, and it puts an
    /// enclosing OPTIONAL sequence on the wire. NULL has nothing to say.
    const DESCRIBED: bool = true;

    /// Value of a freshly constructed node.
    fn initial() -> Option<Self::Value> {
        None
    }

    /// Size of a value as seen by [`Size`] constraints.
    fn size(value: &Self::Value) -> usize;

    fn content_length(value: &Self::Value) -> Result<Length>;

    /// Write the content octets of `value`, rejecting values the type cannot hold.
    fn encode_content(value: &Self::Value, encoder: &mut Encoder<'_>) -> Result<()>;

    /// Read a value from content octets.
    fn decode_content(content: &[u8], mode: Mode) -> Result<Self::Value>;

    fn describe(value: &Self::Value, f: &mut fmt::Formatter<'_>) -> fmt::Result;
}

/// Size constraint of a primitive value.
///
/// Measured in octets for OCTET STRING, characters for strings and bits for
/// BIT STRING.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Size {
    Exactly(usize),
    AtMost(usize),
}

impl Size {
    pub fn admits(self, size: usize) -> bool {
        match self {
            Size::Exactly(expected) => size == expected,
            Size::AtMost(max) => size <= max,
        }
    }
}

/// Node holding a primitive value of kind `K`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Primitive<K: Kind> {
    options: Options,
    default: Option<K::Value>,
    value: Option<K::Value>,
    size: Option<Size>,
    kind: PhantomData<K>,
}

pub type Boolean = Primitive<kinds::Boolean>;
pub type Integer = Primitive<kinds::Integer>;
pub type Enumerated = Primitive<kinds::Enumerated>;
pub type Null = Primitive<kinds::Null>;
pub type OctetString = Primitive<kinds::OctetString>;
pub type BitString = Primitive<kinds::BitString>;
pub type Utf8String = Primitive<kinds::Utf8String>;
pub type NumericString = Primitive<kinds::NumericString>;
pub type PrintableString = Primitive<kinds::PrintableString>;
pub type Ia5String = Primitive<kinds::Ia5String>;
pub type VisibleString = Primitive<kinds::VisibleString>;

impl<K: Kind> Primitive<K> {
    pub fn new() -> Self {
        Self {
            options: Options::default(),
            default: None,
            value: K::initial(),
            size: None,
            kind: PhantomData,
        }
    }

    impl_options_builders!();

    /// Declare a DEFAULT value: the node encodes to nothing while its value
    /// equals it, and takes it when absent from the input.
    pub fn with_default(mut self, default: impl Into<K::Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_value(mut self, value: impl Into<K::Value>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Constrain the size of the value, checked on encode and decode.
    pub fn size(mut self, size: Size) -> Self {
        self.size = Some(size);
        self
    }

    /// Current value, falling back to the DEFAULT.
    pub fn value(&self) -> Option<&K::Value> {
        self.value.as_ref().or(self.default.as_ref())
    }

    pub fn set_value(&mut self, value: impl Into<K::Value>) {
        self.value = Some(value.into());
    }

    pub fn default_value(&self) -> Option<&K::Value> {
        self.default.as_ref()
    }

    /// Was a value set or decoded (as opposed to absent, or defaulted)?
    pub fn is_present(&self) -> bool {
        self.value.is_some()
    }

    pub fn size_constraint(&self) -> Option<Size> {
        self.size
    }

    /// The value to put on the wire, `None` when the node is elided.
    fn wire_value(&self) -> Result<Option<&K::Value>> {
        match (&self.value, &self.default) {
            (Some(value), Some(default)) if value == default => Ok(None),
            (Some(value), _) => {
                check_size(self.tag(), self.size, K::size(value))?;
                Ok(Some(value))
            }
            (None, Some(_)) => Ok(None),
            (None, None) if self.options.optional => Ok(None),
            (None, None) => Err(ErrorKind::MissingValue { tag: self.tag() }.into()),
        }
    }
}

fn check_size(tag: Tag, constraint: Option<Size>, size: usize) -> Result<()> {
    match constraint {
        Some(constraint) if !constraint.admits(size) => Err(ErrorKind::Size { tag, size }.into()),
        _ => Ok(()),
    }
}

impl<K: Kind> Default for Primitive<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Kind> Encodable for Primitive<K> {
    fn encoded_length(&self) -> Result<Length> {
        match self.wire_value()? {
            Some(value) => framed_length(K::TAG, self.options.tagging, K::content_length(value)?),
            None => Ok(Length::zero()),
        }
    }

    fn encode(&self, encoder: &mut Encoder<'_>) -> Result<()> {
        match self.wire_value()? {
            Some(value) => {
                let content = K::content_length(value)?;
                encode_framed(encoder, K::TAG, self.options.tagging, content, |encoder| {
                    K::encode_content(value, encoder)
                })
            }
            None => Ok(()),
        }
    }
}

impl<K: Kind> Value for Primitive<K> {
    fn options(&self) -> &Options {
        &self.options
    }

    fn tag(&self) -> Tag {
        self.options.tagging.outer_tag(K::TAG)
    }

    fn has_default(&self) -> bool {
        self.default.is_some()
    }

    fn has_value(&self) -> bool {
        K::DESCRIBED && self.value.is_some()
    }

    fn is_elided(&self) -> bool {
        matches!(self.wire_value(), Ok(None))
    }

    fn clear(&mut self) {
        self.value = if self.options.optional || self.default.is_some() {
            None
        } else {
            K::initial()
        };
    }

    fn decode_value(&mut self, decoder: &mut Decoder<'_>) -> Result<()> {
        let tag = self.tag();
        let constraint = self.size;
        let value = decode_framed(decoder, K::TAG, self.options.tagging, |decoder, length| {
            let start = decoder.position();
            let content = decoder.content(length)?;
            let value = match K::decode_content(content, decoder.mode()) {
                Ok(value) => value,
                Err(e) => return decoder.error_at(e.kind(), start),
            };
            match check_size(tag, constraint, K::size(&value)) {
                Ok(()) => Ok(value),
                Err(e) => decoder.error_at(e.kind(), start),
            }
        })?;
        self.value = Some(value);
        Ok(())
    }

    fn summarize(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        summarize_options(f, &self.options, &K::NAME)?;
        if let Some(default) = &self.default {
            f.write_str(" DEFAULT ")?;
            K::describe(default, f)?;
        }
        if let (Some(value), true) = (&self.value, K::DESCRIBED) {
            f.write_str(": ")?;
            K::describe(value, f)?;
        }
        Ok(())
    }
}

/// Arbitrary precision signed integer.
///
/// Held as its shortest big-endian two's complement representation, which is
/// also its DER content.
#[derive(Clone, Eq, Hash, PartialEq)]
pub struct Int(Vec<u8>);

impl Int {
    /// Integer from big-endian two's complement bytes, redundant leading
    /// bytes allowed. No bytes at all read as zero.
    pub fn from_be_bytes(bytes: &[u8]) -> Self {
        if bytes.is_empty() {
            return Int(vec![0]);
        }
        Int(bytes[redundant_prefix(bytes)..].to_vec())
    }

    /// Non-negative integer from big-endian magnitude bytes.
    pub fn from_unsigned_be_bytes(bytes: &[u8]) -> Self {
        let digits = &bytes[bytes.iter().take_while(|&&byte| byte == 0).count()..];
        let mut content = Vec::with_capacity(digits.len() + 1);
        if digits.first().map_or(true, |&byte| byte & 0x80 != 0) {
            content.push(0);
        }
        content.extend_from_slice(digits);
        Int(content)
    }

    /// Shortest big-endian two's complement bytes.
    pub fn as_be_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_negative(&self) -> bool {
        self.0.first().map_or(false, |&byte| byte & 0x80 != 0)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0]
    }

    pub fn to_i128(&self) -> Option<i128> {
        let len = self.0.len();
        if len > 16 {
            return None;
        }
        let fill = if self.is_negative() { 0xFF } else { 0x00 };
        let mut be_bytes = [fill; 16];
        be_bytes[16 - len..].copy_from_slice(&self.0);
        Some(i128::from_be_bytes(be_bytes))
    }

    pub fn to_i64(&self) -> Option<i64> {
        self.to_i128().and_then(|value| value.try_into().ok())
    }

    /// Is `bytes` the shortest two's complement encoding of its integer?
    pub(crate) fn is_minimal(bytes: &[u8]) -> bool {
        !bytes.is_empty() && redundant_prefix(bytes) == 0
    }
}

/// Number of leading bytes that merely repeat the sign of the next one.
fn redundant_prefix(bytes: &[u8]) -> usize {
    bytes
        .windows(2)
        .take_while(|pair| matches!((pair[0], pair[1] & 0x80), (0x00, 0x00) | (0xFF, 0x80)))
        .count()
}

macro_rules! int_from_signed {
    ($($int:ty),*) => {
        $(
            impl From<$int> for Int {
                fn from(value: $int) -> Int {
                    Int::from_be_bytes(&value.to_be_bytes())
                }
            }
        )*
    };
}

macro_rules! int_from_unsigned {
    ($($int:ty),*) => {
        $(
            impl From<$int> for Int {
                fn from(value: $int) -> Int {
                    Int::from_unsigned_be_bytes(&value.to_be_bytes())
                }
            }
        )*
    };
}

int_from_signed!(i8, i16, i32, i64, i128);
int_from_unsigned!(u8, u16, u32, u64, u128);

impl fmt::Display for Int {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_i128() {
            Some(value) => write!(f, "{}", value),
            None => {
                f.write_str("0x")?;
                write_hex(f, &self.0)
            }
        }
    }
}

impl fmt::Debug for Int {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Int({})", self)
    }
}

/// BIT STRING value: whole octets, the last of which may have unused
/// (trailing, zero) bits.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct Bits {
    bytes: Vec<u8>,
    unused: u8,
}

impl Bits {
    /// Bits from octets, ignoring the `unused` least significant bits of the last one.
    pub fn new(bytes: impl Into<Vec<u8>>, unused: u8) -> Result<Self> {
        let mut bytes = bytes.into();
        if unused > 7 || (bytes.is_empty() && unused != 0) {
            return Err(ErrorKind::InvalidBitString.into());
        }
        if let Some(last) = bytes.last_mut() {
            *last &= !unused_mask(unused);
        }
        Ok(Self { bytes, unused })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn unused_bits(&self) -> u8 {
        self.unused
    }

    pub fn bit_len(&self) -> usize {
        self.bytes.len() * 8 - self.unused as usize
    }

    /// Bit at `index`, counting from the most significant bit of the first octet.
    pub fn bit(&self, index: usize) -> Option<bool> {
        if index >= self.bit_len() {
            return None;
        }
        self.bytes
            .get(index / 8)
            .map(|byte| byte & (0x80 >> (index % 8)) != 0)
    }
}

impl From<Vec<u8>> for Bits {
    fn from(bytes: Vec<u8>) -> Bits {
        Bits { bytes, unused: 0 }
    }
}

impl From<&[u8]> for Bits {
    fn from(bytes: &[u8]) -> Bits {
        Bits::from(bytes.to_vec())
    }
}

fn unused_mask(unused: u8) -> u8 {
    ((1u16 << unused) - 1) as u8
}

fn write_hex(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    for byte in bytes {
        write!(f, "{:02x}", byte)?;
    }
    Ok(())
}

fn check_alphabet(
    tag: Tag,
    mut chars: impl Iterator<Item = char>,
    allowed: fn(char) -> bool,
) -> Result<()> {
    match chars.find(|&character| !allowed(character)) {
        Some(character) => Err(ErrorKind::InvalidCharacter { tag, character }.into()),
        None => Ok(()),
    }
}

/// The [`Kind`]s of the primitive types.
pub mod kinds {
    use super::*;

    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub struct Boolean;

    impl Kind for Boolean {
        type Value = bool;
        const TAG: Tag = Tag::BOOLEAN;
        const NAME: &'static str = "BOOLEAN";

        fn size(_: &bool) -> usize {
            1
        }

        fn content_length(_: &bool) -> Result<Length> {
            Ok(Length::from(1u8))
        }

        fn encode_content(value: &bool, encoder: &mut Encoder<'_>) -> Result<()> {
            encoder.byte(if *value { 0xFF } else { 0x00 })
        }

        fn decode_content(content: &[u8], mode: Mode) -> Result<bool> {
            match content {
                [0x00] => Ok(false),
                [0xFF] => Ok(true),
                [_] if !mode.is_strict() => Ok(true),
                [_] => Err(ErrorKind::Noncanonical { tag: Self::TAG }.into()),
                _ => Err(ErrorKind::Length { tag: Self::TAG }.into()),
            }
        }

        fn describe(value: &bool, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", value)
        }
    }

    fn decode_int(tag: Tag, content: &[u8], mode: Mode) -> Result<Int> {
        if content.is_empty() {
            return Err(ErrorKind::Length { tag }.into());
        }
        if mode.is_strict() && !Int::is_minimal(content) {
            return Err(ErrorKind::Noncanonical { tag }.into());
        }
        Ok(Int::from_be_bytes(content))
    }

    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub struct Integer;

    impl Kind for Integer {
        type Value = Int;
        const TAG: Tag = Tag::INTEGER;
        const NAME: &'static str = "INTEGER";

        fn size(value: &Int) -> usize {
            value.as_be_bytes().len()
        }

        fn content_length(value: &Int) -> Result<Length> {
            value.as_be_bytes().len().try_into()
        }

        fn encode_content(value: &Int, encoder: &mut Encoder<'_>) -> Result<()> {
            encoder.bytes(value.as_be_bytes())
        }

        fn decode_content(content: &[u8], mode: Mode) -> Result<Int> {
            decode_int(Self::TAG, content, mode)
        }

        fn describe(value: &Int, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", value)
        }
    }

    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub struct Enumerated;

    impl Kind for Enumerated {
        type Value = Int;
        const TAG: Tag = Tag::ENUMERATED;
        const NAME: &'static str = "ENUMERATED";

        fn size(value: &Int) -> usize {
            value.as_be_bytes().len()
        }

        fn content_length(value: &Int) -> Result<Length> {
            value.as_be_bytes().len().try_into()
        }

        fn encode_content(value: &Int, encoder: &mut Encoder<'_>) -> Result<()> {
            encoder.bytes(value.as_be_bytes())
        }

        fn decode_content(content: &[u8], mode: Mode) -> Result<Int> {
            decode_int(Self::TAG, content, mode)
        }

        fn describe(value: &Int, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", value)
        }
    }

    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub struct Null;

    impl Kind for Null {
        type Value = ();
        const TAG: Tag = Tag::NULL;
        const NAME: &'static str = "NULL";
        const DESCRIBED: bool = false;

        fn initial() -> Option<()> {
            Some(())
        }

        fn size(_: &()) -> usize {
            0
        }

        fn content_length(_: &()) -> Result<Length> {
            Ok(Length::zero())
        }

        fn encode_content(_: &(), _: &mut Encoder<'_>) -> Result<()> {
            Ok(())
        }

        fn decode_content(content: &[u8], _: Mode) -> Result<()> {
            if content.is_empty() {
                Ok(())
            } else {
                Err(ErrorKind::NonEmptyNull.into())
            }
        }

        fn describe(_: &(), _: &mut fmt::Formatter<'_>) -> fmt::Result {
            Ok(())
        }
    }

    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub struct OctetString;

    impl Kind for OctetString {
        type Value = Vec<u8>;
        const TAG: Tag = Tag::OCTET_STRING;
        const NAME: &'static str = "OCTET STRING";

        fn size(value: &Vec<u8>) -> usize {
            value.len()
        }

        fn content_length(value: &Vec<u8>) -> Result<Length> {
            value.len().try_into()
        }

        fn encode_content(value: &Vec<u8>, encoder: &mut Encoder<'_>) -> Result<()> {
            encoder.bytes(value)
        }

        fn decode_content(content: &[u8], _: Mode) -> Result<Vec<u8>> {
            Ok(content.to_vec())
        }

        fn describe(value: &Vec<u8>, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write_hex(f, value)
        }
    }

    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub struct BitString;

    impl Kind for BitString {
        type Value = Bits;
        const TAG: Tag = Tag::BIT_STRING;
        const NAME: &'static str = "BIT STRING";

        fn size(value: &Bits) -> usize {
            value.bit_len()
        }

        fn content_length(value: &Bits) -> Result<Length> {
            let len: Length = value.bytes.len().try_into()?;
            len + 1u8
        }

        fn encode_content(value: &Bits, encoder: &mut Encoder<'_>) -> Result<()> {
            encoder.byte(value.unused)?;
            encoder.bytes(&value.bytes)
        }

        fn decode_content(content: &[u8], mode: Mode) -> Result<Bits> {
            let (&unused, bytes) = content
                .split_first()
                .ok_or(ErrorKind::InvalidBitString)?;
            let bits = Bits::new(bytes, unused)?;
            // unused bits have to be zero
            if mode.is_strict() && bits.bytes.last() != bytes.last() {
                return Err(ErrorKind::Noncanonical { tag: Self::TAG }.into());
            }
            Ok(bits)
        }

        fn describe(value: &Bits, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write_hex(f, &value.bytes)?;
            if value.unused != 0 {
                write!(f, " ({} unused bits)", value.unused)?;
            }
            Ok(())
        }
    }

    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub struct Utf8String;

    impl Kind for Utf8String {
        type Value = String;
        const TAG: Tag = Tag::UTF8_STRING;
        const NAME: &'static str = "UTF8String";

        fn size(value: &String) -> usize {
            value.chars().count()
        }

        fn content_length(value: &String) -> Result<Length> {
            value.len().try_into()
        }

        fn encode_content(value: &String, encoder: &mut Encoder<'_>) -> Result<()> {
            encoder.bytes(value.as_bytes())
        }

        fn decode_content(content: &[u8], _: Mode) -> Result<String> {
            core::str::from_utf8(content)
                .map(String::from)
                .map_err(|_| ErrorKind::Utf8 { tag: Self::TAG }.into())
        }

        fn describe(value: &String, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{:?}", value)
        }
    }

    /// Strings over a subset of ASCII.
    macro_rules! restricted_string {
        ($(#[$attr:meta])* $kind:ident, $tag:expr, $name:expr, $allowed:expr) => {
            $(#[$attr])*
            #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
            pub struct $kind;

            impl Kind for $kind {
                type Value = String;
                const TAG: Tag = $tag;
                const NAME: &'static str = $name;

                fn size(value: &String) -> usize {
                    value.chars().count()
                }

                fn content_length(value: &String) -> Result<Length> {
                    value.len().try_into()
                }

                fn encode_content(value: &String, encoder: &mut Encoder<'_>) -> Result<()> {
                    check_alphabet(Self::TAG, value.chars(), $allowed)?;
                    encoder.bytes(value.as_bytes())
                }

                fn decode_content(content: &[u8], _: Mode) -> Result<String> {
                    let chars = content.iter().map(|&byte| char::from(byte));
                    check_alphabet(Self::TAG, chars.clone(), $allowed)?;
                    Ok(chars.collect())
                }

                fn describe(value: &String, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{:?}", value)
                }
            }
        };
    }

    restricted_string!(
        /// Digits and space.
        NumericString, Tag::NUMERIC_STRING, "NumericString",
        |c| c.is_ascii_digit() || c == ' '
    );

    restricted_string!(
        /// Letters, digits, space and `'()+,-./:=?`.
        PrintableString, Tag::PRINTABLE_STRING, "PrintableString",
        |c| c.is_ascii_alphanumeric() || " '()+,-./:=?".contains(c)
    );

    restricted_string!(
        /// ASCII.
        Ia5String, Tag::IA5_STRING, "IA5String",
        |c| c.is_ascii()
    );

    restricted_string!(
        /// Printable ASCII, space included.
        VisibleString, Tag::VISIBLE_STRING, "VisibleString",
        |c| c == ' ' || c.is_ascii_graphic()
    );
}
