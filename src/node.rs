//! The value node contract shared by every ASN.1 type, and the [`Node`] tree.

use alloc::{string::String, vec::Vec};
use core::fmt;

use crate::{
    BitString, Boolean, Choice, Decoder, Encodable, Encoder, Enumerated, ErrorKind, Header,
    Ia5String, Integer, Length, Mode, Null, NumericString, OctetString, PrintableString, Result,
    Sequence, SequenceOf, Tag, Utf8String, VisibleString,
};

/// How a node's tag appears on the wire.
///
/// Set once at construction.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum Tagging {
    /// The type's own (universal) tag.
    #[default]
    Natural,

    /// Class and number of the given tag replace those of the type's tag; the
    /// constructed bit and the content encoding stay the type's own.
    Implicit(Tag),

    /// The type's own TLV is wrapped in a constructed TLV with the given tag.
    Explicit(Tag),
}

impl Tagging {
    /// Tag of the TLV holding the content for a type whose own tag is `natural`.
    pub fn inner_tag(self, natural: Tag) -> Tag {
        match self {
            Tagging::Implicit(tag) => Tag {
                constructed: natural.constructed,
                ..tag
            },
            _ => natural,
        }
    }

    /// First tag on the wire for a type whose own tag is `natural`.
    pub fn outer_tag(self, natural: Tag) -> Tag {
        match self {
            Tagging::Explicit(tag) => tag.constructed(),
            _ => self.inner_tag(natural),
        }
    }
}

/// Construction options shared by every node.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Options {
    /// Label, for diagnostics and field lookup only.
    pub name: String,

    pub tagging: Tagging,

    /// Whether the value may be absent from the wire.
    pub optional: bool,
}

/// The contract every ASN.1 type implements.
///
/// Encoding goes through [`Encodable`]: a value that equals its DEFAULT, or is
/// absent and OPTIONAL, encodes to nothing; anything else is exactly one TLV
/// (two when explicitly tagged).
pub trait Value: Encodable {
    /// Construction options.
    fn options(&self) -> &Options;

    /// First tag this node puts on the wire.
    fn tag(&self) -> Tag;

    /// Can this node be decoded from a TLV with the given tag?
    fn accepts(&self, tag: Tag) -> bool {
        tag == self.tag()
    }

    /// Does this node carry a DEFAULT value?
    fn has_default(&self) -> bool {
        false
    }

    /// Does this node carry a value of its own, as opposed to none or its DEFAULT?
    fn has_value(&self) -> bool;

    /// Is this node left off the wire?
    fn is_elided(&self) -> bool;

    /// Drop the current value, leaving the node absent (or at its DEFAULT).
    fn clear(&mut self);

    /// Decode this node from the next TLV, whose tag is known to be accepted.
    ///
    /// Implementations must leave `self` untouched on failure.
    fn decode_value(&mut self, decoder: &mut Decoder<'_>) -> Result<()>;

    /// Error reported when a required node meets a TLV it does not accept.
    fn mismatch(&self, actual: Tag) -> ErrorKind {
        ErrorKind::TagMismatch {
            expected: self.tag(),
            actual,
        }
    }

    /// One-line description of this node (children excluded).
    fn summarize(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result;

    fn name(&self) -> &str {
        &self.options().name
    }

    fn is_optional(&self) -> bool {
        self.options().optional
    }

    /// Decode this node from the decoder's position.
    ///
    /// An OPTIONAL or DEFAULT node facing a TLV it does not accept (or the end
    /// of its parent's content) is left absent and consumes nothing.
    fn decode(&mut self, decoder: &mut Decoder<'_>) -> Result<()> {
        match decoder.peek_tag()? {
            Some(tag) if self.accepts(tag) => self.decode_value(decoder),
            _ if self.is_optional() || self.has_default() => {
                trace!("{}: {} not present, skipped", self.name(), self.tag());
                self.clear();
                Ok(())
            }
            Some(actual) => {
                let kind = self.mismatch(actual);
                decoder.error(kind)
            }
            None => decoder.error(ErrorKind::MalformedTag),
        }
    }

    /// Decode this node from the decoder's position, whether or not it is
    /// OPTIONAL: anything but an accepted TLV is an error.
    fn decode_present(&mut self, decoder: &mut Decoder<'_>) -> Result<()> {
        match decoder.peek_tag()? {
            Some(tag) if self.accepts(tag) => self.decode_value(decoder),
            Some(actual) => {
                let kind = self.mismatch(actual);
                decoder.error(kind)
            }
            None => decoder.error(ErrorKind::MalformedTag),
        }
    }

    /// Decode this node from the start of `bytes`, returning how many bytes it consumed.
    ///
    /// Bytes after the node's TLV are left alone. On failure the node keeps
    /// its previous value.
    fn from_wire(&mut self, bytes: &[u8], mode: Mode) -> Result<Length> {
        let mut decoder = Decoder::new(bytes, mode);
        if let Err(e) = self.decode(&mut decoder) {
            debug!("decoding {} failed: {}", self.name(), e);
            return Err(e);
        }
        Ok(decoder.position())
    }

    /// Encode this node as DER.
    fn to_wire(&self) -> Result<Vec<u8>> {
        self.to_vec()
    }
}

/// Encoded length of a TLV with `content` octets, tagged as requested.
pub(crate) fn framed_length(natural: Tag, tagging: Tagging, content: Length) -> Result<Length> {
    let inner = Header::definite(tagging.inner_tag(natural), content).encoded_length() + content;
    match tagging {
        Tagging::Explicit(tag) => {
            let inner = inner?;
            Header::definite(tag.constructed(), inner).encoded_length() + inner
        }
        _ => inner,
    }
}

/// Encode a TLV whose `content` octets are written by `f`, tagged as requested.
pub(crate) fn encode_framed<F>(
    encoder: &mut Encoder<'_>,
    natural: Tag,
    tagging: Tagging,
    content: Length,
    f: F,
) -> Result<()>
where
    F: FnOnce(&mut Encoder<'_>) -> Result<()>,
{
    let header = Header::definite(tagging.inner_tag(natural), content);
    if let Tagging::Explicit(tag) = tagging {
        let inner = (header.encoded_length()? + content)?;
        Header::definite(tag.constructed(), inner).encode(encoder)?;
    }
    header.encode(encoder)?;
    encoder.nested(content, f)
}

/// Decode a TLV tagged as requested, handing its content length to `f` with
/// the decoder positioned on the content.
pub(crate) fn decode_framed<'a, F, R>(
    decoder: &mut Decoder<'a>,
    natural: Tag,
    tagging: Tagging,
    f: F,
) -> Result<R>
where
    F: FnOnce(&mut Decoder<'a>, Option<Length>) -> Result<R>,
{
    match tagging {
        Tagging::Explicit(tag) => {
            let outer = expect_header(decoder, tag.constructed())?;
            decoder.nested(outer.length, |inner| {
                let header = expect_header(inner, natural)?;
                f(inner, header.length)
            })
        }
        _ => {
            let header = expect_header(decoder, tagging.inner_tag(natural))?;
            f(decoder, header.length)
        }
    }
}

pub(crate) fn expect_header(decoder: &mut Decoder<'_>, expected: Tag) -> Result<Header> {
    if let Some(actual) = decoder.peek_tag()? {
        if let Err(e) = actual.assert_eq(expected) {
            return decoder.error(e.kind());
        }
    }
    decoder.decode()
}

/// Common prefix of node summaries: `name [CONTEXT 0] IMPLICIT TYPE OPTIONAL`.
pub(crate) fn summarize_options(
    f: &mut fmt::Formatter<'_>,
    options: &Options,
    type_name: &dyn fmt::Display,
) -> fmt::Result {
    if !options.name.is_empty() {
        write!(f, "{} ", options.name)?;
    }
    match options.tagging {
        Tagging::Natural => {}
        Tagging::Implicit(tag) => write!(f, "[{} {}] IMPLICIT ", tag.class, tag.number)?,
        Tagging::Explicit(tag) => write!(f, "[{} {}] EXPLICIT ", tag.class, tag.number)?,
    }
    write!(f, "{}", type_name)?;
    if options.optional {
        f.write_str(" OPTIONAL")?;
    }
    Ok(())
}

/// Builder methods for construction options.
macro_rules! impl_options_builders {
    () => {
        /// Set the diagnostic label.
        pub fn named(mut self, name: impl Into<alloc::string::String>) -> Self {
            self.options.name = name.into();
            self
        }

        /// Mark the value OPTIONAL.
        pub fn optional(mut self) -> Self {
            self.options.optional = true;
            self
        }

        /// Replace the type's tag by `tag` (class and number only).
        pub fn implicit(mut self, tag: $crate::Tag) -> Self {
            self.options.tagging = $crate::Tagging::Implicit(tag);
            self
        }

        /// Wrap the type's TLV in a constructed TLV tagged `tag`.
        pub fn explicit(mut self, tag: $crate::Tag) -> Self {
            self.options.tagging = $crate::Tagging::Explicit(tag);
            self
        }
    };
}
pub(crate) use impl_options_builders;

/// A node of an ASN.1 value tree.
///
/// The set of types is closed; each variant wraps the concrete type, which
/// implements [`Value`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Node {
    Boolean(Boolean),
    Integer(Integer),
    Enumerated(Enumerated),
    Null(Null),
    OctetString(OctetString),
    BitString(BitString),
    Utf8String(Utf8String),
    NumericString(NumericString),
    PrintableString(PrintableString),
    Ia5String(Ia5String),
    VisibleString(VisibleString),
    Sequence(Sequence),
    SequenceOf(SequenceOf),
    Choice(Choice),
}

macro_rules! dispatch {
    ($node:expr, $inner:ident => $body:expr) => {
        match $node {
            Node::Boolean($inner) => $body,
            Node::Integer($inner) => $body,
            Node::Enumerated($inner) => $body,
            Node::Null($inner) => $body,
            Node::OctetString($inner) => $body,
            Node::BitString($inner) => $body,
            Node::Utf8String($inner) => $body,
            Node::NumericString($inner) => $body,
            Node::PrintableString($inner) => $body,
            Node::Ia5String($inner) => $body,
            Node::VisibleString($inner) => $body,
            Node::Sequence($inner) => $body,
            Node::SequenceOf($inner) => $body,
            Node::Choice($inner) => $body,
        }
    };
}

macro_rules! node_variants {
    ($($variant:ident: $as_ref:ident, $as_mut:ident;)*) => {
        $(
            impl From<$variant> for Node {
                fn from(value: $variant) -> Node {
                    Node::$variant(value)
                }
            }
        )*

        impl Node {
            $(
                pub fn $as_ref(&self) -> Option<&$variant> {
                    match self {
                        Node::$variant(value) => Some(value),
                        _ => None,
                    }
                }

                pub fn $as_mut(&mut self) -> Option<&mut $variant> {
                    match self {
                        Node::$variant(value) => Some(value),
                        _ => None,
                    }
                }
            )*
        }
    };
}

node_variants! {
    Boolean: as_boolean, as_boolean_mut;
    Integer: as_integer, as_integer_mut;
    Enumerated: as_enumerated, as_enumerated_mut;
    Null: as_null, as_null_mut;
    OctetString: as_octet_string, as_octet_string_mut;
    BitString: as_bit_string, as_bit_string_mut;
    Utf8String: as_utf8_string, as_utf8_string_mut;
    NumericString: as_numeric_string, as_numeric_string_mut;
    PrintableString: as_printable_string, as_printable_string_mut;
    Ia5String: as_ia5_string, as_ia5_string_mut;
    VisibleString: as_visible_string, as_visible_string_mut;
    Sequence: as_sequence, as_sequence_mut;
    SequenceOf: as_sequence_of, as_sequence_of_mut;
    Choice: as_choice, as_choice_mut;
}

impl Node {
    /// Nodes directly below this one: SEQUENCE fields, SEQUENCE OF elements,
    /// or the chosen CHOICE alternative.
    pub fn children(&self) -> &[Node] {
        match self {
            Node::Sequence(sequence) => sequence.fields(),
            Node::SequenceOf(sequence_of) => sequence_of.elements(),
            Node::Choice(choice) => choice.chosen_slice(),
            _ => &[],
        }
    }

    /// Visit this node and everything below it, depth first, parents before
    /// children, along with their depth below this node.
    pub fn walk<F: FnMut(usize, &Node)>(&self, f: &mut F) {
        self.walk_at(0, f)
    }

    fn walk_at<F: FnMut(usize, &Node)>(&self, depth: usize, f: &mut F) {
        f(depth, self);
        for child in self.children() {
            child.walk_at(depth + 1, f);
        }
    }

    /// One-line description of this node, children excluded.
    pub fn summary(&self) -> Summary<'_> {
        Summary(self)
    }
}

impl Encodable for Node {
    fn encoded_length(&self) -> Result<Length> {
        dispatch!(self, inner => inner.encoded_length())
    }

    fn encode(&self, encoder: &mut Encoder<'_>) -> Result<()> {
        dispatch!(self, inner => inner.encode(encoder))
    }
}

impl Value for Node {
    fn options(&self) -> &Options {
        dispatch!(self, inner => inner.options())
    }

    fn tag(&self) -> Tag {
        dispatch!(self, inner => inner.tag())
    }

    fn accepts(&self, tag: Tag) -> bool {
        dispatch!(self, inner => inner.accepts(tag))
    }

    fn has_default(&self) -> bool {
        dispatch!(self, inner => inner.has_default())
    }

    fn has_value(&self) -> bool {
        dispatch!(self, inner => inner.has_value())
    }

    fn is_elided(&self) -> bool {
        dispatch!(self, inner => inner.is_elided())
    }

    fn clear(&mut self) {
        dispatch!(self, inner => inner.clear())
    }

    fn decode_value(&mut self, decoder: &mut Decoder<'_>) -> Result<()> {
        dispatch!(self, inner => inner.decode_value(decoder))
    }

    fn mismatch(&self, actual: Tag) -> ErrorKind {
        dispatch!(self, inner => inner.mismatch(actual))
    }

    fn summarize(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        dispatch!(self, inner => inner.summarize(f))
    }
}

/// See [`Node::summary`].
pub struct Summary<'a>(&'a Node);

impl fmt::Display for Summary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.summarize(f)
    }
}

/// The whole tree, one node per line, indented by depth.
impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut result = Ok(());
        self.walk(&mut |depth, node| {
            if result.is_ok() {
                result = writeln!(f, "{:width$}{}", "", node.summary(), width = 2 * depth);
            }
        });
        result
    }
}
