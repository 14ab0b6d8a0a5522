//! Constructed types.
//!
//! [`Sequence`] holds a fixed list of fields (or, without one, its raw content
//! octets); [`SequenceOf`] holds any number of elements built from a single
//! prototype. Both also stand for their SET counterparts, which only differ
//! by tag here: fields and elements keep the order they are given in.

use alloc::{boxed::Box, vec::Vec};
use core::{convert::TryInto, fmt};

use crate::node::{
    decode_framed, encode_framed, framed_length, impl_options_builders, summarize_options,
};
use crate::{Decoder, Encodable, Encoder, ErrorKind, Length, Node, Options, Result, Tag, Value};

#[derive(Clone, Debug, Eq, PartialEq)]
enum Body {
    Fields(Vec<Node>),
    /// Content octets left undecoded.
    Raw(Option<Vec<u8>>),
}

/// SEQUENCE (or SET) node.
#[derive(Clone, Debug)]
pub struct Sequence {
    options: Options,
    natural: Tag,
    body: Body,
    /// Decoded from a TLV, possibly with no field content.
    present: bool,
}

impl Sequence {
    /// SEQUENCE with the given fields, in order.
    pub fn new(fields: Vec<Node>) -> Self {
        Self::with_body(Tag::SEQUENCE, Body::Fields(fields))
    }

    /// SET with the given fields, in order.
    pub fn set(fields: Vec<Node>) -> Self {
        Self::with_body(Tag::SET, Body::Fields(fields))
    }

    /// SEQUENCE whose content is not decoded, but kept as raw octets.
    pub fn raw() -> Self {
        Self::with_body(Tag::SEQUENCE, Body::Raw(None))
    }

    fn with_body(natural: Tag, body: Body) -> Self {
        Self {
            options: Options::default(),
            natural,
            body,
            present: false,
        }
    }

    impl_options_builders!();

    /// Fields, empty for a raw sequence.
    pub fn fields(&self) -> &[Node] {
        match &self.body {
            Body::Fields(fields) => fields,
            Body::Raw(_) => &[],
        }
    }

    pub fn fields_mut(&mut self) -> &mut [Node] {
        match &mut self.body {
            Body::Fields(fields) => fields,
            Body::Raw(_) => &mut [],
        }
    }

    /// First field labelled `name`.
    pub fn field(&self, name: &str) -> Option<&Node> {
        self.fields().iter().find(|field| field.name() == name)
    }

    pub fn field_mut(&mut self, name: &str) -> Option<&mut Node> {
        self.fields_mut().iter_mut().find(|field| field.name() == name)
    }

    /// Content octets of a raw sequence.
    pub fn raw_value(&self) -> Option<&[u8]> {
        match &self.body {
            Body::Raw(raw) => raw.as_deref(),
            Body::Fields(_) => None,
        }
    }

    /// Replace the content by raw octets, encoded as they are.
    pub fn set_raw_value(&mut self, content: impl Into<Vec<u8>>) {
        self.body = Body::Raw(Some(content.into()));
    }

    /// Whether the sequence is on the wire: it was decoded, or one of its
    /// fields (or its raw content) carries a value.
    pub fn is_present(&self) -> bool {
        self.has_value()
    }

    fn content_length(&self) -> Result<Length> {
        match &self.body {
            Body::Fields(fields) => fields
                .iter()
                .try_fold(Length::zero(), |sum, field| sum + field.encoded_length()?),
            Body::Raw(Some(raw)) => raw.len().try_into(),
            Body::Raw(None) => Err(ErrorKind::MissingValue { tag: self.tag() }.into()),
        }
    }
}

impl Encodable for Sequence {
    fn encoded_length(&self) -> Result<Length> {
        if self.is_elided() {
            return Ok(Length::zero());
        }
        framed_length(self.natural, self.options.tagging, self.content_length()?)
    }

    fn encode(&self, encoder: &mut Encoder<'_>) -> Result<()> {
        if self.is_elided() {
            return Ok(());
        }
        let content = self.content_length()?;
        encode_framed(encoder, self.natural, self.options.tagging, content, |encoder| {
            match &self.body {
                Body::Fields(fields) => fields.iter().try_for_each(|field| encoder.encode(field)),
                Body::Raw(Some(raw)) => encoder.bytes(raw),
                Body::Raw(None) => Ok(()),
            }
        })
    }
}

impl Value for Sequence {
    fn options(&self) -> &Options {
        &self.options
    }

    fn tag(&self) -> Tag {
        self.options.tagging.outer_tag(self.natural)
    }

    fn has_value(&self) -> bool {
        self.present
            || match &self.body {
                Body::Fields(fields) => fields.iter().any(Node::has_value),
                Body::Raw(raw) => raw.is_some(),
            }
    }

    fn is_elided(&self) -> bool {
        self.options.optional && !self.has_value()
    }

    fn clear(&mut self) {
        match &mut self.body {
            Body::Fields(fields) => fields.iter_mut().for_each(Node::clear),
            Body::Raw(raw) => *raw = None,
        }
        self.present = false;
    }

    fn decode_value(&mut self, decoder: &mut Decoder<'_>) -> Result<()> {
        let mut body = self.body.clone();
        decode_framed(decoder, self.natural, self.options.tagging, |decoder, length| {
            match &mut body {
                Body::Fields(fields) => decoder.nested(length, |content| {
                    fields.iter_mut().try_for_each(|field| field.decode(content))
                }),
                Body::Raw(raw) => {
                    *raw = Some(decoder.raw_content(length)?.to_vec());
                    Ok(())
                }
            }
        })?;
        self.body = body;
        self.present = true;
        Ok(())
    }

    fn summarize(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        summarize_options(f, &self.options, &type_name(self.natural))?;
        if let Some(raw) = self.raw_value() {
            write!(f, ": {} raw octets", raw.len())?;
        }
        Ok(())
    }
}

impl PartialEq for Sequence {
    fn eq(&self, other: &Self) -> bool {
        self.options == other.options
            && self.natural == other.natural
            && self.body == other.body
            && self.is_present() == other.is_present()
    }
}

impl Eq for Sequence {}

fn type_name(natural: Tag) -> &'static str {
    if natural == Tag::SET {
        "SET"
    } else {
        "SEQUENCE"
    }
}

/// SEQUENCE OF (or SET OF) node.
///
/// Elements are copies of a prototype node, which itself never changes.
#[derive(Clone, Debug)]
pub struct SequenceOf {
    options: Options,
    natural: Tag,
    element: Box<Node>,
    elements: Vec<Node>,
    present: bool,
}

impl SequenceOf {
    /// SEQUENCE OF elements shaped like `element`.
    pub fn new(element: impl Into<Node>) -> Self {
        Self::with_tag(Tag::SEQUENCE, element.into())
    }

    /// SET OF elements shaped like `element`.
    pub fn set_of(element: impl Into<Node>) -> Self {
        Self::with_tag(Tag::SET, element.into())
    }

    fn with_tag(natural: Tag, element: Node) -> Self {
        Self {
            options: Options::default(),
            natural,
            element: Box::new(element),
            elements: Vec::new(),
            present: false,
        }
    }

    impl_options_builders!();

    pub fn prototype(&self) -> &Node {
        &self.element
    }

    /// A fresh copy of the element prototype.
    pub fn new_element(&self) -> Node {
        (*self.element).clone()
    }

    /// Append an element.
    pub fn push(&mut self, element: impl Into<Node>) {
        self.elements.push(element.into());
    }

    /// Append a fresh copy of the prototype, once `f` has filled it in.
    pub fn push_with<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(&mut Node) -> Result<()>,
    {
        let mut element = self.new_element();
        f(&mut element)?;
        self.push(element);
        Ok(())
    }

    pub fn elements(&self) -> &[Node] {
        &self.elements
    }

    pub fn elements_mut(&mut self) -> &mut [Node] {
        &mut self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn is_present(&self) -> bool {
        self.has_value()
    }

    fn content_length(&self) -> Result<Length> {
        self.elements
            .iter()
            .try_fold(Length::zero(), |sum, element| sum + element.encoded_length()?)
    }
}

impl Encodable for SequenceOf {
    fn encoded_length(&self) -> Result<Length> {
        if self.is_elided() {
            return Ok(Length::zero());
        }
        framed_length(self.natural, self.options.tagging, self.content_length()?)
    }

    fn encode(&self, encoder: &mut Encoder<'_>) -> Result<()> {
        if self.is_elided() {
            return Ok(());
        }
        let content = self.content_length()?;
        encode_framed(encoder, self.natural, self.options.tagging, content, |encoder| {
            self.elements
                .iter()
                .try_for_each(|element| encoder.encode(element))
        })
    }
}

impl Value for SequenceOf {
    fn options(&self) -> &Options {
        &self.options
    }

    fn tag(&self) -> Tag {
        self.options.tagging.outer_tag(self.natural)
    }

    fn has_value(&self) -> bool {
        self.present || !self.elements.is_empty()
    }

    fn is_elided(&self) -> bool {
        self.options.optional && !self.has_value()
    }

    fn clear(&mut self) {
        self.elements.clear();
        self.present = false;
    }

    fn decode_value(&mut self, decoder: &mut Decoder<'_>) -> Result<()> {
        let prototype = &self.element;
        let mut elements = Vec::new();
        decode_framed(decoder, self.natural, self.options.tagging, |decoder, length| {
            decoder.nested(length, |content| {
                while !content.is_finished() {
                    let mut element = (**prototype).clone();
                    element.decode_present(content)?;
                    elements.push(element);
                }
                Ok(())
            })
        })?;
        self.elements = elements;
        self.present = true;
        Ok(())
    }

    fn summarize(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = if self.natural == Tag::SET { "SET OF" } else { "SEQUENCE OF" };
        summarize_options(f, &self.options, &name)
    }
}

impl PartialEq for SequenceOf {
    fn eq(&self, other: &Self) -> bool {
        self.options == other.options
            && self.natural == other.natural
            && self.element == other.element
            && self.elements == other.elements
            && self.is_present() == other.is_present()
    }
}

impl Eq for SequenceOf {}

#[cfg(test)]
mod tests {
    use super::{Sequence, SequenceOf};
    use crate::{
        Boolean, Encodable, ErrorKind, Integer, Length, Mode, Node, Null, OctetString, Tag,
        Value,
    };
    use alloc::vec;
    use hex_literal::hex;

    fn record() -> Sequence {
        Sequence::new(vec![
            Integer::new().named("id").into(),
            Integer::new()
                .named("room")
                .explicit(Tag::context(0))
                .optional()
                .into(),
            Integer::new()
                .named("house")
                .implicit(Tag::context(1))
                .with_default(0)
                .into(),
        ])
        .named("record")
    }

    fn id(sequence: &Sequence, name: &str) -> Option<i64> {
        sequence
            .field(name)
            .and_then(Node::as_integer)
            .and_then(Integer::value)
            .and_then(|int| int.to_i64())
    }

    #[test]
    fn encode_skips_absent_fields() {
        let mut record = record();
        record
            .field_mut("id")
            .and_then(Node::as_integer_mut)
            .unwrap()
            .set_value(5);
        assert_eq!(record.to_wire().unwrap(), hex!("30 03 02 01 05"));

        record
            .field_mut("room")
            .and_then(Node::as_integer_mut)
            .unwrap()
            .set_value(7);
        record
            .field_mut("house")
            .and_then(Node::as_integer_mut)
            .unwrap()
            .set_value(2);
        assert_eq!(
            record.to_wire().unwrap(),
            hex!("30 0b 02 01 05 a0 03 02 01 07 81 01 02")
        );
    }

    #[test]
    fn decode_skips_absent_fields() {
        let mut record = record();
        let consumed = record.from_wire(&hex!("30 06 02 01 05 81 01 03"), Mode::Der).unwrap();
        assert_eq!(consumed, Length::from(8u8));
        assert_eq!(id(&record, "id"), Some(5));
        assert_eq!(id(&record, "room"), None);
        assert_eq!(id(&record, "house"), Some(3));

        record.from_wire(&hex!("30 03 02 01 05"), Mode::Der).unwrap();
        assert_eq!(id(&record, "house"), Some(0));
        assert!(!record.field("house").and_then(Node::as_integer).unwrap().is_present());
    }

    #[test]
    fn missing_required_field() {
        let mut record = record();
        let err = record.from_wire(&hex!("30 03 81 01 03"), Mode::Der).unwrap_err();
        assert_eq!(
            err.kind(),
            ErrorKind::TagMismatch { expected: Tag::INTEGER, actual: Tag::context(1) }
        );
        assert_eq!(err.position(), Some(Length::from(2u8)));
        // nothing decoded
        assert_eq!(id(&record, "id"), None);
    }

    #[test]
    fn trailing_content() {
        let mut sequence = Sequence::new(vec![Integer::new().into()]);
        let err = sequence.from_wire(&hex!("30 05 02 01 05 05 00"), Mode::Der).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::TrailingData { .. }));
    }

    #[test]
    fn indefinite_length() {
        let bytes = hex!("30 80 02 01 05 00 00");
        let mut sequence = Sequence::new(vec![Integer::new().into()]);

        let err = sequence.from_wire(&bytes, Mode::Der).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidLength);

        assert_eq!(sequence.from_wire(&bytes, Mode::Ber).unwrap(), Length::from(7u8));
        assert_eq!(sequence.to_wire().unwrap(), hex!("30 03 02 01 05"));
    }

    #[test]
    fn raw_content() {
        let mut raw = Sequence::raw();
        assert_eq!(raw.from_wire(&hex!("30 03 02 01 05"), Mode::Der).unwrap(), Length::from(5u8));
        assert_eq!(raw.raw_value(), Some(&hex!("02 01 05")[..]));
        assert_eq!(raw.to_wire().unwrap(), hex!("30 03 02 01 05"));

        raw.from_wire(&hex!("30 80 30 80 00 00 05 00 00 00"), Mode::Ber).unwrap();
        assert_eq!(raw.raw_value(), Some(&hex!("30 80 00 00 05 00")[..]));

        let err = Sequence::raw().to_wire().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingValue { tag: Tag::SEQUENCE });
    }

    #[test]
    fn optional_sequence() {
        let schema = || {
            Sequence::new(vec![
                Sequence::new(vec![Boolean::new().named("flag").into()])
                    .named("inner")
                    .optional()
                    .into(),
                Null::default().into(),
            ])
        };
        let mut outer = schema();
        assert_eq!(outer.to_wire().unwrap(), hex!("30 02 05 00"));

        // looking a field up leaves the sequence absent
        let inner = outer.field_mut("inner").and_then(Node::as_sequence_mut).unwrap();
        assert!(inner.field_mut("flag").is_some());
        assert!(!inner.is_present());
        assert_eq!(outer.to_wire().unwrap(), hex!("30 02 05 00"));

        outer
            .field_mut("inner")
            .and_then(Node::as_sequence_mut)
            .and_then(|inner| inner.field_mut("flag"))
            .and_then(Node::as_boolean_mut)
            .unwrap()
            .set_value(true);
        assert_eq!(outer.to_wire().unwrap(), hex!("30 07 30 03 01 01 ff 05 00"));

        outer.from_wire(&hex!("30 02 05 00"), Mode::Der).unwrap();
        let inner = outer.field("inner").and_then(Node::as_sequence).unwrap();
        assert!(!inner.is_present());
        assert_eq!(inner.field("flag").and_then(Node::as_boolean).unwrap().value(), None);

        let nulls = Sequence::new(vec![Null::new().into()]).optional();
        assert!(nulls.to_wire().unwrap().is_empty());
    }

    #[test]
    fn optional_sequence_with_values() {
        let outer = Sequence::new(vec![
            Sequence::new(vec![Integer::new().with_value(1).into()]).optional().into(),
            Integer::new().with_value(2).into(),
        ]);
        assert_eq!(outer.to_wire().unwrap(), hex!("30 08 30 03 02 01 01 02 01 02"));

        let mut decoded = Sequence::new(vec![
            Sequence::new(vec![Integer::new().into()]).optional().into(),
            Integer::new().into(),
        ]);
        decoded.from_wire(&outer.to_wire().unwrap(), Mode::Der).unwrap();
        assert_eq!(decoded, outer);
    }

    #[test]
    fn optional_sequence_decoded_empty() {
        let mut outer = Sequence::new(vec![
            Sequence::new(vec![Integer::new().optional().into()]).optional().into(),
            Null::default().into(),
        ]);
        outer.from_wire(&hex!("30 04 30 00 05 00"), Mode::Der).unwrap();
        assert!(outer.fields()[0].as_sequence().unwrap().is_present());
        assert_eq!(outer.to_wire().unwrap(), hex!("30 04 30 00 05 00"));
    }

    #[test]
    fn set() {
        let set = Sequence::set(vec![OctetString::new().with_value("a").into()]);
        assert_eq!(set.to_wire().unwrap(), hex!("31 03 04 01 61"));
        assert_eq!(alloc::format!("{}", Node::from(set)), "SET\n  OCTET STRING: 61\n");
    }

    #[test]
    fn sequence_of_integers() {
        let mut list = SequenceOf::new(Integer::new());
        for value in 0..8 {
            list.push_with(|element| {
                element.as_integer_mut().unwrap().set_value(value);
                Ok(())
            })
            .unwrap();
        }
        let encoded = list.to_wire().unwrap();
        assert_eq!(
            encoded,
            hex!("30 18 02 01 00 02 01 01 02 01 02 02 01 03 02 01 04 02 01 05 02 01 06 02 01 07")
        );

        let mut decoded = SequenceOf::new(Integer::new());
        decoded.from_wire(&encoded, Mode::Der).unwrap();
        assert_eq!(decoded.len(), 8);
        assert_eq!(decoded, list);
        assert_eq!(decoded.prototype(), &Node::from(Integer::new()));
    }

    #[test]
    fn sequence_of_explicit() {
        let mut list = SequenceOf::new(Integer::new()).explicit(Tag::context(3));
        list.push(Integer::new().with_value(1));
        assert_eq!(list.to_wire().unwrap(), hex!("a3 05 30 03 02 01 01"));
    }

    #[test]
    fn sequence_of_sequences() {
        let element = Sequence::new(vec![
            Boolean::new().named("bool").with_default(true).into(),
            Integer::new().named("int").into(),
            OctetString::new().named("os").into(),
        ]);
        let bytes = [
            &hex!("30 1a 30 09 02 01 0c 04 04 61 62 63 64")[..],
            &hex!("30 0d 01 01 00 02 03 00 ff fe 04 03 6e 6f 70")[..],
        ]
        .concat();

        let mut list = SequenceOf::new(element);
        list.from_wire(&bytes, Mode::Der).unwrap();
        assert_eq!(list.len(), 2);

        let second = list.elements()[1].as_sequence().unwrap();
        let flag = second.field("bool").and_then(Node::as_boolean).unwrap();
        assert_eq!(flag.value(), Some(&false));
        assert_eq!(id(second, "int"), Some(65534));

        let first = list.elements()[0].as_sequence().unwrap();
        assert_eq!(first.field("bool").and_then(Node::as_boolean).unwrap().value(), Some(&true));

        assert_eq!(list.to_wire().unwrap(), bytes);
        let prototype = list.prototype().as_sequence().unwrap();
        assert_eq!(id(prototype, "int"), None);
    }

    #[test]
    fn sequence_of_wrong_element() {
        let mut list = SequenceOf::new(Integer::new());
        let err = list.from_wire(&hex!("30 05 02 01 01 05 00"), Mode::Der).unwrap_err();
        assert_eq!(
            err.kind(),
            ErrorKind::TagMismatch { expected: Tag::INTEGER, actual: Tag::NULL }
        );
        assert!(list.is_empty());
    }

    #[test]
    fn empty_sequence_of() {
        let list = SequenceOf::set_of(Integer::new());
        assert_eq!(list.to_wire().unwrap(), hex!("31 00"));
        assert_eq!(list.encoded_length().unwrap(), Length::from(2u8));

        let optional = SequenceOf::new(Integer::new()).optional();
        assert!(optional.to_wire().unwrap().is_empty());
    }
}
