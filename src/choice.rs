use alloc::{boxed::Box, vec::Vec};
use core::{fmt, slice};

use crate::node::{expect_header, summarize_options};
use crate::{
    Decoder, Encodable, Encoder, ErrorKind, Header, Length, Node, Options, Result, Tag, Tagging,
    Value,
};

/// CHOICE node: exactly one of an ordered list of alternatives.
///
/// Decoding tries the alternatives in order on the same input and keeps the
/// first whose tag matches; any other failure of an alternative fails the
/// whole decode. The alternatives themselves are prototypes and never change:
/// the chosen one is a copy.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Choice {
    options: Options,
    alternatives: Vec<Node>,
    chosen: Option<(usize, Box<Node>)>,
}

impl Choice {
    /// CHOICE between `alternatives`, none of which may be OPTIONAL or have
    /// a DEFAULT.
    pub fn new(alternatives: Vec<Node>) -> Result<Self> {
        if alternatives.is_empty() {
            return Err(ErrorKind::InvalidAlternative { index: 0 }.into());
        }
        if let Some(index) = alternatives
            .iter()
            .position(|alternative| alternative.is_optional() || alternative.has_default())
        {
            return Err(ErrorKind::InvalidAlternative { index }.into());
        }
        Ok(Self {
            options: Options::default(),
            alternatives,
            chosen: None,
        })
    }

    /// Set the diagnostic label.
    pub fn named(mut self, name: impl Into<alloc::string::String>) -> Self {
        self.options.name = name.into();
        self
    }

    /// Mark the CHOICE OPTIONAL.
    pub fn optional(mut self) -> Self {
        self.options.optional = true;
        self
    }

    /// Wrap the chosen alternative in a constructed TLV tagged `tag`.
    ///
    /// There is no implicit tagging for a CHOICE, its tag being that of the
    /// alternative.
    pub fn explicit(mut self, tag: Tag) -> Self {
        self.options.tagging = Tagging::Explicit(tag);
        self
    }

    pub fn alternatives(&self) -> &[Node] {
        &self.alternatives
    }

    /// Choose the alternative at `index`, returning a fresh copy of it to fill in.
    pub fn choose(&mut self, index: usize) -> Result<&mut Node> {
        let alternative = self
            .alternatives
            .get(index)
            .ok_or(ErrorKind::InvalidAlternative { index })?;
        let fresh = Box::new(alternative.clone());
        let (_, node) = self.chosen.insert((index, fresh));
        Ok(&mut **node)
    }

    /// Index of the chosen alternative.
    pub fn chosen(&self) -> Option<usize> {
        self.chosen.as_ref().map(|(index, _)| *index)
    }

    pub fn chosen_value(&self) -> Result<&Node> {
        match &self.chosen {
            Some((_, node)) => Ok(&**node),
            None => Err(ErrorKind::ChoiceUnset.into()),
        }
    }

    pub fn chosen_value_mut(&mut self) -> Result<&mut Node> {
        match &mut self.chosen {
            Some((_, node)) => Ok(&mut **node),
            None => Err(ErrorKind::ChoiceUnset.into()),
        }
    }

    /// The chosen alternative as a slice of zero or one node.
    pub(crate) fn chosen_slice(&self) -> &[Node] {
        match &self.chosen {
            Some((_, node)) => slice::from_ref(&**node),
            None => &[],
        }
    }

    fn chosen_or_unset(&self) -> Result<Option<&Node>> {
        match &self.chosen {
            Some((_, node)) => Ok(Some(&**node)),
            None if self.options.optional => Ok(None),
            None => Err(ErrorKind::ChoiceUnset.into()),
        }
    }

    /// Try each alternative on the next TLV, in order.
    fn trial(&self, decoder: &mut Decoder<'_>) -> Result<(usize, Box<Node>)> {
        let start = decoder.position();
        let actual = match decoder.peek_tag()? {
            Some(tag) => tag,
            None => return decoder.error(ErrorKind::MalformedTag),
        };

        for (index, alternative) in self.alternatives.iter().enumerate() {
            let mut attempt = decoder.clone();
            let mut node = alternative.clone();
            match node.decode_present(&mut attempt) {
                Ok(()) => {
                    *decoder = attempt;
                    return Ok((index, Box::new(node)));
                }
                Err(e) if e.kind().is_tag_mismatch() && e.position() == Some(start) => continue,
                Err(e) => return decoder.error_at(e.kind(), e.position().unwrap_or(start)),
            }
        }

        decoder.error(ErrorKind::NoMatchingAlternative { actual })
    }
}

impl Encodable for Choice {
    fn encoded_length(&self) -> Result<Length> {
        let node = match self.chosen_or_unset()? {
            Some(node) => node,
            None => return Ok(Length::zero()),
        };
        let inner = node.encoded_length()?;
        match self.options.tagging {
            Tagging::Explicit(tag) => {
                Header::definite(tag.constructed(), inner).encoded_length() + inner
            }
            _ => Ok(inner),
        }
    }

    fn encode(&self, encoder: &mut Encoder<'_>) -> Result<()> {
        let node = match self.chosen_or_unset()? {
            Some(node) => node,
            None => return Ok(()),
        };
        if let Tagging::Explicit(tag) = self.options.tagging {
            let inner = node.encoded_length()?;
            encoder.encode(&Header::definite(tag.constructed(), inner))?;
        }
        encoder.encode(node)
    }
}

impl Value for Choice {
    fn options(&self) -> &Options {
        &self.options
    }

    /// The explicit tag, or else the tag of the chosen alternative (of the
    /// first one while nothing is chosen).
    fn tag(&self) -> Tag {
        match (self.options.tagging, &self.chosen) {
            (Tagging::Explicit(tag), _) => tag.constructed(),
            (_, Some((_, node))) => node.tag(),
            (_, None) => self
                .alternatives
                .first()
                .map_or(Tag::END_OF_CONTENTS, |alternative| alternative.tag()),
        }
    }

    fn accepts(&self, tag: Tag) -> bool {
        match self.options.tagging {
            Tagging::Explicit(explicit) => tag == explicit.constructed(),
            _ => self
                .alternatives
                .iter()
                .any(|alternative| alternative.accepts(tag)),
        }
    }

    fn mismatch(&self, actual: Tag) -> ErrorKind {
        match self.options.tagging {
            Tagging::Explicit(tag) => ErrorKind::TagMismatch {
                expected: tag.constructed(),
                actual,
            },
            _ => ErrorKind::NoMatchingAlternative { actual },
        }
    }

    fn has_value(&self) -> bool {
        self.chosen.is_some()
    }

    fn is_elided(&self) -> bool {
        self.options.optional && self.chosen.is_none()
    }

    fn clear(&mut self) {
        self.chosen = None;
    }

    fn decode_value(&mut self, decoder: &mut Decoder<'_>) -> Result<()> {
        let chosen = match self.options.tagging {
            Tagging::Explicit(tag) => {
                let outer = expect_header(decoder, tag.constructed())?;
                decoder.nested(outer.length, |inner| self.trial(inner))?
            }
            _ => self.trial(decoder)?,
        };
        trace!("{}: CHOICE resolved to alternative {}", self.name(), chosen.0);
        self.chosen = Some(chosen);
        Ok(())
    }

    fn summarize(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        summarize_options(f, &self.options, &"CHOICE")
    }
}

#[cfg(test)]
mod tests {
    use super::Choice;
    use crate::{
        Encodable, ErrorKind, Integer, Length, Mode, Node, Null, OctetString, Sequence, Tag, Value,
    };
    use alloc::{format, vec};
    use hex_literal::hex;

    fn choice() -> Choice {
        Choice::new(vec![
            Integer::new().implicit(Tag::context(0)).into(),
            OctetString::new().implicit(Tag::context(1)).into(),
        ])
        .unwrap()
        .named("pick")
    }

    #[test]
    fn declaration_order() {
        let mut choice = choice();
        let consumed = choice.from_wire(b"\x81\x03abc", Mode::Der).unwrap();
        assert_eq!(consumed, Length::from(5u8));
        assert_eq!(choice.chosen(), Some(1));
        let value = choice.chosen_value().unwrap().as_octet_string().unwrap().value();
        assert_eq!(value.map(|v| v.as_slice()), Some(&b"abc"[..]));
        // the prototype stays blank
        assert_eq!(choice.alternatives()[1].as_octet_string().unwrap().value(), None);

        choice.from_wire(&hex!("80 01 2a"), Mode::Der).unwrap();
        assert_eq!(choice.chosen(), Some(0));
    }

    #[test]
    fn first_match_wins() {
        let mut choice = Choice::new(vec![
            Integer::new().named("first").into(),
            Integer::new().named("second").into(),
        ])
        .unwrap();
        choice.from_wire(&hex!("02 01 01"), Mode::Der).unwrap();
        assert_eq!(choice.chosen(), Some(0));
    }

    #[test]
    fn no_matching_alternative() {
        let mut choice = choice();
        choice.choose(0).unwrap().as_integer_mut().unwrap().set_value(1);

        let err = choice.from_wire(b"\x04\x03abc", Mode::Der).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoMatchingAlternative { actual: Tag::OCTET_STRING });
        assert!(err.kind().is_asn1_error());
        assert_eq!(err.position(), Some(Length::zero()));
        // previous choice kept
        assert_eq!(choice.chosen(), Some(0));
    }

    #[test]
    fn content_errors_are_fatal() {
        let mut choice = Choice::new(vec![
            Integer::new().into(),
            Sequence::raw().implicit(Tag::INTEGER).into(),
        ])
        .unwrap();
        // non-minimal integer: does not fall through to the next alternative
        let err = choice.from_wire(&hex!("02 02 00 01"), Mode::Der).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Noncanonical { tag: Tag::INTEGER });
        assert_eq!(choice.chosen(), None);
    }

    #[test]
    fn encode_chosen() {
        let mut choice = choice();
        let err = choice.to_wire().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ChoiceUnset);
        assert_eq!(choice.chosen_value().unwrap_err().kind(), ErrorKind::ChoiceUnset);

        choice
            .choose(1)
            .unwrap()
            .as_octet_string_mut()
            .unwrap()
            .set_value("abc");
        assert_eq!(choice.to_wire().unwrap(), b"\x81\x03abc");
        assert_eq!(choice.tag(), Tag::context(1));

        let err = choice.choose(2).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidAlternative { index: 2 });
    }

    #[test]
    fn invalid_alternatives() {
        let err =
            Choice::new(vec![Null::new().into(), Integer::new().optional().into()]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidAlternative { index: 1 });

        let err = Choice::new(vec![Integer::new().with_default(3).into()]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidAlternative { index: 0 });

        assert!(Choice::new(vec![]).is_err());
    }

    #[test]
    fn explicit_choice() {
        let mut choice = Choice::new(vec![Null::new().into(), Integer::new().into()])
            .unwrap()
            .explicit(Tag::context(2));
        choice.choose(1).unwrap().as_integer_mut().unwrap().set_value(9);
        let encoded = choice.to_wire().unwrap();
        assert_eq!(encoded, hex!("a2 03 02 01 09"));
        assert_eq!(choice.encoded_length().unwrap(), Length::from(5u8));

        let mut decoded = Choice::new(vec![Null::new().into(), Integer::new().into()])
            .unwrap()
            .explicit(Tag::context(2));
        decoded.from_wire(&encoded, Mode::Der).unwrap();
        assert_eq!(decoded, choice);

        let err = decoded.from_wire(&hex!("02 01 09"), Mode::Der).unwrap_err();
        assert_eq!(
            err.kind(),
            ErrorKind::TagMismatch { expected: Tag::context(2).constructed(), actual: Tag::INTEGER }
        );
    }

    #[test]
    fn optional_choice_in_sequence() {
        let mut sequence = Sequence::new(vec![
            choice().optional().into(),
            Null::new().into(),
        ]);
        assert_eq!(sequence.to_wire().unwrap(), hex!("30 02 05 00"));

        sequence.from_wire(&hex!("30 05 80 01 07 05 00"), Mode::Der).unwrap();
        let pick = sequence.field("pick").and_then(Node::as_choice).unwrap();
        assert_eq!(pick.chosen(), Some(0));
        assert_eq!(
            format!("{}", Node::from(sequence.clone())),
            "SEQUENCE\n  pick CHOICE OPTIONAL\n    [CONTEXT 0] IMPLICIT INTEGER: 7\n  NULL\n"
        );

        sequence.from_wire(&hex!("30 02 05 00"), Mode::Der).unwrap();
        let pick = sequence.field("pick").and_then(Node::as_choice).unwrap();
        assert_eq!(pick.chosen(), None);
    }

    #[test]
    fn nested_choice() {
        let inner = choice();
        let mut outer = Choice::new(vec![Null::new().into(), inner.into()]).unwrap();
        outer.from_wire(b"\x81\x01z", Mode::Der).unwrap();
        assert_eq!(outer.chosen(), Some(1));
        let inner = outer.chosen_value().unwrap().as_choice().unwrap();
        assert_eq!(inner.chosen(), Some(1));
    }
}
