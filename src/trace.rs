//! Observing decoded trees.
//!
//! [`decode_observed`] decodes like [`Value::from_wire`], then reports every
//! node of the result to an [`Observer`]. Decoding itself is unaffected: the
//! consumed byte count and any error come back unchanged.
//!
//! ```
//! use berval::{trace, Integer, Mode, Node, Sequence};
//!
//! let mut record = Node::from(Sequence::new(vec![Integer::new().named("id").into()]));
//! let mut lines = Vec::new();
//! let mut observe = |depth: usize, node: &Node| {
//!     lines.push(format!("{}{}", "  ".repeat(depth), node.summary()));
//! };
//! trace::decode_observed(&mut record, b"\x30\x03\x02\x01\x07", Mode::Der, &mut observe).unwrap();
//! assert_eq!(lines, ["SEQUENCE", "  id INTEGER: 7"]);
//! ```

use core::fmt;

use crate::{Length, Mode, Node, Result, Value};

/// Receives the nodes of a decoded tree, parents first.
pub trait Observer {
    fn observe(&mut self, depth: usize, node: &Node);
}

impl<F: FnMut(usize, &Node)> Observer for F {
    fn observe(&mut self, depth: usize, node: &Node) {
        self(depth, node)
    }
}

/// Decode `node` from the start of `bytes`, then walk the result through `observer`.
///
/// Nothing is observed when decoding fails.
pub fn decode_observed<O>(
    node: &mut Node,
    bytes: &[u8],
    mode: Mode,
    observer: &mut O,
) -> Result<Length>
where
    O: Observer + ?Sized,
{
    let consumed = node.from_wire(bytes, mode)?;
    node.walk(&mut |depth, node| observer.observe(depth, node));
    Ok(consumed)
}

/// Logs one `info!` line per node, indented by depth.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogObserver;

impl Observer for LogObserver {
    fn observe(&mut self, depth: usize, node: &Node) {
        let indent = Indent(depth);
        info!("{}{}", indent, node.summary());
        // used even when info! compiles away
        let _ = (indent, node);
    }
}

struct Indent(usize);

impl fmt::Display for Indent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for _ in 0..self.0 {
            f.write_str("  ")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{decode_observed, LogObserver, Observer};
    use crate::{Boolean, ErrorKind, Integer, Length, Mode, Node, Sequence, SequenceOf};
    use alloc::{format, string::String, vec, vec::Vec};
    use hex_literal::hex;

    #[derive(Default)]
    struct Collect(Vec<(usize, String)>);

    impl Observer for Collect {
        fn observe(&mut self, depth: usize, node: &Node) {
            self.0.push((depth, format!("{}", node.summary())));
        }
    }

    #[test]
    fn pre_order_with_depth() {
        let mut node = Node::from(
            Sequence::new(vec![
                Boolean::new().named("flag").with_default(true).into(),
                SequenceOf::new(Integer::new()).named("list").into(),
            ])
            .named("record"),
        );
        let bytes = hex!("30 08 30 06 02 01 01 02 01 02");

        let mut collect = Collect::default();
        let consumed = decode_observed(&mut node, &bytes, Mode::Der, &mut collect).unwrap();
        assert_eq!(consumed, Length::from(10u8));
        assert_eq!(
            collect.0,
            [
                (0, String::from("record SEQUENCE")),
                (1, String::from("flag BOOLEAN DEFAULT true")),
                (1, String::from("list SEQUENCE OF")),
                (2, String::from("INTEGER: 1")),
                (2, String::from("INTEGER: 2")),
            ]
        );
    }

    #[test]
    fn failures_pass_through() {
        let mut node = Node::from(Integer::new());
        let mut seen = 0;
        let mut count = |_: usize, _: &Node| seen += 1;
        let err = decode_observed(&mut node, &hex!("04 00"), Mode::Der, &mut count).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::TagMismatch { .. }));
        assert_eq!(seen, 0);

        let consumed =
            decode_observed(&mut node, &hex!("02 01 00"), Mode::Der, &mut LogObserver).unwrap();
        assert_eq!(consumed, Length::from(3u8));
    }
}
