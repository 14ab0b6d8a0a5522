//! # berval
//!
//! ASN.1 values as trees of typed nodes, encoded and decoded under the Basic
//! Encoding Rules (BER) and Distinguished Encoding Rules (DER).
//!
//! Every encoded value is a TLV unit: identifier octets (class, primitive or
//! constructed, tag number), length octets (short, long, or BER indefinite form)
//! and content octets.
//!
//! - Build a tree of [`Node`]s: primitives ([`Boolean`], [`Integer`], [`OctetString`],
//!   restricted strings, ...), [`Sequence`], [`SequenceOf`] and [`Choice`].
//! - Each node carries its own tagging ([`Tagging::Implicit`], [`Tagging::Explicit`])
//!   and may be OPTIONAL or have a DEFAULT value.
//! - [`Value::to_wire`] always produces DER. [`Value::from_wire`] parses strictly
//!   ([`Mode::Der`]) or leniently ([`Mode::Ber`]) and reports how many bytes the
//!   node consumed.
//!
//! ```
//! use berval::{Boolean, Integer, Mode, Node, OctetString, Sequence, Value};
//!
//! let mut record = Sequence::new(vec![
//!     Boolean::new().named("flag").with_default(true).into(),
//!     Integer::new().named("id").into(),
//!     OctetString::new().named("data").into(),
//! ]);
//! record.from_wire(b"\x30\x09\x02\x01\x0c\x04\x04abcd", Mode::Der).unwrap();
//!
//! let id = record.field("id").and_then(Node::as_integer).unwrap();
//! assert_eq!(id.value().and_then(|int| int.to_i64()), Some(12));
//! assert_eq!(record.to_wire().unwrap(), b"\x30\x09\x02\x01\x0c\x04\x04abcd");
//! ```
//!
//! ## Origin
//! The wire layer (tags, lengths, headers, the decoder and encoder cursors) is a
//! remix of `flexiber`, itself a remix of `RustCrypto/utils/der`, extended with
//! multi-byte tag numbers, long-form and indefinite lengths, and a strict/lenient
//! parse mode.

#![no_std]
#![forbid(unsafe_code)]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

#[macro_use]
extern crate delog;
generate_macros!();

mod choice;
mod constructed;
mod decoder;
mod encoder;
mod error;
mod header;
mod length;
mod mode;
mod node;
mod primitive;
mod tag;
pub mod trace;
mod traits;

pub use choice::Choice;
pub use constructed::{Sequence, SequenceOf};
pub use decoder::Decoder;
pub use encoder::Encoder;
pub use error::{Error, ErrorKind, Result};
pub(crate) use header::Header;
pub use length::Length;
pub use mode::Mode;
pub use node::{Node, Options, Summary, Tagging, Value};
pub use primitive::{
    kinds, BitString, Bits, Boolean, Enumerated, Ia5String, Int, Integer, Kind, Null,
    NumericString, OctetString, Primitive, PrintableString, Size, Utf8String, VisibleString,
};
pub use tag::{Class, Tag};
pub use traits::{Decodable, Encodable};
