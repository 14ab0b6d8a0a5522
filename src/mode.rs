//! Parse modes.

/// How strictly encoded input is checked while decoding.
///
/// Encoding always produces DER.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum Mode {
    /// Distinguished Encoding Rules.
    ///
    /// Only the shortest encodings of tag numbers, lengths and integers are
    /// accepted, booleans must be `0x00` or `0xFF`, and the indefinite length
    /// form is rejected.
    #[default]
    Der,

    /// Basic Encoding Rules.
    ///
    /// Accepts alternative encodings of the same value as well as indefinite
    /// length constructed values terminated by End-of-Contents.
    Ber,
}

impl Mode {
    /// The mode matching a `lenient` flag.
    pub const fn from_lenient(lenient: bool) -> Self {
        if lenient {
            Mode::Ber
        } else {
            Mode::Der
        }
    }

    /// Is this the canonical (DER) mode?
    pub const fn is_strict(self) -> bool {
        matches!(self, Mode::Der)
    }

    /// Does this mode allow indefinite length constructed values?
    pub const fn allows_indefinite(self) -> bool {
        matches!(self, Mode::Ber)
    }
}
