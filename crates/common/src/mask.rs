use serde::{Deserialize, Serialize};

/// A face of a block that a rail segment can connect through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Side {
    Top,
    Left,
    Right,
    Front,
    Back,
    Bottom,
}

impl Side {
    pub const ALL: [Side; 6] = [
        Side::Top,
        Side::Left,
        Side::Right,
        Side::Front,
        Side::Back,
        Side::Bottom,
    ];

    /// Bit this side occupies in a [`ConnectivityMask`].
    pub const fn flag(self) -> u8 {
        1 << self as u8
    }
}

/// Failure to read a connectivity mask out of a block identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("identifier {identifier:?} is not a decimal connectivity byte: {reason}")]
pub struct MaskParseError {
    pub identifier: String,
    pub reason: String,
}

/// One bit per connected side of a rail segment.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct ConnectivityMask(pub u8);

impl ConnectivityMask {
    pub const EMPTY: ConnectivityMask = ConnectivityMask(0);

    pub fn from_sides(sides: &[Side]) -> Self {
        Self(sides.iter().fold(0, |bits, side| bits | side.flag()))
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Number of connected sides (set bits over the whole byte).
    pub const fn connection_count(self) -> u32 {
        self.0.count_ones()
    }

    /// A T-junction connects exactly three sides.
    pub const fn is_junction(self) -> bool {
        self.connection_count() == 3
    }

    pub const fn connects(self, side: Side) -> bool {
        self.0 & side.flag() != 0
    }

    /// The named sides this mask connects.
    ///
    /// Only the low six bits name a side. Bits 6 and 7 still count toward
    /// [`connection_count`](Self::connection_count), so a mask like
    /// `0b1100_0001` is a junction while yielding a single side here.
    pub fn sides(self) -> impl Iterator<Item = Side> {
        Side::ALL.into_iter().filter(move |s| self.connects(*s))
    }

    /// Decode a mask from a block identifier holding its decimal form.
    ///
    /// Compatibility path for block types that do not carry the mask as an
    /// explicit attribute. Surrounding whitespace is not accepted.
    pub fn parse_identifier(identifier: &str) -> Result<Self, MaskParseError> {
        identifier
            .parse::<u8>()
            .map(Self)
            .map_err(|e| MaskParseError {
                identifier: identifier.to_string(),
                reason: e.to_string(),
            })
    }
}

impl std::fmt::Display for ConnectivityMask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#010b}", self.0)
    }
}
