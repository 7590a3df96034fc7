//! Merge tier of a fruit.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Errors produced when constructing a [`Rank`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RankError {
    /// The value lies outside `1..=10`.
    #[error("rank {0} is out of range 1..=10")]
    OutOfRange(u8),
}

/// Merge tier of a fruit, always within `1..=10`.
///
/// Rank 10 is terminal: two rank-10 fruits never combine.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[serde(try_from = "u8", into = "u8")]
#[ts(export, export_to = "bindings/")]
pub struct Rank(u8);

impl Rank {
    /// Lowest rank.
    pub const MIN: Self = Self(1);
    /// Highest rank. Never a merge input.
    pub const MAX: Self = Self(10);

    /// Validate and wrap a raw rank value.
    pub const fn new(value: u8) -> Result<Self, RankError> {
        if value >= Self::MIN.0 && value <= Self::MAX.0 {
            Ok(Self(value))
        } else {
            Err(RankError::OutOfRange(value))
        }
    }

    /// Return the raw value.
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Whether this is the terminal rank.
    pub const fn is_max(self) -> bool {
        self.0 == Self::MAX.0
    }

    /// The rank produced by merging two fruits of this rank, if any.
    pub const fn next(self) -> Option<Self> {
        if self.is_max() {
            None
        } else {
            Some(Self(self.0.saturating_add(1)))
        }
    }

    /// Iterate over every rank from lowest to highest.
    pub fn all() -> impl Iterator<Item = Self> {
        (Self::MIN.0..=Self::MAX.0).map(Self)
    }
}

impl TryFrom<u8> for Rank {
    type Error = RankError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Rank> for u8 {
    fn from(rank: Rank) -> Self {
        rank.0
    }
}

impl core::fmt::Display for Rank {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range() {
        assert_eq!(Rank::new(0), Err(RankError::OutOfRange(0)));
        assert_eq!(Rank::new(11), Err(RankError::OutOfRange(11)));
        assert!(Rank::new(1).is_ok());
        assert!(Rank::new(10).is_ok());
    }

    #[test]
    fn max_rank_has_no_successor() {
        assert_eq!(Rank::MAX.next(), None);
        assert_eq!(Rank::MIN.next().map(Rank::get), Some(2));
    }

    #[test]
    fn all_covers_ten_ranks() {
        let ranks: Vec<u8> = Rank::all().map(Rank::get).collect();
        assert_eq!(ranks, (1..=10).collect::<Vec<u8>>());
    }

    #[test]
    fn deserialize_validates() {
        let ok: Result<Rank, _> = serde_json::from_str("4");
        assert_eq!(ok.ok().map(Rank::get), Some(4));
        let bad: Result<Rank, _> = serde_json::from_str("12");
        assert!(bad.is_err());
    }
}
