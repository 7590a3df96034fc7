//! Static rank table: seed yield, radius and merge score per rank.

use seedfall_types::Rank;

/// Physical radius of each rank, indexed by `rank - 1`.
const RADII: [f32; 10] = [
    15.0, 20.0, 26.0, 32.0, 39.0, 47.0, 56.0, 66.0, 77.0, 90.0,
];

/// Seeds earned when a fruit of `rank` is produced by a merge.
///
/// | rank | yield |
/// |------|-------|
/// | 1-3  | 0 |
/// | 4-5  | rank - 3 |
/// | 6-7  | rank - 2 |
/// | 8-10 | rank |
pub fn yield_for(rank: Rank) -> u64 {
    let r = u64::from(rank.get());
    match r {
        0..=3 => 0,
        4 | 5 => r.saturating_sub(3),
        6 | 7 => r.saturating_sub(2),
        _ => r,
    }
}

/// Physical radius of a fruit of `rank`, in container units.
pub fn radius_for(rank: Rank) -> f32 {
    let index = usize::from(rank.get().saturating_sub(1));
    RADII
        .get(index)
        .or_else(|| RADII.last())
        .copied()
        .unwrap_or_default()
}

/// Score awarded for producing a fruit of `rank` by a merge.
pub fn merge_score(rank: Rank) -> u64 {
    u64::from(rank.get()).saturating_mul(10)
}
