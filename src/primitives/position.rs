//! Logoot positions: variable-length, branch-tagged lexicographic keys.
//!
//! A position is a sequence of levels, each an `(atom, branch)` pair. Two
//! positions are compared level by level: atoms first, branch rank breaks
//! ties. When one position is a strict prefix of the other, the shorter one
//! sorts first — the same convention the order-statistic tree's node
//! comparator extends to whole runs.
//!
//! [`Position`] adds the two sentinels every search and merge routine needs
//! to reason about the edges of the document without special-casing them:
//! `DocStart` compares less than every real position, `DocEnd` compares
//! greater than every real position.

use std::cmp::Ordering;

use smallvec::{smallvec, SmallVec};

use super::branch::{BranchOrder, BranchRank};
use super::logoot_int::LogootInt;

/// One level of a [`LogootPosition`]: an atom value tagged with the branch
/// that generated it.
pub type Level = (LogootInt, BranchRank);

/// A concrete, variable-length position key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogootPosition {
    levels: SmallVec<[Level; 2]>,
}

impl LogootPosition {
    pub fn from_levels(levels: SmallVec<[Level; 2]>) -> LogootPosition {
        assert!(!levels.is_empty(), "a position must have at least one level");
        return LogootPosition { levels };
    }

    pub fn single(atom: LogootInt, branch: BranchRank) -> LogootPosition {
        return LogootPosition {
            levels: smallvec![(atom, branch)],
        };
    }

    /// Number of levels.
    pub fn len(&self) -> usize {
        return self.levels.len();
    }

    /// The atom at `level`, the per-spec `l(level)` accessor.
    pub fn atom_at(&self, level: usize) -> Option<&LogootInt> {
        return self.levels.get(level).map(|(atom, _)| atom);
    }

    pub fn branch_at(&self, level: usize) -> Option<BranchRank> {
        return self.levels.get(level).map(|(_, branch)| *branch);
    }

    pub fn level_at(&self, level: usize) -> Option<&Level> {
        return self.levels.get(level);
    }

    pub fn levels(&self) -> &[Level] {
        return &self.levels;
    }

    /// A new position equal to `self` with the lowest (last) level's atom
    /// incremented by `k`.
    pub fn offset_lowest(&self, k: i64) -> LogootPosition {
        let mut levels = self.levels.clone();
        let last = levels.last_mut().expect("position has at least one level");
        last.0 = last.0.add_i64(k);
        return LogootPosition { levels };
    }

    /// A new position equal to `self` with the lowest level's atom
    /// decremented by `k`.
    pub fn inverse_offset_lowest(&self, k: i64) -> LogootPosition {
        return self.offset_lowest(-k);
    }

    /// Longest shared prefix length with `other`, comparing both atom and
    /// branch at each level.
    pub fn common_prefix_len(&self, other: &LogootPosition) -> usize {
        let mut n = 0;
        while n < self.levels.len() && n < other.levels.len() && self.levels[n] == other.levels[n]
        {
            n += 1;
        }
        return n;
    }

    /// Signed atom distance from `self` to `other`, measured at `self`'s
    /// own nesting level. Both positions must share that many levels —
    /// true whenever `other` was derived from `self` via `offset_lowest`,
    /// the only case the merge engine ever calls this for.
    pub fn atom_distance_to(&self, other: &LogootPosition) -> i64 {
        let level = self.levels.len() - 1;
        let from = self.atom_at(level).and_then(|a| a.to_i64()).unwrap_or(0);
        let to = other.atom_at(level).and_then(|a| a.to_i64()).unwrap_or(0);
        return to - from;
    }
}

impl PartialOrd for LogootPosition {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        return Some(self.cmp(other));
    }
}

impl Ord for LogootPosition {
    fn cmp(&self, other: &Self) -> Ordering {
        let depth = self.levels.len().min(other.levels.len());
        for i in 0..depth {
            let (a_atom, a_branch) = &self.levels[i];
            let (b_atom, b_branch) = &other.levels[i];
            match a_atom.cmp(b_atom) {
                Ordering::Equal => {}
                other => return other,
            }
            match a_branch.cmp(b_branch) {
                Ordering::Equal => continue,
                other => return other,
            }
        }
        // Shared prefix exhausted: the shorter position sorts first.
        return self.levels.len().cmp(&other.levels.len());
    }
}

/// A [`LogootPosition`] together with the document-boundary sentinels.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Position {
    Start,
    At(LogootPosition),
    End,
}

impl Position {
    pub fn is_start(&self) -> bool {
        return matches!(self, Position::Start);
    }

    pub fn is_end(&self) -> bool {
        return matches!(self, Position::End);
    }

    pub fn as_concrete(&self) -> Option<&LogootPosition> {
        match self {
            Position::At(p) => Some(p),
            _ => None,
        }
    }

    fn atom_at(&self, level: usize) -> Option<&LogootInt> {
        match self {
            Position::At(p) => p.atom_at(level),
            _ => None,
        }
    }

    fn level_at(&self, level: usize) -> Option<&Level> {
        match self {
            Position::At(p) => p.level_at(level),
            _ => None,
        }
    }

    fn remaining_after(&self, level: usize) -> usize {
        match self {
            Position::At(p) => p.len().saturating_sub(level + 1),
            _ => 0,
        }
    }
}

impl PartialOrd for Position {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        return Some(self.cmp(other));
    }
}

impl Ord for Position {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Position::Start, Position::Start) => Ordering::Equal,
            (Position::Start, _) => Ordering::Less,
            (_, Position::Start) => Ordering::Greater,
            (Position::End, Position::End) => Ordering::Equal,
            (Position::End, _) => Ordering::Greater,
            (_, Position::End) => Ordering::Less,
            (Position::At(a), Position::At(b)) => a.cmp(b),
        }
    }
}

impl From<LogootPosition> for Position {
    fn from(p: LogootPosition) -> Position {
        return Position::At(p);
    }
}

/// Generate a position strictly between `left` and `right` on `branch`,
/// such that a run of `length` contiguous atoms starting at the result all
/// lie in the open interval `(left, right)`.
///
/// Implements the resolved open question: when neither neighbour has room
/// at the shared prefix, we descend on whichever neighbour has the shorter
/// remaining suffix, breaking ties toward the left.
pub fn new_between<B: Clone + Eq + std::hash::Hash>(
    branch: &B,
    length: u64,
    left: &Position,
    right: &Position,
    branch_order: &mut BranchOrder<B>,
) -> LogootPosition {
    let new_branch = branch_order.branch_of(branch);
    return new_between_ranked(length, left, right, new_branch);
}

/// Same algorithm as [`new_between`], for a caller that has already
/// resolved its branch to a [`BranchRank`] (e.g. a merge engine applying a
/// remote operation whose branch was registered when the operation was
/// first received).
pub fn new_between_ranked(length: u64, left: &Position, right: &Position, new_branch: BranchRank) -> LogootPosition {
    let mut levels: SmallVec<[Level; 2]> = SmallVec::new();
    let mut i = 0usize;

    loop {
        let left_level = left.level_at(i);
        let right_level = right.level_at(i);

        match (left_level, right_level) {
            (None, None) => {
                levels.push((LogootInt::from_i64(0), new_branch));
                break;
            }
            (None, Some((r_atom, _))) => {
                let base = r_atom.add_i64(-((length as i64) + 1));
                levels.push((base, new_branch));
                break;
            }
            (Some((l_atom, _)), None) => {
                let base = l_atom.add_i64(1);
                levels.push((base, new_branch));
                break;
            }
            (Some((l_atom, _l_branch)), Some((r_atom, _r_branch))) => {
                // Room exists between l_atom and r_atom iff r_atom - l_atom > length.
                let gap_allows_room = match r_atom.to_i64().zip(l_atom.to_i64()) {
                    Some((r, l)) => r.saturating_sub(l) > length as i64,
                    None => true, // atoms too large to fit in i64: treat as ample room
                };

                if gap_allows_room {
                    let base = l_atom.add_i64(1);
                    levels.push((base, new_branch));
                    break;
                }

                let left_remaining = left.remaining_after(i);
                let right_remaining = right.remaining_after(i);
                if left_remaining <= right_remaining {
                    levels.push(left_level.unwrap().clone());
                } else {
                    levels.push(right_level.unwrap().clone());
                }
                i += 1;
            }
        }
    }

    return LogootPosition::from_levels(levels);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order() -> BranchOrder<&'static str> {
        return BranchOrder::new();
    }

    #[test]
    fn between_start_and_end_produces_single_level() {
        let mut order = order();
        let p = new_between(&"a", 3, &Position::Start, &Position::End, &mut order);
        assert_eq!(p.len(), 1);
    }

    #[test]
    fn generated_position_sorts_between_bounds() {
        let mut order = order();
        let left = Position::At(LogootPosition::single(LogootInt::from_i64(10), order.branch_of(&"a")));
        let right = Position::At(LogootPosition::single(LogootInt::from_i64(20), order.branch_of(&"a")));
        let p = new_between(&"b", 1, &left, &right, &mut order);
        let pos = Position::At(p);
        assert!(left < pos);
        assert!(pos < right);
    }

    #[test]
    fn no_room_at_shared_prefix_descends_a_level() {
        let mut order = order();
        let a = order.branch_of(&"a");
        let left = Position::At(LogootPosition::single(LogootInt::from_i64(10), a));
        let right = Position::At(LogootPosition::single(LogootInt::from_i64(11), a));
        let p = new_between(&"b", 1, &left, &right, &mut order);
        assert_eq!(p.len(), 2);
        assert!(Position::At(p.clone()) > left);
        assert!(Position::At(p) < right);
    }

    #[test]
    fn offset_lowest_advances_last_level_only() {
        let mut order = order();
        let base = LogootPosition::from_levels(smallvec![
            (LogootInt::from_i64(1), order.branch_of(&"a")),
            (LogootInt::from_i64(5), order.branch_of(&"b")),
        ]);
        let shifted = base.offset_lowest(3);
        assert_eq!(shifted.atom_at(0), base.atom_at(0));
        assert_eq!(shifted.atom_at(1).unwrap().to_i64(), Some(8));
    }

    #[test]
    fn shorter_prefix_sorts_first() {
        let mut order = order();
        let a = order.branch_of(&"a");
        let b = order.branch_of(&"b");
        let short = LogootPosition::single(LogootInt::from_i64(5), a);
        let long = LogootPosition::from_levels(smallvec![
            (LogootInt::from_i64(5), a),
            (LogootInt::from_i64(1), b),
        ]);
        assert!(short < long);
    }

    #[test]
    fn sentinels_bound_every_position() {
        let mut order = order();
        let p = Position::At(LogootPosition::single(LogootInt::from_i64(0), order.branch_of(&"a")));
        assert!(Position::Start < p);
        assert!(p < Position::End);
    }
}
