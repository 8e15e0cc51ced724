//! Branch identity: mapping opaque caller-supplied branch ids to a compact,
//! stable total order.
//!
//! Logoot positions tag every level with the branch that generated it.
//! Comparing two positions generated on different branches needs a total
//! order over branches, but the engine has no opinion about what a branch
//! "is" — it could be a public key, a hostname, a random u128. So callers
//! register their branch id once and get back a small, ordered [`BranchRank`]
//! to embed in positions instead.
//!
//! Ranks are assigned in registration order: the first branch registered on
//! a given [`BranchOrder`] gets the lowest rank. This makes position
//! generation deterministic given a fixed registration order, but the order
//! itself is local to each replica's registry and is never assumed to agree
//! across replicas except by rank value once both sides have registered the
//! same branch (callers are responsible for assigning branch ids that sort
//! consistently everywhere, e.g. by embedding a globally unique value).

use std::hash::Hash;

use rustc_hash::FxHashMap;

/// A compact, totally ordered stand-in for a branch id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BranchRank(pub u32);

impl BranchRank {
    /// Sentinel rank used by tests and placeholder positions; never
    /// assigned by [`BranchOrder::branch_of`].
    pub const NONE: BranchRank = BranchRank(u32::MAX);

    pub fn new(idx: u32) -> BranchRank {
        return BranchRank(idx);
    }

    pub fn is_none(&self) -> bool {
        return self.0 == u32::MAX;
    }
}

/// A registry assigning stable ranks to branch identifiers.
///
/// Generic over the caller's branch id type so the engine never needs to
/// know what identifies a replica.
#[derive(Clone, Debug)]
pub struct BranchOrder<B: Clone + Eq + Hash> {
    id_to_rank: FxHashMap<B, BranchRank>,
    rank_to_id: Vec<B>,
}

impl<B: Clone + Eq + Hash> Default for BranchOrder<B> {
    fn default() -> Self {
        return Self::new();
    }
}

impl<B: Clone + Eq + Hash> BranchOrder<B> {
    pub fn new() -> BranchOrder<B> {
        return BranchOrder {
            id_to_rank: FxHashMap::default(),
            rank_to_id: Vec::new(),
        };
    }

    /// Get or assign a rank for `branch`.
    ///
    /// Panics if more than `u32::MAX - 1` distinct branches are registered.
    pub fn branch_of(&mut self, branch: &B) -> BranchRank {
        if let Some(&rank) = self.id_to_rank.get(branch) {
            return rank;
        }

        let idx = self.rank_to_id.len();
        assert!(idx < (u32::MAX - 1) as usize, "too many branches registered");

        let rank = BranchRank::new(idx as u32);
        self.rank_to_id.push(branch.clone());
        self.id_to_rank.insert(branch.clone(), rank);
        return rank;
    }

    /// Look up a branch's rank without registering it.
    #[inline]
    pub fn rank_of(&self, branch: &B) -> Option<BranchRank> {
        return self.id_to_rank.get(branch).copied();
    }

    /// Look up the branch id that holds a given rank.
    #[inline]
    pub fn id_of(&self, rank: BranchRank) -> Option<&B> {
        if rank.is_none() {
            return None;
        }
        return self.rank_to_id.get(rank.0 as usize);
    }

    #[inline]
    pub fn len(&self) -> usize {
        return self.rank_to_id.len();
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        return self.rank_to_id.is_empty();
    }
}
