//! The public merge engine: ties the tree, position algebra, slicing, and
//! conflict bookkeeping together into the three operations a replica
//! actually calls.
//!
//! `insert_local` turns a local edit (offset + length) into the logical
//! bounds a branch needs to generate a position; `insert_logoot` and
//! `remove_logoot` replay a logical edit, local or remote, against the
//! tree and report back the local edits the caller must apply to its own
//! content buffer.

use std::hash::Hash;

use crate::conflict;
use crate::error::LdmError;
use crate::node::{AnchorLogootNode, NodeType};
use crate::op::{Operation, OperationBuffer};
use crate::ost::{Bound, NodeId, Tree};
use crate::primitives::{new_between_ranked, BranchOrder, BranchRank, Position};
use crate::slice;

/// What a local insert needs to become a logical one: the bounds a branch
/// generates a position between, the clock that beats any tombstone
/// already sitting at that spot, and the run length requested.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InsertEnvelope {
    pub left: Position,
    pub right: Position,
    pub clk: i64,
    pub length: u64,
}

/// A replica's view of a list document: the order-statistic tree plus the
/// branch registry positions are tagged with.
pub struct Doc<B: Clone + Eq + Hash> {
    tree: Tree,
    branches: BranchOrder<B>,
}

impl<B: Clone + Eq + Hash> Default for Doc<B> {
    fn default() -> Self {
        return Self::new();
    }
}

impl<B: Clone + Eq + Hash> Doc<B> {
    pub fn new() -> Doc<B> {
        return Doc {
            tree: Tree::new(),
            branches: BranchOrder::new(),
        };
    }

    /// Get or assign a rank for a branch id, for use as the `branch`
    /// argument to [`Doc::insert_logoot`].
    pub fn branch_of(&mut self, id: B) -> BranchRank {
        return self.branches.branch_of(&id);
    }

    /// Local (visible) length of the document.
    pub fn local_len(&self) -> u64 {
        return self.tree.total_ldoc_length();
    }

    /// Verify every structural invariant the tree is supposed to hold.
    pub fn self_test(&self) -> Result<(), LdmError> {
        return self.tree.self_test();
    }

    fn all_node_ids(&self) -> Vec<NodeId> {
        let mut ids = Vec::new();
        let mut cur = self.tree.first();
        while let Some(id) = cur {
            ids.push(id);
            cur = self.tree.successor(id);
        }
        return ids;
    }

    /// The logical position exactly at local offset `local`, or
    /// [`Position::End`] if `local` is the document's current length.
    ///
    /// A caller applying a genuinely local removal (as opposed to replaying
    /// a remote [`Doc::remove_logoot`] call, which already carries the
    /// position it means) uses this to build that call's `start` argument.
    pub fn position_at(&self, local: u64) -> Position {
        if local >= self.tree.total_ldoc_length() {
            return Position::End;
        }
        let mut cur = self.tree.first();
        while let Some(id) = cur {
            let node = self.tree.get(id);
            if node.node_type.is_data() {
                let ldoc_start = self.tree.ldoc_start_of(id);
                let ldoc_end = ldoc_start + node.ldoc_length();
                if ldoc_start <= local && local < ldoc_end {
                    return Position::At(node.logoot_start.offset_lowest((local - ldoc_start) as i64));
                }
            }
            cur = self.tree.successor(id);
        }
        return Position::End;
    }

    /// Translate a local insert request into the logical bounds and clock
    /// a branch needs to call [`Doc::insert_logoot`].
    ///
    /// Walks the tree once: a linear scan rather than a true
    /// order-statistic descent, traded for simplicity since nothing here
    /// is benchmarked against document size.
    pub fn insert_local(&self, start: u64, length: u64) -> Result<InsertEnvelope, LdmError> {
        if length == 0 {
            return Err(LdmError::invalid_argument("insert length must be at least 1"));
        }
        let total = self.tree.total_ldoc_length();
        if start > total {
            return Err(LdmError::invalid_argument(format!(
                "insert start {} is past the end of the document ({})",
                start, total
            )));
        }

        let mut lesser_data: Option<NodeId> = None;
        let mut greater_data: Option<NodeId> = None;
        let mut max_tombstone_clk: Option<i64> = None;

        let mut cur = self.tree.first();
        while let Some(id) = cur {
            let node = self.tree.get(id);
            let ldoc_start = self.tree.ldoc_start_of(id);

            if node.node_type.is_data() {
                let ldoc_end = ldoc_start + node.ldoc_length();
                if ldoc_start < start && start < ldoc_end {
                    // Strictly inside the run: a point insertion, both bounds
                    // the same atom.
                    let atom = Position::At(node.logoot_start.offset_lowest((start - ldoc_start) as i64));
                    let clk = max_tombstone_clk.map(|c| c + 1).unwrap_or(0);
                    return Ok(InsertEnvelope {
                        left: atom.clone(),
                        right: atom,
                        clk,
                        length,
                    });
                }
                // A DATA run that doesn't border `start` exactly isn't a
                // candidate for the lesser bucket at all; only a run whose
                // end abuts `start` (possibly through zero-width tombstones)
                // is. Two such runs at once means the ldoc timeline has a
                // duplicate claim on the same offset.
                if ldoc_end == start {
                    if lesser_data.is_some() {
                        return Err(LdmError::internal("more than one DATA node borders the lesser side of the insertion point"));
                    }
                    lesser_data = Some(id);
                }
                if ldoc_start >= start && greater_data.is_none() {
                    greater_data = Some(id);
                }
            } else if ldoc_start == start {
                max_tombstone_clk = Some(max_tombstone_clk.map_or(node.clk, |c| c.max(node.clk)));
            }

            cur = self.tree.successor(id);
        }

        let left = match lesser_data {
            Some(id) => Position::At(self.tree.get(id).logoot_end()),
            None => Position::Start,
        };
        let right = match greater_data {
            Some(id) => Position::At(self.tree.get(id).logoot_start.clone()),
            None => Position::End,
        };
        let clk = max_tombstone_clk.map(|c| c + 1).unwrap_or(0);

        return Ok(InsertEnvelope { left, right, clk, length });
    }

    /// Apply a logical insert (local or replayed from a remote branch),
    /// returning the local edits the caller must apply to its own content
    /// buffer to stay in sync.
    pub fn insert_logoot(
        &mut self,
        branch: BranchRank,
        left: Position,
        right: Position,
        length: u64,
        clk: i64,
    ) -> Result<Vec<Operation>, LdmError> {
        if length == 0 {
            return Err(LdmError::invalid_argument("insert length must be at least 1"));
        }
        if left > right {
            return Err(LdmError::invalid_argument("left bound must not sort after right bound"));
        }

        let start_pos = new_between_ranked(length, &left, &right, branch);
        let end_pos = start_pos.offset_lowest(length as i64);

        // Make sure no existing node straddles any of the four boundaries
        // this insert cares about before classifying anything by key.
        let mut cut_points = vec![left.clone(), right.clone(), Position::At(start_pos.clone()), Position::At(end_pos.clone())];
        cut_points.sort();
        cut_points.dedup();
        let all = self.all_node_ids();
        slice::slice_nodes_into_ranges(&mut self.tree, &cut_points, &all);

        let lo = Bound::inclusive(left.clone());
        let hi = Bound::inclusive(right.clone());
        let window = self.tree.search(&lo, &hi);
        let anchor_left_candidate = window.lesser.last().copied();
        let anchor_right_candidate = window.greater.first().copied();
        let existing = window.range;

        let boundaries = [Position::At(start_pos.clone()), Position::At(end_pos.clone())];
        let mut buckets = slice::slice_nodes_into_ranges(&mut self.tree, &boundaries, &existing);
        let nc_right = std::mem::take(&mut buckets[2]);
        let skip_ranges = std::mem::take(&mut buckets[1]);
        let nc_left = std::mem::take(&mut buckets[0]);

        let mut ops = OperationBuffer::new();
        let mut filled: Vec<NodeId> = Vec::new();
        let mut cursor = start_pos.clone();

        for &id in &skip_ranges {
            let node = self.tree.get(id).clone();
            let gap = cursor.atom_distance_to(&node.logoot_start).max(0) as u64;
            if gap > 0 {
                let offset = start_pos.atom_distance_to(&cursor) as u64;
                let fresh = AnchorLogootNode::new(cursor.clone(), gap, NodeType::Data, clk, Position::Start, Position::End);
                let fresh_id = self.tree.insert(fresh);
                ops.push(Operation::insert(self.tree.ldoc_start_of(fresh_id), offset, gap));
                filled.push(fresh_id);
            }

            if node.clk <= clk {
                if node.node_type.is_data() {
                    ops.push(Operation::remove(self.tree.ldoc_start_of(id), node.ldoc_length()));
                }
                self.tree.retype(id, NodeType::Data, clk);
                let offset = start_pos.atom_distance_to(&node.logoot_start) as u64;
                ops.push(Operation::insert(self.tree.ldoc_start_of(id), offset, node.length));
            }
            filled.push(id);

            cursor = node.logoot_end();
        }

        let tail_gap = cursor.atom_distance_to(&end_pos).max(0) as u64;
        if tail_gap > 0 {
            let offset = start_pos.atom_distance_to(&cursor) as u64;
            let fresh = AnchorLogootNode::new(cursor.clone(), tail_gap, NodeType::Data, clk, Position::Start, Position::End);
            let fresh_id = self.tree.insert(fresh);
            ops.push(Operation::insert(self.tree.ldoc_start_of(fresh_id), offset, tail_gap));
            filled.push(fresh_id);
        }

        for i in 1..filled.len() {
            let left_id = filled[i - 1];
            let right_id = filled[i];
            let left_end = Position::At(self.tree.get(left_id).logoot_end());
            let right_start = Position::At(self.tree.get(right_id).logoot_start.clone());
            self.tree.get_mut(left_id).reduce_right(&right_start);
            self.tree.get_mut(right_id).reduce_left(&left_end);
        }

        let nl_lesser = nc_left.last().copied().or(anchor_left_candidate);
        let nl_greater = nc_right.first().copied().or(anchor_right_candidate);

        if let (Some(lesser_id), Some(&first_id)) = (nl_lesser, filled.first()) {
            let boundary_start = Position::At(self.tree.get(first_id).logoot_start.clone());
            let boundary_end = Position::At(self.tree.get(lesser_id).logoot_end());
            self.tree.get_mut(lesser_id).reduce_right(&boundary_start);
            self.tree.get_mut(first_id).reduce_left(&boundary_end);
        }
        if let (Some(greater_id), Some(&last_id)) = (nl_greater, filled.last()) {
            let boundary_end = Position::At(self.tree.get(last_id).logoot_end());
            let boundary_start = Position::At(self.tree.get(greater_id).logoot_start.clone());
            self.tree.get_mut(last_id).reduce_right(&boundary_start);
            self.tree.get_mut(greater_id).reduce_left(&boundary_end);
        }

        conflict::fill_range_conflicts(&mut self.tree, nl_lesser, nl_greater, &filled);

        let mut composite: Vec<NodeId> = Vec::new();
        composite.extend(nl_lesser);
        composite.extend(filled.iter().copied());
        composite.extend(nl_greater);
        conflict::patch_removal_anchors(&mut self.tree, &composite);

        return Ok(ops.into_vec());
    }

    /// Apply a logical removal over `[start, start.offsetLowest(length))`,
    /// returning the local edits the caller must apply.
    ///
    /// `start` is the logical position the op actually targets — a remote
    /// op carries its own, a local caller builds one with
    /// [`Doc::position_at`]. Its nesting depth (`LogootPosition::len`) is
    /// preserved exactly as given: only nodes at that same nesting depth are
    /// retyped, so a run nested underneath this range by a concurrent
    /// insert survives untouched.
    pub fn remove_logoot(&mut self, start: Position, length: u64, clk: i64) -> Result<Vec<Operation>, LdmError> {
        if length == 0 {
            return Err(LdmError::invalid_argument("remove length must be at least 1"));
        }
        let start_pos = start
            .as_concrete()
            .ok_or_else(|| LdmError::invalid_argument("remove start must be a concrete position"))?
            .clone();
        let end_pos = start_pos.offset_lowest(length as i64);
        let boundaries = [Position::At(start_pos.clone()), Position::At(end_pos)];
        let all = self.all_node_ids();
        let mut buckets = slice::slice_nodes_into_ranges(&mut self.tree, &boundaries, &all);
        let greater = std::mem::take(&mut buckets[2]);
        let removal_range = std::mem::take(&mut buckets[1]);
        let lesser = std::mem::take(&mut buckets[0]);

        let mut ops = OperationBuffer::new();
        for &id in &removal_range {
            let node = self.tree.get(id);
            if node.node_type.is_data() && node.clk <= clk && node.logoot_start.len() == start_pos.len() {
                ops.push(Operation::remove(self.tree.ldoc_start_of(id), node.ldoc_length()));
                self.tree.retype(id, NodeType::Removal, clk);
            }
        }

        let mut patch_range: Vec<NodeId> = Vec::new();
        if let Some(&id) = lesser.last() {
            patch_range.push(id);
        }
        patch_range.extend(removal_range.iter().copied());
        if let Some(&id) = greater.first() {
            patch_range.push(id);
        }

        conflict::patch_new_removal_anchors(&mut self.tree, &patch_range);
        conflict::patch_removal_anchors(&mut self.tree, &patch_range);

        return Ok(ops.into_vec());
    }
}
