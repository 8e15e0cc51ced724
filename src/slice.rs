//! Splitting a sorted run of nodes at boundary positions.
//!
//! Both merge algorithms need to carve the tree's existing nodes into
//! sub-ranges at specific logical positions (where a new insertion starts
//! and ends, or where a removal starts and ends). A node whose span
//! straddles one of those boundaries has to be split into fresh halves that
//! keep the original's type, clock, and conflict membership; only its
//! `logoot_start`/`length` differ.

use crate::node::AnchorLogootNode;
use crate::ost::Tree;
use crate::primitives::position::{LogootPosition, Position};

fn bucket_index(boundaries: &[Position], key: &Position) -> usize {
    let mut i = 0;
    while i < boundaries.len() && boundaries[i] <= *key {
        i += 1;
    }
    return i;
}

/// Split every node in `nodes` (sorted ascending by logical position)
/// across `boundaries` (also sorted ascending), mutating `tree` in place,
/// and return `boundaries.len() + 1` buckets of node ids in ascending
/// order. A node that straddles one or more boundaries is removed from the
/// tree and replaced by fresh pieces, each re-inserted and placed in its
/// own bucket.
pub fn slice_nodes_into_ranges(
    tree: &mut Tree,
    boundaries: &[Position],
    nodes: &[crate::ost::NodeId],
) -> Vec<Vec<crate::ost::NodeId>> {
    let mut buckets: Vec<Vec<crate::ost::NodeId>> = (0..=boundaries.len()).map(|_| Vec::new()).collect();

    for &id in nodes {
        let start = Position::At(tree.get(id).logoot_start.clone());
        let end = Position::At(tree.get(id).logoot_end());
        let own_len = tree.get(id).logoot_start.len();

        // A node is a homogeneous run: every atom it holds shares its
        // levels except the last, which only counts up. A boundary nested
        // deeper than the node's own depth can never land on one of its
        // atoms — it sits in the gap between two adjacent atoms instead —
        // so it isn't a cut point for this node, only for whatever node
        // will eventually occupy that gap.
        let cut_points: Vec<usize> = boundaries
            .iter()
            .enumerate()
            .filter(|(_, b)| **b > start && **b < end && b.as_concrete().map_or(true, |p| p.len() <= own_len))
            .map(|(i, _)| i)
            .collect();

        if cut_points.is_empty() {
            buckets[bucket_index(boundaries, &start)].push(id);
            continue;
        }

        let original = tree.remove(id);
        let mut cursor_start = original.logoot_start.clone();
        let mut remaining = original.length;

        for &bi in &cut_points {
            let cut_pos = boundaries[bi]
                .as_concrete()
                .expect("cut boundary must be a concrete position")
                .clone();
            let piece_len = cursor_start.atom_distance_to(&cut_pos).max(0) as u64;
            if piece_len > 0 {
                let piece = AnchorLogootNode::new(
                    cursor_start.clone(),
                    piece_len,
                    original.node_type,
                    original.clk,
                    original.left_anchor.clone(),
                    original.right_anchor.clone(),
                );
                let piece_start = Position::At(piece.logoot_start.clone());
                let piece_id = tree.insert(piece);
                tree.get_mut(piece_id).conflict_with = original.conflict_with.clone();
                buckets[bucket_index(boundaries, &piece_start)].push(piece_id);

                cursor_start = cut_pos.clone();
                remaining -= piece_len;
            }
        }

        if remaining > 0 {
            let tail = AnchorLogootNode::new(
                cursor_start.clone(),
                remaining,
                original.node_type,
                original.clk,
                original.left_anchor.clone(),
                original.right_anchor.clone(),
            );
            let tail_start = Position::At(tail.logoot_start.clone());
            let tail_id = tree.insert(tail);
            tree.get_mut(tail_id).conflict_with = original.conflict_with.clone();
            buckets[bucket_index(boundaries, &tail_start)].push(tail_id);
        }
    }

    return buckets;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeType;
    use crate::primitives::{BranchOrder, LogootInt};

    fn pos(n: i64) -> LogootPosition {
        let mut order: BranchOrder<&str> = BranchOrder::new();
        let branch = order.branch_of(&"a");
        return LogootPosition::single(LogootInt::from_i64(n), branch);
    }

    #[test]
    fn node_wholly_inside_one_bucket_is_untouched() {
        let mut tree = Tree::new();
        let id = tree.insert(AnchorLogootNode::new(pos(5), 2, NodeType::Data, 0, Position::Start, Position::End));
        let boundaries = vec![Position::At(pos(20))];
        let buckets = slice_nodes_into_ranges(&mut tree, &boundaries, &[id]);
        assert_eq!(buckets[0], vec![id]);
        assert_eq!(buckets[1].len(), 0);
    }

    #[test]
    fn node_straddling_boundary_splits_in_two() {
        let mut tree = Tree::new();
        let id = tree.insert(AnchorLogootNode::new(pos(0), 10, NodeType::Data, 0, Position::Start, Position::End));
        let boundaries = vec![Position::At(pos(4))];
        let buckets = slice_nodes_into_ranges(&mut tree, &boundaries, &[id]);
        assert_eq!(buckets[0].len(), 1);
        assert_eq!(buckets[1].len(), 1);
        let left = tree.get(buckets[0][0]);
        let right = tree.get(buckets[1][0]);
        assert_eq!(left.length, 4);
        assert_eq!(right.length, 6);
        assert_eq!(right.logoot_start, pos(4));
    }

    #[test]
    fn node_straddling_two_boundaries_splits_in_three() {
        let mut tree = Tree::new();
        let id = tree.insert(AnchorLogootNode::new(pos(0), 10, NodeType::Data, 0, Position::Start, Position::End));
        let boundaries = vec![Position::At(pos(3)), Position::At(pos(7))];
        let buckets = slice_nodes_into_ranges(&mut tree, &boundaries, &[id]);
        assert_eq!(buckets[0].len(), 1);
        assert_eq!(buckets[1].len(), 1);
        assert_eq!(buckets[2].len(), 1);
        assert_eq!(tree.get(buckets[0][0]).length, 3);
        assert_eq!(tree.get(buckets[1][0]).length, 4);
        assert_eq!(tree.get(buckets[2][0]).length, 3);
    }
}
