//! Conflict bookkeeping: maintaining the `conflict_with` graph and keeping
//! anchors visible through tombstones.
//!
//! Two nodes conflict when their anchor ranges overlap — informally, when
//! one was inserted "believing" it was adjacent to a position the other
//! also claims. The passes here are what keep that belief consistent after
//! new nodes are spliced in (`fill_range_conflicts`) or existing nodes are
//! retyped into tombstones (`patch_removal_anchors`,
//! `patch_new_removal_anchors`).

use crate::ost::{NodeId, Tree};
use crate::primitives::position::Position;

/// Check whether `id` and `neighbor` conflict (order determined by
/// `neighbor_is_left`), and if so, record it symmetrically in both nodes'
/// `conflict_with` sets. Returns whether a conflict was found, which the
/// callers below use to cut off a propagation sweep early.
pub fn update_neighbor_conflicts(tree: &mut Tree, id: NodeId, neighbor: NodeId, neighbor_is_left: bool) -> bool {
    let (earlier, later) = if neighbor_is_left { (neighbor, id) } else { (id, neighbor) };
    let conflict = tree.get(earlier).conflicts_with(tree.get(later));
    if conflict {
        tree.get_mut(earlier).conflict_with.insert(later);
        tree.get_mut(later).conflict_with.insert(earlier);
    }
    return conflict;
}

/// Sweep a freshly filled range of nodes against its outer neighbours,
/// stopping each direction as soon as a pair no longer conflicts (farther
/// nodes on the same side cannot conflict either, since anchors only move
/// inward).
pub fn fill_range_conflicts(
    tree: &mut Tree,
    nl_lesser: Option<NodeId>,
    nl_greater: Option<NodeId>,
    filled: &[NodeId],
) {
    if let Some(mut prev) = nl_lesser {
        for &node in filled {
            if !update_neighbor_conflicts(tree, node, prev, true) {
                break;
            }
            prev = node;
        }
    }

    if let Some(mut next) = nl_greater {
        for &node in filled.iter().rev() {
            if !update_neighbor_conflicts(tree, node, next, false) {
                break;
            }
            next = node;
        }
    }
}

/// Two-direction scan restoring the invariant that a data node's anchor
/// visibility extends through any tombstones it conceptually spans.
///
/// Forward pass: whenever a `DATA` node is seen, its own conflict set
/// becomes the active scan set (nodes believed to still be "looking" past
/// this point). Crossing a tombstone whose span the scan set's right anchor
/// falls inside tightens that anchor to the tombstone's far edge and
/// records the conflict. The backward pass is the mirror image.
pub fn patch_removal_anchors(tree: &mut Tree, range: &[NodeId]) {
    let mut scan_nodes: Vec<NodeId> = Vec::new();
    for &id in range {
        if tree.get(id).node_type.is_data() {
            scan_nodes = std::iter::once(id).chain(tree.get(id).conflict_with.iter().copied()).collect();
            scan_nodes.retain(|&n| !matches!(tree.get(n).true_right(), Position::End));
            continue;
        }

        let cur_start = Position::At(tree.get(id).logoot_start.clone());
        let cur_end = Position::At(tree.get(id).logoot_end());
        let mut keep = Vec::new();
        for snode in scan_nodes.drain(..) {
            let apos = tree.get(snode).true_right().clone();
            if apos < cur_start {
                continue; // never reached this far; drop from the scan set
            }
            if apos < cur_end {
                tree.get_mut(snode).right_anchor = cur_end.clone();
                tree.get_mut(snode).conflict_with.insert(id);
                tree.get_mut(id).conflict_with.insert(snode);
            }
            keep.push(snode);
        }
        scan_nodes = keep;
    }

    let mut scan_nodes: Vec<NodeId> = Vec::new();
    for &id in range.iter().rev() {
        if tree.get(id).node_type.is_data() {
            scan_nodes = std::iter::once(id).chain(tree.get(id).conflict_with.iter().copied()).collect();
            scan_nodes.retain(|&n| !matches!(tree.get(n).true_left(), Position::Start));
            continue;
        }

        let cur_start = Position::At(tree.get(id).logoot_start.clone());
        let cur_end = Position::At(tree.get(id).logoot_end());
        let mut keep = Vec::new();
        for snode in scan_nodes.drain(..) {
            let apos = tree.get(snode).true_left().clone();
            if apos > cur_end {
                continue;
            }
            if apos > cur_start {
                tree.get_mut(snode).left_anchor = cur_start.clone();
                tree.get_mut(snode).conflict_with.insert(id);
                tree.get_mut(id).conflict_with.insert(snode);
            }
            keep.push(snode);
        }
        scan_nodes = keep;
    }
}

/// Run immediately after retyping a range into `REMOVAL`: gives each new
/// tombstone an anchor pulled in from whichever live node directly abuts
/// it, rather than leaving it at the wide default anchors it inherited
/// from the pre-removal node it replaced.
pub fn patch_new_removal_anchors(tree: &mut Tree, range: &[NodeId]) {
    let mut live: Vec<NodeId> = Vec::new();
    for &id in range {
        if tree.get(id).node_type.is_data() {
            live = std::iter::once(id).chain(tree.get(id).conflict_with.iter().copied()).collect();
            live.retain(|&n| !matches!(tree.get(n).true_right(), Position::End));
            continue;
        }
        if !tree.get(id).node_type.is_dummy() {
            let cur_start = Position::At(tree.get(id).logoot_start.clone());
            let mut keep = Vec::new();
            for node in live.drain(..) {
                let apos = tree.get(node).true_right().clone();
                if apos == cur_start {
                    tree.get_mut(id).left_anchor = apos;
                    continue; // consumed: this live node's reach ends exactly here
                }
                keep.push(node);
            }
            live = keep;
        }
    }

    let mut live: Vec<NodeId> = Vec::new();
    for &id in range.iter().rev() {
        if tree.get(id).node_type.is_data() {
            live = std::iter::once(id).chain(tree.get(id).conflict_with.iter().copied()).collect();
            live.retain(|&n| !matches!(tree.get(n).true_left(), Position::Start));
            continue;
        }
        if !tree.get(id).node_type.is_dummy() {
            let cur_end = Position::At(tree.get(id).logoot_end());
            let mut keep = Vec::new();
            for node in live.drain(..) {
                let apos = tree.get(node).true_left().clone();
                if apos == cur_end {
                    tree.get_mut(id).right_anchor = apos;
                    continue;
                }
                keep.push(node);
            }
            live = keep;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{AnchorLogootNode, NodeType};
    use crate::primitives::{BranchOrder, LogootInt, LogootPosition};

    fn pos(n: i64) -> LogootPosition {
        let mut order: BranchOrder<&str> = BranchOrder::new();
        let branch = order.branch_of(&"a");
        return LogootPosition::single(LogootInt::from_i64(n), branch);
    }

    #[test]
    fn update_neighbor_conflicts_records_both_directions() {
        let mut tree = Tree::new();
        let a = tree.insert(AnchorLogootNode::new(pos(1), 1, NodeType::Data, 0, Position::Start, Position::End));
        let b = tree.insert(AnchorLogootNode::new(pos(5), 1, NodeType::Data, 0, Position::Start, Position::End));
        let found = update_neighbor_conflicts(&mut tree, b, a, true);
        assert!(found);
        assert!(tree.get(a).conflict_with.contains(&b));
        assert!(tree.get(b).conflict_with.contains(&a));
    }

    #[test]
    fn tight_anchors_do_not_conflict() {
        let mut tree = Tree::new();
        let a = tree.insert(AnchorLogootNode::new(pos(1), 1, NodeType::Data, 0, Position::Start, Position::At(pos(5))));
        let b = tree.insert(AnchorLogootNode::new(pos(5), 1, NodeType::Data, 0, Position::At(pos(2)), Position::End));
        let found = update_neighbor_conflicts(&mut tree, b, a, true);
        assert!(!found);
        assert!(tree.get(a).conflict_with.is_empty());
    }

    #[test]
    fn patch_removal_anchors_extends_through_tombstone() {
        let mut tree = Tree::new();
        let left = tree.insert(AnchorLogootNode::new(pos(0), 2, NodeType::Data, 0, Position::Start, Position::At(pos(2))));
        let tomb = tree.insert(AnchorLogootNode::new(pos(2), 2, NodeType::Removal, 1, Position::At(pos(0)), Position::At(pos(4))));
        let right = tree.insert(AnchorLogootNode::new(pos(4), 2, NodeType::Data, 0, Position::At(pos(4)), Position::End));
        patch_removal_anchors(&mut tree, &[left, tomb, right]);
        assert_eq!(*tree.get(left).true_right(), Position::At(pos(4)));
    }
}
