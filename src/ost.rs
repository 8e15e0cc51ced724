//! The order-statistic tree: an arena-backed treap keyed by logical
//! position, augmented with the subtree sum of local lengths.
//!
//! Balancing is randomized rather than deterministic: every node gets a
//! priority from a xorshift64 generator seeded at tree construction, and
//! rotations maintain the heap property on priorities while the normal BST
//! property holds on keys. This gives expected O(log n) height without the
//! rebalancing bookkeeping a red-black or AVL tree would need, the same
//! trade a skip list makes by spending randomness instead of invariants.
//!
//! Local offsets are never stored directly. A node's `ldoc_start` is
//! derived by walking from the node to the root and summing the local
//! lengths of everything that sorts before it, the standard order-statistic
//! trick applied to a treap instead of a size-balanced BST.

use crate::error::LdmError;
use crate::node::AnchorLogootNode;
use crate::primitives::position::Position;

pub type NodeId = u32;

struct TreapNode {
    data: AnchorLogootNode,
    left: Option<NodeId>,
    right: Option<NodeId>,
    parent: Option<NodeId>,
    priority: u64,
    /// Sum of `ldoc_length` over this node and both subtrees.
    subtree_value: u64,
}

/// A boundary used by [`Tree::search`]: a position plus whether the
/// boundary itself counts as part of the matched range.
#[derive(Clone, Debug)]
pub struct Bound {
    pub pos: Position,
    pub inclusive: bool,
}

impl Bound {
    pub fn inclusive(pos: Position) -> Bound {
        return Bound { pos, inclusive: true };
    }

    pub fn exclusive(pos: Position) -> Bound {
        return Bound { pos, inclusive: false };
    }
}

/// The three buckets a range search partitions the tree into, in sorted
/// order within each bucket.
pub struct SearchResult {
    pub lesser: Vec<NodeId>,
    pub range: Vec<NodeId>,
    pub greater: Vec<NodeId>,
}

pub struct Tree {
    slots: Vec<Option<TreapNode>>,
    root: Option<NodeId>,
    free_list: Vec<NodeId>,
    rand_state: u64,
}

impl Default for Tree {
    fn default() -> Self {
        return Self::new();
    }
}

impl Tree {
    pub fn new() -> Tree {
        return Tree {
            slots: Vec::new(),
            root: None,
            free_list: Vec::new(),
            rand_state: 0x9e3779b97f4a7c15,
        };
    }

    pub fn is_empty(&self) -> bool {
        return self.root.is_none();
    }

    /// Total local length spanned by every `DATA` node in the tree.
    pub fn total_ldoc_length(&self) -> u64 {
        match self.root {
            Some(id) => self.slot(id).subtree_value,
            None => 0,
        }
    }

    pub fn get(&self, id: NodeId) -> &AnchorLogootNode {
        return &self.slot(id).data;
    }

    /// Mutable access for fields that do not affect local length
    /// (anchors, clock, conflict set). Mutating `node_type`/`length`
    /// through this reference leaves aggregates stale; use [`Tree::retype`]
    /// for that instead.
    pub fn get_mut(&mut self, id: NodeId) -> &mut AnchorLogootNode {
        return &mut self.slot_mut(id).data;
    }

    fn slot(&self, id: NodeId) -> &TreapNode {
        return self.slots[id as usize].as_ref().expect("dangling node id");
    }

    fn slot_mut(&mut self, id: NodeId) -> &mut TreapNode {
        return self.slots[id as usize].as_mut().expect("dangling node id");
    }

    fn random_priority(&mut self) -> u64 {
        let mut x = self.rand_state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.rand_state = x;
        return x;
    }

    fn alloc(&mut self, data: AnchorLogootNode) -> NodeId {
        let priority = self.random_priority();
        let own_value = data.ldoc_length();
        let node = TreapNode {
            data,
            left: None,
            right: None,
            parent: None,
            priority,
            subtree_value: own_value,
        };
        if let Some(id) = self.free_list.pop() {
            self.slots[id as usize] = Some(node);
            return id;
        }
        let id = self.slots.len() as NodeId;
        self.slots.push(Some(node));
        return id;
    }

    fn subtree_value(&self, id: Option<NodeId>) -> u64 {
        match id {
            Some(id) => self.slot(id).subtree_value,
            None => 0,
        }
    }

    fn own_value(&self, id: NodeId) -> u64 {
        return self.slot(id).data.ldoc_length();
    }

    fn refresh_node(&mut self, id: NodeId) {
        let left = self.slot(id).left;
        let right = self.slot(id).right;
        let value = self.subtree_value(left) + self.own_value(id) + self.subtree_value(right);
        self.slot_mut(id).subtree_value = value;
    }

    /// Recompute aggregates from `id` up to the root. Call this after
    /// mutating `node_type`/`length` on a node already in the tree.
    fn refresh_path(&mut self, mut id: NodeId) {
        loop {
            self.refresh_node(id);
            match self.slot(id).parent {
                Some(parent) => id = parent,
                None => break,
            }
        }
    }

    /// Retype a node (changing its local length) and repair aggregates.
    pub fn retype(&mut self, id: NodeId, node_type: crate::node::NodeType, clk: i64) {
        self.slot_mut(id).data.retype(node_type, clk);
        self.refresh_path(id);
    }

    /// Insert a freshly built node into the tree, keyed by `logoot_start`.
    pub fn insert(&mut self, data: AnchorLogootNode) -> NodeId {
        let id = self.alloc(data);
        let Some(root) = self.root else {
            self.root = Some(id);
            return id;
        };

        let mut cur = root;
        loop {
            let go_left = self.slot(id).data.logoot_start < self.slot(cur).data.logoot_start;
            let next = if go_left { self.slot(cur).left } else { self.slot(cur).right };
            match next {
                Some(n) => cur = n,
                None => {
                    if go_left {
                        self.slot_mut(cur).left = Some(id);
                    } else {
                        self.slot_mut(cur).right = Some(id);
                    }
                    self.slot_mut(id).parent = Some(cur);
                    break;
                }
            }
        }

        self.refresh_path(id);
        self.bubble_up(id);
        return id;
    }

    fn bubble_up(&mut self, id: NodeId) {
        while let Some(parent) = self.slot(id).parent {
            if self.slot(id).priority >= self.slot(parent).priority {
                break;
            }
            if self.slot(parent).left == Some(id) {
                self.rotate_right(parent);
            } else {
                self.rotate_left(parent);
            }
            // `id`'s parent pointer now points one level higher; the loop
            // condition re-reads it next iteration.
        }
    }

    /// Remove `id` from the tree, returning its data. Used when a node is
    /// replaced outright (split into fresh halves) rather than mutated in
    /// place.
    pub fn remove(&mut self, id: NodeId) -> AnchorLogootNode {
        // Rotate id down until it has at most one child, by always
        // promoting whichever child has higher heap priority, then unlink.
        loop {
            let left = self.slot(id).left;
            let right = self.slot(id).right;
            match (left, right) {
                (None, None) => break,
                (Some(_), None) => {
                    self.rotate_right(id);
                }
                (None, Some(_)) => {
                    self.rotate_left(id);
                }
                (Some(l), Some(r)) => {
                    if self.slot(l).priority < self.slot(r).priority {
                        self.rotate_right(id);
                    } else {
                        self.rotate_left(id);
                    }
                }
            }
        }

        let parent = self.slot(id).parent;
        self.reparent_to_none(parent, id);
        if let Some(p) = parent {
            self.refresh_path(p);
        }

        let node = self.slots[id as usize].take().expect("dangling node id");
        self.free_list.push(id);
        return node.data;
    }

    fn reparent_to_none(&mut self, parent: Option<NodeId>, child: NodeId) {
        match parent {
            None => self.root = None,
            Some(p) => {
                if self.slot(p).left == Some(child) {
                    self.slot_mut(p).left = None;
                } else {
                    self.slot_mut(p).right = None;
                }
            }
        }
    }

    /// Left-rotate around `id`, promoting its right child.
    fn rotate_left(&mut self, id: NodeId) {
        let pivot = self.slot(id).right.expect("rotate_left requires a right child");
        let parent = self.slot(id).parent;
        let pivot_left = self.slot(pivot).left;

        self.slot_mut(id).right = pivot_left;
        if let Some(pl) = pivot_left {
            self.slot_mut(pl).parent = Some(id);
        }

        self.slot_mut(pivot).left = Some(id);
        self.slot_mut(id).parent = Some(pivot);
        self.slot_mut(pivot).parent = parent;

        self.reparent(parent, id, pivot);
        self.refresh_node(id);
        self.refresh_node(pivot);
    }

    /// Right-rotate around `id`, promoting its left child.
    fn rotate_right(&mut self, id: NodeId) {
        let pivot = self.slot(id).left.expect("rotate_right requires a left child");
        let parent = self.slot(id).parent;
        let pivot_right = self.slot(pivot).right;

        self.slot_mut(id).left = pivot_right;
        if let Some(pr) = pivot_right {
            self.slot_mut(pr).parent = Some(id);
        }

        self.slot_mut(pivot).right = Some(id);
        self.slot_mut(id).parent = Some(pivot);
        self.slot_mut(pivot).parent = parent;

        self.reparent(parent, id, pivot);
        self.refresh_node(id);
        self.refresh_node(pivot);
    }

    fn reparent(&mut self, parent: Option<NodeId>, old_child: NodeId, new_child: NodeId) {
        match parent {
            None => self.root = Some(new_child),
            Some(p) => {
                if self.slot(p).left == Some(old_child) {
                    self.slot_mut(p).left = Some(new_child);
                } else {
                    self.slot_mut(p).right = Some(new_child);
                }
            }
        }
    }

    /// Local offset of `id`'s first element, derived from ancestor sums.
    pub fn ldoc_start_of(&self, id: NodeId) -> u64 {
        let mut acc = self.subtree_value(self.slot(id).left);
        let mut cur = id;
        while let Some(parent) = self.slot(cur).parent {
            if self.slot(parent).right == Some(cur) {
                acc += self.own_value(parent) + self.subtree_value(self.slot(parent).left);
            }
            cur = parent;
        }
        return acc;
    }

    pub fn successor(&self, id: NodeId) -> Option<NodeId> {
        if let Some(mut cur) = self.slot(id).right {
            while let Some(left) = self.slot(cur).left {
                cur = left;
            }
            return Some(cur);
        }
        let mut cur = id;
        while let Some(parent) = self.slot(cur).parent {
            if self.slot(parent).left == Some(cur) {
                return Some(parent);
            }
            cur = parent;
        }
        return None;
    }

    pub fn predecessor(&self, id: NodeId) -> Option<NodeId> {
        if let Some(mut cur) = self.slot(id).left {
            while let Some(right) = self.slot(cur).right {
                cur = right;
            }
            return Some(cur);
        }
        let mut cur = id;
        while let Some(parent) = self.slot(cur).parent {
            if self.slot(parent).right == Some(cur) {
                return Some(parent);
            }
            cur = parent;
        }
        return None;
    }

    pub fn first(&self) -> Option<NodeId> {
        let mut cur = self.root?;
        while let Some(left) = self.slot(cur).left {
            cur = left;
        }
        return Some(cur);
    }

    pub fn last(&self) -> Option<NodeId> {
        let mut cur = self.root?;
        while let Some(right) = self.slot(cur).right {
            cur = right;
        }
        return Some(cur);
    }

    /// Visit every node in logical order.
    pub fn operate_on_all(&self, mut f: impl FnMut(NodeId, &AnchorLogootNode)) {
        let mut cur = self.first();
        while let Some(id) = cur {
            f(id, &self.slot(id).data);
            cur = self.successor(id);
        }
    }

    fn position_of(&self, id: NodeId) -> Position {
        return Position::At(self.slot(id).data.logoot_start.clone());
    }

    fn below_lo(&self, id: NodeId, lo: &Bound) -> bool {
        let key = self.position_of(id);
        if lo.inclusive {
            return key < lo.pos;
        }
        return key <= lo.pos;
    }

    fn above_hi(&self, id: NodeId, hi: &Bound) -> bool {
        let key = self.position_of(id);
        if hi.inclusive {
            return key > hi.pos;
        }
        return key >= hi.pos;
    }

    /// Partition the tree into nodes strictly before `lo`, nodes within
    /// `[lo, hi]` per the bound inclusivity, and nodes strictly after `hi`.
    /// Results are sorted ascending within each bucket.
    pub fn search(&self, lo: &Bound, hi: &Bound) -> SearchResult {
        let mut result = SearchResult {
            lesser: Vec::new(),
            range: Vec::new(),
            greater: Vec::new(),
        };
        self.search_visit(self.root, lo, hi, &mut result);
        return result;
    }

    fn search_visit(&self, id: Option<NodeId>, lo: &Bound, hi: &Bound, out: &mut SearchResult) {
        let Some(id) = id else { return };
        self.search_visit(self.slot(id).left, lo, hi, out);
        if self.below_lo(id, lo) {
            out.lesser.push(id);
        } else if self.above_hi(id, hi) {
            out.greater.push(id);
        } else {
            out.range.push(id);
        }
        self.search_visit(self.slot(id).right, lo, hi, out);
    }

    /// Verify structural and aggregate invariants. Intended to be called
    /// after a full merge operation in tests and by `Doc::self_test`.
    pub fn self_test(&self) -> Result<(), LdmError> {
        if let Some(root) = self.root {
            let mut last_key = None;
            let mut total = 0u64;
            self.check_node(root, None, &mut last_key, &mut total)?;
            let declared = self.slot(root).subtree_value;
            if declared != total {
                return Err(LdmError::fatal(format!(
                    "root subtree_value {} does not match recomputed total {}",
                    declared, total
                )));
            }
        }
        return Ok(());
    }

    fn check_node(
        &self,
        id: NodeId,
        parent: Option<NodeId>,
        last_key: &mut Option<Position>,
        total: &mut u64,
    ) -> Result<(), LdmError> {
        if self.slot(id).parent != parent {
            return Err(LdmError::fatal(format!("node {} has an inconsistent parent pointer", id)));
        }
        if self.slot(id).data.length == 0 {
            return Err(LdmError::fatal(format!("node {} has zero length", id)));
        }

        if let Some(left) = self.slot(id).left {
            self.check_node(left, Some(id), last_key, total)?;
        }

        let key = self.position_of(id);
        if let Some(prev) = last_key {
            if *prev >= key {
                return Err(LdmError::fatal("tree keys are not strictly increasing".to_string()));
            }
        }
        *last_key = Some(key);
        *total += self.own_value(id);

        if let Some(right) = self.slot(id).right {
            self.check_node(right, Some(id), last_key, total)?;
        }

        let expected = self.subtree_value(self.slot(id).left)
            + self.own_value(id)
            + self.subtree_value(self.slot(id).right);
        if self.slot(id).subtree_value != expected {
            return Err(LdmError::fatal(format!(
                "node {} subtree_value {} does not match recomputed {}",
                id, self.slot(id).subtree_value, expected
            )));
        }

        return Ok(());
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

    fn data_node(n: i64, length: u64) -> AnchorLogootNode {
        return AnchorLogootNode::new(pos(n), length, NodeType::Data, 0, Position::Start, Position::End);
    }

    #[test]
    fn empty_tree_has_zero_length() {
        let tree = Tree::new();
        assert_eq!(tree.total_ldoc_length(), 0);
        assert!(tree.self_test().is_ok());
    }

    #[test]
    fn insert_single_node() {
        let mut tree = Tree::new();
        let id = tree.insert(data_node(5, 3));
        assert_eq!(tree.total_ldoc_length(), 3);
        assert_eq!(tree.ldoc_start_of(id), 0);
        assert!(tree.self_test().is_ok());
    }

    #[test]
    fn ldoc_start_reflects_insertion_order() {
        let mut tree = Tree::new();
        let a = tree.insert(data_node(1, 2));
        let b = tree.insert(data_node(5, 3));
        let c = tree.insert(data_node(10, 1));
        assert_eq!(tree.ldoc_start_of(a), 0);
        assert_eq!(tree.ldoc_start_of(b), 2);
        assert_eq!(tree.ldoc_start_of(c), 5);
        assert!(tree.self_test().is_ok());
    }

    #[test]
    fn successor_and_predecessor_follow_key_order() {
        let mut tree = Tree::new();
        let a = tree.insert(data_node(1, 1));
        let b = tree.insert(data_node(5, 1));
        let c = tree.insert(data_node(10, 1));
        assert_eq!(tree.successor(a), Some(b));
        assert_eq!(tree.successor(b), Some(c));
        assert_eq!(tree.successor(c), None);
        assert_eq!(tree.predecessor(c), Some(b));
        assert_eq!(tree.predecessor(a), None);
    }

    #[test]
    fn retype_to_removal_updates_aggregates() {
        let mut tree = Tree::new();
        let a = tree.insert(data_node(1, 2));
        let b = tree.insert(data_node(5, 3));
        tree.retype(a, NodeType::Removal, 1);
        assert_eq!(tree.total_ldoc_length(), 3);
        assert_eq!(tree.ldoc_start_of(b), 0);
        assert!(tree.self_test().is_ok());
    }

    #[test]
    fn search_partitions_into_three_buckets() {
        let mut tree = Tree::new();
        tree.insert(data_node(1, 1));
        tree.insert(data_node(5, 1));
        tree.insert(data_node(10, 1));
        let lo = Bound::inclusive(Position::At(pos(5)));
        let hi = Bound::inclusive(Position::At(pos(5)));
        let result = tree.search(&lo, &hi);
        assert_eq!(result.lesser.len(), 1);
        assert_eq!(result.range.len(), 1);
        assert_eq!(result.greater.len(), 1);
    }

    #[test]
    fn many_insertions_stay_balanced_and_valid() {
        let mut tree = Tree::new();
        for i in 0..200 {
            tree.insert(data_node(i * 3, 1));
        }
        assert!(tree.self_test().is_ok());
        assert_eq!(tree.total_ldoc_length(), 200);
    }
}
