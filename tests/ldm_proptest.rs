//! Property-based tests for the merge engine.

use proptest::prelude::*;

use logoot_ldm::op::net_length_delta;
use logoot_ldm::Doc;

#[derive(Clone, Debug)]
enum EditOp {
    Insert { pos_pct: f64, len: u64 },
    Remove { pos_pct: f64, len_pct: f64 },
}

fn arbitrary_edit_op() -> impl Strategy<Value = EditOp> {
    prop_oneof![
        (0.0..=1.0f64, 1u64..10).prop_map(|(pos_pct, len)| EditOp::Insert { pos_pct, len }),
        (0.0..=1.0f64, 0.0..=0.5f64).prop_map(|(pos_pct, len_pct)| EditOp::Remove { pos_pct, len_pct }),
    ]
}

fn apply_edit(doc: &mut Doc<&'static str>, branch: &'static str, op: &EditOp) {
    let len = doc.local_len();
    match op {
        EditOp::Insert { pos_pct, len: insert_len } => {
            let start = if len == 0 { 0 } else { ((*pos_pct * len as f64) as u64).min(len) };
            let rank = doc.branch_of(branch);
            let env = doc.insert_local(start, *insert_len).unwrap();
            doc.insert_logoot(rank, env.left, env.right, env.length, env.clk).unwrap();
        }
        EditOp::Remove { pos_pct, len_pct } => {
            if len == 0 {
                return;
            }
            let start = ((*pos_pct * len as f64) as u64).min(len - 1);
            let max_len = len - start;
            let del_len = ((*len_pct * max_len as f64) as u64).max(1).min(max_len);
            let start_pos = doc.position_at(start);
            doc.remove_logoot(start_pos, del_len, 0).unwrap();
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Any sequence of random local edits on a single branch leaves the
    /// tree in a state `self_test` accepts.
    #[test]
    fn random_edit_sequences_stay_self_consistent(
        ops in prop::collection::vec(arbitrary_edit_op(), 1..60),
    ) {
        let mut doc: Doc<&str> = Doc::new();
        for op in &ops {
            apply_edit(&mut doc, "replica", op);
        }
        prop_assert!(doc.self_test().is_ok());
    }

    /// The net length of every operation the engine has emitted always
    /// matches the document's current local length.
    #[test]
    fn operation_log_net_length_tracks_local_len(
        ops in prop::collection::vec(arbitrary_edit_op(), 1..60),
    ) {
        let mut doc: Doc<&str> = Doc::new();
        let mut log = Vec::new();
        for op in &ops {
            let before = doc.local_len();
            match op {
                EditOp::Insert { pos_pct, len: insert_len } => {
                    let start = if before == 0 { 0 } else { ((*pos_pct * before as f64) as u64).min(before) };
                    let rank = doc.branch_of("replica");
                    let env = doc.insert_local(start, *insert_len).unwrap();
                    log.extend(doc.insert_logoot(rank, env.left, env.right, env.length, env.clk).unwrap());
                }
                EditOp::Remove { pos_pct, len_pct } => {
                    if before == 0 {
                        continue;
                    }
                    let start = ((*pos_pct * before as f64) as u64).min(before - 1);
                    let max_len = before - start;
                    let del_len = ((*len_pct * max_len as f64) as u64).max(1).min(max_len);
                    let start_pos = doc.position_at(start);
                    log.extend(doc.remove_logoot(start_pos, del_len, 0).unwrap());
                }
            }
        }
        prop_assert_eq!(net_length_delta(&log) as u64, doc.local_len());
    }

    /// Two branches editing disjoint regions of the same growing document
    /// never corrupt each other's runs.
    #[test]
    fn two_branches_interleaving_stay_self_consistent(
        a_ops in prop::collection::vec(arbitrary_edit_op(), 1..20),
        b_ops in prop::collection::vec(arbitrary_edit_op(), 1..20),
    ) {
        let mut doc: Doc<&str> = Doc::new();
        let mut a = a_ops.into_iter();
        let mut b = b_ops.into_iter();
        loop {
            let mut advanced = false;
            if let Some(op) = a.next() {
                apply_edit(&mut doc, "alice", &op);
                advanced = true;
            }
            if let Some(op) = b.next() {
                apply_edit(&mut doc, "bob", &op);
                advanced = true;
            }
            if !advanced {
                break;
            }
        }
        prop_assert!(doc.self_test().is_ok());
    }

    /// Removing everything a sequence of inserts produced always returns the
    /// document to empty.
    #[test]
    fn removing_everything_empties_the_document(
        lens in prop::collection::vec(1u64..10, 1..15),
    ) {
        let mut doc: Doc<&str> = Doc::new();
        let rank = doc.branch_of("replica");
        for len in &lens {
            let start = doc.local_len();
            let env = doc.insert_local(start, *len).unwrap();
            doc.insert_logoot(rank, env.left, env.right, env.length, env.clk).unwrap();
        }
        let total = doc.local_len();
        if total > 0 {
            let start = doc.position_at(0);
            doc.remove_logoot(start, total, 1).unwrap();
        }
        prop_assert_eq!(doc.local_len(), 0);
        prop_assert!(doc.self_test().is_ok());
    }

    /// A run nested one level deeper than its surrounding atoms — wedged
    /// into the zero-room gap between two adjacent atoms of an outer run —
    /// survives a removal that spans exactly those two atoms: the
    /// nesting-depth gate only retypes nodes at the removal's own depth,
    /// regardless of where in the outer run the gap sits.
    #[test]
    fn remove_skips_deeper_nesting(outer_len in 3u64..12, split_seed in 0u64..9) {
        let split = split_seed % (outer_len - 2);
        let mut doc: Doc<&str> = Doc::new();
        let a = doc.branch_of("a");
        doc.insert_logoot(a, logoot_ldm::primitives::Position::Start, logoot_ldm::primitives::Position::End, outer_len, 0).unwrap();

        let left_atom = doc.position_at(split);
        let right_atom = doc.position_at(split + 1);
        let b = doc.branch_of("b");
        doc.insert_logoot(b, left_atom, right_atom, 1, 1).unwrap();
        prop_assert_eq!(doc.local_len(), outer_len + 1);

        let remove_start = doc.position_at(split);
        let removed = doc.remove_logoot(remove_start, 2, 2).unwrap();
        prop_assert_eq!(net_length_delta(&removed), -2);
        // The nested run, one level deeper, must still be live.
        prop_assert_eq!(doc.local_len(), outer_len - 1);
        prop_assert!(doc.self_test().is_ok());
    }
}
