//! Rollback and fingerprint behavior across arbitrary edit sequences

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use sigprop_tree::prelude::*;
use sigprop_tree::{factory, Fingerprint, SignatureView};

#[derive(Debug, Clone)]
enum Edit {
    Move(usize, usize),
    Detach(usize),
    Rename(usize, String),
    Append(String),
}

fn edit() -> impl Strategy<Value = Edit> {
    prop_oneof![
        (0usize..8, 0usize..8).prop_map(|(a, b)| Edit::Move(a, b)),
        (0usize..8).prop_map(Edit::Detach),
        (0usize..8, "[a-z]{1,4}").prop_map(|(a, s)| Edit::Rename(a, s)),
        "[0-9]{1,3}".prop_map(Edit::Append),
    ]
}

fn list_of(tree: &mut MemoryTree, len: usize) -> (NodeId, Vec<NodeId>) {
    let list = tree.create(NodeKind::ArgumentList, "");
    let ids = (0..len)
        .map(|i| {
            let id = factory::expression(tree, &i.to_string());
            tree.append(list, id).unwrap();
            id
        })
        .collect();
    (list, ids)
}

fn perform(tx: &mut WriteTransaction<'_, MemoryTree>, list: NodeId, edit: &Edit) {
    let children = tx.children(list);
    if children.is_empty() {
        return;
    }
    let pick = |i: usize| children[i % children.len()];
    match edit {
        Edit::Move(a, b) => {
            let (node, anchor) = (pick(*a), pick(*b));
            let anchor = (node != anchor).then_some(anchor);
            tx.insert_before(list, anchor, node).unwrap();
        }
        Edit::Detach(a) => tx.detach(pick(*a)).unwrap(),
        Edit::Rename(a, text) => tx.set_text(pick(*a), text).unwrap(),
        Edit::Append(text) => {
            let fresh = factory::expression(tx, text);
            tx.append(list, fresh).unwrap();
        }
    }
}

proptest! {
    #[test]
    fn prop_dropped_transaction_restores_list(
        len in 1usize..6,
        edits in proptest::collection::vec(edit(), 0..12),
    ) {
        let mut tree = MemoryTree::new();
        let (list, ids) = list_of(&mut tree, len);
        let before = tree.render(list);
        {
            let mut tx = WriteTransaction::begin(&mut tree);
            for e in &edits {
                perform(&mut tx, list, e);
            }
        }
        prop_assert_eq!(tree.children(list), ids.clone());
        prop_assert_eq!(tree.render(list), before);
        for id in ids {
            prop_assert_eq!(tree.parent(id), Some(list));
        }
    }

    #[test]
    fn prop_committed_transaction_keeps_edits(
        len in 1usize..6,
        edits in proptest::collection::vec(edit(), 1..12),
    ) {
        let mut tree = MemoryTree::new();
        let (list, _) = list_of(&mut tree, len);
        let mut tx = WriteTransaction::begin(&mut tree);
        for e in &edits {
            perform(&mut tx, list, e);
        }
        let expected = tx.children(list);
        tx.commit();
        prop_assert_eq!(tree.children(list), expected);
    }
}

#[test]
fn test_fingerprint_tracks_signature_through_rollback() {
    let mut tree = MemoryTree::new();
    let ctor = factory::constructor(&mut tree, "public", "Widget").unwrap();
    let original = Fingerprint::of_declaration(&tree, ctor).unwrap();
    let name = tree.child_of_kind(ctor, NodeKind::Name).unwrap();
    let params = tree.child_of_kind(ctor, NodeKind::ParameterList).unwrap();

    {
        let mut tx = WriteTransaction::begin(&mut tree);
        let p = factory::parameter(&mut tx, "int", "size").unwrap();
        tx.append(params, p).unwrap();
        tx.set_text(name, "Gadget").unwrap();
        let changed = Fingerprint::of_declaration(&tx, ctor).unwrap();
        assert_ne!(changed, original);
        let view = SignatureView::read(&tx, ctor).unwrap();
        assert_eq!(view.name, "Gadget");
        assert_eq!(view.parameters.len(), 1);
    }

    assert_eq!(Fingerprint::of_declaration(&tree, ctor).unwrap(), original);
    assert!(SignatureView::read(&tree, ctor).unwrap().parameters.is_empty());
}

#[test]
fn test_read_only_subtree_refuses_edits_inside_transaction() {
    let mut tree = MemoryTree::new();
    let (list, ids) = list_of(&mut tree, 2);
    tree.set_writable(list, false).unwrap();

    let mut tx = WriteTransaction::begin(&mut tree);
    let err = tx.insert_before(list, Some(ids[0]), ids[1]).unwrap_err();

    assert_eq!(err, TreeError::ReadOnly(list));
    assert_eq!(tx.edit_count(), 0);
}
