//! Property tests for delta classification

use proptest::prelude::*;
use sigprop_delta::{DeltaBuilder, ParameterDelta};
use sigprop_tree::{factory, MemoryTree, NodeId, NodeKind, SyntaxTree};

fn declaration(tree: &mut MemoryTree, count: usize) -> NodeId {
    let mods = tree.create(NodeKind::Modifiers, "");
    let ret = tree.create(NodeKind::TypeRef, "void");
    let name = tree.create(NodeKind::Name, "m");
    let list = tree.create(NodeKind::ParameterList, "");
    for i in 0..count {
        let p = factory::parameter(tree, "int", &format!("p{i}")).unwrap();
        tree.append(list, p).unwrap();
    }
    let throws = tree.create(NodeKind::ThrowsList, "");
    factory::node(tree, NodeKind::Method, "", &[mods, ret, name, list, throws]).unwrap()
}

proptest! {
    #[test]
    fn prop_permutation_keeps_every_parameter(perm in (1usize..6).prop_flat_map(|n| Just((0..n).collect::<Vec<_>>()).prop_shuffle())) {
        let mut tree = MemoryTree::new();
        let decl = declaration(&mut tree, perm.len());
        let params = perm
            .iter()
            .map(|&i| ParameterDelta::existing(i, format!("p{i}"), "int"))
            .collect();
        let delta = DeltaBuilder::for_declaration(&tree, decl).unwrap().parameters(params).build().unwrap();

        let identity = perm.iter().enumerate().all(|(i, &p)| i == p);
        prop_assert!(delta.to_remove().iter().all(|r| !r));
        prop_assert_eq!(delta.is_parameter_set_or_order_changed(), !identity);
        prop_assert!(!delta.is_parameter_names_changed());
    }

    #[test]
    fn prop_removal_mask_matches_dropped(count in 1usize..6, keep_mask in proptest::collection::vec(any::<bool>(), 6)) {
        let mut tree = MemoryTree::new();
        let decl = declaration(&mut tree, count);
        let params = (0..count)
            .filter(|i| keep_mask[*i])
            .map(|i| ParameterDelta::existing(i, format!("p{i}"), "int"))
            .collect();
        let delta = DeltaBuilder::for_declaration(&tree, decl).unwrap().parameters(params).build().unwrap();

        for i in 0..count {
            prop_assert_eq!(delta.to_remove()[i], !keep_mask[i]);
        }
    }
}
