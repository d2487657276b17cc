use std::sync::Arc;

use daedal_core::{DaedalError, NodeId, ParamKind, ParamRef, ParamValue, PartitionId, SlotId};
use daedal_model::{Document, FuncState, FunctionSignature, NodeTypeRegistry, SlotDef};

fn registry() -> Arc<NodeTypeRegistry> {
    let mut registry = NodeTypeRegistry::new();
    registry
        .register_simple(
            "Var",
            vec![SlotDef::new(0, "value", ParamKind::Real)],
            None,
        )
        .expect("register Var");
    Arc::new(registry)
}

fn at(partition: PartitionId, node: NodeId) -> ParamRef {
    ParamRef::new(partition, node, SlotId(0))
}

#[test]
fn removed_node_ids_are_never_reused() {
    let mut doc = Document::new(registry());
    let partition = doc
        .with_transaction("seed", |doc| {
            let partition = doc.add_partition("Var")?;
            for _ in 0..5 {
                doc.add_node(partition)?;
            }
            Ok(partition)
        })
        .expect("seed");

    doc.with_transaction("remove", |doc| doc.remove_node(partition, NodeId(3)))
        .expect("remove");
    let fresh = doc
        .with_transaction("add", |doc| doc.add_node(partition))
        .expect("add");
    assert_eq!(fresh, NodeId(6), "id 3 must stay retired");

    let stale = at(partition, NodeId(3));
    let err = doc.param(stale).expect_err("stale reference");
    assert!(matches!(err, DaedalError::NotFound { .. }));
}

#[test]
fn removing_a_node_cascades_its_functions_and_invalidates_downstream() {
    let mut doc = Document::new(registry());
    let signature = FunctionSignature {
        guid: daedal_core::FuncGuid::new(),
        name: "scale".into(),
        inputs: vec![ParamKind::Real],
        outputs: vec![ParamKind::Real],
        is_heavy: false,
    };
    // a -> F -> b -> G -> c; removing b's node must remove both F and G and
    // leave c stale.
    let (partition, a, b, c, f, g) = doc
        .with_transaction("seed", |doc| {
            let partition = doc.add_partition("Var")?;
            let a = doc.add_node(partition)?;
            let b = doc.add_node(partition)?;
            let c = doc.add_node(partition)?;
            doc.set_value(at(partition, a), ParamValue::Real(1.0))?;
            let f = doc.bind_function(
                &signature,
                vec![at(partition, a)],
                vec![at(partition, b)],
                Vec::new(),
            )?;
            let g = doc.bind_function(
                &signature,
                vec![at(partition, b)],
                vec![at(partition, c)],
                Vec::new(),
            )?;
            // Pretend both ran.
            doc.write_output(at(partition, b), ParamValue::Real(2.0))?;
            doc.set_func_state(f, FuncState::Clean)?;
            doc.write_output(at(partition, c), ParamValue::Real(4.0))?;
            doc.set_func_state(g, FuncState::Clean)?;
            Ok((partition, a, b, c, f, g))
        })
        .expect("seed");
    assert!(doc.is_valid(at(partition, c)).expect("validity"));

    doc.with_transaction("remove", |doc| doc.remove_node(partition, b))
        .expect("remove");

    assert!(matches!(
        doc.instance(f).expect_err("F gone"),
        DaedalError::NotFound { .. }
    ));
    assert!(matches!(
        doc.instance(g).expect_err("G gone"),
        DaedalError::NotFound { .. }
    ));
    assert!(doc.param(at(partition, a)).is_ok(), "a survives");
    assert!(
        !doc.is_valid(at(partition, c)).expect("validity"),
        "output downstream of the removed subtree is stale"
    );
}

#[test]
fn removing_a_parent_removes_its_subtree() {
    let mut doc = Document::new(registry());
    let (partition, parent, child, grandchild) = doc
        .with_transaction("seed", |doc| {
            let partition = doc.add_partition("Var")?;
            let parent = doc.add_node(partition)?;
            let child = doc.add_node_under(partition, parent)?;
            let grandchild = doc.add_node_under(partition, child)?;
            Ok((partition, parent, child, grandchild))
        })
        .expect("seed");

    doc.with_transaction("remove", |doc| doc.remove_node(partition, parent))
        .expect("remove");
    for id in [parent, child, grandchild] {
        assert!(doc.node(partition, id).is_err(), "node {id} removed");
    }

    doc.undo().expect("undo restores the subtree");
    let restored = doc.node(partition, parent).expect("parent back");
    assert_eq!(restored.children(), &[child]);
    let restored_child = doc.node(partition, child).expect("child back");
    assert_eq!(restored_child.children(), &[grandchild]);
}
