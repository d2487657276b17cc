use std::sync::Arc;

use daedal_core::{DaedalError, ParamRef, ParamValue, PartitionId};
use daedal_engine::stdnodes::{
    self, scale_args, REAL_SCALE_GUID, REAL_SCALE_HEAVY_GUID, REAL_VAR_TYPE, REAL_VAR_VALUE_SLOT,
};
use daedal_engine::{bind, commit_heavy, dispatch, FunctionRegistry};
use daedal_model::{Document, FuncState, NodeTypeRegistry};

fn registries() -> (Arc<NodeTypeRegistry>, Arc<FunctionRegistry>) {
    let mut types = NodeTypeRegistry::new();
    stdnodes::register_node_types(&mut types).expect("node types");
    let mut funcs = FunctionRegistry::new();
    stdnodes::register_functions(&mut funcs).expect("functions");
    (Arc::new(types), Arc::new(funcs))
}

fn value_at(partition: PartitionId, node: daedal_core::NodeId) -> ParamRef {
    ParamRef::new(partition, node, REAL_VAR_VALUE_SLOT)
}

fn seeded(types: Arc<NodeTypeRegistry>, funcs: &FunctionRegistry, guid: daedal_core::FuncGuid)
    -> (Document, ParamRef, ParamRef, daedal_core::FuncId)
{
    let mut doc = Document::new(types);
    let (a, b, func) = doc
        .with_transaction("seed", |doc| {
            let partition = doc.add_partition(REAL_VAR_TYPE)?;
            let a = value_at(partition, doc.add_node(partition)?);
            let b = value_at(partition, doc.add_node(partition)?);
            doc.set_value(a, ParamValue::Real(3.0))?;
            let func = bind(doc, funcs, guid, vec![a], vec![b], scale_args(2.0))?;
            Ok((a, b, func))
        })
        .expect("seed");
    (doc, a, b, func)
}

#[tokio::test]
async fn heavy_commit_matches_inline_execution() {
    let (types, funcs) = registries();
    let (mut doc, _a, b, func) = seeded(types, &funcs, REAL_SCALE_HEAVY_GUID);

    let job = dispatch(&doc, &funcs, func).expect("dispatch");
    let outcome = job.join().await.expect("join");
    commit_heavy(&mut doc, outcome).expect("commit");

    assert_eq!(doc.value(b).expect("value"), &ParamValue::Real(6.0));
    assert!(doc.is_valid(b).expect("validity"));
    assert_eq!(doc.instance(func).expect("instance").state, FuncState::Clean);
}

#[tokio::test]
async fn cancelled_heavy_job_commits_nothing() {
    let (types, funcs) = registries();
    let (mut doc, _a, b, func) = seeded(types, &funcs, REAL_SCALE_HEAVY_GUID);

    let job = dispatch(&doc, &funcs, func).expect("dispatch");
    job.cancel();
    let outcome = job.join().await.expect("join");
    assert!(outcome.cancelled);
    commit_heavy(&mut doc, outcome).expect("cancelled commit is a no-op");

    assert!(!doc.is_valid(b).expect("validity"), "output stays stale");
    assert_eq!(
        doc.instance(func).expect("instance").state,
        FuncState::Pending,
        "instance still wants to run"
    );
}

#[tokio::test]
async fn dispatch_rejects_functions_not_marked_heavy() {
    let (types, funcs) = registries();
    let (doc, _a, _b, func) = seeded(types, &funcs, REAL_SCALE_GUID);
    let err = dispatch(&doc, &funcs, func).expect_err("light function");
    assert!(matches!(err, DaedalError::Validation { .. }));
}

#[tokio::test]
async fn dispatch_rejects_invalid_inputs() {
    let (types, funcs) = registries();
    let (mut doc, _a, b, _func) = seeded(types, &funcs, REAL_SCALE_HEAVY_GUID);
    // Chain a second heavy function downstream; its input is invalid until
    // the first one commits.
    let downstream = doc
        .with_transaction("chain", |doc| {
            let partition = doc.find_partition(REAL_VAR_TYPE)
                .ok_or_else(|| DaedalError::not_found("partition"))?;
            let c = value_at(partition, doc.add_node(partition)?);
            bind(
                doc,
                &funcs,
                REAL_SCALE_HEAVY_GUID,
                vec![b],
                vec![c],
                scale_args(2.0),
            )
        })
        .expect("chain");
    let err = dispatch(&doc, &funcs, downstream).expect_err("stale input");
    assert!(matches!(err, DaedalError::Validation { .. }));
}
