//! Diagnostic JSON dump of a live document. This is an inspection surface
//! for logs, tests, and support bundles; the binary container in `codec` is
//! the only load format.

use daedal_core::{DaedalError, DaedalResult};
use daedal_model::Document;
use serde_json::{json, Value};

pub fn dump_json(doc: &Document) -> DaedalResult<Value> {
    let partitions: Vec<Value> = doc
        .partitions()
        .map(|partition| {
            let nodes: Vec<Value> = partition
                .nodes()
                .map(|node| {
                    let params: DaedalResult<Vec<Value>> = node
                        .params()
                        .map(|param| {
                            let value = serde_json::to_value(param.value())
                                .map_err(|err| DaedalError::storage(err.to_string()))?;
                            Ok(json!({
                                "slot": param.slot().0,
                                "kind": format!("{:?}", param.kind()),
                                "value": value,
                                "isValid": param.is_valid(),
                            }))
                        })
                        .collect();
                    Ok(json!({
                        "id": node.id().0,
                        "children": node.children().iter().map(|child| child.0).collect::<Vec<_>>(),
                        "params": params?,
                    }))
                })
                .collect::<DaedalResult<Vec<Value>>>()?;
            Ok(json!({
                "id": partition.id().0,
                "typeName": partition.type_name(),
                "nodes": nodes,
            }))
        })
        .collect::<DaedalResult<Vec<Value>>>()?;

    let functions: Vec<Value> = doc
        .instances()
        .map(|instance| {
            json!({
                "id": instance.id.0,
                "guid": instance.guid.to_string(),
                "state": format!("{:?}", instance.state),
                "inputs": instance.inputs.iter().map(|at| at.to_string()).collect::<Vec<_>>(),
                "outputs": instance.outputs.iter().map(|at| at.to_string()).collect::<Vec<_>>(),
                "argsLen": instance.args.len(),
            })
        })
        .collect();

    Ok(json!({
        "format": crate::store::FORMAT_NAME,
        "formatVersion": doc.format_version(),
        "appVersion": doc.app_version(),
        "partitions": partitions,
        "functions": functions,
    }))
}
