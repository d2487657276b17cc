use std::path::Path;
use std::sync::Arc;

use daedal_core::{DaedalError, DaedalResult, NodeId, PartitionId, ProgressChannel, SlotId};
use daedal_model::{
    Document, FuncState, Node, NodeTypeRegistry, Parameter, Partition, TreeFunctionInstance,
    CURRENT_FORMAT_VERSION,
};
use log::info;

use crate::codec;
use crate::migration::Converter;
use crate::raw::{RawDocument, RawFunction, RawNode, RawParam, RawPartition};

pub const FORMAT_NAME: &str = "Daedal Binary Document";
pub const FILE_EXTENSION: &str = "dbd";

/// Serialize a Document into the binary container at the current format
/// version. Round-tripping reproduces parameter values, validity flags, and
/// function Pending/Failed states exactly; transient engine caches are not
/// part of the container.
pub fn save_to_bytes(doc: &Document) -> DaedalResult<Vec<u8>> {
    codec::encode(&flatten(doc))
}

pub fn save(doc: &Document, path: &Path) -> DaedalResult<()> {
    let bytes = save_to_bytes(doc)?;
    std::fs::write(path, &bytes)?;
    info!(
        "store: saved document to {} ({} bytes)",
        path.display(),
        bytes.len()
    );
    Ok(())
}

/// Decode a container, run the conversion chain if its stamp is older than
/// the current format, and materialize the Document. A stamp above the
/// current version fails `UnsupportedSchema`; a failed conversion aborts the
/// whole load with no partially-converted document.
pub fn load_from_bytes(
    bytes: &[u8],
    registry: Arc<NodeTypeRegistry>,
    progress: &dyn ProgressChannel,
) -> DaedalResult<Document> {
    let mut raw = codec::decode(bytes)?;
    let stored = raw.format_version;
    Converter::upgrade(&mut raw, progress)?;
    if stored < CURRENT_FORMAT_VERSION {
        info!("store: loaded legacy document (v{stored} -> v{CURRENT_FORMAT_VERSION})");
    }
    materialize(raw, registry)
}

pub fn load(
    path: &Path,
    registry: Arc<NodeTypeRegistry>,
    progress: &dyn ProgressChannel,
) -> DaedalResult<Document> {
    let bytes = std::fs::read(path)?;
    load_from_bytes(&bytes, registry, progress)
}

fn flatten(doc: &Document) -> RawDocument {
    let partitions = doc
        .partitions()
        .map(|partition| RawPartition {
            id: partition.id().0,
            type_name: partition.type_name().to_string(),
            next_node: partition.next_node(),
            nodes: partition
                .nodes()
                .map(|node| RawNode {
                    id: node.id().0,
                    children: node.children().iter().map(|child| child.0).collect(),
                    params: node
                        .params()
                        .map(|param| RawParam {
                            slot: param.slot().0,
                            value: param.value().clone(),
                            valid: Some(param.is_valid()),
                        })
                        .collect(),
                    valid_mask: None,
                    timestamp_slots: Vec::new(),
                })
                .collect(),
        })
        .collect();
    let functions = doc
        .instances()
        .map(|instance| RawFunction {
            id: instance.id.0,
            guid: instance.guid.as_bytes(),
            pending: None,
            state: Some(instance.state.as_u8()),
            inputs: instance.inputs.clone(),
            outputs: instance.outputs.clone(),
            args: instance.args.clone(),
        })
        .collect();
    RawDocument {
        format_version: CURRENT_FORMAT_VERSION,
        app_version: doc.app_version(),
        next_partition: doc.next_partition_id(),
        next_func: doc.next_func_id(),
        partitions,
        functions,
    }
}

fn materialize(raw: RawDocument, registry: Arc<NodeTypeRegistry>) -> DaedalResult<Document> {
    if raw.format_version != CURRENT_FORMAT_VERSION {
        return Err(DaedalError::unsupported_schema(
            raw.format_version,
            CURRENT_FORMAT_VERSION,
        ));
    }
    let mut partitions = Vec::with_capacity(raw.partitions.len());
    for partition in raw.partitions {
        let mut nodes = Vec::with_capacity(partition.nodes.len());
        for node in partition.nodes {
            if node.valid_mask.is_some() || !node.timestamp_slots.is_empty() {
                return Err(DaedalError::storage(
                    "legacy node fields survived the conversion chain",
                ));
            }
            let mut params = Vec::with_capacity(node.params.len());
            for param in node.params {
                let valid = param.valid.ok_or_else(|| {
                    DaedalError::storage("parameter left without a validity flag")
                })?;
                params.push(Parameter::restore(SlotId(param.slot), param.value, valid));
            }
            nodes.push(Node::restore(
                NodeId(node.id),
                partition.type_name.clone(),
                params,
                node.children.into_iter().map(NodeId).collect(),
            ));
        }
        partitions.push(Partition::restore(
            PartitionId(partition.id),
            partition.type_name,
            nodes,
            partition.next_node,
        )?);
    }
    let mut functions = Vec::with_capacity(raw.functions.len());
    for function in raw.functions {
        if function.pending.is_some() {
            return Err(DaedalError::storage(
                "legacy pending flag survived the conversion chain",
            ));
        }
        let state_byte = function
            .state
            .ok_or_else(|| DaedalError::storage("function left without a state byte"))?;
        let state = FuncState::from_u8(state_byte).ok_or_else(|| {
            DaedalError::storage(format!("unknown function state byte {state_byte}"))
        })?;
        functions.push(TreeFunctionInstance {
            id: daedal_core::FuncId(function.id),
            guid: daedal_core::FuncGuid::from_bytes(function.guid),
            inputs: function.inputs,
            outputs: function.outputs,
            args: function.args,
            state,
        });
    }
    Document::restore(
        registry,
        partitions,
        raw.next_partition,
        functions,
        raw.next_func,
        raw.app_version,
    )
}
