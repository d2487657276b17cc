//! v2 -> v3: parameter validity moves from a per-node slot bitmask to a
//! per-parameter flag byte, and timestamp parameters (previously Int
//! microseconds listed in a per-node marker table) get their own kind tag.

use daedal_core::{DaedalError, DaedalResult, ParamValue, ProgressChannel, Timestamp};

use crate::migration::ConversionRoutine;
use crate::raw::{RawDocument, RawNode};

pub struct Conversion;

impl ConversionRoutine for Conversion {
    fn from_version(&self) -> u32 {
        2
    }

    fn name(&self) -> &'static str {
        "validity bitmask to per-parameter flags"
    }

    fn apply(&self, raw: &mut RawDocument, progress: &dyn ProgressChannel) -> DaedalResult<()> {
        let total: usize = raw
            .partitions
            .iter()
            .map(|partition| partition.nodes.len())
            .sum::<usize>()
            .max(1);
        let mut done = 0usize;
        for partition in &mut raw.partitions {
            for node in &mut partition.nodes {
                if progress.is_cancelled() {
                    return Err(DaedalError::aborted("document conversion cancelled"));
                }
                convert_node(node)?;
                done += 1;
                progress.report_progress((done * 100 / total) as u8);
            }
        }
        Ok(())
    }
}

fn convert_node(node: &mut RawNode) -> DaedalResult<()> {
    match node.valid_mask.take() {
        Some(mask) => {
            for param in &mut node.params {
                if param.slot >= 64 {
                    // The legacy mask cannot describe this slot; no v2
                    // writer ever produced one.
                    return Err(DaedalError::unsupported_schema(2, 3));
                }
                param.valid = Some(mask & (1u64 << param.slot) != 0);
            }
        }
        // Already per-parameter; leave untouched, but only if it really is.
        None => {
            if node.params.iter().any(|param| param.valid.is_none()) {
                return Err(DaedalError::unsupported_schema(2, 3));
            }
        }
    }
    for slot in std::mem::take(&mut node.timestamp_slots) {
        let param = node
            .params
            .iter_mut()
            .find(|param| param.slot == slot)
            .ok_or_else(|| DaedalError::unsupported_schema(2, 3))?;
        match param.value {
            ParamValue::Int(micros) => {
                param.value = ParamValue::TimeStamp(Timestamp::from_micros(micros));
            }
            _ => return Err(DaedalError::unsupported_schema(2, 3)),
        }
    }
    Ok(())
}
