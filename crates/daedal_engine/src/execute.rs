use std::collections::BTreeSet;

use daedal_core::{DaedalError, DaedalResult, FuncId, ParamValue, ProgressChannel};
use daedal_model::{Document, FuncState};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::function::{FuncInput, FuncOutcome, FunctionRegistry};
use crate::graph::DependencyGraph;

/// Result of one synchronous execution pass.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionReport {
    /// Instances executed successfully, in run order.
    pub executed: Vec<FuncId>,
    /// Instances that signalled "not yet computable" or had an invalid
    /// input; they stay pending and their outputs stay invalid.
    pub not_ready: Vec<FuncId>,
}

/// Run every pending Tree-Function instance (and everything downstream of
/// one) in dependency order.
///
/// The whole pass is one transaction: success commits, a hard function
/// failure or cancellation rolls the Document back to the pre-call state.
/// Given identical input values and an identical pending set, two passes
/// produce byte-identical outputs.
pub fn execute(
    doc: &mut Document,
    registry: &FunctionRegistry,
    progress: &dyn ProgressChannel,
) -> DaedalResult<ExecutionReport> {
    if doc.transaction_open() {
        return Err(DaedalError::validation(
            "execution pass requested inside an open transaction",
        ));
    }

    let members = pending_closure(doc)?;
    if members.is_empty() {
        return Ok(ExecutionReport::default());
    }
    let graph = DependencyGraph::build(doc, &members)?;
    graph.check_cycles()?;
    let order = graph.topo_order();
    debug!("engine: executing {} pending functions", order.len());

    doc.begin_transaction("execute")?;
    match run_in_order(doc, registry, progress, &order) {
        Ok(report) => {
            doc.commit_transaction()?;
            Ok(report)
        }
        Err(err) => {
            warn!("engine: execution pass aborted: {err}");
            let _ = doc.rollback_transaction();
            Err(err)
        }
    }
}

/// Pending instances plus every instance transitively downstream of one of
/// their outputs. In-session the eager invalidation walk keeps these in
/// lockstep; the closure also covers documents freshly loaded from storage.
fn pending_closure(doc: &Document) -> DaedalResult<BTreeSet<FuncId>> {
    let mut members: BTreeSet<FuncId> = doc
        .instances()
        .filter(|instance| instance.state == FuncState::Pending)
        .map(|instance| instance.id)
        .collect();
    let mut worklist: Vec<FuncId> = members.iter().copied().collect();
    while let Some(func) = worklist.pop() {
        let outputs = doc.instance(func)?.outputs.clone();
        for output in outputs {
            for reader in doc.readers_of(output) {
                if members.insert(reader) {
                    worklist.push(reader);
                }
            }
        }
    }
    Ok(members)
}

fn run_in_order(
    doc: &mut Document,
    registry: &FunctionRegistry,
    progress: &dyn ProgressChannel,
    order: &[FuncId],
) -> DaedalResult<ExecutionReport> {
    let mut report = ExecutionReport::default();
    for (index, func) in order.iter().enumerate() {
        if progress.is_cancelled() {
            return Err(DaedalError::aborted("execution pass cancelled"));
        }
        let instance = doc.instance(*func)?.clone();
        let def = registry.require(instance.guid)?;

        let mut values: Vec<ParamValue> = Vec::with_capacity(instance.inputs.len());
        let mut inputs_ready = true;
        for input in &instance.inputs {
            // A stale reference to a removed node is a hard error; an
            // invalid (not yet computed) input is a soft skip.
            let param = doc.param(*input)?;
            if !param.is_valid() {
                inputs_ready = false;
                break;
            }
            values.push(param.value().clone());
        }
        if !inputs_ready {
            report.not_ready.push(*func);
            continue;
        }

        let input = FuncInput {
            values: &values,
            args: &instance.args,
            progress,
        };
        match def.run(&input) {
            FuncOutcome::Done(outputs) => {
                if outputs.len() != instance.outputs.len() {
                    return Err(DaedalError::execution_failed(
                        instance.guid,
                        format!(
                            "produced {} outputs, signature declares {}",
                            outputs.len(),
                            instance.outputs.len()
                        ),
                    ));
                }
                for (at, value) in instance.outputs.iter().zip(outputs) {
                    doc.write_output(*at, value)?;
                }
                doc.set_func_state(*func, FuncState::Clean)?;
                report.executed.push(*func);
            }
            FuncOutcome::NotReady => {
                report.not_ready.push(*func);
            }
            FuncOutcome::Failed(message) => {
                return Err(DaedalError::execution_failed(instance.guid, message));
            }
        }
        progress.report_progress((((index + 1) * 100) / order.len()) as u8);
    }
    Ok(report)
}
