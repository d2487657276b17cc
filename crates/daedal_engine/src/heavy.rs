use std::sync::Arc;

use daedal_core::{
    CancelFlag, DaedalError, DaedalResult, FuncGuid, FuncId, ParamValue, ProgressChannel,
};
use daedal_model::{Document, FuncState};
use log::{debug, info};
use tokio::task::JoinHandle;

use crate::function::{FuncInput, FuncOutcome, FunctionRegistry};

/// An in-flight background run of a heavy Tree Function. The document thread
/// keeps the job handle; the worker owns only the snapshotted inputs and the
/// cancellation flag.
#[derive(Debug)]
pub struct HeavyJob {
    func: FuncId,
    guid: FuncGuid,
    cancel: CancelFlag,
    handle: JoinHandle<FuncOutcome>,
}

impl HeavyJob {
    pub fn func(&self) -> FuncId {
        self.func
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn progress(&self) -> u8 {
        self.cancel.last_progress()
    }

    /// Wait for the worker to finish. The returned outcome still has to be
    /// committed on the document thread via [`commit_heavy`].
    pub async fn join(self) -> DaedalResult<HeavyOutcome> {
        let result = self
            .handle
            .await
            .map_err(|err| DaedalError::heavy_failed(self.guid, format!("worker died: {err}")))?;
        Ok(HeavyOutcome {
            func: self.func,
            guid: self.guid,
            cancelled: self.cancel.is_cancelled(),
            result,
        })
    }
}

/// What a finished worker produced, ready for transactional commit.
pub struct HeavyOutcome {
    pub func: FuncId,
    pub guid: FuncGuid,
    pub cancelled: bool,
    result: FuncOutcome,
}

/// Dispatch one pending heavy function onto a worker task.
///
/// Runs on the document thread: input values are snapshotted here, so the
/// worker never touches live document state. The caller must keep the
/// document thread from mutating the instance's inputs until the job is
/// joined and committed.
pub fn dispatch(
    doc: &Document,
    registry: &Arc<FunctionRegistry>,
    func: FuncId,
) -> DaedalResult<HeavyJob> {
    if doc.transaction_open() {
        return Err(DaedalError::validation(
            "heavy dispatch requested inside an open transaction",
        ));
    }
    let instance = doc.instance(func)?.clone();
    let def = registry.require(instance.guid)?;
    if !def.signature.is_heavy {
        return Err(DaedalError::validation(format!(
            "function '{}' is not heavy",
            def.signature.name
        )));
    }
    if instance.state == FuncState::Clean {
        return Err(DaedalError::validation(format!(
            "function instance {func} has nothing to compute"
        )));
    }
    let mut values: Vec<ParamValue> = Vec::with_capacity(instance.inputs.len());
    for input in &instance.inputs {
        let param = doc.param(*input)?;
        if !param.is_valid() {
            return Err(DaedalError::validation(format!(
                "input {input} of heavy function {func} is not valid"
            )));
        }
        values.push(param.value().clone());
    }

    let cancel = CancelFlag::new();
    let worker_cancel = cancel.clone();
    let worker_registry = Arc::clone(registry);
    let guid = instance.guid;
    let args = instance.args.clone();
    debug!("engine: dispatching heavy function {guid} as job for {func}");
    let handle = tokio::task::spawn_blocking(move || {
        let def = match worker_registry.require(guid) {
            Ok(def) => def,
            Err(err) => return FuncOutcome::Failed(err.to_string()),
        };
        let input = FuncInput {
            values: &values,
            args: &args,
            progress: &worker_cancel,
        };
        def.run(&input)
    });
    Ok(HeavyJob {
        func,
        guid,
        cancel,
        handle,
    })
}

/// Commit a finished heavy run on the document thread.
///
/// A cancelled job commits nothing and leaves the instance pending. Success
/// writes the outputs and marks the instance clean in one transaction; a
/// worker failure records the dedicated failed state and surfaces
/// `HeavyExecutionFailed`.
pub fn commit_heavy(doc: &mut Document, outcome: HeavyOutcome) -> DaedalResult<()> {
    let instance = doc.instance(outcome.func)?.clone();
    if outcome.cancelled {
        info!("engine: heavy job for {} cancelled, nothing committed", outcome.func);
        return Ok(());
    }
    match outcome.result {
        FuncOutcome::Done(values) => {
            if values.len() != instance.outputs.len() {
                return Err(DaedalError::heavy_failed(
                    outcome.guid,
                    format!(
                        "produced {} outputs, signature declares {}",
                        values.len(),
                        instance.outputs.len()
                    ),
                ));
            }
            doc.with_transaction("heavy commit", |doc| {
                for (at, value) in instance.outputs.iter().zip(values) {
                    doc.write_output(*at, value)?;
                }
                doc.set_func_state(outcome.func, FuncState::Clean)
            })
        }
        FuncOutcome::NotReady => Ok(()),
        FuncOutcome::Failed(message) => {
            doc.with_transaction("heavy failure", |doc| {
                doc.set_func_state(outcome.func, FuncState::Failed)
            })?;
            Err(DaedalError::heavy_failed(outcome.guid, message))
        }
    }
}
