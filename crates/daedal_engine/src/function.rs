use std::collections::BTreeMap;

use daedal_core::{
    DaedalError, DaedalResult, FuncGuid, FuncId, ParamRef, ParamValue, ProgressChannel,
};
use daedal_model::{Document, FunctionSignature};

/// Everything an executor sees: the snapshot of input values in signature
/// order, the instance's opaque argument blob, and the progress channel.
pub struct FuncInput<'a> {
    pub values: &'a [ParamValue],
    pub args: &'a [u8],
    pub progress: &'a dyn ProgressChannel,
}

/// The three outcomes a Tree Function may signal.
#[derive(Debug)]
pub enum FuncOutcome {
    /// Outputs produced, in signature order.
    Done(Vec<ParamValue>),
    /// Not yet computable (e.g. optional upstream data missing). Outputs
    /// stay invalid; siblings still run.
    NotReady,
    /// Programming or data error. Aborts the whole execution pass.
    Failed(String),
}

pub type ExecutorFn = Box<dyn Fn(&FuncInput<'_>) -> FuncOutcome + Send + Sync>;

/// A registered computation: the declared signature plus the executor.
pub struct FunctionDef {
    pub signature: FunctionSignature,
    executor: ExecutorFn,
}

impl std::fmt::Debug for FunctionDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionDef")
            .field("signature", &self.signature)
            .field("executor", &"<fn>")
            .finish()
    }
}

impl FunctionDef {
    pub fn run(&self, input: &FuncInput<'_>) -> FuncOutcome {
        (self.executor)(input)
    }
}

/// Process-wide table of Tree-Function computations, keyed by GUID. Built
/// explicitly at startup alongside the node-type registry and read-only once
/// the first Document exists.
#[derive(Default)]
pub struct FunctionRegistry {
    defs: BTreeMap<FuncGuid, FunctionDef>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        signature: FunctionSignature,
        executor: ExecutorFn,
    ) -> DaedalResult<()> {
        if self.defs.contains_key(&signature.guid) {
            return Err(DaedalError::validation(format!(
                "function {} ('{}') already registered",
                signature.guid, signature.name
            )));
        }
        self.defs.insert(
            signature.guid,
            FunctionDef {
                signature,
                executor,
            },
        );
        Ok(())
    }

    pub fn get(&self, guid: FuncGuid) -> Option<&FunctionDef> {
        self.defs.get(&guid)
    }

    pub fn require(&self, guid: FuncGuid) -> DaedalResult<&FunctionDef> {
        self.defs
            .get(&guid)
            .ok_or_else(|| DaedalError::not_found(format!("function {guid} not registered")))
    }

    pub fn signature(&self, guid: FuncGuid) -> DaedalResult<&FunctionSignature> {
        Ok(&self.require(guid)?.signature)
    }
}

/// Bind a registered function to concrete parameter references. Resolves the
/// GUID in the registry and delegates wiring validation to the Document.
pub fn bind(
    doc: &mut Document,
    registry: &FunctionRegistry,
    guid: FuncGuid,
    inputs: Vec<ParamRef>,
    outputs: Vec<ParamRef>,
    args: Vec<u8>,
) -> DaedalResult<FuncId> {
    let signature = registry.signature(guid)?.clone();
    doc.bind_function(&signature, inputs, outputs, args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use daedal_core::ParamKind;

    fn signature(guid: FuncGuid) -> FunctionSignature {
        FunctionSignature {
            guid,
            name: "noop".into(),
            inputs: vec![ParamKind::Real],
            outputs: vec![ParamKind::Real],
            is_heavy: false,
        }
    }

    #[test]
    fn duplicate_guid_registration_is_rejected() {
        let guid = FuncGuid::new();
        let mut registry = FunctionRegistry::new();
        registry
            .register(signature(guid), Box::new(|_| FuncOutcome::NotReady))
            .expect("first registration");
        let err = registry
            .register(signature(guid), Box::new(|_| FuncOutcome::NotReady))
            .expect_err("duplicate guid");
        assert!(matches!(err, DaedalError::Validation { .. }));
    }

    #[test]
    fn require_reports_unknown_guid() {
        let registry = FunctionRegistry::new();
        let err = registry.require(FuncGuid::new()).expect_err("unknown");
        assert!(matches!(err, DaedalError::NotFound { .. }));
    }
}
