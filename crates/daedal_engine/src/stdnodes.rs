//! Built-in variable nodes and their evaluator functions.
//!
//! Real-valued variable nodes are the framework's own smallest data entity:
//! a name plus one scalar. The evaluators here are the reference Tree
//! Functions used by demos and the engine's test suite.

use daedal_core::{DaedalResult, FuncGuid, ParamKind, ParamValue, ProgressChannel, SlotId};
use daedal_model::{FunctionSignature, NodeTypeRegistry, SlotDef};

use crate::function::{FuncOutcome, FunctionRegistry};

/// Node type holding one named real scalar.
pub const REAL_VAR_TYPE: &str = "RealVar";

pub const REAL_VAR_NAME_SLOT: SlotId = SlotId(0);
pub const REAL_VAR_VALUE_SLOT: SlotId = SlotId(1);

pub const REAL_SCALE_GUID: FuncGuid = FuncGuid([
    0x5a, 0x1c, 0x09, 0xe4, 0x7b, 0x2d, 0x4f, 0x8a, 0x91, 0x36, 0xc5, 0x0e, 0x6d, 0x72, 0x18,
    0x40,
]);
pub const REAL_ADD_GUID: FuncGuid = FuncGuid([
    0x8e, 0x44, 0xb1, 0x02, 0x3c, 0x97, 0x45, 0xd6, 0xa0, 0x5f, 0x21, 0x7a, 0xee, 0x09, 0x83,
    0x1b,
]);
pub const REAL_SCALE_HEAVY_GUID: FuncGuid = FuncGuid([
    0xc2, 0x70, 0x5d, 0x9f, 0x16, 0x08, 0x4b, 0x31, 0xbe, 0xd4, 0x62, 0x55, 0x0a, 0xf7, 0x2c,
    0x99,
]);

/// Register the built-in node types.
pub fn register_node_types(registry: &mut NodeTypeRegistry) -> DaedalResult<()> {
    registry.register_simple(
        REAL_VAR_TYPE,
        vec![
            SlotDef::new(0, "name", ParamKind::Str),
            SlotDef::new(1, "value", ParamKind::Real),
        ],
        Some(REAL_VAR_NAME_SLOT),
    )
}

/// Encode the scale factor for [`REAL_SCALE_GUID`] instances.
pub fn scale_args(factor: f64) -> Vec<u8> {
    factor.to_le_bytes().to_vec()
}

fn parse_factor(args: &[u8]) -> Result<f64, String> {
    match args.len() {
        0 => Ok(1.0),
        8 => {
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(args);
            Ok(f64::from_le_bytes(bytes))
        }
        len => Err(format!("scale args must be 8 bytes, got {len}")),
    }
}

fn run_scale(values: &[ParamValue], args: &[u8]) -> FuncOutcome {
    let factor = match parse_factor(args) {
        Ok(factor) => factor,
        Err(message) => return FuncOutcome::Failed(message),
    };
    match values {
        [ParamValue::Real(input)] => FuncOutcome::Done(vec![ParamValue::Real(input * factor)]),
        _ => FuncOutcome::Failed("scale expects one real input".into()),
    }
}

/// Register the built-in evaluator functions.
pub fn register_functions(registry: &mut FunctionRegistry) -> DaedalResult<()> {
    registry.register(
        FunctionSignature {
            guid: REAL_SCALE_GUID,
            name: "real.scale".into(),
            inputs: vec![ParamKind::Real],
            outputs: vec![ParamKind::Real],
            is_heavy: false,
        },
        Box::new(|input| run_scale(input.values, input.args)),
    )?;
    registry.register(
        FunctionSignature {
            guid: REAL_ADD_GUID,
            name: "real.add".into(),
            inputs: vec![ParamKind::Real, ParamKind::Real],
            outputs: vec![ParamKind::Real],
            is_heavy: false,
        },
        Box::new(|input| match input.values {
            [ParamValue::Real(a), ParamValue::Real(b)] => {
                FuncOutcome::Done(vec![ParamValue::Real(a + b)])
            }
            _ => FuncOutcome::Failed("add expects two real inputs".into()),
        }),
    )?;
    registry.register(
        FunctionSignature {
            guid: REAL_SCALE_HEAVY_GUID,
            name: "real.scale.heavy".into(),
            inputs: vec![ParamKind::Real],
            outputs: vec![ParamKind::Real],
            is_heavy: true,
        },
        Box::new(|input| {
            if input.progress.is_cancelled() {
                return FuncOutcome::Failed("cancelled before start".into());
            }
            input.progress.report_progress(50);
            let outcome = run_scale(input.values, input.args);
            input.progress.report_progress(100);
            outcome
        }),
    )
}
