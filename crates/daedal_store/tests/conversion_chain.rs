//! Loads hand-built legacy containers through the conversion chain.
//!
//! v1 containers carry a single pending flag per function and per-node
//! validity bitmasks; v2 containers already have the three-state function
//! byte but still use bitmasks and Int-encoded timestamps.

use std::sync::Arc;

use daedal_core::{
    CancelFlag, DaedalError, NodeId, NullProgress, ParamKind, ParamValue, PartitionId, SlotId,
    Timestamp,
};
use daedal_model::{FuncState, NodeTypeRegistry, SlotDef};
use daedal_store::load_from_bytes;

fn registry() -> Arc<NodeTypeRegistry> {
    let mut registry = NodeTypeRegistry::new();
    registry
        .register_simple(
            "Stamped",
            vec![
                SlotDef::new(0, "name", ParamKind::Str),
                SlotDef::new(1, "value", ParamKind::Real),
                SlotDef::new(2, "modified", ParamKind::TimeStamp),
            ],
            Some(SlotId(0)),
        )
        .expect("register Stamped");
    Arc::new(registry)
}

#[derive(Default)]
struct Builder {
    buf: Vec<u8>,
}

impl Builder {
    fn u8(&mut self, value: u8) -> &mut Self {
        self.buf.push(value);
        self
    }

    fn u16(&mut self, value: u16) -> &mut Self {
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    fn u32(&mut self, value: u32) -> &mut Self {
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    fn u64(&mut self, value: u64) -> &mut Self {
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    fn i64(&mut self, value: i64) -> &mut Self {
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    fn f64(&mut self, value: f64) -> &mut Self {
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    fn str(&mut self, value: &str) -> &mut Self {
        self.u32(value.len() as u32);
        self.buf.extend_from_slice(value.as_bytes());
        self
    }

    fn param_ref(&mut self, partition: u32, node: u32, slot: u16) -> &mut Self {
        self.u32(partition).u32(node).u16(slot)
    }
}

/// One "Stamped" partition with two nodes and one function `b = f(a)`.
/// Node 2's value slot is stale (driven by the pending function).
fn legacy_container(version: u32) -> Vec<u8> {
    assert!(version == 1 || version == 2, "legacy fixtures only");
    let mut b = Builder::default();
    b.buf.extend_from_slice(b"DAED");
    b.u32(version); // format stamp
    b.u32(4); // app version
    b.u32(2); // next partition id
    b.u32(2); // next function id

    b.u32(1); // one partition
    b.u32(1).str("Stamped").u32(3); // id, type, next node id
    b.u32(2); // two nodes

    // Node 1: "a" = 2.0, modified marker on slot 2, everything valid.
    b.u32(1).u32(0); // id, no children
    b.u16(3); // three params
    b.u16(0).u8(ParamKind::Str.as_u8()).str("a");
    b.u16(1).u8(ParamKind::Real.as_u8()).f64(2.0);
    b.u16(2).u8(ParamKind::Int.as_u8()).i64(77_000);
    b.u64(0b111); // validity bitmask
    b.u16(1).u16(2); // timestamp marker table

    // Node 2: "b", value slot stale.
    b.u32(2).u32(0);
    b.u16(3);
    b.u16(0).u8(ParamKind::Str.as_u8()).str("b");
    b.u16(1).u8(ParamKind::Real.as_u8()).f64(0.0);
    b.u16(2).u8(ParamKind::Int.as_u8()).i64(88_000);
    b.u64(0b101);
    b.u16(1).u16(2);

    b.u32(1); // one function
    b.u32(1); // id
    b.buf.extend_from_slice(&[7u8; 16]); // guid
    if version == 1 {
        b.u8(1); // v1 pending flag
    } else {
        b.u8(FuncState::Failed.as_u8()); // v2 state byte
    }
    b.u32(1).param_ref(1, 1, 1); // inputs
    b.u32(1).param_ref(1, 2, 1); // outputs
    b.u32(0); // args
    b.buf
}

fn slot(node: u32, index: u16) -> daedal_core::ParamRef {
    daedal_core::ParamRef::new(PartitionId(1), NodeId(node), SlotId(index))
}

#[test]
fn v1_container_runs_both_routines_in_order() {
    let bytes = legacy_container(1);
    let doc = load_from_bytes(&bytes, registry(), &NullProgress).expect("load");

    // v1 -> v2 evidence: the pending flag became the Pending state.
    let instance = doc.instance(daedal_core::FuncId(1)).expect("instance");
    assert_eq!(instance.state, FuncState::Pending);

    // v2 -> v3 evidence: bitmask split into flags, Int markers retagged.
    assert!(doc.is_valid(slot(1, 1)).expect("validity"));
    assert!(!doc.is_valid(slot(2, 1)).expect("validity"));
    assert_eq!(
        doc.value(slot(1, 2)).expect("value"),
        &ParamValue::TimeStamp(Timestamp::from_micros(77_000))
    );
    assert_eq!(
        doc.value(slot(2, 2)).expect("value"),
        &ParamValue::TimeStamp(Timestamp::from_micros(88_000))
    );
    assert_eq!(doc.app_version(), 4);
    assert_eq!(doc.format_version(), daedal_model::CURRENT_FORMAT_VERSION);
}

#[test]
fn v2_container_skips_the_retired_routine() {
    let bytes = legacy_container(2);
    let doc = load_from_bytes(&bytes, registry(), &NullProgress).expect("load");

    // The v2 state byte is authoritative; only the validity/timestamp
    // routine may touch this container.
    let instance = doc.instance(daedal_core::FuncId(1)).expect("instance");
    assert_eq!(instance.state, FuncState::Failed);
    assert_eq!(
        doc.value(slot(1, 2)).expect("value"),
        &ParamValue::TimeStamp(Timestamp::from_micros(77_000))
    );
}

#[test]
fn cancellation_aborts_the_load() {
    let bytes = legacy_container(1);
    let cancel = CancelFlag::new();
    cancel.cancel();
    let err = load_from_bytes(&bytes, registry(), &cancel).expect_err("cancelled load");
    assert!(matches!(err, DaedalError::TransactionAborted { .. }));
}

#[test]
fn truncated_legacy_container_is_a_storage_error() {
    let mut bytes = legacy_container(1);
    bytes.truncate(bytes.len() - 5);
    let err = load_from_bytes(&bytes, registry(), &NullProgress).expect_err("truncated");
    assert!(matches!(err, DaedalError::Storage { .. }));
}
