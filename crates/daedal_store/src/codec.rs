//! Byte-level encoding of the document container.
//!
//! Everything is little-endian. Variable-length payloads are u32
//! length-prefixed. The encoder always writes the current format; the
//! decoder additionally understands the legacy v1/v2 record layouts, which
//! the conversion chain then normalizes.

use daedal_core::{
    DaedalError, DaedalResult, FuncId, NodeId, ParamKind, ParamRef, ParamValue, PartitionId,
    SlotId, Timestamp,
};
use daedal_model::CURRENT_FORMAT_VERSION;

use crate::raw::{RawDocument, RawFunction, RawNode, RawParam, RawPartition};

pub const MAGIC: [u8; 4] = *b"DAED";

pub(crate) struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn put_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn put_u16(&mut self, value: u16) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn put_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn put_i64(&mut self, value: i64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn put_f64(&mut self, value: f64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn put_bytes(&mut self, value: &[u8]) {
        self.put_u32(value.len() as u32);
        self.buf.extend_from_slice(value);
    }

    pub fn put_str(&mut self, value: &str) {
        self.put_bytes(value.as_bytes());
    }

    pub fn put_ref(&mut self, at: ParamRef) {
        self.put_u32(at.partition.0);
        self.put_u32(at.node.0);
        self.put_u16(at.slot.0);
    }
}

pub(crate) struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn is_exhausted(&self) -> bool {
        self.pos == self.buf.len()
    }

    fn take(&mut self, len: usize) -> DaedalResult<&'a [u8]> {
        if self.pos + len > self.buf.len() {
            return Err(DaedalError::storage(format!(
                "container truncated at byte {} (wanted {} more)",
                self.pos, len
            )));
        }
        let slice = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    pub fn take_u8(&mut self) -> DaedalResult<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn take_u16(&mut self) -> DaedalResult<u16> {
        let bytes: [u8; 2] = self.take(2)?.try_into().map_err(corrupt)?;
        Ok(u16::from_le_bytes(bytes))
    }

    pub fn take_u32(&mut self) -> DaedalResult<u32> {
        let bytes: [u8; 4] = self.take(4)?.try_into().map_err(corrupt)?;
        Ok(u32::from_le_bytes(bytes))
    }

    pub fn take_u64(&mut self) -> DaedalResult<u64> {
        let bytes: [u8; 8] = self.take(8)?.try_into().map_err(corrupt)?;
        Ok(u64::from_le_bytes(bytes))
    }

    pub fn take_i64(&mut self) -> DaedalResult<i64> {
        let bytes: [u8; 8] = self.take(8)?.try_into().map_err(corrupt)?;
        Ok(i64::from_le_bytes(bytes))
    }

    pub fn take_f64(&mut self) -> DaedalResult<f64> {
        let bytes: [u8; 8] = self.take(8)?.try_into().map_err(corrupt)?;
        Ok(f64::from_le_bytes(bytes))
    }

    pub fn take_bytes(&mut self) -> DaedalResult<Vec<u8>> {
        let len = self.take_u32()? as usize;
        Ok(self.take(len)?.to_vec())
    }

    pub fn take_str(&mut self) -> DaedalResult<String> {
        let bytes = self.take_bytes()?;
        String::from_utf8(bytes)
            .map_err(|err| DaedalError::storage(format!("non-utf8 string in container: {err}")))
    }

    pub fn take_guid(&mut self) -> DaedalResult<[u8; 16]> {
        self.take(16)?.try_into().map_err(corrupt)
    }

    pub fn take_ref(&mut self) -> DaedalResult<ParamRef> {
        let partition = PartitionId(self.take_u32()?);
        let node = NodeId(self.take_u32()?);
        let slot = SlotId(self.take_u16()?);
        Ok(ParamRef::new(partition, node, slot))
    }
}

fn corrupt<E>(_: E) -> DaedalError {
    DaedalError::storage("corrupt container slice")
}

// ── Encoding (always the current format) ────────────────────────────────

pub fn encode(raw: &RawDocument) -> DaedalResult<Vec<u8>> {
    if raw.format_version != CURRENT_FORMAT_VERSION {
        return Err(DaedalError::storage(format!(
            "encoder only writes format version {CURRENT_FORMAT_VERSION}, got {}",
            raw.format_version
        )));
    }
    let mut w = ByteWriter::new();
    w.buf.extend_from_slice(&MAGIC);
    w.put_u32(raw.format_version);
    w.put_u32(raw.app_version);
    w.put_u32(raw.next_partition);
    w.put_u32(raw.next_func);

    w.put_u32(raw.partitions.len() as u32);
    for partition in &raw.partitions {
        w.put_u32(partition.id);
        w.put_str(&partition.type_name);
        w.put_u32(partition.next_node);
        w.put_u32(partition.nodes.len() as u32);
        for node in &partition.nodes {
            if node.valid_mask.is_some() || !node.timestamp_slots.is_empty() {
                return Err(DaedalError::storage(
                    "legacy node fields survived past the conversion chain",
                ));
            }
            w.put_u32(node.id);
            w.put_u32(node.children.len() as u32);
            for child in &node.children {
                w.put_u32(*child);
            }
            w.put_u16(node.params.len() as u16);
            for param in &node.params {
                let valid = param.valid.ok_or_else(|| {
                    DaedalError::storage("parameter without a validity flag at encode time")
                })?;
                w.put_u16(param.slot);
                w.put_u8(param.value.kind().as_u8());
                w.put_u8(u8::from(valid));
                encode_payload(&mut w, &param.value);
            }
        }
    }

    w.put_u32(raw.functions.len() as u32);
    for function in &raw.functions {
        if function.pending.is_some() {
            return Err(DaedalError::storage(
                "legacy pending flag survived past the conversion chain",
            ));
        }
        let state = function
            .state
            .ok_or_else(|| DaedalError::storage("function without a state byte at encode time"))?;
        w.put_u32(function.id);
        w.buf.extend_from_slice(&function.guid);
        w.put_u8(state);
        w.put_u32(function.inputs.len() as u32);
        for at in &function.inputs {
            w.put_ref(*at);
        }
        w.put_u32(function.outputs.len() as u32);
        for at in &function.outputs {
            w.put_ref(*at);
        }
        w.put_bytes(&function.args);
    }
    Ok(w.into_bytes())
}

fn encode_payload(w: &mut ByteWriter, value: &ParamValue) {
    match value {
        ParamValue::Bool(v) => w.put_u8(u8::from(*v)),
        ParamValue::Int(v) => w.put_i64(*v),
        ParamValue::Real(v) => w.put_f64(*v),
        ParamValue::Str(v) => w.put_str(v),
        ParamValue::IntArray(values) => {
            w.put_u32(values.len() as u32);
            for v in values {
                w.put_i64(*v);
            }
        }
        ParamValue::RealArray(values) => {
            w.put_u32(values.len() as u32);
            for v in values {
                w.put_f64(*v);
            }
        }
        ParamValue::StrArray(values) => {
            w.put_u32(values.len() as u32);
            for v in values {
                w.put_str(v);
            }
        }
        ParamValue::Reference(target) => match target {
            Some(at) => {
                w.put_u8(1);
                w.put_ref(*at);
            }
            None => w.put_u8(0),
        },
        ParamValue::ReferenceList(targets) => {
            w.put_u32(targets.len() as u32);
            for at in targets {
                w.put_ref(*at);
            }
        }
        ParamValue::Shape(blob) | ParamValue::Mesh(blob) => w.put_bytes(blob),
        ParamValue::TimeStamp(stamp) => w.put_i64(stamp.as_micros()),
        ParamValue::TreeFunction(target) => match target {
            Some(id) => {
                w.put_u8(1);
                w.put_u32(id.0);
            }
            None => w.put_u8(0),
        },
    }
}

// ── Decoding (current and legacy layouts) ───────────────────────────────

pub fn decode(bytes: &[u8]) -> DaedalResult<RawDocument> {
    let mut r = ByteReader::new(bytes);
    let magic = r.take(4)?;
    if magic != MAGIC {
        return Err(DaedalError::storage("not a Daedal binary document"));
    }
    let format_version = r.take_u32()?;
    if format_version == 0 || format_version > CURRENT_FORMAT_VERSION {
        return Err(DaedalError::unsupported_schema(
            format_version,
            CURRENT_FORMAT_VERSION,
        ));
    }
    let app_version = r.take_u32()?;
    let next_partition = r.take_u32()?;
    let next_func = r.take_u32()?;

    let partition_count = r.take_u32()?;
    let mut partitions = Vec::with_capacity(partition_count as usize);
    for _ in 0..partition_count {
        let id = r.take_u32()?;
        let type_name = r.take_str()?;
        let next_node = r.take_u32()?;
        let node_count = r.take_u32()?;
        let mut nodes = Vec::with_capacity(node_count as usize);
        for _ in 0..node_count {
            nodes.push(decode_node(&mut r, format_version)?);
        }
        partitions.push(RawPartition {
            id,
            type_name,
            next_node,
            nodes,
        });
    }

    let func_count = r.take_u32()?;
    let mut functions = Vec::with_capacity(func_count as usize);
    for _ in 0..func_count {
        functions.push(decode_function(&mut r, format_version)?);
    }
    if !r.is_exhausted() {
        return Err(DaedalError::storage("trailing bytes after document records"));
    }
    Ok(RawDocument {
        format_version,
        app_version,
        next_partition,
        next_func,
        partitions,
        functions,
    })
}

fn decode_node(r: &mut ByteReader<'_>, format_version: u32) -> DaedalResult<RawNode> {
    let id = r.take_u32()?;
    let child_count = r.take_u32()?;
    let mut children = Vec::with_capacity(child_count as usize);
    for _ in 0..child_count {
        children.push(r.take_u32()?);
    }
    let param_count = r.take_u16()?;
    let mut params = Vec::with_capacity(param_count as usize);
    for _ in 0..param_count {
        let slot = r.take_u16()?;
        let tag = r.take_u8()?;
        let valid = if format_version >= 3 {
            Some(r.take_u8()? != 0)
        } else {
            None
        };
        let kind = ParamKind::from_u8(tag)
            .ok_or_else(|| DaedalError::storage(format!("unknown parameter tag {tag}")))?;
        let value = decode_payload(r, kind)?;
        params.push(RawParam { slot, value, valid });
    }
    let (valid_mask, timestamp_slots) = if format_version >= 3 {
        (None, Vec::new())
    } else {
        let mask = r.take_u64()?;
        let ts_count = r.take_u16()?;
        let mut slots = Vec::with_capacity(ts_count as usize);
        for _ in 0..ts_count {
            slots.push(r.take_u16()?);
        }
        (Some(mask), slots)
    };
    Ok(RawNode {
        id,
        children,
        params,
        valid_mask,
        timestamp_slots,
    })
}

fn decode_function(r: &mut ByteReader<'_>, format_version: u32) -> DaedalResult<RawFunction> {
    let id = r.take_u32()?;
    let guid = r.take_guid()?;
    let (pending, state) = if format_version >= 2 {
        (None, Some(r.take_u8()?))
    } else {
        (Some(r.take_u8()? != 0), None)
    };
    let input_count = r.take_u32()?;
    let mut inputs = Vec::with_capacity(input_count as usize);
    for _ in 0..input_count {
        inputs.push(r.take_ref()?);
    }
    let output_count = r.take_u32()?;
    let mut outputs = Vec::with_capacity(output_count as usize);
    for _ in 0..output_count {
        outputs.push(r.take_ref()?);
    }
    let args = r.take_bytes()?;
    Ok(RawFunction {
        id,
        guid,
        pending,
        state,
        inputs,
        outputs,
        args,
    })
}

fn decode_payload(r: &mut ByteReader<'_>, kind: ParamKind) -> DaedalResult<ParamValue> {
    let value = match kind {
        ParamKind::Bool => ParamValue::Bool(r.take_u8()? != 0),
        ParamKind::Int => ParamValue::Int(r.take_i64()?),
        ParamKind::Real => ParamValue::Real(r.take_f64()?),
        ParamKind::Str => ParamValue::Str(r.take_str()?),
        ParamKind::IntArray => {
            let count = r.take_u32()?;
            let mut values = Vec::with_capacity(count as usize);
            for _ in 0..count {
                values.push(r.take_i64()?);
            }
            ParamValue::IntArray(values)
        }
        ParamKind::RealArray => {
            let count = r.take_u32()?;
            let mut values = Vec::with_capacity(count as usize);
            for _ in 0..count {
                values.push(r.take_f64()?);
            }
            ParamValue::RealArray(values)
        }
        ParamKind::StrArray => {
            let count = r.take_u32()?;
            let mut values = Vec::with_capacity(count as usize);
            for _ in 0..count {
                values.push(r.take_str()?);
            }
            ParamValue::StrArray(values)
        }
        ParamKind::Reference => match r.take_u8()? {
            0 => ParamValue::Reference(None),
            _ => ParamValue::Reference(Some(r.take_ref()?)),
        },
        ParamKind::ReferenceList => {
            let count = r.take_u32()?;
            let mut targets = Vec::with_capacity(count as usize);
            for _ in 0..count {
                targets.push(r.take_ref()?);
            }
            ParamValue::ReferenceList(targets)
        }
        ParamKind::Shape => ParamValue::Shape(r.take_bytes()?),
        ParamKind::Mesh => ParamValue::Mesh(r.take_bytes()?),
        ParamKind::TimeStamp => ParamValue::TimeStamp(Timestamp::from_micros(r.take_i64()?)),
        ParamKind::TreeFunction => match r.take_u8()? {
            0 => ParamValue::TreeFunction(None),
            _ => ParamValue::TreeFunction(Some(FuncId(r.take_u32()?))),
        },
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reader_reports_truncation() {
        let mut r = ByteReader::new(&[1, 2]);
        let err = r.take_u32().expect_err("two bytes are not a u32");
        assert!(matches!(err, DaedalError::Storage { .. }));
    }

    #[test]
    fn payloads_roundtrip_for_every_kind() {
        let samples = vec![
            ParamValue::Bool(true),
            ParamValue::Int(-42),
            ParamValue::Real(2.75),
            ParamValue::Str("bulkhead".into()),
            ParamValue::IntArray(vec![1, -2, 3]),
            ParamValue::RealArray(vec![0.5, -1.25]),
            ParamValue::StrArray(vec!["a".into(), "b".into()]),
            ParamValue::Reference(Some(ParamRef::new(
                PartitionId(2),
                NodeId(7),
                SlotId(1),
            ))),
            ParamValue::Reference(None),
            ParamValue::ReferenceList(vec![ParamRef::new(PartitionId(1), NodeId(1), SlotId(0))]),
            ParamValue::Shape(vec![0xDE, 0xAD]),
            ParamValue::Mesh(vec![0xBE, 0xEF, 0x01]),
            ParamValue::TimeStamp(Timestamp::from_micros(1_700_000_000_000_000)),
            ParamValue::TreeFunction(Some(FuncId(9))),
            ParamValue::TreeFunction(None),
        ];
        for value in samples {
            let mut w = ByteWriter::new();
            encode_payload(&mut w, &value);
            let bytes = w.into_bytes();
            let mut r = ByteReader::new(&bytes);
            let decoded = decode_payload(&mut r, value.kind()).expect("decode");
            assert_eq!(decoded, value);
            assert!(r.is_exhausted(), "payload fully consumed");
        }
    }

    #[test]
    fn decode_rejects_foreign_magic() {
        let err = decode(b"NOPE....").expect_err("bad magic");
        assert!(matches!(err, DaedalError::Storage { .. }));
    }

    #[test]
    fn decode_rejects_future_stamps() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&MAGIC);
        bytes.extend_from_slice(&(CURRENT_FORMAT_VERSION + 1).to_le_bytes());
        let err = decode(&bytes).expect_err("future version");
        assert!(matches!(err, DaedalError::UnsupportedSchema { stored, .. } if stored == CURRENT_FORMAT_VERSION + 1));
    }
}
