use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::{DaedalError, DaedalResult};

/// Identifier of a Partition within a Document.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct PartitionId(pub u32);

/// Identifier of a Node within its Partition. Allocated monotonically and
/// never reused within a Document's lifetime, even after deletion.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

/// Position of a Parameter within its owning Node, in schema-declared order.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct SlotId(pub u16);

/// Identifier of a Tree-Function instance within a Document.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct FuncId(pub u32);

impl fmt::Display for PartitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

impl fmt::Display for FuncId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "f{}", self.0)
    }
}

/// Stable address of one Parameter: (Partition, Node, slot).
///
/// All cross-references in the framework (function inputs/outputs, node
/// reference parameters) use this triple. A removed target must make the
/// reference fail lookup instead of silently resolving to a reused id.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct ParamRef {
    pub partition: PartitionId,
    pub node: NodeId,
    pub slot: SlotId,
}

impl ParamRef {
    pub fn new(partition: PartitionId, node: NodeId, slot: SlotId) -> Self {
        Self {
            partition,
            node,
            slot,
        }
    }
}

impl fmt::Display for ParamRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.partition, self.node, self.slot)
    }
}

/// Globally unique identifier of a registered Tree-Function computation.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct FuncGuid(pub [u8; 16]);

impl FuncGuid {
    pub fn new() -> Self {
        Self(*Uuid::new_v4().as_bytes())
    }

    pub fn from_uuid_str(value: &str) -> DaedalResult<Self> {
        let uuid = Uuid::parse_str(value)
            .map_err(|err| DaedalError::validation(format!("invalid guid '{value}': {err}")))?;
        Ok(Self(*uuid.as_bytes()))
    }

    pub fn as_bytes(self) -> [u8; 16] {
        self.0
    }

    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }
}

impl Default for FuncGuid {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for FuncGuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let uuid = Uuid::from_bytes(self.0);
        write!(f, "{uuid}")
    }
}

impl Serialize for FuncGuid {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for FuncGuid {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        let uuid = Uuid::parse_str(&value).map_err(serde::de::Error::custom)?;
        Ok(FuncGuid(*uuid.as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guid_roundtrips_through_string() {
        let guid = FuncGuid::new();
        let text = guid.to_string();
        let parsed = FuncGuid::from_uuid_str(&text).expect("guid parse");
        assert_eq!(parsed.as_bytes(), guid.as_bytes());
    }

    #[test]
    fn guid_rejects_invalid_strings() {
        assert!(FuncGuid::from_uuid_str("not-a-guid").is_err());
    }

    #[test]
    fn param_ref_display_is_compact() {
        let at = ParamRef::new(PartitionId(1), NodeId(3), SlotId(0));
        assert_eq!(at.to_string(), "p1:n3:s0");
    }
}
