use std::collections::BTreeMap;

use daedal_core::{DaedalError, DaedalResult, ParamKind, SlotId};

use crate::node::Node;

/// One declared Parameter slot of a node type, in schema order.
#[derive(Clone, Debug)]
pub struct SlotDef {
    pub slot: SlotId,
    pub name: String,
    pub kind: ParamKind,
}

impl SlotDef {
    pub fn new(slot: u16, name: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            slot: SlotId(slot),
            name: name.into(),
            kind,
        }
    }
}

/// Capability record for one node type: its declared slots, the init routine
/// that populates defaults after slot registration, and the slot (if any)
/// holding the display name. Dispatch goes through this table rather than a
/// class hierarchy.
#[derive(Debug)]
pub struct NodeTypeDef {
    pub type_name: String,
    pub slots: Vec<SlotDef>,
    pub name_slot: Option<SlotId>,
    pub init: fn(&mut Node),
}

impl NodeTypeDef {
    pub fn slot(&self, slot: SlotId) -> Option<&SlotDef> {
        self.slots.iter().find(|def| def.slot == slot)
    }

    pub fn slot_by_name(&self, name: &str) -> Option<&SlotDef> {
        self.slots.iter().find(|def| def.name == name)
    }
}

fn init_noop(_node: &mut Node) {}

/// Process-wide table of node types, built explicitly at startup and passed
/// to each Document at construction. Read-only once the first Document
/// exists; registration itself is not synchronized.
#[derive(Default, Debug)]
pub struct NodeTypeRegistry {
    types: BTreeMap<String, NodeTypeDef>,
}

impl NodeTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node type. Fails `Validation` on a duplicate type name,
    /// duplicate slot ids, or a name slot that is not a declared Str slot.
    pub fn register(&mut self, def: NodeTypeDef) -> DaedalResult<()> {
        if self.types.contains_key(&def.type_name) {
            return Err(DaedalError::validation(format!(
                "node type '{}' already registered",
                def.type_name
            )));
        }
        for (index, slot) in def.slots.iter().enumerate() {
            if def.slots[..index].iter().any(|other| other.slot == slot.slot) {
                return Err(DaedalError::validation(format!(
                    "node type '{}' declares slot {} twice",
                    def.type_name, slot.slot
                )));
            }
        }
        if let Some(name_slot) = def.name_slot {
            match def.slot(name_slot) {
                Some(slot) if slot.kind == ParamKind::Str => {}
                _ => {
                    return Err(DaedalError::validation(format!(
                        "node type '{}': name slot {} must be a declared Str slot",
                        def.type_name, name_slot
                    )));
                }
            }
        }
        self.types.insert(def.type_name.clone(), def);
        Ok(())
    }

    /// Convenience registration for types with no bespoke init routine.
    pub fn register_simple(
        &mut self,
        type_name: impl Into<String>,
        slots: Vec<SlotDef>,
        name_slot: Option<SlotId>,
    ) -> DaedalResult<()> {
        self.register(NodeTypeDef {
            type_name: type_name.into(),
            slots,
            name_slot,
            init: init_noop,
        })
    }

    pub fn get(&self, type_name: &str) -> Option<&NodeTypeDef> {
        self.types.get(type_name)
    }

    pub fn require(&self, type_name: &str) -> DaedalResult<&NodeTypeDef> {
        self.types
            .get(type_name)
            .ok_or_else(|| DaedalError::unknown_node_type(type_name))
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_type_registration_is_rejected() {
        let mut registry = NodeTypeRegistry::new();
        registry
            .register_simple("Surface", vec![SlotDef::new(0, "name", ParamKind::Str)], None)
            .expect("first registration");
        let err = registry
            .register_simple("Surface", vec![], None)
            .expect_err("duplicate");
        assert!(matches!(err, DaedalError::Validation { .. }));
    }

    #[test]
    fn duplicate_slot_ids_are_rejected() {
        let mut registry = NodeTypeRegistry::new();
        let err = registry
            .register_simple(
                "Surface",
                vec![
                    SlotDef::new(0, "a", ParamKind::Int),
                    SlotDef::new(0, "b", ParamKind::Real),
                ],
                None,
            )
            .expect_err("duplicate slot");
        assert!(matches!(err, DaedalError::Validation { .. }));
    }

    #[test]
    fn name_slot_must_be_a_string_slot() {
        let mut registry = NodeTypeRegistry::new();
        let err = registry
            .register_simple(
                "Surface",
                vec![SlotDef::new(0, "value", ParamKind::Real)],
                Some(SlotId(0)),
            )
            .expect_err("name slot kind");
        assert!(matches!(err, DaedalError::Validation { .. }));
    }

    #[test]
    fn require_reports_unknown_node_type() {
        let registry = NodeTypeRegistry::new();
        let err = registry.require("Missing").expect_err("unknown");
        assert!(matches!(err, DaedalError::UnknownNodeType { .. }));
    }
}
