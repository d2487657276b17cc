use std::collections::BTreeMap;

use daedal_core::{NodeId, ParamValue, SlotId};
use serde::{Deserialize, Serialize};

use crate::param::Parameter;
use crate::registry::NodeTypeDef;

/// One logical data entity: an aggregate of slot-ordered Parameters plus
/// optional child Nodes living in the same Partition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    id: NodeId,
    type_name: String,
    params: BTreeMap<SlotId, Parameter>,
    children: Vec<NodeId>,
}

impl Node {
    /// Construct a node with every declared slot registered at its default
    /// payload, then run the type's init capability. Only after this has
    /// completed is the node well-formed.
    pub(crate) fn instantiate(id: NodeId, def: &NodeTypeDef) -> Self {
        let mut node = Self {
            id,
            type_name: def.type_name.clone(),
            params: def
                .slots
                .iter()
                .map(|slot| (slot.slot, Parameter::new(slot.slot, slot.kind)))
                .collect(),
            children: Vec::new(),
        };
        (def.init)(&mut node);
        node
    }

    /// Rebuild a node from persisted state (persistence layer use).
    pub fn restore(
        id: NodeId,
        type_name: String,
        params: Vec<Parameter>,
        children: Vec<NodeId>,
    ) -> Self {
        Self {
            id,
            type_name,
            params: params.into_iter().map(|p| (p.slot(), p)).collect(),
            children,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn param(&self, slot: SlotId) -> Option<&Parameter> {
        self.params.get(&slot)
    }

    pub(crate) fn param_mut(&mut self, slot: SlotId) -> Option<&mut Parameter> {
        self.params.get_mut(&slot)
    }

    /// Parameters in slot order (the schema-declared order).
    pub fn params(&self) -> impl Iterator<Item = &Parameter> {
        self.params.values()
    }

    /// Seed a slot during a node type's init capability. Returns false when
    /// the slot is undeclared or the payload kind disagrees.
    pub fn init_value(&mut self, slot: SlotId, value: ParamValue) -> bool {
        match self.params.get_mut(&slot) {
            Some(param) if param.kind() == value.kind() => {
                param.write(value);
                true
            }
            _ => false,
        }
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub(crate) fn add_child(&mut self, child: NodeId) {
        self.children.push(child);
    }

    pub(crate) fn remove_child(&mut self, child: NodeId) {
        self.children.retain(|id| *id != child);
    }

    pub(crate) fn insert_child_at(&mut self, index: usize, child: NodeId) {
        let index = index.min(self.children.len());
        self.children.insert(index, child);
    }

    /// Display name read through the type's name-slot capability.
    pub fn display_name(&self, def: &NodeTypeDef) -> Option<&str> {
        let slot = def.name_slot?;
        match self.params.get(&slot)?.value() {
            ParamValue::Str(name) => Some(name.as_str()),
            _ => None,
        }
    }

    /// A node is well-formed once every declared slot is present with the
    /// declared kind and each Parameter's mandatory sub-fields are populated.
    pub fn is_well_formed(&self, def: &NodeTypeDef) -> bool {
        def.slots.iter().all(|slot| {
            self.params
                .get(&slot.slot)
                .is_some_and(|param| param.kind() == slot.kind && param.is_well_formed())
        })
    }

    /// Convenience accessor used by typed node wrappers.
    pub fn real(&self, slot: SlotId) -> Option<f64> {
        match self.params.get(&slot)?.value() {
            ParamValue::Real(value) => Some(*value),
            _ => None,
        }
    }

    pub fn int(&self, slot: SlotId) -> Option<i64> {
        match self.params.get(&slot)?.value() {
            ParamValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn string(&self, slot: SlotId) -> Option<&str> {
        match self.params.get(&slot)?.value() {
            ParamValue::Str(value) => Some(value.as_str()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{NodeTypeDef, SlotDef};
    use daedal_core::ParamKind;

    fn surface_def() -> NodeTypeDef {
        NodeTypeDef {
            type_name: "Surface".into(),
            slots: vec![
                SlotDef::new(0, "name", ParamKind::Str),
                SlotDef::new(1, "tolerance", ParamKind::Real),
                SlotDef::new(2, "source", ParamKind::Reference),
            ],
            name_slot: Some(SlotId(0)),
            init: |node| {
                node.init_value(SlotId(1), ParamValue::Real(1e-3));
            },
        }
    }

    #[test]
    fn instantiate_registers_all_slots_and_runs_init() {
        let def = surface_def();
        let node = Node::instantiate(NodeId(1), &def);
        assert_eq!(node.params().count(), 3);
        assert_eq!(node.real(SlotId(1)), Some(1e-3));
    }

    #[test]
    fn unset_reference_slot_leaves_node_not_well_formed() {
        let def = surface_def();
        let node = Node::instantiate(NodeId(1), &def);
        assert!(!node.is_well_formed(&def), "reference slot is still unset");
    }

    #[test]
    fn display_name_reads_the_declared_name_slot() {
        let def = surface_def();
        let mut node = Node::instantiate(NodeId(1), &def);
        assert!(node.init_value(SlotId(0), ParamValue::Str("Fuselage".into())));
        assert_eq!(node.display_name(&def), Some("Fuselage"));
    }
}
