use serde::{Deserialize, Serialize};

use crate::{FuncId, ParamRef, Timestamp};

/// Closed set of Parameter kinds. A Parameter's kind never changes after
/// creation; the numeric discriminant doubles as the persisted type tag.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[repr(u8)]
pub enum ParamKind {
    Bool = 1,
    Int = 2,
    Real = 3,
    Str = 4,
    IntArray = 5,
    RealArray = 6,
    StrArray = 7,
    Reference = 8,
    ReferenceList = 9,
    Shape = 10,
    Mesh = 11,
    TimeStamp = 12,
    TreeFunction = 13,
}

impl ParamKind {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(ParamKind::Bool),
            2 => Some(ParamKind::Int),
            3 => Some(ParamKind::Real),
            4 => Some(ParamKind::Str),
            5 => Some(ParamKind::IntArray),
            6 => Some(ParamKind::RealArray),
            7 => Some(ParamKind::StrArray),
            8 => Some(ParamKind::Reference),
            9 => Some(ParamKind::ReferenceList),
            10 => Some(ParamKind::Shape),
            11 => Some(ParamKind::Mesh),
            12 => Some(ParamKind::TimeStamp),
            13 => Some(ParamKind::TreeFunction),
            _ => None,
        }
    }
}

/// Kind-tagged Parameter payload.
///
/// `Shape` and `Mesh` carry opaque blobs produced by the geometry/mesh
/// collaborator's own serialization hooks; the framework never looks inside.
/// `Reference` is `None` until a target is assigned, which leaves the owning
/// Parameter not well-formed. `TreeFunction` optionally links the owning Node
/// to the function instance attached to it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Real(f64),
    Str(String),
    IntArray(Vec<i64>),
    RealArray(Vec<f64>),
    StrArray(Vec<String>),
    Reference(Option<ParamRef>),
    ReferenceList(Vec<ParamRef>),
    Shape(Vec<u8>),
    Mesh(Vec<u8>),
    TimeStamp(Timestamp),
    TreeFunction(Option<FuncId>),
}

impl ParamValue {
    pub fn kind(&self) -> ParamKind {
        match self {
            ParamValue::Bool(_) => ParamKind::Bool,
            ParamValue::Int(_) => ParamKind::Int,
            ParamValue::Real(_) => ParamKind::Real,
            ParamValue::Str(_) => ParamKind::Str,
            ParamValue::IntArray(_) => ParamKind::IntArray,
            ParamValue::RealArray(_) => ParamKind::RealArray,
            ParamValue::StrArray(_) => ParamKind::StrArray,
            ParamValue::Reference(_) => ParamKind::Reference,
            ParamValue::ReferenceList(_) => ParamKind::ReferenceList,
            ParamValue::Shape(_) => ParamKind::Shape,
            ParamValue::Mesh(_) => ParamKind::Mesh,
            ParamValue::TimeStamp(_) => ParamKind::TimeStamp,
            ParamValue::TreeFunction(_) => ParamKind::TreeFunction,
        }
    }

    /// Default payload a freshly registered slot of the given kind starts
    /// with, before the node type's init capability runs.
    pub fn default_for(kind: ParamKind) -> Self {
        match kind {
            ParamKind::Bool => ParamValue::Bool(false),
            ParamKind::Int => ParamValue::Int(0),
            ParamKind::Real => ParamValue::Real(0.0),
            ParamKind::Str => ParamValue::Str(String::new()),
            ParamKind::IntArray => ParamValue::IntArray(Vec::new()),
            ParamKind::RealArray => ParamValue::RealArray(Vec::new()),
            ParamKind::StrArray => ParamValue::StrArray(Vec::new()),
            ParamKind::Reference => ParamValue::Reference(None),
            ParamKind::ReferenceList => ParamValue::ReferenceList(Vec::new()),
            ParamKind::Shape => ParamValue::Shape(Vec::new()),
            ParamKind::Mesh => ParamValue::Mesh(Vec::new()),
            ParamKind::TimeStamp => ParamValue::TimeStamp(Timestamp(0)),
            ParamKind::TreeFunction => ParamValue::TreeFunction(None),
        }
    }

    /// Whether mandatory sub-fields are populated. A Reference without a
    /// target is incomplete; an unattached TreeFunction slot is legal.
    pub fn is_complete(&self) -> bool {
        !matches!(self, ParamValue::Reference(None))
    }
}
