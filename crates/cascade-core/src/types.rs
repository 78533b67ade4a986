use crate::{CascadeError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;
use std::str::FromStr;

/// Identifier bound for graph vertices.
///
/// The `Ord` implementation is the tie-break used everywhere a choice between
/// equal distances has to be made: the lower identifier wins.
pub trait Vertex: Clone + Ord + Hash + fmt::Debug {}

impl<T> Vertex for T where T: Clone + Ord + Hash + fmt::Debug {}

/// Edge weights must be finite and strictly positive.
pub fn is_valid_weight(weight: f64) -> bool {
    weight.is_finite() && weight > 0.0
}

/// A single graph mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Edit<V> {
    AddVertex(V),
    RemoveVertex(V),
    AddEdge(V, V, f64),
    RemoveEdge(V, V),
    ModifyEdge(V, V, f64),
}

impl<V> Edit<V> {
    pub fn kind(&self) -> EditKind {
        match self {
            Edit::AddVertex(_) => EditKind::AddVertex,
            Edit::RemoveVertex(_) => EditKind::RemoveVertex,
            Edit::AddEdge(..) => EditKind::AddEdge,
            Edit::RemoveEdge(..) => EditKind::RemoveEdge,
            Edit::ModifyEdge(..) => EditKind::ModifyEdge,
        }
    }

    /// Endpoints of an edge edit, `None` for vertex edits.
    pub fn endpoints(&self) -> Option<(&V, &V)> {
        match self {
            Edit::AddEdge(u, v, _) | Edit::RemoveEdge(u, v) | Edit::ModifyEdge(u, v, _) => {
                Some((u, v))
            }
            Edit::AddVertex(_) | Edit::RemoveVertex(_) => None,
        }
    }
}

impl<V: Clone + Ord> Edit<V> {
    /// What this edit touches, with edge endpoints in ascending order so
    /// `(u, v)` and `(v, u)` name the same target.
    pub fn target(&self) -> Target<V> {
        match self {
            Edit::AddVertex(v) | Edit::RemoveVertex(v) => Target::Vertex(v.clone()),
            Edit::AddEdge(u, v, _) | Edit::RemoveEdge(u, v) | Edit::ModifyEdge(u, v, _) => {
                if u <= v {
                    Target::Edge(u.clone(), v.clone())
                } else {
                    Target::Edge(v.clone(), u.clone())
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EditKind {
    AddVertex,
    RemoveVertex,
    AddEdge,
    RemoveEdge,
    ModifyEdge,
}

impl EditKind {
    pub const EDGE_KINDS: [EditKind; 3] = [EditKind::AddEdge, EditKind::ModifyEdge, EditKind::RemoveEdge];

    pub fn is_edge(self) -> bool {
        matches!(self, EditKind::AddEdge | EditKind::RemoveEdge | EditKind::ModifyEdge)
    }
}

impl fmt::Display for EditKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EditKind::AddVertex => "add-vertex",
            EditKind::RemoveVertex => "remove-vertex",
            EditKind::AddEdge => "add",
            EditKind::RemoveEdge => "remove",
            EditKind::ModifyEdge => "modify",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for EditKind {
    type Err = CascadeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "add-vertex" => Ok(EditKind::AddVertex),
            "remove-vertex" | "rem-vertex" => Ok(EditKind::RemoveVertex),
            "add" => Ok(EditKind::AddEdge),
            "remove" | "rem" => Ok(EditKind::RemoveEdge),
            "modify" | "mod" => Ok(EditKind::ModifyEdge),
            other => Err(CascadeError::UnknownOpcode(other.to_string())),
        }
    }
}

/// Target of a wire-format edit: a single vertex or an unordered pair.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Target<V> {
    Edge(V, V),
    Vertex(V),
}

/// Wire form of an edit: `(target, opcode, optional weight)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditRecord<V> {
    pub target: Target<V>,
    pub op: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

impl<V> EditRecord<V> {
    pub fn new(target: Target<V>, op: impl Into<String>, weight: Option<f64>) -> Self {
        Self {
            target,
            op: op.into(),
            weight,
        }
    }
}

impl<V: fmt::Debug> TryFrom<EditRecord<V>> for Edit<V> {
    type Error = CascadeError;

    fn try_from(record: EditRecord<V>) -> Result<Self> {
        let op = record.op.to_lowercase();
        match (record.target, op.as_str()) {
            (Target::Vertex(v), "add") => Ok(Edit::AddVertex(v)),
            (Target::Vertex(v), "remove" | "rem") => Ok(Edit::RemoveVertex(v)),
            (Target::Vertex(v), "modify" | "mod") => Err(CascadeError::InvalidEdit(format!(
                "cannot modify vertex {:?}",
                v
            ))),
            (Target::Edge(u, v), "add") => match record.weight {
                Some(w) => Ok(Edit::AddEdge(u, v, w)),
                None => Err(CascadeError::InvalidEdit(format!(
                    "add of edge ({:?}, {:?}) without weight",
                    u, v
                ))),
            },
            (Target::Edge(u, v), "remove" | "rem") => Ok(Edit::RemoveEdge(u, v)),
            (Target::Edge(u, v), "modify" | "mod") => match record.weight {
                Some(w) => Ok(Edit::ModifyEdge(u, v, w)),
                None => Err(CascadeError::InvalidEdit(format!(
                    "modify of edge ({:?}, {:?}) without weight",
                    u, v
                ))),
            },
            (_, other) => Err(CascadeError::UnknownOpcode(other.to_string())),
        }
    }
}

impl<V> From<Edit<V>> for EditRecord<V> {
    fn from(edit: Edit<V>) -> Self {
        match edit {
            Edit::AddVertex(v) => EditRecord::new(Target::Vertex(v), "add", None),
            Edit::RemoveVertex(v) => EditRecord::new(Target::Vertex(v), "remove", None),
            Edit::AddEdge(u, v, w) => EditRecord::new(Target::Edge(u, v), "add", Some(w)),
            Edit::RemoveEdge(u, v) => EditRecord::new(Target::Edge(u, v), "remove", None),
            Edit::ModifyEdge(u, v, w) => EditRecord::new(Target::Edge(u, v), "modify", Some(w)),
        }
    }
}
