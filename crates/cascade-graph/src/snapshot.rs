use cascade_core::{CascadeError, GraphStore, Result, Vertex};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::{Edge, Graph};

pub const SNAPSHOT_VERSION: u32 = 1;

/// On-disk encoding of a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SnapshotFormat {
    Json,
    Binary,
}

impl SnapshotFormat {
    /// `.json` is JSON, `.bin` is the binary encoding.
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(SnapshotFormat::Json),
            Some("bin") => Ok(SnapshotFormat::Binary),
            other => Err(CascadeError::Snapshot(format!(
                "cannot infer snapshot format from extension {:?}",
                other
            ))),
        }
    }
}

/// Serializable image of a graph: vertex list plus edge list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot<V> {
    pub version: u32,
    pub vertices: Vec<V>,
    pub edges: Vec<Edge<V>>,
}

impl<V: Vertex> GraphSnapshot<V> {
    pub fn from_graph(graph: &Graph<V>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            vertices: graph.vertices().cloned().collect(),
            edges: graph.edges().collect(),
        }
    }

    /// Rebuilds the graph through the store, so malformed content (duplicate
    /// vertices, dangling or invalid edges) is rejected.
    pub fn into_graph(self) -> Result<Graph<V>> {
        if self.version != SNAPSHOT_VERSION {
            return Err(CascadeError::Snapshot(format!(
                "unsupported snapshot version {} (expected {})",
                self.version, SNAPSHOT_VERSION
            )));
        }

        let mut graph = Graph::new();
        for v in self.vertices {
            if !graph.add_vertex(v.clone()) {
                return Err(CascadeError::Snapshot(format!("duplicate vertex {:?}", v)));
            }
        }
        for edge in self.edges {
            let (u, v, w) = edge.into_tuple();
            if !graph.add_edge(u.clone(), v.clone(), w) {
                return Err(CascadeError::Snapshot(format!(
                    "invalid edge ({:?}, {:?}, {})",
                    u, v, w
                )));
            }
        }
        Ok(graph)
    }
}

impl<V: Vertex + Serialize + DeserializeOwned> GraphSnapshot<V> {
    pub fn to_bytes(&self, format: SnapshotFormat) -> Result<Vec<u8>> {
        match format {
            SnapshotFormat::Json => Ok(serde_json::to_vec_pretty(self)?),
            SnapshotFormat::Binary => bincode::serde::encode_to_vec(self, bincode::config::standard())
                .map_err(|e| CascadeError::Encode(e.to_string())),
        }
    }

    pub fn from_bytes(bytes: &[u8], format: SnapshotFormat) -> Result<Self> {
        match format {
            SnapshotFormat::Json => Ok(serde_json::from_slice(bytes)?),
            SnapshotFormat::Binary => {
                let (snapshot, _) =
                    bincode::serde::decode_from_slice(bytes, bincode::config::standard())
                        .map_err(|e| CascadeError::Encode(e.to_string()))?;
                Ok(snapshot)
            }
        }
    }

    /// Writes the snapshot, choosing the format from the file extension.
    pub fn save(&self, path: &Path) -> Result<()> {
        let format = SnapshotFormat::from_path(path)?;
        let bytes = self.to_bytes(format)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, &bytes)?;
        debug!(path = %path.display(), bytes = bytes.len(), "Saved graph snapshot");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let format = SnapshotFormat::from_path(path)?;
        let bytes = fs::read(path)?;
        Self::from_bytes(&bytes, format)
    }
}

/// Saves `graph` to `path`.
pub fn save_graph<V>(graph: &Graph<V>, path: &Path) -> Result<()>
where
    V: Vertex + Serialize + DeserializeOwned,
{
    GraphSnapshot::from_graph(graph).save(path)
}

/// Loads and validates a graph saved with `save_graph`.
pub fn load_graph<V>(path: &Path) -> Result<Graph<V>>
where
    V: Vertex + Serialize + DeserializeOwned,
{
    GraphSnapshot::load(path)?.into_graph()
}
