use crate::error::{QoiError, QoiResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::io::Read;
use std::path::Path;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Node {
    pub fn new(id: u64, x: f64, y: f64, z: f64) -> Self {
        Self {
            id: NodeId(id),
            x,
            y,
            z,
        }
    }

    #[inline(always)]
    pub fn distance_sq(&self, other: &Node) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        dx * dx + dy * dy + dz * dz
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl BoundingBox {
    pub fn overlaps(&self, other: &BoundingBox, tolerance: f64) -> bool {
        (0..3).all(|d| {
            self.min[d] <= other.max[d] + tolerance && other.min[d] <= self.max[d] + tolerance
        })
    }

    pub fn diagonal(&self) -> f64 {
        (0..3)
            .map(|d| (self.max[d] - self.min[d]).powi(2))
            .sum::<f64>()
            .sqrt()
    }
}

#[derive(Debug, Deserialize)]
struct NodeRow {
    id: u64,
    x: f64,
    y: f64,
    #[serde(default)]
    z: f64,
}

/// A named surface region: a node set ordered by ascending id, plus named
/// nodal scalar fields stored alongside it (one value per node).
#[derive(Debug, Clone)]
pub struct Region {
    name: String,
    nodes: Vec<Node>,
    fields: HashMap<String, Vec<f64>>,
}

impl Region {
    pub fn new(name: impl Into<String>, mut nodes: Vec<Node>) -> QoiResult<Self> {
        let name = name.into();
        nodes.sort_by_key(|n| n.id);
        if let Some(w) = nodes.windows(2).find(|w| w[0].id == w[1].id) {
            return Err(QoiError::Validation(format!(
                "Region '{}' lists node {} twice",
                name, w[0].id
            )));
        }
        Ok(Self {
            name,
            nodes,
            fields: HashMap::new(),
        })
    }

    /// Structured `nx` by `ny` patch in the z = 0 plane, ids starting at 1.
    pub fn grid(name: impl Into<String>, nx: usize, ny: usize, spacing: f64) -> QoiResult<Self> {
        let mut nodes = Vec::with_capacity(nx * ny);
        for j in 0..ny {
            for i in 0..nx {
                let id = (j * nx + i + 1) as u64;
                nodes.push(Node::new(id, i as f64 * spacing, j as f64 * spacing, 0.0));
            }
        }
        Self::new(name, nodes)
    }

    /// Reads `id,x,y[,z]` rows (with header).
    pub fn from_reader<R: Read>(name: impl Into<String>, reader: R) -> QoiResult<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut nodes = Vec::new();
        for row in rdr.deserialize() {
            let row: NodeRow = row?;
            nodes.push(Node::new(row.id, row.x, row.y, row.z));
        }
        Self::new(name, nodes)
    }

    pub fn load_from_csv<P: AsRef<Path>>(name: impl Into<String>, path: P) -> QoiResult<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(name, file)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.iter().map(|n| n.id)
    }

    pub fn index_of(&self, node: NodeId) -> Option<usize> {
        self.nodes.binary_search_by_key(&node, |n| n.id).ok()
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn field(&self, field: &str) -> QoiResult<&[f64]> {
        self.fields
            .get(field)
            .map(Vec::as_slice)
            .ok_or_else(|| self.missing_field(field))
    }

    /// Returns the field storage, creating it zero-filled if absent.
    pub fn ensure_field(&mut self, field: &str) -> &mut [f64] {
        let len = self.nodes.len();
        self.fields
            .entry(field.to_string())
            .or_insert_with(|| vec![0.0; len])
    }

    pub fn set_value(&mut self, field: &str, node: NodeId, value: f64) -> QoiResult<()> {
        let idx = self.index_of(node).ok_or_else(|| self.unknown_node(node))?;
        self.ensure_field(field)[idx] = value;
        Ok(())
    }

    pub fn value(&self, field: &str, node: NodeId) -> QoiResult<f64> {
        let idx = self.index_of(node).ok_or_else(|| self.unknown_node(node))?;
        Ok(self.field(field)?[idx])
    }

    pub fn bounding_box(&self) -> Option<BoundingBox> {
        let first = self.nodes.first()?;
        let mut bb = BoundingBox {
            min: [first.x, first.y, first.z],
            max: [first.x, first.y, first.z],
        };
        for n in &self.nodes[1..] {
            for (d, c) in [n.x, n.y, n.z].into_iter().enumerate() {
                bb.min[d] = bb.min[d].min(c);
                bb.max[d] = bb.max[d].max(c);
            }
        }
        Some(bb)
    }

    fn missing_field(&self, field: &str) -> QoiError {
        QoiError::MissingField {
            field: field.to_string(),
            region: self.name.clone(),
        }
    }

    fn unknown_node(&self, node: NodeId) -> QoiError {
        QoiError::UnknownNode {
            node: node.0,
            region: self.name.clone(),
        }
    }
}
