//! Blockly JSON workspace adapter
//!
//! Implements [`BlockGraph`] over the editor's JSON serialization:
//!
//! ```json
//! {
//!   "blocks": { "languageVersion": 0, "blocks": [ { "type": "bp_start", "id": "a", "x": 10, "y": 10,
//!                                                  "next": { "block": { ... } } } ] },
//!   "variables": [ { "name": "score", "id": "v1" } ]
//! }
//! ```
//!
//! Nested blocks are flattened into an arena at load time, so every query is
//! an index lookup. Top-level blocks are ordered by position, top to bottom
//! then left to right.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use super::graph::BlockGraph;

/* ===================== Errors ===================== */

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("invalid workspace JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("duplicate block id '{0}'")]
    DuplicateId(String),
}

/* ===================== Wire Format ===================== */

#[derive(Debug, Default, Deserialize)]
struct RawWorkspace {
    #[serde(default)]
    blocks: RawBlocks,
    #[serde(default)]
    variables: Vec<RawVariable>,
}

#[derive(Debug, Default, Deserialize)]
struct RawBlocks {
    #[serde(default)]
    blocks: Vec<RawBlock>,
}

#[derive(Debug, Deserialize)]
struct RawVariable {
    name: String,
    id: String,
}

#[derive(Debug, Deserialize)]
struct RawBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    id: String,
    #[serde(default)]
    x: f64,
    #[serde(default)]
    y: f64,
    #[serde(default)]
    fields: BTreeMap<String, Value>,
    #[serde(default)]
    inputs: BTreeMap<String, RawConnection>,
    #[serde(default)]
    next: Option<RawConnection>,
}

/// A connection holds a real block, a shadow, or both; the real block wins.
#[derive(Debug, Deserialize)]
struct RawConnection {
    #[serde(default)]
    block: Option<Box<RawBlock>>,
    #[serde(default)]
    shadow: Option<Box<RawBlock>>,
}

impl RawConnection {
    fn into_block(self) -> Option<RawBlock> {
        self.block.or(self.shadow).map(|b| *b)
    }
}

/* ===================== Arena ===================== */

/// Handle to a block in a [`JsonWorkspace`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockRef(usize);

#[derive(Debug, Clone)]
struct Node {
    kind: String,
    id: String,
    fields: BTreeMap<String, String>,
    inputs: BTreeMap<String, BlockRef>,
    next: Option<BlockRef>,
}

/// A loaded workspace, ready to compile
#[derive(Debug, Clone, Default)]
pub struct JsonWorkspace {
    nodes: Vec<Node>,
    top_level: Vec<BlockRef>,
}

impl JsonWorkspace {
    pub fn from_json(json: &str) -> Result<Self, WorkspaceError> {
        let raw: RawWorkspace = serde_json::from_str(json)?;
        Self::from_raw(raw)
    }

    pub fn from_value(value: Value) -> Result<Self, WorkspaceError> {
        // Blockly serializes an empty workspace as `{}` and older hosts as `null`
        if value.is_null() {
            return Ok(Self::default());
        }
        let raw: RawWorkspace = serde_json::from_value(value)?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawWorkspace) -> Result<Self, WorkspaceError> {
        let variables: HashMap<String, String> = raw
            .variables
            .into_iter()
            .map(|v| (v.id, v.name))
            .collect();

        let mut loader = Loader {
            variables,
            nodes: Vec::new(),
            seen: HashSet::new(),
        };

        let mut positioned = Vec::with_capacity(raw.blocks.blocks.len());
        for block in raw.blocks.blocks {
            let (x, y) = (block.x, block.y);
            let node = loader.load(block)?;
            positioned.push((y, x, node));
        }
        positioned.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));

        debug!(
            blocks = loader.nodes.len(),
            top_level = positioned.len(),
            "workspace loaded"
        );
        Ok(Self {
            nodes: loader.nodes,
            top_level: positioned.into_iter().map(|(_, _, node)| node).collect(),
        })
    }

    /// Total number of blocks, nested ones included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn node(&self, node: BlockRef) -> &Node {
        &self.nodes[node.0]
    }
}

struct Loader {
    variables: HashMap<String, String>,
    nodes: Vec<Node>,
    seen: HashSet<String>,
}

impl Loader {
    fn load(&mut self, block: RawBlock) -> Result<BlockRef, WorkspaceError> {
        if !block.id.is_empty() && !self.seen.insert(block.id.clone()) {
            return Err(WorkspaceError::DuplicateId(block.id));
        }

        let index = BlockRef(self.nodes.len());
        let fields = block
            .fields
            .into_iter()
            .filter_map(|(name, value)| self.field_text(value).map(|text| (name, text)))
            .collect();
        self.nodes.push(Node {
            kind: block.kind,
            id: block.id,
            fields,
            inputs: BTreeMap::new(),
            next: None,
        });

        let mut inputs = BTreeMap::new();
        for (name, connection) in block.inputs {
            if let Some(child) = connection.into_block() {
                inputs.insert(name, self.load(child)?);
            }
        }
        let next = match block.next.and_then(RawConnection::into_block) {
            Some(child) => Some(self.load(child)?),
            None => None,
        };

        let node = &mut self.nodes[index.0];
        node.inputs = inputs;
        node.next = next;
        Ok(index)
    }

    /// Field values arrive as strings, numbers, booleans, or `{ "id": .. }`
    /// variable references. Everything is kept as text.
    fn field_text(&self, value: Value) -> Option<String> {
        match value {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(if b { "TRUE" } else { "FALSE" }.to_string()),
            Value::Object(map) => {
                if let Some(Value::String(id)) = map.get("id") {
                    if let Some(name) = self.variables.get(id) {
                        return Some(name.clone());
                    }
                }
                match map.get("name").or_else(|| map.get("id")) {
                    Some(Value::String(s)) => Some(s.clone()),
                    _ => None,
                }
            }
            _ => None,
        }
    }
}

/* ===================== BlockGraph ===================== */

impl BlockGraph for JsonWorkspace {
    type Node = BlockRef;

    fn top_level(&self) -> Vec<BlockRef> {
        self.top_level.clone()
    }

    fn node_type(&self, node: BlockRef) -> &str {
        &self.node(node).kind
    }

    fn node_id(&self, node: BlockRef) -> &str {
        &self.node(node).id
    }

    fn field(&self, node: BlockRef, name: &str) -> Option<&str> {
        self.node(node).fields.get(name).map(String::as_str)
    }

    fn input_target(&self, node: BlockRef, input: &str) -> Option<BlockRef> {
        self.node(node).inputs.get(input).copied()
    }

    fn next(&self, node: BlockRef) -> Option<BlockRef> {
        self.node(node).next
    }
}
