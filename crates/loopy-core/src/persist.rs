//! The flat attribute-list boundary used by saved diagrams.
//!
//! A saved node or edge is a JSON array whose positions are the persisted
//! indices from [`crate::schema`]. A whole diagram is the array
//!
//! ```text
//! [[node...], [edge...], [label...], uid, loopyMode, colorLogic, cameraMode]
//! ```
//!
//! so global attribute `i` sits at position `3 + i` (index 0 is `uid`).
//!
//! Decoding is lenient: a missing or invalid attribute falls back to the
//! property default and logs a warning. Only structural problems (the
//! record is not an array, a node has no usable id) are errors.

use crate::color::Hue;
use crate::edge::{
    ColorFilter, ColorTarget, EdgeConfig, EdgeGeometry, QuantitativeMode, SignBehavior, Strength,
    ValueFilter,
};
use crate::engine::Engine;
use crate::fixed::{Fixed64, f64_to_fixed64, fixed64_to_f64};
use crate::id::{NodeId, PersistId};
use crate::node::{
    CapacityClass, ExplodePolicy, ForeignColorPolicy, InitialFill, Interactivity, NodeConfig,
};
use crate::schema::{Entity, PropertyDefault, PropertySchema, edge_attr, global_attr, node_attr};
use crate::sim::{CameraMode, GlobalConfig, LoopyMode};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Characters left as-is by URI component encoding.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Position of the first global attribute slot in a diagram array.
const GLOBAL_BASE: usize = 3;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{what} must be a JSON array")]
    NotAnArray { what: &'static str },
    #[error("diagram is missing its {0} section")]
    MissingSection(&'static str),
    #[error("node record {position} has no valid id")]
    InvalidNodeId { position: usize },
    #[error("edge record {position} has no valid `{attr}` reference")]
    InvalidReference { position: usize, attr: &'static str },
}

// ---------------------------------------------------------------------------
// Attribute readers
// ---------------------------------------------------------------------------

fn as_number(value: &Value) -> Option<f64> {
    value
        .as_f64()
        .or_else(|| value.as_bool().map(|b| f64::from(u8::from(b))))
}

/// Read a numeric attribute, falling back to the schema default.
fn number(schema: PropertySchema, values: &[Value], index: usize) -> f64 {
    let raw = values.get(index).and_then(as_number);
    match schema.sanitize(index, raw) {
        Some((value, false)) => value,
        Some((value, true)) => {
            warn!(
                entity = ?schema.entity(),
                attr = property_name(schema, index),
                raw = ?values.get(index),
                fallback = value,
                "invalid attribute, using default"
            );
            value
        }
        None => {
            // Assigned properties (positions) have no schema default.
            let value = raw.filter(|v| v.is_finite());
            if value.is_none() {
                warn!(
                    entity = ?schema.entity(),
                    attr = property_name(schema, index),
                    "missing attribute, using 0"
                );
            }
            value.unwrap_or(0.0)
        }
    }
}

/// Read a string attribute, percent-decoding it when the schema says so.
fn text(schema: PropertySchema, values: &[Value], index: usize) -> String {
    let def = schema.by_index(index);
    let default = match def.map(|d| d.default) {
        Some(PropertyDefault::Text(t)) => t,
        _ => "",
    };
    let Some(raw) = values.get(index).and_then(Value::as_str) else {
        warn!(
            entity = ?schema.entity(),
            attr = property_name(schema, index),
            "missing text attribute, using default"
        );
        return default.to_string();
    };
    let decode = def
        .and_then(|d| d.persist)
        .is_some_and(|p| p.percent_decoded);
    if decode {
        percent_decode_str(raw).decode_utf8_lossy().into_owned()
    } else {
        raw.to_string()
    }
}

fn reference(values: &[Value], index: usize) -> Option<PersistId> {
    let v = values.get(index).and_then(Value::as_f64)?;
    if v.fract() != 0.0 || !(0.0..=f64::from(u32::MAX)).contains(&v) {
        return None;
    }
    Some(PersistId(v as u32))
}

/// A fixed-point attribute written back as the nearest schema option, so
/// Q32.32 rounding never turns a valid option into an invalid one.
fn option_value(schema: PropertySchema, index: usize, v: Fixed64) -> Value {
    let v = fixed64_to_f64(v);
    let nearest = schema.by_index(index).and_then(|d| {
        d.options
            .iter()
            .copied()
            .min_by(|a, b| (a - v).abs().total_cmp(&(b - v).abs()))
    });
    Value::from(nearest.unwrap_or(v))
}

fn property_name(schema: PropertySchema, index: usize) -> &'static str {
    schema.by_index(index).map_or("?", |d| d.name)
}

fn encode_text(s: &str) -> Value {
    Value::from(utf8_percent_encode(s, COMPONENT).to_string())
}

/// Lay `(index, value)` pairs out as a flat list sized for `entity`.
fn flat(entity: Entity, pairs: impl IntoIterator<Item = (usize, Value)>) -> Vec<Value> {
    let mut out = vec![Value::Null; PropertySchema::of(entity).record_len()];
    for (index, value) in pairs {
        if let Some(slot) = out.get_mut(index) {
            *slot = value;
        }
    }
    out
}

// ---------------------------------------------------------------------------
// NodeRecord
// ---------------------------------------------------------------------------

/// A node as it appears in a saved diagram.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeRecord {
    pub id: PersistId,
    pub config: NodeConfig,
}

impl NodeRecord {
    /// Decode a flat attribute list. `position` is only used in errors.
    pub fn decode(values: &[Value], position: usize) -> Result<Self, PersistError> {
        let id = reference(values, node_attr::ID).ok_or(PersistError::InvalidNodeId { position })?;
        let schema = PropertySchema::node();
        let num = |index| number(schema, values, index);

        // `number` only returns schema options, which every `from_code`
        // below accepts.
        let config = NodeConfig {
            label: text(schema, values, node_attr::LABEL),
            hue: Hue::from_index(num(node_attr::HUE) as i64).unwrap_or_default(),
            x: num(node_attr::X),
            y: num(node_attr::Y),
            capacity: CapacityClass::from_code(num(node_attr::SIZE)).unwrap_or_default(),
            initial_fill: InitialFill::from_code(num(node_attr::INIT)).unwrap_or_default(),
            overflow: f64_to_fixed64(num(node_attr::OVERFLOW)),
            underflow: f64_to_fixed64(num(node_attr::UNDERFLOW)),
            aggregation_latency: num(node_attr::AGGREGATION_LATENCY),
            explode: ExplodePolicy::from_code(num(node_attr::EXPLODE)).unwrap_or_default(),
            foreign_color: ForeignColorPolicy::from_code(num(node_attr::FOREIGN_COLOR))
                .unwrap_or_default(),
            interactivity: Interactivity::from_code(num(node_attr::INTERACTIVE))
                .unwrap_or_default(),
        };
        Ok(Self { id, config })
    }

    pub fn encode(&self) -> Vec<Value> {
        let c = &self.config;
        let schema = PropertySchema::node();
        flat(
            Entity::Node,
            [
                (node_attr::ID, Value::from(self.id.0)),
                (node_attr::X, Value::from(c.x)),
                (node_attr::Y, Value::from(c.y)),
                (node_attr::INIT, Value::from(c.initial_fill.code())),
                (node_attr::LABEL, encode_text(&c.label)),
                (node_attr::HUE, Value::from(c.hue.index())),
                (node_attr::SIZE, Value::from(c.capacity.code())),
                (node_attr::AGGREGATION_LATENCY, Value::from(c.aggregation_latency)),
                (node_attr::OVERFLOW, option_value(schema, node_attr::OVERFLOW, c.overflow)),
                (node_attr::UNDERFLOW, option_value(schema, node_attr::UNDERFLOW, c.underflow)),
                (node_attr::EXPLODE, Value::from(c.explode.code())),
                (node_attr::FOREIGN_COLOR, Value::from(c.foreign_color.code())),
                (node_attr::INTERACTIVE, Value::from(c.interactivity.code())),
            ],
        )
    }
}

// ---------------------------------------------------------------------------
// EdgeRecord
// ---------------------------------------------------------------------------

/// An edge as it appears in a saved diagram. Endpoints are persist ids.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeRecord {
    pub from: PersistId,
    pub to: PersistId,
    pub config: EdgeConfig,
}

impl EdgeRecord {
    pub fn decode(values: &[Value], position: usize) -> Result<Self, PersistError> {
        let from = reference(values, edge_attr::FROM).ok_or(PersistError::InvalidReference {
            position,
            attr: "from",
        })?;
        let to = reference(values, edge_attr::TO).ok_or(PersistError::InvalidReference {
            position,
            attr: "to",
        })?;
        let schema = PropertySchema::edge();
        let num = |index| number(schema, values, index);

        let config = EdgeConfig {
            strength: Strength::from_code(num(edge_attr::STRENGTH)).unwrap_or_default(),
            sign_behavior: SignBehavior::from_code(num(edge_attr::SIGN_BEHAVIOR))
                .unwrap_or_default(),
            value_filter: ValueFilter::from_code(num(edge_attr::FILTER)).unwrap_or_default(),
            quantitative: QuantitativeMode::from_code(num(edge_attr::QUANTITATIVE))
                .unwrap_or_default(),
            color_filter: ColorFilter::from_code(num(edge_attr::FILTER_COLOR)).unwrap_or_default(),
            color_target: ColorTarget::from_code(num(edge_attr::TARGET_COLOR)).unwrap_or_default(),
            geometry: EdgeGeometry {
                arc: num(edge_attr::ARC),
                rotation: num(edge_attr::ROTATION),
            },
            custom_label: text(schema, values, edge_attr::CUSTOM_LABEL),
        };
        Ok(Self { from, to, config })
    }

    pub fn encode(&self) -> Vec<Value> {
        let c = &self.config;
        flat(
            Entity::Edge,
            [
                (edge_attr::FROM, Value::from(self.from.0)),
                (edge_attr::TO, Value::from(self.to.0)),
                (edge_attr::ARC, Value::from(c.geometry.arc)),
                (edge_attr::STRENGTH, Value::from(c.strength.code())),
                (edge_attr::ROTATION, Value::from(c.geometry.rotation)),
                (edge_attr::SIGN_BEHAVIOR, Value::from(c.sign_behavior.code())),
                (edge_attr::FILTER_COLOR, Value::from(c.color_filter.code())),
                (edge_attr::TARGET_COLOR, Value::from(c.color_target.code())),
                (edge_attr::CUSTOM_LABEL, encode_text(&c.custom_label)),
                (edge_attr::QUANTITATIVE, Value::from(c.quantitative.code())),
                (edge_attr::FILTER, Value::from(c.value_filter.code())),
            ],
        )
    }
}

// ---------------------------------------------------------------------------
// Diagram
// ---------------------------------------------------------------------------

/// A whole saved diagram.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Diagram {
    pub nodes: Vec<NodeRecord>,
    pub edges: Vec<EdgeRecord>,
    /// Free-text canvas annotations. Carried through untouched.
    pub labels: Vec<Value>,
    /// Next unused node id.
    pub uid: u32,
    pub loopy_mode: LoopyMode,
    pub color_logic: bool,
    pub camera_mode: CameraMode,
}

impl Diagram {
    pub fn from_json(json: &str) -> Result<Self, PersistError> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(&value)
    }

    pub fn from_value(value: &Value) -> Result<Self, PersistError> {
        let root = value
            .as_array()
            .ok_or(PersistError::NotAnArray { what: "diagram" })?;
        let section = |i: usize, name: &'static str| -> Result<&Vec<Value>, PersistError> {
            root.get(i)
                .ok_or(PersistError::MissingSection(name))?
                .as_array()
                .ok_or(PersistError::NotAnArray { what: name })
        };

        let mut nodes = Vec::new();
        for (position, raw) in section(0, "nodes")?.iter().enumerate() {
            let values = raw
                .as_array()
                .ok_or(PersistError::NotAnArray { what: "node record" })?;
            nodes.push(NodeRecord::decode(values, position)?);
        }

        let mut edges = Vec::new();
        for (position, raw) in section(1, "edges")?.iter().enumerate() {
            let values = raw
                .as_array()
                .ok_or(PersistError::NotAnArray { what: "edge record" })?;
            match EdgeRecord::decode(values, position) {
                Ok(edge) => edges.push(edge),
                Err(e) => warn!(error = %e, "skipping edge"),
            }
        }

        // Older diagrams stop after the edges.
        let labels = root.get(2).and_then(Value::as_array).cloned().unwrap_or_default();
        let max_id = nodes.iter().map(|n| n.id.0.saturating_add(1)).max().unwrap_or(0);
        let uid = root
            .get(GLOBAL_BASE)
            .and_then(Value::as_u64)
            .and_then(|v| u32::try_from(v).ok())
            .unwrap_or(max_id)
            .max(max_id);

        let globals: Vec<Value> = (0..PropertySchema::global().record_len())
            .map(|i| root.get(GLOBAL_BASE + i).cloned().unwrap_or(Value::Null))
            .collect();
        let schema = PropertySchema::global();
        let global = |index| {
            let raw = globals.get(index).and_then(as_number);
            schema.sanitize(index, raw).map_or(0.0, |(v, _)| v)
        };

        Ok(Self {
            nodes,
            edges,
            labels,
            uid,
            loopy_mode: LoopyMode::from_code(global(global_attr::LOOPY_MODE)).unwrap_or_default(),
            color_logic: global(global_attr::COLOR_LOGIC) != 0.0,
            camera_mode: CameraMode::from_code(global(global_attr::CAMERA_MODE))
                .unwrap_or_default(),
        })
    }

    pub fn to_value(&self) -> Value {
        let mut root = vec![
            Value::Array(self.nodes.iter().map(|n| Value::Array(n.encode())).collect()),
            Value::Array(self.edges.iter().map(|e| Value::Array(e.encode())).collect()),
            Value::Array(self.labels.clone()),
            Value::from(self.uid),
        ];
        let globals = flat(
            Entity::Global,
            [
                (global_attr::LOOPY_MODE, Value::from(self.loopy_mode.code())),
                (global_attr::COLOR_LOGIC, Value::from(u8::from(self.color_logic))),
                (global_attr::CAMERA_MODE, Value::from(self.camera_mode.code())),
            ],
        );
        // Slot 0 of the global list is the uid, already written.
        root.extend(globals.into_iter().skip(1));
        Value::Array(root)
    }

    pub fn to_json(&self) -> Result<String, PersistError> {
        Ok(serde_json::to_string(&self.to_value())?)
    }

    /// Capture an engine's graph. Persist ids are reassigned from creation
    /// order, starting at 0.
    pub fn capture(engine: &Engine) -> Self {
        let mut ids: HashMap<NodeId, PersistId> = HashMap::new();
        let mut nodes = Vec::new();
        for (i, (id, data)) in engine.graph.nodes().enumerate() {
            let persist = PersistId(i as u32);
            ids.insert(id, persist);
            nodes.push(NodeRecord {
                id: persist,
                config: data.config.clone(),
            });
        }
        let edges = engine
            .graph
            .edges()
            .filter_map(|(_, data)| {
                Some(EdgeRecord {
                    from: *ids.get(&data.from)?,
                    to: *ids.get(&data.to)?,
                    config: data.config.clone(),
                })
            })
            .collect();
        let config = engine.config();
        Self {
            uid: nodes.len() as u32,
            nodes,
            edges,
            labels: Vec::new(),
            loopy_mode: config.loopy_mode,
            color_logic: config.color_logic,
            camera_mode: config.camera_mode,
        }
    }

    /// Build a stopped engine from this diagram. Settings the diagram does
    /// not carry (speed, seed, tick rate) come from `base`.
    ///
    /// Duplicate node ids keep the first node; edges that reference an
    /// unknown node are skipped. Both are logged.
    pub fn build(&self, base: GlobalConfig) -> Engine {
        let mut engine = Engine::new(GlobalConfig {
            color_logic: self.color_logic,
            loopy_mode: self.loopy_mode,
            camera_mode: self.camera_mode,
            ..base
        });

        let mut ids: HashMap<PersistId, NodeId> = HashMap::new();
        for record in &self.nodes {
            if ids.contains_key(&record.id) {
                warn!(id = record.id.0, "duplicate node id, keeping the first");
                continue;
            }
            let id = engine.add_node(record.config.clone());
            ids.insert(record.id, id);
        }

        for record in &self.edges {
            let (Some(&from), Some(&to)) = (ids.get(&record.from), ids.get(&record.to)) else {
                warn!(from = record.from.0, to = record.to.0, "edge references unknown node");
                continue;
            };
            if let Err(e) = engine.connect(from, to, record.config.clone()) {
                warn!(error = %e, "edge not connected");
            }
        }

        debug!(
            nodes = engine.node_count(),
            edges = engine.edge_count(),
            "diagram loaded"
        );
        engine
    }
}
