//! Resolution pipeline: reads a diagram file, resolves node names, builds
//! an engine.
//!
//! Provides format detection (RON/JSON/TOML), deserialization helpers and
//! the name resolution used to wire edges.

use crate::schema::{DiagramData, EdgeData, NodeData, SettingsData};
use loopy_core::edge::{EdgeConfig, EdgeGeometry};
use loopy_core::engine::Engine;
use loopy_core::fixed::{Fixed64, f64_to_fixed64};
use loopy_core::id::NodeId;
use loopy_core::node::NodeConfig;
use loopy_core::sim::GlobalConfig;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur during data loading.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// The file has an extension we don't support.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// A deserialization error occurred.
    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// An edge names a node that is not defined.
    #[error("unresolved {expected_kind} reference '{name}' in {file}")]
    UnresolvedRef {
        file: PathBuf,
        name: String,
        expected_kind: &'static str,
    },

    /// Two nodes share a name.
    #[error("duplicate name '{name}' in {file}")]
    DuplicateName { file: PathBuf, name: String },

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

/// Supported data file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

/// Detect the format of a file based on its extension.
pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

// ===========================================================================
// Deserialization
// ===========================================================================

/// Deserialize `content` in the given format. `file` only labels errors.
pub fn deserialize_str<T: DeserializeOwned>(
    content: &str,
    format: Format,
    file: &Path,
) -> Result<T, DataLoadError> {
    let parse_error = |detail: String| DataLoadError::Parse {
        file: file.to_path_buf(),
        detail,
    };
    match format {
        Format::Ron => ron::from_str(content).map_err(|e| parse_error(e.to_string())),
        Format::Json => serde_json::from_str(content).map_err(|e| parse_error(e.to_string())),
        Format::Toml => toml::from_str(content).map_err(|e| parse_error(e.to_string())),
    }
}

/// Read a file and deserialize it according to its format (detected from extension).
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;
    deserialize_str(&content, format, path)
}

// ===========================================================================
// Name resolution helpers
// ===========================================================================

/// Look up a name in a map, returning an `UnresolvedRef` error if not found.
pub fn resolve_name<'a, V>(
    map: &'a HashMap<String, V>,
    name: &str,
    file: &Path,
    expected_kind: &'static str,
) -> Result<&'a V, DataLoadError> {
    map.get(name).ok_or_else(|| DataLoadError::UnresolvedRef {
        file: file.to_path_buf(),
        name: name.to_string(),
        expected_kind,
    })
}

/// Check whether a name already exists in a map, returning a `DuplicateName`
/// error if so.
pub fn check_duplicate<V>(
    map: &HashMap<String, V>,
    name: &str,
    file: &Path,
) -> Result<(), DataLoadError> {
    if map.contains_key(name) {
        Err(DataLoadError::DuplicateName {
            file: file.to_path_buf(),
            name: name.to_string(),
        })
    } else {
        Ok(())
    }
}

// ===========================================================================
// Loaded diagram
// ===========================================================================

/// A resolved diagram: a stopped engine plus the name of every node.
#[derive(Debug)]
pub struct LoadedDiagram {
    pub engine: Engine,
    pub nodes: HashMap<String, NodeId>,
}

impl LoadedDiagram {
    /// Node id by the name used in the file.
    pub fn node(&self, name: &str) -> Option<NodeId> {
        self.nodes.get(name).copied()
    }
}

/// Load a diagram file, detecting the format from its extension.
pub fn load_diagram(path: &Path) -> Result<LoadedDiagram, DataLoadError> {
    let data: DiagramData = deserialize_file(path)?;
    resolve_diagram(&data, path)
}

/// Load a diagram from an in-memory string.
pub fn load_diagram_str(content: &str, format: Format) -> Result<LoadedDiagram, DataLoadError> {
    let file = Path::new("<memory>");
    let data: DiagramData = deserialize_str(content, format, file)?;
    resolve_diagram(&data, file)
}

/// Resolve names and build the engine. Nodes and edges are created in file
/// order, which fixes the deterministic sweep order.
pub fn resolve_diagram(data: &DiagramData, file: &Path) -> Result<LoadedDiagram, DataLoadError> {
    let mut engine = Engine::new(resolve_settings(&data.settings, file));
    let mut nodes: HashMap<String, NodeId> = HashMap::with_capacity(data.nodes.len());

    for node in &data.nodes {
        check_duplicate(&nodes, &node.name, file)?;
        let id = engine.add_node(resolve_node(node, file));
        nodes.insert(node.name.clone(), id);
    }

    for edge in &data.edges {
        let from = *resolve_name(&nodes, &edge.from, file, "node")?;
        let to = *resolve_name(&nodes, &edge.to, file, "node")?;
        // Both ends were just created, so the engine accepts the edge.
        if let Err(err) = engine.connect(from, to, resolve_edge(edge)) {
            warn!(file = %file.display(), from = %edge.from, to = %edge.to, %err, "skipping edge");
        }
    }

    debug!(
        file = %file.display(),
        nodes = engine.node_count(),
        edges = engine.edge_count(),
        "diagram loaded"
    );
    Ok(LoadedDiagram { engine, nodes })
}

// ===========================================================================
// Conversion with fallbacks
// ===========================================================================

fn resolve_settings(settings: &SettingsData, file: &Path) -> GlobalConfig {
    let defaults = GlobalConfig::default();
    let signal_speed = GlobalConfig::speed_from_f64(settings.signal_speed).unwrap_or_else(|| {
        warn!(file = %file.display(), value = settings.signal_speed, "invalid signal speed, using default");
        defaults.signal_speed
    });
    let ticks_per_second = if settings.ticks_per_second == 0 {
        warn!(file = %file.display(), "ticks_per_second must be positive, using default");
        defaults.ticks_per_second
    } else {
        settings.ticks_per_second
    };
    GlobalConfig {
        signal_speed,
        color_logic: settings.color_logic,
        ticks_per_second,
        seed: settings.seed,
        loopy_mode: settings.loopy_mode,
        camera_mode: settings.camera_mode,
    }
}

fn resolve_node(node: &NodeData, file: &Path) -> NodeConfig {
    let defaults = NodeConfig::default();
    NodeConfig {
        label: node.label.clone().unwrap_or_else(|| node.name.clone()),
        hue: node.hue,
        x: finite_or(node.x, 0.0, "x", node, file),
        y: finite_or(node.y, 0.0, "y", node, file),
        capacity: node.capacity,
        initial_fill: node.initial_fill,
        overflow: threshold(node.overflow, defaults.overflow, "overflow", node, file),
        underflow: threshold(node.underflow, defaults.underflow, "underflow", node, file),
        aggregation_latency: if node.aggregation_latency.is_finite()
            && node.aggregation_latency >= 0.0
        {
            node.aggregation_latency
        } else {
            warn!(file = %file.display(), node = %node.name, value = node.aggregation_latency,
                "invalid aggregation latency, using 0");
            0.0
        },
        explode: node.explode,
        foreign_color: node.foreign_color,
        interactivity: node.interactivity,
    }
}

fn resolve_edge(edge: &EdgeData) -> EdgeConfig {
    EdgeConfig {
        strength: edge.strength,
        sign_behavior: edge.sign_behavior,
        value_filter: edge.value_filter,
        quantitative: edge.quantitative,
        color_filter: edge.color_filter,
        color_target: edge.color_target,
        geometry: EdgeGeometry {
            arc: if edge.arc.is_finite() { edge.arc } else { 0.0 },
            rotation: if edge.rotation.is_finite() { edge.rotation } else { 0.0 },
        },
        custom_label: edge.label.clone(),
    }
}

fn finite_or(value: f64, fallback: f64, attr: &str, node: &NodeData, file: &Path) -> f64 {
    if value.is_finite() {
        value
    } else {
        warn!(file = %file.display(), node = %node.name, attr, "non-finite value, using {fallback}");
        fallback
    }
}

/// Thresholds live in `[0, 1]`; out-of-range values are clamped.
fn threshold(value: f64, fallback: Fixed64, attr: &str, node: &NodeData, file: &Path) -> Fixed64 {
    if !value.is_finite() {
        warn!(file = %file.display(), node = %node.name, attr, "non-finite threshold, using default");
        return fallback;
    }
    let clamped = value.clamp(0.0, 1.0);
    if clamped != value {
        warn!(file = %file.display(), node = %node.name, attr, value, "threshold clamped to [0, 1]");
    }
    f64_to_fixed64(clamped)
}

// ===========================================================================
// Tests
// ===========================================================================
