//! Static property schema for nodes, edges and the global model.
//!
//! Every configurable attribute has one [`PropertyDef`]: its default, the
//! set of option values the editor offers, and where it lives in the flat
//! persisted attribute list. The persistence indices are an external
//! contract: saved diagrams address attributes by index, so they must never
//! be reordered.
//!
//! The runtime structs ([`NodeConfig`](crate::node::NodeConfig),
//! [`EdgeConfig`](crate::edge::EdgeConfig),
//! [`GlobalConfig`](crate::sim::GlobalConfig)) are laid out independently;
//! [`crate::persist`] maps between the two.

/// Which kind of object a property belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entity {
    Node,
    Edge,
    Global,
}

/// Default value of a property.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PropertyDefault {
    Number(f64),
    Text(&'static str),
    /// A reference to another object (edge endpoints). No meaningful default.
    Reference,
    /// Assigned by the engine or derived from geometry (ids, positions).
    Assigned,
}

/// Where a property lives in the persisted attribute list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistSpec {
    /// Position in the flat attribute list.
    pub index: usize,
    /// Only carried by the JSON layout, never by compact binary layouts.
    pub json_only: bool,
    /// String value stored URL-percent-encoded.
    pub percent_decoded: bool,
}

/// Describes one attribute of a node, edge or the global model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PropertyDef {
    pub entity: Entity,
    pub name: &'static str,
    pub persist: Option<PersistSpec>,
    pub default: PropertyDefault,
    /// Valid numeric options. Empty means any finite number is accepted.
    pub options: &'static [f64],
    /// Shown only in the advanced editor mode.
    pub advanced: bool,
    /// Only meaningful when color logic is enabled.
    pub color_logic: bool,
}

impl PropertyDef {
    /// Whether `value` is one of this property's valid options.
    pub fn accepts(&self, value: f64) -> bool {
        if !value.is_finite() {
            return false;
        }
        self.options.is_empty() || self.options.iter().any(|&o| o == value)
    }

    /// The numeric default, if the property has one.
    pub fn default_number(&self) -> Option<f64> {
        match self.default {
            PropertyDefault::Number(n) => Some(n),
            _ => None,
        }
    }

    /// The persisted index, if the property is persisted.
    pub fn index(&self) -> Option<usize> {
        self.persist.map(|p| p.index)
    }
}

/// Persisted attribute indices for nodes.
pub mod node_attr {
    pub const ID: usize = 0;
    pub const X: usize = 1;
    pub const Y: usize = 2;
    pub const INIT: usize = 3;
    pub const LABEL: usize = 4;
    pub const HUE: usize = 5;
    pub const SIZE: usize = 6;
    pub const AGGREGATION_LATENCY: usize = 7;
    pub const OVERFLOW: usize = 8;
    pub const UNDERFLOW: usize = 9;
    pub const EXPLODE: usize = 10;
    pub const FOREIGN_COLOR: usize = 11;
    pub const INTERACTIVE: usize = 12;
}

/// Persisted attribute indices for edges.
pub mod edge_attr {
    pub const FROM: usize = 0;
    pub const TO: usize = 1;
    pub const ARC: usize = 2;
    pub const STRENGTH: usize = 3;
    pub const ROTATION: usize = 4;
    pub const SIGN_BEHAVIOR: usize = 5;
    pub const FILTER_COLOR: usize = 6;
    pub const TARGET_COLOR: usize = 7;
    pub const CUSTOM_LABEL: usize = 8;
    pub const QUANTITATIVE: usize = 9;
    pub const FILTER: usize = 10;
}

/// Persisted attribute indices for the global model. Index 0 is reserved.
pub mod global_attr {
    pub const LOOPY_MODE: usize = 1;
    pub const COLOR_LOGIC: usize = 2;
    pub const CAMERA_MODE: usize = 3;
}

const fn persisted(index: usize) -> Option<PersistSpec> {
    Some(PersistSpec {
        index,
        json_only: false,
        percent_decoded: false,
    })
}

const fn persisted_json(index: usize, percent_decoded: bool) -> Option<PersistSpec> {
    Some(PersistSpec {
        index,
        json_only: true,
        percent_decoded,
    })
}

const fn prop(
    entity: Entity,
    name: &'static str,
    persist: Option<PersistSpec>,
    default: PropertyDefault,
    options: &'static [f64],
) -> PropertyDef {
    PropertyDef {
        entity,
        name,
        persist,
        default,
        options,
        advanced: false,
        color_logic: false,
    }
}

const fn advanced(mut def: PropertyDef) -> PropertyDef {
    def.advanced = true;
    def
}

const fn color_logic(mut def: PropertyDef) -> PropertyDef {
    def.color_logic = true;
    def
}

const HUE_OPTIONS: &[f64] = &[0.0, 1.0, 2.0, 3.0, 4.0, 5.0];
const THRESHOLD_OPTIONS: &[f64] = &[0.0, 0.16, 0.33, 0.50, 0.66, 0.83, 1.0];

static NODE_PROPERTIES: [PropertyDef; 13] = [
    prop(Entity::Node, "id", persisted_json(node_attr::ID, false), PropertyDefault::Assigned, &[]),
    prop(Entity::Node, "x", persisted(node_attr::X), PropertyDefault::Assigned, &[]),
    prop(Entity::Node, "y", persisted(node_attr::Y), PropertyDefault::Assigned, &[]),
    prop(
        Entity::Node,
        "init",
        persisted(node_attr::INIT),
        PropertyDefault::Number(0.5),
        &[-1.0, 0.0, 0.25, 0.5, 0.75, 1.0],
    ),
    prop(
        Entity::Node,
        "label",
        persisted_json(node_attr::LABEL, true),
        PropertyDefault::Text("?"),
        &[],
    ),
    prop(Entity::Node, "hue", persisted(node_attr::HUE), PropertyDefault::Number(0.0), HUE_OPTIONS),
    advanced(prop(
        Entity::Node,
        "size",
        persisted(node_attr::SIZE),
        PropertyDefault::Number(1.0),
        &[0.0001, 1.0, 5.0, 100.0],
    )),
    advanced(prop(
        Entity::Node,
        "aggregationLatency",
        persisted(node_attr::AGGREGATION_LATENCY),
        PropertyDefault::Number(0.0),
        &[0.0, 0.1, 0.2, 0.4, 0.8, 1.6, 3.2, 6.4],
    )),
    advanced(prop(
        Entity::Node,
        "overflow",
        persisted(node_attr::OVERFLOW),
        PropertyDefault::Number(0.0),
        THRESHOLD_OPTIONS,
    )),
    advanced(prop(
        Entity::Node,
        "underflow",
        persisted(node_attr::UNDERFLOW),
        PropertyDefault::Number(1.0),
        THRESHOLD_OPTIONS,
    )),
    advanced(prop(
        Entity::Node,
        "explode",
        persisted(node_attr::EXPLODE),
        PropertyDefault::Number(0.0),
        &[0.0, -1.0, 1.0, 2.0],
    )),
    color_logic(advanced(prop(
        Entity::Node,
        "foreignColor",
        persisted(node_attr::FOREIGN_COLOR),
        PropertyDefault::Number(0.0),
        &[0.0, 1.0],
    ))),
    advanced(prop(
        Entity::Node,
        "interactive",
        persisted(node_attr::INTERACTIVE),
        PropertyDefault::Number(2.0),
        &[0.0, 1.0, 2.0, 3.0, 4.0],
    )),
];

static EDGE_PROPERTIES: [PropertyDef; 11] = [
    prop(Entity::Edge, "from", persisted(edge_attr::FROM), PropertyDefault::Reference, &[]),
    prop(Entity::Edge, "to", persisted(edge_attr::TO), PropertyDefault::Reference, &[]),
    prop(Entity::Edge, "arc", persisted(edge_attr::ARC), PropertyDefault::Number(0.0), &[]),
    prop(
        Entity::Edge,
        "strength",
        persisted(edge_attr::STRENGTH),
        PropertyDefault::Number(1.0),
        &[1.0, -1.0],
    ),
    prop(Entity::Edge, "rotation", persisted(edge_attr::ROTATION), PropertyDefault::Number(0.0), &[]),
    advanced(prop(
        Entity::Edge,
        "signBehavior",
        persisted(edge_attr::SIGN_BEHAVIOR),
        PropertyDefault::Number(0.0),
        &[0.0, 1.0, 2.0, 3.0, 4.0, 5.0],
    )),
    advanced(prop(
        Entity::Edge,
        "edgeFilterColor",
        persisted(edge_attr::FILTER_COLOR),
        PropertyDefault::Number(-1.0),
        &[-1.0, 0.0, 1.0, 2.0, 3.0, 4.0, 5.0],
    )),
    color_logic(advanced(prop(
        Entity::Edge,
        "edgeTargetColor",
        persisted(edge_attr::TARGET_COLOR),
        PropertyDefault::Number(-1.0),
        &[-1.0, 0.0, 1.0, 2.0, 3.0, 4.0, 5.0, -2.0, -3.0],
    ))),
    advanced(prop(
        Entity::Edge,
        "customLabel",
        Some(PersistSpec {
            index: edge_attr::CUSTOM_LABEL,
            json_only: false,
            percent_decoded: true,
        }),
        PropertyDefault::Text(""),
        &[],
    )),
    advanced(prop(
        Entity::Edge,
        "quantitative",
        persisted(edge_attr::QUANTITATIVE),
        PropertyDefault::Number(0.0),
        &[0.0, 1.0, 2.0],
    )),
    advanced(prop(
        Entity::Edge,
        "filter",
        persisted(edge_attr::FILTER),
        PropertyDefault::Number(0.0),
        &[0.0, 1.0, 2.0, 3.0, 4.0, 5.0],
    )),
];

static GLOBAL_PROPERTIES: [PropertyDef; 3] = [
    prop(
        Entity::Global,
        "loopyMode",
        persisted(global_attr::LOOPY_MODE),
        PropertyDefault::Number(0.0),
        &[0.0, 1.0],
    ),
    advanced(prop(
        Entity::Global,
        "colorLogic",
        persisted(global_attr::COLOR_LOGIC),
        PropertyDefault::Number(0.0),
        &[0.0, 1.0],
    )),
    advanced(prop(
        Entity::Global,
        "cameraMode",
        persisted(global_attr::CAMERA_MODE),
        PropertyDefault::Number(0.0),
        &[0.0, 1.0, 2.0],
    )),
];

/// Read-only view over the property table of one entity kind.
#[derive(Debug, Clone, Copy)]
pub struct PropertySchema {
    entity: Entity,
    defs: &'static [PropertyDef],
}

impl PropertySchema {
    /// The schema for the given entity kind.
    pub fn of(entity: Entity) -> Self {
        let defs: &'static [PropertyDef] = match entity {
            Entity::Node => &NODE_PROPERTIES,
            Entity::Edge => &EDGE_PROPERTIES,
            Entity::Global => &GLOBAL_PROPERTIES,
        };
        Self { entity, defs }
    }

    pub fn node() -> Self {
        Self::of(Entity::Node)
    }

    pub fn edge() -> Self {
        Self::of(Entity::Edge)
    }

    pub fn global() -> Self {
        Self::of(Entity::Global)
    }

    pub fn entity(&self) -> Entity {
        self.entity
    }

    /// All properties in declaration order.
    pub fn properties(&self) -> &'static [PropertyDef] {
        self.defs
    }

    /// Find a property by name.
    pub fn by_name(&self, name: &str) -> Option<&'static PropertyDef> {
        self.defs.iter().find(|d| d.name == name)
    }

    /// Find a property by its persisted index.
    pub fn by_index(&self, index: usize) -> Option<&'static PropertyDef> {
        self.defs.iter().find(|d| d.index() == Some(index))
    }

    /// Length of a full flat attribute list for this entity.
    pub fn record_len(&self) -> usize {
        self.defs
            .iter()
            .filter_map(PropertyDef::index)
            .max()
            .map_or(0, |m| m + 1)
    }

    /// Validate a numeric attribute, falling back to the property default.
    ///
    /// Returns the value to use and whether a fallback happened. Unknown
    /// indices or non-numeric properties yield `None`.
    pub fn sanitize(&self, index: usize, value: Option<f64>) -> Option<(f64, bool)> {
        let def = self.by_index(index)?;
        let default = def.default_number();
        match value {
            Some(v) if def.accepts(v) => Some((v, false)),
            _ => default.map(|d| (d, true)),
        }
    }
}
