//! Graph View Style System
//!
//! Resolves visual properties for nodes (by label) and relationships (by type)
//! from per-selector rules layered over defaults, and interpolates caption
//! templates against entity properties.

use crate::graph::{Node, Relationship};
use graphlens_core::GraphError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// RGB color representation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Parse `#RGB` or `#RRGGBB`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.trim().strip_prefix('#')?;
        let channel = |s: &str| u8::from_str_radix(s, 16).ok();
        match digits.len() {
            3 => {
                let mut chars = digits.chars().map(|c| c.to_digit(16));
                let mut next = || chars.next().flatten().map(|v| (v * 17) as u8);
                Some(Self::rgb(next()?, next()?, next()?))
            }
            6 => Some(Self::rgb(
                channel(digits.get(0..2)?)?,
                channel(digits.get(2..4)?)?,
                channel(digits.get(4..6)?)?,
            )),
            _ => None,
        }
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    pub fn darken(&self, factor: f32) -> Self {
        Self {
            r: ((self.r as f32) * (1.0 - factor)) as u8,
            g: ((self.g as f32) * (1.0 - factor)) as u8,
            b: ((self.b as f32) * (1.0 - factor)) as u8,
            a: self.a,
        }
    }

    pub fn lighten(&self, factor: f32) -> Self {
        Self {
            r: ((self.r as f32) + (255.0 - self.r as f32) * factor) as u8,
            g: ((self.g as f32) + (255.0 - self.g as f32) * factor) as u8,
            b: ((self.b as f32) + (255.0 - self.b as f32) * factor) as u8,
            a: self.a,
        }
    }

    /// Perceived brightness in `[0, 1]`.
    pub fn luminance(&self) -> f32 {
        (0.299 * self.r as f32 + 0.587 * self.g as f32 + 0.114 * self.b as f32) / 255.0
    }
}

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_NODE_COLOR: &str = "#A5ABB6";
pub const DEFAULT_NODE_BORDER_COLOR: &str = "#9AA1AC";
pub const DEFAULT_RELATIONSHIP_COLOR: &str = "#A5ABB6";
pub const DARK_TEXT_COLOR: &str = "#2A2C34";

/// Fill colors handed out to labels without an explicit color rule.
pub const LABEL_PALETTE: [&str; 12] = [
    "#FFE081", "#C990C0", "#F79767", "#57C7E3", "#F16667", "#D9C8AE", "#8DCC93", "#ECB5C9",
    "#4C8EDA", "#FFC454", "#DA7194", "#569480",
];

/// Numeric keys checked when a style document is loaded.
const NUMERIC_KEYS: [&str; 5] = ["diameter", "border-width", "font-size", "shaft-width", "padding"];

fn node_defaults() -> StyleProperties {
    StyleProperties::from_pairs(&[
        ("diameter", "50px"),
        ("color", DEFAULT_NODE_COLOR),
        ("border-color", DEFAULT_NODE_BORDER_COLOR),
        ("border-width", "2px"),
        ("text-color-internal", "#FFFFFF"),
        ("font-size", "10px"),
    ])
}

fn relationship_defaults() -> StyleProperties {
    StyleProperties::from_pairs(&[
        ("color", DEFAULT_RELATIONSHIP_COLOR),
        ("shaft-width", "1px"),
        ("font-size", "8px"),
        ("padding", "3px"),
        ("text-color-external", "#000000"),
        ("text-color-internal", "#FFFFFF"),
        ("caption", "<type>"),
    ])
}

/// Resolved visual properties as string key/value pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StyleProperties {
    values: BTreeMap<String, String>,
}

impl StyleProperties {
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        Self {
            values: pairs
                .iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    fn merge(&mut self, other: &BTreeMap<String, String>) {
        for (key, value) in other {
            self.values.insert(key.clone(), value.clone());
        }
    }

    /// Numeric value of `key`, accepting a `px` suffix.
    pub fn number(&self, key: &str) -> Option<f32> {
        parse_number(self.get(key)?)
    }

    pub fn number_or(&self, key: &str, default: f32) -> f32 {
        self.number(key).unwrap_or(default)
    }

    pub fn color(&self, key: &str) -> Option<Color> {
        Color::from_hex(self.get(key)?)
    }
}

fn parse_number(value: &str) -> Option<f32> {
    let trimmed = value.trim();
    let digits = trimmed.strip_suffix("px").unwrap_or(trimmed).trim();
    digits.parse::<f32>().ok().filter(|number| number.is_finite())
}

/// Read-only style source consulted by the geometry layer.
pub trait StyleLookup {
    fn for_node(&self, node: &Node) -> StyleProperties;
    fn for_relationship(&self, relationship: &Relationship) -> StyleProperties;
}

/// Per-label and per-type rules layered over the defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphStyle {
    #[serde(default)]
    pub node_rules: BTreeMap<String, BTreeMap<String, String>>,
    #[serde(default)]
    pub relationship_rules: BTreeMap<String, BTreeMap<String, String>>,
}

impl GraphStyle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a style document and check its numeric values.
    pub fn from_json_str(input: &str) -> Result<Self, GraphError> {
        let style: GraphStyle = serde_json::from_str(input)?;
        style.validate()?;
        Ok(style)
    }

    pub fn validate(&self) -> Result<(), GraphError> {
        let rules = self
            .node_rules
            .values()
            .chain(self.relationship_rules.values());
        for rule in rules {
            for key in NUMERIC_KEYS {
                if let Some(value) = rule.get(key)
                    && parse_number(value).is_none()
                {
                    return Err(GraphError::InvalidStyleValue {
                        key: key.to_string(),
                        value: value.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn set_node_property(&mut self, label: &str, key: &str, value: &str) {
        self.node_rules
            .entry(label.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
    }

    pub fn set_relationship_property(&mut self, rel_type: &str, key: &str, value: &str) {
        self.relationship_rules
            .entry(rel_type.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
    }

    /// Style for a label on its own, as shown by legends.
    pub fn for_label(&self, label: &str) -> StyleProperties {
        let mut props = node_defaults();
        apply_palette(&mut props, label);
        if let Some(rule) = self.node_rules.get(label) {
            props.merge(rule);
        }
        props
    }

    pub fn for_rel_type(&self, rel_type: &str) -> StyleProperties {
        let mut props = relationship_defaults();
        if let Some(rule) = self.relationship_rules.get(rel_type) {
            props.merge(rule);
        }
        props
    }
}

impl StyleLookup for GraphStyle {
    fn for_node(&self, node: &Node) -> StyleProperties {
        let mut props = node_defaults();
        if let Some(first) = node.labels.first() {
            apply_palette(&mut props, first);
        }
        props.set("caption", default_node_caption(node));
        // Later labels take precedence
        for label in &node.labels {
            if let Some(rule) = self.node_rules.get(label) {
                props.merge(rule);
            }
        }
        props
    }

    fn for_relationship(&self, relationship: &Relationship) -> StyleProperties {
        self.for_rel_type(&relationship.rel_type)
    }
}

fn apply_palette(props: &mut StyleProperties, label: &str) {
    let hash = label
        .bytes()
        .fold(0u32, |acc, byte| acc.wrapping_mul(31).wrapping_add(byte as u32));
    let fill = LABEL_PALETTE[hash as usize % LABEL_PALETTE.len()];
    if let Some(color) = Color::from_hex(fill) {
        props.set("color", color.to_hex());
        props.set("border-color", color.darken(0.15).to_hex());
        let text = if color.luminance() > 0.6 { DARK_TEXT_COLOR } else { "#FFFFFF" };
        props.set("text-color-internal", text);
    }
}

/// Caption template picked from a node's properties.
pub fn default_node_caption(node: &Node) -> String {
    let keys: Vec<&str> = node.properties.keys().collect();
    let lower: Vec<String> = keys.iter().map(|key| key.to_lowercase()).collect();
    let exact = |wanted: &str| lower.iter().position(|key| key == wanted);
    let suffix = |wanted: &str| lower.iter().position(|key| key.ends_with(wanted));

    let picked = exact("name")
        .or_else(|| exact("title"))
        .or_else(|| exact("label"))
        .or_else(|| suffix("name"))
        .or_else(|| suffix("description"))
        .or(if keys.is_empty() { None } else { Some(0) });

    match picked {
        Some(idx) => format!("{{{}}}", keys[idx]),
        None => "<id>".to_string(),
    }
}

/// Entity a caption template is interpolated against.
#[derive(Debug, Clone, Copy)]
pub enum CaptionSource<'a> {
    Node(&'a Node),
    Relationship(&'a Relationship),
}

/// Replace `{key}` with the property value (empty when missing). A template
/// reducing to `<id>` or `<type>` becomes the entity's id or type.
pub fn interpolate(template: &str, source: CaptionSource<'_>) -> String {
    let properties = match source {
        CaptionSource::Node(node) => &node.properties,
        CaptionSource::Relationship(rel) => &rel.properties,
    };

    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find(['{', '}']) {
            Some(close) if after[close..].starts_with('}') => {
                out.push_str(properties.get(&after[..close]).unwrap_or(""));
                rest = &after[close + 1..];
            }
            _ => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);

    match (out.as_str(), source) {
        ("<id>", CaptionSource::Node(node)) => node.id().to_string(),
        ("<id>", CaptionSource::Relationship(rel)) => rel.id().to_string(),
        ("<type>", CaptionSource::Relationship(rel)) => rel.rel_type.clone(),
        _ => out,
    }
}
