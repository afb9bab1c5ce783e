use crate::geometry::arrows::{Arrow, CaptionLayout};
use crate::geometry::caption::CaptionLine;
use graphlens_core::{NodeId, Property, PropertyMap, RawNode, RawRelationship, RelationshipId};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Unit vector pointing along `degrees`, measured clockwise from +x in screen space.
    pub fn from_angle(degrees: f32) -> Self {
        let radians = degrees.to_radians();
        Self::new(radians.cos(), radians.sin())
    }

    pub fn length(self) -> f32 {
        self.length_sq().sqrt()
    }

    pub fn length_sq(self) -> f32 {
        self.x * self.x + self.y * self.y
    }

    pub fn dot(self, other: Vec2) -> f32 {
        self.x * other.x + self.y * other.y
    }

    /// z component of the 3D cross product.
    pub fn cross(self, other: Vec2) -> f32 {
        self.x * other.y - self.y * other.x
    }

    /// Rotated a quarter turn.
    pub fn perp(self) -> Vec2 {
        Vec2::new(-self.y, self.x)
    }

    pub fn normalized(self) -> Vec2 {
        let len = self.length();
        if len > f32::EPSILON {
            self / len
        } else {
            Vec2::ZERO
        }
    }

    pub fn rotated(self, degrees: f32) -> Vec2 {
        let (sin, cos) = degrees.to_radians().sin_cos();
        Vec2::new(self.x * cos - self.y * sin, self.x * sin + self.y * cos)
    }

    pub fn distance(self, other: Vec2) -> f32 {
        (self - other).length()
    }

    /// Heading of this vector in degrees, normalized to `[0, 360)`.
    pub fn angle_degrees(self) -> f32 {
        normalize_degrees(self.y.atan2(self.x).to_degrees())
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

pub fn normalize_degrees(angle: f32) -> f32 {
    let wrapped = angle.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

impl Add for Vec2 {
    type Output = Vec2;
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl SubAssign for Vec2 {
    fn sub_assign(&mut self, rhs: Vec2) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;
    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

impl Div<f32> for Vec2 {
    type Output = Vec2;
    fn div(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x / rhs, self.y / rhs)
    }
}

impl Neg for Vec2 {
    type Output = Vec2;
    fn neg(self) -> Vec2 {
        Vec2::new(-self.x, -self.y)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    id: NodeId,
    pub labels: Vec<String>,
    pub properties: PropertyMap,

    // Visual state
    pub radius: f32,
    pub position: Option<Vec2>,
    pub velocity: Vec2,
    /// Pinned coordinates overriding the simulation.
    pub pinned: Option<Vec2>,
    pub fixed: bool,
    pub selected: bool,
    pub hovered: bool,
    pub expanded: bool,
    pub minified: bool,
    pub caption: Vec<CaptionLine>,
}

impl Node {
    pub fn new(id: NodeId, labels: Vec<String>, properties: PropertyMap) -> Self {
        Self {
            id,
            labels,
            properties,
            radius: 0.0,
            position: None,
            velocity: Vec2::ZERO,
            pinned: None,
            fixed: false,
            selected: false,
            hovered: false,
            expanded: false,
            minified: false,
            caption: Vec::new(),
        }
    }

    pub fn from_raw(raw: &RawNode) -> Self {
        Self::new(raw.id.clone(), raw.labels.clone(), raw.property_map())
    }

    pub fn id(&self) -> &NodeId {
        &self.id
    }

    pub fn property_list(&self) -> Vec<Property> {
        self.properties.property_list()
    }

    /// Pin the node at `position` so the simulation leaves it there.
    pub fn pin_at(&mut self, position: Vec2) {
        self.position = Some(position);
        self.pinned = Some(position);
        self.velocity = Vec2::ZERO;
    }

    pub fn unpin(&mut self) {
        self.pinned = None;
        self.fixed = false;
    }
}

/// Layout state derived for a relationship by the routing pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RelationshipGeometry {
    pub natural_angle: f32,
    pub centre_distance: f32,
    pub arrow: Option<Arrow>,
    pub caption: String,
    pub caption_length: f32,
    pub caption_height: f32,
    pub caption_layout: CaptionLayout,
    pub short_caption: String,
    pub short_caption_length: f32,
    pub shaft_width: f32,
    pub font_size: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Relationship {
    id: RelationshipId,
    pub source: NodeId,
    pub target: NodeId,
    pub rel_type: String,
    pub properties: PropertyMap,
    pub internal: bool,
    pub selected: bool,
    pub hovered: bool,
    pub geometry: RelationshipGeometry,
}

impl Relationship {
    pub fn new(
        id: RelationshipId,
        source: NodeId,
        target: NodeId,
        rel_type: impl Into<String>,
        properties: PropertyMap,
    ) -> Self {
        Self {
            id,
            source,
            target,
            rel_type: rel_type.into(),
            properties,
            internal: false,
            selected: false,
            hovered: false,
            geometry: RelationshipGeometry::default(),
        }
    }

    pub fn from_raw(raw: &RawRelationship) -> Self {
        Self::new(
            raw.id.clone(),
            raw.start_node_id.clone(),
            raw.end_node_id.clone(),
            raw.rel_type.clone(),
            raw.property_map(),
        )
    }

    pub fn id(&self) -> &RelationshipId {
        &self.id
    }

    pub fn is_loop(&self) -> bool {
        self.source == self.target
    }

    pub fn touches(&self, node_id: &NodeId) -> bool {
        &self.source == node_id || &self.target == node_id
    }

    pub fn property_list(&self) -> Vec<Property> {
        self.properties.property_list()
    }
}

/// All relationships between one unordered pair of nodes, `node_a <= node_b`.
#[derive(Debug, Clone, PartialEq)]
pub struct NodePair {
    pub node_a: NodeId,
    pub node_b: NodeId,
    pub relationships: Vec<RelationshipId>,
}

impl NodePair {
    fn key(source: &NodeId, target: &NodeId) -> (NodeId, NodeId) {
        if source <= target {
            (source.clone(), target.clone())
        } else {
            (target.clone(), source.clone())
        }
    }

    pub fn is_loop(&self) -> bool {
        self.node_a == self.node_b
    }
}

/// Mutable registry of the visible graph.
///
/// Nodes and relationships live in insertion-ordered vectors with id to index
/// maps alongside. Every operation tolerates unknown ids.
#[derive(Debug, Default)]
pub struct GraphModel {
    nodes: Vec<Node>,
    node_index: HashMap<NodeId, usize>,
    relationships: Vec<Relationship>,
    relationship_index: HashMap<RelationshipId, usize>,
    expanded: HashMap<NodeId, Vec<NodeId>>,
    revision: u64,
}

impl GraphModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn nodes_mut(&mut self) -> &mut [Node] {
        &mut self.nodes
    }

    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    pub fn relationships_mut(&mut self) -> &mut [Relationship] {
        &mut self.relationships
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn relationship_count(&self) -> usize {
        self.relationships.len()
    }

    /// Bumped on every structural change; layout caches key on it.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn node_index(&self, id: &NodeId) -> Option<usize> {
        self.node_index.get(id).copied()
    }

    pub fn find_node(&self, id: &NodeId) -> Option<&Node> {
        self.node_index.get(id).map(|&idx| &self.nodes[idx])
    }

    pub fn find_node_mut(&mut self, id: &NodeId) -> Option<&mut Node> {
        match self.node_index.get(id) {
            Some(&idx) => Some(&mut self.nodes[idx]),
            None => None,
        }
    }

    pub fn find_relationship(&self, id: &RelationshipId) -> Option<&Relationship> {
        self.relationship_index
            .get(id)
            .map(|&idx| &self.relationships[idx])
    }

    pub fn find_relationship_mut(&mut self, id: &RelationshipId) -> Option<&mut Relationship> {
        match self.relationship_index.get(id) {
            Some(&idx) => Some(&mut self.relationships[idx]),
            None => None,
        }
    }

    /// Insert nodes not yet present. First insertion wins.
    pub fn add_nodes(&mut self, nodes: impl IntoIterator<Item = Node>) -> usize {
        let mut added = 0;
        for node in nodes {
            if self.node_index.contains_key(node.id()) {
                continue;
            }
            self.node_index.insert(node.id().clone(), self.nodes.len());
            self.nodes.push(node);
            added += 1;
        }
        if added > 0 {
            self.revision += 1;
        }
        added
    }

    /// Like [`GraphModel::add_nodes`], recording the nodes as children of `parent`.
    /// Nodes already in the model are not recorded, so collapsing `parent` never
    /// removes them.
    pub fn add_expanded_nodes(
        &mut self,
        parent: &NodeId,
        nodes: impl IntoIterator<Item = Node>,
    ) -> usize {
        let nodes: Vec<Node> = nodes.into_iter().collect();
        let children = self.expanded.entry(parent.clone()).or_default();
        for node in &nodes {
            if node.id() != parent
                && !self.node_index.contains_key(node.id())
                && !children.contains(node.id())
            {
                children.push(node.id().clone());
            }
        }
        self.add_nodes(nodes)
    }

    pub fn remove_node(&mut self, id: &NodeId) -> Option<Node> {
        let idx = self.node_index.remove(id)?;
        let node = self.nodes.remove(idx);
        for slot in self.node_index.values_mut() {
            if *slot > idx {
                *slot -= 1;
            }
        }
        self.revision += 1;
        Some(node)
    }

    /// Insert explicit relationships. An existing relationship with the same id is
    /// promoted to explicit and its arrow invalidated.
    ///
    /// Relationships whose endpoints are not in the model are dropped.
    pub fn add_relationships(&mut self, relationships: impl IntoIterator<Item = Relationship>) {
        for mut relationship in relationships {
            if let Some(existing) = self.find_relationship_mut(relationship.id()) {
                if existing.internal {
                    existing.internal = false;
                    existing.geometry.arrow = None;
                }
                continue;
            }
            relationship.internal = false;
            self.insert_relationship(relationship);
        }
        self.revision += 1;
    }

    /// Insert relationships that only complete the picture around visible nodes.
    /// Existing relationships keep their flag.
    pub fn add_internal_relationships(
        &mut self,
        relationships: impl IntoIterator<Item = Relationship>,
    ) {
        for mut relationship in relationships {
            if self.relationship_index.contains_key(relationship.id()) {
                continue;
            }
            relationship.internal = true;
            self.insert_relationship(relationship);
        }
        self.revision += 1;
    }

    fn insert_relationship(&mut self, relationship: Relationship) {
        if !self.node_index.contains_key(&relationship.source)
            || !self.node_index.contains_key(&relationship.target)
        {
            tracing::warn!(
                "Dropping relationship {}: endpoint {} -> {} not in graph",
                relationship.id(),
                relationship.source,
                relationship.target
            );
            return;
        }
        self.relationship_index
            .insert(relationship.id().clone(), self.relationships.len());
        self.relationships.push(relationship);
    }

    pub fn prune_internal_relationships(&mut self) -> usize {
        let before = self.relationships.len();
        self.relationships.retain(|rel| !rel.internal);
        self.rebuild_relationship_index();
        let pruned = before - self.relationships.len();
        if pruned > 0 {
            self.revision += 1;
        }
        pruned
    }

    fn rebuild_relationship_index(&mut self) {
        self.relationship_index = self
            .relationships
            .iter()
            .enumerate()
            .map(|(idx, rel)| (rel.id().clone(), idx))
            .collect();
    }

    /// Ids of nodes directly connected to `id` in either direction.
    pub fn find_node_neighbour_ids(&self, id: &NodeId) -> HashSet<NodeId> {
        let mut neighbours = HashSet::new();
        for rel in &self.relationships {
            if &rel.source == id {
                neighbours.insert(rel.target.clone());
            } else if &rel.target == id {
                neighbours.insert(rel.source.clone());
            }
        }
        neighbours
    }

    pub fn relationships_of<'a>(
        &'a self,
        id: &'a NodeId,
    ) -> impl Iterator<Item = &'a Relationship> + 'a {
        self.relationships.iter().filter(move |rel| rel.touches(id))
    }

    /// Remove every relationship touching `id`, resetting both endpoints' render state.
    pub fn remove_connected_relationships(&mut self, id: &NodeId) -> usize {
        let mut touched = HashSet::new();
        let before = self.relationships.len();
        self.relationships.retain(|rel| {
            if rel.touches(id) {
                touched.insert(rel.source.clone());
                touched.insert(rel.target.clone());
                false
            } else {
                true
            }
        });
        let removed = before - self.relationships.len();
        if removed == 0 {
            return 0;
        }
        for node_id in touched {
            if let Some(node) = self.find_node_mut(&node_id) {
                node.expanded = false;
                node.minified = false;
            }
        }
        self.rebuild_relationship_index();
        self.revision += 1;
        removed
    }

    /// Remove every node introduced by expanding `id`, depth first, along with
    /// their relationships. No-op if the node was never expanded.
    pub fn collapse_node(&mut self, id: &NodeId) -> Vec<NodeId> {
        let mut removed = Vec::new();
        let mut visited = HashSet::new();
        visited.insert(id.clone());
        self.collapse_children(id, &mut visited, &mut removed);
        removed
    }

    fn collapse_children(
        &mut self,
        id: &NodeId,
        visited: &mut HashSet<NodeId>,
        removed: &mut Vec<NodeId>,
    ) {
        let Some(children) = self.expanded.remove(id) else {
            return;
        };
        for child in children {
            if !visited.insert(child.clone()) {
                continue;
            }
            self.collapse_children(&child, visited, removed);
            self.remove_connected_relationships(&child);
            if self.remove_node(&child).is_some() {
                removed.push(child);
            }
        }
    }

    pub fn expanded_children(&self, id: &NodeId) -> &[NodeId] {
        self.expanded.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The node whose expansion introduced `id`, if any.
    pub fn expansion_parent(&self, id: &NodeId) -> Option<&NodeId> {
        self.expanded
            .iter()
            .find(|(_, children)| children.contains(id))
            .map(|(parent, _)| parent)
    }

    /// Relationships grouped by unordered node pair, in first-seen order.
    /// Relationships with an endpoint missing from the model are left out.
    pub fn grouped_relationships(&self) -> Vec<NodePair> {
        let mut pairs: Vec<NodePair> = Vec::new();
        let mut index: HashMap<(NodeId, NodeId), usize> = HashMap::new();
        for rel in &self.relationships {
            if !self.node_index.contains_key(&rel.source)
                || !self.node_index.contains_key(&rel.target)
            {
                continue;
            }
            let key = NodePair::key(&rel.source, &rel.target);
            match index.get(&key) {
                Some(&idx) => pairs[idx].relationships.push(rel.id().clone()),
                None => {
                    index.insert(key.clone(), pairs.len());
                    pairs.push(NodePair {
                        node_a: key.0,
                        node_b: key.1,
                        relationships: vec![rel.id().clone()],
                    });
                }
            }
        }
        pairs
    }

    pub fn reset_graph(&mut self) {
        self.nodes.clear();
        self.node_index.clear();
        self.relationships.clear();
        self.relationship_index.clear();
        self.expanded.clear();
        self.revision += 1;
    }

    /// Map raw records onto model relationships, skipping any whose endpoints are
    /// not present.
    pub fn map_relationships<'a>(
        &self,
        raws: impl IntoIterator<Item = &'a RawRelationship>,
    ) -> Vec<Relationship> {
        raws.into_iter()
            .filter(|raw| {
                let present = self.node_index.contains_key(&raw.start_node_id)
                    && self.node_index.contains_key(&raw.end_node_id);
                if !present {
                    tracing::debug!("Skipping relationship {} with absent endpoint", raw.id);
                }
                present
            })
            .map(Relationship::from_raw)
            .collect()
    }

    pub fn selected_node(&self) -> Option<&Node> {
        self.nodes.iter().find(|node| node.selected)
    }

    pub fn clear_selection(&mut self) {
        for node in &mut self.nodes {
            node.selected = false;
        }
        for rel in &mut self.relationships {
            rel.selected = false;
        }
    }
}
