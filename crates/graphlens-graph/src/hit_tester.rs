use crate::{GraphModel, Relationship, Vec2};
use graphlens_core::{NodeId, RelationshipId};

/// Result of a hit test at a world position.
///
/// Priority order: Node > Relationship > None
#[derive(Debug, Clone, PartialEq)]
pub enum HitResult {
    None,
    Node(NodeId),
    Relationship(RelationshipId),
}

/// Finds the graph element under a point.
///
/// Nodes are circles around their position. Relationships are tested against
/// their routed arrow, so call this after the layout pass has run.
#[derive(Debug, Clone)]
pub struct HitTester {
    /// Extra distance (in world units) around a relationship shaft that still counts.
    tolerance: f32,
}

impl Default for HitTester {
    fn default() -> Self {
        Self::new()
    }
}

impl HitTester {
    pub fn new() -> Self {
        Self { tolerance: 4.0 }
    }

    pub fn with_tolerance(tolerance: f32) -> Self {
        Self { tolerance }
    }

    pub fn tolerance(&self) -> f32 {
        self.tolerance
    }

    pub fn set_tolerance(&mut self, tolerance: f32) {
        self.tolerance = tolerance;
    }

    pub fn hit_test(&self, model: &GraphModel, pos: Vec2) -> HitResult {
        if let Some(node_id) = self.hit_test_node(model, pos) {
            return HitResult::Node(node_id);
        }
        if let Some(rel_id) = self.hit_test_relationship(model, pos) {
            return HitResult::Relationship(rel_id);
        }
        HitResult::None
    }

    /// Topmost node containing `pos`. Later nodes are drawn over earlier ones.
    pub fn hit_test_node(&self, model: &GraphModel, pos: Vec2) -> Option<NodeId> {
        model
            .nodes()
            .iter()
            .rev()
            .find(|node| {
                node.position
                    .is_some_and(|centre| centre.distance(pos) <= node.radius)
            })
            .map(|node| node.id().clone())
    }

    /// Closest relationship whose shaft lies within tolerance of `pos`.
    pub fn hit_test_relationship(&self, model: &GraphModel, pos: Vec2) -> Option<RelationshipId> {
        let mut best: Option<(&Relationship, f32)> = None;

        for rel in model.relationships() {
            let Some(distance) = Self::relationship_distance(model, rel, pos) else {
                continue;
            };
            let reach = rel.geometry.shaft_width / 2.0 + self.tolerance;
            if distance > reach {
                continue;
            }
            match best {
                Some((_, best_distance)) if distance >= best_distance => {}
                _ => best = Some((rel, distance)),
            }
        }

        best.map(|(rel, _)| rel.id().clone())
    }

    fn relationship_distance(model: &GraphModel, rel: &Relationship, pos: Vec2) -> Option<f32> {
        let arrow = rel.geometry.arrow.as_ref()?;
        let origin = model.find_node(&rel.source)?.position?;
        let local = (pos - origin).rotated(-rel.geometry.natural_angle);
        Some(arrow.distance_to(local))
    }
}
