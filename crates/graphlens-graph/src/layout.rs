use crate::geometry::TextMeasure;
use crate::geometry::arrows::{Arrow, CaptionLayout};
use crate::geometry::caption::{
    fit_caption_into_circle, measure_relationship_caption, shorten_caption,
};
use crate::graph::{GraphModel, NodePair};
use crate::style::{CaptionSource, StyleLookup, interpolate};
use graphlens_core::NodeId;
use std::collections::HashMap;

/// Default angle between neighbouring parallel relationships, in degrees.
pub const DEFAULT_DEFLECTION_STEP: f32 = 30.0;
/// Cap on the fan of parallel relationships between one pair.
pub const MAX_TOTAL_DEFLECTION: f32 = 150.0;
pub const LOOP_STRAIGHT_LENGTH: f32 = 40.0;
pub const LOOP_SPREAD: f32 = 30.0;
/// Shaft width used when the style value does not parse.
const FALLBACK_SHAFT_WIDTH: f32 = 2.0;
/// Head width over shaft width.
const HEAD_EXTRA_WIDTH: f32 = 6.0;

/// Derive radius and wrapped caption for every node.
pub fn measure_nodes(model: &mut GraphModel, style: &dyn StyleLookup, measure: &dyn TextMeasure) {
    for idx in 0..model.node_count() {
        let (radius, caption) = {
            let node = &model.nodes()[idx];
            let props = style.for_node(node);
            let radius = props.number_or("diameter", 50.0).max(0.0) / 2.0;
            let caption = if node.minified {
                Vec::new()
            } else {
                let template = props.get("caption").unwrap_or("<id>");
                let text = interpolate(template, CaptionSource::Node(node));
                fit_caption_into_circle(&text, radius, props.number_or("font-size", 10.0), measure)
            };
            (radius, caption)
        };
        let node = &mut model.nodes_mut()[idx];
        node.radius = radius;
        node.caption = caption;
    }
}

/// Lays relationships out per node pair: parallel relationships fan out as arcs
/// around a straight middle one and loops fill the widest free gap around
/// their node.
#[derive(Debug, Clone)]
pub struct PairwiseArcsRouter {
    pub deflection_step: f32,
    pub max_total_deflection: f32,
    pub loop_straight_length: f32,
    pub loop_spread: f32,
}

impl Default for PairwiseArcsRouter {
    fn default() -> Self {
        Self {
            deflection_step: DEFAULT_DEFLECTION_STEP,
            max_total_deflection: MAX_TOTAL_DEFLECTION,
            loop_straight_length: LOOP_STRAIGHT_LENGTH,
            loop_spread: LOOP_SPREAD,
        }
    }
}

impl PairwiseArcsRouter {
    /// Deflection of the `index`-th of `count` parallel relationships, in the
    /// frame of the pair's first node.
    pub fn deflection_for(&self, index: usize, count: usize) -> f32 {
        if count < 2 {
            return 0.0;
        }
        let step = self
            .deflection_step
            .min(self.max_total_deflection / (count - 1) as f32);
        let middle = (count - 1) as f32 / 2.0;
        step * (index as f32 - middle)
    }

    /// Recompute captions, arrows and short captions of every relationship.
    pub fn layout_relationships(
        &self,
        model: &mut GraphModel,
        style: &dyn StyleLookup,
        measure: &dyn TextMeasure,
    ) {
        self.measure_captions(model, style, measure);

        let pairs = model.grouped_relationships();
        let headings = non_loop_headings(model);
        for pair in &pairs {
            if pair.is_loop() {
                self.layout_loops(model, pair, headings.get(&pair.node_a));
            } else {
                self.layout_pair(model, pair);
            }
        }

        for rel in model.relationships_mut() {
            let geometry = &mut rel.geometry;
            let Some(shaft_length) = geometry.arrow.as_ref().map(Arrow::shaft_length) else {
                geometry.short_caption = geometry.caption.clone();
                geometry.short_caption_length = geometry.caption_length;
                continue;
            };
            if shaft_length > geometry.caption_length {
                geometry.short_caption = geometry.caption.clone();
                geometry.short_caption_length = geometry.caption_length;
            } else {
                let (text, width) =
                    shorten_caption(&geometry.caption, shaft_length, geometry.font_size, measure);
                geometry.short_caption = text;
                geometry.short_caption_length = width;
            }
        }
    }

    fn measure_captions(
        &self,
        model: &mut GraphModel,
        style: &dyn StyleLookup,
        measure: &dyn TextMeasure,
    ) {
        for rel in model.relationships_mut() {
            let props = style.for_relationship(rel);
            let template = props.get("caption").unwrap_or("<type>");
            let caption = interpolate(template, CaptionSource::Relationship(rel));
            let font_size = props.number_or("font-size", 8.0);
            let padding = props.number_or("padding", 3.0);
            let shaft_width = props.number_or("shaft-width", FALLBACK_SHAFT_WIDTH);
            let is_loop = rel.is_loop();

            let geometry = &mut rel.geometry;
            geometry.arrow = None;
            geometry.caption_length =
                measure_relationship_caption(&caption, font_size, padding, measure);
            geometry.caption = caption;
            geometry.caption_height = font_size;
            geometry.font_size = font_size;
            geometry.shaft_width = shaft_width;
            geometry.caption_layout = if shaft_width > font_size && !is_loop {
                CaptionLayout::Internal
            } else {
                CaptionLayout::External
            };
        }
    }

    fn layout_pair(&self, model: &mut GraphModel, pair: &NodePair) {
        let (Some(a), Some(b)) = (model.find_node(&pair.node_a), model.find_node(&pair.node_b))
        else {
            return;
        };
        let (Some(pos_a), Some(pos_b)) = (a.position, b.position) else {
            return;
        };
        let radii: HashMap<NodeId, f32> = [
            (pair.node_a.clone(), a.radius),
            (pair.node_b.clone(), b.radius),
        ]
        .into_iter()
        .collect();

        let offset = pos_b - pos_a;
        let centre_distance = offset.length();
        let angle_ab = offset.angle_degrees();
        let count = pair.relationships.len();

        for (index, rel_id) in pair.relationships.iter().enumerate() {
            let Some(rel) = model.find_relationship_mut(rel_id) else {
                continue;
            };
            let forward = rel.source == pair.node_a;
            let mut deflection = self.deflection_for(index, count);
            if !forward {
                deflection = -deflection;
            }
            let start_radius = radii.get(&rel.source).copied().unwrap_or(0.0);
            let end_radius = radii.get(&rel.target).copied().unwrap_or(0.0);

            let geometry = &mut rel.geometry;
            geometry.natural_angle = if forward {
                angle_ab
            } else {
                crate::normalize_degrees(angle_ab + 180.0)
            };
            geometry.centre_distance = centre_distance;
            let head = geometry.shaft_width + HEAD_EXTRA_WIDTH;
            geometry.arrow = Some(Arrow::arc(
                start_radius,
                end_radius,
                centre_distance,
                deflection,
                geometry.shaft_width,
                head,
                head,
                geometry.caption_layout,
            ));
        }
    }

    fn layout_loops(&self, model: &mut GraphModel, pair: &NodePair, headings: Option<&Vec<f32>>) {
        let Some(radius) = model.find_node(&pair.node_a).map(|node| node.radius) else {
            return;
        };
        let angles = loop_angles(headings.map(Vec::as_slice).unwrap_or(&[]), pair.relationships.len());
        for (rel_id, angle) in pair.relationships.iter().zip(angles) {
            let Some(rel) = model.find_relationship_mut(rel_id) else {
                continue;
            };
            let geometry = &mut rel.geometry;
            let head = geometry.shaft_width + HEAD_EXTRA_WIDTH;
            geometry.natural_angle = angle;
            geometry.centre_distance = 0.0;
            geometry.arrow = Some(Arrow::looped(
                radius,
                self.loop_straight_length,
                self.loop_spread,
                geometry.shaft_width,
                head,
                head,
                geometry.caption_height,
            ));
        }
    }
}

/// Headings, in degrees, of every non-loop relationship leaving each node.
fn non_loop_headings(model: &GraphModel) -> HashMap<NodeId, Vec<f32>> {
    let position = |id: &NodeId| model.find_node(id).and_then(|node| node.position);
    let mut headings: HashMap<NodeId, Vec<f32>> = HashMap::new();
    for rel in model.relationships() {
        if rel.is_loop() {
            continue;
        }
        let (Some(source), Some(target)) = (position(&rel.source), position(&rel.target)) else {
            continue;
        };
        let heading = (target - source).angle_degrees();
        headings.entry(rel.source.clone()).or_default().push(heading);
        headings
            .entry(rel.target.clone())
            .or_default()
            .push(crate::normalize_degrees(heading + 180.0));
    }
    headings
}

/// Angles for `count` loops, placed evenly inside the widest gap between
/// `headings`, or evenly around the node when there are none.
pub fn loop_angles(headings: &[f32], count: usize) -> Vec<f32> {
    if headings.is_empty() {
        return (0..count)
            .map(|i| i as f32 * 360.0 / count as f32)
            .collect();
    }
    let mut sorted = headings.to_vec();
    sorted.sort_by(f32::total_cmp);

    let mut gap_start = sorted[sorted.len() - 1];
    let mut widest = sorted[0] + 360.0 - gap_start;
    for window in sorted.windows(2) {
        let gap = window[1] - window[0];
        if gap > widest {
            widest = gap;
            gap_start = window[0];
        }
    }

    (0..count)
        .map(|i| crate::normalize_degrees(gap_start + (i + 1) as f32 * widest / (count + 1) as f32))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::ApproximateTextMeasure;
    use crate::graph::{Node, Relationship, Vec2};
    use crate::style::GraphStyle;
    use graphlens_core::{PropertyMap, RelationshipId};

    fn placed(id: &str, x: f32, y: f32) -> Node {
        let mut node = Node::new(NodeId::from(id), vec![], PropertyMap::new());
        node.position = Some(Vec2::new(x, y));
        node
    }

    fn rel(id: &str, source: &str, target: &str) -> Relationship {
        Relationship::new(
            RelationshipId::from(id),
            NodeId::from(source),
            NodeId::from(target),
            "KNOWS",
            PropertyMap::new(),
        )
    }

    fn laid_out(nodes: Vec<Node>, rels: Vec<Relationship>) -> GraphModel {
        let mut model = GraphModel::new();
        model.add_nodes(nodes);
        model.add_relationships(rels);
        let style = GraphStyle::new();
        let measure = ApproximateTextMeasure::default();
        measure_nodes(&mut model, &style, &measure);
        PairwiseArcsRouter::default().layout_relationships(&mut model, &style, &measure);
        model
    }

    fn deflection(model: &GraphModel, id: &str) -> f32 {
        model
            .find_relationship(&RelationshipId::from(id))
            .and_then(|r| r.geometry.arrow.as_ref())
            .map(Arrow::deflection)
            .unwrap_or(f32::NAN)
    }

    #[test]
    fn test_three_parallel_relationships_fan_out() {
        let model = laid_out(
            vec![placed("a", 0.0, 0.0), placed("b", 300.0, 0.0)],
            vec![rel("r1", "a", "b"), rel("r2", "a", "b"), rel("r3", "a", "b")],
        );
        let values = [deflection(&model, "r1"), deflection(&model, "r2"), deflection(&model, "r3")];
        assert_eq!(values.iter().filter(|d| **d == 0.0).count(), 1);
        assert_eq!(values[1], 0.0);
        assert!(values[0] != 0.0);
        assert!((values[0] + values[2]).abs() < 1e-4);
    }

    #[test]
    fn test_deflection_step_capped() {
        let router = PairwiseArcsRouter::default();
        assert_eq!(router.deflection_for(0, 1), 0.0);
        assert_eq!(router.deflection_for(0, 3), -30.0);
        // Eleven relationships share 150 degrees
        assert!((router.deflection_for(0, 11) + 75.0).abs() < 1e-4);
        assert!((router.deflection_for(10, 11) - 75.0).abs() < 1e-4);
    }

    #[test]
    fn test_reverse_relationship_mirrors_deflection() {
        let model = laid_out(
            vec![placed("a", 0.0, 0.0), placed("b", 300.0, 0.0)],
            vec![rel("r1", "a", "b"), rel("r2", "b", "a")],
        );
        let forward = model.find_relationship(&RelationshipId::from("r1")).unwrap();
        let backward = model.find_relationship(&RelationshipId::from("r2")).unwrap();
        assert_eq!(forward.geometry.natural_angle, 0.0);
        assert_eq!(backward.geometry.natural_angle, 180.0);
        // Equal local deflections bow to opposite sides of the pair
        assert!((deflection(&model, "r1") + 15.0).abs() < 1e-4);
        assert!((deflection(&model, "r2") + 15.0).abs() < 1e-4);
    }

    #[test]
    fn test_loop_takes_widest_gap() {
        assert_eq!(loop_angles(&[], 2), vec![0.0, 180.0]);
        let angles = loop_angles(&[0.0, 90.0], 1);
        assert!((angles[0] - 225.0).abs() < 1e-4);
        let angles = loop_angles(&[10.0, 20.0, 200.0], 1);
        assert!((angles[0] - 110.0).abs() < 1e-4);
    }

    #[test]
    fn test_loop_relationship_gets_loop_arrow() {
        let model = laid_out(
            vec![placed("a", 0.0, 0.0), placed("b", 200.0, 0.0)],
            vec![rel("r1", "a", "a"), rel("r2", "a", "b")],
        );
        let looped = model.find_relationship(&RelationshipId::from("r1")).unwrap();
        assert!(matches!(looped.geometry.arrow, Some(Arrow::Loop(_))));
        assert!((looped.geometry.natural_angle - 180.0).abs() < 1e-4);
        assert_eq!(looped.geometry.caption_layout, CaptionLayout::External);
    }

    #[test]
    fn test_short_caption_fits_shaft() {
        let model = laid_out(
            vec![placed("a", 0.0, 0.0), placed("b", 70.0, 0.0)],
            vec![rel("r1", "a", "b")],
        );
        let geometry = &model.find_relationship(&RelationshipId::from("r1")).unwrap().geometry;
        // Shaft is 70 - 50 - 7 = 13 wide, "KNOWS" needs 24 + 6
        assert!(geometry.caption_length > 13.0);
        assert!(geometry.short_caption.len() < geometry.caption.len());
        assert!(geometry.short_caption_length < 13.0);

        let model = laid_out(
            vec![placed("a", 0.0, 0.0), placed("b", 300.0, 0.0)],
            vec![rel("r1", "a", "b")],
        );
        let geometry = &model.find_relationship(&RelationshipId::from("r1")).unwrap().geometry;
        assert_eq!(geometry.short_caption, "KNOWS");
    }

    #[test]
    fn test_unplaced_nodes_get_no_arrow() {
        let mut unplaced = placed("b", 0.0, 0.0);
        unplaced.position = None;
        let model = laid_out(vec![placed("a", 0.0, 0.0), unplaced], vec![rel("r1", "a", "b")]);
        let rel = model.find_relationship(&RelationshipId::from("r1")).unwrap();
        assert!(rel.geometry.arrow.is_none());
        assert_eq!(rel.geometry.caption, "KNOWS");
    }

    #[test]
    fn test_nodes_measured_from_style() {
        let mut node = placed("a", 0.0, 0.0);
        node.properties.insert("name", "Ann");
        let model = laid_out(vec![node], vec![]);
        let node = &model.nodes()[0];
        assert_eq!(node.radius, 25.0);
        assert_eq!(node.caption.len(), 1);
        assert_eq!(node.caption[0].text, "Ann");
    }
}
