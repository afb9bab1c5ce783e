//! Arrow shapes between node boundaries.
//!
//! Every arrow lives in a local frame with the source node centre at the origin.
//! Straight and arc arrows point along +x toward a target centred at
//! `(centre_distance, 0)`; loops point along +x away from their node.

use super::PathCommand;
use crate::Vec2;
use serde::{Deserialize, Serialize};
use std::f32::consts::{PI, TAU};

/// Deflections below this many degrees are drawn straight.
pub const MIN_ARC_DEFLECTION: f32 = 0.1;

/// Where a relationship caption sits relative to its shaft.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaptionLayout {
    /// In a gap cut out of the shaft.
    #[default]
    External,
    /// On top of a shaft wide enough to hold it.
    Internal,
}

fn point_segment_distance(p: Vec2, a: Vec2, b: Vec2) -> f32 {
    let ab = b - a;
    let len_sq = ab.length_sq();
    if len_sq <= f32::EPSILON {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}

#[derive(Debug, Clone, PartialEq)]
pub struct StraightArrow {
    pub start_radius: f32,
    /// Gap between the node boundaries, negative when the nodes overlap.
    pub length: f32,
    pub shaft_length: f32,
    pub shaft_width: f32,
    pub head_width: f32,
    pub head_height: f32,
    pub caption_layout: CaptionLayout,
}

impl StraightArrow {
    pub fn new(
        start_radius: f32,
        end_radius: f32,
        centre_distance: f32,
        shaft_width: f32,
        head_width: f32,
        head_height: f32,
        caption_layout: CaptionLayout,
    ) -> Self {
        let length = centre_distance - (start_radius + end_radius);
        Self {
            start_radius,
            length,
            shaft_length: (length - head_height).max(0.0),
            shaft_width,
            head_width,
            head_height,
            caption_layout,
        }
    }

    pub fn is_degenerate(&self) -> bool {
        self.length <= 0.0
    }

    fn end_shaft(&self) -> f32 {
        self.start_radius + self.shaft_length
    }

    fn end_arrow(&self) -> f32 {
        self.start_radius + self.length.max(0.0)
    }

    pub fn mid_shaft_point(&self) -> Vec2 {
        Vec2::new(self.start_radius + self.shaft_length / 2.0, 0.0)
    }

    pub fn outline(&self, short_caption_length: f32) -> Vec<PathCommand> {
        if self.is_degenerate() {
            return Vec::new();
        }
        let start = self.start_radius;
        let shaft_radius = self.shaft_width / 2.0;
        let head_radius = self.head_width / 2.0;
        let end_shaft = self.end_shaft();
        let head = |from: f32| {
            vec![
                PathCommand::LineTo(Vec2::new(end_shaft, shaft_radius)),
                PathCommand::LineTo(Vec2::new(end_shaft, head_radius)),
                PathCommand::LineTo(Vec2::new(self.end_arrow(), 0.0)),
                PathCommand::LineTo(Vec2::new(end_shaft, -head_radius)),
                PathCommand::LineTo(Vec2::new(end_shaft, -shaft_radius)),
                PathCommand::LineTo(Vec2::new(from, -shaft_radius)),
                PathCommand::Close,
            ]
        };

        match self.caption_layout {
            CaptionLayout::Internal => {
                let mut path = vec![PathCommand::MoveTo(Vec2::new(start, shaft_radius))];
                path.extend(head(start));
                path
            }
            CaptionLayout::External => {
                let caption = short_caption_length.clamp(0.0, self.shaft_length);
                let start_break = start + (self.shaft_length - caption) / 2.0;
                let end_break = start_break + caption;
                let mut path = vec![
                    PathCommand::MoveTo(Vec2::new(start, shaft_radius)),
                    PathCommand::LineTo(Vec2::new(start_break, shaft_radius)),
                    PathCommand::LineTo(Vec2::new(start_break, -shaft_radius)),
                    PathCommand::LineTo(Vec2::new(start, -shaft_radius)),
                    PathCommand::Close,
                    PathCommand::MoveTo(Vec2::new(end_break, shaft_radius)),
                ];
                path.extend(head(end_break));
                path
            }
        }
    }

    pub fn overlay(&self, min_width: f32) -> Vec<PathCommand> {
        if self.is_degenerate() {
            return Vec::new();
        }
        let radius = (min_width / 2.0).max(self.shaft_width / 2.0);
        let start = self.start_radius;
        let end = self.end_arrow();
        vec![
            PathCommand::MoveTo(Vec2::new(start, radius)),
            PathCommand::LineTo(Vec2::new(end, radius)),
            PathCommand::LineTo(Vec2::new(end, -radius)),
            PathCommand::LineTo(Vec2::new(start, -radius)),
            PathCommand::Close,
        ]
    }

    pub fn distance_to(&self, point: Vec2) -> f32 {
        point_segment_distance(
            point,
            Vec2::new(self.start_radius, 0.0),
            Vec2::new(self.end_arrow(), 0.0),
        )
    }
}

/// A constant-curvature arrow between the boundaries of two nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct ArcArrow {
    pub deflection: f32,
    pub start_attach: Vec2,
    pub end_attach: Vec2,
    pub tip: Vec2,
    pub centre: Vec2,
    pub arc_radius: f32,
    pub start_angle: f32,
    /// Angle swept from start to end attachment, in radians.
    pub sweep: f32,
    pub shaft_length: f32,
    pub shaft_width: f32,
    pub head_width: f32,
    pub head_length: f32,
    pub caption_layout: CaptionLayout,
}

impl ArcArrow {
    /// Returns `None` when the construction has no solution, e.g. for
    /// overlapping nodes.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        start_radius: f32,
        end_radius: f32,
        centre_distance: f32,
        deflection: f32,
        shaft_width: f32,
        head_width: f32,
        head_length: f32,
        caption_layout: CaptionLayout,
    ) -> Option<Self> {
        if centre_distance <= start_radius + end_radius + head_length {
            return None;
        }
        let end_centre = Vec2::new(centre_distance, 0.0);
        let end_circle_radius = end_radius + head_length;
        let start_attach = Vec2::from_angle(deflection) * start_radius;

        // Line through the homothetic centre of both attachment circles
        let ratio = start_radius / end_circle_radius;
        let direction = if (1.0 - ratio).abs() < 1e-4 {
            Vec2::new(1.0, 0.0)
        } else {
            let homothetic = Vec2::new(-centre_distance * ratio / (1.0 - ratio), 0.0);
            (start_attach - homothetic).normalized()
        };
        if direction == Vec2::ZERO {
            return None;
        }

        let offset = start_attach - end_centre;
        let b = 2.0 * direction.dot(offset);
        let c = offset.length_sq() - end_circle_radius * end_circle_radius;
        let discriminant = b * b - 4.0 * c;
        if discriminant < 0.0 {
            return None;
        }
        let root = discriminant.sqrt();
        let first = start_attach + direction * ((-b - root) / 2.0);
        let second = start_attach + direction * ((-b + root) / 2.0);
        let end_attach = if first.x <= second.x { first } else { second };

        // Both tangents are perpendicular to their radius; the arc centre is
        // where the two normals meet.
        let start_normal = start_attach.perp();
        let end_normal = (end_attach - end_centre).perp();
        let denominator = start_normal.cross(end_normal);
        if denominator.abs() < 1e-6 {
            return None;
        }
        let s = (end_attach - start_attach).cross(end_normal) / denominator;
        let centre = start_attach + start_normal * s;
        let arc_radius = centre.distance(start_attach);

        let start_angle = Self::angle_around(centre, start_attach);
        let end_angle = Self::angle_around(centre, end_attach);
        let sweep = if deflection > 0.0 {
            (start_angle - end_angle).rem_euclid(TAU)
        } else {
            (end_angle - start_angle).rem_euclid(TAU)
        };
        if !arc_radius.is_finite() || sweep > PI {
            return None;
        }

        let tip = end_attach + (end_centre - end_attach).normalized() * head_length;

        Some(Self {
            deflection,
            start_attach,
            end_attach,
            tip,
            centre,
            arc_radius,
            start_angle,
            sweep,
            shaft_length: sweep * arc_radius,
            shaft_width,
            head_width,
            head_length,
            caption_layout,
        })
    }

    fn angle_around(centre: Vec2, point: Vec2) -> f32 {
        (point.x - centre.x).atan2(centre.y - point.y)
    }

    /// +1 when travelling from source to target increases the angle.
    fn direction(&self) -> f32 {
        if self.deflection > 0.0 { -1.0 } else { 1.0 }
    }

    fn angle_at(&self, fraction: f32) -> f32 {
        self.start_angle + self.direction() * self.sweep * fraction
    }

    fn point_at(&self, angle: f32, radial_offset: f32) -> Vec2 {
        let radius = self.arc_radius + radial_offset;
        Vec2::new(
            self.centre.x + radius * angle.sin(),
            self.centre.y - radius * angle.cos(),
        )
    }

    fn forward_sweep_flag(&self) -> bool {
        self.deflection <= 0.0
    }

    pub fn mid_shaft_point(&self) -> Vec2 {
        self.point_at(self.angle_at(0.5), 0.0)
    }

    fn head_and_return(&self, from: f32) -> Vec<PathCommand> {
        let shaft_radius = self.shaft_width / 2.0;
        let head_radius = self.head_width / 2.0;
        let end = self.angle_at(1.0);
        vec![
            PathCommand::ArcTo {
                radius: self.arc_radius - shaft_radius,
                large_arc: false,
                sweep: self.forward_sweep_flag(),
                to: self.point_at(end, -shaft_radius),
            },
            PathCommand::LineTo(self.point_at(end, -head_radius)),
            PathCommand::LineTo(self.tip),
            PathCommand::LineTo(self.point_at(end, head_radius)),
            PathCommand::LineTo(self.point_at(end, shaft_radius)),
            PathCommand::ArcTo {
                radius: self.arc_radius + shaft_radius,
                large_arc: false,
                sweep: !self.forward_sweep_flag(),
                to: self.point_at(from, shaft_radius),
            },
            PathCommand::Close,
        ]
    }

    pub fn outline(&self, short_caption_length: f32) -> Vec<PathCommand> {
        let shaft_radius = self.shaft_width / 2.0;
        let start = self.start_angle;
        match self.caption_layout {
            CaptionLayout::Internal => {
                let mut path = vec![PathCommand::MoveTo(self.point_at(start, -shaft_radius))];
                path.extend(self.head_and_return(start));
                path
            }
            CaptionLayout::External => {
                let caption = short_caption_length.clamp(0.0, self.shaft_length);
                let caption_fraction = if self.shaft_length > 0.0 {
                    caption / self.shaft_length
                } else {
                    0.0
                };
                let start_break = self.angle_at(0.5 - caption_fraction / 2.0);
                let end_break = self.angle_at(0.5 + caption_fraction / 2.0);
                let mut path = vec![
                    PathCommand::MoveTo(self.point_at(start, -shaft_radius)),
                    PathCommand::ArcTo {
                        radius: self.arc_radius - shaft_radius,
                        large_arc: false,
                        sweep: self.forward_sweep_flag(),
                        to: self.point_at(start_break, -shaft_radius),
                    },
                    PathCommand::LineTo(self.point_at(start_break, shaft_radius)),
                    PathCommand::ArcTo {
                        radius: self.arc_radius + shaft_radius,
                        large_arc: false,
                        sweep: !self.forward_sweep_flag(),
                        to: self.point_at(start, shaft_radius),
                    },
                    PathCommand::Close,
                    PathCommand::MoveTo(self.point_at(end_break, -shaft_radius)),
                ];
                path.extend(self.head_and_return(end_break));
                path
            }
        }
    }

    pub fn overlay(&self, min_width: f32) -> Vec<PathCommand> {
        let half_width = (min_width / 2.0).max(self.shaft_width / 2.0);
        let start = self.start_angle;
        let end = self.angle_at(1.0);
        vec![
            PathCommand::MoveTo(self.point_at(start, -half_width)),
            PathCommand::ArcTo {
                radius: self.arc_radius - half_width,
                large_arc: false,
                sweep: self.forward_sweep_flag(),
                to: self.point_at(end, -half_width),
            },
            PathCommand::LineTo(self.point_at(end, half_width)),
            PathCommand::ArcTo {
                radius: self.arc_radius + half_width,
                large_arc: false,
                sweep: !self.forward_sweep_flag(),
                to: self.point_at(start, half_width),
            },
            PathCommand::Close,
        ]
    }

    pub fn distance_to(&self, point: Vec2) -> f32 {
        let angle = Self::angle_around(self.centre, point);
        let travelled = (self.direction() * (angle - self.start_angle)).rem_euclid(TAU);
        if travelled <= self.sweep {
            (point.distance(self.centre) - self.arc_radius).abs()
        } else {
            point
                .distance(self.start_attach)
                .min(point_segment_distance(point, self.end_attach, self.tip))
        }
    }
}

/// A teardrop loop for relationships whose source and target are the same node.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopArrow {
    pub node_radius: f32,
    pub straight_length: f32,
    /// Opening angle of the loop in radians.
    pub spread: f32,
    pub shaft_width: f32,
    pub head_width: f32,
    pub head_length: f32,
    pub caption_height: f32,
    pub shaft_length: f32,
}

impl LoopArrow {
    pub fn new(
        node_radius: f32,
        straight_length: f32,
        spread_degrees: f32,
        shaft_width: f32,
        head_width: f32,
        head_length: f32,
        caption_height: f32,
    ) -> Self {
        let spread = spread_degrees.to_radians();
        let loop_radius = (node_radius + straight_length) * (spread / 2.0).tan();
        Self {
            node_radius,
            straight_length,
            spread,
            shaft_width,
            head_width,
            head_length,
            caption_height,
            shaft_length: loop_radius * 3.0 + shaft_width,
        }
    }

    fn outer_radius(&self) -> f32 {
        self.node_radius + self.straight_length
    }

    fn loop_radius_at(&self, radius: f32) -> f32 {
        radius * (self.spread / 2.0).tan()
    }

    fn loop_centre_at(&self, radius: f32) -> Vec2 {
        Vec2::new(radius / (self.spread / 2.0).cos(), 0.0)
    }

    /// Point on the circle of the loop scaled to `radius`, at `sweep` radians
    /// from the loop's far end.
    fn normal_point(&self, sweep: f32, radius: f32, displacement: f32) -> Vec2 {
        let reach = self.loop_radius_at(radius) + displacement;
        self.loop_centre_at(radius) + Vec2::new(reach * sweep.cos(), -reach * sweep.sin())
    }

    fn start_point(&self, radius: f32, displacement: f32) -> Vec2 {
        self.normal_point((PI + self.spread) / 2.0, radius, displacement)
    }

    fn end_point(&self, radius: f32, displacement: f32) -> Vec2 {
        self.normal_point(-(PI + self.spread) / 2.0, radius, displacement)
    }

    pub fn mid_shaft_point(&self) -> Vec2 {
        self.normal_point(
            0.0,
            self.outer_radius(),
            self.shaft_width / 2.0 + self.caption_height / 2.0 + 2.0,
        )
    }

    fn shape(&self, shaft_radius: f32, head_radius: f32) -> Vec<PathCommand> {
        let r1 = self.node_radius;
        let r2 = self.node_radius + self.head_length;
        let r3 = self.outer_radius();
        let loop_radius = self.loop_radius_at(r3);
        vec![
            PathCommand::MoveTo(self.start_point(r1, shaft_radius)),
            PathCommand::LineTo(self.start_point(r3, shaft_radius)),
            PathCommand::ArcTo {
                radius: loop_radius + shaft_radius,
                large_arc: true,
                sweep: true,
                to: self.end_point(r3, shaft_radius),
            },
            PathCommand::LineTo(self.end_point(r2, shaft_radius)),
            PathCommand::LineTo(self.end_point(r2, head_radius)),
            PathCommand::LineTo(self.end_point(r1, 0.0)),
            PathCommand::LineTo(self.end_point(r2, -head_radius)),
            PathCommand::LineTo(self.end_point(r2, -shaft_radius)),
            PathCommand::LineTo(self.end_point(r3, -shaft_radius)),
            PathCommand::ArcTo {
                radius: (loop_radius - shaft_radius).max(0.0),
                large_arc: true,
                sweep: false,
                to: self.start_point(r3, -shaft_radius),
            },
            PathCommand::LineTo(self.start_point(r1, -shaft_radius)),
            PathCommand::Close,
        ]
    }

    pub fn outline(&self) -> Vec<PathCommand> {
        self.shape(self.shaft_width / 2.0, self.head_width / 2.0)
    }

    pub fn overlay(&self, min_width: f32) -> Vec<PathCommand> {
        let radius = (min_width / 2.0).max(self.shaft_width / 2.0);
        self.shape(radius, radius.max(self.head_width / 2.0))
    }

    pub fn distance_to(&self, point: Vec2) -> f32 {
        let r1 = self.node_radius;
        let r3 = self.outer_radius();
        let circle = (point.distance(self.loop_centre_at(r3)) - self.loop_radius_at(r3)).abs();
        let outgoing = point_segment_distance(point, self.start_point(r1, 0.0), self.start_point(r3, 0.0));
        let incoming = point_segment_distance(point, self.end_point(r1, 0.0), self.end_point(r3, 0.0));
        circle.min(outgoing).min(incoming)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Arrow {
    Straight(StraightArrow),
    Arc(ArcArrow),
    Loop(LoopArrow),
}

impl Arrow {
    pub fn straight(
        start_radius: f32,
        end_radius: f32,
        centre_distance: f32,
        shaft_width: f32,
        head_width: f32,
        head_height: f32,
        caption_layout: CaptionLayout,
    ) -> Self {
        Arrow::Straight(StraightArrow::new(
            start_radius,
            end_radius,
            centre_distance,
            shaft_width,
            head_width,
            head_height,
            caption_layout,
        ))
    }

    /// An arc arrow, or a straight one when the deflection is too small or the
    /// arc construction fails.
    #[allow(clippy::too_many_arguments)]
    pub fn arc(
        start_radius: f32,
        end_radius: f32,
        centre_distance: f32,
        deflection: f32,
        shaft_width: f32,
        head_width: f32,
        head_length: f32,
        caption_layout: CaptionLayout,
    ) -> Self {
        if deflection.abs() >= MIN_ARC_DEFLECTION
            && let Some(arc) = ArcArrow::new(
                start_radius,
                end_radius,
                centre_distance,
                deflection,
                shaft_width,
                head_width,
                head_length,
                caption_layout,
            )
        {
            return Arrow::Arc(arc);
        }
        Self::straight(
            start_radius,
            end_radius,
            centre_distance,
            shaft_width,
            head_width,
            head_length,
            caption_layout,
        )
    }

    pub fn looped(
        node_radius: f32,
        straight_length: f32,
        spread_degrees: f32,
        shaft_width: f32,
        head_width: f32,
        head_length: f32,
        caption_height: f32,
    ) -> Self {
        Arrow::Loop(LoopArrow::new(
            node_radius,
            straight_length,
            spread_degrees,
            shaft_width,
            head_width,
            head_length,
            caption_height,
        ))
    }

    pub fn shaft_length(&self) -> f32 {
        match self {
            Arrow::Straight(arrow) => arrow.shaft_length,
            Arrow::Arc(arrow) => arrow.shaft_length,
            Arrow::Loop(arrow) => arrow.shaft_length,
        }
    }

    pub fn mid_shaft_point(&self) -> Vec2 {
        match self {
            Arrow::Straight(arrow) => arrow.mid_shaft_point(),
            Arrow::Arc(arrow) => arrow.mid_shaft_point(),
            Arrow::Loop(arrow) => arrow.mid_shaft_point(),
        }
    }

    pub fn deflection(&self) -> f32 {
        match self {
            Arrow::Arc(arrow) => arrow.deflection,
            _ => 0.0,
        }
    }

    pub fn caption_layout(&self) -> CaptionLayout {
        match self {
            Arrow::Straight(arrow) => arrow.caption_layout,
            Arrow::Arc(arrow) => arrow.caption_layout,
            Arrow::Loop(_) => CaptionLayout::External,
        }
    }

    pub fn outline(&self, short_caption_length: f32) -> Vec<PathCommand> {
        match self {
            Arrow::Straight(arrow) => arrow.outline(short_caption_length),
            Arrow::Arc(arrow) => arrow.outline(short_caption_length),
            Arrow::Loop(arrow) => arrow.outline(),
        }
    }

    pub fn overlay(&self, min_width: f32) -> Vec<PathCommand> {
        match self {
            Arrow::Straight(arrow) => arrow.overlay(min_width),
            Arrow::Arc(arrow) => arrow.overlay(min_width),
            Arrow::Loop(arrow) => arrow.overlay(min_width),
        }
    }

    /// Distance from `point`, given in the arrow's local frame, to the shaft.
    pub fn distance_to(&self, point: Vec2) -> f32 {
        match self {
            Arrow::Straight(arrow) => arrow.distance_to(point),
            Arrow::Arc(arrow) => arrow.distance_to(point),
            Arrow::Loop(arrow) => arrow.distance_to(point),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn points(path: &[PathCommand]) -> Vec<Vec2> {
        path.iter().filter_map(PathCommand::end_point).collect()
    }

    #[test]
    fn test_straight_arrow_dimensions() {
        let arrow = StraightArrow::new(25.0, 25.0, 200.0, 1.0, 7.0, 7.0, CaptionLayout::Internal);
        assert!((arrow.length - 150.0).abs() < 1e-4);
        assert!((arrow.shaft_length - 143.0).abs() < 1e-4);
        assert_eq!(arrow.mid_shaft_point(), Vec2::new(96.5, 0.0));

        let outline = arrow.outline(0.0);
        assert_eq!(outline.len(), 8);
        assert_eq!(outline.last(), Some(&PathCommand::Close));
        assert!(points(&outline).contains(&Vec2::new(175.0, 0.0)));
    }

    #[test]
    fn test_straight_external_caption_gap() {
        let arrow = StraightArrow::new(25.0, 25.0, 200.0, 1.0, 7.0, 7.0, CaptionLayout::External);
        let outline = arrow.outline(43.0);
        let closes = outline.iter().filter(|c| **c == PathCommand::Close).count();
        assert_eq!(closes, 2);
        // Shaft is 143 long starting at 25, the gap is centred on it
        assert!(points(&outline).contains(&Vec2::new(75.0, 0.5)));
        assert!(points(&outline).contains(&Vec2::new(118.0, 0.5)));
    }

    #[test]
    fn test_overlapping_nodes_draw_nothing() {
        let arrow = StraightArrow::new(30.0, 30.0, 40.0, 1.0, 7.0, 7.0, CaptionLayout::Internal);
        assert_eq!(arrow.shaft_length, 0.0);
        assert!(arrow.outline(10.0).is_empty());
        assert!(arrow.overlay(16.0).is_empty());
    }

    #[test]
    fn test_small_deflection_falls_back_to_straight() {
        let arrow = Arrow::arc(25.0, 25.0, 200.0, 0.01, 1.0, 7.0, 7.0, CaptionLayout::External);
        assert!(matches!(arrow, Arrow::Straight(_)));
        assert_eq!(arrow.deflection(), 0.0);
    }

    #[test]
    fn test_arc_attachments_touch_both_nodes() {
        let arrow = ArcArrow::new(25.0, 20.0, 200.0, 30.0, 1.0, 7.0, 7.0, CaptionLayout::External)
            .expect("arc between separated nodes");
        assert!((arrow.start_attach.length() - 25.0).abs() < 1e-3);
        assert!((arrow.tip.distance(Vec2::new(200.0, 0.0)) - 20.0).abs() < 1e-2);
        assert!((arrow.end_attach.distance(Vec2::new(200.0, 0.0)) - 27.0).abs() < 1e-2);
        assert!(arrow.shaft_length > 0.0);
        assert!((arrow.centre.distance(arrow.end_attach) - arrow.arc_radius).abs() < 1e-2);
    }

    #[test]
    fn test_opposite_deflections_mirror() {
        let up = ArcArrow::new(25.0, 25.0, 200.0, 30.0, 1.0, 7.0, 7.0, CaptionLayout::External)
            .expect("arc");
        let down = ArcArrow::new(25.0, 25.0, 200.0, -30.0, 1.0, 7.0, 7.0, CaptionLayout::External)
            .expect("arc");
        let (a, b) = (up.mid_shaft_point(), down.mid_shaft_point());
        assert!(a.y > 0.0 && b.y < 0.0);
        assert!((a.x - b.x).abs() < 1e-2);
        assert!((a.y + b.y).abs() < 1e-2);
        assert!((up.shaft_length - down.shaft_length).abs() < 1e-2);
    }

    #[test]
    fn test_arc_distance() {
        let arrow = ArcArrow::new(25.0, 25.0, 200.0, -30.0, 1.0, 7.0, 7.0, CaptionLayout::External)
            .expect("arc");
        let mid = arrow.mid_shaft_point();
        assert!(arrow.distance_to(mid) < 1e-2);
        assert!(arrow.distance_to(Vec2::new(100.0, 200.0)) > 50.0);
    }

    #[test]
    fn test_loop_dimensions() {
        let arrow = LoopArrow::new(25.0, 40.0, 30.0, 1.0, 7.0, 7.0, 8.0);
        let loop_radius = 65.0 * 15f32.to_radians().tan();
        assert!((arrow.shaft_length - (3.0 * loop_radius + 1.0)).abs() < 1e-3);

        let mid = arrow.mid_shaft_point();
        assert!(mid.y.abs() < 1e-4);
        assert!(mid.x > 65.0);

        let outline = arrow.outline();
        assert_eq!(outline.len(), 12);
        // Tip sits on the node boundary
        let tip = points(&outline)[5];
        assert!((tip.length() - 25.0).abs() < 1e-3);
        assert!(arrow.distance_to(tip) < 1e-3);
    }

    proptest! {
        #[test]
        fn prop_straight_arrow_never_inverts(
            start_radius in 0.0f32..60.0,
            end_radius in 0.0f32..60.0,
            centre_distance in 0.0f32..300.0,
            caption in 0.0f32..100.0,
        ) {
            let arrow = StraightArrow::new(
                start_radius, end_radius, centre_distance, 1.0, 7.0, 7.0, CaptionLayout::External,
            );
            prop_assert!(arrow.shaft_length >= 0.0);
            let outline = arrow.outline(caption);
            if centre_distance <= start_radius + end_radius {
                prop_assert!(outline.is_empty());
            }
            let max_x = start_radius + (centre_distance - start_radius - end_radius).max(0.0);
            for p in points(&outline) {
                prop_assert!(p.is_finite());
                prop_assert!(p.x >= start_radius - 1e-3 && p.x <= max_x + 1e-3);
            }
        }

        #[test]
        fn prop_arc_outline_is_finite(
            deflection in -75.0f32..75.0,
            centre_distance in 0.0f32..300.0,
        ) {
            let arrow = Arrow::arc(25.0, 25.0, centre_distance, deflection, 1.0, 7.0, 7.0, CaptionLayout::External);
            prop_assert!(arrow.shaft_length() >= 0.0);
            for p in points(&arrow.outline(20.0)) {
                prop_assert!(p.is_finite());
            }
        }
    }
}
