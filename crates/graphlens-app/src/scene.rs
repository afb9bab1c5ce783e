//! Renderer-agnostic drawable primitives produced for every frame.

use graphlens_core::{NodeId, RelationshipId};
use graphlens_events::MenuAction;
use graphlens_graph::{CaptionLayout, CaptionLine, PathCommand, Vec2, to_svg_path};
use parking_lot::Mutex;
use serde::Serialize;
use std::fmt::Write;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeShape {
    pub id: NodeId,
    pub centre: Vec2,
    pub radius: f32,
    pub fill: String,
    pub stroke: String,
    pub stroke_width: f32,
    pub text_color: String,
    pub font_size: f32,
    pub caption: Vec<CaptionLine>,
    pub selected: bool,
    pub hovered: bool,
    pub fixed: bool,
}

/// A relationship drawn in its local frame: translate to `origin`, then rotate
/// by `angle` degrees.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelationshipShape {
    pub id: RelationshipId,
    pub origin: Vec2,
    pub angle: f32,
    pub outline: Vec<PathCommand>,
    /// Wider invisible path used for picking and the selection halo.
    pub overlay: Vec<PathCommand>,
    pub color: String,
    pub caption: String,
    pub caption_position: Vec2,
    /// Extra caption rotation, 180 when the caption would read upside down.
    pub caption_rotation: f32,
    pub caption_layout: CaptionLayout,
    pub text_color: String,
    pub font_size: f32,
    pub selected: bool,
    pub hovered: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MenuItemShape {
    pub node_id: NodeId,
    pub action: MenuAction,
    pub centre: Vec2,
    pub radius: f32,
    pub label: String,
    pub hovered: bool,
}

/// Everything needed to paint one frame. Shapes are in world coordinates.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Scene {
    pub width: f32,
    pub height: f32,
    pub translation: Vec2,
    pub scale: f32,
    pub relationships: Vec<RelationshipShape>,
    pub nodes: Vec<NodeShape>,
    pub menu_items: Vec<MenuItemShape>,
}

/// Whether text along `angle` would read upside down.
pub fn caption_flipped(angle: f32) -> bool {
    let angle = graphlens_graph::normalize_degrees(angle);
    angle > 90.0 && angle < 270.0
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

impl Scene {
    pub fn node(&self, id: &NodeId) -> Option<&NodeShape> {
        self.nodes.iter().find(|shape| &shape.id == id)
    }

    pub fn relationship(&self, id: &RelationshipId) -> Option<&RelationshipShape> {
        self.relationships.iter().find(|shape| &shape.id == id)
    }

    /// Standalone SVG document for the frame.
    pub fn to_svg(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail
        let _ = writeln!(
            out,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}" viewBox="0 0 {} {}">"#,
            self.width, self.height, self.width, self.height
        );
        let _ = writeln!(
            out,
            r#"<g transform="translate({} {}) scale({})">"#,
            self.translation.x, self.translation.y, self.scale
        );

        for rel in &self.relationships {
            self.write_relationship(&mut out, rel);
        }
        for node in &self.nodes {
            self.write_node(&mut out, node);
        }
        for item in &self.menu_items {
            let _ = writeln!(
                out,
                r##"<g class="menu-item"><circle cx="{}" cy="{}" r="{}" fill="{}"/><title>{}</title></g>"##,
                item.centre.x,
                item.centre.y,
                item.radius,
                if item.hovered { "#D2D5DA" } else { "#F4F5F7" },
                escape_xml(&item.label)
            );
        }

        out.push_str("</g>\n</svg>\n");
        out
    }

    fn write_relationship(&self, out: &mut String, rel: &RelationshipShape) {
        let _ = writeln!(
            out,
            r#"<g class="relationship" transform="translate({} {}) rotate({})">"#,
            rel.origin.x, rel.origin.y, rel.angle
        );
        if rel.selected || rel.hovered {
            let _ = writeln!(
                out,
                r##"<path class="overlay" d="{}" fill="#6AC6FF" fill-opacity="0.5"/>"##,
                to_svg_path(&rel.overlay)
            );
        }
        let _ = writeln!(
            out,
            r#"<path class="outline" d="{}" fill="{}"/>"#,
            to_svg_path(&rel.outline),
            rel.color
        );
        if !rel.caption.is_empty() {
            let _ = writeln!(
                out,
                r#"<text x="{}" y="{}" font-size="{}" fill="{}" text-anchor="middle" transform="rotate({} {} {})">{}</text>"#,
                rel.caption_position.x,
                rel.caption_position.y,
                rel.font_size,
                rel.text_color,
                rel.caption_rotation,
                rel.caption_position.x,
                rel.caption_position.y,
                escape_xml(&rel.caption)
            );
        }
        out.push_str("</g>\n");
    }

    fn write_node(&self, out: &mut String, node: &NodeShape) {
        let _ = writeln!(
            out,
            r#"<g class="node" transform="translate({} {})">"#,
            node.centre.x, node.centre.y
        );
        if node.selected || node.hovered {
            let _ = writeln!(
                out,
                r##"<circle class="ring" r="{}" fill="none" stroke="#6AC6FF" stroke-width="8" stroke-opacity="0.5"/>"##,
                node.radius + 4.0
            );
        }
        let _ = writeln!(
            out,
            r#"<circle r="{}" fill="{}" stroke="{}" stroke-width="{}"/>"#,
            node.radius, node.fill, node.stroke, node.stroke_width
        );
        for line in &node.caption {
            let _ = writeln!(
                out,
                r#"<text y="{}" font-size="{}" fill="{}" text-anchor="middle">{}</text>"#,
                line.baseline,
                node.font_size,
                node.text_color,
                escape_xml(&line.text)
            );
        }
        out.push_str("</g>\n");
    }
}

/// Drawing backend receiving a scene after each render.
pub trait RenderSink {
    fn render(&mut self, scene: &Scene);
}

/// Keeps every rendered frame. Clones share the same frame list, so one handle
/// can be given to the view while another inspects the frames.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    frames: Arc<Mutex<Vec<Scene>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frame_count(&self) -> usize {
        self.frames.lock().len()
    }

    pub fn last_frame(&self) -> Option<Scene> {
        self.frames.lock().last().cloned()
    }

    pub fn clear(&self) {
        self.frames.lock().clear();
    }
}

impl RenderSink for RecordingSink {
    fn render(&mut self, scene: &Scene) {
        self.frames.lock().push(scene.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node_shape(id: &str, caption: &str) -> NodeShape {
        NodeShape {
            id: NodeId::from(id),
            centre: Vec2::new(10.0, 20.0),
            radius: 25.0,
            fill: "#A5ABB6".into(),
            stroke: "#9AA1AC".into(),
            stroke_width: 2.0,
            text_color: "#FFFFFF".into(),
            font_size: 10.0,
            caption: vec![CaptionLine {
                text: caption.into(),
                baseline: 5.0,
                remaining_width: 0.0,
            }],
            selected: false,
            hovered: false,
            fixed: false,
        }
    }

    #[test]
    fn test_caption_flip_range() {
        assert!(!caption_flipped(0.0));
        assert!(!caption_flipped(90.0));
        assert!(caption_flipped(135.0));
        assert!(caption_flipped(-100.0));
        assert!(!caption_flipped(270.0));
        assert!(!caption_flipped(300.0));
    }

    #[test]
    fn test_svg_contains_nodes_and_escapes_text() {
        let scene = Scene {
            width: 200.0,
            height: 100.0,
            scale: 1.0,
            nodes: vec![node_shape("a", "Tom & Jerry")],
            ..Default::default()
        };
        let svg = scene.to_svg();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains(r#"transform="translate(10 20)""#));
        assert!(svg.contains("Tom &amp; Jerry"));
        assert!(svg.trim_end().ends_with("</svg>"));
    }

    #[test]
    fn test_recording_sink_shares_frames() {
        let sink = RecordingSink::new();
        let mut handle = sink.clone();
        handle.render(&Scene::default());
        handle.render(&Scene {
            width: 5.0,
            ..Default::default()
        });
        assert_eq!(sink.frame_count(), 2);
        assert_eq!(sink.last_frame().map(|scene| scene.width), Some(5.0));
    }
}
