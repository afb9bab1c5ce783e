use crate::dispatcher::PointerTarget;
use crate::scene::{MenuItemShape, NodeShape, RelationshipShape, RenderSink, Scene, caption_flipped};
use crate::settings::VisualizationSettings;
use crate::viewport::Viewport;
use graphlens_core::{NodeId, RelationshipId};
use graphlens_events::MenuAction;
use graphlens_graph::style::{
    DEFAULT_NODE_BORDER_COLOR, DEFAULT_NODE_COLOR, DEFAULT_RELATIONSHIP_COLOR,
};
use graphlens_graph::{
    ApproximateTextMeasure, CaptionLayout, ForceSimulation, GraphModel, GraphStyle, HitResult,
    HitTester, PairwiseArcsRouter, StyleLookup, TextMeasure, Vec2, distribute_circular,
    measure_nodes,
};
use std::collections::BTreeMap;

pub const MENU_ITEM_RADIUS: f32 = 12.0;
/// Gap between a node's rim and its menu items.
const MENU_RING_GAP: f32 = 6.0;
const MENU_MIN_SEPARATION: f32 = 40.0;
/// Preferred headings of the menu items, in degrees, clockwise from +x.
const MENU_PREFERRED_ANGLES: [f32; 3] = [270.0, 30.0, 150.0];
/// Picking width of relationship overlays.
const OVERLAY_WIDTH: f32 = 16.0;
/// Screen padding used by zoom to fit.
const FIT_PADDING: f32 = 40.0;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum RingSlot {
    Item(usize),
    Relationship(usize),
}

/// Binds the graph model, layout and simulation to drawable frames.
pub struct Visualization {
    model: GraphModel,
    style: Box<dyn StyleLookup>,
    measure: Box<dyn TextMeasure>,
    router: PairwiseArcsRouter,
    simulation: ForceSimulation,
    viewport: Viewport,
    hit_tester: HitTester,
    sink: Option<Box<dyn RenderSink>>,
    minify_zoom_threshold: f32,
    hovered_menu_item: Option<(NodeId, MenuAction)>,
    frames: usize,
}

impl Visualization {
    pub fn new(settings: &VisualizationSettings, width: f32, height: f32) -> Self {
        Self {
            model: GraphModel::new(),
            style: Box::new(GraphStyle::new()),
            measure: Box::new(ApproximateTextMeasure::default()),
            router: PairwiseArcsRouter::default(),
            simulation: ForceSimulation::new(settings.simulation.clone()),
            viewport: Viewport::new(width, height).with_zoom_limits(
                settings.zoom_min,
                settings.zoom_max,
                settings.zoom_step,
            ),
            hit_tester: HitTester::new(),
            sink: None,
            minify_zoom_threshold: settings.minify_zoom_threshold,
            hovered_menu_item: None,
            frames: 0,
        }
    }

    pub fn set_style(&mut self, style: Box<dyn StyleLookup>) {
        self.style = style;
    }

    pub fn set_text_measure(&mut self, measure: Box<dyn TextMeasure>) {
        self.measure = measure;
    }

    pub fn set_render_sink(&mut self, sink: Box<dyn RenderSink>) {
        self.sink = Some(sink);
    }

    pub fn model(&self) -> &GraphModel {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut GraphModel {
        &mut self.model
    }

    pub fn simulation(&self) -> &ForceSimulation {
        &self.simulation
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Number of frames handed to the render sink so far.
    pub fn frames(&self) -> usize {
        self.frames
    }

    fn measure(&mut self) {
        let minified = self.viewport.scale() < self.minify_zoom_threshold;
        for node in self.model.nodes_mut() {
            node.minified = minified;
        }
        measure_nodes(&mut self.model, self.style.as_ref(), self.measure.as_ref());
    }

    fn layout(&mut self) {
        self.router
            .layout_relationships(&mut self.model, self.style.as_ref(), self.measure.as_ref());
    }

    /// Topology changed: re-measure, reheat the simulation and redraw.
    pub fn graph_changed(&mut self) {
        self.measure();
        self.simulation.seed_positions(&mut self.model);
        self.simulation.restart();
        self.layout();
        self.render();
    }

    /// Settle the layout before the first paint.
    pub fn precompute(&mut self) {
        self.measure();
        self.simulation.precompute(&mut self.model);
        self.layout();
        self.render();
    }

    /// Advance the simulation by one batch. Returns whether a frame was drawn.
    pub fn tick(&mut self) -> bool {
        if !self.simulation.tick(&mut self.model) {
            return false;
        }
        self.layout();
        self.render();
        true
    }

    /// Redraw after a state change that does not move anything.
    pub fn refresh(&mut self) {
        self.layout();
        self.render();
    }

    pub fn render(&mut self) {
        let scene = self.scene();
        if let Some(sink) = self.sink.as_mut() {
            sink.render(&scene);
        }
        self.frames += 1;
    }

    pub fn scene(&self) -> Scene {
        Scene {
            width: self.viewport.width(),
            height: self.viewport.height(),
            translation: self.viewport.translation(),
            scale: self.viewport.scale(),
            relationships: self.relationship_shapes(),
            nodes: self.node_shapes(),
            menu_items: self.menu_items(),
        }
    }

    fn node_shapes(&self) -> Vec<NodeShape> {
        self.model
            .nodes()
            .iter()
            .filter_map(|node| {
                let centre = node.position?;
                let props = self.style.for_node(node);
                Some(NodeShape {
                    id: node.id().clone(),
                    centre,
                    radius: node.radius,
                    fill: props.get("color").unwrap_or(DEFAULT_NODE_COLOR).to_string(),
                    stroke: props
                        .get("border-color")
                        .unwrap_or(DEFAULT_NODE_BORDER_COLOR)
                        .to_string(),
                    stroke_width: props.number_or("border-width", 2.0),
                    text_color: props
                        .get("text-color-internal")
                        .unwrap_or("#FFFFFF")
                        .to_string(),
                    font_size: props.number_or("font-size", 10.0),
                    caption: node.caption.clone(),
                    selected: node.selected,
                    hovered: node.hovered,
                    fixed: node.fixed,
                })
            })
            .collect()
    }

    fn relationship_shapes(&self) -> Vec<RelationshipShape> {
        self.model
            .relationships()
            .iter()
            .filter_map(|rel| {
                let arrow = rel.geometry.arrow.as_ref()?;
                let origin = self.model.find_node(&rel.source)?.position?;
                let props = self.style.for_relationship(rel);
                let geometry = &rel.geometry;
                let layout = arrow.caption_layout();
                let text_key = match layout {
                    CaptionLayout::Internal => "text-color-internal",
                    CaptionLayout::External => "text-color-external",
                };
                let mid = arrow.mid_shaft_point();
                Some(RelationshipShape {
                    id: rel.id().clone(),
                    origin,
                    angle: geometry.natural_angle,
                    outline: arrow.outline(geometry.short_caption_length),
                    overlay: arrow.overlay(OVERLAY_WIDTH),
                    color: props
                        .get("color")
                        .unwrap_or(DEFAULT_RELATIONSHIP_COLOR)
                        .to_string(),
                    caption: geometry.short_caption.clone(),
                    caption_position: Vec2::new(mid.x, mid.y + geometry.font_size / 3.0),
                    caption_rotation: if caption_flipped(geometry.natural_angle) {
                        180.0
                    } else {
                        0.0
                    },
                    caption_layout: layout,
                    text_color: props.get(text_key).unwrap_or("#000000").to_string(),
                    font_size: geometry.font_size,
                    selected: rel.selected,
                    hovered: rel.hovered,
                })
            })
            .collect()
    }

    /// Ring menu around the selected node, steered clear of its relationships.
    pub fn menu_items(&self) -> Vec<MenuItemShape> {
        let Some(node) = self.model.selected_node() else {
            return Vec::new();
        };
        let Some(centre) = node.position else {
            return Vec::new();
        };

        let floating: BTreeMap<RingSlot, f32> = MENU_PREFERRED_ANGLES
            .iter()
            .enumerate()
            .map(|(index, &angle)| (RingSlot::Item(index), angle))
            .collect();
        let fixed: BTreeMap<RingSlot, f32> = self
            .model
            .relationships_of(node.id())
            .enumerate()
            .filter_map(|(index, rel)| {
                let heading = if rel.is_loop() {
                    rel.geometry.natural_angle
                } else {
                    let other = if &rel.source == node.id() {
                        &rel.target
                    } else {
                        &rel.source
                    };
                    (self.model.find_node(other)?.position? - centre).angle_degrees()
                };
                Some((RingSlot::Relationship(index), heading))
            })
            .collect();

        let layout = distribute_circular(&floating, &fixed, MENU_MIN_SEPARATION);
        let reach = node.radius + MENU_RING_GAP + MENU_ITEM_RADIUS;

        MenuAction::ALL
            .iter()
            .enumerate()
            .map(|(index, &action)| {
                let angle = layout
                    .angles
                    .get(&RingSlot::Item(index))
                    .copied()
                    .unwrap_or(MENU_PREFERRED_ANGLES[index]);
                MenuItemShape {
                    node_id: node.id().clone(),
                    action,
                    centre: centre + Vec2::from_angle(angle) * reach,
                    radius: MENU_ITEM_RADIUS,
                    label: action.label().to_string(),
                    hovered: self
                        .hovered_menu_item
                        .as_ref()
                        .is_some_and(|(id, hovered)| id == node.id() && *hovered == action),
                }
            })
            .collect()
    }

    pub fn set_hovered_menu_item(&mut self, item: Option<(NodeId, MenuAction)>) {
        self.hovered_menu_item = item;
        self.render();
    }

    /// Element under a screen position: menu item, then node, then relationship.
    pub fn hit_test(&self, screen: Vec2) -> PointerTarget {
        let world = self.viewport.screen_to_world(screen);
        if let Some(item) = self
            .menu_items()
            .into_iter()
            .find(|item| item.centre.distance(world) <= item.radius)
        {
            return PointerTarget::MenuItem {
                node_id: item.node_id,
                action: item.action,
            };
        }
        match self.hit_tester.hit_test(&self.model, world) {
            HitResult::Node(id) => PointerTarget::Node(id),
            HitResult::Relationship(id) => PointerTarget::Relationship(id),
            HitResult::None => PointerTarget::Canvas,
        }
    }

    fn after_zoom(&mut self, changed: bool) {
        if changed {
            self.measure();
            self.layout();
        }
        self.render();
    }

    pub fn zoom_at(&mut self, factor: f32, anchor: Vec2) {
        let changed = self.viewport.zoom_at(factor, anchor);
        self.after_zoom(changed);
    }

    pub fn zoom_in(&mut self) {
        let changed = self.viewport.zoom_in();
        self.after_zoom(changed);
    }

    pub fn zoom_out(&mut self) {
        let changed = self.viewport.zoom_out();
        self.after_zoom(changed);
    }

    pub fn zoom_to_fit(&mut self) {
        let Some((min, max)) = self.bounds() else {
            return;
        };
        self.viewport.zoom_to_fit(min, max, FIT_PADDING);
        self.after_zoom(true);
    }

    pub fn pan_by(&mut self, screen_delta: Vec2) {
        self.viewport.pan_by(screen_delta);
        self.render();
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.viewport.resize(width, height);
        self.render();
    }

    /// World rectangle covering every placed node.
    pub fn bounds(&self) -> Option<(Vec2, Vec2)> {
        let mut placed = self
            .model
            .nodes()
            .iter()
            .filter_map(|node| node.position.map(|p| (p, node.radius)));
        let (first, radius) = placed.next()?;
        let reach = Vec2::new(radius, radius);
        let init = (first - reach, first + reach);
        Some(placed.fold(init, |(min, max), (p, r)| {
            (
                Vec2::new(min.x.min(p.x - r), min.y.min(p.y - r)),
                Vec2::new(max.x.max(p.x + r), max.y.max(p.y + r)),
            )
        }))
    }

    /// Start dragging: the node becomes fixed and follows the pointer.
    pub fn drag_started(&mut self, id: &NodeId, screen: Vec2) {
        let world = self.viewport.screen_to_world(screen);
        let Some(node) = self.model.find_node_mut(id) else {
            tracing::warn!("Drag started on unknown node {}", id);
            return;
        };
        node.fixed = true;
        node.pin_at(world);
        self.simulation.drag_started();
        self.refresh();
    }

    pub fn drag_moved(&mut self, id: &NodeId, screen: Vec2) {
        let world = self.viewport.screen_to_world(screen);
        if let Some(node) = self.model.find_node_mut(id) {
            node.pin_at(world);
            self.refresh();
        }
    }

    /// The node stays pinned where it was dropped.
    pub fn drag_ended(&mut self, _id: &NodeId) {
        self.simulation.drag_ended();
    }

    /// Visual hover state. An unfixed node is held in place while hovered.
    pub fn hover_node(&mut self, id: &NodeId, entered: bool) {
        let Some(node) = self.model.find_node_mut(id) else {
            return;
        };
        node.hovered = entered;
        if !node.fixed {
            match (entered, node.position) {
                (true, Some(position)) => node.pin_at(position),
                _ => node.unpin(),
            }
        }
        self.render();
    }

    pub fn hover_relationship(&mut self, id: &RelationshipId, entered: bool) {
        if let Some(rel) = self.model.find_relationship_mut(id) {
            rel.hovered = entered;
            self.render();
        }
    }

    /// Release a dragged node back to the simulation.
    pub fn unlock(&mut self, id: &NodeId) {
        if let Some(node) = self.model.find_node_mut(id) {
            node.unpin();
            self.render();
        }
    }
}
