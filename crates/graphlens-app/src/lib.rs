pub mod dispatcher;
pub mod fetch;
pub mod handler;
pub mod scene;
pub mod settings;
pub mod viewport;
pub mod visualization;

pub use dispatcher::{
    Dispatch, DispatcherSettings, Gesture, InteractionDispatcher, PointerInput, PointerTarget,
};
pub use fetch::{
    ExpansionReply, ExpansionRequest, InMemoryFetcher, NeighbourFetcher, ThreadedFetcher,
};
pub use handler::GraphEventHandler;
pub use scene::{MenuItemShape, NodeShape, RecordingSink, RelationshipShape, RenderSink, Scene};
pub use settings::VisualizationSettings;
pub use viewport::Viewport;
pub use visualization::Visualization;

use crossbeam_channel::Receiver;
use graphlens_core::{QueryResult, RawRelationship};
use graphlens_events::{EventBus, GraphEvent, InteractionEvent, LegendItem, SelectedItem};
use graphlens_graph::{Node, Vec2};
use std::time::Instant;

const ZOOM_MODIFIER_HINT: &str = "Hold Ctrl or Cmd while scrolling to zoom";

/// Interactive graph view: pointer input in, frames and host events out.
pub struct GraphView {
    settings: VisualizationSettings,
    visualization: Visualization,
    dispatcher: InteractionDispatcher,
    handler: GraphEventHandler,
    bus: EventBus,
    hovered: PointerTarget,
    zoom_hint_shown: bool,
    /// Relationships that complete the picture among loaded nodes.
    completion: Vec<RawRelationship>,
}

impl GraphView {
    pub fn new(
        settings: VisualizationSettings,
        width: f32,
        height: f32,
        fetcher: Box<dyn NeighbourFetcher>,
    ) -> Self {
        let bus = EventBus::new();
        let mut handler = GraphEventHandler::new(bus.clone(), fetcher, settings.max_neighbours);
        handler.set_auto_complete(settings.auto_complete_relationships);
        Self {
            visualization: Visualization::new(&settings, width, height),
            dispatcher: InteractionDispatcher::new(DispatcherSettings::from(&settings)),
            handler,
            bus,
            hovered: PointerTarget::Canvas,
            zoom_hint_shown: false,
            completion: Vec::new(),
            settings,
        }
    }

    pub fn settings(&self) -> &VisualizationSettings {
        &self.settings
    }

    pub fn visualization(&self) -> &Visualization {
        &self.visualization
    }

    pub fn visualization_mut(&mut self) -> &mut Visualization {
        &mut self.visualization
    }

    pub fn handler(&self) -> &GraphEventHandler {
        &self.handler
    }

    pub fn selected_item(&self) -> &SelectedItem {
        self.handler.selected_item()
    }

    pub fn set_render_sink(&mut self, sink: Box<dyn RenderSink>) {
        self.visualization.set_render_sink(sink);
    }

    /// Receiver of host events. Every clone sees each event once in total.
    pub fn events(&self) -> Receiver<GraphEvent> {
        self.bus.receiver()
    }

    pub fn drain_events(&self) -> Vec<GraphEvent> {
        self.bus.drain()
    }

    /// Replace the graph with a fresh query result.
    ///
    /// `completion` holds relationships among the result's nodes that the
    /// query itself did not return.
    pub fn load(&mut self, result: QueryResult, completion: &[RawRelationship]) {
        let total = result.nodes.len();
        let limit = self.settings.initial_node_display;

        let model = self.visualization.model_mut();
        model.reset_graph();
        model.add_nodes(result.nodes.iter().take(limit).map(Node::from_raw));
        let explicit = model.map_relationships(&result.relationships);
        model.add_relationships(explicit);
        self.completion = completion.to_vec();
        if self.settings.auto_complete_relationships {
            let internal = model.map_relationships(&self.completion);
            model.add_internal_relationships(internal);
        }
        tracing::info!(
            "Loaded {} nodes and {} relationships",
            model.node_count(),
            model.relationship_count()
        );

        if total > limit {
            self.handler.status_message(format!(
                "Not all return nodes are being displayed due to the initial node display setting. Only first {} of {} nodes are displayed.",
                limit, total
            ));
        }
        self.visualization.precompute();
        self.handler.graph_model_changed(&self.visualization);
    }

    pub fn set_auto_complete(&mut self, enabled: bool) {
        self.settings.auto_complete_relationships = enabled;
        self.handler.set_auto_complete(enabled);
        let model = self.visualization.model_mut();
        if enabled {
            let internal = model.map_relationships(&self.completion);
            model.add_internal_relationships(internal);
        } else {
            let pruned = model.prune_internal_relationships();
            tracing::debug!("Pruned {} internal relationships", pruned);
        }
        self.visualization.graph_changed();
        self.handler.graph_model_changed(&self.visualization);
    }

    /// Feed a domain event directly, bypassing pointer translation.
    pub fn handle_event(&mut self, event: InteractionEvent) {
        self.handler.handle(&mut self.visualization, event);
    }

    /// Run the simulation to rest synchronously and draw one frame.
    pub fn settle(&mut self) {
        self.visualization.precompute();
    }

    fn dispatch(&mut self, dispatches: Vec<Dispatch>) {
        for dispatch in dispatches {
            match dispatch {
                Dispatch::Event(event) => self.handler.handle(&mut self.visualization, event),
                Dispatch::Gesture(gesture) => self.apply_gesture(gesture),
            }
        }
    }

    fn apply_gesture(&mut self, gesture: Gesture) {
        let vis = &mut self.visualization;
        match gesture {
            Gesture::DragStarted { node_id, pos } => vis.drag_started(&node_id, pos),
            Gesture::DragMoved { node_id, pos } => vis.drag_moved(&node_id, pos),
            Gesture::DragEnded { node_id } => vis.drag_ended(&node_id),
            Gesture::Pan { delta } => vis.pan_by(delta),
            Gesture::Zoom { factor, anchor } => vis.zoom_at(factor, anchor),
            Gesture::ZoomNeedsModifier => {
                if !self.zoom_hint_shown {
                    self.zoom_hint_shown = true;
                    self.handler.status_message(ZOOM_MODIFIER_HINT);
                }
            }
            Gesture::HoverChanged { target, entered } => match target {
                PointerTarget::Node(id) => vis.hover_node(&id, entered),
                PointerTarget::Relationship(id) => vis.hover_relationship(&id, entered),
                PointerTarget::MenuItem { .. } | PointerTarget::Canvas => {}
            },
        }
    }

    fn input(&mut self, input: PointerInput) {
        let dispatches = self.dispatcher.handle(input);
        self.dispatch(dispatches);
    }

    pub fn pointer_down(&mut self, pos: Vec2, at: Instant) {
        let target = self.visualization.hit_test(pos);
        self.input(PointerInput::Down { target, pos, at });
    }

    /// Pointer moved. Hover enter and leave are derived by hit testing, except
    /// while dragging.
    pub fn pointer_move(&mut self, pos: Vec2, at: Instant) {
        if !self.dispatcher.is_dragging() {
            let target = self.visualization.hit_test(pos);
            if target != self.hovered {
                let previous = std::mem::replace(&mut self.hovered, target.clone());
                if previous != PointerTarget::Canvas {
                    self.input(PointerInput::Out {
                        target: previous,
                        at,
                    });
                }
                if target != PointerTarget::Canvas {
                    self.input(PointerInput::Over { target, at });
                }
            }
        }
        self.input(PointerInput::Move { pos, at });
    }

    pub fn pointer_up(&mut self, pos: Vec2, at: Instant) {
        self.input(PointerInput::Up { pos, at });
    }

    pub fn wheel(&mut self, delta: f32, modifier: bool, pos: Vec2, at: Instant) {
        self.input(PointerInput::Wheel {
            delta,
            modifier,
            pos,
            at,
        });
    }

    /// Drive timers, expansion replies and the simulation. Returns whether a
    /// frame was drawn by the simulation.
    pub fn poll(&mut self, now: Instant) -> bool {
        let due = self.dispatcher.poll(now);
        self.dispatch(due);
        self.handler.poll_expansions(&mut self.visualization);
        self.visualization.tick()
    }

    /// Whether the host should keep calling [`GraphView::poll`].
    pub fn is_animating(&self) -> bool {
        self.visualization.simulation().is_running() || self.dispatcher.next_deadline().is_some()
    }

    pub fn legend_item_selected(&mut self, item: LegendItem) {
        self.handler.legend_item_selected(item);
    }

    pub fn zoom_in(&mut self) {
        self.visualization.zoom_in();
    }

    pub fn zoom_out(&mut self) {
        self.visualization.zoom_out();
    }

    pub fn zoom_to_fit(&mut self) {
        self.visualization.zoom_to_fit();
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.visualization.resize(width, height);
    }
}
