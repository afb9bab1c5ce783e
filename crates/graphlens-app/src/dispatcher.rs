//! Translation of raw pointer input into domain events and view gestures.
//!
//! The dispatcher holds no graph state. Time is passed in with every input so
//! the click, double-click and hover timers are driven by the host loop.

use crate::settings::VisualizationSettings;
use graphlens_core::{NodeId, RelationshipId};
use graphlens_events::{InteractionEvent, MenuAction};
use graphlens_graph::Vec2;
use std::time::{Duration, Instant};

/// Rendered element under the pointer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PointerTarget {
    Canvas,
    Node(NodeId),
    Relationship(RelationshipId),
    MenuItem { node_id: NodeId, action: MenuAction },
}

/// Low-level pointer input. Positions are in screen coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum PointerInput {
    Down {
        target: PointerTarget,
        pos: Vec2,
        at: Instant,
    },
    Move {
        pos: Vec2,
        at: Instant,
    },
    Up {
        pos: Vec2,
        at: Instant,
    },
    Over {
        target: PointerTarget,
        at: Instant,
    },
    Out {
        target: PointerTarget,
        at: Instant,
    },
    Wheel {
        delta: f32,
        modifier: bool,
        pos: Vec2,
        at: Instant,
    },
}

impl PointerInput {
    pub fn at(&self) -> Instant {
        match self {
            PointerInput::Down { at, .. }
            | PointerInput::Move { at, .. }
            | PointerInput::Up { at, .. }
            | PointerInput::Over { at, .. }
            | PointerInput::Out { at, .. }
            | PointerInput::Wheel { at, .. } => *at,
        }
    }
}

/// View manipulations that are not part of the domain vocabulary.
#[derive(Debug, Clone, PartialEq)]
pub enum Gesture {
    DragStarted { node_id: NodeId, pos: Vec2 },
    DragMoved { node_id: NodeId, pos: Vec2 },
    DragEnded { node_id: NodeId },
    Pan { delta: Vec2 },
    Zoom { factor: f32, anchor: Vec2 },
    /// Wheel used without the required modifier key.
    ZoomNeedsModifier,
    /// Immediate visual hover feedback, ahead of the debounced event.
    HoverChanged { target: PointerTarget, entered: bool },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    Event(InteractionEvent),
    Gesture(Gesture),
}

#[derive(Debug, Clone)]
pub struct DispatcherSettings {
    pub double_click: Duration,
    pub hover_debounce: Duration,
    pub drag_tolerance: f32,
    pub zoom_step: f32,
    pub wheel_requires_modifier: bool,
}

impl Default for DispatcherSettings {
    fn default() -> Self {
        Self::from(&VisualizationSettings::default())
    }
}

impl From<&VisualizationSettings> for DispatcherSettings {
    fn from(settings: &VisualizationSettings) -> Self {
        Self {
            double_click: settings.double_click_window(),
            hover_debounce: settings.hover_debounce(),
            drag_tolerance: settings.drag_tolerance_px,
            zoom_step: settings.zoom_step,
            wheel_requires_modifier: settings.wheel_zoom_requires_modifier,
        }
    }
}

#[derive(Debug, Clone)]
struct Press {
    target: PointerTarget,
    origin: Vec2,
    last: Vec2,
    dragging: bool,
}

#[derive(Debug, Clone)]
struct PendingClick {
    node_id: NodeId,
    at: Instant,
}

#[derive(Debug, Default)]
pub struct InteractionDispatcher {
    settings: DispatcherSettings,
    press: Option<Press>,
    pending_click: Option<PendingClick>,
    pending_hover: Option<(InteractionEvent, Instant)>,
}

impl InteractionDispatcher {
    pub fn new(settings: DispatcherSettings) -> Self {
        Self {
            settings,
            ..Default::default()
        }
    }

    pub fn settings(&self) -> &DispatcherSettings {
        &self.settings
    }

    pub fn is_dragging(&self) -> bool {
        self.press.as_ref().is_some_and(|press| press.dragging)
    }

    /// When `poll` next has something to flush.
    pub fn next_deadline(&self) -> Option<Instant> {
        let click = self
            .pending_click
            .as_ref()
            .map(|pending| pending.at + self.settings.double_click);
        let hover = self
            .pending_hover
            .as_ref()
            .map(|(_, at)| *at + self.settings.hover_debounce);
        match (click, hover) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    pub fn handle(&mut self, input: PointerInput) -> Vec<Dispatch> {
        let mut out = self.poll(input.at());

        match input {
            PointerInput::Down { target, pos, .. } => {
                self.press = Some(Press {
                    target,
                    origin: pos,
                    last: pos,
                    dragging: false,
                });
            }
            PointerInput::Move { pos, .. } => self.pointer_moved(pos, &mut out),
            PointerInput::Up { at, .. } => {
                if let Some(press) = self.press.take() {
                    if press.dragging {
                        if let PointerTarget::Node(node_id) = press.target {
                            out.push(Dispatch::Gesture(Gesture::DragEnded { node_id }));
                        }
                    } else {
                        self.clicked(press.target, at, &mut out);
                    }
                }
            }
            PointerInput::Over { target, at } => self.hovered(target, true, at, &mut out),
            PointerInput::Out { target, at } => self.hovered(target, false, at, &mut out),
            PointerInput::Wheel {
                delta,
                modifier,
                pos,
                ..
            } => {
                if delta == 0.0 {
                    return out;
                }
                if self.settings.wheel_requires_modifier && !modifier {
                    out.push(Dispatch::Gesture(Gesture::ZoomNeedsModifier));
                    return out;
                }
                let factor = if delta < 0.0 {
                    self.settings.zoom_step
                } else {
                    1.0 / self.settings.zoom_step
                };
                out.push(Dispatch::Gesture(Gesture::Zoom {
                    factor,
                    anchor: pos,
                }));
            }
        }

        out
    }

    /// Flush the single click and hover events whose timers ran out by `now`.
    pub fn poll(&mut self, now: Instant) -> Vec<Dispatch> {
        let mut out = Vec::new();

        let click_due = self
            .pending_click
            .as_ref()
            .is_some_and(|pending| now.duration_since(pending.at) > self.settings.double_click);
        if click_due {
            self.flush_click(&mut out);
        }

        let hover_due = self
            .pending_hover
            .as_ref()
            .is_some_and(|(_, at)| now.duration_since(*at) >= self.settings.hover_debounce);
        if hover_due && let Some((event, _)) = self.pending_hover.take() {
            out.push(Dispatch::Event(event));
        }

        out
    }

    fn pointer_moved(&mut self, pos: Vec2, out: &mut Vec<Dispatch>) {
        let Some(press) = self.press.as_mut() else {
            return;
        };

        if !press.dragging {
            if press.origin.distance(pos) <= self.settings.drag_tolerance {
                return;
            }
            press.dragging = true;
            match &press.target {
                PointerTarget::Node(node_id) => {
                    out.push(Dispatch::Gesture(Gesture::DragStarted {
                        node_id: node_id.clone(),
                        pos,
                    }));
                }
                PointerTarget::Canvas => {
                    out.push(Dispatch::Gesture(Gesture::Pan {
                        delta: pos - press.last,
                    }));
                }
                _ => {}
            }
            press.last = pos;
            return;
        }

        match &press.target {
            PointerTarget::Node(node_id) => {
                out.push(Dispatch::Gesture(Gesture::DragMoved {
                    node_id: node_id.clone(),
                    pos,
                }));
            }
            PointerTarget::Canvas => {
                out.push(Dispatch::Gesture(Gesture::Pan {
                    delta: pos - press.last,
                }));
            }
            _ => {}
        }
        press.last = pos;
    }

    fn flush_click(&mut self, out: &mut Vec<Dispatch>) {
        if let Some(pending) = self.pending_click.take() {
            out.push(Dispatch::Event(InteractionEvent::NodeClicked(
                pending.node_id,
            )));
        }
    }

    fn clicked(&mut self, target: PointerTarget, at: Instant, out: &mut Vec<Dispatch>) {
        let event = match target {
            PointerTarget::Node(node_id) => {
                if let Some(pending) = self.pending_click.take() {
                    if pending.node_id == node_id
                        && at.duration_since(pending.at) <= self.settings.double_click
                    {
                        out.push(Dispatch::Event(InteractionEvent::NodeDblClicked(node_id)));
                        return;
                    }
                    out.push(Dispatch::Event(InteractionEvent::NodeClicked(
                        pending.node_id,
                    )));
                }
                self.pending_click = Some(PendingClick { node_id, at });
                return;
            }
            PointerTarget::Relationship(rel_id) => InteractionEvent::RelationshipClicked(rel_id),
            PointerTarget::Canvas => InteractionEvent::CanvasClicked,
            PointerTarget::MenuItem { node_id, action } => match action {
                MenuAction::Unlock => InteractionEvent::NodeUnlock(node_id),
                MenuAction::ExpandCollapse => InteractionEvent::NodeDblClicked(node_id),
                MenuAction::Dismiss => InteractionEvent::NodeClose(node_id),
            },
        };
        self.flush_click(out);
        out.push(Dispatch::Event(event));
    }

    fn hovered(
        &mut self,
        target: PointerTarget,
        entered: bool,
        at: Instant,
        out: &mut Vec<Dispatch>,
    ) {
        let event = match (&target, entered) {
            (PointerTarget::Node(id), true) => Some(InteractionEvent::NodeMouseOver(id.clone())),
            (PointerTarget::Node(id), false) => Some(InteractionEvent::NodeMouseOut(id.clone())),
            (PointerTarget::Relationship(id), true) => {
                Some(InteractionEvent::RelMouseOver(id.clone()))
            }
            (PointerTarget::Relationship(id), false) => {
                Some(InteractionEvent::RelMouseOut(id.clone()))
            }
            (PointerTarget::MenuItem { node_id, action }, true) => {
                Some(InteractionEvent::MenuItemMouseOver {
                    node_id: node_id.clone(),
                    action: *action,
                })
            }
            (PointerTarget::MenuItem { node_id, action }, false) => {
                Some(InteractionEvent::MenuItemMouseOut {
                    node_id: node_id.clone(),
                    action: *action,
                })
            }
            (PointerTarget::Canvas, _) => None,
        };

        out.push(Dispatch::Gesture(Gesture::HoverChanged { target, entered }));
        // Trailing debounce: only the latest hover change survives the window
        if let Some(event) = event {
            self.pending_hover = Some((event, at));
        }
    }
}
