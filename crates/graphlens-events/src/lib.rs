use crossbeam_channel::{Receiver, Sender, unbounded};
use graphlens_core::{NodeId, RelationshipId};
use serde::{Deserialize, Serialize};

pub mod payload;

pub use payload::{
    ALL_BUCKET, BucketStats, GraphStats, LegendItem, MenuAction, NodeItem, RelationshipItem,
    SelectedItem,
};

/// Domain events produced by the interaction dispatcher from pointer input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InteractionEvent {
    NodeClicked(NodeId),
    NodeDblClicked(NodeId),
    NodeMouseOver(NodeId),
    NodeMouseOut(NodeId),
    RelationshipClicked(RelationshipId),
    RelMouseOver(RelationshipId),
    RelMouseOut(RelationshipId),
    CanvasClicked,
    NodeUnlock(NodeId),
    NodeClose(NodeId),
    MenuItemMouseOver { node_id: NodeId, action: MenuAction },
    MenuItemMouseOut { node_id: NodeId, action: MenuAction },
}

/// Events pushed to the host UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GraphEvent {
    ItemSelected(SelectedItem),
    ItemHovered(SelectedItem),
    GraphModelChanged(GraphStats),
    ExpansionRequested { node_id: NodeId },
    ExpansionCompleted { node_id: NodeId, added_nodes: usize },
}

#[derive(Clone)]
pub struct EventBus {
    tx: Sender<GraphEvent>,
    rx: Receiver<GraphEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    pub fn sender(&self) -> Sender<GraphEvent> {
        self.tx.clone()
    }

    pub fn receiver(&self) -> Receiver<GraphEvent> {
        self.rx.clone()
    }

    pub fn publish(&self, event: GraphEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!("Graph event dropped, no receiver left");
        }
    }

    /// Drain every pending event into `listener`.
    pub fn dispatch_to<L: EventListener>(&self, listener: &mut L) {
        while let Ok(event) = self.rx.try_recv() {
            listener.handle_event(&event);
        }
    }

    pub fn drain(&self) -> Vec<GraphEvent> {
        self.rx.try_iter().collect()
    }
}

/// Host-side consumer of graph events.
pub trait EventListener {
    fn handle_event(&mut self, event: &GraphEvent);
}
