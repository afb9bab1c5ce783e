//! Selection, hover and expansion state machine behind the domain events.

use crate::fetch::{ExpansionReply, ExpansionRequest, NeighbourFetcher};
use crate::visualization::Visualization;
use crossbeam_channel::{Receiver, Sender, unbounded};
use graphlens_core::{NodeId, RelationshipId};
use graphlens_events::{
    EventBus, GraphEvent, InteractionEvent, LegendItem, MenuAction, NodeItem, RelationshipItem,
    SelectedItem,
};
use graphlens_graph::{Node, Relationship, graph_stats};
use std::collections::HashSet;

fn node_item(node: &Node) -> SelectedItem {
    SelectedItem::Node(NodeItem {
        id: node.id().clone(),
        labels: node.labels.clone(),
        properties: node.property_list(),
    })
}

fn relationship_item(rel: &Relationship) -> SelectedItem {
    SelectedItem::Relationship(RelationshipItem {
        id: rel.id().clone(),
        rel_type: rel.rel_type.clone(),
        properties: rel.property_list(),
    })
}

pub struct GraphEventHandler {
    bus: EventBus,
    fetcher: Box<dyn NeighbourFetcher>,
    reply_tx: Sender<ExpansionReply>,
    reply_rx: Receiver<ExpansionReply>,
    /// Nodes with an expansion in flight.
    pending: HashSet<NodeId>,
    selected_item: SelectedItem,
    hovered_item: SelectedItem,
    max_neighbours: usize,
    auto_complete: bool,
}

impl GraphEventHandler {
    pub fn new(bus: EventBus, fetcher: Box<dyn NeighbourFetcher>, max_neighbours: usize) -> Self {
        let (reply_tx, reply_rx) = unbounded();
        Self {
            bus,
            fetcher,
            reply_tx,
            reply_rx,
            pending: HashSet::new(),
            selected_item: SelectedItem::None,
            hovered_item: SelectedItem::None,
            max_neighbours,
            auto_complete: true,
        }
    }

    pub fn selected_item(&self) -> &SelectedItem {
        &self.selected_item
    }

    pub fn hovered_item(&self) -> &SelectedItem {
        &self.hovered_item
    }

    pub fn is_expanding(&self, id: &NodeId) -> bool {
        self.pending.contains(id)
    }

    pub fn set_auto_complete(&mut self, enabled: bool) {
        self.auto_complete = enabled;
    }

    pub fn handle(&mut self, vis: &mut Visualization, event: InteractionEvent) {
        tracing::debug!("Handling {:?}", event);
        match event {
            InteractionEvent::NodeClicked(id) => self.node_clicked(vis, &id),
            InteractionEvent::NodeDblClicked(id) => self.node_dbl_clicked(vis, &id),
            InteractionEvent::NodeMouseOver(id) => self.node_mouse_over(vis, &id),
            InteractionEvent::NodeMouseOut(_) => self.mouse_out(),
            InteractionEvent::RelationshipClicked(id) => self.relationship_clicked(vis, &id),
            InteractionEvent::RelMouseOver(id) => self.rel_mouse_over(vis, &id),
            InteractionEvent::RelMouseOut(_) => self.mouse_out(),
            InteractionEvent::CanvasClicked => self.deselect_item(vis),
            InteractionEvent::NodeUnlock(id) => self.node_unlock(vis, &id),
            InteractionEvent::NodeClose(id) => self.node_close(vis, &id),
            InteractionEvent::MenuItemMouseOver { node_id, action } => {
                self.menu_item_mouse_over(vis, node_id, action)
            }
            InteractionEvent::MenuItemMouseOut { .. } => {
                vis.set_hovered_menu_item(None);
                self.mouse_out();
            }
        }
    }

    fn select(&mut self, item: SelectedItem) {
        self.selected_item = item.clone();
        self.bus.publish(GraphEvent::ItemSelected(item));
    }

    fn hover(&mut self, item: SelectedItem) {
        self.hovered_item = item.clone();
        self.bus.publish(GraphEvent::ItemHovered(item));
    }

    /// Toggle selection of a node.
    pub fn node_clicked(&mut self, vis: &mut Visualization, id: &NodeId) {
        let Some(already) = vis.model().find_node(id).map(|node| node.selected) else {
            tracing::warn!("Click on unknown node {}", id);
            return;
        };
        if already {
            self.deselect_item(vis);
            return;
        }
        vis.model_mut().clear_selection();
        let Some(node) = vis.model_mut().find_node_mut(id) else {
            return;
        };
        node.selected = true;
        let item = node_item(node);
        self.select(item);
        vis.refresh();
    }

    pub fn relationship_clicked(&mut self, vis: &mut Visualization, id: &RelationshipId) {
        let Some(already) = vis.model().find_relationship(id).map(|rel| rel.selected) else {
            tracing::warn!("Click on unknown relationship {}", id);
            return;
        };
        if already {
            self.deselect_item(vis);
            return;
        }
        vis.model_mut().clear_selection();
        let Some(rel) = vis.model_mut().find_relationship_mut(id) else {
            return;
        };
        rel.selected = true;
        let item = relationship_item(rel);
        self.select(item);
        vis.refresh();
    }

    /// Clear the selection and show the canvas summary.
    pub fn deselect_item(&mut self, vis: &mut Visualization) {
        vis.model_mut().clear_selection();
        self.select(SelectedItem::CanvasSummary {
            node_count: vis.model().node_count(),
            relationship_count: vis.model().relationship_count(),
        });
        vis.refresh();
    }

    /// Collapse an expanded node, otherwise request its neighbours.
    pub fn node_dbl_clicked(&mut self, vis: &mut Visualization, id: &NodeId) {
        let Some(expanded) = vis.model().find_node(id).map(|node| node.expanded) else {
            tracing::warn!("Double click on unknown node {}", id);
            return;
        };

        if expanded {
            self.pending.remove(id);
            let removed = vis.model_mut().collapse_node(id);
            if let Some(node) = vis.model_mut().find_node_mut(id) {
                node.expanded = false;
            }
            tracing::debug!("Collapsed {}: removed {} nodes", id, removed.len());
            vis.graph_changed();
            self.graph_model_changed(vis);
            return;
        }

        if self.pending.contains(id) {
            tracing::debug!("Expansion of {} already in flight", id);
            return;
        }
        if let Some(node) = vis.model_mut().find_node_mut(id) {
            node.expanded = true;
        }
        self.pending.insert(id.clone());

        let request = ExpansionRequest {
            node_id: id.clone(),
            known_neighbours: vis.model().find_node_neighbour_ids(id),
            visible: vis
                .model()
                .nodes()
                .iter()
                .map(|node| node.id().clone())
                .collect(),
            limit: self.max_neighbours,
        };
        self.bus.publish(GraphEvent::ExpansionRequested {
            node_id: id.clone(),
        });
        self.fetcher.fetch(request, self.reply_tx.clone());
        self.poll_expansions(vis);
    }

    /// Apply every expansion reply received so far. Returns how many were applied.
    pub fn poll_expansions(&mut self, vis: &mut Visualization) -> usize {
        let mut applied = 0;
        while let Ok(reply) = self.reply_rx.try_recv() {
            if self.complete_expansion(vis, reply) {
                applied += 1;
            }
        }
        applied
    }

    fn complete_expansion(&mut self, vis: &mut Visualization, reply: ExpansionReply) -> bool {
        let id = reply.node_id;
        if !self.pending.remove(&id) {
            tracing::debug!("Discarding expansion reply for {}: not pending", id);
            return false;
        }
        let still_expanded = vis
            .model()
            .find_node(&id)
            .is_some_and(|node| node.expanded);
        if !still_expanded {
            tracing::debug!("Discarding stale expansion reply for {}", id);
            return false;
        }

        let hood = match reply.outcome {
            Ok(hood) => hood,
            Err(e) => {
                tracing::warn!("Expansion of {} failed: {}", id, e);
                self.bus.publish(GraphEvent::ExpansionCompleted {
                    node_id: id,
                    added_nodes: 0,
                });
                vis.refresh();
                return true;
            }
        };

        if hood.count > self.max_neighbours {
            self.status_message(format!(
                "Showing {} of {} neighbours of node {}",
                hood.nodes.len().min(self.max_neighbours),
                hood.count,
                id
            ));
        }

        let model = vis.model_mut();
        let added = model.add_expanded_nodes(&id, hood.nodes.iter().map(Node::from_raw));
        let (explicit, internal): (Vec<Relationship>, Vec<Relationship>) = model
            .map_relationships(&hood.relationships)
            .into_iter()
            .partition(|rel| rel.touches(&id));
        model.add_relationships(explicit);
        if self.auto_complete {
            model.add_internal_relationships(internal);
        }

        vis.graph_changed();
        self.graph_model_changed(vis);
        self.bus.publish(GraphEvent::ExpansionCompleted {
            node_id: id,
            added_nodes: added,
        });
        true
    }

    /// Remove a node and everything attached to it from the view.
    pub fn node_close(&mut self, vis: &mut Visualization, id: &NodeId) {
        self.pending.remove(id);
        let model = vis.model_mut();
        model.remove_connected_relationships(id);
        if model.remove_node(id).is_none() {
            tracing::warn!("Close on unknown node {}", id);
            return;
        }
        self.deselect_item(vis);
        vis.graph_changed();
        self.graph_model_changed(vis);
    }

    pub fn node_unlock(&mut self, vis: &mut Visualization, id: &NodeId) {
        vis.unlock(id);
        self.deselect_item(vis);
    }

    fn node_mouse_over(&mut self, vis: &Visualization, id: &NodeId) {
        if let Some(node) = vis.model().find_node(id) {
            self.hover(node_item(node));
        }
    }

    fn rel_mouse_over(&mut self, vis: &Visualization, id: &RelationshipId) {
        if let Some(rel) = vis.model().find_relationship(id) {
            self.hover(relationship_item(rel));
        }
    }

    fn mouse_out(&mut self) {
        self.hover(SelectedItem::None);
    }

    fn menu_item_mouse_over(&mut self, vis: &mut Visualization, node_id: NodeId, action: MenuAction) {
        vis.set_hovered_menu_item(Some((node_id.clone(), action)));
        self.hover(SelectedItem::ContextMenuItem {
            node_id,
            action,
            label: action.label().to_string(),
            content: action.description().to_string(),
        });
    }

    pub fn legend_item_selected(&mut self, item: LegendItem) {
        self.select(SelectedItem::Legend(item));
    }

    pub fn status_message(&mut self, message: impl Into<String>) {
        self.select(SelectedItem::StatusMessage(message.into()));
    }

    /// Push fresh label and type histograms to the host.
    pub fn graph_model_changed(&self, vis: &Visualization) {
        self.bus
            .publish(GraphEvent::GraphModelChanged(graph_stats(vis.model())));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::InMemoryFetcher;
    use crate::settings::VisualizationSettings;
    use graphlens_core::{NeighbourFetchError, QueryResult, RawNode, RawRelationship};

    fn fixture() -> (GraphEventHandler, Visualization, EventBus) {
        let source = QueryResult {
            nodes: vec![
                RawNode::new("a", &["Person"]),
                RawNode::new("b", &["Person"]),
                RawNode::new("c", &["City"]),
            ],
            relationships: vec![
                RawRelationship::new("ab", "a", "b", "KNOWS"),
                RawRelationship::new("bc", "b", "c", "LIVES_IN"),
            ],
        };
        let bus = EventBus::new();
        let handler = GraphEventHandler::new(bus.clone(), Box::new(InMemoryFetcher::new(source)), 10);
        let mut vis = Visualization::new(&VisualizationSettings::default(), 800.0, 600.0);
        vis.model_mut()
            .add_nodes([Node::from_raw(&RawNode::new("a", &["Person"]))]);
        vis.graph_changed();
        (handler, vis, bus)
    }

    #[test]
    fn test_expansion_adds_unseen_neighbours() {
        let (mut handler, mut vis, bus) = fixture();
        handler.node_dbl_clicked(&mut vis, &NodeId::from("a"));

        assert_eq!(vis.model().node_count(), 2);
        assert_eq!(vis.model().relationship_count(), 1);
        assert!(!handler.is_expanding(&NodeId::from("a")));
        let events = bus.drain();
        assert!(events.contains(&GraphEvent::ExpansionRequested {
            node_id: NodeId::from("a")
        }));
        assert!(events.contains(&GraphEvent::ExpansionCompleted {
            node_id: NodeId::from("a"),
            added_nodes: 1
        }));
    }

    #[test]
    fn test_reply_after_collapse_is_discarded() {
        let (mut handler, mut vis, _bus) = fixture();
        let id = NodeId::from("a");
        vis.model_mut().find_node_mut(&id).unwrap().expanded = true;
        handler.pending.insert(id.clone());
        handler.node_dbl_clicked(&mut vis, &id);
        assert!(!handler.is_expanding(&id));

        handler
            .reply_tx
            .send(ExpansionReply {
                node_id: id.clone(),
                outcome: Err(NeighbourFetchError::Disconnected),
            })
            .unwrap();
        assert_eq!(handler.poll_expansions(&mut vis), 0);
        assert!(!vis.model().find_node(&id).unwrap().expanded);
    }

    #[test]
    fn test_unlock_releases_and_deselects() {
        let (mut handler, mut vis, _bus) = fixture();
        let id = NodeId::from("a");
        handler.node_clicked(&mut vis, &id);
        vis.model_mut().find_node_mut(&id).unwrap().fixed = true;
        handler.node_unlock(&mut vis, &id);
        let node = vis.model().find_node(&id).unwrap();
        assert!(!node.fixed && !node.selected);
        assert!(matches!(
            handler.selected_item(),
            SelectedItem::CanvasSummary { node_count: 1, .. }
        ));
    }

    #[test]
    fn test_menu_hover_describes_action() {
        let (mut handler, mut vis, _bus) = fixture();
        handler.handle(
            &mut vis,
            InteractionEvent::MenuItemMouseOver {
                node_id: NodeId::from("a"),
                action: MenuAction::Dismiss,
            },
        );
        match handler.hovered_item() {
            SelectedItem::ContextMenuItem { label, .. } => assert_eq!(label, "Dismiss"),
            other => panic!("Expected context menu item, got {:?}", other),
        }
        handler.handle(
            &mut vis,
            InteractionEvent::MenuItemMouseOut {
                node_id: NodeId::from("a"),
                action: MenuAction::Dismiss,
            },
        );
        assert_eq!(handler.hovered_item(), &SelectedItem::None);
    }
}
