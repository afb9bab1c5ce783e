//! Plain-data payloads carried by host-facing events.

use graphlens_core::{NodeId, Property, RelationshipId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Bucket name counting every node (or every relationship) in the stats.
pub const ALL_BUCKET: &str = "*";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeItem {
    pub id: NodeId,
    pub labels: Vec<String>,
    pub properties: Vec<Property>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipItem {
    pub id: RelationshipId,
    pub rel_type: String,
    pub properties: Vec<Property>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LegendItem {
    Label(String),
    RelationshipType(String),
}

/// Actions offered by the ring menu around a selected node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MenuAction {
    Unlock,
    ExpandCollapse,
    Dismiss,
}

impl MenuAction {
    pub const ALL: [MenuAction; 3] = [
        MenuAction::Unlock,
        MenuAction::ExpandCollapse,
        MenuAction::Dismiss,
    ];

    pub fn label(self) -> &'static str {
        match self {
            MenuAction::Unlock => "Unlock",
            MenuAction::ExpandCollapse => "Expand / Collapse",
            MenuAction::Dismiss => "Dismiss",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            MenuAction::Unlock => "Release the node so the layout can move it again",
            MenuAction::ExpandCollapse => "Show or hide the node's direct neighbours",
            MenuAction::Dismiss => "Remove the node and its relationships from the view",
        }
    }
}

/// What the inspector panel currently shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SelectedItem {
    #[default]
    None,
    Node(NodeItem),
    Relationship(RelationshipItem),
    CanvasSummary {
        node_count: usize,
        relationship_count: usize,
    },
    Legend(LegendItem),
    StatusMessage(String),
    ContextMenuItem {
        node_id: NodeId,
        action: MenuAction,
        label: String,
        content: String,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketStats {
    pub count: usize,
    /// Property key to the type name last seen for it.
    pub properties: BTreeMap<String, String>,
}

/// Label and relationship type histograms for legend and overview panels.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStats {
    pub labels: BTreeMap<String, BucketStats>,
    pub rel_types: BTreeMap<String, BucketStats>,
}

impl GraphStats {
    pub fn label_count(&self, label: &str) -> usize {
        self.labels.get(label).map(|bucket| bucket.count).unwrap_or(0)
    }

    pub fn rel_type_count(&self, rel_type: &str) -> usize {
        self.rel_types
            .get(rel_type)
            .map(|bucket| bucket.count)
            .unwrap_or(0)
    }
}
