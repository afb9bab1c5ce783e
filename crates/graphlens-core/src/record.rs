//! Raw records produced by the query result mapper.

use crate::{GraphError, NodeId, PropertyMap, RelationshipId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawNode {
    pub id: NodeId,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    #[serde(default)]
    pub property_types: BTreeMap<String, String>,
}

impl RawNode {
    pub fn new(id: impl Into<String>, labels: &[&str]) -> Self {
        Self {
            id: NodeId::new(id),
            labels: labels.iter().map(|label| label.to_string()).collect(),
            properties: BTreeMap::new(),
            property_types: BTreeMap::new(),
        }
    }

    pub fn with_property(mut self, key: &str, value: &str) -> Self {
        self.properties.insert(key.to_string(), value.to_string());
        self
    }

    pub fn property_map(&self) -> PropertyMap {
        PropertyMap::from_parts(self.properties.clone(), self.property_types.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRelationship {
    pub id: RelationshipId,
    pub start_node_id: NodeId,
    pub end_node_id: NodeId,
    #[serde(rename = "type")]
    pub rel_type: String,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    #[serde(default)]
    pub property_types: BTreeMap<String, String>,
}

impl RawRelationship {
    pub fn new(id: impl Into<String>, start: &str, end: &str, rel_type: &str) -> Self {
        Self {
            id: RelationshipId::new(id),
            start_node_id: NodeId::from(start),
            end_node_id: NodeId::from(end),
            rel_type: rel_type.to_string(),
            properties: BTreeMap::new(),
            property_types: BTreeMap::new(),
        }
    }

    pub fn property_map(&self) -> PropertyMap {
        PropertyMap::from_parts(self.properties.clone(), self.property_types.clone())
    }
}

/// A full query result as handed over by the result mapper.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    #[serde(default)]
    pub nodes: Vec<RawNode>,
    #[serde(default)]
    pub relationships: Vec<RawRelationship>,
}

impl QueryResult {
    pub fn from_json_str(input: &str) -> Result<Self, GraphError> {
        Ok(serde_json::from_str(input)?)
    }
}

/// Successful reply of a neighbour fetch. `count` is the total number of
/// neighbours the database reported, which may exceed `nodes.len()`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Neighbourhood {
    #[serde(default)]
    pub nodes: Vec<RawNode>,
    #[serde(default)]
    pub relationships: Vec<RawRelationship>,
    #[serde(default)]
    pub count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_result_parses_camel_case_records() {
        let json = r#"{
            "nodes": [
                {"id": "1", "labels": ["Person"], "properties": {"name": "Ann"}, "propertyTypes": {"name": "String"}},
                {"id": "2"}
            ],
            "relationships": [
                {"id": "10", "startNodeId": "1", "endNodeId": "2", "type": "KNOWS"}
            ]
        }"#;

        let result = QueryResult::from_json_str(json).unwrap();
        assert_eq!(result.nodes.len(), 2);
        assert_eq!(result.nodes[0].properties["name"], "Ann");
        assert!(result.nodes[1].labels.is_empty());
        assert_eq!(result.relationships[0].rel_type, "KNOWS");
        assert_eq!(result.relationships[0].end_node_id, NodeId::from("2"));
    }

    #[test]
    fn raw_node_builder_starts_without_properties() {
        let node = RawNode::new("1", &["Person", "Actor"]).with_property("name", "Ann");
        assert_eq!(node.id, NodeId::from("1"));
        assert_eq!(node.labels, vec!["Person", "Actor"]);
        assert_eq!(node.properties.len(), 1);
        assert!(node.property_types.is_empty());

        let bare = RawNode::new("2", &[]);
        assert!(bare.labels.is_empty());
        assert!(bare.properties.is_empty());
    }

    #[test]
    fn malformed_document_is_reported() {
        let err = QueryResult::from_json_str("{\"nodes\": 3}").unwrap_err();
        assert!(matches!(err, GraphError::InvalidDocument(_)));
    }
}
