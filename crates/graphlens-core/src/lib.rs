use serde::{Deserialize, Serialize};
use std::fmt;

pub mod error;
pub mod property;
pub mod record;

pub use error::{GraphError, NeighbourFetchError};
pub use property::{Property, PropertyMap};
pub use record::{Neighbourhood, QueryResult, RawNode, RawRelationship};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelationshipId(pub String);

impl RelationshipId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RelationshipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RelationshipId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_serialize_as_plain_strings() {
        let id = NodeId::new("42");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"42\"");

        let rel: RelationshipId = serde_json::from_str("\"r7\"").unwrap();
        assert_eq!(rel, RelationshipId::from("r7"));
        assert_eq!(rel.to_string(), "r7");
    }
}
