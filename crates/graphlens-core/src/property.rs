use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_PROPERTY_TYPE: &str = "String";

/// A property as shown in inspector panels: key, display value and type name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    pub key: String,
    pub value: String,
    pub type_name: String,
}

/// Property values keyed by name, with the type name of each value kept alongside.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyMap {
    values: BTreeMap<String, String>,
    types: BTreeMap<String, String>,
}

impl PropertyMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parts(values: BTreeMap<String, String>, types: BTreeMap<String, String>) -> Self {
        Self { values, types }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn insert_typed(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
        type_name: impl Into<String>,
    ) {
        let key = key.into();
        self.types.insert(key.clone(), type_name.into());
        self.values.insert(key, value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn type_of(&self, key: &str) -> &str {
        self.types
            .get(key)
            .map(String::as_str)
            .unwrap_or(DEFAULT_PROPERTY_TYPE)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Key/type/value triples in key order.
    pub fn property_list(&self) -> Vec<Property> {
        self.values
            .iter()
            .map(|(key, value)| Property {
                key: key.clone(),
                value: value.clone(),
                type_name: self.type_of(key).to_string(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn property_list_defaults_missing_types() {
        let mut map = PropertyMap::new();
        map.insert("name", "Keanu");
        map.insert_typed("born", "1964", "Integer");

        let list = map.property_list();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].key, "born");
        assert_eq!(list[0].type_name, "Integer");
        assert_eq!(list[1].key, "name");
        assert_eq!(list[1].type_name, DEFAULT_PROPERTY_TYPE);
    }
}
