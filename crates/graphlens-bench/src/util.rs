use graphlens_core::{QueryResult, RawNode, RawRelationship};
use graphlens_graph::{GraphModel, Node};

const LABELS: [&str; 4] = ["Person", "Movie", "City", "Company"];

/// A connected result of `node_count` nodes, each linked to the next
/// `fan_out` nodes, with a loop on every tenth node.
pub fn synthetic_result(node_count: usize, fan_out: usize) -> QueryResult {
    let nodes = (0..node_count)
        .map(|i| {
            RawNode::new(i.to_string(), &[LABELS[i % LABELS.len()]])
                .with_property("name", &format!("Node {}", i))
        })
        .collect();

    let mut relationships = Vec::new();
    for i in 0..node_count {
        for step in 1..=fan_out {
            let j = (i + step) % node_count;
            if i == j {
                continue;
            }
            relationships.push(RawRelationship::new(
                format!("{}-{}", i, j),
                &i.to_string(),
                &j.to_string(),
                "LINKS_TO",
            ));
        }
        if i % 10 == 0 {
            relationships.push(RawRelationship::new(
                format!("{}-self", i),
                &i.to_string(),
                &i.to_string(),
                "REFERS_TO",
            ));
        }
    }

    QueryResult {
        nodes,
        relationships,
    }
}

/// `count` parallel relationships between each consecutive pair of nodes.
pub fn parallel_result(pairs: usize, count: usize) -> QueryResult {
    let mut result = QueryResult::default();
    for pair in 0..pairs {
        let (a, b) = (format!("{}a", pair), format!("{}b", pair));
        result.nodes.push(RawNode::new(a.as_str(), &["Person"]));
        result.nodes.push(RawNode::new(b.as_str(), &["Person"]));
        for k in 0..count {
            let (start, end) = if k % 2 == 0 { (&a, &b) } else { (&b, &a) };
            result.relationships.push(RawRelationship::new(
                format!("{}-{}", pair, k),
                start,
                end,
                "KNOWS",
            ));
        }
    }
    result
}

pub fn build_model(result: &QueryResult) -> GraphModel {
    let mut model = GraphModel::new();
    model.add_nodes(result.nodes.iter().map(Node::from_raw));
    let relationships = model.map_relationships(&result.relationships);
    model.add_relationships(relationships);
    model
}
