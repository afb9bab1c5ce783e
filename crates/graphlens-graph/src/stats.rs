use crate::GraphModel;
use graphlens_core::PropertyMap;
use graphlens_events::{ALL_BUCKET, BucketStats, GraphStats};
use std::collections::BTreeMap;

fn record(buckets: &mut BTreeMap<String, BucketStats>, name: &str, properties: &PropertyMap) {
    let bucket = buckets.entry(name.to_string()).or_default();
    bucket.count += 1;
    for key in properties.keys() {
        bucket
            .properties
            .insert(key.to_string(), properties.type_of(key).to_string());
    }
}

/// Label and relationship type histograms of the whole model.
///
/// The `*` bucket of each histogram counts every node and every relationship.
pub fn graph_stats(model: &GraphModel) -> GraphStats {
    let mut stats = GraphStats::default();

    for node in model.nodes() {
        record(&mut stats.labels, ALL_BUCKET, &node.properties);
        for label in &node.labels {
            record(&mut stats.labels, label, &node.properties);
        }
    }

    for rel in model.relationships() {
        record(&mut stats.rel_types, ALL_BUCKET, &rel.properties);
        record(&mut stats.rel_types, &rel.rel_type, &rel.properties);
    }

    stats
}
