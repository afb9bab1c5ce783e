//! Asynchronous neighbour fetching for node expansion.
//!
//! A fetcher receives a request and a reply sender. It may answer on the
//! calling thread or from a worker; the handler only drains replies when polled.

use crossbeam_channel::Sender;
use graphlens_core::{
    NeighbourFetchError, Neighbourhood, NodeId, QueryResult, RawNode, RawRelationship,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpansionRequest {
    pub node_id: NodeId,
    /// Neighbours already visible, which the fetch should not return again.
    pub known_neighbours: HashSet<NodeId>,
    /// Every node in the view. These are never returned as nodes, but
    /// relationships reaching them are.
    pub visible: HashSet<NodeId>,
    pub limit: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExpansionReply {
    pub node_id: NodeId,
    pub outcome: Result<Neighbourhood, NeighbourFetchError>,
}

pub trait NeighbourFetcher: Send {
    fn fetch(&self, request: ExpansionRequest, reply: Sender<ExpansionReply>);
}

fn send_reply(reply: &Sender<ExpansionReply>, message: ExpansionReply) {
    if reply.send(message).is_err() {
        tracing::debug!("Expansion reply dropped, handler is gone");
    }
}

/// Runs a blocking lookup on a worker thread per request.
pub struct ThreadedFetcher<F> {
    lookup: Arc<F>,
}

impl<F> ThreadedFetcher<F>
where
    F: Fn(&ExpansionRequest) -> Result<Neighbourhood, NeighbourFetchError> + Send + Sync + 'static,
{
    pub fn new(lookup: F) -> Self {
        Self {
            lookup: Arc::new(lookup),
        }
    }
}

impl<F> NeighbourFetcher for ThreadedFetcher<F>
where
    F: Fn(&ExpansionRequest) -> Result<Neighbourhood, NeighbourFetchError> + Send + Sync + 'static,
{
    fn fetch(&self, request: ExpansionRequest, reply: Sender<ExpansionReply>) {
        let lookup = Arc::clone(&self.lookup);
        let node_id = request.node_id.clone();
        let worker_reply = reply.clone();
        let spawned = std::thread::Builder::new()
            .name(format!("graphlens-fetch-{}", request.node_id))
            .spawn(move || {
                let outcome = lookup(&request);
                send_reply(
                    &worker_reply,
                    ExpansionReply {
                        node_id: request.node_id,
                        outcome,
                    },
                );
            });
        if let Err(e) = spawned {
            tracing::warn!("Failed to spawn neighbour fetch worker for {}: {}", node_id, e);
            send_reply(
                &reply,
                ExpansionReply {
                    node_id,
                    outcome: Err(NeighbourFetchError::Disconnected),
                },
            );
        }
    }
}

/// Answers expansions from a complete result held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryFetcher {
    nodes: Arc<HashMap<NodeId, RawNode>>,
    source: Arc<QueryResult>,
}

impl InMemoryFetcher {
    pub fn new(source: QueryResult) -> Self {
        let nodes = source
            .nodes
            .iter()
            .map(|node| (node.id.clone(), node.clone()))
            .collect();
        Self {
            nodes: Arc::new(nodes),
            source: Arc::new(source),
        }
    }

    /// Neighbours of `request.node_id` that are not already visible, capped at
    /// `request.limit`, with every relationship linking them, the node and the
    /// visible set. Links from the node to a visible node that is not yet a
    /// neighbour are returned too.
    pub fn neighbourhood(&self, request: &ExpansionRequest) -> Neighbourhood {
        let mut unseen: Vec<NodeId> = Vec::new();
        for rel in &self.source.relationships {
            let other = if rel.start_node_id == request.node_id {
                &rel.end_node_id
            } else if rel.end_node_id == request.node_id {
                &rel.start_node_id
            } else {
                continue;
            };
            if other != &request.node_id
                && !request.known_neighbours.contains(other)
                && !request.visible.contains(other)
                && !unseen.contains(other)
            {
                unseen.push(other.clone());
            }
        }

        let count = unseen.len();
        let returned: HashSet<NodeId> = unseen.iter().take(request.limit).cloned().collect();
        let nodes = unseen
            .iter()
            .take(request.limit)
            .filter_map(|id| self.nodes.get(id).cloned())
            .collect();

        let reachable = |id: &NodeId| {
            id == &request.node_id
                || returned.contains(id)
                || request.known_neighbours.contains(id)
                || request.visible.contains(id)
        };
        let links_new = |rel: &RawRelationship| {
            if returned.contains(&rel.start_node_id) || returned.contains(&rel.end_node_id) {
                return true;
            }
            let other = if rel.start_node_id == request.node_id {
                &rel.end_node_id
            } else if rel.end_node_id == request.node_id {
                &rel.start_node_id
            } else {
                return false;
            };
            !request.known_neighbours.contains(other)
        };
        let relationships = self
            .source
            .relationships
            .iter()
            .filter(|rel| {
                links_new(*rel) && reachable(&rel.start_node_id) && reachable(&rel.end_node_id)
            })
            .cloned()
            .collect();

        Neighbourhood {
            nodes,
            relationships,
            count,
        }
    }
}

impl NeighbourFetcher for InMemoryFetcher {
    fn fetch(&self, request: ExpansionRequest, reply: Sender<ExpansionReply>) {
        let outcome = if self.nodes.contains_key(&request.node_id) {
            Ok(self.neighbourhood(&request))
        } else {
            Err(NeighbourFetchError::QueryFailed {
                node_id: request.node_id.clone(),
                reason: "node not found".to_string(),
            })
        };
        send_reply(
            &reply,
            ExpansionReply {
                node_id: request.node_id,
                outcome,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;
    use std::time::Duration;

    fn source() -> QueryResult {
        QueryResult {
            nodes: ["a", "b", "c", "d"]
                .into_iter()
                .map(|id| RawNode::new(id, &["Person"]))
                .collect(),
            relationships: vec![
                RawRelationship::new("ab", "a", "b", "KNOWS"),
                RawRelationship::new("ac", "a", "c", "KNOWS"),
                RawRelationship::new("bc", "b", "c", "KNOWS"),
                RawRelationship::new("cd", "c", "d", "KNOWS"),
            ],
        }
    }

    fn ids(ids: &[&str]) -> HashSet<NodeId> {
        ids.iter().map(|id| NodeId::from(*id)).collect()
    }

    fn request(node: &str, known: &[&str], limit: usize) -> ExpansionRequest {
        let mut visible = ids(known);
        visible.insert(NodeId::from(node));
        ExpansionRequest {
            node_id: NodeId::from(node),
            known_neighbours: ids(known),
            visible,
            limit,
        }
    }

    fn rel_ids(hood: &Neighbourhood) -> Vec<&str> {
        let mut ids: Vec<&str> = hood.relationships.iter().map(|r| r.id.as_str()).collect();
        ids.sort();
        ids
    }

    #[test]
    fn test_neighbourhood_skips_known_and_completes_relationships() {
        let fetcher = InMemoryFetcher::new(source());
        let hood = fetcher.neighbourhood(&request("a", &["b"], 10));
        assert_eq!(hood.count, 1);
        assert_eq!(hood.nodes.len(), 1);
        assert_eq!(hood.nodes[0].id, NodeId::from("c"));
        assert_eq!(rel_ids(&hood), vec!["ac", "bc"]);
    }

    #[test]
    fn test_neighbourhood_links_visible_nodes_without_returning_them() {
        let fetcher = InMemoryFetcher::new(source());
        // b is on screen but not yet connected to a
        let mut req = request("a", &[], 10);
        req.visible.insert(NodeId::from("b"));
        let hood = fetcher.neighbourhood(&req);
        assert_eq!(hood.count, 1);
        assert_eq!(hood.nodes.len(), 1);
        assert_eq!(hood.nodes[0].id, NodeId::from("c"));
        assert_eq!(rel_ids(&hood), vec!["ab", "ac", "bc"]);

        // d is visible but only linked through c
        let mut req = request("a", &["b"], 10);
        req.visible.insert(NodeId::from("d"));
        let hood = fetcher.neighbourhood(&req);
        assert_eq!(rel_ids(&hood), vec!["ac", "bc", "cd"]);
    }

    #[test]
    fn test_neighbourhood_respects_limit_but_reports_count() {
        let fetcher = InMemoryFetcher::new(source());
        let hood = fetcher.neighbourhood(&request("c", &[], 1));
        assert_eq!(hood.count, 3);
        assert_eq!(hood.nodes.len(), 1);
    }

    #[test]
    fn test_unknown_node_fails() {
        let fetcher = InMemoryFetcher::new(source());
        let (tx, rx) = unbounded();
        fetcher.fetch(request("zzz", &[], 10), tx);
        let reply = rx.try_recv().unwrap();
        assert!(matches!(
            reply.outcome,
            Err(NeighbourFetchError::QueryFailed { .. })
        ));
    }

    #[test]
    fn test_threaded_fetcher_replies_from_worker() {
        let fetcher = ThreadedFetcher::new(|request: &ExpansionRequest| {
            Ok(Neighbourhood {
                nodes: vec![RawNode::new(format!("{}-child", request.node_id), &[])],
                relationships: Vec::new(),
                count: 1,
            })
        });
        let (tx, rx) = unbounded();
        fetcher.fetch(request("a", &[], 10), tx);
        let reply = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(reply.node_id, NodeId::from("a"));
        assert_eq!(reply.outcome.unwrap().nodes[0].id, NodeId::from("a-child"));
    }
}
