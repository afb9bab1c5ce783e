use crossbeam_channel::Sender;
use graphlens_app::{
    ExpansionReply, ExpansionRequest, GraphView, InMemoryFetcher, NeighbourFetcher,
    RecordingSink, ThreadedFetcher, VisualizationSettings,
};
use graphlens_core::{
    NeighbourFetchError, Neighbourhood, NodeId, QueryResult, RawNode, RawRelationship,
};
use graphlens_events::{GraphEvent, SelectedItem};
use graphlens_graph::Vec2;
use std::time::{Duration, Instant};

struct StubFetcher {
    outcome: Result<Neighbourhood, NeighbourFetchError>,
}

impl NeighbourFetcher for StubFetcher {
    fn fetch(&self, request: ExpansionRequest, reply: Sender<ExpansionReply>) {
        reply
            .send(ExpansionReply {
                node_id: request.node_id,
                outcome: self.outcome.clone(),
            })
            .unwrap();
    }
}

fn view(fetcher: Box<dyn NeighbourFetcher>) -> GraphView {
    GraphView::new(VisualizationSettings::default(), 800.0, 600.0, fetcher)
}

fn two_people() -> QueryResult {
    QueryResult {
        nodes: vec![
            RawNode::new("a", &["Person"]).with_property("name", "Alice"),
            RawNode::new("b", &["Person"]).with_property("name", "Bob"),
        ],
        relationships: vec![RawRelationship::new("ab", "a", "b", "KNOWS")],
    }
}

fn screen_of(view: &GraphView, id: &str) -> Vec2 {
    let vis = view.visualization();
    let position = vis
        .model()
        .find_node(&NodeId::from(id))
        .and_then(|node| node.position)
        .expect("node should be placed");
    vis.viewport().world_to_screen(position)
}

fn ms(base: Instant, millis: u64) -> Instant {
    base + Duration::from_millis(millis)
}

fn click(view: &mut GraphView, pos: Vec2, at: Instant) {
    view.pointer_down(pos, at);
    view.pointer_up(pos, at + Duration::from_millis(5));
}

fn double_click(view: &mut GraphView, pos: Vec2, at: Instant) {
    click(view, pos, at);
    click(view, pos, at + Duration::from_millis(80));
}

fn selections(events: &[GraphEvent]) -> Vec<SelectedItem> {
    events
        .iter()
        .filter_map(|event| match event {
            GraphEvent::ItemSelected(item) => Some(item.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn test_select_then_deselect_shows_canvas_summary() {
    let mut view = view(Box::new(InMemoryFetcher::default()));
    view.load(two_people(), &[]);
    view.drain_events();
    let t0 = Instant::now();

    let a = screen_of(&view, "a");
    click(&mut view, a, t0);
    assert!(selections(&view.drain_events()).is_empty());
    view.poll(ms(t0, 400));
    match selections(&view.drain_events()).as_slice() {
        [SelectedItem::Node(item)] => assert_eq!(item.id, NodeId::from("a")),
        other => panic!("Expected node selection, got {:?}", other),
    }

    click(&mut view, a, ms(t0, 1000));
    view.poll(ms(t0, 1400));
    assert_eq!(
        selections(&view.drain_events()),
        vec![SelectedItem::CanvasSummary {
            node_count: 2,
            relationship_count: 1
        }]
    );
}

#[test]
fn test_expand_then_collapse() {
    let hood = Neighbourhood {
        nodes: vec![RawNode::new("b", &["Person"])],
        relationships: vec![RawRelationship::new("ab", "a", "b", "KNOWS")],
        count: 1,
    };
    let mut view = view(Box::new(StubFetcher { outcome: Ok(hood) }));
    view.load(
        QueryResult {
            nodes: vec![RawNode::new("a", &["Person"])],
            relationships: Vec::new(),
        },
        &[],
    );
    let t0 = Instant::now();

    let a = screen_of(&view, "a");
    double_click(&mut view, a, t0);
    let model = view.visualization().model();
    assert_eq!(model.node_count(), 2);
    assert_eq!(model.relationship_count(), 1);
    assert!(model.find_node(&NodeId::from("a")).unwrap().expanded);
    assert!(model.find_node(&NodeId::from("b")).unwrap().position.is_some());

    let a = screen_of(&view, "a");
    double_click(&mut view, a, ms(t0, 1000));
    let model = view.visualization().model();
    assert_eq!(model.node_count(), 1);
    assert_eq!(model.relationship_count(), 0);
    assert!(!model.find_node(&NodeId::from("a")).unwrap().expanded);
}

#[test]
fn test_collapse_keeps_nodes_from_the_query() {
    let fetcher = InMemoryFetcher::new(two_people());
    let mut view = view(Box::new(fetcher));
    let mut result = two_people();
    result.relationships.clear();
    view.load(result, &[]);
    let t0 = Instant::now();

    let a = screen_of(&view, "a");
    double_click(&mut view, a, t0);
    let model = view.visualization().model();
    assert_eq!(model.node_count(), 2);
    assert!(model.find_relationship(&"ab".into()).is_some());
    assert!(model.expanded_children(&NodeId::from("a")).is_empty());

    let a = screen_of(&view, "a");
    double_click(&mut view, a, ms(t0, 1000));
    let model = view.visualization().model();
    assert_eq!(model.node_count(), 2);
    assert!(model.find_node(&NodeId::from("b")).is_some());
    assert!(!model.find_node(&NodeId::from("a")).unwrap().expanded);
}

#[test]
fn test_failed_fetch_degrades_to_empty_expansion() {
    let mut view = view(Box::new(StubFetcher {
        outcome: Err(NeighbourFetchError::QueryFailed {
            node_id: NodeId::from("a"),
            reason: "connection reset".into(),
        }),
    }));
    view.load(
        QueryResult {
            nodes: vec![RawNode::new("a", &["Person"])],
            relationships: Vec::new(),
        },
        &[],
    );
    view.drain_events();

    let a = screen_of(&view, "a");
    double_click(&mut view, a, Instant::now());
    let model = view.visualization().model();
    assert_eq!(model.node_count(), 1);
    assert!(model.find_node(&NodeId::from("a")).unwrap().expanded);
    assert!(view.drain_events().contains(&GraphEvent::ExpansionCompleted {
        node_id: NodeId::from("a"),
        added_nodes: 0
    }));
}

#[test]
fn test_threaded_expansion_applies_on_poll() {
    let fetcher = ThreadedFetcher::new(|request: &ExpansionRequest| {
        Ok(Neighbourhood {
            nodes: vec![RawNode::new("b", &["Person"])],
            relationships: vec![RawRelationship::new(
                "ab",
                request.node_id.as_str(),
                "b",
                "KNOWS",
            )],
            count: 1,
        })
    });
    let mut view = view(Box::new(fetcher));
    view.load(
        QueryResult {
            nodes: vec![RawNode::new("a", &["Person"])],
            relationships: Vec::new(),
        },
        &[],
    );
    let t0 = Instant::now();
    let a = screen_of(&view, "a");
    double_click(&mut view, a, t0);

    let deadline = Instant::now() + Duration::from_secs(5);
    while view.visualization().model().node_count() < 2 && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(5));
        view.poll(Instant::now());
    }
    assert_eq!(view.visualization().model().node_count(), 2);
    assert!(!view.handler().is_expanding(&NodeId::from("a")));
}

#[test]
fn test_parallel_relationships_fan_out() {
    let mut view = view(Box::new(InMemoryFetcher::default()));
    let mut result = two_people();
    result.relationships = vec![
        RawRelationship::new("r1", "a", "b", "KNOWS"),
        RawRelationship::new("r2", "a", "b", "LIKES"),
        RawRelationship::new("r3", "a", "b", "FOLLOWS"),
    ];
    view.load(result, &[]);

    let mut deflections: Vec<f32> = view
        .visualization()
        .model()
        .relationships()
        .iter()
        .map(|rel| rel.geometry.arrow.as_ref().unwrap().deflection())
        .collect();
    deflections.sort_by(f32::total_cmp);
    assert_eq!(deflections[1], 0.0);
    assert!(deflections[0] < 0.0);
    assert!((deflections[0] + deflections[2]).abs() < 1e-4);
}

#[test]
fn test_load_truncates_and_completes_relationships() {
    let mut settings = VisualizationSettings::default();
    settings.initial_node_display = 2;
    let mut view = GraphView::new(settings, 800.0, 600.0, Box::new(InMemoryFetcher::default()));
    let sink = RecordingSink::new();
    view.set_render_sink(Box::new(sink.clone()));

    let mut result = two_people();
    result.nodes.push(RawNode::new("c", &["Person"]));
    let completion = vec![
        RawRelationship::new("ba", "b", "a", "FOLLOWS"),
        RawRelationship::new("bc", "b", "c", "KNOWS"),
    ];
    view.load(result, &completion);

    let model = view.visualization().model();
    assert_eq!(model.node_count(), 2);
    assert_eq!(model.relationship_count(), 2);
    assert!(model.find_relationship(&"ba".into()).unwrap().internal);
    assert!(sink.frame_count() >= 1);

    let events = view.drain_events();
    assert!(matches!(
        selections(&events).as_slice(),
        [SelectedItem::StatusMessage(_)]
    ));
    assert!(matches!(events.last(), Some(GraphEvent::GraphModelChanged(_))));

    view.set_auto_complete(false);
    assert_eq!(view.visualization().model().relationship_count(), 1);
    view.set_auto_complete(true);
    assert_eq!(view.visualization().model().relationship_count(), 2);
}

#[test]
fn test_hover_is_debounced_and_pins_node() {
    let mut view = view(Box::new(InMemoryFetcher::default()));
    view.load(two_people(), &[]);
    view.drain_events();
    let t0 = Instant::now();

    let a = screen_of(&view, "a");
    view.pointer_move(a, t0);
    let id = NodeId::from("a");
    assert!(view.visualization().model().find_node(&id).unwrap().hovered);
    assert!(view.visualization().model().find_node(&id).unwrap().pinned.is_some());
    assert!(view.drain_events().is_empty());

    view.poll(ms(t0, 100));
    match view.drain_events().as_slice() {
        [GraphEvent::ItemHovered(SelectedItem::Node(item))] => assert_eq!(item.id, id),
        other => panic!("Expected hover event, got {:?}", other),
    }

    view.pointer_move(Vec2::new(790.0, 590.0), ms(t0, 200));
    let node = view.visualization().model().find_node(&id).unwrap();
    assert!(!node.hovered);
    assert!(node.pinned.is_none());
}

#[test]
fn test_wheel_without_modifier_hints_once() {
    let mut settings = VisualizationSettings::default();
    settings.wheel_zoom_requires_modifier = true;
    let mut view = GraphView::new(settings, 800.0, 600.0, Box::new(InMemoryFetcher::default()));
    view.load(two_people(), &[]);
    view.drain_events();
    let t0 = Instant::now();
    let centre = Vec2::new(400.0, 300.0);

    view.wheel(-1.0, false, centre, t0);
    view.wheel(-1.0, false, centre, ms(t0, 10));
    assert_eq!(view.visualization().viewport().scale(), 1.0);
    assert_eq!(selections(&view.drain_events()).len(), 1);

    view.wheel(-1.0, true, centre, ms(t0, 20));
    assert!(view.visualization().viewport().scale() > 1.0);
}
