pub mod geometry;
pub mod graph;
pub mod hit_tester;
pub mod layout;
pub mod simulation;
pub mod stats;
pub mod style;

pub use geometry::arrows::{Arrow, ArcArrow, CaptionLayout, LoopArrow, StraightArrow};
pub use geometry::caption::{CaptionLine, fit_caption_into_circle, shorten_caption};
pub use geometry::circular::{CircularLayout, distribute_circular};
pub use geometry::{ApproximateTextMeasure, PathCommand, TextMeasure, to_svg_path};
pub use graph::{
    GraphModel, Node, NodePair, Relationship, RelationshipGeometry, Vec2, normalize_degrees,
};
pub use hit_tester::{HitResult, HitTester};
pub use layout::{PairwiseArcsRouter, measure_nodes};
pub use simulation::{ForceSimulation, SimulationSettings};
pub use stats::graph_stats;
pub use style::{
    CaptionSource, Color, GraphStyle, StyleLookup, StyleProperties, default_node_caption,
    interpolate,
};
