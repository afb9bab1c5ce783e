use criterion::{Criterion, black_box, criterion_group, criterion_main};
use graphlens_app::{GraphView, InMemoryFetcher, VisualizationSettings};
use graphlens_bench::util;
use graphlens_graph::{
    ApproximateTextMeasure, ForceSimulation, GraphStyle, PairwiseArcsRouter, measure_nodes,
};

fn bench_relationship_layout(c: &mut Criterion) {
    let result = util::parallel_result(200, 5);
    let mut model = util::build_model(&result);
    let style = GraphStyle::new();
    let measure = ApproximateTextMeasure::default();
    measure_nodes(&mut model, &style, &measure);
    ForceSimulation::default().seed_positions(&mut model);
    let router = PairwiseArcsRouter::default();

    c.bench_function("layout_relationships_1000_parallel", |b| {
        b.iter(|| {
            router.layout_relationships(black_box(&mut model), &style, &measure);
        })
    });
}

fn bench_load_and_render(c: &mut Criterion) {
    let result = util::synthetic_result(300, 3);
    let mut group = c.benchmark_group("graph_view");
    group.sample_size(10);
    group.bench_function("load_300_nodes", |b| {
        b.iter(|| {
            let mut view = GraphView::new(
                VisualizationSettings::default(),
                1200.0,
                800.0,
                Box::new(InMemoryFetcher::default()),
            );
            view.load(result.clone(), &[]);
            black_box(view.visualization().scene().to_svg());
        })
    });
    group.finish();
}

criterion_group!(benches, bench_relationship_layout, bench_load_and_render);
criterion_main!(benches);
