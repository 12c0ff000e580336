//! # Router Benchmark

use criterion::{criterion_group, criterion_main, Criterion};

use drive_lib::{
    path::PathPoint,
    road::{
        polyline_net::RoadDef, ContactPoint, PolylineRoadNet, RoadLink, RoadNetParams,
    },
    router::{Router, RouterParams},
};

/// Number of roads in the benchmark chain.
const NUM_ROADS: u32 = 50;

/// Length of each road in the chain.
const ROAD_LENGTH_M: f64 = 100.0;

fn router_benchmark(c: &mut Criterion) {
    // ---- Build a long chain of straight roads ----

    let roads = (1..=NUM_ROADS)
        .map(|id| {
            let mut def = RoadDef::straight(
                id,
                [(id - 1) as f64 * ROAD_LENGTH_M, 0.0],
                0.0,
                ROAD_LENGTH_M,
                3.5,
                1,
                1,
            );
            if id > 1 {
                def = def.with_predecessor(RoadLink::road(id - 1, ContactPoint::End));
            }
            if id < NUM_ROADS {
                def = def.with_successor(RoadLink::road(id + 1, ContactPoint::Start));
            }
            def
        })
        .collect();

    let net = PolylineRoadNet::new(RoadNetParams {
        roads,
        junctions: vec![],
    })
    .unwrap();

    let router = Router::new(RouterParams::default());

    let start = PathPoint::new(10.0, -1.75, 0.0);
    let target = PathPoint::new((NUM_ROADS as f64 - 0.5) * ROAD_LENGTH_M, -1.75, 0.0);

    c.bench_function("Router::calculate_path", |b| {
        b.iter(|| router.calculate_path(&net, &start, &target, 20.0).unwrap())
    });

    // Sparse waypoints every 5 roads
    let sparse: Vec<PathPoint> = (1..NUM_ROADS / 5)
        .map(|i| PathPoint::new(i as f64 * 5.0 * ROAD_LENGTH_M + 50.0, -1.75, 0.0))
        .collect();

    c.bench_function("Router::calculate_route_from_waypoints", |b| {
        b.iter(|| router.calculate_route_from_waypoints(&net, &start, &sparse, 1.0))
    });
}

criterion_group!(benches, router_benchmark);
criterion_main!(benches);
