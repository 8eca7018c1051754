#[macro_use]
extern crate criterion;

use criterion::{black_box, Criterion};
use smitta_core::entity::{NodeId, TrafficConfig, PRIMARY_APP};
use smitta_core::module::EntityParams;
use smitta_core::time::SimTime;
use smitta_simulator::apps::{CbrSender, CBR_SENDER};
use smitta_simulator::Simulator;

/// Kernel throughput: 50 senders at 1 ms for one simulated second (~50k events).
fn benchmark_kernel_throughput(c: &mut Criterion) {
    let params = EntityParams {
        traffic: TrafficConfig {
            packet_size: 512,
            send_interval: SimTime::from_millis(1),
        },
        dest_address: "remoteServer".into(),
        start_offset: SimTime::ZERO,
    };

    c.bench_function("kernel_throughput", |b| {
        b.iter(|| {
            let mut sim = Simulator::new("Bench");
            sim.register_type(CBR_SENDER, CbrSender::factory());
            sim.add_host("remoteServer");
            for node in (0..50).map(NodeId) {
                sim.add_node(node);
                sim.add_entity(node, PRIMARY_APP, CBR_SENDER, params.clone())
                    .unwrap();
            }
            black_box(sim.run(Some(SimTime::from_millis(1_000))).unwrap());
        })
    });
}

criterion_group!(benches, benchmark_kernel_throughput);
criterion_main!(benches);
