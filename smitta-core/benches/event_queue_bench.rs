#[macro_use]
extern crate criterion;

use criterion::Criterion;

use smitta_core::entity::{ModuleId, NodeId};
use smitta_core::events::{EventQueue, Message};
use smitta_core::time::SimTime;

fn bench_event_queue_insert_pop(c: &mut Criterion) {
    let mut group = c.benchmark_group("event_queue_throughput");

    for pending in [128u64, 1024, 16384] {
        group.throughput(criterion::Throughput::Elements(pending)); // Events per second
        group.bench_function(format!("pending_{}", pending), |b| {
            let mut queue = EventQueue::with_capacity(pending as usize);
            for i in 0..pending {
                queue.insert(
                    SimTime::from_nanos(i * 7919 % pending),
                    ModuleId(0),
                    Message::infection(NodeId(i as u32)),
                );
            }
            b.iter(|| {
                let event = queue.pop().unwrap();
                queue.insert(
                    event.at.saturating_add(SimTime::from_nanos(pending)),
                    event.target,
                    event.message,
                );
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_event_queue_insert_pop);
criterion_main!(benches);
