// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::cell::Cell;
use std::rc::Rc;

use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use understory_messenger::{Event, EventFilter, EventKind, Messenger, NotifyError, Uid};

#[derive(Clone)]
struct Lcg(u64);

impl Lcg {
    fn new(seed: u64) -> Self {
        Self(seed)
    }

    fn next_u32(&mut self) -> u32 {
        // Numerical Recipes LCG parameters.
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1);
        (self.0 >> 32) as u32
    }

    fn gen_range_usize(&mut self, upper_exclusive: usize) -> usize {
        if upper_exclusive == 0 {
            return 0;
        }
        (self.next_u32() as usize) % upper_exclusive
    }
}

const KINDS: [EventKind; 4] = [
    EventKind::CLICKED,
    EventKind::CHANGED,
    EventKind::TEXT_CHANGED,
    EventKind::MOVED,
];

/// Builds a bus with `senders` senders, each watched by `per_sender` counting
/// notifiers, plus one kind subscriber per entry of [`KINDS`].
fn build_bus(senders: u64, per_sender: usize, hits: &Rc<Cell<u64>>) -> (Messenger, Vec<Uid>) {
    let mut bus = Messenger::new();
    let ids: Vec<Uid> = (0..senders).map(|_| bus.next_uid()).collect();
    for &sender in &ids {
        for _ in 0..per_sender {
            let hits = Rc::clone(hits);
            bus.subscribe_sender(
                sender,
                move |_: &Messenger, ev: &Event| -> Result<(), NotifyError> {
                    hits.set(hits.get() + u64::from(ev.info1.unsigned_abs()));
                    Ok(())
                },
            );
        }
    }
    for kind in KINDS {
        let hits = Rc::clone(hits);
        bus.subscribe_event_kind(
            kind,
            move |_: &Messenger, _: &Event| -> Result<(), NotifyError> {
                hits.set(hits.get() + 1);
                Ok(())
            },
        );
    }
    (bus, ids)
}

fn bench_publish(c: &mut Criterion) {
    let mut group = c.benchmark_group("understory_messenger");
    group.sample_size(50);

    for &(senders, per_sender) in &[(16_u64, 1_usize), (16, 8), (1_024, 1), (1_024, 8)] {
        let hits = Rc::new(Cell::new(0));
        let (bus, ids) = build_bus(senders, per_sender, &hits);

        group.bench_function(format!("publish_random(s={senders},n={per_sender})"), |b| {
            let mut rng = Lcg::new(0x5EED_0000_0000_0001);
            b.iter(|| {
                let sender = ids[rng.gen_range_usize(ids.len())];
                let kind = KINDS[rng.gen_range_usize(KINDS.len())];
                bus.publish(sender, kind, 1, 0).unwrap();
                black_box(hits.get());
            });
        });

        group.bench_function(format!("publish_filtered(s={senders},n={per_sender})"), |b| {
            let mut filter = EventFilter::new();
            filter.disable(EventKind::MOVED | EventKind::CHANGED);
            let mut rng = Lcg::new(0x5EED_0000_0000_0002);
            b.iter(|| {
                let sender = ids[rng.gen_range_usize(ids.len())];
                let kind = KINDS[rng.gen_range_usize(KINDS.len())];
                if filter.is_enabled(kind) {
                    bus.publish(sender, kind, 1, 0).unwrap();
                }
                black_box(hits.get());
            });
        });
    }

    group.bench_function("register_and_remove(n=1024)", |b| {
        b.iter_batched(
            Messenger::new,
            |mut bus| {
                let sender = bus.next_uid();
                let ids: Vec<Uid> = (0..1_024)
                    .map(|_| {
                        bus.subscribe_sender(
                            sender,
                            |_: &Messenger, _: &Event| -> Result<(), NotifyError> { Ok(()) },
                        )
                    })
                    .collect();
                for id in ids {
                    bus.remove_notifier(id);
                }
                black_box(bus);
            },
            BatchSize::SmallInput,
        );
    });

    group.finish();
}

criterion_group!(benches, bench_publish);
criterion_main!(benches);
