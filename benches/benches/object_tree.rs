// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use understory_messenger::{Event, Messenger, NotifyError};
use understory_object::{CycleHandling, Hub, ObjectNode, ObjectTree, Uid};

/// Builds a hub holding a complete tree of the given fan-out and depth.
///
/// Every object gets one sender subscription so teardown has bus work to do.
fn build_hub(fanout: usize, depth: usize) -> (Hub, Uid) {
    let mut hub = Hub::new();
    let root = hub.create_object("root").unwrap();
    let mut level = vec![root];
    for d in 0..depth {
        let mut next = Vec::with_capacity(level.len() * fanout);
        for &parent in &level {
            for i in 0..fanout {
                let child = hub.create_object(format!("n{d}_{}_{i}", parent.get())).unwrap();
                hub.objects_mut().add_child_object(parent, child).unwrap();
                hub.messenger_mut().subscribe_sender(
                    child,
                    |_: &Messenger, _: &Event| -> Result<(), NotifyError> { Ok(()) },
                );
                next.push(child);
            }
        }
        level = next;
    }
    (hub, root)
}

fn build_chain(tree: &mut ObjectTree, len: u64) -> Uid {
    for i in 1..=len {
        tree.insert(ObjectNode::new(format!("c{i}")).with_uid(Uid::new(i)))
            .unwrap();
        if i > 1 {
            tree.add_child_object(Uid::new(i - 1), Uid::new(i)).unwrap();
        }
    }
    Uid::new(len)
}

fn bench_object_tree(c: &mut Criterion) {
    let mut group = c.benchmark_group("understory_object");
    group.sample_size(50);

    for &(fanout, depth) in &[(4_usize, 3_usize), (8, 3), (4, 5)] {
        group.bench_function(format!("build(f={fanout},d={depth})"), |b| {
            b.iter(|| black_box(build_hub(fanout, depth)));
        });

        group.bench_function(format!("destroy_root(f={fanout},d={depth})"), |b| {
            b.iter_batched(
                || build_hub(fanout, depth),
                |(mut hub, root)| {
                    let removed = hub.destroy_object(root).unwrap();
                    black_box(removed.len());
                },
                BatchSize::LargeInput,
            );
        });
    }

    for &len in &[64_u64, 1_024] {
        // Each add walks the parent chain of the proposed parent.
        group.bench_function(format!("chain_cycle_checked(len={len})"), |b| {
            b.iter(|| {
                let mut tree = ObjectTree::new();
                black_box(build_chain(&mut tree, len));
            });
        });

        group.bench_function(format!("chain_unchecked(len={len})"), |b| {
            b.iter(|| {
                let mut tree = ObjectTree::with_cycle_handling(CycleHandling::Allow);
                black_box(build_chain(&mut tree, len));
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_object_tree);
criterion_main!(benches);
