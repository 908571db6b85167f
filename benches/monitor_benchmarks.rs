use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ratemon_rs::{MonitorConfig, RateMonitor};

fn make_populated(hosts: u32) -> RateMonitor {
    let mut mon = RateMonitor::init(MonitorConfig::default()).unwrap();
    for i in 0..hosts {
        let b = i.to_be_bytes();
        for tick in 0..16 {
            mon.record(tick, &[10, b[1], b[2], b[3]], true, true);
        }
    }
    mon
}

pub fn monitor_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("Monitor Operations");

    // Hot path: every level of the chain already exists.
    {
        let mut mon = make_populated(1);
        let mut tick = 100u64;
        group.bench_function("record existing host", |b| {
            b.iter(|| {
                tick += 1;
                black_box(mon.record(tick, &[10, 0, 0, 0], true, true));
            });
        });
    }

    // Spread across the root level: 256 distinct first bytes.
    {
        let mut mon = RateMonitor::init(MonitorConfig::default()).unwrap();
        let mut i = 0u32;
        group.bench_function("record spread hosts", |b| {
            b.iter(|| {
                i = i.wrapping_add(1);
                let bytes = i.to_be_bytes();
                black_box(mon.record(u64::from(i / 100), &bytes, i % 2 == 0, true));
            });
        });
    }

    // Steady-state churn at the ceiling: every few packets force an
    // eviction pass to make room.
    {
        let mut mon = RateMonitor::init(MonitorConfig {
            memmax_kb: 100,
            ..MonitorConfig::default()
        })
        .unwrap();
        let mut i = 0u32;
        group.bench_function("record at ceiling", |b| {
            b.iter(|| {
                i = i.wrapping_add(1);
                let bytes = i.to_be_bytes();
                black_box(mon.record(u64::from(i / 100), &bytes, true, true));
            });
        });
    }

    // A full scan that deletes nothing (threshold 0 keeps everything).
    {
        let mut mon = make_populated(1024);
        group.bench_function("fold keep-all scan", |b| {
            b.iter(|| {
                mon.fold(black_box(0), 16);
            });
        });
    }

    // Render the hierarchical dump of a populated tree.
    {
        let mut mon = make_populated(1024);
        group.bench_function("look 1k hosts", |b| {
            b.iter(|| {
                black_box(mon.look(17));
            });
        });
    }

    group.finish();
}

criterion_group!(benches, monitor_benchmark);
criterion_main!(benches);
