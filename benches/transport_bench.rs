//! Benchmarks for the control path: clock advancement, step resolution and
//! whole-session dispatch.
//!
//! Run with: cargo bench
//!
//! Reference: a 128-frame callback at 48kHz is 2.67ms, so one `advance`
//! per callback has to stay far below that.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use tonebridge::engine::{Cue, SongScheduler, Transport};
use tonebridge::runtime::{PlaybackSession, SessionConfig};
use tonebridge::sequencing::song1;

/// Callback lengths in seconds at 48kHz: 64, 128, 256 and 512 frames.
const CALLBACKS: &[(usize, f64)] = &[
    (64, 64.0 / 48_000.0),
    (128, 128.0 / 48_000.0),
    (256, 256.0 / 48_000.0),
    (512, 512.0 / 48_000.0),
];

fn bench_transport(c: &mut Criterion) {
    let mut group = c.benchmark_group("transport/advance");

    for &(frames, seconds) in CALLBACKS {
        // 16 tracks on sixteenth-note grids
        let mut transport = Transport::new(480);
        for track in 0..16 {
            transport.schedule_repeat(Cue::Step { track, generation: 0 }, 120, 0);
        }
        transport.start(0.0);

        group.bench_with_input(BenchmarkId::new("16_tracks", frames), &seconds, |b, &dt| {
            b.iter(|| black_box(transport.advance(black_box(dt))));
        });
    }
    group.finish();
}

fn bench_scheduler(c: &mut Criterion) {
    let mut group = c.benchmark_group("scheduler/song1");
    let song = song1().expect("song1 is valid");

    group.bench_function("one_bar", |b| {
        b.iter(|| {
            let mut transport = Transport::new(480);
            let mut scheduler = SongScheduler::new(480);
            scheduler.load(&mut transport, &song).expect("load");
            transport.start(0.0);
            let mut triggers = 0;
            for fired in transport.advance(60.0 / 140.0 * 4.0) {
                triggers += scheduler.on_step(&fired, &transport).expect("no stale cues").len();
            }
            black_box(triggers)
        })
    });
    group.finish();
}

fn bench_session(c: &mut Criterion) {
    let mut group = c.benchmark_group("session/advance");

    for &(frames, seconds) in CALLBACKS {
        let mut session = PlaybackSession::new(SessionConfig::default()).expect("default config");
        session.start_song().expect("song1 starts");

        group.bench_with_input(BenchmarkId::new("song1", frames), &seconds, |b, &dt| {
            b.iter(|| black_box(session.advance(black_box(dt)).expect("no stale cues")));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_transport, bench_scheduler, bench_session);
criterion_main!(benches);
