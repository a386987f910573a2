use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use reptrack_core::{AngleSample, Frame, Session};

// Synthetic curl trace: cosine between ~85 and ~179 degrees with jitter, 30 fps.
fn synth_trace(n: usize, noise_amp: f64, seed: u32) -> Vec<Frame> {
    let mut state = seed.max(1);
    let mut next_f64 = || {
        let mut x = state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        state = x;
        f64::from(x) / (f64::from(u32::MAX) + 1.0)
    };
    (0..n)
        .map(|i| {
            let t = i as f64 / 30.0;
            let angle = 132.0 + 47.0 * (t * std::f64::consts::TAU / 3.0).cos();
            let noise = (next_f64() * 2.0 - 1.0) * noise_amp;
            Frame::new(AngleSample::new(angle + noise, 0.9, 33, t), Some(85.0))
        })
        .collect()
}

fn new_session() -> Session {
    match Session::builder().session_id("bench").build() {
        Ok(s) => s,
        Err(e) => panic!("bench session: {e}"),
    }
}

pub fn bench_session_step(c: &mut Criterion) {
    let mut g = c.benchmark_group("session_step");
    //   BENCH_SAMPLE_SIZE=10 cargo bench -p reptrack_core --bench session_step
    let sample_size = std::env::var("BENCH_SAMPLE_SIZE")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(50);
    g.sample_size(sample_size.max(10));

    for noise in [0.0, 2.0] {
        let trace = synth_trace(3_000, noise, 0xC0FFEE);
        g.bench_function(format!("process_3000_noise_{noise}"), |b| {
            b.iter_batched(
                new_session,
                |mut s| {
                    for f in &trace {
                        black_box(s.process(f));
                    }
                    s
                },
                BatchSize::SmallInput,
            );
        });
    }

    let trace = synth_trace(3_000, 1.0, 7);
    g.bench_function("finish_after_3000", |b| {
        b.iter_batched(
            || {
                let mut s = new_session();
                for f in &trace {
                    s.process(f);
                }
                s
            },
            |s| black_box(s.finish()),
            BatchSize::SmallInput,
        );
    });
    g.finish();
}

criterion_group!(benches, bench_session_step);
criterion_main!(benches);
