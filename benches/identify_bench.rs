//! Performance benchmarks for speaker identification

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use voiceprint_dsp::{extract_profile, FilterbankCache, PipelineConfig, SpeakerIdentifier};

fn synthetic_utterance(seconds: f32) -> Vec<f32> {
    let sample_rate = 16_000;
    (0..(sample_rate as f32 * seconds) as usize)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            0.2 * (2.0 * std::f32::consts::PI * 180.0 * t).sin()
                + 0.1 * (2.0 * std::f32::consts::PI * 360.0 * t).sin()
        })
        .collect()
}

fn bench_extract_profile(c: &mut Criterion) {
    let samples = synthetic_utterance(1.0);
    let config = PipelineConfig::default();
    let cache = FilterbankCache::new();

    c.bench_function("extract_profile_1s", |b| {
        b.iter(|| {
            let _ = extract_profile(black_box(&samples), black_box(16_000), &config, &cache);
        });
    });
}

fn bench_identify(c: &mut Criterion) {
    let samples = synthetic_utterance(1.0);
    let mut engine = SpeakerIdentifier::new(PipelineConfig::default()).unwrap();
    let takes = vec![samples.clone(); 3];
    engine.enroll(&takes, 16_000, "owner", "Owner", true).unwrap();

    c.bench_function("identify_1s_enrolled_owner", |b| {
        b.iter(|| {
            let _ = engine.identify(black_box(&samples), black_box(16_000));
        });
    });
}

criterion_group!(benches, bench_extract_profile, bench_identify);
criterion_main!(benches);
