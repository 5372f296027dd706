//! Benchmarks for argument building
//!
//! Measures the cost of compiling queue items into encoder arguments.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ffb_av::args::{build, convert_sequence_name, crf_from_quality};
use ffb_core::{
    Catalog, Codec, CodecBuckets, CodecFlags, CustomOption, MediaDescriptor, Muxer, QueueItem,
    StreamKind,
};

fn encoder(name: &str, kind: StreamKind) -> Codec {
    Codec::new(
        name,
        name,
        kind,
        CodecFlags {
            encoder: true,
            ..Default::default()
        },
    )
}

fn catalog() -> Catalog {
    let mut png = Muxer::new("png", "PNG Sequence");
    png.is_sequence = true;
    Catalog::new(
        CodecBuckets {
            video_encoders: vec![
                Codec::copy(StreamKind::Video),
                encoder("h264", StreamKind::Video),
                encoder("png", StreamKind::Video),
            ],
            audio_encoders: vec![
                Codec::copy(StreamKind::Audio),
                encoder("aac", StreamKind::Audio),
            ],
            ..Default::default()
        },
        vec![Muxer::new("mp4", "MP4"), png],
    )
}

fn web_output(index: usize) -> MediaDescriptor {
    let mut output = MediaDescriptor::new(format!("out/clip_{index}.mp4"));
    output.muxer = Some("mp4".into());
    output.video.codec = Some("h264".into());
    output.video.width = 1920;
    output.video.height = 1080;
    output.video.quality = 80;
    output.audio.codec = Some("aac".into());
    output.audio.bitrate = 192_000;
    output.options = vec![CustomOption::with_value("-movflags", "+faststart")];
    output
}

fn job(outputs: usize) -> QueueItem {
    let mut sequence = MediaDescriptor::new("render/frame_{####}.exr");
    sequence.image_sequence = true;
    sequence.video.framerate = 24.0;
    sequence.start_number = 1001;

    let mut frames = MediaDescriptor::new("out/frame_{###}.png");
    frames.muxer = Some("png".into());
    frames.has_audio = false;

    let mut all = vec![frames];
    all.extend((0..outputs).map(web_output));
    QueueItem::new(vec![sequence, MediaDescriptor::new("score.wav")], all)
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");
    let catalog = catalog();

    for outputs in [1usize, 4, 16] {
        let item = job(outputs);
        group.bench_with_input(BenchmarkId::new("outputs", outputs), &item, |b, item| {
            b.iter(|| build(black_box(item), &catalog));
        });
    }

    group.finish();
}

fn bench_helpers(c: &mut Criterion) {
    let mut group = c.benchmark_group("helpers");

    group.bench_function("crf_from_quality/full_range", |b| {
        b.iter(|| (0..=100u8).map(|q| crf_from_quality(black_box(q))).sum::<u32>());
    });

    group.bench_function("convert_sequence_name/placeholder", |b| {
        b.iter(|| convert_sequence_name(black_box("shot{##}_frame{####}.exr")).into_owned());
    });

    group.bench_function("convert_sequence_name/plain", |b| {
        b.iter(|| convert_sequence_name(black_box("plain_movie.mov")).into_owned());
    });

    group.finish();
}

criterion_group!(benches, bench_build, bench_helpers);
criterion_main!(benches);
