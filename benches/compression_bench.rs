use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tempfile::tempdir;

use gpck::cancel::CancellationToken;
use gpck::codec::{Codec, Lz4Codec, ZstdCodec};
use gpck::packer::{pack, PackInput, PackOptions};

fn bench_codecs(c: &mut Criterion) {
    let data = vec![0u8; 1024 * 1024];
    let zstd = ZstdCodec;
    let lz4 = Lz4Codec;
    c.bench_function("zstd_compress_1mb", |b| b.iter(|| zstd.compress(black_box(&data), 3)));
    c.bench_function("lz4_compress_1mb", |b| b.iter(|| lz4.compress(black_box(&data), 0)));

    let zstd_compressed = zstd.compress(&data, 3).unwrap();
    let lz4_compressed = lz4.compress(&data, 0).unwrap();
    c.bench_function("zstd_decompress_1mb", |b| {
        b.iter(|| zstd.decompress(black_box(&zstd_compressed), data.len()))
    });
    c.bench_function("lz4_decompress_1mb", |b| {
        b.iter(|| lz4.decompress(black_box(&lz4_compressed), data.len()))
    });
}

fn bench_packer_throughput(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    let mut inputs = Vec::new();
    for i in 0..32 {
        let name = format!("asset_{i}.bin");
        let path = dir.path().join(&name);
        std::fs::write(&path, vec![(i % 251) as u8; 64 * 1024]).unwrap();
        inputs.push(PackInput { source_path: path, relative_path: name });
    }
    let output = dir.path().join("bench.gpck");

    c.bench_function("pack_32_files_64kb", |b| {
        b.iter(|| {
            pack(
                black_box(&inputs),
                &[],
                &PackOptions::default(),
                &output,
                &CancellationToken::new(),
            )
            .unwrap()
        })
    });
}

criterion_group!(benches, bench_codecs, bench_packer_throughput);
criterion_main!(benches);
