use std::fs;
use std::io::{Read, Seek, SeekFrom, Write};

use byteorder::{ByteOrder, LittleEndian};
use tempfile::tempdir;

use gpck::cancel::CancellationToken;
use gpck::chunk::plan_chunks;
use gpck::dds::{self, DdsHeader};
use gpck::dependency::DependencyType;
use gpck::entry::AssetType;
use gpck::overlay::OverlayFileSystem;
use gpck::packer::{pack, PackDependency, PackInput, PackOptions};
use gpck::reader::ArchiveReader;
use gpck::stream::StreamError;
use gpck::AssetId;
use gpck::CompressionMethod;

fn write_input(dir: &std::path::Path, name: &str, bytes: &[u8]) -> PackInput {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, bytes).unwrap();
    PackInput { source_path: path, relative_path: name.to_string() }
}

/// Build a synthetic, unrecognized-fourCC DDS file with `mip_count` levels
/// starting at `width`x`height`, 16 bytes/block, filled with a repeating
/// byte pattern so compression has something to chew on.
fn synthetic_dds(width: u32, height: u32, mip_count: u32) -> Vec<u8> {
    let mut header = vec![0u8; 128];
    LittleEndian::write_u32(&mut header[0..4], 0x2053_3344);
    LittleEndian::write_u32(&mut header[4 + 8..4 + 12], height);
    LittleEndian::write_u32(&mut header[4 + 12..4 + 16], width);
    LittleEndian::write_u32(&mut header[4 + 24..4 + 28], mip_count);
    header[4 + 80..4 + 84].copy_from_slice(b"NONE");

    let mut buf = header;
    let (mut w, mut h) = (width, height);
    let mut counter: u8 = 0;
    for _ in 0..mip_count {
        let blocks_w = std::cmp::max(1, (w + 3) / 4) as usize;
        let blocks_h = std::cmp::max(1, (h + 3) / 4) as usize;
        let mip_bytes = blocks_w * blocks_h * 16;
        buf.extend(std::iter::repeat_with(|| {
            counter = counter.wrapping_add(1);
            counter
        }).take(mip_bytes));
        w = std::cmp::max(1, w / 2);
        h = std::cmp::max(1, h / 2);
    }
    buf
}

#[test]
fn tiny_text_round_trip() {
    let dir = tempdir().unwrap();
    let input = write_input(dir.path(), "greet.txt", b"Hello, gpck!");
    let output = dir.path().join("out.gpck");

    let options = PackOptions { method: Some(CompressionMethod::Zstd), ..Default::default() };
    pack(&[input], &[], &options, &output, &CancellationToken::new()).unwrap();

    let reader = ArchiveReader::open(&output).unwrap();
    assert_eq!(reader.count(), 1);

    let id = AssetId::from_path("greet.txt");
    let entry = reader.try_get(id).expect("entry present");
    assert_eq!(entry.flags.method(), Some(CompressionMethod::Zstd));
    assert!(!entry.flags.is_encrypted());
    assert_eq!(reader.path_for(id), Some("greet.txt"));

    let mut stream = reader.open_entry(entry);
    let mut out = vec![0u8; stream.length() as usize];
    stream.read_to_native(&mut out).unwrap();
    assert_eq!(out, b"Hello, gpck!");
}

#[test]
fn identical_content_is_deduplicated_when_enabled() {
    let dir = tempdir().unwrap();
    let payload = vec![0xABu8; 4096];
    let inputs = vec![
        write_input(dir.path(), "a.bin", &payload),
        write_input(dir.path(), "b.bin", &payload),
        write_input(dir.path(), "c.bin", &payload),
    ];

    let dedup_path = dir.path().join("dedup.gpck");
    let options = PackOptions { dedup: true, ..Default::default() };
    pack(&inputs, &[], &options, &dedup_path, &CancellationToken::new()).unwrap();

    let reader = ArchiveReader::open(&dedup_path).unwrap();
    let offsets: Vec<u64> = ["a.bin", "b.bin", "c.bin"]
        .iter()
        .map(|p| reader.try_get(AssetId::from_path(p)).unwrap().data_offset)
        .collect();
    assert_eq!(offsets[0], offsets[1]);
    assert_eq!(offsets[1], offsets[2]);

    let no_dedup_path = dir.path().join("nodedup.gpck");
    let options = PackOptions { dedup: false, ..Default::default() };
    pack(&inputs, &[], &options, &no_dedup_path, &CancellationToken::new()).unwrap();

    let reader = ArchiveReader::open(&no_dedup_path).unwrap();
    let offsets: Vec<u64> = ["a.bin", "b.bin", "c.bin"]
        .iter()
        .map(|p| reader.try_get(AssetId::from_path(p)).unwrap().data_offset)
        .collect();
    assert_ne!(offsets[0], offsets[1]);
    assert_ne!(offsets[1], offsets[2]);
}

#[test]
fn streaming_layout_reads_back_in_arbitrary_chunk_sizes() {
    let dir = tempdir().unwrap();
    // Pseudorandom-ish content so Zstd can't just collapse it to nothing.
    let mut content = vec![0u8; 300_000];
    let mut state: u32 = 0x2545F491;
    for byte in content.iter_mut() {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        *byte = (state & 0xFF) as u8;
    }
    let input = write_input(dir.path(), "level/big.bin", &content);
    let output = dir.path().join("out.gpck");

    // GDeflate has no implementation in this build (spec.md §1), so the
    // equivalent streaming-over-threshold coverage uses Zstd here.
    let options = PackOptions {
        method: Some(CompressionMethod::Zstd),
        large_file_threshold: 1024,
        ..Default::default()
    };
    pack(&[input], &[], &options, &output, &CancellationToken::new()).unwrap();

    let reader = ArchiveReader::open(&output).unwrap();
    let entry = reader.try_get(AssetId::from_path("level/big.bin")).unwrap();
    assert!(entry.flags.is_streaming());

    for chunk_size in [64 * 1024usize, 3 * 1024 * 1024, 17] {
        let mut stream = reader.open_entry(entry);
        let mut collected = Vec::with_capacity(content.len());
        let mut buf = vec![0u8; chunk_size];
        loop {
            let n = stream.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            collected.extend_from_slice(&buf[..n]);
        }
        assert_eq!(collected, content);
    }
}

#[test]
fn tampered_encrypted_chunk_fails_authentication() {
    let dir = tempdir().unwrap();
    let content = vec![0x42u8; 2 * 64 * 1024 + 1000];
    let input = write_input(dir.path(), "secret.bin", &content);
    let output = dir.path().join("out.gpck");

    let key = [9u8; 32];
    let options = PackOptions {
        method: Some(CompressionMethod::Zstd),
        encryption_key: Some(key),
        large_file_threshold: 1024,
        ..Default::default()
    };
    pack(&[input], &[], &options, &output, &CancellationToken::new()).unwrap();

    let expected_last_chunk = plan_chunks(content.len() as u64).len() - 1;

    {
        let mut file = fs::OpenOptions::new().read(true).write(true).open(&output).unwrap();
        let len = file.metadata().unwrap().len();
        assert!(len > 0);
        file.seek(SeekFrom::End(-1)).unwrap();
        let mut last_byte = [0u8; 1];
        file.read_exact(&mut last_byte).unwrap();
        file.seek(SeekFrom::End(-1)).unwrap();
        file.write_all(&[last_byte[0] ^ 0x01]).unwrap();
    }

    let reader = ArchiveReader::open(&output).unwrap();
    let entry = reader.try_get(AssetId::from_path("secret.bin")).unwrap();
    assert!(entry.flags.is_encrypted());

    let mut stream = reader.open_entry(entry).with_key(key);
    let mut out = vec![0u8; stream.length() as usize];
    let err = stream.read_to_native(&mut out).unwrap_err();
    match err {
        StreamError::AuthFailed { chunk_index } => assert_eq!(chunk_index, expected_last_chunk),
        other => panic!("expected AuthFailed, got {other:?}"),
    }
}

#[test]
fn texture_entries_carry_a_low_resolution_tail() {
    let dir = tempdir().unwrap();
    let dds_bytes = synthetic_dds(2048, 2048, 12);
    let input = write_input(dir.path(), "textures/hero.dds", &dds_bytes);
    let output = dir.path().join("out.gpck");

    pack(&[input], &[], &PackOptions::default(), &output, &CancellationToken::new()).unwrap();

    let reader = ArchiveReader::open(&output).unwrap();
    let entry = reader.try_get(AssetId::from_path("textures/hero.dds")).unwrap();
    assert_eq!(entry.flags.asset_type(), Some(AssetType::Texture));

    let (width, height) = entry.texture_dims();
    assert_eq!((width, height), (2048, 2048));
    let (mip_count, tail_size) = entry.texture_mip_info();
    assert_eq!(mip_count, 12);
    assert!(tail_size > 128);

    let mut stream = reader.open_entry(entry);
    let mut out = vec![0u8; stream.length() as usize];
    stream.read_to_native(&mut out).unwrap();
    // Total byte count is preserved across the tail/payload rearrangement.
    assert_eq!(out.len(), dds_bytes.len());

    // The first `tail_size` bytes alone must be a self-contained, valid DDS
    // covering only the resident (low-resolution) mips (`spec.md` §4.4).
    let tail_header = DdsHeader::parse(&out[..tail_size as usize]).unwrap();
    assert!(tail_header.width <= 128 && tail_header.height <= 128);

    let original_header = DdsHeader::parse(&dds_bytes).unwrap();
    let plan = dds::plan_split(&original_header, None);
    assert_eq!(tail_header.mip_count, plan.tail_mip_count);
}

#[test]
fn overlay_mount_order_determines_precedence() {
    let dir = tempdir().unwrap();

    let base_input = write_input(dir.path(), "ui/hello.txt", b"base");
    let base_path = dir.path().join("base.gpck");
    pack(&[base_input], &[], &PackOptions::default(), &base_path, &CancellationToken::new()).unwrap();

    let patch_input = write_input(dir.path(), "ui/hello.txt", b"patch");
    let patch_path = dir.path().join("patch.gpck");
    pack(&[patch_input], &[], &PackOptions::default(), &patch_path, &CancellationToken::new()).unwrap();

    let base_reader = ArchiveReader::open(&base_path).unwrap();
    let patch_reader = ArchiveReader::open(&patch_path).unwrap();
    let overlay = OverlayFileSystem::new(vec![
        ("base".to_string(), base_reader),
        ("patch".to_string(), patch_reader),
    ]);

    assert!(overlay.exists("ui/hello.txt"));
    assert_eq!(overlay.source_of("ui/hello.txt"), Some("patch"));

    let mut stream = overlay.open("ui/hello.txt").unwrap();
    let mut out = vec![0u8; stream.length() as usize];
    stream.read_to_native(&mut out).unwrap();
    assert_eq!(out, b"patch");
}

#[test]
fn dependencies_resolve_by_virtual_path() {
    let dir = tempdir().unwrap();
    let scene = write_input(dir.path(), "level.scene", b"scene data");
    let model = write_input(dir.path(), "hero.model", b"model data");
    let output = dir.path().join("out.gpck");

    let deps = vec![PackDependency {
        source_path: "level.scene".to_string(),
        target_path: "hero.model".to_string(),
        dep_type: DependencyType::Hard,
    }];
    pack(&[scene, model], &deps, &PackOptions::default(), &output, &CancellationToken::new()).unwrap();

    let reader = ArchiveReader::open(&output).unwrap();
    let source_id = AssetId::from_path("level.scene");
    let target_id = AssetId::from_path("hero.model");
    let deps = reader.dependencies_of(source_id);
    assert_eq!(deps.len(), 1);
    assert_eq!(deps[0].target_id, target_id);
    assert_eq!(deps[0].dep_type, DependencyType::Hard);
}
