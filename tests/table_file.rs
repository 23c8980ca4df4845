use std::fs::File;
use std::io::Write;

fn byte_payload() -> Vec<u8> {
    let mut data = Vec::new();
    for (p, s, b) in [([4u8, 8], 0.5f32, 0.0f32), ([1, 3], 2.0, -1.0), ([0, 255], 1.0, 0.0)] {
        data.extend_from_slice(&p);
        data.extend_from_slice(&s.to_le_bytes());
        data.extend_from_slice(&b.to_le_bytes());
    }
    data
}

#[test]
fn table_file_round_trip() {
    use qembag::{BitWidth, PackedEmbedding};
    std::fs::create_dir_all("target").unwrap();
    let path = "target/qembag_round_trip.bin";
    let emb = PackedEmbedding::new(byte_payload(), 3, 10, BitWidth::Eight).unwrap();
    emb.save(path).unwrap();
    let loaded = PackedEmbedding::load(path).unwrap();
    assert_eq!(loaded, emb);
    assert_eq!(loaded.version(), 1);
    assert_eq!(loaded.dim(), 2);
    assert_eq!(loaded.table().unwrap().decode_row(1).unwrap(), vec![1.0, 5.0]);
}

#[test]
fn table_loader_reads_header() {
    use qembag::{BitWidth, PackedEmbedding};
    std::fs::create_dir_all("target").unwrap();
    let path = "target/qembag_nibble_header.bin";
    let mut f = File::create(path).unwrap();
    f.write_all(b"QEMBAG01").unwrap();
    f.write_all(&1u32.to_le_bytes()).unwrap();
    // 4-bit, 2 rows of width 6 (4 elements each)
    f.write_all(&4u32.to_le_bytes()).unwrap();
    f.write_all(&2u32.to_le_bytes()).unwrap();
    f.write_all(&6u32.to_le_bytes()).unwrap();
    f.write_all(&[0u8; 12]).unwrap();
    drop(f);
    let emb = PackedEmbedding::load(path).unwrap();
    assert_eq!(emb.bit_width(), BitWidth::Four);
    assert_eq!(emb.rows(), 2);
    assert_eq!(emb.dim(), 4);
}

#[test]
fn table_loader_rejects_truncated_and_bad_magic() {
    use qembag::PackedEmbedding;
    std::fs::create_dir_all("target").unwrap();
    let path = "target/qembag_truncated.bin";
    let mut f = File::create(path).unwrap();
    f.write_all(b"QEMBAG01").unwrap();
    f.write_all(&1u32.to_le_bytes()).unwrap();
    f.write_all(&8u32.to_le_bytes()).unwrap();
    f.write_all(&4u32.to_le_bytes()).unwrap();
    f.write_all(&12u32.to_le_bytes()).unwrap();
    f.write_all(&[0u8; 20]).unwrap();
    drop(f);
    assert!(PackedEmbedding::load(path).is_err());

    let path = "target/qembag_bad_magic.bin";
    File::create(path).unwrap().write_all(b"NOTQEMB1\x01\x00\x00\x00").unwrap();
    assert!(PackedEmbedding::load(path).is_err());
}

#[test]
fn packed_embedding_dispatches_by_bit_width() {
    use qembag::{BagOptions, BitWidth, EmbagError, ExecParams, PackedEmbedding};
    let exec = ExecParams::default();
    let emb = PackedEmbedding::new(byte_payload(), 3, 10, BitWidth::Eight).unwrap();
    let bags = emb.embedding_bag(&[0, 2, 1], Some(&[0, 2]), None, None, BagOptions::default(), &exec).unwrap();
    assert_eq!(bags.to_rows(), vec![vec![2.0, 259.0], vec![1.0, 5.0]]);
    let single = emb.embedding(&[2, 0], false, None, &exec).unwrap();
    assert_eq!(single.to_rows(), vec![vec![0.0, 255.0], vec![2.0, 4.0]]);

    let mut nibble = vec![0x31u8];
    nibble.extend_from_slice(&half::f16::from_f32(1.0).to_le_bytes());
    nibble.extend_from_slice(&half::f16::from_f32(0.0).to_le_bytes());
    let emb4 = PackedEmbedding::new(nibble, 1, 5, BitWidth::Four).unwrap();
    let bags = emb4.embedding_bag(&[0], Some(&[0]), None, None, BagOptions::default(), &exec).unwrap();
    assert_eq!(bags.to_rows(), vec![vec![1.0, 3.0]]);
    let err = emb4.embedding(&[0], false, None, &exec).unwrap_err();
    assert!(matches!(err, EmbagError::Backend(_)), "{}", err);
    assert!(err.to_string().contains("pass offsets"), "{}", err);
}

#[test]
fn table_loader_rejects_oversized_header() {
    use qembag::PackedEmbedding;
    std::fs::create_dir_all("target").unwrap();
    let path = "target/qembag_oversized.bin";
    let mut f = File::create(path).unwrap();
    f.write_all(b"QEMBAG01").unwrap();
    f.write_all(&1u32.to_le_bytes()).unwrap();
    f.write_all(&8u32.to_le_bytes()).unwrap();
    f.write_all(&u32::MAX.to_le_bytes()).unwrap();
    f.write_all(&u32::MAX.to_le_bytes()).unwrap();
    f.write_all(&[0u8; 16]).unwrap();
    drop(f);
    let err = PackedEmbedding::load(path).unwrap_err();
    let msg = format!("{:#}", err);
    assert!(msg.contains("truncated") || msg.contains("too large"), "{}", msg);
}

#[test]
fn packed_embedding_rejects_overflowing_shape() {
    use qembag::{BitWidth, EmbagError, PackedEmbedding};
    let err = PackedEmbedding::new(vec![0u8; 16], usize::MAX, 2, BitWidth::Eight).unwrap_err();
    assert!(matches!(err, EmbagError::Shape(_)), "{}", err);
}
