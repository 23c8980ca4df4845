use qembag::{embedding_bag_lookup, BagOptions, BitWidth, ByteMatrix, EmbagError, PackedEmbedding};

fn one_row() -> Vec<u8> {
    let mut data = vec![1u8, 2];
    data.extend_from_slice(&1.0f32.to_le_bytes());
    data.extend_from_slice(&0.0f32.to_le_bytes());
    data
}

#[test]
fn missing_offsets_is_domain_error() {
    let data = one_row();
    let m = ByteMatrix::from_shape(&data, &[1, 10]).unwrap();
    let err = embedding_bag_lookup(&m, &[0], None, BitWidth::Eight, None, None, BagOptions::default()).unwrap_err();
    assert!(matches!(err, EmbagError::Domain(_)), "{}", err);
}

#[test]
fn weight_count_must_match_indices() {
    let data = one_row();
    let m = ByteMatrix::from_shape(&data, &[1, 10]).unwrap();
    let err = embedding_bag_lookup(&m, &[0, 0], Some(&[0]), BitWidth::Eight, Some(&[1.0]), None, BagOptions::default()).unwrap_err();
    assert!(matches!(err, EmbagError::Shape(_)), "{}", err);
}

#[test]
fn out_of_range_row_is_domain_error() {
    let data = one_row();
    let m = ByteMatrix::from_shape(&data, &[1, 10]).unwrap();
    for bad in [1i64, -1, i64::MAX] {
        let err = embedding_bag_lookup(&m, &[0, bad], Some(&[0]), BitWidth::Eight, None, None, BagOptions::default()).unwrap_err();
        assert!(matches!(err, EmbagError::Domain(_)), "{}", err);
    }
}

#[test]
fn table_shape_is_checked() {
    let data = one_row();
    assert!(matches!(ByteMatrix::from_shape(&data, &[10]), Err(EmbagError::Shape(_))));
    // 7 bytes cannot hold an 8-bit row's scale and bias
    let m = ByteMatrix::from_shape(&data[..7], &[1, 7]).unwrap();
    let err = embedding_bag_lookup(&m, &[], Some(&[0]), BitWidth::Eight, None, None, BagOptions::default()).unwrap_err();
    assert!(matches!(err, EmbagError::Shape(_)), "{}", err);
    assert!(matches!(PackedEmbedding::new(data, 2, 10, BitWidth::Eight), Err(EmbagError::Shape(_))));
}

#[test]
fn unsupported_bit_width_is_backend_error() {
    assert!(matches!(BitWidth::from_bits(2), Err(EmbagError::Backend(_))));
}

#[test]
fn errors_render_their_kind() {
    let e = EmbagError::Consistency("bag 3 starts at 5 after its end 4".into());
    assert_eq!(e.to_string(), "consistency error: bag 3 starts at 5 after its end 4");
}
