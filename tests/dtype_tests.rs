use preprocessing_engine::dtype::DType;
use preprocessing_engine::{pad_sequences, PadConfig, PreprocessError};

#[test]
fn int32_overflow_reports_the_source_position() {
    let batch = vec![vec![1i64, 2], vec![3, i64::from(i32::MAX) + 1]];
    let err = pad_sequences(&batch, &PadConfig::default()).unwrap_err();
    match err {
        PreprocessError::InvalidSequenceElement { row, column, .. } => assert_eq!((row, column), (1, 1)),
        other => panic!("unexpected error {:?}", other),
    }
    let wide = pad_sequences(&batch, &PadConfig::default().with_dtype(DType::Int64)).unwrap();
    assert_eq!(wide.as_int64().unwrap()[[1, 1]], i64::from(i32::MAX) + 1);
}

#[test]
fn dtype_names_round_trip_through_display() {
    for dtype in [DType::Int32, DType::Int64, DType::Float16, DType::Float32, DType::Float64] {
        assert_eq!(dtype.to_string().parse::<DType>().unwrap(), dtype);
    }
}

#[cfg(feature = "dtype_f16")]
#[test]
fn float16_output_rounds_fill() {
    let config = PadConfig::default()
        .with_maxlen(2)
        .with_dtype(DType::Float16)
        .with_fill_value(0.1);
    let out = pad_sequences(&[vec![3i64]], &config).unwrap();
    assert_eq!(out.dtype(), DType::Float16);
    let values = out.to_f64_array();
    assert!((values[[0, 0]] - 0.1).abs() < 1e-3);
    assert_eq!(values[[0, 1]], 3.0);
}

#[cfg(not(feature = "dtype_f16"))]
#[test]
fn float16_needs_its_feature() {
    let config = PadConfig::default().with_dtype(DType::Float16);
    let err = pad_sequences(&[vec![3i64]], &config).unwrap_err();
    assert!(matches!(err, PreprocessError::FeatureDisabled("dtype_f16")));
}
