use ndarray::arr2;
use preprocessing_engine::dtype::DType;
use preprocessing_engine::sequence::{Padding, SequenceElement, Truncating};
use preprocessing_engine::{pad_sequences, PadConfig, PreprocessError};

fn ragged() -> Vec<Vec<i64>> {
    vec![vec![5], vec![1, 2, 3, 4, 5, 6, 7], vec![], vec![8, 9, 10]]
}

#[test]
fn every_row_has_num_timesteps_columns() {
    let _ = env_logger::builder().is_test(true).try_init();
    for maxlen in [None, Some(1), Some(3), Some(10)] {
        let config = PadConfig {
            maxlen,
            ..Default::default()
        };
        let out = pad_sequences(&ragged(), &config).unwrap();
        assert_eq!(out.shape(), (4, maxlen.unwrap_or(7)));
    }
}

#[test]
fn short_rows_keep_values_and_fill_the_rest() {
    let config = PadConfig::default().with_maxlen(5).with_fill_value(-1.0);
    let pre = pad_sequences(&ragged(), &config).unwrap();
    let pre = pre.as_int32().unwrap();
    assert_eq!(pre.row(0).to_vec(), vec![-1, -1, -1, -1, 5]);
    assert_eq!(pre.row(2).to_vec(), vec![-1; 5]);
    assert_eq!(pre.row(3).to_vec(), vec![-1, -1, 8, 9, 10]);

    let post = pad_sequences(&ragged(), &config.with_padding(Padding::Post)).unwrap();
    let post = post.as_int32().unwrap();
    assert_eq!(post.row(0).to_vec(), vec![5, -1, -1, -1, -1]);
    assert_eq!(post.row(3).to_vec(), vec![8, 9, 10, -1, -1]);
}

#[test]
fn long_rows_keep_the_requested_end() {
    let batch = vec![vec![1i64, 2, 3, 4, 5]];
    let post = PadConfig::default().with_maxlen(3).with_truncating(Truncating::Post);
    assert_eq!(pad_sequences(&batch, &post).unwrap().as_int32().unwrap(), &arr2(&[[1, 2, 3]]));
    let pre = PadConfig::default().with_maxlen(3);
    assert_eq!(pad_sequences(&batch, &pre).unwrap().as_int32().unwrap(), &arr2(&[[3, 4, 5]]));
}

#[test]
fn already_shaped_batch_is_unchanged() {
    let batch = vec![vec![1i64, 2, 3], vec![4, 5, 6]];
    for padding in [Padding::Pre, Padding::Post] {
        for truncating in [Truncating::Pre, Truncating::Post] {
            let config = PadConfig::default()
                .with_maxlen(3)
                .with_padding(padding)
                .with_truncating(truncating)
                .with_dtype(DType::Int64);
            let out = pad_sequences(&batch, &config).unwrap();
            assert_eq!(out.as_int64().unwrap(), &arr2(&[[1, 2, 3], [4, 5, 6]]));
        }
    }
}

#[test]
fn defaults_pad_at_the_front() {
    let out = pad_sequences(&[vec![1u32, 2, 3], vec![4]], &PadConfig::default()).unwrap();
    assert_eq!(out.dtype(), DType::Int32);
    assert_eq!(out.as_int32().unwrap(), &arr2(&[[1, 2, 3], [0, 0, 4]]));
}

#[test]
fn empty_batch_gives_empty_matrix() {
    let batch: Vec<Vec<i64>> = Vec::new();
    let out = pad_sequences(&batch, &PadConfig::default()).unwrap();
    assert_eq!(out.shape(), (0, 0));
    let out = pad_sequences(&batch, &PadConfig::default().with_maxlen(4)).unwrap();
    assert_eq!(out.shape(), (0, 4));
}

#[test]
fn enum_strings_are_validated() {
    let err = "middle".parse::<Padding>().unwrap_err();
    assert!(matches!(err, PreprocessError::InvalidConfiguration(_)));
    assert!("end".parse::<Truncating>().is_err());
    assert!("int8".parse::<DType>().is_err());
}

#[test]
fn host_values_are_coerced_before_padding() {
    let batch = vec![
        vec![SequenceElement::Int(1), SequenceElement::Float(2.0), SequenceElement::from(" 3 ")],
        vec![SequenceElement::from("x")],
    ];
    let err = pad_sequences(&batch, &PadConfig::default()).unwrap_err();
    match err {
        PreprocessError::InvalidSequenceElement { row, column, .. } => assert_eq!((row, column), (1, 0)),
        other => panic!("unexpected error {:?}", other),
    }

    let out = pad_sequences(&batch[..1], &PadConfig::default().with_dtype(DType::Float32)).unwrap();
    assert_eq!(out.as_float32().unwrap(), &arr2(&[[1.0f32, 2.0, 3.0]]));
}

#[test]
fn float_output_carries_fractional_fill() {
    let config = PadConfig::default()
        .with_maxlen(3)
        .with_dtype(DType::Float64)
        .with_fill_value(0.5);
    let out = pad_sequences(&[vec![7i64]], &config).unwrap();
    let values = out.to_f64_array();
    assert!((values[[0, 0]] - 0.5).abs() < f64::EPSILON);
    assert!((values[[0, 2]] - 7.0).abs() < f64::EPSILON);
}
