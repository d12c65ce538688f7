use ndarray::{Array, Axis, Dimension};

use crate::error::{PreprocessError, Result};

/// Insert a length-1 axis at `axis`. Negative values count from the end of
/// the result, so `-1` appends a trailing axis.
///
/// ```
/// use ndarray::Array3;
/// use preprocessing_engine::io::array::expand_dims;
///
/// let img = Array3::<f32>::zeros((4, 5, 3));
/// assert_eq!(expand_dims(img.clone(), 0).unwrap().shape(), &[1, 4, 5, 3]);
/// assert_eq!(expand_dims(img, -1).unwrap().shape(), &[4, 5, 3, 1]);
/// ```
pub fn expand_dims<A, D: Dimension>(array: Array<A, D>, axis: isize) -> Result<Array<A, D::Larger>> {
    let out_ndim = array.ndim() as isize + 1;
    let resolved = if axis < 0 { axis + out_ndim } else { axis };
    if !(0..out_ndim).contains(&resolved) {
        return Err(PreprocessError::config(format!(
            "axis {} is out of bounds for an array of dimension {}",
            axis, out_ndim
        )));
    }
    Ok(array.insert_axis(Axis(resolved as usize)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr2, Array3};

    #[test]
    fn inserts_at_every_position() {
        let a = Array3::<f32>::zeros((2, 3, 4));
        assert_eq!(expand_dims(a.clone(), 1).unwrap().shape(), &[2, 1, 3, 4]);
        assert_eq!(expand_dims(a.clone(), 3).unwrap().shape(), &[2, 3, 4, 1]);
        assert_eq!(expand_dims(a.clone(), -4).unwrap().shape(), &[1, 2, 3, 4]);
        assert_eq!(expand_dims(a, -2).unwrap().shape(), &[2, 3, 1, 4]);
    }

    #[test]
    fn values_are_preserved() {
        let e = expand_dims(arr2(&[[1, 2], [3, 4]]), 0).unwrap();
        assert_eq!(e[[0, 1, 0]], 3);
    }

    #[test]
    fn out_of_range_axis() {
        let a = Array3::<f32>::zeros((2, 3, 4));
        assert!(expand_dims(a.clone(), 4).is_err());
        assert!(expand_dims(a, -5).is_err());
    }
}
