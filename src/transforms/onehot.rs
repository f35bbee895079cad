//! One-hot кодирование.

use super::Transform;
use crate::error::{ensure_shape, Result, TransformError};
use crate::item::{ArrayItem, Item, MaskMulti};
use ndarray::{Array1, ArrayD, ArrayViewMutD, Axis, IxDyn};
use num_traits::{One, Zero};
use rand::RngCore;
use std::fmt::Debug;
use std::marker::PhantomData;

/// Вектор длины `length` из нулей с единицей в позиции `index`.
///
/// Позиция считается с единицы: допустимо `1 <= index <= length`,
/// иначе [`TransformError::IndexOutOfRange`].
pub fn onehot<T: Clone + Zero + One>(index: usize, length: usize) -> Result<Array1<T>> {
    if index == 0 || index > length {
        return Err(TransformError::IndexOutOfRange { index, length });
    }
    let mut v = Array1::zeros(length);
    v[index - 1] = T::one();
    Ok(v)
}

/// [`onehot`] с элементами `f32`.
pub fn onehot_f32(index: usize, length: usize) -> Result<Array1<f32>> {
    onehot(index, length)
}

/// Кодирует маску в one-hot массив: к форме маски добавляется ось классов.
///
/// Порядок классов берётся из [`MaskMulti::classes`].
#[derive(Debug, Clone, Copy)]
pub struct OneHot<T = f32> {
    _eltype: PhantomData<fn() -> T>,
}

impl<T> OneHot<T> {
    pub fn new() -> Self {
        Self {
            _eltype: PhantomData,
        }
    }
}

impl<T> Default for OneHot<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn encode_into<C, T>(mut out: ArrayViewMutD<'_, T>, mask: &MaskMulti<C>) -> Result<()>
where
    C: Clone + PartialEq + Debug,
    T: Clone + Zero + One,
{
    let classes = mask.classes();
    // Позиции всех меток находятся до первой записи в `out`.
    let positions = mask
        .data()
        .iter()
        .map(|label| {
            classes
                .iter()
                .position(|c| c == label)
                .ok_or_else(|| TransformError::UnknownLabel(format!("{label:?}")))
        })
        .collect::<Result<Vec<usize>>>()?;

    let last = Axis(mask.ndim());
    out.fill(T::zero());
    for (mut lane, position) in out.lanes_mut(last).into_iter().zip(positions) {
        lane[position] = T::one();
    }
    Ok(())
}

fn encoded_shape<C>(mask: &MaskMulti<C>) -> Vec<usize>
where
    C: Clone + PartialEq,
{
    let mut shape = mask.shape().to_vec();
    shape.push(mask.classes().len());
    shape
}

impl<C, T> Transform<MaskMulti<C>> for OneHot<T>
where
    C: Clone + PartialEq + Debug,
    T: Clone + Zero + One,
{
    type Output = ArrayItem<T>;
    type State = ();

    fn random_state(&self, _rng: &mut dyn RngCore) {}

    fn apply_with(&self, mask: MaskMulti<C>, _state: &()) -> Result<ArrayItem<T>> {
        let mut out = ArrayD::zeros(IxDyn(&encoded_shape(&mask)));
        encode_into(out.view_mut(), &mask)?;
        Ok(ArrayItem::new(out))
    }

    fn apply_into_with<'b>(
        &self,
        buffer: &'b mut ArrayItem<T>,
        mask: MaskMulti<C>,
        _state: &(),
    ) -> Result<&'b mut ArrayItem<T>> {
        ensure_shape(&encoded_shape(&mask), buffer.shape())?;
        encode_into(buffer.data_mut(), &mask)?;
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;

    #[test]
    fn test_onehot_every_position() {
        let n = 5;
        for i in 1..=n {
            let v = onehot_f32(i, n).unwrap();
            assert_eq!(v.len(), n);
            assert_eq!(v[i - 1], 1.0);
            assert_eq!(v.iter().filter(|&&x| x == 0.0).count(), n - 1);
        }
    }

    #[test]
    fn test_onehot_out_of_range() {
        assert_eq!(
            onehot_f32(0, 3),
            Err(TransformError::IndexOutOfRange { index: 0, length: 3 })
        );
        assert_eq!(
            onehot::<u8>(4, 3),
            Err(TransformError::IndexOutOfRange { index: 4, length: 3 })
        );
    }

    #[test]
    fn test_onehot_integer_type() {
        let v = onehot::<i64>(2, 3).unwrap();
        assert_eq!(v.to_vec(), vec![0, 1, 0]);
    }

    #[test]
    fn test_mask_encoding() {
        let labels = arr2(&[['b', 'a'], ['c', 'b']]).into_dyn();
        let mask = MaskMulti::new(labels, vec!['a', 'b', 'c']).unwrap();
        let out = OneHot::<f32>::new().apply(mask).unwrap();

        assert_eq!(out.shape(), &[2, 2, 3]);
        assert_eq!(out.data()[[0, 0, 1]], 1.0);
        assert_eq!(out.data()[[0, 1, 0]], 1.0);
        assert_eq!(out.data()[[1, 0, 2]], 1.0);
        assert_eq!(out.data().sum(), 4.0);
    }

    #[test]
    fn test_unknown_label() {
        let mask = MaskMulti::new(ndarray::arr1(&[1u8, 9]).into_dyn(), vec![0u8, 1]).unwrap();
        let err = OneHot::<f32>::new().apply(mask).unwrap_err();
        assert_eq!(err, TransformError::UnknownLabel("9".to_string()));
    }

    #[test]
    fn test_buffered_unknown_label_leaves_buffer_intact() {
        let mask = MaskMulti::new(ndarray::arr1(&[1u8, 7]).into_dyn(), vec![0u8, 1]).unwrap();
        let mut buffer = ArrayItem::from_shape_vec(&[2, 2], vec![5.0f32; 4]).unwrap();

        let err = OneHot::<f32>::new().apply_into(&mut buffer, mask).unwrap_err();
        assert_eq!(err, TransformError::UnknownLabel("7".to_string()));
        assert!(buffer.data().iter().all(|&x| x == 5.0));
    }

    #[test]
    fn test_buffered_overwrites_stale_values() {
        let mask = MaskMulti::new(ndarray::arr1(&[0u8, 1]).into_dyn(), vec![0u8, 1]).unwrap();
        let mut buffer = ArrayItem::from_shape_vec(&[2, 2], vec![5.0f32; 4]).unwrap();

        OneHot::<f32>::new().apply_into(&mut buffer, mask.clone()).unwrap();
        assert_eq!(buffer, OneHot::<f32>::new().apply(mask).unwrap());
    }
}
