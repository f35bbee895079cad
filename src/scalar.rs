// --- Файл: src/scalar.rs ---

//! Числовые типы элементов и поэлементное приведение между ними.

use crate::error::{ensure_shape, Result, TransformError};
use ndarray::{ArrayD, ArrayViewD, ArrayViewMutD};
use num_traits::NumCast;
use std::any::type_name;
use std::fmt::Debug;

/// Примитивный числовой тип, допустимый в качестве элемента массива.
pub trait Scalar: Copy + NumCast + Debug + PartialEq + Send + Sync + 'static {
    /// `true` для целочисленных типов: в них нельзя молча отбросить дробную часть.
    const INTEGRAL: bool;
}

macro_rules! impl_scalar {
    ($integral:expr => $($t:ty),*) => {
        $(impl Scalar for $t {
            const INTEGRAL: bool = $integral;
        })*
    };
}

impl_scalar!(true => u8, u16, u32, u64, usize, i8, i16, i32, i64, isize);
impl_scalar!(false => f32, f64);

/// Приводит одно значение к типу `T`.
///
/// Ошибка, если значение не помещается в `T`, является NaN для целого типа
/// или имеет дробную часть при приведении к целому типу.
pub fn convert<S: Scalar, T: Scalar>(value: S) -> Result<T> {
    let error = || TransformError::Conversion {
        value: format!("{value:?}"),
        target: type_name::<T>(),
    };

    if T::INTEGRAL && !S::INTEGRAL {
        let v = value.to_f64().ok_or_else(error)?;
        if v.fract() != 0.0 {
            return Err(error());
        }
    }

    <T as NumCast>::from(value).ok_or_else(error)
}

/// Поэлементно приводит массив к типу `T`, сохраняя форму.
pub fn convert_array<S: Scalar, T: Scalar>(source: &ArrayViewD<'_, S>) -> Result<ArrayD<T>> {
    let values = source
        .iter()
        .map(|&v| convert(v))
        .collect::<Result<Vec<T>>>()?;

    ArrayD::from_shape_vec(source.raw_dim(), values).map_err(|_| TransformError::ShapeMismatch {
        expected: source.shape().to_vec(),
        actual: vec![source.len()],
    })
}

/// Записывает приведённые значения `source` в существующий массив `target`.
///
/// Все значения приводятся до первой записи: при ошибке `target` не изменён.
pub fn convert_into<S: Scalar, T: Scalar>(
    mut target: ArrayViewMutD<'_, T>,
    source: &ArrayViewD<'_, S>,
) -> Result<()> {
    ensure_shape(source.shape(), target.shape())?;
    let values = source
        .iter()
        .map(|&v| convert(v))
        .collect::<Result<Vec<T>>>()?;
    for (dst, value) in target.iter_mut().zip(values) {
        *dst = value;
    }
    Ok(())
}
