// --- Файл: src/transforms/eltype.rs ---

//! Приведение типа элементов массива.

use super::Transform;
use crate::error::{ensure_shape, Result, TransformError};
use crate::item::{ArrayItem, Item};
use crate::scalar::{convert_array, convert_into, Scalar};
use rand::RngCore;
use std::any::Any;
use std::marker::PhantomData;
use tracing::trace;

/// Приводит элементы массива к типу `T`.
///
/// Если элементы уже имеют тип `T`, элемент возвращается как есть, без копии.
/// Непредставимое значение (переполнение, дробь в целый тип, NaN) даёт
/// [`TransformError::Conversion`](crate::error::TransformError::Conversion).
///
/// # Пример
/// ```ignore
/// let bytes = ToEltype::<u8>::new().apply(item)?;
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ToEltype<T> {
    _eltype: PhantomData<fn() -> T>,
}

impl<T: Scalar> ToEltype<T> {
    pub fn new() -> Self {
        Self {
            _eltype: PhantomData,
        }
    }
}

impl<T: Scalar> Default for ToEltype<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Забирает элемент из `slot` только если `S` и `T` один и тот же тип.
fn take_if_same<S: 'static, T: 'static>(slot: &mut Option<ArrayItem<S>>) -> Option<ArrayItem<T>> {
    (slot as &mut dyn Any)
        .downcast_mut::<Option<ArrayItem<T>>>()
        .and_then(Option::take)
}

impl<S: Scalar, T: Scalar> Transform<ArrayItem<S>> for ToEltype<T> {
    type Output = ArrayItem<T>;
    type State = ();

    fn random_state(&self, _rng: &mut dyn RngCore) {}

    fn apply_with(&self, item: ArrayItem<S>, _state: &()) -> Result<ArrayItem<T>> {
        let mut slot = Some(item);
        match (take_if_same::<S, T>(&mut slot), slot) {
            (Some(same), _) => {
                trace!(eltype = std::any::type_name::<T>(), "тип элементов уже совпадает");
                Ok(same)
            }
            (None, Some(item)) => Ok(ArrayItem::new(convert_array(&item.data().view())?)),
            (None, None) => Err(TransformError::InvalidParameter(format!(
                "элемент потерян при проверке типа {}",
                std::any::type_name::<T>()
            ))),
        }
    }

    fn apply_into_with<'b>(
        &self,
        buffer: &'b mut ArrayItem<T>,
        item: ArrayItem<S>,
        _state: &(),
    ) -> Result<&'b mut ArrayItem<T>> {
        ensure_shape(item.shape(), buffer.shape())?;
        convert_into(buffer.data_mut(), &item.data().view())?;
        Ok(buffer)
    }
}
