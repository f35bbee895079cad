//! # Transforms
//!
//! Every transform implements [`Transform`] for the item kinds it accepts.
//! There are two entry points:
//!
//! - [`Transform::apply`]: consumes an item and returns a new one
//! - [`Transform::apply_into`]: writes the result into a caller-owned buffer
//!   item of the exact output shape and returns that buffer
//!
//! Both have `_with` variants taking an explicit random state, so stochastic
//! pipelines can be replayed. Deterministic transforms use `State = ()`.
//!
//! ## Available Transforms
//!
//! - [`ToEltype`]: element type conversion
//! - [`Normalize`] / [`Denormalize`]: per-channel statistics over the last axis
//! - [`ImageToTensor`]: pixel grid into a numeric array with a trailing channel axis
//! - [`OneHot`]: categorical mask into a one-hot array
//! - [`Chain`], [`Maybe`]: sequencing and random application
//!
//! ## Example
//!
//! ```ignore
//! use rustyaug::transforms::{ImageToTensor, Normalize, Transform, TransformExt};
//!
//! let pipeline = ImageToTensor::<f32>::new().then(Normalize::imagenet());
//! let tensor = pipeline.apply(image)?;
//! ```

pub mod compose;
pub mod eltype;
pub mod normalize;
pub mod onehot;
pub mod tensor;

pub use compose::{Chain, Maybe, TransformExt};
pub use eltype::ToEltype;
pub use normalize::{
    denormalize_inplace, normalize_inplace, standardize, ChannelStats, Denormalize, Normalize,
};
pub use onehot::{onehot, onehot_f32, OneHot};
pub use tensor::{
    image_to_tensor, image_to_tensor_into, tensor_to_image, tensor_to_pixels, ColorImage,
    ImageToTensor,
};

use crate::error::{ensure_shape, Result};
use crate::item::Item;
use rand::RngCore;
use tracing::trace;

/// Протокол преобразования элемента вида `I`.
///
/// Параметры преобразования задаются при создании и больше не меняются,
/// поэтому один экземпляр можно разделять между потоками загрузки данных.
pub trait Transform<I>: Send + Sync {
    /// Вид элемента на выходе.
    type Output: Item;
    /// Случайное состояние одного применения.
    type State;

    /// Генерирует случайное состояние для одного применения.
    fn random_state(&self, rng: &mut dyn RngCore) -> Self::State;

    /// Применяет преобразование с заданным случайным состоянием.
    fn apply_with(&self, item: I, state: &Self::State) -> Result<Self::Output>;

    /// Применяет преобразование; состояние генерируется внутри.
    fn apply(&self, item: I) -> Result<Self::Output> {
        let state = self.random_state(&mut rand::rng());
        self.apply_with(item, &state)
    }

    /// Записывает результат в `buffer` и возвращает его.
    ///
    /// Форма данных `buffer` должна совпадать с формой результата [`apply`](Self::apply).
    /// Реализация по умолчанию вычисляет результат через `apply_with` и копирует
    /// его; преобразования с настоящим буферизованным путём её переопределяют.
    fn apply_into_with<'b>(
        &self,
        buffer: &'b mut Self::Output,
        item: I,
        state: &Self::State,
    ) -> Result<&'b mut Self::Output> {
        let output = self.apply_with(item, state)?;
        ensure_shape(output.shape(), buffer.shape())?;
        trace!(
            transform = std::any::type_name::<Self>(),
            "буферизованный путь через копию результата"
        );
        buffer.data_mut().assign(output.data());
        Ok(buffer)
    }

    /// Буферизованный вариант [`apply`](Self::apply).
    fn apply_into<'b>(&self, buffer: &'b mut Self::Output, item: I) -> Result<&'b mut Self::Output> {
        let state = self.random_state(&mut rand::rng());
        self.apply_into_with(buffer, item, &state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransformError;
    use crate::item::ArrayItem;

    /// Преобразование без собственного буферизованного пути.
    struct Double;

    impl Transform<ArrayItem<f32>> for Double {
        type Output = ArrayItem<f32>;
        type State = ();

        fn random_state(&self, _rng: &mut dyn RngCore) {}

        fn apply_with(&self, item: ArrayItem<f32>, _state: &()) -> Result<ArrayItem<f32>> {
            let data = item.data().mapv(|x| x * 2.0);
            item.with_data(data)
        }
    }

    #[test]
    fn test_default_apply_into_copies_result() {
        let item = ArrayItem::from_shape_vec(&[3], vec![1.0, 2.0, 3.0]).unwrap();
        let mut buffer = ArrayItem::<f32>::zeros(&[3]);

        let out = Double.apply_into(&mut buffer, item.clone()).unwrap();
        assert_eq!(out.data(), Double.apply(item).unwrap().data());
    }

    #[test]
    fn test_default_apply_into_rejects_wrong_buffer() {
        let item = ArrayItem::from_shape_vec(&[3], vec![1.0, 2.0, 3.0]).unwrap();
        let mut buffer = ArrayItem::<f32>::zeros(&[4]);

        let err = Double.apply_into(&mut buffer, item).unwrap_err();
        assert!(matches!(err, TransformError::ShapeMismatch { .. }));
        assert!(buffer.data().iter().all(|&x| x == 0.0));
    }
}
