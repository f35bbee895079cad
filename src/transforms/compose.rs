// --- Файл: src/transforms/compose.rs ---

//! Композиция преобразований.

use super::Transform;
use crate::error::{ensure_shape, Result, TransformError};
use crate::item::Item;
use rand::{Rng, RngCore};
use tracing::debug;

/// Последовательное применение двух преобразований (`first`, затем `second`).
///
/// Случайное состояние цепочки есть пара состояний её звеньев.
/// Обычно строится через [`TransformExt::then`].
#[derive(Debug, Clone)]
pub struct Chain<A, B> {
    first: A,
    second: B,
}

impl<A, B> Chain<A, B> {
    pub fn new(first: A, second: B) -> Self {
        Self { first, second }
    }
}

impl<I, A, B> Transform<I> for Chain<A, B>
where
    A: Transform<I>,
    B: Transform<A::Output>,
{
    type Output = B::Output;
    type State = (A::State, B::State);

    fn random_state(&self, rng: &mut dyn RngCore) -> Self::State {
        (self.first.random_state(rng), self.second.random_state(rng))
    }

    fn apply_with(&self, item: I, state: &Self::State) -> Result<B::Output> {
        let mid = self.first.apply_with(item, &state.0)?;
        self.second.apply_with(mid, &state.1)
    }

    /// В буфер пишет только последнее звено; промежуточный элемент выделяется.
    fn apply_into_with<'b>(
        &self,
        buffer: &'b mut B::Output,
        item: I,
        state: &Self::State,
    ) -> Result<&'b mut B::Output> {
        let mid = self.first.apply_with(item, &state.0)?;
        self.second.apply_into_with(buffer, mid, &state.1)
    }
}

/// Построение конвейеров: `a.then(b)` вместо `Chain::new(a, b)`.
///
/// Отдельный трейт без параметра элемента, чтобы вызов не требовал указывать,
/// к какому виду элементов будет применяться цепочка.
pub trait TransformExt: Sized + Send + Sync {
    /// Выполняет `next` после `self`.
    fn then<B>(self, next: B) -> Chain<Self, B> {
        Chain::new(self, next)
    }
}

impl<T: Send + Sync> TransformExt for T {}

/// Применяет вложенное преобразование с вероятностью `p`, иначе пропускает элемент.
///
/// # Пример
/// ```ignore
/// let maybe = Maybe::new(Normalize::imagenet(), 0.5)?;
/// let state = maybe.random_state(&mut rng);
/// let out = maybe.apply_with(item, &state)?; // повторяемо при том же state
/// ```
#[derive(Debug, Clone)]
pub struct Maybe<T> {
    inner: T,
    p: f64,
}

impl<T> Maybe<T> {
    pub fn new(inner: T, p: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&p) {
            return Err(TransformError::InvalidParameter(format!(
                "вероятность должна быть в [0.0, 1.0], получено {p}"
            )));
        }
        debug!(p, "создано случайное применение");
        Ok(Self { inner, p })
    }

    pub fn probability(&self) -> f64 {
        self.p
    }
}

impl<I, T> Transform<I> for Maybe<T>
where
    I: Item,
    T: Transform<I, Output = I>,
{
    type Output = I;
    /// Выпало ли применение и состояние вложенного преобразования.
    type State = (bool, T::State);

    fn random_state(&self, rng: &mut dyn RngCore) -> Self::State {
        (rng.random_bool(self.p), self.inner.random_state(rng))
    }

    fn apply_with(&self, item: I, state: &Self::State) -> Result<I> {
        if state.0 {
            self.inner.apply_with(item, &state.1)
        } else {
            Ok(item)
        }
    }

    fn apply_into_with<'b>(&self, buffer: &'b mut I, item: I, state: &Self::State) -> Result<&'b mut I> {
        if state.0 {
            return self.inner.apply_into_with(buffer, item, &state.1);
        }
        ensure_shape(item.shape(), buffer.shape())?;
        buffer.data_mut().assign(item.data());
        Ok(buffer)
    }
}
