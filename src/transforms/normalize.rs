// --- Файл: src/transforms/normalize.rs ---

//! Поканальная нормализация по последней оси: `(x - mean) / std` и обратная ей.

use super::Transform;
use crate::error::{ensure_shape, Result, TransformError};
use crate::item::{ArrayItem, Item};
use crate::scalar::{convert, Scalar};
use ndarray::{ArrayD, ArrayViewD, ArrayViewMutD, Axis, IxDyn};
use num_traits::{Float, FromPrimitive};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Средние и стандартные отклонения по каналам.
///
/// Длины `means` и `stds` совпадают и равны числу каналов, то есть длине
/// последней оси данных.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawStats")]
pub struct ChannelStats {
    means: Vec<f64>,
    stds: Vec<f64>,
}

#[derive(Deserialize)]
struct RawStats {
    means: Vec<f64>,
    stds: Vec<f64>,
}

impl TryFrom<RawStats> for ChannelStats {
    type Error = TransformError;

    fn try_from(raw: RawStats) -> Result<Self> {
        Self::new(raw.means, raw.stds)
    }
}

impl ChannelStats {
    /// Создаёт статистики. Длины обязаны совпадать уже здесь, а не при применении.
    pub fn new(means: impl Into<Vec<f64>>, stds: impl Into<Vec<f64>>) -> Result<Self> {
        let means = means.into();
        let stds = stds.into();
        if means.len() != stds.len() {
            return Err(TransformError::LengthMismatch {
                what: "means/stds",
                left: means.len(),
                right: stds.len(),
            });
        }
        if means.is_empty() {
            return Err(TransformError::InvalidParameter(
                "нужен хотя бы один канал".to_string(),
            ));
        }
        Ok(Self { means, stds })
    }

    /// Оценивает среднее и выборочное стандартное отклонение каждого канала.
    pub fn fit<T>(data: &ArrayD<T>) -> Result<Self>
    where
        T: Float + FromPrimitive + Scalar,
    {
        let last = data.ndim().checked_sub(1).ok_or(TransformError::InvalidRank {
            expected: "≥ 1",
            actual: 0,
        })?;
        let channels = data.len_of(Axis(last));
        let samples = if channels == 0 { 0 } else { data.len() / channels };
        if samples < 2 {
            return Err(TransformError::InvalidParameter(format!(
                "для оценки стандартного отклонения нужно ≥ 2 значений на канал, есть {samples}"
            )));
        }

        let mut means: Vec<f64> = Vec::with_capacity(channels);
        let mut stds: Vec<f64> = Vec::with_capacity(channels);
        for c in 0..channels {
            let lane = data.index_axis(Axis(last), c);
            let mean = lane.mean().unwrap_or_else(T::zero);
            means.push(convert(mean)?);
            stds.push(convert(lane.std(T::one()))?);
        }
        debug!(channels, samples, "оценены поканальные статистики");
        Self::new(means, stds)
    }

    pub fn means(&self) -> &[f64] {
        &self.means
    }

    pub fn stds(&self) -> &[f64] {
        &self.stds
    }

    pub fn channels(&self) -> usize {
        self.means.len()
    }

    /// Приводит статистики к типу элементов данных.
    fn cast<T: Scalar>(&self) -> Result<(Vec<T>, Vec<T>)> {
        let means: Vec<T> = self.means.iter().map(|&m| convert(m)).collect::<Result<_>>()?;
        let stds: Vec<T> = self.stds.iter().map(|&s| convert(s)).collect::<Result<_>>()?;
        Ok((means, stds))
    }
}

/// Проверяет, что последняя ось данных имеет `channels` элементов.
fn ensure_channels(shape: &[usize], channels: usize) -> Result<()> {
    match shape.last() {
        Some(&actual) if actual == channels => Ok(()),
        Some(&actual) => Err(TransformError::ChannelMismatch {
            expected: channels,
            actual,
        }),
        None => Err(TransformError::InvalidRank {
            expected: "≥ 1",
            actual: 0,
        }),
    }
}

/// Форма `(1, ..., 1, n)`, совместимая с данными размерности `ndim` для broadcasting.
fn broadcast_shape(ndim: usize, n: usize) -> Vec<usize> {
    let mut shape = vec![1; ndim];
    if let Some(last) = shape.last_mut() {
        *last = n;
    }
    shape
}

fn channel_views<'a, T>(
    ndim: usize,
    means: &'a [T],
    stds: &'a [T],
) -> Result<(ArrayViewD<'a, T>, ArrayViewD<'a, T>)> {
    let shape = broadcast_shape(ndim, means.len());
    let reshape = |v: &'a [T]| {
        ArrayViewD::from_shape(IxDyn(&shape), v).map_err(|_| TransformError::LengthMismatch {
            what: "means/stds",
            left: means.len(),
            right: v.len(),
        })
    };
    Ok((reshape(means)?, reshape(stds)?))
}

/// Нормализует данные на месте: сначала вычитание среднего, затем деление.
pub fn normalize_inplace<T: Float>(
    mut data: ArrayViewMutD<'_, T>,
    means: &[T],
    stds: &[T],
) -> Result<()> {
    ensure_channels(data.shape(), means.len())?;
    let (means, stds) = channel_views(data.ndim(), means, stds)?;
    data.zip_mut_with(&means, |x, &m| *x = *x - m);
    data.zip_mut_with(&stds, |x, &s| *x = *x / s);
    Ok(())
}

/// Обратная операция к [`normalize_inplace`]: `x * std + mean`.
pub fn denormalize_inplace<T: Float>(
    mut data: ArrayViewMutD<'_, T>,
    means: &[T],
    stds: &[T],
) -> Result<()> {
    ensure_channels(data.shape(), means.len())?;
    let (means, stds) = channel_views(data.ndim(), means, stds)?;
    data.zip_mut_with(&stds, |x, &s| *x = *x * s);
    data.zip_mut_with(&means, |x, &m| *x = *x + m);
    Ok(())
}

/// Оценивает статистики всего массива и нормализует его на месте.
///
/// Возвращает [`Normalize`] с найденными статистиками, чтобы применять их
/// повторно, а не переоценивать на каждом элементе конвейера.
///
/// Канал с нулевым разбросом нельзя стандартизовать: это
/// [`TransformError::InvalidParameter`], и `data` остаётся без изменений.
/// [`Normalize::fit`] такие статистики возвращает как есть.
pub fn standardize<T>(data: &mut ArrayD<T>) -> Result<Normalize>
where
    T: Float + FromPrimitive + Scalar,
{
    let norm = Normalize::fit(data)?;
    if let Some(channel) = norm.stats.stds().iter().position(|&s| !(s.is_finite() && s > 0.0)) {
        return Err(TransformError::InvalidParameter(format!(
            "канал {channel} имеет нулевое стандартное отклонение"
        )));
    }
    let (means, stds) = norm.stats.cast::<T>()?;
    normalize_inplace(data.view_mut(), &means, &stds)?;
    Ok(norm)
}

/// Нормализует данные поканальной статистикой по последней оси.
///
/// # Математическая операция
/// ```text
/// output[..., c] = (input[..., c] - mean[c]) / std[c]
/// ```
///
/// Результат не обрезается: выход за какой-либо диапазон допустим.
///
/// # Пример
/// ```ignore
/// let norm = Normalize::new([0.5, 0.5, 0.5], [0.25, 0.25, 0.25])?;
/// let normalized = norm.apply(item)?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Normalize {
    stats: ChannelStats,
}

impl Normalize {
    /// Создаёт нормализацию. Ошибка [`TransformError::LengthMismatch`] при разных длинах.
    pub fn new(means: impl Into<Vec<f64>>, stds: impl Into<Vec<f64>>) -> Result<Self> {
        ChannelStats::new(means, stds).map(Self::from)
    }

    /// Стандартная нормализация ImageNet (RGB).
    pub fn imagenet() -> Self {
        Self {
            stats: ChannelStats {
                means: vec![0.485, 0.456, 0.406],
                stds: vec![0.229, 0.224, 0.225],
            },
        }
    }

    /// Оценивает параметры по данным, не изменяя их.
    pub fn fit<T>(data: &ArrayD<T>) -> Result<Self>
    where
        T: Float + FromPrimitive + Scalar,
    {
        ChannelStats::fit(data).map(Self::from)
    }

    pub fn stats(&self) -> &ChannelStats {
        &self.stats
    }

    /// Обратное преобразование с теми же статистиками.
    pub fn inverse(&self) -> Denormalize {
        Denormalize::from(self.stats.clone())
    }
}

impl From<ChannelStats> for Normalize {
    fn from(stats: ChannelStats) -> Self {
        Self { stats }
    }
}

impl<T: Float + Scalar> Transform<ArrayItem<T>> for Normalize {
    type Output = ArrayItem<T>;
    type State = ();

    fn random_state(&self, _rng: &mut dyn RngCore) {}

    fn apply_with(&self, mut item: ArrayItem<T>, _state: &()) -> Result<ArrayItem<T>> {
        let (means, stds) = self.stats.cast::<T>()?;
        normalize_inplace(item.data_mut(), &means, &stds)?;
        Ok(item)
    }

    fn apply_into_with<'b>(
        &self,
        buffer: &'b mut ArrayItem<T>,
        item: ArrayItem<T>,
        _state: &(),
    ) -> Result<&'b mut ArrayItem<T>> {
        ensure_shape(item.shape(), buffer.shape())?;
        ensure_channels(item.shape(), self.stats.channels())?;
        let (means, stds) = self.stats.cast::<T>()?;
        buffer.data_mut().assign(item.data());
        normalize_inplace(buffer.data_mut(), &means, &stds)?;
        Ok(buffer)
    }
}

/// Обратная к [`Normalize`] операция: `output[..., c] = input[..., c] * std[c] + mean[c]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Denormalize {
    stats: ChannelStats,
}

impl Denormalize {
    pub fn new(means: impl Into<Vec<f64>>, stds: impl Into<Vec<f64>>) -> Result<Self> {
        ChannelStats::new(means, stds).map(Self::from)
    }

    pub fn stats(&self) -> &ChannelStats {
        &self.stats
    }

    pub fn inverse(&self) -> Normalize {
        Normalize::from(self.stats.clone())
    }
}

impl From<ChannelStats> for Denormalize {
    fn from(stats: ChannelStats) -> Self {
        Self { stats }
    }
}

impl<T: Float + Scalar> Transform<ArrayItem<T>> for Denormalize {
    type Output = ArrayItem<T>;
    type State = ();

    fn random_state(&self, _rng: &mut dyn RngCore) {}

    fn apply_with(&self, mut item: ArrayItem<T>, _state: &()) -> Result<ArrayItem<T>> {
        let (means, stds) = self.stats.cast::<T>()?;
        denormalize_inplace(item.data_mut(), &means, &stds)?;
        Ok(item)
    }

    fn apply_into_with<'b>(
        &self,
        buffer: &'b mut ArrayItem<T>,
        item: ArrayItem<T>,
        _state: &(),
    ) -> Result<&'b mut ArrayItem<T>> {
        ensure_shape(item.shape(), buffer.shape())?;
        ensure_channels(item.shape(), self.stats.channels())?;
        let (means, stds) = self.stats.cast::<T>()?;
        buffer.data_mut().assign(item.data());
        denormalize_inplace(buffer.data_mut(), &means, &stds)?;
        Ok(buffer)
    }
}
