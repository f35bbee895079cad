//! # Items
//!
//! Typed containers around one `ndarray::ArrayD` payload. Transforms consume
//! items and produce items; the buffered path writes into an item the caller
//! already owns.
//!
//! - [`ArrayItem`]: plain numeric array of any rank
//! - [`Image`]: 2D/3D grid of colour pixels (`image::Luma`, `image::Rgb`, ...)
//! - [`MaskMulti`]: categorical mask with an ordered list of classes
//!
//! The rank of an item never changes in place: [`Item::with_data`] rejects a
//! payload of another rank, and rank-changing transforms build a new item.

pub mod color;

pub use color::{channel_view, color_view};

use crate::error::{Result, TransformError};
use image::{ImageBuffer, Pixel};
use ndarray::{ArrayD, ArrayViewMutD, IxDyn};
use std::ops::Deref;

/// Общий контракт доступа к данным элемента.
pub trait Item: Sized {
    /// Тип элемента массива данных.
    type Elem: Clone;

    /// Возвращает данные элемента.
    fn data(&self) -> &ArrayD<Self::Elem>;

    /// Изменяемое представление данных. Форма через него не меняется.
    fn data_mut(&mut self) -> ArrayViewMutD<'_, Self::Elem>;

    /// Забирает данные, уничтожая элемент.
    fn into_data(self) -> ArrayD<Self::Elem>;

    /// Пересобирает элемент того же вида с новыми данными той же размерности.
    fn with_data(self, data: ArrayD<Self::Elem>) -> Result<Self>;

    fn shape(&self) -> &[usize] {
        self.data().shape()
    }

    fn ndim(&self) -> usize {
        self.data().ndim()
    }
}

fn ensure_same_rank(current: usize, replacement: usize) -> Result<()> {
    if current == replacement {
        Ok(())
    } else {
        Err(TransformError::InvalidRank {
            expected: "размерность исходного элемента",
            actual: replacement,
        })
    }
}

/// Произвольный числовой массив.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayItem<T> {
    data: ArrayD<T>,
}

impl<T> ArrayItem<T> {
    pub fn new(data: ArrayD<T>) -> Self {
        Self { data }
    }

    /// Создаёт элемент из плоского вектора в построчном порядке.
    pub fn from_shape_vec(shape: &[usize], values: Vec<T>) -> Result<Self> {
        let len = values.len();
        ArrayD::from_shape_vec(IxDyn(shape), values)
            .map(Self::new)
            .map_err(|_| TransformError::ShapeMismatch {
                expected: shape.to_vec(),
                actual: vec![len],
            })
    }
}

impl<T: Clone + num_traits::Zero> ArrayItem<T> {
    /// Буфер нужной формы, заполненный нулями.
    pub fn zeros(shape: &[usize]) -> Self {
        Self::new(ArrayD::zeros(IxDyn(shape)))
    }
}

impl<T> From<ArrayD<T>> for ArrayItem<T> {
    fn from(data: ArrayD<T>) -> Self {
        Self::new(data)
    }
}

impl<T: Clone> Item for ArrayItem<T> {
    type Elem = T;

    fn data(&self) -> &ArrayD<T> {
        &self.data
    }

    fn data_mut(&mut self) -> ArrayViewMutD<'_, T> {
        self.data.view_mut()
    }

    fn into_data(self) -> ArrayD<T> {
        self.data
    }

    fn with_data(self, data: ArrayD<T>) -> Result<Self> {
        ensure_same_rank(self.data.ndim(), data.ndim())?;
        Ok(Self { data })
    }
}

/// Изображение: двумерная или трёхмерная сетка пикселей.
///
/// Каналы пока не выделены в отдельную ось; это делает
/// [`ImageToTensor`](crate::transforms::ImageToTensor).
#[derive(Debug, Clone, PartialEq)]
pub struct Image<P> {
    data: ArrayD<P>,
}

impl<P: Pixel> Image<P> {
    /// Создаёт изображение. Размерность сетки должна быть 2 или 3.
    pub fn new(data: ArrayD<P>) -> Result<Self> {
        match data.ndim() {
            2 | 3 => Ok(Self { data }),
            actual => Err(TransformError::InvalidRank {
                expected: "2 или 3",
                actual,
            }),
        }
    }

    /// Копирует пиксели из буфера крейта `image`; форма сетки `(height, width)`.
    pub fn from_buffer<C>(buffer: &ImageBuffer<P, C>) -> Result<Self>
    where
        C: Deref<Target = [P::Subpixel]>,
    {
        let (width, height) = buffer.dimensions();
        let pixels: Vec<P> = buffer.pixels().copied().collect();
        let count = pixels.len();
        let data = ArrayD::from_shape_vec(IxDyn(&[height as usize, width as usize]), pixels)
            .map_err(|_| TransformError::ShapeMismatch {
                expected: vec![height as usize, width as usize],
                actual: vec![count],
            })?;
        Self::new(data)
    }

    /// Собирает буфер крейта `image` из двумерного изображения.
    pub fn to_buffer(&self) -> Result<ImageBuffer<P, Vec<P::Subpixel>>> {
        let &[height, width] = self.data.shape() else {
            return Err(TransformError::InvalidRank {
                expected: "2",
                actual: self.data.ndim(),
            });
        };
        let raw: Vec<P::Subpixel> = self
            .data
            .iter()
            .flat_map(|px| px.channels().iter().copied())
            .collect();
        let too_large = || TransformError::InvalidParameter(format!(
            "изображение {height}x{width} не помещается в буфер image"
        ));
        let width = u32::try_from(width).map_err(|_| too_large())?;
        let height = u32::try_from(height).map_err(|_| too_large())?;
        ImageBuffer::from_raw(width, height, raw).ok_or_else(too_large)
    }
}

impl<P: Pixel> Item for Image<P> {
    type Elem = P;

    fn data(&self) -> &ArrayD<P> {
        &self.data
    }

    fn data_mut(&mut self) -> ArrayViewMutD<'_, P> {
        self.data.view_mut()
    }

    fn into_data(self) -> ArrayD<P> {
        self.data
    }

    fn with_data(self, data: ArrayD<P>) -> Result<Self> {
        ensure_same_rank(self.data.ndim(), data.ndim())?;
        Ok(Self { data })
    }
}

/// Маска сегментации с несколькими классами.
///
/// `classes` задаёт порядок классов; позиция класса в списке (с единицы)
/// используется при one-hot кодировании.
#[derive(Debug, Clone, PartialEq)]
pub struct MaskMulti<C> {
    data: ArrayD<C>,
    classes: Vec<C>,
}

impl<C: Clone + PartialEq> MaskMulti<C> {
    pub fn new(data: ArrayD<C>, classes: Vec<C>) -> Result<Self> {
        if classes.is_empty() {
            return Err(TransformError::InvalidParameter(
                "список классов маски пуст".to_string(),
            ));
        }
        Ok(Self { data, classes })
    }

    pub fn classes(&self) -> &[C] {
        &self.classes
    }
}

impl<C: Clone + PartialEq> Item for MaskMulti<C> {
    type Elem = C;

    fn data(&self) -> &ArrayD<C> {
        &self.data
    }

    fn data_mut(&mut self) -> ArrayViewMutD<'_, C> {
        self.data.view_mut()
    }

    fn into_data(self) -> ArrayD<C> {
        self.data
    }

    fn with_data(self, data: ArrayD<C>) -> Result<Self> {
        ensure_same_rank(self.data.ndim(), data.ndim())?;
        Ok(Self {
            data,
            classes: self.classes,
        })
    }
}
