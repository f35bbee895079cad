// --- Файл: src/transforms/tensor.rs ---

//! Преобразование изображения в числовой массив с осью каналов в конце и обратно.
//!
//! | Пиксель        | Сетка      | Результат          |
//! |----------------|------------|--------------------|
//! | `Luma<S>`      | `(H, W)`   | `(H, W)`           |
//! | `Rgb<S>`       | `(H, W)`   | `(H, W, 3)`        |
//! | `Rgba<S>`      | `(D, H, W)`| `(D, H, W, 4)`     |
//!
//! Для одноканальных пикселей вырожденная ось каналов не добавляется,
//! и обратное преобразование ожидает массив той же формы, что и сетка.

use super::Transform;
use crate::error::{ensure_shape, Result, TransformError};
use crate::item::{channel_view, color_view, ArrayItem, Image, Item};
use crate::scalar::{convert, convert_array, Scalar};
use image::{Luma, Pixel, Rgb};
use ndarray::{ArrayD, ArrayViewD, ArrayViewMutD, Axis};
use rand::RngCore;
use std::marker::PhantomData;

/// Форма результата [`image_to_tensor`] для сетки формы `spatial`.
fn tensor_shape<P: Pixel>(spatial: &[usize]) -> Vec<usize> {
    let mut shape = spatial.to_vec();
    if P::CHANNEL_COUNT > 1 {
        shape.push(P::CHANNEL_COUNT as usize);
    }
    shape
}

/// Раскладывает пиксели в числовой массив формы `(d1, ..., dk, C)`.
pub fn image_to_tensor<P, T>(image: &ArrayD<P>) -> Result<ArrayD<T>>
where
    P: Pixel,
    P::Subpixel: Scalar,
    T: Scalar,
{
    // channel_view кладёт каналы первой осью: (C, d1, ..., dk)
    let channels = channel_view(image);
    let tensor = if P::CHANNEL_COUNT == 1 {
        channels.index_axis_move(Axis(0), 0)
    } else {
        let mut axes: Vec<usize> = (1..channels.ndim()).collect();
        axes.push(0);
        channels.permuted_axes(axes)
    };
    convert_array(&tensor.view())
}

/// Записывает каналы пикселей прямо в `buffer`, без промежуточного массива с
/// переставленными осями.
///
/// Значения приводятся к `T` до первой записи: при ошибке `buffer` не изменён.
pub fn image_to_tensor_into<P, T>(mut buffer: ArrayViewMutD<'_, T>, image: &ArrayD<P>) -> Result<()>
where
    P: Pixel,
    P::Subpixel: Scalar,
    T: Scalar,
{
    ensure_shape(&tensor_shape::<P>(image.shape()), buffer.shape())?;

    // Каналы подряд, пиксель за пикселем: тот же порядок, что у (d1, ..., dk, C).
    let values = image
        .iter()
        .flat_map(|px| px.channels().iter().copied())
        .map(convert::<P::Subpixel, T>)
        .collect::<Result<Vec<T>>>()?;

    if P::CHANNEL_COUNT == 1 {
        for (dst, value) in buffer.iter_mut().zip(values) {
            *dst = value;
        }
        return Ok(());
    }

    // Линии вдоль последней оси идут в том же логическом порядке, что и пиксели.
    let count = P::CHANNEL_COUNT as usize;
    let last = Axis(image.ndim());
    for (mut lane, px) in buffer.lanes_mut(last).into_iter().zip(values.chunks_exact(count)) {
        for (dst, &value) in lane.iter_mut().zip(px) {
            *dst = value;
        }
    }
    Ok(())
}

/// Обратная к [`image_to_tensor`] операция для пикселей типа `P`.
pub fn tensor_to_pixels<P, T>(tensor: &ArrayViewD<'_, T>) -> Result<ArrayD<P>>
where
    P: Pixel,
    P::Subpixel: Scalar,
    T: Scalar,
{
    let count = P::CHANNEL_COUNT as usize;
    if count == 1 {
        let pixels = tensor
            .iter()
            .map(|&v| convert(v).map(|s| *P::from_slice(&[s])))
            .collect::<Result<Vec<P>>>()?;
        return ArrayD::from_shape_vec(tensor.raw_dim(), pixels).map_err(|_| {
            TransformError::ShapeMismatch {
                expected: tensor.shape().to_vec(),
                actual: vec![tensor.len()],
            }
        });
    }

    let last = match tensor.shape().last() {
        Some(&c) if c == count => tensor.ndim() - 1,
        Some(&c) => {
            return Err(TransformError::ChannelMismatch {
                expected: count,
                actual: c,
            })
        }
        None => {
            return Err(TransformError::InvalidRank {
                expected: "≥ 1",
                actual: 0,
            })
        }
    };

    // Ось каналов возвращается в начало: (d1, ..., dk, C) -> (C, d1, ..., dk)
    let mut axes = vec![last];
    axes.extend(0..last);
    let channels: ArrayD<P::Subpixel> = convert_array(&tensor.view().permuted_axes(axes))?;
    color_view::<P>(channels.view())
}

/// Изображение, восстановленное из массива по его размерности.
#[derive(Debug, Clone, PartialEq)]
pub enum ColorImage<S> {
    Gray(Image<Luma<S>>),
    Rgb(Image<Rgb<S>>),
}

/// Восстанавливает изображение: массив `(H, W)` даёт оттенки серого,
/// `(H, W, 3)` даёт RGB.
pub fn tensor_to_image<S, T>(tensor: &ArrayD<T>) -> Result<ColorImage<S>>
where
    S: Scalar,
    Luma<S>: Pixel<Subpixel = S>,
    Rgb<S>: Pixel<Subpixel = S>,
    T: Scalar,
{
    match tensor.shape() {
        [_, _] => Image::new(tensor_to_pixels(&tensor.view())?).map(ColorImage::Gray),
        [_, _, 3] => Image::new(tensor_to_pixels(&tensor.view())?).map(ColorImage::Rgb),
        [_, _, c] => Err(TransformError::ChannelMismatch {
            expected: 3,
            actual: *c,
        }),
        other => Err(TransformError::InvalidRank {
            expected: "2 или 3",
            actual: other.len(),
        }),
    }
}

/// Преобразует [`Image`] в [`ArrayItem`] с осью каналов в конце.
///
/// Тип элементов результата задаётся параметром `T`, по умолчанию `f32`.
/// Значения каналов переносятся без масштабирования.
///
/// # Пример
/// ```ignore
/// let tensor = ImageToTensor::<f32>::new().apply(image)?;
/// assert_eq!(tensor.shape(), &[height, width, 3]);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ImageToTensor<T = f32> {
    _eltype: PhantomData<fn() -> T>,
}

impl<T: Scalar> ImageToTensor<T> {
    pub fn new() -> Self {
        Self {
            _eltype: PhantomData,
        }
    }
}

impl<T: Scalar> Default for ImageToTensor<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P, T> Transform<Image<P>> for ImageToTensor<T>
where
    P: Pixel,
    P::Subpixel: Scalar,
    T: Scalar,
{
    type Output = ArrayItem<T>;
    type State = ();

    fn random_state(&self, _rng: &mut dyn RngCore) {}

    fn apply_with(&self, item: Image<P>, _state: &()) -> Result<ArrayItem<T>> {
        image_to_tensor(item.data()).map(ArrayItem::new)
    }

    fn apply_into_with<'b>(
        &self,
        buffer: &'b mut ArrayItem<T>,
        item: Image<P>,
        _state: &(),
    ) -> Result<&'b mut ArrayItem<T>> {
        image_to_tensor_into(buffer.data_mut(), item.data())?;
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use ndarray::IxDyn;

    // 2x3 изображение, где каналы кодируют координаты пикселя
    fn rgb_image() -> Image<Rgb<u8>> {
        let mut pixels = Vec::new();
        for y in 0..2u8 {
            for x in 0..3u8 {
                pixels.push(Rgb([y, x, 100 + 10 * y + x]));
            }
        }
        Image::new(ArrayD::from_shape_vec(IxDyn(&[2, 3]), pixels).unwrap()).unwrap()
    }

    #[test]
    fn test_rgb_channels_go_last() {
        let tensor = ImageToTensor::<f32>::new().apply(rgb_image()).unwrap();
        assert_eq!(tensor.shape(), &[2, 3, 3]);
        // (y, x, c)
        assert_eq!(tensor.data()[[1, 2, 0]], 1.0);
        assert_eq!(tensor.data()[[1, 2, 1]], 2.0);
        assert_eq!(tensor.data()[[1, 2, 2]], 112.0);
        assert_eq!(tensor.data()[[0, 1, 2]], 101.0);
    }

    #[test]
    fn test_gray_keeps_shape() {
        let data = ArrayD::from_shape_vec(IxDyn(&[2, 2]), vec![Luma([1u8]), Luma([2]), Luma([3]), Luma([4])])
            .unwrap();
        let tensor = ImageToTensor::<f64>::new()
            .apply(Image::new(data).unwrap())
            .unwrap();
        assert_eq!(tensor.shape(), &[2, 2]);
        assert_eq!(tensor.data()[[1, 0]], 3.0);
    }

    #[test]
    fn test_volume_with_alpha() {
        let data = ArrayD::from_elem(IxDyn(&[2, 3, 4]), Rgba([1u16, 2, 3, 4]));
        let tensor: ArrayD<f32> = image_to_tensor(&data).unwrap();
        assert_eq!(tensor.shape(), &[2, 3, 4, 4]);
        assert_eq!(tensor[[1, 2, 3, 3]], 4.0);
    }

    #[test]
    fn test_buffered_writes_same_layout() {
        let t = ImageToTensor::<f32>::new();
        let mut buffer = ArrayItem::<f32>::zeros(&[2, 3, 3]);
        t.apply_into(&mut buffer, rgb_image()).unwrap();
        assert_eq!(buffer, t.apply(rgb_image()).unwrap());
    }

    #[test]
    fn test_buffered_rejects_missing_channel_axis() {
        let mut buffer = ArrayItem::<f32>::zeros(&[2, 3]);
        let err = ImageToTensor::<f32>::new()
            .apply_into(&mut buffer, rgb_image())
            .unwrap_err();
        assert!(matches!(err, TransformError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_narrow_output_type_can_fail() {
        let data = ArrayD::from_elem(IxDyn(&[1, 1]), Luma([1000u16]));
        let err = ImageToTensor::<u8>::new()
            .apply(Image::new(data).unwrap())
            .unwrap_err();
        assert!(matches!(err, TransformError::Conversion { .. }));
    }

    #[test]
    fn test_buffered_conversion_failure_leaves_buffer_intact() {
        let data = ArrayD::from_shape_vec(IxDyn(&[1, 2]), vec![Luma([1u16]), Luma([1000])]).unwrap();
        let mut buffer = ArrayItem::from_shape_vec(&[1, 2], vec![9u8, 9]).unwrap();
        let err = ImageToTensor::<u8>::new()
            .apply_into(&mut buffer, Image::new(data).unwrap())
            .unwrap_err();
        assert!(matches!(err, TransformError::Conversion { .. }));
        assert_eq!(buffer.data().as_slice().unwrap(), &[9, 9]);

        let rgb = ArrayD::from_elem(IxDyn(&[1, 1]), Rgb([1u16, 2, 700]));
        let mut buffer = ArrayItem::from_shape_vec(&[1, 1, 3], vec![9u8; 3]).unwrap();
        assert!(ImageToTensor::<u8>::new()
            .apply_into(&mut buffer, Image::new(rgb).unwrap())
            .is_err());
        assert_eq!(buffer.data().as_slice().unwrap(), &[9, 9, 9]);
    }

    #[test]
    fn test_round_trip_rgb() {
        let image = rgb_image();
        let tensor: ArrayD<f32> = image_to_tensor(image.data()).unwrap();
        match tensor_to_image::<u8, f32>(&tensor).unwrap() {
            ColorImage::Rgb(back) => assert_eq!(back, image),
            other => panic!("ожидалось RGB изображение, получено {other:?}"),
        }
    }

    #[test]
    fn test_round_trip_gray() {
        let data = ArrayD::from_shape_vec(IxDyn(&[1, 3]), vec![Luma([0.25f32]), Luma([0.5]), Luma([1.0])])
            .unwrap();
        let image = Image::new(data).unwrap();
        let tensor: ArrayD<f64> = image_to_tensor(image.data()).unwrap();
        assert_eq!(tensor_to_image::<f32, f64>(&tensor).unwrap(), ColorImage::Gray(image));
    }

    #[test]
    fn test_tensor_to_image_rejects_bad_shapes() {
        let four = ArrayD::<f32>::zeros(IxDyn(&[2, 2, 4]));
        assert!(matches!(
            tensor_to_image::<u8, f32>(&four),
            Err(TransformError::ChannelMismatch { expected: 3, actual: 4 })
        ));

        let flat = ArrayD::<f32>::zeros(IxDyn(&[4]));
        assert!(matches!(
            tensor_to_image::<u8, f32>(&flat),
            Err(TransformError::InvalidRank { actual: 1, .. })
        ));
    }
}
