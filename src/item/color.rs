//! Выделение цветовых каналов пикселей в отдельную ось и обратная сборка.

use crate::error::{Result, TransformError};
use image::Pixel;
use ndarray::{ArrayD, ArrayViewD, Axis, IxDyn};
use num_traits::Zero;

/// Раскладывает пиксели по каналам: форма `(C, d1, ..., dk)`, каналы первой осью.
///
/// Для одноканальных пикселей ось каналов тоже присутствует и имеет длину 1.
pub fn channel_view<P: Pixel>(pixels: &ArrayD<P>) -> ArrayD<P::Subpixel> {
    let channels = P::CHANNEL_COUNT as usize;
    let mut shape = Vec::with_capacity(pixels.ndim() + 1);
    shape.push(channels);
    shape.extend_from_slice(pixels.shape());

    let mut out = ArrayD::from_elem(IxDyn(&shape), P::Subpixel::zero());
    for c in 0..channels {
        out.index_axis_mut(Axis(0), c)
            .zip_mut_with(pixels, |dst, px| *dst = px.channels()[c]);
    }
    out
}

/// Обратная операция к [`channel_view`]: собирает пиксели из массива `(C, d1, ..., dk)`.
pub fn color_view<P: Pixel>(channels: ArrayViewD<'_, P::Subpixel>) -> Result<ArrayD<P>> {
    let count = P::CHANNEL_COUNT as usize;
    match channels.shape().first() {
        Some(&c) if c == count => {}
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
    }

    let spatial = channels.shape()[1..].to_vec();
    // Каналы переносятся в конец, чтобы значения одного пикселя шли подряд.
    let mut axes: Vec<usize> = (1..channels.ndim()).collect();
    axes.push(0);
    let interleaved: Vec<P::Subpixel> = channels.permuted_axes(axes).iter().copied().collect();
    let pixels: Vec<P> = interleaved
        .chunks_exact(count)
        .map(|px| *P::from_slice(px))
        .collect();

    let len = pixels.len();
    ArrayD::from_shape_vec(IxDyn(&spatial), pixels).map_err(|_| TransformError::ShapeMismatch {
        expected: spatial.clone(),
        actual: vec![len],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb};

    fn rgb_grid() -> ArrayD<Rgb<u8>> {
        ArrayD::from_shape_vec(
            IxDyn(&[2, 2]),
            vec![
                Rgb([1, 2, 3]),
                Rgb([4, 5, 6]),
                Rgb([7, 8, 9]),
                Rgb([10, 11, 12]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_channel_view_puts_channels_first() {
        let channels = channel_view(&rgb_grid());
        assert_eq!(channels.shape(), &[3, 2, 2]);
        assert_eq!(channels[[0, 0, 1]], 4);
        assert_eq!(channels[[2, 1, 0]], 9);
    }

    #[test]
    fn test_channel_view_gray_has_unit_axis() {
        let gray = ArrayD::from_elem(IxDyn(&[3, 2]), Luma([7u16]));
        let channels = channel_view(&gray);
        assert_eq!(channels.shape(), &[1, 3, 2]);
        assert!(channels.iter().all(|&v| v == 7));
    }

    #[test]
    fn test_color_view_inverts_channel_view() {
        let grid = rgb_grid();
        let channels = channel_view(&grid);
        let back: ArrayD<Rgb<u8>> = color_view(channels.view()).unwrap();
        assert_eq!(back, grid);
    }

    #[test]
    fn test_color_view_rejects_wrong_channel_count() {
        let channels = ArrayD::<u8>::zeros(IxDyn(&[4, 2, 2]));
        assert_eq!(
            color_view::<Rgb<u8>>(channels.view()),
            Err(TransformError::ChannelMismatch {
                expected: 3,
                actual: 4
            })
        );
    }
}
