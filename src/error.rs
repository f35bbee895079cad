//! Ошибки элементов и преобразований.

use thiserror::Error;

/// Ошибки, которые могут возникнуть при построении или применении преобразований.
/// Все ошибки возвращаются синхронно из того вызова, который их вызвал.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransformError {
    #[error("Несовпадение длин параметров {what}: {left} против {right}")]
    LengthMismatch {
        what: &'static str,
        left: usize,
        right: usize,
    },

    #[error("Значение {value} непредставимо в типе {target}")]
    Conversion { value: String, target: &'static str },

    #[error("Несовпадение формы: ожидалась {expected:?}, получена {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("Число каналов по последней оси {actual}, ожидалось {expected}")]
    ChannelMismatch { expected: usize, actual: usize },

    #[error("Неверная размерность: ожидалась {expected}, получена {actual}")]
    InvalidRank { expected: &'static str, actual: usize },

    #[error("Индекс {index} вне диапазона [1, {length}]")]
    IndexOutOfRange { index: usize, length: usize },

    #[error("Метка {0} отсутствует в списке классов маски")]
    UnknownLabel(String),

    #[error("Недопустимый параметр: {0}")]
    InvalidParameter(String),
}

pub type Result<T> = std::result::Result<T, TransformError>;

/// Проверяет, что форма буфера совпадает с ожидаемой, до какой-либо записи в него.
pub(crate) fn ensure_shape(expected: &[usize], actual: &[usize]) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(TransformError::ShapeMismatch {
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        })
    }
}
