//! Длина выходной последовательности после свёрток и пулинга по времени.
//!
//! Формула совпадает с Keras `Conv1D` / `MaxPooling1D`:
//!
//! ```text
//! dilated = k + (k - 1) * (dilation - 1)
//! same:  out = len
//! valid: out = len - dilated + 1
//! len'   = ceil(out / stride)
//! ```
//!
//! Модель с CTC-лоссом должна знать, сколько фреймов останется после
//! субдискретизации, поэтому каждая архитектура отдаёт `output_length`,
//! построенный на этих функциях.

use serde::{Deserialize, Serialize};

use crate::error::{AcousticError, AcousticResult};
use crate::types::BorderMode;

/// Одна стадия свёртки или пулинга вдоль оси времени.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemporalStage {
    /// Ширина ядра (для пулинга: `pool_size`).
    pub kernel_size: usize,
    /// Шаг.
    pub stride: usize,
    /// Режим границ.
    pub border_mode: BorderMode,
    /// Коэффициент разрежения ядра.
    pub dilation: usize,
}

impl TemporalStage {
    /// Создать стадию с проверкой параметров.
    pub fn new(
        kernel_size: usize,
        stride: usize,
        border_mode: BorderMode,
        dilation: usize,
    ) -> AcousticResult<Self> {
        let stage = Self {
            kernel_size,
            stride,
            border_mode,
            dilation,
        };
        stage.validate()?;
        Ok(stage)
    }

    /// Стадия без разрежения (dilation = 1).
    pub fn conv(kernel_size: usize, stride: usize, border_mode: BorderMode) -> AcousticResult<Self> {
        Self::new(kernel_size, stride, border_mode, 1)
    }

    /// Проверить, что ядро, шаг и разрежение положительны.
    pub fn validate(&self) -> AcousticResult<()> {
        if self.kernel_size == 0 {
            return Err(AcousticError::Config("kernel_size должен быть >= 1".into()));
        }
        if self.stride == 0 {
            return Err(AcousticError::Config("stride должен быть >= 1".into()));
        }
        if self.dilation == 0 {
            return Err(AcousticError::Config("dilation должен быть >= 1".into()));
        }
        Ok(())
    }

    /// Эффективная ширина ядра с учётом разрежения.
    pub fn dilated_kernel_size(&self) -> usize {
        self.kernel_size + (self.kernel_size - 1) * (self.dilation - 1)
    }

    /// Длина выхода одной стадии.
    ///
    /// Для `valid` при `input_length < dilated - 1` возвращает
    /// [`AcousticError::SequenceTooShort`]: выход был бы отрицательной длины.
    pub fn output_length(&self, input_length: usize) -> AcousticResult<usize> {
        self.validate()?;
        let out = match self.border_mode {
            BorderMode::Same => input_length,
            BorderMode::Valid => {
                let dilated = self.dilated_kernel_size();
                if input_length + 1 < dilated {
                    return Err(AcousticError::SequenceTooShort {
                        input_length,
                        required: dilated - 1,
                    });
                }
                input_length + 1 - dilated
            }
        };
        Ok(out.div_ceil(self.stride))
    }

    /// Дополнение (слева, справа) по времени, как в TensorFlow для `same`.
    ///
    /// Избыток нечётного дополнения уходит вправо. Для `valid`: `(0, 0)`.
    pub fn padding(&self, input_length: usize) -> (usize, usize) {
        match self.border_mode {
            BorderMode::Valid => (0, 0),
            BorderMode::Same => {
                if input_length == 0 || self.stride == 0 {
                    return (0, 0);
                }
                let out = input_length.div_ceil(self.stride);
                let total = ((out - 1) * self.stride + self.dilated_kernel_size())
                    .saturating_sub(input_length);
                let left = total / 2;
                (left, total - left)
            }
        }
    }
}

/// Длина выхода после `n` одинаковых 1-D свёрток.
///
/// * `input_length`: `None` означает «длина неизвестна» и возвращается как есть.
/// * `filter_size`: ширина ядра свёртки.
/// * `border_mode`: `same` или `valid`.
/// * `stride`: шаг свёртки.
/// * `dilation`: разрежение ядра (в Keras-моделях обычно 1).
/// * `n`: число одинаковых последовательных свёрток (`0`: тождество).
///
/// # Пример
/// ```
/// use acoustic_core::{BorderMode, cnn_output_length};
///
/// // final_model: kernel 13, stride 2, valid
/// let len = cnn_output_length(Some(100), 13, BorderMode::Valid, 2, 1, 1).unwrap();
/// assert_eq!(len, Some(44));
/// ```
pub fn cnn_output_length(
    input_length: Option<usize>,
    filter_size: usize,
    border_mode: BorderMode,
    stride: usize,
    dilation: usize,
    n: usize,
) -> AcousticResult<Option<usize>> {
    let stage = TemporalStage::new(filter_size, stride, border_mode, dilation)?;
    let Some(mut length) = input_length else {
        return Ok(None);
    };
    for _ in 0..n {
        length = stage.output_length(length)?;
    }
    Ok(Some(length))
}

/// Длина выхода после произвольной цепочки стадий (например, Conv1D → MaxPooling1D).
pub fn sequence_output_length(
    input_length: Option<usize>,
    stages: &[TemporalStage],
) -> AcousticResult<Option<usize>> {
    let Some(mut length) = input_length else {
        return Ok(None);
    };
    for stage in stages {
        length = stage.output_length(length)?;
    }
    Ok(Some(length))
}
