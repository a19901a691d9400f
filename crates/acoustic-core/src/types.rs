//! Общие типы: режим границ свёртки и функции активации.

use std::fmt;
use std::str::FromStr;

use candle_core::Tensor;
use serde::{Deserialize, Serialize};

use crate::error::AcousticError;

// ---------------------------------------------------------------------------
// Режим границ
// ---------------------------------------------------------------------------

/// Режим дополнения (padding) по оси времени для Conv1D и MaxPooling1D.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BorderMode {
    /// Выход длины `ceil(len / stride)`, недостающее дополняется нулями.
    Same,
    /// Без дополнения: ядро целиком помещается во вход.
    Valid,
}

impl BorderMode {
    /// Строковый идентификатор (как в Keras).
    pub fn as_str(&self) -> &'static str {
        match self {
            BorderMode::Same => "same",
            BorderMode::Valid => "valid",
        }
    }
}

impl fmt::Display for BorderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BorderMode {
    type Err = AcousticError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "same" => Ok(BorderMode::Same),
            "valid" => Ok(BorderMode::Valid),
            other => Err(AcousticError::Config(format!(
                "Неподдерживаемый border_mode '{other}': допустимы только 'same' и 'valid'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Активации
// ---------------------------------------------------------------------------

/// Поэлементная функция активации.
///
/// Набор совпадает с тем, что используют архитектуры из `acoustic-models`:
/// ReLU для свёрток и рекуррентных слоёв, tanh по умолчанию для GRU,
/// hard sigmoid для вентилей GRU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    Relu,
    Tanh,
    Sigmoid,
    /// `clip(0.2 * x + 0.5, 0, 1)`.
    HardSigmoid,
    /// Тождественная функция.
    Linear,
}

impl Activation {
    /// Применить активацию к тензору.
    pub fn apply(&self, x: &Tensor) -> candle_core::Result<Tensor> {
        match self {
            Activation::Relu => x.relu(),
            Activation::Tanh => x.tanh(),
            Activation::Sigmoid => x.neg()?.exp()?.affine(1.0, 1.0)?.recip(),
            Activation::HardSigmoid => x.affine(0.2, 0.5)?.clamp(0f32, 1f32),
            Activation::Linear => Ok(x.clone()),
        }
    }

    /// Строковый идентификатор (как в Keras).
    pub fn as_str(&self) -> &'static str {
        match self {
            Activation::Relu => "relu",
            Activation::Tanh => "tanh",
            Activation::Sigmoid => "sigmoid",
            Activation::HardSigmoid => "hard_sigmoid",
            Activation::Linear => "linear",
        }
    }
}

impl fmt::Display for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Activation {
    type Err = AcousticError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "relu" => Ok(Activation::Relu),
            "tanh" => Ok(Activation::Tanh),
            "sigmoid" => Ok(Activation::Sigmoid),
            "hard_sigmoid" => Ok(Activation::HardSigmoid),
            "linear" => Ok(Activation::Linear),
            other => Err(AcousticError::Config(format!(
                "Неизвестная активация '{other}'"
            ))),
        }
    }
}
