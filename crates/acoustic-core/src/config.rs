//! Конфигурационные структуры архитектур.
//!
//! Каждой функции-конструктору модели соответствует вариант
//! [`ArchitectureConfig`]. Значения по умолчанию (`output_dim = 29`,
//! параметры `final_model`) совпадают с Keras-конструкторами.
//!
//! Формат `config.json` в директории модели:
//!
//! ```json
//! {
//!   "model_name": "final-model",
//!   "architecture": { "type": "final", "input_dim": 161, "units": 200 }
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AcousticError, AcousticResult};
use crate::model_registry::ArchitectureKind;
use crate::types::{Activation, BorderMode};

/// 28 символов + CTC blank.
pub const DEFAULT_OUTPUT_DIM: usize = 29;

/// Размерность спектрограммы (161 частотный бин).
pub const SPECTROGRAM_DIM: usize = 161;

fn default_output_dim() -> usize {
    DEFAULT_OUTPUT_DIM
}

/// Конфигурация модели: имя и архитектура.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Название модели (например, "final-model").
    pub model_name: String,

    /// Архитектура и её гиперпараметры.
    pub architecture: ArchitectureConfig,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self::preset(ArchitectureKind::Final)
    }
}

impl ModelConfig {
    /// Конфигурация по умолчанию для заданной архитектуры.
    pub fn preset(kind: ArchitectureKind) -> Self {
        Self {
            model_name: kind.as_str().to_string(),
            architecture: ArchitectureConfig::preset(kind),
        }
    }

    /// Загрузить конфигурацию из JSON-файла и проверить её.
    pub fn from_file(path: impl AsRef<Path>) -> AcousticResult<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        let config: ModelConfig = serde_json::from_str(&data)?;
        config.architecture.validate()?;
        Ok(config)
    }
}

/// Гиперпараметры архитектуры; тег `type` выбирает конструктор.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ArchitectureConfig {
    /// GRU → softmax.
    SimpleRnn(SimpleRnnConfig),
    /// GRU → BN → TimeDistributed(Dense) → softmax.
    Rnn(RnnConfig),
    /// Conv1D → BN → SimpleRNN → BN → TimeDistributed(Dense) → softmax.
    CnnRnn(ConvRecurrentConfig),
    /// N × (GRU → BN) → TimeDistributed(Dense) → softmax.
    DeepRnn(DeepRnnConfig),
    /// Bidirectional(GRU) → TimeDistributed(Dense) → softmax.
    BidirectionalRnn(BidirectionalRnnConfig),
    /// Conv1D → BN → 3 × (Bidirectional(GRU) → BN) → TimeDistributed(Dense) → softmax.
    DeeperCnnGru(ConvRecurrentConfig),
    /// То же с dropout в рекуррентных слоях и опциональным пулингом.
    DeeperCnnGruDropout(DropoutConvRecurrentConfig),
    /// Итоговая модель: dropout-вариант с фиксированными умолчаниями.
    Final(DropoutConvRecurrentConfig),
}

impl ArchitectureConfig {
    /// Конфигурация по умолчанию (спектрограмма на входе, 200 фильтров/юнитов).
    pub fn preset(kind: ArchitectureKind) -> Self {
        match kind {
            ArchitectureKind::SimpleRnn => Self::SimpleRnn(SimpleRnnConfig {
                input_dim: SPECTROGRAM_DIM,
                output_dim: DEFAULT_OUTPUT_DIM,
            }),
            ArchitectureKind::Rnn => Self::Rnn(RnnConfig {
                input_dim: SPECTROGRAM_DIM,
                units: 200,
                activation: Activation::Relu,
                output_dim: DEFAULT_OUTPUT_DIM,
            }),
            ArchitectureKind::CnnRnn => Self::CnnRnn(ConvRecurrentConfig {
                kernel_size: 11,
                ..ConvRecurrentConfig::default()
            }),
            ArchitectureKind::DeepRnn => Self::DeepRnn(DeepRnnConfig {
                input_dim: SPECTROGRAM_DIM,
                units: 200,
                recur_layers: 2,
                output_dim: DEFAULT_OUTPUT_DIM,
            }),
            ArchitectureKind::BidirectionalRnn => {
                Self::BidirectionalRnn(BidirectionalRnnConfig {
                    input_dim: SPECTROGRAM_DIM,
                    units: 200,
                    output_dim: DEFAULT_OUTPUT_DIM,
                })
            }
            ArchitectureKind::DeeperCnnGru => Self::DeeperCnnGru(ConvRecurrentConfig::default()),
            ArchitectureKind::DeeperCnnGruDropout => {
                Self::DeeperCnnGruDropout(DropoutConvRecurrentConfig::default())
            }
            ArchitectureKind::Final => Self::Final(DropoutConvRecurrentConfig::default()),
        }
    }

    /// Тип архитектуры.
    pub fn kind(&self) -> ArchitectureKind {
        match self {
            Self::SimpleRnn(_) => ArchitectureKind::SimpleRnn,
            Self::Rnn(_) => ArchitectureKind::Rnn,
            Self::CnnRnn(_) => ArchitectureKind::CnnRnn,
            Self::DeepRnn(_) => ArchitectureKind::DeepRnn,
            Self::BidirectionalRnn(_) => ArchitectureKind::BidirectionalRnn,
            Self::DeeperCnnGru(_) => ArchitectureKind::DeeperCnnGru,
            Self::DeeperCnnGruDropout(_) => ArchitectureKind::DeeperCnnGruDropout,
            Self::Final(_) => ArchitectureKind::Final,
        }
    }

    /// Размерность входных признаков.
    pub fn input_dim(&self) -> usize {
        match self {
            Self::SimpleRnn(c) => c.input_dim,
            Self::Rnn(c) => c.input_dim,
            Self::CnnRnn(c) | Self::DeeperCnnGru(c) => c.input_dim,
            Self::DeepRnn(c) => c.input_dim,
            Self::BidirectionalRnn(c) => c.input_dim,
            Self::DeeperCnnGruDropout(c) | Self::Final(c) => c.conv.input_dim,
        }
    }

    /// Количество выходных классов.
    pub fn output_dim(&self) -> usize {
        match self {
            Self::SimpleRnn(c) => c.output_dim,
            Self::Rnn(c) => c.output_dim,
            Self::CnnRnn(c) | Self::DeeperCnnGru(c) => c.output_dim,
            Self::DeepRnn(c) => c.output_dim,
            Self::BidirectionalRnn(c) => c.output_dim,
            Self::DeeperCnnGruDropout(c) | Self::Final(c) => c.conv.output_dim,
        }
    }

    /// Проверить гиперпараметры.
    pub fn validate(&self) -> AcousticResult<()> {
        require_positive("input_dim", self.input_dim())?;
        require_positive("output_dim", self.output_dim())?;
        match self {
            Self::SimpleRnn(_) => Ok(()),
            Self::Rnn(c) => require_positive("units", c.units),
            Self::CnnRnn(c) | Self::DeeperCnnGru(c) => c.validate(),
            Self::DeepRnn(c) => {
                require_positive("units", c.units)?;
                require_positive("recur_layers", c.recur_layers)
            }
            Self::BidirectionalRnn(c) => require_positive("units", c.units),
            Self::DeeperCnnGruDropout(c) | Self::Final(c) => c.validate(),
        }
    }
}

fn require_positive(field: &str, value: usize) -> AcousticResult<()> {
    if value == 0 {
        return Err(AcousticError::Config(format!("{field} должен быть >= 1")));
    }
    Ok(())
}

fn require_rate(field: &str, value: f32) -> AcousticResult<()> {
    if !(0.0..1.0).contains(&value) {
        return Err(AcousticError::Config(format!(
            "{field} должен лежать в [0, 1), получено {value}"
        )));
    }
    Ok(())
}

/// `simple_rnn_model(input_dim, output_dim=29)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimpleRnnConfig {
    pub input_dim: usize,
    #[serde(default = "default_output_dim")]
    pub output_dim: usize,
}

/// `rnn_model(input_dim, units, activation, output_dim=29)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RnnConfig {
    pub input_dim: usize,
    pub units: usize,
    pub activation: Activation,
    #[serde(default = "default_output_dim")]
    pub output_dim: usize,
}

/// `deep_rnn_model(input_dim, units, recur_layers, output_dim=29)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeepRnnConfig {
    pub input_dim: usize,
    pub units: usize,
    /// Количество пар GRU → BN (>= 1).
    pub recur_layers: usize,
    #[serde(default = "default_output_dim")]
    pub output_dim: usize,
}

/// `bidirectional_rnn_model(input_dim, units, output_dim=29)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BidirectionalRnnConfig {
    pub input_dim: usize,
    pub units: usize,
    #[serde(default = "default_output_dim")]
    pub output_dim: usize,
}

/// Свёрточный фронтенд + рекуррентная часть.
///
/// Используется `cnn_rnn_model` и `deeper_cnn_GRU_model`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvRecurrentConfig {
    /// Размерность входных признаков.
    pub input_dim: usize,
    /// Количество фильтров Conv1D.
    pub filters: usize,
    /// Ширина ядра Conv1D.
    pub kernel_size: usize,
    /// Шаг Conv1D по времени.
    pub conv_stride: usize,
    /// Режим границ Conv1D.
    pub conv_border_mode: BorderMode,
    /// Размер скрытого состояния рекуррентных слоёв.
    pub units: usize,
    /// Количество выходных классов.
    pub output_dim: usize,
}

impl Default for ConvRecurrentConfig {
    /// Умолчания `final_model`.
    fn default() -> Self {
        Self {
            input_dim: SPECTROGRAM_DIM,
            filters: 200,
            kernel_size: 13,
            conv_stride: 2,
            conv_border_mode: BorderMode::Valid,
            units: 200,
            output_dim: DEFAULT_OUTPUT_DIM,
        }
    }
}

impl ConvRecurrentConfig {
    fn validate(&self) -> AcousticResult<()> {
        require_positive("filters", self.filters)?;
        require_positive("kernel_size", self.kernel_size)?;
        require_positive("conv_stride", self.conv_stride)?;
        require_positive("units", self.units)
    }
}

/// Пулинг после свёрточного фронтенда.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolingConfig {
    pub pool_size: usize,
    pub pool_stride: usize,
    pub pool_border_mode: BorderMode,
}

/// Свёрточно-рекуррентная модель с dropout (`deeper_cnn_GRU_model_dropout`, `final_model`).
///
/// Поля свёрточно-рекуррентной части лежат на одном уровне с `dropout`
/// (`{"type": "final", "input_dim": 13, "units": 64, "dropout": 0.3}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropoutConvRecurrentConfig {
    /// Параметры свёртки и рекуррентной части.
    #[serde(flatten)]
    pub conv: ConvRecurrentConfig,
    /// MaxPooling1D после `bn_conv_1d`; `None`: без пулинга.
    #[serde(default)]
    pub pooling: Option<PoolingConfig>,
    /// Dropout входа первого двунаправленного GRU.
    #[serde(default = "default_dropout")]
    pub dropout: f32,
    /// Dropout рекуррентного состояния во всех GRU.
    #[serde(default = "default_recurrent_dropout")]
    pub recurrent_dropout: f32,
}

fn default_dropout() -> f32 {
    0.5
}

fn default_recurrent_dropout() -> f32 {
    0.1
}

impl Default for DropoutConvRecurrentConfig {
    fn default() -> Self {
        Self {
            conv: ConvRecurrentConfig::default(),
            pooling: None,
            dropout: default_dropout(),
            recurrent_dropout: default_recurrent_dropout(),
        }
    }
}

impl DropoutConvRecurrentConfig {
    fn validate(&self) -> AcousticResult<()> {
        self.conv.validate()?;
        if let Some(pool) = &self.pooling {
            require_positive("pool_size", pool.pool_size)?;
            require_positive("pool_stride", pool.pool_stride)?;
        }
        require_rate("dropout", self.dropout)?;
        require_rate("recurrent_dropout", self.recurrent_dropout)
    }
}
