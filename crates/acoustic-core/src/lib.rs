//! # acoustic-core
//!
//! Базовые типы, трейты и определения ошибок для акустических моделей.
//!
//! Этот крейт предоставляет фундаментальные абстракции для всех остальных
//! крейтов в workspace:
//!
//! - Расчёт длины выходной последовательности после свёрток и пулинга
//!   ([`cnn_output_length`], [`TemporalStage`])
//! - Конфигурационные структуры архитектур ([`ModelConfig`], [`ArchitectureConfig`])
//! - Унифицированная обработка ошибок через [`AcousticError`]
//! - Trait [`AcousticModel`]: единый интерфейс для всех архитектур
//! - Реестр архитектур [`ArchitectureKind`]
//! - Сводка модели в стиле Keras ([`ModelSummary`])

pub mod config;
pub mod error;
pub mod model_files;
pub mod model_registry;
pub mod output_length;
pub mod summary;
pub mod traits;
pub mod types;

pub use config::{
    ArchitectureConfig, BidirectionalRnnConfig, ConvRecurrentConfig, DeepRnnConfig,
    DropoutConvRecurrentConfig, ModelConfig, PoolingConfig, RnnConfig, SimpleRnnConfig,
};
pub use error::{AcousticError, AcousticResult};
pub use model_registry::ArchitectureKind;
pub use output_length::{TemporalStage, cnn_output_length, sequence_output_length};
pub use summary::{LayerSummary, ModelSummary, OutputShape};
pub use traits::AcousticModel;
pub use types::{Activation, BorderMode};
