//! Слои акустических моделей: чистая Rust-реализация на Candle.
//!
//! Все слои работают с тензорами `(batch, time, features)` и повторяют
//! семантику слоёв Keras, под которые проектировались архитектуры:
//!
//! - [`Conv1d`] / [`MaxPool1d`]: свёртка и пулинг по времени (`same` / `valid`)
//! - [`BatchNorm`]: нормализация по оси признаков
//! - [`Gru`], [`SimpleRnn`], [`Bidirectional`]: рекуррентные слои
//! - [`TimeDistributedDense`]: общий Dense на каждом шаге времени
//!
//! Совместимость весов: ключи совпадают с именами переменных Keras
//! (`kernel`, `recurrent_kernel`, `bias`, `gamma`, `beta`, `moving_mean`,
//! `moving_variance`) под именем слоя.

pub mod conv;
pub mod dense;
pub mod norm;
pub mod recurrent;

mod init;

pub use conv::{Conv1d, MaxPool1d};
pub use dense::{TimeDistributedDense, softmax};
pub use norm::BatchNorm;
pub use recurrent::{Bidirectional, Gru, GruConfig, Recurrent, SimpleRnn, SimpleRnnConfig};
