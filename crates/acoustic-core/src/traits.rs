//! Унифицированный trait для всех акустических моделей.
//!
//! Каждая архитектура из `acoustic-models` реализует [`AcousticModel`],
//! обеспечивая единый интерфейс для прогона признаков и расчёта длины выхода.

use candle_core::Tensor;

use crate::error::AcousticResult;
use crate::model_registry::ArchitectureKind;
use crate::summary::ModelSummary;

/// Унифицированный trait для всех акустических моделей.
///
/// # Пример
/// ```ignore
/// let model = AcousticNet::load("models/final-model", &device)?;
/// let probs = model.forward(&features)?; // (batch, T', 29)
/// let frames = model.output_length(Some(features.dim(1)?))?;
/// ```
pub trait AcousticModel: Send {
    /// Имя загруженной модели.
    fn name(&self) -> &str;

    /// Архитектура модели.
    fn architecture(&self) -> ArchitectureKind;

    /// Размерность входных признаков (последнее измерение входа).
    fn input_dim(&self) -> usize;

    /// Количество выходных классов softmax.
    fn output_dim(&self) -> usize;

    /// Длина выходной последовательности для входа длины `input_length`.
    ///
    /// Для чисто рекуррентных моделей: тождество; для моделей со
    /// свёрточным фронтендом учитывает ядро, шаг и режим границ.
    fn output_length(&self, input_length: Option<usize>) -> AcousticResult<Option<usize>>;

    /// Сводка слоёв и параметров.
    fn summary(&self) -> ModelSummary;

    /// Прямой проход в режиме инференса.
    ///
    /// # Аргументы
    /// * `features`: `(batch, time, input_dim)`.
    ///
    /// # Возвращает
    /// Вероятности классов `(batch, output_length(time), output_dim)`.
    fn forward(&self, features: &Tensor) -> AcousticResult<Tensor>;
}
