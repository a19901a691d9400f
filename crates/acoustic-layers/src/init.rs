//! Инициализация весов по умолчанию (когда VarBuilder создаёт переменные сам).

use candle_core::{Result, Tensor};
use candle_nn::Init;

/// Glorot uniform (умолчание Keras для `kernel`).
pub(crate) fn glorot_uniform(fan_in: usize, fan_out: usize) -> Init {
    let limit = (6.0 / (fan_in + fan_out) as f64).sqrt();
    Init::Uniform {
        lo: -limit,
        up: limit,
    }
}

pub(crate) const ZEROS: Init = Init::Const(0.0);
pub(crate) const ONES: Init = Init::Const(1.0);

/// Применить Dense-проекцию к каждому шагу: (batch, time, in) → (batch, time, out).
///
/// `kernel` хранится в раскладке Keras: `(in, out)`.
pub(crate) fn project_sequence(x: &Tensor, kernel: &Tensor, bias: &Tensor) -> Result<Tensor> {
    let (b, t, d) = x.dims3()?;
    let out = kernel.dim(1)?;
    x.contiguous()?
        .reshape((b * t, d))?
        .matmul(kernel)?
        .broadcast_add(bias)?
        .reshape((b, t, out))
}
