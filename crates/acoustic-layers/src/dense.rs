//! Dense-слой на каждом шаге времени и выходной softmax.

use candle_core::{Module, Result, Tensor};
use candle_nn::VarBuilder;

use crate::init::{ZEROS, glorot_uniform, project_sequence};

/// `TimeDistributed(Dense(out))`: одни и те же веса на всех шагах.
///
/// Весовые ключи: `{name}.kernel` [in, out], `{name}.bias` [out].
pub struct TimeDistributedDense {
    kernel: Tensor,
    bias: Tensor,
}

impl TimeDistributedDense {
    pub fn load(in_features: usize, out_features: usize, vb: VarBuilder) -> Result<Self> {
        let kernel = vb.get_with_hints(
            (in_features, out_features),
            "kernel",
            glorot_uniform(in_features, out_features),
        )?;
        let bias = vb.get_with_hints(out_features, "bias", ZEROS)?;
        Ok(Self { kernel, bias })
    }
}

impl Module for TimeDistributedDense {
    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        project_sequence(x, &self.kernel, &self.bias)
    }
}

/// Softmax по последней оси (классы).
pub fn softmax(x: &Tensor) -> Result<Tensor> {
    candle_nn::ops::softmax_last_dim(&x.contiguous()?)
}
