//! Batch Normalization по оси признаков.

use candle_core::{D, ModuleT, Result, Tensor};
use candle_nn::VarBuilder;

use crate::init::{ONES, ZEROS};

/// Epsilon Keras `BatchNormalization` по умолчанию.
pub const DEFAULT_EPS: f64 = 1e-3;

/// BatchNormalization для тензоров `(batch, time, features)`.
///
/// Инференс использует скользящие статистики (`moving_mean`, `moving_variance`),
/// режим обучения: статистики текущего батча по осям batch и time.
/// Скользящие статистики не обновляются: цикла обучения здесь нет.
pub struct BatchNorm {
    gamma: Tensor,
    beta: Tensor,
    moving_mean: Tensor,
    moving_variance: Tensor,
    eps: f64,
}

impl BatchNorm {
    pub fn load(features: usize, vb: VarBuilder) -> Result<Self> {
        let gamma = vb.get_with_hints(features, "gamma", ONES)?;
        let beta = vb.get_with_hints(features, "beta", ZEROS)?;
        let moving_mean = vb.get_with_hints(features, "moving_mean", ZEROS)?;
        let moving_variance = vb.get_with_hints(features, "moving_variance", ONES)?;
        Ok(Self {
            gamma,
            beta,
            moving_mean,
            moving_variance,
            eps: DEFAULT_EPS,
        })
    }

    /// Количество нормализуемых признаков.
    pub fn features(&self) -> Result<usize> {
        self.gamma.dim(0)
    }

    fn batch_statistics(x: &Tensor) -> Result<(Tensor, Tensor)> {
        let features = x.dim(D::Minus1)?;
        let flat = x.contiguous()?.reshape(((), features))?;
        let mean = flat.mean(0)?;
        let var = flat.broadcast_sub(&mean)?.sqr()?.mean(0)?;
        Ok((mean, var))
    }
}

impl ModuleT for BatchNorm {
    fn forward_t(&self, x: &Tensor, train: bool) -> Result<Tensor> {
        let (mean, var) = if train {
            Self::batch_statistics(x)?
        } else {
            (self.moving_mean.clone(), self.moving_variance.clone())
        };

        let std = (var + self.eps)?.sqrt()?;
        x.broadcast_sub(&mean)?
            .broadcast_div(&std)?
            .broadcast_mul(&self.gamma)?
            .broadcast_add(&self.beta)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use candle_core::{DType, Device};

    use super::*;

    fn bn(gamma: f32, beta: f32, mean: f32, var: f32) -> BatchNorm {
        let device = Device::Cpu;
        let mut tensors = HashMap::new();
        for (name, v) in [
            ("gamma", gamma),
            ("beta", beta),
            ("moving_mean", mean),
            ("moving_variance", var),
        ] {
            tensors.insert(name.to_string(), Tensor::new(&[v], &device).unwrap());
        }
        BatchNorm::load(1, VarBuilder::from_tensors(tensors, DType::F32, &device)).unwrap()
    }

    #[test]
    fn test_inference_uses_moving_statistics() {
        let norm = bn(2.0, 1.0, 1.0, 3.0);
        let x = Tensor::new(&[[[3.0f32]]], &Device::Cpu).unwrap();
        let out: Vec<f32> = norm.forward_t(&x, false).unwrap().flatten_all().unwrap().to_vec1().unwrap();
        let expected = (3.0 - 1.0) / (3.0f32 + 1e-3).sqrt() * 2.0 + 1.0;
        assert!((out[0] - expected).abs() < 1e-5);
    }

    #[test]
    fn test_training_centers_batch() {
        let norm = bn(1.0, 0.5, 100.0, 100.0);
        let x = Tensor::new(&[[[1.0f32], [2.0], [3.0], [6.0]]], &Device::Cpu).unwrap();
        let out: Vec<f32> = norm.forward_t(&x, true).unwrap().flatten_all().unwrap().to_vec1().unwrap();
        let mean: f32 = out.iter().sum::<f32>() / out.len() as f32;
        assert!((mean - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_features_count() {
        let vb = VarBuilder::zeros(DType::F32, &Device::Cpu);
        let norm = BatchNorm::load(4, vb).unwrap();
        assert_eq!(norm.features().unwrap(), 4);
    }
}
