//! Свёртка и пулинг вдоль оси времени.
//!
//! Conv1d: `(batch, time, in)` → `(batch, time', filters)`, где
//! `time' = TemporalStage::output_length(time)`.
//! Для `same` дополнение асимметричное, как в TensorFlow (избыток справа),
//! поэтому оно делается вручную, а сама свёртка идёт с `padding = 0`.

use acoustic_core::{Activation, TemporalStage};
use candle_core::{Module, Result, Tensor};
use candle_nn::{Conv1dConfig, VarBuilder};
use tracing::debug;

use crate::init::{ZEROS, glorot_uniform};

/// Conv1D с активацией.
///
/// Весовые ключи:
/// - `{name}.kernel`: [kernel_size, in_channels, filters] (раскладка Keras)
/// - `{name}.bias`: [filters]
pub struct Conv1d {
    conv: candle_nn::Conv1d,
    stage: TemporalStage,
    activation: Activation,
}

impl Conv1d {
    pub fn load(
        in_channels: usize,
        filters: usize,
        stage: TemporalStage,
        activation: Activation,
        vb: VarBuilder,
    ) -> Result<Self> {
        stage
            .validate()
            .map_err(|e| candle_core::Error::Msg(e.to_string()))?;

        let k = stage.kernel_size;
        let kernel = vb.get_with_hints(
            (k, in_channels, filters),
            "kernel",
            glorot_uniform(k * in_channels, k * filters),
        )?;
        let bias = vb.get_with_hints(filters, "bias", ZEROS)?;

        // Keras (k, in, out) → candle (out, in, k)
        let weight = kernel.permute((2, 1, 0))?.contiguous()?;
        let cfg = Conv1dConfig {
            padding: 0,
            stride: stage.stride,
            dilation: stage.dilation,
            groups: 1,
            ..Default::default()
        };

        debug!(
            "Conv1d: {in_channels} → {filters}, kernel={k}, stride={}, {}",
            stage.stride, stage.border_mode
        );

        Ok(Self {
            conv: candle_nn::Conv1d::new(weight, Some(bias), cfg),
            stage,
            activation,
        })
    }

    /// Стадия по времени (ядро, шаг, режим границ).
    pub fn stage(&self) -> &TemporalStage {
        &self.stage
    }
}

impl Module for Conv1d {
    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let (_b, t, _c) = x.dims3()?;

        // (batch, time, in) → (batch, in, time)
        let mut h = x.transpose(1, 2)?;
        let (left, right) = self.stage.padding(t);
        if left + right > 0 {
            h = h.pad_with_zeros(2, left, right)?;
        }

        let h = self.conv.forward(&h.contiguous()?)?;
        let h = self.activation.apply(&h)?;

        // Обратно в (batch, time', filters)
        h.transpose(1, 2)
    }
}

/// MaxPooling1D по времени.
///
/// Для `same` края дополняются повторением крайнего значения: окно всегда
/// содержит исходный крайний элемент, поэтому максимум совпадает с
/// дополнением `-inf`.
pub struct MaxPool1d {
    stage: TemporalStage,
}

impl MaxPool1d {
    pub fn new(stage: TemporalStage) -> Self {
        Self { stage }
    }

    pub fn stage(&self) -> &TemporalStage {
        &self.stage
    }
}

impl Module for MaxPool1d {
    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let (_b, t, _c) = x.dims3()?;

        let mut h = x.transpose(1, 2)?;
        let (left, right) = self.stage.padding(t);
        if left + right > 0 {
            h = h.pad_with_same(2, left, right)?;
        }

        // (batch, c, time) → (batch, c, 1, time) для max_pool2d
        let h = h.contiguous()?.unsqueeze(2)?;
        let h = h.max_pool2d_with_stride((1, self.stage.kernel_size), (1, self.stage.stride))?;
        h.squeeze(2)?.transpose(1, 2)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use acoustic_core::BorderMode;
    use candle_core::{DType, Device};

    use super::*;

    fn conv_with_ones(k: usize, stride: usize, mode: BorderMode) -> Conv1d {
        ones_conv(TemporalStage::conv(k, stride, mode).unwrap())
    }

    fn ones_conv(stage: TemporalStage) -> Conv1d {
        let device = Device::Cpu;
        let k = stage.kernel_size;
        let mut tensors = HashMap::new();
        tensors.insert("kernel".to_string(), Tensor::ones((k, 1, 1), DType::F32, &device).unwrap());
        tensors.insert("bias".to_string(), Tensor::zeros(1, DType::F32, &device).unwrap());
        let vb = VarBuilder::from_tensors(tensors, DType::F32, &device);
        Conv1d::load(1, 1, stage, Activation::Linear, vb).unwrap()
    }

    fn sequence(values: &[f32]) -> Tensor {
        Tensor::new(values, &Device::Cpu)
            .unwrap()
            .reshape((1, values.len(), 1))
            .unwrap()
    }

    fn flatten(t: &Tensor) -> Vec<f32> {
        t.flatten_all().unwrap().to_vec1().unwrap()
    }

    #[test]
    fn test_valid_convolution() {
        let conv = conv_with_ones(2, 1, BorderMode::Valid);
        let out = conv.forward(&sequence(&[1.0, 2.0, 3.0, 4.0])).unwrap();
        assert_eq!(out.dims(), &[1, 3, 1]);
        assert_eq!(flatten(&out), vec![3.0, 5.0, 7.0]);
    }

    #[test]
    fn test_same_convolution_with_stride() {
        // len 5, stride 2 → 3 фрейма, дополнение (1, 1)
        let conv = conv_with_ones(3, 2, BorderMode::Same);
        let out = conv.forward(&sequence(&[1.0, 2.0, 3.0, 4.0, 5.0])).unwrap();
        assert_eq!(out.dims(), &[1, 3, 1]);
        assert_eq!(flatten(&out), vec![3.0, 9.0, 9.0]);
    }

    #[test]
    fn test_conv_length_matches_formula() {
        let conv = conv_with_ones(13, 2, BorderMode::Valid);
        let input = Tensor::zeros((2, 100, 1), DType::F32, &Device::Cpu).unwrap();
        let out = conv.forward(&input).unwrap();
        let expected = conv.stage().output_length(100).unwrap();
        assert_eq!(out.dims(), &[2, expected, 1]);
        assert_eq!(expected, 44);
    }

    #[test]
    fn test_dilated_convolution() {
        let x = sequence(&[1.0, 2.0, 3.0, 4.0, 5.0]);

        // k = 2, dilation = 2 → окно x[i] + x[i + 2]
        let conv = ones_conv(TemporalStage::new(2, 1, BorderMode::Valid, 2).unwrap());
        let out = conv.forward(&x).unwrap();
        assert_eq!(out.dims(), &[1, conv.stage().output_length(5).unwrap(), 1]);
        assert_eq!(flatten(&out), vec![4.0, 6.0, 8.0]);

        // same: дополнение (1, 1)
        let conv = ones_conv(TemporalStage::new(2, 1, BorderMode::Same, 2).unwrap());
        let out = conv.forward(&x).unwrap();
        assert_eq!(out.dims(), &[1, conv.stage().output_length(5).unwrap(), 1]);
        assert_eq!(flatten(&out), vec![2.0, 4.0, 6.0, 8.0, 4.0]);
    }

    #[test]
    fn test_dilated_convolution_with_stride() {
        // k = 3, dilation = 2, stride = 2: 7 → 3 → 2
        let conv = ones_conv(TemporalStage::new(3, 2, BorderMode::Valid, 2).unwrap());
        let out = conv.forward(&sequence(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0])).unwrap();
        assert_eq!(out.dims(), &[1, 2, 1]);
        assert_eq!(out.dim(1).unwrap(), conv.stage().output_length(7).unwrap());
        assert_eq!(flatten(&out), vec![9.0, 15.0]);
    }

    #[test]
    fn test_relu_activation_applied() {
        let device = Device::Cpu;
        let mut tensors = HashMap::new();
        tensors.insert("kernel".to_string(), Tensor::ones((1, 1, 1), DType::F32, &device).unwrap());
        tensors.insert("bias".to_string(), Tensor::new(&[-2.0f32], &device).unwrap());
        let vb = VarBuilder::from_tensors(tensors, DType::F32, &device);
        let stage = TemporalStage::conv(1, 1, BorderMode::Valid).unwrap();
        let conv = Conv1d::load(1, 1, stage, Activation::Relu, vb).unwrap();
        let out = conv.forward(&sequence(&[1.0, 3.0])).unwrap();
        assert_eq!(flatten(&out), vec![0.0, 1.0]);
    }

    #[test]
    fn test_max_pool_same_and_valid() {
        let x = sequence(&[1.0, 5.0, 2.0, 4.0, 3.0]);

        let pool = MaxPool1d::new(TemporalStage::conv(2, 2, BorderMode::Same).unwrap());
        let out = pool.forward(&x).unwrap();
        assert_eq!(flatten(&out), vec![5.0, 4.0, 3.0]);

        let pool = MaxPool1d::new(TemporalStage::conv(2, 2, BorderMode::Valid).unwrap());
        let out = pool.forward(&x).unwrap();
        assert_eq!(flatten(&out), vec![5.0, 4.0]);
    }

    #[test]
    fn test_max_pool_negative_values_at_edge() {
        let x = sequence(&[-3.0, -1.0, -2.0]);
        let pool = MaxPool1d::new(TemporalStage::conv(2, 2, BorderMode::Same).unwrap());
        let out = pool.forward(&x).unwrap();
        assert_eq!(flatten(&out), vec![-1.0, -2.0]);
    }
}
