//! Рекуррентные слои: GRU, SimpleRNN и двунаправленная обёртка.
//!
//! Все слои возвращают полную последовательность (`return_sequences = true`)
//! и стартуют с нулевого состояния.
//!
//! GRU (Keras, `reset_after = false`), порядок вентилей в весах: z, r, h:
//!
//! ```text
//! z  = σ(x W_z + h U_z + b_z)
//! r  = σ(x W_r + h U_r + b_r)
//! ĥ  = act(x W_h + (r ⊙ h) U_h + b_h)
//! h' = z ⊙ h + (1 - z) ⊙ ĥ
//! ```
//!
//! Весовые ключи:
//! - `{name}.kernel`: [input_dim, 3*units]
//! - `{name}.recurrent_kernel`: [units, 3*units]
//! - `{name}.bias`: [3*units]

use acoustic_core::Activation;
use candle_core::{ModuleT, Result, Tensor};
use candle_nn::VarBuilder;
use tracing::debug;

use crate::init::{ZEROS, glorot_uniform, project_sequence};

/// Общий интерфейс рекуррентного слоя.
pub trait Recurrent: Send + Sync {
    /// Размер скрытого состояния (ширина выхода).
    fn units(&self) -> usize;

    /// Прогнать последовательность `(batch, time, in)` → `(batch, time, units)`.
    ///
    /// При `reverse = true` шаги идут с конца, а выходы возвращаются
    /// в исходном порядке времени.
    fn run(&self, x: &Tensor, reverse: bool, train: bool) -> Result<Tensor>;
}

fn time_steps(t: usize, reverse: bool) -> Box<dyn Iterator<Item = usize>> {
    if reverse {
        Box::new((0..t).rev())
    } else {
        Box::new(0..t)
    }
}

/// Маска dropout, общая для всех шагов последовательности.
///
/// Возвращает `None`, если dropout выключен (инференс или `rate == 0`).
fn dropout_mask(rate: f32, train: bool, shape: (usize, usize), like: &Tensor) -> Result<Option<Tensor>> {
    if !train || rate <= 0.0 {
        return Ok(None);
    }
    let keep = Tensor::rand(0f32, 1f32, shape, like.device())?
        .ge(rate)?
        .to_dtype(like.dtype())?;
    Ok(Some(keep.affine(1.0 / (1.0 - rate as f64), 0.0)?))
}

fn apply_input_dropout(x: &Tensor, rate: f32, train: bool) -> Result<Tensor> {
    let (b, _t, d) = x.dims3()?;
    match dropout_mask(rate, train, (b, d), x)? {
        Some(mask) => x.broadcast_mul(&mask.unsqueeze(1)?),
        None => Ok(x.clone()),
    }
}

fn collect_outputs(mut outputs: Vec<Tensor>, reverse: bool) -> Result<Tensor> {
    if reverse {
        outputs.reverse();
    }
    Tensor::stack(&outputs, 1)
}

// ---------------------------------------------------------------------------
// GRU
// ---------------------------------------------------------------------------

/// Гиперпараметры GRU.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GruConfig {
    pub units: usize,
    /// Активация кандидата ĥ (в Keras по умолчанию tanh).
    pub activation: Activation,
    /// Активация вентилей z и r.
    pub recurrent_activation: Activation,
    /// Dropout входа (только в режиме обучения).
    pub dropout: f32,
    /// Dropout рекуррентного состояния (только в режиме обучения).
    pub recurrent_dropout: f32,
}

impl GruConfig {
    pub fn new(units: usize) -> Self {
        Self {
            units,
            activation: Activation::Tanh,
            recurrent_activation: Activation::HardSigmoid,
            dropout: 0.0,
            recurrent_dropout: 0.0,
        }
    }

    pub fn with_activation(mut self, activation: Activation) -> Self {
        self.activation = activation;
        self
    }

    pub fn with_dropout(mut self, dropout: f32, recurrent_dropout: f32) -> Self {
        self.dropout = dropout;
        self.recurrent_dropout = recurrent_dropout;
        self
    }
}

pub struct Gru {
    /// [input_dim, 3*units]
    kernel: Tensor,
    /// Рекуррентные веса вентилей z, r: [units, 2*units]
    recurrent_zr: Tensor,
    /// Рекуррентные веса кандидата: [units, units]
    recurrent_h: Tensor,
    /// [3*units]
    bias: Tensor,
    config: GruConfig,
}

impl Gru {
    pub fn load(input_dim: usize, config: GruConfig, vb: VarBuilder) -> Result<Self> {
        let u = config.units;
        let kernel = vb.get_with_hints((input_dim, 3 * u), "kernel", glorot_uniform(input_dim, 3 * u))?;
        let recurrent = vb.get_with_hints((u, 3 * u), "recurrent_kernel", glorot_uniform(u, 3 * u))?;
        let bias = vb.get_with_hints(3 * u, "bias", ZEROS)?;

        let recurrent_zr = recurrent.narrow(1, 0, 2 * u)?.contiguous()?;
        let recurrent_h = recurrent.narrow(1, 2 * u, u)?.contiguous()?;

        debug!("GRU: {input_dim} → {u} ({})", config.activation);

        Ok(Self {
            kernel,
            recurrent_zr,
            recurrent_h,
            bias,
            config,
        })
    }
}

impl Recurrent for Gru {
    fn units(&self) -> usize {
        self.config.units
    }

    fn run(&self, x: &Tensor, reverse: bool, train: bool) -> Result<Tensor> {
        let (b, t, _d) = x.dims3()?;
        let u = self.config.units;
        if t == 0 {
            return Tensor::zeros((b, 0, u), x.dtype(), x.device());
        }

        // Входная проекция сразу для всех шагов: (batch, time, 3*units)
        let x = apply_input_dropout(x, self.config.dropout, train)?;
        let proj = project_sequence(&x, &self.kernel, &self.bias)?;
        let rec_mask = dropout_mask(self.config.recurrent_dropout, train, (b, u), &x)?;

        let mut h = Tensor::zeros((b, u), x.dtype(), x.device())?;
        let mut outputs = Vec::with_capacity(t);

        for step in time_steps(t, reverse) {
            let xp = proj.narrow(1, step, 1)?.squeeze(1)?;
            let h_rec = match &rec_mask {
                Some(mask) => (&h * mask)?,
                None => h.clone(),
            };

            let zr = xp
                .narrow(1, 0, 2 * u)?
                .add(&h_rec.matmul(&self.recurrent_zr)?)?;
            let zr = self.config.recurrent_activation.apply(&zr)?;
            let z = zr.narrow(1, 0, u)?;
            let r = zr.narrow(1, u, u)?;

            let candidate = xp
                .narrow(1, 2 * u, u)?
                .add(&(r * &h_rec)?.matmul(&self.recurrent_h)?)?;
            let candidate = self.config.activation.apply(&candidate)?;

            // h' = z ⊙ h + (1 - z) ⊙ ĥ
            h = ((&z * &h)? + (z.affine(-1.0, 1.0)? * candidate)?)?;
            outputs.push(h.clone());
        }

        collect_outputs(outputs, reverse)
    }
}

impl ModuleT for Gru {
    fn forward_t(&self, x: &Tensor, train: bool) -> Result<Tensor> {
        self.run(x, false, train)
    }
}

// ---------------------------------------------------------------------------
// SimpleRNN
// ---------------------------------------------------------------------------

/// Гиперпараметры SimpleRNN.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimpleRnnConfig {
    pub units: usize,
    pub activation: Activation,
}

/// SimpleRNN: `h' = act(x W + h U + b)`.
///
/// Весовые ключи: `kernel` [input_dim, units], `recurrent_kernel` [units, units], `bias` [units].
pub struct SimpleRnn {
    kernel: Tensor,
    recurrent_kernel: Tensor,
    bias: Tensor,
    config: SimpleRnnConfig,
}

impl SimpleRnn {
    pub fn load(input_dim: usize, config: SimpleRnnConfig, vb: VarBuilder) -> Result<Self> {
        let u = config.units;
        let kernel = vb.get_with_hints((input_dim, u), "kernel", glorot_uniform(input_dim, u))?;
        let recurrent_kernel = vb.get_with_hints((u, u), "recurrent_kernel", glorot_uniform(u, u))?;
        let bias = vb.get_with_hints(u, "bias", ZEROS)?;
        debug!("SimpleRNN: {input_dim} → {u} ({})", config.activation);
        Ok(Self {
            kernel,
            recurrent_kernel,
            bias,
            config,
        })
    }
}

impl Recurrent for SimpleRnn {
    fn units(&self) -> usize {
        self.config.units
    }

    fn run(&self, x: &Tensor, reverse: bool, _train: bool) -> Result<Tensor> {
        let (b, t, _d) = x.dims3()?;
        let u = self.config.units;
        if t == 0 {
            return Tensor::zeros((b, 0, u), x.dtype(), x.device());
        }

        let proj = project_sequence(x, &self.kernel, &self.bias)?;
        let mut h = Tensor::zeros((b, u), x.dtype(), x.device())?;
        let mut outputs = Vec::with_capacity(t);

        for step in time_steps(t, reverse) {
            let xp = proj.narrow(1, step, 1)?.squeeze(1)?;
            let pre = xp.add(&h.matmul(&self.recurrent_kernel)?)?;
            h = self.config.activation.apply(&pre)?;
            outputs.push(h.clone());
        }

        collect_outputs(outputs, reverse)
    }
}

impl ModuleT for SimpleRnn {
    fn forward_t(&self, x: &Tensor, train: bool) -> Result<Tensor> {
        self.run(x, false, train)
    }
}

// ---------------------------------------------------------------------------
// Bidirectional
// ---------------------------------------------------------------------------

/// Двунаправленная обёртка (merge_mode = concat).
///
/// Ключи весов: `{name}.forward.*` и `{name}.backward.*`.
/// Выход: `(batch, time, forward.units + backward.units)`.
pub struct Bidirectional {
    forward: Box<dyn Recurrent>,
    backward: Box<dyn Recurrent>,
}

impl Bidirectional {
    pub fn new(forward: Box<dyn Recurrent>, backward: Box<dyn Recurrent>) -> Self {
        Self { forward, backward }
    }

    /// Двунаправленный GRU с одинаковой конфигурацией обоих направлений.
    pub fn gru(input_dim: usize, config: GruConfig, vb: VarBuilder) -> Result<Self> {
        let forward = Gru::load(input_dim, config, vb.pp("forward"))?;
        let backward = Gru::load(input_dim, config, vb.pp("backward"))?;
        Ok(Self::new(Box::new(forward), Box::new(backward)))
    }

    pub fn units(&self) -> usize {
        self.forward.units() + self.backward.units()
    }
}

impl ModuleT for Bidirectional {
    fn forward_t(&self, x: &Tensor, train: bool) -> Result<Tensor> {
        let fwd = self.forward.run(x, false, train)?;
        let bwd = self.backward.run(x, true, train)?;
        Tensor::cat(&[&fwd, &bwd], 2)
    }
}
