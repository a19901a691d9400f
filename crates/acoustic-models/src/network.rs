//! AcousticNet: модель, собранная по [`Graph`] из слоёв `acoustic-layers`.
//!
//! Реализует [`AcousticModel`] trait для единого интерфейса со всеми архитектурами.

use std::path::Path;
use std::time::Instant;

use candle_core::{DType, Device, Module, ModuleT, Tensor};
use candle_nn::VarBuilder;
use tracing::{debug, info, warn};

use acoustic_core::{
    AcousticError, AcousticModel, AcousticResult, ArchitectureKind, ModelConfig, ModelSummary,
    model_files,
};
use acoustic_layers::{
    BatchNorm, Bidirectional, Conv1d, Gru, GruConfig, MaxPool1d, Recurrent, SimpleRnn,
    SimpleRnnConfig, TimeDistributedDense, softmax,
};

use crate::architectures::build_graph;
use crate::graph::{Graph, LayerKind, LayerSpec, RecurrentCell, RecurrentSpec};

/// Слой с загруженными весами.
enum Layer {
    Conv(Conv1d),
    Pool(MaxPool1d),
    Norm(BatchNorm),
    Recurrent(Box<dyn Recurrent>),
    Bidirectional(Bidirectional),
    Dense(TimeDistributedDense),
    Softmax,
}

impl Layer {
    fn load(spec: &LayerSpec, input_features: usize, vb: VarBuilder) -> candle_core::Result<Self> {
        let vb = vb.pp(&spec.name);
        let layer = match &spec.kind {
            LayerKind::Conv1d {
                filters,
                stage,
                activation,
            } => Layer::Conv(Conv1d::load(input_features, *filters, *stage, *activation, vb)?),
            LayerKind::MaxPool1d { stage } => Layer::Pool(MaxPool1d::new(*stage)),
            LayerKind::BatchNorm => Layer::Norm(BatchNorm::load(input_features, vb)?),
            LayerKind::Recurrent(r) => Layer::Recurrent(load_recurrent(input_features, r, vb)?),
            LayerKind::Bidirectional(r) => Layer::Bidirectional(Bidirectional::new(
                load_recurrent(input_features, r, vb.pp("forward"))?,
                load_recurrent(input_features, r, vb.pp("backward"))?,
            )),
            LayerKind::TimeDistributedDense { units } => {
                Layer::Dense(TimeDistributedDense::load(input_features, *units, vb)?)
            }
            LayerKind::Softmax => Layer::Softmax,
        };
        debug!("{} ({}) загружен", spec.name, spec.type_name());
        Ok(layer)
    }

    fn forward_t(&self, x: &Tensor, train: bool) -> candle_core::Result<Tensor> {
        match self {
            Layer::Conv(conv) => conv.forward(x),
            Layer::Pool(pool) => pool.forward(x),
            Layer::Norm(norm) => norm.forward_t(x, train),
            Layer::Recurrent(rnn) => rnn.run(x, false, train),
            Layer::Bidirectional(bi) => bi.forward_t(x, train),
            Layer::Dense(dense) => dense.forward(x),
            Layer::Softmax => softmax(x),
        }
    }
}

fn load_recurrent(
    input_features: usize,
    spec: &RecurrentSpec,
    vb: VarBuilder,
) -> candle_core::Result<Box<dyn Recurrent>> {
    Ok(match spec.cell {
        RecurrentCell::Gru => {
            let config = GruConfig::new(spec.units)
                .with_activation(spec.activation)
                .with_dropout(spec.dropout, spec.recurrent_dropout);
            Box::new(Gru::load(input_features, config, vb)?)
        }
        RecurrentCell::SimpleRnn => {
            let config = SimpleRnnConfig {
                units: spec.units,
                activation: spec.activation,
            };
            Box::new(SimpleRnn::load(input_features, config, vb)?)
        }
    })
}

/// Акустическая модель: признаки `(batch, time, input_dim)` →
/// вероятности символов `(batch, time', output_dim)`.
pub struct AcousticNet {
    config: ModelConfig,
    graph: Graph,
    layers: Vec<Layer>,
    dtype: DType,
    device: Device,
}

impl AcousticNet {
    /// Загрузить модель из директории.
    ///
    /// Ожидаемые файлы:
    /// - `config.json`: архитектура (без него используется `final`)
    /// - `model.safetensors` или шарды с `model.safetensors.index.json`
    pub fn load(model_dir: impl AsRef<Path>, device: &Device) -> AcousticResult<Self> {
        let model_dir = model_dir.as_ref();
        info!("Загрузка акустической модели из {:?}", model_dir);

        let config = match model_files::find_config(model_dir) {
            Some(path) => ModelConfig::from_file(path)?,
            None => {
                warn!("config.json не найден, использую конфигурацию final по умолчанию");
                ModelConfig::default()
            }
        };
        info!(
            "{}: {} (input_dim={}, output_dim={})",
            config.model_name,
            config.architecture.kind().display_name(),
            config.architecture.input_dim(),
            config.architecture.output_dim(),
        );

        let weights = model_files::resolve_weight_files(model_dir)?;
        let start = Instant::now();

        // Рекуррентные слои накапливают ошибку округления, поэтому всегда F32.
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&weights, DType::F32, device)? };
        let model = Self::from_var_builder(config, vb)?;

        info!(
            "{}: модель загружена за {:.2}с ({} параметров)",
            model.config.model_name,
            start.elapsed().as_secs_f64(),
            model.graph.total_params()
        );
        Ok(model)
    }

    /// Построить модель из произвольного `VarBuilder`.
    ///
    /// С `VarBuilder::from_varmap` отсутствующие веса создаются со
    /// стандартной инициализацией Keras (glorot uniform / нули).
    pub fn from_var_builder(config: ModelConfig, vb: VarBuilder) -> AcousticResult<Self> {
        let graph = build_graph(&config.model_name, &config.architecture)?;

        let mut layers = Vec::with_capacity(graph.layers.len());
        let mut features = graph.input_dim;
        for spec in &graph.layers {
            let layer = Layer::load(spec, features, vb.clone()).map_err(|e| {
                AcousticError::Model(format!("Слой {}: {e}", spec.name))
            })?;
            layers.push(layer);
            features = spec.output_features(features);
        }

        info!("\n{}", graph.summary());

        Ok(Self {
            dtype: vb.dtype(),
            device: vb.device().clone(),
            config,
            graph,
            layers,
        })
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Прямой проход; `train = true` включает dropout и статистики батча в BN.
    pub fn forward_t(&self, features: &Tensor, train: bool) -> AcousticResult<Tensor> {
        let (batch, time, dim) = features.dims3().map_err(|_| {
            AcousticError::Inference(format!(
                "Ожидается вход (batch, time, {}), получено {:?}",
                self.graph.input_dim,
                features.dims()
            ))
        })?;
        if dim != self.graph.input_dim {
            return Err(AcousticError::Inference(format!(
                "Размерность признаков {dim}, модель ожидает {}",
                self.graph.input_dim
            )));
        }

        let output_dim = self.graph.output_dim();
        if self.graph.output_length(Some(time))? == Some(0) {
            return Ok(Tensor::zeros((batch, 0, output_dim), self.dtype, &self.device)?);
        }

        let mut h = features.to_device(&self.device)?.to_dtype(self.dtype)?;
        for layer in &self.layers {
            h = layer.forward_t(&h, train)?;
        }
        Ok(h)
    }
}

impl AcousticModel for AcousticNet {
    fn name(&self) -> &str {
        &self.config.model_name
    }

    fn architecture(&self) -> ArchitectureKind {
        self.graph.architecture
    }

    fn input_dim(&self) -> usize {
        self.graph.input_dim
    }

    fn output_dim(&self) -> usize {
        self.graph.output_dim()
    }

    fn output_length(&self, input_length: Option<usize>) -> AcousticResult<Option<usize>> {
        self.graph.output_length(input_length)
    }

    fn summary(&self) -> ModelSummary {
        self.graph.summary()
    }

    fn forward(&self, features: &Tensor) -> AcousticResult<Tensor> {
        self.forward_t(features, false)
    }
}
