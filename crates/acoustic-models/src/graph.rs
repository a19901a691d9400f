//! Статическое описание графа модели: слои, формы и параметры.
//!
//! Граф не содержит весов. По нему строится сводка (`model.summary()`),
//! считается длина выхода и создаются слои в [`crate::network::AcousticNet`].

use acoustic_core::{
    AcousticResult, Activation, ArchitectureKind, LayerSummary, ModelSummary, OutputShape,
    TemporalStage, sequence_output_length,
};
use serde::{Deserialize, Serialize};

/// Тип рекуррентной ячейки.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecurrentCell {
    Gru,
    SimpleRnn,
}

/// Параметры рекуррентного слоя.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecurrentSpec {
    pub cell: RecurrentCell,
    pub units: usize,
    pub activation: Activation,
    pub dropout: f32,
    pub recurrent_dropout: f32,
}

impl RecurrentSpec {
    pub fn gru(units: usize, activation: Activation) -> Self {
        Self {
            cell: RecurrentCell::Gru,
            units,
            activation,
            dropout: 0.0,
            recurrent_dropout: 0.0,
        }
    }

    pub fn simple_rnn(units: usize, activation: Activation) -> Self {
        Self {
            cell: RecurrentCell::SimpleRnn,
            ..Self::gru(units, activation)
        }
    }

    pub fn with_dropout(mut self, dropout: f32, recurrent_dropout: f32) -> Self {
        self.dropout = dropout;
        self.recurrent_dropout = recurrent_dropout;
        self
    }

    /// Параметры одного направления.
    fn params(&self, input_features: usize) -> u64 {
        let (i, u) = (input_features as u64, self.units as u64);
        let single = i * u + u * u + u;
        match self.cell {
            RecurrentCell::Gru => 3 * single,
            RecurrentCell::SimpleRnn => single,
        }
    }

    fn type_name(&self) -> &'static str {
        match self.cell {
            RecurrentCell::Gru => "GRU",
            RecurrentCell::SimpleRnn => "SimpleRNN",
        }
    }
}

/// Вид слоя и его гиперпараметры.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LayerKind {
    Conv1d {
        filters: usize,
        stage: TemporalStage,
        activation: Activation,
    },
    MaxPool1d {
        stage: TemporalStage,
    },
    BatchNorm,
    Recurrent(RecurrentSpec),
    Bidirectional(RecurrentSpec),
    TimeDistributedDense {
        units: usize,
    },
    Softmax,
}

/// Именованный слой графа. Имя: префикс весов в safetensors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSpec {
    pub name: String,
    pub kind: LayerKind,
}

impl LayerSpec {
    pub fn new(name: impl Into<String>, kind: LayerKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// Ширина выхода при ширине входа `input_features`.
    pub fn output_features(&self, input_features: usize) -> usize {
        match &self.kind {
            LayerKind::Conv1d { filters, .. } => *filters,
            LayerKind::Recurrent(spec) => spec.units,
            LayerKind::Bidirectional(spec) => 2 * spec.units,
            LayerKind::TimeDistributedDense { units } => *units,
            LayerKind::MaxPool1d { .. } | LayerKind::BatchNorm | LayerKind::Softmax => {
                input_features
            }
        }
    }

    /// Параметры слоя: (обучаемые, необучаемые).
    pub fn params(&self, input_features: usize) -> (u64, u64) {
        let i = input_features as u64;
        match &self.kind {
            LayerKind::Conv1d { filters, stage, .. } => {
                let f = *filters as u64;
                (stage.kernel_size as u64 * i * f + f, 0)
            }
            LayerKind::BatchNorm => (2 * i, 2 * i),
            LayerKind::Recurrent(spec) => (spec.params(input_features), 0),
            LayerKind::Bidirectional(spec) => (2 * spec.params(input_features), 0),
            LayerKind::TimeDistributedDense { units } => {
                let u = *units as u64;
                (i * u + u, 0)
            }
            LayerKind::MaxPool1d { .. } | LayerKind::Softmax => (0, 0),
        }
    }

    /// Стадия по времени, если слой меняет длину последовательности.
    pub fn temporal_stage(&self) -> Option<TemporalStage> {
        match &self.kind {
            LayerKind::Conv1d { stage, .. } | LayerKind::MaxPool1d { stage } => Some(*stage),
            _ => None,
        }
    }

    /// Тип слоя в нотации Keras.
    pub fn type_name(&self) -> String {
        match &self.kind {
            LayerKind::Conv1d { .. } => "Conv1D".to_string(),
            LayerKind::MaxPool1d { .. } => "MaxPooling1D".to_string(),
            LayerKind::BatchNorm => "BatchNormalization".to_string(),
            LayerKind::Recurrent(spec) => spec.type_name().to_string(),
            LayerKind::Bidirectional(spec) => format!("Bidirectional({})", spec.type_name()),
            LayerKind::TimeDistributedDense { .. } => "TimeDistributed(Dense)".to_string(),
            LayerKind::Softmax => "Activation".to_string(),
        }
    }
}

/// Граф модели: вход `(batch, time, input_dim)` и цепочка слоёв.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    pub name: String,
    pub architecture: ArchitectureKind,
    pub input_dim: usize,
    pub layers: Vec<LayerSpec>,
}

impl Graph {
    pub fn new(name: impl Into<String>, architecture: ArchitectureKind, input_dim: usize) -> Self {
        Self {
            name: name.into(),
            architecture,
            input_dim,
            layers: Vec::new(),
        }
    }

    /// Добавить слой; повторное имя получает числовой суффикс (`bidir` → `bidir2`).
    pub fn push(&mut self, name: &str, kind: LayerKind) -> &mut Self {
        let name = self.unique_name(name);
        self.layers.push(LayerSpec::new(name, kind));
        self
    }

    fn unique_name(&self, name: &str) -> String {
        let taken = |candidate: &str| self.layers.iter().any(|l| l.name == candidate);
        if !taken(name) {
            return name.to_string();
        }
        (2..)
            .map(|i| format!("{name}{i}"))
            .find(|candidate| !taken(candidate))
            .unwrap_or_else(|| name.to_string())
    }

    /// Стадии свёрток и пулинга в порядке применения.
    pub fn temporal_stages(&self) -> Vec<TemporalStage> {
        self.layers.iter().filter_map(LayerSpec::temporal_stage).collect()
    }

    /// Длина выходной последовательности.
    pub fn output_length(&self, input_length: Option<usize>) -> AcousticResult<Option<usize>> {
        sequence_output_length(input_length, &self.temporal_stages())
    }

    /// Ширина выхода (количество классов).
    pub fn output_dim(&self) -> usize {
        self.layers
            .iter()
            .fold(self.input_dim, |features, layer| layer.output_features(features))
    }

    /// Общее число параметров.
    pub fn total_params(&self) -> u64 {
        self.summary().total_params()
    }

    /// Сводка с неизвестной длиной входа.
    pub fn summary(&self) -> ModelSummary {
        self.build_summary(None, &vec![None; self.layers.len()])
    }

    /// Сводка с длинами последовательности для входа длины `input_length`.
    pub fn summary_with_length(&self, input_length: Option<usize>) -> AcousticResult<ModelSummary> {
        let mut lengths = Vec::with_capacity(self.layers.len());
        let mut length = input_length;
        for layer in &self.layers {
            if let Some(stage) = layer.temporal_stage() {
                length = sequence_output_length(length, &[stage])?;
            }
            lengths.push(length);
        }
        Ok(self.build_summary(input_length, &lengths))
    }

    fn build_summary(&self, input_length: Option<usize>, lengths: &[Option<usize>]) -> ModelSummary {
        let mut rows = Vec::with_capacity(self.layers.len() + 1);
        rows.push(LayerSummary {
            name: "the_input".to_string(),
            layer_type: "InputLayer".to_string(),
            output_shape: OutputShape::sequence(input_length, self.input_dim),
            trainable_params: 0,
            non_trainable_params: 0,
        });

        let mut features = self.input_dim;
        for (layer, &length) in self.layers.iter().zip(lengths) {
            let (trainable, non_trainable) = layer.params(features);
            features = layer.output_features(features);
            rows.push(LayerSummary {
                name: layer.name.clone(),
                layer_type: layer.type_name(),
                output_shape: OutputShape::sequence(length, features),
                trainable_params: trainable,
                non_trainable_params: non_trainable,
            });
        }

        ModelSummary {
            model_name: self.name.clone(),
            layers: rows,
        }
    }
}
