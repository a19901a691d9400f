//! Сводка модели в стиле Keras `model.summary()`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Форма выхода слоя; `None`: измерение неизвестно (batch, время).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputShape(pub Vec<Option<usize>>);

impl OutputShape {
    /// Форма `(None, time, features)`.
    pub fn sequence(time: Option<usize>, features: usize) -> Self {
        Self(vec![None, time, Some(features)])
    }

    /// Последнее измерение (признаки).
    pub fn features(&self) -> Option<usize> {
        self.0.last().copied().flatten()
    }
}

impl fmt::Display for OutputShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dims: Vec<String> = self
            .0
            .iter()
            .map(|d| match d {
                Some(v) => v.to_string(),
                None => "None".to_string(),
            })
            .collect();
        write!(f, "({})", dims.join(", "))
    }
}

/// Строка сводки: один слой.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSummary {
    /// Имя слоя (ключ в safetensors).
    pub name: String,
    /// Тип слоя (`Conv1D`, `GRU`, `BatchNormalization`, ...).
    pub layer_type: String,
    /// Форма выхода.
    pub output_shape: OutputShape,
    /// Обучаемые параметры.
    pub trainable_params: u64,
    /// Необучаемые параметры (скользящие статистики BatchNorm).
    pub non_trainable_params: u64,
}

impl LayerSummary {
    /// Всего параметров слоя.
    pub fn params(&self) -> u64 {
        self.trainable_params + self.non_trainable_params
    }
}

/// Сводка всей модели.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSummary {
    pub model_name: String,
    pub layers: Vec<LayerSummary>,
}

impl ModelSummary {
    pub fn total_params(&self) -> u64 {
        self.layers.iter().map(LayerSummary::params).sum()
    }

    pub fn trainable_params(&self) -> u64 {
        self.layers.iter().map(|l| l.trainable_params).sum()
    }

    pub fn non_trainable_params(&self) -> u64 {
        self.layers.iter().map(|l| l.non_trainable_params).sum()
    }

    /// Форма выхода последнего слоя.
    pub fn output_shape(&self) -> Option<&OutputShape> {
        self.layers.last().map(|l| &l.output_shape)
    }
}

const NAME_WIDTH: usize = 33;
const SHAPE_WIDTH: usize = 26;
const RULE_WIDTH: usize = 70;

impl fmt::Display for ModelSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let thin = "_".repeat(RULE_WIDTH);
        let thick = "=".repeat(RULE_WIDTH);

        writeln!(f, "Model: \"{}\"", self.model_name)?;
        writeln!(f, "{thin}")?;
        writeln!(
            f,
            "{:<NAME_WIDTH$}{:<SHAPE_WIDTH$}{}",
            "Layer (type)", "Output Shape", "Param #"
        )?;
        writeln!(f, "{thick}")?;
        for (i, layer) in self.layers.iter().enumerate() {
            let title = format!("{} ({})", layer.name, layer.layer_type);
            writeln!(
                f,
                "{:<NAME_WIDTH$}{:<SHAPE_WIDTH$}{}",
                title,
                layer.output_shape.to_string(),
                layer.params()
            )?;
            if i + 1 < self.layers.len() {
                writeln!(f, "{thin}")?;
            }
        }
        writeln!(f, "{thick}")?;
        writeln!(f, "Total params: {}", self.total_params())?;
        writeln!(f, "Trainable params: {}", self.trainable_params())?;
        writeln!(f, "Non-trainable params: {}", self.non_trainable_params())?;
        write!(f, "{thin}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer(name: &str, trainable: u64, non_trainable: u64) -> LayerSummary {
        LayerSummary {
            name: name.to_string(),
            layer_type: "Test".to_string(),
            output_shape: OutputShape::sequence(None, 4),
            trainable_params: trainable,
            non_trainable_params: non_trainable,
        }
    }

    #[test]
    fn test_shape_display() {
        assert_eq!(OutputShape::sequence(None, 161).to_string(), "(None, None, 161)");
        assert_eq!(OutputShape::sequence(Some(44), 29).to_string(), "(None, 44, 29)");
        assert_eq!(OutputShape::sequence(Some(44), 29).features(), Some(29));
    }

    #[test]
    fn test_totals() {
        let summary = ModelSummary {
            model_name: "m".into(),
            layers: vec![layer("a", 10, 0), layer("b", 4, 4)],
        };
        assert_eq!(summary.total_params(), 18);
        assert_eq!(summary.trainable_params(), 14);
        assert_eq!(summary.non_trainable_params(), 4);

        let text = summary.to_string();
        assert!(text.starts_with("Model: \"m\""));
        assert!(text.contains("Total params: 18"));
        assert!(text.contains("Non-trainable params: 4"));
    }
}
