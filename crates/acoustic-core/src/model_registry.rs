//! Реестр поддерживаемых архитектур.
//!
//! Содержит перечисление архитектур и метаданные о каждой.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Тип архитектуры акустической модели.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchitectureKind {
    /// Один GRU-слой прямо в softmax.
    SimpleRnn,
    /// GRU + BatchNorm + TimeDistributed(Dense).
    Rnn,
    /// Conv1D-фронтенд + SimpleRNN.
    CnnRnn,
    /// Стек из нескольких GRU с BatchNorm.
    DeepRnn,
    /// Двунаправленный GRU.
    BidirectionalRnn,
    /// Conv1D + три двунаправленных GRU.
    DeeperCnnGru,
    /// Conv1D + три двунаправленных GRU с dropout.
    DeeperCnnGruDropout,
    /// Итоговая модель (Conv1D + 3 × BiGRU с dropout, фиксированные умолчания).
    Final,
}

impl ArchitectureKind {
    /// Все поддерживаемые архитектуры.
    pub fn all() -> &'static [ArchitectureKind] {
        &[
            ArchitectureKind::SimpleRnn,
            ArchitectureKind::Rnn,
            ArchitectureKind::CnnRnn,
            ArchitectureKind::DeepRnn,
            ArchitectureKind::BidirectionalRnn,
            ArchitectureKind::DeeperCnnGru,
            ArchitectureKind::DeeperCnnGruDropout,
            ArchitectureKind::Final,
        ]
    }

    /// Строковый идентификатор для CLI и config.json.
    pub fn as_str(&self) -> &'static str {
        match self {
            ArchitectureKind::SimpleRnn => "simple_rnn",
            ArchitectureKind::Rnn => "rnn",
            ArchitectureKind::CnnRnn => "cnn_rnn",
            ArchitectureKind::DeepRnn => "deep_rnn",
            ArchitectureKind::BidirectionalRnn => "bidirectional_rnn",
            ArchitectureKind::DeeperCnnGru => "deeper_cnn_gru",
            ArchitectureKind::DeeperCnnGruDropout => "deeper_cnn_gru_dropout",
            ArchitectureKind::Final => "final",
        }
    }

    /// Полное человекочитаемое название.
    pub fn display_name(&self) -> &'static str {
        match self {
            ArchitectureKind::SimpleRnn => "Simple RNN (GRU → softmax)",
            ArchitectureKind::Rnn => "RNN + BatchNorm + TimeDistributed Dense",
            ArchitectureKind::CnnRnn => "CNN + RNN",
            ArchitectureKind::DeepRnn => "Deep RNN",
            ArchitectureKind::BidirectionalRnn => "Bidirectional RNN",
            ArchitectureKind::DeeperCnnGru => "CNN + 3 × Bidirectional GRU",
            ArchitectureKind::DeeperCnnGruDropout => "CNN + 3 × Bidirectional GRU (dropout)",
            ArchitectureKind::Final => "Final model",
        }
    }

    /// Есть ли у архитектуры свёрточный фронтенд (меняет длину последовательности).
    pub fn is_convolutional(&self) -> bool {
        matches!(
            self,
            ArchitectureKind::CnnRnn
                | ArchitectureKind::DeeperCnnGru
                | ArchitectureKind::DeeperCnnGruDropout
                | ArchitectureKind::Final
        )
    }

    /// Парсинг из строки (CLI-совместимо).
    pub fn from_str_loose(s: &str) -> Option<ArchitectureKind> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        let normalized = normalized.strip_suffix("_model").unwrap_or(&normalized);
        match normalized {
            "simple_rnn" | "simple" => Some(ArchitectureKind::SimpleRnn),
            "rnn" => Some(ArchitectureKind::Rnn),
            "cnn_rnn" | "cnn" => Some(ArchitectureKind::CnnRnn),
            "deep_rnn" | "deep" => Some(ArchitectureKind::DeepRnn),
            "bidirectional_rnn" | "bidirectional" | "birnn" => {
                Some(ArchitectureKind::BidirectionalRnn)
            }
            "deeper_cnn_gru" => Some(ArchitectureKind::DeeperCnnGru),
            "deeper_cnn_gru_dropout" | "deeper_cnn_gru_model_dropout" => {
                Some(ArchitectureKind::DeeperCnnGruDropout)
            }
            "final" => Some(ArchitectureKind::Final),
            _ => None,
        }
    }
}

impl fmt::Display for ArchitectureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loose_parsing_accepts_builder_names() {
        assert_eq!(
            ArchitectureKind::from_str_loose("final_model"),
            Some(ArchitectureKind::Final)
        );
        assert_eq!(
            ArchitectureKind::from_str_loose("deeper_cnn_GRU_model_dropout"),
            Some(ArchitectureKind::DeeperCnnGruDropout)
        );
        assert_eq!(
            ArchitectureKind::from_str_loose("cnn-rnn"),
            Some(ArchitectureKind::CnnRnn)
        );
        assert_eq!(ArchitectureKind::from_str_loose("transformer"), None);
    }

    #[test]
    fn test_as_str_roundtrip() {
        for &kind in ArchitectureKind::all() {
            assert_eq!(ArchitectureKind::from_str_loose(kind.as_str()), Some(kind));
        }
    }
}
