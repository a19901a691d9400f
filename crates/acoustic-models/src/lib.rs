//! Акустические модели для распознавания речи: чистая Rust-реализация на Candle.
//!
//! Спектрограмма или MFCC → свёрточный фронтенд (опционально) → рекуррентные
//! слои → TimeDistributed(Dense) → softmax по символам + CTC blank.
//!
//! - [`architectures`]: конструкторы графов для всех архитектур
//! - [`graph`]: описание слоёв, формы и сводка параметров
//! - [`network`]: загрузка весов и прямой проход
//! - [`ctc`]: символьный словарь и greedy-декодирование

pub mod architectures;
pub mod ctc;
pub mod graph;
pub mod network;

pub use architectures::{
    bidirectional_rnn_model, build_graph, cnn_rnn_model, deep_rnn_model, deeper_cnn_gru_model,
    deeper_cnn_gru_model_dropout, final_model, rnn_model, simple_rnn_model,
};
pub use ctc::{CharMap, CtcGreedyDecoder};
pub use graph::{Graph, LayerKind, LayerSpec, RecurrentCell, RecurrentSpec};
pub use network::AcousticNet;
