//! Error types for the acoustic model workspace.

use thiserror::Error;

/// Main error type for acoustic model operations.
#[derive(Error, Debug)]
pub enum AcousticError {
    /// Invalid architecture or layer parameters.
    #[error("Config error: {0}")]
    Config(String),

    /// Model construction and weight loading errors.
    #[error("Model error: {0}")]
    Model(String),

    /// Forward pass errors (wrong input shape and the like).
    #[error("Inference error: {0}")]
    Inference(String),

    /// Input sequence is too short for a `valid` convolution or pooling stage.
    #[error("Sequence too short: {input_length} frames, at least {required} required")]
    SequenceTooShort {
        /// Длина, поданная на вход стадии.
        input_length: usize,
        /// Минимальная длина, при которой выход не отрицателен.
        required: usize,
    },

    /// I/O errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Candle tensor errors.
    #[error("Tensor error: {0}")]
    Candle(#[from] candle_core::Error),

    /// JSON parsing errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for acoustic model operations.
pub type AcousticResult<T> = Result<T, AcousticError>;
