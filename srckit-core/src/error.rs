use srckit_engine::EngineError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("invalid channel count {0}, expected 1..=128")]
    Channels(u16),
    #[error("invalid input sample rate {0}, expected 1..=192000")]
    InputRate(u32),
    #[error("invalid output sample rate {0}, expected 1..=192000")]
    OutputRate(u32),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("session has been destroyed")]
    UseAfterDestroy,
    #[error("output buffer too small: need at least {needed} samples, got {got}")]
    BufferTooSmall { needed: usize, got: usize },
    #[error(
        "input of {samples} samples needs chunked conversion, use convert_streaming instead"
    )]
    InputRequiresChunking { samples: usize },
}

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("unsupported sample format: {0}")]
    UnsupportedSampleFormat(&'static str),
}
