use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no conversion engine factory registered")]
    NotRegistered,
    #[error("engine not initialized")]
    NotInitialized,
    #[error("engine construction failed: {0}")]
    Construction(#[source] anyhow::Error),
    #[error("engine processing failed: {0}")]
    Process(#[source] anyhow::Error),
}
