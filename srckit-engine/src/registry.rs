//! Process-wide engine factory registry.
//!
//! The hosting environment registers a factory explicitly at startup;
//! sessions created through the registry acquire their engine from it.

use crate::engine::{ConversionEngine, EngineFactory};
use crate::error::EngineError;
use parking_lot::RwLock;
use std::sync::Arc;

static FACTORY: RwLock<Option<Arc<dyn EngineFactory>>> = RwLock::new(None);

/// Registers the process-wide engine factory, replacing any previous one.
pub fn register(factory: Arc<dyn EngineFactory>) {
    let previous = FACTORY.write().replace(factory);
    if previous.is_some() {
        tracing::warn!("Replacing previously registered engine factory");
    } else {
        tracing::info!("Engine factory registered");
    }
}

/// Acquires an engine from the registered factory.
pub async fn acquire() -> Result<Box<dyn ConversionEngine>, EngineError> {
    let factory = FACTORY.read().clone().ok_or(EngineError::NotRegistered)?;
    factory.acquire().await
}
