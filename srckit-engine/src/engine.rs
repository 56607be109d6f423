#[cfg(feature = "test-utils")]
pub mod mock;
pub mod rubato;

use crate::error::EngineError;
use crate::params::ConversionParams;
use async_trait::async_trait;

/// Contract for the numeric engine performing the actual resampling
/// computation.
///
/// `source` and `target` are slices of the session-owned transfer buffers;
/// an engine must never retain references to them across calls. Frame counts
/// returned by `run_once`/`run_streaming` are measured per channel, so the
/// number of valid samples written to `target` is `frames * channels`.
pub trait ConversionEngine: Send {
    /// (Re)initializes internal converter state for the given parameters.
    fn init(&mut self, params: &ConversionParams) -> Result<(), EngineError>;

    /// One-shot conversion: internal filter state is reset per call, so each
    /// call is independent of any previous one.
    fn run_once(
        &mut self,
        source: &[f32],
        target: &mut [f32],
        params: &ConversionParams,
    ) -> Result<usize, EngineError>;

    /// Streaming conversion: treated as a continuation of prior streaming
    /// calls on the same engine, filter history persists between calls.
    fn run_streaming(
        &mut self,
        source: &[f32],
        target: &mut [f32],
        params: &ConversionParams,
    ) -> Result<usize, EngineError>;

    /// Releases converter state. The engine must be `init`ed again before it
    /// can be reused.
    fn teardown(&mut self);
}

/// Asynchronous source of [`ConversionEngine`] instances.
///
/// Acquisition is the only suspension point in the core: locating and
/// instantiating an engine may involve loading code or other slow work.
#[async_trait]
pub trait EngineFactory: Send + Sync + 'static {
    async fn acquire(&self) -> Result<Box<dyn ConversionEngine>, EngineError>;
}
