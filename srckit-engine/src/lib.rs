pub mod engine;
pub mod error;
mod params;
pub mod registry;

pub use engine::{ConversionEngine, EngineFactory};
pub use error::EngineError;
pub use params::{ConversionParams, Quality};

/// Capacity of each transfer buffer, in samples (~4 MB of `f32`s). Sized so
/// a full buffer of interleaved audio stays under the engine's memory ceiling.
pub const BUFFER_LEN: usize = 1_008_000;
