mod chunk;
pub mod error;
pub mod format;
pub mod linear;
pub mod session;

pub use error::{FormatError, SessionError, ValidationError};
pub use format::SampleBuffer;
pub use linear::LinearResampler;
pub use session::Session;

pub use srckit_engine::{BUFFER_LEN, ConversionParams, Quality};

pub const MAX_CHANNELS: u16 = 128;
pub const MAX_SAMPLE_RATE: u32 = 192_000;
