use crate::chunk;
use crate::error::{SessionError, ValidationError};
use crate::{MAX_CHANNELS, MAX_SAMPLE_RATE};
use srckit_engine::{BUFFER_LEN, ConversionEngine, ConversionParams, EngineFactory, Quality, registry};
use std::borrow::Cow;
use std::fmt;
use tracing::instrument;

#[derive(Debug, Clone, Copy)]
enum Entry {
    Once,
    Streaming,
}

/// A conversion session: one engine instance, its pair of fixed-capacity
/// transfer buffers, and the validated configuration binding them.
///
/// All caller data crosses the engine boundary by copy through the transfer
/// buffers, which are allocated once and reused on every call. A session is
/// single-caller: every conversion takes `&mut self`.
pub struct Session {
    engine: Box<dyn ConversionEngine>,
    params: ConversionParams,
    ratio: f64,
    source_buf: Vec<f32>,
    target_buf: Vec<f32>,
    destroyed: bool,
}

impl Session {
    /// Validates `params`, acquires an engine from `factory` and initializes
    /// it. Validation happens synchronously before any engine interaction;
    /// acquiring the engine is the only suspension point in the core.
    #[instrument(level = "debug", skip(factory), err)]
    pub async fn create<F>(factory: &F, params: ConversionParams) -> Result<Self, SessionError>
    where
        F: EngineFactory + ?Sized,
    {
        validate(&params)?;
        let engine = factory.acquire().await?;
        Self::assemble(engine, params)
    }

    /// Like [`Session::create`], acquiring the engine from the process-wide
    /// registry the hosting environment populated at startup.
    #[instrument(level = "debug", err)]
    pub async fn create_registered(params: ConversionParams) -> Result<Self, SessionError> {
        validate(&params)?;
        let engine = registry::acquire().await?;
        Self::assemble(engine, params)
    }

    fn assemble(
        mut engine: Box<dyn ConversionEngine>,
        params: ConversionParams,
    ) -> Result<Self, SessionError> {
        engine.init(&params)?;
        tracing::debug!(?params, "Conversion session ready");
        Ok(Self {
            engine,
            ratio: params.ratio(),
            params,
            source_buf: vec![0.0; BUFFER_LEN],
            target_buf: vec![0.0; BUFFER_LEN],
            destroyed: false,
        })
    }

    /// One-shot conversion: each call is independent, the engine resets its
    /// filter state per call. Equal input and output rates return the input
    /// unchanged, zero-copy.
    ///
    /// Inputs whose projected output exceeds the transfer buffer are split
    /// into chunks and fed through the streaming entry point instead, since
    /// filter state must carry across chunk boundaries.
    #[instrument(level = "debug", skip(self, input), fields(samples = input.len()), err)]
    pub fn convert_once<'a>(&mut self, input: &'a [f32]) -> Result<Cow<'a, [f32]>, SessionError> {
        self.convert(Entry::Once, input)
    }

    /// Streaming conversion: the engine treats every call as a continuation
    /// of the previous one, keeping filter history across calls.
    #[instrument(level = "debug", skip(self, input), fields(samples = input.len()), err)]
    pub fn convert_streaming<'a>(
        &mut self,
        input: &'a [f32],
    ) -> Result<Cow<'a, [f32]>, SessionError> {
        self.convert(Entry::Streaming, input)
    }

    /// Streaming conversion into a caller-supplied buffer, avoiding an
    /// allocation per call. `output` must hold at least
    /// `ceil(ratio * input.len())` samples; a shorter buffer fails before
    /// any engine call, with no partial write. Returns the number of samples
    /// written.
    ///
    /// Inputs large enough to need chunking are rejected up front: chunked
    /// output lengths are engine-determined, so a fixed caller buffer has no
    /// exact sufficiency bound. Use [`Session::convert_streaming`] for those.
    #[instrument(level = "debug", skip(self, input, output), fields(samples = input.len()), err)]
    pub fn convert_streaming_into(
        &mut self,
        input: &[f32],
        output: &mut [f32],
    ) -> Result<usize, SessionError> {
        self.ensure_live()?;

        if self.params.input_rate == self.params.output_rate {
            if output.len() < input.len() {
                return Err(SessionError::BufferTooSmall {
                    needed: input.len(),
                    got: output.len(),
                });
            }
            output[..input.len()].copy_from_slice(input);
            return Ok(input.len());
        }

        if self.needs_chunking(input.len()) {
            return Err(SessionError::InputRequiresChunking {
                samples: input.len(),
            });
        }

        let needed = self.projected_samples(input.len());
        if output.len() < needed {
            return Err(SessionError::BufferTooSmall {
                needed,
                got: output.len(),
            });
        }

        let samples = self.run_raw(Entry::Streaming, input)?;
        output[..samples].copy_from_slice(&self.target_buf[..samples]);
        Ok(samples)
    }

    /// Replaces the session configuration wholesale: tears down the engine
    /// and re-initializes it with the new parameter set. Any engine state
    /// from previous calls is invalidated; the transfer buffers are reused,
    /// their capacity does not depend on the configuration.
    #[instrument(level = "debug", skip(self), err)]
    pub fn reconfigure(&mut self, params: ConversionParams) -> Result<(), SessionError> {
        self.ensure_live()?;
        validate(&params)?;

        self.engine.teardown();
        self.engine.init(&params)?;
        self.params = params;
        self.ratio = params.ratio();
        tracing::debug!(?params, "Conversion session reconfigured");
        Ok(())
    }

    /// Releases engine resources. Conversions and reconfiguration fail with
    /// [`SessionError::UseAfterDestroy`] afterwards. Destroying an already
    /// destroyed session is a logged no-op.
    pub fn destroy(&mut self) {
        if self.destroyed {
            tracing::warn!("destroy() called on an already destroyed session");
            return;
        }
        self.engine.teardown();
        self.destroyed = true;
        tracing::debug!("Conversion session destroyed");
    }

    pub fn channels(&self) -> u16 {
        self.params.channels
    }

    pub fn input_rate(&self) -> u32 {
        self.params.input_rate
    }

    pub fn output_rate(&self) -> u32 {
        self.params.output_rate
    }

    pub fn quality(&self) -> Quality {
        self.params.quality
    }

    /// Output samples produced per input sample.
    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    pub fn params(&self) -> ConversionParams {
        self.params
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    fn convert<'a>(
        &mut self,
        entry: Entry,
        input: &'a [f32],
    ) -> Result<Cow<'a, [f32]>, SessionError> {
        self.ensure_live()?;

        if self.params.input_rate == self.params.output_rate {
            return Ok(Cow::Borrowed(input));
        }

        if self.needs_chunking(input.len()) {
            // chunking must not alter the result relative to running the
            // whole input through the streaming path, so oversized one-shot
            // inputs degrade to streaming
            return Ok(Cow::Owned(self.convert_chunked(input)?));
        }

        let samples = self.run_raw(entry, input)?;
        Ok(Cow::Owned(self.target_buf[..samples].to_vec()))
    }

    /// Splits an oversized input into ~100ms chunks and feeds them through
    /// the streaming entry point, strictly in order: the engine's filter
    /// state is causally dependent on chunk order, so chunks may never be
    /// skipped, reordered or processed in parallel. The accumulated length
    /// is the sum of the engine's per-chunk output, per-chunk rounding is
    /// engine-determined and preserved.
    #[instrument(level = "debug", skip(self, input), fields(samples = input.len()), err)]
    fn convert_chunked(&mut self, input: &[f32]) -> Result<Vec<f32>, SessionError> {
        let chunk_samples =
            chunk::chunk_samples(self.params.input_rate, self.params.channels, self.ratio);
        let mut accumulated = Vec::with_capacity(self.projected_samples(input.len()));

        for chunk in input.chunks(chunk_samples) {
            let samples = self.run_raw(Entry::Streaming, chunk)?;
            accumulated.extend_from_slice(&self.target_buf[..samples]);
        }

        tracing::trace!(samples = accumulated.len(), "Chunked conversion complete");
        Ok(accumulated)
    }

    /// Copies `input` into the source buffer, runs the engine and leaves the
    /// produced samples at the start of the target buffer. Returns the
    /// number of valid samples (`frames * channels`).
    fn run_raw(&mut self, entry: Entry, input: &[f32]) -> Result<usize, SessionError> {
        self.source_buf[..input.len()].copy_from_slice(input);
        let source = &self.source_buf[..input.len()];

        let frames = match entry {
            Entry::Once => self
                .engine
                .run_once(source, &mut self.target_buf, &self.params)?,
            Entry::Streaming => self
                .engine
                .run_streaming(source, &mut self.target_buf, &self.params)?,
        };

        Ok(frames * usize::from(self.params.channels))
    }

    /// Exact `ceil(input * output_rate / input_rate)` in integer arithmetic:
    /// the f64 product drifts above exact integer results (one second at
    /// 44.1kHz -> 48kHz projects to 48001 instead of 48000).
    fn projected_samples(&self, input_samples: usize) -> usize {
        (input_samples * self.params.output_rate as usize)
            .div_ceil(self.params.input_rate as usize)
    }

    fn needs_chunking(&self, input_samples: usize) -> bool {
        self.projected_samples(input_samples) > BUFFER_LEN || input_samples > BUFFER_LEN
    }

    fn ensure_live(&self) -> Result<(), SessionError> {
        if self.destroyed {
            return Err(SessionError::UseAfterDestroy);
        }
        Ok(())
    }
}

// manual impl: the boxed engine is not Debug
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("params", &self.params)
            .field("ratio", &self.ratio)
            .field("destroyed", &self.destroyed)
            .finish_non_exhaustive()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if !self.destroyed {
            self.engine.teardown();
        }
    }
}

fn validate(params: &ConversionParams) -> Result<(), ValidationError> {
    if !(1..=MAX_CHANNELS).contains(&params.channels) {
        return Err(ValidationError::Channels(params.channels));
    }
    if !(1..=MAX_SAMPLE_RATE).contains(&params.input_rate) {
        return Err(ValidationError::InputRate(params.input_rate));
    }
    if !(1..=MAX_SAMPLE_RATE).contains(&params.output_rate) {
        return Err(ValidationError::OutputRate(params.output_rate));
    }
    Ok(())
}
