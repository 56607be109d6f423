use crate::engine::{ConversionEngine, EngineFactory};
use crate::error::EngineError;
use crate::params::{ConversionParams, Quality};
use async_trait::async_trait;
use rubato::{
    FastFixedIn, PolynomialDegree, Resampler, SincFixedIn, SincInterpolationParameters,
    SincInterpolationType, WindowFunction,
};
use tracing::instrument;

/// Input frames consumed per internal processing block.
const CHUNK_FRAMES: usize = 1024;

const MAX_RATIO_RELATIVE: f64 = 2.0;

/// Enum wrapper for rubato resamplers (the trait is not object-safe).
enum ResamplerKind {
    Poly(FastFixedIn<f32>),
    Sinc(SincFixedIn<f32>),
}

impl ResamplerKind {
    fn process_into_buffer(
        &mut self,
        input: &[Vec<f32>],
        output: &mut [Vec<f32>],
    ) -> Result<(usize, usize), rubato::ResampleError> {
        match self {
            Self::Poly(r) => r.process_into_buffer(input, output, None),
            Self::Sinc(r) => r.process_into_buffer(input, output, None),
        }
    }

    fn process_partial_into_buffer(
        &mut self,
        input: Option<&[Vec<f32>]>,
        output: &mut [Vec<f32>],
    ) -> Result<(usize, usize), rubato::ResampleError> {
        match self {
            Self::Poly(r) => r.process_partial_into_buffer(input, output, None),
            Self::Sinc(r) => r.process_partial_into_buffer(input, output, None),
        }
    }

    fn input_frames_next(&self) -> usize {
        match self {
            Self::Poly(r) => r.input_frames_next(),
            Self::Sinc(r) => r.input_frames_next(),
        }
    }

    fn output_frames_next(&self) -> usize {
        match self {
            Self::Poly(r) => r.output_frames_next(),
            Self::Sinc(r) => r.output_frames_next(),
        }
    }

    fn reset(&mut self) {
        match self {
            Self::Poly(r) => r.reset(),
            Self::Sinc(r) => r.reset(),
        }
    }
}

fn sinc_params(quality: Quality) -> SincInterpolationParameters {
    match quality {
        Quality::Best => SincInterpolationParameters {
            sinc_len: 256,
            f_cutoff: 0.95,
            interpolation: SincInterpolationType::Cubic,
            oversampling_factor: 256,
            window: WindowFunction::BlackmanHarris2,
        },
        Quality::Medium => SincInterpolationParameters {
            sinc_len: 128,
            f_cutoff: 0.95,
            interpolation: SincInterpolationType::Linear,
            oversampling_factor: 256,
            window: WindowFunction::BlackmanHarris2,
        },
        _ => SincInterpolationParameters {
            sinc_len: 64,
            f_cutoff: 0.95,
            interpolation: SincInterpolationType::Linear,
            oversampling_factor: 128,
            window: WindowFunction::BlackmanHarris2,
        },
    }
}

fn build_resampler(params: &ConversionParams) -> Result<ResamplerKind, EngineError> {
    let ratio = params.ratio();
    let channels = usize::from(params.channels);

    let kind = match params.quality {
        Quality::Best | Quality::Medium | Quality::Fastest => ResamplerKind::Sinc(
            SincFixedIn::new(
                ratio,
                MAX_RATIO_RELATIVE,
                sinc_params(params.quality),
                CHUNK_FRAMES,
                channels,
            )
            .map_err(|err| EngineError::Construction(err.into()))?,
        ),
        Quality::ZeroOrderHold | Quality::Linear => {
            let degree = if params.quality == Quality::ZeroOrderHold {
                PolynomialDegree::Nearest
            } else {
                PolynomialDegree::Linear
            };
            ResamplerKind::Poly(
                FastFixedIn::new(ratio, MAX_RATIO_RELATIVE, degree, CHUNK_FRAMES, channels)
                    .map_err(|err| EngineError::Construction(err.into()))?,
            )
        }
    };

    Ok(kind)
}

struct Inner {
    resampler: ResamplerKind,
    channels: usize,
    /// Streaming input not yet consumed, planar.
    pending: Vec<Vec<f32>>,
    // reusable scratch, planar
    chunk_in: Vec<Vec<f32>>,
    chunk_out: Vec<Vec<f32>>,
}

impl Inner {
    fn new(params: &ConversionParams) -> Result<Self, EngineError> {
        let channels = usize::from(params.channels);
        Ok(Self {
            resampler: build_resampler(params)?,
            channels,
            pending: vec![Vec::new(); channels],
            chunk_in: vec![Vec::new(); channels],
            chunk_out: vec![Vec::new(); channels],
        })
    }

    fn push_interleaved(&mut self, interleaved: &[f32]) {
        for (i, &sample) in interleaved.iter().enumerate() {
            self.pending[i % self.channels].push(sample);
        }
    }

    /// Drains as many full processing blocks as are pending, interleaving
    /// the produced frames into `target` starting at frame `written`.
    /// Returns the updated frame count.
    fn drain_full_chunks(
        &mut self,
        target: &mut [f32],
        mut written: usize,
    ) -> Result<usize, EngineError> {
        loop {
            let need = self.resampler.input_frames_next();
            if self.pending[0].len() < need {
                return Ok(written);
            }

            for ch in 0..self.channels {
                self.chunk_in[ch].clear();
                self.chunk_in[ch].extend_from_slice(&self.pending[ch][..need]);
            }
            let out_next = self.resampler.output_frames_next();
            for buf in &mut self.chunk_out {
                buf.resize(out_next, 0.0);
            }

            let (_, produced) = ResamplerKind::process_into_buffer(
                &mut self.resampler,
                &self.chunk_in,
                &mut self.chunk_out,
            )
            .map_err(|err| EngineError::Process(err.into()))?;

            for buf in &mut self.pending {
                buf.drain(..need);
            }
            written = self.emit(target, written, produced)?;
        }
    }

    /// Feeds the pending remainder (shorter than a full block) through the
    /// resampler and flushes its internal delay line.
    fn drain_tail(&mut self, target: &mut [f32], mut written: usize) -> Result<usize, EngineError> {
        if !self.pending[0].is_empty() {
            let len = self.pending[0].len();
            for ch in 0..self.channels {
                self.chunk_in[ch].clear();
                self.chunk_in[ch].extend_from_slice(&self.pending[ch][..len]);
            }
            let out_next = self.resampler.output_frames_next();
            for buf in &mut self.chunk_out {
                buf.resize(out_next, 0.0);
            }

            let (_, produced) = ResamplerKind::process_partial_into_buffer(
                &mut self.resampler,
                Some(&self.chunk_in),
                &mut self.chunk_out,
            )
            .map_err(|err| EngineError::Process(err.into()))?;

            for buf in &mut self.pending {
                buf.clear();
            }
            written = self.emit(target, written, produced)?;
        }

        let out_next = self.resampler.output_frames_next();
        for buf in &mut self.chunk_out {
            buf.resize(out_next, 0.0);
        }
        let no_input: Option<&[Vec<f32>]> = None;
        let (_, produced) =
            ResamplerKind::process_partial_into_buffer(&mut self.resampler, no_input, &mut self.chunk_out)
                .map_err(|err| EngineError::Process(err.into()))?;
        self.emit(target, written, produced)
    }

    fn emit(
        &mut self,
        target: &mut [f32],
        written: usize,
        produced: usize,
    ) -> Result<usize, EngineError> {
        if (written + produced) * self.channels > target.len() {
            return Err(EngineError::Process(anyhow::anyhow!(
                "produced output exceeds target buffer capacity"
            )));
        }
        for frame in 0..produced {
            let base = (written + frame) * self.channels;
            for (ch, buf) in self.chunk_out.iter().enumerate().take(self.channels) {
                target[base + ch] = buf[frame];
            }
        }
        Ok(written + produced)
    }
}

/// [`ConversionEngine`] backed by rubato's fixed-input-size resamplers.
///
/// The streaming path accumulates planar input and drains it one processing
/// block at a time, leaving any remainder buffered for the next call, so
/// frames produced per call depend on internal block boundaries.
#[derive(Default)]
pub struct RubatoEngine {
    inner: Option<Inner>,
}

impl ConversionEngine for RubatoEngine {
    #[instrument(level = "debug", skip(self), err)]
    fn init(&mut self, params: &ConversionParams) -> Result<(), EngineError> {
        tracing::debug!("Initializing rubato engine");
        self.inner = Some(Inner::new(params)?);
        Ok(())
    }

    fn run_once(
        &mut self,
        source: &[f32],
        target: &mut [f32],
        _params: &ConversionParams,
    ) -> Result<usize, EngineError> {
        let inner = self.inner.as_mut().ok_or(EngineError::NotInitialized)?;

        // one-shot calls are independent of each other
        inner.resampler.reset();
        for buf in &mut inner.pending {
            buf.clear();
        }

        inner.push_interleaved(source);
        let written = inner.drain_full_chunks(target, 0)?;
        inner.drain_tail(target, written)
    }

    fn run_streaming(
        &mut self,
        source: &[f32],
        target: &mut [f32],
        _params: &ConversionParams,
    ) -> Result<usize, EngineError> {
        let inner = self.inner.as_mut().ok_or(EngineError::NotInitialized)?;

        inner.push_interleaved(source);
        inner.drain_full_chunks(target, 0)
    }

    fn teardown(&mut self) {
        tracing::debug!("Tearing down rubato engine");
        self.inner = None;
    }
}

/// Factory handing out fresh [`RubatoEngine`] instances.
pub struct RubatoFactory;

#[async_trait]
impl EngineFactory for RubatoFactory {
    async fn acquire(&self) -> Result<Box<dyn ConversionEngine>, EngineError> {
        Ok(Box::new(RubatoEngine::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BUFFER_LEN;
    use test_log::test;

    fn engine(params: &ConversionParams) -> RubatoEngine {
        let mut engine = RubatoEngine::default();
        engine.init(params).expect("Failed to init engine");
        engine
    }

    fn ramp(samples: usize) -> Vec<f32> {
        (0..samples).map(|i| (i as f32 / samples as f32).sin()).collect()
    }

    #[test]
    fn run_before_init_fails() {
        let params = ConversionParams::new(1, 44100, 48000);
        let mut engine = RubatoEngine::default();
        let mut target = vec![0.0; 1024];
        let res = engine.run_streaming(&[0.0; 64], &mut target, &params);
        assert!(matches!(res, Err(EngineError::NotInitialized)));
    }

    #[test]
    fn streaming_total_length_tracks_ratio() {
        let params = ConversionParams::new(2, 48000, 44100).with_quality(Quality::Linear);
        let mut engine = engine(&params);
        let mut target = vec![0.0; BUFFER_LEN];

        let input = ramp(48000 * 2);
        let mut total_frames = 0;
        for block in input.chunks(8192) {
            total_frames += engine
                .run_streaming(block, &mut target, &params)
                .expect("Failed to stream");
        }

        let expected = 48000.0 * params.ratio();
        // the tail shorter than one block stays buffered inside the engine
        assert!(total_frames > 0);
        assert!((total_frames as f64) <= expected.ceil());
        assert!((expected - total_frames as f64) < 2.0 * CHUNK_FRAMES as f64 * params.ratio());
    }

    #[test]
    fn once_is_independent_across_calls() {
        let params = ConversionParams::new(1, 44100, 22050).with_quality(Quality::Linear);
        let mut engine = engine(&params);
        let mut target = vec![0.0; BUFFER_LEN];

        let input = ramp(4410);
        let first = engine
            .run_once(&input, &mut target, &params)
            .expect("Failed to run once");
        let first_out = target[..first].to_vec();

        let second = engine
            .run_once(&input, &mut target, &params)
            .expect("Failed to run once");
        assert_eq!(first, second);
        assert_eq!(first_out, target[..second]);
    }

    #[test]
    fn once_produces_roughly_ratio_scaled_output() {
        let params = ConversionParams::new(1, 44100, 48000).with_quality(Quality::Linear);
        let mut engine = engine(&params);
        let mut target = vec![0.0; BUFFER_LEN];

        let frames = engine
            .run_once(&ramp(44100), &mut target, &params)
            .expect("Failed to run once");

        let expected = 44100.0 * params.ratio();
        assert!(frames > 0);
        assert!((frames as f64 - expected).abs() < 2.0 * CHUNK_FRAMES as f64 * params.ratio());
    }

    #[test]
    fn all_qualities_construct() {
        for quality in [
            Quality::Best,
            Quality::Medium,
            Quality::Fastest,
            Quality::ZeroOrderHold,
            Quality::Linear,
        ] {
            let params = ConversionParams::new(2, 44100, 48000).with_quality(quality);
            build_resampler(&params).expect("Failed to build resampler");
        }
    }

    #[test]
    fn teardown_requires_reinit() {
        let params = ConversionParams::new(1, 44100, 48000).with_quality(Quality::Linear);
        let mut engine = engine(&params);
        engine.teardown();

        let mut target = vec![0.0; 1024];
        let res = engine.run_streaming(&[0.0; 64], &mut target, &params);
        assert!(matches!(res, Err(EngineError::NotInitialized)));
    }
}
