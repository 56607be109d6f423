use crate::engine::{ConversionEngine, EngineFactory};
use crate::error::EngineError;
use crate::params::ConversionParams;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryPoint {
    Init,
    Once,
    Streaming,
    Teardown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub entry: EntryPoint,
    pub input_samples: usize,
    pub frames_produced: usize,
}

/// Shared record of every engine call, in order.
#[derive(Clone, Default)]
pub struct CallHistory(Arc<Mutex<Vec<Call>>>);

impl CallHistory {
    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.0.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.lock().is_empty()
    }

    fn push(&self, call: Call) {
        self.0.lock().push(call);
    }
}

/// Deterministic engine for session tests: produces exactly
/// `ceil(frames_in * ratio)` frames per channel by nearest-neighbor
/// stretching of the input, and records every call it receives.
pub struct MockEngine {
    params: Option<ConversionParams>,
    history: CallHistory,
}

impl MockEngine {
    pub fn new(history: CallHistory) -> Self {
        Self {
            params: None,
            history,
        }
    }

    fn run(
        &mut self,
        entry: EntryPoint,
        source: &[f32],
        target: &mut [f32],
    ) -> Result<usize, EngineError> {
        let params = self.params.ok_or(EngineError::NotInitialized)?;
        let channels = usize::from(params.channels);

        let frames_in = source.len() / channels;
        // integer ceiling: the f64 product rounds exact integer results up
        let frames_out = (frames_in * params.output_rate as usize)
            .div_ceil(params.input_rate as usize);
        let samples_out = frames_out * channels;
        if samples_out > target.len() {
            return Err(EngineError::Process(anyhow::anyhow!(
                "produced output exceeds target buffer capacity"
            )));
        }

        for (i, sample) in target[..samples_out].iter_mut().enumerate() {
            *sample = source[i * source.len() / samples_out];
        }

        self.history.push(Call {
            entry,
            input_samples: source.len(),
            frames_produced: frames_out,
        });
        Ok(frames_out)
    }
}

impl ConversionEngine for MockEngine {
    fn init(&mut self, params: &ConversionParams) -> Result<(), EngineError> {
        self.params = Some(*params);
        self.history.push(Call {
            entry: EntryPoint::Init,
            input_samples: 0,
            frames_produced: 0,
        });
        Ok(())
    }

    fn run_once(
        &mut self,
        source: &[f32],
        target: &mut [f32],
        _params: &ConversionParams,
    ) -> Result<usize, EngineError> {
        self.run(EntryPoint::Once, source, target)
    }

    fn run_streaming(
        &mut self,
        source: &[f32],
        target: &mut [f32],
        _params: &ConversionParams,
    ) -> Result<usize, EngineError> {
        self.run(EntryPoint::Streaming, source, target)
    }

    fn teardown(&mut self) {
        self.params = None;
        self.history.push(Call {
            entry: EntryPoint::Teardown,
            input_samples: 0,
            frames_produced: 0,
        });
    }
}

/// Factory handing out [`MockEngine`]s wired to a shared [`CallHistory`].
#[derive(Default)]
pub struct MockFactory {
    history: CallHistory,
    acquired: Arc<AtomicUsize>,
    fail: bool,
}

impl MockFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// A factory whose `acquire` always fails, for engine-load error tests.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn history(&self) -> CallHistory {
        self.history.clone()
    }

    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl EngineFactory for MockFactory {
    async fn acquire(&self) -> Result<Box<dyn ConversionEngine>, EngineError> {
        if self.fail {
            return Err(EngineError::Construction(anyhow::anyhow!(
                "mock factory configured to fail"
            )));
        }
        self.acquired.fetch_add(1, Ordering::Relaxed);
        Ok(Box::new(MockEngine::new(self.history.clone())))
    }
}
