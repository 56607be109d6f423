use serde::{Deserialize, Serialize};

/// Converter algorithm used by a conversion engine.
///
/// The sinc variants trade throughput for fidelity; `ZeroOrderHold` and
/// `Linear` are cheap interpolators suitable for previews or low-power
/// devices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Quality {
    Best,
    Medium,
    #[default]
    Fastest,
    ZeroOrderHold,
    Linear,
}

/// The full parameter set binding a session to its engine: channel count,
/// input/output sample rates and converter quality.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConversionParams {
    pub channels: u16,
    pub input_rate: u32,
    pub output_rate: u32,
    #[serde(default)]
    pub quality: Quality,
}

impl ConversionParams {
    pub fn new(channels: u16, input_rate: u32, output_rate: u32) -> Self {
        Self {
            channels,
            input_rate,
            output_rate,
            quality: Quality::default(),
        }
    }

    pub fn with_quality(mut self, quality: Quality) -> Self {
        self.quality = quality;
        self
    }

    /// Output samples produced per input sample.
    pub fn ratio(&self) -> f64 {
        f64::from(self.output_rate) / f64::from(self.input_rate)
    }
}
