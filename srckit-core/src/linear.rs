//! Pure reference resampler: linear interpolation on the way up,
//! nearest-neighbor decimation on the way down.
//!
//! Used as the fallback conversion strategy when no engine is available and
//! as a ground-truth oracle in tests. Shares no state with [`crate::Session`]
//! and is deterministic: identical call sequences produce bit-identical
//! output.

/// Stateful block resampler over planar multi-channel audio.
///
/// Carries the fractional remainder of the output length and the previous
/// input block between calls, so packet boundaries that do not align with
/// output sample boundaries stay continuous across calls.
#[derive(Debug, Clone)]
pub struct LinearResampler {
    input_rate: u32,
    output_rate: u32,
    channels: u16,
    /// Fractional output length not yet realized, in [0, 1).
    carry: f64,
    /// Previous input block, kept only for lookback at block boundaries.
    previous: Option<Vec<Vec<f32>>>,
}

impl LinearResampler {
    pub fn new(input_rate: u32, output_rate: u32, channels: u16) -> Self {
        Self {
            input_rate,
            output_rate,
            channels,
            carry: 0.0,
            previous: None,
        }
    }

    /// Resamples one block, `input` holding one sample sequence per channel.
    /// Equal rates pass the block through untouched.
    ///
    /// Downsampling applies no anti-aliasing filter; that limitation is part
    /// of the reference behavior and is kept on purpose.
    pub fn resample(&mut self, input: &[Vec<f32>]) -> Vec<Vec<f32>> {
        debug_assert_eq!(input.len(), usize::from(self.channels));

        if self.input_rate == self.output_rate {
            return input.to_vec();
        }

        let source_rate = f64::from(self.input_rate);
        let target_rate = f64::from(self.output_rate);
        let len = input.first().map_or(0, Vec::len);

        let carry_before = self.carry;
        let output_real = len as f64 * target_rate / source_rate + carry_before;
        let output_len = output_real.floor() as usize;
        self.carry = output_real - output_len as f64;

        let mut output = Vec::with_capacity(input.len());
        for (ch, samples) in input.iter().enumerate() {
            let previous = self.previous.as_ref().map(|block| block[ch].as_slice());
            let resampled = if target_rate > source_rate {
                upsample(samples, output_len, previous, carry_before, source_rate / target_rate)
            } else {
                decimate(samples, output_len)
            };
            output.push(resampled);
        }

        self.previous = Some(input.to_vec());
        output
    }

    /// Drops carried state, e.g. after a seek.
    pub fn reset(&mut self) {
        self.carry = 0.0;
        self.previous = None;
    }
}

fn upsample(
    input: &[f32],
    output_len: usize,
    previous: Option<&[f32]>,
    carry: f64,
    step: f64,
) -> Vec<f32> {
    let source = |idx: isize| -> f32 {
        if idx < 0 {
            match previous {
                // lookback into the tail of the previous block
                Some(prev) if prev.len() as isize + idx > 0 => {
                    prev[(prev.len() as isize + idx) as usize]
                }
                // no usable history yet, clamp to the start of this block
                _ => input[0],
            }
        } else {
            input[(idx as usize).min(input.len() - 1)]
        }
    };

    let mut output = Vec::with_capacity(output_len);
    for i in 0..output_len {
        // map the output sample into input space, offset by one to leave
        // room to interpolate
        let j = (i as f64 + 1.0 - carry) * step - 1.0;
        let a = j.floor();
        let b = j.ceil();

        let sample = if a == b {
            source(a as isize)
        } else {
            source(a as isize) * (b - j) as f32 + source(b as isize) * (j - a) as f32
        };
        output.push(sample);
    }
    output
}

fn decimate(input: &[f32], output_len: usize) -> Vec<f32> {
    (0..output_len)
        .map(|i| {
            let idx = (i as f64 * input.len() as f64 / output_len as f64) as usize;
            input[idx.min(input.len() - 1)]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn mono(samples: &[f32]) -> Vec<Vec<f32>> {
        vec![samples.to_vec()]
    }

    #[test]
    fn passthrough_equal_rates() {
        let mut resampler = LinearResampler::new(44100, 44100, 1);
        let input = mono(&[0.1, 0.2, 0.3]);
        assert_eq!(resampler.resample(&input), input);
    }

    #[test]
    fn doubling_interpolates_between_samples() {
        let mut resampler = LinearResampler::new(8000, 16000, 1);
        let output = resampler.resample(&mono(&[0.0, 1.0, 2.0, 3.0]));

        assert_eq!(output[0], vec![0.0, 0.0, 0.5, 1.0, 1.5, 2.0, 2.5, 3.0]);
        // fractional mapped positions land strictly between the neighbors
        assert!(output[0][2] > 0.0 && output[0][2] < 1.0);
        assert!(output[0][4] > 1.0 && output[0][4] < 2.0);
    }

    #[test]
    fn split_input_matches_whole_input() {
        let samples = [0.0f32, 1.0, 2.0, 3.0];

        let mut whole = LinearResampler::new(8000, 16000, 1);
        let expected = whole.resample(&mono(&samples));

        let mut split = LinearResampler::new(8000, 16000, 1);
        let first = split.resample(&mono(&samples[..2]));
        let second = split.resample(&mono(&samples[2..]));

        let mut joined = first[0].clone();
        joined.extend_from_slice(&second[0]);
        assert_eq!(joined.len(), expected[0].len());
        for (got, want) in joined.iter().zip(&expected[0]).skip(2) {
            assert!((got - want).abs() < 1e-6, "{got} != {want}");
        }
    }

    #[test]
    fn halving_decimates_every_other_sample() {
        let mut resampler = LinearResampler::new(16000, 8000, 1);
        let output = resampler.resample(&mono(&[0.0, 1.0, 2.0, 3.0, 4.0, 5.0]));
        assert_eq!(output[0], vec![0.0, 2.0, 4.0]);
    }

    #[test]
    fn carry_accumulates_across_blocks() {
        let mut resampler = LinearResampler::new(44100, 48000, 1);
        let block = vec![0.25f32; 100];

        let mut total = 0usize;
        for _ in 0..10 {
            total += resampler.resample(&mono(&block))[0].len();
        }

        // 1000 * 48000/44100 = 1088.43..., the fraction carries over
        assert_eq!(total, 1088);
    }

    #[test]
    fn channels_are_independent() {
        let left: Vec<f32> = (0..64).map(|i| i as f32).collect();
        let right: Vec<f32> = (0..64).map(|i| -(i as f32)).collect();

        let mut stereo = LinearResampler::new(8000, 12000, 2);
        let output = stereo.resample(&[left.clone(), right.clone()]);

        let mut mono_left = LinearResampler::new(8000, 12000, 1);
        let mut mono_right = LinearResampler::new(8000, 12000, 1);
        assert_eq!(output[0], mono_left.resample(&mono(&left))[0]);
        assert_eq!(output[1], mono_right.resample(&mono(&right))[0]);
    }

    #[test]
    fn bit_reproducible() {
        let samples: Vec<f32> = (0..1000).map(|i| ((i as f32) * 0.01).sin()).collect();

        let run = || {
            let mut resampler = LinearResampler::new(44100, 48000, 1);
            let mut out = Vec::new();
            for block in samples.chunks(333) {
                out.extend_from_slice(&resampler.resample(&mono(block))[0]);
            }
            out
        };

        assert_eq!(run(), run());
    }

    #[test]
    fn reset_drops_history() {
        let mut resampler = LinearResampler::new(8000, 16000, 1);
        resampler.resample(&mono(&[1.0, 2.0]));
        resampler.reset();

        let mut fresh = LinearResampler::new(8000, 16000, 1);
        assert_eq!(
            resampler.resample(&mono(&[3.0, 4.0])),
            fresh.resample(&mono(&[3.0, 4.0]))
        );
    }
}
