use crate::error::FormatError;

/// Closed set of sample encodings callers may hand to the converter, each
/// with a fixed symmetric full-scale value.
///
/// `F64` is representable so callers can name it, but the float adapter
/// rejects it: the conversion path is single-precision end to end.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleBuffer {
    F32(Vec<f32>),
    F64(Vec<f64>),
    I8(Vec<i8>),
    U8(Vec<u8>),
    I16(Vec<i16>),
    U16(Vec<u16>),
    I32(Vec<i32>),
    U32(Vec<u32>),
}

impl SampleBuffer {
    /// Symmetric full-scale value of the encoding.
    pub fn full_scale(&self) -> f64 {
        match self {
            Self::F32(_) | Self::F64(_) => 1.0,
            Self::I8(_) | Self::U8(_) => 127.0,
            Self::I16(_) | Self::U16(_) => 32767.0,
            Self::I32(_) | Self::U32(_) => 2_147_483_647.0,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::F32(data) => data.len(),
            Self::F64(data) => data.len(),
            Self::I8(data) => data.len(),
            Self::U8(data) => data.len(),
            Self::I16(data) => data.len(),
            Self::U16(data) => data.len(),
            Self::I32(data) => data.len(),
            Self::U32(data) => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Converts to `f32` samples normalized to `[-1, 1]`: signed encodings
    /// divide by full scale, unsigned ones are re-centered around it first.
    /// `F32` passes through unchanged.
    pub fn into_f32(self) -> Result<Vec<f32>, FormatError> {
        let scale = self.full_scale();
        match self {
            Self::F32(data) => Ok(data),
            Self::F64(_) => Err(FormatError::UnsupportedSampleFormat("f64")),
            Self::I8(data) => Ok(scaled_signed(data.into_iter().map(f64::from), scale)),
            Self::I16(data) => Ok(scaled_signed(data.into_iter().map(f64::from), scale)),
            Self::I32(data) => Ok(scaled_signed(data.into_iter().map(f64::from), scale)),
            Self::U8(data) => Ok(scaled_unsigned(data.into_iter().map(f64::from), scale)),
            Self::U16(data) => Ok(scaled_unsigned(data.into_iter().map(f64::from), scale)),
            Self::U32(data) => Ok(scaled_unsigned(data.into_iter().map(f64::from), scale)),
        }
    }
}

fn scaled_signed(samples: impl Iterator<Item = f64>, scale: f64) -> Vec<f32> {
    samples.map(|s| (s / scale) as f32).collect()
}

fn scaled_unsigned(samples: impl Iterator<Item = f64>, scale: f64) -> Vec<f32> {
    samples.map(|s| ((s - scale) / scale) as f32).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::{assert_eq, assert_matches};

    #[test]
    fn f32_passes_through() {
        let data = vec![-0.5f32, 0.0, 0.5];
        assert_eq!(SampleBuffer::F32(data.clone()).into_f32().unwrap(), data);
    }

    #[test]
    fn f64_is_rejected() {
        assert_matches!(
            SampleBuffer::F64(vec![0.0]).into_f32(),
            Err(FormatError::UnsupportedSampleFormat("f64"))
        );
    }

    #[test]
    fn i16_scales_to_unit_range() {
        let out = SampleBuffer::I16(vec![-32767, 0, 32767]).into_f32().unwrap();
        assert_eq!(out, vec![-1.0, 0.0, 1.0]);
    }

    #[test]
    fn u8_recenters_around_full_scale() {
        let out = SampleBuffer::U8(vec![0, 127, 255]).into_f32().unwrap();
        assert_eq!(out[0], -1.0);
        assert_eq!(out[1], 0.0);
        assert!((out[2] - 128.0 / 127.0).abs() < 1e-6);
    }

    #[test]
    fn i8_scales_by_its_own_full_scale() {
        let out = SampleBuffer::I8(vec![-127, 127]).into_f32().unwrap();
        assert_eq!(out, vec![-1.0, 1.0]);
    }

    #[test]
    fn full_scale_constants() {
        assert_eq!(SampleBuffer::I32(vec![]).full_scale(), 2_147_483_647.0);
        assert_eq!(SampleBuffer::U16(vec![]).full_scale(), 32767.0);
        assert_eq!(SampleBuffer::F32(vec![]).full_scale(), 1.0);
    }
}
