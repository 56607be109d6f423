use crate::BUFFER_LEN;

/// Chunk size in samples for oversized inputs: ~100ms of interleaved audio
/// at the input rate, always a whole number of frames.
///
/// Capped so that neither the chunk nor its projected output can outgrow the
/// transfer buffer at extreme rate/channel combinations.
pub(crate) fn chunk_samples(input_rate: u32, channels: u16, ratio: f64) -> usize {
    let frame = usize::from(channels);
    let heuristic = (input_rate as usize / 10).max(1) * frame;
    let ceiling = (BUFFER_LEN as f64 / ratio.max(1.0)) as usize / frame * frame;
    heuristic.min(ceiling).max(frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn whole_frames() {
        assert_eq!(chunk_samples(44100, 2, 48000.0 / 44100.0) % 2, 0);
        assert_eq!(chunk_samples(44100, 2, 48000.0 / 44100.0), 8820);
        assert_eq!(chunk_samples(48000, 1, 0.5), 4800);
    }

    #[test]
    fn tiny_rates_still_make_progress() {
        assert_eq!(chunk_samples(1, 2, 2.0), 2);
        assert_eq!(chunk_samples(9, 1, 1.5), 1);
    }

    #[test]
    fn capped_inside_the_transfer_buffer() {
        // 192kHz x 128ch heuristic would be ~2.4M samples
        let chunk = chunk_samples(192_000, 128, 1.0);
        assert!(chunk <= BUFFER_LEN);
        assert_eq!(chunk % 128, 0);

        // heavy upsampling shrinks the chunk so the output side fits too
        let chunk = chunk_samples(4000, 1, 48.0);
        assert!((chunk as f64 * 48.0).ceil() as usize <= BUFFER_LEN);
    }

    #[test]
    fn chunks_cover_input_in_order() {
        let input: Vec<f32> = (0..10_000).map(|i| i as f32).collect();
        let size = chunk_samples(8000, 1, 6.0);
        let chunks: Vec<&[f32]> = input.chunks(size).collect();

        assert!(chunks.len() > 1);
        assert!(chunks[..chunks.len() - 1].iter().all(|c| c.len() == size));
        let rejoined: Vec<f32> = chunks.concat();
        assert_eq!(rejoined, input);
    }
}
