//! The transcoding entry point: container unwrap, sample conversion,
//! container rewrap.

use super::{AudioFormat, Container, FormatError, pcm, riff};

/// Converts an audio byte stream from `source` to `target`.
///
/// Pure function: no I/O, no session state. When the source is RIFF the
/// header's declared format is authoritative and `source.pcm` is ignored.
/// Only 16-bit integer PCM payloads are supported; anything else fails with
/// a [`FormatError`] instead of producing garbage.
pub fn transcode(
    bytes: &[u8],
    source: AudioFormat,
    target: AudioFormat,
) -> Result<Vec<u8>, FormatError> {
    let (source_pcm, data) = match source.container {
        Container::Riff => riff::decode(bytes)?,
        Container::RawPcm => (source.pcm, bytes),
    };

    if source_pcm.bits_per_sample != 16 {
        return Err(FormatError::UnsupportedBitDepth(source_pcm.bits_per_sample));
    }
    if target.pcm.bits_per_sample != 16 {
        return Err(FormatError::UnsupportedBitDepth(target.pcm.bits_per_sample));
    }
    if source_pcm.channels == 0 || target.pcm.channels == 0 {
        return Err(FormatError::UnsupportedChannelLayout(
            source_pcm.channels,
            target.pcm.channels,
        ));
    }
    if data.len() % source_pcm.block_align() as usize != 0 {
        return Err(FormatError::RaggedSampleData(data.len()));
    }

    let samples = pcm::convert_i16_to_f32(&pcm::i16_from_le_bytes(data)?);
    let planes = pcm::deinterleave(&samples, source_pcm.channels as usize);
    let planes = pcm::resample(planes, source_pcm.sample_rate, target.pcm.sample_rate)?;
    let planes = pcm::remap_channels(planes, target.pcm.channels)?;

    let out = pcm::i16_to_le_bytes(&pcm::convert_f32_to_i16(&pcm::interleave(&planes)));
    Ok(match target.container {
        Container::Riff => riff::encode(&out, target.pcm),
        Container::RawPcm => out,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::PcmFormat;

    fn mono_16k_tone(frames: usize) -> Vec<u8> {
        let samples: Vec<i16> = (0..frames)
            .map(|i| ((i as f32 * 0.05).sin() * 12_000.0) as i16)
            .collect();
        pcm::i16_to_le_bytes(&samples)
    }

    #[test]
    fn rewrap_without_sample_changes_is_lossless() {
        let data = mono_16k_tone(400);
        let fmt = AudioFormat::riff(16_000, 16, 1);
        let wav = riff::encode(&data, fmt.pcm);

        let raw = transcode(&wav, fmt, AudioFormat::raw(16_000, 16, 1)).unwrap();
        assert_eq!(raw, data);

        let rewrapped = transcode(&raw, AudioFormat::raw(16_000, 16, 1), fmt).unwrap();
        assert_eq!(rewrapped, wav);
    }

    #[test]
    fn synthesis_output_converts_to_the_client_wire_format() {
        let wav = riff::encode(&mono_16k_tone(16_000), PcmFormat::new(16_000, 16, 1));
        let out = transcode(
            &wav,
            AudioFormat::riff(16_000, 16, 1),
            AudioFormat::riff(8_000, 16, 2),
        )
        .unwrap();

        let (fmt, data) = riff::decode(&out).unwrap();
        assert_eq!(fmt, PcmFormat::new(8_000, 16, 2));
        // Stereo from mono: both channels of a frame carry the same sample.
        let samples = pcm::i16_from_le_bytes(data).unwrap();
        assert!(samples.chunks_exact(2).all(|f| f[0] == f[1]));
        // Half the rate, double the channels: byte count stays in the same
        // ballpark as the input data.
        let (_, in_data) = riff::decode(&wav).unwrap();
        assert!((data.len() as i64 - in_data.len() as i64).abs() < 4 * 1024 * 2);
    }

    #[test]
    fn stereo_folds_down_for_recognition_input() {
        let frames = 800usize;
        let mut interleaved = Vec::with_capacity(frames * 2);
        for _ in 0..frames {
            interleaved.push(2000i16);
            interleaved.push(4000i16);
        }
        let wav = riff::encode(&pcm::i16_to_le_bytes(&interleaved), PcmFormat::new(8_000, 16, 2));

        let out = transcode(
            &wav,
            AudioFormat::riff(8_000, 16, 2),
            AudioFormat::riff(8_000, 16, 1),
        )
        .unwrap();
        let (fmt, data) = riff::decode(&out).unwrap();
        assert_eq!(fmt.channels, 1);
        let samples = pcm::i16_from_le_bytes(data).unwrap();
        assert!(samples.iter().all(|&s| (s - 3000).abs() <= 1));
    }

    #[test]
    fn riff_header_is_authoritative_over_the_caller_hint() {
        let wav = riff::encode(&mono_16k_tone(100), PcmFormat::new(16_000, 16, 1));
        // Caller claims stereo 8k; the header says mono 16k and wins.
        let out = transcode(
            &wav,
            AudioFormat::riff(8_000, 16, 2),
            AudioFormat::raw(16_000, 16, 1),
        )
        .unwrap();
        assert_eq!(out, mono_16k_tone(100));
    }

    #[test]
    fn eight_bit_audio_is_rejected() {
        let wav = riff::encode(&[0u8; 64], PcmFormat::new(8_000, 8, 1));
        assert!(matches!(
            transcode(
                &wav,
                AudioFormat::riff(8_000, 8, 1),
                AudioFormat::riff(8_000, 16, 1)
            ),
            Err(FormatError::UnsupportedBitDepth(8))
        ));
    }

    #[test]
    fn truncated_container_is_rejected_before_any_conversion() {
        let mut wav = riff::encode(&mono_16k_tone(400), PcmFormat::new(16_000, 16, 1));
        wav.truncate(60);
        assert!(matches!(
            transcode(
                &wav,
                AudioFormat::riff(16_000, 16, 1),
                AudioFormat::riff(8_000, 16, 2)
            ),
            Err(FormatError::Truncated { .. })
        ));
    }
}
