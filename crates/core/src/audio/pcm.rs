//! PCM sample helpers: 16-bit <-> f32 conversion, channel layout changes,
//! and sample-rate conversion via `rubato`.

use rubato::{FastFixedIn, PolynomialDegree, Resampler};

use super::FormatError;

/// Frames fed to the resampler per call.
const RESAMPLE_CHUNK: usize = 1024;

/// Reinterprets little-endian bytes as 16-bit samples.
pub fn i16_from_le_bytes(bytes: &[u8]) -> Result<Vec<i16>, FormatError> {
    if bytes.len() % 2 != 0 {
        return Err(FormatError::RaggedSampleData(bytes.len()));
    }
    Ok(bytes
        .chunks_exact(2)
        .map(|c| i16::from_le_bytes([c[0], c[1]]))
        .collect())
}

/// Serializes 16-bit samples as little-endian bytes.
pub fn i16_to_le_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

/// Normalizes 16-bit samples to `[-1.0, 1.0]`.
pub fn convert_i16_to_f32(pcm16: &[i16]) -> Vec<f32> {
    pcm16.iter().map(|&s| s as f32 / 32768.0).collect()
}

/// Converts normalized samples back to 16-bit, clamping out-of-range input.
pub fn convert_f32_to_i16(pcm32: &[f32]) -> Vec<i16> {
    pcm32
        .iter()
        .map(|&s| (s * 32768.0).clamp(i16::MIN as f32, i16::MAX as f32) as i16)
        .collect()
}

/// Splits interleaved samples into per-channel planes. The caller must have
/// verified that `samples.len()` divides evenly by `channels`.
pub fn deinterleave(samples: &[f32], channels: usize) -> Vec<Vec<f32>> {
    let frames = samples.len() / channels;
    let mut planes = vec![Vec::with_capacity(frames); channels];
    for frame in samples.chunks_exact(channels) {
        for (plane, &sample) in planes.iter_mut().zip(frame) {
            plane.push(sample);
        }
    }
    planes
}

/// Interleaves per-channel planes of equal length.
pub fn interleave(planes: &[Vec<f32>]) -> Vec<f32> {
    let frames = planes.first().map_or(0, Vec::len);
    let mut out = Vec::with_capacity(frames * planes.len());
    for i in 0..frames {
        for plane in planes {
            out.push(plane[i]);
        }
    }
    out
}

/// Converts between channel layouts: identical layouts pass through,
/// mono fans out by duplication, and any layout folds down to mono by
/// averaging. Other combinations are rejected.
pub fn remap_channels(
    planes: Vec<Vec<f32>>,
    target_channels: u16,
) -> Result<Vec<Vec<f32>>, FormatError> {
    let source_channels = planes.len() as u16;
    let target = target_channels as usize;

    if source_channels == target_channels {
        return Ok(planes);
    }
    if source_channels == 1 {
        let mono = &planes[0];
        return Ok(vec![mono.clone(); target]);
    }
    if target_channels == 1 {
        let frames = planes.first().map_or(0, Vec::len);
        let scale = 1.0 / planes.len() as f32;
        let mixed = (0..frames)
            .map(|i| planes.iter().map(|p| p[i]).sum::<f32>() * scale)
            .collect();
        return Ok(vec![mixed]);
    }
    Err(FormatError::UnsupportedChannelLayout(
        source_channels,
        target_channels,
    ))
}

/// Resamples all channel planes from `in_rate` to `out_rate` with cubic
/// interpolation. Plane lengths must match.
pub fn resample(
    planes: Vec<Vec<f32>>,
    in_rate: u32,
    out_rate: u32,
) -> Result<Vec<Vec<f32>>, FormatError> {
    if in_rate == out_rate || planes.is_empty() || planes[0].is_empty() {
        return Ok(planes);
    }

    let channels = planes.len();
    let frames = planes[0].len();
    let mut resampler = FastFixedIn::<f32>::new(
        out_rate as f64 / in_rate as f64,
        1.0,
        PolynomialDegree::Cubic,
        RESAMPLE_CHUNK,
        channels,
    )
    .map_err(|e| FormatError::Resample(e.to_string()))?;

    let mut out = vec![Vec::with_capacity(frames * out_rate as usize / in_rate as usize); channels];
    let mut pos = 0;
    while pos + RESAMPLE_CHUNK <= frames {
        let chunk: Vec<&[f32]> = planes
            .iter()
            .map(|p| &p[pos..pos + RESAMPLE_CHUNK])
            .collect();
        let produced = resampler
            .process(&chunk, None)
            .map_err(|e| FormatError::Resample(e.to_string()))?;
        for (plane, mut fresh) in out.iter_mut().zip(produced) {
            plane.append(&mut fresh);
        }
        pos += RESAMPLE_CHUNK;
    }

    if pos < frames {
        let tail: Vec<&[f32]> = planes.iter().map(|p| &p[pos..]).collect();
        let produced = resampler
            .process_partial(Some(&tail), None)
            .map_err(|e| FormatError::Resample(e.to_string()))?;
        for (plane, mut fresh) in out.iter_mut().zip(produced) {
            plane.append(&mut fresh);
        }
    }

    // Drain whatever the resampler still buffers internally.
    let flushed = resampler
        .process_partial::<&[f32]>(None, None)
        .map_err(|e| FormatError::Resample(e.to_string()))?;
    for (plane, mut fresh) in out.iter_mut().zip(flushed) {
        plane.append(&mut fresh);
    }

    Ok(out)
}
