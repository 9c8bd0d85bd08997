//! Minimal canonical RIFF/WAVE reader and writer for integer PCM.
//!
//! The reader walks the chunk list rather than assuming a 44-byte layout,
//! so streams with extra chunks (`LIST`, `fact`, ...) still parse. Every
//! length field is validated before it is used to slice the input.

use super::{FormatError, PcmFormat};

const HEADER_LEN: usize = 44;
const PCM_ENCODING_TAG: u16 = 1;

fn read_u16(bytes: &[u8], at: usize) -> Result<u16, FormatError> {
    let end = at + 2;
    if bytes.len() < end {
        return Err(FormatError::Truncated {
            needed: end,
            available: bytes.len(),
        });
    }
    Ok(u16::from_le_bytes([bytes[at], bytes[at + 1]]))
}

fn read_u32(bytes: &[u8], at: usize) -> Result<u32, FormatError> {
    let end = at + 4;
    if bytes.len() < end {
        return Err(FormatError::Truncated {
            needed: end,
            available: bytes.len(),
        });
    }
    Ok(u32::from_le_bytes([
        bytes[at],
        bytes[at + 1],
        bytes[at + 2],
        bytes[at + 3],
    ]))
}

/// Parses a RIFF/WAVE stream, returning the declared PCM format and the
/// sample data slice.
///
/// Fails with a [`FormatError`] when the preamble is not RIFF/WAVE, a
/// required chunk is missing, the encoding is not integer PCM, or any
/// declared length exceeds the bytes actually present.
pub fn decode(bytes: &[u8]) -> Result<(PcmFormat, &[u8]), FormatError> {
    if bytes.len() < 12 {
        return Err(FormatError::Truncated {
            needed: 12,
            available: bytes.len(),
        });
    }
    if &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
        return Err(FormatError::NotRiff);
    }

    let mut format: Option<PcmFormat> = None;
    let mut offset = 12usize;

    while offset + 8 <= bytes.len() {
        let chunk_id = &bytes[offset..offset + 4];
        let chunk_len = read_u32(bytes, offset + 4)? as usize;
        let body_start = offset + 8;

        match chunk_id {
            b"fmt " => {
                if chunk_len < 16 {
                    return Err(FormatError::Truncated {
                        needed: body_start + 16,
                        available: bytes.len(),
                    });
                }
                let encoding = read_u16(bytes, body_start)?;
                if encoding != PCM_ENCODING_TAG {
                    return Err(FormatError::UnsupportedEncoding(encoding));
                }
                format = Some(PcmFormat {
                    channels: read_u16(bytes, body_start + 2)?,
                    sample_rate: read_u32(bytes, body_start + 4)?,
                    bits_per_sample: read_u16(bytes, body_start + 14)?,
                });
            }
            b"data" => {
                let format = format.ok_or(FormatError::MissingChunk("fmt "))?;
                let available = bytes.len() - body_start;
                if chunk_len > available {
                    // The header claims more audio than the stream carries.
                    return Err(FormatError::Truncated {
                        needed: body_start + chunk_len,
                        available: bytes.len(),
                    });
                }
                return Ok((format, &bytes[body_start..body_start + chunk_len]));
            }
            _ => {}
        }

        // Chunk bodies are word-aligned; odd lengths carry a pad byte.
        offset = body_start + chunk_len + (chunk_len & 1);
    }

    if format.is_none() {
        Err(FormatError::MissingChunk("fmt "))
    } else {
        Err(FormatError::MissingChunk("data"))
    }
}

/// Wraps raw PCM sample data in a canonical 44-byte RIFF/WAVE header.
pub fn encode(data: &[u8], format: PcmFormat) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + data.len());
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&((HEADER_LEN - 8 + data.len()) as u32).to_le_bytes());
    out.extend_from_slice(b"WAVE");

    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&PCM_ENCODING_TAG.to_le_bytes());
    out.extend_from_slice(&format.channels.to_le_bytes());
    out.extend_from_slice(&format.sample_rate.to_le_bytes());
    out.extend_from_slice(&format.byte_rate().to_le_bytes());
    out.extend_from_slice(&format.block_align().to_le_bytes());
    out.extend_from_slice(&format.bits_per_sample.to_le_bytes());

    out.extend_from_slice(b"data");
    out.extend_from_slice(&(data.len() as u32).to_le_bytes());
    out.extend_from_slice(data);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const FMT: PcmFormat = PcmFormat::new(8000, 16, 2);

    #[test]
    fn encode_then_decode_returns_identical_pcm() {
        let pcm: Vec<u8> = (0u8..=255).cycle().take(1600).collect();
        let wav = encode(&pcm, FMT);
        let (decoded_fmt, decoded_pcm) = decode(&wav).unwrap();
        assert_eq!(decoded_fmt, FMT);
        assert_eq!(decoded_pcm, &pcm[..]);
    }

    #[test]
    fn header_fields_are_computed_not_copied() {
        let wav = encode(&[0u8; 400], FMT);
        // Canonical layout: byte rate at 28, block align at 32.
        let byte_rate = u32::from_le_bytes(wav[28..32].try_into().unwrap());
        let block_align = u16::from_le_bytes(wav[32..34].try_into().unwrap());
        assert_eq!(block_align, 4);
        assert_eq!(byte_rate, 8000 * block_align as u32);
        // RIFF size covers everything after the first 8 bytes.
        let riff_size = u32::from_le_bytes(wav[4..8].try_into().unwrap());
        assert_eq!(riff_size as usize, wav.len() - 8);
    }

    #[test]
    fn rejects_non_riff_input() {
        assert!(matches!(
            decode(b"OggS\x00\x00\x00\x00\x00\x00\x00\x00junkjunk"),
            Err(FormatError::NotRiff)
        ));
    }

    #[test]
    fn rejects_data_chunk_longer_than_the_stream() {
        let mut wav = encode(&[0u8; 100], FMT);
        wav.truncate(wav.len() - 60);
        match decode(&wav) {
            Err(FormatError::Truncated { needed, available }) => {
                assert!(needed > available);
            }
            other => panic!("expected Truncated, got {other:?}"),
        }
    }

    #[test]
    fn rejects_compressed_wave_encodings() {
        let mut wav = encode(&[0u8; 8], FMT);
        wav[20] = 6; // a-law
        assert!(matches!(
            decode(&wav),
            Err(FormatError::UnsupportedEncoding(6))
        ));
    }

    #[test]
    fn skips_unknown_chunks_before_data() {
        let pcm = [1u8, 2, 3, 4];
        let canonical = encode(&pcm, FMT);
        // Rebuild with a LIST chunk wedged between fmt and data.
        let mut wav = canonical[..36].to_vec();
        wav.extend_from_slice(b"LIST");
        wav.extend_from_slice(&4u32.to_le_bytes());
        wav.extend_from_slice(b"INFO");
        wav.extend_from_slice(&canonical[36..]);
        let riff_size = (wav.len() - 8) as u32;
        wav[4..8].copy_from_slice(&riff_size.to_le_bytes());

        let (fmt, data) = decode(&wav).unwrap();
        assert_eq!(fmt, FMT);
        assert_eq!(data, &pcm[..]);
    }

    #[test]
    fn truncated_preamble_is_an_error_not_a_panic() {
        assert!(matches!(
            decode(b"RIFF"),
            Err(FormatError::Truncated { .. })
        ));
    }
}
