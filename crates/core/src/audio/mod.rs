//! Pure audio transcoding between the client wire format and the remote
//! speech service formats. No network or session dependencies live here.

pub mod pcm;
pub mod riff;
pub mod transcode;

pub use transcode::transcode;

/// Shape of uncompressed PCM sample data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmFormat {
    pub sample_rate: u32,
    pub bits_per_sample: u16,
    pub channels: u16,
}

impl PcmFormat {
    pub const fn new(sample_rate: u32, bits_per_sample: u16, channels: u16) -> Self {
        Self {
            sample_rate,
            bits_per_sample,
            channels,
        }
    }

    /// Bytes per sample frame across all channels.
    pub const fn block_align(&self) -> u16 {
        self.channels * (self.bits_per_sample / 8)
    }

    /// Bytes per second of audio.
    pub const fn byte_rate(&self) -> u32 {
        self.sample_rate * self.block_align() as u32
    }
}

/// How the PCM data is containered on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    /// Bare sample data with no header.
    RawPcm,
    /// A canonical RIFF/WAVE wrapper.
    Riff,
}

/// A complete description of an audio byte stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    pub container: Container,
    pub pcm: PcmFormat,
}

impl AudioFormat {
    pub const fn riff(sample_rate: u32, bits_per_sample: u16, channels: u16) -> Self {
        Self {
            container: Container::Riff,
            pcm: PcmFormat::new(sample_rate, bits_per_sample, channels),
        }
    }

    pub const fn raw(sample_rate: u32, bits_per_sample: u16, channels: u16) -> Self {
        Self {
            container: Container::RawPcm,
            pcm: PcmFormat::new(sample_rate, bits_per_sample, channels),
        }
    }
}

/// Malformed or unsupported audio data. These reject the offending message
/// only; the session stays open.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("input truncated: need {needed} bytes, have {available}")]
    Truncated { needed: usize, available: usize },
    #[error("not a RIFF/WAVE stream")]
    NotRiff,
    #[error("missing `{0}` chunk")]
    MissingChunk(&'static str),
    #[error("unsupported WAVE encoding tag {0}, only integer PCM is supported")]
    UnsupportedEncoding(u16),
    #[error("unsupported bit depth {0}, only 16-bit PCM is supported")]
    UnsupportedBitDepth(u16),
    #[error("cannot convert {0} channels to {1}")]
    UnsupportedChannelLayout(u16, u16),
    #[error("sample data length {0} is not a whole number of sample frames")]
    RaggedSampleData(usize),
    #[error("output format `{0}` is not PCM and cannot be transcoded")]
    NonPcmSource(&'static str),
    #[error("resampling failed: {0}")]
    Resample(String),
}
