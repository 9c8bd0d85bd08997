//! Canned audio asset loading.

use anyhow::Context;
use bytes::Bytes;
use std::path::Path;

/// Reads the sample WAV served for the play-sample directive. The file is
/// loaded once at startup and sent byte-for-byte, so a missing or
/// unreadable asset fails the boot instead of the first music request.
pub fn load_sample_audio(path: &Path) -> anyhow::Result<Bytes> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read sample audio at {}", path.display()))?;
    Ok(Bytes::from(bytes))
}
