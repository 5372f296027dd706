//! Capability discovery.
//!
//! [`CapabilityProbe`] is the seam between callers and the way capabilities
//! are learned. [`CliProbe`] scrapes the binary's human-readable listings;
//! the text parsers live in [`listing`], [`sequences`] and [`media`] so they
//! can be swapped or tested without spawning anything.

pub mod listing;
pub mod media;
pub mod sequences;

use std::path::{Path, PathBuf};
use std::time::Duration;

use ffb_core::{Catalog, Error, MediaDescriptor};

use crate::command::ToolCommand;
use crate::tools::resolve_binary;

pub use self::listing::{
    assemble_catalog, parse_codecs, parse_muxer_details, parse_muxer_listing, MuxerDetails,
};
pub use self::media::parse_media_info;
pub use self::sequences::sequence_muxers;

/// Something that can describe the encoder's capabilities.
pub trait CapabilityProbe: Send + Sync {
    /// Human-readable backend name.
    fn name(&self) -> &'static str;

    /// Query the encoder and build a fresh catalog. Blocks until done.
    fn refresh_catalog(&self) -> ffb_core::Result<Catalog>;

    /// Describe a media file, resolving names against `catalog`.
    fn media_info(&self, path: &Path, catalog: &Catalog) -> ffb_core::Result<MediaDescriptor>;
}

/// Time budget of each query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeTimeouts {
    pub codecs: Duration,
    pub formats: Duration,
    pub help: Duration,
    pub long_help: Duration,
    pub muxer_details: Duration,
    pub media_info: Duration,
}

impl Default for ProbeTimeouts {
    fn default() -> Self {
        Self {
            codecs: Duration::from_secs(10),
            formats: Duration::from_secs(10),
            help: Duration::from_secs(3),
            long_help: Duration::from_secs(3),
            muxer_details: Duration::from_secs(10),
            media_info: Duration::from_secs(3),
        }
    }
}

/// A probe that runs the encoder binary in its query modes.
#[derive(Debug, Clone)]
pub struct CliProbe {
    /// Configured binary; `None` searches `PATH`.
    binary: Option<PathBuf>,
    timeouts: ProbeTimeouts,
}

impl CliProbe {
    pub fn new(binary: Option<PathBuf>, timeouts: ProbeTimeouts) -> Self {
        Self { binary, timeouts }
    }

    /// Async form of [`CapabilityProbe::refresh_catalog`].
    ///
    /// Fails with [`Error::BinaryNotFound`] before running anything if the
    /// binary cannot be located. A query that times out or fails is logged
    /// and contributes nothing.
    pub async fn refresh_catalog_async(&self) -> ffb_core::Result<Catalog> {
        let binary = resolve_binary(self.binary.as_deref())?;
        tracing::info!("Probing encoder capabilities: {}", binary.display());

        let codecs_text = query(&binary, &["-codecs"], self.timeouts.codecs).await?;
        let formats_text = query(&binary, &["-formats"], self.timeouts.formats).await?;
        let long_help = query(&binary, &["-h", "long"], self.timeouts.long_help).await?;
        let help = query(&binary, &["-h"], self.timeouts.help).await?;

        let codecs = parse_codecs(&codecs_text);
        let mut muxers = parse_muxer_listing(&formats_text);
        tracing::debug!(
            video_encoders = codecs.video_encoders.len(),
            audio_encoders = codecs.audio_encoders.len(),
            muxers = muxers.len(),
            "Parsed encoder listings"
        );

        for muxer in &mut muxers {
            let arg = format!("muxer={}", muxer.name);
            let text = query(&binary, &["-h", &arg], self.timeouts.muxer_details).await?;
            parse_muxer_details(&text).apply(muxer, &codecs);
        }
        muxers.extend(sequence_muxers(&codecs));

        Ok(assemble_catalog(codecs, muxers).with_help(help, long_help))
    }

    /// Async form of [`CapabilityProbe::media_info`].
    pub async fn media_info_async(
        &self,
        path: &Path,
        catalog: &Catalog,
    ) -> ffb_core::Result<MediaDescriptor> {
        let binary = resolve_binary(self.binary.as_deref())?;
        let mut cmd = ToolCommand::new(binary);
        cmd.arg("-hide_banner")
            .arg("-i")
            .arg(path.to_string_lossy().as_ref())
            .timeout(self.timeouts.media_info)
            .allow_failure();
        let output = cmd.execute().await?;
        parse_media_info(&output.combined(), path, catalog)
    }
}

impl CapabilityProbe for CliProbe {
    fn name(&self) -> &'static str {
        "ffmpeg-cli"
    }

    fn refresh_catalog(&self) -> ffb_core::Result<Catalog> {
        block_on(self.refresh_catalog_async())
    }

    fn media_info(&self, path: &Path, catalog: &Catalog) -> ffb_core::Result<MediaDescriptor> {
        block_on(self.media_info_async(path, catalog))
    }
}

/// Run a listing query and return its stdout.
///
/// Only a missing binary is an error; anything else degrades to empty text.
async fn query(binary: &Path, args: &[&str], timeout: Duration) -> ffb_core::Result<String> {
    let mut cmd = ToolCommand::new(binary.to_path_buf());
    cmd.arg("-hide_banner").args(args.iter().copied()).timeout(timeout);

    match cmd.execute().await {
        Ok(output) => Ok(output.stdout),
        Err(e @ Error::BinaryNotFound { .. }) => Err(e),
        Err(e) => {
            tracing::warn!("Query {:?} skipped: {e}", args);
            Ok(String::new())
        }
    }
}

/// Drive a future to completion from synchronous code.
fn block_on<T>(fut: impl std::future::Future<Output = ffb_core::Result<T>>) -> ffb_core::Result<T> {
    match tokio::runtime::Handle::try_current() {
        // Already inside a runtime; requires the multi-threaded flavour.
        Ok(handle) => tokio::task::block_in_place(|| handle.block_on(fut)),
        Err(_) => {
            let rt = tokio::runtime::Runtime::new().map_err(|e| {
                Error::Internal(format!("failed to create tokio runtime: {e}"))
            })?;
            rt.block_on(fut)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_timeouts() {
        let t = ProbeTimeouts::default();
        assert_eq!(t.codecs, Duration::from_secs(10));
        assert_eq!(t.formats, Duration::from_secs(10));
        assert_eq!(t.help, Duration::from_secs(3));
        assert_eq!(t.long_help, Duration::from_secs(3));
        assert_eq!(t.muxer_details, Duration::from_secs(10));
    }

    #[test]
    fn missing_binary_fails_before_querying() {
        let probe = CliProbe::new(
            Some(PathBuf::from("/nonexistent/ffmpeg")),
            ProbeTimeouts::default(),
        );
        let err = probe.refresh_catalog().unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(probe.name(), "ffmpeg-cli");
    }

    #[cfg(unix)]
    #[test]
    fn refresh_with_scripted_binary() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("ffmpeg");
        std::fs::write(
            &script,
            r#"#!/bin/sh
case "$2" in
  -codecs) printf ' DEV.LS h264   H.264 / AVC\n DEA.L. aac    AAC (Advanced Audio Coding)\n' ;;
  -formats) printf '  E mp4   MP4 (MPEG-4 Part 14)\n  E image2   image2 sequence\n' ;;
  -h)
    case "$3" in
      muxer=mp4) printf 'Muxer mp4:\n    Common extensions: mp4.\n    Default video codec: h264.\n    Default audio codec: aac.\n' ;;
      long) echo 'long help' ;;
      *) echo 'short help' ;;
    esac ;;
esac
"#,
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let probe = CliProbe::new(Some(script), ProbeTimeouts::default());
        let catalog = probe.refresh_catalog().unwrap();

        let mp4 = catalog.muxer("mp4").unwrap();
        assert_eq!(mp4.extensions, ["mp4"]);
        assert_eq!(mp4.default_video_codec.as_deref(), Some("h264"));
        assert_eq!(mp4.default_audio_codec.as_deref(), Some("aac"));
        assert!(catalog.muxer("image2").is_none());
        assert!(catalog.muxer("png").unwrap().is_sequence);
        assert_eq!(catalog.help().trim(), "short help");
        assert_eq!(catalog.long_help().trim(), "long help");
        assert_eq!(catalog.video_encoders()[0].name, "copy");
    }
}
