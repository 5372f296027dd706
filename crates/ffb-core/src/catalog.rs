//! Capability catalog: the codecs and muxers the encoder binary offers.
//!
//! A [`Catalog`] is built once by a probe and never mutated afterwards.
//! Consumers hold an `Arc<Catalog>` snapshot taken from a [`CatalogStore`];
//! a refresh swaps the whole snapshot, so references by name stay valid for
//! as long as a consumer keeps its snapshot.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Name of the pseudo-codec that copies a stream without re-encoding.
pub const COPY_CODEC: &str = "copy";

/// Generic container name used for numbered image sequences.
pub const SEQUENCE_FORMAT: &str = "image2";

/// Elementary stream type handled by a codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Video,
    Audio,
    Subtitle,
}

/// Capability flags reported for a codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CodecFlags {
    pub decoder: bool,
    pub encoder: bool,
    pub intra_only: bool,
    pub lossy: bool,
    pub lossless: bool,
}

/// A codec known to the encoder binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Codec {
    /// Identifier passed on the command line (e.g. `h264`).
    pub name: String,
    /// Human-readable description.
    pub pretty_name: String,
    pub kind: StreamKind,
    pub flags: CodecFlags,
}

impl Codec {
    pub fn new(
        name: impl Into<String>,
        pretty_name: impl Into<String>,
        kind: StreamKind,
        flags: CodecFlags,
    ) -> Self {
        Self {
            name: name.into(),
            pretty_name: pretty_name.into(),
            kind,
            flags,
        }
    }

    /// The stream-copy pseudo-codec for the given stream kind.
    ///
    /// Flagged lossy, lossless and intra-only at once since nothing is
    /// re-encoded.
    pub fn copy(kind: StreamKind) -> Self {
        let pretty = match kind {
            StreamKind::Video => "Copy video stream",
            StreamKind::Audio => "Copy audio stream",
            StreamKind::Subtitle => "Copy subtitle stream",
        };
        Self::new(
            COPY_CODEC,
            pretty,
            kind,
            CodecFlags {
                decoder: false,
                encoder: true,
                intra_only: true,
                lossy: true,
                lossless: true,
            },
        )
    }

    pub fn is_video(&self) -> bool {
        self.kind == StreamKind::Video
    }

    pub fn is_audio(&self) -> bool {
        self.kind == StreamKind::Audio
    }

    pub fn is_encoder(&self) -> bool {
        self.flags.encoder
    }

    pub fn is_decoder(&self) -> bool {
        self.flags.decoder
    }
}

/// An output container format.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Muxer {
    pub name: String,
    pub pretty_name: String,
    /// File extensions, most common first.
    #[serde(default)]
    pub extensions: Vec<String>,
    /// Whether the muxer writes one image file per frame.
    #[serde(default)]
    pub is_sequence: bool,
    /// Name of the default video encoder, if it resolved in the catalog.
    #[serde(default)]
    pub default_video_codec: Option<String>,
    /// Name of the default audio encoder, if it resolved in the catalog.
    #[serde(default)]
    pub default_audio_codec: Option<String>,
}

impl Muxer {
    pub fn new(name: impl Into<String>, pretty_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pretty_name: pretty_name.into(),
            ..Default::default()
        }
    }

    /// The name to pass after `-f`: sequences all go through the generic
    /// image-sequence format.
    pub fn format_name(&self) -> &str {
        if self.is_sequence {
            SEQUENCE_FORMAT
        } else {
            &self.name
        }
    }
}

/// Codecs grouped by their first matching role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodecBuckets {
    pub video_encoders: Vec<Codec>,
    pub audio_encoders: Vec<Codec>,
    pub video_decoders: Vec<Codec>,
    pub audio_decoders: Vec<Codec>,
}

/// Immutable snapshot of everything the probe discovered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    codecs: CodecBuckets,
    muxers: Vec<Muxer>,
    help: String,
    long_help: String,
}

impl Catalog {
    pub fn new(codecs: CodecBuckets, muxers: Vec<Muxer>) -> Self {
        Self {
            codecs,
            muxers,
            help: String::new(),
            long_help: String::new(),
        }
    }

    /// Attach the binary's help texts.
    pub fn with_help(mut self, help: impl Into<String>, long_help: impl Into<String>) -> Self {
        self.help = help.into();
        self.long_help = long_help.into();
        self
    }

    pub fn is_empty(&self) -> bool {
        self.muxers.is_empty()
            && self.codecs.video_encoders.is_empty()
            && self.codecs.audio_encoders.is_empty()
            && self.codecs.video_decoders.is_empty()
            && self.codecs.audio_decoders.is_empty()
    }

    pub fn video_encoders(&self) -> &[Codec] {
        &self.codecs.video_encoders
    }

    pub fn audio_encoders(&self) -> &[Codec] {
        &self.codecs.audio_encoders
    }

    pub fn video_decoders(&self) -> &[Codec] {
        &self.codecs.video_decoders
    }

    pub fn audio_decoders(&self) -> &[Codec] {
        &self.codecs.audio_decoders
    }

    /// Video encoders followed by audio encoders.
    pub fn encoders(&self) -> impl Iterator<Item = &Codec> {
        self.codecs
            .video_encoders
            .iter()
            .chain(self.codecs.audio_encoders.iter())
    }

    pub fn muxers(&self) -> &[Muxer] {
        &self.muxers
    }

    pub fn help(&self) -> &str {
        &self.help
    }

    pub fn long_help(&self) -> &str {
        &self.long_help
    }

    pub fn video_encoder(&self, name: &str) -> Option<&Codec> {
        self.codecs.video_encoders.iter().find(|c| c.name == name)
    }

    pub fn audio_encoder(&self, name: &str) -> Option<&Codec> {
        self.codecs.audio_encoders.iter().find(|c| c.name == name)
    }

    pub fn muxer(&self, name: &str) -> Option<&Muxer> {
        self.muxers.iter().find(|m| m.name == name)
    }

    /// The default encoder a muxer picks for the given stream kind.
    pub fn muxer_default_codec(&self, muxer: &str, kind: StreamKind) -> Option<&Codec> {
        let muxer = self.muxer(muxer)?;
        match kind {
            StreamKind::Video => self.video_encoder(muxer.default_video_codec.as_deref()?),
            StreamKind::Audio => self.audio_encoder(muxer.default_audio_codec.as_deref()?),
            StreamKind::Subtitle => None,
        }
    }
}

/// Shared holder of the current catalog snapshot.
///
/// Readers clone the inner `Arc`; a refresh replaces it wholesale.
#[derive(Debug, Default)]
pub struct CatalogStore {
    current: RwLock<Arc<Catalog>>,
}

impl CatalogStore {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            current: RwLock::new(Arc::new(catalog)),
        }
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> Arc<Catalog> {
        Arc::clone(&self.current.read())
    }

    /// Swap in a freshly probed catalog.
    pub fn replace(&self, catalog: Catalog) {
        tracing::debug!(
            muxers = catalog.muxers().len(),
            encoders = catalog.encoders().count(),
            "Catalog snapshot replaced"
        );
        *self.current.write() = Arc::new(catalog);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn h264() -> Codec {
        Codec::new(
            "h264",
            "H.264 / AVC / MPEG-4 AVC / MPEG-4 part 10",
            StreamKind::Video,
            CodecFlags {
                decoder: true,
                encoder: true,
                lossy: true,
                lossless: true,
                ..Default::default()
            },
        )
    }

    fn sample() -> Catalog {
        let mut mp4 = Muxer::new("mp4", "MP4 (MPEG-4 Part 14)");
        mp4.extensions = vec!["mp4".into()];
        mp4.default_video_codec = Some("h264".into());
        mp4.default_audio_codec = Some("aac".into());

        Catalog::new(
            CodecBuckets {
                video_encoders: vec![Codec::copy(StreamKind::Video), h264()],
                audio_encoders: vec![Codec::copy(StreamKind::Audio)],
                ..Default::default()
            },
            vec![mp4],
        )
    }

    #[test]
    fn copy_codec_flags() {
        let copy = Codec::copy(StreamKind::Audio);
        assert_eq!(copy.name, COPY_CODEC);
        assert!(copy.is_audio());
        assert!(copy.is_encoder());
        assert!(copy.flags.lossy && copy.flags.lossless && copy.flags.intra_only);
    }

    #[test]
    fn sequence_muxer_format_name() {
        let mut png = Muxer::new("png", "PNG Sequence");
        assert_eq!(png.format_name(), "png");
        png.is_sequence = true;
        assert_eq!(png.format_name(), SEQUENCE_FORMAT);
    }

    #[test]
    fn lookups_by_name() {
        let catalog = sample();
        assert!(catalog.video_encoder("h264").is_some());
        assert!(catalog.audio_encoder("h264").is_none());
        assert!(catalog.muxer("mp4").is_some());
        assert!(catalog.muxer("mkv").is_none());
        assert_eq!(catalog.encoders().count(), 3);
    }

    #[test]
    fn unresolved_default_codec_is_none() {
        let catalog = sample();
        let video = catalog.muxer_default_codec("mp4", StreamKind::Video);
        assert_eq!(video.map(|c| c.name.as_str()), Some("h264"));
        // "aac" was never registered as an audio encoder.
        assert!(catalog.muxer_default_codec("mp4", StreamKind::Audio).is_none());
    }

    #[test]
    fn store_replaces_wholesale() {
        let store = CatalogStore::default();
        let before = store.snapshot();
        assert!(before.is_empty());

        store.replace(sample());
        let after = store.snapshot();
        assert!(!after.is_empty());
        // The old snapshot is untouched.
        assert!(before.is_empty());
    }
}
