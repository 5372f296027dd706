//! Parsers for the encoder's human-readable capability listings.
//!
//! These are pure functions over the captured text of `-codecs`, `-formats`
//! and `-h muxer=<name>`. A line that does not match the expected grammar is
//! skipped on its own; parsing never aborts.

use std::cmp::Ordering;

use ffb_core::{Catalog, Codec, CodecBuckets, CodecFlags, Error, Muxer, StreamKind, SEQUENCE_FORMAT};

static_pattern!(
    codec_line,
    r"^\s*([D.])([E.])([VAS])([I.])([L.])([S.]) (\w+) +([^(\n]+)"
);
static_pattern!(muxer_line, r"^\s*[D. ]E (\w+)\s+(.+)");
static_pattern!(default_video, r"Default video codec:\s*(.+)\.");
static_pattern!(default_audio, r"Default audio codec:\s*(.+)\.");
static_pattern!(common_extensions, r"Common extensions:\s*(.+)\.");

/// Parse one `-codecs` line such as ` DEV.LS h264   H.264 / AVC (encoders: ...)`.
pub fn parse_codec_line(line: &str) -> ffb_core::Result<Codec> {
    let caps = codec_line()
        .captures(line)
        .ok_or_else(|| Error::MalformedProbeLine(line.to_string()))?;

    let kind = match &caps[3] {
        "V" => StreamKind::Video,
        "A" => StreamKind::Audio,
        _ => StreamKind::Subtitle,
    };
    let flags = CodecFlags {
        decoder: &caps[1] == "D",
        encoder: &caps[2] == "E",
        intra_only: &caps[4] == "I",
        lossy: &caps[5] == "L",
        lossless: &caps[6] == "S",
    };

    Ok(Codec::new(&caps[7], caps[8].trim(), kind, flags))
}

/// Parse the full `-codecs` listing into encoder and decoder buckets.
///
/// Each codec lands in the first bucket it qualifies for, in the order
/// video encoders, audio encoders, video decoders, audio decoders. A codec
/// that both encodes and decodes video is therefore only listed as a video
/// encoder. Both encoder buckets start with the stream-copy pseudo-codec.
/// Buckets are returned unsorted.
pub fn parse_codecs(text: &str) -> CodecBuckets {
    let mut buckets = CodecBuckets {
        video_encoders: vec![Codec::copy(StreamKind::Video)],
        audio_encoders: vec![Codec::copy(StreamKind::Audio)],
        ..Default::default()
    };

    for line in text.lines() {
        let codec = match parse_codec_line(line) {
            Ok(codec) => codec,
            Err(e) => {
                tracing::trace!("{e}");
                continue;
            }
        };

        let bucket = match (codec.kind, codec.flags.encoder, codec.flags.decoder) {
            (StreamKind::Video, true, _) => &mut buckets.video_encoders,
            (StreamKind::Audio, true, _) => &mut buckets.audio_encoders,
            (StreamKind::Video, false, true) => &mut buckets.video_decoders,
            (StreamKind::Audio, false, true) => &mut buckets.audio_decoders,
            _ => continue,
        };
        bucket.push(codec);
    }

    buckets
}

/// Parse one `-formats` line such as ` DE matroska   Matroska`.
///
/// Only lines carrying the muxing flag match.
pub fn parse_muxer_line(line: &str) -> ffb_core::Result<Muxer> {
    let caps = muxer_line()
        .captures(line)
        .ok_or_else(|| Error::MalformedProbeLine(line.to_string()))?;
    Ok(Muxer::new(&caps[1], caps[2].trim()))
}

/// Parse the full `-formats` listing, keeping muxers only.
///
/// The generic image-sequence format is skipped; sequences are described by
/// [`sequence_muxers`](super::sequences::sequence_muxers) instead.
pub fn parse_muxer_listing(text: &str) -> Vec<Muxer> {
    text.lines()
        .filter_map(|line| match parse_muxer_line(line) {
            Ok(muxer) if muxer.name == SEQUENCE_FORMAT => None,
            Ok(muxer) => Some(muxer),
            Err(e) => {
                tracing::trace!("{e}");
                None
            }
        })
        .collect()
}

/// Details printed by `-h muxer=<name>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MuxerDetails {
    pub default_video_codec: Option<String>,
    pub default_audio_codec: Option<String>,
    pub extensions: Vec<String>,
}

impl MuxerDetails {
    /// Copy the details onto `muxer`, keeping only codec names that resolve
    /// to an encoder in `codecs`.
    pub fn apply(self, muxer: &mut Muxer, codecs: &CodecBuckets) {
        muxer.extensions = self.extensions;
        muxer.default_video_codec = self
            .default_video_codec
            .filter(|name| codecs.video_encoders.iter().any(|c| &c.name == name));
        muxer.default_audio_codec = self
            .default_audio_codec
            .filter(|name| codecs.audio_encoders.iter().any(|c| &c.name == name));
    }
}

/// Extract default codecs and extensions from a muxer help page.
///
/// The three fields are matched independently; any may be absent.
pub fn parse_muxer_details(text: &str) -> MuxerDetails {
    let capture = |re: &regex::Regex| {
        re.captures(text)
            .map(|caps| caps[1].trim().to_string())
            .filter(|s| !s.is_empty())
    };

    let extensions = capture(common_extensions())
        .map(|list| {
            list.split(',')
                .map(str::trim)
                .filter(|ext| !ext.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();

    MuxerDetails {
        default_video_codec: capture(default_video()),
        default_audio_codec: capture(default_audio()),
        extensions,
    }
}

/// Order muxers by first extension, extension-less ones first, ties broken
/// by case-insensitive pretty name.
pub fn compare_muxers(a: &Muxer, b: &Muxer) -> Ordering {
    let by_name = || {
        a.pretty_name
            .to_lowercase()
            .cmp(&b.pretty_name.to_lowercase())
    };
    match (a.extensions.first(), b.extensions.first()) {
        (None, None) => by_name(),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => x.cmp(y).then_with(by_name),
    }
}

fn sort_codecs(codecs: &mut [Codec]) {
    codecs.sort_by_cached_key(|c| c.pretty_name.to_lowercase());
}

/// Build a catalog with the final ordering applied.
///
/// Encoder buckets are sorted by case-insensitive pretty name; decoder
/// buckets keep listing order.
pub fn assemble_catalog(mut codecs: CodecBuckets, mut muxers: Vec<Muxer>) -> Catalog {
    sort_codecs(&mut codecs.video_encoders);
    sort_codecs(&mut codecs.audio_encoders);
    muxers.sort_by(compare_muxers);
    Catalog::new(codecs, muxers)
}
